use crate::utils;
use cirrus_cloud::{ResourceKind, StateManager, address};
use cirrus_config::CirrusConfig;
use cirrus_cloud_iaas::NetworkAreaResource;
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    config: &CirrusConfig,
    project_root: &Path,
    area: Option<&str>,
) -> anyhow::Result<()> {
    let areas = utils::select_areas(config, area)?;
    let (client, session) = utils::connect(config)?;
    let resource = NetworkAreaResource::new(&client, &session);

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    for (name, spec) in areas {
        let key = address(ResourceKind::NetworkArea, name);
        let prior = utils::prior_model(state.get(&key), spec)?;
        let model = resource.read(&prior).await?;

        println!("{} {}", "network_area".bold(), name.cyan());
        for range in &model.network_ranges {
            println!("    {}", range.prefix);
        }
        if !model.default_nameservers.is_empty() {
            println!(
                "  ネームサーバー: {}",
                model.default_nameservers.join(", ").dimmed()
            );
        }

        state.upsert(key, utils::area_record(&model)?);
    }

    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}

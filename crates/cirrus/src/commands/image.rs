use cirrus_cloud::{ResourceKind, ResourceRecord, StateManager, address};
use cirrus_config::CirrusConfig;
use cirrus_cloud_iaas::ImageDataSource;
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    config: &CirrusConfig,
    project_root: &Path,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let images: Vec<_> = match name {
        Some(name) => vec![
            config
                .images
                .get_key_value(name)
                .ok_or_else(|| anyhow::anyhow!("イメージ `{}` は設定されていません", name))?,
        ],
        None => config.images.iter().collect(),
    };
    if images.is_empty() {
        println!("{}", "イメージが設定されていません".yellow());
        return Ok(());
    }

    let (client, session) = crate::utils::connect(config)?;
    let source = ImageDataSource::new(&client, &session);

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    for (local_name, spec) in images {
        let key = address(ResourceKind::Image, local_name);
        let resolved = source
            .read(&spec.project_id, spec.region.as_deref(), &spec.lookup())
            .await?;

        match resolved {
            Some(image) => {
                println!(
                    "{} {} → {} ({})",
                    "image".bold(),
                    local_name.cyan(),
                    image.id.green(),
                    image.name.as_deref().unwrap_or("名前なし")
                );
                state.upsert(
                    key,
                    ResourceRecord::new(ResourceKind::Image, image.id.clone())
                        .with_attribute("image", &image)?,
                );
            }
            None => {
                println!(
                    "{} {} → {}",
                    "image".bold(),
                    local_name.cyan(),
                    "一致なし".yellow()
                );
                state.remove(&key);
            }
        }
    }

    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}

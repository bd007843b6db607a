use crate::utils;
use cirrus_cloud::{ResourceKind, StateManager, address};
use cirrus_config::CirrusConfig;
use cirrus_cloud_iaas::{IaasError, NetworkAreaResource};
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    config: &CirrusConfig,
    project_root: &Path,
    area: Option<&str>,
) -> anyhow::Result<()> {
    let areas = utils::select_areas(config, area)?;
    if areas.is_empty() {
        println!("{}", "ネットワークエリアが設定されていません".yellow());
        return Ok(());
    }

    let (client, session) = utils::connect(config)?;
    let resource = NetworkAreaResource::new(&client, &session);

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    for (name, spec) in areas {
        println!("{} {}", "適用中".blue(), name.cyan());

        // 記録済みのネームサーバー順序を引き継ぐ
        let key = address(ResourceKind::NetworkArea, name);
        let prior = utils::prior_model(state.get(&key), spec)?;
        let desired = utils::apply_model(spec, &prior);

        let (model, applied) = match resource.update_ranges(&desired).await {
            Ok(result) => result,
            Err(e) => {
                if matches!(&e, IaasError::Cloud(cloud) if cloud.is_partial()) {
                    eprintln!(
                        "{}",
                        "一部の変更は反映済みです。apply を再実行すると収束します。"
                            .yellow()
                    );
                }
                manager.save(&state).await?;
                lock.release().await?;
                return Err(anyhow::Error::new(e)
                    .context(format!("ネットワークエリア `{}` の適用に失敗しました", name)));
            }
        };

        for result in &applied.succeeded {
            println!("  {} {}", "✓".green(), result.message);
        }
        if !applied.has_changes() {
            println!("  {}", "変更なし".dimmed());
        }

        state.upsert(key, utils::area_record(&model)?);
    }

    manager.save(&state).await?;
    lock.release().await?;

    println!();
    println!("{}", "✓ 適用が完了しました".green().bold());
    Ok(())
}

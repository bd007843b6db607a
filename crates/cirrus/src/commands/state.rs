use cirrus_cloud::StateManager;
use colored::Colorize;
use std::path::Path;

pub async fn handle(project_root: &Path) -> anyhow::Result<()> {
    let state = StateManager::new(project_root).load().await?;

    if state.resources.is_empty() {
        println!("{}", "記録済みのリソースはありません".dimmed());
        return Ok(());
    }

    for (address, record) in &state.resources {
        println!(
            "{} {} (更新: {})",
            address.cyan(),
            record.remote_id,
            record.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

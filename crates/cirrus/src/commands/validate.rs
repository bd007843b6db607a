use cirrus_config::CirrusConfig;
use colored::Colorize;

pub fn handle(config: &CirrusConfig) {
    println!("{}", "✓ 設定ファイルは有効です".green().bold());
    println!();

    let region = config.provider.region.as_deref().unwrap_or("(未設定)");
    println!("リージョン: {}", region.cyan());
    if config.provider.enable_beta_resources {
        println!("ベータリソース: {}", "有効".yellow());
    }

    println!("ネットワークエリア: {}", config.network_areas.len());
    for (name, area) in &config.network_areas {
        println!(
            "  - {} ({}, {}個のレンジ)",
            name.cyan(),
            area.area_id,
            area.network_ranges.len()
        );
    }

    println!("イメージ: {}", config.images.len());
    for (name, image) in &config.images {
        let lookup = match (&image.image_id, &image.query.name, &image.query.name_regex) {
            (Some(id), _, _) => format!("id {}", id),
            (None, Some(exact), _) => format!("name {:?}", exact),
            (None, None, Some(pattern)) => format!("regex {:?}", pattern),
            (None, None, None) => "任意の名前".to_string(),
        };
        println!("  - {} ({}, プロジェクト {})", name.cyan(), lookup, image.project_id);
    }
}

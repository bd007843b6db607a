use crate::utils;
use cirrus_config::CirrusConfig;
use cirrus_cloud_iaas::NetworkAreaResource;
use colored::Colorize;

pub async fn handle(config: &CirrusConfig, area: Option<&str>) -> anyhow::Result<()> {
    let areas = utils::select_areas(config, area)?;
    if areas.is_empty() {
        println!("{}", "ネットワークエリアが設定されていません".yellow());
        return Ok(());
    }

    let (client, session) = utils::connect(config)?;
    let resource = NetworkAreaResource::new(&client, &session);

    let mut pending = 0;
    for (name, spec) in areas {
        let plan = resource.plan_ranges(&utils::desired_model(spec)).await?;
        utils::print_plan(name, &plan);
        if plan.has_changes {
            pending += 1;
        }
    }

    println!();
    if pending == 0 {
        println!("{}", "✓ ネットワークレンジは設定と一致しています".green().bold());
    } else {
        println!(
            "{}個のエリアに未適用の変更があります。{} で収束させてください。",
            pending,
            "cirrus apply".cyan()
        );
    }

    Ok(())
}

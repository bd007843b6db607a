mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "IaaS のネットワークエリアとイメージを宣言的に管理する", long_about = None)]
struct Cli {
    /// 設定ファイル（省略時は cirrus.yaml を探索）
    #[arg(short, long, global = true, env = "CIRRUS_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 設定ファイルを検証
    Validate,
    /// apply で行われるネットワークレンジの変更を表示
    Plan {
        /// ネットワークエリア名（省略時はすべて）
        area: Option<String>,
    },
    /// ネットワークレンジを設定どおりに収束させる
    Apply {
        /// ネットワークエリア名（省略時はすべて）
        area: Option<String>,
    },
    /// 記録済みの順序を保ったままネットワークエリアを再取得
    Refresh {
        /// ネットワークエリア名（省略時はすべて）
        area: Option<String>,
    },
    /// 設定済みのイメージ検索を解決
    Image {
        /// イメージ検索名（省略時はすべて）
        name: Option<String>,
    },
    /// 記録済みの状態を表示
    State,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("cirrus {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (config, project_root) = match utils::load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", "✗ 設定ファイルの読み込みに失敗しました".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Validate => commands::validate::handle(&config),
        Commands::Plan { area } => commands::plan::handle(&config, area.as_deref()).await?,
        Commands::Apply { area } => {
            commands::apply::handle(&config, &project_root, area.as_deref()).await?
        }
        Commands::Refresh { area } => {
            commands::refresh::handle(&config, &project_root, area.as_deref()).await?
        }
        Commands::Image { name } => {
            commands::image::handle(&config, &project_root, name.as_deref()).await?
        }
        Commands::State => commands::state::handle(&project_root).await?,
        Commands::Version => {
            unreachable!("Version は設定読み込み前に処理済み");
        }
    }

    Ok(())
}

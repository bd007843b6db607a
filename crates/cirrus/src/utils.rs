use anyhow::Context;
use cirrus_cloud::{ActionType, Plan, ProviderSession, ResourceKind, ResourceRecord};
use cirrus_cloud_iaas::{IaasClient, IaasConfig, NetworkAreaModel, NetworkRangeModel};
use cirrus_config::{CirrusConfig, NetworkAreaSpec};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// 設定を読み込み、プロジェクトルート（設定ファイルのあるディレクトリ）と一緒に返す
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(CirrusConfig, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => cirrus_config::find_config_file()?,
    };

    let config = cirrus_config::load_config(&path)?;
    let project_root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!("プロジェクトルート: {}", project_root.display());

    Ok((config, project_root))
}

/// リモート API を使うコマンド用のクライアントとセッション
pub fn connect(config: &CirrusConfig) -> anyhow::Result<(IaasClient, ProviderSession)> {
    let iaas = IaasConfig::from_env().context("IaaS API の認証情報が設定されていません")?;
    Ok((
        IaasClient::new(iaas),
        ProviderSession::new(config.provider.clone()),
    ))
}

/// 名前で指定されたエリア、または全エリアを選択
pub fn select_areas<'a>(
    config: &'a CirrusConfig,
    name: Option<&str>,
) -> anyhow::Result<Vec<(&'a String, &'a NetworkAreaSpec)>> {
    match name {
        Some(name) => config
            .network_areas
            .get_key_value(name)
            .map(|entry| vec![entry])
            .ok_or_else(|| anyhow::anyhow!("ネットワークエリア `{}` は設定されていません", name)),
        None => Ok(config.network_areas.iter().collect()),
    }
}

const MODEL_ATTRIBUTE: &str = "model";

/// 宣言された順序のレンジを持つローカルモデル
pub fn desired_model(spec: &NetworkAreaSpec) -> NetworkAreaModel {
    NetworkAreaModel {
        area_id: spec.area_id.clone(),
        network_ranges: spec
            .network_ranges
            .iter()
            .map(NetworkRangeModel::new)
            .collect(),
        ..Default::default()
    }
}

/// 宣言されたレンジに、`prior` で記録済みのネームサーバー順序を組み合わせる
pub fn apply_model(spec: &NetworkAreaSpec, prior: &NetworkAreaModel) -> NetworkAreaModel {
    NetworkAreaModel {
        name: prior.name.clone(),
        default_nameservers: prior.default_nameservers.clone(),
        ..desired_model(spec)
    }
}

/// 前回の apply / refresh で記録したモデル。
/// 未記録、またはエリア ID が変わった場合は宣言どおりのモデル
pub fn prior_model(
    record: Option<&ResourceRecord>,
    spec: &NetworkAreaSpec,
) -> anyhow::Result<NetworkAreaModel> {
    let recorded = match record {
        Some(record) => record.attribute::<NetworkAreaModel>(MODEL_ATTRIBUTE)?,
        None => None,
    };

    Ok(recorded
        .filter(|model| model.area_id == spec.area_id)
        .unwrap_or_else(|| desired_model(spec)))
}

pub fn area_record(model: &NetworkAreaModel) -> anyhow::Result<ResourceRecord> {
    Ok(
        ResourceRecord::new(ResourceKind::NetworkArea, model.area_id.clone())
            .with_attribute(MODEL_ATTRIBUTE, model)?,
    )
}

/// プランを表示（アクションごとに 1 行）
pub fn print_plan(name: &str, plan: &Plan) {
    println!("{} {}", "network_area".bold(), name.cyan());

    for action in &plan.actions {
        let line = match action.action_type {
            ActionType::Create => format!("  + {}", action.key).green(),
            ActionType::Delete => format!("  - {}", action.key).red(),
            ActionType::NoOp => format!("    {}", action.key).normal(),
        };
        println!("{}", line);
    }

    println!("  {}", plan.summary().to_string().dimmed());
}

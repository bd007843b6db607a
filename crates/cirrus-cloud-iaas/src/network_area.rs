//! Network area resource
//!
//! Reads reconcile the remote ranges and default nameservers against the
//! previously known local order. Range updates go through the diff planner:
//! ranges dropped from the configuration are deleted, new ones created.

use crate::client::IaasClient;
use crate::error::Result;
use async_trait::async_trait;
use cirrus_cloud::{
    ApplyResult, Plan, ProviderSession, RemoteCollection, RemoteItem, plan_collection,
    reconcile_collection, reconcile_items, reconcile_order,
};
use serde::{Deserialize, Serialize};

const RESOURCE: &str = "network_area";

/// One network range in the local model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRangeModel {
    pub prefix: String,
    /// Set once the range exists remotely
    #[serde(default)]
    pub network_range_id: Option<String>,
}

impl NetworkRangeModel {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            network_range_id: None,
        }
    }
}

/// Local model of a network area
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAreaModel {
    pub area_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_nameservers: Vec<String>,
    #[serde(default)]
    pub network_ranges: Vec<NetworkRangeModel>,
}

impl NetworkAreaModel {
    pub fn prefixes(&self) -> Vec<&str> {
        self.network_ranges.iter().map(|r| r.prefix.as_str()).collect()
    }
}

/// Network ranges of one area seen as a keyed remote collection
pub struct NetworkRangeCollection<'a> {
    client: &'a IaasClient,
    area_id: &'a str,
}

impl<'a> NetworkRangeCollection<'a> {
    pub fn new(client: &'a IaasClient, area_id: &'a str) -> Self {
        Self { client, area_id }
    }
}

#[async_trait]
impl RemoteCollection for NetworkRangeCollection<'_> {
    fn resource_type(&self) -> &str {
        "network-range"
    }

    async fn fetch(&self) -> cirrus_cloud::Result<Vec<RemoteItem>> {
        Ok(self.client.list_network_ranges(self.area_id).await?)
    }

    async fn create(&self, key: &str) -> cirrus_cloud::Result<()> {
        let created = self.client.create_network_range(self.area_id, key).await?;
        tracing::debug!("Created network range {} (ID: {})", created.key, created.remote_id);
        Ok(())
    }

    async fn delete(&self, remote_id: &str) -> cirrus_cloud::Result<()> {
        Ok(self
            .client
            .delete_network_range(self.area_id, remote_id)
            .await?)
    }
}

/// Network area resource operations
pub struct NetworkAreaResource<'a> {
    client: &'a IaasClient,
    session: &'a ProviderSession,
}

impl<'a> NetworkAreaResource<'a> {
    pub fn new(client: &'a IaasClient, session: &'a ProviderSession) -> Self {
        Self { client, session }
    }

    /// Refresh `prior` from the remote area.
    ///
    /// Ranges and nameservers keep the order recorded in `prior`; items the
    /// remote no longer reports are dropped.
    pub async fn read(&self, prior: &NetworkAreaModel) -> Result<NetworkAreaModel> {
        self.session.check_beta(RESOURCE)?;

        let area = self.client.get_network_area(&prior.area_id).await?;

        let prior_prefixes = prior.prefixes();
        let network_ranges = reconcile_items(&prior_prefixes, &area.network_ranges)
            .into_iter()
            .map(|item| NetworkRangeModel {
                prefix: item.key,
                network_range_id: Some(item.remote_id),
            })
            .collect::<Vec<_>>();

        let stale = prior_prefixes
            .iter()
            .filter(|p| !network_ranges.iter().any(|r| r.prefix == **p))
            .count();
        if stale > 0 {
            tracing::info!(
                "{} network range(s) of area {} no longer exist remotely",
                stale,
                area.id
            );
        }

        Ok(NetworkAreaModel {
            default_nameservers: reconcile_order(
                &prior.default_nameservers,
                &area.default_nameservers,
            ),
            area_id: area.id,
            name: area.name,
            network_ranges,
        })
    }

    /// Show what [`Self::update_ranges`] would do
    pub async fn plan_ranges(&self, desired: &NetworkAreaModel) -> Result<Plan> {
        self.session.check_beta(RESOURCE)?;

        let collection = NetworkRangeCollection::new(self.client, &desired.area_id);
        Ok(plan_collection(&collection, &desired.prefixes()).await?)
    }

    /// Converge the remote ranges onto `desired` and return the refreshed
    /// model in the declared order.
    pub async fn update_ranges(
        &self,
        desired: &NetworkAreaModel,
    ) -> Result<(NetworkAreaModel, ApplyResult)> {
        self.session.check_beta(RESOURCE)?;

        let collection = NetworkRangeCollection::new(self.client, &desired.area_id);
        let applied = reconcile_collection(&collection, &desired.prefixes()).await?;

        if applied.has_changes() {
            tracing::info!(
                "Updated network ranges of area {}: {} mutation(s) in {}ms",
                desired.area_id,
                applied.succeeded.len(),
                applied.duration_ms
            );
        }

        let refreshed = self.read(desired).await?;
        Ok((refreshed, applied))
    }
}

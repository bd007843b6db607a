//! IaaS provider for Cirrus
//!
//! REST gateway and resource mappings for the IaaS API.
//!
//! # Features
//!
//! - Network areas: read with order-preserving reconciliation of ranges and
//!   default nameservers, range updates through the diff planner
//! - Images: lookup by id, exact name, regex and structured filter
//!
//! # Requirements
//!
//! - `CIRRUS_TOKEN` env var (bearer token)
//! - `CIRRUS_ORGANIZATION_ID` for network areas
//! - `CIRRUS_API_URL` to override the default endpoint
//!
//! # Example
//!
//! ```ignore
//! use cirrus_cloud::{ProviderSession, ProviderSettings};
//! use cirrus_cloud_iaas::{IaasClient, IaasConfig, NetworkAreaModel, NetworkAreaResource};
//!
//! let client = IaasClient::new(IaasConfig::from_env()?);
//! let session = ProviderSession::new(ProviderSettings {
//!     region: Some("eu01".to_string()),
//!     enable_beta_resources: true,
//! });
//!
//! let areas = NetworkAreaResource::new(&client, &session);
//! let (model, applied) = areas.update_ranges(&desired).await?;
//! ```

pub mod client;
pub mod error;
pub mod image;
pub mod network_area;

pub use client::{IaasClient, IaasConfig, NetworkArea};
pub use error::{IaasError, Result};
pub use image::ImageDataSource;
pub use network_area::{
    NetworkAreaModel, NetworkAreaResource, NetworkRangeCollection, NetworkRangeModel,
};

//! Cirrus cloud reconciliation core
//!
//! This crate holds the provider-independent logic that every Cirrus
//! resource mapping leans on when converging remote state onto the
//! declarative configuration.
//!
//! # Components
//!
//! - **reconcile**: rebuild a user-ordered list from an unordered remote listing
//! - **diff**: plan and apply create/delete mutations for keyed collections
//! - **image**: match, sort, filter and select one image out of a catalog
//! - **params**: typed decoding of free-form parameter bags
//! - **provider**: per-instance provider session (region, beta gate)
//! - **state**: the local `.cirrus/state.json` store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    cirrus CLI                    │
//! │               (plan / apply / image)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               cirrus-cloud-iaas                  │
//! │   network_area  ·  image  ·  IaasClient (REST)   │
//! └─────────────────┬───────────────────────────────┘
//!                   │ RemoteCollection
//! ┌─────────────────▼───────────────────────────────┐
//! │                 cirrus-cloud                     │
//! │  ┌────────────┐ ┌──────────┐ ┌──────────────┐   │
//! │  │ reconcile  │ │   diff   │ │    image     │   │
//! │  └────────────┘ └──────────┘ └──────────────┘   │
//! │  ┌────────────┐ ┌──────────┐ ┌──────────────┐   │
//! │  │   params   │ │ provider │ │    state     │   │
//! │  └────────────┘ └──────────┘ └──────────────┘   │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod diff;
pub mod error;
pub mod image;
pub mod params;
pub mod provider;
pub mod reconcile;
pub mod state;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use diff::{DiffTable, KeyState, RemoteCollection, plan_collection, reconcile_collection};
pub use error::{CloudError, Result};
pub use image::{
    Image, ImageConfig, ImageFilter, ImageLookup, ImageQuery, Resolution, rank_images,
    resolve_image,
};
pub use params::{ParamBag, ParamKind, ParamSchema, ParamValue};
pub use provider::{BetaGate, ProviderSession, ProviderSettings};
pub use reconcile::{ReconciledItem, RemoteItem, reconcile_items, reconcile_order};
pub use state::{GlobalState, ResourceKind, ResourceRecord, StateLock, StateManager, address};

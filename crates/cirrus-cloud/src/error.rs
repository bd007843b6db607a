//! Cloud reconciliation error types

use crate::action::ActionType;
use thiserror::Error;

/// Errors raised by the reconciliation core
#[derive(Error, Debug)]
pub enum CloudError {
    /// Malformed caller input (bad regex, conflicting lookup fields)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Listing the remote collection failed; nothing was mutated
    #[error("Failed to fetch remote state: {0}")]
    RemoteFetch(#[source] Box<CloudError>),

    /// A create/delete failed mid-pass. Mutations listed in `completed`
    /// were committed and are not rolled back.
    #[error("{action} of {key} failed after {} completed mutation(s): {source}", completed.len())]
    PartialMutation {
        action: ActionType,
        key: String,
        completed: Vec<String>,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// A remote item lacks a field needed to identify it locally
    #[error("{resource} is missing required field `{field}`")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    #[error("Parameter `{key}` expected {expected}, got {found}")]
    InvalidParameter {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("{0} is a beta resource; set enable_beta_resources to use it")]
    BetaNotEnabled(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether a retry of the same reconciliation is expected to converge
    pub fn is_partial(&self) -> bool {
        matches!(self, CloudError::PartialMutation { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

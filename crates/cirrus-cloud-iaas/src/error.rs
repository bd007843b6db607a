//! IaaS gateway error types

use cirrus_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IaasError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl IaasError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IaasError::Api { status: 404, .. })
    }
}

impl From<IaasError> for CloudError {
    fn from(err: IaasError) -> Self {
        match err {
            IaasError::Cloud(e) => e,
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IaasError>;

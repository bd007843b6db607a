//! Provider session
//!
//! One `ProviderSession` lives for the lifetime of a configured provider
//! instance. Everything that used to be process-wide (the beta-resource
//! warning in particular) hangs off the session so two providers, or two
//! tests, never observe each other.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Once;

/// Provider-level settings resolved from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Default region for regional resources
    pub region: Option<String>,

    /// Allow resources that are still in beta
    #[serde(default)]
    pub enable_beta_resources: bool,
}

/// Emits a warning at most once per gate
#[derive(Debug)]
pub struct BetaGate {
    warned: Once,
}

impl Default for BetaGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BetaGate {
    pub fn new() -> Self {
        Self { warned: Once::new() }
    }

    /// Runs `warn` the first time this is called; later calls are no-ops.
    /// Returns whether `warn` ran.
    pub fn warn_once(&self, warn: impl FnOnce()) -> bool {
        let mut ran = false;
        self.warned.call_once(|| {
            warn();
            ran = true;
        });
        ran
    }

    pub fn has_warned(&self) -> bool {
        self.warned.is_completed()
    }
}

/// Per-instance provider state
#[derive(Debug, Default)]
pub struct ProviderSession {
    settings: ProviderSettings,
    beta_gate: BetaGate,
}

impl ProviderSession {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            beta_gate: BetaGate::new(),
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Resolve the region for a resource, preferring the resource override
    pub fn region<'a>(&'a self, override_region: Option<&'a str>) -> Result<&'a str> {
        override_region
            .or(self.settings.region.as_deref())
            .ok_or_else(|| CloudError::InvalidInput("no region configured".to_string()))
    }

    /// Gate a beta resource.
    ///
    /// Fails when beta resources are disabled. Otherwise warns once per
    /// session that beta resources are in use.
    pub fn check_beta(&self, resource: &str) -> Result<()> {
        if !self.settings.enable_beta_resources {
            return Err(CloudError::BetaNotEnabled(resource.to_string()));
        }

        self.beta_gate.warn_once(|| {
            tracing::warn!(
                "Beta resources are enabled ({} requested); their behavior may change without notice",
                resource
            );
        });
        Ok(())
    }

    pub fn beta_warned(&self) -> bool {
        self.beta_gate.has_warned()
    }
}

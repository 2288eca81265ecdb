use crate::core::{LifecycleError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Activity manager configuration
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Package or class names of the disambiguation activity, never treated as home
    pub resolver_components: Vec<String>,

    /// Key dispatch timeout for ordinary processes
    pub key_dispatch_timeout_ms: u64,

    /// Key dispatch timeout for processes under instrumentation
    pub instrumentation_key_dispatch_timeout_ms: u64,

    /// Log a "displayed" event the first time a launched window is drawn
    pub report_launch_times: bool,

    /// Deferred stack messages kept before equal messages are coalesced
    pub max_pending_messages: usize,
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self {
            resolver_components: vec!["android".to_string()],
            key_dispatch_timeout_ms: 5_000,
            instrumentation_key_dispatch_timeout_ms: 60_000,
            report_launch_times: true,
            max_pending_messages: 64,
        }
    }

    /// Add a resolver package or class name
    pub fn resolver_component(mut self, name: &str) -> Self {
        self.resolver_components.push(name.to_string());
        self
    }

    /// Set the key dispatch timeout
    pub fn key_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.key_dispatch_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the key dispatch timeout used under instrumentation
    pub fn instrumentation_key_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.instrumentation_key_dispatch_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn report_launch_times(mut self, report: bool) -> Self {
        self.report_launch_times = report;
        self
    }

    pub fn max_pending_messages(mut self, max: usize) -> Self {
        self.max_pending_messages = max;
        self
    }

    pub fn key_dispatch_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.key_dispatch_timeout_ms)
    }

    pub fn instrumentation_key_dispatch_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.instrumentation_key_dispatch_timeout_ms)
    }

    /// Parse from a JSON document and validate
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.key_dispatch_timeout_ms == 0 {
            return Err(LifecycleError::InvalidConfig(
                "key_dispatch_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.instrumentation_key_dispatch_timeout_ms < self.key_dispatch_timeout_ms {
            return Err(LifecycleError::InvalidConfig(
                "instrumentation_key_dispatch_timeout_ms cannot be below key_dispatch_timeout_ms"
                    .to_string(),
            ));
        }

        if self.max_pending_messages == 0 {
            return Err(LifecycleError::InvalidConfig(
                "max_pending_messages must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

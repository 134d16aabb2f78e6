//! Validator settings loaded from TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blocklist::Blocklist;
use crate::error::ConfigError;
use crate::resolver::Resolve;
use crate::validate::{Validator, DEFAULT_DNS_TIMEOUT};

/// Validator configuration, e.g.
///
/// ```toml
/// dns_timeout_ms = 5000
/// extra_blocked_ranges = ["100.64.0.0/10"]
/// unmap_ipv4_mapped = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Upper bound on one hostname lookup, in milliseconds.
    pub dns_timeout_ms: u64,
    /// Ranges blocked in addition to the built-in table, in CIDR notation.
    pub extra_blocked_ranges: Vec<String>,
    /// Classify IPv4-mapped IPv6 addresses as their IPv4 address.
    pub unmap_ipv4_mapped: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            dns_timeout_ms: DEFAULT_DNS_TIMEOUT.as_millis() as u64,
            extra_blocked_ranges: Vec::new(),
            unmap_ipv4_mapped: false,
        }
    }
}

impl ValidatorConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let cfg = Self::from_toml_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded validator config");
        Ok(cfg)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    /// Built-in ranges plus the configured extras.
    ///
    /// # Errors
    ///
    /// Any malformed extra range fails the whole load.
    pub fn blocklist(&self) -> Result<Blocklist, ConfigError> {
        self.extra_blocked_ranges
            .iter()
            .try_fold(Blocklist::builder(), |builder, cidr| builder.block_cidr(cidr))
            .map(|builder| builder.build())
    }

    pub fn build_validator<R: Resolve>(&self, resolver: R) -> Result<Validator<R>, ConfigError> {
        Ok(Validator::new(resolver)
            .with_blocklist(self.blocklist()?)
            .with_timeout(self.dns_timeout())
            .with_ipv4_mapped_unmapping(self.unmap_ipv4_mapped))
    }
}

//! Error types for fetchgate.
//!
//! The `Display` text of every [`Error`] variant is the reason string handed
//! back to clients, so it must stay stable.

use std::net::IpAddr;

use thiserror::Error;

use crate::blocklist::CidrRange;

/// Reasons a URL was refused.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The input is not a well-formed absolute URL.
    #[error("URL validation error: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Scheme other than http/https. The scheme is shown with its trailing colon.
    #[error("Invalid protocol: {scheme}:. Only HTTP and HTTPS are allowed.")]
    InvalidProtocol { url: String, scheme: String },

    /// DNS resolution failed or timed out.
    #[error("URL validation error: {message}")]
    DnsError { host: String, message: String },

    /// The resolved address falls inside a blocked range.
    #[error("URL resolves to a blocked IP address range")]
    Blocked {
        url: String,
        ip: IpAddr,
        range: Option<CidrRange>,
    },
}

impl Error {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_protocol(url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::InvalidProtocol {
            url: url.into(),
            scheme: scheme.into(),
        }
    }

    /// Build a resolution error. Public so custom [`Resolve`](crate::Resolve)
    /// implementations can report failures.
    pub fn dns_error(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DnsError {
            host: host.into(),
            message: message.into(),
        }
    }

    pub(crate) fn blocked(url: impl Into<String>, ip: IpAddr, range: Option<CidrRange>) -> Self {
        Self::Blocked {
            url: url.into(),
            ip,
            range,
        }
    }

    /// Short machine-readable label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidProtocol { .. } => "invalid_protocol",
            Self::DnsError { .. } => "dns_error",
            Self::Blocked { .. } => "blocked",
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid CIDR range '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },
}

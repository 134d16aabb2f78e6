//! Hostname resolution.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;

use hickory_resolver::TokioResolver;

use crate::error::Error;

/// Address family of a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// `4` or `6`.
    pub fn number(self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

/// Resolve a hostname to the single address the caller will connect to.
///
/// Implementations must not cache answers between calls.
pub trait Resolve: Send + Sync {
    fn resolve(&self, host: &str) -> impl Future<Output = Result<IpAddr, Error>> + Send;
}

/// Resolver backed by the system configuration (`/etc/resolv.conf`).
///
/// A fresh hickory resolver is built for every lookup so no answer is ever
/// reused by a later validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, Error> {
        if let Some(ip) = literal_ip(host) {
            return Ok(ip);
        }

        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| Error::dns_error(host, e.to_string()))?
            .build();

        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| Error::dns_error(host, e.to_string()))?;

        response
            .iter()
            .next()
            .ok_or_else(|| Error::dns_error(host, format!("no IP addresses found for {}", host)))
    }
}

/// Resolver answering from a fixed table.
///
/// Hosts missing from the table resolve to the fallback address, or fail
/// when there is none.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, IpAddr>,
    fallback: Option<IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, host: &str, ip: IpAddr) -> Self {
        self.entries.insert(host.to_lowercase(), ip);
        self
    }

    pub fn with_fallback(mut self, ip: IpAddr) -> Self {
        self.fallback = Some(ip);
        self
    }
}

impl Resolve for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, Error> {
        if let Some(ip) = literal_ip(host) {
            return Ok(ip);
        }
        self.entries
            .get(host)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| Error::dns_error(host, format!("no address found for {}", host)))
    }
}

/// Hosts that are already IP literals resolve to themselves.
fn literal_ip(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_family() {
        assert_eq!(AddressFamily::of("8.8.8.8".parse().unwrap()).number(), 4);
        assert_eq!(AddressFamily::of("::1".parse().unwrap()).number(), 6);
    }

    #[test]
    fn test_literal_ip() {
        assert_eq!(literal_ip("[::1]"), Some("::1".parse().unwrap()));
        assert_eq!(literal_ip("127.0.0.1"), Some("127.0.0.1".parse().unwrap()));
        assert_eq!(literal_ip("example.com"), None);
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::new()
            .with_entry("Internal-Network.com", "192.168.1.1".parse().unwrap());

        let ip = resolver.resolve("internal-network.com").await.unwrap();
        assert_eq!(ip, "192.168.1.1".parse::<IpAddr>().unwrap());

        let err = resolver.resolve("unknown.example").await.unwrap_err();
        assert!(err.to_string().contains("no address found for unknown.example"));
    }

    #[tokio::test]
    async fn test_static_resolver_fallback() {
        let resolver = StaticResolver::new().with_fallback("8.8.8.8".parse().unwrap());
        let ip = resolver.resolve("anything.example").await.unwrap();
        assert_eq!(ip, "8.8.8.8".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_system_resolver_literal_skips_lookup() {
        let ip = SystemResolver.resolve("[fe80::1]").await.unwrap();
        assert_eq!(ip, "fe80::1".parse::<IpAddr>().unwrap());
    }
}

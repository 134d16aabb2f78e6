//! Reserved and private network ranges that must never be fetched.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::ConfigError;

/// A contiguous block of addresses: base address plus prefix length.
///
/// The family of `base` is the family of the range. Addresses of the other
/// family never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrRange {
    base: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    const fn v4(a: u8, b: u8, c: u8, d: u8, prefix_len: u8) -> Self {
        Self {
            base: IpAddr::V4(Ipv4Addr::new(a, b, c, d)),
            prefix_len,
        }
    }

    const fn v6(first: u16, second: u16, last: u16, prefix_len: u8) -> Self {
        Self {
            base: IpAddr::V6(Ipv6Addr::new(first, second, 0, 0, 0, 0, 0, last)),
            prefix_len,
        }
    }

    /// Create a range, rejecting prefix lengths too long for the family.
    pub fn new(base: IpAddr, prefix_len: u8) -> Result<Self, ConfigError> {
        let max = match base {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(ConfigError::InvalidCidr {
                input: format!("{}/{}", base, prefix_len),
                reason: format!("prefix length must be at most {}", max),
            });
        }
        Ok(Self { base, prefix_len })
    }

    pub fn base(&self) -> IpAddr {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// True when the first `prefix_len` bits of `ip` equal those of the base.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.base, ip) {
            (IpAddr::V4(base), IpAddr::V4(ip)) => {
                let mask = mask_v4(self.prefix_len);
                u32::from(base) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(base), IpAddr::V6(ip)) => {
                let mask = mask_v6(self.prefix_len);
                u128::from(base) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

fn mask_v4(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n.min(32))),
    }
}

fn mask_v6(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - u32::from(n.min(128))),
    }
}

impl FromStr for CidrRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: IpNet = s.trim().parse().map_err(|e: ipnet::AddrParseError| {
            ConfigError::InvalidCidr {
                input: s.to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::new(net.addr(), net.prefix_len())
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

/// Built-in ranges. Always enforced, whatever else is configured.
pub const BUILTIN_RANGES: &[CidrRange] = &[
    CidrRange::v4(10, 0, 0, 0, 8),        // RFC 1918
    CidrRange::v4(172, 16, 0, 0, 12),     // RFC 1918
    CidrRange::v4(192, 168, 0, 0, 16),    // RFC 1918
    CidrRange::v4(127, 0, 0, 0, 8),       // loopback
    CidrRange::v4(0, 0, 0, 0, 8),         // "this" network
    CidrRange::v4(169, 254, 0, 0, 16),    // link-local, cloud metadata
    CidrRange::v4(192, 0, 2, 0, 24),      // TEST-NET-1
    CidrRange::v4(198, 51, 100, 0, 24),   // TEST-NET-2
    CidrRange::v4(203, 0, 113, 0, 24),    // TEST-NET-3
    CidrRange::v4(224, 0, 0, 0, 4),       // multicast
    CidrRange::v4(240, 0, 0, 0, 4),       // reserved
    CidrRange::v6(0, 0, 1, 128),          // ::1 loopback
    CidrRange::v6(0xfc00, 0, 0, 7),       // unique local
    CidrRange::v6(0xfe80, 0, 0, 10),      // link-local
    CidrRange::v6(0xff00, 0, 0, 8),       // multicast
    CidrRange::v6(0x2001, 0x0db8, 0, 32), // documentation
];

/// The set of ranges a validator refuses.
///
/// Always contains [`BUILTIN_RANGES`]; operators may add more through
/// [`Blocklist::builder`] but can never remove a built-in range.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    extra: Vec<CidrRange>,
}

impl Blocklist {
    pub fn builder() -> BlocklistBuilder {
        BlocklistBuilder::default()
    }

    /// Every range in the list, built-in ranges first.
    pub fn ranges(&self) -> impl Iterator<Item = &CidrRange> {
        BUILTIN_RANGES.iter().chain(self.extra.iter())
    }

    /// The first range containing `ip`, if any.
    pub fn matching_range(&self, ip: IpAddr) -> Option<&CidrRange> {
        self.ranges().find(|range| range.contains(ip))
    }

    pub fn is_ip_blocked(&self, ip: IpAddr) -> bool {
        self.matching_range(ip).is_some()
    }

    /// Classify a textual address. Unparsable input is treated as blocked.
    pub fn is_blocked(&self, address: &str) -> bool {
        match address.parse::<IpAddr>() {
            Ok(ip) => self.is_ip_blocked(ip),
            Err(e) => {
                tracing::error!(address, error = %e, "unparsable IP address, treating as blocked");
                true
            }
        }
    }
}

/// Builder adding extra ranges on top of the built-in table.
#[derive(Debug, Clone, Default)]
pub struct BlocklistBuilder {
    extra: Vec<CidrRange>,
}

impl BlocklistBuilder {
    /// Block an additional range given in CIDR notation.
    ///
    /// # Errors
    ///
    /// Malformed input is an error rather than being skipped, so a typo in
    /// configuration cannot quietly leave a range reachable.
    pub fn block_cidr(self, cidr: &str) -> Result<Self, ConfigError> {
        Ok(self.block_range(cidr.parse()?))
    }

    pub fn block_range(mut self, range: CidrRange) -> Self {
        if !self.extra.contains(&range) {
            self.extra.push(range);
        }
        self
    }

    pub fn build(self) -> Blocklist {
        Blocklist { extra: self.extra }
    }
}

/// Check a textual address against the built-in ranges.
///
/// Returns `true` for anything that does not parse as an IP address.
pub fn is_blocked(address: &str) -> bool {
    Blocklist::default().is_blocked(address)
}

/// Check an address against the built-in ranges.
pub fn is_ip_blocked(ip: IpAddr) -> bool {
    Blocklist::default().is_ip_blocked(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_contents() {
        let rendered: Vec<String> = BUILTIN_RANGES.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rendered,
            [
                "10.0.0.0/8",
                "172.16.0.0/12",
                "192.168.0.0/16",
                "127.0.0.0/8",
                "0.0.0.0/8",
                "169.254.0.0/16",
                "192.0.2.0/24",
                "198.51.100.0/24",
                "203.0.113.0/24",
                "224.0.0.0/4",
                "240.0.0.0/4",
                "::1/128",
                "fc00::/7",
                "fe80::/10",
                "ff00::/8",
                "2001:db8::/32",
            ]
        );
    }

    #[test]
    fn test_private_ipv4_blocked() {
        assert!(is_blocked("192.168.1.1"));
        assert!(is_blocked("10.0.0.1"));
        assert!(is_blocked("172.16.0.1"));
    }

    #[test]
    fn test_loopback_ipv4_blocked() {
        assert!(is_blocked("127.0.0.1"));
        assert!(is_blocked("127.0.1.1"));
        assert!(is_blocked("127.255.255.255"));
    }

    #[test]
    fn test_link_local_and_metadata_blocked() {
        assert!(is_blocked("169.254.169.254"));
        assert!(is_blocked("169.254.1.1"));
    }

    #[test]
    fn test_reserved_ipv4_blocked() {
        assert!(is_blocked("0.0.0.0"));
        assert!(is_blocked("192.0.2.10"));
        assert!(is_blocked("198.51.100.7"));
        // TEST-NET-3 looks public but is documentation space
        assert!(is_blocked("203.0.113.1"));
        assert!(is_blocked("224.0.0.251"));
        assert!(is_blocked("239.255.255.250"));
        assert!(is_blocked("240.0.0.1"));
        assert!(is_blocked("255.255.255.255"));
    }

    #[test]
    fn test_ipv6_ranges_blocked() {
        assert!(is_blocked("::1"));
        assert!(is_blocked("0:0:0:0:0:0:0:1"));
        assert!(is_blocked("fc00::1"));
        assert!(is_blocked("fd12:3456:789a::1"));
        assert!(is_blocked("fe80::1"));
        assert!(is_blocked("febf:ffff::1"));
        assert!(is_blocked("ff02::1"));
        assert!(is_blocked("2001:db8::1"));
    }

    #[test]
    fn test_public_addresses_allowed() {
        assert!(!is_blocked("8.8.8.8"));
        assert!(!is_blocked("1.1.1.1"));
        assert!(!is_blocked("104.18.2.55"));
        assert!(!is_blocked("2606:4700:4700::1111"));
        assert!(!is_blocked("2001:4860:4860::8844"));
    }

    #[test]
    fn test_range_boundaries() {
        assert!(is_blocked("172.16.0.0"));
        assert!(is_blocked("172.31.255.255"));
        assert!(!is_blocked("172.15.255.255"));
        assert!(!is_blocked("172.32.0.0"));

        assert!(!is_blocked("9.255.255.255"));
        assert!(!is_blocked("11.0.0.0"));

        assert!(!is_blocked("169.253.255.255"));
        assert!(!is_blocked("223.255.255.255"));

        assert!(!is_blocked("fec0::1"));
        assert!(!is_blocked("fe7f::1"));
        assert!(!is_blocked("2001:db9::1"));
        assert!(!is_blocked("::2"));
    }

    #[test]
    fn test_unparsable_address_fails_closed() {
        assert!(is_blocked("not-an-ip"));
        assert!(is_blocked(""));
        assert!(is_blocked("999.1.1.1"));
        assert!(is_blocked("fe80::1%eth0"));
    }

    #[test]
    fn test_family_isolation() {
        // 0.0.0.0/8 must not swallow IPv6 addresses sharing leading zero bits
        assert!(!is_blocked("::2"));
        let v4_zero = CidrRange::v4(0, 0, 0, 0, 8);
        assert!(!v4_zero.contains("::".parse().unwrap()));

        let v6_loopback = CidrRange::v6(0, 0, 1, 128);
        assert!(!v6_loopback.contains("0.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_mapped_not_normalised() {
        // Known gap: classification is per family, mapped addresses are plain IPv6
        assert!(!is_blocked("::ffff:127.0.0.1"));
        assert!(!is_blocked("::ffff:192.168.1.1"));
    }

    #[test]
    fn test_matching_range_reports_entry() {
        let list = Blocklist::default();
        let range = list.matching_range("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(range.to_string(), "10.0.0.0/8");
        assert!(list.matching_range("8.8.8.8".parse().unwrap()).is_none());
    }

    #[test]
    fn test_parse_cidr() {
        let range: CidrRange = "100.64.0.0/10".parse().unwrap();
        assert_eq!(range.prefix_len(), 10);
        assert!(range.contains("100.100.100.200".parse().unwrap()));
        assert!(!range.contains("100.128.0.1".parse().unwrap()));

        assert!("10.0.0.0/33".parse::<CidrRange>().is_err());
        assert!("not-a-cidr".parse::<CidrRange>().is_err());
        assert!(CidrRange::new("::".parse().unwrap(), 129).is_err());
    }

    #[test]
    fn test_zero_prefix_matches_whole_family() {
        let all_v4: CidrRange = "0.0.0.0/0".parse().unwrap();
        assert!(all_v4.contains("8.8.8.8".parse().unwrap()));
        assert!(!all_v4.contains("2606:4700::1".parse().unwrap()));
    }

    #[test]
    fn test_builder_adds_ranges() {
        let list = Blocklist::builder()
            .block_cidr("100.64.0.0/10")
            .unwrap()
            .block_cidr("2606:4700::/32")
            .unwrap()
            .build();

        assert!(list.is_ip_blocked("100.64.0.1".parse().unwrap()));
        assert!(list.is_blocked("2606:4700:4700::1111"));
        // built-ins still present
        assert!(list.is_blocked("127.0.0.1"));
        assert!(!list.is_blocked("8.8.8.8"));
    }

    #[test]
    fn test_builder_rejects_invalid_cidr() {
        assert!(Blocklist::builder().block_cidr("10.0.0.0/99").is_err());
    }

    #[test]
    fn test_builder_deduplicates() {
        let range: CidrRange = "100.64.0.0/10".parse().unwrap();
        let list = Blocklist::builder()
            .block_range(range)
            .block_range(range)
            .build();
        assert_eq!(list.ranges().count(), BUILTIN_RANGES.len() + 1);
    }
}

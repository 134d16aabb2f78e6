//! # fetchgate
//!
//! SSRF gatekeeper for services that fetch user-supplied URLs.
//!
//! `fetchgate` decides whether a URL may be fetched: it checks the scheme,
//! resolves the host, and classifies the address the name actually resolves
//! to against a fixed table of reserved and private ranges. It does not make
//! HTTP requests itself. Every failure, including DNS errors and timeouts,
//! yields a denied verdict whose reason can be shown to the client.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() {
//! let verdict = fetchgate::validate("https://example.com/article").await;
//! if let Some(reason) = verdict.reason() {
//!     eprintln!("403: {}", reason);
//! }
//! # }
//! ```
//!
//! ## Known gaps
//!
//! - IPv4-mapped IPv6 addresses (`::ffff:127.0.0.1`) are classified as IPv6
//!   and therefore not caught by the IPv4 ranges, unless
//!   [`Validator::with_ipv4_mapped_unmapping`] is enabled.
//! - Only the first resolved address is checked, and the name may resolve
//!   differently by the time the caller connects. Connect to
//!   [`Validated::ip`] from [`Validator::check`] to close that window.

mod blocklist;
mod config;
mod error;
mod logging;
mod resolver;
mod safe_url;
mod validate;

pub use blocklist::{
    is_blocked, is_ip_blocked, Blocklist, BlocklistBuilder, CidrRange, BUILTIN_RANGES,
};
pub use config::ValidatorConfig;
pub use error::{ConfigError, Error};
pub use logging::init_logging;
pub use resolver::{AddressFamily, Resolve, StaticResolver, SystemResolver};
pub use safe_url::SafeUrl;
pub use validate::{
    validate, validate_sync, Validated, Validator, Verdict, DEFAULT_DNS_TIMEOUT,
};

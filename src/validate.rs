//! URL validation with DNS resolution.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::RuntimeFlavor;

use crate::blocklist::Blocklist;
use crate::error::Error;
use crate::resolver::{AddressFamily, Resolve, SystemResolver};
use crate::safe_url::SafeUrl;

/// Upper bound on a single hostname lookup.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of successful URL validation.
#[derive(Debug, Clone)]
pub struct Validated {
    /// The verified IP address. Connect to this, not to a fresh lookup.
    pub ip: IpAddr,

    /// Normalized hostname (use for Host header / SNI).
    pub host: String,

    pub port: u16,

    /// Full URL (normalized).
    pub url: String,

    pub https: bool,
}

impl Validated {
    /// Get the socket address to connect to.
    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// Outcome handed back to the HTTP layer.
///
/// `reason` is present exactly when `valid` is false. A denied verdict's
/// reason is meant to be returned to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl Verdict {
    pub fn allowed() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl From<Error> for Verdict {
    fn from(err: Error) -> Self {
        Self::denied(err.to_string())
    }
}

impl From<Result<Validated, Error>> for Verdict {
    fn from(result: Result<Validated, Error>) -> Self {
        match result {
            Ok(_) => Self::allowed(),
            Err(err) => err.into(),
        }
    }
}

/// Gatekeeper for user-supplied URLs.
///
/// Holds no mutable state; share one behind an `Arc` across request
/// handlers.
#[derive(Debug, Clone)]
pub struct Validator<R = SystemResolver> {
    resolver: R,
    blocklist: Blocklist,
    timeout: Duration,
    unmap_ipv4_mapped: bool,
}

impl Default for Validator<SystemResolver> {
    fn default() -> Self {
        Self::new(SystemResolver)
    }
}

impl<R: Resolve> Validator<R> {
    /// A validator using the built-in blocklist and default timeout.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            blocklist: Blocklist::default(),
            timeout: DEFAULT_DNS_TIMEOUT,
            unmap_ipv4_mapped: false,
        }
    }

    pub fn with_blocklist(mut self, blocklist: Blocklist) -> Self {
        self.blocklist = blocklist;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Classify `::ffff:a.b.c.d` as `a.b.c.d`. Off by default.
    pub fn with_ipv4_mapped_unmapping(mut self, enabled: bool) -> Self {
        self.unmap_ipv4_mapped = enabled;
        self
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate a URL, resolve DNS, and classify the resolved address.
    ///
    /// 1. Parses the URL and checks the scheme (no network access)
    /// 2. Resolves the host to one address, bounded by the timeout
    /// 3. Checks that address against the blocklist
    ///
    /// Only the first resolved address is checked. Callers should connect to
    /// [`Validated::ip`] rather than resolving the host again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is malformed or uses a forbidden scheme
    /// - DNS resolution fails or times out
    /// - The resolved IP is in a blocked range
    pub async fn check(&self, url: &str) -> Result<Validated, Error> {
        let safe_url = SafeUrl::parse(url)?;
        let host = safe_url.host();

        let ip = tokio::time::timeout(self.timeout, self.resolver.resolve(host))
            .await
            .map_err(|_| {
                Error::dns_error(
                    host,
                    format!(
                        "DNS resolution of {} timed out after {}ms",
                        host,
                        self.timeout.as_millis()
                    ),
                )
            })??;

        let classified = if self.unmap_ipv4_mapped {
            unmap_ipv4(ip)
        } else {
            ip
        };

        if let Some(range) = self.blocklist.matching_range(classified) {
            return Err(Error::blocked(url, ip, Some(*range)));
        }

        Ok(Validated {
            ip,
            host: host.to_string(),
            port: safe_url.port(),
            url: safe_url.as_str().to_string(),
            https: safe_url.is_https(),
        })
    }

    /// Run [`check`](Self::check) and collapse the outcome into a [`Verdict`].
    ///
    /// Never fails: every error becomes a denied verdict.
    pub async fn validate(&self, url: &str) -> Verdict {
        match self.check(url).await {
            Ok(validated) => {
                tracing::debug!(
                    url,
                    ip = %validated.ip,
                    family = AddressFamily::of(validated.ip).number(),
                    "URL allowed"
                );
                Verdict::allowed()
            }
            Err(err) => {
                match &err {
                    Error::Blocked {
                        ip,
                        range: Some(range),
                        ..
                    } => {
                        tracing::warn!(url, kind = err.kind(), ip = %ip, range = %range, "URL denied")
                    }
                    _ => tracing::warn!(url, kind = err.kind(), reason = %err, "URL denied"),
                }
                err.into()
            }
        }
    }
}

fn unmap_ipv4(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}

/// Validate a URL with the system resolver and built-in blocklist.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() {
/// let verdict = fetchgate::validate("http://169.254.169.254/latest/meta-data/").await;
/// assert!(!verdict.is_valid());
/// # }
/// ```
pub async fn validate(url: &str) -> Verdict {
    Validator::<SystemResolver>::default().validate(url).await
}

/// Synchronous version of [`validate`].
///
/// Works outside a Tokio runtime by creating a temporary one. Inside a
/// multi-threaded runtime the worker is moved off the scheduler with
/// `block_in_place`; inside a current-thread runtime, which cannot block in
/// place, the validation runs on a scoped thread with its own runtime.
pub fn validate_sync(url: &str) -> Verdict {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(validate(url)))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| validate_on_new_runtime(url))
                .join()
                .unwrap_or_else(|_| {
                    Error::dns_error("runtime", "validation thread panicked").into()
                })
        }),
        Err(_) => validate_on_new_runtime(url),
    }
}

fn validate_on_new_runtime(url: &str) -> Verdict {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(validate(url)),
        Err(e) => Error::dns_error("runtime", e.to_string()).into(),
    }
}

//! URL parsing, scheme check and host normalization.

use url::Url;

use crate::Error;

/// A parsed absolute http(s) URL with a normalized host.
///
/// This is the state of a URL before DNS resolution and address
/// classification. Use [`validate`](crate::validate) for the full check.
#[derive(Debug, Clone)]
pub struct SafeUrl {
    inner: Url,
    host: String,
}

impl SafeUrl {
    /// Parse a URL string.
    ///
    /// Only `http` and `https` are accepted. The scheme is checked before
    /// anything touches the network.
    ///
    /// Non-canonical IPv4 spellings (`0177.0.0.1`, `2130706433`,
    /// `0x7f000001`, `127.1`) are canonicalized by the WHATWG host parser,
    /// so the classifier always sees the dotted-quad form.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] for malformed input, [`Error::InvalidProtocol`]
    /// for any other scheme.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| Error::invalid_url(input, e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::invalid_protocol(input, scheme)),
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_url(input, "URL must have a host"))?;

        let normalized_host = normalize_host(host, input)?;

        Ok(Self {
            inner: url,
            host: normalized_host,
        })
    }

    /// Get the normalized hostname. IPv6 literals keep their brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port, defaulting to 80 for http and 443 for https.
    pub fn port(&self) -> u16 {
        self.inner.port_or_known_default().unwrap_or(80)
    }

    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn is_https(&self) -> bool {
        self.inner.scheme() == "https"
    }
}

/// Normalize a hostname: lowercase, remove trailing dot.
fn normalize_host(host: &str, original_url: &str) -> Result<String, Error> {
    let mut normalized = host.to_lowercase();

    // FQDN notation
    if normalized.ends_with('.') {
        normalized.pop();
    }

    if normalized.is_empty() {
        return Err(Error::invalid_url(original_url, "empty host"));
    }

    Ok(normalized)
}

//! Address parsing for transport endpoints.
//!
//! An address names an endpoint as `scheme://location`, optionally followed by a
//! path (`scheme://location/a/b`) or by another address separated with `//`
//! (`scheme1://loc1//scheme2://loc2/a`). The chained form means "reach `loc1` via
//! `scheme1`, then hand `scheme2://loc2/a` to it".
//!
//! Addresses are only ever split from the front: the first hop is parsed into an
//! [`Endpoint`] and the remainder is forwarded verbatim to whoever serves that hop.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::gateway::RoutingError;

/// Separator between the scheme and the location of an endpoint.
pub const SCHEME_SEPARATOR: &str = "://";

/// A single `scheme://location` hop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    scheme: String,
    location: String,
}

impl Endpoint {
    /// Create an endpoint, validating both parts.
    pub fn new(
        scheme: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, RoutingError> {
        let scheme = scheme.into();
        let location = location.into();
        let text = format!("{scheme}{SCHEME_SEPARATOR}{location}");
        if !is_valid_scheme(&scheme) {
            return Err(RoutingError::InvalidAddress {
                address: text,
                reason: "scheme must be non-empty and alphanumeric".to_string(),
            });
        }
        if location.is_empty() || location.contains('/') {
            return Err(RoutingError::InvalidAddress {
                address: text,
                reason: "location must be non-empty and contain no '/'".to_string(),
            });
        }
        Ok(Self { scheme, location })
    }

    /// The transport scheme, e.g. `http` or `vab`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The scheme-specific location, e.g. `127.0.0.1:6998`.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SCHEME_SEPARATOR}{}", self.scheme, self.location)
    }
}

impl FromStr for Endpoint {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (endpoint, remainder) = split_first_hop(s)?;
        if !remainder.is_empty() {
            return Err(RoutingError::InvalidAddress {
                address: s.to_string(),
                reason: "endpoint must not carry a path".to_string(),
            });
        }
        Ok(endpoint)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Returns true if the text starts with a `scheme://` hop.
///
/// Encoded paths never contain `:`, so this cannot misfire on an ordinary path.
///
/// ```rust
/// # use vab::address::is_address;
/// assert!(is_address("http://localhost:8080/a"));
/// assert!(is_address("/local://bus//vab://host:1"));
/// assert!(!is_address("a/b"));
/// assert!(!is_address("a/http://b"));
/// ```
pub fn is_address(text: &str) -> bool {
    let text = text.trim_start_matches('/');
    match text.find(SCHEME_SEPARATOR) {
        Some(idx) => is_valid_scheme(&text[..idx]),
        None => false,
    }
}

/// Splits the first hop off an address.
///
/// Returns the endpoint and the remainder with its leading separators removed.
/// The remainder is either an encoded path or a further chained address.
///
/// ```rust
/// # use vab::address::split_first_hop;
/// let (first, rest) = split_first_hop("vab://gw:6998//http://srv:80/a/b")?;
/// assert_eq!(first.to_string(), "vab://gw:6998");
/// assert_eq!(rest, "http://srv:80/a/b");
///
/// let (first, rest) = split_first_hop("http://srv:80/a/b")?;
/// assert_eq!(first.location(), "srv:80");
/// assert_eq!(rest, "a/b");
/// # Ok::<(), vab::gateway::RoutingError>(())
/// ```
pub fn split_first_hop(address: &str) -> Result<(Endpoint, &str), RoutingError> {
    let text = address.trim_start_matches('/');
    let idx = text
        .find(SCHEME_SEPARATOR)
        .ok_or_else(|| RoutingError::InvalidAddress {
            address: address.to_string(),
            reason: "missing '://'".to_string(),
        })?;
    let scheme = &text[..idx];
    let rest = &text[idx + SCHEME_SEPARATOR.len()..];
    let location_end = rest.find('/').unwrap_or(rest.len());
    let endpoint = Endpoint::new(scheme, &rest[..location_end])?;
    let remainder = rest[location_end..].trim_start_matches('/');
    Ok((endpoint, remainder))
}

/// Parses a full chain into its hops and the final path.
///
/// ```rust
/// # use vab::address::hops;
/// let (chain, path) = hops("vab://a:1//local://b/x/y")?;
/// let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
/// assert_eq!(chain, ["vab://a:1", "local://b"]);
/// assert_eq!(path, "x/y");
/// # Ok::<(), vab::gateway::RoutingError>(())
/// ```
pub fn hops(address: &str) -> Result<(Vec<Endpoint>, &str), RoutingError> {
    let mut chain = Vec::new();
    let mut rest = address;
    loop {
        let (endpoint, remainder) = split_first_hop(rest)?;
        chain.push(endpoint);
        if !is_address(remainder) {
            return Ok((chain, remainder));
        }
        rest = remainder;
    }
}

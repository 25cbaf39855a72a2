//! Value normalization for comparison.
//!
//! Configuration exports are full of cosmetic variance: `192.168.001.001`
//! and `192.168.1.1` name the same host, `0080` and `80` the same port,
//! `TCP` and `tcp` the same protocol. The functions in this module map raw
//! field values to a canonical form that is used only for equality checks;
//! the raw value is what gets reported.
//!
//! Every function is total. Input that cannot be interpreted is returned
//! unchanged, so the comparison degrades to a literal string comparison.
//! Every function is idempotent: `f(f(x)) == f(x)`.
//!
//! # Examples
//!
//! ```
//! use cfgdiff::normalize::{normalize_ip, normalize_port, normalize_protocol};
//!
//! assert_eq!(normalize_ip("010.000.000.000/8"), "10.0.0.0/8");
//! assert_eq!(normalize_port("0080-0443"), "80-443");
//! assert_eq!(normalize_protocol(" TCP "), "tcp");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// The normalization class applied to a field before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    /// IPv4, IPv6 or CIDR notation
    Ip,
    /// Single port or port range
    Port,
    /// Case-insensitive token (protocol names, actions, MAC addresses)
    Protocol,
    /// Filesystem path
    Path,
    /// Free text; whitespace-insensitive
    Text,
    /// Compared verbatim
    #[default]
    None,
}

impl NormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormKind::Ip => "ip",
            NormKind::Port => "port",
            NormKind::Protocol => "protocol",
            NormKind::Path => "path",
            NormKind::Text => "text",
            NormKind::None => "none",
        }
    }

    /// Parses a kind name as used in schema files.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ip" => Some(NormKind::Ip),
            "port" => Some(NormKind::Port),
            "protocol" => Some(NormKind::Protocol),
            "path" => Some(NormKind::Path),
            "text" => Some(NormKind::Text),
            "none" => Some(NormKind::None),
            _ => None,
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in comparison form, tagged with the kind that produced it.
///
/// Never shown to users; diffs always carry the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedValue {
    pub value: String,
    pub kind: NormKind,
}

/// Normalizes `raw` according to `kind`.
pub fn normalize(kind: NormKind, raw: &str) -> NormalizedValue {
    let value = match kind {
        NormKind::Ip => normalize_ip(raw),
        NormKind::Port => normalize_port(raw),
        NormKind::Protocol => normalize_protocol(raw),
        NormKind::Path => normalize_path(raw),
        NormKind::Text => normalize_whitespace(raw),
        NormKind::None => raw.to_string(),
    };
    NormalizedValue { value, kind }
}

/// Canonicalizes an IPv4 address, IPv6 address or CIDR block.
///
/// - IPv4: leading zeros are stripped from each octet (`001` → `1`,
///   `000` → `0`). Anything other than four all-digit octets, or a result
///   that is not a valid address, is returned unchanged.
/// - IPv6: emitted in compressed form (`2001:0db8::0001` → `2001:db8::1`).
/// - CIDR: only the address part is normalized; `/prefix` is kept verbatim.
///
/// # Examples
///
/// ```
/// use cfgdiff::normalize::normalize_ip;
///
/// assert_eq!(normalize_ip("192.168.001.001"), "192.168.1.1");
/// assert_eq!(normalize_ip("2001:0db8:0000:0000:0000:0000:0000:0001"), "2001:db8::1");
/// assert_eq!(normalize_ip("not-an-ip"), "not-an-ip");
/// ```
pub fn normalize_ip(s: &str) -> String {
    if let Some((addr, prefix)) = s.split_once('/') {
        return format!("{}/{}", normalize_address(addr), prefix);
    }
    normalize_address(s)
}

fn normalize_address(s: &str) -> String {
    if s.contains(':') {
        return match s.parse::<Ipv6Addr>() {
            Ok(addr) => addr.to_string(),
            Err(_) => s.to_string(),
        };
    }

    let octets: Vec<&str> = s.split('.').collect();
    if octets.len() != 4 || !octets.iter().all(|o| is_numeric(o)) {
        return s.to_string();
    }

    let stripped = octets
        .iter()
        .map(|o| strip_leading_zeros(o))
        .collect::<Vec<_>>()
        .join(".");

    match stripped.parse::<Ipv4Addr>() {
        Ok(_) => stripped,
        Err(_) => s.to_string(),
    }
}

/// Collapses runs of whitespace to a single space and trims both ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalizes a port or a `-`/`:` delimited port range.
///
/// Each side of a range loses its leading zeros only when it is purely
/// numeric, so free text that happens to contain a dash passes through.
///
/// # Examples
///
/// ```
/// use cfgdiff::normalize::normalize_port;
///
/// assert_eq!(normalize_port("0080"), "80");
/// assert_eq!(normalize_port("0080-0443"), "80-443");
/// assert_eq!(normalize_port("1024:02048"), "1024:2048");
/// assert_eq!(normalize_port("some-text"), "some-text");
/// ```
pub fn normalize_port(s: &str) -> String {
    match s.find(['-', ':']) {
        Some(idx) => {
            let (low, rest) = s.split_at(idx);
            let delimiter = &rest[..1];
            let high = &rest[1..];
            format!(
                "{}{}{}",
                normalize_port_side(low),
                delimiter,
                normalize_port_side(high)
            )
        }
        None => normalize_port_side(s),
    }
}

fn normalize_port_side(side: &str) -> String {
    if is_numeric(side) {
        strip_leading_zeros(side).to_string()
    } else {
        side.to_string()
    }
}

/// Lowercases and trims a protocol name.
pub fn normalize_protocol(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Collapses repeated slashes and strips trailing ones.
///
/// A path made only of slashes becomes `/`.
pub fn normalize_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }

    while out.ends_with('/') {
        out.pop();
    }

    if out.is_empty() && s.starts_with('/') {
        return "/".to_string();
    }
    out
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// Caller guarantees `s` is non-empty and all digits.
fn strip_leading_zeros(s: &str) -> &str {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

// ── Core identity types ──
//
// EntityId, PermAddr, and AuxId form the foundation of every domain type.
// A component is addressable by its network location (adapter + physical
// address) before registration, and additionally by a registry-assigned
// EntityId afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── EntityId ────────────────────────────────────────────────────────

/// Registry-assigned identifier for a Device or Gadget.
///
/// Opaque to consumers; only the registry store allocates these, at
/// registration time. A component that has never been registered has no
/// EntityId.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── PermAddr ────────────────────────────────────────────────────────

/// Permanent physical address of a device on its adapter's network,
/// normalized to lowercase colon-separated form (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermAddr(String);

impl PermAddr {
    /// Create a normalized address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PermAddr {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── AuxId ───────────────────────────────────────────────────────────

/// Auxiliary identifier of a gadget under its owning device.
///
/// Adapter-defined and opaque: an endpoint number, a cluster path, a
/// sensor slot name. Unique only within one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuxId(String);

impl AuxId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AuxId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ── Net keys ────────────────────────────────────────────────────────

/// Collection key for a device: `<adapter>/<address>`.
pub fn device_key(adapter: &str, address: &PermAddr) -> String {
    format!("{adapter}/{address}")
}

/// Collection key for a gadget: `<adapter>/<address>/<aux>`.
pub fn gadget_key(adapter: &str, address: &PermAddr, aux_id: &AuxId) -> String {
    format!("{adapter}/{address}/{aux_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn perm_addr_normalizes() {
        assert_eq!(PermAddr::new("00-11-22-AA").as_str(), "00:11:22:aa");
        assert_eq!(PermAddr::new("00:11").as_str(), "00:11");
    }

    #[test]
    fn perm_addr_from_str() {
        let addr: PermAddr = "AA:BB".parse().unwrap();
        assert_eq!(addr.as_str(), "aa:bb");
    }

    #[test]
    fn keys_embed_location() {
        let addr = PermAddr::new("00:11");
        assert_eq!(device_key("zig-net", &addr), "zig-net/00:11");
        assert_eq!(
            gadget_key("zig-net", &addr, &AuxId::new("temp/0")),
            "zig-net/00:11/temp/0"
        );
    }

    #[test]
    fn entity_id_display() {
        assert_eq!(EntityId::new(7).to_string(), "7");
    }
}

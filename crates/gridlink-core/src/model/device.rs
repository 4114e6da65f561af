// ── Device domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString};

use super::entity_id::{AuxId, EntityId, PermAddr};
use super::namespace::{AttrMap, NamespaceKind};

/// Network reachability of a device, as last reported by its adapter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NetStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

impl NetStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// A physical device on some adapter's network.
///
/// Identity is `(adapter, address)` until the registry assigns an
/// [`EntityId`]. A device record exists in the registry iff it has been
/// registered at least once; going offline never deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Registry id — `None` until registered.
    pub id: Option<EntityId>,
    /// Name of the owning adapter.
    pub adapter: String,
    /// Permanent physical address on the adapter's network.
    pub address: PermAddr,
    pub enabled: bool,

    /// Network state namespace. Holds the `"status"` key among others.
    #[serde(default)]
    pub net: AttrMap,
    /// User-facing properties.
    #[serde(default)]
    pub props: AttrMap,
    /// Reported attribute values.
    #[serde(default)]
    pub attrs: AttrMap,

    /// Gadgets owned by this device: auxiliary id to registry id.
    #[serde(default)]
    pub gadgets: BTreeMap<AuxId, EntityId>,

    /// Adapter-native payload snapshot from the last incoming event.
    #[serde(skip)]
    pub raw: Value,
    /// Opaque adapter-defined companion data.
    #[serde(skip)]
    pub extra: Value,

    /// When the registry first assigned an id.
    pub joined_at: Option<DateTime<Utc>>,
    /// Liveness marker, refreshed on every event that touches the device.
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// A fresh, unregistered candidate wrapping an adapter-native payload.
    /// Transforms fill in the namespaces before registration.
    pub fn draft(adapter: impl Into<String>, address: PermAddr, raw: Value) -> Self {
        Self {
            id: None,
            adapter: adapter.into(),
            address,
            enabled: false,
            net: AttrMap::new(),
            props: AttrMap::new(),
            attrs: AttrMap::new(),
            gadgets: BTreeMap::new(),
            raw,
            extra: Value::Null,
            joined_at: None,
            last_seen: None,
        }
    }

    /// Current status, parsed out of the `net` namespace.
    pub fn status(&self) -> NetStatus {
        self.net
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub(crate) fn namespace_mut(&mut self, kind: NamespaceKind) -> Option<&mut AttrMap> {
        match kind {
            NamespaceKind::Net => Some(&mut self.net),
            NamespaceKind::Props => Some(&mut self.props),
            NamespaceKind::Attrs => Some(&mut self.attrs),
            NamespaceKind::Panel => None,
        }
    }

    /// Plain-data summary for external consumers: identity plus namespaces,
    /// without the raw snapshot or any live references.
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "adapter": self.adapter,
            "address": self.address,
            "enabled": self.enabled,
            "status": self.status(),
            "net": self.net,
            "props": self.props,
            "attrs": self.attrs,
            "gadgets": self.gadgets,
        })
    }
}

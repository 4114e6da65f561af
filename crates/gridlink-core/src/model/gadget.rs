// ── Gadget domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity_id::{AuxId, EntityId, PermAddr};
use super::namespace::{AttrMap, NamespaceKind};

/// A functional sub-component of a device: one endpoint, sensor, switch,
/// or actuator.
///
/// Identity is `(adapter, address, aux_id)` until registered. A gadget is
/// never durably registered before its owning device holds an [`EntityId`] —
/// registration order is device-before-gadget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gadget {
    /// Registry id — `None` until registered.
    pub id: Option<EntityId>,
    /// Name of the owning adapter.
    pub adapter: String,
    /// Physical address of the owning device.
    pub address: PermAddr,
    /// Auxiliary id under the owning device.
    pub aux_id: AuxId,
    /// Registry id of the owning device, set at registration.
    pub device_id: Option<EntityId>,
    pub enabled: bool,

    /// Classification data: what this gadget is and how to present it.
    #[serde(default)]
    pub panel: AttrMap,
    /// User-facing properties.
    #[serde(default)]
    pub props: AttrMap,
    /// Reported attribute values.
    #[serde(default)]
    pub attrs: AttrMap,

    /// Adapter-native payload snapshot from the last incoming event.
    #[serde(skip)]
    pub raw: Value,
    /// Opaque adapter-defined companion data.
    #[serde(skip)]
    pub extra: Value,

    pub joined_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Gadget {
    /// A fresh, unregistered candidate under the given device location.
    pub fn draft(
        adapter: impl Into<String>,
        address: PermAddr,
        aux_id: AuxId,
        raw: Value,
    ) -> Self {
        Self {
            id: None,
            adapter: adapter.into(),
            address,
            aux_id,
            device_id: None,
            enabled: false,
            panel: AttrMap::new(),
            props: AttrMap::new(),
            attrs: AttrMap::new(),
            raw,
            extra: Value::Null,
            joined_at: None,
            last_seen: None,
        }
    }

    pub(crate) fn namespace_mut(&mut self, kind: NamespaceKind) -> Option<&mut AttrMap> {
        match kind {
            NamespaceKind::Panel => Some(&mut self.panel),
            NamespaceKind::Props => Some(&mut self.props),
            NamespaceKind::Attrs => Some(&mut self.attrs),
            NamespaceKind::Net => None,
        }
    }

    /// Plain-data summary for external consumers.
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "adapter": self.adapter,
            "address": self.address,
            "auxId": self.aux_id,
            "deviceId": self.device_id,
            "enabled": self.enabled,
            "panel": self.panel,
            "props": self.props,
            "attrs": self.attrs,
        })
    }
}

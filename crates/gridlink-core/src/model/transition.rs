// ── Derived state transitions ──
//
// A Transition is the canonical record of one registry state change. It is
// published as-is on the in-process bus (live Arc references plus delta
// data); `to_wire()` is the single projection to the external plain-data
// shape. The two shapes always describe the same logical transition.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use strum::{Display, IntoStaticStr};

use crate::adapter::LifecycleChange;

use super::device::{Device, NetStatus};
use super::entity_id::{AuxId, EntityId, PermAddr};
use super::gadget::Gadget;
use super::namespace::AttrMap;

/// Whether a banned component surfaced through an arrival or a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanPhase {
    Incoming,
    Reporting,
}

/// Derived event names, in `subject:action` key form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
pub enum EventKind {
    #[serde(rename = "device:arrived")]
    #[strum(serialize = "device:arrived")]
    DeviceArrived,
    #[serde(rename = "device:left")]
    #[strum(serialize = "device:left")]
    DeviceLeft,
    #[serde(rename = "device:net-changed")]
    #[strum(serialize = "device:net-changed")]
    DeviceNetChanged,
    #[serde(rename = "device:status-changed")]
    #[strum(serialize = "device:status-changed")]
    DeviceStatusChanged,
    #[serde(rename = "device:props-changed")]
    #[strum(serialize = "device:props-changed")]
    DevicePropsChanged,
    #[serde(rename = "device:attrs-changed")]
    #[strum(serialize = "device:attrs-changed")]
    DeviceAttrsChanged,
    #[serde(rename = "device:reporting")]
    #[strum(serialize = "device:reporting")]
    DeviceReporting,
    #[serde(rename = "gadget:arrived")]
    #[strum(serialize = "gadget:arrived")]
    GadgetArrived,
    #[serde(rename = "gadget:left")]
    #[strum(serialize = "gadget:left")]
    GadgetLeft,
    #[serde(rename = "gadget:panel-changed")]
    #[strum(serialize = "gadget:panel-changed")]
    GadgetPanelChanged,
    #[serde(rename = "gadget:props-changed")]
    #[strum(serialize = "gadget:props-changed")]
    GadgetPropsChanged,
    #[serde(rename = "gadget:attrs-changed")]
    #[strum(serialize = "gadget:attrs-changed")]
    GadgetAttrsChanged,
    #[serde(rename = "gadget:reporting")]
    #[strum(serialize = "gadget:reporting")]
    GadgetReporting,
    #[serde(rename = "device:banned-incoming")]
    #[strum(serialize = "device:banned-incoming")]
    DeviceBannedIncoming,
    #[serde(rename = "device:banned-reporting")]
    #[strum(serialize = "device:banned-reporting")]
    DeviceBannedReporting,
    #[serde(rename = "gadget:banned-incoming")]
    #[strum(serialize = "gadget:banned-incoming")]
    GadgetBannedIncoming,
    #[serde(rename = "gadget:banned-reporting")]
    #[strum(serialize = "gadget:banned-reporting")]
    GadgetBannedReporting,
    #[serde(rename = "adapter:error")]
    #[strum(serialize = "adapter:error")]
    AdapterError,
    #[serde(rename = "adapter:enabled")]
    #[strum(serialize = "adapter:enabled")]
    AdapterEnabled,
    #[serde(rename = "adapter:disabled")]
    #[strum(serialize = "adapter:disabled")]
    AdapterDisabled,
    #[serde(rename = "adapter:started")]
    #[strum(serialize = "adapter:started")]
    AdapterStarted,
    #[serde(rename = "adapter:stopped")]
    #[strum(serialize = "adapter:stopped")]
    AdapterStopped,
    #[serde(rename = "adapter:ready")]
    #[strum(serialize = "adapter:ready")]
    AdapterReady,
    #[serde(rename = "adapter:permit-join")]
    #[strum(serialize = "adapter:permit-join")]
    AdapterPermitJoin,
    #[serde(rename = "error")]
    #[strum(serialize = "error")]
    Error,
}

/// Canonical record of one state change, carrying live entity references
/// for in-process consumers.
#[derive(Debug, Clone)]
pub enum Transition {
    DeviceArrived { device: Arc<Device> },
    DeviceLeft { adapter: String, id: EntityId },
    DeviceNetChanged { device: Arc<Device>, delta: AttrMap },
    DeviceStatusChanged { device: Arc<Device>, status: NetStatus },
    DevicePropsChanged { device: Arc<Device>, delta: AttrMap },
    DeviceAttrsChanged { device: Arc<Device>, delta: AttrMap },
    DeviceReporting { device: Arc<Device>, attrs: AttrMap },
    GadgetArrived { gadget: Arc<Gadget> },
    GadgetLeft { adapter: String, id: EntityId },
    GadgetPanelChanged { gadget: Arc<Gadget>, delta: AttrMap },
    GadgetPropsChanged { gadget: Arc<Gadget>, delta: AttrMap },
    GadgetAttrsChanged { gadget: Arc<Gadget>, delta: AttrMap },
    GadgetReporting { gadget: Arc<Gadget>, attrs: AttrMap },
    DeviceBanned {
        phase: BanPhase,
        adapter: String,
        address: PermAddr,
        data: Value,
    },
    GadgetBanned {
        phase: BanPhase,
        adapter: String,
        address: PermAddr,
        aux_id: AuxId,
        data: Value,
    },
    Adapter {
        adapter: String,
        change: LifecycleChange,
    },
    Error {
        adapter: String,
        message: String,
    },
}

/// External event payload: adapter name, identifiers, and plain data only.
/// No live references cross this boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub kind: EventKind,
    pub adapter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PermAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_id: Option<AuxId>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl WireEvent {
    fn new(kind: EventKind, adapter: &str) -> Self {
        Self {
            kind,
            adapter: adapter.to_owned(),
            id: None,
            address: None,
            aux_id: None,
            data: Value::Null,
        }
    }
}

impl Transition {
    /// The derived event name for this transition.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DeviceArrived { .. } => EventKind::DeviceArrived,
            Self::DeviceLeft { .. } => EventKind::DeviceLeft,
            Self::DeviceNetChanged { .. } => EventKind::DeviceNetChanged,
            Self::DeviceStatusChanged { .. } => EventKind::DeviceStatusChanged,
            Self::DevicePropsChanged { .. } => EventKind::DevicePropsChanged,
            Self::DeviceAttrsChanged { .. } => EventKind::DeviceAttrsChanged,
            Self::DeviceReporting { .. } => EventKind::DeviceReporting,
            Self::GadgetArrived { .. } => EventKind::GadgetArrived,
            Self::GadgetLeft { .. } => EventKind::GadgetLeft,
            Self::GadgetPanelChanged { .. } => EventKind::GadgetPanelChanged,
            Self::GadgetPropsChanged { .. } => EventKind::GadgetPropsChanged,
            Self::GadgetAttrsChanged { .. } => EventKind::GadgetAttrsChanged,
            Self::GadgetReporting { .. } => EventKind::GadgetReporting,
            Self::DeviceBanned { phase, .. } => match phase {
                BanPhase::Incoming => EventKind::DeviceBannedIncoming,
                BanPhase::Reporting => EventKind::DeviceBannedReporting,
            },
            Self::GadgetBanned { phase, .. } => match phase {
                BanPhase::Incoming => EventKind::GadgetBannedIncoming,
                BanPhase::Reporting => EventKind::GadgetBannedReporting,
            },
            Self::Adapter { change, .. } => match change {
                LifecycleChange::Error { .. } => EventKind::AdapterError,
                LifecycleChange::Enabled => EventKind::AdapterEnabled,
                LifecycleChange::Disabled => EventKind::AdapterDisabled,
                LifecycleChange::Started => EventKind::AdapterStarted,
                LifecycleChange::Stopped => EventKind::AdapterStopped,
                LifecycleChange::Ready => EventKind::AdapterReady,
                LifecycleChange::PermitJoin { .. } => EventKind::AdapterPermitJoin,
            },
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// Project this transition into the external payload shape.
    ///
    /// This is the only place the wire shape is built — internal and wire
    /// payloads can never drift apart.
    pub fn to_wire(&self) -> WireEvent {
        let kind = self.kind();
        match self {
            Self::DeviceArrived { device } => {
                let mut ev = WireEvent::new(kind, &device.adapter);
                ev.id = device.id;
                ev.address = Some(device.address.clone());
                ev.data = device.summary();
                ev
            }
            Self::DeviceLeft { adapter, id } | Self::GadgetLeft { adapter, id } => {
                let mut ev = WireEvent::new(kind, adapter);
                ev.id = Some(*id);
                ev
            }
            Self::DeviceNetChanged { device, delta }
            | Self::DevicePropsChanged { device, delta }
            | Self::DeviceAttrsChanged { device, delta } => {
                let mut ev = WireEvent::new(kind, &device.adapter);
                ev.id = device.id;
                ev.data = Value::Object(delta.clone());
                ev
            }
            Self::DeviceStatusChanged { device, status } => {
                let mut ev = WireEvent::new(kind, &device.adapter);
                ev.id = device.id;
                ev.data = serde_json::json!({ "status": status });
                ev
            }
            Self::DeviceReporting { device, attrs } => {
                let mut ev = WireEvent::new(kind, &device.adapter);
                ev.id = device.id;
                ev.address = Some(device.address.clone());
                ev.data = Value::Object(attrs.clone());
                ev
            }
            Self::GadgetArrived { gadget } => {
                let mut ev = WireEvent::new(kind, &gadget.adapter);
                ev.id = gadget.id;
                ev.address = Some(gadget.address.clone());
                ev.aux_id = Some(gadget.aux_id.clone());
                ev.data = gadget.summary();
                ev
            }
            Self::GadgetPanelChanged { gadget, delta }
            | Self::GadgetPropsChanged { gadget, delta }
            | Self::GadgetAttrsChanged { gadget, delta } => {
                let mut ev = WireEvent::new(kind, &gadget.adapter);
                ev.id = gadget.id;
                ev.data = Value::Object(delta.clone());
                ev
            }
            Self::GadgetReporting { gadget, attrs } => {
                let mut ev = WireEvent::new(kind, &gadget.adapter);
                ev.id = gadget.id;
                ev.aux_id = Some(gadget.aux_id.clone());
                ev.data = Value::Object(attrs.clone());
                ev
            }
            Self::DeviceBanned {
                adapter,
                address,
                data,
                ..
            } => {
                let mut ev = WireEvent::new(kind, adapter);
                ev.address = Some(address.clone());
                ev.data = data.clone();
                ev
            }
            Self::GadgetBanned {
                adapter,
                address,
                aux_id,
                data,
                ..
            } => {
                let mut ev = WireEvent::new(kind, adapter);
                ev.address = Some(address.clone());
                ev.aux_id = Some(aux_id.clone());
                ev.data = data.clone();
                ev
            }
            Self::Adapter { adapter, change } => {
                let mut ev = WireEvent::new(kind, adapter);
                ev.data = change.payload();
                ev
            }
            Self::Error { adapter, message } => {
                let mut ev = WireEvent::new(kind, adapter);
                ev.data = serde_json::json!({ "message": message });
                ev
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::PermAddr;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn event_kind_key_form() {
        assert_eq!(EventKind::DeviceArrived.to_string(), "device:arrived");
        assert_eq!(
            EventKind::GadgetBannedReporting.to_string(),
            "gadget:banned-reporting"
        );
    }

    #[test]
    fn wire_projection_strips_live_references() {
        let mut device = Device::draft("zig-net", PermAddr::new("00:11"), json!({"x": 1}));
        device.id = Some(crate::model::EntityId::new(3));

        let t = Transition::DeviceArrived {
            device: Arc::new(device),
        };
        let wire = t.to_wire();

        assert_eq!(wire.kind, EventKind::DeviceArrived);
        assert_eq!(wire.adapter, "zig-net");
        assert_eq!(wire.id.unwrap().as_u64(), 3);
        // the raw snapshot never crosses the wire boundary
        assert!(wire.data.get("raw").is_none());

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["kind"], json!("device:arrived"));
    }

    #[test]
    fn banned_wire_payload_is_location_only() {
        let t = Transition::DeviceBanned {
            phase: BanPhase::Reporting,
            adapter: "zig-net".into(),
            address: PermAddr::new("00:11"),
            data: json!({"temp": 20}),
        };
        let wire = t.to_wire();
        assert_eq!(wire.kind, EventKind::DeviceBannedReporting);
        assert!(wire.id.is_none());
        assert_eq!(wire.data, json!({"temp": 20}));
    }
}

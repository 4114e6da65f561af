// ── Hardware adapter contract ──
//
// An adapter fronts one physical network of devices. It feeds raw events
// into the mediator and supplies the transforms ("cooks") that turn
// adapter-native payloads into registry-shape records. Transform absence is
// a permanent configuration error, reported per event and never retried.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransformError;
use crate::model::{AttrMap, AuxId, Device, Gadget, PermAddr};

/// Converts a raw device payload into a registry-shape [`Device`].
///
/// The draft carries identity and the raw snapshot; the transform fills in
/// the namespaces.
#[async_trait]
pub trait DeviceTransform: Send + Sync {
    async fn cook(&self, draft: Device, raw: &Value) -> Result<Device, TransformError>;
}

/// Converts a raw gadget payload into a registry-shape [`Gadget`].
#[async_trait]
pub trait GadgetTransform: Send + Sync {
    async fn cook(&self, draft: Gadget, raw: &Value) -> Result<Gadget, TransformError>;
}

/// One pluggable hardware network.
pub trait Adapter: Send + Sync {
    /// Unique adapter name; forms the first half of every net key.
    fn name(&self) -> &str;

    /// Whether the network currently accepts new components. When false,
    /// arrivals of unknown components are dropped silently.
    fn permits_join(&self) -> bool;

    /// The device transform, if the adapter implements one.
    fn device_transform(&self) -> Option<&dyn DeviceTransform>;

    /// The gadget transform, if the adapter implements one.
    fn gadget_transform(&self) -> Option<&dyn GadgetTransform>;
}

/// How a device left the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Dropped off the network; the record stays, flipped to offline.
    Departed,
    /// Explicit removal: unregister the device and cascade to its gadgets.
    Removed,
}

impl RemovalMode {
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// Adapter lifecycle notifications, passed through to consumers unchanged.
#[derive(Debug, Clone)]
pub enum LifecycleChange {
    Error { message: String },
    Enabled,
    Disabled,
    Started,
    Stopped,
    Ready,
    PermitJoin { time_left_secs: u64 },
}

impl LifecycleChange {
    /// Plain-data payload for the wire shape.
    pub fn payload(&self) -> Value {
        match self {
            Self::Error { message } => serde_json::json!({ "message": message }),
            Self::PermitJoin { time_left_secs } => {
                serde_json::json!({ "timeLeft": time_left_secs })
            }
            Self::Enabled | Self::Disabled | Self::Started | Self::Stopped | Self::Ready => {
                Value::Null
            }
        }
    }
}

/// Raw events flowing from adapters into the mediator.
///
/// Each carries the originating adapter so handlers can reach its join
/// policy and transforms without any global lookup.
#[derive(Clone)]
pub enum AdapterEvent {
    DeviceIncoming {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        raw: Value,
    },
    DeviceLeaving {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        removal: RemovalMode,
    },
    DeviceNetChanging {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        delta: AttrMap,
    },
    DeviceReporting {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        attrs: AttrMap,
    },
    GadgetIncoming {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        aux_id: AuxId,
        raw: Value,
    },
    GadgetReporting {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        aux_id: AuxId,
        attrs: AttrMap,
        append: bool,
    },
    BannedDeviceIncoming {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        raw: Value,
    },
    BannedDeviceReporting {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        attrs: AttrMap,
    },
    BannedGadgetIncoming {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        aux_id: AuxId,
        raw: Value,
    },
    BannedGadgetReporting {
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        aux_id: AuxId,
        attrs: AttrMap,
    },
    Lifecycle {
        adapter: Arc<dyn Adapter>,
        change: LifecycleChange,
    },
}

impl std::fmt::Debug for AdapterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (name, adapter) = match self {
            Self::DeviceIncoming { adapter, .. } => ("DeviceIncoming", adapter),
            Self::DeviceLeaving { adapter, .. } => ("DeviceLeaving", adapter),
            Self::DeviceNetChanging { adapter, .. } => ("DeviceNetChanging", adapter),
            Self::DeviceReporting { adapter, .. } => ("DeviceReporting", adapter),
            Self::GadgetIncoming { adapter, .. } => ("GadgetIncoming", adapter),
            Self::GadgetReporting { adapter, .. } => ("GadgetReporting", adapter),
            Self::BannedDeviceIncoming { adapter, .. } => ("BannedDeviceIncoming", adapter),
            Self::BannedDeviceReporting { adapter, .. } => ("BannedDeviceReporting", adapter),
            Self::BannedGadgetIncoming { adapter, .. } => ("BannedGadgetIncoming", adapter),
            Self::BannedGadgetReporting { adapter, .. } => ("BannedGadgetReporting", adapter),
            Self::Lifecycle { adapter, .. } => ("Lifecycle", adapter),
        };
        f.debug_struct(name)
            .field("adapter", &adapter.name())
            .finish_non_exhaustive()
    }
}

// ── Simulated hardware network ──
//
// A self-contained adapter for demos and end-to-end exercising of the
// mediator. Raw payloads are JSON objects with optional `net`, `attrs`,
// `panel`, and `extra` sections; the transforms copy them into the
// corresponding domain namespaces.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use gridlink_core::{
    Adapter, AdapterEvent, AuxId, Device, DeviceTransform, Gadget, GadgetTransform,
    LifecycleChange, PermAddr, TransformError,
};

/// Copies the `net` and `attrs` sections of a raw payload into the device
/// record. A `defect` key simulates a transform failure.
struct SimDeviceTransform;

#[async_trait]
impl DeviceTransform for SimDeviceTransform {
    async fn cook(&self, mut draft: Device, raw: &Value) -> Result<Device, TransformError> {
        if let Some(defect) = raw.get("defect").and_then(Value::as_str) {
            return Err(TransformError::new(format!("simulated defect: {defect}")));
        }
        if let Some(net) = raw.get("net").and_then(Value::as_object) {
            draft.net = net.clone();
        }
        if let Some(attrs) = raw.get("attrs").and_then(Value::as_object) {
            draft.attrs = attrs.clone();
        }
        draft.extra = raw.get("extra").cloned().unwrap_or(Value::Null);
        Ok(draft)
    }
}

/// Copies the `panel` and `attrs` sections of a raw payload into the
/// gadget record.
struct SimGadgetTransform;

#[async_trait]
impl GadgetTransform for SimGadgetTransform {
    async fn cook(&self, mut draft: Gadget, raw: &Value) -> Result<Gadget, TransformError> {
        if let Some(defect) = raw.get("defect").and_then(Value::as_str) {
            return Err(TransformError::new(format!("simulated defect: {defect}")));
        }
        if let Some(panel) = raw.get("panel").and_then(Value::as_object) {
            draft.panel = panel.clone();
        }
        if let Some(attrs) = raw.get("attrs").and_then(Value::as_object) {
            draft.attrs = attrs.clone();
        }
        draft.extra = raw.get("extra").cloned().unwrap_or(Value::Null);
        Ok(draft)
    }
}

/// A simulated hardware network.
pub struct SimAdapter {
    name: String,
    permit_join: AtomicBool,
    device_transform: SimDeviceTransform,
    gadget_transform: SimGadgetTransform,
}

impl SimAdapter {
    pub fn new(name: impl Into<String>, permit_join: bool) -> Self {
        Self {
            name: name.into(),
            permit_join: AtomicBool::new(permit_join),
            device_transform: SimDeviceTransform,
            gadget_transform: SimGadgetTransform,
        }
    }

    /// Open or close the network for new components.
    pub fn set_permit_join(&self, permit: bool) {
        self.permit_join.store(permit, Ordering::Relaxed);
    }
}

impl Adapter for SimAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn permits_join(&self) -> bool {
        self.permit_join.load(Ordering::Relaxed)
    }

    fn device_transform(&self) -> Option<&dyn DeviceTransform> {
        Some(&self.device_transform)
    }

    fn gadget_transform(&self) -> Option<&dyn GadgetTransform> {
        Some(&self.gadget_transform)
    }
}

/// Feed a small scripted topology through the mediator: one device with a
/// temperature gadget joins, then reports a slowly drifting reading every
/// `period` until cancelled.
pub fn spawn_traffic(
    adapter: Arc<SimAdapter>,
    events: mpsc::Sender<AdapterEvent>,
    cancel: CancellationToken,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let address = PermAddr::new("00:11:22:33");
        let aux_id = AuxId::new("temp/0");
        let dyn_adapter: Arc<dyn Adapter> = Arc::clone(&adapter) as Arc<dyn Adapter>;

        let script = [
            AdapterEvent::Lifecycle {
                adapter: Arc::clone(&dyn_adapter),
                change: LifecycleChange::Started,
            },
            AdapterEvent::Lifecycle {
                adapter: Arc::clone(&dyn_adapter),
                change: LifecycleChange::Ready,
            },
            AdapterEvent::DeviceIncoming {
                adapter: Arc::clone(&dyn_adapter),
                address: address.clone(),
                raw: json!({
                    "net": { "status": "online", "role": "router" },
                    "attrs": { "manufacturer": "simco", "model": "sim-1" },
                }),
            },
            AdapterEvent::GadgetIncoming {
                adapter: Arc::clone(&dyn_adapter),
                address: address.clone(),
                aux_id: aux_id.clone(),
                raw: json!({
                    "panel": { "class": "temperature" },
                    "attrs": { "unit": "celsius" },
                }),
            },
        ];
        for event in script {
            if events.send(event).await.is_err() {
                return;
            }
        }

        let mut ticker = tokio::time::interval(period);
        let mut reading = 200i64; // tenths of a degree
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            reading += if reading % 3 == 0 { 1 } else { -1 };
            let report = AdapterEvent::GadgetReporting {
                adapter: Arc::clone(&dyn_adapter),
                address: address.clone(),
                aux_id: aux_id.clone(),
                attrs: json!({ "temp": reading })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                append: false,
            };
            if events.send(report).await.is_err() {
                break;
            }
        }
        debug!(adapter = adapter.name(), "sim traffic stopped");
    })
}

// ── Mediator ──
//
// Turns the raw, out-of-order event stream from hardware adapters into
// consistent, deduplicated registry state, republishing every state
// transition on the event bus. One explicit instance owns references to the
// store and the bus; there is no process-wide handler state.

mod banned;
mod device;
mod gadget;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::AdapterEvent;
use crate::bus::EventBus;
use crate::error::{CoreError, StoreError};
use crate::model::{AttrMap, EntityId, NamespaceKind, NetStatus, Transition};
use crate::store::RegistryStore;

/// Default bounded wait for a pending device registration before a
/// dependent gadget arrival is discarded.
pub const DEFAULT_REGISTRATION_WAIT: Duration = Duration::from_secs(1);

/// Tuning knobs for a [`Mediator`].
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    /// How long a gadget arrival waits for its device's registration to
    /// complete before the event is silently discarded.
    pub registration_wait: Duration,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            registration_wait: DEFAULT_REGISTRATION_WAIT,
        }
    }
}

/// The mediation core: a set of event handlers bound to adapter-originated
/// events, resolving identity, invoking adapter transforms, mutating the
/// registry store, and emitting derived transitions.
pub struct Mediator {
    store: Arc<RegistryStore>,
    bus: EventBus,
    config: MediatorConfig,
    /// Device registrations currently in flight, keyed by net key. Gadget
    /// arrivals for the same address await the signal instead of polling.
    pending: DashMap<String, watch::Sender<Option<EntityId>>>,
}

impl Mediator {
    pub fn new(store: Arc<RegistryStore>, bus: EventBus, config: MediatorConfig) -> Self {
        Self {
            store,
            bus,
            config,
            pending: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Consume adapter events until the channel closes or `cancel` fires.
    ///
    /// Each event is handled on its own task: a slow transform or a
    /// registration wait never serializes unrelated events behind it.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<AdapterEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let mediator = Arc::clone(&self);
                    tokio::spawn(async move { mediator.handle(event).await });
                }
            }
        }
        debug!("mediator dispatch loop stopped");
    }

    /// Handle a single adapter event to completion.
    ///
    /// Failures are scoped to this event: they surface as error transitions
    /// on the bus, never as a crashed mediator.
    pub async fn handle(&self, event: AdapterEvent) {
        match event {
            AdapterEvent::DeviceIncoming { adapter, address, raw } => {
                self.device_incoming(adapter, address, raw).await;
            }
            AdapterEvent::DeviceLeaving { adapter, address, removal } => {
                self.device_leaving(adapter.as_ref(), &address, removal);
            }
            AdapterEvent::DeviceNetChanging { adapter, address, delta } => {
                self.device_net_changing(adapter.as_ref(), &address, &delta);
            }
            AdapterEvent::DeviceReporting { adapter, address, attrs } => {
                self.device_reporting(adapter.as_ref(), &address, attrs);
            }
            AdapterEvent::GadgetIncoming { adapter, address, aux_id, raw } => {
                self.gadget_incoming(adapter, address, aux_id, raw).await;
            }
            AdapterEvent::GadgetReporting { adapter, address, aux_id, attrs, append } => {
                self.gadget_reporting(adapter.as_ref(), &address, &aux_id, attrs, append);
            }
            AdapterEvent::BannedDeviceIncoming { adapter, address, raw } => {
                self.banned_device(adapter.as_ref(), &address, crate::model::BanPhase::Incoming, raw);
            }
            AdapterEvent::BannedDeviceReporting { adapter, address, attrs } => {
                self.banned_device(
                    adapter.as_ref(),
                    &address,
                    crate::model::BanPhase::Reporting,
                    serde_json::Value::Object(attrs),
                );
            }
            AdapterEvent::BannedGadgetIncoming { adapter, address, aux_id, raw } => {
                self.banned_gadget(
                    adapter.as_ref(),
                    &address,
                    &aux_id,
                    crate::model::BanPhase::Incoming,
                    raw,
                );
            }
            AdapterEvent::BannedGadgetReporting { adapter, address, aux_id, attrs } => {
                self.banned_gadget(
                    adapter.as_ref(),
                    &address,
                    &aux_id,
                    crate::model::BanPhase::Reporting,
                    serde_json::Value::Object(attrs),
                );
            }
            AdapterEvent::Lifecycle { adapter, change } => {
                self.bus.publish(Transition::Adapter {
                    adapter: adapter.name().to_owned(),
                    change,
                });
            }
        }
    }

    // ── Shared helpers ───────────────────────────────────────────────

    /// Report a handler failure: log it and publish a single error
    /// transition (the same message serves both channels).
    pub(crate) fn report(&self, adapter: &str, err: &CoreError) {
        warn!(adapter, error = %err, "event handling failed");
        self.bus.publish(Transition::Error {
            adapter: adapter.to_owned(),
            message: err.to_string(),
        });
    }

    /// Merge `delta` into a device namespace and publish the corresponding
    /// changed transition for the fields that actually differed. A `net`
    /// diff containing a `status` field additionally publishes the
    /// dedicated status transition, after the generic one.
    pub(crate) fn apply_device_namespace(
        &self,
        id: EntityId,
        kind: NamespaceKind,
        delta: &AttrMap,
    ) -> Result<(), StoreError> {
        let diff = self.store.modify_device(id, kind, delta)?;
        self.publish_device_diff(id, kind, diff);
        Ok(())
    }

    /// Publish changed transition(s) for a non-empty device diff.
    fn publish_device_diff(&self, id: EntityId, kind: NamespaceKind, diff: AttrMap) {
        if diff.is_empty() {
            return;
        }
        let Some(device) = self.store.device_by_id(id) else {
            return;
        };
        let status = diff
            .get("status")
            .and_then(serde_json::Value::as_str)
            .map(|s| s.parse::<NetStatus>().unwrap_or_default());

        let transition = match kind {
            NamespaceKind::Net => Transition::DeviceNetChanged {
                device: Arc::clone(&device),
                delta: diff,
            },
            NamespaceKind::Props => Transition::DevicePropsChanged {
                device: Arc::clone(&device),
                delta: diff,
            },
            NamespaceKind::Attrs => Transition::DeviceAttrsChanged {
                device: Arc::clone(&device),
                delta: diff,
            },
            NamespaceKind::Panel => return,
        };
        self.bus.publish(transition);

        if kind == NamespaceKind::Net {
            if let Some(status) = status {
                self.bus.publish(Transition::DeviceStatusChanged { device, status });
            }
        }
    }

    /// Merge `delta` into a gadget namespace and publish the corresponding
    /// changed transition for the fields that actually differed.
    pub(crate) fn apply_gadget_namespace(
        &self,
        id: EntityId,
        kind: NamespaceKind,
        delta: &AttrMap,
    ) -> Result<(), StoreError> {
        let diff = self.store.modify_gadget(id, kind, delta)?;
        if diff.is_empty() {
            return Ok(());
        }
        let Some(gadget) = self.store.gadget_by_id(id) else {
            return Ok(());
        };
        let transition = match kind {
            NamespaceKind::Panel => Transition::GadgetPanelChanged { gadget, delta: diff },
            NamespaceKind::Props => Transition::GadgetPropsChanged { gadget, delta: diff },
            NamespaceKind::Attrs => Transition::GadgetAttrsChanged { gadget, delta: diff },
            NamespaceKind::Net => return Ok(()),
        };
        self.bus.publish(transition);
        Ok(())
    }

    /// Overwrite a device's props namespace (replace-with-diff) and publish
    /// the change if anything differed.
    pub fn set_device_props(&self, id: EntityId, props: AttrMap) -> Result<(), CoreError> {
        let diff = self.store.replace_device(id, NamespaceKind::Props, props)?;
        self.publish_device_diff(id, NamespaceKind::Props, diff);
        Ok(())
    }

    /// Overwrite a gadget's props namespace (replace-with-diff) and publish
    /// the change if anything differed.
    pub fn set_gadget_props(&self, id: EntityId, props: AttrMap) -> Result<(), CoreError> {
        let diff = self.store.replace_gadget(id, NamespaceKind::Props, props)?;
        if diff.is_empty() {
            return Ok(());
        }
        if let Some(gadget) = self.store.gadget_by_id(id) {
            self.bus
                .publish(Transition::GadgetPropsChanged { gadget, delta: diff });
        }
        Ok(())
    }

    /// Force a device online through the diff path; emits net/status
    /// transitions only when the device was not already online.
    pub(crate) fn force_online(&self, adapter: &str, id: EntityId) {
        let mut delta = AttrMap::new();
        delta.insert("status".into(), serde_json::Value::String("online".into()));
        if let Err(err) = self.apply_device_namespace(id, NamespaceKind::Net, &delta) {
            self.report(adapter, &err.into());
        }
    }

    // ── Pending registration signalling ──────────────────────────────

    /// Announce an in-flight device registration. The returned guard must
    /// be fulfilled with the assigned id on success; dropping it (on any
    /// exit path) closes the signal so waiters give up immediately.
    pub(crate) fn announce_pending(&self, key: String) -> PendingGuard<'_> {
        let (tx, _) = watch::channel(None);
        self.pending.insert(key.clone(), tx);
        PendingGuard {
            pending: &self.pending,
            key,
        }
    }

    /// Subscribe to an in-flight registration for `key`, if any.
    pub(crate) fn pending_signal(&self, key: &str) -> Option<watch::Receiver<Option<EntityId>>> {
        self.pending.get(key).map(|entry| entry.value().subscribe())
    }
}

/// Removal guard for a pending-registration entry.
pub(crate) struct PendingGuard<'a> {
    pending: &'a DashMap<String, watch::Sender<Option<EntityId>>>,
    key: String,
}

impl PendingGuard<'_> {
    /// Signal waiters that the device now holds a registry id.
    pub(crate) fn fulfill(&self, id: EntityId) {
        if let Some(entry) = self.pending.get(&self.key) {
            let _ = entry.value().send(Some(id));
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

// ── Gadget lifecycle handlers ──
//
// Gadget arrival is the one place two logically concurrent streams race:
// "this device's arrival" and "this device's gadget's arrival". Ordering is
// enforced by awaiting the pending-registration signal with a bounded
// timeout, never by locking.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

use crate::adapter::Adapter;
use crate::error::CoreError;
use crate::model::{AttrMap, AuxId, Device, Gadget, NamespaceKind, PermAddr, Transition, device_key};

use super::Mediator;

impl Mediator {
    /// Resolve the owning device, waiting out an in-flight registration.
    ///
    /// Returns `None` when the device is unknown and nothing is pending,
    /// when the pending registration fails, or when the bounded wait
    /// elapses — all of which silently discard the dependent event.
    async fn resolve_owner(&self, adapter_name: &str, address: &PermAddr) -> Option<Arc<Device>> {
        if let Some(device) = self.store().device_by_net(adapter_name, address) {
            return Some(device);
        }

        let key = device_key(adapter_name, address);
        let mut signal = self.pending_signal(&key)?;

        let wait = self.config.registration_wait;
        match timeout(wait, signal.wait_for(Option::is_some)).await {
            Ok(Ok(_)) => {}
            // Registration failed (signal closed) or never completed within
            // the budget. Expected race outcome under churn, not an error.
            Ok(Err(_)) | Err(_) => {
                debug!(adapter = adapter_name, %address, "owner registration did not complete");
            }
        }
        // One final resolve either way: the record may have landed right at
        // the boundary.
        self.store().device_by_net(adapter_name, address)
    }

    /// A gadget announced itself under a device.
    pub(super) async fn gadget_incoming(
        &self,
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        aux_id: AuxId,
        raw: Value,
    ) {
        let adapter_name = adapter.name().to_owned();

        let Some(device) = self.resolve_owner(&adapter_name, &address).await else {
            return; // a gadget cannot arrive before its device
        };
        let Some(device_id) = device.id else { return };

        self.store().poke_device(device_id);
        self.force_online(&adapter_name, device_id);

        let Some(transform) = adapter.gadget_transform() else {
            self.report(
                &adapter_name,
                &CoreError::MissingTransform {
                    adapter: adapter_name.clone(),
                    entity: "gadget",
                },
            );
            return;
        };

        let draft = Gadget::draft(&adapter_name, address.clone(), aux_id.clone(), raw.clone());
        let cooked = match transform.cook(draft, &raw).await {
            Ok(cooked) => cooked,
            Err(source) => {
                self.report(
                    &adapter_name,
                    &CoreError::TransformFailed {
                        adapter: adapter_name.clone(),
                        source,
                    },
                );
                return;
            }
        };

        // Re-resolve after the await.
        if let Some(existing) = self.store().gadget_by_net(&adapter_name, &address, &aux_id) {
            self.refresh_gadget(&adapter_name, &existing, cooked);
        } else if adapter.permits_join() {
            match self.store().register_gadget(cooked) {
                Ok(id) => {
                    if let Some(gadget) = self.store().gadget_by_id(id) {
                        self.bus().publish(Transition::GadgetArrived { gadget });
                    }
                }
                Err(err) => self.report(&adapter_name, &err.into()),
            }
        } else {
            debug!(adapter = %adapter_name, %address, %aux_id, "join not permitted, dropping gadget");
        }
    }

    /// Same gadget, fresh payload: refresh identity and merge panel and
    /// attrs through the diff path.
    fn refresh_gadget(&self, adapter_name: &str, existing: &Gadget, cooked: Gadget) {
        let Some(id) = existing.id else { return };

        self.store().poke_gadget(id);
        self.store()
            .refresh_gadget_identity(id, cooked.raw, cooked.extra);

        if let Err(err) = self.apply_gadget_namespace(id, NamespaceKind::Panel, &cooked.panel) {
            self.report(adapter_name, &err.into());
        }
        if let Err(err) = self.apply_gadget_namespace(id, NamespaceKind::Attrs, &cooked.attrs) {
            self.report(adapter_name, &err.into());
        }
    }

    /// Internal removal path: every gadget removal — manual device removal
    /// cascade or a ban — funnels through here.
    pub(super) fn gadget_leaving(&self, adapter_name: &str, gadget: &Gadget) {
        let Some(id) = gadget.id else { return };

        match self.store().unregister_gadget(id) {
            Ok(_) => {
                self.bus().publish(Transition::GadgetLeft {
                    adapter: adapter_name.to_owned(),
                    id,
                });
            }
            Err(err) => {
                // If unregistration fails the gadget stays registered.
                self.report(adapter_name, &err.into());
            }
        }
    }

    /// A gadget reported attribute values.
    ///
    /// Replace mode merges with diff and stays quiet when nothing changed;
    /// append mode inserts missing keys and always announces the delivery.
    pub(super) fn gadget_reporting(
        &self,
        adapter: &dyn Adapter,
        address: &PermAddr,
        aux_id: &AuxId,
        attrs: AttrMap,
        append: bool,
    ) {
        let adapter_name = adapter.name();

        if let Some(device) = self.store().device_by_net(adapter_name, address) {
            if let Some(device_id) = device.id {
                self.store().poke_device(device_id);
                self.force_online(adapter_name, device_id);
            }
        }

        let Some(gadget) = self.store().gadget_by_net(adapter_name, address, aux_id) else {
            return;
        };
        let Some(id) = gadget.id else { return };

        if let Some(gadget) = self.store().gadget_by_id(id) {
            self.bus().publish(Transition::GadgetReporting {
                gadget,
                attrs: attrs.clone(),
            });
        }

        if append {
            match self.store().append_gadget_attrs(id, &attrs) {
                Ok(()) => {
                    // Append is always-meaningful: announce the full delta
                    // even when every key already existed.
                    if let Some(gadget) = self.store().gadget_by_id(id) {
                        self.bus()
                            .publish(Transition::GadgetAttrsChanged { gadget, delta: attrs });
                    }
                }
                Err(err) => self.report(adapter_name, &err.into()),
            }
        } else if let Err(err) = self.apply_gadget_namespace(id, NamespaceKind::Attrs, &attrs) {
            self.report(adapter_name, &err.into());
        }
    }
}

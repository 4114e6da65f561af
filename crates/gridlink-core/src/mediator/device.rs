// ── Device lifecycle handlers ──

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::adapter::{Adapter, RemovalMode};
use crate::error::CoreError;
use crate::model::{AttrMap, Device, NamespaceKind, PermAddr, Transition, device_key};

use super::Mediator;

impl Mediator {
    /// A device announced itself on an adapter's network.
    ///
    /// Known device: reconnection — refresh identity and merge changes, no
    /// arrival event. Unknown device on a joining-enabled adapter: cook,
    /// register, announce. Unknown device otherwise: dropped.
    pub(super) async fn device_incoming(
        &self,
        adapter: Arc<dyn Adapter>,
        address: PermAddr,
        raw: Value,
    ) {
        let adapter_name = adapter.name().to_owned();

        let Some(transform) = adapter.device_transform() else {
            self.report(
                &adapter_name,
                &CoreError::MissingTransform {
                    adapter: adapter_name.clone(),
                    entity: "device",
                },
            );
            return;
        };

        // Announce the in-flight registration before the first await so a
        // concurrently arriving gadget for this address can wait on it.
        let guard = self
            .store()
            .device_by_net(&adapter_name, &address)
            .is_none()
            .then(|| self.announce_pending(device_key(&adapter_name, &address)));

        let draft = Device::draft(&adapter_name, address.clone(), raw.clone());
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

        // Re-resolve after the await: the record may have appeared while
        // the transform ran.
        if let Some(existing) = self.store().device_by_net(&adapter_name, &address) {
            self.reconnect_device(&adapter_name, &existing, cooked);
        } else if adapter.permits_join() {
            match self.store().register_device(cooked) {
                Ok(id) => {
                    if let Some(guard) = &guard {
                        guard.fulfill(id);
                    }
                    if let Some(device) = self.store().device_by_id(id) {
                        self.bus().publish(Transition::DeviceArrived { device });
                    }
                }
                Err(err) => {
                    // The candidate is discarded; the adapter is not asked
                    // to resend.
                    self.report(&adapter_name, &err.into());
                }
            }
        } else {
            debug!(adapter = %adapter_name, %address, "join not permitted, dropping device");
        }
    }

    /// Apply a reconnection: same identity, fresh payload. Changes flow
    /// through the diff path, so only fields that differ produce events.
    fn reconnect_device(&self, adapter_name: &str, existing: &Device, cooked: Device) {
        let Some(id) = existing.id else { return };

        self.store().poke_device(id);
        self.store()
            .refresh_device_identity(id, cooked.raw, cooked.extra);

        if let Err(err) = self.apply_device_namespace(id, NamespaceKind::Net, &cooked.net) {
            self.report(adapter_name, &err.into());
        }
        if let Err(err) = self.apply_device_namespace(id, NamespaceKind::Attrs, &cooked.attrs) {
            self.report(adapter_name, &err.into());
        }
        self.force_online(adapter_name, id);
    }

    /// A device dropped off an adapter's network.
    ///
    /// The record flips to offline and stays; only an explicit removal
    /// unregisters it, cascading through its gadgets first.
    pub(super) fn device_leaving(
        &self,
        adapter: &dyn Adapter,
        address: &PermAddr,
        removal: RemovalMode,
    ) {
        let adapter_name = adapter.name();
        let Some(device) = self.store().device_by_net(adapter_name, address) else {
            return;
        };
        let Some(id) = device.id else { return };

        self.store().poke_device(id);

        let mut offline = AttrMap::new();
        offline.insert("status".into(), Value::String("offline".into()));
        if let Err(err) = self.apply_device_namespace(id, NamespaceKind::Net, &offline) {
            self.report(adapter_name, &err.into());
        }

        if !removal.is_manual() {
            return;
        }

        // Cascade: every owned gadget leaves through the single removal
        // path before the device itself is unregistered.
        if let Some(fresh) = self.store().device_by_id(id) {
            for gadget_id in fresh.gadgets.values() {
                if let Some(gadget) = self.store().gadget_by_id(*gadget_id) {
                    self.gadget_leaving(adapter_name, &gadget);
                }
            }
        }

        match self.store().unregister_device(id) {
            Ok(_) => {
                self.bus().publish(Transition::DeviceLeft {
                    adapter: adapter_name.to_owned(),
                    id,
                });
            }
            Err(err) => {
                // At-most-once removal: on failure the record stays put.
                self.report(adapter_name, &err.into());
            }
        }
    }

    /// An adapter observed network-level changes for a device.
    pub(super) fn device_net_changing(
        &self,
        adapter: &dyn Adapter,
        address: &PermAddr,
        delta: &AttrMap,
    ) {
        let adapter_name = adapter.name();
        let Some(device) = self.store().device_by_net(adapter_name, address) else {
            return;
        };
        let Some(id) = device.id else { return };

        if let Err(err) = self.apply_device_namespace(id, NamespaceKind::Net, delta) {
            self.report(adapter_name, &err.into());
        }
    }

    /// A device reported attribute values.
    pub(super) fn device_reporting(
        &self,
        adapter: &dyn Adapter,
        address: &PermAddr,
        attrs: AttrMap,
    ) {
        let adapter_name = adapter.name();
        let Some(device) = self.store().device_by_net(adapter_name, address) else {
            return;
        };
        let Some(id) = device.id else { return };

        self.store().poke_device(id);
        self.force_online(adapter_name, id);

        if let Some(device) = self.store().device_by_id(id) {
            self.bus().publish(Transition::DeviceReporting {
                device,
                attrs: attrs.clone(),
            });
        }

        if let Err(err) = self.apply_device_namespace(id, NamespaceKind::Attrs, &attrs) {
            self.report(adapter_name, &err.into());
        }
    }
}

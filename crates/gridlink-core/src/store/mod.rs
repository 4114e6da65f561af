// ── Registry store ──
//
// Thread-safe, reactive storage for Device and Gadget records. The mediator
// consumes this through a narrow contract: lookup by id or net location,
// register/unregister, and namespace mutation with diffs. Every mutation is
// atomic from the mediator's perspective.

mod collection;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::Value;

use crate::error::StoreError;
use crate::model::{
    AttrMap, AuxId, Device, EntityId, Gadget, NamespaceKind, PermAddr, device_key, gadget_key,
    namespace,
};
use crate::stream::EntityStream;

use collection::RegistryCollection;

/// Central reactive registry for devices and gadgets.
///
/// Ids are allocated here and only here, monotonically; a component holds an
/// [`EntityId`] iff it has been registered at least once.
pub struct RegistryStore {
    devices: RegistryCollection<Device>,
    gadgets: RegistryCollection<Gadget>,
    next_id: AtomicU64,
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore {
    pub fn new() -> Self {
        Self {
            devices: RegistryCollection::new(),
            gadgets: RegistryCollection::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn alloc_id(&self) -> EntityId {
        EntityId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn device_by_id(&self, id: EntityId) -> Option<Arc<Device>> {
        self.devices.get_by_id(id)
    }

    pub fn device_by_net(&self, adapter: &str, address: &PermAddr) -> Option<Arc<Device>> {
        self.devices.get_by_key(&device_key(adapter, address))
    }

    pub fn gadget_by_id(&self, id: EntityId) -> Option<Arc<Gadget>> {
        self.gadgets.get_by_id(id)
    }

    pub fn gadget_by_net(
        &self,
        adapter: &str,
        address: &PermAddr,
        aux_id: &AuxId,
    ) -> Option<Arc<Gadget>> {
        self.gadgets.get_by_key(&gadget_key(adapter, address, aux_id))
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a cooked device candidate: assign its id, stamp the join
    /// markers, mark it enabled and online, and insert.
    pub fn register_device(&self, mut device: Device) -> Result<EntityId, StoreError> {
        let key = device_key(&device.adapter, &device.address);
        let id = self.alloc_id();
        let now = Utc::now();

        device.id = Some(id);
        device.enabled = true;
        device.joined_at = Some(now);
        device.last_seen = Some(now);
        device
            .net
            .insert("status".into(), Value::String("online".into()));

        if self.devices.insert(key.clone(), id, device) {
            Ok(id)
        } else {
            Err(StoreError::Duplicate { key })
        }
    }

    /// Register a cooked gadget candidate under its owning device.
    ///
    /// The owner must already hold a registry id — device-before-gadget
    /// ordering is enforced upstream and re-checked here.
    pub fn register_gadget(&self, mut gadget: Gadget) -> Result<EntityId, StoreError> {
        let key = gadget_key(&gadget.adapter, &gadget.address, &gadget.aux_id);

        let owner = self
            .device_by_net(&gadget.adapter, &gadget.address)
            .and_then(|d| d.id)
            .ok_or_else(|| StoreError::OwnerMissing { key: key.clone() })?;

        let id = self.alloc_id();
        let now = Utc::now();

        gadget.id = Some(id);
        gadget.device_id = Some(owner);
        gadget.enabled = true;
        gadget.joined_at = Some(now);
        gadget.last_seen = Some(now);

        let aux_id = gadget.aux_id.clone();
        let owner_key = device_key(&gadget.adapter, &gadget.address);

        if !self.gadgets.insert(key.clone(), id, gadget) {
            return Err(StoreError::Duplicate { key });
        }
        self.devices.update(&owner_key, |dev| {
            dev.gadgets.insert(aux_id, id);
        });
        Ok(id)
    }

    /// Remove a device record. The caller drives the gadget cascade; this
    /// only touches the device itself.
    pub fn unregister_device(&self, id: EntityId) -> Result<Arc<Device>, StoreError> {
        let key = self.devices.key_of(id).ok_or(StoreError::NotFound {
            entity: "device",
            identifier: id.to_string(),
        })?;
        self.devices.remove(&key).ok_or(StoreError::NotFound {
            entity: "device",
            identifier: id.to_string(),
        })
    }

    /// Remove a gadget record and unlink it from its owner's gadget table.
    pub fn unregister_gadget(&self, id: EntityId) -> Result<Arc<Gadget>, StoreError> {
        let key = self.gadgets.key_of(id).ok_or(StoreError::NotFound {
            entity: "gadget",
            identifier: id.to_string(),
        })?;
        let gadget = self.gadgets.remove(&key).ok_or(StoreError::NotFound {
            entity: "gadget",
            identifier: id.to_string(),
        })?;

        let owner_key = device_key(&gadget.adapter, &gadget.address);
        self.devices.update(&owner_key, |dev| {
            dev.gadgets.remove(&gadget.aux_id);
        });
        Ok(gadget)
    }

    // ── Namespace mutation with diffs ────────────────────────────────

    /// Partial merge into a device namespace. Returns the changed subset;
    /// an empty diff means nothing differed and no event should fire.
    pub fn modify_device(
        &self,
        id: EntityId,
        kind: NamespaceKind,
        delta: &AttrMap,
    ) -> Result<AttrMap, StoreError> {
        let key = self.devices.key_of(id).ok_or(StoreError::NotFound {
            entity: "device",
            identifier: id.to_string(),
        })?;
        self.devices
            .update(&key, |dev| {
                dev.namespace_mut(kind)
                    .map(|ns| namespace::merge_diff(ns, delta))
                    .unwrap_or_default()
            })
            .ok_or(StoreError::NotFound {
                entity: "device",
                identifier: id.to_string(),
            })
    }

    /// Full overwrite of a device namespace, with removed keys reported as
    /// `null` in the diff.
    pub fn replace_device(
        &self,
        id: EntityId,
        kind: NamespaceKind,
        next: AttrMap,
    ) -> Result<AttrMap, StoreError> {
        let key = self.devices.key_of(id).ok_or(StoreError::NotFound {
            entity: "device",
            identifier: id.to_string(),
        })?;
        self.devices
            .update(&key, |dev| {
                dev.namespace_mut(kind)
                    .map(|ns| namespace::replace_diff(ns, next))
                    .unwrap_or_default()
            })
            .ok_or(StoreError::NotFound {
                entity: "device",
                identifier: id.to_string(),
            })
    }

    /// Partial merge into a gadget namespace.
    pub fn modify_gadget(
        &self,
        id: EntityId,
        kind: NamespaceKind,
        delta: &AttrMap,
    ) -> Result<AttrMap, StoreError> {
        let key = self.gadgets.key_of(id).ok_or(StoreError::NotFound {
            entity: "gadget",
            identifier: id.to_string(),
        })?;
        self.gadgets
            .update(&key, |gad| {
                gad.namespace_mut(kind)
                    .map(|ns| namespace::merge_diff(ns, delta))
                    .unwrap_or_default()
            })
            .ok_or(StoreError::NotFound {
                entity: "gadget",
                identifier: id.to_string(),
            })
    }

    /// Full overwrite of a gadget namespace.
    pub fn replace_gadget(
        &self,
        id: EntityId,
        kind: NamespaceKind,
        next: AttrMap,
    ) -> Result<AttrMap, StoreError> {
        let key = self.gadgets.key_of(id).ok_or(StoreError::NotFound {
            entity: "gadget",
            identifier: id.to_string(),
        })?;
        self.gadgets
            .update(&key, |gad| {
                gad.namespace_mut(kind)
                    .map(|ns| namespace::replace_diff(ns, next))
                    .unwrap_or_default()
            })
            .ok_or(StoreError::NotFound {
                entity: "gadget",
                identifier: id.to_string(),
            })
    }

    /// Insert-only merge into a gadget's attrs. Existing keys keep their
    /// values; append is always treated as a change by callers.
    pub fn append_gadget_attrs(&self, id: EntityId, delta: &AttrMap) -> Result<(), StoreError> {
        let key = self.gadgets.key_of(id).ok_or(StoreError::NotFound {
            entity: "gadget",
            identifier: id.to_string(),
        })?;
        self.gadgets
            .update(&key, |gad| namespace::append(&mut gad.attrs, delta))
            .ok_or(StoreError::NotFound {
                entity: "gadget",
                identifier: id.to_string(),
            })
    }

    // ── Liveness and identity refresh ────────────────────────────────

    /// Refresh a device's liveness marker. No event fires.
    pub fn poke_device(&self, id: EntityId) {
        if let Some(key) = self.devices.key_of(id) {
            self.devices.update(&key, |dev| {
                dev.last_seen = Some(Utc::now());
            });
        }
    }

    /// Refresh a gadget's liveness marker. No event fires.
    pub fn poke_gadget(&self, id: EntityId) {
        if let Some(key) = self.gadgets.key_of(id) {
            self.gadgets.update(&key, |gad| {
                gad.last_seen = Some(Utc::now());
            });
        }
    }

    /// Replace a device's raw snapshot and extra field on reconnection.
    /// Safe for a recovered record; no event fires.
    pub fn refresh_device_identity(&self, id: EntityId, raw: Value, extra: Value) {
        if let Some(key) = self.devices.key_of(id) {
            self.devices.update(&key, |dev| {
                dev.raw = raw;
                dev.extra = extra;
            });
        }
    }

    /// Replace a gadget's raw snapshot and extra field. No event fires.
    pub fn refresh_gadget_identity(&self, id: EntityId, raw: Value, extra: Value) {
        if let Some(key) = self.gadgets.key_of(id) {
            self.gadgets.update(&key, |gad| {
                gad.raw = raw;
                gad.extra = extra;
            });
        }
    }

    // ── Snapshots and subscriptions ──────────────────────────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn gadgets_snapshot(&self) -> Arc<Vec<Arc<Gadget>>> {
        self.gadgets.snapshot()
    }

    pub fn subscribe_devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.devices.subscribe())
    }

    pub fn subscribe_gadgets(&self) -> EntityStream<Gadget> {
        EntityStream::new(self.gadgets.subscribe())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn gadget_count(&self) -> usize {
        self.gadgets.len()
    }
}

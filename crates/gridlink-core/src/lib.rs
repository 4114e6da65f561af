//! Mediation layer between pluggable hardware adapters and the central
//! registry of Device and Gadget entities.
//!
//! This crate owns the reconciliation core of the gridlink workspace:
//!
//! - **[`Mediator`]** — Event handlers bound to adapter-originated events.
//!   Resolves identity, invokes the adapter's asynchronous transforms,
//!   mutates the [`RegistryStore`], and republishes every state change as a
//!   derived [`Transition`] on the [`EventBus`]. Device-before-gadget
//!   arrival ordering is enforced with a bounded completion signal, not
//!   polling or locking.
//!
//! - **[`RegistryStore`]** — Reactive storage for Device/Gadget records
//!   (`DashMap` + `tokio::sync::watch` channels). Registration assigns ids;
//!   namespace mutations merge with diffs so only fields that actually
//!   changed produce events.
//!
//! - **[`EventBus`]** — Paired broadcast channels: the in-process bus
//!   carries live entity references, the wire channel carries the
//!   plain-data [`WireEvent`] projection. Both shapes come from one
//!   canonical transition value.
//!
//! - **[`Adapter`]** — The contract a hardware network plugs in through:
//!   join policy plus asynchronous raw-to-domain transforms for devices and
//!   gadgets.

pub mod adapter;
pub mod bus;
pub mod error;
pub mod mediator;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use adapter::{
    Adapter, AdapterEvent, DeviceTransform, GadgetTransform, LifecycleChange, RemovalMode,
};
pub use bus::EventBus;
pub use error::{CoreError, StoreError, TransformError};
pub use mediator::{Mediator, MediatorConfig};
pub use store::RegistryStore;
pub use stream::EntityStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AttrMap,
    AuxId,
    BanPhase,
    Device,
    EntityId,
    EventKind,
    Gadget,
    NamespaceKind,
    NetStatus,
    PermAddr,
    Transition,
    WireEvent,
};

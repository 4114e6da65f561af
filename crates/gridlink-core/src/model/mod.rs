// ── Domain model ──

pub mod device;
pub mod entity_id;
pub mod gadget;
pub mod namespace;
pub mod transition;

pub use device::{Device, NetStatus};
pub use entity_id::{AuxId, EntityId, PermAddr, device_key, gadget_key};
pub use gadget::Gadget;
pub use namespace::{AttrMap, NamespaceKind};
pub use transition::{BanPhase, EventKind, Transition, WireEvent};

// ── Event bus ──
//
// Derived transitions fan out on two paired broadcast channels: the
// in-process bus carries the canonical Transition (live references), the
// wire channel carries the plain-data projection for external delivery.
// Both are always published together from one canonical value.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::model::{Transition, WireEvent};

pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Publish/subscribe hub for derived events.
///
/// Cheaply cloneable; subscribers that lag are dropped by `broadcast`
/// semantics rather than backpressuring the mediator.
#[derive(Clone)]
pub struct EventBus {
    local_tx: broadcast::Sender<Arc<Transition>>,
    wire_tx: broadcast::Sender<Arc<WireEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (local_tx, _) = broadcast::channel(capacity);
        let (wire_tx, _) = broadcast::channel(capacity);
        Self { local_tx, wire_tx }
    }

    /// Publish one transition on both channels.
    ///
    /// The wire shape is projected here, once, so the two payloads can
    /// never describe different transitions. Send failures just mean there
    /// are no subscribers.
    pub fn publish(&self, transition: Transition) {
        trace!(kind = %transition.kind(), "publishing transition");
        let wire = transition.to_wire();
        let _ = self.local_tx.send(Arc::new(transition));
        let _ = self.wire_tx.send(Arc::new(wire));
    }

    /// Subscribe to the in-process bus (live entity references).
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Transition>> {
        self.local_tx.subscribe()
    }

    /// Subscribe to the external wire channel (plain data only).
    pub fn subscribe_wire(&self) -> broadcast::Receiver<Arc<WireEvent>> {
        self.wire_tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{EventKind, PermAddr, transition::BanPhase};
    use serde_json::json;

    #[tokio::test]
    async fn publish_reaches_both_channels() {
        let bus = EventBus::new(8);
        let mut local = bus.subscribe();
        let mut wire = bus.subscribe_wire();

        bus.publish(Transition::DeviceBanned {
            phase: BanPhase::Incoming,
            adapter: "zig-net".into(),
            address: PermAddr::new("00:11"),
            data: json!({}),
        });

        let t = local.recv().await.unwrap();
        let w = wire.recv().await.unwrap();
        assert_eq!(t.kind(), EventKind::DeviceBannedIncoming);
        assert_eq!(w.kind, EventKind::DeviceBannedIncoming);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        bus.publish(Transition::Error {
            adapter: "zig-net".into(),
            message: "boom".into(),
        });
    }
}

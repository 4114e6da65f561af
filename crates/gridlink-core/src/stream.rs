// ── Reactive entity streams ──
//
// Subscription handles vended by the registry store. Each yields full
// collection snapshots; per-entity deltas travel on the event bus instead.

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one registry collection.
///
/// Provides point-in-time snapshot access plus change notification via
/// [`changed()`](Self::changed), or conversion into a `Stream` of
/// snapshots.
pub struct EntityStream<T: Clone + Send + Sync + 'static> {
    current: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured when the subscription was created.
    pub fn current(&self) -> &Arc<Vec<Arc<T>>> {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next mutation, returning the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snapshot = self.receiver.borrow_and_update().clone();
        self.current = snapshot.clone();
        Some(snapshot)
    }

    /// Convert into a `Stream` of snapshots for `StreamExt` combinators.
    /// The first item is the snapshot at conversion time.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Vec<Arc<T>>>> + Unpin {
        WatchStream::new(self.receiver)
    }
}

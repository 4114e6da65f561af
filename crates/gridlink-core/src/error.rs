// ── Core error types ──
//
// Consumer-facing errors. Store rejections and transform failures are
// converted into error transitions on the bus; none of them terminate the
// mediator, whose failures are always scoped to a single event.

use thiserror::Error;

/// Rejections from the registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    #[error("duplicate registration for {key}")]
    Duplicate { key: String },

    #[error("gadget {key} has no registered owning device")]
    OwnerMissing { key: String },
}

/// Failure value returned by an adapter transform.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Unified error type for mediator operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("adapter '{adapter}' has no {entity} transform")]
    MissingTransform {
        adapter: String,
        entity: &'static str,
    },

    #[error("adapter '{adapter}' transform failed: {source}")]
    TransformFailed {
        adapter: String,
        #[source]
        source: TransformError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

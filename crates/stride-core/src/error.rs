use thiserror::Error;

/// Failures surfaced by the backing data store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Network-level or 5xx-equivalent failure. Polling retries these
    /// implicitly on the next tick; explicit user actions do not.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Row-level authorization rejected the operation. Terminal for the
    /// operation; the caller must not retry.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The subscription or store was torn down underneath the caller.
    #[error("store closed")]
    Closed,
}

impl StoreError {
    /// Whether a scheduled retry (the next poll tick) can reasonably
    /// succeed without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Top-level error type for core operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Rejected before any network call; requires corrected input.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}

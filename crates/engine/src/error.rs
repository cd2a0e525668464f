//! Pipeline failures surfaced to the delivery layer.

use selah_core::error::{ProviderError, StoreError};
use thiserror::Error;

/// Why a chat turn could not produce a reply.
///
/// Retrieval and per-tool failures never appear here; they are absorbed
/// where they happen.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A context read failed under the fail-fast join policy.
    #[error("Context aggregation failed: {0}")]
    Context(#[from] StoreError),

    #[error("Completion failed: {0}")]
    Provider(#[from] ProviderError),

    /// The caller disconnected before the turn finished.
    #[error("Request cancelled")]
    Cancelled,
}

impl From<EngineError> for selah_core::Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Context(e) => selah_core::Error::Store(e),
            EngineError::Provider(e) => selah_core::Error::Provider(e),
            EngineError::Cancelled => selah_core::Error::Cancelled,
        }
    }
}

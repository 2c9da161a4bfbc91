use stayline_store::StoreError;
use stayline_types::{RecordId, RunId};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-layer errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while applying one operation to a record batch.
///
/// These abort the operation only; the surrounding run records the
/// operation as failed and continues.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("record not found in batch: {0}")]
    RecordNotFound(RecordId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

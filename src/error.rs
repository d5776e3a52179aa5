use thiserror::Error;

/// Errors surfaced by the engine's mutating operations.
///
/// `Validation` is raised before any state change and is safe to retry with
/// corrected input. `Storage` means the in-memory mutation already committed
/// and only the durable write (after one retry) failed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

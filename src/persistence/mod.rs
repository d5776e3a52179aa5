use async_trait::async_trait;
use thiserror::Error;

use crate::types::LearnerRecord;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryPersistence;
pub use sqlite::SqlitePersistence;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Durable key-value storage for learner records.
///
/// A corrupt or unreadable stored record is reported as absence (`Ok(None)`)
/// by the adapter, not as an error; serving the learner with a fresh record
/// is preferred over blocking on unrecoverable history.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn load(&self, learner_id: &str) -> Result<Option<LearnerRecord>, PersistenceError>;

    async fn save(&self, learner_id: &str, record: &LearnerRecord)
        -> Result<(), PersistenceError>;
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::persistence::{PersistenceError, PersistencePort};
use crate::types::LearnerRecord;

/// HashMap-backed adapter storing each record as a JSON document.
///
/// The no-durability default, and the failure-injection point for
/// storage-error tests.
#[derive(Default)]
pub struct MemoryPersistence {
    rows: RwLock<HashMap<String, String>>,
    fail_saves: AtomicU32,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` saves fail with a backend error.
    pub fn fail_next_saves(&self, n: u32) {
        self.fail_saves.store(n, Ordering::SeqCst);
    }

    pub fn contains(&self, learner_id: &str) -> bool {
        self.rows.read().contains_key(learner_id)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Overwrites a stored document verbatim; lets tests plant corrupt rows.
    pub fn put_raw(&self, learner_id: &str, document: &str) {
        self.rows
            .write()
            .insert(learner_id.to_string(), document.to_string());
    }
}

#[async_trait]
impl PersistencePort for MemoryPersistence {
    async fn load(&self, learner_id: &str) -> Result<Option<LearnerRecord>, PersistenceError> {
        let document = match self.rows.read().get(learner_id) {
            Some(document) => document.clone(),
            None => return Ok(None),
        };

        match serde_json::from_str::<LearnerRecord>(&document) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(learner_id, error = %err, "corrupt learner record, treating as absent");
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        learner_id: &str,
        record: &LearnerRecord,
    ) -> Result<(), PersistenceError> {
        let remaining = self.fail_saves.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_saves.store(remaining - 1, Ordering::SeqCst);
            return Err(PersistenceError::Backend("injected save failure".into()));
        }

        let document = serde_json::to_string(record)
            .map_err(|err| PersistenceError::Backend(err.to_string()))?;
        self.rows
            .write()
            .insert(learner_id.to_string(), document);
        Ok(())
    }
}

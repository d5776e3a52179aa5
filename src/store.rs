use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::error::EngineError;
use crate::persistence::PersistencePort;
use crate::types::LearnerRecord;

/// In-memory authoritative map of learner id to record, backed by a
/// [`PersistencePort`].
///
/// Mutations for the same learner id are serialized through a per-id async
/// lock (FIFO among waiters); mutations for different ids proceed
/// concurrently. Reads clone under a brief read lock and never write.
pub struct StateStore {
    persistence: Arc<dyn PersistencePort>,
    records: RwLock<HashMap<String, LearnerRecord>>,
    locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    persist_timeout: Duration,
}

impl StateStore {
    pub fn new(persistence: Arc<dyn PersistencePort>, persist_timeout_ms: u64) -> Self {
        Self {
            persistence,
            records: RwLock::new(HashMap::new()),
            locks: parking_lot::Mutex::new(HashMap::new()),
            persist_timeout: Duration::from_millis(persist_timeout_ms),
        }
    }

    /// Read-only copy of a learner's record; a fresh default for unseen ids.
    ///
    /// Never inserts into the map and never saves, so a read cannot create a
    /// persisted record as a side effect.
    pub async fn get_snapshot(&self, learner_id: &str) -> LearnerRecord {
        if let Some(record) = self.records.read().await.get(learner_id) {
            return record.clone();
        }

        match self.load_bounded(learner_id).await {
            Some(record) => record,
            None => LearnerRecord::new(learner_id),
        }
    }

    /// Runs `mutation` against the learner's record under that id's lock,
    /// commits the result in memory, then persists it.
    ///
    /// A mutation error aborts with no in-memory or persisted change. A
    /// persistence failure (after one retry) surfaces as
    /// [`EngineError::Storage`] while the in-memory commit stands.
    pub async fn apply<F>(&self, learner_id: &str, mutation: F) -> Result<LearnerRecord, EngineError>
    where
        F: FnOnce(&mut LearnerRecord) -> Result<(), EngineError>,
    {
        validate_learner_id(learner_id)?;
        let lock = self.learner_lock(learner_id);
        let _guard = lock.lock().await;
        self.apply_locked(learner_id, mutation).await
    }

    /// Lock handle for one learner id, shared with the feedback path so both
    /// kinds of mutation obey the same serialization.
    pub(crate) fn learner_lock(&self, learner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// `apply` body without taking the per-id lock; the caller must hold it.
    pub(crate) async fn apply_locked<F>(
        &self,
        learner_id: &str,
        mutation: F,
    ) -> Result<LearnerRecord, EngineError>
    where
        F: FnOnce(&mut LearnerRecord) -> Result<(), EngineError>,
    {
        validate_learner_id(learner_id)?;

        let mut record = self.load_or_create(learner_id).await;
        mutation(&mut record)?;

        self.records
            .write()
            .await
            .insert(learner_id.to_string(), record.clone());
        tracing::debug!(learner_id, "mutation committed");

        self.persist(learner_id, &record).await?;
        Ok(record)
    }

    /// All in-memory records at this instant; the scan basis for global
    /// statistics.
    pub async fn snapshot_all(&self) -> Vec<LearnerRecord> {
        self.records.read().await.values().cloned().collect()
    }

    async fn load_or_create(&self, learner_id: &str) -> LearnerRecord {
        if let Some(record) = self.records.read().await.get(learner_id) {
            return record.clone();
        }

        match self.load_bounded(learner_id).await {
            Some(record) => record,
            None => LearnerRecord::new(learner_id),
        }
    }

    /// Load through the port under the configured timeout. Failures and
    /// timeouts degrade to `None` so the learner keeps being served.
    async fn load_bounded(&self, learner_id: &str) -> Option<LearnerRecord> {
        let load = self.persistence.load(learner_id);
        match tokio::time::timeout(self.persist_timeout, load).await {
            Ok(Ok(record)) => record,
            Ok(Err(err)) => {
                tracing::warn!(learner_id, error = %err, "load failed, serving fresh record");
                None
            }
            Err(_) => {
                tracing::warn!(learner_id, "load timed out, serving fresh record");
                None
            }
        }
    }

    async fn persist(&self, learner_id: &str, record: &LearnerRecord) -> Result<(), EngineError> {
        let mut last_error = String::new();

        for attempt in 0..2 {
            let save = self.persistence.save(learner_id, record);
            match tokio::time::timeout(self.persist_timeout, save).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => last_error = err.to_string(),
                Err(_) => last_error = format!("save timed out after {:?}", self.persist_timeout),
            }
            if attempt == 0 {
                tracing::warn!(learner_id, error = %last_error, "persistence save failed, retrying once");
            }
        }

        Err(EngineError::Storage(last_error))
    }
}

fn validate_learner_id(learner_id: &str) -> Result<(), EngineError> {
    if learner_id.is_empty() {
        return Err(EngineError::Validation(
            "learner id must be non-empty".to_string(),
        ));
    }
    Ok(())
}

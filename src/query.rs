use std::sync::Arc;

use crate::store::StateStore;
use crate::types::{GlobalStats, LearnerRecord, LearnerStats};

/// Read-only reporting over the state store. Queries never create records.
pub struct QueryEngine {
    store: Arc<StateStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Snapshot of one learner's record; unseen ids get a fresh default
    /// without any record being created.
    pub async fn progress_report(&self, learner_id: &str) -> LearnerRecord {
        self.store.get_snapshot(learner_id).await
    }

    /// Compact roll-up for one learner.
    pub async fn learner_stats(&self, learner_id: &str) -> LearnerStats {
        let record = self.store.get_snapshot(learner_id).await;
        LearnerStats {
            learner_id: record.learner_id.clone(),
            questions_asked: record.questions_asked,
            last_active: (record.last_active > 0).then_some(record.last_active),
            overall_score: record.overall_score(),
            labs_completed: record.labs_completed.len() as u64,
            time_spent_secs: record.time_spent_secs,
        }
    }

    /// Point-in-time aggregation across all known learners. Cross-learner
    /// atomicity is not guaranteed and not needed.
    pub async fn global_stats(&self) -> GlobalStats {
        let records = self.store.snapshot_all().await;

        let active_learners = records.len() as u64;
        let total_questions = records.iter().map(|r| r.questions_asked).sum();

        let mut score_sum = 0.0;
        let mut score_count = 0u64;
        for record in &records {
            for score in record.topics.values() {
                score_sum += score.value;
                score_count += 1;
            }
        }
        let avg_topic_score = (score_count > 0).then(|| score_sum / score_count as f64);

        let with_labs = records
            .iter()
            .filter(|r| !r.labs_completed.is_empty())
            .count();
        let lab_completion_rate = if records.is_empty() {
            0.0
        } else {
            with_labs as f64 / records.len() as f64
        };

        GlobalStats {
            active_learners,
            total_questions,
            avg_topic_score,
            lab_completion_rate,
        }
    }
}

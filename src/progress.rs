use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;

use crate::config::TutorConfig;
use crate::error::EngineError;
use crate::store::StateStore;
use crate::types::{InteractionEntry, LearnerRecord, TopicScore};

/// Applies interaction and lab events to learner records, maintaining topic
/// scores and producing next-topic recommendations.
pub struct ProgressTracker {
    store: Arc<StateStore>,
    max_memory_size: usize,
    ema_alpha: f64,
    engagement_signal: f64,
}

impl ProgressTracker {
    pub fn new(store: Arc<StateStore>, config: &TutorConfig) -> Self {
        Self {
            store,
            max_memory_size: config.max_memory_size,
            ema_alpha: config.ema_alpha,
            engagement_signal: config.engagement_signal,
        }
    }

    /// Logs one question against a topic and returns the updated score.
    pub async fn record_interaction(
        &self,
        learner_id: &str,
        topic_id: &str,
        question_text: &str,
    ) -> Result<TopicScore, EngineError> {
        let now = Utc::now().timestamp_millis();
        let cap = self.max_memory_size;
        let alpha = self.ema_alpha;
        let signal = self.engagement_signal;
        let topic = topic_id.to_string();
        let question = question_text.to_string();

        let record = self
            .store
            .apply(learner_id, move |record| {
                record.push_interaction(
                    InteractionEntry {
                        timestamp: now,
                        topic_id: topic.clone(),
                        question_text: question,
                    },
                    cap,
                );
                record
                    .topics
                    .entry(topic)
                    .or_default()
                    .register_engagement(alpha, signal, now);
                record.last_active = now;
                Ok(())
            })
            .await?;

        Ok(record
            .topics
            .get(topic_id)
            .copied()
            .unwrap_or_default())
    }

    /// Idempotent: marking an already-completed lab is a no-op, not an error.
    pub async fn mark_lab_complete(
        &self,
        learner_id: &str,
        lab_id: &str,
    ) -> Result<LearnerRecord, EngineError> {
        let now = Utc::now().timestamp_millis();
        let lab = lab_id.to_string();

        self.store
            .apply(learner_id, move |record| {
                record.labs_completed.insert(lab);
                record.last_active = now;
                Ok(())
            })
            .await
    }

    /// Adds an externally-reported session duration to the learner's total.
    pub async fn record_session_time(
        &self,
        learner_id: &str,
        duration_secs: i64,
    ) -> Result<LearnerRecord, EngineError> {
        if duration_secs < 0 {
            return Err(EngineError::Validation(format!(
                "session duration must be non-negative, got {duration_secs}"
            )));
        }

        let now = Utc::now().timestamp_millis();
        self.store
            .apply(learner_id, move |record| {
                record.time_spent_secs += duration_secs as u64;
                record.last_active = now;
                Ok(())
            })
            .await
    }

    /// Picks the candidate with the lowest current score; topics never
    /// visited sort before any visited topic, and remaining ties go to the
    /// least recently updated. `None` when `candidate_topics` is empty.
    pub async fn recommend_next_topic(
        &self,
        learner_id: &str,
        candidate_topics: &[String],
    ) -> Option<String> {
        if candidate_topics.is_empty() {
            return None;
        }

        let record = self.store.get_snapshot(learner_id).await;
        let rank = |topic: &String| match record.topics.get(topic) {
            Some(score) => (score.value, 1u8, score.last_updated),
            None => (0.0, 0u8, 0i64),
        };

        candidate_topics
            .iter()
            .min_by(|a, b| {
                let (score_a, visited_a, updated_a) = rank(a);
                let (score_b, visited_b, updated_b) = rank(b);
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(Ordering::Equal)
                    .then(visited_a.cmp(&visited_b))
                    .then(updated_a.cmp(&updated_b))
            })
            .cloned()
    }

    /// The last `limit` log entries in chronological order.
    pub async fn recent_interactions(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Vec<InteractionEntry> {
        let record = self.store.get_snapshot(learner_id).await;
        let skip = record.interaction_log.len().saturating_sub(limit);
        record.interaction_log.into_iter().skip(skip).collect()
    }
}

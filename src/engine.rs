use std::sync::Arc;

use crate::config::TutorConfig;
use crate::feedback::FeedbackCollector;
use crate::persistence::PersistencePort;
use crate::progress::ProgressTracker;
use crate::query::QueryEngine;
use crate::store::StateStore;

/// Facade bundling the tracker, collector and query engine over one shared
/// [`StateStore`].
///
/// Explicitly constructed from a config and a persistence adapter; there is
/// no implicit singleton.
pub struct TutorEngine {
    config: TutorConfig,
    store: Arc<StateStore>,
    progress: ProgressTracker,
    feedback: FeedbackCollector,
    query: QueryEngine,
}

impl TutorEngine {
    pub fn new(config: TutorConfig, persistence: Arc<dyn PersistencePort>) -> Self {
        let store = Arc::new(StateStore::new(persistence, config.persist_timeout_ms));
        let progress = ProgressTracker::new(Arc::clone(&store), &config);
        let feedback = FeedbackCollector::new(Arc::clone(&store));
        let query = QueryEngine::new(Arc::clone(&store));

        tracing::info!(
            max_memory_size = config.max_memory_size,
            ema_alpha = config.ema_alpha,
            engagement_signal = config.engagement_signal,
            "tutor engine initialized"
        );

        Self {
            config,
            store,
            progress,
            feedback,
            query,
        }
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn feedback(&self) -> &FeedbackCollector {
        &self.feedback
    }

    pub fn query(&self) -> &QueryEngine {
        &self.query
    }
}

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Running competence estimate for one topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicScore {
    /// Always within [0, 1].
    pub value: f64,
    /// Epoch milliseconds of the last update; 0 for never updated.
    pub last_updated: i64,
    pub visits: u32,
}

impl Default for TopicScore {
    fn default() -> Self {
        Self {
            value: 0.0,
            last_updated: 0,
            visits: 0,
        }
    }
}

impl TopicScore {
    /// Registers one unit of engagement: EMA step toward `signal`, then a
    /// clamp back into [0, 1] against floating-point drift.
    pub fn register_engagement(&mut self, alpha: f64, signal: f64, now_ms: i64) {
        self.visits = self.visits.saturating_add(1);
        self.value = (self.value + alpha * (signal - self.value)).clamp(0.0, 1.0);
        self.last_updated = now_ms;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEntry {
    pub timestamp: i64,
    pub topic_id: String,
    pub question_text: String,
}

/// Full persisted state for one learner.
///
/// The interaction log is a bounded recency window; `questions_asked` is the
/// lifetime total and is never decremented by eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerRecord {
    pub learner_id: String,
    pub topics: HashMap<String, TopicScore>,
    pub labs_completed: BTreeSet<String>,
    pub interaction_log: VecDeque<InteractionEntry>,
    pub questions_asked: u64,
    pub time_spent_secs: u64,
    /// Epoch milliseconds of the most recent mutation; 0 for a fresh record.
    pub last_active: i64,
}

impl LearnerRecord {
    pub fn new(learner_id: &str) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            topics: HashMap::new(),
            labs_completed: BTreeSet::new(),
            interaction_log: VecDeque::new(),
            questions_asked: 0,
            time_spent_secs: 0,
            last_active: 0,
        }
    }

    /// Appends to the log, evicting oldest-first past `cap`, and bumps the
    /// lifetime question counter.
    pub fn push_interaction(&mut self, entry: InteractionEntry, cap: usize) {
        self.interaction_log.push_back(entry);
        while self.interaction_log.len() > cap {
            self.interaction_log.pop_front();
        }
        self.questions_asked += 1;
    }

    /// Mean topic score, or `None` when no topic has been touched.
    pub fn overall_score(&self) -> Option<f64> {
        if self.topics.is_empty() {
            return None;
        }
        let sum: f64 = self.topics.values().map(|s| s.value).sum();
        Some(sum / self.topics.len() as f64)
    }
}

/// One piece of satisfaction feedback. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    pub learner_id: String,
    pub timestamp: i64,
    /// 1..=5.
    pub rating: u8,
    pub comment: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub period_days: i64,
    pub count: u64,
    /// `None` when the window is empty.
    pub average_rating: Option<f64>,
    /// Counts for ratings 1 through 5.
    pub rating_histogram: [u64; 5],
    /// Categories ranked by frequency, most frequent first.
    pub top_categories: Vec<CategoryCount>,
    /// Up to the 10 newest in-window entries carrying a comment.
    pub recent_comments: Vec<FeedbackEntry>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum RatingTrend {
    Up,
    #[default]
    Flat,
    Down,
}

impl RatingTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Flat => "flat",
            Self::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInsights {
    pub total: u64,
    pub average_rating: Option<f64>,
    /// Average over the trailing 7 days, when any such entries exist.
    pub recent_average: Option<f64>,
    pub trend: RatingTrend,
    pub category_averages: Vec<CategoryAverage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    pub category: String,
    pub average_rating: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub active_learners: u64,
    pub total_questions: u64,
    /// Mean over every topic score of every learner; `None` without topics.
    pub avg_topic_score: Option<f64>,
    /// Share of known learners with at least one completed lab.
    pub lab_completion_rate: f64,
}

/// Compact per-learner roll-up for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerStats {
    pub learner_id: String,
    pub questions_asked: u64,
    pub last_active: Option<i64>,
    pub overall_score: Option<f64>,
    pub labs_completed: u64,
    pub time_spent_secs: u64,
}

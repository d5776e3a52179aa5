use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::StateStore;
use crate::types::{
    CategoryAverage, CategoryCount, FeedbackEntry, FeedbackInsights, FeedbackSummary, RatingTrend,
};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const RECENT_COMMENT_LIMIT: usize = 10;
const LOW_RATING_SHARE_THRESHOLD: f64 = 0.2;
const INSIGHTS_WINDOW_DAYS: i64 = 7;
const DEFAULT_CATEGORY: &str = "general";

/// Complaint keywords mapped to improvement suggestions.
const IMPROVEMENT_HINTS: &[(&str, &str)] = &[
    ("slow", "Response time optimization needed"),
    ("unclear", "Improve explanation clarity"),
    ("wrong", "Review accuracy of responses"),
    ("confusing", "Simplify complex explanations"),
    ("difficult", "Adjust difficulty level"),
    ("boring", "Make interactions more engaging"),
];

/// Collects satisfaction feedback and computes windowed aggregates.
///
/// Entries live in an append-only, arrival-ordered sequence separate from
/// learner records, but appends go through the store's per-learner-id lock so
/// concurrent submissions for the same learner never interleave with other
/// mutations for that learner.
pub struct FeedbackCollector {
    store: Arc<StateStore>,
    entries: RwLock<Vec<FeedbackEntry>>,
}

impl FeedbackCollector {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn record_feedback(
        &self,
        learner_id: &str,
        rating: u8,
        comment: Option<String>,
        category: Option<String>,
    ) -> Result<FeedbackEntry, EngineError> {
        self.record_feedback_at(
            learner_id,
            rating,
            comment,
            category,
            Utc::now().timestamp_millis(),
        )
        .await
    }

    /// `record_feedback` with an explicit timestamp, for callers replaying
    /// telemetry with known event times.
    pub async fn record_feedback_at(
        &self,
        learner_id: &str,
        rating: u8,
        comment: Option<String>,
        category: Option<String>,
        timestamp_ms: i64,
    ) -> Result<FeedbackEntry, EngineError> {
        if learner_id.is_empty() {
            return Err(EngineError::Validation(
                "learner id must be non-empty".to_string(),
            ));
        }
        if !(1..=5).contains(&rating) {
            return Err(EngineError::Validation(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }

        let entry = FeedbackEntry {
            id: Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            timestamp: timestamp_ms,
            rating,
            comment,
            category,
        };

        let lock = self.store.learner_lock(learner_id);
        let _guard = lock.lock().await;

        self.entries.write().await.push(entry.clone());
        tracing::debug!(learner_id, rating, "feedback recorded");

        // Touching the record keeps lazy creation and last-active semantics
        // consistent with the progress path; durability stays best-effort.
        self.store
            .apply_locked(learner_id, move |record| {
                record.last_active = timestamp_ms;
                Ok(())
            })
            .await?;

        Ok(entry)
    }

    /// Aggregates entries from the trailing `days` days.
    pub async fn summarize(&self, days: i64) -> Result<FeedbackSummary, EngineError> {
        if days <= 0 {
            return Err(EngineError::Validation(format!(
                "summary window must be positive, got {days} days"
            )));
        }

        let cutoff = Utc::now().timestamp_millis() - days * MS_PER_DAY;
        let entries = self.entries.read().await;
        let window: Vec<&FeedbackEntry> =
            entries.iter().filter(|e| e.timestamp >= cutoff).collect();

        let count = window.len() as u64;
        let average_rating = if window.is_empty() {
            None
        } else {
            Some(window.iter().map(|e| e.rating as f64).sum::<f64>() / window.len() as f64)
        };

        let mut rating_histogram = [0u64; 5];
        for entry in &window {
            rating_histogram[(entry.rating - 1) as usize] += 1;
        }

        let mut category_counts: HashMap<&str, u64> = HashMap::new();
        for entry in &window {
            let category = entry.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
            *category_counts.entry(category).or_insert(0) += 1;
        }
        let mut top_categories: Vec<CategoryCount> = category_counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        top_categories.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));

        let mut recent_comments: Vec<FeedbackEntry> = window
            .iter()
            .filter(|e| e.comment.is_some())
            .rev()
            .take(RECENT_COMMENT_LIMIT)
            .map(|e| (*e).clone())
            .collect();
        recent_comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(FeedbackSummary {
            period_days: days,
            count,
            average_rating,
            rating_histogram,
            top_categories,
            recent_comments,
            improvement_areas: improvement_areas(&window),
        })
    }

    /// One learner's feedback, newest first.
    pub async fn feedback_history(&self, learner_id: &str) -> Vec<FeedbackEntry> {
        let entries = self.entries.read().await;
        let mut history: Vec<FeedbackEntry> = entries
            .iter()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    /// Lifetime statistics with a recent-vs-overall rating trend and
    /// per-category averages.
    pub async fn insights(&self) -> FeedbackInsights {
        let entries = self.entries.read().await;

        let total = entries.len() as u64;
        let average_rating = if entries.is_empty() {
            None
        } else {
            Some(entries.iter().map(|e| e.rating as f64).sum::<f64>() / entries.len() as f64)
        };

        let cutoff = Utc::now().timestamp_millis() - INSIGHTS_WINDOW_DAYS * MS_PER_DAY;
        let recent: Vec<&FeedbackEntry> =
            entries.iter().filter(|e| e.timestamp >= cutoff).collect();
        let recent_average = if recent.is_empty() {
            None
        } else {
            Some(recent.iter().map(|e| e.rating as f64).sum::<f64>() / recent.len() as f64)
        };

        let trend = match (recent_average, average_rating) {
            (Some(recent), Some(overall)) if recent > overall => RatingTrend::Up,
            (Some(recent), Some(overall)) if recent < overall => RatingTrend::Down,
            _ => RatingTrend::Flat,
        };

        let mut by_category: HashMap<&str, (u64, u64)> = HashMap::new();
        for entry in entries.iter() {
            let category = entry.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
            let bucket = by_category.entry(category).or_insert((0, 0));
            bucket.0 += entry.rating as u64;
            bucket.1 += 1;
        }
        let mut category_averages: Vec<CategoryAverage> = by_category
            .into_iter()
            .map(|(category, (sum, count))| CategoryAverage {
                category: category.to_string(),
                average_rating: sum as f64 / count as f64,
                count,
            })
            .collect();
        category_averages.sort_by(|a, b| a.category.cmp(&b.category));

        FeedbackInsights {
            total,
            average_rating,
            recent_average,
            trend,
            category_averages,
        }
    }

    pub async fn export_json(&self) -> Result<String, EngineError> {
        let entries = self.entries.read().await;
        serde_json::to_string_pretty(&*entries)
            .map_err(|err| EngineError::Storage(err.to_string()))
    }

    pub async fn export_csv(&self) -> String {
        let entries = self.entries.read().await;
        let mut out = String::from("id,learnerId,timestamp,rating,comment,category\n");
        for entry in entries.iter() {
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                csv_field(&entry.id),
                csv_field(&entry.learner_id),
                entry.timestamp,
                entry.rating,
                csv_field(entry.comment.as_deref().unwrap_or("")),
                csv_field(entry.category.as_deref().unwrap_or("")),
            ));
        }
        out
    }
}

fn improvement_areas(window: &[&FeedbackEntry]) -> Vec<String> {
    let mut areas = Vec::new();
    if window.is_empty() {
        return areas;
    }

    let low_ratings = window.iter().filter(|e| e.rating <= 2).count();
    if low_ratings as f64 > window.len() as f64 * LOW_RATING_SHARE_THRESHOLD {
        areas.push("High share of low ratings, review overall tutoring quality".to_string());
    }

    let comments: Vec<String> = window
        .iter()
        .filter_map(|e| e.comment.as_deref())
        .map(|c| c.to_lowercase())
        .collect();

    for (keyword, suggestion) in IMPROVEMENT_HINTS {
        if comments.iter().any(|c| c.contains(keyword)) {
            areas.push((*suggestion).to_string());
        }
    }

    areas
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

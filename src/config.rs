use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_MEMORY_SIZE: usize = 1000;
pub const DEFAULT_EMA_ALPHA: f64 = 0.3;
pub const DEFAULT_ENGAGEMENT_SIGNAL: f64 = 1.0;
pub const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 2000;

/// Runtime configuration for the learner-state engine.
///
/// Explicitly constructed and handed to [`crate::engine::TutorEngine::new`];
/// there is no global instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorConfig {
    /// Interaction-log cap per learner; oldest entries are evicted beyond it.
    pub max_memory_size: usize,
    /// EMA learning rate in (0, 1]. Higher adapts faster to recent engagement.
    pub ema_alpha: f64,
    /// Target value each interaction nudges a topic score toward.
    pub engagement_signal: f64,
    /// Upper bound on a single persistence write before it counts as failed.
    pub persist_timeout_ms: u64,
    pub log_level: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            max_memory_size: DEFAULT_MAX_MEMORY_SIZE,
            ema_alpha: DEFAULT_EMA_ALPHA,
            engagement_signal: DEFAULT_ENGAGEMENT_SIGNAL,
            persist_timeout_ms: DEFAULT_PERSIST_TIMEOUT_MS,
            log_level: "info".to_string(),
        }
    }
}

impl TutorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TUTOR_MAX_MEMORY_SIZE") {
            config.max_memory_size = val.parse().unwrap_or(DEFAULT_MAX_MEMORY_SIZE);
        }
        if let Ok(val) = std::env::var("TUTOR_EMA_ALPHA") {
            match val.parse::<f64>() {
                Ok(alpha) if alpha > 0.0 && alpha <= 1.0 => config.ema_alpha = alpha,
                _ => {
                    tracing::warn!(value = %val, "TUTOR_EMA_ALPHA outside (0,1], using default");
                }
            }
        }
        if let Ok(val) = std::env::var("TUTOR_ENGAGEMENT_SIGNAL") {
            match val.parse::<f64>() {
                Ok(signal) if (0.0..=1.0).contains(&signal) => config.engagement_signal = signal,
                _ => {
                    tracing::warn!(value = %val, "TUTOR_ENGAGEMENT_SIGNAL outside [0,1], using default");
                }
            }
        }
        if let Ok(val) = std::env::var("TUTOR_PERSIST_TIMEOUT_MS") {
            config.persist_timeout_ms = val.parse().unwrap_or(DEFAULT_PERSIST_TIMEOUT_MS);
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            config.log_level = val;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_documented_ranges() {
        let config = TutorConfig::default();
        assert!(config.ema_alpha > 0.0 && config.ema_alpha <= 1.0);
        assert!((0.0..=1.0).contains(&config.engagement_signal));
        assert!(config.max_memory_size > 0);
    }
}

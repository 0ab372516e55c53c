use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Weights for merging a finished session into long-term mastery.
/// History dominates so one short burst cannot swing the estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryTuning {
    pub history_weight: f64,
    pub session_weight: f64,
}

impl Default for MasteryTuning {
    fn default() -> Self {
        MasteryTuning {
            history_weight: 0.7,
            session_weight: 0.3,
        }
    }
}

/// Fixed XP reward tiers for graded quiz attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpTuning {
    pub perfect: u64,
    pub pass: u64,
    pub completion: u64,
    pub streak_bonus: u64,
}

impl Default for XpTuning {
    fn default() -> Self {
        XpTuning {
            perfect: 100,
            pass: 50,
            completion: 10,
            streak_bonus: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for all persisted records.
    pub data_dir: PathBuf,
    pub mastery: MasteryTuning,
    pub xp: XpTuning,
    /// Percentage below which a low-score alert fact is emitted.
    pub low_score_alert_threshold: u32,
    /// Consecutive correct answers on a topic before the weak area resolves.
    pub weak_area_resolve_run: u32,
    /// Capacity of the lesson-metadata lookup cache.
    pub lesson_cache_size: usize,
    /// How many weak topics to pass to the question generator as hints.
    pub weak_topic_hints: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            data_dir: PathBuf::from("data"),
            mastery: MasteryTuning::default(),
            xp: XpTuning::default(),
            low_score_alert_threshold: 50,
            weak_area_resolve_run: 3,
            lesson_cache_size: 128,
            weak_topic_hints: 3,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load(path: &Path) -> EngineConfig {
        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str::<EngineConfig>(&content) {
                Ok(config) => {
                    tracing::info!(path = ?path, "Loaded engine config");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Failed to parse engine config, using defaults");
                }
            }
        }
        EngineConfig::default()
    }
}

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::store::read_json;

/// Per (learner, lesson) completion record, upserted at quiz commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub learner_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// High-water quiz percentage; only ever raised.
    pub best_score: Option<u32>,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgress {
    pub fn new(learner_id: &str, lesson_id: &str, at: DateTime<Utc>) -> Self {
        LessonProgress {
            learner_id: learner_id.to_string(),
            lesson_id: lesson_id.to_string(),
            completed: false,
            completed_at: None,
            best_score: None,
            attempts: 0,
            updated_at: at,
        }
    }

    /// Fold one graded attempt into the record. Completion is sticky and the
    /// stored score only moves up.
    pub fn record_attempt(&mut self, percentage: u32, passed: bool, at: DateTime<Utc>) {
        self.attempts += 1;
        if passed && !self.completed {
            self.completed = true;
            self.completed_at = Some(at);
        }
        match self.best_score {
            Some(best) if best >= percentage => {}
            _ => self.best_score = Some(percentage),
        }
        self.updated_at = at;
    }
}

/// File-backed store of lesson progress, one record per (learner, lesson).
pub struct ProgressStore {
    dir: PathBuf,
    records: RwLock<HashMap<(String, String), LessonProgress>>,
}

impl ProgressStore {
    pub fn new(data_dir: &Path) -> Self {
        ProgressStore {
            dir: data_dir.join("progress"),
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, learner_id: &str, lesson_id: &str) -> PathBuf {
        self.dir.join(format!("{}__{}.json", learner_id, lesson_id))
    }

    /// Stored record, loading from disk on first access; `None` when the
    /// learner has never attempted this lesson's quiz.
    pub async fn get_opt(
        &self,
        learner_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, EngineError> {
        let key = (learner_id.to_string(), lesson_id.to_string());
        if let Some(record) = self.records.read().get(&key) {
            return Ok(Some(record.clone()));
        }
        let loaded = read_json::<LessonProgress>(&self.path_for(learner_id, lesson_id)).await?;
        if let Some(record) = loaded {
            let mut records = self.records.write();
            return Ok(Some(records.entry(key).or_insert(record).clone()));
        }
        Ok(None)
    }

    pub async fn get(
        &self,
        learner_id: &str,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, EngineError> {
        Ok(self
            .get_opt(learner_id, lesson_id)
            .await?
            .unwrap_or_else(|| LessonProgress::new(learner_id, lesson_id, now)))
    }

    pub fn apply(&self, record: LessonProgress) {
        let key = (record.learner_id.clone(), record.lesson_id.clone());
        self.records.write().insert(key, record);
    }
}

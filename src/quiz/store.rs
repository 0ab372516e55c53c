use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::quiz::QuizAttempt;
use crate::store::read_json;

/// File-backed store of immutable attempt records, one file per attempt.
pub struct AttemptStore {
    dir: PathBuf,
    attempts: RwLock<HashMap<String, QuizAttempt>>,
}

impl AttemptStore {
    pub fn new(data_dir: &Path) -> Self {
        AttemptStore {
            dir: data_dir.join("attempts"),
            attempts: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, attempt_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", attempt_id))
    }

    /// Existing record for the id, if the attempt was already committed.
    pub async fn get(&self, attempt_id: &str) -> Result<Option<QuizAttempt>, EngineError> {
        if let Some(attempt) = self.attempts.read().get(attempt_id) {
            return Ok(Some(attempt.clone()));
        }
        let loaded = read_json::<QuizAttempt>(&self.path_for(attempt_id)).await?;
        if let Some(attempt) = loaded {
            let mut attempts = self.attempts.write();
            return Ok(Some(
                attempts
                    .entry(attempt_id.to_string())
                    .or_insert(attempt)
                    .clone(),
            ));
        }
        Ok(None)
    }

    pub fn apply(&self, attempt: QuizAttempt) {
        self.attempts
            .write()
            .insert(attempt.attempt_id.clone(), attempt);
    }
}

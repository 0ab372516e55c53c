use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::mastery::MasteryState;
use crate::store::read_json;

type MasteryKey = (String, String, u8);

/// File-backed store of mastery aggregates, one record per
/// (learner, subject, grade).
pub struct MasteryStore {
    dir: PathBuf,
    states: RwLock<HashMap<MasteryKey, MasteryState>>,
}

impl MasteryStore {
    pub fn new(data_dir: &Path) -> Self {
        MasteryStore {
            dir: data_dir.join("mastery"),
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, learner_id: &str, subject: &str, grade_level: u8) -> PathBuf {
        self.dir
            .join(format!("{}__{}__{}.json", learner_id, subject, grade_level))
    }

    /// Stored state without creating one; `None` when the learner has never
    /// committed a session for this subject/grade.
    pub async fn get(
        &self,
        learner_id: &str,
        subject: &str,
        grade_level: u8,
    ) -> Result<Option<MasteryState>, EngineError> {
        let key = (learner_id.to_string(), subject.to_string(), grade_level);
        if let Some(state) = self.states.read().get(&key) {
            return Ok(Some(state.clone()));
        }
        let loaded =
            read_json::<MasteryState>(&self.path_for(learner_id, subject, grade_level)).await?;
        if let Some(state) = loaded {
            let mut states = self.states.write();
            return Ok(Some(states.entry(key).or_insert(state).clone()));
        }
        Ok(None)
    }

    /// Stored state, or the lazy default (medium difficulty, level 50).
    pub async fn get_or_create(
        &self,
        learner_id: &str,
        subject: &str,
        grade_level: u8,
    ) -> Result<MasteryState, EngineError> {
        Ok(self
            .get(learner_id, subject, grade_level)
            .await?
            .unwrap_or_else(|| MasteryState::new(learner_id, subject, grade_level)))
    }

    /// Pull every persisted mastery state for the learner into the in-memory
    /// view and return the highest level held across subjects. Unparsable
    /// records are skipped with a warning.
    pub async fn load_all_for(&self, learner_id: &str) -> Result<u8, EngineError> {
        let prefix = format!("{}__", learner_id);
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(self.max_level_for(learner_id));
            }
            Err(e) => {
                return Err(EngineError::storage(
                    format!("Failed to read mastery directory: {}", e),
                    "store",
                )
                .with_context(format!("path: {:?}", self.dir)));
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            match read_json::<MasteryState>(&path).await {
                Ok(Some(state)) => {
                    let key = (
                        state.learner_id.clone(),
                        state.subject.clone(),
                        state.grade_level,
                    );
                    self.states.write().entry(key).or_insert(state);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Skipping unreadable mastery record");
                }
            }
        }

        Ok(self.max_level_for(learner_id))
    }

    /// Highest mastery level across subjects in the in-memory view.
    pub fn max_level_for(&self, learner_id: &str) -> u8 {
        self.states
            .read()
            .iter()
            .filter(|((learner, _, _), _)| learner == learner_id)
            .map(|(_, state)| state.mastery_level)
            .max()
            .unwrap_or(0)
    }

    pub fn apply(&self, state: MasteryState) {
        let key = (
            state.learner_id.clone(),
            state.subject.clone(),
            state.grade_level,
        );
        self.states.write().insert(key, state);
    }
}

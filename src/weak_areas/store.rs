use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::store::read_json;
use crate::weak_areas::WeakAreaSet;

/// File-backed store of weak-area sets, one record per (learner, subject).
/// The in-memory map is the authoritative view; mutations are staged and
/// applied by the engine under the learner's write lock.
pub struct WeakAreaStore {
    dir: PathBuf,
    sets: RwLock<HashMap<(String, String), WeakAreaSet>>,
}

impl WeakAreaStore {
    pub fn new(data_dir: &Path) -> Self {
        WeakAreaStore {
            dir: data_dir.join("weak_areas"),
            sets: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, learner_id: &str, subject: &str) -> PathBuf {
        self.dir.join(format!("{}__{}.json", learner_id, subject))
    }

    /// Stored set for the pair, loading from disk on first access; `None`
    /// when no weakness has been recorded yet.
    pub async fn get_opt(
        &self,
        learner_id: &str,
        subject: &str,
    ) -> Result<Option<WeakAreaSet>, EngineError> {
        let key = (learner_id.to_string(), subject.to_string());
        if let Some(set) = self.sets.read().get(&key) {
            return Ok(Some(set.clone()));
        }
        let loaded = read_json::<WeakAreaSet>(&self.path_for(learner_id, subject)).await?;
        if let Some(set) = loaded {
            let mut sets = self.sets.write();
            return Ok(Some(sets.entry(key).or_insert(set).clone()));
        }
        Ok(None)
    }

    /// Stored set, or an empty one for an untracked pair.
    pub async fn get(&self, learner_id: &str, subject: &str) -> Result<WeakAreaSet, EngineError> {
        Ok(self
            .get_opt(learner_id, subject)
            .await?
            .unwrap_or_else(|| WeakAreaSet::new(learner_id, subject)))
    }

    /// Install a committed set into the in-memory view.
    pub fn apply(&self, set: WeakAreaSet) {
        let key = (set.learner_id.clone(), set.subject.clone());
        self.sets.write().insert(key, set);
    }
}

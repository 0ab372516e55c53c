use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::ledger::LearnerProfile;
use crate::store::read_json;

/// File-backed store of learner profiles, one record per learner.
pub struct LedgerStore {
    dir: PathBuf,
    profiles: RwLock<HashMap<String, LearnerProfile>>,
}

impl LedgerStore {
    pub fn new(data_dir: &Path) -> Self {
        LedgerStore {
            dir: data_dir.join("profiles"),
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, learner_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", learner_id))
    }

    /// Stored profile, loading from disk on first access; `None` when the
    /// ledger has never seen this learner.
    pub async fn get_opt(&self, learner_id: &str) -> Result<Option<LearnerProfile>, EngineError> {
        if let Some(profile) = self.profiles.read().get(learner_id) {
            return Ok(Some(profile.clone()));
        }
        let loaded = read_json::<LearnerProfile>(&self.path_for(learner_id)).await?;
        if let Some(profile) = loaded {
            let mut profiles = self.profiles.write();
            return Ok(Some(
                profiles
                    .entry(learner_id.to_string())
                    .or_insert(profile)
                    .clone(),
            ));
        }
        Ok(None)
    }

    /// Stored profile, or the zeroed profile for a new learner.
    pub async fn get(&self, learner_id: &str) -> Result<LearnerProfile, EngineError> {
        Ok(self
            .get_opt(learner_id)
            .await?
            .unwrap_or_else(|| LearnerProfile::new(learner_id)))
    }

    pub fn apply(&self, profile: LearnerProfile) {
        self.profiles
            .write()
            .insert(profile.learner_id.clone(), profile);
    }
}

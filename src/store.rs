use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// Read one JSON record from disk. A missing file is `Ok(None)`; a present
/// but unreadable or unparsable file is a storage error, never silently
/// replaced with defaults (these records carry XP and mastery).
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, EngineError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let value = serde_json::from_str::<T>(&content).map_err(|e| {
                EngineError::storage(format!("Failed to parse record: {}", e), "store")
                    .with_context(format!("path: {:?}", path))
            })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::storage(
            format!("Failed to read record: {}", e),
            "store",
        )
        .with_context(format!("path: {:?}", path))),
    }
}

struct StagedWrite {
    path: PathBuf,
    next: String,
    /// Serialized prior content, `None` when the record is new.
    prev: Option<String>,
}

/// A staged multi-record commit. Every mutation of a quiz submission is
/// collected here, then written together; if any write fails, the already
/// written files are restored to their prior content so the submission
/// either fully applies or has no effect.
#[derive(Default)]
pub struct WriteSet {
    writes: Vec<StagedWrite>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<T: Serialize>(
        &mut self,
        path: PathBuf,
        next: &T,
        prev: Option<&T>,
    ) -> Result<(), EngineError> {
        let next = serde_json::to_string_pretty(next)?;
        let prev = match prev {
            Some(value) => Some(serde_json::to_string_pretty(value)?),
            None => None,
        };
        self.writes.push(StagedWrite { path, next, prev });
        Ok(())
    }

    pub async fn commit(self) -> Result<(), EngineError> {
        for (index, write) in self.writes.iter().enumerate() {
            if let Err(e) = write_one(&write.path, &write.next).await {
                self.undo(index).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Roll back the first `applied` writes, best effort.
    async fn undo(&self, applied: usize) {
        for write in self.writes[..applied].iter().rev() {
            let result = match &write.prev {
                Some(prev) => tokio::fs::write(&write.path, prev).await,
                None => tokio::fs::remove_file(&write.path).await,
            };
            if let Err(e) = result {
                tracing::error!(
                    path = ?write.path,
                    error = %e,
                    "Failed to roll back staged write"
                );
            }
        }
    }
}

async fn write_one(path: &Path, json: &str) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            EngineError::storage(format!("Failed to create directory: {}", e), "store")
                .with_context(format!("path: {:?}", parent))
        })?;
    }
    tokio::fs::write(path, json).await.map_err(|e| {
        EngineError::storage(format!("Failed to write record: {}", e), "store")
            .with_context(format!("path: {:?}", path))
    })
}

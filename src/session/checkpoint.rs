//! Session checkpoints for crash recovery
//!
//! A checkpoint records the instant up to which portal time has been credited.
//! Storage is best-effort: a missing, corrupt, or foreign checkpoint simply
//! means the next session starts fresh.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::write_locked;
use crate::error::{EngagementError, Result};

/// Locally persisted tracker progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCheckpoint {
    pub user_id: String,
    pub session_start_time: DateTime<Utc>,
    /// Portal time is credited up to this instant
    pub last_checkpoint: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl SessionCheckpoint {
    pub fn fresh(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            session_start_time: now,
            last_checkpoint: now,
            saved_at: now,
        }
    }
}

/// Ephemeral key-value slot holding at most one checkpoint
pub trait CheckpointStore: Send + Sync {
    /// The stored checkpoint if it exists, parses, and belongs to `user_id`
    fn load(&self, user_id: &str) -> Option<SessionCheckpoint>;

    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<()>;

    /// Remove the checkpoint if it belongs to `user_id`
    fn clear(&self, user_id: &str) -> Result<()>;
}

/// In-memory checkpoint slot
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    slot: Mutex<Option<SessionCheckpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw view of the slot regardless of owner
    pub fn peek(&self) -> Option<SessionCheckpoint> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Simulate the browser dropping local storage
    pub fn wipe(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, user_id: &str) -> Option<SessionCheckpoint> {
        self.peek().filter(|cp| cp.user_id == user_id)
    }

    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(checkpoint.clone());
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|cp| cp.user_id == user_id) {
            *slot = None;
        }
        Ok(())
    }
}

/// Checkpoint stored as JSON in a single file
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<SessionCheckpoint> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                tracing::debug!("Discarding malformed checkpoint {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, user_id: &str) -> Option<SessionCheckpoint> {
        self.read().filter(|cp| cp.user_id == user_id)
    }

    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<()> {
        let content = serde_json::to_vec_pretty(checkpoint)?;
        write_locked(&self.path, &content).map_err(|e| EngagementError::Checkpoint(format!("{e:#}")))
    }

    fn clear(&self, user_id: &str) -> Result<()> {
        if self.read().is_some_and(|cp| cp.user_id != user_id) {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn sample(user: &str) -> SessionCheckpoint {
        SessionCheckpoint::fresh(user, Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_file_store_round_trip_and_ownership() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("session.json"));

        assert_eq!(store.load("alice"), None);
        store.save(&sample("alice")).unwrap();

        assert_eq!(store.load("alice"), Some(sample("alice")));
        assert_eq!(store.load("bob"), None);

        store.clear("bob").unwrap();
        assert!(store.load("alice").is_some());
        store.clear("alice").unwrap();
        assert_eq!(store.load("alice"), None);
        store.clear("alice").unwrap();
    }

    #[test]
    fn test_file_store_ignores_corrupt_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"userId\": \"alice\", \"sessionStart").unwrap();

        let store = FileCheckpointStore::new(&path);
        assert_eq!(store.load("alice"), None);

        store.save(&sample("alice")).unwrap();
        assert!(store.load("alice").is_some());
    }

    #[test]
    fn test_memory_store_wipe() {
        let store = MemoryCheckpointStore::new();
        store.save(&sample("alice")).unwrap();
        store.wipe();
        assert_eq!(store.load("alice"), None);
    }
}

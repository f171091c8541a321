//! Session persistence.
//!
//! A store holds one `WorkflowState` per session. Writes replace the whole
//! snapshot, so a reader sees either the state before a write or the state
//! after it, never a mix.

use crate::error::StoreError;
use crate::state::WorkflowState;
use adpipe_core::SessionId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Load/save access to session states.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored state, if any.
    async fn get(&self, session_id: SessionId) -> Result<Option<WorkflowState>, StoreError>;

    /// Stores `state`, replacing any previous snapshot.
    async fn put(&self, session_id: SessionId, state: WorkflowState) -> Result<(), StoreError>;

    /// Creates and stores a fresh state.
    ///
    /// Fails with `AlreadyExists` if the id is already stored.
    async fn create(&self, session_id: SessionId) -> Result<WorkflowState, StoreError>;
}

/// Keeps sessions in process memory.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, WorkflowState>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: SessionId) -> Result<Option<WorkflowState>, StoreError> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn put(&self, session_id: SessionId, state: WorkflowState) -> Result<(), StoreError> {
        self.sessions.write().await.insert(session_id, state);
        Ok(())
    }

    async fn create(&self, session_id: SessionId) -> Result<WorkflowState, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(StoreError::AlreadyExists { session_id });
        }
        let state = WorkflowState::new(session_id);
        sessions.insert(session_id, state.clone());
        Ok(state)
    }
}

/// Keeps one JSON file per session in a directory.
///
/// Files are written next to their final path and renamed into place.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    directory: PathBuf,
}

impl FileSessionStore {
    /// Opens a store rooted at `directory`, creating it if needed.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| StoreError::WriteFailed {
                message: format!("create {}: {e}", directory.display()),
            })?;
        Ok(Self { directory })
    }

    /// The directory sessions are stored in.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, session_id: SessionId) -> PathBuf {
        self.directory.join(format!("{session_id}.json"))
    }

    async fn write(&self, session_id: SessionId, state: &WorkflowState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| StoreError::WriteFailed {
            message: format!("encode {session_id}: {e}"),
        })?;
        let path = self.path_for(session_id);
        let tmp = self.directory.join(format!(".{session_id}.json.tmp"));

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::WriteFailed {
                message: format!("write {}: {e}", tmp.display()),
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::WriteFailed {
                message: format!("rename into {}: {e}", path.display()),
            })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, session_id: SessionId) -> Result<Option<WorkflowState>, StoreError> {
        let path = self.path_for(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    message: format!("read {}: {e}", path.display()),
                });
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                session_id,
                message: e.to_string(),
            })
    }

    async fn put(&self, session_id: SessionId, state: WorkflowState) -> Result<(), StoreError> {
        self.write(session_id, &state).await
    }

    async fn create(&self, session_id: SessionId) -> Result<WorkflowState, StoreError> {
        let exists = tokio::fs::try_exists(self.path_for(session_id))
            .await
            .map_err(|e| StoreError::ReadFailed {
                message: e.to_string(),
            })?;
        if exists {
            return Err(StoreError::AlreadyExists { session_id });
        }
        let state = WorkflowState::new(session_id);
        self.write(session_id, &state).await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepId;

    #[tokio::test]
    async fn in_memory_create_get_put() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();

        assert_eq!(store.get(id).await, Ok(None));

        let mut state = store.create(id).await.expect("create");
        assert_eq!(store.get(id).await, Ok(Some(state.clone())));

        state.current_step = StepId::Analyze;
        store.put(id, state.clone()).await.expect("put");
        assert_eq!(
            store.get(id).await.expect("get").map(|s| s.current_step),
            Some(StepId::Analyze)
        );
    }

    #[tokio::test]
    async fn in_memory_create_twice_fails() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        store.create(id).await.expect("create");
        assert_eq!(
            store.create(id).await,
            Err(StoreError::AlreadyExists { session_id: id })
        );
    }

    #[tokio::test]
    async fn in_memory_get_returns_snapshot() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        let mut snapshot = store.create(id).await.expect("create");
        snapshot.push_user_message("not persisted");

        let stored = store.get(id).await.expect("get").expect("present");
        assert!(stored.messages.is_empty());
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::open(dir.path().join("sessions"))
            .await
            .expect("open");
        let id = SessionId::new();

        let mut state = store.create(id).await.expect("create");
        state.push_user_message("https://shop.example/widget");
        state.record_iteration(StepId::Scrape);
        store.put(id, state.clone()).await.expect("put");

        let loaded = store.get(id).await.expect("get");
        assert_eq!(loaded, Some(state));
        assert!(store.directory().join(format!("{id}.json")).exists());
    }

    #[tokio::test]
    async fn file_store_missing_and_duplicate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::open(dir.path()).await.expect("open");
        let id = SessionId::new();

        assert_eq!(store.get(id).await, Ok(None));
        store.create(id).await.expect("create");
        assert_eq!(
            store.create(id).await,
            Err(StoreError::AlreadyExists { session_id: id })
        );
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::open(dir.path()).await.expect("open");
        let id = SessionId::new();
        std::fs::write(dir.path().join(format!("{id}.json")), b"{not json").expect("write");

        let err = store.get(id).await.expect_err("corrupt");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}

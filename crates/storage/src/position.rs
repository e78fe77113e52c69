//! Local position store: "current question index for subject X".
//!
//! One string entry per subject under `currentIndex_{subjectId}`. The entry
//! is a cache of where the learner was; it never decides completion.

use std::sync::Arc;

use exam_core::model::{SessionPosition, SubjectId};

use crate::repository::{KeyValueStore, StorageError};

const KEY_PREFIX: &str = "currentIndex_";

#[must_use]
pub fn position_key(subject_id: SubjectId) -> String {
    format!("{KEY_PREFIX}{subject_id}")
}

#[derive(Clone)]
pub struct PositionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl PositionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the cached position for a subject.
    ///
    /// An unparsable entry is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    pub async fn get(&self, subject_id: SubjectId) -> Result<Option<SessionPosition>, StorageError> {
        let Some(raw) = self.kv.get(&position_key(subject_id)).await? else {
            return Ok(None);
        };
        match raw.trim().parse::<usize>() {
            Ok(index) => Ok(Some(SessionPosition::new(subject_id, index))),
            Err(_) => {
                tracing::warn!(subject_id = %subject_id, raw = %raw, "ignoring malformed cached index");
                Ok(None)
            }
        }
    }

    /// Persist the position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    pub async fn set(&self, position: SessionPosition) -> Result<(), StorageError> {
        self.kv
            .set(
                &position_key(position.subject_id()),
                &position.current_index().to_string(),
            )
            .await
    }

    /// Remove the entry entirely, so the next load starts from a clamped
    /// default rather than a stale zero.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    pub async fn clear(&self, subject_id: SubjectId) -> Result<(), StorageError> {
        self.kv.remove(&position_key(subject_id)).await
    }
}

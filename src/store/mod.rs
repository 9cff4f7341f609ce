pub mod document;
pub mod partition;
pub mod paths;
pub mod task_store;

pub use document::{FrontMatter, Keyword, Priority, Stage, TaskDocument, TaskKind};
pub use partition::Partition;
pub use paths::{is_task_document_filename, StorePaths};
pub use task_store::{NewTaskDocument, TaskStore};

use crate::shared::ids::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("task `{id}` not found in any partition")]
    NotFound { id: TaskId },
    #[error("task `{id}` is no longer in {expected}; found in {found}")]
    Conflict {
        id: TaskId,
        expected: Partition,
        found: Partition,
    },
    #[error("malformed task document `{id}`: {reason}")]
    Malformed { id: TaskId, reason: String },
    #[error("task `{id}` already exists in {partition}")]
    AlreadyExists { id: TaskId, partition: Partition },
}

impl StoreError {
    /// Store-level conditions that should abort a whole driver pass, as
    /// opposed to per-task failures the pass can absorb.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Io { .. })
    }
}

use super::{Partition, StoreError, StorePaths};
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::TaskId;
use crate::store::document::{FrontMatter, Keyword, Priority, Stage, TaskDocument, TaskKind};
use crate::store::paths::is_task_document_filename;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Watcher-facing creation payload; the only interface an external watcher
/// uses (everything else is driven by the loop or a human approval action).
#[derive(Debug, Clone)]
pub struct NewTaskDocument {
    pub id: TaskId,
    pub kind: TaskKind,
    pub keyword: Keyword,
    pub priority: Priority,
    pub source: Option<String>,
    pub body: String,
}

/// Directory-backed task store. Partition directories double as pipeline
/// state; every mutation goes through this type so the single-partition
/// invariant and stale-move detection are enforced here, not by callers.
#[derive(Debug, Clone)]
pub struct TaskStore {
    paths: StorePaths,
}

impl TaskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: StorePaths::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn bootstrap(&self) -> Result<(), StoreError> {
        for dir in self.paths.required_directories() {
            fs::create_dir_all(&dir).map_err(|source| io_err(&dir, source))?;
        }
        Ok(())
    }

    /// Task ids currently in `partition`, sorted by id. The order is stable
    /// for determinism only; it carries no priority meaning.
    pub fn list(&self, partition: Partition) -> Result<Vec<TaskId>, StoreError> {
        let dir = self.paths.partition_dir(partition);
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|source| io_err(&dir, source))? {
            let entry = entry.map_err(|source| io_err(&dir, source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_task_document_filename(name) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = TaskId::parse(stem) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn locate(&self, id: &TaskId) -> Result<Option<Partition>, StoreError> {
        for partition in Partition::ALL {
            if self.paths.document_path(partition, id.as_str()).is_file() {
                return Ok(Some(partition));
            }
        }
        Ok(None)
    }

    pub fn read(&self, id: &TaskId) -> Result<(Partition, TaskDocument), StoreError> {
        let partition = self
            .locate(id)?
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        let doc = self.read_in(id, partition)?;
        Ok((partition, doc))
    }

    /// Reads the document where the caller last observed it. A missing file
    /// means another actor moved it between observation and read; that is the
    /// same stale-state condition `move_task` detects, reported the same way
    /// (`Conflict` when relocated, `NotFound` when gone) so a racing human
    /// approval stays a per-task condition, never an io failure.
    pub fn read_in(&self, id: &TaskId, partition: Partition) -> Result<TaskDocument, StoreError> {
        let path = self.paths.document_path(partition, id.as_str());
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return match self.locate(id)? {
                    Some(found) => Err(StoreError::Conflict {
                        id: id.clone(),
                        expected: partition,
                        found,
                    }),
                    None => Err(StoreError::NotFound { id: id.clone() }),
                };
            }
            Err(source) => return Err(io_err(&path, source)),
        };
        TaskDocument::parse(id.clone(), &raw).map_err(|reason| StoreError::Malformed {
            id: id.clone(),
            reason,
        })
    }

    /// Writes a new document into Needs_Action. Fails if the id exists in
    /// any partition; ids are unique across the whole store.
    pub fn create(&self, new: NewTaskDocument, now: DateTime<Utc>) -> Result<TaskId, StoreError> {
        if let Some(partition) = self.locate(&new.id)? {
            return Err(StoreError::AlreadyExists {
                id: new.id,
                partition,
            });
        }

        let doc = TaskDocument {
            id: new.id.clone(),
            front: FrontMatter {
                kind: new.kind,
                keyword: new.keyword,
                priority: new.priority,
                stage: Stage::Analysis,
                created: Some(now),
                source: new.source,
            },
            body: new.body,
        };

        let path = self
            .paths
            .document_path(Partition::NeedsAction, new.id.as_str());
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::AlreadyExists {
                    StoreError::AlreadyExists {
                        id: new.id.clone(),
                        partition: Partition::NeedsAction,
                    }
                } else {
                    io_err(&path, source)
                }
            })?;
        file.write_all(doc.render().as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|source| io_err(&path, source))?;
        Ok(new.id)
    }

    /// Atomic relocation between partitions. Fails fast with `Conflict` when
    /// another actor already moved the document out of `from`; never retries.
    pub fn move_task(
        &self,
        id: &TaskId,
        from: Partition,
        to: Partition,
    ) -> Result<(), StoreError> {
        let from_path = self.paths.document_path(from, id.as_str());
        let to_path = self.paths.document_path(to, id.as_str());

        match fs::rename(&from_path, &to_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                match self.locate(id)? {
                    Some(found) => Err(StoreError::Conflict {
                        id: id.clone(),
                        expected: from,
                        found,
                    }),
                    None => Err(StoreError::NotFound { id: id.clone() }),
                }
            }
            Err(err) => Err(io_err(&from_path, err)),
        }
    }

    /// Appends generated content to the document body without changing its
    /// partition. The rewrite is atomic; no partial document is observable.
    pub fn append(&self, id: &TaskId, text: &str) -> Result<(), StoreError> {
        let (partition, mut doc) = self.read(id)?;
        doc.append_section(text);
        self.write_document(partition, &doc)
    }

    pub fn write_stage(&self, id: &TaskId, stage: Stage) -> Result<(), StoreError> {
        let (partition, mut doc) = self.read(id)?;
        if doc.front.stage == stage {
            return Ok(());
        }
        doc.front.stage = stage;
        self.write_document(partition, &doc)
    }

    fn write_document(&self, partition: Partition, doc: &TaskDocument) -> Result<(), StoreError> {
        let path = self.paths.document_path(partition, doc.id.as_str());
        atomic_write_file(&path, doc.render().as_bytes()).map_err(|source| io_err(&path, source))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

use super::Partition;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }

    pub fn document_path(&self, partition: Partition, id: &str) -> PathBuf {
        self.partition_dir(partition).join(format!("{id}.md"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("Logs")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("deskhand.yaml")
    }

    pub fn required_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Partition::ALL
            .iter()
            .map(|p| self.partition_dir(*p))
            .collect();
        dirs.push(self.logs_dir());
        dirs
    }
}

pub fn is_task_document_filename(filename: &str) -> bool {
    let path = Path::new(filename);
    if path.extension().and_then(|v| v.to_str()) != Some("md") {
        return false;
    }

    if let Some(stem) = path.file_stem().and_then(|v| v.to_str()) {
        return crate::shared::ids::validate_identifier_value("task id", stem).is_ok();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_filenames_require_md_extension_and_valid_stem() {
        assert!(is_task_document_filename("facebook_message_1.md"));
        assert!(!is_task_document_filename("notes.txt"));
        assert!(!is_task_document_filename(".hidden.md"));
        assert!(!is_task_document_filename("bad name.md"));
    }

    #[test]
    fn required_directories_cover_every_partition_and_logs() {
        let paths = StorePaths::new("/tmp/store");
        let dirs = paths.required_directories();
        assert_eq!(dirs.len(), Partition::ALL.len() + 1);
        assert!(dirs.contains(&PathBuf::from("/tmp/store/Pending_Approval")));
        assert!(dirs.contains(&PathBuf::from("/tmp/store/Logs")));
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn pipeline_log_path(store_root: &Path) -> PathBuf {
    store_root.join("Logs/pipeline.log")
}

pub fn append_pipeline_log_line(store_root: &Path, line: &str) -> std::io::Result<()> {
    let path = pipeline_log_path(store_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_lines_in_order() {
        let dir = tempdir().expect("tempdir");
        append_pipeline_log_line(dir.path(), "first").expect("append");
        append_pipeline_log_line(dir.path(), "second").expect("append");

        let body = fs::read_to_string(pipeline_log_path(dir.path())).expect("read log");
        assert_eq!(body, "first\nsecond\n");
    }
}

use super::{AuditEntry, AuditError};
use chrono::{DateTime, NaiveDate, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const DAY_FILE_PREFIX: &str = "audit_";
const DAY_FILE_EXT: &str = "jsonl";

/// Append-only audit log stored as one JSON-lines file per day under the
/// Logs directory. Entries are never rewritten; the retention sweep removes
/// whole day files, never individual entries.
#[derive(Debug, Clone)]
pub struct AuditLog {
    logs_dir: PathBuf,
}

impl AuditLog {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn day_file(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir.join(format!(
            "{DAY_FILE_PREFIX}{}.{DAY_FILE_EXT}",
            date.format("%Y%m%d")
        ))
    }

    pub fn append(&self, entry: &AuditEntry) -> Result<PathBuf, AuditError> {
        let path = self.day_file(entry.timestamp.date_naive());
        fs::create_dir_all(&self.logs_dir).map_err(|source| io_err(&self.logs_dir, source))?;

        let line = serde_json::to_string(entry).map_err(AuditError::Encode)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| io_err(&path, source))?;
        writeln!(file, "{line}").map_err(|source| io_err(&path, source))?;
        Ok(path)
    }

    /// All entries at or after `since`, ordered by timestamp. Unparseable
    /// lines are skipped; a corrupted line must not block reporting.
    pub fn entries_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditEntry>, AuditError> {
        let mut entries = Vec::new();
        for (date, path) in self.day_files()? {
            if date < since.date_naive() {
                continue;
            }
            let raw = fs::read_to_string(&path).map_err(|source| io_err(&path, source))?;
            for line in raw.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Ok(entry) = serde_json::from_str::<AuditEntry>(trimmed) {
                    if entry.timestamp >= since {
                        entries.push(entry);
                    }
                }
            }
        }
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    /// Deletes whole day files strictly older than `horizon_days` before
    /// `now`. Returns the deleted paths.
    pub fn purge(&self, horizon_days: u32, now: DateTime<Utc>) -> Result<Vec<PathBuf>, AuditError> {
        let cutoff = now.date_naive() - chrono::Days::new(u64::from(horizon_days));
        let mut deleted = Vec::new();
        for (date, path) in self.day_files()? {
            if date < cutoff {
                fs::remove_file(&path).map_err(|source| io_err(&path, source))?;
                deleted.push(path);
            }
        }
        Ok(deleted)
    }

    fn day_files(&self) -> Result<Vec<(NaiveDate, PathBuf)>, AuditError> {
        let mut files = Vec::new();
        let entries = match fs::read_dir(&self.logs_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(source) => return Err(io_err(&self.logs_dir, source)),
        };
        for entry in entries {
            let entry = entry.map_err(|source| io_err(&self.logs_dir, source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(date) = parse_day_file_name(name) {
                files.push((date, path));
            }
        }
        files.sort();
        Ok(files)
    }
}

fn parse_day_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name
        .strip_prefix(DAY_FILE_PREFIX)?
        .strip_suffix(&format!(".{DAY_FILE_EXT}"))?;
    NaiveDate::parse_from_str(stem, "%Y%m%d").ok()
}

fn io_err(path: &Path, source: std::io::Error) -> AuditError {
    AuditError::Io {
        path: path.display().to_string(),
        source,
    }
}

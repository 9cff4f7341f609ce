pub mod entry;
pub mod log;
pub mod summary;

pub use entry::{ActionResult, ApprovalStatus, AuditEntry};
pub use log::AuditLog;
pub use summary::AuditSummary;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode audit entry: {0}")]
    Encode(#[source] serde_json::Error),
}

pub mod executor;
pub mod templates;

pub use executor::SimulatedExecutor;
pub use templates::TemplateResponder;

use crate::store::TaskDocument;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("draft generation failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("execution collaborator failed: {0}")]
    Failed(String),
}

/// Proof of a completed outbound action, recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub reference: String,
}

/// Drafts a response for a task document. The pipeline never sends anything
/// a responder produces without human approval.
pub trait Responder {
    fn generate(&self, doc: &TaskDocument, now: DateTime<Utc>)
        -> Result<String, ResponderError>;
}

/// Carries out the externally visible action for an approved task.
pub trait Executor {
    fn execute(&self, doc: &TaskDocument) -> Result<ExecutionReceipt, ExecutionError>;
}

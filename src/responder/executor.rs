use super::{ExecutionError, ExecutionReceipt, Executor};
use crate::store::TaskDocument;

/// Stand-in for outbound connectors. Produces a deterministic receipt so the
/// rest of the pipeline, including the audit trail, behaves exactly as it
/// would against a live connector.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor;

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for SimulatedExecutor {
    fn execute(&self, doc: &TaskDocument) -> Result<ExecutionReceipt, ExecutionError> {
        Ok(ExecutionReceipt {
            reference: format!("mcp-sim-{}", doc.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ids::TaskId;
    use crate::store::{FrontMatter, Keyword, Priority, Stage, TaskKind};

    #[test]
    fn receipt_reference_is_stable_for_a_task() {
        let doc = TaskDocument {
            id: TaskId::parse("fb_20260829_120000").expect("task id"),
            front: FrontMatter {
                kind: TaskKind::FacebookMessage,
                keyword: Keyword::Sales,
                priority: Priority::Medium,
                stage: Stage::McpExecution,
                created: None,
                source: None,
            },
            body: String::new(),
        };
        let executor = SimulatedExecutor::new();
        let first = executor.execute(&doc).expect("execute");
        let second = executor.execute(&doc).expect("execute");
        assert_eq!(first.reference, "mcp-sim-fb_20260829_120000");
        assert_eq!(first, second);
    }
}

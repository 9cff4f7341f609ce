use crate::shared::ids::TaskId;

/// Outcome of one bounded driver run, rendered for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub iterations: u32,
    pub max_iterations: u32,
    pub quiescent: bool,
    pub cancelled: bool,
    pub transitions: u32,
    pub completed: Vec<TaskId>,
    pub awaiting_approval: Vec<TaskId>,
    pub frozen: Vec<(TaskId, String)>,
}

impl RunReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.cancelled {
            out.push_str(&format!(
                "Run cancelled after {} of {} iteration(s).\n",
                self.iterations, self.max_iterations
            ));
        } else if self.quiescent {
            out.push_str(&format!(
                "TASK_COMPLETE: pipeline quiescent after {} iteration(s), {} transition(s).\n",
                self.iterations, self.transitions
            ));
        } else {
            out.push_str(&format!(
                "Warning: iteration cap {} reached without quiescence ({} transition(s)).\n",
                self.max_iterations, self.transitions
            ));
        }

        if !self.completed.is_empty() {
            out.push_str(&format!("Completed: {}\n", join_ids(&self.completed)));
        }
        if !self.awaiting_approval.is_empty() {
            out.push_str(&format!(
                "Awaiting approval: {}\n",
                join_ids(&self.awaiting_approval)
            ));
        }
        for (id, reason) in &self.frozen {
            out.push_str(&format!("Frozen (malformed): {id}: {reason}\n"));
        }
        out
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> TaskId {
        TaskId::parse(raw).expect("task id")
    }

    #[test]
    fn quiescent_report_announces_task_complete() {
        let report = RunReport {
            iterations: 2,
            max_iterations: 20,
            quiescent: true,
            cancelled: false,
            transitions: 5,
            completed: vec![id("fb_1")],
            awaiting_approval: vec![id("tw_1"), id("tw_2")],
            frozen: Vec::new(),
        };
        let text = report.render();
        assert!(text.starts_with("TASK_COMPLETE"));
        assert!(text.contains("Completed: fb_1"));
        assert!(text.contains("Awaiting approval: tw_1, tw_2"));
    }

    #[test]
    fn capped_report_warns_and_lists_frozen_documents() {
        let report = RunReport {
            iterations: 20,
            max_iterations: 20,
            quiescent: false,
            cancelled: false,
            transitions: 41,
            completed: Vec::new(),
            awaiting_approval: Vec::new(),
            frozen: vec![(id("broken"), "invalid front matter".to_string())],
        };
        let text = report.render();
        assert!(text.starts_with("Warning: iteration cap 20 reached"));
        assert!(text.contains("Frozen (malformed): broken"));
    }
}

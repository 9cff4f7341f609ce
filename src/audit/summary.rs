use super::{ActionResult, AuditEntry, AuditError, AuditLog};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const MAX_FAILURES_LISTED: usize = 10;

/// Aggregated view over a window of audit entries, rendered for the
/// operator briefing.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSummary {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub total_actions: usize,
    pub by_action_type: BTreeMap<String, usize>,
    pub by_result: BTreeMap<String, usize>,
    pub by_approval_status: BTreeMap<String, usize>,
    pub recent_failures: Vec<AuditEntry>,
}

impl AuditSummary {
    pub fn collect(
        log: &AuditLog,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Self, AuditError> {
        let entries = log.entries_since(since)?;
        let mut summary = Self {
            since,
            until,
            total_actions: 0,
            by_action_type: BTreeMap::new(),
            by_result: BTreeMap::new(),
            by_approval_status: BTreeMap::new(),
            recent_failures: Vec::new(),
        };
        for entry in entries {
            if entry.timestamp > until {
                continue;
            }
            summary.total_actions += 1;
            *summary
                .by_action_type
                .entry(entry.action_type.clone())
                .or_insert(0) += 1;
            *summary
                .by_result
                .entry(entry.result.as_str().to_string())
                .or_insert(0) += 1;
            *summary
                .by_approval_status
                .entry(entry.approval_status.as_str().to_string())
                .or_insert(0) += 1;
            if entry.result == ActionResult::Failed {
                summary.recent_failures.push(entry);
            }
        }
        if summary.recent_failures.len() > MAX_FAILURES_LISTED {
            let skip = summary.recent_failures.len() - MAX_FAILURES_LISTED;
            summary.recent_failures.drain(..skip);
        }
        Ok(summary)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# Audit Summary\n\n");
        out.push_str(&format!(
            "Window: {} to {}\n",
            self.since.format("%Y-%m-%d %H:%M UTC"),
            self.until.format("%Y-%m-%d %H:%M UTC"),
        ));
        out.push_str(&format!("Total actions: {}\n", self.total_actions));

        out.push_str("\n## By action type\n");
        for (action, count) in &self.by_action_type {
            out.push_str(&format!("- {action}: {count}\n"));
        }
        out.push_str("\n## By result\n");
        for (result, count) in &self.by_result {
            out.push_str(&format!("- {result}: {count}\n"));
        }
        out.push_str("\n## By approval status\n");
        for (status, count) in &self.by_approval_status {
            out.push_str(&format!("- {status}: {count}\n"));
        }

        if !self.recent_failures.is_empty() {
            out.push_str("\n## Recent failures\n");
            for entry in &self.recent_failures {
                out.push_str(&format!(
                    "- {} {} on `{}`: {}\n",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.action_type,
                    entry.target,
                    entry.message,
                ));
            }
        }
        out
    }
}

pub mod report;

pub use report::RunReport;

use crate::audit::{ActionResult, AuditEntry, AuditLog};
use crate::engine::{StageEngine, StepOutcome};
use crate::responder::{Executor, Responder};
use crate::shared::ids::TaskId;
use crate::shared::logging::append_pipeline_log_line;
use crate::store::{Partition, StoreError, TaskStore};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bounded scan-and-step loop over the task store. Each pass walks every
/// partition in scan order and steps every task it finds; the loop exits
/// early when a whole pass changes nothing, and otherwise stops at the
/// iteration cap so a stuck task can never wedge the process.
pub struct DriverLoop<'a> {
    store: &'a TaskStore,
    audit: &'a AuditLog,
    engine: StageEngine<'a>,
    pass_delay: Duration,
    stop: Arc<AtomicBool>,
}

impl<'a> DriverLoop<'a> {
    pub fn new(
        store: &'a TaskStore,
        audit: &'a AuditLog,
        responder: &'a dyn Responder,
        executor: &'a dyn Executor,
        actor: &str,
        pass_delay: Duration,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            audit,
            engine: StageEngine::new(store, audit, responder, executor, actor),
            pass_delay,
            stop,
        }
    }

    pub fn run(&self, description: &str, max_iterations: u32) -> Result<RunReport, StoreError> {
        self.log_line(&format!(
            "loop started: max_iterations={max_iterations} description={}",
            if description.is_empty() { "-" } else { description }
        ));

        let mut frozen: BTreeMap<TaskId, String> = BTreeMap::new();
        let mut completed: BTreeSet<TaskId> = BTreeSet::new();
        let mut iterations = 0u32;
        let mut transitions = 0u32;
        let mut quiescent = false;
        let mut cancelled = false;

        for iteration in 1..=max_iterations {
            if self.stop.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            iterations = iteration;

            let pass = self.run_pass(&mut frozen, &mut completed)?;
            transitions += pass.transitions;

            if pass.transitions == 0 && pass.failures == 0 {
                quiescent = true;
                break;
            }
            if iteration < max_iterations {
                self.sleep_between_passes();
            }
        }

        if cancelled {
            self.log_line(&format!("loop cancelled after {iterations} iteration(s)"));
        } else if quiescent {
            self.log_line(&format!(
                "loop quiescent after {iterations} iteration(s), {transitions} transition(s)"
            ));
        } else {
            self.log_line(&format!(
                "iteration cap {max_iterations} reached without quiescence"
            ));
        }

        let mut frozen_list: Vec<(TaskId, String)> = frozen.into_iter().collect();
        frozen_list.sort();
        Ok(RunReport {
            iterations,
            max_iterations,
            quiescent,
            cancelled,
            transitions,
            completed: completed.into_iter().collect(),
            awaiting_approval: self.store.list(Partition::PendingApproval)?,
            frozen: frozen_list,
        })
    }

    fn run_pass(
        &self,
        frozen: &mut BTreeMap<TaskId, String>,
        completed: &mut BTreeSet<TaskId>,
    ) -> Result<PassStats, StoreError> {
        let mut stats = PassStats::default();
        for partition in Partition::SCAN_ORDER {
            for id in self.store.list(partition)? {
                if frozen.contains_key(&id) {
                    continue;
                }
                match self.engine.step(&id, partition) {
                    Ok(outcome) => {
                        stats.transitions += outcome.transitions();
                        if outcome.is_failure() {
                            stats.failures += 1;
                        }
                        if let StepOutcome::Advanced {
                            completed: true, ..
                        } = outcome
                        {
                            completed.insert(id);
                        }
                    }
                    Err(StoreError::Malformed { reason, .. }) => {
                        self.record_frozen(&id, &reason);
                        frozen.insert(id, reason);
                    }
                    // Another actor moved the document mid-step. Its new
                    // location is picked up on the next pass.
                    Err(StoreError::Conflict { .. }) => {
                        stats.transitions += 1;
                    }
                    // Deleted out from under us; nothing to step.
                    Err(StoreError::NotFound { .. }) => {}
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(_) => {}
                }
            }
        }
        Ok(stats)
    }

    /// Frozen documents get exactly one audit record per run; they are then
    /// skipped until an operator repairs the file.
    fn record_frozen(&self, id: &TaskId, reason: &str) {
        let entry = AuditEntry::new(Utc::now(), "malformed_task", "driver", id.as_str())
            .with_result(ActionResult::Failed)
            .with_message(reason);
        if let Err(err) = self.audit.append(&entry) {
            eprintln!("audit append failed ({err}); malformed task {id}: {reason}");
        }
    }

    fn sleep_between_passes(&self) {
        let mut remaining = self.pass_delay;
        while remaining > Duration::ZERO && !self.stop.load(Ordering::Relaxed) {
            let chunk = remaining.min(STOP_POLL_INTERVAL);
            thread::sleep(chunk);
            remaining -= chunk;
        }
    }

    fn log_line(&self, line: &str) {
        if let Err(err) = append_pipeline_log_line(self.store.root(), line) {
            eprintln!("pipeline log append failed: {err}");
        }
    }
}

#[derive(Debug, Default)]
struct PassStats {
    transitions: u32,
    failures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{SimulatedExecutor, TemplateResponder};
    use crate::store::{Keyword, NewTaskDocument, Priority, Stage, TaskKind};
    use chrono::DateTime;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: TaskStore,
        audit: AuditLog,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TaskStore::new(dir.path());
        store.bootstrap().expect("bootstrap");
        let audit = AuditLog::new(store.paths().logs_dir());
        Fixture {
            _dir: dir,
            store,
            audit,
        }
    }

    fn driver<'a>(
        fx: &'a Fixture,
        responder: &'a dyn Responder,
        executor: &'a dyn Executor,
        stop: Arc<AtomicBool>,
    ) -> DriverLoop<'a> {
        DriverLoop::new(
            &fx.store,
            &fx.audit,
            responder,
            executor,
            "deskhand",
            Duration::ZERO,
            stop,
        )
    }

    fn ingest(store: &TaskStore, id: &str) -> TaskId {
        store
            .create(
                NewTaskDocument {
                    id: TaskId::parse(id).expect("task id"),
                    kind: TaskKind::FacebookMessage,
                    keyword: Keyword::Sales,
                    priority: Priority::Medium,
                    source: None,
                    body: "Looking to buy.".to_string(),
                },
                Utc::now(),
            )
            .expect("create")
    }

    fn audit_count(audit: &AuditLog) -> usize {
        audit
            .entries_since(DateTime::<Utc>::MIN_UTC)
            .expect("entries")
            .len()
    }

    #[test]
    fn fresh_task_reaches_pending_approval_then_loop_quiesces() {
        let fx = fixture();
        let responder = TemplateResponder::new();
        let executor = SimulatedExecutor::new();
        let loop_ = driver(&fx, &responder, &executor, Arc::new(AtomicBool::new(false)));
        let id = ingest(&fx.store, "fb_1");

        let report = loop_.run("", 20).expect("run");
        assert!(report.quiescent);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.awaiting_approval, vec![id.clone()]);
        assert!(report.completed.is_empty());
        assert_eq!(
            fx.store.locate(&id).expect("locate"),
            Some(Partition::PendingApproval)
        );
    }

    #[test]
    fn approved_task_completes_within_one_run() {
        let fx = fixture();
        let responder = TemplateResponder::new();
        let executor = SimulatedExecutor::new();
        let loop_ = driver(&fx, &responder, &executor, Arc::new(AtomicBool::new(false)));
        let id = ingest(&fx.store, "fb_1");
        loop_.run("", 20).expect("first run");
        fx.store
            .move_task(&id, Partition::PendingApproval, Partition::Approved)
            .expect("approve");

        let report = loop_.run("", 20).expect("second run");
        assert!(report.quiescent);
        assert_eq!(report.completed, vec![id.clone()]);
        assert_eq!(fx.store.locate(&id).expect("locate"), Some(Partition::Done));
    }

    #[test]
    fn quiescent_rerun_appends_no_audit_entries() {
        let fx = fixture();
        let responder = TemplateResponder::new();
        let executor = SimulatedExecutor::new();
        let loop_ = driver(&fx, &responder, &executor, Arc::new(AtomicBool::new(false)));
        ingest(&fx.store, "fb_1");
        loop_.run("", 20).expect("first run");
        let baseline = audit_count(&fx.audit);

        let report = loop_.run("", 20).expect("rerun");
        assert!(report.quiescent);
        assert_eq!(report.iterations, 1);
        assert_eq!(audit_count(&fx.audit), baseline);
    }

    #[test]
    fn iteration_cap_of_one_pauses_work_without_duplicating_it() {
        let fx = fixture();
        let responder = TemplateResponder::new();
        let executor = SimulatedExecutor::new();
        let loop_ = driver(&fx, &responder, &executor, Arc::new(AtomicBool::new(false)));
        let id = ingest(&fx.store, "fb_1");

        let first = loop_.run("", 1).expect("capped run");
        assert!(!first.quiescent);
        assert_eq!(first.iterations, 1);

        let second = loop_.run("", 20).expect("resume");
        assert!(second.quiescent);

        let (_, doc) = fx.store.read(&id).expect("read");
        assert_eq!(doc.front.stage, Stage::HitlApproval);
        assert_eq!(doc.body.matches("## Draft Response").count(), 1);
    }

    #[test]
    fn malformed_document_is_frozen_and_does_not_block_quiescence() {
        let fx = fixture();
        let responder = TemplateResponder::new();
        let executor = SimulatedExecutor::new();
        let loop_ = driver(&fx, &responder, &executor, Arc::new(AtomicBool::new(false)));
        ingest(&fx.store, "fb_1");
        std::fs::write(
            fx.store
                .paths()
                .document_path(Partition::NeedsAction, "broken"),
            "not a task document",
        )
        .expect("write broken doc");

        let report = loop_.run("", 20).expect("run");
        assert!(report.quiescent);
        assert_eq!(report.frozen.len(), 1);
        assert_eq!(report.frozen[0].0.as_str(), "broken");

        let frozen_entries: Vec<_> = fx
            .audit
            .entries_since(DateTime::<Utc>::MIN_UTC)
            .expect("entries")
            .into_iter()
            .filter(|entry| entry.action_type == "malformed_task")
            .collect();
        assert_eq!(frozen_entries.len(), 1);
        assert_eq!(
            fx.store.locate(&TaskId::parse("broken").expect("id")).expect("locate"),
            Some(Partition::NeedsAction)
        );
    }

    #[test]
    fn stop_flag_cancels_before_the_next_iteration() {
        let fx = fixture();
        let responder = TemplateResponder::new();
        let executor = SimulatedExecutor::new();
        let stop = Arc::new(AtomicBool::new(true));
        let loop_ = driver(&fx, &responder, &executor, stop);
        ingest(&fx.store, "fb_1");

        let report = loop_.run("", 20).expect("run");
        assert!(report.cancelled);
        assert!(!report.quiescent);
        assert_eq!(report.iterations, 0);
    }
}

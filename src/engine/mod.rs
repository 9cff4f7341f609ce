use crate::audit::{ActionResult, ApprovalStatus, AuditEntry, AuditLog};
use crate::responder::{Executor, Responder};
use crate::shared::ids::TaskId;
use crate::store::{Partition, Stage, StoreError, TaskStore};
use chrono::Utc;

/// What a single engine step did to one task. Collaborator failures are
/// outcomes, not errors; only store-level failures surface as `StoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One or more stage transitions were applied. `completed` marks a move
    /// into Done.
    Advanced { transitions: u32, completed: bool },
    /// Sitting in Pending_Approval; only a human can move it.
    AwaitingApproval,
    /// Nothing left to do for this task.
    AlreadyTerminal,
    /// Draft generation failed; the task stays at skill_execution.
    ResponderFailed,
    /// The outbound action failed; the task stays in Approved at
    /// mcp_execution for operator intervention.
    ExecutionFailed,
}

impl StepOutcome {
    pub fn transitions(self) -> u32 {
        match self {
            Self::Advanced { transitions, .. } => transitions,
            _ => 0,
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::ResponderFailed | Self::ExecutionFailed)
    }
}

/// Advances one task through the staged workflow based on the partition it
/// was observed in. Observation drives everything: the engine holds no state
/// between steps, so a human dropping a file into Approved by hand is
/// indistinguishable from a CLI approval.
pub struct StageEngine<'a> {
    store: &'a TaskStore,
    audit: &'a AuditLog,
    responder: &'a dyn Responder,
    executor: &'a dyn Executor,
    actor: String,
}

impl<'a> StageEngine<'a> {
    pub fn new(
        store: &'a TaskStore,
        audit: &'a AuditLog,
        responder: &'a dyn Responder,
        executor: &'a dyn Executor,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            store,
            audit,
            responder,
            executor,
            actor: actor.into(),
        }
    }

    pub fn step(&self, id: &TaskId, observed: Partition) -> Result<StepOutcome, StoreError> {
        match observed {
            Partition::Done => Ok(StepOutcome::AlreadyTerminal),
            Partition::Rejected => self.step_rejected(id),
            Partition::PendingApproval => self.step_pending_approval(id),
            Partition::Approved => self.step_approved(id),
            Partition::NeedsAction => self.step_needs_action(id),
        }
    }

    /// A rejected draft is resolved once: the rejection is audited and the
    /// stage is stamped terminal so later passes leave the file alone. The
    /// document stays in Rejected as the operator's record.
    fn step_rejected(&self, id: &TaskId) -> Result<StepOutcome, StoreError> {
        let doc = self.store.read_in(id, Partition::Rejected)?;
        if doc.front.stage.is_terminal() {
            return Ok(StepOutcome::AlreadyTerminal);
        }
        self.record(
            AuditEntry::new(Utc::now(), "hitl_approval", self.actor.as_str(), id.as_str())
                .with_approval_status(ApprovalStatus::Rejected)
                .with_result(ActionResult::Skipped)
                .with_message("draft rejected by operator; no outbound action taken"),
        );
        self.store.write_stage(id, Stage::Completion)?;
        Ok(StepOutcome::Advanced {
            transitions: 1,
            completed: false,
        })
    }

    fn step_pending_approval(&self, id: &TaskId) -> Result<StepOutcome, StoreError> {
        let doc = self.store.read_in(id, Partition::PendingApproval)?;
        if doc.front.stage == Stage::HitlApproval {
            return Ok(StepOutcome::AwaitingApproval);
        }
        // A document dropped here by hand gets its stage normalized once.
        self.store.write_stage(id, Stage::HitlApproval)?;
        Ok(StepOutcome::Advanced {
            transitions: 1,
            completed: false,
        })
    }

    /// Runs the approved half of the pipeline to completion in one step:
    /// approval bookkeeping, outbound execution, the completion record, and
    /// the move into Done. A document approved before any draft existed is
    /// handled the same way; approval subsumes skill execution.
    fn step_approved(&self, id: &TaskId) -> Result<StepOutcome, StoreError> {
        let doc = self.store.read_in(id, Partition::Approved)?;
        let mut transitions = 0u32;
        let mut stage = doc.front.stage;

        if stage == Stage::Completion {
            self.store.move_task(id, Partition::Approved, Partition::Done)?;
            return Ok(StepOutcome::Advanced {
                transitions: 1,
                completed: true,
            });
        }

        if matches!(
            stage,
            Stage::Analysis | Stage::SkillExecution | Stage::HitlApproval
        ) {
            let pre_approved = stage != Stage::HitlApproval;
            let mut entry =
                AuditEntry::new(Utc::now(), "hitl_approval", self.actor.as_str(), id.as_str())
                    .with_approval_status(ApprovalStatus::Approved);
            if pre_approved {
                entry = entry.with_message("approved before drafting; skill execution skipped");
            }
            self.record(entry);
            self.store.write_stage(id, Stage::McpExecution)?;
            stage = Stage::McpExecution;
            transitions += 1;
        }

        if stage == Stage::McpExecution {
            match self.executor.execute(&doc) {
                Ok(receipt) => {
                    self.record(
                        AuditEntry::new(Utc::now(), "mcp_execution", self.actor.as_str(), id.as_str())
                            .with_approval_status(ApprovalStatus::Approved)
                            .with_parameter("reference", receipt.reference),
                    );
                    self.store.write_stage(id, Stage::AuditLogging)?;
                    transitions += 1;
                }
                Err(err) => {
                    self.record(
                        AuditEntry::new(
                            Utc::now(),
                            "manual_action_required",
                            self.actor.as_str(),
                            id.as_str(),
                        )
                        .with_approval_status(ApprovalStatus::Approved)
                        .with_result(ActionResult::Failed)
                        .with_message(err.to_string()),
                    );
                    return Ok(StepOutcome::ExecutionFailed);
                }
            }
        }

        self.record(
            AuditEntry::new(Utc::now(), "completion", self.actor.as_str(), id.as_str())
                .with_approval_status(ApprovalStatus::Approved)
                .with_message("task archived to Done"),
        );
        self.store.write_stage(id, Stage::Completion)?;
        self.store.move_task(id, Partition::Approved, Partition::Done)?;
        transitions += 2;
        Ok(StepOutcome::Advanced {
            transitions,
            completed: true,
        })
    }

    /// Carries a fresh task through analysis and drafting in one step, ending
    /// in Pending_Approval. Stage values ahead of the partition mean another
    /// actor moved the file backwards; those are requeued where they belong.
    fn step_needs_action(&self, id: &TaskId) -> Result<StepOutcome, StoreError> {
        let doc = self.store.read_in(id, Partition::NeedsAction)?;
        let mut transitions = 0u32;

        match doc.front.stage {
            Stage::Analysis => {
                self.record(
                    AuditEntry::new(Utc::now(), "analysis", self.actor.as_str(), id.as_str())
                        .with_parameter("kind", doc.front.kind.to_string())
                        .with_parameter("keyword", doc.front.keyword.to_string())
                        .with_parameter(
                            "recognized",
                            if doc.front.kind.is_recognized() { "true" } else { "false" },
                        ),
                );
                self.store.write_stage(id, Stage::SkillExecution)?;
                transitions += 1;
            }
            Stage::SkillExecution => {}
            Stage::HitlApproval => {
                self.store
                    .move_task(id, Partition::NeedsAction, Partition::PendingApproval)?;
                return Ok(StepOutcome::Advanced {
                    transitions: 1,
                    completed: false,
                });
            }
            Stage::McpExecution | Stage::AuditLogging => {
                self.store
                    .move_task(id, Partition::NeedsAction, Partition::Approved)?;
                return Ok(StepOutcome::Advanced {
                    transitions: 1,
                    completed: false,
                });
            }
            Stage::Completion => {
                self.store
                    .move_task(id, Partition::NeedsAction, Partition::Done)?;
                return Ok(StepOutcome::Advanced {
                    transitions: 1,
                    completed: true,
                });
            }
        }

        let draft = match self.responder.generate(&doc, Utc::now()) {
            Ok(draft) => draft,
            Err(err) => {
                self.record(
                    AuditEntry::new(Utc::now(), "skill_execution", self.actor.as_str(), id.as_str())
                        .with_result(ActionResult::Failed)
                        .with_message(err.to_string()),
                );
                return Ok(StepOutcome::ResponderFailed);
            }
        };

        self.store.append(id, &draft)?;
        self.store.write_stage(id, Stage::HitlApproval)?;
        self.store
            .move_task(id, Partition::NeedsAction, Partition::PendingApproval)?;
        self.record(
            AuditEntry::new(Utc::now(), "skill_execution", self.actor.as_str(), id.as_str())
                .with_approval_status(ApprovalStatus::Pending)
                .with_message("draft appended; routed to Pending_Approval"),
        );
        transitions += 3;
        Ok(StepOutcome::Advanced {
            transitions,
            completed: false,
        })
    }

    /// The audit trail must never silently lose an entry; when the append
    /// itself fails the entry is echoed to stderr and processing continues.
    fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.append(&entry) {
            eprintln!(
                "audit append failed ({err}); entry: {} {} on {}",
                entry.timestamp.to_rfc3339(),
                entry.action_type,
                entry.target,
            );
        }
    }
}

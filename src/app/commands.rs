use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::audit::{ApprovalStatus, AuditEntry, AuditLog, AuditSummary};
use crate::config::Settings;
use crate::driver::DriverLoop;
use crate::responder::{SimulatedExecutor, TemplateResponder};
use crate::shared::ids::TaskId;
use crate::store::{
    Keyword, NewTaskDocument, Partition, Priority, StoreError, TaskKind, TaskStore,
};
use chrono::{DateTime, Days, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SUMMARY_DAYS: u64 = 7;

pub fn store_root() -> PathBuf {
    std::env::var_os("DESKHAND_STORE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    run_cli_in(&store_root(), args)
}

pub fn run_cli_in(root: &Path, args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }
    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Setup => cmd_setup(root),
        CliVerb::Ingest => cmd_ingest(root, &args[1..]),
        CliVerb::Run => cmd_run(root, &args[1..]),
        CliVerb::Approve => cmd_decide(root, &args[1..], Partition::Approved),
        CliVerb::Reject => cmd_decide(root, &args[1..], Partition::Rejected),
        CliVerb::Status => cmd_status(root),
        CliVerb::Audit => cmd_audit(root, &args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

fn cmd_setup(root: &Path) -> Result<String, String> {
    let store = TaskStore::new(root);
    store.bootstrap().map_err(|err| err.to_string())?;

    let settings_path = store.paths().settings_file();
    let mut lines = vec![format!("Initialized task store at {}", root.display())];
    if settings_path.is_file() {
        lines.push(format!("Kept existing {}", settings_path.display()));
    } else {
        Settings::default()
            .save(&settings_path)
            .map_err(|err| err.to_string())?;
        lines.push(format!("Wrote default {}", settings_path.display()));
    }
    Ok(lines.join("\n"))
}

fn cmd_ingest(root: &Path, args: &[String]) -> Result<String, String> {
    let mut kind: Option<TaskKind> = None;
    let mut keyword = Keyword::General;
    let mut priority = Priority::Medium;
    let mut source: Option<String> = None;
    let mut explicit_id: Option<TaskId> = None;
    let mut text_parts: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--kind" => kind = Some(TaskKind::classify(required_value(&mut iter, "--kind")?)),
            "--keyword" => keyword = Keyword::classify(required_value(&mut iter, "--keyword")?),
            "--priority" => priority = Priority::parse(required_value(&mut iter, "--priority")?)?,
            "--source" => source = Some(required_value(&mut iter, "--source")?.to_string()),
            "--id" => explicit_id = Some(TaskId::parse(required_value(&mut iter, "--id")?)?),
            other => text_parts.push(other),
        }
    }

    let kind = kind.ok_or_else(|| "ingest requires --kind <kind>".to_string())?;
    let body = text_parts.join(" ");
    if body.trim().is_empty() {
        return Err("ingest requires message text after the options".to_string());
    }

    let store = TaskStore::new(root);
    let now = Utc::now();
    let audit = AuditLog::new(store.paths().logs_dir());
    let auto_id = explicit_id.is_none();
    let mut id = match explicit_id {
        Some(id) => id,
        None => generated_id(&kind, now)?,
    };

    loop {
        let new = NewTaskDocument {
            id: id.clone(),
            kind: kind.clone(),
            keyword,
            priority,
            source: source.clone(),
            body: body.clone(),
        };
        match store.create(new, now) {
            Ok(created) => {
                let entry = AuditEntry::new(
                    now,
                    "task_created",
                    source.as_deref().unwrap_or("cli"),
                    created.as_str(),
                )
                .with_parameter("kind", kind.to_string())
                .with_parameter("keyword", keyword.to_string());
                if let Err(err) = audit.append(&entry) {
                    eprintln!("audit append failed ({err}); task created: {created}");
                }
                return Ok(format!("Created {created} in Needs_Action"));
            }
            // Two auto-named ingests in the same second; bump the suffix.
            Err(StoreError::AlreadyExists { .. }) if auto_id => {
                id = TaskId::parse(&format!("{id}_x"))?;
            }
            Err(err) => return Err(err.to_string()),
        }
    }
}

fn cmd_run(root: &Path, args: &[String]) -> Result<String, String> {
    let mut max_override: Option<u32> = None;
    let mut description_parts: Vec<&str> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--max-iterations" => {
                let raw = required_value(&mut iter, "--max-iterations")?;
                let parsed: u32 = raw
                    .parse()
                    .map_err(|_| format!("invalid --max-iterations value `{raw}`"))?;
                if parsed == 0 {
                    return Err("--max-iterations must be at least 1".to_string());
                }
                max_override = Some(parsed);
            }
            other => description_parts.push(other),
        }
    }

    let store = TaskStore::new(root);
    store.bootstrap().map_err(|err| err.to_string())?;
    let settings =
        Settings::load_or_default(&store.paths().settings_file()).map_err(|err| err.to_string())?;
    let audit = AuditLog::new(store.paths().logs_dir());
    let responder = TemplateResponder::new();
    let executor = SimulatedExecutor::new();
    let stop = Arc::new(AtomicBool::new(false));
    let driver = DriverLoop::new(
        &store,
        &audit,
        &responder,
        &executor,
        &settings.actor,
        Duration::from_millis(settings.pass_delay_ms),
        stop,
    );

    let max_iterations = max_override.unwrap_or(settings.max_iterations);
    let report = driver
        .run(&description_parts.join(" "), max_iterations)
        .map_err(|err| err.to_string())?;
    let rendered = report.render().trim_end().to_string();
    if report.quiescent {
        Ok(rendered)
    } else {
        Err(rendered)
    }
}

fn cmd_decide(root: &Path, args: &[String], target: Partition) -> Result<String, String> {
    let raw = args
        .first()
        .ok_or_else(|| format!("usage: {} <task-id>", verb_for(target)))?;
    let id = TaskId::parse(raw)?;
    let store = TaskStore::new(root);
    store
        .move_task(&id, Partition::PendingApproval, target)
        .map_err(|err| err.to_string())?;

    let status = if target == Partition::Approved {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Rejected
    };
    let audit = AuditLog::new(store.paths().logs_dir());
    let entry = AuditEntry::new(Utc::now(), "hitl_decision", "operator", id.as_str())
        .with_approval_status(status)
        .with_parameter("moved_to", target.to_string());
    if let Err(err) = audit.append(&entry) {
        eprintln!("audit append failed ({err}); decision on {id}: {target}");
    }
    Ok(format!("Moved {id} to {target}"))
}

fn verb_for(target: Partition) -> &'static str {
    if target == Partition::Approved {
        "approve"
    } else {
        "reject"
    }
}

fn cmd_status(root: &Path) -> Result<String, String> {
    let store = TaskStore::new(root);
    let mut lines = Vec::new();
    for partition in Partition::ALL {
        let ids = store.list(partition).map_err(|err| err.to_string())?;
        if ids.is_empty() {
            lines.push(format!("{partition}: 0"));
        } else {
            let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            lines.push(format!("{partition}: {} ({})", ids.len(), names.join(", ")));
        }
    }
    Ok(lines.join("\n"))
}

fn cmd_audit(root: &Path, args: &[String]) -> Result<String, String> {
    let store = TaskStore::new(root);
    let audit = AuditLog::new(store.paths().logs_dir());
    let now = Utc::now();
    match args.first().map(String::as_str) {
        Some("summary") => {
            let mut days = DEFAULT_SUMMARY_DAYS;
            let mut iter = args[1..].iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--days" => {
                        let raw = required_value(&mut iter, "--days")?;
                        days = raw
                            .parse()
                            .map_err(|_| format!("invalid --days value `{raw}`"))?;
                    }
                    other => return Err(format!("unknown audit summary option `{other}`")),
                }
            }
            let since = now
                .checked_sub_days(Days::new(days))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let summary = AuditSummary::collect(&audit, since, now).map_err(|err| err.to_string())?;
            Ok(summary.render().trim_end().to_string())
        }
        Some("purge") => {
            let settings = Settings::load_or_default(&store.paths().settings_file())
                .map_err(|err| err.to_string())?;
            let deleted = audit
                .purge(settings.retention_days, now)
                .map_err(|err| err.to_string())?;
            if deleted.is_empty() {
                Ok("No audit day files past the retention horizon".to_string())
            } else {
                let mut lines = vec![format!("Deleted {} audit day file(s):", deleted.len())];
                for path in deleted {
                    lines.push(format!("  {}", path.display()));
                }
                Ok(lines.join("\n"))
            }
        }
        _ => Err("usage: audit <summary|purge> [--days N]".to_string()),
    }
}

fn generated_id(kind: &TaskKind, now: DateTime<Utc>) -> Result<TaskId, String> {
    TaskId::parse(&format!("{kind}_{}", now.format("%Y%m%d_%H%M%S")))
}

fn required_value<'a>(
    iter: &mut std::slice::Iter<'a, String>,
    flag: &str,
) -> Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run(root: &Path, args: &[&str]) -> Result<String, String> {
        run_cli_in(root, args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn no_args_prints_help() {
        let dir = tempdir().expect("tempdir");
        let output = run(dir.path(), &[]).expect("help");
        assert!(output.contains("Commands:"));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let err = run(dir.path(), &["launch"]).expect_err("unknown");
        assert!(err.contains("unknown command"));
    }

    #[test]
    fn setup_creates_partitions_and_default_config() {
        let dir = tempdir().expect("tempdir");
        let output = run(dir.path(), &["setup"]).expect("setup");
        assert!(output.contains("Initialized task store"));
        assert!(dir.path().join("Needs_Action").is_dir());
        assert!(dir.path().join("Logs").is_dir());
        assert!(dir.path().join("deskhand.yaml").is_file());

        let again = run(dir.path(), &["setup"]).expect("re-setup");
        assert!(again.contains("Kept existing"));
    }

    #[test]
    fn ingest_requires_kind_and_text() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        assert!(run(dir.path(), &["ingest", "hello"]).is_err());
        assert!(run(dir.path(), &["ingest", "--kind", "gmail_message"]).is_err());
    }

    #[test]
    fn ingest_run_approve_run_reaches_done() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        run(
            dir.path(),
            &[
                "ingest",
                "--kind",
                "facebook_message",
                "--keyword",
                "sales",
                "--id",
                "fb_1",
                "Interested",
                "in",
                "pricing",
            ],
        )
        .expect("ingest");

        let status = run(dir.path(), &["status"]).expect("status");
        assert!(status.contains("Needs_Action: 1 (fb_1)"));

        let first = run(dir.path(), &["run"]).expect("first run");
        assert!(first.starts_with("TASK_COMPLETE"));
        assert!(first.contains("Awaiting approval: fb_1"));

        run(dir.path(), &["approve", "fb_1"]).expect("approve");
        let second = run(dir.path(), &["run"]).expect("second run");
        assert!(second.contains("Completed: fb_1"));

        let status = run(dir.path(), &["status"]).expect("status");
        assert!(status.contains("Done: 1 (fb_1)"));
    }

    #[test]
    fn reject_resolves_without_completion() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        run(
            dir.path(),
            &["ingest", "--kind", "gmail_message", "--id", "g_1", "hello"],
        )
        .expect("ingest");
        run(dir.path(), &["run"]).expect("draft run");
        run(dir.path(), &["reject", "g_1"]).expect("reject");
        run(dir.path(), &["run"]).expect("resolve run");

        let status = run(dir.path(), &["status"]).expect("status");
        assert!(status.contains("Rejected: 1 (g_1)"));
        assert!(status.contains("Done: 0"));
    }

    #[test]
    fn approve_of_unknown_task_reports_not_found() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        let err = run(dir.path(), &["approve", "ghost"]).expect_err("missing");
        assert!(err.contains("not found"));
    }

    #[test]
    fn capped_run_reports_failure_exit() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        run(
            dir.path(),
            &["ingest", "--kind", "gmail_message", "--id", "g_1", "hello"],
        )
        .expect("ingest");

        let err = run(dir.path(), &["run", "--max-iterations", "1"]).expect_err("capped");
        assert!(err.contains("iteration cap 1 reached"));
    }

    #[test]
    fn audit_summary_counts_pipeline_actions() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        run(
            dir.path(),
            &["ingest", "--kind", "gmail_message", "--id", "g_1", "hello"],
        )
        .expect("ingest");
        run(dir.path(), &["run"]).expect("run");

        let summary = run(dir.path(), &["audit", "summary"]).expect("summary");
        assert!(summary.contains("task_created: 1"));
        assert!(summary.contains("skill_execution: 1"));
    }

    #[test]
    fn audit_purge_reports_when_nothing_to_delete() {
        let dir = tempdir().expect("tempdir");
        run(dir.path(), &["setup"]).expect("setup");
        run(
            dir.path(),
            &["ingest", "--kind", "gmail_message", "--id", "g_1", "hello"],
        )
        .expect("ingest");

        let output = run(dir.path(), &["audit", "purge"]).expect("purge");
        assert!(output.contains("No audit day files"));
    }
}

use deskhand::shared::ids::TaskId;
use deskhand::store::{
    Keyword, NewTaskDocument, Partition, Priority, Stage, StoreError, TaskKind, TaskStore,
};
use std::fs;
use tempfile::tempdir;

fn new_task(id: &str) -> NewTaskDocument {
    NewTaskDocument {
        id: TaskId::parse(id).expect("task id"),
        kind: TaskKind::GmailMessage,
        keyword: Keyword::Client,
        priority: Priority::Medium,
        source: Some("gmail_watcher".to_string()),
        body: "Question about the invoice.".to_string(),
    }
}

/// Small deterministic generator so the interleaving below is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 16
    }

    fn pick(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn occurrences(store: &TaskStore, id: &TaskId) -> usize {
    Partition::ALL
        .iter()
        .filter(|partition| {
            store
                .paths()
                .document_path(**partition, id.as_str())
                .is_file()
        })
        .count()
}

#[test]
fn random_interleaving_keeps_every_task_in_exactly_one_partition() {
    let dir = tempdir().expect("tempdir");
    let store = TaskStore::new(dir.path());
    store.bootstrap().expect("bootstrap");

    let mut rng = Lcg(0xdeadbeef);
    let mut ids: Vec<TaskId> = Vec::new();

    for step in 0..200 {
        match rng.pick(4) {
            0 => {
                let id = format!("task_{step}");
                store
                    .create(new_task(&id), chrono::Utc::now())
                    .expect("create");
                ids.push(TaskId::parse(&id).expect("task id"));
            }
            1 if !ids.is_empty() => {
                let id = &ids[rng.pick(ids.len() as u64) as usize];
                let from = Partition::ALL[rng.pick(5) as usize];
                let to = Partition::ALL[rng.pick(5) as usize];
                if from != to {
                    // Stale moves are expected; the invariant must hold anyway.
                    let _ = store.move_task(id, from, to);
                }
            }
            2 if !ids.is_empty() => {
                let id = &ids[rng.pick(ids.len() as u64) as usize];
                store.append(id, "note").expect("append");
            }
            3 if !ids.is_empty() => {
                let id = &ids[rng.pick(ids.len() as u64) as usize];
                store
                    .write_stage(id, Stage::SkillExecution)
                    .expect("write stage");
            }
            _ => {}
        }

        for id in &ids {
            assert_eq!(occurrences(&store, id), 1, "task {id} after step {step}");
        }
    }
    assert!(!ids.is_empty());
}

#[test]
fn move_round_trip_is_byte_identical() {
    let dir = tempdir().expect("tempdir");
    let store = TaskStore::new(dir.path());
    store.bootstrap().expect("bootstrap");
    let id = store
        .create(new_task("g_1"), chrono::Utc::now())
        .expect("create");

    let original_path = store
        .paths()
        .document_path(Partition::NeedsAction, id.as_str());
    let original = fs::read(&original_path).expect("read original");

    store
        .move_task(&id, Partition::NeedsAction, Partition::Approved)
        .expect("move out");
    store
        .move_task(&id, Partition::Approved, Partition::NeedsAction)
        .expect("move back");

    assert_eq!(fs::read(&original_path).expect("read restored"), original);
}

#[test]
fn racing_moves_let_exactly_one_claimant_win() {
    let dir = tempdir().expect("tempdir");
    let store = TaskStore::new(dir.path());
    store.bootstrap().expect("bootstrap");
    let id = store
        .create(new_task("g_1"), chrono::Utc::now())
        .expect("create");
    store
        .move_task(&id, Partition::NeedsAction, Partition::PendingApproval)
        .expect("stage for approval");

    let results: Vec<Result<(), StoreError>> = std::thread::scope(|scope| {
        let approve = scope.spawn(|| {
            store.move_task(&id, Partition::PendingApproval, Partition::Approved)
        });
        let reject = scope.spawn(|| {
            store.move_task(&id, Partition::PendingApproval, Partition::Rejected)
        });
        vec![
            approve.join().expect("approve thread"),
            reject.join().expect("reject thread"),
        ]
    });

    let wins = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(wins, 1, "exactly one mover may win: {results:?}");
    let conflict = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .expect("one loser");
    assert!(matches!(conflict, StoreError::Conflict { .. }), "{conflict:?}");
    assert_eq!(occurrences(&store, &id), 1);
}

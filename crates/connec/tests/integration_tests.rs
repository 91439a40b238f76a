//! Integration tests for the connec crate
//!
//! These tests drive complete import runs against a scripted remote client
//! and verify what ends up in the stores.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use connec::models::{Checkpoint, FetchTarget, RemoteResponse, Subscriptions};
use connec::storage::{CheckpointStore, EntityStore, InMemoryStore, SqliteStore};
use connec::{
    Clock, DispatchScope, MapperRegistry, RemoteClient, RetryPolicy, Sleeper, SyncError,
    SyncOptions, SyncOrchestrator, SyncPhase,
};
use tempfile::TempDir;

/// Remote client answering from per-target response queues
#[derive(Default)]
struct ScriptedClient {
    responses: Mutex<HashMap<String, VecDeque<Result<RemoteResponse>>>>,
    calls: Mutex<Vec<FetchTarget>>,
}

impl ScriptedClient {
    fn respond(self, target: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(Ok(RemoteResponse::new(status, body)));
        self
    }

    fn fail_always(self, target: &str) -> Self {
        let mut client = self;
        for _ in 0..RetryPolicy::default().max_attempts() {
            client = client.respond(target, 503, "Service Unavailable");
        }
        client
    }

    fn calls_for(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.label() == label)
            .count()
    }

    fn call_labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.label().to_string())
            .collect()
    }
}

impl RemoteClient for ScriptedClient {
    fn get(&self, target: &FetchTarget) -> Result<RemoteResponse> {
        self.calls.lock().unwrap().push(target.clone());
        self.responses
            .lock()
            .unwrap()
            .get_mut(target.label())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(anyhow!("unexpected request for {target}")))
    }
}

#[derive(Default)]
struct RecordingSleeper {
    delays: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }
}

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now(&self) -> Checkpoint {
        Checkpoint::new(self.0)
    }
}

/// Checkpoint store whose backend is gone
struct UnavailableCheckpoints;

impl CheckpointStore for UnavailableCheckpoints {
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        Err(anyhow!("database file is missing"))
    }

    fn save_checkpoint(&self, _checkpoint: Checkpoint) -> Result<()> {
        Err(anyhow!("database file is missing"))
    }
}

const RUN_START: i64 = 1_700_000_000;

fn run_with(
    client: &ScriptedClient,
    store: &Arc<InMemoryStore>,
    subscriptions: &Subscriptions,
    sleeper: &RecordingSleeper,
) -> Result<connec::SyncReport, SyncError> {
    let registry = MapperRegistry::with_defaults(store.clone(), "1");
    let mut orchestrator = SyncOrchestrator::new(
        client,
        &**store,
        &registry,
        sleeper,
        &FixedClock(RUN_START),
        SyncOptions::default(),
    );
    orchestrator.run(subscriptions)
}

#[test]
fn test_full_run_advances_checkpoint_to_run_start() {
    let store = Arc::new(InMemoryStore::with_checkpoint(Checkpoint::new(1_600_000_000)));
    let client = ScriptedClient::default()
        .respond(
            "organizations",
            200,
            r#"{"organizations": [{"id": "o1"}, {"id": "o2"}], "pagination": {"next": "/organizations?page=2"}}"#,
        )
        .respond("/organizations?page=2", 200, r#"{"organizations": [{"id": "o3"}]}"#)
        .respond("people", 200, r#"{"people": [{"id": "p1"}]}"#);
    let subscriptions = Subscriptions::from_pairs([("organizations", true), ("people", true)]);
    let sleeper = RecordingSleeper::default();

    let report = run_with(&client, &store, &subscriptions, &sleeper).unwrap();

    assert_eq!(report.previous_checkpoint, Checkpoint::new(1_600_000_000));
    assert_eq!(report.new_checkpoint, Checkpoint::new(RUN_START));
    assert_eq!(store.load_checkpoint().unwrap(), Some(Checkpoint::new(RUN_START)));
    assert_eq!(report.total_pages(), 3);
    assert_eq!(report.total_persisted(), 4);
    assert_eq!(store.count_entities("organizations").unwrap(), 3);
    assert_eq!(store.count_entities("people").unwrap(), 1);
    assert!(sleeper.delays.borrow().is_empty());

    // Resource types are swept one after the other, in subscription order
    assert_eq!(
        client.call_labels(),
        vec!["organizations", "/organizations?page=2", "people"]
    );
}

#[test]
fn test_first_page_filters_on_previous_checkpoint() {
    let store = Arc::new(InMemoryStore::with_checkpoint(Checkpoint::new(1_700_000_000)));
    let client = ScriptedClient::default().respond("items", 200, r#"{"items": []}"#);
    let subscriptions = Subscriptions::from_pairs([("items", true)]);

    run_with(&client, &store, &subscriptions, &RecordingSleeper::default()).unwrap();

    let calls = client.calls.lock().unwrap();
    match &calls[0] {
        FetchTarget::Resource { name, params } => {
            assert_eq!(name, "items");
            assert_eq!(
                params,
                &vec![(
                    "$filter".to_string(),
                    "updated_at gte '2023-11-14T22:13:20+00:00'".to_string()
                )]
            );
        }
        other => panic!("expected a first-page request, got {other:?}"),
    }
}

#[test]
fn test_first_run_uses_epoch() {
    let store = Arc::new(InMemoryStore::new());
    let client = ScriptedClient::default().respond("items", 200, r#"{"items": []}"#);
    let subscriptions = Subscriptions::from_pairs([("items", true)]);

    let report = run_with(&client, &store, &subscriptions, &RecordingSleeper::default()).unwrap();

    assert_eq!(report.previous_checkpoint, Checkpoint::EPOCH);
    let calls = client.calls.lock().unwrap();
    let FetchTarget::Resource { params, .. } = &calls[0] else {
        panic!("expected a first-page request");
    };
    assert_eq!(params[0].1, "updated_at gte '1970-01-01T00:00:00+00:00'");
}

#[test]
fn test_exhausted_retries_leave_checkpoint_unchanged() {
    let before = Checkpoint::new(1_650_000_000);
    let store = Arc::new(InMemoryStore::with_checkpoint(before));
    let client = ScriptedClient::default()
        .respond("organizations", 200, r#"{"organizations": [{"id": "o1"}]}"#)
        .fail_always("people");
    let subscriptions = Subscriptions::from_pairs([
        ("organizations", true),
        ("people", true),
        ("items", true),
    ]);
    let sleeper = RecordingSleeper::default();

    let err = run_with(&client, &store, &subscriptions, &sleeper).unwrap_err();

    assert!(matches!(err, SyncError::RetriesExhausted { attempts: 6, .. }));
    assert!(err.is_fatal());
    assert_eq!(store.load_checkpoint().unwrap(), Some(before));
    assert_eq!(client.calls_for("people"), 6);
    // The run stops at the failing resource type
    assert_eq!(client.calls_for("items"), 0);
    assert_eq!(
        *sleeper.delays.borrow(),
        [5, 10, 15, 20, 25].map(Duration::from_secs).to_vec()
    );
}

#[test]
fn test_transient_failures_recover() {
    let store = Arc::new(InMemoryStore::new());
    let client = ScriptedClient::default()
        .respond("invoices", 500, "oops")
        .respond("invoices", 429, "slow down")
        .respond("invoices", 200, r#"{"invoices": [{"id": "inv-1"}]}"#);
    let subscriptions = Subscriptions::from_pairs([("invoices", true)]);
    let sleeper = RecordingSleeper::default();

    run_with(&client, &store, &subscriptions, &sleeper).unwrap();

    assert_eq!(client.calls_for("invoices"), 3);
    assert_eq!(*sleeper.delays.borrow(), vec![Duration::from_secs(5), Duration::from_secs(10)]);
    assert_eq!(store.load_checkpoint().unwrap(), Some(Checkpoint::new(RUN_START)));
}

#[test]
fn test_disabled_resource_types_are_never_fetched() {
    let store = Arc::new(InMemoryStore::new());
    let client = ScriptedClient::default().respond("people", 200, r#"{"people": []}"#);
    let subscriptions = Subscriptions::from_pairs([
        ("accounts", false),
        ("people", true),
        ("tax_codes", false),
    ]);

    let report = run_with(&client, &store, &subscriptions, &RecordingSleeper::default()).unwrap();

    assert_eq!(client.calls_for("accounts"), 0);
    assert_eq!(client.calls_for("tax_codes"), 0);
    assert_eq!(report.skipped, vec!["accounts", "tax_codes"]);
}

#[test]
fn test_rerun_after_failure_does_not_duplicate() {
    let store = Arc::new(InMemoryStore::new());
    let subscriptions = Subscriptions::from_pairs([("items", true), ("people", true)]);
    let items_page = r#"{"items": [{"id": "i1", "name": "Widget"}, {"id": "i2", "name": "Gadget"}]}"#;

    // First run persists items, then dies on people
    let failing = ScriptedClient::default()
        .respond("items", 200, items_page)
        .fail_always("people");
    assert!(run_with(&failing, &store, &subscriptions, &RecordingSleeper::default()).is_err());
    assert_eq!(store.load_checkpoint().unwrap(), None);

    // Re-triggered run replays the same window
    let healthy = ScriptedClient::default()
        .respond("items", 200, items_page)
        .respond("people", 200, r#"{"people": [{"id": "p1"}]}"#);
    run_with(&healthy, &store, &subscriptions, &RecordingSleeper::default()).unwrap();

    assert_eq!(store.count_entities("items").unwrap(), 2);
    assert_eq!(store.count_entities("people").unwrap(), 1);
    assert_eq!(store.load_checkpoint().unwrap(), Some(Checkpoint::new(RUN_START)));
}

#[test]
fn test_unmapped_resource_is_skipped_not_fatal() {
    let store = Arc::new(InMemoryStore::new());
    let client = ScriptedClient::default()
        .respond("widgets", 200, r#"{"widgets": [{"id": "w1"}]}"#)
        .respond("items", 200, r#"{"items": [{"id": "i1"}]}"#);
    let subscriptions = Subscriptions::from_pairs([("widgets", true), ("items", true)]);

    let report = run_with(&client, &store, &subscriptions, &RecordingSleeper::default()).unwrap();

    assert_eq!(report.resources[0].mismatches, 1);
    assert_eq!(store.count_entities("items").unwrap(), 1);
    assert_eq!(store.load_checkpoint().unwrap(), Some(Checkpoint::new(RUN_START)));
}

#[test]
fn test_unavailable_checkpoint_store_is_fatal() {
    let entities = Arc::new(InMemoryStore::new());
    let registry = MapperRegistry::with_defaults(entities, "1");
    let client = ScriptedClient::default();
    let sleeper = RecordingSleeper::default();
    let mut orchestrator = SyncOrchestrator::new(
        &client,
        &UnavailableCheckpoints,
        &registry,
        &sleeper,
        &FixedClock(RUN_START),
        SyncOptions::default(),
    );

    let err = orchestrator
        .run(&Subscriptions::from_pairs([("items", true)]))
        .unwrap_err();

    assert!(matches!(err, SyncError::StoreUnavailable(_)));
    assert_eq!(orchestrator.phase(), SyncPhase::Failed);
    // Nothing is fetched without a checkpoint
    assert!(client.calls.lock().unwrap().is_empty());
}

#[test]
fn test_global_dispatch_scope_persists_every_key() {
    let store = Arc::new(InMemoryStore::new());
    let registry = MapperRegistry::with_defaults(store.clone(), "1").with_scope(DispatchScope::All);
    let client = ScriptedClient::default().respond(
        "company",
        200,
        r#"{"company": {"id": "c1"}, "accounts": [{"id": "a1"}]}"#,
    );
    let sleeper = RecordingSleeper::default();
    let mut orchestrator = SyncOrchestrator::new(
        &client,
        &*store,
        &registry,
        &sleeper,
        &FixedClock(RUN_START),
        SyncOptions::default(),
    );

    orchestrator
        .run(&Subscriptions::from_pairs([("company", true)]))
        .unwrap();

    assert_eq!(store.count_entities("company").unwrap(), 1);
    assert_eq!(store.count_entities("accounts").unwrap(), 1);
}

#[test]
fn test_sqlite_backed_run() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::new(dir.path().join("connec.db")).unwrap());
    let registry = MapperRegistry::with_defaults(store.clone(), "7");
    let client = ScriptedClient::default().respond(
        "payments",
        200,
        r#"{"payments": [{"id": "pay-1", "amount": 12}], "pagination": {"next": null}}"#,
    );
    let sleeper = RecordingSleeper::default();
    let mut orchestrator = SyncOrchestrator::new(
        &client,
        &*store,
        &registry,
        &sleeper,
        &FixedClock(RUN_START),
        SyncOptions::default(),
    );

    orchestrator
        .run(&Subscriptions::from_pairs([("payments", true)]))
        .unwrap();

    assert_eq!(orchestrator.phase(), SyncPhase::Completed);
    assert_eq!(store.load_checkpoint().unwrap(), Some(Checkpoint::new(RUN_START)));
    let payment = store.get_entity("payments", "pay-1").unwrap().unwrap();
    assert_eq!(payment.created_by, "7");
    assert_eq!(payment.payload["amount"], 12);
}

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use hospadmin::{
    entities::{Appointment, Outpatient, Pharmacist},
    error::{ListError, OpKind},
    record::Entity,
    remote::{memory::MemoryStore, RecordStore, StoreError, StoreResult},
    runtime::{
        events::{ListEvent, NoticeLevel, Notification},
        handle::{spawn_list_manager, ListHandle, ManagerConfig},
    },
    types::{AppointmentStatus, Status},
    view::projection::Presence,
};
use tokio::sync::{broadcast, Notify};

/// Memory store with switchable failures, a gate on writes, and a log of
/// every update it receives.
struct ScriptedStore<E: Entity> {
    inner: MemoryStore<E>,
    fail_loads: AtomicBool,
    fail_writes: AtomicBool,
    hold_loads: AtomicBool,
    hold_writes: AtomicBool,
    release_loads: Notify,
    release: Notify,
    updates: Mutex<Vec<E>>,
}

impl<E: Entity> ScriptedStore<E> {
    fn seeded(records: Vec<E>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::with_records(records).expect("seed"),
            fail_loads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            hold_loads: AtomicBool::new(false),
            hold_writes: AtomicBool::new(false),
            release_loads: Notify::new(),
            release: Notify::new(),
            updates: Mutex::new(Vec::new()),
        })
    }

    async fn before_write(&self) -> StoreResult<()> {
        if self.hold_writes.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 500,
                body: "internal error".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> RecordStore<E> for ScriptedStore<E> {
    async fn list_all(&self) -> StoreResult<Vec<E>> {
        if self.hold_loads.load(Ordering::SeqCst) {
            self.release_loads.notified().await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "maintenance".into(),
            });
        }
        self.inner.list_all().await
    }

    async fn create(&self, record: E) -> StoreResult<E> {
        self.before_write().await?;
        self.inner.create(record).await
    }

    async fn update(&self, key: &E::Key, record: E) -> StoreResult<E> {
        self.before_write().await?;
        self.updates.lock().expect("updates lock").push(record.clone());
        self.inner.update(key, record).await
    }

    async fn delete(&self, key: &E::Key) -> StoreResult<()> {
        self.before_write().await?;
        self.inner.delete(key).await
    }
}

fn outpatient(id: &str, name: &str) -> Outpatient {
    Outpatient {
        outpatient_id: id.to_string(),
        name: name.to_string(),
        age: Some(40),
        gender: "Male".to_string(),
        shift: "Morning".to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone_number: "555-0100".to_string(),
        status: Status::Active,
    }
}

fn pharmacist(id: u64, name: &str, status: Status) -> Pharmacist {
    Pharmacist {
        id: Some(id),
        name: name.to_string(),
        email: format!("{}@pharma.example.com", name.to_lowercase()),
        phone: "9876543210".to_string(),
        shift: "Morning".to_string(),
        status,
    }
}

async fn fill_outpatient(handle: &ListHandle<Outpatient>, id: &str, name: &str) {
    for (field, value) in [
        ("outpatientID", id),
        ("name", name),
        ("age", "33"),
        ("gender", "Female"),
        ("shift", "Evening"),
        ("email", "new@example.com"),
        ("phoneNumber", "555-0111"),
    ] {
        handle.set_field(field, value).await.expect("set field");
    }
}

async fn next_event(rx: &mut broadcast::Receiver<ListEvent>) -> ListEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event timeout")
        .expect("event channel closed")
}

async fn wait_until_loading<E: Entity>(handle: &ListHandle<E>) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if handle.snapshot().await.expect("snapshot").loading {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("load never went in flight");
}

async fn wait_until_submitting<E: Entity>(handle: &ListHandle<E>) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if handle.snapshot().await.expect("snapshot").form.is_submitting() {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("submit never went in flight");
}

#[tokio::test]
async fn create_submit_round_trips_after_refetch() {
    let store = ScriptedStore::<Outpatient>::seeded(vec![]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    assert_eq!(handle.load().await.expect("load"), 0);

    let mut events = handle.subscribe();
    handle.begin_create().await.expect("open");
    fill_outpatient(&handle, "OP-100", "Grace").await;
    let saved = handle.submit().await.expect("submit");
    assert_eq!(saved.outpatient_id, "OP-100");

    assert_eq!(
        next_event(&mut events).await,
        ListEvent::Notice(Notification {
            level: NoticeLevel::Success,
            message: "Outpatient added successfully!".into(),
        })
    );
    assert_eq!(next_event(&mut events).await, ListEvent::Loaded { count: 1 });

    let snap = handle.snapshot().await.expect("snapshot");
    assert_eq!(snap.projection.rows, vec![saved]);
    assert_eq!(snap.projection.rows[0].age, Some(33));
    assert!(!snap.form.is_open());
    assert!(!snap.stale);
    assert_eq!(snap.presence, Presence::Rows);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn edit_submit_replaces_record_under_same_key() {
    let store = ScriptedStore::seeded(vec![
        pharmacist(1, "Alice", Status::Active),
        pharmacist(2, "Bob", Status::Inactive),
    ]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    handle.begin_edit(2).await.expect("edit");
    assert!(matches!(
        handle.set_field("id", "7").await,
        Err(ListError::KeyImmutable)
    ));
    handle.set_field("shift", "Night").await.expect("shift");
    let saved = handle.submit().await.expect("submit");
    assert_eq!(saved.id, Some(2));

    let snap = handle.snapshot().await.expect("snapshot");
    let bob = snap
        .projection
        .rows
        .iter()
        .find(|p| p.id == Some(2))
        .expect("bob still loaded");
    assert_eq!(bob.shift, "Night");
    assert_eq!(bob.name, "Bob");
    assert_eq!(snap.projection.total_count, 2);
}

#[tokio::test]
async fn toggle_sends_flipped_status_with_other_fields_unchanged() {
    let original = pharmacist(1, "Alice", Status::Active);
    let store = ScriptedStore::seeded(vec![original.clone()]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    handle.toggle_status(1).await.expect("toggle");

    let sent = store.updates.lock().expect("updates lock").clone();
    assert_eq!(
        sent,
        vec![Pharmacist {
            status: Status::Inactive,
            ..original
        }]
    );
    let snap = handle.snapshot().await.expect("snapshot");
    assert_eq!(snap.projection.rows[0].status, Status::Inactive);
}

#[tokio::test]
async fn toggle_on_appointment_is_rejected_locally() {
    let store = ScriptedStore::seeded(vec![Appointment {
        id: None,
        patient: "John Doe".into(),
        doctor: "Dr. Smith".into(),
        date: "2025-04-01".into(),
        status: AppointmentStatus::Pending,
    }]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    assert!(matches!(
        handle.toggle_status(1).await,
        Err(ListError::NoStatusField)
    ));
    assert!(store.updates.lock().expect("updates lock").is_empty());
}

#[tokio::test]
async fn failed_submit_leaves_collection_and_draft_alone() {
    let store = ScriptedStore::seeded(vec![outpatient("OP-1", "Ann")]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");
    let before = handle.snapshot().await.expect("snapshot");

    store.fail_writes.store(true, Ordering::SeqCst);
    let mut events = handle.subscribe();
    handle.begin_create().await.expect("open");
    fill_outpatient(&handle, "OP-2", "Grace").await;
    let draft = handle.snapshot().await.expect("snapshot").form.draft().clone();

    let err = handle.submit().await.unwrap_err();
    assert!(matches!(err, ListError::Transport(StoreError::Status { status: 500, .. })));
    assert_eq!(
        next_event(&mut events).await,
        ListEvent::Notice(Notification {
            level: NoticeLevel::Error,
            message: "Error saving outpatient.".into(),
        })
    );

    let after = handle.snapshot().await.expect("snapshot");
    assert_eq!(after.projection.rows, before.projection.rows);
    assert!(after.form.is_open());
    assert!(!after.form.is_submitting());
    assert_eq!(after.form.draft(), &draft);
    assert!(!after.stale);
}

#[tokio::test]
async fn validation_failure_never_reaches_store() {
    let store = ScriptedStore::<Outpatient>::seeded(vec![]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    handle.begin_create().await.expect("open");
    handle.set_field("name", "Grace").await.expect("name");
    assert!(matches!(
        handle.submit().await,
        Err(ListError::MissingFields(_))
    ));
    assert!(store.inner.is_empty().await);
}

#[tokio::test]
async fn confirmed_removal_drops_key_from_reload() {
    let store = ScriptedStore::seeded(vec![outpatient("OP-1", "Ann"), outpatient("OP-2", "Bob")]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    let request = handle
        .request_removal("OP-1".to_string())
        .await
        .expect("request");
    assert_eq!(
        request.prompt(),
        "Are you sure you want to delete outpatient Ann (OP-1)?"
    );
    request.cancel();
    assert_eq!(store.inner.len().await, 2);

    let mut events = handle.subscribe();
    handle
        .request_removal("OP-1".to_string())
        .await
        .expect("request")
        .confirm()
        .await
        .expect("remove");
    assert_eq!(
        next_event(&mut events).await,
        ListEvent::Notice(Notification {
            level: NoticeLevel::Success,
            message: "Outpatient deleted successfully!".into(),
        })
    );

    let snap = handle.snapshot().await.expect("snapshot");
    let ids: Vec<_> = snap
        .projection
        .rows
        .iter()
        .map(|r| r.outpatient_id.as_str())
        .collect();
    assert_eq!(ids, ["OP-2"]);

    assert!(matches!(
        handle.request_removal("OP-1".to_string()).await,
        Err(ListError::UnknownKey(_))
    ));
}

#[tokio::test]
async fn second_submit_in_flight_is_rejected() {
    let store = ScriptedStore::<Outpatient>::seeded(vec![]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    store.hold_writes.store(true, Ordering::SeqCst);
    handle.begin_create().await.expect("open");
    fill_outpatient(&handle, "OP-5", "Grace").await;

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit().await }
    });
    wait_until_submitting(&handle).await;

    assert!(matches!(
        handle.submit().await,
        Err(ListError::InFlight(OpKind::Submit))
    ));
    assert!(handle.snapshot().await.expect("snapshot").stale);

    store.release.notify_one();
    let saved = first.await.expect("join").expect("first submit");
    assert_eq!(saved.outpatient_id, "OP-5");
    assert_eq!(store.inner.len().await, 1);
}

#[tokio::test]
async fn responses_after_shutdown_are_discarded() {
    let store = ScriptedStore::<Outpatient>::seeded(vec![]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    store.hold_writes.store(true, Ordering::SeqCst);
    handle.begin_create().await.expect("open");
    fill_outpatient(&handle, "OP-5", "Grace").await;

    let pending = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit().await }
    });
    wait_until_submitting(&handle).await;

    handle.shutdown().await.expect("shutdown");
    store.release.notify_one();

    assert!(matches!(
        pending.await.expect("join"),
        Err(ListError::ChannelClosed)
    ));
    assert!(matches!(handle.load().await, Err(ListError::ChannelClosed)));
}

#[tokio::test]
async fn first_load_failure_reports_unavailable() {
    let store = ScriptedStore::<Outpatient>::seeded(vec![outpatient("OP-1", "Ann")]);
    store.fail_loads.store(true, Ordering::SeqCst);
    let handle = spawn_list_manager(
        Arc::clone(&store),
        ManagerConfig {
            load_on_spawn: false,
            ..ManagerConfig::default()
        },
    );

    let mut events = handle.subscribe();
    assert!(matches!(handle.load().await, Err(ListError::Transport(_))));
    assert_eq!(
        next_event(&mut events).await,
        ListEvent::Notice(Notification {
            level: NoticeLevel::Error,
            message: "Error fetching outpatients.".into(),
        })
    );
    assert_eq!(
        handle.snapshot().await.expect("snapshot").presence,
        Presence::Unavailable
    );

    store.fail_loads.store(false, Ordering::SeqCst);
    assert_eq!(handle.load().await.expect("retry"), 1);
}

#[tokio::test]
async fn view_changes_recompute_without_store_calls() {
    let records = (1..=12)
        .map(|i| {
            let status = if i % 3 == 0 {
                Status::Inactive
            } else {
                Status::Active
            };
            pharmacist(i, &format!("Pharm{i}"), status)
        })
        .collect();
    let store = ScriptedStore::seeded(records);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    store.fail_loads.store(true, Ordering::SeqCst);

    let page = handle.set_page(3).await.expect("page");
    assert_eq!(page.total_pages, 3);
    assert_eq!(
        page.rows.iter().map(|p| p.id).collect::<Vec<_>>(),
        [Some(11), Some(12)]
    );

    let page = handle.set_filter("status", "Inactive").await.expect("filter");
    assert_eq!(page.filtered_count, 4);
    assert_eq!(page.page, 1);

    let page = handle.set_search("pharm1").await.expect("search");
    assert_eq!(
        page.rows.iter().map(|p| p.id).collect::<Vec<_>>(),
        [Some(12)]
    );

    assert_eq!(
        handle.tally("status").await.expect("tally"),
        vec![("Inactive".to_string(), 1)]
    );

    let page = handle.clear_filters().await.expect("clear");
    assert_eq!(page.filtered_count, 4);
    assert!(!handle.snapshot().await.expect("snapshot").loading);
}

#[tokio::test]
async fn form_rejects_edits_while_submit_in_flight() {
    let store = ScriptedStore::seeded(vec![pharmacist(1, "Alice", Status::Active)]);
    let handle = spawn_list_manager(Arc::clone(&store), ManagerConfig::default());
    handle.load().await.expect("load");

    store.hold_writes.store(true, Ordering::SeqCst);
    handle.begin_create().await.expect("open");
    handle.set_field("name", "Bob").await.expect("name");
    handle.set_field("email", "bob@pharma.example.com").await.expect("email");
    handle.set_field("phone", "555-0100").await.expect("phone");

    let pending = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit().await }
    });
    wait_until_submitting(&handle).await;

    assert!(matches!(
        handle.begin_create().await,
        Err(ListError::InFlight(OpKind::Submit))
    ));
    assert!(matches!(
        handle.begin_edit(1).await,
        Err(ListError::InFlight(OpKind::Submit))
    ));
    assert!(matches!(
        handle.set_field("name", "Changed").await,
        Err(ListError::InFlight(OpKind::Submit))
    ));
    assert!(matches!(
        handle.submit().await,
        Err(ListError::InFlight(OpKind::Submit))
    ));

    store.release.notify_one();
    let saved = pending.await.expect("join").expect("submit");
    assert_eq!(saved.name, "Bob");
    assert_eq!(store.inner.len().await, 2);

    let snap = handle.snapshot().await.expect("snapshot");
    assert!(!snap.form.is_open());
    assert_eq!(snap.projection.total_count, 2);
}

#[tokio::test]
async fn joined_load_waiters_share_one_failure() {
    let store = ScriptedStore::<Outpatient>::seeded(vec![]);
    store.fail_loads.store(true, Ordering::SeqCst);
    store.hold_loads.store(true, Ordering::SeqCst);
    let handle = spawn_list_manager(
        Arc::clone(&store),
        ManagerConfig {
            load_on_spawn: false,
            ..ManagerConfig::default()
        },
    );

    let (first, second, ()) = tokio::join!(handle.load(), handle.load(), async {
        wait_until_loading(&handle).await;
        store.release_loads.notify_one();
    });

    let errors = [first.unwrap_err(), second.unwrap_err()];
    assert!(errors.iter().any(|err| matches!(
        err,
        ListError::Transport(StoreError::Status { status: 503, .. })
    )));
    for err in &errors {
        assert_eq!(
            err.to_string(),
            "record store request failed: server responded 503: maintenance"
        );
    }
}

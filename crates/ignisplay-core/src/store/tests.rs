use super::*;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use ignisplay_backends::{BackendError, InMemoryDocumentStore, JsonFileBackend, RemoteDocument};
use ignisplay_models::PlanId;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use crate::clock::ManualClock;

const NS: &str = "ignisplay:user-data";

fn fast_options() -> StoreOptions {
    StoreOptions {
        retry: RetryPolicy {
            max_attempts: 2,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(2),
            timeout: Duration::from_secs(1),
        },
        ..StoreOptions::default()
    }
}

fn movie(id: &str, title: &str) -> MovieRecord {
    MovieRecord::new(id, title, format!("https://img/{}.jpg", id))
}

fn user(uid: &str) -> Identity {
    Identity::User(uid.to_string())
}

fn ids(history: &[HistoryEntry]) -> Vec<String> {
    history.iter().map(|entry| entry.movie.id.clone()).collect()
}

async fn wait_until<F>(store: &WatchActivityStore, predicate: F) -> ActivityState
where
    F: FnMut(&ActivityState) -> bool,
{
    let mut rx = store.watch();
    let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for store state")
        .expect("store dropped")
        .clone();
    state
}

async fn eventually_no_subscribers(docs: &InMemoryDocumentStore, uid: &str) {
    for _ in 0..100 {
        if docs.subscriber_count(uid).await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("listener for {} was never cancelled", uid);
}

fn local_store(blobs: &Arc<MemoryBlobStore>) -> WatchActivityStore {
    WatchActivityStore::builder(blobs.clone())
        .with_options(fast_options())
        .build()
}

fn remote_store(blobs: &Arc<MemoryBlobStore>, docs: Arc<dyn RemoteBackend>) -> WatchActivityStore {
    WatchActivityStore::builder(blobs.clone())
        .with_remote(docs)
        .with_options(fast_options())
        .build()
}

/// Blob store whose reads for selected keys take a while
#[derive(Default)]
struct SlowBlobStore {
    inner: MemoryBlobStore,
    delays: HashMap<String, Duration>,
}

#[async_trait]
impl LocalBackend for SlowBlobStore {
    fn backend_name(&self) -> &str {
        "slow"
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedData>, BackendError> {
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, data: &PersistedData) -> Result<(), BackendError> {
        self.inner.save(key, data).await
    }
}

/// Blob store that is always unreachable
struct UnreachableBlobStore;

#[async_trait]
impl LocalBackend for UnreachableBlobStore {
    fn backend_name(&self) -> &str {
        "unreachable"
    }

    async fn load(&self, _key: &str) -> Result<Option<PersistedData>, BackendError> {
        Err(BackendError::Unavailable("disk unmounted".to_string()))
    }

    async fn save(&self, _key: &str, _data: &PersistedData) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("disk unmounted".to_string()))
    }
}

/// Document store that starts failing deletes after a fixed number succeed
struct FlakyDocumentStore {
    inner: InMemoryDocumentStore,
    deletes_left: AtomicUsize,
}

#[async_trait]
impl RemoteBackend for FlakyDocumentStore {
    fn backend_name(&self) -> &str {
        "flaky"
    }

    async fn upsert(&self, uid: &str, item_id: &str, fields: DocumentFields) -> Result<(), BackendError> {
        self.inner.upsert(uid, item_id, fields).await
    }

    async fn delete(&self, uid: &str, item_id: &str) -> Result<(), BackendError> {
        let allowed = self
            .deletes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(BackendError::Unavailable("connection reset".to_string()));
        }
        self.inner.delete(uid, item_id).await
    }

    async fn subscribe(&self, uid: &str) -> Result<SnapshotStream, BackendError> {
        self.inner.subscribe(uid).await
    }
}

/// Document store whose listener fails before delivering any snapshot
struct BrokenListenerStore;

#[async_trait]
impl RemoteBackend for BrokenListenerStore {
    fn backend_name(&self) -> &str {
        "broken-listener"
    }

    async fn upsert(&self, _uid: &str, _item_id: &str, _fields: DocumentFields) -> Result<(), BackendError> {
        Ok(())
    }

    async fn delete(&self, _uid: &str, _item_id: &str) -> Result<(), BackendError> {
        Ok(())
    }

    async fn subscribe(&self, _uid: &str) -> Result<SnapshotStream, BackendError> {
        let failure = futures::stream::iter(vec![Err(BackendError::Listener("permission denied".to_string()))]);
        Ok(failure.chain(futures::stream::pending()).boxed())
    }
}

// ---- local mode -------------------------------------------------------------

#[tokio::test]
async fn test_guest_view_moves_to_front_without_duplicating() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = local_store(&blobs);
    store.load(Identity::Guest).await;

    store.record_view(movie("m1", "X"));
    store.record_view(movie("m2", "Y"));
    store.record_view(movie("m1", "X").with_progress(0.9));

    let history = store.history();
    assert_eq!(ids(&history), vec!["m1", "m2"]);
    assert_eq!(history[0].movie.progress, Some(0.9));
    // Views without progress get the default stamp
    assert_eq!(history[1].movie.progress, Some(0.2));
    assert!(history.iter().all(|entry| entry.watched_at.is_some()));
}

#[tokio::test]
async fn test_history_never_holds_duplicate_ids() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = local_store(&blobs);
    store.load(Identity::Guest).await;

    let mut last_title = HashMap::new();
    for step in 0..120u32 {
        let id = format!("m{}", (step * 7) % 13);
        let title = format!("view {}", step);
        store.record_view(movie(&id, &title));
        last_title.insert(id, title);
    }

    let history = store.history();
    let unique: HashSet<&str> = history.iter().map(|entry| entry.id()).collect();
    assert_eq!(unique.len(), history.len());
    for entry in &history {
        assert_eq!(Some(&entry.movie.title), last_title.get(entry.id()));
    }
}

#[tokio::test]
async fn test_local_history_is_capped_at_forty() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = local_store(&blobs);
    store.load(Identity::Guest).await;

    for i in 1..=40 {
        store.record_view(movie(&format!("m{}", i), "T"));
    }
    assert_eq!(store.history().len(), 40);

    store.record_view(movie("m41", "T"));
    let history = store.history();
    assert_eq!(history.len(), 40);
    assert_eq!(history[0].id(), "m41");
    assert!(!history.iter().any(|entry| entry.id() == "m1"));
    assert_eq!(history[39].id(), "m2");
}

#[tokio::test]
async fn test_remove_view_and_clear_all() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = local_store(&blobs);
    store.load(Identity::Guest).await;

    store.record_view(movie("m1", "X"));
    store.record_view(movie("m2", "Y"));
    store.remove_view("missing");
    assert_eq!(store.history().len(), 2);

    store.remove_view("m1");
    assert_eq!(ids(&store.history()), vec!["m2"]);

    store.clear_all();
    store.flush().await;
    assert!(store.history().is_empty());
    let saved = blobs.get(&format!("{}:guest", NS)).await.unwrap();
    assert!(saved.history.is_empty());
}

#[tokio::test]
async fn test_toggle_saved_round_trips() {
    let store = WatchActivityStore::in_memory();
    store.load(Identity::Guest).await;

    let m = movie("m1", "X");
    assert!(!store.is_saved("m1"));
    assert!(store.toggle_saved(m.clone()));
    assert!(store.is_saved("m1"));
    assert!(!store.toggle_saved(m.clone()));
    assert!(!store.is_saved("m1"));

    for n in 1..=5 {
        store.toggle_saved(m.clone());
        assert_eq!(store.is_saved("m1"), n % 2 == 1);
    }
    assert_eq!(store.my_list().len(), 1);
}

#[tokio::test]
async fn test_state_persists_and_rehydrates_per_identity() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = local_store(&blobs);
    store.load(user("alice")).await;
    store.record_view(movie("m1", "X"));
    store.toggle_saved(movie("m2", "Y"));
    store.flush().await;

    store.load(Identity::Guest).await;
    assert!(store.history().is_empty());
    assert!(!store.is_saved("m2"));

    let fresh = local_store(&blobs);
    fresh.load(user("alice")).await;
    assert_eq!(ids(&fresh.history()), vec!["m1"]);
    assert!(fresh.is_saved("m2"));
    assert!(!fresh.is_loading());
}

#[tokio::test]
async fn test_oversized_stored_history_is_trimmed_on_load() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let mut data = PersistedData::default();
    for i in 0..50 {
        data.history.push(HistoryEntry::new(movie(&format!("m{}", i), "T"), None));
    }
    data.history.push(HistoryEntry::new(movie("m0", "dup"), None));
    blobs.insert(format!("{}:guest", NS), data).await;

    let store = local_store(&blobs);
    store.load(Identity::Guest).await;
    let history = store.history();
    assert_eq!(history.len(), 40);
    assert_eq!(history[0].id(), "m0");
    assert_eq!(history[0].movie.title, "T");
}

#[tokio::test]
async fn test_unreachable_storage_degrades_to_empty_state() {
    let store = WatchActivityStore::builder(Arc::new(UnreachableBlobStore))
        .with_options(fast_options())
        .build();
    store.load(Identity::Guest).await;
    assert!(store.history().is_empty());
    assert!(!store.is_loading());

    store.record_view(movie("m1", "X"));
    store.flush().await;
    // The write failed but memory stays authoritative
    assert_eq!(ids(&store.history()), vec!["m1"]);
    assert_eq!(store.failed_writes(), 1);
}

#[tokio::test]
async fn test_mutations_before_load_are_ignored() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = local_store(&blobs);
    store.record_view(movie("m1", "X"));
    assert!(!store.toggle_saved(movie("m1", "X")));
    store.flush().await;

    assert!(store.history().is_empty());
    assert!(blobs.get(&format!("{}:guest", NS)).await.is_none());
}

#[tokio::test]
async fn test_newer_load_wins_over_slow_older_load() {
    let seeded = |id: &str| PersistedData {
        history: vec![HistoryEntry::new(movie(id, "T"), None)],
        ..PersistedData::default()
    };
    let mut slow = SlowBlobStore::default();
    slow.delays.insert(format!("{}:alice", NS), Duration::from_millis(150));
    slow.inner.insert(format!("{}:alice", NS), seeded("a1")).await;
    slow.inner.insert(format!("{}:bob", NS), seeded("b1")).await;

    let store = WatchActivityStore::builder(Arc::new(slow))
        .with_options(fast_options())
        .build();

    let alice_store = store.clone();
    let alice = tokio::spawn(async move { alice_store.load(user("alice")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.load(user("bob")).await;
    alice.await.unwrap();

    assert_eq!(store.identity(), user("bob"));
    assert_eq!(ids(&store.history()), vec!["b1"]);
}

#[tokio::test]
async fn test_file_backed_store_survives_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.store.history_limit = 2;
    let options = StoreOptions::from_config(&config);

    let store = WatchActivityStore::builder(Arc::new(JsonFileBackend::new(temp_dir.path())))
        .with_options(options.clone())
        .build();
    store.load(user("alice")).await;
    for id in ["m1", "m2", "m3"] {
        store.record_view(movie(id, "T"));
    }
    store.flush().await;
    assert_eq!(store.failed_writes(), 0);

    let restarted = WatchActivityStore::builder(Arc::new(JsonFileBackend::new(temp_dir.path())))
        .with_options(options)
        .build();
    restarted.load(user("alice")).await;
    assert_eq!(ids(&restarted.history()), vec!["m3", "m2"]);
}

// ---- subscription -------------------------------------------------------------

#[tokio::test]
async fn test_activation_sets_expiry_and_gates_playback() {
    let start = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let store = WatchActivityStore::builder(Arc::new(MemoryBlobStore::new()))
        .with_clock(clock.clone())
        .with_options(fast_options())
        .build();
    store.load(Identity::Guest).await;

    assert_eq!(store.check_playback(ResolutionTier::Hd720), PlaybackDecision::SubscriptionRequired);
    assert!(store.check_playback(ResolutionTier::Sd480).is_allowed());

    let plan = SubscriptionPlan::find(PlanId::Basic3).unwrap();
    let state = store.activate_subscription(plan).unwrap();
    let until = Utc.with_ymd_and_hms(2027, 1, 16, 9, 30, 0).unwrap();
    assert_eq!(state.active_until, until);
    assert_eq!(store.subscription(), Some(state));

    clock.set(until - ChronoDuration::seconds(1));
    assert!(store.check_playback(ResolutionTier::FullHd1080).is_allowed());
    clock.set(until);
    assert!(!store.check_playback(ResolutionTier::FullHd1080).is_allowed());
    assert!(store.check_playback(ResolutionTier::Sd480).is_allowed());
}

#[tokio::test]
async fn test_new_plan_replaces_active_plan_from_now() {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let store = WatchActivityStore::builder(Arc::new(MemoryBlobStore::new()))
        .with_clock(clock.clone())
        .with_options(fast_options())
        .build();
    store.load(Identity::Guest).await;

    store.activate_subscription(SubscriptionPlan::find(PlanId::Premium9).unwrap());
    clock.set(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
    let replaced = store
        .activate_subscription(SubscriptionPlan::find(PlanId::Basic3).unwrap())
        .unwrap();

    assert_eq!(replaced.plan.id, PlanId::Basic3);
    assert_eq!(replaced.active_until, Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());

    store.cancel_subscription();
    assert!(store.subscription().is_none());
}

// ---- remote mode --------------------------------------------------------------

#[tokio::test]
async fn test_remote_view_applies_on_echo() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    let store = remote_store(&blobs, docs.clone());

    store.load(user("u1")).await;
    let state = wait_until(&store, |s| !s.is_loading).await;
    assert_eq!(state.mode, SyncMode::Remote);
    assert!(state.history.is_empty());

    store.record_view(movie("m1", "X"));
    store.record_view(movie("m2", "Y"));
    store.record_view(movie("m1", "X"));

    let state = wait_until(&store, |s| ids(&s.history) == vec!["m1", "m2"]).await;
    assert!(state.history.iter().all(|entry| entry.watched_at.is_some()));
    assert_eq!(docs.documents("u1").await.len(), 2);
}

#[tokio::test]
async fn test_remote_changes_from_another_session_arrive() {
    let docs = Arc::new(InMemoryDocumentStore::new());
    let phone = remote_store(&Arc::new(MemoryBlobStore::new()), docs.clone());
    let tv = remote_store(&Arc::new(MemoryBlobStore::new()), docs.clone());
    phone.load(user("u1")).await;
    tv.load(user("u1")).await;

    phone.record_view(movie("m1", "X"));
    wait_until(&tv, |s| ids(&s.history) == vec!["m1"]).await;

    tv.remove_view("m1");
    wait_until(&phone, |s| s.history.is_empty()).await;
}

#[tokio::test]
async fn test_switching_identity_cancels_previous_listener() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    let store = remote_store(&blobs, docs.clone());

    store.load(user("alice")).await;
    assert_eq!(docs.subscriber_count("alice").await, 1);

    store.load(user("bob")).await;
    eventually_no_subscribers(&docs, "alice").await;
    assert_eq!(docs.subscriber_count("bob").await, 1);

    docs.upsert("alice", "a1", DocumentFields::from(&movie("a1", "A"))).await.unwrap();
    docs.upsert("bob", "b1", DocumentFields::from(&movie("b1", "B"))).await.unwrap();
    let state = wait_until(&store, |s| !s.history.is_empty()).await;
    assert_eq!(ids(&state.history), vec!["b1"]);
}

#[tokio::test]
async fn test_stale_remote_load_never_subscribes() {
    let mut slow = SlowBlobStore::default();
    slow.delays.insert(format!("{}:alice", NS), Duration::from_millis(150));
    let docs = Arc::new(InMemoryDocumentStore::new());
    docs.upsert("bob", "b1", DocumentFields::from(&movie("b1", "B"))).await.unwrap();
    docs.upsert("alice", "a1", DocumentFields::from(&movie("a1", "A"))).await.unwrap();

    let store = WatchActivityStore::builder(Arc::new(slow))
        .with_remote(docs.clone())
        .with_options(fast_options())
        .build();

    let alice_store = store.clone();
    let alice = tokio::spawn(async move { alice_store.load(user("alice")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.load(user("bob")).await;
    alice.await.unwrap();

    let state = wait_until(&store, |s| !s.is_loading).await;
    assert_eq!(state.identity, user("bob"));
    assert_eq!(ids(&state.history), vec!["b1"]);
    assert_eq!(docs.subscriber_count("alice").await, 0);
    assert_eq!(docs.subscriber_count("bob").await, 1);
}

#[tokio::test]
async fn test_remote_clear_all_keeps_remaining_after_failed_delete() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let flaky = Arc::new(FlakyDocumentStore {
        inner: InMemoryDocumentStore::new(),
        deletes_left: AtomicUsize::new(2),
    });
    let store = remote_store(&blobs, flaky.clone());
    store.load(user("u1")).await;

    for i in 1..=5 {
        store.record_view(movie(&format!("m{}", i), "T"));
    }
    wait_until(&store, |s| s.history.len() == 5).await;

    store.clear_all();
    store.flush().await;

    assert_eq!(flaky.inner.documents("u1").await.len(), 3);
    assert_eq!(store.failed_writes(), 1);
    let state = wait_until(&store, |s| s.history.len() == 3).await;
    // Newest entries were deleted first
    assert_eq!(ids(&state.history), vec!["m3", "m2", "m1"]);
}

#[tokio::test]
async fn test_listener_error_keeps_last_snapshot() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    docs.upsert("u1", "m1", DocumentFields::from(&movie("m1", "X"))).await.unwrap();
    let store = remote_store(&blobs, docs.clone());

    store.load(user("u1")).await;
    wait_until(&store, |s| s.history.len() == 1).await;

    docs.fail_listeners("u1", "permission denied").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let state = store.snapshot();
    assert!(!state.is_loading);
    assert_eq!(ids(&state.history), vec!["m1"]);
}

#[tokio::test]
async fn test_listener_error_before_first_snapshot_clears_loading() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let cached = PersistedData {
        history: vec![HistoryEntry::new(movie("c1", "Cached"), None)],
        ..PersistedData::default()
    };
    blobs.insert(format!("{}:u1", NS), cached).await;
    let store = remote_store(&blobs, Arc::new(BrokenListenerStore));

    store.load(user("u1")).await;
    let state = wait_until(&store, |s| !s.is_loading).await;
    assert_eq!(state.mode, SyncMode::Remote);
    assert_eq!(ids(&state.history), vec!["c1"]);
}

#[tokio::test]
async fn test_offline_remote_falls_back_to_cached_history() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    docs.upsert("u1", "m1", DocumentFields::from(&movie("m1", "X"))).await.unwrap();

    let first = remote_store(&blobs, docs.clone());
    first.load(user("u1")).await;
    wait_until(&first, |s| s.history.len() == 1).await;
    first.flush().await;
    first.close();

    docs.set_offline(true).await;
    let second = remote_store(&blobs, docs.clone());
    second.load(user("u1")).await;
    let state = second.snapshot();
    assert!(!state.is_loading);
    assert_eq!(ids(&state.history), vec!["m1"]);
}

#[tokio::test]
async fn test_guest_uses_local_mode_even_with_remote() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    let store = remote_store(&blobs, docs.clone());

    store.load(Identity::Guest).await;
    assert_eq!(store.snapshot().mode, SyncMode::Local);
    store.record_view(movie("m1", "X"));
    assert_eq!(ids(&store.history()), vec!["m1"]);
    store.flush().await;
    assert!(docs.documents("guest").await.is_empty());
}

#[tokio::test]
async fn test_remote_mode_keeps_my_list_and_plan_locally() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    let store = remote_store(&blobs, docs.clone());
    store.load(user("u1")).await;

    store.toggle_saved(movie("m9", "Z"));
    store.activate_subscription(SubscriptionPlan::find(PlanId::Standard6).unwrap());
    store.flush().await;

    let saved = blobs.get(&format!("{}:u1", NS)).await.unwrap();
    assert_eq!(saved.my_list.len(), 1);
    assert_eq!(saved.subscription.map(|s| s.plan.id), Some(PlanId::Standard6));
}

#[tokio::test]
async fn test_close_cancels_listener() {
    let docs = Arc::new(InMemoryDocumentStore::new());
    let store = remote_store(&Arc::new(MemoryBlobStore::new()), docs.clone());
    store.load(user("u1")).await;
    assert_eq!(docs.subscriber_count("u1").await, 1);

    store.close();
    eventually_no_subscribers(&docs, "u1").await;
}

#[test]
fn test_remote_document_maps_to_history_entry() {
    let doc = RemoteDocument {
        id: "m1".to_string(),
        fields: DocumentFields::from(&movie("m1", "X")),
        watched_at: Utc::now(),
    };
    let entry = doc.into_history_entry();
    assert_eq!(entry.movie.poster_url, "https://img/m1.jpg");
}

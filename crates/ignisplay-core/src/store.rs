//! The watch-activity store: history, my-list and subscription for one identity.
//!
//! State lives in a `tokio::sync::watch` channel, which serializes mutation
//! and lets any number of observers follow snapshots. Persistence is
//! fire-and-forget through an ordered background writer. In remote mode the
//! history is driven by a live backend subscription; everything else is kept
//! in the local blob.

use futures::StreamExt;
use ignisplay_backends::{DocumentFields, LocalBackend, MemoryBlobStore, RemoteBackend, SnapshotStream};
use ignisplay_config::{Config, DEFAULT_NAMESPACE};
use ignisplay_models::movie::clamp_progress;
use ignisplay_models::{
    HistoryEntry, Identity, MovieRecord, PersistedData, ResolutionTier, SubscriptionPlan,
    SubscriptionState,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::clock::{Clock, SystemClock};
use crate::gate::{check_playback, PlaybackDecision};
use crate::retry::RetryPolicy;
use crate::state::{dedup_by_id, ActivityState, SyncMode};
use crate::writer::{PersistJob, PersistenceWriter};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub namespace: String,
    pub history_limit: usize,
    pub default_progress: f32,
    pub retry: RetryPolicy,
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: config.store.namespace.clone(),
            history_limit: config.store.history_limit.max(1),
            default_progress: clamp_progress(config.store.default_progress),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            history_limit: 40,
            default_progress: 0.2,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct StoreBuilder {
    local: Arc<dyn LocalBackend>,
    remote: Option<Arc<dyn RemoteBackend>>,
    clock: Arc<dyn Clock>,
    options: StoreOptions,
}

impl StoreBuilder {
    pub fn new(local: Arc<dyn LocalBackend>) -> Self {
        Self {
            local,
            remote: None,
            clock: Arc::new(SystemClock),
            options: StoreOptions::default(),
        }
    }

    /// Signed-in identities sync history through `remote`
    pub fn with_remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Spawns the persistence writer, so this must run inside a Tokio runtime
    pub fn build(self) -> WatchActivityStore {
        let writer = PersistenceWriter::spawn(
            Arc::clone(&self.local),
            self.remote.clone(),
            self.options.retry.clone(),
        );
        let (state, _) = watch::channel(ActivityState::default());
        WatchActivityStore {
            inner: Arc::new(StoreInner {
                options: self.options,
                local: self.local,
                remote: self.remote,
                clock: self.clock,
                state,
                epoch: AtomicU64::new(0),
                listener: Mutex::new(None),
                writer,
            }),
        }
    }
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct WatchActivityStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    options: StoreOptions,
    local: Arc<dyn LocalBackend>,
    remote: Option<Arc<dyn RemoteBackend>>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<ActivityState>,
    epoch: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
    writer: PersistenceWriter,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let handle = self.listener.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl WatchActivityStore {
    pub fn builder(local: Arc<dyn LocalBackend>) -> StoreBuilder {
        StoreBuilder::new(local)
    }

    /// Store backed by process memory only
    pub fn in_memory() -> Self {
        StoreBuilder::new(Arc::new(MemoryBlobStore::new())).build()
    }

    /// Switch to `identity` and hydrate it.
    ///
    /// Any live subscription for the previous identity is cancelled first.
    /// If another `load` starts before this one finishes, this one's results
    /// are discarded.
    pub async fn load(&self, identity: Identity) {
        let inner = &self.inner;
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.cancel_listener();

        let mode = if inner.remote.is_some() && !identity.is_guest() {
            SyncMode::Remote
        } else {
            SyncMode::Local
        };
        inner.state.send_replace(ActivityState {
            identity: identity.clone(),
            epoch,
            mode,
            is_loading: true,
            hydrated: false,
            ..ActivityState::default()
        });
        info!(
            operation = "load",
            identity = %identity,
            mode = ?mode,
            backend = inner.local.backend_name(),
            "Loading watch activity"
        );

        let key = inner.key_for(&identity);
        let local = Arc::clone(&inner.local);
        let loaded = inner
            .options
            .retry
            .run("load", || {
                let local = Arc::clone(&local);
                let key = key.clone();
                async move { local.load(&key).await }
            })
            .await;
        let data = match loaded {
            Ok(data) => data.unwrap_or_default(),
            Err(e) => {
                warn!(operation = "load", identity = %identity, error = %e, "Could not read stored activity; starting empty");
                PersistedData::default()
            }
        };

        let limit = inner.options.history_limit;
        let applied = inner.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            let mut history = data.history;
            dedup_by_id(&mut history, |entry| entry.id());
            if mode == SyncMode::Local {
                history.truncate(limit);
            }
            let mut my_list = data.my_list;
            dedup_by_id(&mut my_list, |movie| movie.id.as_str());

            state.history = history;
            state.my_list = my_list;
            state.subscription = data.subscription;
            state.hydrated = true;
            state.is_loading = mode == SyncMode::Remote;
            true
        });
        if !applied {
            debug!(operation = "load", identity = %identity, "Discarding stale load result");
            return;
        }

        if mode == SyncMode::Remote {
            if let (Some(remote), Some(uid)) = (inner.remote.clone(), identity.uid()) {
                self.start_listener(remote, uid.to_string(), epoch).await;
            }
        }
    }

    async fn start_listener(&self, remote: Arc<dyn RemoteBackend>, uid: String, epoch: u64) {
        let inner = &self.inner;
        let subscribed = inner
            .options
            .retry
            .run("subscribe", || {
                let remote = Arc::clone(&remote);
                let uid = uid.clone();
                async move { remote.subscribe(&uid).await }
            })
            .await;

        let stream = match subscribed {
            Ok(stream) => stream,
            Err(e) => {
                warn!(operation = "subscribe", identity = %uid, error = %e, "Could not subscribe to watch history; showing cached history");
                inner.finish_loading(epoch);
                return;
            }
        };

        debug!(identity = %uid, backend = remote.backend_name(), "Listening for watch history snapshots");
        let handle = tokio::spawn(run_listener(Arc::downgrade(inner), epoch, uid, stream));
        let mut slot = inner.listener.lock().unwrap_or_else(|e| e.into_inner());
        // `load` bumps the epoch before taking this lock, so a newer load has
        // either already cancelled us or will after we release it.
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            handle.abort();
            return;
        }
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Mark `movie` as watched now, moving it to the front of the history.
    ///
    /// Locally the history updates immediately and is capped. Remotely the
    /// document is written and the history updates when the backend echoes it.
    pub fn record_view(&self, movie: MovieRecord) {
        let inner = &self.inner;
        let now = inner.clock.now();
        let limit = inner.options.history_limit;
        let default_progress = inner.options.default_progress;

        inner.mutate("record_view", |state, ctx| match state.mode {
            SyncMode::Local => {
                let mut movie = movie;
                movie.progress = Some(movie.progress.map(clamp_progress).unwrap_or(default_progress));
                state.history.retain(|entry| entry.movie.id != movie.id);
                state.history.insert(0, HistoryEntry::new(movie, Some(now)));
                state.history.truncate(limit);
                ctx.save_blob(state);
                true
            }
            SyncMode::Remote => {
                if let Some(uid) = state.identity.uid() {
                    ctx.enqueue(PersistJob::Upsert {
                        uid: uid.to_string(),
                        item_id: movie.id.clone(),
                        fields: DocumentFields::from(&movie),
                    });
                }
                false
            }
        });
    }

    /// Remove one history entry. Unknown ids are ignored.
    pub fn remove_view(&self, movie_id: &str) {
        self.inner.mutate("remove_view", |state, ctx| match state.mode {
            SyncMode::Local => {
                let before = state.history.len();
                state.history.retain(|entry| entry.movie.id != movie_id);
                if state.history.len() == before {
                    return false;
                }
                ctx.save_blob(state);
                true
            }
            SyncMode::Remote => {
                if let Some(uid) = state.identity.uid() {
                    ctx.enqueue(PersistJob::Delete {
                        uid: uid.to_string(),
                        item_id: movie_id.to_string(),
                    });
                }
                false
            }
        });
    }

    /// Delete the whole history. Remotely this is one delete per document
    /// with no rollback if one fails part-way.
    pub fn clear_all(&self) {
        self.inner.mutate("clear_all", |state, ctx| match state.mode {
            SyncMode::Local => {
                if state.history.is_empty() {
                    return false;
                }
                state.history.clear();
                ctx.save_blob(state);
                true
            }
            SyncMode::Remote => {
                if let Some(uid) = state.identity.uid() {
                    ctx.enqueue(PersistJob::ClearAll {
                        uid: uid.to_string(),
                        item_ids: state.history_ids(),
                    });
                }
                false
            }
        });
    }

    /// Flip my-list membership of `movie`. Returns the new membership.
    pub fn toggle_saved(&self, movie: MovieRecord) -> bool {
        let mut saved = false;
        self.inner.mutate("toggle_saved", |state, ctx| {
            if state.is_saved(&movie.id) {
                state.my_list.retain(|item| item.id != movie.id);
            } else {
                state.my_list.insert(0, movie);
                saved = true;
            }
            ctx.save_blob(state);
            true
        });
        saved
    }

    pub fn is_saved(&self, movie_id: &str) -> bool {
        self.inner.state.borrow().is_saved(movie_id)
    }

    /// Record a plan reported by the payment flow.
    ///
    /// Expiry is `now + plan.months`. An already active plan is replaced,
    /// not extended.
    pub fn activate_subscription(&self, plan: SubscriptionPlan) -> Option<SubscriptionState> {
        let now = self.inner.clock.now();
        let activated = SubscriptionState::activate(plan, now);
        let mut result = None;
        self.inner.mutate("activate_subscription", |state, ctx| {
            if let Some(previous) = state.subscription.as_ref().filter(|sub| sub.is_active_at(now)) {
                info!(
                    previous_plan = %previous.plan.id,
                    previous_until = %previous.active_until,
                    "Replacing an active subscription"
                );
            }
            info!(plan = %activated.plan.id, active_until = %activated.active_until, "Subscription activated");
            state.subscription = Some(activated.clone());
            result = Some(activated);
            ctx.save_blob(state);
            true
        });
        result
    }

    /// Forget the recorded plan after billing was cancelled externally
    pub fn cancel_subscription(&self) {
        self.inner.mutate("cancel_subscription", |state, ctx| {
            if state.subscription.take().is_none() {
                return false;
            }
            ctx.save_blob(state);
            true
        });
    }

    /// Entitlement check for a playback request, evaluated against the clock
    /// on every call.
    pub fn check_playback(&self, tier: ResolutionTier) -> PlaybackDecision {
        let now = self.inner.clock.now();
        check_playback(self.inner.state.borrow().subscription.as_ref(), tier, now)
    }

    /// Cancel the live subscription. In-memory state stays readable.
    pub fn close(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_listener();
        debug!("Watch activity store closed");
    }

    /// Wait until every write queued so far has been attempted
    pub async fn flush(&self) {
        self.inner.writer.flush().await;
    }

    /// Background writes that failed after retries
    pub fn failed_writes(&self) -> u64 {
        self.inner.writer.failures()
    }

    /// Observe state changes
    pub fn watch(&self) -> watch::Receiver<ActivityState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ActivityState {
        self.inner.state.borrow().clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.state.borrow().history.clone()
    }

    pub fn my_list(&self) -> Vec<MovieRecord> {
        self.inner.state.borrow().my_list.clone()
    }

    pub fn subscription(&self) -> Option<SubscriptionState> {
        self.inner.state.borrow().subscription.clone()
    }

    pub fn identity(&self) -> Identity {
        self.inner.state.borrow().identity.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }
}

/// Writes a mutation wants queued, built while the state lock is held so the
/// queue order matches the mutation order.
struct MutationContext<'a> {
    writer: &'a PersistenceWriter,
    key: String,
}

impl MutationContext<'_> {
    fn save_blob(&self, state: &ActivityState) {
        self.enqueue(PersistJob::SaveBlob {
            key: self.key.clone(),
            data: state.to_persisted(),
        });
    }

    fn enqueue(&self, job: PersistJob) {
        self.writer.enqueue(job);
    }
}

impl StoreInner {
    fn key_for(&self, identity: &Identity) -> String {
        identity.storage_key(&self.options.namespace)
    }

    /// Apply `apply` to the current state if it is hydrated. `apply` returns
    /// whether it changed anything observers should see.
    fn mutate<F>(&self, operation: &str, apply: F)
    where
        F: FnOnce(&mut ActivityState, &MutationContext<'_>) -> bool,
    {
        self.state.send_if_modified(|state| {
            if !state.hydrated {
                warn!(operation, identity = %state.identity, "Ignoring mutation before watch activity is loaded");
                return false;
            }
            let ctx = MutationContext {
                writer: &self.writer,
                key: self.key_for(&state.identity),
            };
            apply(state, &ctx)
        });
    }

    fn cancel_listener(&self) {
        let handle = self.listener.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("Cancelled watch history listener");
        }
    }

    fn finish_loading(&self, epoch: u64) {
        self.state.send_if_modified(|state| {
            if state.epoch != epoch || !state.is_loading {
                return false;
            }
            state.is_loading = false;
            true
        });
    }
}

async fn run_listener(inner: Weak<StoreInner>, epoch: u64, uid: String, mut stream: SnapshotStream) {
    while let Some(item) = stream.next().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match item {
            Ok(documents) => {
                let history: Vec<HistoryEntry> = documents
                    .into_iter()
                    .map(|doc| doc.into_history_entry())
                    .collect();
                let count = history.len();
                let key = inner.key_for(&Identity::User(uid.clone()));
                let writer = &inner.writer;
                let applied = inner.state.send_if_modified(|state| {
                    if state.epoch != epoch {
                        return false;
                    }
                    state.history = history;
                    state.is_loading = false;
                    // Cache the snapshot so a cold start has something to show
                    writer.enqueue(PersistJob::SaveBlob {
                        key,
                        data: state.to_persisted(),
                    });
                    true
                });
                if !applied {
                    debug!(identity = %uid, "Discarding snapshot for a stale identity");
                    break;
                }
                debug!(identity = %uid, entries = count, "Applied watch history snapshot");
            }
            Err(e) => {
                warn!(operation = "listen", identity = %uid, error = %e, "Watch history listener error; keeping last snapshot");
                inner.finish_loading(epoch);
            }
        }
    }
    debug!(identity = %uid, "Watch history listener ended");
}

#[cfg(test)]
mod tests;

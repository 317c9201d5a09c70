use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};
use crate::error::BackendError;
use crate::traits::{DocumentFields, RemoteBackend, RemoteDocument, SnapshotStream};

type SnapshotSender = mpsc::UnboundedSender<Result<Vec<RemoteDocument>, BackendError>>;

/// In-process remote document store.
///
/// Behaves like a real-time document database: every write assigns a server
/// timestamp, and every subscriber of the touched identity receives the full
/// collection ordered by `watched_at` descending. Several stores (sessions)
/// can share one instance to exercise cross-device updates.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: Mutex<DocumentState>,
}

#[derive(Debug, Default)]
struct DocumentState {
    collections: HashMap<String, HashMap<String, RemoteDocument>>,
    subscribers: HashMap<String, Vec<SnapshotSender>>,
    last_timestamp: Option<DateTime<Utc>>,
    offline: bool,
}

impl DocumentState {
    /// Wall clock, bumped so that consecutive writes never share a timestamp
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn snapshot(&self, uid: &str) -> Vec<RemoteDocument> {
        let mut docs: Vec<RemoteDocument> = self
            .collections
            .get(uid)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| b.watched_at.cmp(&a.watched_at));
        docs
    }

    fn notify(&mut self, uid: &str) {
        let snapshot = self.snapshot(uid);
        if let Some(senders) = self.subscribers.get_mut(uid) {
            senders.retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
            trace!("Pushed snapshot of {} documents to {} listeners for {}", snapshot.len(), senders.len(), uid);
        }
    }

    fn ensure_online(&self) -> Result<(), BackendError> {
        if self.offline {
            Err(BackendError::Unavailable("document store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with `BackendError::Unavailable`
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Current ordered collection, as a subscriber would see it
    pub async fn documents(&self, uid: &str) -> Vec<RemoteDocument> {
        self.state.lock().await.snapshot(uid)
    }

    /// Number of live listeners for `uid`; cancelled subscriptions are pruned first
    pub async fn subscriber_count(&self, uid: &str) -> usize {
        let mut state = self.state.lock().await;
        match state.subscribers.get_mut(uid) {
            Some(senders) => {
                senders.retain(|tx| !tx.is_closed());
                senders.len()
            }
            None => 0,
        }
    }

    /// Deliver a listener error to every subscriber of `uid`
    pub async fn fail_listeners(&self, uid: &str, message: &str) {
        let mut state = self.state.lock().await;
        if let Some(senders) = state.subscribers.get_mut(uid) {
            senders.retain(|tx| tx.send(Err(BackendError::Listener(message.to_string()))).is_ok());
        }
    }
}

#[async_trait]
impl RemoteBackend for InMemoryDocumentStore {
    fn backend_name(&self) -> &str {
        "in-memory-documents"
    }

    async fn upsert(&self, uid: &str, item_id: &str, fields: DocumentFields) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;

        let watched_at = state.next_timestamp();
        let doc = RemoteDocument {
            id: item_id.to_string(),
            fields,
            watched_at,
        };
        state
            .collections
            .entry(uid.to_string())
            .or_default()
            .insert(item_id.to_string(), doc);
        debug!("Upserted watch history document {} for {}", item_id, uid);

        state.notify(uid);
        Ok(())
    }

    async fn delete(&self, uid: &str, item_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;

        let removed = state
            .collections
            .get_mut(uid)
            .and_then(|collection| collection.remove(item_id))
            .is_some();
        if removed {
            debug!("Deleted watch history document {} for {}", item_id, uid);
            state.notify(uid);
        }
        Ok(())
    }

    async fn subscribe(&self, uid: &str) -> Result<SnapshotStream, BackendError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is still held below, so this send cannot fail
        let _ = tx.send(Ok(state.snapshot(uid)));
        state.subscribers.entry(uid.to_string()).or_default().push(tx);
        debug!("Registered watch history listener for {}", uid);

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}

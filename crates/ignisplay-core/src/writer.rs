use ignisplay_backends::{BackendError, DocumentFields, LocalBackend, RemoteBackend};
use ignisplay_models::PersistedData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use crate::retry::RetryPolicy;

#[derive(Debug)]
pub(crate) enum PersistJob {
    SaveBlob { key: String, data: PersistedData },
    Upsert { uid: String, item_id: String, fields: DocumentFields },
    Delete { uid: String, item_id: String },
    /// One delete per document; stops at the first failure
    ClearAll { uid: String, item_ids: Vec<String> },
    Flush(oneshot::Sender<()>),
}

impl PersistJob {
    fn name(&self) -> &'static str {
        match self {
            PersistJob::SaveBlob { .. } => "save_blob",
            PersistJob::Upsert { .. } => "upsert",
            PersistJob::Delete { .. } => "delete",
            PersistJob::ClearAll { .. } => "clear_all",
            PersistJob::Flush(_) => "flush",
        }
    }
}

/// Handle to the background task that applies writes in submission order.
///
/// Callers never wait on a write; failures are logged and counted.
#[derive(Debug)]
pub(crate) struct PersistenceWriter {
    tx: mpsc::UnboundedSender<PersistJob>,
    failures: Arc<AtomicU64>,
}

struct WriterTask {
    local: Arc<dyn LocalBackend>,
    remote: Option<Arc<dyn RemoteBackend>>,
    retry: RetryPolicy,
    failures: Arc<AtomicU64>,
}

impl PersistenceWriter {
    /// Must be called from within a Tokio runtime
    pub(crate) fn spawn(
        local: Arc<dyn LocalBackend>,
        remote: Option<Arc<dyn RemoteBackend>>,
        retry: RetryPolicy,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));
        let task = WriterTask {
            local,
            remote,
            retry,
            failures: Arc::clone(&failures),
        };
        tokio::spawn(task.run(rx));
        Self { tx, failures }
    }

    pub(crate) fn enqueue(&self, job: PersistJob) {
        let name = job.name();
        if self.tx.send(job).is_err() {
            warn!(operation = name, "Persistence writer has stopped; dropping write");
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Resolves once every job enqueued before it has been attempted
    pub(crate) async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.enqueue(PersistJob::Flush(done_tx));
        let _ = done_rx.await;
    }

    pub(crate) fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl WriterTask {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<PersistJob>) {
        while let Some(job) = rx.recv().await {
            let name = job.name();
            if let Err(e) = self.apply(job).await {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(operation = name, error = %e, "Background write failed; in-memory state kept");
            }
        }
        debug!("Persistence writer stopped");
    }

    async fn apply(&self, job: PersistJob) -> Result<(), BackendError> {
        match job {
            PersistJob::SaveBlob { key, data } => {
                let local = Arc::clone(&self.local);
                self.retry
                    .run("save_blob", || {
                        let local = Arc::clone(&local);
                        let key = key.clone();
                        let data = data.clone();
                        async move { local.save(&key, &data).await }
                    })
                    .await
            }
            PersistJob::Upsert { uid, item_id, fields } => {
                let Some(remote) = self.remote.clone() else {
                    return Ok(());
                };
                self.retry
                    .run("upsert", || {
                        let remote = Arc::clone(&remote);
                        let (uid, item_id, fields) = (uid.clone(), item_id.clone(), fields.clone());
                        async move { remote.upsert(&uid, &item_id, fields).await }
                    })
                    .await
            }
            PersistJob::Delete { uid, item_id } => {
                let Some(remote) = self.remote.clone() else {
                    return Ok(());
                };
                self.delete_document(&remote, &uid, &item_id).await
            }
            PersistJob::ClearAll { uid, item_ids } => {
                let Some(remote) = self.remote.clone() else {
                    return Ok(());
                };
                let total = item_ids.len();
                for (removed, item_id) in item_ids.iter().enumerate() {
                    if let Err(e) = self.delete_document(&remote, &uid, item_id).await {
                        warn!(
                            operation = "clear_all",
                            identity = %uid,
                            removed,
                            remaining = total - removed,
                            "Clearing watch history stopped part-way"
                        );
                        return Err(e);
                    }
                }
                info!(operation = "clear_all", identity = %uid, removed = total, "Cleared watch history");
                Ok(())
            }
            PersistJob::Flush(done) => {
                let _ = done.send(());
                Ok(())
            }
        }
    }

    async fn delete_document(
        &self,
        remote: &Arc<dyn RemoteBackend>,
        uid: &str,
        item_id: &str,
    ) -> Result<(), BackendError> {
        self.retry
            .run("delete", || {
                let remote = Arc::clone(remote);
                let (uid, item_id) = (uid.to_string(), item_id.to_string());
                async move { remote.delete(&uid, &item_id).await }
            })
            .await
    }
}

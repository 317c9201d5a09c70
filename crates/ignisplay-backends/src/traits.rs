use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use ignisplay_models::{HistoryEntry, MediaKind, MovieRecord, PersistedData};
use serde::{Deserialize, Serialize};
use crate::error::BackendError;

/// Device-local key/value storage holding one serialized blob per identity key.
#[async_trait]
pub trait LocalBackend: Send + Sync {
    fn backend_name(&self) -> &str;

    /// `Ok(None)` when nothing has been stored under `key` yet
    async fn load(&self, key: &str) -> Result<Option<PersistedData>, BackendError>;
    async fn save(&self, key: &str, data: &PersistedData) -> Result<(), BackendError>;
}

/// Full ordered history for one identity, newest `watched_at` first.
/// Dropping the stream cancels the subscription.
pub type SnapshotStream = BoxStream<'static, Result<Vec<RemoteDocument>, BackendError>>;

/// Remote document store with one watch-history document per movie id.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    fn backend_name(&self) -> &str;

    /// Create or overwrite the document; the backend assigns `watched_at`
    async fn upsert(&self, uid: &str, item_id: &str, fields: DocumentFields) -> Result<(), BackendError>;

    /// Deleting a missing document succeeds
    async fn delete(&self, uid: &str, item_id: &str) -> Result<(), BackendError>;

    /// Live snapshots of the collection. The current snapshot is delivered
    /// first, then a new one after every change from any session.
    async fn subscribe(&self, uid: &str) -> Result<SnapshotStream, BackendError>;
}

/// Stored fields of a watch-history document. Progress is not synced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    pub title: String,
    pub poster_url: String,
    pub backdrop_url: Option<String>,
    pub description: Option<String>,
    pub year: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<MediaKind>,
}

impl From<&MovieRecord> for DocumentFields {
    fn from(movie: &MovieRecord) -> Self {
        Self {
            title: movie.title.clone(),
            poster_url: movie.poster_url.clone(),
            backdrop_url: movie.backdrop_url.clone(),
            description: movie.description.clone(),
            year: movie.year.clone(),
            rating: movie.rating.clone(),
            duration: movie.duration.clone(),
            kind: movie.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub id: String,
    #[serde(flatten)]
    pub fields: DocumentFields,
    pub watched_at: DateTime<Utc>,
}

impl RemoteDocument {
    pub fn into_history_entry(self) -> HistoryEntry {
        let movie = MovieRecord {
            id: self.id,
            title: self.fields.title,
            poster_url: self.fields.poster_url,
            backdrop_url: self.fields.backdrop_url,
            description: self.fields.description,
            year: self.fields.year,
            rating: self.fields.rating,
            duration: self.fields.duration,
            progress: None,
            kind: self.fields.kind,
        };
        HistoryEntry::new(movie, Some(self.watched_at))
    }
}

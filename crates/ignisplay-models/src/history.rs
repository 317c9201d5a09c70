use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::movie::MovieRecord;

/// One row of the watch history. Recency is the position in the history list;
/// `watched_at` is informational (client clock locally, server clock remotely).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub movie: MovieRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn new(movie: MovieRecord, watched_at: Option<DateTime<Utc>>) -> Self {
        Self { movie, watched_at }
    }

    pub fn id(&self) -> &str {
        &self.movie.id
    }
}

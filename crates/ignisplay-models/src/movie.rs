use serde::{Deserialize, Serialize};

/// A catalog item as handed to the store by browse/detail screens.
///
/// Records are never fetched by the store itself; it only copies them and
/// stamps a progress value or a watch timestamp on the copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub id: String, // Unique within a catalog
    pub title: String,
    pub poster_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Playback progress as a fraction in `0.0..=1.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MovieRecord {
    /// Minimal record with only the required fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>, poster_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            poster_url: poster_url.into(),
            backdrop_url: None,
            description: None,
            year: None,
            rating: None,
            duration: None,
            progress: None,
            kind: None,
        }
    }

    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = Some(clamp_progress(progress));
        self
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Clamp a progress value into `0.0..=1.0`. NaN collapses to zero.
pub fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

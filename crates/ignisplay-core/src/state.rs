use ignisplay_models::{HistoryEntry, Identity, MovieRecord, PersistedData, SubscriptionState};

/// Where the history of the current identity is kept in sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// History lives in the local blob, capped and updated immediately
    #[default]
    Local,
    /// History mirrors the remote collection through a live subscription
    Remote,
}

/// Everything the UI renders for one identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityState {
    pub identity: Identity,
    /// Bumped by every `load`; work started under an older epoch is discarded
    pub epoch: u64,
    pub mode: SyncMode,
    /// True until the first hydrate, snapshot, or listener error after `load`
    pub is_loading: bool,
    /// False while the local blob is being read; mutations are ignored until then
    pub hydrated: bool,
    pub history: Vec<HistoryEntry>,
    pub my_list: Vec<MovieRecord>,
    pub subscription: Option<SubscriptionState>,
}

impl ActivityState {
    pub fn is_saved(&self, movie_id: &str) -> bool {
        self.my_list.iter().any(|movie| movie.id == movie_id)
    }

    pub fn history_ids(&self) -> Vec<String> {
        self.history.iter().map(|entry| entry.movie.id.clone()).collect()
    }

    pub(crate) fn to_persisted(&self) -> PersistedData {
        PersistedData {
            history: self.history.clone(),
            my_list: self.my_list.clone(),
            subscription: self.subscription.clone(),
        }
    }
}

/// Drop repeated ids, keeping the first (most recent) occurrence
pub(crate) fn dedup_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> &str) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(id(item).to_string()));
}

use serde::{Deserialize, Serialize};
use crate::history::HistoryEntry;
use crate::movie::MovieRecord;
use crate::subscription::SubscriptionState;

/// The local blob stored under one identity key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedData {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub my_list: Vec<MovieRecord>,
    #[serde(default)]
    pub subscription: Option<SubscriptionState>,
}

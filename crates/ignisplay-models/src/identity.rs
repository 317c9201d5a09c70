use serde::{Deserialize, Serialize};
use std::fmt;

pub const GUEST_KEY: &str = "guest";

/// Who the store is tracking activity for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// No account is signed in
    #[default]
    Guest,
    /// Signed-in account, keyed by the identity provider's stable uid
    User(String),
}

impl Identity {
    /// Build an identity from an optional uid. Empty uids are treated as guest.
    pub fn from_uid(uid: Option<&str>) -> Self {
        match uid.map(str::trim) {
            Some(uid) if !uid.is_empty() => Identity::User(uid.to_string()),
            _ => Identity::Guest,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            Identity::Guest => None,
            Identity::User(uid) => Some(uid),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }

    /// Storage key for the local blob, e.g. `ignisplay:user-data:guest`
    pub fn storage_key(&self, namespace: &str) -> String {
        format!("{}:{}", namespace, self.uid().unwrap_or(GUEST_KEY))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uid().unwrap_or(GUEST_KEY))
    }
}

pub mod catalog;
pub mod history;
pub mod identity;
pub mod movie;
pub mod persisted;
pub mod resolution;
pub mod subscription;

pub use history::HistoryEntry;
pub use identity::Identity;
pub use movie::{MediaKind, MovieRecord};
pub use persisted::PersistedData;
pub use resolution::{ResolutionTier, FREE_RESOLUTION};
pub use subscription::{PlanId, SubscriptionPlan, SubscriptionState};

pub mod clock;
pub mod gate;
pub mod retry;
pub mod state;
pub mod store;
mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{check_playback, max_allowed_tier, PlaybackDecision};
pub use retry::RetryPolicy;
pub use state::{ActivityState, SyncMode};
pub use store::{StoreBuilder, StoreOptions, WatchActivityStore};

//! Playback entitlement derived from subscription state.
//!
//! Evaluated on every resolution request; nothing here is cached because the
//! answer changes as time passes.

use chrono::{DateTime, Utc};
use ignisplay_models::{ResolutionTier, SubscriptionState, FREE_RESOLUTION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackDecision {
    Allowed,
    /// No plan has ever been activated
    SubscriptionRequired,
    SubscriptionExpired { expired_at: DateTime<Utc> },
}

impl PlaybackDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PlaybackDecision::Allowed)
    }
}

pub fn check_playback(
    subscription: Option<&SubscriptionState>,
    tier: ResolutionTier,
    now: DateTime<Utc>,
) -> PlaybackDecision {
    if !tier.is_premium() {
        return PlaybackDecision::Allowed;
    }
    match subscription {
        None => PlaybackDecision::SubscriptionRequired,
        Some(sub) if sub.is_active_at(now) => PlaybackDecision::Allowed,
        Some(sub) => PlaybackDecision::SubscriptionExpired {
            expired_at: sub.active_until,
        },
    }
}

/// Highest tier `check_playback` would allow at `now`
pub fn max_allowed_tier(subscription: Option<&SubscriptionState>, now: DateTime<Utc>) -> ResolutionTier {
    ResolutionTier::ALL
        .into_iter()
        .rev()
        .find(|tier| check_playback(subscription, *tier, now).is_allowed())
        .unwrap_or(FREE_RESOLUTION)
}

use super::open_store;
use crate::output::Output;
use crate::PlaybackCommands;
use chrono::Utc;
use color_eyre::Result;
use ignisplay_config::Config;
use ignisplay_core::{max_allowed_tier, PlaybackDecision};
use ignisplay_models::ResolutionTier;
use serde_json::json;

pub async fn run_playback(cmd: PlaybackCommands, config: &Config, user: Option<&str>, output: &Output) -> Result<()> {
    match cmd {
        PlaybackCommands::Check { tier } => {
            let tier: ResolutionTier = tier.parse().map_err(|e: String| color_eyre::eyre::eyre!(e))?;
            let store = open_store(config, user).await?;
            let decision = store.check_playback(tier);
            let best = max_allowed_tier(store.subscription().as_ref(), Utc::now());

            output.json(&json!({
                "tier": tier,
                "allowed": decision.is_allowed(),
                "reason": reason(&decision),
                "maxAllowed": best,
            }));

            match decision {
                PlaybackDecision::Allowed => output.success(format!("{} playback allowed", tier)),
                PlaybackDecision::SubscriptionRequired => {
                    output.warn(format!("{} needs a subscription; up to {} is free", tier, best))
                }
                PlaybackDecision::SubscriptionExpired { expired_at } => output.warn(format!(
                    "{} needs a subscription; the last plan ended {}",
                    tier,
                    expired_at.format("%Y-%m-%d %H:%M UTC")
                )),
            }
            Ok(())
        }
    }
}

fn reason(decision: &PlaybackDecision) -> &'static str {
    match decision {
        PlaybackDecision::Allowed => "allowed",
        PlaybackDecision::SubscriptionRequired => "subscription_required",
        PlaybackDecision::SubscriptionExpired { .. } => "subscription_expired",
    }
}

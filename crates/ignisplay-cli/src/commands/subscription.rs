use super::{finish, open_store};
use crate::output::Output;
use crate::SubscriptionCommands;
use chrono::Utc;
use color_eyre::Result;
use ignisplay_config::Config;
use ignisplay_models::{PlanId, SubscriptionPlan};
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run_subscription(
    cmd: SubscriptionCommands,
    config: &Config,
    user: Option<&str>,
    output: &Output,
) -> Result<()> {
    match cmd {
        SubscriptionCommands::Plans => {
            show_plans(output);
            Ok(())
        }
        SubscriptionCommands::Show => {
            let store = open_store(config, user).await?;
            match store.subscription() {
                None => {
                    output.json(&json!({ "subscription": null }));
                    output.info("No plan recorded; playback is limited to 480p");
                }
                Some(sub) => {
                    let active = sub.is_active_at(Utc::now());
                    output.json(&json!({ "subscription": sub, "active": active }));
                    if output.is_human() {
                        let status = if active { "active".green().to_string() } else { "expired".red().to_string() };
                        output.info(format!(
                            "{} ({}) until {}",
                            sub.plan.name,
                            status,
                            sub.active_until.format("%Y-%m-%d %H:%M UTC")
                        ));
                    }
                }
            }
            Ok(())
        }
        SubscriptionCommands::Activate { plan_id } => {
            let id: PlanId = plan_id.parse().map_err(|e: String| color_eyre::eyre::eyre!(e))?;
            let plan = SubscriptionPlan::find(id)
                .ok_or_else(|| color_eyre::eyre::eyre!("Plan {} is not offered", id))?;

            let store = open_store(config, user).await?;
            let activated = store
                .activate_subscription(plan)
                .ok_or_else(|| color_eyre::eyre::eyre!("Profile could not be loaded; plan not recorded"))?;
            finish(&store, output).await;

            output.json(&json!({ "subscription": activated }));
            output.success(format!(
                "{} active until {}",
                activated.plan.name,
                activated.active_until.format("%Y-%m-%d %H:%M UTC")
            ));
            Ok(())
        }
        SubscriptionCommands::Cancel => {
            let store = open_store(config, user).await?;
            if store.subscription().is_none() {
                output.info("No plan recorded");
                return Ok(());
            }
            store.cancel_subscription();
            finish(&store, output).await;
            output.json(&json!({ "subscription": null }));
            output.success("Subscription removed; playback is limited to 480p");
            Ok(())
        }
    }
}

fn show_plans(output: &Output) {
    let plans = SubscriptionPlan::catalog();
    if !output.is_human() {
        output.json(&json!({ "plans": plans }));
        return;
    }

    let rows = plans
        .iter()
        .map(|plan| {
            vec![
                plan.id.to_string(),
                plan.name.clone(),
                plan.months.to_string(),
                format!("${:.2}", plan.price),
            ]
        })
        .collect();
    output.table(&["Plan", "Name", "Months", "Price"], rows);
}

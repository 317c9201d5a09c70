use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlanId {
    #[serde(rename = "basic-3")]
    Basic3,
    #[serde(rename = "standard-6")]
    Standard6,
    #[serde(rename = "premium-9")]
    Premium9,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Basic3 => "basic-3",
            PlanId::Standard6 => "standard-6",
            PlanId::Premium9 => "premium-9",
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic-3" => Ok(PlanId::Basic3),
            "standard-6" => Ok(PlanId::Standard6),
            "premium-9" => Ok(PlanId::Premium9),
            other => Err(format!(
                "Unknown plan: {}. Use 'basic-3', 'standard-6', or 'premium-9'",
                other
            )),
        }
    }
}

/// A purchasable plan as reported by the payment flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub name: String, // Human-readable, e.g. "3 Months"
    pub months: u32,
    pub price: f64,
}

impl SubscriptionPlan {
    /// Plans offered on the payment screen
    pub fn catalog() -> Vec<SubscriptionPlan> {
        vec![
            SubscriptionPlan { id: PlanId::Basic3, name: "3 Months".to_string(), months: 3, price: 14.99 },
            SubscriptionPlan { id: PlanId::Standard6, name: "6 Months".to_string(), months: 6, price: 26.99 },
            SubscriptionPlan { id: PlanId::Premium9, name: "9 Months".to_string(), months: 9, price: 35.99 },
        ]
    }

    pub fn find(id: PlanId) -> Option<SubscriptionPlan> {
        Self::catalog().into_iter().find(|plan| plan.id == id)
    }
}

/// An activated plan. `active_until` is fixed at activation and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    #[serde(flatten)]
    pub plan: SubscriptionPlan,
    pub active_until: DateTime<Utc>,
}

impl SubscriptionState {
    /// Activate `plan` at `now`: expiry is `now` plus the plan's month count
    /// (calendar months, clamped to the end of shorter months).
    ///
    /// The mobile client overflows month-end dates instead, so an Aug 31
    /// activation of a 6-month plan expires Mar 3 there but Feb 28 here.
    /// Month-end activations can therefore end up to three days earlier
    /// than the same plan recorded by the app.
    pub fn activate(plan: SubscriptionPlan, now: DateTime<Utc>) -> Self {
        let active_until = now
            .checked_add_months(Months::new(plan.months))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { plan, active_until }
    }

    /// True strictly before `active_until`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.active_until
    }
}

use chrono::{DateTime, Utc};

use crate::domain::accounts::user::SchoolProfile;
use crate::domain::subscriptions::plan::{Plan, SubscriptionState};

#[derive(Debug, Clone)]
pub struct SubscriptionSummary {
    pub state: SubscriptionState,
    pub plan: Option<&'static Plan>,
    pub days_remaining: Option<i64>,
}

/// The school's stored billing state joined with the plan catalog.
pub fn subscription_summary(school: &SchoolProfile, now: DateTime<Utc>) -> SubscriptionSummary {
    let state = school.subscription.clone();
    SubscriptionSummary {
        plan: state.plan(),
        days_remaining: state.days_remaining(now).map(|d| d.max(0)),
        state,
    }
}

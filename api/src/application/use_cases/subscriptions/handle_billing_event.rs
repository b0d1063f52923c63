use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::application::errors::AppResult;
use crate::application::ports::profile_repository::{ProfileRepository, SubscriptionUpdate};
use crate::application::services::email::EmailTemplate;
use crate::application::services::notifications::Notifications;
use crate::application::use_cases::subscriptions::billing_event::{
    BillingEvent, SubscriptionSnapshot,
};
use crate::domain::activity::{ActivityAction, ActivityEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingOutcome {
    Applied,
    Ignored,
}

struct Change {
    update: SubscriptionUpdate,
    action: ActivityAction,
    email: Option<(String, String)>,
}

fn snapshot_update(s: &SubscriptionSnapshot) -> SubscriptionUpdate {
    SubscriptionUpdate {
        subscription_id: Some(s.id.clone()),
        status: Some(s.status.clone()),
        plan_name: s.plan_name.clone(),
        current_period_end: s.current_period_end,
        cancel_at_period_end: Some(s.cancel_at_period_end),
        subscription_end_date: None,
    }
}

/// Applies a verified billing webhook to the school that owns the customer.
pub struct HandleBillingEvent<'a, P: ProfileRepository + ?Sized> {
    pub profiles: &'a P,
    pub notifications: &'a Notifications,
}

impl<'a, P: ProfileRepository + ?Sized> HandleBillingEvent<'a, P> {
    pub async fn execute(&self, event: BillingEvent, now: DateTime<Utc>) -> AppResult<BillingOutcome> {
        let Some(customer_id) = event.customer_id().map(str::to_string) else {
            info!(?event, "billing_event_ignored");
            return Ok(BillingOutcome::Ignored);
        };
        let Some(school) = self.profiles.school_by_customer(&customer_id).await? else {
            warn!(customer_id = %customer_id, "billing_customer_unknown");
            return Ok(BillingOutcome::Ignored);
        };
        let plan_label = |s: &SubscriptionSnapshot| {
            s.plan_name
                .clone()
                .or_else(|| school.subscription.plan_name.clone())
                .unwrap_or_else(|| "Subscription".to_string())
        };

        let change = match &event {
            BillingEvent::SubscriptionCreated(s) => Change {
                update: snapshot_update(s),
                action: ActivityAction::SubscriptionCreated,
                email: Some(("activated".into(), plan_label(s))),
            },
            BillingEvent::SubscriptionUpdated(s) => {
                let action = if s.cancel_at_period_end {
                    "scheduled for cancellation"
                } else {
                    "updated"
                };
                Change {
                    update: snapshot_update(s),
                    action: ActivityAction::SubscriptionUpdated,
                    email: Some((action.into(), plan_label(s))),
                }
            }
            BillingEvent::SubscriptionDeleted(_) => Change {
                update: SubscriptionUpdate {
                    status: Some("cancelled".into()),
                    subscription_end_date: Some(now),
                    ..Default::default()
                },
                action: ActivityAction::SubscriptionCancelled,
                email: Some(("cancelled".into(), "Cancelled".into())),
            },
            BillingEvent::PaymentFailed { .. } => Change {
                update: SubscriptionUpdate {
                    status: Some("past_due".into()),
                    ..Default::default()
                },
                action: ActivityAction::SubscriptionPaymentFailed,
                email: Some((
                    "payment failed".into(),
                    school
                        .subscription
                        .plan_name
                        .clone()
                        .unwrap_or_else(|| "Subscription".into()),
                )),
            },
            BillingEvent::PaymentSucceeded { .. } => Change {
                update: SubscriptionUpdate {
                    status: Some("active".into()),
                    ..Default::default()
                },
                action: ActivityAction::SubscriptionPaymentSucceeded,
                email: None,
            },
            BillingEvent::Unhandled(_) => return Ok(BillingOutcome::Ignored),
        };

        self.profiles
            .update_subscription(school.id, &change.update)
            .await?;
        info!(school_id = %school.id, action = change.action.as_str(), "subscription_state_updated");
        self.notifications
            .record(ActivityEntry::new(
                Some(school.user_id),
                change.action,
                json!({
                    "customerId": customer_id,
                    "status": change.update.status,
                    "subscriptionId": change.update.subscription_id,
                }),
            ))
            .await;
        if let Some((action, plan_name)) = change.email {
            self.notifications
                .email(
                    school.notification_email(),
                    EmailTemplate::SubscriptionChanged {
                        school_name: school.name.clone(),
                        action,
                        plan_name,
                    },
                    Some(school.user_id),
                )
                .await;
        }
        Ok(BillingOutcome::Applied)
    }
}

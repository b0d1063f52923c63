use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub tier: PlanTier,
    pub name: &'static str,
    pub price_monthly: u32,
    pub price_annual: u32,
    /// `None` means unlimited postings.
    pub job_limit: Option<u32>,
    pub features: &'static [&'static str],
}

impl Plan {
    pub fn job_limit_label(&self) -> String {
        match self.job_limit {
            Some(n) => format!("{n} job postings per month"),
            None => "Unlimited job postings".to_string(),
        }
    }
}

pub static PLANS: [Plan; 3] = [
    Plan {
        tier: PlanTier::Basic,
        name: "Basic",
        price_monthly: 49,
        price_annual: 519,
        job_limit: Some(5),
        features: &[
            "5 job postings per month",
            "Standard listings",
            "Email support",
            "Basic analytics",
        ],
    },
    Plan {
        tier: PlanTier::Standard,
        name: "Standard",
        price_monthly: 109,
        price_annual: 1086,
        job_limit: Some(25),
        features: &[
            "25 job postings per month",
            "Premium listings with highlighting",
            "Priority support",
            "Email promotion to teacher network",
            "Advanced analytics",
            "Featured school badge",
        ],
    },
    Plan {
        tier: PlanTier::Premium,
        name: "Premium",
        price_monthly: 199,
        price_annual: 1982,
        job_limit: None,
        features: &[
            "Unlimited job postings",
            "AI-powered teacher matching",
            "Automated email campaigns",
            "Priority listing placement",
            "Dedicated account manager",
            "Custom branding",
            "API access",
        ],
    },
];

/// Looks a plan up by display name or tier key, ignoring case and a trailing "plan".
pub fn find_plan(name: &str) -> Option<&'static Plan> {
    let key = name.trim().to_ascii_lowercase();
    let key = key.trim_end_matches(" plan").trim();
    PLANS.iter().find(|p| p.name.eq_ignore_ascii_case(key))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Cancelled,
    #[default]
    None,
    Other(String),
}

impl SubscriptionStatus {
    pub fn parse(s: Option<&str>) -> Self {
        let Some(raw) = s.map(|v| v.trim().to_ascii_lowercase()) else {
            return SubscriptionStatus::None;
        };
        match raw.as_str() {
            "" => SubscriptionStatus::None,
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Other(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Other(s) => s.as_str(),
        }
    }

    /// Whether a school in this state may publish a job. Drafts are always allowed
    /// except for the two explicit lapsed states.
    pub fn posting_gate(&self, is_draft: bool) -> Result<(), PostingDenied> {
        match self {
            SubscriptionStatus::Cancelled => Err(PostingDenied::Expired),
            SubscriptionStatus::PastDue => Err(PostingDenied::PastDue),
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => Ok(()),
            _ if is_draft => Ok(()),
            _ => Err(PostingDenied::Inactive),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingDenied {
    Expired,
    PastDue,
    Inactive,
}

impl PostingDenied {
    pub fn message(&self) -> &'static str {
        match self {
            PostingDenied::Expired => {
                "Subscription expired: your subscription has expired. Please renew your subscription to post new jobs."
            }
            PostingDenied::PastDue => {
                "Subscription past due: please update your payment method to continue posting jobs."
            }
            PostingDenied::Inactive => {
                "Active subscription required: an active subscription is required to post jobs."
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionState {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub plan_name: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    pub fn plan(&self) -> Option<&'static Plan> {
        self.plan_name.as_deref().and_then(find_plan)
    }

    /// Whole days until the current period ends, rounded up; `None` without a period.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.current_period_end.map(|end| {
            let secs = (end - now).num_seconds();
            (secs + 86_399).div_euclid(86_400)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn gate_blocks_lapsed_states_even_for_drafts() {
        assert_eq!(
            SubscriptionStatus::Cancelled.posting_gate(true),
            Err(PostingDenied::Expired)
        );
        assert_eq!(
            SubscriptionStatus::PastDue.posting_gate(true),
            Err(PostingDenied::PastDue)
        );
    }

    #[test]
    fn gate_allows_drafts_without_subscription() {
        assert!(SubscriptionStatus::None.posting_gate(true).is_ok());
        assert_eq!(
            SubscriptionStatus::None.posting_gate(false),
            Err(PostingDenied::Inactive)
        );
        assert!(SubscriptionStatus::Active.posting_gate(false).is_ok());
    }

    #[test]
    fn status_parse_accepts_both_spellings() {
        assert_eq!(
            SubscriptionStatus::parse(Some("canceled")),
            SubscriptionStatus::Cancelled
        );
        assert_eq!(SubscriptionStatus::parse(None), SubscriptionStatus::None);
        assert_eq!(
            SubscriptionStatus::parse(Some("incomplete")),
            SubscriptionStatus::Other("incomplete".into())
        );
    }

    #[test]
    fn plan_lookup_ignores_case_and_suffix() {
        assert_eq!(find_plan("premium plan").map(|p| p.tier), Some(PlanTier::Premium));
        assert_eq!(find_plan("Basic").and_then(|p| p.job_limit), Some(5));
        assert!(find_plan("gold").is_none());
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = Utc::now();
        let state = SubscriptionState {
            current_period_end: Some(now + Duration::hours(25)),
            ..Default::default()
        };
        assert_eq!(state.days_remaining(now), Some(2));
    }
}

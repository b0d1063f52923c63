use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Subscription fields carried by `customer.subscription.*` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub plan_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    SubscriptionCreated(SubscriptionSnapshot),
    SubscriptionUpdated(SubscriptionSnapshot),
    SubscriptionDeleted(SubscriptionSnapshot),
    PaymentFailed { customer_id: String },
    PaymentSucceeded { customer_id: String },
    Unhandled(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct RawSubscription {
    id: String,
    customer: String,
    status: String,
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
    #[serde(default)]
    items: Option<RawItems>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawItems {
    data: Vec<RawItem>,
}

#[derive(Deserialize)]
struct RawItem {
    price: Option<RawPrice>,
}

#[derive(Deserialize)]
struct RawPrice {
    nickname: Option<String>,
}

#[derive(Deserialize)]
struct RawInvoice {
    customer: String,
}

impl RawSubscription {
    fn into_snapshot(self) -> SubscriptionSnapshot {
        let from_metadata = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("planName"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let from_price = self
            .items
            .and_then(|i| i.data.into_iter().next())
            .and_then(|i| i.price)
            .and_then(|p| p.nickname);
        SubscriptionSnapshot {
            id: self.id,
            customer_id: self.customer,
            status: self.status,
            current_period_end: self
                .current_period_end
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            cancel_at_period_end: self.cancel_at_period_end,
            plan_name: from_metadata.or(from_price),
        }
    }
}

impl BillingEvent {
    /// Parses a provider webhook payload. Event types that are not handled are
    /// returned as `Unhandled` rather than rejected.
    pub fn parse(body: &[u8]) -> anyhow::Result<Self> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        let object = envelope.data.object;
        let subscription = |o: serde_json::Value| -> anyhow::Result<SubscriptionSnapshot> {
            Ok(serde_json::from_value::<RawSubscription>(o)?.into_snapshot())
        };
        let invoice_customer = |o: serde_json::Value| -> anyhow::Result<String> {
            Ok(serde_json::from_value::<RawInvoice>(o)?.customer)
        };
        Ok(match envelope.kind.as_str() {
            "customer.subscription.created" => Self::SubscriptionCreated(subscription(object)?),
            "customer.subscription.updated" => Self::SubscriptionUpdated(subscription(object)?),
            "customer.subscription.deleted" => Self::SubscriptionDeleted(subscription(object)?),
            "invoice.payment_failed" => Self::PaymentFailed {
                customer_id: invoice_customer(object)?,
            },
            "invoice.payment_succeeded" => Self::PaymentSucceeded {
                customer_id: invoice_customer(object)?,
            },
            _ => Self::Unhandled(envelope.kind),
        })
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Self::SubscriptionCreated(s)
            | Self::SubscriptionUpdated(s)
            | Self::SubscriptionDeleted(s) => Some(&s.customer_id),
            Self::PaymentFailed { customer_id } | Self::PaymentSucceeded { customer_id } => {
                Some(customer_id)
            }
            Self::Unhandled(_) => None,
        }
    }
}

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::application::errors::{AppError, AppResult};
use crate::application::use_cases::subscriptions::billing_event::BillingEvent;
use crate::application::use_cases::subscriptions::handle_billing_event::{
    BillingOutcome, HandleBillingEvent,
};
use crate::bootstrap::app_context::AppContext;
use crate::infrastructure::crypto::verify_billing_signature;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub applied: bool,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/webhooks/billing", post(billing_webhook))
        .with_state(ctx)
}

#[utoipa::path(post, path = "/api/webhooks/billing", tag = "Subscriptions", security(()),
    request_body(content = String, content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, body = WebhookAck),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn billing_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let Some(secret) = ctx.cfg.billing_webhook_secret.as_deref() else {
        warn!("billing_webhook_secret_missing");
        return Err(AppError::validation("Webhook secret not configured"));
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let now = Utc::now();
    if let Err(e) = verify_billing_signature(secret, signature, &body, now) {
        warn!(error = %e, "billing_webhook_rejected");
        return Err(AppError::validation(format!("Webhook Error: {e}")));
    }
    let event = BillingEvent::parse(&body)
        .map_err(|e| AppError::validation(format!("Webhook Error: {e}")))?;

    let profiles = ctx.profile_repo();
    let uc = HandleBillingEvent {
        profiles: profiles.as_ref(),
        notifications: ctx.notifications(),
    };
    let outcome = uc.execute(event, now).await?;
    Ok(Json(WebhookAck {
        received: true,
        applied: outcome == BillingOutcome::Applied,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::subscriptions::plan::SubscriptionStatus;
    use crate::infrastructure::crypto::billing_signature;
    use crate::presentation::http::test_util::read_json;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;

    fn signed(body: &str, secret: &str, ts: i64) -> Request<Body> {
        let sig = billing_signature(secret, ts, body.as_bytes()).unwrap();
        Request::builder()
            .method("POST")
            .uri("/webhooks/billing")
            .header(header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, format!("t={ts},v1={sig}"))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn past_due_event(customer: &str) -> String {
        json!({
            "type": "invoice.payment_failed",
            "data": { "object": { "customer": customer } }
        })
        .to_string()
    }

    #[tokio::test]
    async fn signed_event_updates_school() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let school = fx.add_school();
        fx.store
            .update_school(school.id, |s| s.subscription.customer_id = Some("cus_1".into()));
        let res = routes(ctx)
            .oneshot(signed(&past_due_event("cus_1"), "whsec_test", Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = read_json(res).await;
        assert_eq!(v["received"], true);
        assert_eq!(v["applied"], true);
        assert_eq!(
            fx.store.school(school.id).unwrap().subscription.status,
            SubscriptionStatus::PastDue
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let res = routes(ctx)
            .oneshot(signed(&past_due_event("cus_1"), "whsec_other", Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stale_signature_is_rejected() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let res = routes(ctx)
            .oneshot(signed(
                &past_due_event("cus_1"),
                "whsec_test",
                Utc::now().timestamp() - 3600,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_events_are_acknowledged() {
        let fx = Fixture::new();
        let ctx = AppContext::from_fixture(&fx);
        let body = json!({ "type": "charge.refunded", "data": { "object": {} } }).to_string();
        let res = routes(ctx)
            .oneshot(signed(&body, "whsec_test", Utc::now().timestamp()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_json(res).await["applied"], false);
    }
}

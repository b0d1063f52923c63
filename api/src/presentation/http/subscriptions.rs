use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::access::require_school;
use crate::application::errors::AppResult;
use crate::application::use_cases::subscriptions::subscription_details::subscription_summary;
use crate::bootstrap::app_context::AppContext;
use crate::domain::subscriptions::plan::{PLANS, Plan};
use crate::presentation::http::auth::AuthUser;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    /// `basic`, `standard` or `premium`
    pub id: String,
    pub name: String,
    pub price_monthly: u32,
    pub price_annual: u32,
    /// Absent for unlimited postings.
    pub job_limit: Option<u32>,
    pub job_limit_label: String,
    pub features: Vec<String>,
}

impl From<&Plan> for PlanResponse {
    fn from(p: &Plan) -> Self {
        Self {
            id: p.name.to_ascii_lowercase(),
            name: p.name.to_string(),
            price_monthly: p.price_monthly,
            price_annual: p.price_annual,
            job_limit: p.job_limit,
            job_limit_label: p.job_limit_label(),
            features: p.features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanListResponse {
    pub plans: Vec<PlanResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetailsResponse {
    pub subscription_id: Option<String>,
    pub subscription_status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub plan: Option<PlanResponse>,
    pub days_remaining: Option<i64>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/subscriptions/plans", get(list_plans))
        .route("/subscription-details", get(subscription_details))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/subscriptions/plans", tag = "Subscriptions", security(()), responses(
    (status = 200, body = PlanListResponse)
))]
pub async fn list_plans() -> Json<PlanListResponse> {
    Json(PlanListResponse {
        plans: PLANS.iter().map(PlanResponse::from).collect(),
    })
}

#[utoipa::path(get, path = "/api/subscription-details", tag = "Subscriptions", responses(
    (status = 200, body = SubscriptionDetailsResponse),
    (status = 403, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn subscription_details(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<SubscriptionDetailsResponse>> {
    let profiles = ctx.profile_repo();
    let school = require_school(
        profiles.as_ref(),
        &actor,
        "Only schools can view subscription details",
    )
    .await?;
    let summary = subscription_summary(&school, Utc::now());
    let state = summary.state;
    Ok(Json(SubscriptionDetailsResponse {
        subscription_status: state.status.as_str().to_string(),
        subscription_id: state.subscription_id,
        current_period_end: state.current_period_end,
        cancel_at_period_end: state.cancel_at_period_end,
        subscription_end_date: state.subscription_end_date,
        plan: summary.plan.map(PlanResponse::from),
        days_remaining: summary.days_remaining,
    }))
}

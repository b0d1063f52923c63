use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResp {
    /// `ok` or `degraded`
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// `connected` or `unreachable`
    pub database: &'static str,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct HealthState {
    pub pool: PgPool,
    pub warnings: Arc<Vec<String>>,
}

pub fn report(db_ok: bool, warnings: Vec<String>, now: DateTime<Utc>) -> HealthResp {
    HealthResp {
        status: if db_ok { "ok" } else { "degraded" },
        timestamp: now,
        database: if db_ok { "connected" } else { "unreachable" },
        warnings,
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    security(()),
    responses((status = 200, body = HealthResp))
)]
pub async fn health(State(state): State<HealthState>) -> Json<HealthResp> {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    Json(report(db_ok, state.warnings.as_ref().clone(), Utc::now()))
}

pub fn routes(pool: PgPool, warnings: Vec<String>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState {
        pool,
        warnings: Arc::new(warnings),
    })
}

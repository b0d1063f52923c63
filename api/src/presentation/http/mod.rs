use axum::Router;

use crate::bootstrap::app_context::AppContext;

pub mod applications;
pub mod auth;
pub mod error;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod messages;
pub mod profiles;
pub mod saved_jobs;
pub mod subscriptions;
pub mod uploads;
pub mod webhooks;

#[cfg(test)]
pub mod test_util;

/// Every authenticated and public area, to be nested under `/api`.
pub fn api_routes(ctx: AppContext) -> Router {
    Router::new()
        .nest("/auth", auth::routes(ctx.clone()))
        .merge(jobs::routes(ctx.clone()))
        .merge(applications::routes(ctx.clone()))
        .merge(messages::routes(ctx.clone()))
        .merge(profiles::routes(ctx.clone()))
        .merge(saved_jobs::routes(ctx.clone()))
        .merge(uploads::routes(ctx.clone()))
        .merge(subscriptions::routes(ctx.clone()))
        .merge(webhooks::routes(ctx))
}

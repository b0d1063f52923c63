use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ntca_api::application::ports::blob_storage::BlobStorage;
use ntca_api::bootstrap::app_context::{AppContext, AppServices};
use ntca_api::bootstrap::config::{Config, StorageBackend};
use ntca_api::infrastructure::db::repositories::activity_log_sqlx::SqlxActivityLog;
use ntca_api::infrastructure::db::repositories::application_repository_sqlx::SqlxApplicationRepository;
use ntca_api::infrastructure::db::repositories::job_repository_sqlx::SqlxJobRepository;
use ntca_api::infrastructure::db::repositories::messaging_repository_sqlx::SqlxMessagingRepository;
use ntca_api::infrastructure::db::repositories::profile_repository_sqlx::SqlxProfileRepository;
use ntca_api::infrastructure::db::repositories::user_repository_sqlx::SqlxUserRepository;
use ntca_api::infrastructure::db::resilience::RetryPolicy;
use ntca_api::infrastructure::email::mailer_from_config;
use ntca_api::infrastructure::storage::{FsBlobStorage, S3BlobStorage};
use ntca_api::presentation::http as handlers;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            handlers::auth::register,
            handlers::auth::login,
            handlers::auth::validate,
            handlers::auth::forgot_password,
            handlers::auth::reset_password,
            handlers::jobs::list_jobs,
            handlers::jobs::public_jobs,
            handlers::jobs::get_job,
            handlers::jobs::create_job,
            handlers::jobs::update_job,
            handlers::jobs::update_job_status,
            handlers::jobs::delete_job,
            handlers::jobs::job_applications,
            handlers::saved_jobs::list_saved_jobs,
            handlers::saved_jobs::save_job,
            handlers::saved_jobs::unsave_job,
            handlers::profiles::get_teacher_profile,
            handlers::profiles::update_teacher_profile,
            handlers::profiles::get_school_profile,
            handlers::profiles::update_school_profile,
            handlers::applications::list_applications,
            handlers::applications::submit_application,
            handlers::applications::submit_guest_application,
            handlers::applications::update_application_status,
            handlers::applications::list_notes,
            handlers::applications::add_note,
            handlers::messages::list_conversations,
            handlers::messages::start_conversation,
            handlers::messages::get_conversation,
            handlers::messages::send_message,
            handlers::messages::mark_read,
            handlers::uploads::upload_file,
            handlers::subscriptions::list_plans,
            handlers::subscriptions::subscription_details,
            handlers::webhooks::billing_webhook,
            handlers::health::health,
        ),
        components(schemas(
            handlers::error::ErrorBody,
            handlers::auth::RegisterRequest,
            handlers::auth::RegisterResponse,
            handlers::auth::LoginRequest,
            handlers::auth::LoginResponse,
            handlers::auth::UserResponse,
            handlers::auth::ValidateResponse,
            handlers::auth::ForgotPasswordRequest,
            handlers::auth::ResetPasswordRequest,
            handlers::auth::MessageResponse,
            handlers::jobs::JobResponse,
            handlers::jobs::SchoolSummary,
            handlers::jobs::JobListResponse,
            handlers::jobs::JobEnvelope,
            handlers::jobs::JobChangedResponse,
            handlers::jobs::JobDeletedResponse,
            handlers::jobs::Pagination,
            handlers::jobs::PublicJobsResponse,
            handlers::jobs::CreateJobRequest,
            handlers::jobs::UpdateJobRequest,
            handlers::jobs::UpdateJobStatusRequest,
            handlers::jobs::ApplicationStats,
            handlers::jobs::JobApplicationsResponse,
            handlers::saved_jobs::SavedJobResponse,
            handlers::saved_jobs::SavedJobListResponse,
            handlers::saved_jobs::SaveJobRequest,
            handlers::saved_jobs::SavedJobCreated,
            handlers::saved_jobs::SavedJobRemoved,
            handlers::profiles::TeacherProfileResponse,
            handlers::profiles::TeacherProfileEnvelope,
            handlers::profiles::TeacherProfileUpdated,
            handlers::profiles::UpdateTeacherProfileRequest,
            handlers::profiles::SchoolProfileResponse,
            handlers::profiles::SchoolProfileEnvelope,
            handlers::profiles::SchoolProfileUpdated,
            handlers::profiles::UpdateSchoolProfileRequest,
            handlers::applications::GuestResponse,
            handlers::applications::NoteResponse,
            handlers::applications::ApplicationResponse,
            handlers::applications::ApplicationListResponse,
            handlers::applications::SubmittedResponse,
            handlers::applications::SubmitApplicationMultipart,
            handlers::applications::GuestApplicationMultipart,
            handlers::applications::UpdateStatusRequest,
            handlers::applications::ApplicationChangedResponse,
            handlers::applications::NoteListResponse,
            handlers::applications::AddNoteRequest,
            handlers::applications::NoteAddedResponse,
            handlers::messages::MessageResponse,
            handlers::messages::OtherParty,
            handlers::messages::ConversationSummary,
            handlers::messages::ConversationListResponse,
            handlers::messages::StartConversationRequest,
            handlers::messages::StartedResponse,
            handlers::messages::ConversationHeader,
            handlers::messages::ThreadResponse,
            handlers::messages::SendMessageRequest,
            handlers::messages::SentResponse,
            handlers::messages::MarkReadResponse,
            handlers::uploads::UploadMultipart,
            handlers::uploads::UploadResponse,
            handlers::subscriptions::PlanResponse,
            handlers::subscriptions::PlanListResponse,
            handlers::subscriptions::SubscriptionDetailsResponse,
            handlers::webhooks::WebhookAck,
            handlers::health::HealthResp,
        )),
        tags(
            (name = "Auth", description = "Registration, login and password reset"),
            (name = "Jobs", description = "Job postings"),
            (name = "Profiles", description = "Teacher and school profiles"),
            (name = "Applications", description = "Job applications and reviewer notes"),
            (name = "Messages", description = "School and teacher conversations"),
            (name = "Uploads", description = "Profile documents and images"),
            (name = "Subscriptions", description = "Plans, billing state and billing webhooks"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

fn cors_layer(cfg: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::PATCH,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);
    match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin).allow_credentials(true),
        // Production refuses to start without FRONTEND_URL; this only denies everything.
        _ if cfg.is_production => {
            base.allow_origin(AllowOrigin::exact(HeaderValue::from_static("http://invalid")))
        }
        _ => base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = ?e, "shutdown_signal_failed");
    }
    info!("shutdown_requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ntca_api=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(
        port = cfg.api_port,
        storage = ?cfg.storage_backend,
        production = cfg.is_production,
        "Starting NTCA backend"
    );
    for w in cfg.warnings() {
        warn!(warning = %w, "config_warning");
    }

    // Database
    let pool = ntca_api::infrastructure::db::connect_pool(&cfg).await?;
    ntca_api::infrastructure::db::migrate(&pool).await?;
    let retry = RetryPolicy::from(&cfg.db_retry);

    let public_base = cfg
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}", cfg.api_port));
    let blob_storage: Arc<dyn BlobStorage> = match cfg.storage_backend {
        StorageBackend::Filesystem => {
            if let Err(e) = tokio::fs::create_dir_all(&cfg.storage_root).await {
                warn!(error = ?e, dir = %cfg.storage_root, "Failed to create uploads dir");
            }
            Arc::new(FsBlobStorage::new(
                &cfg.storage_root,
                format!("{public_base}/uploads"),
            ))
        }
        StorageBackend::S3 => Arc::new(S3BlobStorage::new(&cfg).await?),
    };

    let services = AppServices::new(
        &cfg,
        Arc::new(SqlxUserRepository::new(pool.clone(), retry.clone())),
        Arc::new(SqlxProfileRepository::new(pool.clone(), retry.clone())),
        Arc::new(SqlxJobRepository::new(pool.clone(), retry.clone())),
        Arc::new(SqlxApplicationRepository::new(pool.clone(), retry.clone())),
        Arc::new(SqlxMessagingRepository::new(pool.clone(), retry.clone())),
        blob_storage,
        mailer_from_config(&cfg),
        Arc::new(SqlxActivityLog::new(pool.clone(), retry)),
    );
    let ctx = AppContext::new(cfg.clone(), services);

    let mut app = Router::new()
        .nest("/api", handlers::health::routes(pool.clone(), cfg.warnings()))
        .nest("/api", handlers::api_routes(ctx.clone()))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()));
    if cfg.storage_backend == StorageBackend::Filesystem {
        app = app.nest_service("/uploads", ServeDir::new(&cfg.storage_root));
    }
    let app = app
        .layer(cors_layer(&cfg))
        // Multipart framing on top of the largest accepted file.
        .layer(DefaultBodyLimit::max(cfg.upload_max_bytes + 1024 * 1024))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    pool.close().await;
    Ok(())
}

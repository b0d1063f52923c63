pub mod activity_log_sqlx;
pub mod application_repository_sqlx;
pub mod job_repository_sqlx;
pub mod messaging_repository_sqlx;
pub mod profile_repository_sqlx;
pub mod user_repository_sqlx;

pub mod activity_log;
pub mod application_repository;
pub mod blob_storage;
pub mod job_repository;
pub mod mailer;
pub mod messaging_repository;
pub mod profile_repository;
pub mod user_repository;

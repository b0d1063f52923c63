pub mod create_job;
pub mod delete_job;
pub mod get_job;
pub mod job_applications;
pub mod list_jobs;
pub mod public_jobs;
pub mod saved_jobs;
pub mod update_job;
pub mod update_job_status;

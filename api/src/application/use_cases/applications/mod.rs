pub mod application_notes;
pub mod list_applications;
pub mod submit_application;
pub mod update_application_status;

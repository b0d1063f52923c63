pub mod applications;
pub mod auth;
pub mod jobs;
pub mod messages;
pub mod profiles;
pub mod subscriptions;
pub mod uploads;

pub mod accounts;
pub mod activity;
pub mod applications;
pub mod jobs;
pub mod messaging;
pub mod subscriptions;
pub mod uploads;

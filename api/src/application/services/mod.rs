pub mod email;
pub mod notifications;
pub mod uploads;

pub mod billing_event;
pub mod handle_billing_event;
pub mod subscription_details;

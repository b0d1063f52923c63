use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    UserRegistered,
    UserLogin,
    PasswordResetRequested,
    PasswordReset,
    JobCreated,
    JobStatusUpdated,
    JobUpdated,
    JobDeleted,
    JobSaved,
    JobUnsaved,
    ProfileUpdated,
    JobApplicationSubmitted,
    GuestApplicationSubmitted,
    ApplicationStatusUpdated,
    ApplicationNoteAdded,
    ConversationStarted,
    MessageSent,
    FileUploaded,
    EmailSent,
    EmailFailed,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionCancelled,
    SubscriptionPaymentFailed,
    SubscriptionPaymentSucceeded,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::UserRegistered => "USER_REGISTERED",
            ActivityAction::UserLogin => "USER_LOGIN",
            ActivityAction::PasswordResetRequested => "PASSWORD_RESET_REQUESTED",
            ActivityAction::PasswordReset => "PASSWORD_RESET",
            ActivityAction::JobCreated => "JOB_CREATED",
            ActivityAction::JobStatusUpdated => "JOB_STATUS_UPDATED",
            ActivityAction::JobUpdated => "JOB_UPDATED",
            ActivityAction::JobDeleted => "JOB_DELETED",
            ActivityAction::JobSaved => "JOB_SAVED",
            ActivityAction::JobUnsaved => "JOB_UNSAVED",
            ActivityAction::ProfileUpdated => "PROFILE_UPDATED",
            ActivityAction::JobApplicationSubmitted => "JOB_APPLICATION_SUBMITTED",
            ActivityAction::GuestApplicationSubmitted => "GUEST_APPLICATION_SUBMITTED",
            ActivityAction::ApplicationStatusUpdated => "APPLICATION_STATUS_UPDATED",
            ActivityAction::ApplicationNoteAdded => "APPLICATION_NOTE_ADDED",
            ActivityAction::ConversationStarted => "CONVERSATION_STARTED",
            ActivityAction::MessageSent => "MESSAGE_SENT",
            ActivityAction::FileUploaded => "FILE_UPLOADED",
            ActivityAction::EmailSent => "EMAIL_SENT",
            ActivityAction::EmailFailed => "EMAIL_FAILED",
            ActivityAction::SubscriptionCreated => "SUBSCRIPTION_CREATED",
            ActivityAction::SubscriptionUpdated => "SUBSCRIPTION_UPDATED",
            ActivityAction::SubscriptionCancelled => "SUBSCRIPTION_CANCELLED",
            ActivityAction::SubscriptionPaymentFailed => "SUBSCRIPTION_PAYMENT_FAILED",
            ActivityAction::SubscriptionPaymentSucceeded => "SUBSCRIPTION_PAYMENT_SUCCEEDED",
        }
    }
}

/// Request origin recorded alongside audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub user_id: Option<Uuid>,
    pub action: ActivityAction,
    pub details: Value,
    pub meta: RequestMeta,
}

impl ActivityEntry {
    pub fn new(user_id: Option<Uuid>, action: ActivityAction, details: Value) -> Self {
        Self {
            user_id,
            action,
            details,
            meta: RequestMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: &RequestMeta) -> Self {
        self.meta = meta.clone();
        self
    }
}

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::ports::activity_log::ActivityLog;
use crate::application::ports::mailer::{Delivery, Mailer, OutgoingEmail};
use crate::application::services::email::EmailTemplate;
use crate::domain::activity::{ActivityAction, ActivityEntry};

/// Fire-and-forget side effects that run after the primary write has committed.
/// Nothing here returns an error to the caller.
#[derive(Clone)]
pub struct Notifications {
    mailer: Arc<dyn Mailer>,
    activity: Arc<dyn ActivityLog>,
    site_url: String,
}

impl Notifications {
    pub fn new(mailer: Arc<dyn Mailer>, activity: Arc<dyn ActivityLog>, site_url: String) -> Self {
        Self {
            mailer,
            activity,
            site_url,
        }
    }

    /// Appends an audit entry; failures are logged and dropped.
    pub async fn record(&self, entry: ActivityEntry) {
        if let Err(e) = self.activity.append(&entry).await {
            warn!(error = ?e, action = entry.action.as_str(), "activity_log_write_failed");
        }
    }

    /// Renders and sends `template` to `to`, logging the outcome as an activity entry.
    /// Returns whether the provider accepted the message.
    pub async fn email(&self, to: &str, template: EmailTemplate, user_id: Option<Uuid>) -> bool {
        let name = template.name();
        let rendered = template.render(&self.site_url);
        let message = OutgoingEmail {
            to: to.to_string(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        };
        match self.mailer.send(&message).await {
            Ok(Delivery::Sent { id }) => {
                info!(template = name, to = %to, email_id = ?id, "email_sent");
                self.record(ActivityEntry::new(
                    user_id,
                    ActivityAction::EmailSent,
                    json!({ "template": name, "to": to, "emailId": id }),
                ))
                .await;
                true
            }
            Ok(Delivery::NotConfigured) => {
                warn!(template = name, to = %to, "email_not_configured");
                false
            }
            Err(e) => {
                error!(error = ?e, template = name, to = %to, "notification_failed");
                self.record(ActivityEntry::new(
                    user_id,
                    ActivityAction::EmailFailed,
                    json!({ "template": name, "to": to, "error": e.to_string() }),
                ))
                .await;
                false
            }
        }
    }
}

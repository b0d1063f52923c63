use serde_json::json;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::messaging_repository::{MessagingRepository, Participant};
use crate::application::services::notifications::Notifications;
use crate::application::use_cases::messages::joined_conversation;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::messaging::message::Message;

pub struct SendMessage<'a, M: MessagingRepository + ?Sized> {
    pub messaging: &'a M,
    pub notifications: &'a Notifications,
}

impl<'a, M: MessagingRepository + ?Sized> SendMessage<'a, M> {
    pub async fn execute(
        &self,
        actor_user_id: Uuid,
        viewer: Participant,
        conversation_id: Uuid,
        content: &str,
        meta: &RequestMeta,
    ) -> AppResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Message content is required"));
        }
        joined_conversation(self.messaging, viewer, conversation_id).await?;
        let message = self
            .messaging
            .add_message(conversation_id, viewer.user_type(), content)
            .await?;
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(actor_user_id),
                    ActivityAction::MessageSent,
                    json!({ "conversationId": conversation_id, "messageId": message.id }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::accounts::user::UserType;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn sending_bumps_the_conversation() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let conv = fx.add_conversation(&school, &teacher);
        fx.store
            .update_conversation(conv.id, |c| c.updated_at = Utc::now() - Duration::days(5));
        let uc = SendMessage {
            messaging: &*fx.messaging,
            notifications: &fx.notifications,
        };
        let meta = RequestMeta::default();
        assert!(matches!(
            uc.execute(teacher.user_id, Participant::Teacher(teacher.id), conv.id, "  ", &meta)
                .await
                .unwrap_err(),
            AppError::Validation { .. }
        ));
        let m = uc
            .execute(teacher.user_id, Participant::Teacher(teacher.id), conv.id, "Thanks!", &meta)
            .await
            .unwrap();
        assert_eq!(m.sender_type, UserType::Teacher);
        assert!(!m.read);
        let conv = fx.messaging.find_conversation(conv.id).await.unwrap().unwrap();
        assert!(conv.is_recent(Utc::now()));
    }
}

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::application::errors::AppResult;
use crate::application::ports::messaging_repository::{MessagingRepository, Participant};
use crate::application::use_cases::messages::joined_conversation;

/// Marks the other side's unread messages as read. Already-read messages keep
/// their original `read_at`, so repeating the call changes nothing.
pub struct MarkRead<'a, M: MessagingRepository + ?Sized> {
    pub messaging: &'a M,
}

impl<'a, M: MessagingRepository + ?Sized> MarkRead<'a, M> {
    pub async fn execute(
        &self,
        viewer: Participant,
        conversation_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        joined_conversation(self.messaging, viewer, conversation_id).await?;
        let updated = self
            .messaging
            .mark_read(conversation_id, viewer.user_type(), now)
            .await?;
        debug!(conversation_id = %conversation_id, updated, "messages_marked_read");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::accounts::user::UserType;
    use chrono::Duration;

    #[tokio::test]
    async fn marking_twice_is_idempotent() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let teacher = fx.add_teacher();
        let conv = fx.add_conversation(&school, &teacher);
        fx.messaging
            .add_message(conv.id, UserType::Teacher, "question")
            .await
            .unwrap();
        fx.messaging
            .add_message(conv.id, UserType::School, "own message")
            .await
            .unwrap();

        let uc = MarkRead {
            messaging: &*fx.messaging,
        };
        let viewer = Participant::School(school.id);
        let t1 = Utc::now();
        assert_eq!(uc.execute(viewer, conv.id, t1).await.unwrap(), 1);
        let after_first: Vec<_> = fx
            .store
            .all_messages()
            .into_iter()
            .map(|m| (m.id, m.read, m.read_at))
            .collect();

        assert_eq!(
            uc.execute(viewer, conv.id, t1 + Duration::hours(1))
                .await
                .unwrap(),
            0
        );
        let after_second: Vec<_> = fx
            .store
            .all_messages()
            .into_iter()
            .map(|m| (m.id, m.read, m.read_at))
            .collect();
        assert_eq!(after_first, after_second);
        let own = fx
            .store
            .all_messages()
            .into_iter()
            .find(|m| m.sender_type == UserType::School)
            .unwrap();
        assert!(!own.read);
    }
}

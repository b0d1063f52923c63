use serde_json::json;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::messaging_repository::{MessagingRepository, Participant};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::messaging::message::{Conversation, Message};

#[derive(Debug, Clone)]
pub struct Started {
    pub conversation: Conversation,
    pub created: bool,
    pub message: Option<Message>,
}

/// Finds or opens the conversation between the caller and `counterpart_id`
/// (a teacher id for schools, a school id for teachers).
pub struct StartConversation<'a, M, P>
where
    M: MessagingRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub messaging: &'a M,
    pub profiles: &'a P,
    pub notifications: &'a Notifications,
}

impl<'a, M, P> StartConversation<'a, M, P>
where
    M: MessagingRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub async fn execute(
        &self,
        actor_user_id: Uuid,
        viewer: Participant,
        counterpart_id: Option<Uuid>,
        content: Option<&str>,
        meta: &RequestMeta,
    ) -> AppResult<Started> {
        let (school_id, teacher_id) = match viewer {
            Participant::School(school_id) => {
                let teacher_id =
                    counterpart_id.ok_or_else(|| AppError::validation("teacherId is required"))?;
                self.profiles
                    .teacher_by_id(teacher_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Teacher not found"))?;
                (school_id, teacher_id)
            }
            Participant::Teacher(teacher_id) => {
                let school_id =
                    counterpart_id.ok_or_else(|| AppError::validation("schoolId is required"))?;
                self.profiles
                    .school_by_id(school_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("School not found"))?;
                (school_id, teacher_id)
            }
        };

        let (mut conversation, created) =
            self.messaging.find_or_create(school_id, teacher_id).await?;
        let message = match content.map(str::trim).filter(|c| !c.is_empty()) {
            Some(text) => {
                let m = self
                    .messaging
                    .add_message(conversation.id, viewer.user_type(), text)
                    .await?;
                conversation.updated_at = m.created_at;
                Some(m)
            }
            None => None,
        };
        if created {
            self.notifications
                .record(
                    ActivityEntry::new(
                        Some(actor_user_id),
                        ActivityAction::ConversationStarted,
                        json!({
                            "conversationId": conversation.id,
                            "schoolId": school_id,
                            "teacherId": teacher_id,
                        }),
                    )
                    .with_meta(meta),
                )
                .await;
        }
        Ok(Started {
            conversation,
            created,
            message,
        })
    }
}

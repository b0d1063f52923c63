use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::errors::AppResult;
use crate::application::ports::messaging_repository::{
    Counterpart, MessagingRepository, Participant,
};
use crate::application::use_cases::messages::joined_conversation;
use crate::domain::messaging::message::{Conversation, Message, visible_messages};

#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub conversation: Conversation,
    pub other: Option<Counterpart>,
    pub messages: Vec<Message>,
}

/// A conversation's thread with old read messages left out.
pub struct GetConversation<'a, M: MessagingRepository + ?Sized> {
    pub messaging: &'a M,
}

impl<'a, M: MessagingRepository + ?Sized> GetConversation<'a, M> {
    pub async fn execute(
        &self,
        viewer: Participant,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<ConversationThread> {
        let conversation = joined_conversation(self.messaging, viewer, id).await?;
        let other = self
            .messaging
            .counterpart(&conversation, viewer.user_type())
            .await?;
        let messages = visible_messages(self.messaging.messages(id).await?, now);
        Ok(ConversationThread {
            conversation,
            other,
            messages,
        })
    }
}

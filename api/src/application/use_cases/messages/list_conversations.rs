use chrono::{DateTime, Utc};

use crate::application::errors::AppResult;
use crate::application::ports::messaging_repository::{
    ConversationOverview, MessagingRepository, Participant,
};
use crate::domain::messaging::message::read_retention;

pub struct ListConversations<'a, M: MessagingRepository + ?Sized> {
    pub messaging: &'a M,
}

impl<'a, M: MessagingRepository + ?Sized> ListConversations<'a, M> {
    /// Conversations touched within the retention window, newest first.
    pub async fn execute(
        &self,
        viewer: Participant,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ConversationOverview>> {
        let mut list = self
            .messaging
            .list_for(viewer, now - read_retention())
            .await?;
        list.sort_by(|a, b| b.conversation.updated_at.cmp(&a.conversation.updated_at));
        Ok(list)
    }
}

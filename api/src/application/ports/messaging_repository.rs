use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::accounts::user::UserType;
use crate::domain::messaging::message::{Conversation, Message};

/// The caller's side of a conversation, by profile id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    School(Uuid),
    Teacher(Uuid),
}

impl Participant {
    pub fn user_type(&self) -> UserType {
        match self {
            Participant::School(_) => UserType::School,
            Participant::Teacher(_) => UserType::Teacher,
        }
    }

    pub fn takes_part_in(&self, c: &Conversation) -> bool {
        match self {
            Participant::School(id) => c.school_id == *id,
            Participant::Teacher(id) => c.teacher_id == *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Counterpart {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConversationOverview {
    pub conversation: Conversation,
    pub other: Counterpart,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

#[async_trait]
pub trait MessagingRepository: Send + Sync {
    async fn find_conversation(&self, id: Uuid) -> anyhow::Result<Option<Conversation>>;
    /// Returns the pair's conversation and whether it was created now.
    async fn find_or_create(
        &self,
        school_id: Uuid,
        teacher_id: Uuid,
    ) -> anyhow::Result<(Conversation, bool)>;
    async fn list_for(
        &self,
        viewer: Participant,
        updated_since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ConversationOverview>>;
    async fn counterpart(
        &self,
        conversation: &Conversation,
        viewer: UserType,
    ) -> anyhow::Result<Option<Counterpart>>;
    async fn messages(&self, conversation_id: Uuid) -> anyhow::Result<Vec<Message>>;
    /// Appends a message and bumps the conversation's `updated_at`.
    async fn add_message(
        &self,
        conversation_id: Uuid,
        sender: UserType,
        content: &str,
    ) -> anyhow::Result<Message>;
    /// Marks unread messages sent by the other side as read; returns how many changed.
    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader: UserType,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64>;
}

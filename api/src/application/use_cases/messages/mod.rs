pub mod get_conversation;
pub mod list_conversations;
pub mod mark_read;
pub mod send_message;
pub mod start_conversation;

use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::messaging_repository::{MessagingRepository, Participant};
use crate::domain::messaging::message::Conversation;

/// Loads a conversation the caller takes part in.
pub(crate) async fn joined_conversation<M>(
    messaging: &M,
    viewer: Participant,
    id: Uuid,
) -> AppResult<Conversation>
where
    M: MessagingRepository + ?Sized,
{
    let conversation = messaging
        .find_conversation(id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation not found"))?;
    if !viewer.takes_part_in(&conversation) {
        return Err(AppError::forbidden("Access denied"));
    }
    Ok(conversation)
}

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::access::{Actor, participant};
use crate::application::errors::AppResult;
use crate::application::ports::messaging_repository::{Counterpart, Participant};
use crate::application::use_cases::messages::get_conversation::GetConversation;
use crate::application::use_cases::messages::list_conversations::ListConversations;
use crate::application::use_cases::messages::mark_read::MarkRead;
use crate::application::use_cases::messages::send_message::SendMessage;
use crate::application::use_cases::messages::start_conversation::StartConversation;
use crate::bootstrap::app_context::AppContext;
use crate::domain::accounts::user::UserType;
use crate::domain::messaging::message::Message;
use crate::presentation::http::auth::AuthUser;
use crate::presentation::http::extract::{ClientMeta, JsonBody};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    #[schema(value_type = String)]
    pub sender_type: UserType,
    pub content: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_type: m.sender_type,
            content: m.content,
            read: m.read,
            read_at: m.read_at,
            created_at: m.created_at,
        }
    }
}

/// The other side of a conversation: a school (logo) or a teacher (photo).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtherParty {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
}

impl From<Counterpart> for OtherParty {
    fn from(c: Counterpart) -> Self {
        Self {
            id: c.id,
            name: c.name,
            photo_url: c.photo_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_party: OtherParty,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StartConversationRequest {
    /// Required when the caller is a school.
    pub teacher_id: Option<Uuid>,
    /// Required when the caller is a teacher.
    pub school_id: Option<Uuid>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartedResponse {
    pub conversation_id: Uuid,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHeader {
    pub id: Uuid,
    pub other_party: Option<OtherParty>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadResponse {
    pub conversation: ConversationHeader,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SentResponse {
    pub message: MessageResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated: u64,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/messages/conversations",
            get(list_conversations).post(start_conversation),
        )
        .route(
            "/messages/conversations/:id",
            get(get_conversation).post(send_message),
        )
        .route("/messages/:id/read", post(mark_read))
        .with_state(ctx)
}

async fn viewer_of(ctx: &AppContext, actor: &Actor) -> AppResult<Participant> {
    let profiles = ctx.profile_repo();
    participant(profiles.as_ref(), actor).await
}

#[utoipa::path(get, path = "/api/messages/conversations", tag = "Messages", responses(
    (status = 200, body = ConversationListResponse)
))]
pub async fn list_conversations(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<ConversationListResponse>> {
    let viewer = viewer_of(&ctx, &actor).await?;
    let messaging = ctx.messaging_repo();
    let uc = ListConversations {
        messaging: messaging.as_ref(),
    };
    let list = uc.execute(viewer, Utc::now()).await?;
    Ok(Json(ConversationListResponse {
        conversations: list
            .into_iter()
            .map(|o| ConversationSummary {
                id: o.conversation.id,
                other_party: o.other.into(),
                last_message: o.last_message.map(MessageResponse::from),
                unread_count: o.unread_count,
                updated_at: o.conversation.updated_at,
            })
            .collect(),
    }))
}

#[utoipa::path(post, path = "/api/messages/conversations", tag = "Messages",
    request_body = StartConversationRequest,
    responses(
        (status = 200, body = StartedResponse),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn start_conversation(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    JsonBody(req): JsonBody<StartConversationRequest>,
) -> AppResult<Json<StartedResponse>> {
    let viewer = viewer_of(&ctx, &actor).await?;
    let counterpart = match viewer {
        Participant::School(_) => req.teacher_id,
        Participant::Teacher(_) => req.school_id,
    };
    let messaging = ctx.messaging_repo();
    let profiles = ctx.profile_repo();
    let uc = StartConversation {
        messaging: messaging.as_ref(),
        profiles: profiles.as_ref(),
        notifications: ctx.notifications(),
    };
    let started = uc
        .execute(
            actor.user_id,
            viewer,
            counterpart,
            req.content.as_deref(),
            &meta,
        )
        .await?;
    Ok(Json(StartedResponse {
        conversation_id: started.conversation.id,
        created: started.created,
        message: started.message.map(MessageResponse::from),
    }))
}

#[utoipa::path(get, path = "/api/messages/conversations/{id}", tag = "Messages",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, body = ThreadResponse),
        (status = 403, body = crate::presentation::http::error::ErrorBody),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn get_conversation(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ThreadResponse>> {
    let viewer = viewer_of(&ctx, &actor).await?;
    let messaging = ctx.messaging_repo();
    let uc = GetConversation {
        messaging: messaging.as_ref(),
    };
    let thread = uc.execute(viewer, id, Utc::now()).await?;
    Ok(Json(ThreadResponse {
        conversation: ConversationHeader {
            id: thread.conversation.id,
            other_party: thread.other.map(OtherParty::from),
        },
        messages: thread
            .messages
            .into_iter()
            .map(MessageResponse::from)
            .collect(),
    }))
}

#[utoipa::path(post, path = "/api/messages/conversations/{id}", tag = "Messages",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, body = SentResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 403, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn send_message(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<SentResponse>)> {
    let viewer = viewer_of(&ctx, &actor).await?;
    let messaging = ctx.messaging_repo();
    let uc = SendMessage {
        messaging: messaging.as_ref(),
        notifications: ctx.notifications(),
    };
    let message = uc
        .execute(actor.user_id, viewer, id, &req.content, &meta)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SentResponse {
            message: message.into(),
        }),
    ))
}

#[utoipa::path(post, path = "/api/messages/{id}/read", tag = "Messages",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, body = MarkReadResponse),
        (status = 403, body = crate::presentation::http::error::ErrorBody)
    )
)]
pub async fn mark_read(
    State(ctx): State<AppContext>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    let viewer = viewer_of(&ctx, &actor).await?;
    let messaging = ctx.messaging_repo();
    let uc = MarkRead {
        messaging: messaging.as_ref(),
    };
    let updated = uc.execute(viewer, id, Utc::now()).await?;
    Ok(Json(MarkReadResponse {
        success: true,
        updated,
    }))
}

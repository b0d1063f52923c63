use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::errors::Unavailable;
use crate::application::ports::messaging_repository::{
    ConversationOverview, Counterpart, MessagingRepository, Participant,
};
use crate::domain::accounts::user::UserType;
use crate::domain::messaging::message::{Conversation, Message};
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::repositories::user_repository_sqlx::user_type_from;
use crate::infrastructure::db::resilience::{RetryPolicy, commit, is_commit_unknown, run, run_tx};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_type, content, read, read_at, created_at";

fn conversation_from_row(r: &PgRow) -> Conversation {
    Conversation {
        id: r.get("id"),
        school_id: r.get("school_id"),
        teacher_id: r.get("teacher_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn message_from_row(r: &PgRow) -> anyhow::Result<Message> {
    let sender: String = r.get("sender_type");
    Ok(Message {
        id: r.get("id"),
        conversation_id: r.get("conversation_id"),
        sender_type: user_type_from(&sender)?,
        content: r.get("content"),
        read: r.get("read"),
        read_at: r.get("read_at"),
        created_at: r.get("created_at"),
    })
}

/// Other-party columns as seen by `viewer`: schools see the teacher, teachers the school.
fn counterpart_sql(viewer: UserType) -> &'static str {
    match viewer {
        UserType::School => {
            "SELECT t.id, t.first_name || ' ' || t.last_name AS name, t.photo_url FROM teachers t WHERE t.id = $1"
        }
        UserType::Teacher => "SELECT s.id, s.name, s.logo_url AS photo_url FROM schools s WHERE s.id = $1",
    }
}

pub struct SqlxMessagingRepository {
    pub pool: PgPool,
    pub retry: RetryPolicy,
}

impl SqlxMessagingRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

#[async_trait]
impl MessagingRepository for SqlxMessagingRepository {
    async fn find_conversation(&self, id: Uuid) -> anyhow::Result<Option<Conversation>> {
        let pool = &self.pool;
        let row = run(&self.retry, "conversations.find", move || {
            sqlx::query(
                "SELECT id, school_id, teacher_id, created_at, updated_at FROM conversations WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
        })
        .await?;
        Ok(row.as_ref().map(conversation_from_row))
    }

    async fn find_or_create(
        &self,
        school_id: Uuid,
        teacher_id: Uuid,
    ) -> anyhow::Result<(Conversation, bool)> {
        let pool = &self.pool;
        // xmax = 0 only for a freshly inserted tuple.
        let row = run(&self.retry, "conversations.find_or_create", move || {
            sqlx::query(
                r#"INSERT INTO conversations (school_id, teacher_id) VALUES ($1, $2)
                   ON CONFLICT (school_id, teacher_id) DO UPDATE SET school_id = EXCLUDED.school_id
                   RETURNING id, school_id, teacher_id, created_at, updated_at, (xmax = 0) AS created"#,
            )
            .bind(school_id)
            .bind(teacher_id)
            .fetch_one(pool)
        })
        .await?;
        Ok((conversation_from_row(&row), row.get("created")))
    }

    async fn list_for(
        &self,
        viewer: Participant,
        updated_since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ConversationOverview>> {
        let (filter, profile_id) = match viewer {
            Participant::School(id) => ("c.school_id", id),
            Participant::Teacher(id) => ("c.teacher_id", id),
        };
        let reader = viewer.user_type();
        let other_sql = match reader {
            UserType::School => {
                "t.id AS other_id, t.first_name || ' ' || t.last_name AS other_name, t.photo_url AS other_photo"
            }
            UserType::Teacher => "s.id AS other_id, s.name AS other_name, s.logo_url AS other_photo",
        };
        let sql = format!(
            r#"SELECT c.id, c.school_id, c.teacher_id, c.created_at, c.updated_at, {other_sql},
                      lm.id AS lm_id, lm.sender_type AS lm_sender_type, lm.content AS lm_content,
                      lm.read AS lm_read, lm.read_at AS lm_read_at, lm.created_at AS lm_created_at,
                      (SELECT COUNT(*) FROM messages m
                        WHERE m.conversation_id = c.id AND m.read = false AND m.sender_type <> $3) AS unread_count
                 FROM conversations c
                 JOIN schools s ON s.id = c.school_id
                 JOIN teachers t ON t.id = c.teacher_id
                 LEFT JOIN LATERAL (
                     SELECT id, sender_type, content, read, read_at, created_at FROM messages
                      WHERE conversation_id = c.id ORDER BY created_at DESC LIMIT 1
                 ) lm ON true
                WHERE {filter} = $1 AND c.updated_at >= $2
                ORDER BY c.updated_at DESC"#
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = run(&self.retry, "conversations.list_for", move || {
            sqlx::query(sql)
                .bind(profile_id)
                .bind(updated_since)
                .bind(reader.as_str())
                .fetch_all(pool)
        })
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in &rows {
            let conversation = conversation_from_row(r);
            let last_message = match r.get::<Option<Uuid>, _>("lm_id") {
                Some(id) => {
                    let sender: String = r.get("lm_sender_type");
                    Some(Message {
                        id,
                        conversation_id: conversation.id,
                        sender_type: user_type_from(&sender)?,
                        content: r.get("lm_content"),
                        read: r.get("lm_read"),
                        read_at: r.get("lm_read_at"),
                        created_at: r.get("lm_created_at"),
                    })
                }
                None => None,
            };
            out.push(ConversationOverview {
                other: Counterpart {
                    id: r.get("other_id"),
                    name: r.get("other_name"),
                    photo_url: r.get("other_photo"),
                },
                conversation,
                last_message,
                unread_count: r.get("unread_count"),
            });
        }
        Ok(out)
    }

    async fn counterpart(
        &self,
        conversation: &Conversation,
        viewer: UserType,
    ) -> anyhow::Result<Option<Counterpart>> {
        let other_id = match viewer {
            UserType::School => conversation.teacher_id,
            UserType::Teacher => conversation.school_id,
        };
        let (pool, sql) = (&self.pool, counterpart_sql(viewer));
        let row = run(&self.retry, "conversations.counterpart", move || {
            sqlx::query(sql).bind(other_id).fetch_optional(pool)
        })
        .await?;
        Ok(row.map(|r| Counterpart {
            id: r.get("id"),
            name: r.get("name"),
            photo_url: r.get("photo_url"),
        }))
    }

    async fn messages(&self, conversation_id: Uuid) -> anyhow::Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC"
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = run(&self.retry, "messages.list", move || {
            sqlx::query(sql).bind(conversation_id).fetch_all(pool)
        })
        .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn add_message(
        &self,
        conversation_id: Uuid,
        sender: UserType,
        content: &str,
    ) -> anyhow::Result<Message> {
        let sql = format!(
            "INSERT INTO messages (id, conversation_id, sender_type, content) VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let id = Uuid::new_v4();
        let result = run_tx(&self.retry, "messages.add", move || async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query(sql)
                .bind(id)
                .bind(conversation_id)
                .bind(sender.as_str())
                .bind(content)
                .fetch_one(&mut *tx)
                .await?;
            sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
            commit(tx).await?;
            Ok(row)
        })
        .await;
        let row = match result {
            Ok(row) => row,
            Err(e) if is_commit_unknown(&e) => {
                let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
                let sql = sql.as_str();
                let found = run(&self.retry, "messages.confirm_add", move || {
                    sqlx::query(sql).bind(id).fetch_optional(pool)
                })
                .await?;
                found.ok_or_else(|| e.context(Unavailable))?
            }
            Err(e) => return Err(e),
        };
        message_from_row(&row)
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader: UserType,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let pool = &self.pool;
        let res = run(&self.retry, "messages.mark_read", move || {
            sqlx::query(
                r#"UPDATE messages SET read = true, read_at = $3
                   WHERE conversation_id = $1 AND read = false AND sender_type <> $2"#,
            )
            .bind(conversation_id)
            .bind(reader.as_str())
            .bind(now)
            .execute(pool)
        })
        .await?;
        Ok(res.rows_affected())
    }
}

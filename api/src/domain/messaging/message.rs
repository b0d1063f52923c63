use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::accounts::user::UserType;

/// How long a read message, or an idle conversation, stays visible.
pub fn read_retention() -> Duration {
    Duration::days(3)
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub school_id: Uuid,
    pub teacher_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Conversations idle for longer than the retention window drop out of listings.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        self.updated_at >= now - read_retention()
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_type: UserType,
    pub content: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Unread messages always show. Read ones show for three days after they were
    /// read, falling back to the send time when no read time was recorded.
    pub fn visible_at(&self, now: DateTime<Utc>) -> bool {
        if !self.read {
            return true;
        }
        let since = self.read_at.unwrap_or(self.created_at);
        now - since <= read_retention()
    }

    pub fn is_unread_for(&self, viewer: UserType) -> bool {
        !self.read && self.sender_type != viewer
    }
}

pub fn visible_messages(messages: Vec<Message>, now: DateTime<Utc>) -> Vec<Message> {
    messages.into_iter().filter(|m| m.visible_at(now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(read: bool, read_at: Option<DateTime<Utc>>, created_at: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            sender_type: UserType::School,
            content: "hello".into(),
            read,
            read_at,
            created_at,
        }
    }

    #[test]
    fn unread_messages_never_expire() {
        let now = Utc::now();
        assert!(msg(false, None, now - Duration::days(30)).visible_at(now));
    }

    #[test]
    fn read_messages_expire_after_three_days() {
        let now = Utc::now();
        let fresh = msg(true, Some(now - Duration::days(2)), now - Duration::days(10));
        let boundary = msg(true, Some(now - Duration::days(3)), now - Duration::days(10));
        let stale = msg(
            true,
            Some(now - Duration::days(3) - Duration::seconds(1)),
            now,
        );
        assert!(fresh.visible_at(now));
        assert!(boundary.visible_at(now));
        assert!(!stale.visible_at(now));
    }

    #[test]
    fn missing_read_time_falls_back_to_send_time() {
        let now = Utc::now();
        assert!(!msg(true, None, now - Duration::days(4)).visible_at(now));
        assert!(msg(true, None, now - Duration::hours(1)).visible_at(now));
    }

    #[test]
    fn expired_message_stays_hidden_on_relisting() {
        let now = Utc::now();
        let stale = msg(true, Some(now - Duration::days(5)), now - Duration::days(6));
        let first = visible_messages(vec![stale.clone()], now);
        let second = visible_messages(vec![stale], now + Duration::minutes(1));
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn unread_count_only_counts_other_side() {
        let now = Utc::now();
        let from_school = msg(false, None, now);
        assert!(from_school.is_unread_for(UserType::Teacher));
        assert!(!from_school.is_unread_for(UserType::School));
    }
}

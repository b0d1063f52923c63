use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::accounts::user::{SchoolProfile, TeacherProfile};
use crate::domain::uploads::upload::UploadKind;

/// Billing state written by webhook events; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub subscription_id: Option<String>,
    pub status: Option<String>,
    pub plan_name: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn teacher_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<TeacherProfile>>;
    async fn teacher_by_id(&self, id: Uuid) -> anyhow::Result<Option<TeacherProfile>>;
    async fn school_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<SchoolProfile>>;
    async fn school_by_id(&self, id: Uuid) -> anyhow::Result<Option<SchoolProfile>>;
    async fn school_by_customer(&self, customer_id: &str)
    -> anyhow::Result<Option<SchoolProfile>>;
    /// Points the profile column for `kind` at `url`. Kinds without a column are a no-op.
    async fn set_teacher_file(&self, teacher_id: Uuid, kind: UploadKind, url: &str)
    -> anyhow::Result<()>;
    async fn set_school_file(&self, school_id: Uuid, kind: UploadKind, url: &str)
    -> anyhow::Result<()>;
    /// Writes the editable teacher columns, including `profile_complete`.
    async fn save_teacher(&self, profile: &TeacherProfile) -> anyhow::Result<TeacherProfile>;
    async fn save_school(&self, profile: &SchoolProfile) -> anyhow::Result<SchoolProfile>;
    async fn touch_teacher(&self, teacher_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()>;
    async fn fill_school_description(&self, school_id: Uuid, text: &str) -> anyhow::Result<()>;
    async fn update_subscription(
        &self,
        school_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> anyhow::Result<()>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::accounts::user::{SchoolProfile, TeacherProfile, User};

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub city: String,
    pub country: String,
    pub qualification: String,
    pub experience: String,
}

#[derive(Debug, Clone)]
pub struct NewSchool {
    pub name: String,
    pub contact_name: String,
    pub contact_email: Option<String>,
    pub city: String,
    pub country: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum NewProfile {
    Teacher(NewTeacher),
    School(NewSchool),
}

#[derive(Debug, Clone)]
pub enum CreatedProfile {
    Teacher(TeacherProfile),
    School(SchoolProfile),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Inserts the user and its profile atomically. `None` when the email is taken.
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        profile: &NewProfile,
    ) -> anyhow::Result<Option<(User, CreatedProfile)>>;
    async fn store_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    /// Finds the user holding an unexpired reset token.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<User>>;
    /// Replaces the password hash and clears any reset token.
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()>;
}

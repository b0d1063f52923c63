use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::user_repository::UserRepository;
use crate::domain::accounts::user::User;

/// Confirms that a verified token still names an existing account.
pub struct ValidateSession<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> ValidateSession<'a, R> {
    pub async fn execute(&self, user_id: Uuid) -> AppResult<User> {
        let user = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))?;
        Ok(User {
            password_hash: None,
            ..user
        })
    }
}

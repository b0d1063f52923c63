use serde_json::json;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::Notifications;
use crate::application::use_cases::auth::verify_password;
use crate::domain::accounts::user::User;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};

pub struct Login<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
    pub notifications: &'a Notifications,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl<'a, R: UserRepository + ?Sized> Login<'a, R> {
    pub async fn execute(&self, req: &LoginRequest, meta: &RequestMeta) -> AppResult<User> {
        let email = req.email.trim().to_lowercase();
        if email.is_empty() || req.password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }
        let user = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;
        let hash = user
            .password_hash
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::unauthorized("Please use OAuth login for this account"))?;
        if !verify_password(&req.password, hash) {
            return Err(AppError::unauthorized("Invalid credentials"));
        }
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(user.id),
                    ActivityAction::UserLogin,
                    json!({ "email": user.email, "userType": user.user_type.as_str() }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(User {
            password_hash: None,
            ..user
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::user_repository::{NewProfile, NewSchool};
    use crate::application::test_support::Fixture;
    use crate::application::use_cases::auth::hash_password;

    #[tokio::test]
    async fn credentials_are_checked() {
        let fx = Fixture::new();
        let hash = hash_password("password123").unwrap();
        fx.users
            .create_account(
                "office@school.kz",
                &hash,
                &NewProfile::School(NewSchool {
                    name: "Green Valley".into(),
                    contact_name: "Aigerim".into(),
                    contact_email: None,
                    city: "Astana".into(),
                    country: "Kazakhstan".into(),
                    description: None,
                }),
            )
            .await
            .unwrap();
        let uc = Login {
            repo: &*fx.users,
            notifications: &fx.notifications,
        };
        let meta = RequestMeta::default();
        let ok = uc
            .execute(
                &LoginRequest {
                    email: "Office@School.kz".into(),
                    password: "password123".into(),
                },
                &meta,
            )
            .await
            .unwrap();
        assert!(ok.password_hash.is_none());
        assert_eq!(fx.activity.actions(), vec![ActivityAction::UserLogin]);

        for (email, password) in [("office@school.kz", "nope"), ("ghost@school.kz", "password123")] {
            let err = uc
                .execute(
                    &LoginRequest {
                        email: email.into(),
                        password: password.into(),
                    },
                    &meta,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(m) if m == "Invalid credentials"));
        }
    }
}

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::email::EmailTemplate;
use crate::application::services::notifications::Notifications;
use crate::application::use_cases::auth::{
    MIN_PASSWORD_LEN, digest_token, hash_password, new_reset_token,
};
use crate::domain::accounts::user::{User, UserType};
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};

pub const RESET_REQUESTED: &str =
    "If an account with that email exists, a password reset link has been sent.";

pub fn reset_token_ttl() -> Duration {
    Duration::hours(1)
}

/// Issues a reset token. The response is identical whether or not the email is known.
pub struct RequestPasswordReset<'a, R, P>
where
    R: UserRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub users: &'a R,
    pub profiles: &'a P,
    pub notifications: &'a Notifications,
}

impl<'a, R, P> RequestPasswordReset<'a, R, P>
where
    R: UserRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub async fn execute(
        &self,
        email: &str,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("Email is required"));
        }
        let Some(user) = self.users.find_by_email(&email).await? else {
            info!("password_reset_unknown_email");
            return Ok(());
        };
        let token = new_reset_token();
        self.users
            .store_reset_token(user.id, &digest_token(&token), now + reset_token_ttl())
            .await?;
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(user.id),
                    ActivityAction::PasswordResetRequested,
                    json!({ "email": user.email }),
                )
                .with_meta(meta),
            )
            .await;
        let name = self.display_name(&user).await;
        self.notifications
            .email(
                &user.email,
                EmailTemplate::PasswordReset { name, token },
                Some(user.id),
            )
            .await;
        Ok(())
    }

    async fn display_name(&self, user: &User) -> String {
        let name = match user.user_type {
            UserType::Teacher => self
                .profiles
                .teacher_by_user(user.id)
                .await
                .ok()
                .flatten()
                .map(|t| t.first_name),
            UserType::School => self
                .profiles
                .school_by_user(user.id)
                .await
                .ok()
                .flatten()
                .map(|s| s.name),
        };
        name.filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "there".to_string())
    }
}

pub struct ResetPassword<'a, R: UserRepository + ?Sized> {
    pub users: &'a R,
    pub notifications: &'a Notifications,
}

impl<'a, R: UserRepository + ?Sized> ResetPassword<'a, R> {
    pub async fn execute(
        &self,
        token: &str,
        password: &str,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let token = token.trim();
        if token.is_empty() || password.is_empty() {
            return Err(AppError::validation("Token and password are required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "Password must be at least 8 characters long",
            ));
        }
        let user = self
            .users
            .find_by_reset_token(&digest_token(token), now)
            .await?
            .ok_or_else(|| AppError::validation("Invalid or expired reset token"))?;
        self.users
            .update_password(user.id, &hash_password(password)?)
            .await?;
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(user.id),
                    ActivityAction::PasswordReset,
                    json!({ "email": user.email }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::application::use_cases::auth::verify_password;

    fn token_from_email(html: &str) -> String {
        let start = html.find("token=").expect("reset link") + "token=".len();
        html[start..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect()
    }

    #[tokio::test]
    async fn full_reset_flow() {
        let fx = Fixture::new();
        let teacher = fx.add_teacher();
        let meta = RequestMeta::default();
        let now = Utc::now();
        RequestPasswordReset {
            users: &*fx.users,
            profiles: &*fx.profiles,
            notifications: &fx.notifications,
        }
        .execute(&teacher.email, &meta, now)
        .await
        .unwrap();
        let mails = fx.mailer.sent_to(&teacher.email);
        assert_eq!(mails.len(), 1);
        let token = token_from_email(&mails[0].html);
        assert_eq!(token.len(), 64);

        let reset = ResetPassword {
            users: &*fx.users,
            notifications: &fx.notifications,
        };
        let late = now + reset_token_ttl() + Duration::minutes(1);
        assert!(reset.execute(&token, "new-password", &meta, late).await.is_err());
        reset
            .execute(&token, "new-password", &meta, now)
            .await
            .unwrap();
        let user = fx.users.find_by_id(teacher.user_id).await.unwrap().unwrap();
        assert!(verify_password("new-password", user.password_hash.as_deref().unwrap()));
        // tokens are single use
        assert!(reset.execute(&token, "other-password", &meta, now).await.is_err());
    }

    #[tokio::test]
    async fn unknown_email_is_silent() {
        let fx = Fixture::new();
        RequestPasswordReset {
            users: &*fx.users,
            profiles: &*fx.profiles,
            notifications: &fx.notifications,
        }
        .execute("nobody@example.com", &RequestMeta::default(), Utc::now())
        .await
        .unwrap();
        assert!(fx.mailer.sent().is_empty());
    }
}

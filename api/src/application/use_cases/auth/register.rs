use serde_json::json;
use tracing::info;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::user_repository::{
    CreatedProfile, NewProfile, NewSchool, NewTeacher, UserRepository,
};
use crate::application::services::email::EmailTemplate;
use crate::application::services::notifications::Notifications;
use crate::application::use_cases::auth::{MIN_PASSWORD_LEN, hash_password};
use crate::domain::accounts::user::{User, UserType};
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::applications::application::is_valid_email;

pub struct Register<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
    pub notifications: &'a Notifications,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub user_type: String,
    pub email: String,
    pub password: String,
    // school
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub description: Option<String>,
    // teacher
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    // both
    pub city: Option<String>,
    pub country: Option<String>,
}

fn field(v: &Option<String>) -> String {
    v.as_deref().map(str::trim).unwrap_or_default().to_string()
}

impl RegisterRequest {
    fn profile(&self, user_type: UserType) -> AppResult<NewProfile> {
        let required: Vec<(&str, &Option<String>)> = match user_type {
            UserType::School => vec![
                ("name", &self.name),
                ("contactName", &self.contact_name),
                ("city", &self.city),
                ("country", &self.country),
            ],
            UserType::Teacher => vec![
                ("firstName", &self.first_name),
                ("lastName", &self.last_name),
                ("phone", &self.phone),
                ("city", &self.city),
                ("country", &self.country),
                ("qualification", &self.qualification),
                ("experience", &self.experience),
            ],
        };
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| field(v).is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::validation_with(
                format!("Missing required fields: {}", missing.join(", ")),
                json!({ "missingFields": missing }),
            ));
        }
        Ok(match user_type {
            UserType::School => NewProfile::School(NewSchool {
                name: field(&self.name),
                contact_name: field(&self.contact_name),
                contact_email: self.contact_email.clone().filter(|e| !e.trim().is_empty()),
                city: field(&self.city),
                country: field(&self.country),
                description: self.description.clone(),
            }),
            UserType::Teacher => NewProfile::Teacher(NewTeacher {
                first_name: field(&self.first_name),
                last_name: field(&self.last_name),
                phone: field(&self.phone),
                city: field(&self.city),
                country: field(&self.country),
                qualification: field(&self.qualification),
                experience: field(&self.experience),
            }),
        })
    }
}

impl<'a, R: UserRepository + ?Sized> Register<'a, R> {
    pub async fn execute(
        &self,
        req: &RegisterRequest,
        meta: &RequestMeta,
    ) -> AppResult<(User, CreatedProfile)> {
        let email = req.email.trim().to_lowercase();
        if req.user_type.trim().is_empty() || email.is_empty() {
            return Err(AppError::validation("User type and email are required"));
        }
        if !is_valid_email(&email) {
            return Err(AppError::validation("Please provide a valid email address"));
        }
        let user_type = UserType::parse(&req.user_type).ok_or_else(|| {
            AppError::validation("User type must be either 'school' or 'teacher'")
        })?;
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "Password must be at least 8 characters long",
            ));
        }
        let profile = req.profile(user_type)?;
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::validation("User already exists with this email"));
        }

        let hash = hash_password(&req.password)?;
        let (user, created) = self
            .repo
            .create_account(&email, &hash, &profile)
            .await?
            .ok_or_else(|| AppError::validation("User already exists with this email"))?;
        info!(user_id = %user.id, user_type = user_type.as_str(), "user_registered");

        self.notifications
            .record(
                ActivityEntry::new(
                    Some(user.id),
                    ActivityAction::UserRegistered,
                    json!({ "email": user.email, "userType": user_type.as_str() }),
                )
                .with_meta(meta),
            )
            .await;
        let welcome = match &created {
            CreatedProfile::Teacher(t) => EmailTemplate::TeacherWelcome {
                first_name: t.first_name.clone(),
                last_name: t.last_name.clone(),
            },
            CreatedProfile::School(s) => {
                let plan = s.subscription.plan();
                EmailTemplate::SchoolWelcome {
                    school_name: s.name.clone(),
                    plan_name: plan.map(|p| p.name).unwrap_or("Free Trial").to_string(),
                    job_limit: plan
                        .map(|p| p.job_limit_label())
                        .unwrap_or_else(|| "Limited".to_string()),
                }
            }
        };
        self.notifications
            .email(&user.email, welcome, Some(user.id))
            .await;
        Ok((user, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{Fixture, MemoryStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Misses every email lookup, as a request racing another signup would.
    struct LateLookups<'a>(&'a MemoryStore);

    #[async_trait]
    impl UserRepository for LateLookups<'_> {
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.find_by_id(id).await
        }
        async fn create_account(
            &self,
            email: &str,
            password_hash: &str,
            profile: &NewProfile,
        ) -> anyhow::Result<Option<(User, CreatedProfile)>> {
            self.0.create_account(email, password_hash, profile).await
        }
        async fn store_reset_token(
            &self,
            user_id: Uuid,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            self.0.store_reset_token(user_id, token_hash, expires_at).await
        }
        async fn find_by_reset_token(
            &self,
            token_hash: &str,
            now: DateTime<Utc>,
        ) -> anyhow::Result<Option<User>> {
            self.0.find_by_reset_token(token_hash, now).await
        }
        async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
            self.0.update_password(user_id, password_hash).await
        }
    }

    fn teacher_req() -> RegisterRequest {
        RegisterRequest {
            user_type: "teacher".into(),
            email: " Jane@Example.com ".into(),
            password: "longenough".into(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            phone: Some("+7 700 000 0000".into()),
            city: Some("Almaty".into()),
            country: Some("Kazakhstan".into()),
            qualification: Some("BEd".into()),
            experience: Some("3 years".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn registers_teacher_and_sends_welcome() {
        let fx = Fixture::new();
        let uc = Register {
            repo: &*fx.users,
            notifications: &fx.notifications,
        };
        let (user, created) = uc
            .execute(&teacher_req(), &RequestMeta::default())
            .await
            .unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.user_type, UserType::Teacher);
        assert!(matches!(created, CreatedProfile::Teacher(_)));
        assert_eq!(fx.mailer.sent_to("jane@example.com").len(), 1);

        let err = uc
            .execute(&teacher_req(), &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { message, .. } if message == "User already exists with this email"));
    }

    #[tokio::test]
    async fn concurrent_signup_with_same_email_is_a_validation_error() {
        let fx = Fixture::new();
        let racing = LateLookups(&*fx.users);
        let uc = Register {
            repo: &racing,
            notifications: &fx.notifications,
        };
        uc.execute(&teacher_req(), &RequestMeta::default())
            .await
            .unwrap();
        let err = uc
            .execute(&teacher_req(), &RequestMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { message, .. } if message == "User already exists with this email"));
        assert_eq!(fx.mailer.sent_to("jane@example.com").len(), 1);
    }

    #[tokio::test]
    async fn school_fields_are_required() {
        let fx = Fixture::new();
        let uc = Register {
            repo: &*fx.users,
            notifications: &fx.notifications,
        };
        let req = RegisterRequest {
            user_type: "SCHOOL".into(),
            email: "office@school.kz".into(),
            password: "longenough".into(),
            name: Some("Green Valley".into()),
            city: Some("Astana".into()),
            ..Default::default()
        };
        match uc.execute(&req, &RequestMeta::default()).await {
            Err(AppError::Validation { message, .. }) => {
                assert_eq!(message, "Missing required fields: contactName, country")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn weak_input_is_rejected() {
        let fx = Fixture::new();
        let uc = Register {
            repo: &*fx.users,
            notifications: &fx.notifications,
        };
        let mut req = teacher_req();
        req.password = "short".into();
        assert!(uc.execute(&req, &RequestMeta::default()).await.is_err());
        let mut req = teacher_req();
        req.user_type = "admin".into();
        assert!(uc.execute(&req, &RequestMeta::default()).await.is_err());
        let mut req = teacher_req();
        req.email = "nope".into();
        assert!(uc.execute(&req, &RequestMeta::default()).await.is_err());
        assert!(fx.mailer.sent().is_empty());
    }
}

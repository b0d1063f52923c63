use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::errors::Unavailable;
use crate::application::ports::user_repository::{
    CreatedProfile, NewProfile, UserRepository,
};
use crate::domain::accounts::user::{SchoolProfile, TeacherProfile, User, UserType};
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::resilience::{
    RetryPolicy, commit, is_commit_unknown, is_unique_violation, run, run_tx,
};

const USER_COLUMNS: &str = "id, email, user_type, password_hash, created_at";

pub(crate) fn user_type_from(raw: &str) -> anyhow::Result<UserType> {
    UserType::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown user_type {raw:?}"))
}

fn user_from_row(r: &PgRow) -> anyhow::Result<User> {
    let user_type: String = r.get("user_type");
    Ok(User {
        id: r.get("id"),
        email: r.get("email"),
        user_type: user_type_from(&user_type)?,
        password_hash: r.try_get("password_hash").ok().flatten(),
        created_at: r.get("created_at"),
    })
}

pub struct SqlxUserRepository {
    pub pool: PgPool,
    pub retry: RetryPolicy,
}

impl SqlxUserRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let pool = &self.pool;
        let sql = sql.as_str();
        let row = run(&self.retry, "users.find_by_email", move || {
            sqlx::query(sql).bind(email).fetch_optional(pool)
        })
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let pool = &self.pool;
        let sql = sql.as_str();
        let row = run(&self.retry, "users.find_by_id", move || {
            sqlx::query(sql).bind(id).fetch_optional(pool)
        })
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        profile: &NewProfile,
    ) -> anyhow::Result<Option<(User, CreatedProfile)>> {
        let user_type = match profile {
            NewProfile::Teacher(_) => UserType::Teacher,
            NewProfile::School(_) => UserType::School,
        };
        let pool = &self.pool;
        let result = run_tx(&self.retry, "users.create_account", move || async move {
            let mut tx = pool.begin().await?;
            let user_row = sqlx::query(&format!(
                "INSERT INTO users (email, user_type, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
            ))
            .bind(email)
            .bind(user_type.as_str())
            .bind(password_hash)
            .fetch_one(&mut *tx)
            .await?;
            let user_id: Uuid = user_row.get("id");
            let profile_id: Uuid = match profile {
                NewProfile::Teacher(t) => {
                    sqlx::query_scalar(
                        r#"INSERT INTO teachers (user_id, first_name, last_name, phone, city, country, qualification, experience)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id"#,
                    )
                    .bind(user_id)
                    .bind(&t.first_name)
                    .bind(&t.last_name)
                    .bind(&t.phone)
                    .bind(&t.city)
                    .bind(&t.country)
                    .bind(&t.qualification)
                    .bind(&t.experience)
                    .fetch_one(&mut *tx)
                    .await?
                }
                NewProfile::School(s) => {
                    sqlx::query_scalar(
                        r#"INSERT INTO schools (user_id, name, contact_name, contact_email, city, country, description)
                           VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
                    )
                    .bind(user_id)
                    .bind(&s.name)
                    .bind(&s.contact_name)
                    .bind(&s.contact_email)
                    .bind(&s.city)
                    .bind(&s.country)
                    .bind(&s.description)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };
            commit(tx).await?;
            Ok((user_row, profile_id))
        })
        .await;
        let (user_row, profile_id) = match result {
            Ok(inserted) => inserted,
            Err(e) if is_unique_violation(&e) => return Ok(None),
            // The caller retries; a committed account then reads as a duplicate.
            Err(e) if is_commit_unknown(&e) => return Err(e.context(Unavailable)),
            Err(e) => return Err(e),
        };
        let user = user_from_row(&user_row)?;
        let created = match profile {
            NewProfile::Teacher(t) => CreatedProfile::Teacher(TeacherProfile {
                id: profile_id,
                user_id: user.id,
                email: user.email.clone(),
                first_name: t.first_name.clone(),
                last_name: t.last_name.clone(),
                phone: Some(t.phone.clone()),
                city: Some(t.city.clone()),
                country: Some(t.country.clone()),
                qualification: Some(t.qualification.clone()),
                experience: Some(t.experience.clone()),
                ..Default::default()
            }),
            NewProfile::School(s) => CreatedProfile::School(SchoolProfile {
                id: profile_id,
                user_id: user.id,
                email: user.email.clone(),
                name: s.name.clone(),
                contact_name: Some(s.contact_name.clone()),
                contact_email: s.contact_email.clone(),
                city: Some(s.city.clone()),
                country: Some(s.country.clone()),
                description: s.description.clone(),
                ..Default::default()
            }),
        };
        Ok(Some((user, created)))
    }

    async fn store_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let pool = &self.pool;
        run(&self.retry, "users.store_reset_token", move || {
            sqlx::query(
                "UPDATE users SET reset_token = $2, reset_token_expiry = $3, updated_at = now() WHERE id = $1",
            )
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(pool)
        })
        .await?;
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1 AND reset_token_expiry > $2"
        );
        let pool = &self.pool;
        let sql = sql.as_str();
        let row = run(&self.retry, "users.find_by_reset_token", move || {
            sqlx::query(sql).bind(token_hash).bind(now).fetch_optional(pool)
        })
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let pool = &self.pool;
        run(&self.retry, "users.update_password", move || {
            sqlx::query(
                r#"UPDATE users SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL, updated_at = now()
                   WHERE id = $1"#,
            )
            .bind(user_id)
            .bind(password_hash)
            .execute(pool)
        })
        .await?;
        Ok(())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::profile_repository::{ProfileRepository, SubscriptionUpdate};
use crate::domain::accounts::user::{SchoolProfile, TeacherProfile};
use crate::domain::subscriptions::plan::{SubscriptionState, SubscriptionStatus};
use crate::domain::uploads::upload::UploadKind;
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::resilience::{RetryPolicy, run};

const TEACHER_SELECT: &str = r#"SELECT t.id, t.user_id, u.email, t.first_name, t.last_name, t.phone, t.city, t.country,
       t.qualification, t.experience, t.experience_years, t.resume_url, t.photo_url, t.portfolio_url,
       t.bio, t.subjects, t.certifications, t.languages, t.availability, t.profile_complete, t.last_active
  FROM teachers t JOIN users u ON u.id = t.user_id"#;

const SCHOOL_SELECT: &str = r#"SELECT s.id, s.user_id, u.email, s.name, s.contact_name, s.contact_email, s.city, s.country,
       s.description, s.logo_url, s.cover_photo_url, s.photo_url, s.telephone, s.street_address,
       s.school_type, s.website, s.established, s.student_count, s.stripe_customer_id, s.subscription_id,
       s.subscription_status, s.subscription_plan, s.current_period_end, s.cancel_at_period_end,
       s.subscription_end_date
  FROM schools s JOIN users u ON u.id = s.user_id"#;

pub(crate) fn teacher_from_row(r: &PgRow) -> TeacherProfile {
    TeacherProfile {
        id: r.get("id"),
        user_id: r.get("user_id"),
        email: r.get("email"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        phone: r.get("phone"),
        city: r.get("city"),
        country: r.get("country"),
        qualification: r.get("qualification"),
        experience: r.get("experience"),
        experience_years: r.get("experience_years"),
        resume_url: r.get("resume_url"),
        photo_url: r.get("photo_url"),
        portfolio_url: r.get("portfolio_url"),
        bio: r.get("bio"),
        subjects: r.get("subjects"),
        certifications: r.get("certifications"),
        languages: r.get("languages"),
        availability: r.get("availability"),
        profile_complete: r.get("profile_complete"),
        last_active: r.get("last_active"),
    }
}

pub(crate) fn school_from_row(r: &PgRow) -> SchoolProfile {
    let status: Option<String> = r.get("subscription_status");
    SchoolProfile {
        id: r.get("id"),
        user_id: r.get("user_id"),
        email: r.get("email"),
        name: r.get("name"),
        contact_name: r.get("contact_name"),
        contact_email: r.get("contact_email"),
        city: r.get("city"),
        country: r.get("country"),
        description: r.get("description"),
        logo_url: r.get("logo_url"),
        cover_photo_url: r.get("cover_photo_url"),
        photo_url: r.get("photo_url"),
        telephone: r.get("telephone"),
        street_address: r.get("street_address"),
        school_type: r.get("school_type"),
        website: r.get("website"),
        established: r.get("established"),
        student_count: r.get("student_count"),
        subscription: SubscriptionState {
            customer_id: r.get("stripe_customer_id"),
            subscription_id: r.get("subscription_id"),
            status: SubscriptionStatus::parse(status.as_deref()),
            plan_name: r.get("subscription_plan"),
            current_period_end: r.get("current_period_end"),
            cancel_at_period_end: r.get("cancel_at_period_end"),
            subscription_end_date: r.get("subscription_end_date"),
        },
    }
}

fn teacher_file_column(kind: UploadKind) -> Option<&'static str> {
    match kind {
        UploadKind::Resume => Some("resume_url"),
        UploadKind::Photo => Some("photo_url"),
        UploadKind::Portfolio => Some("portfolio_url"),
        _ => None,
    }
}

fn school_file_column(kind: UploadKind) -> Option<&'static str> {
    match kind {
        UploadKind::Logo => Some("logo_url"),
        UploadKind::CoverPhoto => Some("cover_photo_url"),
        UploadKind::Photo => Some("photo_url"),
        _ => None,
    }
}

pub struct SqlxProfileRepository {
    pub pool: PgPool,
    pub retry: RetryPolicy,
}

impl SqlxProfileRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn one_teacher(
        &self,
        operation: &str,
        filter: &str,
        id: Uuid,
    ) -> anyhow::Result<Option<TeacherProfile>> {
        let sql = format!("{TEACHER_SELECT} WHERE {filter} = $1");
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, operation, move || {
            sqlx::query(sql).bind(id).fetch_optional(pool)
        })
        .await?;
        Ok(row.as_ref().map(teacher_from_row))
    }

    async fn one_school(
        &self,
        operation: &str,
        filter: &str,
        id: Uuid,
    ) -> anyhow::Result<Option<SchoolProfile>> {
        let sql = format!("{SCHOOL_SELECT} WHERE {filter} = $1");
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, operation, move || {
            sqlx::query(sql).bind(id).fetch_optional(pool)
        })
        .await?;
        Ok(row.as_ref().map(school_from_row))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn teacher_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<TeacherProfile>> {
        self.one_teacher("teachers.by_user", "t.user_id", user_id).await
    }

    async fn teacher_by_id(&self, id: Uuid) -> anyhow::Result<Option<TeacherProfile>> {
        self.one_teacher("teachers.by_id", "t.id", id).await
    }

    async fn school_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<SchoolProfile>> {
        self.one_school("schools.by_user", "s.user_id", user_id).await
    }

    async fn school_by_id(&self, id: Uuid) -> anyhow::Result<Option<SchoolProfile>> {
        self.one_school("schools.by_id", "s.id", id).await
    }

    async fn school_by_customer(
        &self,
        customer_id: &str,
    ) -> anyhow::Result<Option<SchoolProfile>> {
        let sql = format!("{SCHOOL_SELECT} WHERE s.stripe_customer_id = $1");
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, "schools.by_customer", move || {
            sqlx::query(sql).bind(customer_id).fetch_optional(pool)
        })
        .await?;
        Ok(row.as_ref().map(school_from_row))
    }

    async fn set_teacher_file(
        &self,
        teacher_id: Uuid,
        kind: UploadKind,
        url: &str,
    ) -> anyhow::Result<()> {
        let Some(column) = teacher_file_column(kind) else {
            return Ok(());
        };
        let sql = format!("UPDATE teachers SET {column} = $2, updated_at = now() WHERE id = $1");
        let (pool, sql) = (&self.pool, sql.as_str());
        run(&self.retry, "teachers.set_file", move || {
            sqlx::query(sql).bind(teacher_id).bind(url).execute(pool)
        })
        .await?;
        Ok(())
    }

    async fn set_school_file(
        &self,
        school_id: Uuid,
        kind: UploadKind,
        url: &str,
    ) -> anyhow::Result<()> {
        let Some(column) = school_file_column(kind) else {
            return Ok(());
        };
        let sql = format!("UPDATE schools SET {column} = $2, updated_at = now() WHERE id = $1");
        let (pool, sql) = (&self.pool, sql.as_str());
        run(&self.retry, "schools.set_file", move || {
            sqlx::query(sql).bind(school_id).bind(url).execute(pool)
        })
        .await?;
        Ok(())
    }

    async fn save_teacher(&self, profile: &TeacherProfile) -> anyhow::Result<TeacherProfile> {
        let pool = &self.pool;
        run(&self.retry, "teachers.save", move || {
            sqlx::query(
                r#"UPDATE teachers SET
                     first_name = $2, last_name = $3, phone = $4, city = $5, country = $6,
                     qualification = $7, experience = $8, experience_years = $9, bio = $10,
                     subjects = $11, certifications = $12, languages = $13, availability = $14,
                     profile_complete = $15, last_active = now(), updated_at = now()
                   WHERE id = $1"#,
            )
            .bind(profile.id)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.phone)
            .bind(&profile.city)
            .bind(&profile.country)
            .bind(&profile.qualification)
            .bind(&profile.experience)
            .bind(profile.experience_years)
            .bind(&profile.bio)
            .bind(&profile.subjects)
            .bind(&profile.certifications)
            .bind(&profile.languages)
            .bind(&profile.availability)
            .bind(profile.profile_complete)
            .execute(pool)
        })
        .await?;
        self.teacher_by_id(profile.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("teacher {} vanished during save", profile.id))
    }

    async fn save_school(&self, profile: &SchoolProfile) -> anyhow::Result<SchoolProfile> {
        let pool = &self.pool;
        run(&self.retry, "schools.save", move || {
            sqlx::query(
                r#"UPDATE schools SET
                     name = $2, contact_name = $3, contact_email = $4, telephone = $5,
                     street_address = $6, city = $7, country = $8, school_type = $9, website = $10,
                     description = $11, established = $12, student_count = $13, updated_at = now()
                   WHERE id = $1"#,
            )
            .bind(profile.id)
            .bind(&profile.name)
            .bind(&profile.contact_name)
            .bind(&profile.contact_email)
            .bind(&profile.telephone)
            .bind(&profile.street_address)
            .bind(&profile.city)
            .bind(&profile.country)
            .bind(&profile.school_type)
            .bind(&profile.website)
            .bind(&profile.description)
            .bind(profile.established)
            .bind(profile.student_count)
            .execute(pool)
        })
        .await?;
        self.school_by_id(profile.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("school {} vanished during save", profile.id))
    }

    async fn touch_teacher(&self, teacher_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        let pool = &self.pool;
        run(&self.retry, "teachers.touch", move || {
            sqlx::query("UPDATE teachers SET last_active = $2 WHERE id = $1")
                .bind(teacher_id)
                .bind(at)
                .execute(pool)
        })
        .await?;
        Ok(())
    }

    async fn fill_school_description(&self, school_id: Uuid, text: &str) -> anyhow::Result<()> {
        let pool = &self.pool;
        run(&self.retry, "schools.fill_description", move || {
            sqlx::query(
                r#"UPDATE schools SET description = $2, updated_at = now()
                   WHERE id = $1 AND (description IS NULL OR btrim(description) = '')"#,
            )
            .bind(school_id)
            .bind(text)
            .execute(pool)
        })
        .await?;
        Ok(())
    }

    async fn update_subscription(
        &self,
        school_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> anyhow::Result<()> {
        let pool = &self.pool;
        run(&self.retry, "schools.update_subscription", move || {
            sqlx::query(
                r#"UPDATE schools SET
                     subscription_id = COALESCE($2, subscription_id),
                     subscription_status = COALESCE($3, subscription_status),
                     subscription_plan = COALESCE($4, subscription_plan),
                     current_period_end = COALESCE($5, current_period_end),
                     cancel_at_period_end = COALESCE($6, cancel_at_period_end),
                     subscription_end_date = COALESCE($7, subscription_end_date),
                     updated_at = now()
                   WHERE id = $1"#,
            )
            .bind(school_id)
            .bind(&update.subscription_id)
            .bind(&update.status)
            .bind(&update.plan_name)
            .bind(update.current_period_end)
            .bind(update.cancel_at_period_end)
            .bind(update.subscription_end_date)
            .execute(pool)
        })
        .await?;
        Ok(())
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::info;
use uuid::Uuid;

use crate::application::errors::Unavailable;
use crate::application::ports::application_repository::{
    ApplicantContact, ApplicationRepository, ApplicationView, NewApplication, StatusChange,
};
use crate::domain::applications::application::{
    Applicant, Application, ApplicationNote, ApplicationStatus, GuestApplicant,
};
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::resilience::{
    RetryPolicy, commit, is_commit_unknown, is_unique_violation, run, run_tx,
};

const APPLICATION_COLUMNS: &str = "a.id, a.job_id, a.teacher_id, a.guest_first_name, a.guest_last_name, \
     a.guest_email, a.guest_phone, a.guest_city, a.guest_country, a.status, a.cover_letter, \
     a.resume_url, a.portfolio_url, a.interview_date, a.rating, a.created_at, a.updated_at";

const VIEW_JOINS: &str = r#"j.title AS job_title, j.school_id, s.name AS school_name,
       COALESCE(t.first_name || ' ' || t.last_name, a.guest_first_name || ' ' || a.guest_last_name, '') AS applicant_name,
       COALESCE(tu.email, a.guest_email, '') AS applicant_email
  FROM applications a
  JOIN jobs j ON j.id = a.job_id
  JOIN schools s ON s.id = j.school_id
  LEFT JOIN teachers t ON t.id = a.teacher_id
  LEFT JOIN users tu ON tu.id = t.user_id"#;

fn view_select() -> String {
    format!("SELECT {APPLICATION_COLUMNS}, {VIEW_JOINS}")
}

fn application_from_row(r: &PgRow) -> anyhow::Result<Application> {
    let status: String = r.get("status");
    let teacher_id: Option<Uuid> = r.get("teacher_id");
    let applicant = match teacher_id {
        Some(id) => Applicant::Teacher(id),
        None => Applicant::Guest(GuestApplicant {
            first_name: r.get::<Option<String>, _>("guest_first_name").unwrap_or_default(),
            last_name: r.get::<Option<String>, _>("guest_last_name").unwrap_or_default(),
            email: r.get::<Option<String>, _>("guest_email").unwrap_or_default(),
            phone: r.get("guest_phone"),
            city: r.get("guest_city"),
            country: r.get("guest_country"),
        }),
    };
    Ok(Application {
        id: r.get("id"),
        job_id: r.get("job_id"),
        applicant,
        status: ApplicationStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown application status {status:?}"))?,
        cover_letter: r.get("cover_letter"),
        resume_url: r.get("resume_url"),
        portfolio_url: r.get("portfolio_url"),
        interview_date: r.get("interview_date"),
        rating: r.get("rating"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

fn note_from_row(r: &PgRow) -> ApplicationNote {
    ApplicationNote {
        id: r.get("id"),
        application_id: r.get("application_id"),
        author_name: r.get("author_name"),
        content: r.get("content"),
        created_at: r.get("created_at"),
    }
}

pub struct SqlxApplicationRepository {
    pub pool: PgPool,
    pub retry: RetryPolicy,
}

impl SqlxApplicationRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn notes_for(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<ApplicationNote>>> {
        let mut out: HashMap<Uuid, Vec<ApplicationNote>> = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }
        let pool = &self.pool;
        let rows = run(&self.retry, "application_notes.list_many", move || {
            sqlx::query(
                r#"SELECT id, application_id, author_name, content, created_at
                   FROM application_notes WHERE application_id = ANY($1) ORDER BY created_at ASC"#,
            )
            .bind(ids)
            .fetch_all(pool)
        })
        .await?;
        for note in rows.iter().map(note_from_row) {
            out.entry(note.application_id).or_default().push(note);
        }
        Ok(out)
    }

    async fn views(
        &self,
        operation: &str,
        filter: &str,
        id: Uuid,
    ) -> anyhow::Result<Vec<ApplicationView>> {
        let sql = format!("{} WHERE {filter} = $1 ORDER BY a.created_at DESC", view_select());
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = run(&self.retry, operation, move || {
            sqlx::query(sql).bind(id).fetch_all(pool)
        })
        .await?;
        let mut views = Vec::with_capacity(rows.len());
        for r in &rows {
            views.push(ApplicationView {
                application: application_from_row(r)?,
                job_title: r.get("job_title"),
                school_id: r.get("school_id"),
                school_name: r.get("school_name"),
                applicant_name: r.get("applicant_name"),
                applicant_email: r.get("applicant_email"),
                notes: Vec::new(),
            });
        }
        let ids: Vec<Uuid> = views.iter().map(|v| v.application.id).collect();
        let mut notes = self.notes_for(&ids).await?;
        for v in &mut views {
            v.notes = notes.remove(&v.application.id).unwrap_or_default();
        }
        Ok(views)
    }
}

#[async_trait]
impl ApplicationRepository for SqlxApplicationRepository {
    async fn exists_for_teacher(&self, job_id: Uuid, teacher_id: Uuid) -> anyhow::Result<bool> {
        let pool = &self.pool;
        let found: bool = run(&self.retry, "applications.exists_for_teacher", move || {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM applications WHERE job_id = $1 AND teacher_id = $2)",
            )
            .bind(job_id)
            .bind(teacher_id)
            .fetch_one(pool)
        })
        .await?;
        Ok(found)
    }

    async fn exists_for_guest(&self, job_id: Uuid, email: &str) -> anyhow::Result<bool> {
        let pool = &self.pool;
        let found: bool = run(&self.retry, "applications.exists_for_guest", move || {
            sqlx::query_scalar(
                r#"SELECT EXISTS(SELECT 1 FROM applications
                   WHERE job_id = $1 AND teacher_id IS NULL AND lower(guest_email) = lower($2))"#,
            )
            .bind(job_id)
            .bind(email.trim())
            .fetch_one(pool)
        })
        .await?;
        Ok(found)
    }

    async fn create(&self, new: &NewApplication) -> anyhow::Result<Option<Application>> {
        let sql = format!(
            r#"INSERT INTO applications AS a (id, job_id, teacher_id, guest_first_name, guest_last_name, guest_email,
                   guest_phone, guest_city, guest_country, cover_letter, resume_url, portfolio_url)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING {APPLICATION_COLUMNS}"#
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let id = Uuid::new_v4();
        let (teacher_id, guest) = match &new.applicant {
            Applicant::Teacher(id) => (Some(*id), None),
            Applicant::Guest(g) => (None, Some(g)),
        };
        let result = run_tx(&self.retry, "applications.create", move || async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query(sql)
                .bind(id)
                .bind(new.job_id)
                .bind(teacher_id)
                .bind(guest.map(|g| g.first_name.trim()))
                .bind(guest.map(|g| g.last_name.trim()))
                .bind(guest.map(|g| g.email.trim()))
                .bind(guest.and_then(|g| g.phone.as_deref()))
                .bind(guest.and_then(|g| g.city.as_deref()))
                .bind(guest.and_then(|g| g.country.as_deref()))
                .bind(&new.cover_letter)
                .bind(&new.resume_url)
                .bind(&new.portfolio_url)
                .fetch_one(&mut *tx)
                .await?;
            if let (Some(teacher_id), true) = (teacher_id, new.update_teacher_resume) {
                sqlx::query("UPDATE teachers SET resume_url = $2, updated_at = now() WHERE id = $1")
                    .bind(teacher_id)
                    .bind(&new.resume_url)
                    .execute(&mut *tx)
                    .await?;
            }
            commit(tx).await?;
            Ok(row)
        })
        .await;
        match result {
            Ok(row) => application_from_row(&row).map(Some),
            Err(e) if is_unique_violation(&e) => {
                info!(job_id = %new.job_id, "application_duplicate_rejected_by_index");
                Ok(None)
            }
            Err(e) if is_commit_unknown(&e) => match ApplicationRepository::find(self, id).await? {
                Some(view) => {
                    info!(application_id = %id, "application_commit_confirmed_after_lost_ack");
                    Ok(Some(view.application))
                }
                None => Err(e.context(Unavailable)),
            },
            Err(e) => Err(e),
        }
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<ApplicationView>> {
        Ok(self.views("applications.find", "a.id", id).await?.into_iter().next())
    }

    async fn list_for_job(&self, job_id: Uuid) -> anyhow::Result<Vec<ApplicationView>> {
        self.views("applications.list_for_job", "a.job_id", job_id).await
    }

    async fn list_for_school(&self, school_id: Uuid) -> anyhow::Result<Vec<ApplicationView>> {
        self.views("applications.list_for_school", "j.school_id", school_id)
            .await
    }

    async fn list_for_teacher(&self, teacher_id: Uuid) -> anyhow::Result<Vec<ApplicationView>> {
        self.views("applications.list_for_teacher", "a.teacher_id", teacher_id)
            .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> anyhow::Result<Application> {
        let sql = format!(
            r#"UPDATE applications AS a SET status = $2,
                   interview_date = COALESCE($3, interview_date),
                   rating = COALESCE($4, rating),
                   updated_at = now()
               WHERE a.id = $1
               RETURNING {APPLICATION_COLUMNS}"#
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, "applications.update_status", move || async move {
            let mut tx = pool.begin().await?;
            let row = sqlx::query(sql)
                .bind(id)
                .bind(change.status.as_str())
                .bind(change.interview_date)
                .bind(change.rating)
                .fetch_one(&mut *tx)
                .await?;
            if let Some((author, content)) = &change.note {
                sqlx::query(
                    "INSERT INTO application_notes (application_id, author_name, content) VALUES ($1, $2, $3)",
                )
                .bind(id)
                .bind(author)
                .bind(content)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(row)
        })
        .await?;
        application_from_row(&row)
    }

    async fn add_note(
        &self,
        application_id: Uuid,
        author_name: &str,
        content: &str,
    ) -> anyhow::Result<ApplicationNote> {
        let pool = &self.pool;
        let row = run(&self.retry, "application_notes.add", move || {
            sqlx::query(
                r#"INSERT INTO application_notes (application_id, author_name, content) VALUES ($1, $2, $3)
                   RETURNING id, application_id, author_name, content, created_at"#,
            )
            .bind(application_id)
            .bind(author_name)
            .bind(content)
            .fetch_one(pool)
        })
        .await?;
        Ok(note_from_row(&row))
    }

    async fn list_notes(&self, application_id: Uuid) -> anyhow::Result<Vec<ApplicationNote>> {
        Ok(self
            .notes_for(&[application_id])
            .await?
            .remove(&application_id)
            .unwrap_or_default())
    }

    async fn pending_applicants(&self, job_id: Uuid) -> anyhow::Result<Vec<ApplicantContact>> {
        let pool = &self.pool;
        let rows = run(&self.retry, "applications.pending_applicants", move || {
            sqlx::query(
                r#"SELECT COALESCE(t.first_name || ' ' || t.last_name, a.guest_first_name || ' ' || a.guest_last_name, '') AS name,
                          COALESCE(tu.email, a.guest_email, '') AS email
                   FROM applications a
                   LEFT JOIN teachers t ON t.id = a.teacher_id
                   LEFT JOIN users tu ON tu.id = t.user_id
                   WHERE a.job_id = $1 AND a.status IN ('APPLIED', 'REVIEWING', 'INTERVIEW')"#,
            )
            .bind(job_id)
            .fetch_all(pool)
        })
        .await?;
        Ok(rows
            .iter()
            .map(|r| ApplicantContact {
                name: r.get("name"),
                email: r.get("email"),
            })
            .filter(|c| !c.email.trim().is_empty())
            .collect())
    }
}

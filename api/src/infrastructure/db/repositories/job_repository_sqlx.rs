use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::job_repository::{JobListing, JobPage, JobRepository, SavedJob};
use crate::domain::applications::application::ApplicationStatus;
use crate::domain::jobs::board::{BoardQuery, JobSort};
use crate::domain::jobs::job::{Job, JobStatus, NewJob};
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::resilience::{RetryPolicy, run};

const JOB_COLUMNS: &str = "j.id, j.school_id, j.title, j.description, j.city, j.country, j.salary, \
     j.job_type, j.status, j.deadline, j.subjects_taught, j.student_age_group_min, \
     j.student_age_group_max, j.start_date, j.contract_length, j.teaching_hours_per_week, \
     j.qualification, j.experience, j.language, j.visa_required, j.teaching_license_required, \
     j.benefits, j.requirements, j.created_at, j.updated_at";

const LISTING_SELECT: &str = r#"SELECT {cols}, s.name AS school_name, s.logo_url AS school_logo_url,
       (SELECT COUNT(*) FROM applications a WHERE a.job_id = j.id) AS application_count
  FROM jobs j JOIN schools s ON s.id = j.school_id"#;

fn listing_select() -> String {
    LISTING_SELECT.replace("{cols}", JOB_COLUMNS)
}

const BOARD_FILTER: &str = r#"WHERE j.status = 'ACTIVE' AND j.deadline >= $1
   AND ($2::text IS NULL OR j.title ILIKE $2 OR j.description ILIKE $2 OR j.city ILIKE $2
        OR j.country ILIKE $2 OR s.name ILIKE $2)
   AND ($3::text IS NULL OR lower(j.country) = lower($3))
   AND ($4::text IS NULL OR j.city ILIKE $4)
   AND ($5::text IS NULL OR upper(j.job_type) = $5)
   AND ($6::timestamptz IS NULL OR j.deadline >= $6)
   AND ($7::timestamptz IS NULL OR j.deadline <= $7)"#;

/// Mirrors `salary_amount`: the first run of digits and commas, at most 18 characters.
const SALARY_AMOUNT: &str =
    "NULLIF(replace(substring(j.salary from '[0-9][0-9,]{0,17}'), ',', ''), '')::bigint";

fn board_order(sort: JobSort) -> String {
    match sort {
        JobSort::Latest => "j.created_at DESC".into(),
        JobSort::Oldest => "j.created_at ASC".into(),
        JobSort::Deadline => "j.deadline ASC, j.created_at DESC".into(),
        JobSort::SalaryHigh => format!("{SALARY_AMOUNT} DESC NULLS LAST, j.created_at DESC"),
        JobSort::SalaryLow => format!("{SALARY_AMOUNT} ASC NULLS LAST, j.created_at DESC"),
    }
}

/// `%text%` for ILIKE with the wildcard characters escaped.
fn contains_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn job_from_row(r: &PgRow) -> anyhow::Result<Job> {
    let status: String = r.get("status");
    Ok(Job {
        id: r.get("id"),
        school_id: r.get("school_id"),
        title: r.get("title"),
        description: r.get("description"),
        city: r.get("city"),
        country: r.get("country"),
        salary: r.get("salary"),
        job_type: r.get("job_type"),
        status: JobStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown job status {status:?}"))?,
        deadline: r.get("deadline"),
        subjects_taught: r.get("subjects_taught"),
        student_age_group_min: r.get("student_age_group_min"),
        student_age_group_max: r.get("student_age_group_max"),
        start_date: r.get("start_date"),
        contract_length: r.get("contract_length"),
        teaching_hours_per_week: r.get("teaching_hours_per_week"),
        qualification: r.get("qualification"),
        experience: r.get("experience"),
        language: r.get("language"),
        visa_required: r.get("visa_required"),
        teaching_license_required: r.get("teaching_license_required"),
        benefits: r.get("benefits"),
        requirements: r.get("requirements"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

fn listing_from_row(r: &PgRow) -> anyhow::Result<JobListing> {
    Ok(JobListing {
        job: job_from_row(r)?,
        school_name: r.get("school_name"),
        school_logo_url: r.get("school_logo_url"),
        application_count: r.get("application_count"),
    })
}

fn saved_from_row(r: &PgRow) -> anyhow::Result<SavedJob> {
    let status: Option<String> = r.get("application_status");
    let applied_at: Option<DateTime<Utc>> = r.get("applied_at");
    let application = match (status, applied_at) {
        (Some(status), Some(at)) => Some((
            ApplicationStatus::parse(&status)
                .ok_or_else(|| anyhow::anyhow!("unknown application status {status:?}"))?,
            at,
        )),
        _ => None,
    };
    Ok(SavedJob {
        listing: listing_from_row(r)?,
        saved_at: r.get("saved_at"),
        application,
    })
}

pub struct SqlxJobRepository {
    pub pool: PgPool,
    pub retry: RetryPolicy,
}

impl SqlxJobRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

#[async_trait]
impl JobRepository for SqlxJobRepository {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs j WHERE j.id = $1");
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, "jobs.find", move || {
            sqlx::query(sql).bind(id).fetch_optional(pool)
        })
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_for_school(&self, school_id: Uuid) -> anyhow::Result<Vec<JobListing>> {
        let sql = format!(
            "{} WHERE j.school_id = $1 ORDER BY j.created_at DESC",
            listing_select()
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = run(&self.retry, "jobs.list_for_school", move || {
            sqlx::query(sql).bind(school_id).fetch_all(pool)
        })
        .await?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn list_active(&self) -> anyhow::Result<Vec<JobListing>> {
        let sql = format!(
            "{} WHERE j.status = 'ACTIVE' ORDER BY j.created_at DESC",
            listing_select()
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = run(&self.retry, "jobs.list_active", move || {
            sqlx::query(sql).fetch_all(pool)
        })
        .await?;
        rows.iter().map(listing_from_row).collect()
    }

    async fn search_public(
        &self,
        query: &BoardQuery,
        now: DateTime<Utc>,
    ) -> anyhow::Result<JobPage> {
        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let search = query.search.as_deref().map(contains_pattern);
        let city = query.city.as_deref().map(contains_pattern);
        let (from, until) = match query.deadline.map(|w| w.bounds(now)) {
            Some((from, until)) => (Some(from), until),
            None => (None, None),
        };
        let (search, city) = (search.as_deref(), city.as_deref());
        let country = query.country.as_deref();
        let job_type = query.job_type.as_deref();
        let limit = i64::from(query.limit);
        let offset = i64::try_from(query.offset())?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM jobs j JOIN schools s ON s.id = j.school_id {BOARD_FILTER}"
        );
        let page_sql = format!(
            "{} {BOARD_FILTER} ORDER BY {} LIMIT $8 OFFSET $9",
            listing_select(),
            board_order(query.sort)
        );
        let pool = &self.pool;
        let (count_sql, page_sql) = (count_sql.as_str(), page_sql.as_str());
        let total: i64 = run(&self.retry, "jobs.board_count", move || {
            sqlx::query_scalar(count_sql)
                .bind(start_of_day)
                .bind(search)
                .bind(country)
                .bind(city)
                .bind(job_type)
                .bind(from)
                .bind(until)
                .fetch_one(pool)
        })
        .await?;
        let rows = run(&self.retry, "jobs.board_page", move || {
            sqlx::query(page_sql)
                .bind(start_of_day)
                .bind(search)
                .bind(country)
                .bind(city)
                .bind(job_type)
                .bind(from)
                .bind(until)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
        })
        .await?;
        Ok(JobPage {
            listings: rows.iter().map(listing_from_row).collect::<anyhow::Result<_>>()?,
            total: u64::try_from(total)?,
        })
    }

    async fn update(&self, job: &Job) -> anyhow::Result<Job> {
        let sql = format!(
            r#"UPDATE jobs AS j SET
                 title = $2, description = $3, city = $4, country = $5, salary = $6, job_type = $7,
                 status = $8, deadline = $9, subjects_taught = $10, start_date = $11,
                 contract_length = $12, teaching_hours_per_week = $13, qualification = $14,
                 experience = $15, language = $16, visa_required = $17,
                 teaching_license_required = $18, benefits = $19, requirements = $20,
                 updated_at = now()
               WHERE j.id = $1
               RETURNING {JOB_COLUMNS}"#
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, "jobs.update", move || {
            sqlx::query(sql)
                .bind(job.id)
                .bind(&job.title)
                .bind(&job.description)
                .bind(&job.city)
                .bind(&job.country)
                .bind(&job.salary)
                .bind(&job.job_type)
                .bind(job.status.as_str())
                .bind(job.deadline)
                .bind(&job.subjects_taught)
                .bind(job.start_date)
                .bind(&job.contract_length)
                .bind(&job.teaching_hours_per_week)
                .bind(&job.qualification)
                .bind(&job.experience)
                .bind(&job.language)
                .bind(job.visa_required)
                .bind(job.teaching_license_required)
                .bind(&job.benefits)
                .bind(&job.requirements)
                .fetch_one(pool)
        })
        .await?;
        job_from_row(&row)
    }

    async fn list_saved(&self, teacher_id: Uuid) -> anyhow::Result<Vec<SavedJob>> {
        let sql = format!(
            r#"SELECT {JOB_COLUMNS}, s.name AS school_name, s.logo_url AS school_logo_url,
                   (SELECT COUNT(*) FROM applications a WHERE a.job_id = j.id) AS application_count,
                   sj.created_at AS saved_at, ap.status AS application_status, ap.created_at AS applied_at
              FROM saved_jobs sj
              JOIN jobs j ON j.id = sj.job_id
              JOIN schools s ON s.id = j.school_id
              LEFT JOIN applications ap ON ap.job_id = sj.job_id AND ap.teacher_id = sj.teacher_id
             WHERE sj.teacher_id = $1
             ORDER BY sj.created_at DESC"#
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = run(&self.retry, "saved_jobs.list", move || {
            sqlx::query(sql).bind(teacher_id).fetch_all(pool)
        })
        .await?;
        rows.iter().map(saved_from_row).collect()
    }

    async fn add_saved(
        &self,
        teacher_id: Uuid,
        job_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        let pool = &self.pool;
        let saved_at = run(&self.retry, "saved_jobs.add", move || {
            sqlx::query_scalar(
                r#"INSERT INTO saved_jobs (teacher_id, job_id) VALUES ($1, $2)
                   ON CONFLICT ON CONSTRAINT saved_jobs_teacher_job_unique DO NOTHING
                   RETURNING created_at"#,
            )
            .bind(teacher_id)
            .bind(job_id)
            .fetch_optional(pool)
        })
        .await?;
        Ok(saved_at)
    }

    async fn remove_saved(&self, teacher_id: Uuid, job_id: Uuid) -> anyhow::Result<bool> {
        let pool = &self.pool;
        let res = run(&self.retry, "saved_jobs.remove", move || {
            sqlx::query("DELETE FROM saved_jobs WHERE teacher_id = $1 AND job_id = $2")
                .bind(teacher_id)
                .bind(job_id)
                .execute(pool)
        })
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn create(&self, school_id: Uuid, job: &NewJob) -> anyhow::Result<Job> {
        let deadline = job
            .deadline
            .ok_or_else(|| anyhow::anyhow!("job deadline is required"))?;
        let status = job.status.unwrap_or(JobStatus::Active);
        let sql = format!(
            r#"INSERT INTO jobs AS j (school_id, title, description, city, country, salary, job_type, status, deadline,
                   subjects_taught, student_age_group_min, student_age_group_max, start_date, contract_length,
                   teaching_hours_per_week, qualification, experience, language, visa_required,
                   teaching_license_required, benefits, requirements)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
               RETURNING {JOB_COLUMNS}"#
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, "jobs.create", move || {
            sqlx::query(sql)
                .bind(school_id)
                .bind(job.title.trim())
                .bind(job.description.trim())
                .bind(job.city.trim())
                .bind(job.country.trim())
                .bind(job.salary.trim())
                .bind(job.job_type.trim())
                .bind(status.as_str())
                .bind(deadline)
                .bind(&job.subjects_taught)
                .bind(job.student_age_group_min)
                .bind(job.student_age_group_max)
                .bind(job.start_date)
                .bind(&job.contract_length)
                .bind(&job.teaching_hours_per_week)
                .bind(job.qualification.as_deref().unwrap_or(""))
                .bind(job.experience.as_deref().unwrap_or(""))
                .bind(job.language.as_deref().unwrap_or("English"))
                .bind(job.visa_required)
                .bind(job.teaching_license_required)
                .bind(&job.benefits)
                .bind(&job.requirements)
                .fetch_one(pool)
        })
        .await?;
        job_from_row(&row)
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> anyhow::Result<Job> {
        let sql = format!(
            "UPDATE jobs AS j SET status = $2, updated_at = now() WHERE j.id = $1 RETURNING {JOB_COLUMNS}"
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = run(&self.retry, "jobs.set_status", move || {
            sqlx::query(sql)
                .bind(id)
                .bind(status.as_str())
                .fetch_one(pool)
        })
        .await?;
        job_from_row(&row)
    }

    async fn close_many(&self, ids: &[Uuid]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let pool = &self.pool;
        let res = run(&self.retry, "jobs.close_many", move || {
            sqlx::query(
                "UPDATE jobs SET status = 'CLOSED', updated_at = now() WHERE id = ANY($1) AND status = 'ACTIVE'",
            )
            .bind(ids)
            .execute(pool)
        })
        .await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let pool = &self.pool;
        let res = run(&self.retry, "jobs.delete", move || {
            sqlx::query("DELETE FROM jobs WHERE id = $1")
                .bind(id)
                .execute(pool)
        })
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_applications(&self, id: Uuid) -> anyhow::Result<i64> {
        let pool = &self.pool;
        let n: i64 = run(&self.retry, "jobs.count_applications", move || {
            sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE job_id = $1")
                .bind(id)
                .fetch_one(pool)
        })
        .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_query_selects_job_columns_and_count() {
        let sql = listing_select();
        assert!(sql.contains("j.teaching_license_required"));
        assert!(sql.contains("AS application_count"));
        assert!(!sql.contains("{cols}"));
    }

    #[test]
    fn search_text_is_escaped_for_ilike() {
        assert_eq!(contains_pattern("math"), "%math%");
        assert_eq!(contains_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn salary_order_uses_leading_amount() {
        assert!(board_order(JobSort::SalaryHigh).starts_with("NULLIF("));
        assert!(board_order(JobSort::SalaryLow).contains("ASC NULLS LAST"));
        assert_eq!(board_order(JobSort::Oldest), "j.created_at ASC");
    }
}

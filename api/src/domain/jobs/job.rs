use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Draft,
    Active,
    Paused,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "DRAFT",
            JobStatus::Active => "ACTIVE",
            JobStatus::Paused => "PAUSED",
            JobStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Some(JobStatus::Draft),
            "ACTIVE" => Some(JobStatus::Active),
            "PAUSED" => Some(JobStatus::Paused),
            "CLOSED" => Some(JobStatus::Closed),
            _ => None,
        }
    }

    /// Statuses a school may move a published job to.
    pub fn is_settable(&self) -> bool {
        matches!(self, JobStatus::Active | JobStatus::Paused | JobStatus::Closed)
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub description: String,
    pub city: String,
    pub country: String,
    pub salary: String,
    pub job_type: String,
    pub status: JobStatus,
    pub deadline: DateTime<Utc>,
    pub subjects_taught: Option<String>,
    pub student_age_group_min: Option<i32>,
    pub student_age_group_max: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub contract_length: Option<String>,
    pub teaching_hours_per_week: Option<String>,
    pub qualification: String,
    pub experience: String,
    pub language: String,
    pub visa_required: bool,
    pub teaching_license_required: bool,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a job refuses new applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    NotActive,
    DeadlinePassed,
}

impl Refusal {
    pub fn message(&self) -> &'static str {
        match self {
            Refusal::NotActive => "This job is no longer accepting applications",
            Refusal::DeadlinePassed => "Application deadline has passed",
        }
    }
}

impl Job {
    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }

    /// Strictly after the deadline instant.
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Status first, then the deadline.
    pub fn check_accepting(&self, now: DateTime<Utc>) -> Result<(), Refusal> {
        if self.status != JobStatus::Active {
            return Err(Refusal::NotActive);
        }
        if self.deadline_passed(now) {
            return Err(Refusal::DeadlinePassed);
        }
        Ok(())
    }

    /// Active listings close once the whole deadline day (UTC) is over.
    pub fn needs_auto_close(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Active && now > end_of_day(self.deadline)
    }
}

fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = at.date_naive().and_time(NaiveTime::MIN).and_utc();
    midnight + Duration::days(1) - Duration::milliseconds(1)
}

/// Fields a school must provide for any new job.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub city: String,
    pub country: String,
    pub salary: String,
    pub job_type: String,
    pub status: Option<JobStatus>,
    pub deadline: Option<DateTime<Utc>>,
    pub subjects_taught: Option<String>,
    pub student_age_group_min: Option<i32>,
    pub student_age_group_max: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub contract_length: Option<String>,
    pub teaching_hours_per_week: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub language: Option<String>,
    pub visa_required: bool,
    pub teaching_license_required: bool,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
}

impl NewJob {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("city", &self.city),
            ("country", &self.country),
            ("salary", &self.salary),
            ("type", &self.job_type),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if self.deadline.is_none() {
            missing.push("deadline");
        }
        missing
    }

    pub fn is_draft(&self) -> bool {
        self.status == Some(JobStatus::Draft)
    }
}

/// Partial edit of a posted job; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub status: Option<JobStatus>,
    pub deadline: Option<DateTime<Utc>>,
    pub subjects_taught: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub contract_length: Option<String>,
    pub teaching_hours_per_week: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub language: Option<String>,
    pub visa_required: Option<bool>,
    pub teaching_license_required: Option<bool>,
    pub benefits: Option<String>,
    pub requirements: Option<String>,
}

impl Job {
    /// Applies `changes` and names the fields that were sent, in request order.
    /// Required text fields cannot be blanked.
    pub fn apply(&mut self, changes: &JobChanges) -> Result<Vec<&'static str>, &'static str> {
        let required = [
            ("title", &changes.title),
            ("description", &changes.description),
            ("city", &changes.city),
            ("country", &changes.country),
            ("salary", &changes.salary),
            ("type", &changes.job_type),
        ];
        if required
            .iter()
            .any(|(_, v)| v.as_deref().is_some_and(|v| v.trim().is_empty()))
        {
            return Err("Required job fields cannot be empty");
        }
        let mut changed = Vec::new();
        let mut set = |name: &'static str, slot: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *slot = v.trim().to_string();
                changed.push(name);
            }
        };
        set("title", &mut self.title, &changes.title);
        set("description", &mut self.description, &changes.description);
        set("city", &mut self.city, &changes.city);
        set("country", &mut self.country, &changes.country);
        set("salary", &mut self.salary, &changes.salary);
        set("qualification", &mut self.qualification, &changes.qualification);
        set("experience", &mut self.experience, &changes.experience);
        set("language", &mut self.language, &changes.language);
        if let Some(t) = &changes.job_type {
            self.job_type = t.trim().to_ascii_uppercase();
            changed.push("type");
        }
        let mut set_opt = |name: &'static str, slot: &mut Option<String>, value: &Option<String>| {
            if let Some(v) = value {
                let v = v.trim();
                *slot = (!v.is_empty()).then(|| v.to_string());
                changed.push(name);
            }
        };
        set_opt("subjectsTaught", &mut self.subjects_taught, &changes.subjects_taught);
        set_opt("contractLength", &mut self.contract_length, &changes.contract_length);
        set_opt(
            "teachingHoursPerWeek",
            &mut self.teaching_hours_per_week,
            &changes.teaching_hours_per_week,
        );
        set_opt("benefits", &mut self.benefits, &changes.benefits);
        set_opt("requirements", &mut self.requirements, &changes.requirements);
        if let Some(v) = changes.deadline {
            self.deadline = v;
            changed.push("deadline");
        }
        if let Some(v) = changes.start_date {
            self.start_date = Some(v);
            changed.push("startDate");
        }
        if let Some(v) = changes.visa_required {
            self.visa_required = v;
            changed.push("visaRequired");
        }
        if let Some(v) = changes.teaching_license_required {
            self.teaching_license_required = v;
            changed.push("teachingLicenseRequired");
        }
        if let Some(v) = changes.status {
            self.status = v;
            changed.push("status");
        }
        Ok(changed)
    }
}

/// First number in a free-text salary such as `$2,800 - $3,500/month`.
pub fn salary_amount(salary: &str) -> Option<i64> {
    let start = salary.find(|c: char| c.is_ascii_digit())?;
    let digits: String = salary[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .take(18)
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
pub(crate) fn sample_job(status: JobStatus, deadline: DateTime<Utc>) -> Job {
    let now = Utc::now();
    Job {
        id: Uuid::new_v4(),
        school_id: Uuid::new_v4(),
        title: "Math Teacher".into(),
        description: "Teach grades 7-9".into(),
        city: "Astana".into(),
        country: "Kazakhstan".into(),
        salary: "$2000".into(),
        job_type: "FULL_TIME".into(),
        status,
        deadline,
        subjects_taught: None,
        student_age_group_min: None,
        student_age_group_max: None,
        start_date: None,
        contract_length: None,
        teaching_hours_per_week: None,
        qualification: String::new(),
        experience: String::new(),
        language: "English".into(),
        visa_required: false,
        teaching_license_required: false,
        benefits: None,
        requirements: None,
        created_at: now,
        updated_at: now,
    }
}

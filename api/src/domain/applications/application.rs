use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    Reviewing,
    Interview,
    Declined,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Reviewing => "REVIEWING",
            ApplicationStatus::Interview => "INTERVIEW",
            ApplicationStatus::Declined => "DECLINED",
            ApplicationStatus::Hired => "HIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPLIED" => Some(ApplicationStatus::Applied),
            "REVIEWING" => Some(ApplicationStatus::Reviewing),
            "INTERVIEW" => Some(ApplicationStatus::Interview),
            "DECLINED" => Some(ApplicationStatus::Declined),
            "HIRED" => Some(ApplicationStatus::Hired),
            _ => None,
        }
    }

    /// Human label used in emails.
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Reviewing => "Under Review",
            ApplicationStatus::Interview => "Interview Scheduled",
            ApplicationStatus::Hired => "Hired",
            ApplicationStatus::Declined => "Not Selected",
        }
    }

    /// Applicants still waiting on a decision; they hear about a job closing.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Applied | ApplicationStatus::Reviewing | ApplicationStatus::Interview
        )
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestApplicant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl GuestApplicant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn path_name(&self) -> String {
        format!("{}-{}", self.first_name, self.last_name)
    }

    pub fn location(&self) -> String {
        match (self.city.as_deref(), self.country.as_deref()) {
            (Some(c), Some(k)) => format!("{c}, {k}"),
            (Some(c), None) => c.to_string(),
            (None, Some(k)) => k.to_string(),
            (None, None) => "Not specified".to_string(),
        }
    }

    /// Uniqueness key for guest submissions on a job.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// Who submitted an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicant {
    Teacher(Uuid),
    Guest(GuestApplicant),
}

impl Applicant {
    pub fn duplicate_message(&self) -> &'static str {
        match self {
            Applicant::Teacher(_) => "You have already applied for this job",
            Applicant::Guest(_) => {
                "An application from this email address has already been submitted for this job"
            }
        }
    }

    pub fn teacher_id(&self) -> Option<Uuid> {
        match self {
            Applicant::Teacher(id) => Some(*id),
            Applicant::Guest(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant: Applicant,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub interview_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ApplicationNote {
    pub id: Uuid,
    pub application_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::subscriptions::plan::SubscriptionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Teacher,
    School,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Teacher => "TEACHER",
            UserType::School => "SCHOOL",
        }
    }

    /// Case-insensitive; accepts `teacher`, `TEACHER`, `School`, ...
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEACHER" => Some(UserType::Teacher),
            "SCHOOL" => Some(UserType::School),
            _ => None,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            UserType::Teacher => UserType::School,
            UserType::School => UserType::Teacher,
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserType::Teacher => "/teachers/dashboard",
            UserType::School => "/schools/dashboard",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct TeacherProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub experience_years: Option<i32>,
    pub resume_url: Option<String>,
    pub photo_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub bio: Option<String>,
    pub subjects: Vec<String>,
    pub certifications: Vec<String>,
    pub languages: Vec<String>,
    pub availability: Option<String>,
    pub profile_complete: bool,
    pub last_active: Option<DateTime<Utc>>,
}

fn filled(v: Option<&str>) -> bool {
    v.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn replace_text(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value {
        let v = v.trim();
        *slot = (!v.is_empty()).then(|| v.to_string());
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fields a teacher may edit on their own profile; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TeacherProfileEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub availability: Option<String>,
}

impl TeacherProfile {
    /// Every core field filled and at least three of the supporting ones.
    pub fn is_complete(&self) -> bool {
        let core = [
            Some(self.first_name.as_str()),
            Some(self.last_name.as_str()),
            self.phone.as_deref(),
            self.city.as_deref(),
            self.country.as_deref(),
            self.qualification.as_deref(),
            self.experience.as_deref(),
            self.bio.as_deref(),
        ];
        if !core.into_iter().all(filled) {
            return false;
        }
        let supporting = [
            filled(self.resume_url.as_deref()),
            !self.certifications.is_empty(),
            !self.subjects.is_empty(),
            !self.languages.is_empty(),
            filled(self.availability.as_deref()),
        ];
        supporting.into_iter().filter(|f| *f).count() >= 3
    }

    /// Applies `edit` and refreshes `profile_complete`. Blank names are refused.
    pub fn apply(&mut self, edit: &TeacherProfileEdit) -> Result<(), &'static str> {
        for name in [&edit.first_name, &edit.last_name].into_iter().flatten() {
            if name.trim().is_empty() {
                return Err("First name and last name cannot be empty");
            }
        }
        if let Some(years) = edit.experience_years {
            if years < 0 {
                return Err("Experience years cannot be negative");
            }
            self.experience_years = Some(years);
        }
        if let Some(v) = &edit.first_name {
            self.first_name = v.trim().to_string();
        }
        if let Some(v) = &edit.last_name {
            self.last_name = v.trim().to_string();
        }
        replace_text(&mut self.phone, &edit.phone);
        replace_text(&mut self.city, &edit.city);
        replace_text(&mut self.country, &edit.country);
        replace_text(&mut self.qualification, &edit.qualification);
        replace_text(&mut self.experience, &edit.experience);
        replace_text(&mut self.bio, &edit.bio);
        replace_text(&mut self.availability, &edit.availability);
        if let Some(v) = &edit.subjects {
            self.subjects = clean_list(v);
        }
        if let Some(v) = &edit.certifications {
            self.certifications = clean_list(v);
        }
        if let Some(v) = &edit.languages {
            self.languages = clean_list(v);
        }
        self.profile_complete = self.is_complete();
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Name fragment used in blob paths, e.g. `Jane-Doe`.
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

    pub fn experience_label(&self) -> String {
        self.experience_years
            .map(|y| y.to_string())
            .or_else(|| self.experience.clone())
            .unwrap_or_else(|| "Not specified".to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchoolProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub photo_url: Option<String>,
    pub telephone: Option<String>,
    pub street_address: Option<String>,
    pub school_type: Option<String>,
    pub website: Option<String>,
    pub established: Option<i32>,
    pub student_count: Option<i32>,
    pub subscription: SubscriptionState,
}

/// School profile form. Name, contact, city and country are always sent.
#[derive(Debug, Clone, Default)]
pub struct SchoolProfileEdit {
    pub name: String,
    pub contact_name: String,
    pub city: String,
    pub country: String,
    pub contact_email: Option<String>,
    pub telephone: Option<String>,
    pub street_address: Option<String>,
    pub school_type: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub established: Option<i32>,
    pub student_count: Option<i32>,
}

impl SchoolProfileEdit {
    pub fn missing_required(&self) -> bool {
        [&self.name, &self.contact_name, &self.city, &self.country]
            .iter()
            .any(|v| v.trim().is_empty())
    }
}

impl SchoolProfile {
    /// Where school-facing notifications go: the contact address when set, else the login email.
    pub fn notification_email(&self) -> &str {
        self.contact_email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Profile fields a school must fill in before publishing a job.
    pub fn missing_posting_fields(&self) -> Vec<&'static str> {
        let blank = |v: Option<&str>| v.map(|s| s.trim().is_empty()).unwrap_or(true);
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if blank(self.contact_name.as_deref()) {
            missing.push("contactName");
        }
        if blank(self.city.as_deref()) {
            missing.push("city");
        }
        if blank(self.country.as_deref()) {
            missing.push("country");
        }
        missing
    }

    /// Share of the profile checklist that is filled in, 0 to 100.
    pub fn completion_percentage(&self) -> u8 {
        let text = [
            Some(self.name.as_str()),
            self.contact_name.as_deref(),
            self.telephone.as_deref(),
            self.street_address.as_deref(),
            self.city.as_deref(),
            self.country.as_deref(),
            self.school_type.as_deref(),
            self.description.as_deref(),
            self.website.as_deref(),
            self.logo_url.as_deref(),
        ];
        let done = text.into_iter().filter(|v| filled(*v)).count()
            + usize::from(self.established.is_some())
            + usize::from(self.student_count.is_some_and(|n| n > 0));
        ((done * 100 + 6) / 12) as u8
    }

    pub fn apply(&mut self, edit: &SchoolProfileEdit) {
        self.name = edit.name.trim().to_string();
        self.contact_name = Some(edit.contact_name.trim().to_string());
        self.city = Some(edit.city.trim().to_string());
        self.country = Some(edit.country.trim().to_string());
        replace_text(&mut self.contact_email, &edit.contact_email);
        replace_text(&mut self.telephone, &edit.telephone);
        replace_text(&mut self.street_address, &edit.street_address);
        replace_text(&mut self.school_type, &edit.school_type);
        replace_text(&mut self.website, &edit.website);
        replace_text(&mut self.description, &edit.description);
        if edit.established.is_some() {
            self.established = edit.established;
        }
        if let Some(n) = edit.student_count {
            self.student_count = (n > 0).then_some(n);
        }
    }

    pub fn author_name(&self) -> String {
        self.contact_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.name.clone())
    }
}

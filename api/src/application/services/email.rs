use std::collections::HashMap;

use chrono::{Datelike, Utc};
use htmlescape::encode_minimal as esc;

use crate::domain::applications::application::ApplicationStatus;

/// Every email the platform sends. Each variant carries exactly the data its
/// template needs.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    TeacherWelcome {
        first_name: String,
        last_name: String,
    },
    SchoolWelcome {
        school_name: String,
        plan_name: String,
        job_limit: String,
    },
    ApplicationReceived {
        job_title: String,
        job_location: String,
        teacher_name: String,
        teacher_qualification: String,
        teacher_experience: String,
        teacher_location: String,
        cover_letter: Option<String>,
    },
    ApplicationStatusUpdate {
        teacher_name: String,
        job_title: String,
        school_name: String,
        status: ApplicationStatus,
        note: Option<String>,
    },
    PasswordReset {
        name: String,
        token: String,
    },
    SubscriptionChanged {
        school_name: String,
        action: String,
        plan_name: String,
    },
    JobClosed {
        applicant_name: String,
        job_title: String,
        school_name: String,
        location: String,
    },
    GuestApplicationConfirmation {
        first_name: String,
        job_title: String,
        school_name: String,
        location: String,
        application_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Fills `{key}` placeholders; unknown keys are left as written.
pub fn fill_placeholders(template: &str, data: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end)
                if after[..end]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                    && !after[..end].is_empty() =>
            {
                let key = &after[..end];
                match data.get(key).filter(|v| !v.is_empty()) {
                    Some(v) => out.push_str(v),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

struct Body {
    heading: &'static str,
    paragraphs: Vec<String>,
    details: Vec<(&'static str, String)>,
    action: Option<(&'static str, String)>,
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::TeacherWelcome { .. } => "teacherWelcome",
            EmailTemplate::SchoolWelcome { .. } => "schoolWelcome",
            EmailTemplate::ApplicationReceived { .. } => "applicationReceived",
            EmailTemplate::ApplicationStatusUpdate { .. } => "applicationStatusUpdate",
            EmailTemplate::PasswordReset { .. } => "passwordReset",
            EmailTemplate::SubscriptionChanged { .. } => "subscriptionChanged",
            EmailTemplate::JobClosed { .. } => "jobClosed",
            EmailTemplate::GuestApplicationConfirmation { .. } => "guestApplicationConfirmation",
        }
    }

    fn subject_template(&self) -> &'static str {
        match self {
            EmailTemplate::TeacherWelcome { .. } => {
                "Welcome to NTCA - Your Teaching Journey Starts Here!"
            }
            EmailTemplate::SchoolWelcome { .. } => {
                "Welcome to NTCA - Start Hiring Qualified Teachers"
            }
            EmailTemplate::ApplicationReceived { .. } => "New Application for {jobTitle}",
            EmailTemplate::ApplicationStatusUpdate { .. } => {
                "Application Update: {jobTitle} at {schoolName}"
            }
            EmailTemplate::PasswordReset { .. } => "Reset Your NTCA Password",
            EmailTemplate::SubscriptionChanged { .. } => "Your NTCA Subscription Has Been Updated",
            EmailTemplate::JobClosed { .. } => "Position Closed: {jobTitle} at {schoolName}",
            EmailTemplate::GuestApplicationConfirmation { .. } => {
                "Application Confirmation: {jobTitle}"
            }
        }
    }

    fn subject_data(&self) -> HashMap<&'static str, String> {
        let mut data = HashMap::new();
        match self {
            EmailTemplate::ApplicationReceived { job_title, .. }
            | EmailTemplate::GuestApplicationConfirmation { job_title, .. } => {
                data.insert("jobTitle", job_title.clone());
            }
            EmailTemplate::ApplicationStatusUpdate {
                job_title,
                school_name,
                ..
            }
            | EmailTemplate::JobClosed {
                job_title,
                school_name,
                ..
            } => {
                data.insert("jobTitle", job_title.clone());
                data.insert("schoolName", school_name.clone());
            }
            _ => {}
        }
        data
    }

    fn body(&self, site: &str) -> Body {
        match self {
            EmailTemplate::TeacherWelcome {
                first_name,
                last_name,
            } => Body {
                heading: "Welcome to NTCA!",
                paragraphs: vec![
                    format!("Hi {first_name} {last_name},"),
                    "Your teacher account is ready. Complete your profile and upload your resume to start applying for teaching positions.".into(),
                ],
                details: vec![],
                action: Some(("Go to Dashboard", format!("{site}/teachers/dashboard"))),
            },
            EmailTemplate::SchoolWelcome {
                school_name,
                plan_name,
                job_limit,
            } => Body {
                heading: "Welcome to NTCA!",
                paragraphs: vec![
                    format!("Welcome, {school_name}."),
                    "Your school account is ready. You can now post openings and review applications from qualified teachers.".into(),
                ],
                details: vec![("Plan", plan_name.clone()), ("Job postings", job_limit.clone())],
                action: Some(("Post a Job", format!("{site}/schools/dashboard"))),
            },
            EmailTemplate::ApplicationReceived {
                job_title,
                job_location,
                teacher_name,
                teacher_qualification,
                teacher_experience,
                teacher_location,
                cover_letter,
            } => {
                let mut paragraphs =
                    vec!["Great news! You've received a new application for your job posting.".to_string()];
                if let Some(letter) = cover_letter.as_deref().filter(|l| !l.trim().is_empty()) {
                    paragraphs.push(format!("Cover letter preview: \"{}\"", preview(letter, 200)));
                }
                Body {
                    heading: "New Application Received",
                    paragraphs,
                    details: vec![
                        ("Position", job_title.clone()),
                        ("Location", job_location.clone()),
                        ("Name", teacher_name.clone()),
                        ("Qualification", teacher_qualification.clone()),
                        ("Experience", format!("{teacher_experience} years")),
                        ("Applicant location", teacher_location.clone()),
                    ],
                    action: Some((
                        "Review Application",
                        format!("{site}/schools/dashboard?tab=applications"),
                    )),
                }
            }
            EmailTemplate::ApplicationStatusUpdate {
                teacher_name,
                job_title,
                school_name,
                status,
                note,
            } => {
                let mut paragraphs = vec![
                    format!("Hi {teacher_name},"),
                    format!("Your application status has been updated for the position at {school_name}."),
                ];
                match status {
                    ApplicationStatus::Interview => paragraphs.push(
                        "Congratulations! You've been selected for an interview. The school will contact you shortly with details.".into(),
                    ),
                    ApplicationStatus::Hired => paragraphs.push(format!(
                        "Congratulations! You've been hired! Welcome to your new teaching position at {school_name}."
                    )),
                    _ => {}
                }
                let mut details = vec![
                    ("Position", job_title.clone()),
                    ("School", school_name.clone()),
                    ("Status", status.label().to_string()),
                ];
                if let Some(n) = note.as_deref().filter(|n| !n.trim().is_empty()) {
                    details.push(("Message from school", n.to_string()));
                }
                Body {
                    heading: "Application Status Update",
                    paragraphs,
                    details,
                    action: Some((
                        "View Application",
                        format!("{site}/teachers/dashboard?tab=applications"),
                    )),
                }
            }
            EmailTemplate::PasswordReset { name, token } => Body {
                heading: "Password Reset Request",
                paragraphs: vec![
                    format!("Hi {name},"),
                    "You requested to reset your password for your NTCA account. Click the button below to create a new password.".into(),
                    "This link will expire in 1 hour.".into(),
                    "If you didn't request this password reset, please ignore this email. Your password will remain unchanged.".into(),
                ],
                details: vec![],
                action: Some((
                    "Reset Password",
                    format!("{site}/reset-password?token={}", urlencoding::encode(token)),
                )),
            },
            EmailTemplate::SubscriptionChanged {
                school_name,
                action,
                plan_name,
            } => Body {
                heading: "Subscription Updated",
                paragraphs: vec![
                    format!("Hi {school_name},"),
                    format!("Your subscription has been {action}."),
                ],
                details: vec![("Plan", plan_name.clone())],
                action: Some(("Manage Subscription", format!("{site}/schools/subscription"))),
            },
            EmailTemplate::JobClosed {
                applicant_name,
                job_title,
                school_name,
                location,
            } => Body {
                heading: "Position Closed",
                paragraphs: vec![
                    format!("Hi {applicant_name},"),
                    format!("{school_name} has closed the position you applied for and is no longer reviewing applications. Thank you for your interest."),
                ],
                details: vec![
                    ("Position", job_title.clone()),
                    ("School", school_name.clone()),
                    ("Location", location.clone()),
                ],
                action: Some(("Browse Open Positions", format!("{site}/jobs"))),
            },
            EmailTemplate::GuestApplicationConfirmation {
                first_name,
                job_title,
                school_name,
                location,
                application_id,
            } => Body {
                heading: "Application Received",
                paragraphs: vec![
                    format!("Hi {first_name},"),
                    format!("Thank you for applying to {school_name}. Your application has been forwarded to the school."),
                    "Create a free teacher account to track your applications and apply faster next time.".into(),
                ],
                details: vec![
                    ("Position", job_title.clone()),
                    ("School", school_name.clone()),
                    ("Location", location.clone()),
                    ("Application ID", application_id.clone()),
                ],
                action: Some(("Create Account", format!("{site}/register?type=teacher"))),
            },
        }
    }

    /// Renders subject, HTML and plain text. All user data is HTML-escaped.
    pub fn render(&self, site_url: &str) -> RenderedEmail {
        let site = site_url.trim_end_matches('/');
        let subject = fill_placeholders(self.subject_template(), &self.subject_data());
        let body = self.body(site);

        let mut html = String::from(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
             <body style=\"margin:0;padding:0;font-family:Arial,sans-serif;background-color:#f3f4f6;\">\
             <div style=\"max-width:600px;margin:0 auto;background-color:#ffffff;padding:40px 20px;\">",
        );
        html.push_str(&format!(
            "<h1 style=\"color:#2563eb;text-align:center;\">{}</h1>",
            esc(body.heading)
        ));
        let mut text = format!("{}\n\n", body.heading);
        for p in &body.paragraphs {
            html.push_str(&format!(
                "<p style=\"color:#4b5563;line-height:1.6;\">{}</p>",
                esc(p)
            ));
            text.push_str(p);
            text.push_str("\n\n");
        }
        if !body.details.is_empty() {
            html.push_str("<div style=\"background:#f9fafb;border:1px solid #e5e7eb;padding:20px;border-radius:8px;\">");
            for (label, value) in &body.details {
                html.push_str(&format!(
                    "<p style=\"color:#4b5563;margin:5px 0;\"><strong>{}:</strong> {}</p>",
                    esc(label),
                    esc(value)
                ));
                text.push_str(&format!("{label}: {value}\n"));
            }
            html.push_str("</div>");
            text.push('\n');
        }
        if let Some((label, href)) = &body.action {
            html.push_str(&format!(
                "<div style=\"text-align:center;margin:30px 0;\"><a href=\"{}\" \
                 style=\"display:inline-block;background:#2563eb;color:white;padding:14px 30px;text-decoration:none;border-radius:6px;\">{}</a></div>",
                esc(href),
                esc(label)
            ));
            text.push_str(&format!("{label}: {href}\n\n"));
        }
        let footer = format!(
            "© {} National Teaching Certification Authority. All rights reserved.",
            Utc::now().year()
        );
        html.push_str(&format!(
            "<p style=\"color:#9ca3af;font-size:12px;border-top:1px solid #e5e7eb;padding-top:20px;\">{}</p></div></body></html>",
            esc(&footer)
        ));
        text.push_str(&footer);

        RenderedEmail {
            subject,
            html,
            text,
        }
    }
}

fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

//! In-memory port implementations for use-case and router tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::ports::activity_log::ActivityLog;
use crate::application::ports::application_repository::{
    ApplicantContact, ApplicationRepository, ApplicationView, NewApplication, StatusChange,
};
use crate::application::ports::blob_storage::{BlobStorage, StoredBlob};
use crate::application::ports::job_repository::{JobListing, JobPage, JobRepository, SavedJob};
use crate::application::ports::mailer::{Delivery, Mailer, OutgoingEmail};
use crate::application::ports::messaging_repository::{
    ConversationOverview, Counterpart, MessagingRepository, Participant,
};
use crate::application::ports::profile_repository::{ProfileRepository, SubscriptionUpdate};
use crate::application::ports::user_repository::{
    CreatedProfile, NewProfile, UserRepository,
};
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::{SchoolProfile, TeacherProfile, User, UserType};
use crate::domain::activity::{ActivityAction, ActivityEntry};
use crate::domain::applications::application::{
    Applicant, Application, ApplicationNote, ApplicationStatus,
};
use crate::domain::jobs::board::BoardQuery;
use crate::domain::jobs::job::{Job, JobStatus, NewJob, sample_job};
use crate::domain::messaging::message::{Conversation, Message};
use crate::domain::subscriptions::plan::{SubscriptionState, SubscriptionStatus};
use crate::domain::uploads::upload::UploadKind;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    reset_tokens: HashMap<Uuid, (String, DateTime<Utc>)>,
    teachers: HashMap<Uuid, TeacherProfile>,
    schools: HashMap<Uuid, SchoolProfile>,
    jobs: HashMap<Uuid, Job>,
    applications: Vec<Application>,
    notes: Vec<ApplicationNote>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    saved_jobs: Vec<(Uuid, Uuid, DateTime<Utc>)>,
}

/// One shared in-memory database behind every repository port.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.lock().expect("memory store lock");
        f(&mut guard)
    }

    pub fn applications(&self) -> Vec<Application> {
        self.with(|s| s.applications.clone())
    }

    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.with(|s| s.jobs.get(&id).cloned())
    }

    pub fn teacher(&self, id: Uuid) -> Option<TeacherProfile> {
        self.with(|s| s.teachers.get(&id).cloned())
    }

    pub fn school(&self, id: Uuid) -> Option<SchoolProfile> {
        self.with(|s| s.schools.get(&id).cloned())
    }

    pub fn all_messages(&self) -> Vec<Message> {
        self.with(|s| s.messages.clone())
    }

    pub fn insert_message(&self, m: Message) {
        self.with(|s| s.messages.push(m));
    }

    pub fn update_school(&self, id: Uuid, f: impl FnOnce(&mut SchoolProfile)) {
        self.with(|s| {
            if let Some(school) = s.schools.get_mut(&id) {
                f(school);
            }
        });
    }

    pub fn update_teacher(&self, id: Uuid, f: impl FnOnce(&mut TeacherProfile)) {
        self.with(|s| {
            if let Some(t) = s.teachers.get_mut(&id) {
                f(t);
            }
        });
    }

    pub fn update_job(&self, id: Uuid, f: impl FnOnce(&mut Job)) {
        self.with(|s| {
            if let Some(job) = s.jobs.get_mut(&id) {
                f(job);
            }
        });
    }

    pub fn saved_job_ids(&self, teacher_id: Uuid) -> Vec<Uuid> {
        self.with(|s| {
            s.saved_jobs
                .iter()
                .filter(|(t, _, _)| *t == teacher_id)
                .map(|(_, j, _)| *j)
                .collect()
        })
    }

    pub fn update_conversation(&self, id: Uuid, f: impl FnOnce(&mut Conversation)) {
        self.with(|s| {
            if let Some(c) = s.conversations.iter_mut().find(|c| c.id == id) {
                f(c);
            }
        });
    }
}

fn view(s: &State, a: &Application) -> ApplicationView {
    let job = s.jobs.get(&a.job_id);
    let school = job.and_then(|j| s.schools.get(&j.school_id));
    let (applicant_name, applicant_email) = match &a.applicant {
        Applicant::Teacher(id) => s
            .teachers
            .get(id)
            .map(|t| (t.full_name(), t.email.clone()))
            .unwrap_or_default(),
        Applicant::Guest(g) => (g.full_name(), g.email.clone()),
    };
    ApplicationView {
        application: a.clone(),
        job_title: job.map(|j| j.title.clone()).unwrap_or_default(),
        school_id: school.map(|s| s.id).unwrap_or_default(),
        school_name: school.map(|s| s.name.clone()).unwrap_or_default(),
        applicant_name,
        applicant_email,
        notes: s
            .notes
            .iter()
            .filter(|n| n.application_id == a.id)
            .cloned()
            .collect(),
    }
}

fn listing(s: &State, job: &Job) -> JobListing {
    let school = s.schools.get(&job.school_id);
    JobListing {
        job: job.clone(),
        school_name: school.map(|s| s.name.clone()).unwrap_or_default(),
        school_logo_url: school.and_then(|s| s.logo_url.clone()),
        application_count: s.applications.iter().filter(|a| a.job_id == job.id).count() as i64,
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.with(|s| {
            s.users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.with(|s| s.users.get(&id).cloned()))
    }

    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        profile: &NewProfile,
    ) -> anyhow::Result<Option<(User, CreatedProfile)>> {
        self.with(|s| {
            if s.users.values().any(|u| u.email.eq_ignore_ascii_case(email)) {
                return Ok(None);
            }
            let user_type = match profile {
                NewProfile::Teacher(_) => UserType::Teacher,
                NewProfile::School(_) => UserType::School,
            };
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                user_type,
                password_hash: Some(password_hash.to_string()),
                created_at: Utc::now(),
            };
            let created = match profile {
                NewProfile::Teacher(t) => {
                    let p = TeacherProfile {
                        id: Uuid::new_v4(),
                        user_id: user.id,
                        email: email.to_string(),
                        first_name: t.first_name.clone(),
                        last_name: t.last_name.clone(),
                        phone: Some(t.phone.clone()),
                        city: Some(t.city.clone()),
                        country: Some(t.country.clone()),
                        qualification: Some(t.qualification.clone()),
                        experience: Some(t.experience.clone()),
                        ..Default::default()
                    };
                    s.teachers.insert(p.id, p.clone());
                    CreatedProfile::Teacher(p)
                }
                NewProfile::School(n) => {
                    let p = SchoolProfile {
                        id: Uuid::new_v4(),
                        user_id: user.id,
                        email: email.to_string(),
                        name: n.name.clone(),
                        contact_name: Some(n.contact_name.clone()),
                        contact_email: n.contact_email.clone(),
                        city: Some(n.city.clone()),
                        country: Some(n.country.clone()),
                        description: n.description.clone(),
                        ..Default::default()
                    };
                    s.schools.insert(p.id, p.clone());
                    CreatedProfile::School(p)
                }
            };
            s.users.insert(user.id, user.clone());
            Ok(Some((user, created)))
        })
    }

    async fn store_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.with(|s| {
            s.reset_tokens
                .insert(user_id, (token_hash.to_string(), expires_at))
        });
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<User>> {
        Ok(self.with(|s| {
            s.reset_tokens
                .iter()
                .find(|(_, (h, exp))| h == token_hash && *exp > now)
                .and_then(|(uid, _)| s.users.get(uid).cloned())
        }))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        self.with(|s| {
            if let Some(u) = s.users.get_mut(&user_id) {
                u.password_hash = Some(password_hash.to_string());
            }
            s.reset_tokens.remove(&user_id);
        });
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn teacher_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<TeacherProfile>> {
        Ok(self.with(|s| s.teachers.values().find(|t| t.user_id == user_id).cloned()))
    }

    async fn teacher_by_id(&self, id: Uuid) -> anyhow::Result<Option<TeacherProfile>> {
        Ok(self.with(|s| s.teachers.get(&id).cloned()))
    }

    async fn school_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<SchoolProfile>> {
        Ok(self.with(|s| s.schools.values().find(|p| p.user_id == user_id).cloned()))
    }

    async fn school_by_id(&self, id: Uuid) -> anyhow::Result<Option<SchoolProfile>> {
        Ok(self.with(|s| s.schools.get(&id).cloned()))
    }

    async fn school_by_customer(
        &self,
        customer_id: &str,
    ) -> anyhow::Result<Option<SchoolProfile>> {
        Ok(self.with(|s| {
            s.schools
                .values()
                .find(|p| p.subscription.customer_id.as_deref() == Some(customer_id))
                .cloned()
        }))
    }

    async fn set_teacher_file(
        &self,
        teacher_id: Uuid,
        kind: UploadKind,
        url: &str,
    ) -> anyhow::Result<()> {
        self.update_teacher(teacher_id, |t| match kind {
            UploadKind::Resume => t.resume_url = Some(url.to_string()),
            UploadKind::Photo => t.photo_url = Some(url.to_string()),
            UploadKind::Portfolio => t.portfolio_url = Some(url.to_string()),
            _ => {}
        });
        Ok(())
    }

    async fn set_school_file(
        &self,
        school_id: Uuid,
        kind: UploadKind,
        url: &str,
    ) -> anyhow::Result<()> {
        self.update_school(school_id, |p| match kind {
            UploadKind::Logo => p.logo_url = Some(url.to_string()),
            UploadKind::CoverPhoto => p.cover_photo_url = Some(url.to_string()),
            UploadKind::Photo => p.photo_url = Some(url.to_string()),
            _ => {}
        });
        Ok(())
    }

    async fn save_teacher(&self, profile: &TeacherProfile) -> anyhow::Result<TeacherProfile> {
        self.with(|s| match s.teachers.get_mut(&profile.id) {
            Some(t) => {
                *t = TeacherProfile {
                    last_active: Some(Utc::now()),
                    ..profile.clone()
                };
                Ok(t.clone())
            }
            None => Err(anyhow!("teacher missing")),
        })
    }

    async fn save_school(&self, profile: &SchoolProfile) -> anyhow::Result<SchoolProfile> {
        self.with(|s| match s.schools.get_mut(&profile.id) {
            Some(p) => {
                *p = profile.clone();
                Ok(p.clone())
            }
            None => Err(anyhow!("school missing")),
        })
    }

    async fn touch_teacher(&self, teacher_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.update_teacher(teacher_id, |t| t.last_active = Some(at));
        Ok(())
    }

    async fn fill_school_description(&self, school_id: Uuid, text: &str) -> anyhow::Result<()> {
        self.update_school(school_id, |p| {
            if p.description.as_deref().map(str::trim).unwrap_or("").is_empty() {
                p.description = Some(text.to_string());
            }
        });
        Ok(())
    }

    async fn update_subscription(
        &self,
        school_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> anyhow::Result<()> {
        self.update_school(school_id, |p| {
            let sub = &mut p.subscription;
            if let Some(v) = &update.subscription_id {
                sub.subscription_id = Some(v.clone());
            }
            if let Some(v) = &update.status {
                sub.status = SubscriptionStatus::parse(Some(v.as_str()));
            }
            if let Some(v) = &update.plan_name {
                sub.plan_name = Some(v.clone());
            }
            if let Some(v) = update.current_period_end {
                sub.current_period_end = Some(v);
            }
            if let Some(v) = update.cancel_at_period_end {
                sub.cancel_at_period_end = v;
            }
            if let Some(v) = update.subscription_end_date {
                sub.subscription_end_date = Some(v);
            }
        });
        Ok(())
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        Ok(self.job(id))
    }

    async fn list_for_school(&self, school_id: Uuid) -> anyhow::Result<Vec<JobListing>> {
        Ok(self.with(|s| {
            let mut jobs: Vec<&Job> = s.jobs.values().filter(|j| j.school_id == school_id).collect();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            jobs.into_iter().map(|j| listing(s, j)).collect()
        }))
    }

    async fn list_active(&self) -> anyhow::Result<Vec<JobListing>> {
        Ok(self.with(|s| {
            let mut jobs: Vec<&Job> = s
                .jobs
                .values()
                .filter(|j| j.status == JobStatus::Active)
                .collect();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            jobs.into_iter().map(|j| listing(s, j)).collect()
        }))
    }

    async fn search_public(
        &self,
        query: &BoardQuery,
        now: DateTime<Utc>,
    ) -> anyhow::Result<JobPage> {
        Ok(self.with(|s| {
            let mut hits: Vec<JobListing> = s
                .jobs
                .values()
                .map(|j| listing(s, j))
                .filter(|l| query.matches(&l.job, &l.school_name, now))
                .collect();
            hits.sort_by(|a, b| query.sort.compare(&a.job, &b.job));
            let total = hits.len() as u64;
            let listings = hits
                .into_iter()
                .skip(query.offset() as usize)
                .take(query.limit as usize)
                .collect();
            JobPage { listings, total }
        }))
    }

    async fn update(&self, job: &Job) -> anyhow::Result<Job> {
        self.with(|s| {
            let stored = s.jobs.get_mut(&job.id).ok_or_else(|| anyhow!("job missing"))?;
            *stored = Job {
                updated_at: Utc::now(),
                ..job.clone()
            };
            Ok(stored.clone())
        })
    }

    async fn list_saved(&self, teacher_id: Uuid) -> anyhow::Result<Vec<SavedJob>> {
        Ok(self.with(|s| {
            let mut rows: Vec<&(Uuid, Uuid, DateTime<Utc>)> =
                s.saved_jobs.iter().filter(|(t, _, _)| *t == teacher_id).collect();
            rows.sort_by(|a, b| b.2.cmp(&a.2));
            rows.into_iter()
                .filter_map(|(_, job_id, saved_at)| {
                    let job = s.jobs.get(job_id)?;
                    let application = s
                        .applications
                        .iter()
                        .find(|a| a.job_id == *job_id && a.applicant == Applicant::Teacher(teacher_id))
                        .map(|a| (a.status, a.created_at));
                    Some(SavedJob {
                        listing: listing(s, job),
                        saved_at: *saved_at,
                        application,
                    })
                })
                .collect()
        }))
    }

    async fn add_saved(
        &self,
        teacher_id: Uuid,
        job_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.with(|s| {
            if s.saved_jobs.iter().any(|(t, j, _)| *t == teacher_id && *j == job_id) {
                return None;
            }
            let now = Utc::now();
            s.saved_jobs.push((teacher_id, job_id, now));
            Some(now)
        }))
    }

    async fn remove_saved(&self, teacher_id: Uuid, job_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|s| {
            let before = s.saved_jobs.len();
            s.saved_jobs.retain(|(t, j, _)| !(*t == teacher_id && *j == job_id));
            s.saved_jobs.len() != before
        }))
    }

    async fn create(&self, school_id: Uuid, new: &NewJob) -> anyhow::Result<Job> {
        let deadline = new.deadline.ok_or_else(|| anyhow!("deadline required"))?;
        let mut job = sample_job(new.status.unwrap_or(JobStatus::Active), deadline);
        job.school_id = school_id;
        job.title = new.title.clone();
        job.description = new.description.clone();
        job.city = new.city.clone();
        job.country = new.country.clone();
        job.salary = new.salary.clone();
        job.job_type = new.job_type.to_uppercase();
        self.with(|s| s.jobs.insert(job.id, job.clone()));
        Ok(job)
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> anyhow::Result<Job> {
        self.with(|s| {
            let job = s.jobs.get_mut(&id).ok_or_else(|| anyhow!("job missing"))?;
            job.status = status;
            job.updated_at = Utc::now();
            Ok(job.clone())
        })
    }

    async fn close_many(&self, ids: &[Uuid]) -> anyhow::Result<u64> {
        Ok(self.with(|s| {
            let mut n = 0;
            for id in ids {
                if let Some(j) = s.jobs.get_mut(id) {
                    j.status = JobStatus::Closed;
                    n += 1;
                }
            }
            n
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|s| s.jobs.remove(&id).is_some()))
    }

    async fn count_applications(&self, id: Uuid) -> anyhow::Result<i64> {
        Ok(self.with(|s| s.applications.iter().filter(|a| a.job_id == id).count() as i64))
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn exists_for_teacher(&self, job_id: Uuid, teacher_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.with(|s| {
            s.applications
                .iter()
                .any(|a| a.job_id == job_id && a.applicant == Applicant::Teacher(teacher_id))
        }))
    }

    async fn exists_for_guest(&self, job_id: Uuid, email: &str) -> anyhow::Result<bool> {
        Ok(self.with(|s| {
            s.applications.iter().any(|a| {
                a.job_id == job_id
                    && matches!(&a.applicant, Applicant::Guest(g) if g.email.eq_ignore_ascii_case(email))
            })
        }))
    }

    async fn create(&self, new: &NewApplication) -> anyhow::Result<Option<Application>> {
        Ok(self.with(|s| {
            let duplicate = s.applications.iter().any(|a| {
                a.job_id == new.job_id
                    && match (&a.applicant, &new.applicant) {
                        (Applicant::Teacher(x), Applicant::Teacher(y)) => x == y,
                        (Applicant::Guest(x), Applicant::Guest(y)) => {
                            x.normalized_email() == y.normalized_email()
                        }
                        _ => false,
                    }
            });
            if duplicate {
                return None;
            }
            let now = Utc::now();
            let app = Application {
                id: Uuid::new_v4(),
                job_id: new.job_id,
                applicant: new.applicant.clone(),
                status: ApplicationStatus::Applied,
                cover_letter: new.cover_letter.clone(),
                resume_url: Some(new.resume_url.clone()),
                portfolio_url: new.portfolio_url.clone(),
                interview_date: None,
                rating: None,
                created_at: now,
                updated_at: now,
            };
            if new.update_teacher_resume {
                if let Applicant::Teacher(tid) = &new.applicant {
                    if let Some(t) = s.teachers.get_mut(tid) {
                        t.resume_url = Some(new.resume_url.clone());
                    }
                }
            }
            s.applications.push(app.clone());
            Some(app)
        }))
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<ApplicationView>> {
        Ok(self.with(|s| s.applications.iter().find(|a| a.id == id).map(|a| view(s, a))))
    }

    async fn list_for_job(&self, job_id: Uuid) -> anyhow::Result<Vec<ApplicationView>> {
        Ok(self.with(|s| {
            s.applications
                .iter()
                .filter(|a| a.job_id == job_id)
                .map(|a| view(s, a))
                .collect()
        }))
    }

    async fn list_for_school(&self, school_id: Uuid) -> anyhow::Result<Vec<ApplicationView>> {
        Ok(self.with(|s| {
            s.applications
                .iter()
                .filter(|a| s.jobs.get(&a.job_id).map(|j| j.school_id) == Some(school_id))
                .map(|a| view(s, a))
                .collect()
        }))
    }

    async fn list_for_teacher(&self, teacher_id: Uuid) -> anyhow::Result<Vec<ApplicationView>> {
        Ok(self.with(|s| {
            s.applications
                .iter()
                .filter(|a| a.applicant == Applicant::Teacher(teacher_id))
                .map(|a| view(s, a))
                .collect()
        }))
    }

    async fn update_status(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> anyhow::Result<Application> {
        self.with(|s| {
            let app = s
                .applications
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| anyhow!("application missing"))?;
            app.status = change.status;
            if change.interview_date.is_some() {
                app.interview_date = change.interview_date;
            }
            if change.rating.is_some() {
                app.rating = change.rating;
            }
            app.updated_at = Utc::now();
            let out = app.clone();
            if let Some((author, content)) = &change.note {
                s.notes.push(ApplicationNote {
                    id: Uuid::new_v4(),
                    application_id: id,
                    author_name: author.clone(),
                    content: content.clone(),
                    created_at: Utc::now(),
                });
            }
            Ok(out)
        })
    }

    async fn add_note(
        &self,
        application_id: Uuid,
        author_name: &str,
        content: &str,
    ) -> anyhow::Result<ApplicationNote> {
        let note = ApplicationNote {
            id: Uuid::new_v4(),
            application_id,
            author_name: author_name.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.with(|s| s.notes.push(note.clone()));
        Ok(note)
    }

    async fn list_notes(&self, application_id: Uuid) -> anyhow::Result<Vec<ApplicationNote>> {
        Ok(self.with(|s| {
            s.notes
                .iter()
                .filter(|n| n.application_id == application_id)
                .cloned()
                .collect()
        }))
    }

    async fn pending_applicants(&self, job_id: Uuid) -> anyhow::Result<Vec<ApplicantContact>> {
        Ok(self.with(|s| {
            s.applications
                .iter()
                .filter(|a| a.job_id == job_id && a.status.is_pending())
                .map(|a| {
                    let v = view(s, a);
                    ApplicantContact {
                        name: v.applicant_name,
                        email: v.applicant_email,
                    }
                })
                .collect()
        }))
    }
}

fn counterpart_of(s: &State, c: &Conversation, viewer: UserType) -> Option<Counterpart> {
    match viewer {
        UserType::School => s.teachers.get(&c.teacher_id).map(|t| Counterpart {
            id: t.id,
            name: t.full_name(),
            photo_url: t.photo_url.clone(),
        }),
        UserType::Teacher => s.schools.get(&c.school_id).map(|p| Counterpart {
            id: p.id,
            name: p.name.clone(),
            photo_url: p.logo_url.clone(),
        }),
    }
}

#[async_trait]
impl MessagingRepository for MemoryStore {
    async fn find_conversation(&self, id: Uuid) -> anyhow::Result<Option<Conversation>> {
        Ok(self.with(|s| s.conversations.iter().find(|c| c.id == id).cloned()))
    }

    async fn find_or_create(
        &self,
        school_id: Uuid,
        teacher_id: Uuid,
    ) -> anyhow::Result<(Conversation, bool)> {
        Ok(self.with(|s| {
            if let Some(c) = s
                .conversations
                .iter()
                .find(|c| c.school_id == school_id && c.teacher_id == teacher_id)
            {
                return (c.clone(), false);
            }
            let now = Utc::now();
            let c = Conversation {
                id: Uuid::new_v4(),
                school_id,
                teacher_id,
                created_at: now,
                updated_at: now,
            };
            s.conversations.push(c.clone());
            (c, true)
        }))
    }

    async fn list_for(
        &self,
        viewer: Participant,
        updated_since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ConversationOverview>> {
        Ok(self.with(|s| {
            let mut convs: Vec<&Conversation> = s
                .conversations
                .iter()
                .filter(|c| viewer.takes_part_in(c) && c.updated_at >= updated_since)
                .collect();
            convs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            convs
                .into_iter()
                .filter_map(|c| {
                    let other = counterpart_of(s, c, viewer.user_type())?;
                    let mut msgs: Vec<&Message> =
                        s.messages.iter().filter(|m| m.conversation_id == c.id).collect();
                    msgs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                    let unread_count = msgs
                        .iter()
                        .filter(|m| m.is_unread_for(viewer.user_type()))
                        .count() as i64;
                    Some(ConversationOverview {
                        conversation: c.clone(),
                        other,
                        last_message: msgs.last().map(|m| (*m).clone()),
                        unread_count,
                    })
                })
                .collect()
        }))
    }

    async fn counterpart(
        &self,
        conversation: &Conversation,
        viewer: UserType,
    ) -> anyhow::Result<Option<Counterpart>> {
        Ok(self.with(|s| counterpart_of(s, conversation, viewer)))
    }

    async fn messages(&self, conversation_id: Uuid) -> anyhow::Result<Vec<Message>> {
        Ok(self.with(|s| {
            let mut out: Vec<Message> = s
                .messages
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .cloned()
                .collect();
            out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            out
        }))
    }

    async fn add_message(
        &self,
        conversation_id: Uuid,
        sender: UserType,
        content: &str,
    ) -> anyhow::Result<Message> {
        let now = Utc::now();
        let m = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_type: sender,
            content: content.to_string(),
            read: false,
            read_at: None,
            created_at: now,
        };
        self.with(|s| {
            s.messages.push(m.clone());
            if let Some(c) = s.conversations.iter_mut().find(|c| c.id == conversation_id) {
                c.updated_at = now;
            }
        });
        Ok(m)
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader: UserType,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        Ok(self.with(|s| {
            let mut n = 0;
            for m in s.messages.iter_mut() {
                if m.conversation_id == conversation_id && m.is_unread_for(reader) {
                    m.read = true;
                    m.read_at = Some(now);
                    n += 1;
                }
            }
            n
        }))
    }
}

#[derive(Default)]
pub struct MemoryActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
    broken: bool,
}

impl MemoryActivityLog {
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().expect("activity lock").clone()
    }

    pub fn actions(&self) -> Vec<ActivityAction> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn append(&self, entry: &ActivityEntry) -> anyhow::Result<()> {
        if self.broken {
            return Err(anyhow!("activity_logs unavailable"));
        }
        self.entries.lock().expect("activity lock").push(entry.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: Mutex<HashMap<String, u64>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryBlobStorage {
    pub fn keys(&self) -> Vec<String> {
        self.blobs.lock().expect("blob lock").keys().cloned().collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("blob lock").clone()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> anyhow::Result<StoredBlob> {
        let size = tokio::fs::metadata(source).await?.len();
        self.blobs
            .lock()
            .expect("blob lock")
            .insert(key.to_string(), size);
        Ok(StoredBlob {
            key: key.to_string(),
            url: format!("memory://{key}"),
            size,
        })
    }

    async fn delete(&self, url_or_key: &str) -> anyhow::Result<()> {
        let key = url_or_key.trim_start_matches("memory://").to_string();
        self.blobs.lock().expect("blob lock").remove(&key);
        self.deleted.lock().expect("blob lock").push(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer lock").clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<OutgoingEmail> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<Delivery> {
        self.sent.lock().expect("mailer lock").push(email.clone());
        Ok(Delivery::Sent {
            id: Some(format!("test-{}", Uuid::new_v4())),
        })
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &OutgoingEmail) -> anyhow::Result<Delivery> {
        Err(anyhow!("provider returned 500"))
    }
}

pub fn teacher_actor(t: &TeacherProfile) -> Actor {
    Actor {
        user_id: t.user_id,
        email: t.email.clone(),
        user_type: UserType::Teacher,
    }
}

pub fn school_actor(s: &SchoolProfile) -> Actor {
    Actor {
        user_id: s.user_id,
        email: s.email.clone(),
        user_type: UserType::School,
    }
}

/// Wires every fake together the way the application context does.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub users: Arc<MemoryStore>,
    pub profiles: Arc<MemoryStore>,
    pub jobs: Arc<MemoryStore>,
    pub applications: Arc<MemoryStore>,
    pub messaging: Arc<MemoryStore>,
    pub activity: Arc<MemoryActivityLog>,
    pub blobs: Arc<MemoryBlobStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub notifications: Notifications,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let activity = Arc::new(MemoryActivityLog::default());
        let mailer = Arc::new(RecordingMailer::default());
        let notifications =
            Notifications::new(mailer.clone(), activity.clone(), "https://ntca.test".into());
        Self {
            users: store.clone(),
            profiles: store.clone(),
            jobs: store.clone(),
            applications: store.clone(),
            messaging: store.clone(),
            store,
            activity,
            blobs: Arc::new(MemoryBlobStorage::default()),
            mailer,
            notifications,
        }
    }

    pub fn add_teacher(&self) -> TeacherProfile {
        let user_id = Uuid::new_v4();
        let n = self.store.with(|s| s.teachers.len());
        let email = format!("teacher{n}-{}@example.com", &user_id.simple().to_string()[..6]);
        let profile = TeacherProfile {
            id: Uuid::new_v4(),
            user_id,
            email: email.clone(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            city: Some("Almaty".into()),
            country: Some("Kazakhstan".into()),
            qualification: Some("BEd".into()),
            experience_years: Some(4),
            ..Default::default()
        };
        self.store.with(|s| {
            s.users.insert(
                user_id,
                User {
                    id: user_id,
                    email,
                    user_type: UserType::Teacher,
                    password_hash: None,
                    created_at: Utc::now(),
                },
            );
            s.teachers.insert(profile.id, profile.clone());
        });
        profile
    }

    pub fn add_school(&self) -> SchoolProfile {
        let user_id = Uuid::new_v4();
        let email = format!("school-{}@example.com", &user_id.simple().to_string()[..6]);
        let profile = SchoolProfile {
            id: Uuid::new_v4(),
            user_id,
            email: email.clone(),
            name: "Green Valley School".into(),
            contact_name: Some("Aigerim".into()),
            city: Some("Astana".into()),
            country: Some("Kazakhstan".into()),
            subscription: SubscriptionState {
                status: SubscriptionStatus::Active,
                plan_name: Some("Standard".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.store.with(|s| {
            s.users.insert(
                user_id,
                User {
                    id: user_id,
                    email,
                    user_type: UserType::School,
                    password_hash: None,
                    created_at: Utc::now(),
                },
            );
            s.schools.insert(profile.id, profile.clone());
        });
        profile
    }

    /// Job owned by `school` whose deadline is `days` from now (negative for past).
    pub fn add_job(&self, school: &SchoolProfile, status: JobStatus, days: i64) -> Job {
        let mut job = sample_job(status, Utc::now() + Duration::days(days));
        job.school_id = school.id;
        self.store.with(|s| s.jobs.insert(job.id, job.clone()));
        job
    }

    pub fn add_conversation(&self, school: &SchoolProfile, teacher: &TeacherProfile) -> Conversation {
        let now = Utc::now();
        let c = Conversation {
            id: Uuid::new_v4(),
            school_id: school.id,
            teacher_id: teacher.id,
            created_at: now,
            updated_at: now,
        };
        self.store.with(|s| s.conversations.push(c.clone()));
        c
    }
}

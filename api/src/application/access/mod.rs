use uuid::Uuid;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::job_repository::JobRepository;
use crate::application::ports::messaging_repository::Participant;
use crate::application::ports::profile_repository::ProfileRepository;
use crate::domain::accounts::user::{SchoolProfile, TeacherProfile, UserType};
use crate::domain::jobs::job::Job;

/// The authenticated caller, as asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub user_type: UserType,
}

// Presentation builds the Actor from the bearer token; this module only sees the result.

pub async fn require_teacher<P>(
    profiles: &P,
    actor: &Actor,
    role_message: &str,
) -> AppResult<TeacherProfile>
where
    P: ProfileRepository + ?Sized,
{
    if actor.user_type != UserType::Teacher {
        return Err(AppError::forbidden(role_message));
    }
    profiles
        .teacher_by_user(actor.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Teacher profile not found"))
}

pub async fn require_school<P>(
    profiles: &P,
    actor: &Actor,
    role_message: &str,
) -> AppResult<SchoolProfile>
where
    P: ProfileRepository + ?Sized,
{
    if actor.user_type != UserType::School {
        return Err(AppError::forbidden(role_message));
    }
    profiles
        .school_by_user(actor.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("School profile not found"))
}

/// Resolves the caller's messaging identity from its profile.
pub async fn participant<P>(profiles: &P, actor: &Actor) -> AppResult<Participant>
where
    P: ProfileRepository + ?Sized,
{
    match actor.user_type {
        UserType::School => profiles
            .school_by_user(actor.user_id)
            .await?
            .map(|s| Participant::School(s.id))
            .ok_or_else(|| AppError::not_found("School profile not found")),
        UserType::Teacher => profiles
            .teacher_by_user(actor.user_id)
            .await?
            .map(|t| Participant::Teacher(t.id))
            .ok_or_else(|| AppError::not_found("Teacher profile not found")),
    }
}

/// Loads a job that must belong to `school`.
pub async fn require_owned_job<J>(jobs: &J, school: &SchoolProfile, job_id: Uuid) -> AppResult<Job>
where
    J: JobRepository + ?Sized,
{
    let job = jobs
        .find(job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job not found"))?;
    if job.school_id != school.id {
        return Err(AppError::forbidden("Access denied"));
    }
    Ok(job)
}

use crate::application::access::Actor;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::application_repository::{ApplicationRepository, ApplicationView};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::domain::accounts::user::UserType;

/// Schools see applications to their jobs (with notes); teachers see their own.
pub struct ListApplications<'a, A, P>
where
    A: ApplicationRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub applications: &'a A,
    pub profiles: &'a P,
}

impl<'a, A, P> ListApplications<'a, A, P>
where
    A: ApplicationRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    pub async fn execute(&self, actor: &Actor) -> AppResult<Vec<ApplicationView>> {
        let mut list = match actor.user_type {
            UserType::School => {
                let school = self
                    .profiles
                    .school_by_user(actor.user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("School profile not found"))?;
                self.applications.list_for_school(school.id).await?
            }
            UserType::Teacher => {
                let teacher = self
                    .profiles
                    .teacher_by_user(actor.user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Teacher profile not found"))?;
                let mut own = self.applications.list_for_teacher(teacher.id).await?;
                // notes are internal to the school
                for view in own.iter_mut() {
                    view.notes.clear();
                }
                own
            }
        };
        list.sort_by(|a, b| b.application.created_at.cmp(&a.application.created_at));
        Ok(list)
    }
}

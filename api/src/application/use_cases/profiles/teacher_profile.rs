use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use crate::application::access::{Actor, require_teacher};
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::services::notifications::Notifications;
use crate::domain::accounts::user::{TeacherProfile, TeacherProfileEdit};
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};

const TEACHERS_ONLY: &str = "Teacher access required";

/// Reading the own profile counts as activity.
pub struct GetTeacherProfile<'a, P: ProfileRepository + ?Sized> {
    pub profiles: &'a P,
}

impl<'a, P: ProfileRepository + ?Sized> GetTeacherProfile<'a, P> {
    pub async fn execute(&self, actor: &Actor, now: DateTime<Utc>) -> AppResult<TeacherProfile> {
        let mut teacher = require_teacher(self.profiles, actor, TEACHERS_ONLY).await?;
        self.profiles.touch_teacher(teacher.id, now).await?;
        teacher.last_active = Some(now);
        Ok(teacher)
    }
}

pub struct UpdateTeacherProfile<'a, P: ProfileRepository + ?Sized> {
    pub profiles: &'a P,
    pub notifications: &'a Notifications,
}

impl<'a, P: ProfileRepository + ?Sized> UpdateTeacherProfile<'a, P> {
    pub async fn execute(
        &self,
        actor: &Actor,
        edit: &TeacherProfileEdit,
        meta: &RequestMeta,
    ) -> AppResult<TeacherProfile> {
        let mut teacher = require_teacher(self.profiles, actor, TEACHERS_ONLY).await?;
        teacher.apply(edit).map_err(AppError::validation)?;
        let saved = self.profiles.save_teacher(&teacher).await?;
        info!(teacher_id = %saved.id, complete = saved.profile_complete, "teacher_profile_updated");
        self.notifications
            .record(
                ActivityEntry::new(
                    Some(actor.user_id),
                    ActivityAction::ProfileUpdated,
                    json!({ "profileComplete": saved.profile_complete }),
                )
                .with_meta(meta),
            )
            .await;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{Fixture, school_actor, teacher_actor};

    #[tokio::test]
    async fn reading_marks_teacher_active() {
        let fx = Fixture::new();
        let teacher = fx.add_teacher();
        let uc = GetTeacherProfile {
            profiles: &*fx.profiles,
        };
        let now = Utc::now();
        let got = uc.execute(&teacher_actor(&teacher), now).await.unwrap();
        assert_eq!(got.id, teacher.id);
        assert_eq!(fx.store.teacher(teacher.id).unwrap().last_active, Some(now));
    }

    #[tokio::test]
    async fn update_recomputes_completeness_and_logs() {
        let fx = Fixture::new();
        let teacher = fx.add_teacher();
        let uc = UpdateTeacherProfile {
            profiles: &*fx.profiles,
            notifications: &fx.notifications,
        };
        let edit = TeacherProfileEdit {
            phone: Some("+7 700 111 2233".into()),
            experience: Some("4 years in Almaty".into()),
            bio: Some("Primary English teacher".into()),
            subjects: Some(vec!["English".into()]),
            languages: Some(vec!["English".into(), "Russian".into()]),
            availability: Some("Immediately".into()),
            ..Default::default()
        };
        let saved = uc
            .execute(&teacher_actor(&teacher), &edit, &RequestMeta::default())
            .await
            .unwrap();
        assert!(saved.profile_complete);
        assert_eq!(saved.first_name, "Jane");
        assert!(fx.store.teacher(teacher.id).unwrap().profile_complete);
        let entry = fx.activity.entries().pop().unwrap();
        assert_eq!(entry.action, ActivityAction::ProfileUpdated);
        assert_eq!(entry.details["profileComplete"], true);
    }

    #[tokio::test]
    async fn schools_cannot_use_teacher_profile() {
        let fx = Fixture::new();
        let school = fx.add_school();
        let uc = GetTeacherProfile {
            profiles: &*fx.profiles,
        };
        let err = uc.execute(&school_actor(&school), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}

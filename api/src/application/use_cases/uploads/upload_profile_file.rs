use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::application::access::Actor;
use crate::application::errors::{AppError, AppResult};
use crate::application::ports::blob_storage::BlobStorage;
use crate::application::ports::profile_repository::ProfileRepository;
use crate::application::services::notifications::Notifications;
use crate::application::services::uploads::StagedFile;
use crate::domain::accounts::user::UserType;
use crate::domain::activity::{ActivityAction, ActivityEntry, RequestMeta};
use crate::domain::uploads::upload::{UploadKind, profile_blob_path};

#[derive(Debug, Clone)]
pub struct UploadedProfileFile {
    pub url: String,
    pub key: String,
    pub kind: UploadKind,
    pub size: u64,
    pub original_name: String,
}

struct Owner {
    profile_id: Uuid,
    name: String,
    previous_url: Option<String>,
}

/// Stores a profile document or image and points the profile at it.
pub struct UploadProfileFile<'a, P, B>
where
    P: ProfileRepository + ?Sized,
    B: BlobStorage + ?Sized,
{
    pub profiles: &'a P,
    pub blobs: &'a B,
    pub notifications: &'a Notifications,
    pub max_upload_bytes: u64,
}

impl<'a, P, B> UploadProfileFile<'a, P, B>
where
    P: ProfileRepository + ?Sized,
    B: BlobStorage + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &Actor,
        kind: &str,
        file: StagedFile,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> AppResult<UploadedProfileFile> {
        let allowed = UploadKind::allowed_for(actor.user_type);
        let Some(kind) = UploadKind::parse(kind).filter(|k| allowed.contains(k)) else {
            file.discard();
            let names: Vec<&str> = allowed.iter().map(UploadKind::as_str).collect();
            return Err(AppError::validation(format!(
                "Invalid file type for {}. Allowed: {}",
                actor.user_type,
                names.join(", ")
            )));
        };
        if !kind.accepts(&file.content_type) {
            file.discard();
            return Err(AppError::validation(format!(
                "Invalid file type for {}. Allowed: {}",
                kind.as_str(),
                kind.mime_types().join(", ")
            )));
        }
        if file.size > self.max_upload_bytes {
            file.discard();
            return Err(AppError::validation(format!(
                "File size too large. Maximum size is {}MB",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }
        let owner = match self.owner(actor, kind).await {
            Ok(owner) => owner,
            Err(e) => {
                file.discard();
                return Err(e);
            }
        };

        let original_name = file.original_name_or("file").to_string();
        let key = profile_blob_path(
            actor.user_type,
            &owner.name,
            &owner.profile_id.to_string(),
            kind,
            &original_name,
            &file.content_type,
            now.timestamp_millis(),
        );
        let stored = self
            .blobs
            .put_file(&key, file.path(), &file.content_type)
            .await;
        file.discard();
        let stored = stored?;

        let profile_id = owner.profile_id;
        let linked = match actor.user_type {
            UserType::Teacher => {
                self.profiles
                    .set_teacher_file(profile_id, kind, &stored.url)
                    .await
            }
            UserType::School => {
                self.profiles
                    .set_school_file(profile_id, kind, &stored.url)
                    .await
            }
        };
        if let Err(e) = linked {
            if let Err(cleanup) = self.blobs.delete(&stored.url).await {
                warn!(error = ?cleanup, url = %stored.url, "orphan_blob_cleanup_failed");
            }
            return Err(e.into());
        }
        if let Some(previous) = owner.previous_url.filter(|p| p != &stored.url) {
            if let Err(e) = self.blobs.delete(&previous).await {
                warn!(error = ?e, url = %previous, "previous_blob_delete_failed");
            }
        }

        self.notifications
            .record(
                ActivityEntry::new(
                    Some(actor.user_id),
                    ActivityAction::FileUploaded,
                    json!({
                        "type": kind.as_str(),
                        "fileUrl": stored.url,
                        "originalName": original_name,
                        "size": stored.size,
                    }),
                )
                .with_meta(meta),
            )
            .await;

        Ok(UploadedProfileFile {
            url: stored.url,
            key: stored.key,
            kind,
            size: stored.size,
            original_name,
        })
    }

    async fn owner(&self, actor: &Actor, kind: UploadKind) -> AppResult<Owner> {
        let not_found = || AppError::not_found("User profile not found");
        match actor.user_type {
            UserType::Teacher => {
                let t = self
                    .profiles
                    .teacher_by_user(actor.user_id)
                    .await?
                    .ok_or_else(not_found)?;
                let previous_url = match kind {
                    UploadKind::Resume => t.resume_url.clone(),
                    UploadKind::Photo => t.photo_url.clone(),
                    UploadKind::Portfolio => t.portfolio_url.clone(),
                    _ => None,
                };
                Ok(Owner {
                    profile_id: t.id,
                    name: t.path_name(),
                    previous_url,
                })
            }
            UserType::School => {
                let s = self
                    .profiles
                    .school_by_user(actor.user_id)
                    .await?
                    .ok_or_else(not_found)?;
                let previous_url = match kind {
                    UploadKind::Logo => s.logo_url.clone(),
                    UploadKind::CoverPhoto => s.cover_photo_url.clone(),
                    UploadKind::Photo => s.photo_url.clone(),
                    _ => None,
                };
                Ok(Owner {
                    profile_id: s.id,
                    name: s.name.clone(),
                    previous_url,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{Fixture, school_actor, teacher_actor};
    use crate::domain::uploads::upload::{PDF, PNG};

    const MB: u64 = 1024 * 1024;

    #[tokio::test]
    async fn replaces_logo_and_drops_the_old_blob() {
        let fx = Fixture::new();
        let school = fx.add_school();
        fx.store
            .update_school(school.id, |s| s.logo_url = Some("memory://old-logo.png".into()));
        let uc = UploadProfileFile {
            profiles: &*fx.profiles,
            blobs: &*fx.blobs,
            notifications: &fx.notifications,
            max_upload_bytes: 10 * MB,
        };
        let file = StagedFile::from_bytes(b"\x89PNG", "Our Logo!.png", PNG);
        let out = uc
            .execute(&school_actor(&school), "logo", file, &RequestMeta::default(), Utc::now())
            .await
            .unwrap();
        assert!(out.key.starts_with(&format!("school/green-valley-school-{}/logo/", school.id)));
        assert!(out.key.ends_with("-Our-Logo-.png"));
        assert_eq!(fx.store.school(school.id).unwrap().logo_url, Some(out.url));
        assert_eq!(fx.blobs.deleted(), vec!["old-logo.png".to_string()]);
        assert_eq!(fx.activity.actions(), vec![ActivityAction::FileUploaded]);
    }

    #[tokio::test]
    async fn role_and_mime_are_enforced() {
        let fx = Fixture::new();
        let teacher = fx.add_teacher();
        let uc = UploadProfileFile {
            profiles: &*fx.profiles,
            blobs: &*fx.blobs,
            notifications: &fx.notifications,
            max_upload_bytes: 10 * MB,
        };
        let meta = RequestMeta::default();

        let file = StagedFile::from_bytes(b"\x89PNG", "logo.png", PNG);
        let path = file.path().to_path_buf();
        let err = uc
            .execute(&teacher_actor(&teacher), "logo", file, &meta, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(!path.exists());

        let file = StagedFile::from_bytes(b"\x89PNG", "cv.png", PNG);
        let err = uc
            .execute(&teacher_actor(&teacher), "resume", file, &meta, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { message, .. } if message.starts_with("Invalid file type for resume")));

        let file = StagedFile::from_bytes(b"%PDF", "cv.pdf", PDF);
        let out = uc
            .execute(&teacher_actor(&teacher), "resume", file, &meta, Utc::now())
            .await
            .unwrap();
        assert_eq!(fx.store.teacher(teacher.id).unwrap().resume_url, Some(out.url));
        assert_eq!(fx.blobs.keys().len(), 1);
    }
}

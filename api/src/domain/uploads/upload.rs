use std::path::Path;

use crate::domain::accounts::user::UserType;

pub const PDF: &str = "application/pdf";
pub const DOC: &str = "application/msword";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const JPEG: &str = "image/jpeg";
pub const PNG: &str = "image/png";
pub const WEBP: &str = "image/webp";

pub const RESUME_MIME_TYPES: &[&str] = &[PDF, DOC, DOCX];
const IMAGE_MIME_TYPES: &[&str] = &[JPEG, PNG, WEBP];
const CERTIFICATE_MIME_TYPES: &[&str] = &[PDF, JPEG, PNG];

pub const INVALID_RESUME_TYPE: &str = "Invalid file type. Please upload PDF or DOC/DOCX files only";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Resume,
    Photo,
    Portfolio,
    Certificate,
    Logo,
    CoverPhoto,
}

impl UploadKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "resume" => Some(UploadKind::Resume),
            "photo" => Some(UploadKind::Photo),
            "portfolio" => Some(UploadKind::Portfolio),
            "certificate" => Some(UploadKind::Certificate),
            "logo" => Some(UploadKind::Logo),
            "coverPhoto" => Some(UploadKind::CoverPhoto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Resume => "resume",
            UploadKind::Photo => "photo",
            UploadKind::Portfolio => "portfolio",
            UploadKind::Certificate => "certificate",
            UploadKind::Logo => "logo",
            UploadKind::CoverPhoto => "coverPhoto",
        }
    }

    pub fn allowed_for(role: UserType) -> &'static [UploadKind] {
        match role {
            UserType::Teacher => &[
                UploadKind::Resume,
                UploadKind::Photo,
                UploadKind::Portfolio,
                UploadKind::Certificate,
            ],
            UserType::School => &[
                UploadKind::Logo,
                UploadKind::CoverPhoto,
                UploadKind::Photo,
                UploadKind::Certificate,
            ],
        }
    }

    pub fn mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Photo | UploadKind::Logo | UploadKind::CoverPhoto => IMAGE_MIME_TYPES,
            UploadKind::Resume | UploadKind::Portfolio => RESUME_MIME_TYPES,
            UploadKind::Certificate => CERTIFICATE_MIME_TYPES,
        }
    }

    pub fn accepts(&self, mime: &str) -> bool {
        self.mime_types().contains(&mime)
    }
}

/// Lowercased, every non-alphanumeric character replaced by `-`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
}

/// Keeps `[A-Za-z0-9_-]`, replaces the rest, caps at 50 characters.
pub fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(50)
        .collect()
}

/// Extension with its leading dot, taken from the original file name or, failing
/// that, guessed from the MIME type. Empty when neither yields one.
pub fn extension_for(original_name: Option<&str>, mime: &str) -> String {
    if let Some(ext) = original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
    {
        return format!(".{ext}");
    }
    let guessed = match mime {
        PDF => Some("pdf"),
        DOC => Some("doc"),
        DOCX => Some("docx"),
        JPEG => Some("jpg"),
        _ => mime_guess::get_mime_extensions_str(mime).and_then(|exts| exts.first().copied()),
    };
    guessed.map(|e| format!(".{e}")).unwrap_or_default()
}

fn file_stem(original_name: &str) -> &str {
    Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
}

/// `<role>/<name>-<profile id>/<kind>/<ts>-<stem><ext>`
pub fn profile_blob_path(
    role: UserType,
    owner_name: &str,
    profile_id: &str,
    kind: UploadKind,
    original_name: &str,
    mime: &str,
    timestamp_ms: i64,
) -> String {
    let ext = extension_for(Some(original_name), mime);
    format!(
        "{}/{}-{}/{}/{}-{}{}",
        role.as_str().to_ascii_lowercase(),
        sanitize_name(owner_name),
        profile_id,
        kind.as_str(),
        timestamp_ms,
        sanitize_stem(file_stem(original_name)),
        ext
    )
}

/// Owner segment of an application resume path.
#[derive(Debug, Clone)]
pub enum ResumeOwner<'a> {
    Teacher { name: &'a str, id: &'a str },
    Guest { name: &'a str },
}

/// `teacher/<name>-<id>/resume/<ts>-resume-<nonce><ext>` or
/// `guest/<name>-<ts>/resume/<ts>-resume-<nonce><ext>`.
///
/// `nonce` keeps two uploads from one owner in the same millisecond apart.
pub fn resume_blob_path(
    owner: ResumeOwner<'_>,
    original_name: Option<&str>,
    mime: &str,
    timestamp_ms: i64,
    nonce: &str,
) -> String {
    let ext = extension_for(original_name, mime);
    let prefix = match owner {
        ResumeOwner::Teacher { name, id } => format!("teacher/{}-{}", sanitize_name(name), id),
        ResumeOwner::Guest { name } => format!("guest/{}-{}", sanitize_name(name), timestamp_ms),
    };
    format!("{prefix}/resume/{timestamp_ms}-resume-{nonce}{ext}")
}

/// Short random segment for [`resume_blob_path`].
pub fn blob_nonce() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

use std::path::Path;

use tempfile::TempPath;
use tracing::warn;

/// A multipart file spooled to a temporary file. The file is removed when this
/// value is dropped or explicitly discarded.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    pub original_name: Option<String>,
    pub content_type: String,
    pub size: u64,
}

impl StagedFile {
    pub fn new(
        path: TempPath,
        original_name: Option<String>,
        content_type: String,
        size: u64,
    ) -> Self {
        Self {
            path,
            original_name,
            content_type,
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.original_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback)
    }

    /// Deletes the temporary file now, reporting (but not failing on) I/O errors.
    pub fn discard(self) {
        let shown = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            warn!(error = ?e, path = %shown.display(), "staged_upload_cleanup_failed");
        }
    }

    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8], original_name: &str, content_type: &str) -> Self {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(bytes).expect("write temp file");
        Self::new(
            f.into_temp_path(),
            Some(original_name.to_string()),
            content_type.to_string(),
            bytes.len() as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_removes_file() {
        let staged = StagedFile::from_bytes(b"%PDF-1.4", "cv.pdf", "application/pdf");
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        staged.discard();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_file_too() {
        let staged = StagedFile::from_bytes(b"x", "a.txt", "text/plain");
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn fallback_name_for_blank_original() {
        let mut staged = StagedFile::from_bytes(b"x", " ", "application/pdf");
        assert_eq!(staged.original_name_or("resume.pdf"), "resume.pdf");
        staged.original_name = Some("cv.docx".into());
        assert_eq!(staged.original_name_or("resume.pdf"), "cv.docx");
    }
}

//! Upload sets - named groups of accepted files with a destination folder.
//!
//! The application registers one "photos" set restricted to image
//! extensions; handlers push multipart file contents through it.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extensions accepted by the image upload set.
pub const IMAGES: &[&str] = &["jpg", "jpe", "jpeg", "png", "gif", "svg", "bmp"];

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File extension not allowed: {0}")]
    ExtensionNotAllowed(String),

    #[error("Filename is empty or unusable after sanitization")]
    BadFilename,

    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A named upload target with an extension allow-list.
#[derive(Debug, Clone)]
pub struct UploadSet {
    name: String,
    dest: PathBuf,
    allowed: Vec<String>,
}

impl UploadSet {
    pub fn new(name: impl Into<String>, dest: impl Into<PathBuf>, allowed: &[&str]) -> Self {
        Self {
            name: name.into(),
            dest: dest.into(),
            allowed: allowed.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory files are stored in.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Public URL path for a stored file.
    pub fn url_for(&self, stored_name: &str) -> String {
        format!("/uploads/{}/{}", self.name, stored_name)
    }

    /// Strip path components and unsafe characters from a client filename.
    fn sanitize(filename: &str) -> Option<(String, String)> {
        let base = Path::new(filename).file_name()?.to_str()?;
        let (stem, ext) = base.rsplit_once('.')?;

        let clean_stem: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if clean_stem.chars().all(|c| c == '_') {
            return None;
        }

        Some((clean_stem, ext.to_lowercase()))
    }

    /// Validate and store an uploaded file, returning the stored filename.
    ///
    /// Name collisions are resolved with a short random suffix rather than
    /// overwriting an existing file.
    pub async fn save(&self, filename: &str, contents: &[u8]) -> Result<String, UploadError> {
        let (stem, ext) =
            Self::sanitize(filename).ok_or(UploadError::BadFilename)?;

        if !self.allowed.iter().any(|a| *a == ext) {
            return Err(UploadError::ExtensionNotAllowed(ext));
        }

        tokio::fs::create_dir_all(&self.dest).await?;

        let mut stored = format!("{stem}.{ext}");
        if tokio::fs::try_exists(self.dest.join(&stored)).await? {
            let tag = uuid::Uuid::new_v4().simple().to_string();
            stored = format!("{stem}_{}.{ext}", &tag[..8]);
        }

        tokio::fs::write(self.dest.join(&stored), contents).await?;
        tracing::debug!(set = %self.name, file = %stored, "Upload stored");

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos(dir: &Path) -> UploadSet {
        UploadSet::new("photos", dir, IMAGES)
    }

    #[tokio::test]
    async fn stores_an_image() {
        let dir = std::env::temp_dir().join(format!("cbu-uploads-{}", uuid::Uuid::new_v4()));
        let set = photos(&dir);

        let stored = set.save("avatar.PNG", b"fake-png").await.unwrap();
        assert_eq!(stored, "avatar.png");
        assert!(dir.join("avatar.png").exists());
        assert_eq!(set.url_for(&stored), "/uploads/photos/avatar.png");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_non_image_extensions() {
        let dir = std::env::temp_dir().join(format!("cbu-uploads-{}", uuid::Uuid::new_v4()));
        let set = photos(&dir);

        let err = set.save("script.exe", b"nope").await.unwrap_err();
        assert!(matches!(err, UploadError::ExtensionNotAllowed(ext) if ext == "exe"));
    }

    #[tokio::test]
    async fn strips_directory_components() {
        let dir = std::env::temp_dir().join(format!("cbu-uploads-{}", uuid::Uuid::new_v4()));
        let set = photos(&dir);

        let stored = set.save("../../etc/passwd.jpg", b"img").await.unwrap();
        assert_eq!(stored, "passwd.jpg");
        assert!(dir.join("passwd.jpg").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn collisions_get_a_suffix() {
        let dir = std::env::temp_dir().join(format!("cbu-uploads-{}", uuid::Uuid::new_v4()));
        let set = photos(&dir);

        let first = set.save("pic.jpg", b"one").await.unwrap();
        let second = set.save("pic.jpg", b"two").await.unwrap();
        assert_eq!(first, "pic.jpg");
        assert_ne!(second, first);
        assert!(second.starts_with("pic_") && second.ends_with(".jpg"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

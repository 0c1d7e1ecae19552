use chrono::Utc;
use std::path::{Component, Path, PathBuf};

use super::{ImageUpload, UploadError, PUBLIC_PREFIX};

/// Local directory holding uploaded event images.
pub struct UploadStore {
    base_path: PathBuf,
    max_size: u64,
}

impl UploadStore {
    pub fn new<P: AsRef<Path>>(base_path: P, max_size: u64) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Write the image under a fresh name and return its public path.
    pub async fn save(&self, upload: &ImageUpload) -> Result<String, UploadError> {
        let file_name = generate_file_name(upload.extension());
        tokio::fs::write(self.base_path.join(&file_name), upload.data()).await?;
        tracing::debug!(
            file = %file_name,
            original = %upload.original_name(),
            bytes = upload.len(),
            "Stored upload"
        );
        Ok(format!("{PUBLIC_PREFIX}{file_name}"))
    }

    /// Delete a previously saved upload by its public path.
    pub async fn remove(&self, public_path: &str) -> Result<(), UploadError> {
        let Some(path) = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|name| self.resolve(name))
        else {
            return Ok(());
        };
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    /// Map a stored file name to its on-disk path. Names that would escape
    /// the upload directory resolve to `None`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.base_path.join(relative)),
            _ => None,
        }
    }
}

/// `image-<unix millis>-<random suffix>.<ext>`
fn generate_file_name(extension: &str) -> String {
    format!(
        "image-{}-{}.{}",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        extension
    )
}

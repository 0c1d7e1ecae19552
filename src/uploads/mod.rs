mod local;

pub use local::UploadStore;

use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

/// Multipart field carrying the event image.
pub const IMAGE_FIELD: &str = "image";

/// Public URL prefix of stored uploads.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Image types accepted both as file extension and as MIME subtype.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Rejected(String),
}

/// An image that passed type and size validation but is not on disk yet.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    original_name: String,
    extension: String,
    data: Bytes,
}

impl ImageUpload {
    /// Validate an uploaded image. Both the file extension and the declared
    /// content type must name an allowed image type.
    pub fn new(
        original_name: &str,
        content_type: Option<&str>,
        data: Bytes,
        max_size: u64,
    ) -> Result<Self, UploadError> {
        let extension = check_image_type(original_name, content_type)?;

        if data.len() as u64 > max_size {
            return Err(size_exceeded(max_size));
        }

        Ok(Self {
            original_name: original_name.to_string(),
            extension,
            data,
        })
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Lowercased extension, preserved on the stored file.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Check the extension AND the MIME type, returning the lowercased extension.
pub fn check_image_type(
    file_name: &str,
    content_type: Option<&str>,
) -> Result<String, UploadError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let extension_ok = ALLOWED_IMAGE_TYPES.contains(&extension.as_str());

    let mime_ok = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .and_then(|ct| {
            ct.strip_prefix("image/")
                .map(|subtype| ALLOWED_IMAGE_TYPES.contains(&subtype))
        })
        .unwrap_or(false);

    if extension_ok && mime_ok {
        Ok(extension)
    } else {
        Err(UploadError::Rejected(
            "Only image files are allowed".to_string(),
        ))
    }
}

pub fn size_exceeded(max_size: u64) -> UploadError {
    UploadError::Rejected(format!(
        "Image exceeds maximum upload size of {max_size} bytes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_extension_and_mime() {
        assert_eq!(check_image_type("cover.PNG", Some("image/png")).unwrap(), "png");
        assert_eq!(check_image_type("a.jpg", Some("image/jpeg")).unwrap(), "jpg");
        assert_eq!(check_image_type("a.gif", Some("image/gif; charset=binary")).unwrap(), "gif");
    }

    #[test]
    fn test_rejects_disallowed_extension() {
        assert!(check_image_type("notes.txt", Some("image/png")).is_err());
        assert!(check_image_type("noextension", Some("image/png")).is_err());
    }

    #[test]
    fn test_rejects_spoofed_mime() {
        assert!(check_image_type("cover.png", Some("text/plain")).is_err());
        assert!(check_image_type("cover.png", Some("application/png")).is_err());
        assert!(check_image_type("cover.png", None).is_err());
    }

    #[test]
    fn test_rejects_oversized_image() {
        let data = Bytes::from(vec![0u8; 11]);
        let err = ImageUpload::new("a.png", Some("image/png"), data, 10).unwrap_err();
        assert!(matches!(err, UploadError::Rejected(_)));
    }

    #[test]
    fn test_accepts_image_at_limit() {
        let data = Bytes::from(vec![0u8; 10]);
        let upload = ImageUpload::new("a.png", Some("image/png"), data, 10).unwrap();
        assert_eq!(upload.extension(), "png");
        assert_eq!(upload.len(), 10);
        assert_eq!(upload.original_name(), "a.png");
    }
}

pub mod format;
pub mod ingest;
pub mod resize;

pub use format::*;
pub use ingest::*;
pub use resize::*;

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not an image: declared type {0}")]
    NotAnImage(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    TooLarge { size_mb: f64, max_mb: u64 },

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Ingestion task failed: {0}")]
    Join(String),
}

/// A user-selected file, before ingestion.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub name: String,
    /// Declared content type (browser `File.type`, or a guess from the extension).
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    /// Read a file from disk, guessing the declared type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(Self::new(name, content_type, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trench.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let upload = PhotoUpload::from_path(&path).unwrap();
        assert_eq!(upload.name, "trench.jpg");
        assert_eq!(upload.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(upload.bytes.len(), 4);
    }

    #[test]
    fn from_path_unknown_extension_has_no_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzqx");
        std::fs::write(&path, b"data").unwrap();

        let upload = PhotoUpload::from_path(&path).unwrap();
        assert!(upload.content_type.is_none());
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let err = PhotoUpload::from_path(Path::new("/nonexistent/photo.png")).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }
}

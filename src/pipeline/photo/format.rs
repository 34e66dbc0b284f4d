use super::IngestError;

/// Upload size ceiling, checked before anything is decoded.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024; // 50MB

/// Image encodings the composer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Jpeg,
    Png,
}

impl PhotoFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Detect the encoding from magic bytes. The filename and declared type
/// are not trusted for this.
pub fn sniff_format(bytes: &[u8]) -> Result<PhotoFormat, IngestError> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Ok(PhotoFormat::Jpeg),
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(PhotoFormat::Png),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            Err(IngestError::UnsupportedFormat("image/tiff".into()))
        }
        _ if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" => {
            Err(IngestError::UnsupportedFormat("image/heic".into()))
        }
        [b'G', b'I', b'F', b'8', ..] => Err(IngestError::UnsupportedFormat("image/gif".into())),
        _ => Err(IngestError::UnsupportedFormat("unknown".into())),
    }
}

/// Reject anything whose declared type is present and not `image/*`.
pub fn check_declared_type(content_type: Option<&str>) -> Result<(), IngestError> {
    match content_type.map(str::trim) {
        Some(ct) if !ct.is_empty() && !ct.to_ascii_lowercase().starts_with("image/") => {
            Err(IngestError::NotAnImage(ct.to_string()))
        }
        _ => Ok(()),
    }
}

pub fn check_size(len: usize) -> Result<(), IngestError> {
    let len = len as u64;
    if len > MAX_UPLOAD_BYTES {
        return Err(IngestError::TooLarge {
            size_mb: len as f64 / (1024.0 * 1024.0),
            max_mb: MAX_UPLOAD_BYTES / (1024 * 1024),
        });
    }
    Ok(())
}

/// Keep only the final path component, whichever separator the client used.
pub fn sanitize_filename(original: &str) -> String {
    let name = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let clean: String = name
        .chars()
        .filter(|c| *c != '\0' && !c.is_control())
        .take(255)
        .collect();

    let clean = clean.trim();
    if clean.is_empty() {
        "photo".to_string()
    } else {
        clean.to_string()
    }
}

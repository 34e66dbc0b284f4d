use std::path::{Path, PathBuf};

use super::RenderError;
use crate::models::{ImagePayload, ReportDocument};
use crate::pipeline::photo::sniff_format;

/// A rendered, downloadable report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Produces a shareable document from a report.
///
/// Implementations must not depend on the branding asset being present.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        doc: &ReportDocument,
        branding: Option<&ImagePayload>,
    ) -> Result<RenderedArtifact, RenderError>;
}

/// Lowercase ASCII alphanumerics, every other run collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// `inspection-report-<project-slug>-<date>.<extension>`
pub fn artifact_file_name(doc: &ReportDocument, extension: &str) -> String {
    let project = match slugify(&doc.project_name) {
        s if s.is_empty() => "report".to_string(),
        s => s,
    };
    let date = match slugify(&doc.date) {
        s if s.is_empty() => "undated".to_string(),
        s => s,
    };
    format!("inspection-report-{project}-{date}.{extension}")
}

/// Load the logo used on rendered reports. Best-effort: any problem
/// yields `None` and the report renders without it.
pub fn load_branding_asset(path: &Path) -> Option<ImagePayload> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Branding asset unavailable");
            return None;
        }
    };
    match sniff_format(&bytes) {
        Ok(format) => Some(ImagePayload::new(format.mime_type(), bytes)),
        Err(e) => {
            tracing::debug!(
                path = %path.display(),
                error = %e,
                "Branding asset not a usable image"
            );
            None
        }
    }
}

/// Write an artifact into `dir`, creating it if needed.
pub fn save_artifact(artifact: &RenderedArtifact, dir: &Path) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)?;
    tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "Report saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Line 42 Rehab, Phase #2"), "line-42-rehab-phase-2");
        assert_eq!(slugify("  --Elm St--  "), "elm-st");
        assert_eq!(slugify("2024-05-01"), "2024-05-01");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn file_name_uses_project_and_date() {
        let mut doc = ReportDocument::defaults();
        doc.project_name = "Main St. Replacement".into();
        doc.date = "2024-05-01".into();
        assert_eq!(
            artifact_file_name(&doc, "pdf"),
            "inspection-report-main-st-replacement-2024-05-01.pdf"
        );
    }

    #[test]
    fn file_name_fallbacks() {
        let mut doc = ReportDocument::defaults();
        doc.date = String::new();
        assert_eq!(
            artifact_file_name(&doc, "pdf"),
            "inspection-report-report-undated.pdf"
        );
    }

    #[test]
    fn branding_missing_or_invalid_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_branding_asset(&dir.path().join("missing.png")).is_none());

        let junk = dir.path().join("logo.png");
        std::fs::write(&junk, b"not an image").unwrap();
        assert!(load_branding_asset(&junk).is_none());
    }

    #[test]
    fn branding_png_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        let payload = load_branding_asset(&path).unwrap();
        assert_eq!(payload.mime_type(), "image/png");
    }

    #[test]
    fn save_artifact_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let artifact = RenderedArtifact {
            file_name: "inspection-report-a-2024-01-01.pdf".into(),
            mime_type: "application/pdf".into(),
            bytes: b"%PDF-1.3".to_vec(),
        };
        let path = save_artifact(&artifact, &target).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3");
        assert!(path.starts_with(&target));
    }
}

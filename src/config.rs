use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "FieldReport";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage key holding the single in-progress draft.
pub const DEFAULT_DRAFT_KEY: &str = "sjb-daily-draft";

/// Storage key holding the archived report list.
pub const DEFAULT_ARCHIVE_KEY: &str = "sjb-reports";

/// Quiet period before an autosave is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Long-edge bound for ingested photos, in pixels.
pub const DEFAULT_MAX_PHOTO_EDGE: u32 = 1600;

/// JPEG quality used when a photo had to be downscaled.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "fieldreport_lib=info,warn".to_string()
}

/// Get the application data directory.
/// ~/FieldReport/ on all platforms. Falls back to the working directory
/// when no home directory can be resolved.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the SQLite file backing drafts and the archive
pub fn database_path() -> PathBuf {
    app_data_dir().join("fieldreport.db")
}

/// Get the directory rendered reports are saved into
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

/// Draft persistence settings.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    pub key: String,
    pub debounce: Duration,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_DRAFT_KEY.to_string(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Archive persistence settings.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub key: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_ARCHIVE_KEY.to_string(),
        }
    }
}

/// Photo ingestion settings.
#[derive(Debug, Clone, Copy)]
pub struct IngestConfig {
    /// Longest permitted edge after ingestion.
    pub max_edge: u32,
    /// Quality (1-100) for re-encoded JPEG output.
    pub jpeg_quality: u8,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_edge: DEFAULT_MAX_PHOTO_EDGE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Everything a composer session needs, passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct ComposerConfig {
    pub draft: DraftConfig,
    pub archive: ArchiveConfig,
    pub ingest: IngestConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("fieldreport.db"));
    }

    #[test]
    fn exports_under_app_data() {
        assert!(exports_dir().starts_with(app_data_dir()));
        assert!(exports_dir().ends_with("exports"));
    }

    #[test]
    fn defaults_match_composer_behavior() {
        let config = ComposerConfig::default();
        assert_eq!(config.draft.key, "sjb-daily-draft");
        assert_eq!(config.archive.key, "sjb-reports");
        assert_eq!(config.draft.debounce, Duration::from_millis(600));
        assert_eq!(config.ingest.max_edge, 1600);
        assert_eq!(config.ingest.jpeg_quality, 85);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}

//! Turns raw uploads into bounded, upright `PhotoEntry` values.
//!
//! Each file is handled independently: a failure drops that file (with a
//! warning) and never aborts the rest of the batch.

use std::sync::Arc;

use futures_util::future::join_all;
use image::GenericImageView;

use super::format::{check_declared_type, check_size, sanitize_filename, sniff_format};
use super::resize::{
    encode_jpeg, needs_downscale, resize_to_max_edge, ExifOrientationCorrector,
    OrientationCorrector,
};
use super::{IngestError, PhotoUpload};
use crate::config::IngestConfig;
use crate::models::{ImagePayload, PhotoEntry};

/// A file that was dropped from a batch, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUpload {
    pub name: String,
    pub reason: String,
}

/// Outcome of `ingest_all`. `photos` keeps input order.
#[derive(Debug, Default)]
pub struct IngestBatch {
    pub photos: Vec<PhotoEntry>,
    pub skipped: Vec<SkippedUpload>,
}

#[derive(Clone)]
pub struct PhotoIngestor {
    config: IngestConfig,
    orientation: Arc<dyn OrientationCorrector>,
}

impl PhotoIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self::with_orientation(config, Arc::new(ExifOrientationCorrector))
    }

    pub fn with_orientation(
        config: IngestConfig,
        orientation: Arc<dyn OrientationCorrector>,
    ) -> Self {
        Self {
            config,
            orientation,
        }
    }

    pub fn config(&self) -> IngestConfig {
        self.config
    }

    /// Ingest one upload. CPU-bound; run off the async runtime.
    pub fn ingest(&self, upload: PhotoUpload) -> Result<PhotoEntry, IngestError> {
        let name = sanitize_filename(&upload.name);

        check_declared_type(upload.content_type.as_deref())?;
        check_size(upload.bytes.len())?;
        let format = sniff_format(&upload.bytes)?;

        let decoded = image::load_from_memory(&upload.bytes)
            .map_err(|e| IngestError::Decode(e.to_string()))?;
        let oriented = self.orientation.correct(&upload.bytes, decoded);
        let (width, height) = oriented.dimensions();

        if !needs_downscale(width, height, self.config.max_edge) {
            tracing::debug!(file = %name, width, height, "Photo within bounds, keeping original");
            return Ok(PhotoEntry {
                name,
                payload: ImagePayload::new(format.mime_type(), upload.bytes),
                width,
                height,
                caption: String::new(),
            });
        }

        let resized = resize_to_max_edge(&oriented.to_rgb8(), self.config.max_edge);
        let bytes = encode_jpeg(&resized, self.config.jpeg_quality)?;

        tracing::debug!(
            file = %name,
            from_width = width,
            from_height = height,
            width = resized.width(),
            height = resized.height(),
            "Photo downscaled"
        );

        Ok(PhotoEntry {
            name,
            width: resized.width(),
            height: resized.height(),
            payload: ImagePayload::new("image/jpeg", bytes),
            caption: String::new(),
        })
    }

    /// Ingest a batch concurrently on the blocking pool.
    pub async fn ingest_all(&self, uploads: Vec<PhotoUpload>) -> IngestBatch {
        let tasks = uploads.into_iter().map(|upload| {
            let ingestor = self.clone();
            let name = sanitize_filename(&upload.name);
            async move {
                let result = tokio::task::spawn_blocking(move || ingestor.ingest(upload))
                    .await
                    .unwrap_or_else(|e| Err(IngestError::Join(e.to_string())));
                (name, result)
            }
        });

        let mut batch = IngestBatch::default();
        for (name, result) in join_all(tasks).await {
            match result {
                Ok(entry) => batch.photos.push(entry),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Photo ingestion: file skipped");
                    batch.skipped.push(SkippedUpload {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            accepted = batch.photos.len(),
            skipped = batch.skipped.len(),
            "Photo batch ingested"
        );
        batch
    }
}

impl Default for PhotoIngestor {
    fn default() -> Self {
        Self::new(IngestConfig::default())
    }
}

//! One open report composer.
//!
//! Holds the in-memory document and wires every edit to the draft
//! autosave, photo uploads to the ingestion pipeline, and submission to
//! the export flow.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::archive::ArchiveStore;
use crate::config::{self, ComposerConfig};
use crate::db::{DatabaseError, KeyValueStore, SqliteKeyValueStore};
use crate::draft::{DraftError, DraftStore};
use crate::export::{
    save_artifact, ExportError, ExportOrchestrator, ExportOutcome, ExportPhase,
    PdfReportRenderer, RenderError, RenderedArtifact, ReportRenderer,
};
use crate::models::{Answer, ChecklistCategory, ImagePayload, ReportDocument, SchemaError};
use crate::pipeline::photo::{PhotoIngestor, PhotoUpload, SkippedUpload};

/// Result of adding a batch of photos.
#[derive(Debug, Default)]
pub struct PhotosAdded {
    pub added: usize,
    pub skipped: Vec<SkippedUpload>,
}

pub struct ComposerSession {
    document: Mutex<ReportDocument>,
    drafts: DraftStore,
    ingestor: PhotoIngestor,
    exporter: ExportOrchestrator,
}

impl ComposerSession {
    /// Open a composer, restoring any saved draft.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        renderer: Arc<dyn ReportRenderer>,
        config: ComposerConfig,
    ) -> Self {
        let drafts = DraftStore::new(store.clone(), config.draft);
        let archive = Arc::new(ArchiveStore::new(store, config.archive));
        let document = drafts.load_initial();

        tracing::info!(project = %document.title(), "Composer opened");

        Self {
            document: Mutex::new(document),
            drafts,
            ingestor: PhotoIngestor::new(config.ingest),
            exporter: ExportOrchestrator::new(renderer, archive),
        }
    }

    /// Composer over an on-disk SQLite store with the PDF renderer.
    pub fn open_at(path: &Path, config: ComposerConfig) -> Result<Self, DatabaseError> {
        let store = Arc::new(SqliteKeyValueStore::open(path)?);
        Ok(Self::open(store, Arc::new(PdfReportRenderer::new()), config))
    }

    /// Composer over the store in the app data directory.
    pub fn open_default(config: ComposerConfig) -> Result<Self, DatabaseError> {
        Self::open_at(&config::database_path(), config)
    }

    fn doc(&self) -> MutexGuard<'_, ReportDocument> {
        self.document.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self) -> ReportDocument {
        self.doc().clone()
    }

    /// Apply a change and schedule an autosave.
    pub fn edit<F: FnOnce(&mut ReportDocument)>(&self, change: F) {
        let mut doc = self.doc();
        change(&mut doc);
        self.drafts.schedule_save(&doc);
    }

    pub fn set_answer(
        &self,
        category: ChecklistCategory,
        index: usize,
        answer: Option<Answer>,
    ) -> Result<(), SchemaError> {
        let mut doc = self.doc();
        doc.set_answer(category, index, answer)?;
        self.drafts.schedule_save(&doc);
        Ok(())
    }

    /// Ingest uploads (without holding the document) and append the
    /// accepted photos in one step.
    pub async fn add_photos(&self, uploads: Vec<PhotoUpload>) -> PhotosAdded {
        let batch = self.ingestor.ingest_all(uploads).await;
        let added = batch.photos.len();
        if added > 0 {
            self.edit(|doc| doc.photos.extend(batch.photos));
        }
        PhotosAdded {
            added,
            skipped: batch.skipped,
        }
    }

    pub fn remove_photo(&self, index: usize) -> bool {
        let mut doc = self.doc();
        let removed = doc.photos.remove_at(index).is_some();
        if removed {
            self.drafts.schedule_save(&doc);
        }
        removed
    }

    pub fn set_photo_caption(&self, index: usize, caption: impl Into<String>) -> bool {
        let mut doc = self.doc();
        let updated = doc.photos.set_caption(index, caption);
        if updated {
            self.drafts.schedule_save(&doc);
        }
        updated
    }

    /// Explicit "Save Draft".
    pub fn save_draft(&self) -> Result<(), DraftError> {
        let doc = self.doc();
        self.drafts.save_now(&doc)
    }

    /// Drop the draft and start over from defaults.
    pub fn clear(&self) -> Result<(), DraftError> {
        let mut doc = self.doc();
        self.drafts.clear()?;
        *doc = ReportDocument::defaults();
        Ok(())
    }

    /// Submit the current document. The in-memory document is left as is.
    pub async fn export(&self) -> Result<ExportOutcome, ExportError> {
        let doc = self.snapshot();
        self.exporter.export(&doc).await
    }

    pub async fn re_export(&self, id: &str) -> Result<RenderedArtifact, ExportError> {
        self.exporter.re_export(id).await
    }

    pub fn export_phase(&self) -> ExportPhase {
        self.exporter.phase()
    }

    pub fn set_branding(&self, branding: Option<ImagePayload>) {
        self.exporter.set_branding(branding);
    }

    pub fn archive(&self) -> &ArchiveStore {
        self.exporter.archive()
    }

    /// Save an exported artifact under the app's exports directory.
    pub fn save_to_exports(&self, artifact: &RenderedArtifact) -> Result<PathBuf, RenderError> {
        save_artifact(artifact, &config::exports_dir())
    }

    /// Write any pending autosave, e.g. before closing.
    pub fn flush(&self) -> Result<(), DraftError> {
        self.drafts.flush()
    }
}

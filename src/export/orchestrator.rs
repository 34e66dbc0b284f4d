//! Export flow for one composer: validate, render, archive.
//!
//! ```text
//! Editing -> Validating -> Rendering -> Archived
//!               |             |
//!               +-> Editing <-+   (validation or render failure)
//! ```
//!
//! Only one submission runs at a time; a second one while the first is
//! validating or rendering is rejected as busy.

use std::sync::{Arc, Mutex, MutexGuard};

use super::renderer::{RenderedArtifact, ReportRenderer};
use super::ExportError;
use crate::archive::{ArchiveEntry, ArchiveMeta, ArchiveStore};
use crate::models::{validate, ImagePayload, ReportDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Editing,
    Validating,
    Rendering,
    Archived,
}

impl ExportPhase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating | Self::Rendering)
    }
}

/// A finished export. `entry` is `None` when the artifact rendered but the
/// archive write failed.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub artifact: RenderedArtifact,
    pub entry: Option<ArchiveEntry>,
}

pub struct ExportOrchestrator {
    renderer: Arc<dyn ReportRenderer>,
    archive: Arc<ArchiveStore>,
    branding: Mutex<Option<ImagePayload>>,
    phase: Mutex<ExportPhase>,
}

impl ExportOrchestrator {
    pub fn new(renderer: Arc<dyn ReportRenderer>, archive: Arc<ArchiveStore>) -> Self {
        Self {
            renderer,
            archive,
            branding: Mutex::new(None),
            phase: Mutex::new(ExportPhase::Editing),
        }
    }

    pub fn archive(&self) -> &Arc<ArchiveStore> {
        &self.archive
    }

    pub fn set_branding(&self, branding: Option<ImagePayload>) {
        *lock(&self.branding) = branding;
    }

    pub fn phase(&self) -> ExportPhase {
        *lock(&self.phase)
    }

    /// Claim the export slot, or report busy.
    fn begin(&self) -> Result<PhaseGuard<'_>, ExportError> {
        let mut phase = lock(&self.phase);
        if phase.is_busy() {
            return Err(ExportError::Busy);
        }
        *phase = ExportPhase::Validating;
        Ok(PhaseGuard {
            phase: &self.phase,
            armed: true,
        })
    }

    async fn render_blocking(
        &self,
        doc: ReportDocument,
    ) -> Result<RenderedArtifact, ExportError> {
        let renderer = self.renderer.clone();
        let branding = lock(&self.branding).clone();
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&doc, branding.as_ref()))
            .await
            .map_err(|e| ExportError::Join(e.to_string()))?;
        Ok(rendered?)
    }

    /// Validate, render and archive `doc`. The caller's document is never modified.
    ///
    /// Any exit short of archiving, including the future being dropped
    /// mid-render, returns the phase to `Editing`.
    pub async fn export(&self, doc: &ReportDocument) -> Result<ExportOutcome, ExportError> {
        let guard = self.begin()?;

        let validated = match validate(doc) {
            Ok(v) => v,
            Err(errors) => {
                tracing::info!(fields = errors.len(), "Export blocked by validation");
                return Err(ExportError::Validation(errors));
            }
        };

        guard.set(ExportPhase::Rendering);
        let validated = validated.into_document();
        let artifact = match self.render_blocking(validated.clone()).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(error = %e, "Export render failed");
                return Err(e);
            }
        };

        let meta = ArchiveMeta::from_document(&validated);
        let entry = match self.archive.append(&validated, meta) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    file = %artifact.file_name,
                    "Report rendered but not archived"
                );
                None
            }
        };

        guard.finish(ExportPhase::Archived);
        tracing::info!(
            file = %artifact.file_name,
            entry_id = entry.as_ref().map(|e| e.id()).unwrap_or("-"),
            "Report exported"
        );
        Ok(ExportOutcome { artifact, entry })
    }

    /// Re-render an archived report from its stored payload. Never archives.
    pub async fn re_export(&self, id: &str) -> Result<RenderedArtifact, ExportError> {
        let entry = self
            .archive
            .get(id)?
            .ok_or_else(|| ExportError::NotFound(id.to_string()))?;
        let artifact = self.render_blocking(entry.data().clone()).await?;
        tracing::info!(entry_id = %id, file = %artifact.file_name, "Archived report re-exported");
        Ok(artifact)
    }
}

/// Holds the export slot. Dropped while armed, it puts the phase back to
/// `Editing`.
struct PhaseGuard<'a> {
    phase: &'a Mutex<ExportPhase>,
    armed: bool,
}

impl PhaseGuard<'_> {
    fn set(&self, phase: ExportPhase) {
        *lock(self.phase) = phase;
    }

    fn finish(mut self, phase: ExportPhase) {
        self.set(phase);
        self.armed = false;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *lock(self.phase) = ExportPhase::Editing;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

//! Autosaved working copy of the report being composed.
//!
//! One draft lives under one storage key. Edits schedule a debounced
//! write of the whole document; explicit saves and `clear` act at once
//! and supersede anything still waiting.

use std::sync::{Arc, Mutex, MutexGuard};

use super::debounce::Debouncer;
use super::merge::merge_onto_defaults;
use super::DraftError;
use crate::config::DraftConfig;
use crate::db::KeyValueStore;
use crate::models::ReportDocument;

pub struct DraftStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    /// Latest serialized snapshot not yet written.
    pending: Arc<Mutex<Option<String>>>,
    debouncer: Debouncer,
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>, config: DraftConfig) -> Self {
        Self {
            store,
            key: config.key,
            pending: Arc::new(Mutex::new(None)),
            debouncer: Debouncer::new(config.debounce),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn pending(&self) -> MutexGuard<'_, Option<String>> {
        lock_pending(&self.pending)
    }

    /// Queue a debounced write of `doc`. Errors are logged, never returned.
    pub fn schedule_save(&self, doc: &ReportDocument) {
        let json = match serde_json::to_string(doc) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Draft autosave: serialization failed");
                return;
            }
        };
        *self.pending() = Some(json);

        let store = self.store.clone();
        let key = self.key.clone();
        let pending = self.pending.clone();
        let scheduled = self
            .debouncer
            .schedule(move || async move { write_pending(store.as_ref(), &key, &pending) });
        if !scheduled {
            tracing::warn!(key = %self.key, "No async runtime for draft autosave, writing now");
            write_pending(self.store.as_ref(), &self.key, &self.pending);
        }
    }

    /// Write `doc` now, dropping any pending autosave.
    pub fn save_now(&self, doc: &ReportDocument) -> Result<(), DraftError> {
        let json = serde_json::to_string(doc)?;
        let mut slot = self.pending();
        *slot = None;
        self.debouncer.cancel();
        self.store.set(&self.key, &json)?;
        tracing::info!(key = %self.key, "Draft saved");
        Ok(())
    }

    /// Write any pending snapshot immediately.
    pub fn flush(&self) -> Result<(), DraftError> {
        let mut slot = self.pending();
        self.debouncer.cancel();
        if let Some(json) = slot.take() {
            self.store.set(&self.key, &json)?;
            tracing::debug!(key = %self.key, "Draft flushed");
        }
        Ok(())
    }

    /// True while an autosave is waiting out its quiet period.
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Cancel any pending autosave, then delete the stored draft.
    pub fn clear(&self) -> Result<(), DraftError> {
        let mut slot = self.pending();
        *slot = None;
        self.debouncer.cancel();
        self.store.remove(&self.key)?;
        tracing::info!(key = %self.key, "Draft cleared");
        Ok(())
    }

    /// Stored draft merged onto defaults. Never fails: unreadable or
    /// unparsable drafts are treated as absent.
    pub fn load_initial(&self) -> ReportDocument {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ReportDocument::defaults(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Draft read failed, starting fresh");
                return ReportDocument::defaults();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                tracing::debug!(key = %self.key, "Restoring draft");
                merge_onto_defaults(&value)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Draft unparsable, starting fresh");
                ReportDocument::defaults()
            }
        }
    }
}

/// Write whatever snapshot is waiting. The slot lock is held across the
/// write so `clear` cannot interleave between take and set.
fn write_pending(store: &dyn KeyValueStore, key: &str, pending: &Mutex<Option<String>>) {
    let mut slot = lock_pending(pending);
    if let Some(json) = slot.take() {
        match store.set(key, &json) {
            Ok(()) => tracing::debug!(key = %key, bytes = json.len(), "Draft autosaved"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Draft autosave failed"),
        }
    }
}

fn lock_pending(pending: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
    pending.lock().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::db::{DatabaseError, MemoryKeyValueStore, SqliteKeyValueStore};

    const DEBOUNCE: Duration = Duration::from_millis(40);
    const SETTLE: Duration = Duration::from_millis(250);

    fn config() -> DraftConfig {
        DraftConfig {
            key: "sjb-daily-draft".into(),
            debounce: DEBOUNCE,
        }
    }

    fn stored(store: &dyn KeyValueStore) -> Option<serde_json::Value> {
        store
            .get("sjb-daily-draft")
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    /// Store whose writes always fail.
    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, DatabaseError> {
            Err(DatabaseError::LockPoisoned)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::LockPoisoned)
        }
        fn remove(&self, _key: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::LockPoisoned)
        }
    }

    #[tokio::test]
    async fn debounced_save_writes_last_snapshot() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(kv.clone(), config());

        let mut doc = ReportDocument::defaults();
        for name in ["L", "Li", "Line 4", "Line 42"] {
            doc.project_name = name.into();
            drafts.schedule_save(&doc);
        }
        assert!(drafts.has_pending_save());
        assert!(stored(kv.as_ref()).is_none());

        tokio::time::sleep(SETTLE).await;
        assert_eq!(stored(kv.as_ref()).unwrap()["projectName"], "Line 42");
        assert!(!drafts.has_pending_save());
    }

    #[tokio::test]
    async fn clear_after_schedule_leaves_no_draft() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(kv.clone(), config());

        let mut doc = ReportDocument::defaults();
        doc.inspector = "Jane".into();
        drafts.schedule_save(&doc);
        drafts.clear().unwrap();

        tokio::time::sleep(SETTLE).await;
        assert!(stored(kv.as_ref()).is_none());
    }

    #[tokio::test]
    async fn clear_removes_existing_draft() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(kv.clone(), config());
        drafts.save_now(&ReportDocument::defaults()).unwrap();
        assert!(stored(kv.as_ref()).is_some());

        drafts.clear().unwrap();
        assert!(stored(kv.as_ref()).is_none());
    }

    #[tokio::test]
    async fn save_now_supersedes_pending() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(kv.clone(), config());

        let mut older = ReportDocument::defaults();
        older.project_name = "older".into();
        drafts.schedule_save(&older);

        let mut newer = ReportDocument::defaults();
        newer.project_name = "newer".into();
        drafts.save_now(&newer).unwrap();

        tokio::time::sleep(SETTLE).await;
        assert_eq!(stored(kv.as_ref()).unwrap()["projectName"], "newer");
    }

    #[tokio::test]
    async fn flush_writes_pending_immediately() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(kv.clone(), config());

        let mut doc = ReportDocument::defaults();
        doc.location = "Elm & 5th".into();
        drafts.schedule_save(&doc);
        drafts.flush().unwrap();

        assert_eq!(stored(kv.as_ref()).unwrap()["location"], "Elm & 5th");
        assert!(!drafts.has_pending_save());
    }

    #[tokio::test]
    async fn autosave_failure_is_swallowed() {
        let drafts = DraftStore::new(Arc::new(FailingStore), config());
        drafts.schedule_save(&ReportDocument::defaults());
        tokio::time::sleep(SETTLE).await;
        // Explicit save still reports the failure
        assert!(matches!(
            drafts.save_now(&ReportDocument::defaults()),
            Err(DraftError::Storage(_))
        ));
    }

    #[test]
    fn load_initial_without_draft_is_defaults() {
        let drafts = DraftStore::new(Arc::new(MemoryKeyValueStore::new()), config());
        let doc = drafts.load_initial();
        assert_eq!(doc.crew.len(), 1);
        assert_eq!(doc.project_name, "");
    }

    #[test]
    fn load_initial_tolerates_garbage_and_read_errors() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set("sjb-daily-draft", "{not json").unwrap();
        let doc = DraftStore::new(kv, config()).load_initial();
        assert_eq!(doc.pipes.len(), 1);

        let doc = DraftStore::new(Arc::new(FailingStore), config()).load_initial();
        assert_eq!(doc.equipment.len(), 1);
    }

    #[tokio::test]
    async fn draft_survives_reopen_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fieldreport.db");

        let mut doc = ReportDocument::defaults();
        doc.project_name = "Persisted".into();
        {
            let kv = Arc::new(SqliteKeyValueStore::open(&path).unwrap());
            DraftStore::new(kv, config()).save_now(&doc).unwrap();
        }

        let kv = Arc::new(SqliteKeyValueStore::open(&path).unwrap());
        let restored = DraftStore::new(kv, config()).load_initial();
        assert_eq!(restored.project_name, "Persisted");
    }

    #[test]
    fn schedule_without_runtime_writes_immediately() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(kv.clone(), config());

        let mut doc = ReportDocument::defaults();
        doc.inspector = "Sam".into();
        drafts.schedule_save(&doc);

        assert!(!drafts.has_pending_save());
        assert_eq!(stored(kv.as_ref()).unwrap()["inspector"], "Sam");
        drafts.flush().unwrap();
    }
}

//! Append-only list of exported reports.
//!
//! The whole list is one JSON array under one storage key. Entries are
//! kept as raw values while rewriting, so an entry this version cannot
//! parse is still carried over untouched.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ArchiveError;
use crate::config::ArchiveConfig;
use crate::db::KeyValueStore;
use crate::models::ReportDocument;

/// Denormalized header fields, so listings never open the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveMeta {
    #[serde(rename = "projectName")]
    pub project_name: String,
    pub date: String,
    pub inspector: String,
    /// Operator / Contractor.
    #[serde(rename = "client")]
    pub operator: String,
    pub location: String,
}

impl ArchiveMeta {
    pub fn from_document(doc: &ReportDocument) -> Self {
        Self {
            project_name: doc.project_name.clone(),
            date: doc.date.clone(),
            inspector: doc.inspector.clone(),
            operator: doc.operator.clone(),
            location: doc.location.clone(),
        }
    }
}

/// One exported report. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    id: String,
    #[serde(rename = "createdAt", deserialize_with = "deserialize_created_at")]
    created_at: DateTime<Utc>,
    meta: ArchiveMeta,
    data: ReportDocument,
}

impl ArchiveEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn meta(&self) -> &ArchiveMeta {
        &self.meta
    }

    pub fn data(&self) -> &ReportDocument {
        &self.data
    }
}

/// RFC 3339 string, or epoch milliseconds as older archives wrote it.
fn deserialize_created_at<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(d)? {
        Raw::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        Raw::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
    }
}

pub struct ArchiveStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ArchiveStore {
    pub fn new(store: Arc<dyn KeyValueStore>, config: ArchiveConfig) -> Self {
        Self {
            store,
            key: config.key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw stored entries. `Ok(None)` means the stored value is not a list.
    fn read_raw(&self) -> Result<Option<Vec<Value>>, ArchiveError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Some(Vec::new()));
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => Ok(Some(items)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Archive is not valid JSON");
                Ok(None)
            }
        }
    }

    fn write_raw(&self, items: &[Value]) -> Result<(), ArchiveError> {
        let json = serde_json::to_string(items)?;
        self.store.set(&self.key, &json)?;
        Ok(())
    }

    fn corrupt(&self) -> ArchiveError {
        ArchiveError::Corrupt {
            key: self.key.clone(),
        }
    }

    /// Record an exported document. Never modifies existing entries.
    pub fn append(
        &self,
        doc: &ReportDocument,
        meta: ArchiveMeta,
    ) -> Result<ArchiveEntry, ArchiveError> {
        let mut items = self.read_raw()?.ok_or_else(|| self.corrupt())?;

        let entry = ArchiveEntry {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            meta,
            data: doc.clone(),
        };
        items.push(serde_json::to_value(&entry)?);
        self.write_raw(&items)?;

        tracing::info!(
            entry_id = %entry.id,
            project = %entry.meta.project_name,
            total = items.len(),
            "Report archived"
        );
        Ok(entry)
    }

    /// All readable entries, oldest first.
    pub fn list(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let Some(items) = self.read_raw()? else {
            tracing::warn!(key = %self.key, "Archive is not a list, reading as empty");
            return Ok(Vec::new());
        };

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<ArchiveEntry>(item) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(index, error = %e, "Skipping malformed archive entry"),
            }
        }
        Ok(entries)
    }

    pub fn get(&self, id: &str) -> Result<Option<ArchiveEntry>, ArchiveError> {
        Ok(self.list()?.into_iter().find(|e| e.id == id))
    }

    /// Delete exactly the entry with `id`. Returns whether one was removed.
    pub fn remove(&self, id: &str) -> Result<bool, ArchiveError> {
        let mut items = self.read_raw()?.ok_or_else(|| self.corrupt())?;
        let before = items.len();
        items.retain(|item| item.get("id").and_then(Value::as_str) != Some(id));

        if items.len() == before {
            tracing::debug!(entry_id = %id, "Archive remove: no such entry");
            return Ok(false);
        }
        self.write_raw(&items)?;
        tracing::info!(entry_id = %id, "Archive entry removed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKeyValueStore;

    fn archive() -> (Arc<MemoryKeyValueStore>, ArchiveStore) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let archive = ArchiveStore::new(kv.clone(), ArchiveConfig::default());
        (kv, archive)
    }

    fn doc(project: &str) -> ReportDocument {
        let mut doc = ReportDocument::defaults();
        doc.project_name = project.into();
        doc.inspector = "Jane".into();
        doc.operator = "Atmos".into();
        doc
    }

    fn append(archive: &ArchiveStore, project: &str) -> ArchiveEntry {
        let d = doc(project);
        archive.append(&d, ArchiveMeta::from_document(&d)).unwrap()
    }

    #[test]
    fn empty_archive_lists_nothing() {
        let (_, archive) = archive();
        assert!(archive.list().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_order_and_ids() {
        let (_, archive) = archive();
        let a = append(&archive, "A");
        let b = append(&archive, "B");

        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());

        let listed = archive.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].meta().project_name, "A");
        assert_eq!(listed[1].meta().project_name, "B");
        assert_eq!(listed[1].data().operator, "Atmos");
    }

    #[test]
    fn get_by_id() {
        let (_, archive) = archive();
        let a = append(&archive, "A");
        append(&archive, "B");

        assert_eq!(archive.get(a.id()).unwrap().unwrap(), a);
        assert!(archive.get("missing").unwrap().is_none());
    }

    #[test]
    fn remove_deletes_exactly_one() {
        let (_, archive) = archive();
        let a = append(&archive, "A");
        let b = append(&archive, "B");

        assert!(archive.remove(a.id()).unwrap());
        let listed = archive.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), b.id());

        assert!(!archive.remove(a.id()).unwrap());
        assert_eq!(archive.list().unwrap().len(), 1);
    }

    #[test]
    fn malformed_entries_are_skipped_but_kept() {
        let (kv, archive) = archive();
        kv.set("sjb-reports", r#"[{"id":"broken"}]"#).unwrap();

        append(&archive, "A");
        assert_eq!(archive.list().unwrap().len(), 1);

        let raw: Value = serde_json::from_str(&kv.get("sjb-reports").unwrap().unwrap()).unwrap();
        assert_eq!(raw.as_array().unwrap().len(), 2);
        assert_eq!(raw[0]["id"], "broken");
    }

    #[test]
    fn corrupt_list_is_not_overwritten() {
        let (kv, archive) = archive();
        kv.set("sjb-reports", r#"{"oops":true}"#).unwrap();

        assert!(archive.list().unwrap().is_empty());
        let d = doc("A");
        let err = archive.append(&d, ArchiveMeta::from_document(&d)).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt { .. }));
        assert_eq!(kv.get("sjb-reports").unwrap().unwrap(), r#"{"oops":true}"#);
    }

    #[test]
    fn created_at_accepts_epoch_millis() {
        let (kv, archive) = archive();
        let d = doc("Legacy");
        let legacy = serde_json::json!([{
            "id": "legacy-1",
            "createdAt": 1_700_000_000_000i64,
            "meta": ArchiveMeta::from_document(&d),
            "data": d,
        }]);
        kv.set("sjb-reports", &legacy.to_string()).unwrap();

        let entry = archive.get("legacy-1").unwrap().unwrap();
        assert_eq!(entry.created_at().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn created_at_written_as_rfc3339() {
        let (kv, archive) = archive();
        append(&archive, "A");
        let raw: Value = serde_json::from_str(&kv.get("sjb-reports").unwrap().unwrap()).unwrap();
        let created = raw[0]["createdAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn meta_from_document() {
        let mut d = doc("Line 7");
        d.location = "Main St".into();
        let meta = ArchiveMeta::from_document(&d);
        assert_eq!(meta.project_name, "Line 7");
        assert_eq!(meta.operator, "Atmos");
        assert_eq!(meta.location, "Main St");
        assert_eq!(serde_json::to_value(&meta).unwrap()["client"], "Atmos");
    }
}

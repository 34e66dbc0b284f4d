//! Restoring a persisted draft onto a fresh document.
//!
//! Drafts outlive releases, so a stored draft may be partial, stale or
//! hand-edited. Every field is merged on its own: whatever cannot be
//! read falls back to the default for that field only.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{ChecklistCategory, ChecklistSection, Photos, ReportDocument, StoredLineItem};

/// Merge a stored draft value onto `ReportDocument::defaults()`.
pub fn merge_onto_defaults(stored: &Value) -> ReportDocument {
    let mut doc = ReportDocument::defaults();
    let Some(map) = stored.as_object() else {
        tracing::warn!("Stored draft is not an object, starting fresh");
        return doc;
    };

    merge_str(map, "projectName", &mut doc.project_name);
    merge_str(map, "client", &mut doc.operator);
    merge_str(map, "clientRep", &mut doc.operator_rep);
    merge_str(map, "inspector", &mut doc.inspector);
    merge_str(map, "date", &mut doc.date);
    merge_str(map, "location", &mut doc.location);
    merge_str(map, "weather", &mut doc.weather);
    merge_str(map, "temp", &mut doc.temperature);
    merge_str(map, "wind", &mut doc.wind);
    merge_str(map, "precip", &mut doc.precipitation);
    merge_str(map, "summary", &mut doc.work_summary);

    merge_list(map, "crew", &mut doc.crew);
    merge_list(map, "equipment", &mut doc.equipment);
    merge_list(map, "pipes", &mut doc.pipes);
    merge_list(map, "materials", &mut doc.materials);

    let mut photos = Vec::new();
    if merge_list(map, "photos", &mut photos) {
        doc.photos = Photos::from(photos);
    }

    for category in ChecklistCategory::ALL {
        let mut items: Vec<StoredLineItem> = Vec::new();
        if merge_list(map, category.field_name(), &mut items) {
            doc.checklist
                .replace(ChecklistSection::from_stored(category, &items));
        }
    }

    doc
}

/// A present string wins, even when empty. Anything else keeps the default.
fn merge_str(map: &Map<String, Value>, key: &str, target: &mut String) {
    if let Some(s) = map.get(key).and_then(Value::as_str) {
        *target = s.to_string();
    }
}

/// A non-empty, well-formed array replaces the default. Returns whether it did.
fn merge_list<T: DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
    target: &mut Vec<T>,
) -> bool {
    let Some(value) = map.get(key) else {
        return false;
    };
    match value.as_array() {
        Some(items) if !items.is_empty() => match serde_json::from_value::<Vec<T>>(value.clone()) {
            Ok(parsed) => {
                *target = parsed;
                true
            }
            Err(e) => {
                tracing::warn!(field = key, error = %e, "Malformed draft field, using default");
                false
            }
        },
        _ => false,
    }
}

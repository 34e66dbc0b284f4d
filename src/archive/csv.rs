use super::store::{ArchiveEntry, ArchiveStore};
use super::ArchiveError;

pub const CSV_HEADER: [&str; 6] = [
    "project",
    "date",
    "inspector",
    "operatorContractor",
    "location",
    "createdAt",
];

/// Metadata projection of one archive entry. Never includes the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub project: String,
    pub date: String,
    pub inspector: String,
    pub operator_contractor: String,
    pub location: String,
    pub created_at: String,
}

impl FlatRow {
    pub fn from_entry(entry: &ArchiveEntry) -> Self {
        let meta = entry.meta();
        Self {
            project: meta.project_name.clone(),
            date: meta.date.clone(),
            inspector: meta.inspector.clone(),
            operator_contractor: meta.operator.clone(),
            location: meta.location.clone(),
            created_at: entry.created_at().to_rfc3339(),
        }
    }

    fn fields(&self) -> [&str; 6] {
        [
            self.project.as_str(),
            self.date.as_str(),
            self.inspector.as_str(),
            self.operator_contractor.as_str(),
            self.location.as_str(),
            self.created_at.as_str(),
        ]
    }
}

pub fn to_flat_rows(entries: &[ArchiveEntry]) -> Vec<FlatRow> {
    entries.iter().map(FlatRow::from_entry).collect()
}

/// Quote when the value holds a quote, comma or line break; double inner quotes.
fn escape_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, '"' | ',' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Header line plus one line per row, `\n`-separated.
pub fn rows_to_csv(rows: &[FlatRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for row in rows {
        let cells: Vec<String> = row.fields().iter().map(|f| escape_field(f)).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

pub fn to_csv(entries: &[ArchiveEntry]) -> String {
    rows_to_csv(&to_flat_rows(entries))
}

impl ArchiveStore {
    pub fn to_flat_rows(&self) -> Result<Vec<FlatRow>, ArchiveError> {
        Ok(to_flat_rows(&self.list()?))
    }

    pub fn to_csv(&self) -> Result<String, ArchiveError> {
        Ok(to_csv(&self.list()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveMeta, ArchiveStore};
    use crate::config::ArchiveConfig;
    use crate::db::MemoryKeyValueStore;
    use crate::models::ReportDocument;
    use std::sync::Arc;

    fn row(project: &str) -> FlatRow {
        FlatRow {
            project: project.into(),
            date: "2024-05-01".into(),
            inspector: "Jane".into(),
            operator_contractor: "Atmos".into(),
            location: "Elm".into(),
            created_at: "2024-05-01T12:00:00+00:00".into(),
        }
    }

    #[test]
    fn header_only_when_empty() {
        assert_eq!(
            rows_to_csv(&[]),
            "project,date,inspector,operatorContractor,location,createdAt"
        );
    }

    #[test]
    fn plain_values_unquoted() {
        let csv = rows_to_csv(&[row("Line 42")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[1],
            "Line 42,2024-05-01,Jane,Atmos,Elm,2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn special_characters_are_escaped() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_field("plain"), "plain");
    }

    #[test]
    fn two_entries_give_header_and_two_rows() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let archive = ArchiveStore::new(kv, ArchiveConfig::default());
        for project in ["Main, Phase 1", "Elm"] {
            let mut doc = ReportDocument::defaults();
            doc.project_name = project.into();
            archive
                .append(&doc, ArchiveMeta::from_document(&doc))
                .unwrap();
        }

        let csv = archive.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("\"Main, Phase 1\","));
        assert!(lines[2].starts_with("Elm,"));
        // Payload never leaks into the projection
        assert!(!csv.contains("secSafety"));
    }

    #[test]
    fn flat_rows_follow_entries() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let archive = ArchiveStore::new(kv, ArchiveConfig::default());
        let mut doc = ReportDocument::defaults();
        doc.operator = "Contractor X".into();
        archive.append(&doc, ArchiveMeta::from_document(&doc)).unwrap();

        let rows = archive.to_flat_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operator_contractor, "Contractor X");
    }
}

//! Export-time validation.
//!
//! `validate` never touches its input. On success it hands back a
//! `ValidatedReport` holding a trimmed copy, which is the only form the
//! export path accepts.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use super::report::{CrewMember, EquipmentEntry, MaterialItem, PipeRun, ReportDocument};

const REQUIRED: &str = "Required";

/// Field-keyed validation failures. Keys are JSON paths such as
/// `projectName` or `pipes.1.ptype`.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    fn add(&mut self, path: impl Into<String>, message: &str) {
        self.errors.insert(path.into(), message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) need attention", self.errors.len())?;
        for (i, (path, message)) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{path} ({message})")?;
        }
        Ok(())
    }
}

/// A trimmed document that passed `validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReport {
    document: ReportDocument,
}

impl ValidatedReport {
    pub fn document(&self) -> &ReportDocument {
        &self.document
    }

    pub fn into_document(self) -> ReportDocument {
        self.document
    }
}

/// A row kind with its own required-field rules.
trait Row: Sized {
    /// JSON key of the list the row lives in.
    const LIST: &'static str;

    fn trimmed(&self) -> Self;

    fn is_blank(&self) -> bool;

    /// `(json field, value)` pairs that must be non-empty.
    fn required(&self) -> Vec<(&'static str, &str)>;
}

impl Row for CrewMember {
    const LIST: &'static str = "crew";

    fn trimmed(&self) -> Self {
        Self {
            name: trim(&self.name),
            company: trim(&self.company),
            role: trim(&self.role),
        }
    }

    fn is_blank(&self) -> bool {
        self.name.is_empty() && self.company.is_empty() && self.role.is_empty()
    }

    fn required(&self) -> Vec<(&'static str, &str)> {
        vec![("name", &self.name)]
    }
}

impl Row for EquipmentEntry {
    const LIST: &'static str = "equipment";

    fn trimmed(&self) -> Self {
        Self {
            kind: trim(&self.kind),
            quantity: trim(&self.quantity),
        }
    }

    fn is_blank(&self) -> bool {
        self.kind.is_empty() && self.quantity.is_empty()
    }

    fn required(&self) -> Vec<(&'static str, &str)> {
        vec![("type", &self.kind)]
    }
}

impl Row for PipeRun {
    const LIST: &'static str = "pipes";

    fn trimmed(&self) -> Self {
        Self {
            size: trim(&self.size),
            kind: trim(&self.kind),
            footage: trim(&self.footage),
            serial: trim(&self.serial),
        }
    }

    fn is_blank(&self) -> bool {
        self.size.is_empty()
            && self.kind.is_empty()
            && self.footage.is_empty()
            && self.serial.is_empty()
    }

    fn required(&self) -> Vec<(&'static str, &str)> {
        vec![("size", &self.size), ("ptype", &self.kind)]
    }
}

impl Row for MaterialItem {
    const LIST: &'static str = "materials";

    fn trimmed(&self) -> Self {
        Self {
            item: trim(&self.item),
            spec: trim(&self.spec),
            quantity: trim(&self.quantity),
            notes: trim(&self.notes),
        }
    }

    fn is_blank(&self) -> bool {
        self.item.is_empty()
            && self.spec.is_empty()
            && self.quantity.is_empty()
            && self.notes.is_empty()
    }

    fn required(&self) -> Vec<(&'static str, &str)> {
        vec![("item", &self.item)]
    }
}

fn trim(s: &str) -> String {
    s.trim().to_string()
}

/// Trim every row, drop untouched placeholder rows, and record missing
/// required fields under the row's original index.
fn validate_rows<R: Row>(rows: &[R], errors: &mut ValidationErrors) -> Vec<R> {
    let mut kept = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let row = row.trimmed();
        if row.is_blank() {
            continue;
        }
        for (field, value) in row.required() {
            if value.is_empty() {
                errors.add(format!("{}.{index}.{field}", R::LIST), REQUIRED);
            }
        }
        kept.push(row);
    }
    kept
}

fn require(value: &str, path: &str, message: &str, errors: &mut ValidationErrors) -> String {
    let value = trim(value);
    if value.is_empty() {
        errors.add(path, message);
    }
    value
}

/// Check a document for export.
pub fn validate(doc: &ReportDocument) -> Result<ValidatedReport, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let project_name = require(
        &doc.project_name,
        "projectName",
        "Project is required",
        &mut errors,
    );
    let inspector = require(&doc.inspector, "inspector", "Inspector is required", &mut errors);
    let date = require(&doc.date, "date", "Date is required", &mut errors);
    let work_summary = require(
        &doc.work_summary,
        "summary",
        "Work summary is required",
        &mut errors,
    );

    let crew = validate_rows(&doc.crew, &mut errors);
    let equipment = validate_rows(&doc.equipment, &mut errors);
    let pipes = validate_rows(&doc.pipes, &mut errors);
    let materials = validate_rows(&doc.materials, &mut errors);

    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "Report failed validation");
        return Err(errors);
    }

    let mut photos = doc.photos.clone();
    for index in 0..photos.len() {
        if let Some(caption) = photos.get(index).map(|p| trim(&p.caption)) {
            photos.set_caption(index, caption);
        }
    }

    Ok(ValidatedReport {
        document: ReportDocument {
            project_name,
            operator: trim(&doc.operator),
            operator_rep: trim(&doc.operator_rep),
            inspector,
            date,
            location: trim(&doc.location),
            weather: trim(&doc.weather),
            temperature: trim(&doc.temperature),
            wind: trim(&doc.wind),
            precipitation: trim(&doc.precipitation),
            crew,
            equipment,
            work_summary,
            pipes,
            materials,
            checklist: doc.checklist.clone(),
            photos,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ReportDocument {
        let mut doc = ReportDocument::defaults();
        doc.project_name = "Line 42 Rehab".into();
        doc.inspector = "Jane Smith".into();
        doc.work_summary = "Bored 120 ft of 2\" PE under Elm St.".into();
        doc
    }

    #[test]
    fn defaults_with_required_scalars_pass() {
        let validated = validate(&filled()).unwrap();
        // Untouched placeholder rows are dropped
        assert!(validated.document().crew.is_empty());
        assert!(validated.document().pipes.is_empty());
    }

    #[test]
    fn missing_scalars_report_original_messages() {
        let mut doc = ReportDocument::defaults();
        doc.date = "   ".into();
        let errors = validate(&doc).unwrap_err();
        assert_eq!(errors.get("projectName"), Some("Project is required"));
        assert_eq!(errors.get("inspector"), Some("Inspector is required"));
        assert_eq!(errors.get("date"), Some("Date is required"));
        assert_eq!(errors.get("summary"), Some("Work summary is required"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn row_errors_are_keyed_by_path() {
        let mut doc = filled();
        doc.pipes = vec![
            PipeRun {
                size: "2\"".into(),
                kind: "PE".into(),
                ..Default::default()
            },
            PipeRun {
                size: "4\"".into(),
                footage: "80".into(),
                ..Default::default()
            },
        ];
        doc.crew[0].role = "Foreman".into();

        let errors = validate(&doc).unwrap_err();
        assert_eq!(errors.get("pipes.1.ptype"), Some("Required"));
        assert_eq!(errors.get("crew.0.name"), Some("Required"));
        assert!(!errors.contains("pipes.0.ptype"));
        assert!(!errors.contains("pipes.1.size"));
    }

    #[test]
    fn whitespace_only_required_field_fails() {
        let mut doc = filled();
        doc.inspector = " \t ".into();
        let errors = validate(&doc).unwrap_err();
        assert!(errors.contains("inspector"));
    }

    #[test]
    fn output_is_trimmed_and_input_untouched() {
        let mut doc = filled();
        doc.project_name = "  Line 42  ".into();
        doc.materials.push(MaterialItem {
            item: " Coupling ".into(),
            ..Default::default()
        });
        let before = doc.clone();

        let validated = validate(&doc).unwrap();
        assert_eq!(validated.document().project_name, "Line 42");
        assert_eq!(validated.document().materials[0].item, "Coupling");
        assert_eq!(doc, before);
    }

    #[test]
    fn display_lists_fields() {
        let errors = validate(&ReportDocument::defaults()).unwrap_err();
        let text = errors.to_string();
        assert!(text.contains("projectName"));
        assert!(text.starts_with("4 field(s)"));
    }
}

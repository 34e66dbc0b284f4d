//! The report document: header scalars, repeated-entry rows, the nine
//! checklist sections, and attached photos.
//!
//! Field names on the wire are the ones stored drafts and archives use
//! (`projectName`, `client`, `ptype`, `secSafety`, ...).

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::checklist::{Checklist, ChecklistCategory, ChecklistSection};
use super::enums::Answer;
use super::photo::Photos;
use super::SchemaError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewMember {
    pub name: String,
    pub company: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "qty")]
    pub quantity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeRun {
    pub size: String,
    #[serde(rename = "ptype")]
    pub kind: String,
    pub footage: String,
    pub serial: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialItem {
    pub item: String,
    pub spec: String,
    #[serde(rename = "qty")]
    pub quantity: String,
    pub notes: String,
}

/// One inspection visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDocument {
    #[serde(rename = "projectName")]
    pub project_name: String,
    /// Operator / Contractor.
    #[serde(rename = "client")]
    pub operator: String,
    /// Operator/Contractor representative signing off.
    #[serde(rename = "clientRep")]
    pub operator_rep: String,
    pub inspector: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub location: String,

    pub weather: String,
    #[serde(rename = "temp")]
    pub temperature: String,
    pub wind: String,
    #[serde(rename = "precip")]
    pub precipitation: String,

    pub crew: Vec<CrewMember>,
    pub equipment: Vec<EquipmentEntry>,
    #[serde(rename = "summary")]
    pub work_summary: String,
    pub pipes: Vec<PipeRun>,
    pub materials: Vec<MaterialItem>,

    #[serde(flatten)]
    pub checklist: Checklist,

    pub photos: Photos,
}

impl Default for ReportDocument {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ReportDocument {
    /// Fresh document: template checklists with no answers, one blank
    /// crew/equipment/pipe row, no materials or photos, today's date.
    pub fn defaults() -> Self {
        Self {
            project_name: String::new(),
            operator: String::new(),
            operator_rep: String::new(),
            inspector: String::new(),
            date: today(),
            location: String::new(),
            weather: String::new(),
            temperature: String::new(),
            wind: String::new(),
            precipitation: String::new(),
            crew: vec![CrewMember::default()],
            equipment: vec![EquipmentEntry::default()],
            work_summary: String::new(),
            pipes: vec![PipeRun::default()],
            materials: Vec::new(),
            checklist: Checklist::default(),
            photos: Photos::new(),
        }
    }

    pub fn section(&self, category: ChecklistCategory) -> &ChecklistSection {
        self.checklist.section(category)
    }

    pub fn set_answer(
        &mut self,
        category: ChecklistCategory,
        index: usize,
        answer: Option<Answer>,
    ) -> Result<(), SchemaError> {
        self.checklist.set_answer(category, index, answer)
    }

    /// Heading shown while composing; falls back when no project is named.
    pub fn title(&self) -> &str {
        let name = self.project_name.trim();
        if name.is_empty() {
            "SJB Report"
        } else {
            name
        }
    }
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_shape() {
        let doc = ReportDocument::defaults();
        assert_eq!(doc.crew.len(), 1);
        assert_eq!(doc.equipment.len(), 1);
        assert_eq!(doc.pipes.len(), 1);
        assert!(doc.materials.is_empty());
        assert!(doc.photos.is_empty());
        assert_eq!(doc.date, today());
        for category in ChecklistCategory::ALL {
            let section = doc.section(category);
            assert_eq!(section.len(), category.template().len());
            assert_eq!(section.answered_count(), 0);
        }
    }

    #[test]
    fn date_is_iso_calendar_date() {
        let date = today();
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn serializes_with_stored_field_names() {
        let mut doc = ReportDocument::defaults();
        doc.project_name = "Line 42 Rehab".into();
        doc.operator = "Atmos".into();
        doc.temperature = "78".into();
        doc.pipes[0].kind = "HDPE".into();
        doc.equipment[0].quantity = "2".into();

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["projectName"], "Line 42 Rehab");
        assert_eq!(value["client"], "Atmos");
        assert_eq!(value["temp"], "78");
        assert_eq!(value["pipes"][0]["ptype"], "HDPE");
        assert_eq!(value["equipment"][0]["qty"], "2");
        assert!(value["secSafety"].is_array());
        assert!(value["secRecords"].is_array());
        assert!(value["photos"].is_array());
    }

    #[test]
    fn round_trips_through_json() {
        let mut doc = ReportDocument::defaults();
        doc.inspector = "Jane Smith".into();
        doc.materials.push(MaterialItem {
            item: "Tee".into(),
            spec: "2\" PE".into(),
            quantity: "3".into(),
            notes: String::new(),
        });
        doc.set_answer(ChecklistCategory::MeterSet, 1, Some(Answer::NotApplicable))
            .unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let back: ReportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn missing_row_fields_default_to_empty() {
        let value = json!({ "crew": [{ "name": "Bo" }] });
        let doc: ReportDocument = serde_json::from_value(value).unwrap();
        assert_eq!(doc.crew[0].name, "Bo");
        assert_eq!(doc.crew[0].company, "");
    }

    #[test]
    fn title_falls_back_when_unnamed() {
        let mut doc = ReportDocument::defaults();
        assert_eq!(doc.title(), "SJB Report");
        doc.project_name = "  Line 42  ".into();
        assert_eq!(doc.title(), "Line 42");
    }
}

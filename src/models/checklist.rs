//! Regulatory checklist sections.
//!
//! Labels and references are policy, not user data: each category owns a
//! static template, and a section only carries one answer slot per template
//! line, addressed by position. On the wire a section is written as
//! `[{label, ref?, val?}, ...]` for readability, but only `val` is ever read
//! back, so stored label text can never replace the template.

use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::enums::{Answer, AnswerScale};
use super::SchemaError;

/// One fixed line of a checklist template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTemplate {
    pub label: &'static str,
    /// Regulatory citation (49 CFR part 192 section), when the line has one.
    pub reference: Option<&'static str>,
}

const fn line(label: &'static str) -> LineTemplate {
    LineTemplate {
        label,
        reference: None,
    }
}

const fn cited(label: &'static str, reference: &'static str) -> LineTemplate {
    LineTemplate {
        label,
        reference: Some(reference),
    }
}

const SAFETY: &[LineTemplate] = &[
    line("JSA Form/Report Completed Each Day"),
    line("Emergency Contact List on Site Each Day"),
    line("Identified any specific site Hazards? (If yes see comments)"),
    line("Identified any AOC’s for reporting week? (If yes see comments)"),
    line("All Employees had Appropriate PPE?"),
    line("Traffic Safety Plan in Place each day?"),
    line("Contractor had Competent Person On-Site each day?"),
    line("Any documented Near Misses for reporting week? (If yes see comments)"),
    line("Inspector had copy of all equipment certification documents?"),
    line("TWIC Card Required"),
    line("Stop work authority executed? (If yes see comments)"),
];

const PERMITS: &[LineTemplate] = &[
    line("LA – DOTD Highway"),
    line("Parish"),
    line("EPA/Wetland"),
];

const GENERAL_CONSTRUCTION: &[LineTemplate] = &[
    cited(
        "Inspector performed post-construction leak survey using laser leak detector",
        "192.303-192.329",
    ),
    line("All general construction practices met DOT/Operator requirements?"),
    cited(
        "Appropriate purging procedures followed for purging of air?",
        "192.629(a)",
    ),
    cited(
        "Abandonment/Deactivation of Facilities followed operator procedures?",
        "192.727",
    ),
];

const PLASTIC_PIPE: &[LineTemplate] = &[
    line("Inspector witnessed fusion of PE pipe components (socket/butt/electro-fusion)"),
    line("Persons performing fusion signed & dated adjacent pipe"),
    line("Inspector documented & reported discrepancies (bad joints, depth, tracer wire, etc.)"),
    line("Inspector verified tracer wire with low-frequency locator (~512 Hz)"),
];

const VALVES: &[LineTemplate] = &[
    line("All valves open; hand holes set; stems centered; holes clear of debris"),
    line("At completion of phase, all valves verified open"),
];

const DAMAGE_PREVENTION: &[LineTemplate] = &[
    cited(
        "Pipeline markers/signs correctly placed per operator specs/standards",
        "192.707(a)",
    ),
    cited(
        "Signs/markers have correct contact & damage prevention info",
        "192.707(d)(2)",
    ),
    line("Temporary locate flags/paint placed on top of new pipe"),
];

const METER_SET: &[LineTemplate] = &[
    cited(
        "Meters & service regulators installed per regs/operator specs",
        "192.353-357",
    ),
    cited("Service lines installed per regs/operator specs", "192.361-381"),
    cited("Service lines tested before being placed in service", "192.511-517"),
];

const BACKFILL: &[LineTemplate] = &[
    line("Open trenches/bell holes properly barricaded if left open overnight"),
    line("Proper shoring of trenches/bore pits; worker protection in install/tie-in/purge"),
    line("Trench line backfilled adequately"),
    line("Erosion control measures taken on trench line"),
    line("Construction debris cleared from job site"),
    line("Construction damage to property repaired"),
    line("Repairs made to concrete cuts/driveways"),
    line("Temporary facilities for test gauges/bleed-down removed"),
];

const RECORDS: &[LineTemplate] = &[
    cited(
        "Employee Qualification/Certification records current for project",
        "192.807",
    ),
    line("As-built drawings completed for daily work"),
    line("As-built for service lines include excess flow valves"),
    line("GIS/Pipe fitting data collected by Inspector or Operator"),
    line("Pressure test charts completed, signed by witness"),
    line("Verified sampling/measurements of as-builts"),
];

/// The nine checklist categories, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecklistCategory {
    Safety,
    Permits,
    GeneralConstruction,
    PlasticPipe,
    Valves,
    DamagePrevention,
    MeterSet,
    Backfill,
    Records,
}

impl ChecklistCategory {
    pub const ALL: [ChecklistCategory; 9] = [
        Self::Safety,
        Self::Permits,
        Self::GeneralConstruction,
        Self::PlasticPipe,
        Self::Valves,
        Self::DamagePrevention,
        Self::MeterSet,
        Self::Backfill,
        Self::Records,
    ];

    /// Key of this section in the serialized document.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Safety => "secSafety",
            Self::Permits => "secPermits",
            Self::GeneralConstruction => "secGeneral",
            Self::PlasticPipe => "secPlastic",
            Self::Valves => "secValves",
            Self::DamagePrevention => "secDamage",
            Self::MeterSet => "secMeter",
            Self::Backfill => "secBackfill",
            Self::Records => "secRecords",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.field_name() == name)
    }

    /// Section heading on the rendered report.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Safety => "Jobsite Safety Awareness / Knowledge",
            Self::Permits => "Jobsite Permits",
            Self::GeneralConstruction => "General Construction Practices",
            Self::PlasticPipe => "Plastic Pipe Installation",
            Self::Valves => "Distribution Line Valves",
            Self::DamagePrevention => "Damage Prevention",
            Self::MeterSet => "Meter Set Installed",
            Self::Backfill => "Job Site / Back Fill",
            Self::Records => "Records",
        }
    }

    pub fn scale(&self) -> AnswerScale {
        match self {
            Self::Safety | Self::GeneralConstruction => AnswerScale::YesNo,
            _ => AnswerScale::Full,
        }
    }

    pub fn template(&self) -> &'static [LineTemplate] {
        match self {
            Self::Safety => SAFETY,
            Self::Permits => PERMITS,
            Self::GeneralConstruction => GENERAL_CONSTRUCTION,
            Self::PlasticPipe => PLASTIC_PIPE,
            Self::Valves => VALVES,
            Self::DamagePrevention => DAMAGE_PREVENTION,
            Self::MeterSet => METER_SET,
            Self::Backfill => BACKFILL,
            Self::Records => RECORDS,
        }
    }
}

impl fmt::Display for ChecklistCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A template line paired with its current answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub label: &'static str,
    pub reference: Option<&'static str>,
    pub answer: Option<Answer>,
}

/// Stored shape of a line item. Only `val` is trusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredLineItem {
    #[serde(default)]
    val: Option<serde_json::Value>,
}

impl StoredLineItem {
    fn answer_code(&self) -> Option<&str> {
        self.val.as_ref().and_then(|v| v.as_str())
    }
}

/// Answers for one category. Always exactly `template().len()` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistSection {
    category: ChecklistCategory,
    answers: Vec<Option<Answer>>,
}

impl ChecklistSection {
    /// Unanswered section.
    pub fn new(category: ChecklistCategory) -> Self {
        Self {
            category,
            answers: vec![None; category.template().len()],
        }
    }

    /// Rebuild a section from stored items, by position.
    ///
    /// Extra stored items are dropped, missing ones stay unanswered, and codes
    /// that are unknown or outside the category's scale are discarded.
    pub fn from_stored(category: ChecklistCategory, items: &[StoredLineItem]) -> Self {
        let mut section = Self::new(category);
        let scale = category.scale();
        for (slot, item) in section.answers.iter_mut().zip(items) {
            let Some(code) = item.answer_code() else {
                continue;
            };
            match code.parse::<Answer>() {
                Ok(answer) if scale.allows(answer) => *slot = Some(answer),
                _ => {
                    tracing::debug!(
                        section = category.field_name(),
                        code,
                        "Discarding stored checklist answer outside category scale"
                    );
                }
            }
        }
        section
    }

    pub fn category(&self) -> ChecklistCategory {
        self.category
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn answers(&self) -> &[Option<Answer>] {
        &self.answers
    }

    pub fn answer(&self, index: usize) -> Option<Answer> {
        self.answers.get(index).copied().flatten()
    }

    /// Set or clear the answer at `index`.
    pub fn set_answer(&mut self, index: usize, answer: Option<Answer>) -> Result<(), SchemaError> {
        if let Some(a) = answer {
            if !self.category.scale().allows(a) {
                return Err(SchemaError::AnswerOutOfScale {
                    section: self.category.field_name(),
                    answer: a.as_str(),
                });
            }
        }
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(SchemaError::IndexOutOfRange {
                section: self.category.field_name(),
                index,
                len,
            })?;
        *slot = answer;
        Ok(())
    }

    /// Template lines with their answers, in order.
    pub fn items(&self) -> impl Iterator<Item = LineItem> + '_ {
        self.category
            .template()
            .iter()
            .zip(&self.answers)
            .map(|(t, a)| LineItem {
                label: t.label,
                reference: t.reference,
                answer: *a,
            })
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }
}

#[derive(Serialize)]
struct LineItemOut<'a> {
    label: &'a str,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    val: Option<Answer>,
}

impl Serialize for ChecklistSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.answers.len()))?;
        for item in self.items() {
            seq.serialize_element(&LineItemOut {
                label: item.label,
                reference: item.reference,
                val: item.answer,
            })?;
        }
        seq.end()
    }
}

/// All nine sections, always present, in `ChecklistCategory::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    sections: Vec<ChecklistSection>,
}

impl Default for Checklist {
    fn default() -> Self {
        Self {
            sections: ChecklistCategory::ALL
                .into_iter()
                .map(ChecklistSection::new)
                .collect(),
        }
    }
}

impl Checklist {
    fn position(category: ChecklistCategory) -> usize {
        ChecklistCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default()
    }

    pub fn section(&self, category: ChecklistCategory) -> &ChecklistSection {
        &self.sections[Self::position(category)]
    }

    pub fn section_mut(&mut self, category: ChecklistCategory) -> &mut ChecklistSection {
        &mut self.sections[Self::position(category)]
    }

    /// Replace one section. The section carries its own category.
    pub fn replace(&mut self, section: ChecklistSection) {
        let idx = Self::position(section.category);
        self.sections[idx] = section;
    }

    pub fn sections(&self) -> impl Iterator<Item = &ChecklistSection> {
        self.sections.iter()
    }

    pub fn set_answer(
        &mut self,
        category: ChecklistCategory,
        index: usize,
        answer: Option<Answer>,
    ) -> Result<(), SchemaError> {
        self.section_mut(category).set_answer(index, answer)
    }
}

impl Serialize for Checklist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(section.category.field_name(), section)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Checklist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChecklistVisitor;

        impl<'de> Visitor<'de> for ChecklistVisitor {
            type Value = Checklist;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of checklist sections")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Checklist, A::Error> {
                let mut checklist = Checklist::default();
                while let Some(key) = map.next_key::<String>()? {
                    match ChecklistCategory::from_field_name(&key) {
                        Some(category) => {
                            let items: Vec<StoredLineItem> = map
                                .next_value()
                                .map_err(|e| de::Error::custom(format!("{key}: {e}")))?;
                            checklist.replace(ChecklistSection::from_stored(category, &items));
                        }
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(checklist)
            }
        }

        deserializer.deserialize_map(ChecklistVisitor)
    }
}

pub mod checklist;
pub mod enums;
pub mod photo;
pub mod report;
pub mod validation;

pub use checklist::*;
pub use enums::*;
pub use photo::*;
pub use report::*;
pub use validation::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Answer {answer} is not allowed in {section}")]
    AnswerOutOfScale {
        section: &'static str,
        answer: &'static str,
    },

    #[error("Line {index} out of range for {section} ({len} lines)")]
    IndexOutOfRange {
        section: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid image data URL: {0}")]
    InvalidDataUrl(String),
}

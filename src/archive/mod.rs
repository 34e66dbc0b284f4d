pub mod csv;
pub mod store;

pub use csv::*;
pub use store::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored archive under {key} is not a list; refusing to overwrite")]
    Corrupt { key: String },
}

pub mod debounce;
pub mod merge;
pub mod store;

pub use debounce::*;
pub use merge::*;
pub use store::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

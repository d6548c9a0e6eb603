//! Training-table records and the sources that produce them.
//!
//! The engine never writes to the weld database; it consumes one flat read
//! query and is otherwise storage-agnostic.

pub mod source;
pub mod types;

pub use source::{SqliteTrainingSource, TrainingSource};
pub use types::*;

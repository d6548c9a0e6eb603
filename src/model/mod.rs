//! Learning core: encoding, scaling, tree ensembles and model selection.
//!
//! Everything here is pure computation over in-memory matrices. Training
//! orchestration lives in [`crate::trainer`], persistence in
//! [`crate::artifacts`].

pub mod boosting;
pub mod encoder;
pub mod forest;
pub mod matrix;
pub mod metrics;
pub mod regressor;
pub mod scaler;
pub mod selection;
pub mod tree;

pub use encoder::{LabelVocabulary, UNKNOWN_LABEL};
pub use matrix::Matrix;
pub use regressor::{ModelFamily, Regressor, FALLBACK_CONFIDENCE};
pub use scaler::StandardScaler;
pub use selection::{CrossValidationResult, KFold};

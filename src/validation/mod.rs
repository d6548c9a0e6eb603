//! Weld parameter validation and advisory engine.
//!
//! Checks any candidate parameter set, predicted or typed in by a user,
//! against engineering limits and process heuristics. Independent of the
//! prediction side: it never needs a trained model.
//!
//! # Architecture
//!
//! - **Rules**: Loaded from TOML config (or embedded defaults)
//! - **Checks**: Absolute ranges, filler compatibility, process heuristics,
//!   thickness consistency; all run and accumulate
//! - **Severity**: `error` if any error, else `warning` if any warning, else `ok`
//! - **Suggestions**: Optimization hints, only for results without errors
//!
//! # Example
//!
//! ```ignore
//! use weldmate::validation::{default_rules, Validator, WeldParameters};
//!
//! let validator = Validator::new(default_rules());
//!
//! let params = WeldParameters {
//!     voltage: Some(20.0),
//!     amperage: Some(150.0),
//!     wire_feed_speed: Some(0.0),
//!     process: Some("GMAW".to_string()),
//!     ..Default::default()
//! };
//!
//! let result = validator.validate(&params, None);
//! for error in &result.errors {
//!     println!("Error: {}", error);
//! }
//! for hint in validator.suggest(&params, &result) {
//!     println!("Hint: {}", hint);
//! }
//! ```

mod engine;
mod rules;
mod types;

pub use engine::{Findings, Validator};
pub use rules::{default_rules, load_rules};
pub use types::*;

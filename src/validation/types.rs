//! Type definitions for parameter validation.
//!
//! Rule types deserialize from TOML; parameter and result types are the
//! JSON shapes callers exchange with the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// CONFIGURATION TYPES (loaded from TOML)
// =============================================================================

/// Root configuration loaded from weld_rules.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRules {
    /// Share of a limit span, at each end, that counts as "near the limit"
    pub near_limit_fraction: f64,
    pub limits: ParameterLimits,
    /// Base material name -> fillers known to work with it
    #[serde(default)]
    pub compatibility: HashMap<String, Vec<String>>,
    /// Heuristics keyed by process code (GMAW, GTAW, ...)
    #[serde(default)]
    pub processes: HashMap<String, ProcessRules>,
    pub thickness: ThicknessRules,
    pub suggestions: SuggestionRules,
}

/// Inclusive absolute bounds for one parameter.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Limit {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterLimits {
    pub voltage: Limit,
    pub amperage: Limit,
    pub wire_feed_speed: Limit,
    pub travel_speed: Limit,
    pub thickness: Limit,
}

/// How a process treats the wire-feed-speed parameter.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WireFeedRule {
    /// Missing or zero is an error
    Required,
    /// Any positive value is a warning
    NotApplicable,
    #[default]
    Optional,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRules {
    pub display_name: String,
    #[serde(default)]
    pub wire_feed: WireFeedRule,
    #[serde(default)]
    pub wire_feed_message: String,
    /// Empirical band for `voltage / amperage * 100`
    #[serde(default)]
    pub ratio: Option<RatioBand>,
    #[serde(default)]
    pub voltage_checks: Vec<VoltageCheck>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatioBand {
    pub min: f64,
    pub max: f64,
    pub low_message: String,
    pub high_message: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Below,
    Above,
}

/// Warn when the voltage is strictly below/above `value`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoltageCheck {
    pub when: Comparison,
    pub value: f64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThicknessRules {
    pub amps_per_mm: f64,
    pub low_factor: f64,
    pub high_factor: f64,
    pub thick_above: f64,
    pub thick_min_voltage: f64,
    pub thin_below: f64,
    pub thin_max_voltage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionRules {
    pub min_power_per_mm: f64,
    pub max_power_per_mm: f64,
    pub fast_travel: f64,
    pub thick_for_fast_travel: f64,
    pub slow_travel: f64,
    pub thin_for_slow_travel: f64,
}

// =============================================================================
// INPUT TYPES
// =============================================================================

/// A candidate parameter set. Any field may be absent; absent fields are
/// not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldParameters {
    pub voltage: Option<f64>,
    pub amperage: Option<f64>,
    pub wire_feed_speed: Option<f64>,
    pub travel_speed: Option<f64>,
    /// Material thickness in mm
    pub thickness: Option<f64>,
    /// Process code (GMAW, GTAW, SMAW, FCAW or a shop name like MIG)
    pub process: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialInfo {
    pub base_material: Option<String>,
    pub filler_material: Option<String>,
}

// =============================================================================
// OUTPUT TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

/// Accumulated findings of every check, in check order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when there are no errors (warnings allowed)
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn new(errors: Vec<String>, warnings: Vec<String>) -> Self {
        let severity = if !errors.is_empty() {
            Severity::Error
        } else if !warnings.is_empty() {
            Severity::Warning
        } else {
            Severity::Ok
        };
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            severity,
        }
    }
}

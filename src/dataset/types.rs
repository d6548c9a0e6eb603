//! Record types shared by training, prediction and validation.
//!
//! Everything here is plain serde data: rows arrive from a `TrainingSource`,
//! cases arrive from callers as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// TARGETS AND COLUMNS
// =============================================================================

/// One of the four machine settings the engine predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Voltage,
    Amperage,
    WireFeedSpeed,
    TravelSpeed,
}

impl Target {
    pub const ALL: [Target; 4] = [
        Target::Voltage,
        Target::Amperage,
        Target::WireFeedSpeed,
        Target::TravelSpeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Voltage => "voltage",
            Target::Amperage => "amperage",
            Target::WireFeedSpeed => "wire_feed_speed",
            Target::TravelSpeed => "travel_speed",
        }
    }

    pub fn from_name(name: &str) -> Option<Target> {
        Target::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical descriptors that are label-encoded before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    Process,
    Position,
    JointType,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 3] = [
        CategoricalColumn::Process,
        CategoricalColumn::Position,
        CategoricalColumn::JointType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalColumn::Process => "process",
            CategoricalColumn::Position => "position",
            CategoricalColumn::JointType => "joint_type",
        }
    }
}

impl fmt::Display for CategoricalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of the model input matrix.
///
/// The persisted feature schema is a list of these names; inference rebuilds
/// the input vector in exactly that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Thickness,
    BaseCarbon,
    BaseThermal,
    BaseMeltingPoint,
    BaseDensity,
    FillerCarbon,
    FillerThermal,
    Encoded(CategoricalColumn),
}

/// Column order used for every model trained by this crate.
pub const DEFAULT_SCHEMA: [FeatureColumn; 10] = [
    FeatureColumn::Thickness,
    FeatureColumn::BaseCarbon,
    FeatureColumn::BaseThermal,
    FeatureColumn::BaseMeltingPoint,
    FeatureColumn::BaseDensity,
    FeatureColumn::FillerCarbon,
    FeatureColumn::FillerThermal,
    FeatureColumn::Encoded(CategoricalColumn::Process),
    FeatureColumn::Encoded(CategoricalColumn::Position),
    FeatureColumn::Encoded(CategoricalColumn::JointType),
];

impl FeatureColumn {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Thickness => "thickness",
            FeatureColumn::BaseCarbon => "base_carbon",
            FeatureColumn::BaseThermal => "base_thermal",
            FeatureColumn::BaseMeltingPoint => "base_melting_point",
            FeatureColumn::BaseDensity => "base_density",
            FeatureColumn::FillerCarbon => "filler_carbon",
            FeatureColumn::FillerThermal => "filler_thermal",
            FeatureColumn::Encoded(CategoricalColumn::Process) => "process_encoded",
            FeatureColumn::Encoded(CategoricalColumn::Position) => "position_encoded",
            FeatureColumn::Encoded(CategoricalColumn::JointType) => "joint_type_encoded",
        }
    }

    pub fn from_name(name: &str) -> Option<FeatureColumn> {
        DEFAULT_SCHEMA.into_iter().find(|c| c.name() == name)
    }
}

pub fn schema_names(schema: &[FeatureColumn]) -> Vec<String> {
    schema.iter().map(|c| c.name().to_string()).collect()
}

// =============================================================================
// INPUT RECORDS
// =============================================================================

/// Feature-side description of a weld: what a caller knows before choosing
/// machine settings. Numeric fields are nullable because they come from
/// LEFT JOINs on the reference tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDescriptor {
    /// Joint thickness in mm
    pub thickness: Option<f64>,
    pub base_carbon: Option<f64>,
    /// Thermal conductivity of the base material (W/m·K)
    pub base_thermal: Option<f64>,
    /// Melting point of the base material (°C)
    pub base_melting_point: Option<f64>,
    /// Density of the base material (g/cm³)
    pub base_density: Option<f64>,
    pub filler_carbon: Option<f64>,
    pub filler_thermal: Option<f64>,
    /// Process code (GMAW, GTAW, SMAW, FCAW, ...)
    pub process: Option<String>,
    /// Position code (1G, 2F, ...)
    pub position: Option<String>,
    /// Joint type name ("Butt Joint", ...)
    pub joint_type: Option<String>,
}

impl CaseDescriptor {
    /// Value of a numeric feature column. `None` for encoded columns.
    pub fn numeric(&self, column: FeatureColumn) -> Option<f64> {
        match column {
            FeatureColumn::Thickness => self.thickness,
            FeatureColumn::BaseCarbon => self.base_carbon,
            FeatureColumn::BaseThermal => self.base_thermal,
            FeatureColumn::BaseMeltingPoint => self.base_melting_point,
            FeatureColumn::BaseDensity => self.base_density,
            FeatureColumn::FillerCarbon => self.filler_carbon,
            FeatureColumn::FillerThermal => self.filler_thermal,
            FeatureColumn::Encoded(_) => None,
        }
    }

    pub fn label(&self, column: CategoricalColumn) -> Option<&str> {
        match column {
            CategoricalColumn::Process => self.process.as_deref(),
            CategoricalColumn::Position => self.position.as_deref(),
            CategoricalColumn::JointType => self.joint_type.as_deref(),
        }
    }
}

/// One historical weld: the case plus the settings that were used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    #[serde(flatten)]
    pub case: CaseDescriptor,
    pub voltage: Option<f64>,
    pub amperage: Option<f64>,
    pub wire_feed_speed: Option<f64>,
    pub travel_speed: Option<f64>,
}

impl TrainingRow {
    pub fn target(&self, target: Target) -> Option<f64> {
        let value = match target {
            Target::Voltage => self.voltage,
            Target::Amperage => self.amperage,
            Target::WireFeedSpeed => self.wire_feed_speed,
            Target::TravelSpeed => self.travel_speed,
        };
        value.filter(|v| v.is_finite())
    }
}

// =============================================================================
// PROCESS VOCABULARY
// =============================================================================

/// Recognized welding processes. Anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Process {
    /// Gas metal arc (MIG/MAG)
    Gmaw,
    /// Gas tungsten arc (TIG)
    Gtaw,
    /// Shielded metal arc (stick)
    Smaw,
    /// Flux-cored arc
    Fcaw,
    Other(String),
}

impl Process {
    /// Parse a process code or common shop name, case-insensitively.
    pub fn from_code(input: &str) -> Process {
        let upper = input.trim().to_uppercase();
        match upper.as_str() {
            "GMAW" | "MIG" | "MAG" => Process::Gmaw,
            "GTAW" | "TIG" => Process::Gtaw,
            "SMAW" | "STICK" | "MMA" => Process::Smaw,
            "FCAW" | "FLUX CORE" | "FLUX-CORE" | "FLUXCORE" => Process::Fcaw,
            _ => Process::Other(input.trim().to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Process::Gmaw => "GMAW",
            Process::Gtaw => "GTAW",
            Process::Smaw => "SMAW",
            Process::Fcaw => "FCAW",
            Process::Other(code) => code,
        }
    }

    /// Whether the process feeds wire continuously from the machine.
    /// Unrecognized processes are assumed to, matching the generic fallback.
    pub fn has_wire_feed(&self) -> bool {
        !matches!(self, Process::Gtaw | Process::Smaw)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

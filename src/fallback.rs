//! Closed-form settings used when no trained model exists.
//!
//! Each process has a linear formula in thickness. Outputs are clamped to
//! equipment floors so extreme thicknesses still give usable settings.

use serde::{Deserialize, Serialize};

use crate::dataset::{Process, Target};

const MIN_VOLTAGE: f64 = 8.0;
const MIN_AMPERAGE: f64 = 30.0;
const MIN_TRAVEL_SPEED: f64 = 1.0;
const MIN_WIRE_FEED_SPEED: f64 = 50.0;

/// A full set of machine settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeldSettings {
    pub voltage: f64,
    pub amperage: f64,
    pub wire_feed_speed: f64,
    pub travel_speed: f64,
}

impl WeldSettings {
    pub fn get(&self, target: Target) -> f64 {
        match target {
            Target::Voltage => self.voltage,
            Target::Amperage => self.amperage,
            Target::WireFeedSpeed => self.wire_feed_speed,
            Target::TravelSpeed => self.travel_speed,
        }
    }
}

/// `intercept + slope * thickness`
#[derive(Debug, Clone, Copy)]
struct Linear(f64, f64);

impl Linear {
    fn at(self, thickness: f64) -> f64 {
        self.0 + self.1 * thickness
    }
}

struct Formula {
    voltage: Linear,
    amperage: Linear,
    /// Ignored for processes without continuous wire feed
    wire_feed_speed: Linear,
    travel_speed: Linear,
}

fn formula(process: &Process) -> Formula {
    match process {
        Process::Gmaw => Formula {
            voltage: Linear(18.0, 2.0),
            amperage: Linear(100.0, 30.0),
            wire_feed_speed: Linear(200.0, 50.0),
            travel_speed: Linear(10.0, -0.5),
        },
        Process::Gtaw => Formula {
            voltage: Linear(12.0, 1.5),
            amperage: Linear(80.0, 25.0),
            wire_feed_speed: Linear(0.0, 0.0),
            travel_speed: Linear(8.0, -0.3),
        },
        Process::Smaw => Formula {
            voltage: Linear(20.0, 1.2),
            amperage: Linear(90.0, 35.0),
            wire_feed_speed: Linear(0.0, 0.0),
            travel_speed: Linear(6.0, -0.2),
        },
        Process::Fcaw => Formula {
            voltage: Linear(22.0, 2.2),
            amperage: Linear(120.0, 35.0),
            wire_feed_speed: Linear(150.0, 60.0),
            travel_speed: Linear(12.0, -0.6),
        },
        Process::Other(_) => Formula {
            voltage: Linear(20.0, 1.8),
            amperage: Linear(120.0, 28.0),
            wire_feed_speed: Linear(250.0, 40.0),
            travel_speed: Linear(9.0, -0.4),
        },
    }
}

/// Rule-based settings for a process and thickness (mm).
///
/// Pure: the same input always gives the same output. Wire-feed speed is
/// exactly 0 for processes that do not feed wire.
pub fn estimate(process: &Process, thickness: f64) -> WeldSettings {
    let f = formula(process);
    WeldSettings {
        voltage: f.voltage.at(thickness).max(MIN_VOLTAGE),
        amperage: f.amperage.at(thickness).max(MIN_AMPERAGE),
        wire_feed_speed: if process.has_wire_feed() {
            f.wire_feed_speed.at(thickness).max(MIN_WIRE_FEED_SPEED)
        } else {
            0.0
        },
        travel_speed: f.travel_speed.at(thickness).max(MIN_TRAVEL_SPEED),
    }
}

/// [`estimate`] from a raw process code.
pub fn estimate_for_code(process: &str, thickness: f64) -> WeldSettings {
    estimate(&Process::from_code(process), thickness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gmaw_formula() {
        let s = estimate(&Process::Gmaw, 6.0);
        assert_eq!(s.voltage, 30.0);
        assert_eq!(s.amperage, 280.0);
        assert_eq!(s.wire_feed_speed, 500.0);
        assert_eq!(s.travel_speed, 7.0);
    }

    #[test]
    fn test_pure_function() {
        assert_eq!(estimate_for_code("GMAW", 6.0), estimate_for_code("GMAW", 6.0));
        assert_eq!(estimate_for_code("mig", 6.0), estimate(&Process::Gmaw, 6.0));
    }

    #[test]
    fn test_no_wire_feed_for_tig_and_stick() {
        for code in ["GTAW", "SMAW"] {
            for t in [0.5, 6.0, 50.0] {
                assert_eq!(estimate_for_code(code, t).wire_feed_speed, 0.0);
            }
        }
    }

    #[test]
    fn test_floors_hold_for_extreme_thickness() {
        for process in [Process::Gmaw, Process::Gtaw, Process::Smaw, Process::Fcaw] {
            let s = estimate(&process, 80.0);
            assert!(s.travel_speed >= 1.0, "{} travel {}", process, s.travel_speed);

            let s = estimate(&process, -20.0);
            assert!(s.voltage >= 8.0);
            assert!(s.amperage >= 30.0);
        }
        assert_eq!(estimate(&Process::Fcaw, -20.0).wire_feed_speed, 50.0);
    }

    #[test]
    fn test_unrecognized_process_uses_generic_formula() {
        let s = estimate_for_code("SAW", 5.0);
        assert_eq!(s.voltage, 29.0);
        assert_eq!(s.amperage, 260.0);
        assert_eq!(s.wire_feed_speed, 450.0);
        assert_eq!(s.travel_speed, 7.0);
    }
}

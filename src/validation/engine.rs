//! Validation engine.
//!
//! Runs every check on a parameter set and accumulates their findings; no
//! check short-circuits another.

use tracing::debug;

use super::rules::default_rules;
use super::types::{
    Comparison, Limit, MaterialInfo, ValidationResult, ValidationRules, WeldParameters,
    WireFeedRule,
};
use crate::dataset::Process;

/// Errors and warnings from a single check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validation engine that checks parameter sets against loaded rules.
pub struct Validator {
    rules: ValidationRules,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Validator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Run all checks and derive the overall severity.
    pub fn validate(
        &self,
        params: &WeldParameters,
        material: Option<&MaterialInfo>,
    ) -> ValidationResult {
        let mut findings = self.check_ranges(params);
        if let Some(material) = material {
            findings.extend(self.check_compatibility(material));
        }
        if let Some(process) = params.process.as_deref() {
            findings.extend(self.check_process(process, params));
        }
        if let Some(thickness) = params.thickness.filter(|t| *t > 0.0) {
            findings.extend(self.check_thickness(thickness, params));
        }

        let result = ValidationResult::new(findings.errors, findings.warnings);
        debug!(
            "Validation: {:?} ({} errors, {} warnings)",
            result.severity,
            result.errors.len(),
            result.warnings.len()
        );
        result
    }

    /// Absolute limits. Outside is an error; inside but within the outer
    /// band of the span is a warning.
    ///
    /// A wire-feed speed of 0 means "no wire feed" and is left to the
    /// process check.
    pub fn check_ranges(&self, params: &WeldParameters) -> Findings {
        let limits = &self.rules.limits;
        let checks: [(&str, Option<f64>, Limit); 5] = [
            ("voltage", params.voltage, limits.voltage),
            ("amperage", params.amperage, limits.amperage),
            (
                "wire_feed_speed",
                params.wire_feed_speed.filter(|w| *w != 0.0),
                limits.wire_feed_speed,
            ),
            ("travel_speed", params.travel_speed, limits.travel_speed),
            ("thickness", params.thickness, limits.thickness),
        ];

        let mut findings = Findings::default();
        for (name, value, limit) in checks {
            let Some(value) = value else { continue };

            if !value.is_finite() {
                findings
                    .errors
                    .push(format!("{} ({}) is not a finite number", name, value));
                continue;
            }
            if value < limit.min {
                findings
                    .errors
                    .push(format!("{} ({}) is below minimum ({})", name, value, limit.min));
                continue;
            }
            if value > limit.max {
                findings
                    .errors
                    .push(format!("{} ({}) is above maximum ({})", name, value, limit.max));
                continue;
            }

            let band = self.rules.near_limit_fraction * (limit.max - limit.min);
            if value < limit.min + band {
                findings
                    .warnings
                    .push(format!("{} ({}) is near minimum recommended value", name, value));
            } else if value > limit.max - band {
                findings
                    .warnings
                    .push(format!("{} ({}) is near maximum recommended value", name, value));
            }
        }
        findings
    }

    /// Advisory filler check. Only bases with a known filler list, and only
    /// when a filler is given.
    pub fn check_compatibility(&self, material: &MaterialInfo) -> Findings {
        let mut findings = Findings::default();
        let (Some(base), Some(filler)) = (
            material.base_material.as_deref(),
            material.filler_material.as_deref(),
        ) else {
            return findings;
        };

        if let Some(compatible) = self.rules.compatibility.get(base) {
            if !compatible.iter().any(|f| f == filler) {
                findings
                    .warnings
                    .push(format!("{} may not be suitable for {}", filler, base));
            }
        }
        findings
    }

    /// Heuristics keyed by process. Unknown processes are not checked.
    pub fn check_process(&self, process: &str, params: &WeldParameters) -> Findings {
        let mut findings = Findings::default();
        let code = Process::from_code(process);
        let Some(rules) = self.rules.processes.get(code.code()) else {
            return findings;
        };

        if let (Some(band), Some(voltage), Some(amperage)) =
            (&rules.ratio, params.voltage, params.amperage)
        {
            if voltage > 0.0 && amperage > 0.0 {
                let ratio = voltage / amperage * 100.0;
                if ratio < band.min {
                    findings.warnings.push(band.low_message.clone());
                } else if ratio > band.max {
                    findings.warnings.push(band.high_message.clone());
                }
            }
        }

        if let Some(voltage) = params.voltage {
            for check in &rules.voltage_checks {
                let hit = match check.when {
                    Comparison::Below => voltage < check.value,
                    Comparison::Above => voltage > check.value,
                };
                if hit {
                    findings.warnings.push(check.message.clone());
                }
            }
        }

        let wire_feed = params.wire_feed_speed.unwrap_or(0.0);
        match rules.wire_feed {
            WireFeedRule::Required if wire_feed == 0.0 => {
                findings.errors.push(rules.wire_feed_message.clone());
            }
            WireFeedRule::NotApplicable if wire_feed > 0.0 => {
                findings.warnings.push(rules.wire_feed_message.clone());
            }
            _ => {}
        }
        findings
    }

    /// Amperage and voltage against what the material thickness calls for.
    pub fn check_thickness(&self, thickness: f64, params: &WeldParameters) -> Findings {
        let rules = &self.rules.thickness;
        let mut findings = Findings::default();

        if let Some(amperage) = params.amperage.filter(|a| *a > 0.0) {
            let expected = thickness * rules.amps_per_mm;
            if amperage < expected * rules.low_factor {
                findings
                    .warnings
                    .push(format!("Amperage may be low for {}mm thickness", thickness));
            } else if amperage > expected * rules.high_factor {
                findings
                    .warnings
                    .push(format!("Amperage may be high for {}mm thickness", thickness));
            }
        }

        if let Some(voltage) = params.voltage {
            if thickness > rules.thick_above && voltage < rules.thick_min_voltage {
                findings
                    .warnings
                    .push("Consider higher voltage for thick material".to_string());
            } else if thickness < rules.thin_below && voltage > rules.thin_max_voltage {
                findings
                    .warnings
                    .push("Consider lower voltage for thin material".to_string());
            }
        }
        findings
    }

    /// Optimization hints for a parameter set that passed validation.
    pub fn suggest(&self, params: &WeldParameters, result: &ValidationResult) -> Vec<String> {
        if !result.valid {
            return vec!["Please fix validation errors before proceeding".to_string()];
        }

        let rules = &self.rules.suggestions;
        let voltage = params.voltage.unwrap_or(0.0);
        let amperage = params.amperage.unwrap_or(0.0);
        let thickness = params.thickness.unwrap_or(0.0);
        let travel_speed = params.travel_speed.unwrap_or(0.0);
        let mut suggestions = Vec::new();

        if voltage > 0.0 && amperage > 0.0 && thickness > 0.0 {
            let power_per_mm = voltage * amperage / thickness;
            if power_per_mm < rules.min_power_per_mm {
                suggestions.push("Consider increasing power for better penetration".to_string());
            } else if power_per_mm > rules.max_power_per_mm {
                suggestions.push("Consider reducing power to prevent burn-through".to_string());
            }
        }

        if travel_speed > 0.0 && thickness > 0.0 {
            if travel_speed > rules.fast_travel && thickness > rules.thick_for_fast_travel {
                suggestions.push(
                    "Reduce travel speed for thick material to ensure penetration".to_string(),
                );
            } else if travel_speed < rules.slow_travel && thickness < rules.thin_for_slow_travel {
                suggestions.push(
                    "Increase travel speed for thin material to prevent burn-through".to_string(),
                );
            }
        }

        if suggestions.is_empty() {
            suggestions.push("Parameters look good!".to_string());
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::types::Severity;

    fn validator() -> Validator {
        Validator::default()
    }

    fn params() -> WeldParameters {
        WeldParameters::default()
    }

    #[test]
    fn test_empty_parameters_ok() {
        let result = validator().validate(&params(), None);
        assert_eq!(result.severity, Severity::Ok);
        assert!(result.valid);
        assert!(result.errors.is_empty() && result.warnings.is_empty());
    }

    #[test]
    fn test_voltage_below_floor_is_error() {
        let p = WeldParameters {
            voltage: Some(5.0),
            ..params()
        };
        let result = validator().validate(&p, None);
        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.errors, vec!["voltage (5) is below minimum (8)"]);
    }

    #[test]
    fn test_non_finite_values_are_errors() {
        let p = WeldParameters {
            voltage: Some(f64::NAN),
            amperage: Some(f64::INFINITY),
            ..params()
        };
        let result = validator().validate(&p, None);
        assert_eq!(result.severity, Severity::Error);
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "voltage (NaN) is not a finite number",
                "amperage (inf) is not a finite number"
            ]
        );
    }

    #[test]
    fn test_near_limit_warnings() {
        let p = WeldParameters {
            voltage: Some(10.0),
            amperage: Some(480.0),
            ..params()
        };
        let findings = validator().check_ranges(&p);
        assert!(findings.errors.is_empty());
        assert_eq!(
            findings.warnings,
            vec![
                "voltage (10) is near minimum recommended value",
                "amperage (480) is near maximum recommended value",
            ]
        );
    }

    #[test]
    fn test_gmaw_requires_wire_feed() {
        let p = WeldParameters {
            voltage: Some(20.0),
            amperage: Some(150.0),
            wire_feed_speed: Some(0.0),
            process: Some("GMAW".to_string()),
            ..params()
        };
        let result = validator().validate(&p, None);

        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.errors, vec!["Wire feed speed is required for MIG welding"]);
        // 20 / 150 * 100 = 13.3, above the GMAW band
        assert!(result
            .warnings
            .contains(&"Voltage may be too high for amperage (excessive spatter risk)".to_string()));
    }

    #[test]
    fn test_process_aliases_share_rules() {
        let p = WeldParameters {
            voltage: Some(30.0),
            ..params()
        };
        let findings = validator().check_process("tig", &p);
        assert_eq!(
            findings.warnings,
            vec!["High voltage for TIG welding may cause arc instability"]
        );
    }

    #[test]
    fn test_wire_feed_on_stick_warns() {
        let p = WeldParameters {
            voltage: Some(24.0),
            wire_feed_speed: Some(200.0),
            ..params()
        };
        let findings = validator().check_process("SMAW", &p);
        assert!(findings.errors.is_empty());
        assert_eq!(
            findings.warnings,
            vec!["Wire feed speed not applicable for stick welding"]
        );
    }

    #[test]
    fn test_smaw_voltage_band() {
        let low = WeldParameters {
            voltage: Some(16.0),
            ..params()
        };
        let high = WeldParameters {
            voltage: Some(36.0),
            ..params()
        };
        assert_eq!(validator().check_process("SMAW", &low).warnings.len(), 1);
        assert_eq!(
            validator().check_process("SMAW", &high).warnings,
            vec!["High voltage for stick welding may cause excessive spatter"]
        );
    }

    #[test]
    fn test_unknown_process_not_checked() {
        let p = WeldParameters {
            voltage: Some(45.0),
            ..params()
        };
        assert_eq!(validator().check_process("SAW", &p), Findings::default());
    }

    #[test]
    fn test_incompatible_filler_warns() {
        let material = MaterialInfo {
            base_material: Some("Aluminum 6061".to_string()),
            filler_material: Some("ER70S-6".to_string()),
        };
        let result = validator().validate(&params(), Some(&material));
        assert_eq!(result.severity, Severity::Warning);
        assert!(result.valid);
        assert_eq!(result.warnings, vec!["ER70S-6 may not be suitable for Aluminum 6061"]);

        let ok = MaterialInfo {
            base_material: Some("Aluminum 6061".to_string()),
            filler_material: Some("ER4043".to_string()),
        };
        assert_eq!(validator().check_compatibility(&ok), Findings::default());

        let unlisted = MaterialInfo {
            base_material: Some("Titanium Grade 2".to_string()),
            filler_material: Some("ERTi-2".to_string()),
        };
        assert_eq!(validator().check_compatibility(&unlisted), Findings::default());
    }

    #[test]
    fn test_thickness_amperage_bands() {
        // Expected 35 A/mm: 6mm -> 210 A, warn below 126 or above 315
        let low = WeldParameters {
            amperage: Some(100.0),
            ..params()
        };
        let high = WeldParameters {
            amperage: Some(330.0),
            ..params()
        };
        let fine = WeldParameters {
            amperage: Some(200.0),
            ..params()
        };
        let v = validator();
        assert_eq!(
            v.check_thickness(6.0, &low).warnings,
            vec!["Amperage may be low for 6mm thickness"]
        );
        assert_eq!(
            v.check_thickness(6.0, &high).warnings,
            vec!["Amperage may be high for 6mm thickness"]
        );
        assert!(v.check_thickness(6.0, &fine).warnings.is_empty());
    }

    #[test]
    fn test_thickness_voltage_heuristics() {
        let v = validator();
        let low_v = WeldParameters {
            voltage: Some(18.0),
            ..params()
        };
        let high_v = WeldParameters {
            voltage: Some(27.0),
            ..params()
        };
        assert_eq!(
            v.check_thickness(12.0, &low_v).warnings,
            vec!["Consider higher voltage for thick material"]
        );
        assert_eq!(
            v.check_thickness(2.0, &high_v).warnings,
            vec!["Consider lower voltage for thin material"]
        );
        assert!(v.check_thickness(12.0, &params()).warnings.is_empty());
    }

    #[test]
    fn test_checks_accumulate() {
        let p = WeldParameters {
            voltage: Some(60.0),
            amperage: Some(20.0),
            travel_speed: Some(40.0),
            process: Some("FCAW".to_string()),
            ..params()
        };
        let result = validator().validate(&p, None);
        // voltage, amperage, travel speed out of range, plus missing wire feed
        assert_eq!(result.errors.len(), 4);
    }

    #[test]
    fn test_suggest_requires_valid_result() {
        let v = validator();
        let p = WeldParameters {
            voltage: Some(5.0),
            ..params()
        };
        let result = v.validate(&p, None);
        assert_eq!(
            v.suggest(&p, &result),
            vec!["Please fix validation errors before proceeding"]
        );
    }

    #[test]
    fn test_suggest_power_and_travel() {
        let v = validator();

        // 20 V * 100 A / 6 mm = 333 W/mm
        let weak = WeldParameters {
            voltage: Some(20.0),
            amperage: Some(100.0),
            thickness: Some(6.0),
            travel_speed: Some(18.0),
            ..params()
        };
        let result = v.validate(&weak, None);
        assert_eq!(
            v.suggest(&weak, &result),
            vec![
                "Consider increasing power for better penetration",
                "Reduce travel speed for thick material to ensure penetration",
            ]
        );

        // 25 V * 150 A / 1.5 mm = 2500 W/mm
        let hot = WeldParameters {
            voltage: Some(25.0),
            amperage: Some(150.0),
            thickness: Some(1.5),
            travel_speed: Some(4.0),
            ..params()
        };
        let result = v.validate(&hot, None);
        assert_eq!(
            v.suggest(&hot, &result),
            vec![
                "Consider reducing power to prevent burn-through",
                "Increase travel speed for thin material to prevent burn-through",
            ]
        );
    }

    #[test]
    fn test_suggest_all_good() {
        let v = validator();
        // 24 V * 210 A / 6 mm = 840 W/mm
        let p = WeldParameters {
            voltage: Some(24.0),
            amperage: Some(210.0),
            thickness: Some(6.0),
            travel_speed: Some(8.0),
            ..params()
        };
        let result = v.validate(&p, None);
        assert_eq!(v.suggest(&p, &result), vec!["Parameters look good!"]);
    }
}

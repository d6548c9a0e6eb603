//! TOML rule loading for the validation engine.
//!
//! Provides two loading methods:
//! - `default_rules()` - Loads embedded rules compiled into the binary
//! - `load_rules(path)` - Loads custom rules from a file path

use anyhow::{Context, Result};
use std::path::Path;

use super::types::ValidationRules;

/// Default rules embedded in the binary at compile time.
/// These are loaded from `config/weld_rules.toml`.
const DEFAULT_RULES: &str = include_str!("../../config/weld_rules.toml");

/// Load rules from a TOML file at the given path.
///
/// # Example
/// ```ignore
/// let rules = load_rules(Path::new("/etc/weldmate/rules.toml"))?;
/// ```
pub fn load_rules(path: &Path) -> Result<ValidationRules> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules {}", path.display()))?;
    let rules: ValidationRules = toml::from_str(&content)
        .with_context(|| format!("Invalid rules {}", path.display()))?;
    Ok(rules)
}

/// Get the default rules embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_rules() -> ValidationRules {
    toml::from_str(DEFAULT_RULES).expect("embedded weld_rules.toml must be valid TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::types::{Comparison, WireFeedRule};
    use tempfile::TempDir;

    #[test]
    fn test_default_rules_loads() {
        let rules = default_rules();
        assert_eq!(rules.near_limit_fraction, 0.1);
        assert_eq!(rules.limits.voltage.min, 8.0);
        assert_eq!(rules.limits.amperage.max, 500.0);
        assert_eq!(rules.limits.thickness.min, 0.5);
    }

    #[test]
    fn test_default_processes() {
        let rules = default_rules();
        assert_eq!(rules.processes.len(), 4);
        assert_eq!(rules.processes["GMAW"].wire_feed, WireFeedRule::Required);
        assert_eq!(rules.processes["FCAW"].wire_feed, WireFeedRule::Required);
        assert_eq!(rules.processes["GTAW"].wire_feed, WireFeedRule::NotApplicable);

        let gmaw_ratio = rules.processes["GMAW"].ratio.as_ref().unwrap();
        assert_eq!((gmaw_ratio.min, gmaw_ratio.max), (4.0, 12.0));

        let smaw = &rules.processes["SMAW"].voltage_checks;
        assert_eq!(smaw.len(), 2);
        assert_eq!(smaw[0].when, Comparison::Below);
        assert_eq!(smaw[1].value, 35.0);
    }

    #[test]
    fn test_default_compatibility() {
        let rules = default_rules();
        assert_eq!(rules.compatibility.len(), 5);
        assert!(rules.compatibility["Mild Steel"].contains(&"ER70S-6".to_string()));
        assert!(rules.compatibility["Aluminum 5052"].contains(&"ER5183".to_string()));
    }

    #[test]
    fn test_load_rules_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rules.toml");
        let custom = DEFAULT_RULES.replace("max = 50.0", "max = 45.0");
        std::fs::write(&path, custom).unwrap();

        let rules = load_rules(&path).unwrap();
        assert_eq!(rules.limits.voltage.max, 45.0);
    }

    #[test]
    fn test_load_rules_invalid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rules.toml");
        std::fs::write(&path, "near_limit_fraction = \"lots\"").unwrap();
        assert!(load_rules(&path).is_err());
        assert!(load_rules(&tmp.path().join("missing.toml")).is_err());
    }
}

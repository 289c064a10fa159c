//! Config validation: collects every problem in one pass with its field path.

use crate::schema::{ControlsConfig, StepwiseConfig};
use stepwise_core::HookKey;
use thiserror::Error;

/// A config validation finding with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &StepwiseConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_controls(config, &mut report);
    validate_gate(config, &mut report);
    validate_logging(config, &mut report);
    report
}

/// The configured bindings with their field names, in control order.
pub(crate) fn bindings(controls: &ControlsConfig) -> [(&'static str, Option<&str>); 5] {
    [
        ("step", controls.step.as_deref()),
        ("leap", controls.leap.as_deref()),
        ("jump", controls.jump.as_deref()),
        ("run", controls.run.as_deref()),
        ("terminate", controls.terminate.as_deref()),
    ]
}

/// Every control key must parse and be bound to one control only.
fn validate_controls(config: &StepwiseConfig, report: &mut ValidationReport) {
    let Some(controls) = &config.controls else { return };
    let mut seen: Vec<(&str, HookKey)> = Vec::new();
    for (field, raw) in bindings(controls) {
        let Some(raw) = raw else { continue };
        let path = format!("controls.{field}");
        match raw.parse::<HookKey>() {
            Ok(key) => {
                if let Some((other, _)) = seen.iter().find(|(_, k)| *k == key) {
                    report.error(
                        &path,
                        format!("Key '{key}' is already bound to controls.{other}"),
                    );
                } else {
                    seen.push((field, key));
                }
            }
            Err(e) => report.error(&path, e.to_string()),
        }
    }
}

fn validate_gate(config: &StepwiseConfig, report: &mut ValidationReport) {
    let Some(gate) = &config.gate else { return };
    if gate.throttle_ms == Some(0) {
        report.warn(
            "gate.throttleMs",
            "throttleMs is 0; step breaks will not slow down while leaping",
        );
    }
}

fn validate_logging(config: &StepwiseConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !matches!(
            level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        ) {
            report.error(
                "logging.level",
                format!("Unknown log level '{level}'. Use trace, debug, info, warn, error or off"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GateConfig, LoggingConfig};

    fn with_controls(controls: ControlsConfig) -> StepwiseConfig {
        StepwiseConfig {
            controls: Some(controls),
            ..Default::default()
        }
    }

    #[test]
    fn empty_config_is_valid() {
        let report = validate(&StepwiseConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn defaults_are_valid() {
        let report = validate(&crate::apply_all_defaults(StepwiseConfig::default()));
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn unparsable_key_is_error() {
        let report = validate(&with_controls(ControlsConfig {
            jump: Some("ctrl+j".to_string()),
            ..Default::default()
        }));
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "controls.jump");
    }

    #[test]
    fn duplicate_key_is_error() {
        // Case-insensitive: "a" and "A" are the same key.
        let report = validate(&with_controls(ControlsConfig {
            step: Some("a".to_string()),
            leap: Some("A".to_string()),
            ..Default::default()
        }));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "controls.leap");
        assert!(report.errors[0].message.contains("controls.step"));
    }

    #[test]
    fn zero_throttle_is_warning() {
        let cfg = StepwiseConfig {
            gate: Some(GateConfig {
                throttle_ms: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "gate.throttleMs");
    }

    #[test]
    fn unknown_log_level_is_error() {
        let cfg = StepwiseConfig {
            logging: Some(LoggingConfig {
                level: Some("loud".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!validate(&cfg).is_valid());
    }
}

//! `stepwise-config`: configuration for stepwise sessions.
//!
//! Provides:
//! - Typed config schema (control bindings, gate, logging)
//! - YAML loading from the config directory
//! - Default value application
//! - Validation with per-field findings

pub mod defaults;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use io::{config_dir, config_file_path, load_config};
pub use schema::StepwiseConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;
use std::time::Duration;
use stepwise_core::{ControlKeys, HookKey, ResumeLevel, StepwiseError};

/// Load, apply defaults, and validate a config file.
///
/// Every finding is logged; validation errors fail the load.
pub async fn load_and_prepare(path: &Path) -> Result<StepwiseConfig> {
    let config = apply_all_defaults(load_config(path).await?);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("{} error(s) in config {}", report.errors.len(), path.display());
    }

    Ok(config)
}

/// Build the control key bindings. Unset bindings take their defaults.
pub fn into_control_keys(config: &StepwiseConfig) -> Result<ControlKeys, StepwiseError> {
    let defaults = ControlKeys::default();
    let Some(controls) = &config.controls else {
        return Ok(defaults);
    };
    let mut keys = [
        defaults.key_for(ResumeLevel::Step),
        defaults.key_for(ResumeLevel::Leap),
        defaults.key_for(ResumeLevel::Jump),
        defaults.key_for(ResumeLevel::Run),
        defaults.terminate_key(),
    ];
    for ((_, raw), slot) in validation::bindings(controls).into_iter().zip(keys.iter_mut()) {
        if let Some(raw) = raw {
            *slot = raw.parse::<HookKey>()?;
        }
    }
    let [step, leap, jump, run, terminate] = keys;
    ControlKeys::new(step, leap, jump, run, terminate)
}

/// Initial gate level, `Step` when unset.
pub fn initial_level(config: &StepwiseConfig) -> ResumeLevel {
    config
        .gate
        .as_ref()
        .and_then(|g| g.initial_level)
        .unwrap_or_default()
}

/// Throttle delay for step breaks while leaping.
pub fn throttle(config: &StepwiseConfig) -> Duration {
    let ms = config
        .gate
        .as_ref()
        .and_then(|g| g.throttle_ms)
        .unwrap_or(defaults::DEFAULT_THROTTLE_MS);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::ControlsConfig;
    use stepwise_core::NamedKey;

    #[test]
    fn default_config_gives_default_keys() {
        let keys = into_control_keys(&StepwiseConfig::default()).unwrap();
        assert_eq!(keys, ControlKeys::default());
    }

    #[test]
    fn custom_bindings_override_defaults() {
        let cfg = StepwiseConfig {
            controls: Some(ControlsConfig {
                run: Some("r".to_string()),
                terminate: Some("q".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let keys = into_control_keys(&cfg).unwrap();
        assert_eq!(keys.key_for(ResumeLevel::Run), HookKey::char('r'));
        assert_eq!(keys.terminate_key(), HookKey::char('Q'));
        assert_eq!(keys.key_for(ResumeLevel::Step), HookKey::char('1'));
        assert!(!keys.is_reserved(&HookKey::Named(NamedKey::Escape)));
    }

    #[test]
    fn bad_binding_is_error() {
        let cfg = StepwiseConfig {
            controls: Some(ControlsConfig {
                step: Some("nope".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(into_control_keys(&cfg), Err(StepwiseError::InvalidKey(_))));
    }

    #[test]
    fn gate_settings_fall_back() {
        let cfg = StepwiseConfig::default();
        assert_eq!(initial_level(&cfg), ResumeLevel::Step);
        assert_eq!(throttle(&cfg), Duration::from_millis(defaults::DEFAULT_THROTTLE_MS));
    }

    #[tokio::test]
    async fn load_and_prepare_rejects_duplicate_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "controls:\n  step: \"2\"\n").unwrap();
        assert!(load_and_prepare(&path).await.is_err());
    }

    #[tokio::test]
    async fn load_and_prepare_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_and_prepare(&config_file_path(dir.path())).await.unwrap();
        assert_eq!(cfg.gate.unwrap().throttle_ms, Some(defaults::DEFAULT_THROTTLE_MS));
    }
}

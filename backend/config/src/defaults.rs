//! Config defaults: fills every missing value of a parsed config.

use crate::schema::{ControlsConfig, GateConfig, LoggingConfig, StepwiseConfig};
use stepwise_core::ResumeLevel;

pub const DEFAULT_STEP_KEY: &str = "1";
pub const DEFAULT_LEAP_KEY: &str = "2";
pub const DEFAULT_JUMP_KEY: &str = "3";
pub const DEFAULT_RUN_KEY: &str = "space";
pub const DEFAULT_TERMINATE_KEY: &str = "escape";

/// Default throttle for step breaks while leaping.
pub const DEFAULT_THROTTLE_MS: u64 = 100;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: StepwiseConfig) -> StepwiseConfig {
    let config = apply_control_defaults(config);
    let config = apply_gate_defaults(config);
    apply_logging_defaults(config)
}

fn apply_control_defaults(mut config: StepwiseConfig) -> StepwiseConfig {
    let controls = config.controls.get_or_insert_with(ControlsConfig::default);
    for (slot, default) in [
        (&mut controls.step, DEFAULT_STEP_KEY),
        (&mut controls.leap, DEFAULT_LEAP_KEY),
        (&mut controls.jump, DEFAULT_JUMP_KEY),
        (&mut controls.run, DEFAULT_RUN_KEY),
        (&mut controls.terminate, DEFAULT_TERMINATE_KEY),
    ] {
        slot.get_or_insert_with(|| default.to_string());
    }
    config
}

fn apply_gate_defaults(mut config: StepwiseConfig) -> StepwiseConfig {
    let gate = config.gate.get_or_insert_with(GateConfig::default);
    gate.initial_level.get_or_insert(ResumeLevel::Step);
    gate.throttle_ms.get_or_insert(DEFAULT_THROTTLE_MS);
    config
}

/// Logging goes to stderr only unless a directory is configured.
fn apply_logging_defaults(mut config: StepwiseConfig) -> StepwiseConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_default_bindings() {
        let cfg = apply_all_defaults(StepwiseConfig::default());
        let controls = cfg.controls.unwrap();
        assert_eq!(controls.step.as_deref(), Some("1"));
        assert_eq!(controls.run.as_deref(), Some("space"));
        assert_eq!(controls.terminate.as_deref(), Some("escape"));
    }

    #[test]
    fn fills_gate_and_logging() {
        let cfg = apply_all_defaults(StepwiseConfig::default());
        let gate = cfg.gate.unwrap();
        assert_eq!(gate.initial_level, Some(ResumeLevel::Step));
        assert_eq!(gate.throttle_ms, Some(DEFAULT_THROTTLE_MS));
        let logging = cfg.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("info"));
        assert!(logging.dir.is_none());
    }

    #[test]
    fn does_not_override_user_bindings() {
        let cfg = StepwiseConfig {
            controls: Some(ControlsConfig {
                leap: Some("l".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let controls = apply_all_defaults(cfg).controls.unwrap();
        assert_eq!(controls.leap.as_deref(), Some("l"));
        assert_eq!(controls.step.as_deref(), Some("1"));
    }
}

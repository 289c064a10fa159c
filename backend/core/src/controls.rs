//! Reserved control bindings.
//!
//! Four keys select a resume level and one key terminates the session. These
//! keys belong to the step-control protocol: the router interprets them before
//! any hook runs, and custom hooks can never be registered on them.

use serde::Serialize;

use crate::error::StepwiseError;
use crate::key::{HookKey, NamedKey};
use crate::level::ResumeLevel;

/// What a control key does when routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "level", rename_all = "snake_case")]
pub enum ControlAction {
    Resume(ResumeLevel),
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlKeys {
    step: HookKey,
    leap: HookKey,
    jump: HookKey,
    run: HookKey,
    terminate: HookKey,
}

impl ControlKeys {
    /// Build a binding set; every key must be distinct. Character keys are
    /// folded to upper case.
    pub fn new(
        step: HookKey,
        leap: HookKey,
        jump: HookKey,
        run: HookKey,
        terminate: HookKey,
    ) -> Result<Self, StepwiseError> {
        let keys = [step, leap, jump, run, terminate].map(HookKey::normalized);
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(StepwiseError::Config(format!(
                    "control key '{key}' is bound more than once"
                )));
            }
        }
        let [step, leap, jump, run, terminate] = keys;
        Ok(Self { step, leap, jump, run, terminate })
    }

    pub fn key_for(&self, level: ResumeLevel) -> HookKey {
        match level {
            ResumeLevel::Step => self.step,
            ResumeLevel::Leap => self.leap,
            ResumeLevel::Jump => self.jump,
            ResumeLevel::Run => self.run,
        }
    }

    pub fn terminate_key(&self) -> HookKey {
        self.terminate
    }

    pub fn level_for(&self, key: &HookKey) -> Option<ResumeLevel> {
        let key = key.normalized();
        ResumeLevel::ALL.into_iter().find(|level| self.key_for(*level) == key)
    }

    pub fn action_for(&self, key: &HookKey) -> Option<ControlAction> {
        if key.normalized() == self.terminate {
            return Some(ControlAction::Terminate);
        }
        self.level_for(key).map(ControlAction::Resume)
    }

    pub fn is_reserved(&self, key: &HookKey) -> bool {
        self.action_for(key).is_some()
    }

    /// Level bindings in ascending level order.
    pub fn level_bindings(&self) -> impl Iterator<Item = (ResumeLevel, HookKey)> + '_ {
        ResumeLevel::ALL.into_iter().map(|level| (level, self.key_for(level)))
    }
}

impl Default for ControlKeys {
    fn default() -> Self {
        Self {
            step: HookKey::Char('1'),
            leap: HookKey::Char('2'),
            jump: HookKey::Char('3'),
            run: HookKey::Char(' '),
            terminate: HookKey::Named(NamedKey::Escape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let keys = ControlKeys::default();
        assert_eq!(keys.level_for(&HookKey::char('1')), Some(ResumeLevel::Step));
        assert_eq!(keys.level_for(&HookKey::char('2')), Some(ResumeLevel::Leap));
        assert_eq!(keys.level_for(&HookKey::char('3')), Some(ResumeLevel::Jump));
        assert_eq!(keys.level_for(&HookKey::char(' ')), Some(ResumeLevel::Run));
        assert_eq!(
            keys.action_for(&HookKey::Named(NamedKey::Escape)),
            Some(ControlAction::Terminate)
        );
        assert!(!keys.is_reserved(&HookKey::char('t')));
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let err = ControlKeys::new(
            HookKey::char('a'),
            HookKey::char('b'),
            HookKey::char('a'),
            HookKey::char(' '),
            HookKey::Named(NamedKey::Escape),
        )
        .unwrap_err();
        assert!(matches!(err, StepwiseError::Config(_)));
    }

    #[test]
    fn test_raw_char_bindings_are_folded() {
        let keys = ControlKeys::new(
            HookKey::Char('a'),
            HookKey::Char('s'),
            HookKey::Char('d'),
            HookKey::Char(' '),
            HookKey::Char('q'),
        )
        .unwrap();
        assert_eq!(keys.level_for(&HookKey::char('a')), Some(ResumeLevel::Step));
        assert_eq!(keys.action_for(&HookKey::Char('q')), Some(ControlAction::Terminate));
        assert!(keys.is_reserved(&HookKey::Char('s')));
    }

    #[test]
    fn test_duplicate_after_folding_rejected() {
        let result = ControlKeys::new(
            HookKey::Char('a'),
            HookKey::Char('A'),
            HookKey::char('3'),
            HookKey::char(' '),
            HookKey::Named(NamedKey::Escape),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_level_bindings_order() {
        let keys = ControlKeys::default();
        let levels: Vec<_> = keys.level_bindings().map(|(l, _)| l).collect();
        assert_eq!(levels, ResumeLevel::ALL.to_vec());
    }
}

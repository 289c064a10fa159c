use thiserror::Error;

use crate::key::HookKey;

/// Who holds a key that a registration tried to claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOwner {
    /// Bound to a resume level or to terminate.
    Control,
    /// Claimed by a system hook.
    SystemHook,
}

impl std::fmt::Display for KeyOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Control => f.write_str("step control"),
            Self::SystemHook => f.write_str("a system hook"),
        }
    }
}

/// Top-level error type for stepwise.
#[derive(Debug, Error)]
pub enum StepwiseError {
    #[error("key '{key}' is reserved by {owner}")]
    ReservedKey { key: HookKey, owner: KeyOwner },

    #[error("unknown hook kind: {0}")]
    UnknownHookKind(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

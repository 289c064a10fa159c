use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::key::{HookKey, HookKind, NamedKey};

/// Identity of the object that produced an input event (a canvas, a debug
/// button, ...). Custom hooks may be filtered on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw input event as delivered to the router.
#[derive(Debug, Clone)]
pub struct InputEvent {
    pub kind: HookKind,
    pub key: HookKey,
    pub source: Option<SourceId>,
    /// Pointer position for mouse events.
    pub position: Option<(i32, i32)>,
    pub received_at: Instant,
}

impl InputEvent {
    pub fn new(kind: HookKind, key: impl Into<HookKey>) -> Self {
        Self {
            kind,
            key: key.into().normalized(),
            source: None,
            position: None,
            received_at: Instant::now(),
        }
    }

    pub fn typed(key: impl Into<HookKey>) -> Self {
        Self::new(HookKind::KeyTyped, key)
    }

    pub fn pressed(key: impl Into<HookKey>) -> Self {
        Self::new(HookKind::KeyPressed, key)
    }

    pub fn released(key: impl Into<HookKey>) -> Self {
        Self::new(HookKind::KeyReleased, key)
    }

    pub fn mouse(action: crate::key::MouseAction, x: i32, y: i32) -> Self {
        Self {
            position: Some((x, y)),
            ..Self::new(HookKind::Mouse, action)
        }
    }

    pub fn escape() -> Self {
        Self::pressed(NamedKey::Escape)
    }

    pub fn from_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }
}

//! Hook keys and dispatch phases.
//!
//! A [`HookKey`] names a class of input event (a character, a named key or a
//! mouse action). Character keys are case-insensitive and always stored upper
//! case, so `'t'` and `'T'` address the same hook.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::StepwiseError;

// ---------------------------------------------------------------------------
// Named keys and mouse actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
}

impl NamedKey {
    fn as_str(self) -> &'static str {
        match self {
            Self::Escape => "escape",
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "escape" | "esc" => Self::Escape,
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            "backspace" => Self::Backspace,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Clicked,
    Pressed,
    Released,
    Entered,
    Exited,
    Dragged,
    Moved,
    Wheel,
}

impl MouseAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Clicked => "clicked",
            Self::Pressed => "pressed",
            Self::Released => "released",
            Self::Entered => "entered",
            Self::Exited => "exited",
            Self::Dragged => "dragged",
            Self::Moved => "moved",
            Self::Wheel => "wheel",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "clicked" => Self::Clicked,
            "pressed" => Self::Pressed,
            "released" => Self::Released,
            "entered" => Self::Entered,
            "exited" => Self::Exited,
            "dragged" => Self::Dragged,
            "moved" => Self::Moved,
            "wheel" => Self::Wheel,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// HookKey
// ---------------------------------------------------------------------------

/// Identifier of an input-event class, used as the map key for hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HookKey {
    Char(char),
    Named(NamedKey),
    Mouse(MouseAction),
}

impl HookKey {
    /// Character key, normalized to upper case.
    pub fn char(c: char) -> Self {
        Self::Char(c).normalized()
    }

    /// Fold a raw `Char` to the upper-case form hooks and bindings are keyed on.
    pub fn normalized(self) -> Self {
        match self {
            Self::Char(c) => Self::Char(c.to_uppercase().next().unwrap_or(c)),
            other => other,
        }
    }
}

impl From<char> for HookKey {
    fn from(c: char) -> Self {
        Self::char(c)
    }
}

impl From<NamedKey> for HookKey {
    fn from(k: NamedKey) -> Self {
        Self::Named(k)
    }
}

impl From<MouseAction> for HookKey {
    fn from(a: MouseAction) -> Self {
        Self::Mouse(a)
    }
}

impl FromStr for HookKey {
    type Err = StepwiseError;

    /// Accepts a single character (`"t"`), `"space"`, a named key (`"escape"`)
    /// or a mouse action prefixed with `mouse:` (`"mouse:clicked"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Self::char(c));
        }
        let lower = s.trim().to_ascii_lowercase();
        if lower == "space" {
            return Ok(Self::Char(' '));
        }
        if let Some(action) = lower.strip_prefix("mouse:") {
            return MouseAction::parse(action)
                .map(Self::Mouse)
                .ok_or_else(|| StepwiseError::InvalidKey(s.to_string()));
        }
        NamedKey::parse(&lower)
            .map(Self::Named)
            .ok_or_else(|| StepwiseError::InvalidKey(s.to_string()))
    }
}

impl TryFrom<String> for HookKey {
    type Error = StepwiseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<HookKey> for String {
    fn from(key: HookKey) -> Self {
        key.to_string()
    }
}

impl std::fmt::Display for HookKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Char(' ') => f.write_str("space"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Named(k) => f.write_str(k.as_str()),
            Self::Mouse(a) => write!(f, "mouse:{}", a.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// HookKind
// ---------------------------------------------------------------------------

/// Dispatch phase of an input event. Custom hooks are kept in one sub-map per
/// kind, so the same key can carry independent hooks per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    KeyTyped,
    KeyPressed,
    KeyReleased,
    Mouse,
}

impl HookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyTyped => "key_typed",
            Self::KeyPressed => "key_pressed",
            Self::KeyReleased => "key_released",
            Self::Mouse => "mouse",
        }
    }
}

impl FromStr for HookKind {
    type Err = StepwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key_typed" | "typed" => Ok(Self::KeyTyped),
            "key_pressed" | "pressed" => Ok(Self::KeyPressed),
            "key_released" | "released" => Ok(Self::KeyReleased),
            "mouse" => Ok(Self::Mouse),
            _ => Err(StepwiseError::UnknownHookKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

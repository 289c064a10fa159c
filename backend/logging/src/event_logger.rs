//! Step Event Logger
//!
//! Gate and hook lifecycle events written through `tracing` under the
//! `step_events` target, so a file layer collects them as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stepwise_core::{HookKey, HookKind, ResumeLevel};
use tracing::info;

pub const STEP_EVENTS_TARGET: &str = "step_events";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    LevelChanged {
        from: ResumeLevel,
        to: ResumeLevel,
    },
    Suspended {
        requested: ResumeLevel,
        current: ResumeLevel,
        message: String,
    },
    Resumed {
        level: ResumeLevel,
    },
    Terminated,
    HookStarted {
        kind: HookKind,
        key: HookKey,
    },
    HookDropped {
        kind: HookKind,
        key: HookKey,
    },
    HookFailed {
        kind: HookKind,
        key: HookKey,
        error: String,
    },
    HooksClosed {
        cancelled: usize,
    },
}

#[derive(Debug, Serialize)]
pub struct StepEventEntry {
    pub timestamp: DateTime<Utc>,
    pub event: StepEvent,
}

pub struct StepEventLogger;

impl StepEventLogger {
    /// Record one lifecycle event.
    pub fn log_event(event: StepEvent) {
        let entry = StepEventEntry {
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_else(|_| format!("{entry:?}"));
        info!(target: STEP_EVENTS_TARGET, event = %json, "Step event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let entry = StepEventEntry {
            timestamp: Utc::now(),
            event: StepEvent::HookDropped {
                kind: HookKind::KeyTyped,
                key: HookKey::char('t'),
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event"]["type"], "hook_dropped");
        assert_eq!(value["event"]["kind"], "key_typed");
        assert_eq!(value["event"]["key"], "T");
    }

    #[test]
    fn test_level_change_serialization() {
        let value = serde_json::to_value(StepEvent::LevelChanged {
            from: ResumeLevel::Step,
            to: ResumeLevel::Run,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "level_changed", "from": "step", "to": "run"})
        );
    }

    #[test]
    fn test_log_event_without_subscriber() {
        StepEventLogger::log_event(StepEvent::Terminated);
    }
}

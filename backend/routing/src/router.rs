/// Event router: the single entry point for raw input events.
///
/// Control keys move the step gate; everything else is offered to the hook
/// registry, system hook first (inline), custom hook second (on a task).
use std::sync::Arc;

use logging::{StepEvent, StepEventLogger};
use stepwise_core::{ControlAction, HookKey, HookKind, InputEvent, SourceId};
use stepwise_gate::StepGate;
use stepwise_hooks::{HookRegistry, TriggerOutcome};
use tracing::{debug, info};

/// What `route` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Control action applied to the gate, if the event was a control key.
    pub control: Option<ControlAction>,
    /// Whether a system hook ran inline.
    pub system_hook: bool,
    pub custom: TriggerOutcome,
}

impl RouteOutcome {
    fn ignored() -> Self {
        Self {
            control: None,
            system_hook: false,
            custom: TriggerOutcome::Unregistered,
        }
    }

    /// Nothing at all reacted to the event.
    pub fn is_noop(&self) -> bool {
        self.control.is_none() && !self.system_hook && self.custom != TriggerOutcome::Started
    }
}

#[derive(Clone)]
pub struct EventRouter {
    gate: Arc<StepGate>,
    registry: Arc<HookRegistry>,
}

impl EventRouter {
    pub fn new(gate: Arc<StepGate>, registry: Arc<HookRegistry>) -> Self {
        Self { gate, registry }
    }

    pub fn gate(&self) -> &Arc<StepGate> {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Route one input event.
    ///
    /// - A typed level key sets the gate level, then runs the system hook for
    ///   that key, so indicators show the new level before any user hook
    ///   observes the event.
    /// - A pressed terminate key raises the gate's terminate signal.
    /// - Other phases of a control key are ignored.
    /// - Any other event runs its system hook inline, then triggers its custom
    ///   hook under the single-flight rule.
    pub fn route(&self, event: &InputEvent) -> RouteOutcome {
        if let Some(action) = self.registry.controls().action_for(&event.key) {
            return self.apply_control(action, event);
        }

        let system_hook = self.registry.run_system_hook(event);
        let custom = self.registry.trigger(event);
        debug!(
            kind = %event.kind,
            key = %event.key,
            system_hook,
            custom = ?custom,
            "Event routed"
        );
        RouteOutcome {
            control: None,
            system_hook,
            custom,
        }
    }

    fn apply_control(&self, action: ControlAction, event: &InputEvent) -> RouteOutcome {
        match (action, event.kind) {
            (ControlAction::Resume(level), HookKind::KeyTyped) => {
                let previous = self.gate.set_level(level);
                StepEventLogger::log_event(StepEvent::LevelChanged {
                    from: previous,
                    to: level,
                });
                let system_hook = self.registry.run_system_hook(event);
                RouteOutcome {
                    control: Some(action),
                    system_hook,
                    custom: TriggerOutcome::Unregistered,
                }
            }
            (ControlAction::Terminate, HookKind::KeyPressed) => {
                info!(key = %event.key, "Terminate key pressed");
                self.gate.terminate();
                StepEventLogger::log_event(StepEvent::Terminated);
                RouteOutcome {
                    control: Some(action),
                    system_hook: false,
                    custom: TriggerOutcome::Unregistered,
                }
            }
            _ => RouteOutcome::ignored(),
        }
    }

    /// Route a synthetic typed key, as produced by an on-screen control.
    pub fn simulate_key(&self, key: impl Into<HookKey>, source: Option<SourceId>) -> RouteOutcome {
        let mut event = InputEvent::typed(key);
        event.source = source;
        self.route(&event)
    }
}

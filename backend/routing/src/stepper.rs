//! Debug-control facade used by application code.
//!
//! A [`Stepper`] wraps the gate with break points that report to a
//! [`StepIndicator`] and stand down while custom hooks own the application
//! thread.

use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use logging::{StepEvent, StepEventLogger};
use stepwise_core::{ResumeLevel, StepwiseError};
use stepwise_gate::{Checkpoint, CheckpointOutcome, StepGate};
use stepwise_hooks::{current_cancel_token, HookRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Receives step state for display.
pub trait StepIndicator: Send + Sync {
    /// A level control key was typed.
    fn level_selected(&self, level: ResumeLevel);

    /// Execution is about to block at a `requested` break.
    fn suspended(&self, requested: ResumeLevel, message: &str);

    /// Execution continues after a block.
    fn resumed(&self, level: ResumeLevel);
}

pub struct Stepper {
    gate: Arc<StepGate>,
    registry: Arc<HookRegistry>,
    indicator: Option<Arc<dyn StepIndicator>>,
    app_thread: ThreadId,
    open: AtomicBool,
}

impl Stepper {
    /// Create a stepper owned by the calling thread.
    pub fn new(gate: Arc<StepGate>, registry: Arc<HookRegistry>) -> Self {
        Self {
            gate,
            registry,
            indicator: None,
            app_thread: thread::current().id(),
            open: AtomicBool::new(true),
        }
    }

    /// Create a stepper that reports to `indicator`. The indicator is installed
    /// as the system hook of every level key.
    pub fn with_indicator(
        gate: Arc<StepGate>,
        registry: Arc<HookRegistry>,
        indicator: Arc<dyn StepIndicator>,
    ) -> Result<Self, StepwiseError> {
        let bindings: Vec<_> = registry.controls().level_bindings().collect();
        for (level, key) in bindings {
            registry.set_system_hook(
                key,
                |_, (indicator, level): &(Arc<dyn StepIndicator>, ResumeLevel)| {
                    indicator.level_selected(*level);
                    Ok(())
                },
                (Arc::clone(&indicator), level),
            )?;
        }
        let mut stepper = Self::new(gate, registry);
        stepper.indicator = Some(indicator);
        Ok(stepper)
    }

    pub fn gate(&self) -> &Arc<StepGate> {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn on_app_thread(&self) -> bool {
        thread::current().id() == self.app_thread
    }

    /// Whether break points on this thread can currently suspend.
    pub fn is_active(&self) -> bool {
        self.is_open() && !(self.on_app_thread() && self.registry.has_active_custom_hooks())
    }

    /// Break at step granularity. Returns whether execution was affected.
    #[track_caller]
    pub fn break_step(&self, message: &str) -> bool {
        self.suspend(Checkpoint::step(), message, Location::caller())
    }

    /// Break at step granularity, sleeping `delay` instead when the gate is
    /// in `Leap`.
    #[track_caller]
    pub fn break_step_delay(&self, delay: Duration, message: &str) -> bool {
        self.suspend(Checkpoint::step().delay(delay), message, Location::caller())
    }

    #[track_caller]
    pub fn break_leap(&self, message: &str) -> bool {
        self.suspend(Checkpoint::leap(), message, Location::caller())
    }

    #[track_caller]
    pub fn break_jump(&self, message: &str) -> bool {
        self.suspend(Checkpoint::jump(), message, Location::caller())
    }

    /// Break at `level`, giving up when `token` is cancelled.
    ///
    /// Breaks reached from a custom hook are already bound to that hook's
    /// token; this is for other cancellable work.
    #[track_caller]
    pub fn break_cancellable(
        &self,
        level: ResumeLevel,
        token: CancellationToken,
        message: &str,
    ) -> bool {
        self.suspend(Checkpoint::new(level).cancel_on(token), message, Location::caller())
    }

    fn suspend(
        &self,
        checkpoint: Checkpoint<'_>,
        message: &str,
        caller: &'static Location<'static>,
    ) -> bool {
        if !self.is_active() {
            return false;
        }
        let checkpoint = match current_cancel_token() {
            Some(token) if !checkpoint.is_cancellable() => checkpoint.cancel_on(token),
            _ => checkpoint,
        };
        let requested = checkpoint.level();
        let message = if message.is_empty() {
            format!("{}:{}", caller.file(), caller.line())
        } else {
            message.to_string()
        };
        let blocked = AtomicBool::new(false);

        let outcome = self.gate.checkpoint(checkpoint.on_block(|current| {
            blocked.store(true, Ordering::Relaxed);
            StepEventLogger::log_event(StepEvent::Suspended {
                requested,
                current,
                message: message.clone(),
            });
            if let Some(indicator) = &self.indicator {
                indicator.suspended(requested, &message);
            }
        }));

        if !blocked.load(Ordering::Relaxed) {
            // Throttled, or a throttle cut short by cancellation.
            return outcome != CheckpointOutcome::Passed;
        }
        let level = match outcome {
            CheckpointOutcome::Resumed(level) => level,
            _ => self.gate.level(),
        };
        debug!(%message, outcome = ?outcome, "Break point released");
        StepEventLogger::log_event(StepEvent::Resumed { level });
        if let Some(indicator) = &self.indicator {
            indicator.resumed(level);
        }
        true
    }

    /// Shut the stepper down and close the hook registry.
    ///
    /// On the application thread with custom hooks active, first waits for
    /// the terminate signal so the operator decides when the session ends.
    pub fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        if self.on_app_thread() && self.registry.has_active_custom_hooks() {
            info!("Custom hooks active; waiting for terminate before closing");
            self.gate.suspend_until_terminated();
        }
        self.registry.close();
    }
}

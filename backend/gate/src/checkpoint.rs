use std::time::Duration;

use stepwise_core::ResumeLevel;
use tokio_util::sync::CancellationToken;

/// Callback run once, right before a checkpoint suspends. Receives the level
/// in effect at that moment.
pub type OnBlock<'a> = Box<dyn FnOnce(ResumeLevel) + 'a>;

/// A single checkpoint request: the level it breaks at, an optional throttle
/// delay, an optional pre-block callback and an optional cancellation token.
pub struct Checkpoint<'a> {
    pub(crate) level: ResumeLevel,
    pub(crate) delay: Option<Duration>,
    pub(crate) on_block: Option<OnBlock<'a>>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl<'a> Checkpoint<'a> {
    pub fn new(level: ResumeLevel) -> Self {
        Self {
            level,
            delay: None,
            on_block: None,
            cancel: None,
        }
    }

    pub fn step() -> Self {
        Self::new(ResumeLevel::Step)
    }

    pub fn leap() -> Self {
        Self::new(ResumeLevel::Leap)
    }

    pub fn jump() -> Self {
        Self::new(ResumeLevel::Jump)
    }

    /// Throttle delay, applied to step checkpoints while the gate is in leap mode.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn on_block(mut self, f: impl FnOnce(ResumeLevel) + 'a) -> Self {
        self.on_block = Some(Box::new(f));
        self
    }

    /// End the wait early when `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn level(&self) -> ResumeLevel {
        self.level
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancel.is_some()
    }
}

impl std::fmt::Debug for Checkpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("level", &self.level)
            .field("delay", &self.delay)
            .field("on_block", &self.on_block.is_some())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// How a checkpoint call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// Returned without waiting.
    Passed,
    /// Slept for the throttle delay.
    Throttled,
    /// Blocked, then woken by a level change. Carries the level that woke it.
    Resumed(ResumeLevel),
    /// Blocked or throttled, then released by cancellation or termination.
    Interrupted,
}

/// Hook callback types and the context handed to custom hook tasks.
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use stepwise_core::InputEvent;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// A system hook: runs inline on the router's thread. Arguments given at
/// registration are captured inside the closure.
pub type SystemHookFn = Arc<dyn Fn(&InputEvent) -> Result<()> + Send + Sync>;

/// A custom hook: runs on its own blocking task, at most one per key.
pub type CustomHookFn = Arc<dyn Fn(&HookContext) -> Result<()> + Send + Sync>;

/// Bind a callback to its argument bundle.
pub(crate) fn bind_system<A, F>(callback: F, args: A) -> SystemHookFn
where
    A: Send + Sync + 'static,
    F: Fn(&InputEvent, &A) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(move |event: &InputEvent| callback(event, &args))
}

pub(crate) fn bind_custom<A, F>(callback: F, args: A) -> CustomHookFn
where
    A: Send + Sync + 'static,
    F: Fn(&HookContext, &A) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &HookContext| callback(ctx, &args))
}

// ---------------------------------------------------------------------------
// Hook context
// ---------------------------------------------------------------------------

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What a custom hook task sees: the triggering event and its cancellation
/// token. Cancellation is cooperative; long-running hooks should poll
/// [`is_cancelled`](Self::is_cancelled) or sleep through
/// [`wait_cancelled`](Self::wait_cancelled).
#[derive(Debug, Clone)]
pub struct HookContext {
    event: InputEvent,
    cancel: CancellationToken,
}

impl HookContext {
    pub fn new(event: InputEvent, cancel: CancellationToken) -> Self {
        Self { event, cancel }
    }

    pub fn event(&self) -> &InputEvent {
        &self.event
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token to pass on, e.g. to a cancellable checkpoint.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Sleep up to `timeout`, waking early on cancellation.
    ///
    /// Returns `true` if cancelled, `false` if the timeout elapsed.
    pub fn wait_cancelled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.cancel.is_cancelled() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            std::thread::sleep(remaining.min(CANCEL_POLL_INTERVAL));
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger outcome
// ---------------------------------------------------------------------------

/// Result of offering an event to the custom hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new hook task was spawned.
    Started,
    /// The hook for this key is still running; the trigger was dropped.
    Busy,
    /// The hook is filtered to another event source.
    SourceMismatch,
    /// No custom hook for this kind and key.
    Unregistered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_cancelled_times_out() {
        let ctx = HookContext::new(InputEvent::typed('x'), CancellationToken::new());
        let started = Instant::now();
        assert!(!ctx.wait_cancelled(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_cancelled_returns_on_cancel() {
        let token = CancellationToken::new();
        let ctx = HookContext::new(InputEvent::typed('x'), token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(ctx.wait_cancelled(Duration::from_secs(10)));
    }

    #[test]
    fn test_bound_args_reach_callback() {
        let hook = bind_system(|event, prefix: &String| {
            anyhow::ensure!(prefix == "dbg", "unexpected prefix");
            anyhow::ensure!(event.key == stepwise_core::HookKey::char('q'));
            Ok(())
        }, "dbg".to_string());
        hook(&InputEvent::typed('q')).unwrap();
    }
}

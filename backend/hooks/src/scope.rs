//! Cancellation scope of the custom hook running on the current thread.
//!
//! Hook tasks enter a scope around their callback so code they call, such as
//! a stepper break point, can end early when the hook is cancelled without
//! the token being threaded through by hand.

use std::cell::RefCell;

use tokio_util::sync::CancellationToken;

thread_local! {
    static CURRENT: RefCell<Option<CancellationToken>> = const { RefCell::new(None) };
}

/// Token of the custom hook running on this thread, if any.
pub fn current_cancel_token() -> Option<CancellationToken> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Installs a token for the current thread until dropped, then restores the
/// one it replaced.
pub(crate) struct CancelScope {
    previous: Option<CancellationToken>,
}

impl CancelScope {
    pub(crate) fn enter(token: CancellationToken) -> Self {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(token));
        Self { previous }
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

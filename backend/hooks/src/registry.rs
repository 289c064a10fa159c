/// Hook registry.
///
/// Two families of hooks are kept per [`HookKey`]:
///
/// - **System hooks** run synchronously on the router's thread. They are how
///   collaborators keep indicators in sync with control keys.
/// - **Custom hooks** are user callbacks, one sub-map per [`HookKind`]. Each
///   trigger runs on its own blocking task, and at most one task per
///   `(kind, key)` is alive at a time: a trigger that arrives while the
///   previous one is still running is dropped.
///
/// The single-flight slot of a `(kind, key)` outlives its registration, so a
/// replacement hook cannot overlap a predecessor that is still winding down
/// after cancellation.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use logging::{StepEvent, StepEventLogger};
use stepwise_core::{ControlKeys, HookKey, HookKind, InputEvent, KeyOwner, SourceId, StepwiseError};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::scope::CancelScope;
use crate::types::{
    bind_custom, bind_system, CustomHookFn, HookContext, SystemHookFn, TriggerOutcome,
};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

struct CustomEntry {
    callback: CustomHookFn,
    source: Option<SourceId>,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the task body ends, including on panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

type SlotKey = (HookKind, HookKey);

#[derive(Default)]
struct Hooks {
    system: HashMap<HookKey, SystemHookFn>,
    custom: HashMap<HookKind, HashMap<HookKey, CustomEntry>>,
    /// Running flags per `(kind, key)`, kept across re-registration.
    slots: HashMap<SlotKey, Arc<AtomicBool>>,
}

impl Hooks {
    fn slot(&mut self, kind: HookKind, key: HookKey) -> Arc<AtomicBool> {
        Arc::clone(self.slots.entry((kind, key)).or_default())
    }

    /// Drop slots that are idle and no longer back a registration.
    fn prune_slots(&mut self) {
        let custom = &self.custom;
        self.slots.retain(|(kind, key), running| {
            running.load(Ordering::Acquire)
                || custom.get(kind).is_some_and(|m| m.contains_key(key))
        });
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Thread-safe registry of system and custom hooks.
pub struct HookRegistry {
    controls: ControlKeys,
    runtime: Handle,
    hooks: Mutex<Hooks>,
}

impl HookRegistry {
    /// `runtime` hosts the custom hook tasks.
    pub fn new(controls: ControlKeys, runtime: Handle) -> Self {
        Self {
            controls,
            runtime,
            hooks: Mutex::new(Hooks::default()),
        }
    }

    /// Registry on the runtime of the calling context.
    ///
    /// # Panics
    /// Outside of a tokio runtime.
    pub fn on_current_runtime(controls: ControlKeys) -> Self {
        Self::new(controls, Handle::current())
    }

    pub fn controls(&self) -> &ControlKeys {
        &self.controls
    }

    fn lock(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // System hooks
    // -----------------------------------------------------------------------

    /// Register `callback` with its `args` as the system hook for `key`.
    /// Returns the hook it replaced.
    pub fn set_system_hook<A, F>(
        &self,
        key: impl Into<HookKey>,
        callback: F,
        args: A,
    ) -> Result<Option<SystemHookFn>, StepwiseError>
    where
        A: Send + Sync + 'static,
        F: Fn(&InputEvent, &A) -> Result<()> + Send + Sync + 'static,
    {
        self.install_system_hook(key.into(), bind_system(callback, args))
    }

    /// Register an already-bound system hook, e.g. one returned by a previous
    /// registration. The terminate key never reaches hooks and is refused.
    pub fn install_system_hook(
        &self,
        key: HookKey,
        hook: SystemHookFn,
    ) -> Result<Option<SystemHookFn>, StepwiseError> {
        let key = key.normalized();
        if key == self.controls.terminate_key() {
            return Err(StepwiseError::ReservedKey {
                key,
                owner: KeyOwner::Control,
            });
        }
        debug!(key = %key, "System hook registered");
        Ok(self.lock().system.insert(key, hook))
    }

    /// Remove the system hook for `key`, returning it.
    pub fn clear_system_hook(&self, key: impl Into<HookKey>) -> Option<SystemHookFn> {
        self.lock().system.remove(&key.into().normalized())
    }

    pub fn system_hook(&self, key: &HookKey) -> Option<SystemHookFn> {
        self.lock().system.get(&key.normalized()).cloned()
    }

    /// Run the system hook for the event's key inline. Errors are logged and
    /// swallowed. Returns whether a hook ran.
    pub fn run_system_hook(&self, event: &InputEvent) -> bool {
        // Clone out so the hook runs without the registry lock held.
        let Some(hook) = self.system_hook(&event.key) else {
            return false;
        };
        if let Err(e) = hook(event) {
            warn!(key = %event.key, kind = %event.kind, error = %e, "System hook returned error");
        }
        true
    }

    // -----------------------------------------------------------------------
    // Custom hooks
    // -----------------------------------------------------------------------

    /// Register `callback` with its `args` as the custom hook for
    /// `(kind, key)`, optionally restricted to events from `source`.
    ///
    /// Fails with [`StepwiseError::ReservedKey`] for control keys and for keys
    /// claimed by a system hook; existing registrations are left untouched.
    /// A replaced hook has its running task cancelled.
    pub fn set_custom_hook<A, F>(
        &self,
        kind: HookKind,
        key: impl Into<HookKey>,
        source: Option<SourceId>,
        callback: F,
        args: A,
    ) -> Result<Option<CustomHookFn>, StepwiseError>
    where
        A: Send + Sync + 'static,
        F: Fn(&HookContext, &A) -> Result<()> + Send + Sync + 'static,
    {
        self.install_custom_hook(kind, key.into(), source, bind_custom(callback, args))
    }

    /// As [`set_custom_hook`](Self::set_custom_hook), with the kind given by
    /// name (`"typed"`, `"pressed"`, `"released"`, `"mouse"`).
    pub fn set_custom_hook_named<A, F>(
        &self,
        kind: &str,
        key: impl Into<HookKey>,
        source: Option<SourceId>,
        callback: F,
        args: A,
    ) -> Result<Option<CustomHookFn>, StepwiseError>
    where
        A: Send + Sync + 'static,
        F: Fn(&HookContext, &A) -> Result<()> + Send + Sync + 'static,
    {
        let kind: HookKind = kind.parse()?;
        self.set_custom_hook(kind, key, source, callback, args)
    }

    pub fn install_custom_hook(
        &self,
        kind: HookKind,
        key: HookKey,
        source: Option<SourceId>,
        hook: CustomHookFn,
    ) -> Result<Option<CustomHookFn>, StepwiseError> {
        let key = key.normalized();
        if self.controls.is_reserved(&key) {
            return Err(StepwiseError::ReservedKey {
                key,
                owner: KeyOwner::Control,
            });
        }
        let mut hooks = self.lock();
        if hooks.system.contains_key(&key) {
            return Err(StepwiseError::ReservedKey {
                key,
                owner: KeyOwner::SystemHook,
            });
        }
        let running = hooks.slot(kind, key);
        let entry = CustomEntry {
            callback: hook,
            source,
            cancel: CancellationToken::new(),
            running,
        };
        let previous = hooks.custom.entry(kind).or_default().insert(key, entry);
        drop(hooks);

        debug!(kind = %kind, key = %key, filtered = source.is_some(), "Custom hook registered");
        Ok(previous.map(|old| {
            old.cancel.cancel();
            old.callback
        }))
    }

    /// Remove the custom hook for `(kind, key)`, cancelling its running task.
    pub fn clear_custom_hook(
        &self,
        kind: HookKind,
        key: impl Into<HookKey>,
    ) -> Option<CustomHookFn> {
        let key = key.into().normalized();
        let mut hooks = self.lock();
        let removed = hooks.custom.get_mut(&kind).and_then(|map| map.remove(&key))?;
        hooks.prune_slots();
        drop(hooks);
        removed.cancel.cancel();
        debug!(kind = %kind, key = %key, "Custom hook removed");
        Some(removed.callback)
    }

    /// Offer an event to the custom hook registered for its kind and key.
    ///
    /// Never blocks on the hook itself: a matching idle hook is started on a
    /// blocking task and the call returns at once.
    pub fn trigger(&self, event: &InputEvent) -> TriggerOutcome {
        let key = event.key.normalized();
        let hooks = self.lock();
        let Some(entry) = hooks.custom.get(&event.kind).and_then(|m| m.get(&key)) else {
            return TriggerOutcome::Unregistered;
        };
        if entry.source.is_some() && entry.source != event.source {
            return TriggerOutcome::SourceMismatch;
        }
        if entry
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(kind = %event.kind, key = %event.key, "Custom hook busy; trigger dropped");
            StepEventLogger::log_event(StepEvent::HookDropped {
                kind: event.kind,
                key: event.key,
            });
            return TriggerOutcome::Busy;
        }

        let guard = RunningGuard(Arc::clone(&entry.running));
        let callback = Arc::clone(&entry.callback);
        let ctx = HookContext::new(event.clone(), entry.cancel.clone());
        drop(hooks);

        self.spawn_task(ctx, callback, guard);
        TriggerOutcome::Started
    }

    fn spawn_task(&self, ctx: HookContext, callback: CustomHookFn, guard: RunningGuard) {
        let (kind, key) = (ctx.event().kind, ctx.event().key);
        StepEventLogger::log_event(StepEvent::HookStarted { kind, key });

        let job = self.runtime.spawn_blocking(move || {
            let _guard = guard;
            // Break points reached inside the hook observe its token.
            let _scope = CancelScope::enter(ctx.cancel_token());
            callback(&ctx)
        });

        // Task boundary: nothing a hook does escapes past here.
        self.runtime.spawn(async move {
            match job.await {
                Ok(Ok(())) => {
                    debug!(kind = %kind, key = %key, "Custom hook finished");
                }
                Ok(Err(e)) => {
                    warn!(kind = %kind, key = %key, error = %e, "Custom hook returned error");
                    StepEventLogger::log_event(StepEvent::HookFailed {
                        kind,
                        key,
                        error: e.to_string(),
                    });
                }
                Err(e) if e.is_panic() => {
                    error!(kind = %kind, key = %key, "Custom hook panicked");
                    StepEventLogger::log_event(StepEvent::HookFailed {
                        kind,
                        key,
                        error: "panicked".to_string(),
                    });
                }
                Err(e) => {
                    debug!(kind = %kind, key = %key, error = %e, "Custom hook task cancelled");
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// True while any custom hook is registered or any hook task is running.
    pub fn has_active_custom_hooks(&self) -> bool {
        let hooks = self.lock();
        hooks.custom.values().any(|m| !m.is_empty())
            || hooks.slots.values().any(|r| r.load(Ordering::Acquire))
    }

    pub fn is_running(&self, kind: HookKind, key: impl Into<HookKey>) -> bool {
        self.lock()
            .slots
            .get(&(kind, key.into().normalized()))
            .is_some_and(|r| r.load(Ordering::Acquire))
    }

    pub fn running_count(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|r| r.load(Ordering::Acquire))
            .count()
    }

    /// Cancel every running custom hook task and drop all custom
    /// registrations. System hooks stay. The registry can be reused.
    ///
    /// Cancellation is cooperative: break points inside a hook return at once,
    /// but a hook that otherwise ignores its token keeps running, and keeps
    /// its key busy, until it returns.
    pub fn close(&self) {
        let mut hooks = self.lock();
        let mut cancelled = 0;
        for (_, map) in hooks.custom.drain() {
            for (_, entry) in map {
                if entry.running.load(Ordering::Acquire) {
                    cancelled += 1;
                }
                entry.cancel.cancel();
            }
        }
        hooks.prune_slots();
        drop(hooks);
        info!(cancelled, "Custom hooks closed");
        StepEventLogger::log_event(StepEvent::HooksClosed { cancelled });
    }
}

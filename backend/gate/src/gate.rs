/// Step gate: the rendezvous between the application thread and the operator.
///
/// The gate holds the current [`ResumeLevel`]. A checkpoint requested at level
/// `L` blocks while `L >= current` and the gate is not in `Run`. Every
/// `set_level` wakes all blocked checkpoints, which then return: a wake means
/// "proceed to the next checkpoint", so pressing the step key repeatedly
/// advances one checkpoint at a time.
///
/// Termination is a separate, one-way signal. Once raised, nothing blocks on
/// the gate again.
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use stepwise_core::ResumeLevel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, CheckpointOutcome};

/// Cancellation is polled at this interval while a cancellable checkpoint waits.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct GateState {
    level: ResumeLevel,
    /// Bumped on every `set_level`; waiters compare against the value they saw.
    generation: u64,
    /// Number of callers currently blocked in a checkpoint.
    waiting: usize,
    terminated: bool,
}

#[derive(Debug)]
pub struct StepGate {
    state: Mutex<GateState>,
    level_changed: Condvar,
    terminated: Condvar,
}

impl StepGate {
    pub fn new() -> Self {
        Self::with_level(ResumeLevel::Step)
    }

    pub fn with_level(level: ResumeLevel) -> Self {
        Self {
            state: Mutex::new(GateState {
                level,
                generation: 0,
                waiting: 0,
                terminated: false,
            }),
            level_changed: Condvar::new(),
            terminated: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn level(&self) -> ResumeLevel {
        self.lock().level
    }

    /// Number of callers currently blocked in a checkpoint.
    pub fn waiting(&self) -> usize {
        self.lock().waiting
    }

    /// Replace the current level and wake every blocked checkpoint, even when
    /// the level is unchanged. Returns the previous level.
    pub fn set_level(&self, level: ResumeLevel) -> ResumeLevel {
        let mut state = self.lock();
        let previous = std::mem::replace(&mut state.level, level);
        state.generation = state.generation.wrapping_add(1);
        let woken = state.waiting;
        drop(state);
        self.level_changed.notify_all();
        debug!(from = %previous, to = %level, woken, "Resume level set");
        previous
    }

    /// The primitive beneath every stepping call.
    ///
    /// - Blocks until the next `set_level` when the requested level is at or
    ///   above the current one and the gate is not in `Run`. The `on_block`
    ///   callback runs once, just before blocking.
    /// - Otherwise, a step checkpoint with a delay sleeps for that delay while
    ///   the gate is exactly in `Leap`.
    /// - Otherwise returns immediately.
    pub fn checkpoint(&self, checkpoint: Checkpoint<'_>) -> CheckpointOutcome {
        let Checkpoint {
            level,
            delay,
            on_block,
            cancel,
        } = checkpoint;

        let state = self.lock();
        let current = state.level;

        if !level.blocks_under(current) {
            drop(state);
            return match delay {
                Some(delay) if level == ResumeLevel::Step && current == ResumeLevel::Leap => {
                    self.throttle(delay, cancel.as_ref())
                }
                _ => CheckpointOutcome::Passed,
            };
        }

        if state.terminated {
            return CheckpointOutcome::Interrupted;
        }
        let generation = state.generation;
        drop(state);

        // Run outside the lock so the callback may query the gate.
        if let Some(on_block) = on_block {
            on_block(current);
        }

        self.wait_for_change(generation, cancel.as_ref())
    }

    fn wait_for_change(
        &self,
        generation: u64,
        cancel: Option<&CancellationToken>,
    ) -> CheckpointOutcome {
        let mut state = self.lock();
        state.waiting += 1;
        let outcome = loop {
            if state.generation != generation {
                break CheckpointOutcome::Resumed(state.level);
            }
            if state.terminated || cancel.is_some_and(|t| t.is_cancelled()) {
                break CheckpointOutcome::Interrupted;
            }
            state = match cancel {
                Some(_) => {
                    self.level_changed
                        .wait_timeout(state, CANCEL_POLL_INTERVAL)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .level_changed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        };
        state.waiting -= 1;
        outcome
    }

    fn throttle(&self, delay: Duration, cancel: Option<&CancellationToken>) -> CheckpointOutcome {
        let Some(token) = cancel else {
            std::thread::sleep(delay);
            return CheckpointOutcome::Throttled;
        };
        let deadline = Instant::now() + delay;
        loop {
            if token.is_cancelled() {
                return CheckpointOutcome::Interrupted;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return CheckpointOutcome::Throttled;
            }
            std::thread::sleep(remaining.min(CANCEL_POLL_INTERVAL));
        }
    }

    pub fn step(&self) -> CheckpointOutcome {
        self.checkpoint(Checkpoint::step())
    }

    /// Step checkpoint that is throttled by `delay` in leap mode.
    pub fn step_for(&self, delay: Duration) -> CheckpointOutcome {
        self.checkpoint(Checkpoint::step().delay(delay))
    }

    pub fn leap(&self) -> CheckpointOutcome {
        self.checkpoint(Checkpoint::leap())
    }

    pub fn jump(&self) -> CheckpointOutcome {
        self.checkpoint(Checkpoint::jump())
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    /// Raise the terminate signal. Releases every blocked checkpoint and every
    /// caller in [`suspend_until_terminated`](Self::suspend_until_terminated).
    pub fn terminate(&self) {
        let mut state = self.lock();
        if state.terminated {
            return;
        }
        state.terminated = true;
        drop(state);
        self.level_changed.notify_all();
        self.terminated.notify_all();
        info!("Step gate terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Block until the terminate signal is raised, regardless of resume level.
    pub fn suspend_until_terminated(&self) {
        let mut state = self.lock();
        while !state.terminated {
            state = self
                .terminated
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`suspend_until_terminated`](Self::suspend_until_terminated) but
    /// gives up after `timeout`. Returns whether the signal was raised.
    pub fn suspend_until_terminated_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .terminated
            .wait_timeout_while(state, timeout, |s| !s.terminated)
            .unwrap_or_else(PoisonError::into_inner);
        state.terminated
    }
}

impl Default for StepGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;

    const SHORT: Duration = Duration::from_millis(100);
    const LONG: Duration = Duration::from_secs(5);

    fn wait_for_waiters(gate: &StepGate, n: usize) {
        let deadline = Instant::now() + LONG;
        while gate.waiting() < n {
            assert!(Instant::now() < deadline, "expected {n} blocked checkpoints");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn spawn_checkpoint(
        gate: &Arc<StepGate>,
        level: ResumeLevel,
    ) -> mpsc::Receiver<CheckpointOutcome> {
        let (tx, rx) = mpsc::channel();
        let gate = Arc::clone(gate);
        thread::spawn(move || {
            let _ = tx.send(gate.checkpoint(Checkpoint::new(level)));
        });
        rx
    }

    #[test]
    fn test_initial_level_is_step() {
        assert_eq!(StepGate::new().level(), ResumeLevel::Step);
    }

    #[test]
    fn test_non_blocking_checkpoints_pass() {
        let gate = StepGate::with_level(ResumeLevel::Leap);
        assert_eq!(gate.step(), CheckpointOutcome::Passed);
        gate.set_level(ResumeLevel::Jump);
        assert_eq!(gate.step(), CheckpointOutcome::Passed);
        assert_eq!(gate.leap(), CheckpointOutcome::Passed);
    }

    #[test]
    fn test_step_then_leap_scenario() {
        let gate = Arc::new(StepGate::new());
        let (tx, rx) = mpsc::channel();
        let worker = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                tx.send(gate.step()).unwrap();
                tx.send(gate.leap()).unwrap();
            })
        };

        wait_for_waiters(&gate, 1);
        assert!(rx.recv_timeout(SHORT).is_err());
        gate.set_level(ResumeLevel::Leap);
        assert_eq!(rx.recv_timeout(LONG).unwrap(), CheckpointOutcome::Resumed(ResumeLevel::Leap));

        wait_for_waiters(&gate, 1);
        assert!(rx.recv_timeout(SHORT).is_err());
        gate.set_level(ResumeLevel::Jump);
        assert_eq!(rx.recv_timeout(LONG).unwrap(), CheckpointOutcome::Resumed(ResumeLevel::Jump));
        worker.join().unwrap();
    }

    #[test]
    fn test_step_delay_throttles_in_leap_mode() {
        let gate = StepGate::with_level(ResumeLevel::Leap);
        let started = Instant::now();
        assert_eq!(gate.step_for(SHORT), CheckpointOutcome::Throttled);
        assert!(started.elapsed() >= SHORT);
        assert_eq!(gate.waiting(), 0);
    }

    #[test]
    fn test_step_delay_ignored_outside_leap_mode() {
        let gate = StepGate::with_level(ResumeLevel::Jump);
        let started = Instant::now();
        assert_eq!(gate.step_for(Duration::from_secs(2)), CheckpointOutcome::Passed);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_delayed_step_still_blocks_in_step_mode() {
        let gate = Arc::new(StepGate::new());
        let (tx, rx) = mpsc::channel();
        {
            let gate = Arc::clone(&gate);
            thread::spawn(move || tx.send(gate.step_for(Duration::from_millis(10))).unwrap());
        }
        wait_for_waiters(&gate, 1);
        assert!(rx.recv_timeout(SHORT).is_err());
        gate.set_level(ResumeLevel::Run);
        assert_eq!(rx.recv_timeout(LONG).unwrap(), CheckpointOutcome::Resumed(ResumeLevel::Run));
    }

    #[test]
    fn test_jump_in_run_mode_returns_immediately() {
        let gate = StepGate::with_level(ResumeLevel::Run);
        let started = Instant::now();
        assert_eq!(gate.jump(), CheckpointOutcome::Passed);
        assert!(started.elapsed() < SHORT);
    }

    #[test]
    fn test_run_releases_every_waiter() {
        let gate = Arc::new(StepGate::new());
        let receivers: Vec<_> = [ResumeLevel::Step, ResumeLevel::Leap, ResumeLevel::Jump]
            .into_iter()
            .map(|level| spawn_checkpoint(&gate, level))
            .collect();
        wait_for_waiters(&gate, 3);

        gate.set_level(ResumeLevel::Run);
        for rx in receivers {
            assert_eq!(
                rx.recv_timeout(LONG).unwrap(),
                CheckpointOutcome::Resumed(ResumeLevel::Run)
            );
        }
        assert_eq!(gate.waiting(), 0);
    }

    #[test]
    fn test_same_level_still_wakes_waiter() {
        let gate = Arc::new(StepGate::new());
        let rx = spawn_checkpoint(&gate, ResumeLevel::Step);
        wait_for_waiters(&gate, 1);
        assert_eq!(gate.set_level(ResumeLevel::Step), ResumeLevel::Step);
        assert_eq!(rx.recv_timeout(LONG).unwrap(), CheckpointOutcome::Resumed(ResumeLevel::Step));
    }

    #[test]
    fn test_on_block_runs_once_before_blocking() {
        let gate = Arc::new(StepGate::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        {
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                let outcome = gate.checkpoint(Checkpoint::leap().on_block(|current| {
                    assert_eq!(current, ResumeLevel::Step);
                    calls.fetch_add(1, Ordering::SeqCst);
                }));
                tx.send(outcome).unwrap();
            });
        }
        wait_for_waiters(&gate, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        gate.set_level(ResumeLevel::Jump);
        rx.recv_timeout(LONG).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_block_skipped_when_not_blocking() {
        let gate = StepGate::with_level(ResumeLevel::Run);
        let mut called = false;
        gate.checkpoint(Checkpoint::step().on_block(|_| called = true));
        assert!(!called);
    }

    #[test]
    fn test_on_block_may_capture_thread_local_data() {
        let gate = Arc::new(StepGate::new());
        let seen = Rc::new(Cell::new(None));
        let releaser = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                wait_for_waiters(&gate, 1);
                gate.set_level(ResumeLevel::Run);
            })
        };
        let checkpoint = Checkpoint::jump().on_block(|current| seen.set(Some(current)));
        let outcome = gate.checkpoint(checkpoint);
        releaser.join().unwrap();
        assert_eq!(outcome, CheckpointOutcome::Resumed(ResumeLevel::Run));
        assert_eq!(seen.get(), Some(ResumeLevel::Step));
    }

    #[test]
    fn test_cancellation_interrupts_wait() {
        let gate = Arc::new(StepGate::new());
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel();
        {
            let gate = Arc::clone(&gate);
            let token = token.clone();
            thread::spawn(move || {
                let outcome = gate.checkpoint(Checkpoint::jump().cancel_on(token));
                tx.send(outcome).unwrap();
            });
        }
        wait_for_waiters(&gate, 1);
        token.cancel();
        assert_eq!(rx.recv_timeout(LONG).unwrap(), CheckpointOutcome::Interrupted);
        assert_eq!(gate.level(), ResumeLevel::Step);
    }

    #[test]
    fn test_cancellation_cuts_throttle_short() {
        let gate = StepGate::with_level(ResumeLevel::Leap);
        let token = CancellationToken::new();
        token.cancel();
        let started = Instant::now();
        let checkpoint = Checkpoint::step()
            .delay(Duration::from_secs(5))
            .cancel_on(token);
        let outcome = gate.checkpoint(checkpoint);
        assert_eq!(outcome, CheckpointOutcome::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_terminate_releases_waiters_and_stops_blocking() {
        let gate = Arc::new(StepGate::new());
        let rx = spawn_checkpoint(&gate, ResumeLevel::Step);
        let (done_tx, done_rx) = mpsc::channel();
        {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.suspend_until_terminated();
                done_tx.send(()).unwrap();
            });
        }
        wait_for_waiters(&gate, 1);
        assert!(done_rx.recv_timeout(SHORT).is_err());

        gate.terminate();
        assert_eq!(rx.recv_timeout(LONG).unwrap(), CheckpointOutcome::Interrupted);
        done_rx.recv_timeout(LONG).unwrap();
        assert!(gate.is_terminated());
        assert_eq!(gate.step(), CheckpointOutcome::Interrupted);
    }

    #[test]
    fn test_terminate_wins_over_run() {
        let gate = Arc::new(StepGate::with_level(ResumeLevel::Run));
        assert!(!gate.suspend_until_terminated_timeout(SHORT));
        {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                gate.terminate();
            });
        }
        assert!(gate.suspend_until_terminated_timeout(LONG));
    }
}

//! `stepwise run`: an interactive stepping session on stdin.
//!
//! Typing `G` starts a counting loop on a hook task; the loop stops at step,
//! leap and jump break points. `T` prints the current level. Each stdin line
//! is routed one character at a time as typed keys; a line reading `esc`
//! terminates the session.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use stepwise_config::{initial_level, into_control_keys, StepwiseConfig};
use stepwise_core::{HookKind, InputEvent};
use stepwise_gate::StepGate;
use stepwise_hooks::{HookContext, HookRegistry};
use stepwise_routing::{EventRouter, Stepper};
use tracing::{debug, info};

use crate::console::{self, ConsoleIndicator};

pub struct RunOptions {
    pub iterations: u64,
    pub throttle: Duration,
}

struct CountJob {
    stepper: Arc<Stepper>,
    iterations: u64,
    throttle: Duration,
}

pub async fn run(config: &StepwiseConfig, options: RunOptions) -> Result<()> {
    let controls = into_control_keys(config)?;
    let gate = Arc::new(StepGate::with_level(initial_level(config)));
    let registry = Arc::new(HookRegistry::on_current_runtime(controls.clone()));
    let router = EventRouter::new(Arc::clone(&gate), Arc::clone(&registry));

    println!("Controls:");
    print!("{}", console::render_bindings(&controls));
    println!("  g  start counting\n  t  show level");

    thread::Builder::new()
        .name("stepwise-input".into())
        .spawn(move || read_input(router))
        .context("Failed to start input thread")?;

    // The stepper belongs to the thread that closes it.
    let app = tokio::task::spawn_blocking(move || -> Result<()> {
        let indicator = Arc::new(ConsoleIndicator::new(controls));
        let stepper = Arc::new(Stepper::with_indicator(
            Arc::clone(&gate),
            Arc::clone(&registry),
            indicator,
        )?);

        registry.set_custom_hook(
            HookKind::KeyTyped,
            'g',
            None,
            count,
            CountJob {
                stepper: Arc::clone(&stepper),
                iterations: options.iterations,
                throttle: options.throttle,
            },
        )?;
        registry.set_custom_hook(
            HookKind::KeyTyped,
            't',
            None,
            |_, gate: &Arc<StepGate>| {
                println!("level: {}", gate.level());
                Ok(())
            },
            Arc::clone(&gate),
        )?;

        info!("Session ready");
        stepper.close();
        Ok(())
    });
    app.await.context("Session thread panicked")??;

    info!("Session closed");
    Ok(())
}

fn count(ctx: &HookContext, job: &CountJob) -> Result<()> {
    let stepper = &job.stepper;
    for i in 1..=job.iterations {
        if ctx.is_cancelled() {
            debug!(at = i, "Counting cancelled");
            break;
        }
        stepper.break_step_delay(job.throttle, &format!("before {i}"));
        println!("{i}");
        if i % 10 == 0 {
            stepper.break_leap(&format!("reached {i}"));
        }
        if i % 50 == 0 {
            stepper.break_jump("");
        }
    }
    println!("done counting");
    Ok(())
}

/// Route stdin until EOF, then terminate so the session can close.
fn read_input(router: EventRouter) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        for event in line_events(&line) {
            router.route(&event);
        }
    }
    debug!("Input closed");
    router.route(&InputEvent::escape());
}

fn line_events(line: &str) -> Vec<InputEvent> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case("esc") || trimmed.eq_ignore_ascii_case("escape") {
        return vec![InputEvent::escape()];
    }
    // Keep interior spaces: space is a control key.
    line.trim_end_matches(['\r', '\n'])
        .chars()
        .map(InputEvent::typed)
        .collect()
}

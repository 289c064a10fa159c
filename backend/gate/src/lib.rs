//! `stepwise-gate`: execution gating for stepped programs.
//!
//! Application code marks checkpoints with [`StepGate::step`],
//! [`StepGate::leap`] and [`StepGate::jump`]; an operator thread moves the
//! gate between resume levels with [`StepGate::set_level`].

pub mod checkpoint;
pub mod gate;

pub use checkpoint::{Checkpoint, CheckpointOutcome};
pub use gate::StepGate;
pub use stepwise_core::ResumeLevel;

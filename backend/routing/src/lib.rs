//! `stepwise-routing`: input event routing and the application-facing
//! stepper.

pub mod router;
pub mod stepper;

pub use router::{EventRouter, RouteOutcome};
pub use stepper::{StepIndicator, Stepper};

//! Structured logging for stepwise.
//!
//! Console and rolling NDJSON file output, plus a dedicated log of gate and
//! hook lifecycle events.

pub mod event_logger;
pub mod logger;

pub use event_logger::{StepEvent, StepEventEntry, StepEventLogger};
pub use logger::{init_logger, LoggerGuard};

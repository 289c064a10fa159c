//! `stepwise-hooks`: system and custom hook registry with single-flight
//! execution of custom hooks.

pub mod registry;
pub mod scope;
pub mod types;

pub use registry::HookRegistry;
pub use scope::current_cancel_token;
pub use types::{CustomHookFn, HookContext, SystemHookFn, TriggerOutcome};

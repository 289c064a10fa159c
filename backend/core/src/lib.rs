pub mod controls;
pub mod error;
pub mod event;
pub mod key;
pub mod level;

pub use controls::{ControlAction, ControlKeys};
pub use error::{KeyOwner, StepwiseError};
pub use event::{InputEvent, SourceId};
pub use key::{HookKey, HookKind, MouseAction, NamedKey};
pub use level::ResumeLevel;

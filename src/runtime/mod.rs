//! Runtime: turns wired `Zone`s into running `tokio` tasks and exposes the
//! external mode-command interface used to observe/change them.

pub mod builder;
pub mod flags;
pub mod loop_;
pub mod mode;

pub use builder::{wire, Wired};
pub use flags::RuntimeFlags;
pub use loop_::{spawn, ZoneHandle};
pub use mode::{get_failsafe, get_manual, set_manual, ModeCommand, ModeReceiver, ModeSender};

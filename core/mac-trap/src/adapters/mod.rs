//! macOS implementations of the tripwire's collaborators.
//!
//! Every adapter shells out to a configurable argv, so the defaults
//! (`ioreg`, `osascript`, `imagesnap`, the warning UI) can be swapped from the
//! config file without code changes.

mod camera;
mod command;
mod idle;
mod lock;
mod warning;

pub use camera::CommandCapturer;
pub use idle::IoregIdleProbe;
pub use lock::CommandLocker;
pub use warning::{LiveWarnings, ProcessNotifier};

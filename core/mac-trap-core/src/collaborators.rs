//! Capability traits for the side effects the tripwire depends on.
//!
//! Production implementations shell out to OS utilities (see the `mac-trap`
//! binary); tests use in-memory fakes. Each operation either succeeds or fails
//! with no partial state.

use std::path::Path;
use std::time::Instant;

use crate::error::Result;
use crate::session::WarningEpisode;

/// Reads system-wide input idle time.
pub trait IdleProbe: Send {
    /// Fractional seconds since the last keyboard or mouse event.
    fn read(&self) -> Result<f64>;
}

/// Locks the interactive session. Expected to return in well under a second.
pub trait Locker: Send + Sync {
    fn lock(&self) -> Result<()>;
}

/// Captures a photo to `destination`. Called from a helper thread.
pub trait Capturer: Send + Sync {
    fn capture(&self, destination: &Path) -> Result<()>;

    /// Whether the capture tool looks usable; checked once at startup.
    fn is_available(&self) -> bool {
        true
    }
}

/// Starts the warning UI for a new episode.
///
/// Every call must create a fresh acknowledgement channel; a channel is never
/// shared between episodes.
pub trait Notifier: Send {
    fn start(&self, started_at: Instant) -> Result<WarningEpisode>;
}

/// Owner of whatever keeps a warning episode alive (usually a child process).
pub trait WarningHandle: Send {
    /// Stops the warning UI and reclaims its resources. Must be idempotent.
    fn terminate(&mut self);
}

//! # mac-trap-core
//!
//! Detection logic for the mac-trap idle tripwire: a single-user workstation
//! is watched for input that arrives after the owner has been idle past a
//! threshold, and that input is answered with a photo and a screen lock.
//!
//! ## Design Principles
//!
//! - **Single writer**: the [`Session`] is owned by the sampling loop and only
//!   mutated there. Helper threads (capture, warning listener) report back
//!   through one-shot channels.
//! - **Fail silent on probes**: an idle probe failure never changes state and
//!   never becomes a detection.
//! - **Lock first**: the screen lock is issued before capture is awaited.
//! - **Swappable collaborators**: every OS side effect sits behind a narrow
//!   trait in [`collaborators`], so the machine runs deterministically in
//!   tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mac_trap_core::{DetectionCoordinator, Monitor, PhotoStore, Tripwire};
//!
//! let tripwire = Tripwire::new(config.detection.clone(), Box::new(notifier));
//! let coordinator = DetectionCoordinator::new(locker, capturer, photos, ceiling);
//! let mut monitor = Monitor::new(Box::new(probe), tripwire, coordinator, Box::new(reporter));
//! monitor.run(&shutdown);
//! ```

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod machine;
pub mod monitor;
pub mod photos;
pub mod session;
pub mod status;

#[cfg(test)]
mod test_utils;

pub use collaborators::{Capturer, IdleProbe, Locker, Notifier, WarningHandle};
pub use config::{
    load_config, AfterDetection, CommandsConfig, DetectionConfig, GraceCancel, MacTrapConfig,
    StartupConfig, StorageConfig,
};
pub use coordinator::{CaptureOutcome, DetectionCoordinator, DetectionReport};
pub use error::{Result, TripwireError};
pub use machine::{DetectionAftermath, DetectionTrigger, TickOutcome, Tripwire};
pub use monitor::{Monitor, RunExit, StepOutcome};
pub use photos::PhotoStore;
pub use session::{Phase, PhaseKind, Session, WarningEpisode};
pub use status::{QuietStatus, StatusReporter, StatusSnapshot};

//! Per-tick status rendering.

use std::time::{Duration, Instant};

use crate::session::{PhaseKind, Session};

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub phase: PhaseKind,
    pub idle_secs: f64,
    pub threshold_secs: f64,
    pub warning_elapsed: Option<Duration>,
    pub grace_remaining: Option<Duration>,
}

impl StatusSnapshot {
    pub fn from_session(session: &Session, idle_secs: f64, now: Instant) -> Self {
        Self {
            phase: session.phase_kind(),
            idle_secs,
            threshold_secs: session.idle_threshold_secs(),
            warning_elapsed: session
                .warning_episode()
                .map(|episode| episode.elapsed(now)),
            grace_remaining: session
                .grace_until()
                .map(|until| until.saturating_duration_since(now)),
        }
    }

    /// One-line summary for the console.
    pub fn headline(&self) -> String {
        match self.phase {
            PhaseKind::Warning => format!(
                "WARNING ACTIVE: {:.0}s elapsed | CLICK HIDDEN BUTTON!",
                self.warning_elapsed.unwrap_or_default().as_secs_f64()
            ),
            PhaseKind::Grace => format!(
                "Grace period | Idle: {:.0}s | Re-arming in: {:.0}s",
                self.idle_secs,
                self.grace_remaining.unwrap_or_default().as_secs_f64()
            ),
            PhaseKind::Uninitialized => {
                format!("Waiting for new session | Idle: {:.0}s", self.idle_secs)
            }
            PhaseKind::Monitoring if self.idle_secs > self.threshold_secs => format!(
                "System waiting | Idle: {:.0}s | Waiting for activity to lock...",
                self.idle_secs
            ),
            PhaseKind::Monitoring => format!(
                "Monitoring | Idle: {:.0}s | Threshold in: {:.0}s",
                self.idle_secs,
                self.threshold_secs - self.idle_secs
            ),
        }
    }
}

pub trait StatusReporter {
    fn render(&mut self, snapshot: &StatusSnapshot);

    /// Called before the process exits so the terminal is left tidy.
    fn finish(&mut self) {}
}

/// Reporter that renders nothing.
#[derive(Debug, Default)]
pub struct QuietStatus;

impl StatusReporter for QuietStatus {
    fn render(&mut self, _snapshot: &StatusSnapshot) {}
}

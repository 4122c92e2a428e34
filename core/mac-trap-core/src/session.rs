//! Monitored session state.
//!
//! The phase enum owns the data that only exists in that phase: a
//! [`WarningEpisode`] lives inside `Phase::Warning` and the grace deadline
//! inside `Phase::Grace`, so neither can outlive its phase.

use std::fmt;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::time::{Duration, Instant};

use crate::collaborators::WarningHandle;

/// One warning window: the UI handle plus its single-slot ack channel.
///
/// Dropping the episode terminates the UI.
pub struct WarningEpisode {
    started_at: Instant,
    ack: Receiver<()>,
    handle: Option<Box<dyn WarningHandle>>,
}

impl WarningEpisode {
    /// Single-slot channel carrying the owner acknowledgement.
    pub fn ack_channel() -> (SyncSender<()>, Receiver<()>) {
        mpsc::sync_channel(1)
    }

    pub fn new(started_at: Instant, ack: Receiver<()>, handle: Box<dyn WarningHandle>) -> Self {
        Self {
            started_at,
            ack,
            handle: Some(handle),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Non-blocking check for an acknowledgement.
    pub fn try_ack(&self) -> bool {
        self.ack.try_recv().is_ok()
    }

    /// Waits up to `timeout` for an acknowledgement.
    ///
    /// Returns early with `false` when the sender is gone, since no ack can
    /// arrive after that.
    pub fn wait_ack(&self, timeout: Duration) -> bool {
        self.ack.recv_timeout(timeout).is_ok()
    }

    pub fn terminate(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.terminate();
        }
    }
}

impl Drop for WarningEpisode {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl fmt::Debug for WarningEpisode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarningEpisode")
            .field("started_at", &self.started_at)
            .field("live", &self.handle.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub enum Phase {
    /// No sample taken yet; there is nothing to compare against.
    Uninitialized,
    Monitoring,
    Warning(WarningEpisode),
    Grace { until: Instant },
}

/// Data-free mirror of [`Phase`] for reporting and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Uninitialized,
    Monitoring,
    Warning,
    Grace,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Uninitialized => "uninitialized",
            PhaseKind::Monitoring => "monitoring",
            PhaseKind::Warning => "warning",
            PhaseKind::Grace => "grace",
        }
    }
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Uninitialized => PhaseKind::Uninitialized,
            Phase::Monitoring => PhaseKind::Monitoring,
            Phase::Warning(_) => PhaseKind::Warning,
            Phase::Grace { .. } => PhaseKind::Grace,
        }
    }
}

/// Process-lifetime state of the tripwire. Mutated only by the sampling loop.
#[derive(Debug)]
pub struct Session {
    idle_threshold_secs: f64,
    last_idle_sample: f64,
    phase: Phase,
}

impl Session {
    pub fn new(idle_threshold_secs: f64) -> Self {
        Self {
            idle_threshold_secs,
            last_idle_sample: 0.0,
            phase: Phase::Uninitialized,
        }
    }

    pub fn idle_threshold_secs(&self) -> f64 {
        self.idle_threshold_secs
    }

    pub fn last_idle_sample(&self) -> f64 {
        self.last_idle_sample
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.phase, Phase::Uninitialized)
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn warning_episode(&self) -> Option<&WarningEpisode> {
        match &self.phase {
            Phase::Warning(episode) => Some(episode),
            _ => None,
        }
    }

    pub fn grace_until(&self) -> Option<Instant> {
        match self.phase {
            Phase::Grace { until } => Some(until),
            _ => None,
        }
    }

    pub(crate) fn record(&mut self, sample: f64) {
        self.last_idle_sample = sample;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        let previous = std::mem::replace(&mut self.phase, phase);
        if let Phase::Warning(mut episode) = previous {
            episode.terminate();
        }
    }

    /// Back to the state of a freshly started process.
    pub(crate) fn reset(&mut self) {
        self.set_phase(Phase::Uninitialized);
        self.last_idle_sample = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeWarningHandle;

    #[test]
    fn new_session_is_uninitialized() {
        let session = Session::new(60.0);
        assert_eq!(session.phase_kind(), PhaseKind::Uninitialized);
        assert!(!session.is_initialized());
        assert!(session.warning_episode().is_none());
        assert!(session.grace_until().is_none());
    }

    #[test]
    fn leaving_warning_terminates_the_episode() {
        let (handle, terminations) = FakeWarningHandle::new();
        let (_tx, rx) = WarningEpisode::ack_channel();
        let mut session = Session::new(60.0);
        session.set_phase(Phase::Warning(WarningEpisode::new(
            Instant::now(),
            rx,
            Box::new(handle),
        )));
        assert!(session.warning_episode().is_some());

        session.set_phase(Phase::Monitoring);
        assert_eq!(terminations.count(), 1);
        assert!(session.warning_episode().is_none());
    }

    #[test]
    fn episode_terminates_once_even_when_dropped_after_terminate() {
        let (handle, terminations) = FakeWarningHandle::new();
        let (_tx, rx) = WarningEpisode::ack_channel();
        let mut episode = WarningEpisode::new(Instant::now(), rx, Box::new(handle));
        episode.terminate();
        drop(episode);
        assert_eq!(terminations.count(), 1);
    }

    #[test]
    fn ack_channel_holds_a_single_signal() {
        let (tx, rx) = WarningEpisode::ack_channel();
        assert!(tx.try_send(()).is_ok());
        assert!(tx.try_send(()).is_err());

        let (handle, _) = FakeWarningHandle::new();
        let episode = WarningEpisode::new(Instant::now(), rx, Box::new(handle));
        assert!(episode.try_ack());
        assert!(!episode.try_ack());
    }

    #[test]
    fn wait_ack_returns_early_when_sender_is_gone() {
        let (tx, rx) = WarningEpisode::ack_channel();
        drop(tx);
        let (handle, _) = FakeWarningHandle::new();
        let episode = WarningEpisode::new(Instant::now(), rx, Box::new(handle));

        let started = Instant::now();
        assert!(!episode.wait_ack(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn reset_clears_sample_and_phase() {
        let mut session = Session::new(60.0);
        session.record(42.0);
        session.set_phase(Phase::Grace {
            until: Instant::now(),
        });
        session.reset();
        assert_eq!(session.last_idle_sample(), 0.0);
        assert_eq!(session.phase_kind(), PhaseKind::Uninitialized);
    }
}

//! The sampling loop.
//!
//! Owns the probe, the state machine, the detection coordinator and the status
//! reporter. Each step is probe read, decision, side effects, render, in that
//! order, and no two steps overlap.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::collaborators::IdleProbe;
use crate::coordinator::DetectionCoordinator;
use crate::machine::{DetectionAftermath, TickOutcome, Tripwire};
use crate::status::{StatusReporter, StatusSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// A detection ran under the `exit` policy.
    Exit,
    /// Shutdown arrived before the step could act on a detection.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Shutdown was requested (or its sender dropped).
    Interrupted,
    DetectionPolicy,
}

pub struct Monitor {
    probe: Box<dyn IdleProbe>,
    tripwire: Tripwire,
    coordinator: DetectionCoordinator,
    reporter: Box<dyn StatusReporter>,
    tick_interval: Duration,
    detections: u64,
}

impl Monitor {
    pub fn new(
        probe: Box<dyn IdleProbe>,
        tripwire: Tripwire,
        coordinator: DetectionCoordinator,
        reporter: Box<dyn StatusReporter>,
    ) -> Self {
        let tick_interval = tripwire.config().tick_interval();
        Self {
            probe,
            tripwire,
            coordinator,
            reporter,
            tick_interval,
            detections: 0,
        }
    }

    pub fn tripwire(&self) -> &Tripwire {
        &self.tripwire
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }

    /// Runs one tick.
    pub fn step(&mut self) -> StepOutcome {
        self.advance(None)
    }

    fn advance(&mut self, shutdown: Option<&Receiver<()>>) -> StepOutcome {
        let sample = self.probe.read();
        let idle_secs = sample.as_ref().ok().copied();
        let outcome = self.tripwire.tick(sample, Instant::now());

        if let TickOutcome::Detected(trigger) = outcome {
            // Shutdown kills the warning UI, which reads as an unacknowledged
            // drop. An operator quitting must not be locked out.
            if shutdown.is_some_and(shutdown_pending) {
                info!(trigger = trigger.as_str(), "Shutdown pending; skipping detection");
                return StepOutcome::Interrupted;
            }
            self.detections += 1;
            info!(
                trigger = trigger.as_str(),
                detections = self.detections,
                "Handling detection"
            );
            let report = self.coordinator.fire();
            debug!(
                lock_ok = report.lock.is_ok(),
                capture = ?report.capture,
                "Detection side effects finished"
            );
            if self.tripwire.complete_detection(Instant::now()) == DetectionAftermath::Exit {
                return StepOutcome::Exit;
            }
        }

        if let Some(idle_secs) = idle_secs {
            let snapshot =
                StatusSnapshot::from_session(self.tripwire.session(), idle_secs, Instant::now());
            self.reporter.render(&snapshot);
        }
        StepOutcome::Continue
    }

    /// Ticks until shutdown is signalled or a detection ends monitoring.
    ///
    /// The tick wait doubles as the shutdown wait, so an interrupt is seen
    /// within one tick (plus any bounded wait already in progress). A
    /// shutdown that lands mid-step is honoured before any detection fires.
    pub fn run(&mut self, shutdown: &Receiver<()>) -> RunExit {
        info!(
            threshold_secs = self.tripwire.config().idle_threshold_secs,
            tick_ms = self.tick_interval.as_millis() as u64,
            after_detection = self.tripwire.config().after_detection.as_str(),
            "Monitoring started"
        );
        loop {
            let started = Instant::now();
            if shutdown_pending(shutdown) {
                return self.interrupted();
            }
            match self.advance(Some(shutdown)) {
                StepOutcome::Continue => {}
                StepOutcome::Exit => {
                    self.reporter.finish();
                    return RunExit::DetectionPolicy;
                }
                StepOutcome::Interrupted => return self.interrupted(),
            }
            // Fixed period: the probe and any bounded waits come out of the
            // interval rather than stretching it.
            let wait = self.tick_interval.saturating_sub(started.elapsed());
            match shutdown.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return self.interrupted(),
            }
        }
    }

    fn interrupted(&mut self) -> RunExit {
        self.tripwire.stand_down();
        self.reporter.finish();
        RunExit::Interrupted
    }
}

/// Consumes a pending shutdown request, if any. A dropped sender counts.
fn shutdown_pending(shutdown: &Receiver<()>) -> bool {
    match shutdown.try_recv() {
        Ok(()) | Err(TryRecvError::Disconnected) => true,
        Err(TryRecvError::Empty) => false,
    }
}

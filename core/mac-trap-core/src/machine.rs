//! The detection state machine.
//!
//! One call to [`Tripwire::tick`] per sampling period. Detection is an edge,
//! not a level: staying idle past the threshold never fires on its own, only
//! a drop in idle time after such a span does. During a warning episode an
//! idle drop is ambiguous (the owner clicking the acknowledge control looks
//! exactly like an intruder), so the machine waits a bounded time for the
//! acknowledgement before deciding.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::collaborators::Notifier;
use crate::config::{AfterDetection, DetectionConfig, GraceCancel};
use crate::error::Result;
use crate::session::{Phase, PhaseKind, Session};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionTrigger {
    /// Idle time fell after having exceeded the threshold.
    ActivityAfterIdle { previous: f64, current: f64 },
    /// Idle time fell during a warning and no acknowledgement followed.
    UnacknowledgedActivity { previous: f64, current: f64 },
}

impl DetectionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionTrigger::ActivityAfterIdle { .. } => "activity_after_idle",
            DetectionTrigger::UnacknowledgedActivity { .. } => "unacknowledged_activity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The probe failed; nothing changed.
    ProbeSkipped,
    /// First sample recorded.
    Armed,
    Steady,
    WarningStarted,
    Acknowledged,
    GraceEnded,
    GraceCancelled,
    /// The caller must run the side effects and then call
    /// [`Tripwire::complete_detection`].
    Detected(DetectionTrigger),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionAftermath {
    Reset,
    Grace { until: Instant },
    Exit,
}

pub struct Tripwire {
    session: Session,
    config: DetectionConfig,
    notifier: Box<dyn Notifier>,
    // Set when the warning UI failed to start during the current approach to
    // the threshold; cleared once idle time leaves the lead window.
    warning_launch_failed: bool,
}

impl Tripwire {
    pub fn new(config: DetectionConfig, notifier: Box<dyn Notifier>) -> Self {
        Self {
            session: Session::new(config.idle_threshold_secs),
            config,
            notifier,
            warning_launch_failed: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn tick(&mut self, sample: Result<f64>, now: Instant) -> TickOutcome {
        let sample = match sample {
            Ok(value) if value.is_finite() && value >= 0.0 => value,
            Ok(value) => {
                debug!(sample = value, "Ignoring out-of-range idle sample");
                return TickOutcome::ProbeSkipped;
            }
            Err(err) => {
                debug!(error = %err, "Idle probe failed; skipping tick");
                return TickOutcome::ProbeSkipped;
            }
        };

        match self.session.phase_kind() {
            PhaseKind::Uninitialized => self.arm(sample),
            PhaseKind::Monitoring => self.tick_monitoring(sample, now),
            PhaseKind::Warning => self.tick_warning(sample),
            PhaseKind::Grace => self.tick_grace(sample, now),
        }
    }

    /// Applies the configured post-detection policy.
    pub fn complete_detection(&mut self, now: Instant) -> DetectionAftermath {
        self.warning_launch_failed = false;
        match self.config.after_detection {
            AfterDetection::Reset => {
                self.session.reset();
                info!("State reset; waiting for a new session");
                DetectionAftermath::Reset
            }
            AfterDetection::Grace => {
                let until = now + self.config.grace_period();
                self.session.set_phase(Phase::Grace { until });
                info!(
                    grace_secs = self.config.grace_period_secs,
                    "Grace period started"
                );
                DetectionAftermath::Grace { until }
            }
            AfterDetection::Exit => {
                self.session.reset();
                info!("Detection handled; monitoring will stop");
                DetectionAftermath::Exit
            }
        }
    }

    /// Terminates any live warning episode ahead of process shutdown.
    pub fn stand_down(&mut self) {
        if self.session.phase_kind() == PhaseKind::Warning {
            info!("Dismissing warning for shutdown");
            self.session.set_phase(Phase::Monitoring);
        }
    }

    fn arm(&mut self, sample: f64) -> TickOutcome {
        self.session.record(sample);
        self.session.set_phase(Phase::Monitoring);
        debug!(sample, "First idle sample recorded");
        TickOutcome::Armed
    }

    fn tick_monitoring(&mut self, sample: f64, now: Instant) -> TickOutcome {
        let threshold = self.session.idle_threshold_secs();
        let previous = self.session.last_idle_sample();

        if previous > threshold && sample < previous {
            warn!(
                previous_idle_secs = previous,
                idle_secs = sample,
                "Access detected after idle period"
            );
            self.session.record(sample);
            return TickOutcome::Detected(DetectionTrigger::ActivityAfterIdle {
                previous,
                current: sample,
            });
        }

        let remaining = threshold - sample;
        let in_lead_window = remaining > 0.0 && remaining <= self.config.warning_lead_secs;
        if !in_lead_window {
            self.warning_launch_failed = false;
        } else if !self.warning_launch_failed {
            match self.notifier.start(now) {
                Ok(episode) => {
                    self.session.set_phase(Phase::Warning(episode));
                    self.session.record(sample);
                    info!(
                        remaining_secs = remaining,
                        "Warning started; waiting for owner acknowledgement"
                    );
                    return TickOutcome::WarningStarted;
                }
                Err(err) => {
                    self.warning_launch_failed = true;
                    warn!(error = %err, "Failed to start warning; continuing to monitor");
                }
            }
        }

        self.session.record(sample);
        TickOutcome::Steady
    }

    fn tick_warning(&mut self, sample: f64) -> TickOutcome {
        let previous = self.session.last_idle_sample();
        let idle_drop = previous - sample;

        let acknowledged = match self.session.warning_episode() {
            Some(episode) if episode.try_ack() => Some(true),
            Some(episode) if idle_drop > self.config.activity_noise_floor_secs => {
                info!(
                    drop_secs = idle_drop,
                    "Activity during warning; checking for acknowledgement"
                );
                Some(episode.wait_ack(self.config.ack_wait()))
            }
            _ => None,
        };

        match acknowledged {
            Some(true) => {
                info!("Owner acknowledged warning; resetting idle tracking");
                self.session.set_phase(Phase::Monitoring);
                self.session.record(sample);
                TickOutcome::Acknowledged
            }
            Some(false) => {
                warn!(
                    previous_idle_secs = previous,
                    idle_secs = sample,
                    "Activity during warning without acknowledgement"
                );
                self.session.set_phase(Phase::Monitoring);
                self.session.record(sample);
                TickOutcome::Detected(DetectionTrigger::UnacknowledgedActivity {
                    previous,
                    current: sample,
                })
            }
            None => {
                self.session.record(sample);
                TickOutcome::Steady
            }
        }
    }

    fn tick_grace(&mut self, sample: f64, now: Instant) -> TickOutcome {
        let Some(until) = self.session.grace_until() else {
            return TickOutcome::Steady;
        };
        let previous = self.session.last_idle_sample();

        if now >= until {
            info!("Grace period ended; monitoring resumed");
            self.session.set_phase(Phase::Monitoring);
            self.session.record(sample);
            return TickOutcome::GraceEnded;
        }

        if self.config.grace_cancel == GraceCancel::OnActivity && sample < previous {
            info!("Activity during grace period; monitoring resumed");
            self.session.set_phase(Phase::Monitoring);
            self.session.record(sample);
            return TickOutcome::GraceCancelled;
        }

        self.session.record(sample);
        TickOutcome::Steady
    }
}

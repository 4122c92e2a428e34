//! SIGINT/SIGTERM handling.
//!
//! A listener thread turns the first signal into a message on the shutdown
//! channel the monitor waits on, after killing any warning UI that is on
//! screen. A second signal within [`FORCE_EXIT_WINDOW`] exits at once.

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::adapters::LiveWarnings;

pub const FORCE_EXIT_WINDOW: Duration = Duration::from_secs(3);

pub struct ShutdownListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl ShutdownListener {
    /// Registers the handlers and returns the receiving end of the shutdown
    /// channel.
    pub fn install(live: LiveWarnings) -> io::Result<(Self, Receiver<()>)> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let (tx, rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("mac-trap-signals".to_string())
            .spawn(move || {
                let mut state = SignalState::default();
                for signal in signals.forever() {
                    state.handle(signal, Instant::now(), &live, &tx);
                }
            })?;

        Ok((
            Self {
                handle,
                thread: Some(thread),
            },
            rx,
        ))
    }

    pub fn close(mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[derive(Debug, Default)]
struct SignalState {
    first_at: Option<Instant>,
}

#[derive(Debug, PartialEq, Eq)]
enum SignalAction {
    Shutdown,
    ForceExit,
    Ignore,
}

impl SignalState {
    fn classify(&mut self, now: Instant) -> SignalAction {
        match self.first_at {
            None => {
                self.first_at = Some(now);
                SignalAction::Shutdown
            }
            Some(first) if now.saturating_duration_since(first) <= FORCE_EXIT_WINDOW => {
                SignalAction::ForceExit
            }
            Some(_) => {
                self.first_at = Some(now);
                SignalAction::Ignore
            }
        }
    }

    fn handle(&mut self, signal: i32, now: Instant, live: &LiveWarnings, tx: &Sender<()>) {
        let killed = live.kill_all();
        match self.classify(now) {
            SignalAction::Shutdown => {
                info!(signal, killed_warnings = killed, "Shutting down");
                let _ = tx.send(());
            }
            SignalAction::ForceExit => {
                warn!(signal, "Second signal within window, exiting immediately");
                std::process::exit(0);
            }
            SignalAction::Ignore => {
                debug!(signal, "Signal outside force-exit window; shutdown already underway");
            }
        }
    }
}

/// Sleeps for `delay` unless shutdown arrives first. Returns `true` when
/// interrupted.
pub fn interrupted_during(shutdown: &Receiver<()>, delay: Duration) -> bool {
    match shutdown.recv_timeout(delay) {
        Err(RecvTimeoutError::Timeout) => false,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_signal_requests_shutdown() {
        let mut state = SignalState::default();
        assert_eq!(state.classify(Instant::now()), SignalAction::Shutdown);
    }

    #[test]
    fn quick_second_signal_forces_exit() {
        let mut state = SignalState::default();
        let first = Instant::now();
        state.classify(first);
        assert_eq!(
            state.classify(first + Duration::from_secs(1)),
            SignalAction::ForceExit
        );
    }

    #[test]
    fn late_second_signal_restarts_window() {
        let mut state = SignalState::default();
        let first = Instant::now();
        state.classify(first);
        let late = first + FORCE_EXIT_WINDOW + Duration::from_secs(1);
        assert_eq!(state.classify(late), SignalAction::Ignore);
        assert_eq!(
            state.classify(late + Duration::from_millis(500)),
            SignalAction::ForceExit
        );
    }

    #[test]
    fn first_signal_is_forwarded_to_monitor() {
        let (tx, rx) = mpsc::channel();
        let mut state = SignalState::default();
        state.handle(SIGINT, Instant::now(), &LiveWarnings::default(), &tx);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn startup_delay_is_interruptible() {
        let (tx, rx) = mpsc::channel();
        tx.send(()).expect("send");
        assert!(interrupted_during(&rx, Duration::from_secs(30)));

        let (_tx, rx) = mpsc::channel::<()>();
        assert!(!interrupted_during(&rx, Duration::from_millis(10)));
    }
}

//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::collaborators::{Capturer, IdleProbe, Locker, Notifier, WarningHandle};
use crate::error::{Result, TripwireError};
use crate::session::WarningEpisode;

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct FakeWarningHandle {
    terminations: Counter,
    terminated: bool,
}

impl FakeWarningHandle {
    pub fn new() -> (Self, Counter) {
        let terminations = Counter::default();
        (Self::with_counter(terminations.clone()), terminations)
    }

    fn with_counter(terminations: Counter) -> Self {
        Self {
            terminations,
            terminated: false,
        }
    }
}

impl WarningHandle for FakeWarningHandle {
    fn terminate(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.terminations.bump();
        }
    }
}

#[derive(Default)]
struct NotifierState {
    failing: bool,
    ack: Option<SyncSender<()>>,
}

/// Notifier whose episodes are acknowledged by the test through
/// [`NotifierControl`].
pub struct FakeNotifier {
    state: Arc<Mutex<NotifierState>>,
    attempts: Counter,
    starts: Counter,
    terminations: Counter,
}

#[derive(Clone)]
pub struct NotifierControl {
    state: Arc<Mutex<NotifierState>>,
    attempts: Counter,
    starts: Counter,
    terminations: Counter,
}

impl FakeNotifier {
    pub fn new() -> (Self, NotifierControl) {
        let state = Arc::new(Mutex::new(NotifierState::default()));
        let attempts = Counter::default();
        let starts = Counter::default();
        let terminations = Counter::default();
        let control = NotifierControl {
            state: Arc::clone(&state),
            attempts: attempts.clone(),
            starts: starts.clone(),
            terminations: terminations.clone(),
        };
        (
            Self {
                state,
                attempts,
                starts,
                terminations,
            },
            control,
        )
    }
}

impl Notifier for FakeNotifier {
    fn start(&self, started_at: Instant) -> Result<WarningEpisode> {
        self.attempts.bump();
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(TripwireError::WarningLaunchFailed(
                "fake notifier failure".to_string(),
            ));
        }
        self.starts.bump();
        let (tx, rx) = WarningEpisode::ack_channel();
        state.ack = Some(tx);
        Ok(WarningEpisode::new(
            started_at,
            rx,
            Box::new(FakeWarningHandle::with_counter(self.terminations.clone())),
        ))
    }
}

impl NotifierControl {
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Sends the ack for the current episode. Returns false if none is live
    /// or the slot is already full.
    pub fn ack(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .ack
            .as_ref()
            .map(|tx| tx.try_send(()).is_ok())
            .unwrap_or(false)
    }

    /// Drops the live episode's sender, as a killed warning UI would.
    pub fn close_ack(&self) {
        self.state.lock().unwrap().ack = None;
    }

    pub fn ack_after(&self, delay: Duration) -> thread::JoinHandle<bool> {
        let control = self.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            control.ack()
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.count()
    }

    pub fn starts(&self) -> usize {
        self.starts.count()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.count()
    }
}

/// Ordered record of side effects, shared between fakes.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<(&'static str, Instant)>>>);

impl Trace {
    pub fn push(&self, event: &'static str) {
        self.0.lock().unwrap().push((event, Instant::now()));
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().iter().map(|(event, _)| *event).collect()
    }

    pub fn at(&self, event: &'static str) -> Option<Instant> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| *name == event)
            .map(|(_, at)| *at)
    }
}

pub struct FakeLocker {
    pub trace: Trace,
    pub failing: AtomicBool,
    pub calls: Counter,
}

impl FakeLocker {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            failing: AtomicBool::new(false),
            calls: Counter::default(),
        }
    }
}

impl Locker for FakeLocker {
    fn lock(&self) -> Result<()> {
        self.calls.bump();
        self.trace.push("lock");
        if self.failing.load(Ordering::SeqCst) {
            return Err(TripwireError::LockFailed("fake lock failure".to_string()));
        }
        Ok(())
    }
}

pub struct FakeCapturer {
    pub trace: Trace,
    pub delay: Duration,
    pub failing: bool,
    pub captured: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeCapturer {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            delay: Duration::ZERO,
            failing: false,
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Capturer for FakeCapturer {
    fn capture(&self, destination: &Path) -> Result<()> {
        self.trace.push("capture_started");
        thread::sleep(self.delay);
        if self.failing {
            self.trace.push("capture_failed");
            return Err(TripwireError::CaptureFailed("fake camera busy".to_string()));
        }
        self.captured.lock().unwrap().push(destination.to_path_buf());
        self.trace.push("capture_finished");
        Ok(())
    }
}

/// Probe that replays a script; `None` entries are read failures.
pub struct ScriptedProbe {
    samples: Mutex<VecDeque<Option<f64>>>,
}

impl ScriptedProbe {
    pub fn new(samples: &[Option<f64>]) -> Self {
        Self {
            samples: Mutex::new(samples.iter().copied().collect()),
        }
    }
}

impl IdleProbe for ScriptedProbe {
    fn read(&self) -> Result<f64> {
        match self.samples.lock().unwrap().pop_front() {
            Some(Some(sample)) => Ok(sample),
            Some(None) => Err(TripwireError::ProbeFailed("scripted failure".to_string())),
            None => Err(TripwireError::ProbeFailed("script exhausted".to_string())),
        }
    }
}

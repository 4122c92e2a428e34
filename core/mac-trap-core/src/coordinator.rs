//! Detection side effects: photo and lock.
//!
//! Capture is launched on its own thread first, then the lock is issued
//! synchronously, and only then does the coordinator wait (bounded) for the
//! photo. A slow camera can never delay the lock.

use chrono::Local;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::collaborators::{Capturer, Locker};
use crate::error::Result;
use crate::photos::PhotoStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved(PathBuf),
    Failed(String),
    /// The ceiling elapsed first; the capture thread may still finish.
    Pending,
}

#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub lock: std::result::Result<(), String>,
    pub capture: CaptureOutcome,
    pub lock_returned_at: Instant,
    pub capture_wait_started_at: Instant,
}

pub struct DetectionCoordinator {
    locker: Arc<dyn Locker>,
    capturer: Arc<dyn Capturer>,
    photos: PhotoStore,
    capture_ceiling: Duration,
}

impl DetectionCoordinator {
    pub fn new(
        locker: Arc<dyn Locker>,
        capturer: Arc<dyn Capturer>,
        photos: PhotoStore,
        capture_ceiling: Duration,
    ) -> Self {
        Self {
            locker,
            capturer,
            photos,
            capture_ceiling,
        }
    }

    pub fn fire(&self) -> DetectionReport {
        error!("UNAUTHORIZED ACCESS DETECTED - locking");

        let capture_rx = self.spawn_capture();

        info!("Locking immediately");
        let lock = self.locker.lock().map_err(|err| err.to_string());
        let lock_returned_at = Instant::now();
        match &lock {
            Ok(()) => info!("Session locked"),
            Err(err) => error!(error = %err, "Failed to lock session"),
        }

        let capture_wait_started_at = Instant::now();
        let capture = match capture_rx {
            Ok(rx) => match rx.recv_timeout(self.capture_ceiling) {
                Ok(Ok(path)) => {
                    info!(path = %path.display(), "Photo saved");
                    CaptureOutcome::Saved(path)
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "Photo capture failed");
                    CaptureOutcome::Failed(err.to_string())
                }
                Err(RecvTimeoutError::Timeout) => {
                    info!(
                        ceiling_ms = self.capture_ceiling.as_millis() as u64,
                        "Photo still in progress; not waiting further"
                    );
                    CaptureOutcome::Pending
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Photo capture thread ended without a result");
                    CaptureOutcome::Failed("capture thread ended without a result".to_string())
                }
            },
            Err(err) => {
                warn!(error = %err, "Failed to start photo capture");
                CaptureOutcome::Failed(err)
            }
        };

        DetectionReport {
            lock,
            capture,
            lock_returned_at,
            capture_wait_started_at,
        }
    }

    fn spawn_capture(&self) -> std::result::Result<mpsc::Receiver<Result<PathBuf>>, String> {
        let (tx, rx) = mpsc::sync_channel(1);
        let capturer = Arc::clone(&self.capturer);
        let photos = self.photos.clone();

        thread::Builder::new()
            .name("mac-trap-capture".to_string())
            .spawn(move || {
                let result = photos.next_path(&Local::now()).and_then(|path| {
                    info!(path = %path.display(), "Capturing photo");
                    capturer.capture(&path).map(|()| path)
                });
                let _ = tx.send(result);
            })
            .map_err(|err| format!("failed to spawn capture thread: {}", err))?;

        Ok(rx)
    }
}

//! The full-screen warning UI, run as a child process.
//!
//! The UI prints the ack marker on stdout when the hidden button is clicked.
//! A listener thread forwards the first marker line into the episode's
//! single-slot channel and then stops reading.

use mac_trap_core::{Notifier, Result, TripwireError, WarningEpisode, WarningHandle};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Stdio};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::command;

/// Pids of warning processes that are currently on screen.
///
/// Shared with the signal listener so an interrupt can take the UI down
/// even while the monitor thread is blocked in a bounded wait.
#[derive(Debug, Clone, Default)]
pub struct LiveWarnings {
    pids: Arc<Mutex<Vec<u32>>>,
}

impl LiveWarnings {
    fn register(&self, pid: u32) {
        if let Ok(mut pids) = self.pids.lock() {
            pids.push(pid);
        }
    }

    fn release(&self, pid: u32) {
        if let Ok(mut pids) = self.pids.lock() {
            pids.retain(|live| *live != pid);
        }
    }

    pub fn len(&self) -> usize {
        self.pids.lock().map(|pids| pids.len()).unwrap_or(0)
    }

    /// SIGKILLs every live warning. The owning handle still reaps the child.
    pub fn kill_all(&self) -> usize {
        let pids = match self.pids.lock() {
            Ok(pids) => pids.clone(),
            Err(_) => return 0,
        };
        for pid in &pids {
            // SAFETY: kill(2) has no memory-safety preconditions.
            let rc = unsafe { libc::kill(*pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                debug!(pid, "Warning process already gone");
            }
        }
        pids.len()
    }
}

pub struct ProcessNotifier {
    launch: Vec<String>,
    build: Option<Vec<String>>,
    ack_marker: String,
    live: LiveWarnings,
}

impl ProcessNotifier {
    pub fn new(
        launch: Vec<String>,
        build: Option<Vec<String>>,
        ack_marker: impl Into<String>,
        live: LiveWarnings,
    ) -> Self {
        Self {
            launch,
            build,
            ack_marker: ack_marker.into(),
            live,
        }
    }

    fn run_build_step(&self) -> Result<()> {
        let Some(build) = &self.build else {
            return Ok(());
        };
        debug!(command = %command::describe(build), "Building warning UI");
        command::status(build).map_err(|err| {
            TripwireError::WarningLaunchFailed(format!("build step failed: {}", err))
        })
    }
}

impl Notifier for ProcessNotifier {
    fn start(&self, started_at: Instant) -> Result<WarningEpisode> {
        self.run_build_step()?;

        let mut child = command::build(&self.launch)
            .map_err(|err| TripwireError::WarningLaunchFailed(err.to_string()))?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                TripwireError::WarningLaunchFailed(format!(
                    "{}: {}",
                    command::describe(&self.launch),
                    err
                ))
            })?;

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(TripwireError::WarningLaunchFailed(
                "warning stdout was not captured".to_string(),
            ));
        };

        let (ack_tx, ack_rx) = WarningEpisode::ack_channel();
        let marker = self.ack_marker.clone();
        let spawned = thread::Builder::new()
            .name("mac-trap-ack".to_string())
            .spawn(move || {
                listen_for_ack(stdout, &marker, &ack_tx);
            });
        if let Err(err) = spawned {
            reap(&mut child);
            return Err(TripwireError::WarningLaunchFailed(format!(
                "failed to spawn ack listener: {}",
                err
            )));
        }

        let pid = child.id();
        self.live.register(pid);
        info!(pid, "Warning displayed");

        Ok(WarningEpisode::new(
            started_at,
            ack_rx,
            Box::new(WarningProcess {
                child: Some(child),
                live: self.live.clone(),
            }),
        ))
    }
}

/// Forwards the first line containing `marker` as an acknowledgement.
///
/// Returns whether an ack was sent. Ends at EOF, so a UI that exits without
/// acknowledging drops the sender.
pub fn listen_for_ack<R: Read>(reader: R, marker: &str, ack: &SyncSender<()>) -> bool {
    for line in BufReader::new(reader).lines() {
        let Ok(line) = line else {
            break;
        };
        if line.contains(marker) {
            info!("Owner acknowledged the warning");
            // A full slot already means acknowledged.
            let _ = ack.try_send(());
            return true;
        }
    }
    false
}

struct WarningProcess {
    child: Option<Child>,
    live: LiveWarnings,
}

impl WarningHandle for WarningProcess {
    fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            reap(&mut child);
            self.live.release(pid);
            debug!(pid, "Warning dismissed");
        }
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(error = %err, "Warning process already exited");
    }
    if let Err(err) = child.wait() {
        warn!(error = %err, "Failed to reap warning process");
    }
}

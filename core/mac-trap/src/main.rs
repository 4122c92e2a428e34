//! mac-trap: idle-session tripwire for macOS.
//!
//! Watches system idle time. Shortly before the idle threshold a full-screen
//! warning appears; activity after the threshold (or unacknowledged activity
//! during the warning) photographs whoever is at the keyboard and locks the
//! session.

mod adapters;
mod console;
mod logging;
mod shutdown;

use clap::Parser;
use mac_trap_core::{
    load_config, AfterDetection, Capturer, DetectionCoordinator, MacTrapConfig, Monitor,
    PhotoStore, QuietStatus, Result, StatusReporter, Tripwire, TripwireError,
};
use std::env;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use adapters::{CommandCapturer, CommandLocker, IoregIdleProbe, LiveWarnings, ProcessNotifier};
use console::ConsoleStatus;
use shutdown::ShutdownListener;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "mac-trap")]
#[command(about = "Photographs and locks the screen when someone uses your Mac while you're away")]
#[command(version)]
struct Cli {
    /// Idle timeout in seconds before activity counts as an intrusion
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Config file (defaults to ~/.mac-trap/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds to wait before monitoring begins
    #[arg(long, value_name = "SECONDS")]
    startup_delay: Option<f64>,

    /// What to do after a detection: reset, grace or exit
    #[arg(long, value_name = "POLICY")]
    after_detection: Option<AfterDetection>,

    /// Don't draw the in-place status line
    #[arg(long)]
    no_status: bool,
}

fn main() {
    let cli = Cli::parse();
    let _logging_guard = logging::init();

    let config = match resolve_config(&cli, dirs::home_dir().as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let live_warnings = LiveWarnings::default();
    let (signals, shutdown_rx) = match ShutdownListener::install(live_warnings.clone()) {
        Ok(installed) => installed,
        Err(err) => {
            error!(error = %err, "Failed to register signal handlers");
            std::process::exit(1);
        }
    };

    info!(
        threshold_secs = config.detection.idle_threshold_secs,
        startup_delay_secs = config.startup.delay_secs,
        "mac-trap starting"
    );
    if shutdown::interrupted_during(&shutdown_rx, config.startup.delay()) {
        info!("Stopped before monitoring began");
        signals.close();
        return;
    }

    let mut monitor = build_monitor(&config, live_warnings, cli.no_status);
    let exit = monitor.run(&shutdown_rx);
    info!(reason = ?exit, detections = monitor.detections(), "mac-trap stopped");

    drop(monitor);
    signals.close();
}

/// Loads the config file and applies CLI overrides on top.
///
/// An explicit `--config` must exist; the default location may be absent.
fn resolve_config(cli: &Cli, home: Option<&Path>) -> Result<MacTrapConfig> {
    let mut config = match (&cli.config, home) {
        (Some(path), _) if !path.exists() => {
            return Err(TripwireError::Io {
                context: format!("Config file {} not found", path.display()),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        (Some(path), _) => load_config(path)?,
        (None, Some(home)) => load_config(&default_config_path(home))?,
        (None, None) => MacTrapConfig::default(),
    };

    if let Some(timeout) = cli.timeout {
        config.detection.idle_threshold_secs = timeout;
    }
    if let Some(delay) = cli.startup_delay {
        config.startup.delay_secs = delay;
    }
    if let Some(policy) = cli.after_detection {
        config.detection.after_detection = policy;
    }

    config.validate()?;
    Ok(config)
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".mac-trap").join(CONFIG_FILE_NAME)
}

fn build_monitor(config: &MacTrapConfig, live_warnings: LiveWarnings, no_status: bool) -> Monitor {
    let capturer = CommandCapturer::new(config.commands.capture.clone());
    if !capturer.is_available() {
        warn!(
            program = capturer.program(),
            "Camera disabled (install: brew install imagesnap)"
        );
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let photos = PhotoStore::new(
        config.storage.resolve_photos_dir(&cwd),
        config.storage.photo_prefix.clone(),
    );
    info!(dir = %photos.dir().display(), "Photos will be saved here");

    let coordinator = DetectionCoordinator::new(
        Arc::new(CommandLocker::new(config.commands.lock.clone())),
        Arc::new(capturer),
        photos,
        config.detection.capture_ceiling(),
    );
    let notifier = ProcessNotifier::new(
        config.commands.warning.clone(),
        config.commands.warning_build.clone(),
        config.commands.ack_marker.clone(),
        live_warnings,
    );
    let reporter: Box<dyn StatusReporter> = if no_status || !io::stdout().is_terminal() {
        Box::new(QuietStatus)
    } else {
        Box::new(ConsoleStatus::default())
    };

    Monitor::new(
        Box::new(IoregIdleProbe::new(config.commands.idle_probe.clone())),
        Tripwire::new(config.detection.clone(), Box::new(notifier)),
        coordinator,
        reporter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mac-trap").chain(args.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = resolve_config(&parse(&[]), Some(temp_dir.path())).expect("config");
        assert_eq!(config.detection.idle_threshold_secs, 60.0);
        assert_eq!(config.startup.delay_secs, 5.0);
        assert_eq!(config.detection.after_detection, AfterDetection::Reset);
    }

    #[test]
    fn cli_overrides_config_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = default_config_path(temp_dir.path());
        fs_err::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs_err::write(
            &path,
            "[detection]\nidle_threshold_secs = 120.0\nafter_detection = \"grace\"\n",
        )
        .expect("write config");

        let from_file = resolve_config(&parse(&[]), Some(temp_dir.path())).expect("config");
        assert_eq!(from_file.detection.idle_threshold_secs, 120.0);
        assert_eq!(from_file.detection.after_detection, AfterDetection::Grace);

        let overridden = resolve_config(
            &parse(&["--timeout", "30", "--after-detection", "exit", "--startup-delay", "0"]),
            Some(temp_dir.path()),
        )
        .expect("config");
        assert_eq!(overridden.detection.idle_threshold_secs, 30.0);
        assert_eq!(overridden.detection.after_detection, AfterDetection::Exit);
        assert_eq!(overridden.startup.delay_secs, 0.0);
    }

    #[test]
    fn non_positive_timeout_is_rejected() {
        let err = resolve_config(&parse(&["--timeout", "0"]), None).expect_err("invalid");
        assert!(matches!(err, TripwireError::ConfigInvalid { .. }));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let missing = temp_dir.path().join("nope.toml");
        let cli = parse(&["--config", missing.to_str().expect("utf8 path")]);
        assert!(resolve_config(&cli, None).is_err());
    }

    #[test]
    fn unknown_policy_is_rejected_by_cli() {
        let args = ["mac-trap", "--after-detection", "panic"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}

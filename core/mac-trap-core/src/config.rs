//! Runtime configuration for the tripwire.
//!
//! Loaded from an optional TOML file; every section and field falls back to a
//! default so a missing file (or an empty one) yields a working setup. The CLI
//! overrides individual fields after loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TripwireError};

pub const DEFAULT_IDLE_THRESHOLD_SECS: f64 = 60.0;
pub const DEFAULT_PHOTOS_DIR_NAME: &str = "mac-trap-photos";

/// What the session does once a detection has locked the screen.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AfterDetection {
    /// Forget all history and wait for a first sample again.
    Reset,
    /// Suppress re-arming for `grace_period_secs`.
    Grace,
    /// Stop monitoring and exit the process.
    Exit,
}

impl Default for AfterDetection {
    fn default() -> Self {
        Self::Reset
    }
}

impl AfterDetection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AfterDetection::Reset => "reset",
            AfterDetection::Grace => "grace",
            AfterDetection::Exit => "exit",
        }
    }
}

impl FromStr for AfterDetection {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "reset" => Ok(AfterDetection::Reset),
            "grace" => Ok(AfterDetection::Grace),
            "exit" => Ok(AfterDetection::Exit),
            other => Err(format!("expected reset, grace or exit, got {:?}", other)),
        }
    }
}

/// Whether activity during a grace period ends it early.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraceCancel {
    /// Any drop in idle time returns to monitoring.
    OnActivity,
    /// Grace always runs its full duration.
    Never,
}

impl Default for GraceCancel {
    fn default() -> Self {
        Self::OnActivity
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DetectionConfig {
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: f64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Seconds before the threshold at which the warning UI is raised.
    #[serde(default = "default_warning_lead_secs")]
    pub warning_lead_secs: f64,
    /// Idle drops at or below this size are treated as sampling jitter.
    #[serde(default = "default_activity_noise_floor_secs")]
    pub activity_noise_floor_secs: f64,
    #[serde(default = "default_ack_wait_ms")]
    pub ack_wait_ms: u64,
    #[serde(default = "default_capture_ceiling_ms")]
    pub capture_ceiling_ms: u64,
    #[serde(default)]
    pub after_detection: AfterDetection,
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
    #[serde(default)]
    pub grace_cancel: GraceCancel,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: default_idle_threshold_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            warning_lead_secs: default_warning_lead_secs(),
            activity_noise_floor_secs: default_activity_noise_floor_secs(),
            ack_wait_ms: default_ack_wait_ms(),
            capture_ceiling_ms: default_capture_ceiling_ms(),
            after_detection: AfterDetection::default(),
            grace_period_secs: default_grace_period_secs(),
            grace_cancel: GraceCancel::default(),
        }
    }
}

impl DetectionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn ack_wait(&self) -> Duration {
        Duration::from_millis(self.ack_wait_ms)
    }

    pub fn capture_ceiling(&self) -> Duration {
        Duration::from_millis(self.capture_ceiling_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.idle_threshold_secs.is_finite() && self.idle_threshold_secs > 0.0) {
            return Err(invalid(
                "idle_threshold_secs",
                format!("must be a positive number, got {}", self.idle_threshold_secs),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be greater than zero"));
        }
        if !(self.warning_lead_secs.is_finite() && self.warning_lead_secs >= 0.0) {
            return Err(invalid(
                "warning_lead_secs",
                format!("must not be negative, got {}", self.warning_lead_secs),
            ));
        }
        if !(self.activity_noise_floor_secs.is_finite() && self.activity_noise_floor_secs >= 0.0)
        {
            return Err(invalid(
                "activity_noise_floor_secs",
                format!(
                    "must not be negative, got {}",
                    self.activity_noise_floor_secs
                ),
            ));
        }
        if self.after_detection == AfterDetection::Grace && self.grace_period_secs == 0 {
            return Err(invalid(
                "grace_period_secs",
                "must be greater than zero when after_detection = \"grace\"",
            ));
        }
        Ok(())
    }
}

/// Argument vectors for the external commands the binary shells out to.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CommandsConfig {
    #[serde(default = "default_idle_probe_command")]
    pub idle_probe: Vec<String>,
    #[serde(default = "default_lock_command")]
    pub lock: Vec<String>,
    /// The photo path is appended as the final argument.
    #[serde(default = "default_capture_command")]
    pub capture: Vec<String>,
    #[serde(default = "default_warning_command")]
    pub warning: Vec<String>,
    /// Run before every warning launch when set (e.g. compiling the UI).
    #[serde(default)]
    pub warning_build: Option<Vec<String>>,
    #[serde(default = "default_ack_marker")]
    pub ack_marker: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            idle_probe: default_idle_probe_command(),
            lock: default_lock_command(),
            capture: default_capture_command(),
            warning: default_warning_command(),
            warning_build: None,
            ack_marker: default_ack_marker(),
        }
    }
}

impl CommandsConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, argv) in [
            ("commands.idle_probe", &self.idle_probe),
            ("commands.lock", &self.lock),
            ("commands.capture", &self.capture),
            ("commands.warning", &self.warning),
        ] {
            if argv.first().map(|program| program.trim().is_empty()).unwrap_or(true) {
                return Err(invalid(field, "needs at least a program name"));
            }
        }
        if self.ack_marker.trim().is_empty() {
            return Err(invalid("commands.ack_marker", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    /// Defaults to `<cwd>/mac-trap-photos`.
    #[serde(default)]
    pub photos_dir: Option<PathBuf>,
    #[serde(default = "default_photo_prefix")]
    pub photo_prefix: String,
}

impl StorageConfig {
    pub fn resolve_photos_dir(&self, cwd: &Path) -> PathBuf {
        match &self.photos_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.join(DEFAULT_PHOTOS_DIR_NAME),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StartupConfig {
    #[serde(default = "default_startup_delay_secs")]
    pub delay_secs: f64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_startup_delay_secs(),
        }
    }
}

impl StartupConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct MacTrapConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

impl MacTrapConfig {
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        self.commands.validate()?;
        if !self.startup.delay_secs.is_finite() {
            return Err(invalid("startup.delay_secs", "must be a finite number"));
        }
        Ok(())
    }
}

/// Loads the config at `path`, returning defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<MacTrapConfig> {
    if !path.exists() {
        return Ok(MacTrapConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|err| TripwireError::Io {
        context: format!("Failed to read config {}", path.display()),
        source: err,
    })?;
    toml::from_str::<MacTrapConfig>(&content).map_err(|err| TripwireError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn invalid(field: &'static str, reason: impl Into<String>) -> TripwireError {
    TripwireError::ConfigInvalid {
        field,
        reason: reason.into(),
    }
}

fn default_idle_threshold_secs() -> f64 {
    DEFAULT_IDLE_THRESHOLD_SECS
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_warning_lead_secs() -> f64 {
    5.0
}

fn default_activity_noise_floor_secs() -> f64 {
    1.0
}

fn default_ack_wait_ms() -> u64 {
    1500
}

fn default_capture_ceiling_ms() -> u64 {
    3000
}

fn default_grace_period_secs() -> u64 {
    300
}

fn default_idle_probe_command() -> Vec<String> {
    vec!["ioreg".into(), "-c".into(), "IOHIDSystem".into()]
}

fn default_lock_command() -> Vec<String> {
    vec![
        "osascript".into(),
        "-e".into(),
        r#"tell application "System Events" to keystroke "q" using {control down, command down}"#
            .into(),
    ]
}

fn default_capture_command() -> Vec<String> {
    vec!["imagesnap".into()]
}

fn default_warning_command() -> Vec<String> {
    vec!["./mac-trap-warning".into()]
}

fn default_ack_marker() -> String {
    "SAFE".to_string()
}

fn default_photo_prefix() -> String {
    "mac-trap".to_string()
}

fn default_startup_delay_secs() -> f64 {
    5.0
}

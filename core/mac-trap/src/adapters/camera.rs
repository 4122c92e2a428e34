use mac_trap_core::{Capturer, Result, TripwireError};
use std::path::Path;

use super::command;

/// Takes a photo by running the capture command with the destination path
/// appended (`imagesnap <path>` by default, no warm-up).
#[derive(Debug, Clone)]
pub struct CommandCapturer {
    argv: Vec<String>,
}

impl CommandCapturer {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

impl Capturer for CommandCapturer {
    fn capture(&self, destination: &Path) -> Result<()> {
        let mut argv = self.argv.clone();
        argv.push(destination.to_string_lossy().to_string());
        command::status(&argv).map_err(|err| TripwireError::CaptureFailed(err.to_string()))
    }

    fn is_available(&self) -> bool {
        command::is_on_path(self.program())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn capture_passes_destination_as_last_argument() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let destination = temp_dir.path().join("mac-trap_2026-01-01_00-00-00.jpg");
        let capturer = CommandCapturer::new(vec![
            "sh".into(),
            "-c".into(),
            "printf jpeg > \"$0\"".into(),
        ]);

        capturer.capture(&destination).expect("capture");
        assert_eq!(std::fs::read(&destination).expect("photo"), b"jpeg");
    }

    #[test]
    fn missing_tool_is_unavailable_and_fails() {
        let capturer = CommandCapturer::new(vec!["definitely-not-imagesnap".into()]);
        assert!(!capturer.is_available());
        assert!(matches!(
            capturer.capture(Path::new("/tmp/x.jpg")),
            Err(TripwireError::CaptureFailed(_))
        ));
    }
}

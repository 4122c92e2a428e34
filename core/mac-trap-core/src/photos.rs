//! Evidence file naming.

use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};

use crate::error::{Result, TripwireError};

/// Hands out timestamped photo paths inside a dedicated directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoStore {
    dir: PathBuf,
    prefix: String,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<prefix>_<YYYY-MM-DD_HH-MM-SS>.jpg`
    pub fn file_name<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!("{}_{}.jpg", self.prefix, at.format("%Y-%m-%d_%H-%M-%S"))
    }

    /// Returns the path for a photo taken at `at`, creating the directory on
    /// demand.
    pub fn next_path<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<PathBuf>
    where
        Tz::Offset: std::fmt::Display,
    {
        fs_err::create_dir_all(&self.dir).map_err(|err| TripwireError::Io {
            context: format!("Failed to create photos directory {}", self.dir.display()),
            source: err,
        })?;
        Ok(self.dir.join(self.file_name(at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn file_name_uses_prefix_and_second_resolution_timestamp() {
        let store = PhotoStore::new("/tmp/photos", "mac-trap");
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 3).unwrap();
        assert_eq!(store.file_name(&at), "mac-trap_2026-03-09_07-05-03.jpg");
    }

    #[test]
    fn next_path_creates_missing_directory() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let dir = temp_dir.path().join("nested").join("mac-trap-photos");
        let store = PhotoStore::new(&dir, "mac-trap");
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 23, 59, 59).unwrap();

        let path = store.next_path(&at).expect("photo path");
        assert!(dir.is_dir());
        assert_eq!(path, dir.join("mac-trap_2026-10-18_23-59-59.jpg"));
    }

    #[test]
    fn next_path_fails_when_directory_cannot_be_created() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let blocker = temp_dir.path().join("occupied");
        std::fs::write(&blocker, b"not a directory").expect("write blocker");
        let store = PhotoStore::new(blocker.join("photos"), "mac-trap");

        let err = store.next_path(&Utc::now()).expect_err("should fail");
        assert!(matches!(err, TripwireError::Io { .. }));
    }
}

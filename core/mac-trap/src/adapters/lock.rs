use mac_trap_core::{Locker, Result, TripwireError};

use super::command;

/// Locks the session by running a command (ctrl+cmd+q through System Events
/// by default).
#[derive(Debug, Clone)]
pub struct CommandLocker {
    argv: Vec<String>,
}

impl CommandLocker {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Locker for CommandLocker {
    fn lock(&self) -> Result<()> {
        command::status(&self.argv).map_err(|err| TripwireError::LockFailed(err.to_string()))
    }
}

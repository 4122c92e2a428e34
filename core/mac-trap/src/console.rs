use mac_trap_core::{PhaseKind, StatusReporter, StatusSnapshot};
use std::io::{self, Write};

use crate::logging::CLEAR_LINE;

/// Redraws a single status line in place on the terminal.
#[derive(Debug, Default)]
pub struct ConsoleStatus {
    drawn: bool,
}

fn icon(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Warning => "⚠️ ",
        PhaseKind::Grace => "⏳",
        PhaseKind::Uninitialized => "💤",
        PhaseKind::Monitoring => "🔍",
    }
}

impl StatusReporter for ConsoleStatus {
    fn render(&mut self, snapshot: &StatusSnapshot) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "{}{} {}", CLEAR_LINE, icon(snapshot.phase), snapshot.headline());
        let _ = out.flush();
        self.drawn = true;
    }

    fn finish(&mut self) {
        if self.drawn {
            let _ = writeln!(io::stdout());
            self.drawn = false;
        }
    }
}

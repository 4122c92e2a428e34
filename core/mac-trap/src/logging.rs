//! Console plus daily-rolling file logging.
//!
//! Console lines share the terminal with the in-place status line, so each
//! log event first clears the current line when stdout is a terminal.

use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "MAC_TRAP_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "mac-trap.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const CLEAR_LINE: &str = "\r\x1b[K";

/// Installs the global subscriber. Keep the guard alive for the life of the
/// process so buffered file output is flushed on exit.
pub fn init() -> Option<WorkerGuard> {
    let console = fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_writer(StatusAwareStdout {
            clear_line: io::stdout().is_terminal(),
        });

    let file_dir = log_dir().filter(|dir| fs_err::create_dir_all(dir).is_ok());
    let (file, guard) = match file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter())
        .with(console)
        .with(file)
        .init();
    guard
}

fn filter() -> EnvFilter {
    if debug_forced(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_forced(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".mac-trap").join("logs"))
}

struct StatusAwareStdout {
    clear_line: bool,
}

impl<'a> MakeWriter<'a> for StatusAwareStdout {
    type Writer = StatusAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        StatusAwareWriter {
            pending_clear: self.clear_line,
        }
    }
}

/// One writer per event; the clear sequence precedes the event's first byte.
struct StatusAwareWriter {
    pending_clear: bool,
}

impl Write for StatusAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = io::stdout().lock();
        if self.pending_clear {
            out.write_all(CLEAR_LINE.as_bytes())?;
            self.pending_clear = false;
        }
        out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

use mac_trap_core::{Result, TripwireError};
use std::env;
use std::path::Path;
use std::process::{Command, Output};

pub fn describe(argv: &[String]) -> String {
    argv.join(" ")
}

pub fn build(argv: &[String]) -> Result<Command> {
    let (program, args) = argv.split_first().ok_or_else(|| TripwireError::CommandFailed {
        command: String::new(),
        details: "empty command".to_string(),
    })?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

/// Runs `argv` to completion and returns its stdout.
pub fn output(argv: &[String]) -> Result<String> {
    let output = build(argv)?.output().map_err(|err| TripwireError::CommandFailed {
        command: describe(argv),
        details: err.to_string(),
    })?;
    check_status(argv, &output)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Runs `argv` to completion, discarding its output.
pub fn status(argv: &[String]) -> Result<()> {
    let output = build(argv)?.output().map_err(|err| TripwireError::CommandFailed {
        command: describe(argv),
        details: err.to_string(),
    })?;
    check_status(argv, &output)
}

fn check_status(argv: &[String], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    Err(TripwireError::CommandFailed {
        command: describe(argv),
        details: if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            format!("exited with {}: {}", output.status, stderr)
        },
    })
}

/// Whether `program` resolves to a file, either directly or through `PATH`.
pub fn is_on_path(program: &str) -> bool {
    if program.contains('/') {
        return Path::new(program).is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

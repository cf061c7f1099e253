use std::process::{Command, Output, Stdio};

use crate::error::EmulationError;

/// Executes the privileged `ip`/`tc` invocations the emulator issues.
///
/// The emulator never spawns processes directly; everything goes through a
/// runner so that command plans can be recorded and inspected without root.
pub trait CommandRunner {
    /// Runs to completion, capturing stdout and stderr.
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output>;

    /// Starts a command without waiting for it or holding its output pipes.
    fn spawn_detached(&self, program: &str, args: &[&str]) -> std::io::Result<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output> {
        (**self).run(program, args)
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> std::io::Result<()> {
        (**self).spawn_detached(program, args)
    }
}

/// Runs every command through `sudo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SudoRunner;

impl CommandRunner for SudoRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output> {
        Command::new("sudo").arg(program).args(args).output()
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> std::io::Result<()> {
        let mut child = Command::new("sudo")
            .arg(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        // Reap in the background so finished jobs do not linger as zombies.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Runs a command and turns a non-zero exit status into an error.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Result<Output, EmulationError> {
    let command = render(program, args);
    tracing::debug!(%command, "exec");
    let output = runner
        .run(program, args)
        .map_err(|source| EmulationError::Spawn {
            command: command.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(EmulationError::CommandFailed {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Runs a command whose failure is tolerated (cleanup of leftovers).
pub fn run_best_effort<R: CommandRunner + ?Sized>(runner: &R, program: &str, args: &[&str]) {
    if let Err(e) = run_checked(runner, program, args) {
        tracing::debug!(error = %e, "ignored");
    }
}

pub(crate) fn render(program: &str, args: &[&str]) -> String {
    let mut out = program.to_string();
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

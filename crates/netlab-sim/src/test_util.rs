use std::cell::RefCell;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Output};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::runner::{render, CommandRunner};

static PREFIX_SEQ: AtomicU32 = AtomicU32::new(0);

/// Whether this host can build a real emulated network: `ip` and `tc` must
/// be installed and runnable through `sudo` without a password prompt.
pub fn can_emulate() -> bool {
    ["ip netns list", "tc qdisc show"].iter().all(|cmd| {
        Command::new("sudo")
            .arg("-n")
            .args(cmd.split(' '))
            .output()
            .is_ok_and(|o| o.status.success())
    })
}

/// A namespace prefix no other test in this run (or a concurrent run) uses,
/// e.g. `t417-3-`.
pub fn unique_ns_prefix() -> String {
    let seq = PREFIX_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("t{}-{}-", std::process::id() % 1000, seq)
}

/// A [`CommandRunner`] that records every command instead of executing it.
///
/// Commands whose rendered text contains the configured pattern fail with
/// exit status 1 and `simulated failure` on stderr.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    log: RefCell<Vec<String>>,
    fail_on: Option<String>,
    stdout: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    /// Every successful command prints `stdout`. Detached commands are
    /// logged with a leading `& `.
    pub fn with_stdout(stdout: &str) -> Self {
        Self {
            stdout: Some(stdout.to_string()),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.log.borrow().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output> {
        let command = render(program, args);
        let fail = self
            .fail_on
            .as_deref()
            .is_some_and(|pattern| command.contains(pattern));
        self.log.borrow_mut().push(command);

        if fail {
            return Ok(Output {
                // Wait status with exit code 1.
                status: ExitStatus::from_raw(1 << 8),
                stdout: Vec::new(),
                stderr: b"simulated failure".to_vec(),
            });
        }
        Ok(Output {
            status: ExitStatus::from_raw(0),
            stdout: self.stdout.clone().unwrap_or_default().into_bytes(),
            stderr: Vec::new(),
        })
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> std::io::Result<()> {
        let command = format!("& {}", render(program, args));
        let fail = self
            .fail_on
            .as_deref()
            .is_some_and(|pattern| command.contains(pattern));
        self.log.borrow_mut().push(command);
        if fail {
            return Err(std::io::Error::other("simulated failure"));
        }
        Ok(())
    }
}

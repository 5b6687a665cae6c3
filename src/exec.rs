//! Bounded subprocess execution for runtime queries.
//!
//! Docker queries (`ps`, `info`, ...) must not hang the CLI when the daemon
//! is wedged, so captured invocations get a wait-timeout and are killed on
//! expiry. Interactive/streaming docker calls (compose up, logs -f) bypass
//! this and inherit stdio directly.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use wait_timeout::ChildExt;

#[derive(Debug)]
pub struct CapturedOutput {
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command with stdout/stderr captured, killing it if it exceeds
/// `timeout`. A zero timeout waits indefinitely.
pub fn run_captured(cmd: &mut Command, timeout: Duration) -> Result<CapturedOutput> {
    let program = format!("{:?}", cmd.get_program());
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    let status = if timeout.is_zero() {
        child
            .wait()
            .with_context(|| format!("failed to wait for {program}"))?
    } else {
        match child
            .wait_timeout(timeout)
            .with_context(|| format!("failed to wait for {program}"))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow!("{program} timed out after {timeout:?}"));
            }
        }
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }

    Ok(CapturedOutput {
        status_ok: status.success(),
        stdout,
        stderr,
    })
}

/// Run a command with inherited stdio (streaming output straight to the
/// user's terminal) and report whether it exited successfully.
pub fn run_streaming(cmd: &mut Command) -> Result<bool> {
    let program = format!("{:?}", cmd.get_program());
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    Ok(status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_quick_command() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let out = run_captured(&mut cmd, Duration::from_secs(5)).unwrap();
        assert!(out.status_ok);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn kills_command_exceeding_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run_captured(&mut cmd, Duration::from_millis(50)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn nonzero_exit_is_not_an_error() {
        let mut cmd = Command::new("false");
        let out = run_captured(&mut cmd, Duration::from_secs(5)).unwrap();
        assert!(!out.status_ok);
    }
}

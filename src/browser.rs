//! Best-effort browser launching after a successful start.

use std::process::Command;

use anyhow::{Context, Result};

/// Open a URL with the platform opener. Failure is reported to the caller,
/// who downgrades it to a warning; an instance without a browser tab is
/// still a started instance.
pub fn open_url(url: &str) -> Result<()> {
    let mut cmd = opener_command(url);
    let status = cmd.status().context("failed to run browser opener")?;
    if status.success() {
        Ok(())
    } else {
        anyhow::bail!("browser opener exited with {status}")
    }
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/c", "start", "", url]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

/// Whether opening a browser makes sense at all (headless sessions on Linux
/// have no display to hand the URL to).
pub fn can_open_browser() -> bool {
    if cfg!(target_os = "linux") {
        std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
    } else {
        true
    }
}

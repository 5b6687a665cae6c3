//! Free-port discovery by linear probing.
//!
//! A port counts as available only when a local TCP listener bind succeeds
//! *and* the container runtime reports no published mapping on it. Both
//! checks are best-effort: between the probe and the eventual compose launch
//! another process may still grab the port. That window is accepted; closing
//! it would require coordinating with docker's own port publishing.

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::runtime::ContainerRuntime;

/// Pause after releasing a successful probe bind so the kernel settles the
/// socket before compose tries to take it.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Probe `start, start+1, ..` for at most `max_attempts` candidates and
/// return the first port that is locally bindable, not published by the
/// runtime, and not in `reserved` (ports already claimed by the current
/// allocation but not yet bound by anything).
pub fn find_available_port(
    start: u16,
    max_attempts: u16,
    reserved: &[u16],
    runtime: &dyn ContainerRuntime,
) -> Result<u16> {
    let published = runtime.published_ports();
    for offset in 0..max_attempts {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        if published.contains(&port) || reserved.contains(&port) {
            continue;
        }
        if bindable(port) {
            thread::sleep(SETTLE_DELAY);
            return Ok(port);
        }
    }
    Err(Error::PortScanExhausted {
        start,
        attempts: max_attempts,
    })
}

fn bindable(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

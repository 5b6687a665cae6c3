//! Error taxonomy for the instance registry and lifecycle coordinator.
//!
//! Input errors (bad or ambiguous targets) and environment errors (docker
//! unreachable, port scan exhausted) abort the operation without mutating
//! state. Stale-record reconciliation and corrupt state files are *not*
//! errors: the former is silently self-healed, the latter is skipped with a
//! warning during listing.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Docker binary missing or daemon not responding. Fatal for `start`.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// No instance matched the stop/logs target in any resolution tier.
    #[error("no instance found for '{0}'")]
    TargetNotFound(String),

    /// Substring resolution matched more than one instance; never guess.
    #[error("multiple instances match '{target}': {}", .candidates.join(", "))]
    AmbiguousTarget {
        target: String,
        candidates: Vec<String>,
    },

    /// Linear port probe ran out of candidates.
    #[error("no available port found in range {start}-{}", .start.saturating_add(.attempts.saturating_sub(1)))]
    PortScanExhausted { start: u16, attempts: u16 },

    /// Compose launch failed; no record was written.
    #[error("failed to launch container {name}: {source}")]
    Launch {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Container never reported running within the start deadline.
    #[error("timeout waiting for container {name} to report running (waited {waited_secs}s)")]
    StartTimeout { name: String, waited_secs: u64 },

    /// Both compose down and the stop+remove fallback failed; the record is
    /// kept so a later retry can find the instance again.
    #[error("failed to tear down container {name}: {source}")]
    Teardown {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Other collaborator failure, wrapped with the operation and the
    /// container it targeted.
    #[error("{op} failed for container {name}: {source}")]
    Runtime {
        op: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid project path {}: {source}", .path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Record file exists but does not parse; callers treat this as
    /// absent-with-warning.
    #[error("malformed instance record {}: {source}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map an error to a process exit code: 127 when docker itself is missing
/// (command-not-found convention), 1 for everything else.
pub fn exit_code_for_error(e: &Error) -> u8 {
    match e {
        Error::RuntimeUnavailable(_) => 127,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_target_lists_candidates() {
        let e = Error::AmbiguousTarget {
            target: "api".to_string(),
            candidates: vec!["denv-aaaa1111".to_string(), "denv-bbbb2222".to_string()],
        };
        let msg = e.to_string();
        assert!(msg.contains("denv-aaaa1111"));
        assert!(msg.contains("denv-bbbb2222"));
    }

    #[test]
    fn port_scan_range_in_message() {
        let e = Error::PortScanExhausted {
            start: 8080,
            attempts: 100,
        };
        assert_eq!(e.to_string(), "no available port found in range 8080-8179");
    }

    #[test]
    fn port_scan_range_saturates_near_port_max() {
        // The probe itself stops at 65535; the message must not wrap past it.
        let e = Error::PortScanExhausted {
            start: 65500,
            attempts: 100,
        };
        assert_eq!(e.to_string(), "no available port found in range 65500-65535");
    }

    #[test]
    fn runtime_unavailable_maps_to_127() {
        let e = Error::RuntimeUnavailable("docker not found in PATH".into());
        assert_eq!(exit_code_for_error(&e), 127);
        let e2 = Error::TargetNotFound("x".into());
        assert_eq!(exit_code_for_error(&e2), 1);
    }
}

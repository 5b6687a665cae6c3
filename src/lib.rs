//! denv: local control-plane for per-project containerized dev environments.
//!
//! Given a project directory, denv derives a stable 8-hex identity from the
//! canonical path, allocates non-conflicting host ports, launches (or
//! reattaches to) a Docker Compose instance named after the identity, and
//! keeps a file-per-identity registry that is reconciled against the docker
//! runtime -- the runtime is always the ground truth for "is it running",
//! the registry only caches what we last knew.

pub mod browser;
pub mod cli;
pub mod color;
pub mod config;
pub mod doctor;
pub mod errors;
pub mod exec;
pub mod identity;
pub mod lifecycle;
pub mod port;
pub mod runtime;
pub mod store;

pub use color::{
    color_enabled_stderr, log_error_stderr, log_info_stderr,
    log_success_stderr, log_warn_stderr, paint, set_color_mode, ColorMode,
};
pub use config::Settings;
pub use errors::{exit_code_for_error, Error, Result};
pub use identity::{canonical_project_path, derive_identity};
pub use lifecycle::{
    Coordinator, InstanceListing, StartOptions, StartOutcome, StopAllSummary,
};
pub use port::find_available_port;
pub use runtime::{ContainerRuntime, DockerCli, LaunchEnv};
pub use store::{format_uptime, InstanceRecord, RecordStore};

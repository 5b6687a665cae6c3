//! Lifecycle coordination: start / stop / stop-all / list.
//!
//! Declared state lives in the record store, actual state in the container
//! runtime; every operation reads both and reconciles in the runtime's
//! favor. A record whose container the runtime no longer reports is stale
//! and gets deleted as a side effect, never surfaced as an error.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use chrono::Utc;

use crate::color::{color_enabled_stderr, log_info_stderr, log_warn_stderr};
use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::identity::{canonical_project_path, derive_identity};
use crate::port::find_available_port;
use crate::runtime::{ContainerRuntime, LaunchEnv};
use crate::store::{InstanceRecord, RecordStore};

/// Port overrides from the CLI; `None` means allocate from the configured
/// default scan start.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    pub web_port: Option<u16>,
    pub dev_port: Option<u16>,
}

#[derive(Debug)]
pub enum StartOutcome {
    /// Fresh launch, record written.
    Started(InstanceRecord),
    /// Idempotent re-entry: the instance was already live, nothing was
    /// allocated or launched.
    AlreadyRunning(InstanceRecord),
}

impl StartOutcome {
    pub fn record(&self) -> &InstanceRecord {
        match self {
            StartOutcome::Started(r) | StartOutcome::AlreadyRunning(r) => r,
        }
    }
}

/// Aggregate result of `stop_all`; successes stay committed even when some
/// instances fail to tear down.
#[derive(Debug, Default)]
pub struct StopAllSummary {
    pub stopped: Vec<InstanceRecord>,
    pub failed: Vec<(InstanceRecord, Error)>,
    /// Stale records deleted without touching the runtime.
    pub pruned: usize,
}

impl StopAllSummary {
    pub fn succeeded(&self) -> usize {
        self.stopped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Records partitioned by runtime ground truth.
#[derive(Debug, Default)]
pub struct InstanceListing {
    pub running: Vec<InstanceRecord>,
    pub stopped: Vec<InstanceRecord>,
}

pub struct Coordinator<'a> {
    settings: &'a Settings,
    store: &'a RecordStore,
    runtime: &'a dyn ContainerRuntime,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        settings: &'a Settings,
        store: &'a RecordStore,
        runtime: &'a dyn ContainerRuntime,
    ) -> Self {
        Coordinator {
            settings,
            store,
            runtime,
        }
    }

    /// Launch (or reattach to) the instance for a project directory.
    ///
    /// At most one live instance per identity: when the stored record's
    /// container is runtime-confirmed running, the existing record is
    /// returned unchanged and no ports are allocated.
    pub fn start(&self, path: &Path, opts: StartOptions) -> Result<StartOutcome> {
        let project_path = canonical_project_path(path)?;
        let identity = derive_identity(&project_path);

        if let Some(record) = self.load_tolerant(&identity) {
            if self.runtime.is_running(&record.container_name) {
                return Ok(StartOutcome::AlreadyRunning(record));
            }
        }

        // The runtime is required from here on; fail fast if it is gone.
        self.runtime
            .ensure_available()
            .map_err(|e| Error::RuntimeUnavailable(e.to_string()))?;

        let use_err = color_enabled_stderr();
        let web_port = match opts.web_port {
            Some(p) => p,
            None => find_available_port(
                self.settings.web_port_default,
                self.settings.port_scan_attempts,
                &[],
                self.runtime,
            )?,
        };
        // Not bound yet, so the dev scan must be told to skip it; otherwise
        // overlapping default ranges could hand out the same port twice.
        let dev_port = match opts.dev_port {
            Some(p) => p,
            None => find_available_port(
                self.settings.dev_port_default,
                self.settings.port_scan_attempts,
                &[web_port],
                self.runtime,
            )?,
        };

        let container_name = self.settings.container_name_for(&identity);
        let image_ref = self.settings.full_image_ref();

        // Best effort: a failed pull falls back to whatever image is local.
        if let Err(e) = self.runtime.pull_image(&image_ref) {
            log_warn_stderr(use_err, &format!("could not pull {image_ref}: {e}"));
        }

        let env = LaunchEnv {
            workspace_dir: project_path.clone(),
            container_name: container_name.clone(),
            web_port,
            dev_port,
            image_ref,
            auth_dir: self.settings.auth_dir.clone(),
        };
        log_info_stderr(use_err, &format!("starting container {container_name}..."));
        self.runtime.compose_up(&env).map_err(|source| Error::Launch {
            name: container_name.clone(),
            source,
        })?;

        self.wait_until_running(&container_name)?;

        let record = InstanceRecord {
            project_path,
            container_name,
            web_port,
            dev_port,
            started_at: Utc::now(),
            identity,
        };
        self.store.save(&record)?;
        Ok(StartOutcome::Started(record))
    }

    /// Bounded fixed-backoff poll until the runtime reports the container
    /// running; launch is synchronous from the caller's perspective.
    fn wait_until_running(&self, container_name: &str) -> Result<()> {
        let deadline = Instant::now() + self.settings.start_timeout;
        while Instant::now() < deadline {
            if self.runtime.is_running(container_name) {
                return Ok(());
            }
            thread::sleep(self.settings.start_poll_interval);
        }
        Err(Error::StartTimeout {
            name: container_name.to_string(),
            waited_secs: self.settings.start_timeout.as_secs(),
        })
    }

    /// Stop one instance, found by exact path, exact container name, or
    /// unique substring. Returns the record that was acted on.
    pub fn stop(&self, target: &str) -> Result<InstanceRecord> {
        let record = self.resolve_target(target)?;

        if !self.runtime.is_running(&record.container_name) {
            // Already stopped; drop the stale record and call it a success.
            self.store.delete(&record.identity)?;
            return Ok(record);
        }

        self.teardown(&record)?;
        self.store.delete(&record.identity)?;
        Ok(record)
    }

    /// Compose-down first, then a stop+remove fallback. Success is defined
    /// by "the runtime no longer reports it running", not by which command
    /// got it there.
    fn teardown(&self, record: &InstanceRecord) -> Result<()> {
        let name = &record.container_name;
        let primary = match self.runtime.compose_down(name) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        log_warn_stderr(
            color_enabled_stderr(),
            &format!("compose teardown of {name} failed ({primary}); trying stop+remove"),
        );
        self.runtime.stop(name).map_err(|source| Error::Teardown {
            name: name.clone(),
            source: source.context(format!("after compose down failed: {primary}")),
        })?;
        if let Err(e) = self.runtime.remove(name) {
            log_warn_stderr(
                color_enabled_stderr(),
                &format!("could not remove container {name}: {e}"),
            );
        }
        Ok(())
    }

    /// Stop every running instance; delete stale records on the way. One
    /// teardown failure does not block the others.
    pub fn stop_all(&self) -> Result<StopAllSummary> {
        let mut summary = StopAllSummary::default();
        for record in self.store.list_all()? {
            if !self.runtime.is_running(&record.container_name) {
                self.store.delete(&record.identity)?;
                summary.pruned += 1;
                continue;
            }
            match self.teardown(&record) {
                Ok(()) => {
                    self.store.delete(&record.identity)?;
                    summary.stopped.push(record);
                }
                Err(e) => summary.failed.push((record, e)),
            }
        }
        Ok(summary)
    }

    /// Partition all records by runtime truth. With `prune`, stale records
    /// are deleted as a side effect of listing.
    pub fn list(&self, prune: bool) -> Result<InstanceListing> {
        let mut listing = InstanceListing::default();
        for record in self.store.list_all()? {
            if self.runtime.is_running(&record.container_name) {
                listing.running.push(record);
            } else {
                if prune {
                    self.store.delete(&record.identity)?;
                }
                listing.stopped.push(record);
            }
        }
        Ok(listing)
    }

    /// Resolve a stop/logs target through three tiers: exact canonical path,
    /// exact container name, then substring over container name, full path
    /// and path basename. Multiple substring matches are an error listing
    /// the candidates; this never guesses.
    pub fn resolve_target(&self, target: &str) -> Result<InstanceRecord> {
        // Tier 1: exact path. Canonicalize the way start does so relative
        // paths and symlinks land on the same identity.
        if let Ok(path) = canonical_project_path(Path::new(target)) {
            let identity = derive_identity(&path);
            if let Some(record) = self.load_tolerant(&identity) {
                return Ok(record);
            }
        }

        let all = self.store.list_all()?;

        // Tier 2: exact container name.
        if let Some(record) = all.iter().find(|r| r.container_name == target) {
            return Ok(record.clone());
        }

        // Tier 3: substring against name, path, and basename.
        let matches: Vec<&InstanceRecord> = all
            .iter()
            .filter(|r| {
                r.container_name.contains(target)
                    || r.project_path.display().to_string().contains(target)
                    || r.project_name().contains(target)
            })
            .collect();

        match matches.as_slice() {
            [] => Err(Error::TargetNotFound(target.to_string())),
            [one] => Ok((*one).clone()),
            many => Err(Error::AmbiguousTarget {
                target: target.to_string(),
                candidates: many
                    .iter()
                    .map(|r| format!("{} ({})", r.container_name, r.project_path.display()))
                    .collect(),
            }),
        }
    }

    /// Load a record, treating a malformed file as absent (with a warning)
    /// so one corrupt entry never wedges start or stop.
    fn load_tolerant(&self, identity: &str) -> Option<InstanceRecord> {
        match self.store.load(identity) {
            Ok(found) => found,
            Err(e) => {
                log_warn_stderr(color_enabled_stderr(), &format!("{e}; ignoring record"));
                None
            }
        }
    }
}

/// Convenience wrapper used by `start`: the project directory is created if
/// it does not exist yet, so `denv start ~/new-project` just works.
pub fn ensure_project_dir(path: &Path) -> Result<PathBuf> {
    let canonical = canonical_project_path(path)?;
    if !canonical.exists() {
        std::fs::create_dir_all(&canonical)?;
    }
    Ok(canonical)
}

//! Durable instance registry: one JSON file per identity.
//!
//! The store is a cache of "what we last knew and where", never the
//! authority on whether an instance is actually running -- the container
//! runtime is. Records are written as whole-file overwrites of
//! `<identity>.state`; atomicity is whatever the filesystem gives us for
//! that, a known limitation rather than a contract.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Persisted metadata for one launched instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub project_path: PathBuf,
    pub container_name: String,
    pub web_port: u16,
    pub dev_port: u16,
    pub started_at: DateTime<Utc>,
    pub identity: String,
}

impl InstanceRecord {
    pub fn web_url(&self) -> String {
        format!("http://localhost:{}", self.web_port)
    }

    /// Last path component, used for display and fuzzy matching.
    pub fn project_name(&self) -> String {
        self.project_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.project_path.display().to_string())
    }

    /// Human uptime since `started_at`, see [`format_uptime`].
    pub fn uptime(&self) -> String {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        format_uptime(elapsed.num_seconds().max(0))
    }
}

/// Render a duration with the coarsest non-zero unit plus one sub-unit.
/// Durations under two minutes stay in raw seconds; labels are always
/// plural ("1 hours 1 minutes") so the output is grep-stable.
pub fn format_uptime(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        if hours > 0 {
            format!("{days} days {hours} hours")
        } else {
            format!("{days} days")
        }
    } else if hours > 0 {
        if minutes > 0 {
            format!("{hours} hours {minutes} minutes")
        } else {
            format!("{hours} hours")
        }
    } else if total_secs >= 120 {
        if seconds > 0 {
            format!("{minutes} minutes {seconds} seconds")
        } else {
            format!("{minutes} minutes")
        }
    } else {
        format!("{total_secs} seconds")
    }
}

/// File-per-identity record store rooted at the registry directory.
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RecordStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{identity}.state"))
    }

    /// Serialize the record to `<identity>.state`, replacing any prior one.
    pub fn save(&self, record: &InstanceRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(self.record_path(&record.identity), data)?;
        Ok(())
    }

    /// Load a record by identity. A missing file is `Ok(None)`; a file that
    /// exists but does not parse is `Error::MalformedRecord`, which callers
    /// treat as absent-with-warning.
    pub fn load(&self, identity: &str) -> Result<Option<InstanceRecord>> {
        let path = self.record_path(identity);
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(record) => Ok(Some(record)),
            Err(e) => Err(Error::MalformedRecord { path, source: e }),
        }
    }

    /// Remove the record file. Deleting a record that is already gone is a
    /// no-op success.
    pub fn delete(&self, identity: &str) -> Result<()> {
        match fs::remove_file(self.record_path(identity)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every well-formed record in the registry directory. Malformed files
    /// are skipped so one corrupt entry can never fail the whole listing.
    pub fn list_all(&self) -> Result<Vec<InstanceRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("state") {
                continue;
            }
            let Some(identity) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(Some(record)) = self.load(identity) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.container_name.cmp(&b.container_name));
        Ok(records)
    }
}

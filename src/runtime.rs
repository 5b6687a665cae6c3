#![allow(clippy::module_name_repetitions)]
//! Container runtime seam.
//!
//! The coordinator only ever asks the runtime "does this name appear in the
//! running set", "which host ports are published" and "bring this compose
//! project up/down" -- it never parses any richer docker output. The trait
//! keeps that surface narrow and lets lifecycle tests substitute a fake.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use which::which;

use crate::config::Settings;
use crate::exec::{run_captured, run_streaming};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment handed to the compose launcher for one instance.
#[derive(Debug, Clone)]
pub struct LaunchEnv {
    pub workspace_dir: PathBuf,
    pub container_name: String,
    pub web_port: u16,
    pub dev_port: u16,
    pub image_ref: String,
    pub auth_dir: PathBuf,
}

impl LaunchEnv {
    /// Variable map as consumed by the compose file.
    pub fn as_env_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("WORKSPACE_DIR", self.workspace_dir.display().to_string()),
            ("CONTAINER_NAME", self.container_name.clone()),
            ("WEB_PORT", self.web_port.to_string()),
            ("DEV_PORT", self.dev_port.to_string()),
            ("DENV_IMAGE", self.image_ref.clone()),
            ("AUTH_DIR", self.auth_dir.display().to_string()),
        ]
    }
}

/// The external collaborator that actually runs instances. Sole source of
/// truth for "is it running"; the record store is only a cache.
pub trait ContainerRuntime {
    /// Verify the runtime is usable at all. Fatal for `start` when it fails.
    fn ensure_available(&self) -> Result<()>;

    /// Whether a container with this exact name is in the running set.
    /// Query failures are reported as "not running".
    fn is_running(&self, container_name: &str) -> bool;

    /// Blocking `compose up -d` for one instance.
    fn compose_up(&self, env: &LaunchEnv) -> Result<()>;

    /// Primary teardown path for one instance.
    fn compose_down(&self, container_name: &str) -> Result<()>;

    /// Lower-level fallbacks when compose teardown fails.
    fn stop(&self, container_name: &str) -> Result<()>;
    fn remove(&self, container_name: &str) -> Result<()>;

    fn pull_image(&self, image_ref: &str) -> Result<()>;

    /// Host ports currently published by any running container. Query
    /// failures degrade to an empty set.
    fn published_ports(&self) -> Vec<u16>;

    /// Stream logs until interrupted.
    fn follow_logs(&self, container_name: &str) -> Result<()>;

    /// Last `n` log lines.
    fn tail_logs(&self, container_name: &str, n: u32) -> Result<String>;
}

/// Docker CLI implementation, shelling out to `docker` (and `docker compose`
/// v2 with a `docker-compose` v1 fallback).
pub struct DockerCli {
    compose_file: PathBuf,
}

impl DockerCli {
    pub fn new(settings: &Settings) -> Self {
        DockerCli {
            compose_file: settings.compose_file.clone(),
        }
    }

    fn docker_path(&self) -> Result<PathBuf> {
        which("docker").context("Docker is required but was not found in PATH")
    }

    /// `docker compose` (v2) when available, `docker-compose` (v1) otherwise.
    fn compose_command(&self) -> Result<Command> {
        let docker = self.docker_path()?;
        let mut probe = Command::new(&docker);
        probe.args(["compose", "version"]);
        if matches!(run_captured(&mut probe, QUERY_TIMEOUT), Ok(out) if out.status_ok) {
            let mut cmd = Command::new(docker);
            cmd.arg("compose");
            return Ok(cmd);
        }
        let legacy = which("docker-compose")
            .context("neither 'docker compose' nor 'docker-compose' is available")?;
        Ok(Command::new(legacy))
    }

    fn compose_args(cmd: &mut Command, compose_file: &Path, project: &str) {
        cmd.arg("-f")
            .arg(compose_file)
            .arg("-p")
            .arg(project);
    }
}

impl ContainerRuntime for DockerCli {
    fn ensure_available(&self) -> Result<()> {
        let docker = self.docker_path()?;
        let mut cmd = Command::new(docker);
        cmd.arg("info");
        let out = run_captured(&mut cmd, QUERY_TIMEOUT)
            .context("docker did not respond; is the daemon running?")?;
        if !out.status_ok {
            anyhow::bail!("docker daemon is not running; start Docker and retry");
        }
        Ok(())
    }

    fn is_running(&self, container_name: &str) -> bool {
        let Ok(docker) = self.docker_path() else {
            return false;
        };
        let mut cmd = Command::new(docker);
        cmd.args(["ps", "--format", "{{.Names}}"]);
        match run_captured(&mut cmd, QUERY_TIMEOUT) {
            Ok(out) if out.status_ok => out
                .stdout
                .lines()
                .any(|name| name.trim() == container_name),
            _ => false,
        }
    }

    fn compose_up(&self, env: &LaunchEnv) -> Result<()> {
        let mut cmd = self.compose_command()?;
        Self::compose_args(&mut cmd, &self.compose_file, &env.container_name);
        cmd.args(["up", "-d"]);
        for (key, value) in env.as_env_pairs() {
            cmd.env(key, value);
        }
        if run_streaming(&mut cmd)? {
            Ok(())
        } else {
            anyhow::bail!("compose up exited with a failure status")
        }
    }

    fn compose_down(&self, container_name: &str) -> Result<()> {
        let mut cmd = self.compose_command()?;
        Self::compose_args(&mut cmd, &self.compose_file, container_name);
        cmd.arg("down");
        let out = run_captured(&mut cmd, Duration::from_secs(60))?;
        if out.status_ok {
            Ok(())
        } else {
            anyhow::bail!("compose down failed: {}", out.stderr.trim())
        }
    }

    fn stop(&self, container_name: &str) -> Result<()> {
        let mut cmd = Command::new(self.docker_path()?);
        cmd.args(["stop", container_name]);
        let out = run_captured(&mut cmd, Duration::from_secs(60))?;
        if out.status_ok {
            Ok(())
        } else {
            anyhow::bail!("docker stop failed: {}", out.stderr.trim())
        }
    }

    fn remove(&self, container_name: &str) -> Result<()> {
        let mut cmd = Command::new(self.docker_path()?);
        cmd.args(["rm", "-f", container_name]);
        let out = run_captured(&mut cmd, Duration::from_secs(60))?;
        // A container that is already gone counts as removed.
        if out.status_ok || out.stderr.contains("No such container") {
            Ok(())
        } else {
            anyhow::bail!("docker rm failed: {}", out.stderr.trim())
        }
    }

    fn pull_image(&self, image_ref: &str) -> Result<()> {
        let mut cmd = Command::new(self.docker_path()?);
        cmd.args(["pull", image_ref]);
        if run_streaming(&mut cmd)? {
            Ok(())
        } else {
            anyhow::bail!("docker pull {image_ref} failed")
        }
    }

    fn published_ports(&self) -> Vec<u16> {
        let Ok(docker) = self.docker_path() else {
            return Vec::new();
        };
        let mut cmd = Command::new(docker);
        cmd.args(["ps", "--format", "{{.Ports}}"]);
        match run_captured(&mut cmd, QUERY_TIMEOUT) {
            Ok(out) if out.status_ok => parse_published_ports(&out.stdout),
            _ => Vec::new(),
        }
    }

    fn follow_logs(&self, container_name: &str) -> Result<()> {
        let mut cmd = Command::new(self.docker_path()?);
        cmd.args(["logs", "-f", container_name]);
        run_streaming(&mut cmd)?;
        Ok(())
    }

    fn tail_logs(&self, container_name: &str, n: u32) -> Result<String> {
        let mut cmd = Command::new(self.docker_path()?);
        cmd.args(["logs", "--tail", &n.to_string(), container_name]);
        let out = run_captured(&mut cmd, Duration::from_secs(30))?;
        if out.status_ok {
            Ok(out.stdout)
        } else {
            anyhow::bail!("docker logs failed: {}", out.stderr.trim())
        }
    }
}

/// Extract host ports from `docker ps --format {{.Ports}}` output, lines like
/// `0.0.0.0:8080->80/tcp, :::8080->80/tcp`.
fn parse_published_ports(output: &str) -> Vec<u16> {
    let mut ports = Vec::new();
    for mapping in output.split(|c| c == '\n' || c == ',') {
        let Some(arrow) = mapping.find("->") else {
            continue;
        };
        let host_side = &mapping[..arrow];
        let Some(colon) = host_side.rfind(':') else {
            continue;
        };
        if let Ok(port) = host_side[colon + 1..].trim().parse::<u16>() {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
    }
    ports
}

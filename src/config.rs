//! Process-wide settings, loaded once in `main` and passed by reference.
//!
//! Values come from `<install_dir>/config.env` (loaded via dotenvy, missing
//! file is fine) with `DENV_*` environment variables taking precedence. There
//! is deliberately no global singleton: the coordinator, allocator and store
//! all borrow the one `Settings` built at startup.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub install_dir: PathBuf,
    pub instances_dir: PathBuf,
    pub compose_file: PathBuf,
    pub auth_dir: PathBuf,

    pub web_port_default: u16,
    pub dev_port_default: u16,
    pub port_scan_attempts: u16,

    pub container_prefix: String,
    pub image_registry: String,
    pub image_name: String,
    pub image_tag: String,

    pub start_timeout: Duration,
    pub start_poll_interval: Duration,
}

impl Settings {
    /// Load settings and make sure the instances directory exists.
    pub fn load() -> io::Result<Self> {
        let install_dir = match env::var("DENV_INSTALL_DIR") {
            Ok(d) if !d.trim().is_empty() => PathBuf::from(d),
            _ => home::home_dir()
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "cannot determine home directory")
                })?
                .join(".denv"),
        };

        // Optional config.env; environment variables override its contents,
        // so load it without clobbering what is already set.
        let _ = dotenvy::from_path(install_dir.join("config.env"));

        let instances_dir = install_dir.join("instances");
        fs::create_dir_all(&instances_dir)?;

        Ok(Settings {
            compose_file: install_dir.join("docker-compose.yaml"),
            auth_dir: install_dir.join("auth"),
            instances_dir,
            install_dir,
            web_port_default: env_u16("DENV_WEB_PORT_DEFAULT", 8080),
            dev_port_default: env_u16("DENV_DEV_PORT_DEFAULT", 3000),
            port_scan_attempts: env_u16("DENV_PORT_SCAN_ATTEMPTS", 100),
            container_prefix: env_string("DENV_CONTAINER_NAME_PREFIX", "denv-runtime"),
            image_registry: env_string("DENV_IMAGE_REGISTRY", "denvdev"),
            image_name: env_string("DENV_IMAGE_NAME", "denv-runtime"),
            image_tag: env_string("DENV_IMAGE_TAG", "latest"),
            start_timeout: Duration::from_secs(env_u64("DENV_START_TIMEOUT_SECS", 30)),
            start_poll_interval: Duration::from_millis(500),
        })
    }

    /// Full image reference, `<registry>/<name>:<tag>`.
    pub fn full_image_ref(&self) -> String {
        format!("{}/{}:{}", self.image_registry, self.image_name, self.image_tag)
    }

    /// Container name for a project identity: `<prefix>-<identity>`.
    pub fn container_name_for(&self, identity: &str) -> String {
        format!("{}-{}", self.container_prefix, identity)
    }
}

fn env_string(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            install_dir: PathBuf::from("/tmp/denv"),
            instances_dir: PathBuf::from("/tmp/denv/instances"),
            compose_file: PathBuf::from("/tmp/denv/docker-compose.yaml"),
            auth_dir: PathBuf::from("/tmp/denv/auth"),
            web_port_default: 8080,
            dev_port_default: 3000,
            port_scan_attempts: 100,
            container_prefix: "denv-runtime".to_string(),
            image_registry: "denvdev".to_string(),
            image_name: "denv-runtime".to_string(),
            image_tag: "latest".to_string(),
            start_timeout: Duration::from_secs(30),
            start_poll_interval: Duration::from_millis(500),
        }
    }

    #[test]
    fn full_image_ref_concatenates() {
        assert_eq!(test_settings().full_image_ref(), "denvdev/denv-runtime:latest");
    }

    #[test]
    fn container_name_uses_prefix_and_identity() {
        assert_eq!(
            test_settings().container_name_for("deadbeef"),
            "denv-runtime-deadbeef"
        );
    }
}

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use denv::runtime::{ContainerRuntime, LaunchEnv};
use denv::Settings;

/// Test settings rooted in a scratch directory, with fast start polling and
/// per-test port bases so parallel tests do not collide.
pub fn test_settings(install_dir: &std::path::Path, web_base: u16, dev_base: u16) -> Settings {
    Settings {
        install_dir: install_dir.to_path_buf(),
        instances_dir: install_dir.join("instances"),
        compose_file: install_dir.join("docker-compose.yaml"),
        auth_dir: install_dir.join("auth"),
        web_port_default: web_base,
        dev_port_default: dev_base,
        port_scan_attempts: 50,
        container_prefix: "denv-runtime".to_string(),
        image_registry: "denvdev".to_string(),
        image_name: "denv-runtime".to_string(),
        image_tag: "latest".to_string(),
        start_timeout: Duration::from_millis(300),
        start_poll_interval: Duration::from_millis(10),
    }
}

#[derive(Default)]
struct FakeState {
    running: BTreeSet<String>,
    published: Vec<u16>,
    fail_compose_up: bool,
    /// compose up "succeeds" but the container never reports running.
    hang_after_up: bool,
    fail_teardown: BTreeSet<String>,
    unavailable: bool,
    compose_up_names: Vec<String>,
    port_queries: usize,
    pulled: Vec<String>,
}

/// In-memory [`ContainerRuntime`] double. Interior mutability because the
/// trait takes `&self` everywhere.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, name: &str) {
        self.state.lock().unwrap().running.insert(name.to_string());
    }

    pub fn publish_port(&self, port: u16) {
        self.state.lock().unwrap().published.push(port);
    }

    pub fn fail_compose_up(&self) {
        self.state.lock().unwrap().fail_compose_up = true;
    }

    pub fn hang_after_up(&self) {
        self.state.lock().unwrap().hang_after_up = true;
    }

    /// Make both compose-down and the stop fallback fail for this name.
    pub fn fail_teardown(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_teardown
            .insert(name.to_string());
    }

    pub fn set_unavailable(&self) {
        self.state.lock().unwrap().unavailable = true;
    }

    pub fn compose_up_count(&self) -> usize {
        self.state.lock().unwrap().compose_up_names.len()
    }

    pub fn port_query_count(&self) -> usize {
        self.state.lock().unwrap().port_queries
    }

    pub fn pulled_images(&self) -> Vec<String> {
        self.state.lock().unwrap().pulled.clone()
    }
}

impl ContainerRuntime for FakeRuntime {
    fn ensure_available(&self) -> Result<()> {
        if self.state.lock().unwrap().unavailable {
            anyhow::bail!("docker daemon is not running");
        }
        Ok(())
    }

    fn is_running(&self, container_name: &str) -> bool {
        self.state.lock().unwrap().running.contains(container_name)
    }

    fn compose_up(&self, env: &LaunchEnv) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.compose_up_names.push(env.container_name.clone());
        if state.fail_compose_up {
            anyhow::bail!("compose up exited with a failure status");
        }
        if !state.hang_after_up {
            state.running.insert(env.container_name.clone());
        }
        Ok(())
    }

    fn compose_down(&self, container_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_teardown.contains(container_name) {
            anyhow::bail!("compose down failed");
        }
        state.running.remove(container_name);
        Ok(())
    }

    fn stop(&self, container_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_teardown.contains(container_name) {
            anyhow::bail!("docker stop failed");
        }
        state.running.remove(container_name);
        Ok(())
    }

    fn remove(&self, _container_name: &str) -> Result<()> {
        Ok(())
    }

    fn pull_image(&self, image_ref: &str) -> Result<()> {
        self.state.lock().unwrap().pulled.push(image_ref.to_string());
        Ok(())
    }

    fn published_ports(&self) -> Vec<u16> {
        let mut state = self.state.lock().unwrap();
        state.port_queries += 1;
        state.published.clone()
    }

    fn follow_logs(&self, _container_name: &str) -> Result<()> {
        Ok(())
    }

    fn tail_logs(&self, _container_name: &str, _n: u32) -> Result<String> {
        Ok(String::new())
    }
}

/// A project directory inside the scratch dir, created so canonicalization
/// resolves it.
pub fn make_project_dir(base: &std::path::Path, name: &str) -> PathBuf {
    let dir = base.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir.canonicalize().unwrap()
}

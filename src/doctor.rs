//! Environment diagnostics for `denv doctor`.

use std::process::Command;
use std::time::Duration;

use which::which;

use crate::config::Settings;
use crate::exec::run_captured;
use crate::runtime::ContainerRuntime;

pub fn run_doctor(settings: &Settings, runtime: &dyn ContainerRuntime) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("denv doctor");
    eprintln!("  version: v{version}");
    eprintln!(
        "  host: {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    match which("docker") {
        Ok(p) => {
            eprintln!("  docker: {}", p.display());
            let mut cmd = Command::new(&p);
            cmd.arg("--version");
            if let Ok(out) = run_captured(&mut cmd, Duration::from_secs(10)) {
                let s = out.stdout.trim();
                if !s.is_empty() {
                    eprintln!("  docker --version: {s}");
                }
            }
        }
        Err(e) => eprintln!("  docker: not found ({e})"),
    }

    match runtime.ensure_available() {
        Ok(()) => eprintln!("  docker daemon: reachable"),
        Err(e) => eprintln!("  docker daemon: unreachable ({e})"),
    }

    eprintln!("  install dir: {}", settings.install_dir.display());
    eprintln!(
        "  instances dir: {} ({})",
        settings.instances_dir.display(),
        if settings.instances_dir.is_dir() {
            "present"
        } else {
            "missing"
        }
    );
    eprintln!(
        "  compose file: {} ({})",
        settings.compose_file.display(),
        if settings.compose_file.is_file() {
            "present"
        } else {
            "missing"
        }
    );
    eprintln!("  image: {}", settings.full_image_ref());
    eprintln!(
        "  default ports: web {} / dev {} (scan window {})",
        settings.web_port_default, settings.dev_port_default, settings.port_scan_attempts
    );

    eprintln!("doctor: completed diagnostics.");
}

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use denv::cli::{Cli, CliCommand};
use denv::lifecycle::{ensure_project_dir, Coordinator, StartOptions, StartOutcome};
use denv::runtime::ContainerRuntime;
use denv::{
    browser, color_enabled_stderr, doctor, exit_code_for_error, log_error_stderr,
    log_info_stderr, log_success_stderr, log_warn_stderr, set_color_mode, DockerCli, Error,
    RecordStore, Settings,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        set_color_mode(mode);
    }
    let use_err = color_enabled_stderr();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            log_error_stderr(use_err, &format!("failed to load configuration: {e}"));
            return ExitCode::from(1);
        }
    };
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = DockerCli::new(&settings);
    let coordinator = Coordinator::new(&settings, &store, &runtime);

    let result = match cli.command {
        CliCommand::Start {
            path,
            web_port,
            dev_port,
            no_open,
            follow,
        } => run_start(
            &coordinator,
            &runtime,
            path.as_deref(),
            StartOptions { web_port, dev_port },
            no_open,
            follow,
        ),
        CliCommand::Kill { target, all, force } => {
            run_kill(&coordinator, &runtime, target.as_deref(), all, force)
        }
        CliCommand::List { all, quiet } => run_list(&coordinator, all, quiet),
        CliCommand::Logs {
            target,
            follow,
            tail,
        } => run_logs(&coordinator, &runtime, &target, follow, tail),
        CliCommand::Doctor => {
            doctor::run_doctor(&settings, &runtime);
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log_error_stderr(use_err, &e.to_string());
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}

fn run_start(
    coordinator: &Coordinator,
    runtime: &dyn ContainerRuntime,
    path: Option<&str>,
    opts: StartOptions,
    no_open: bool,
    follow: bool,
) -> denv::Result<u8> {
    let use_err = color_enabled_stderr();
    let raw = path.unwrap_or(".");
    let project_path = ensure_project_dir(Path::new(raw))?;

    let outcome = coordinator.start(&project_path, opts)?;
    let record = outcome.record();

    match &outcome {
        StartOutcome::AlreadyRunning(r) => {
            log_warn_stderr(
                use_err,
                &format!("project already running at {}", r.project_path.display()),
            );
            log_info_stderr(use_err, &format!("web url: {}", r.web_url()));
            log_info_stderr(use_err, &format!("container: {}", r.container_name));
            log_info_stderr(use_err, &format!("uptime: {}", r.uptime()));
        }
        StartOutcome::Started(r) => {
            log_success_stderr(use_err, "environment started");
            log_info_stderr(use_err, &format!("project: {}", r.project_path.display()));
            log_info_stderr(use_err, &format!("web url: {}", r.web_url()));
            log_info_stderr(
                use_err,
                &format!(
                    "container: {} (web {} / dev {})",
                    r.container_name, r.web_port, r.dev_port
                ),
            );
            eprintln!();
            eprintln!("To stop it, run:");
            eprintln!("  denv kill {}", r.project_path.display());
        }
    }

    if !no_open && browser::can_open_browser() {
        if let Err(e) = browser::open_url(&record.web_url()) {
            log_warn_stderr(use_err, &format!("failed to open browser: {e}"));
        }
    }

    if follow {
        log_info_stderr(use_err, "following container logs...");
        if let Err(e) = runtime.follow_logs(&record.container_name) {
            log_warn_stderr(use_err, &format!("log following ended: {e}"));
        }
    }
    Ok(0)
}

fn run_kill(
    coordinator: &Coordinator,
    runtime: &dyn ContainerRuntime,
    target: Option<&str>,
    all: bool,
    force: bool,
) -> denv::Result<u8> {
    let use_err = color_enabled_stderr();

    if all {
        let listing = coordinator.list(false)?;
        if listing.running.is_empty() {
            // Nothing live, but stale records still deserve cleanup.
            let summary = coordinator.stop_all()?;
            if summary.pruned > 0 {
                log_info_stderr(
                    use_err,
                    &format!("removed {} stale record(s)", summary.pruned),
                );
            } else {
                log_info_stderr(use_err, "no running instances");
            }
            return Ok(0);
        }
        if !force {
            log_warn_stderr(
                use_err,
                &format!("this will stop {} running instance(s):", listing.running.len()),
            );
            for r in &listing.running {
                eprintln!("  - {} ({})", r.container_name, r.project_path.display());
            }
            if !confirm("Are you sure? (y/N): ")? {
                log_info_stderr(use_err, "cancelled");
                return Ok(0);
            }
        }
        let summary = coordinator.stop_all()?;
        if summary.succeeded() > 0 {
            log_success_stderr(
                use_err,
                &format!("stopped {} instance(s)", summary.succeeded()),
            );
        }
        for (record, err) in &summary.failed {
            log_error_stderr(
                use_err,
                &format!("failed to stop {}: {err}", record.container_name),
            );
        }
        return Ok(if summary.failed_count() > 0 { 1 } else { 0 });
    }

    let Some(target) = target else {
        return Err(Error::TargetNotFound(
            "(no target; pass a path/name or use --all)".to_string(),
        ));
    };

    let record = coordinator.resolve_target(target)?;
    if runtime.is_running(&record.container_name) && !force {
        log_warn_stderr(
            use_err,
            &format!("stopping environment for {}", record.project_path.display()),
        );
        if !confirm("Are you sure? (y/N): ")? {
            log_info_stderr(use_err, "cancelled");
            return Ok(0);
        }
    }

    let stopped = coordinator.stop(target)?;
    log_success_stderr(
        use_err,
        &format!("stopped environment for {}", stopped.project_path.display()),
    );
    Ok(0)
}

fn run_list(coordinator: &Coordinator, all: bool, quiet: bool) -> denv::Result<u8> {
    let use_err = color_enabled_stderr();
    // Default listing prunes stale records; --all keeps them visible.
    let listing = coordinator.list(!all)?;

    if quiet {
        for r in &listing.running {
            println!("{}", r.container_name);
        }
        if all {
            for r in &listing.stopped {
                println!("{}", r.container_name);
            }
        }
        return Ok(0);
    }

    if listing.running.is_empty() {
        log_info_stderr(use_err, "no running instances");
    } else {
        log_info_stderr(
            use_err,
            &format!("running instances ({}):", listing.running.len()),
        );
        println!();
        print_table(
            &["CONTAINER", "PROJECT", "PORT", "UPTIME", "PATH"],
            &listing
                .running
                .iter()
                .map(|r| {
                    vec![
                        r.container_name.clone(),
                        r.project_name(),
                        r.web_port.to_string(),
                        r.uptime(),
                        r.project_path.display().to_string(),
                    ]
                })
                .collect::<Vec<_>>(),
        );
        println!();
    }

    if all && !listing.stopped.is_empty() {
        log_warn_stderr(
            use_err,
            &format!("stopped instances ({}):", listing.stopped.len()),
        );
        println!();
        print_table(
            &["CONTAINER", "PROJECT", "STARTED", "PATH"],
            &listing
                .stopped
                .iter()
                .map(|r| {
                    vec![
                        r.container_name.clone(),
                        r.project_name(),
                        r.started_at.format("%Y-%m-%d %H:%M").to_string(),
                        r.project_path.display().to_string(),
                    ]
                })
                .collect::<Vec<_>>(),
        );
        println!();
    }
    Ok(0)
}

fn run_logs(
    coordinator: &Coordinator,
    runtime: &dyn ContainerRuntime,
    target: &str,
    follow: bool,
    tail: u32,
) -> denv::Result<u8> {
    let record = coordinator.resolve_target(target)?;
    if follow {
        runtime
            .follow_logs(&record.container_name)
            .map_err(|source| Error::Runtime {
                op: "logs",
                name: record.container_name.clone(),
                source,
            })?;
    } else {
        let logs = runtime
            .tail_logs(&record.container_name, tail)
            .map_err(|source| Error::Runtime {
                op: "logs",
                name: record.container_name.clone(),
                source,
            })?;
        print!("{logs}");
    }
    Ok(0)
}

/// Column-aligned plain table on stdout.
fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }
    let render = |cells: &[String]| {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            line.push_str(cell);
            if i + 1 < cells.len() {
                for _ in cell.len()..widths[i] + 2 {
                    line.push(' ');
                }
            }
        }
        println!("{}", line.trim_end());
    };
    render(&headers.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    render(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>(),
    );
    for row in rows {
        render(row);
    }
}

fn confirm(prompt: &str) -> denv::Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    Ok(answer.eq_ignore_ascii_case("y"))
}

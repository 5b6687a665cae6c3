mod common;

use tempfile::TempDir;

use denv::lifecycle::{Coordinator, StartOptions, StartOutcome};
use denv::{derive_identity, ContainerRuntime, Error, RecordStore};

use common::{make_project_dir, test_settings, FakeRuntime};

#[test]
fn start_launches_and_saves_record() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 33000, 33100);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "web-app");

    let outcome = coordinator.start(&project, StartOptions::default()).unwrap();
    let record = match outcome {
        StartOutcome::Started(r) => r,
        other => panic!("expected fresh start, got {other:?}"),
    };

    let identity = derive_identity(&project);
    assert_eq!(record.identity, identity);
    assert_eq!(record.container_name, format!("denv-runtime-{identity}"));
    assert_eq!(record.project_path, project);
    assert!(runtime.is_running(&record.container_name));
    assert_eq!(runtime.pulled_images(), vec!["denvdev/denv-runtime:latest"]);

    let persisted = store.load(&identity).unwrap().unwrap();
    assert_eq!(persisted, record);
}

#[test]
fn second_start_is_idempotent_and_allocates_nothing() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 33200, 33300);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "web-app");

    let first = coordinator
        .start(&project, StartOptions::default())
        .unwrap();
    let queries_after_first = runtime.port_query_count();

    let second = coordinator
        .start(&project, StartOptions::default())
        .unwrap();
    match &second {
        StartOutcome::AlreadyRunning(r) => {
            assert_eq!(r.container_name, first.record().container_name);
            assert_eq!(r.web_port, first.record().web_port);
            assert_eq!(r.dev_port, first.record().dev_port);
        }
        other => panic!("expected reattach, got {other:?}"),
    }
    // Short-circuit path: one compose launch total, no second port scan.
    assert_eq!(runtime.compose_up_count(), 1);
    assert_eq!(runtime.port_query_count(), queries_after_first);
}

#[test]
fn explicit_port_overrides_skip_allocation() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 33400, 33500);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "api");

    let outcome = coordinator
        .start(
            &project,
            StartOptions {
                web_port: Some(18080),
                dev_port: Some(13000),
            },
        )
        .unwrap();
    assert_eq!(outcome.record().web_port, 18080);
    assert_eq!(outcome.record().dev_port, 13000);
    assert_eq!(runtime.port_query_count(), 0);
}

#[test]
fn launch_failure_writes_no_record() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 33600, 33700);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    runtime.fail_compose_up();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "broken");

    match coordinator.start(&project, StartOptions::default()) {
        Err(Error::Launch { .. }) => {}
        other => panic!("expected Launch error, got {other:?}"),
    }
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn container_never_reporting_running_times_out_without_record() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 33800, 33900);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    runtime.hang_after_up();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "slow");

    match coordinator.start(&project, StartOptions::default()) {
        Err(Error::StartTimeout { name, .. }) => {
            assert!(name.starts_with("denv-runtime-"));
        }
        other => panic!("expected StartTimeout, got {other:?}"),
    }
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn unreachable_runtime_is_fatal_for_start() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 34000, 34100);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    runtime.set_unavailable();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "offline");

    match coordinator.start(&project, StartOptions::default()) {
        Err(Error::RuntimeUnavailable(_)) => {}
        other => panic!("expected RuntimeUnavailable, got {other:?}"),
    }
}

#[test]
fn stale_record_is_replaced_on_restart() {
    let scratch = TempDir::new().unwrap();
    let settings = test_settings(scratch.path(), 34200, 34300);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "web-app");

    let first = coordinator
        .start(&project, StartOptions::default())
        .unwrap();
    let name = first.record().container_name.clone();

    // Container dies behind our back; the record is now stale.
    runtime.stop(&name).unwrap();

    let second = coordinator
        .start(&project, StartOptions::default())
        .unwrap();
    match second {
        StartOutcome::Started(r) => {
            assert_eq!(r.container_name, name);
            assert!(r.started_at >= first.record().started_at);
        }
        other => panic!("expected relaunch, got {other:?}"),
    }
    assert_eq!(runtime.compose_up_count(), 2);
}

#[test]
fn overlapping_default_ranges_allocate_distinct_ports() {
    let scratch = TempDir::new().unwrap();
    // Both scans start at the same port; the record must still come out with
    // two different ones.
    let settings = test_settings(scratch.path(), 34400, 34400);
    let store = RecordStore::new(settings.instances_dir.clone());
    let runtime = FakeRuntime::new();
    let coordinator = Coordinator::new(&settings, &store, &runtime);
    let project = make_project_dir(scratch.path(), "same-range");

    let outcome = coordinator.start(&project, StartOptions::default()).unwrap();
    let record = outcome.record();
    assert_ne!(record.web_port, record.dev_port);
}

//! Start/stop behaviour of the mock hub as seen by a test suite.

use std::time::Duration;

use hub_harness::hub::HubError;
use hub_harness::lifecycle::THREAD_NAME;
use hub_harness::{ControllerError, LifecycleState, MockHub};

mod common;

#[test]
fn test_ready_hub_has_baseline_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());

    hub.start().unwrap();

    assert_eq!(hub.state(), LifecycleState::Ready);
    let names = hub
        .call(|db| db.users().map(|u| u.name.clone()).collect::<Vec<_>>())
        .unwrap();
    assert_eq!(names, ["admin", "user"]);
    assert!(hub.call(|db| db.find_user("admin").unwrap().is_admin()).unwrap());
    assert!(hub.call(|db| !db.find_user("user").unwrap().is_admin()).unwrap());

    hub.stop().unwrap();
}

#[test]
fn test_stop_leaves_no_thread_or_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    let artifact = hub.artifact_path().unwrap();

    hub.start().unwrap();
    assert!(artifact.exists());
    assert!(hub.is_running());

    hub.stop().unwrap();
    assert_eq!(hub.state(), LifecycleState::Idle);
    assert!(!hub.is_running());
    assert!(!artifact.exists());
}

#[test]
fn test_stale_artifact_is_removed_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("hub.json");
    std::fs::write(&artifact, r#"{"users":[{"name":"ghost","roles":[]}]}"#).unwrap();

    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();

    assert!(hub.call(|db| db.find_user("ghost").is_none()).unwrap());
    assert_eq!(hub.call(|db| db.user_count()).unwrap(), 2);
    hub.stop().unwrap();
}

#[test]
fn test_double_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());

    hub.start().unwrap();
    let addr = hub.addr();
    let err = hub.start().unwrap_err();

    assert!(matches!(
        err,
        ControllerError::InvalidState { operation: "start", state: LifecycleState::Ready }
    ));
    assert_eq!(hub.addr(), addr);
    hub.stop().unwrap();
}

#[test]
fn test_stop_before_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());

    let err = hub.stop().unwrap_err();
    assert_eq!(err.to_string(), "cannot stop while idle");
    assert_eq!(hub.state(), LifecycleState::Idle);
}

#[test]
fn test_unknown_admin_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = MockHub::new()
        .db_path(dir.path().join("hub.json"))
        .worker(env!("CARGO_BIN_EXE_mock-worker"))
        .admin_users(["dne_admin"])
        .startup_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = hub.start().unwrap_err();

    assert!(matches!(err, ControllerError::Startup(HubError::AdminUser(_))));
    assert_eq!(hub.state(), LifecycleState::Failed);
    assert!(!hub.is_running());
    assert!(!dir.path().join("hub.json").exists());
}

#[test]
fn test_failed_hub_can_start_again() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = MockHub::new()
        .db_path(dir.path().join("hub.json"))
        .worker(env!("CARGO_BIN_EXE_mock-worker"))
        .build()
        .unwrap();

    hub.start().unwrap();
    hub.stop().unwrap();
    hub.start().unwrap();
    assert_eq!(hub.state(), LifecycleState::Ready);
    hub.stop().unwrap();
}

#[test]
fn test_concurrent_harnesses_do_not_collide() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let mut first = common::mock_hub(first_dir.path());
    let mut second = common::mock_hub(second_dir.path());

    first.start().unwrap();
    second.start().unwrap();
    assert_ne!(first.addr(), second.addr());

    first.stop().unwrap();
    assert_eq!(second.call(|db| db.user_count()).unwrap(), 2);
    second.stop().unwrap();
}

#[test]
fn test_hub_runs_on_named_thread() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();

    let name = hub
        .call(|_| std::thread::current().name().map(str::to_string))
        .unwrap();
    assert_eq!(name.as_deref(), Some(THREAD_NAME));
    hub.stop().unwrap();
}

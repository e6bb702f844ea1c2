//! HTTP surface of a running mock hub.

use hub_harness::hub::{ServerInfo, UserModel};
use serde_json::Value;

mod common;

#[test]
fn test_version_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    let body: Value = common::block_on(async {
        common::client()
            .get(format!("{url}/hub/api"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    });
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    hub.stop().unwrap();
}

#[test]
fn test_login_checks_name_equals_password() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    common::block_on(async {
        let client = common::client();

        let res = client
            .post(format!("{url}/hub/login"))
            .form(&[("username", "admin"), ("password", "admin")])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let user: UserModel = res.json().await.unwrap();
        assert!(user.admin);

        let res = client
            .post(format!("{url}/hub/login"))
            .form(&[("username", "admin"), ("password", "nimda")])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 403);
    });
    hub.stop().unwrap();
}

#[test]
fn test_first_login_creates_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    let users: Vec<UserModel> = common::block_on(async {
        let client = common::client();
        let res = client
            .post(format!("{url}/hub/login"))
            .form(&[("username", "carol"), ("password", "carol")])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        client
            .get(format!("{url}/hub/api/users"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    });

    let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["admin", "carol", "user"]);
    assert!(hub.call(|db| db.find_user("carol").is_some()).unwrap());
    hub.stop().unwrap();
}

#[test]
fn test_unknown_system_user_cannot_log_in() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    let status = common::block_on(async {
        common::client()
            .post(format!("{url}/hub/login"))
            .form(&[("username", "dne_eve"), ("password", "dne_eve")])
            .send()
            .await
            .unwrap()
            .status()
    });
    assert_eq!(status, 403);
    assert!(hub.call(|db| db.find_user("dne_eve").is_none()).unwrap());
    hub.stop().unwrap();
}

#[test]
fn test_missing_user_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    let res = common::block_on(async {
        let res = common::client()
            .get(format!("{url}/hub/api/users/nobody"))
            .send()
            .await
            .unwrap();
        let status = res.status();
        let body: Value = res.json().await.unwrap();
        (status, body)
    });
    assert_eq!(res.0, 404);
    assert_eq!(res.1["error"], "no such user `nobody`");
    hub.stop().unwrap();
}

#[test]
fn test_worker_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    common::block_on(async {
        let client = common::client();
        let server_url = format!("{url}/hub/api/users/user/server");

        let res = client.post(&server_url).send().await.unwrap();
        assert_eq!(res.status(), 201);
        let info: Value = res.json().await.unwrap();
        let port = info["port"].as_u64().unwrap();
        assert_eq!(info["name"], "user");

        let status: Value = common::wait_for(&client, &format!("http://127.0.0.1:{port}/api/status"))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(status["user"], "user");
        assert_eq!(status["status"], "running");

        let res = client.post(&server_url).send().await.unwrap();
        assert_eq!(res.status(), 409);

        let user: UserModel = client
            .get(format!("{url}/hub/api/users/user"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(user.server, Some(port as u16));

        let res = client.delete(&server_url).send().await.unwrap();
        assert_eq!(res.status(), 204);
        let res = client.delete(&server_url).send().await.unwrap();
        assert_eq!(res.status(), 404);
    });
    hub.stop().unwrap();
}

#[test]
fn test_stop_kills_running_workers() {
    let dir = tempfile::tempdir().unwrap();
    let mut hub = common::mock_hub(dir.path());
    hub.start().unwrap();
    let url = hub.handle().unwrap().url();

    let info: ServerInfo = common::block_on(async {
        let client = common::client();
        let res = client
            .post(format!("{url}/hub/api/users/admin/server"))
            .send()
            .await
            .unwrap();
        let info: Value = res.json().await.unwrap();
        let port = info["port"].as_u64().unwrap() as u16;
        common::wait_for(&client, &format!("http://127.0.0.1:{port}/")).await;
        ServerInfo {
            name: info["name"].as_str().unwrap().to_string(),
            port,
            pid: info["pid"].as_u64().map(|p| p as u32),
        }
    });
    assert_eq!(info.name, "admin");

    hub.stop().unwrap();

    let reachable = common::block_on(async {
        common::client()
            .get(format!("http://127.0.0.1:{}/", info.port))
            .send()
            .await
            .is_ok()
    });
    assert!(!reachable);
}

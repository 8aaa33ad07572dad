//! Worker pool tests that spawn the real proxy binary as workers.

use std::collections::HashSet;
use std::time::Duration;

use pooled_proxy::ipc::{HeaderMultiMap, IpcRequest};
use pooled_proxy::pool::{WorkerLauncher, WorkerPool};

mod common;

const PROXY_BIN: &str = env!("CARGO_BIN_EXE_pooled-proxy");

fn request(url: &str) -> IpcRequest {
    IpcRequest {
        method: "GET".into(),
        headers: HeaderMultiMap::new(),
        body: String::new(),
        url: url.into(),
        remote_addr: "127.0.0.1:40000".into(),
    }
}

#[tokio::test]
async fn test_spawned_workers_serve_in_rotation() {
    let backend = common::start_mock_backend("users").await;
    let config = common::proxy_config(&[("backend1", backend)], &[("/api", "backend1")]);

    let launcher = WorkerLauncher::new(PROXY_BIN, &config).unwrap();
    let pool = WorkerPool::spawn(2, launcher, &config.ipc).unwrap();
    assert_eq!(pool.len(), 2);

    let mut pids = HashSet::new();
    for i in 0..2 {
        pids.insert(pool.worker(i).unwrap().pid().await.expect("worker pid"));
    }
    assert_eq!(pids.len(), 2);

    let mut ids = Vec::new();
    for _ in 0..4 {
        let response = pool.dispatch(&request("/api/users")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "users");
        ids.push(response.worker_id);
    }
    assert_eq!(ids, ["0", "1", "0", "1"]);

    let missing = pool.dispatch(&request("/unknown")).await.unwrap();
    assert_eq!(missing.status, 404);

    pool.shutdown(Duration::from_secs(5)).await;
    for i in 0..2 {
        assert!(!pool.worker(i).unwrap().is_alive().await);
    }
}

#[tokio::test]
async fn test_workers_exit_when_stdin_closes() {
    let config = common::proxy_config(&[], &[]);
    let launcher = WorkerLauncher::new(PROXY_BIN, &config).unwrap();

    let mut process = launcher.spawn(0).unwrap();
    drop(process.transport);

    let status = tokio::time::timeout(Duration::from_secs(10), process.child.wait())
        .await
        .expect("worker did not exit")
        .unwrap();
    assert!(status.success());
}

#[cfg(unix)]
#[tokio::test]
async fn test_killed_worker_is_respawned() {
    let backend = common::start_mock_backend("alive").await;
    let config = common::proxy_config(&[("backend1", backend)], &[("/api", "backend1")]);

    let launcher = WorkerLauncher::new(PROXY_BIN, &config).unwrap();
    let pool = WorkerPool::spawn(1, launcher, &config.ipc).unwrap();
    let worker = pool.worker(0).unwrap();
    let old_pid = worker.pid().await.unwrap();

    let killed = std::process::Command::new("kill")
        .args(["-9", &old_pid.to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let err = pool.dispatch(&request("/api/x")).await.unwrap_err();
    assert_eq!(err.status(), 502);
    assert!(!worker.is_alive().await);

    // Respawn backoff is configured at 10ms base.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = pool.dispatch(&request("/api/x")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "alive");

    let new_pid = worker.pid().await.unwrap();
    assert_ne!(new_pid, old_pid);

    pool.shutdown(Duration::from_secs(5)).await;
}

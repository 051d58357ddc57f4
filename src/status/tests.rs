use super::*;
use crate::config::ClusterConfig;
use crate::error::StatusError;
use httpmock::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn cluster_config(api_url: Option<String>, token_path: &str) -> ClusterConfig {
    ClusterConfig {
        api_url,
        token_path: token_path.to_string(),
        ca_path: "/nonexistent/ca.crt".to_string(),
        request_timeout_seconds: 5,
    }
}

fn token_file(token: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", token).unwrap();
    file
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pod_body() -> serde_json::Value {
    json!({
        "kind": "Pod",
        "apiVersion": "v1",
        "metadata": { "name": "job-1", "namespace": "default" },
        "spec": {
            "containers": [
                { "name": "app", "image": "busybox" },
                { "name": "linkerd-proxy", "image": "cr.l5d.io/linkerd/proxy" },
                { "name": "linkerd-proxy-terminator", "image": "sidecar-reaper" }
            ]
        },
        "status": {
            "phase": "Running",
            "containerStatuses": [
                {
                    "name": "app",
                    "ready": false,
                    "state": {
                        "terminated": {
                            "reason": "Completed",
                            "exitCode": 0,
                            "finishedAt": "2024-05-01T12:00:00Z"
                        }
                    }
                },
                {
                    "name": "linkerd-proxy",
                    "ready": true,
                    "state": { "running": { "startedAt": "2024-05-01T11:59:00Z" } }
                },
                {
                    "name": "linkerd-proxy-terminator",
                    "ready": false,
                    "state": { "waiting": { "reason": "ContainerCreating" } }
                }
            ]
        }
    })
}

#[tokio::test]
async fn test_kubernetes_fetch_decodes_pod() {
    let server = MockServer::start_async().await;
    let token = token_file("secret-token");

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/namespaces/default/pods/job-1")
                .header("authorization", "Bearer secret-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(pod_body());
        })
        .await;

    let config = cluster_config(
        Some(server.base_url()),
        &token.path().to_string_lossy(),
    );
    let provider = KubernetesStatusProvider::new(&config, &env(&[])).unwrap();

    let snapshot = provider.fetch("default", "job-1").await.unwrap();
    mock.assert_async().await;

    assert_eq!(snapshot.unit, "job-1");
    assert_eq!(
        snapshot.declared,
        vec!["app", "linkerd-proxy", "linkerd-proxy-terminator"]
    );
    assert_eq!(snapshot.processes.len(), 3);

    match &snapshot.process("app").unwrap().state {
        LifecycleState::Terminated {
            reason,
            exit_code,
            finished_at,
        } => {
            assert_eq!(reason, "Completed");
            assert_eq!(*exit_code, Some(0));
            assert!(finished_at.is_some());
        }
        other => panic!("Expected terminated app, got {:?}", other),
    }
    assert_eq!(
        snapshot.process("linkerd-proxy").unwrap().state,
        LifecycleState::Running
    );
    assert_eq!(
        snapshot.process("linkerd-proxy-terminator").unwrap().state,
        LifecycleState::Unknown
    );
}

#[tokio::test]
async fn test_kubernetes_fetch_without_token_is_unauthenticated() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/namespaces/default/pods/job-1");
            then.status(200).json_body(json!({
                "spec": { "containers": [{ "name": "app" }] },
                "status": {}
            }));
        })
        .await;

    let config = cluster_config(Some(server.base_url()), "/nonexistent/token");
    let provider = KubernetesStatusProvider::new(&config, &env(&[])).unwrap();

    let snapshot = provider.fetch("default", "job-1").await.unwrap();
    mock.assert_async().await;

    assert_eq!(snapshot.declared, vec!["app"]);
    assert!(snapshot.processes.is_empty());
}

#[tokio::test]
async fn test_kubernetes_fetch_not_found() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/namespaces/default/pods/missing");
            then.status(404).json_body(json!({
                "kind": "Status",
                "status": "Failure",
                "message": "pods \"missing\" not found",
                "reason": "NotFound",
                "code": 404
            }));
        })
        .await;

    let config = cluster_config(Some(server.base_url()), "/nonexistent/token");
    let provider = KubernetesStatusProvider::new(&config, &env(&[])).unwrap();

    match provider.fetch("default", "missing").await {
        Err(StatusError::NotFound { namespace, name }) => {
            assert_eq!(namespace, "default");
            assert_eq!(name, "missing");
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_kubernetes_fetch_api_error_uses_status_message() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/namespaces/default/pods/job-1");
            then.status(403).json_body(json!({
                "kind": "Status",
                "status": "Failure",
                "message": "pods \"job-1\" is forbidden",
                "reason": "Forbidden",
                "code": 403
            }));
        })
        .await;

    let config = cluster_config(Some(server.base_url()), "/nonexistent/token");
    let provider = KubernetesStatusProvider::new(&config, &env(&[])).unwrap();

    let err = provider.fetch("default", "job-1").await.unwrap_err();
    match &err {
        StatusError::Api { status, message } => {
            assert_eq!(*status, 403);
            assert_eq!(message, "pods \"job-1\" is forbidden");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_kubernetes_fetch_rejects_garbage() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/namespaces/default/pods/job-1");
            then.status(200).body("<html>not a pod</html>");
        })
        .await;

    let config = cluster_config(Some(server.base_url()), "/nonexistent/token");
    let provider = KubernetesStatusProvider::new(&config, &env(&[])).unwrap();

    assert!(matches!(
        provider.fetch("default", "job-1").await,
        Err(StatusError::Decode(_))
    ));
}

#[test]
fn test_resolve_api_url_from_service_env() {
    let config = cluster_config(None, "/nonexistent/token");

    let url = resolve_api_url(
        &config,
        &env(&[
            ("KUBERNETES_SERVICE_HOST", "10.96.0.1"),
            ("KUBERNETES_SERVICE_PORT", "6443"),
        ]),
    )
    .unwrap();
    assert_eq!(url.as_str(), "https://10.96.0.1:6443/");

    let url = resolve_api_url(
        &config,
        &env(&[
            ("KUBERNETES_SERVICE_HOST", "fd00::1"),
            ("KUBERNETES_SERVICE_PORT", "6443"),
        ]),
    )
    .unwrap();
    assert_eq!(url.as_str(), "https://[fd00::1]:6443/");
}

#[test]
fn test_resolve_api_url_prefers_configuration() {
    let config = cluster_config(
        Some("http://127.0.0.1:8001".to_string()),
        "/nonexistent/token",
    );
    let url = resolve_api_url(&config, &env(&[("KUBERNETES_SERVICE_HOST", "10.96.0.1")])).unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:8001/");
}

#[test]
fn test_resolve_api_url_outside_cluster() {
    let config = cluster_config(None, "/nonexistent/token");
    assert!(matches!(
        resolve_api_url(&config, &env(&[])),
        Err(StatusError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_mock_provider_replays_script() {
    let first = UnitSnapshot::new("job-1", ["app"]).with_process("app", LifecycleState::Running);
    let second = UnitSnapshot::new("job-1", ["app"])
        .with_process("app", LifecycleState::terminated("Completed"));

    let provider = MockStatusProvider::with_snapshots([first.clone()]);
    provider.push_error(StatusError::Api {
        status: 503,
        message: "unavailable".to_string(),
    });
    provider.push_snapshot(second.clone());

    assert_eq!(provider.fetch("default", "job-1").await.unwrap(), first);
    assert!(provider.fetch("default", "job-1").await.is_err());
    assert_eq!(provider.fetch("default", "job-1").await.unwrap(), second);
    // Script exhausted: the last snapshot repeats
    assert_eq!(provider.fetch("default", "job-1").await.unwrap(), second);
    assert_eq!(provider.fetch_count(), 4);
}

#[tokio::test]
async fn test_mock_provider_empty_script_is_not_found() {
    let provider = MockStatusProvider::new();
    assert!(matches!(
        provider.fetch("default", "job-1").await,
        Err(StatusError::NotFound { .. })
    ));
}

#[test]
fn test_lifecycle_state_display() {
    assert_eq!(LifecycleState::Running.to_string(), "running");
    assert_eq!(LifecycleState::Unknown.to_string(), "unknown");
    assert_eq!(
        LifecycleState::terminated("Completed").to_string(),
        "terminated (Completed)"
    );
    assert_eq!(
        LifecycleState::Terminated {
            reason: "Error".to_string(),
            exit_code: Some(137),
            finished_at: None,
        }
        .to_string(),
        "terminated (Error, exit code 137)"
    );
}

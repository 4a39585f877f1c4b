use cabinet_core::{ResultCode, WebResult};
use cabinet_gateway::{
    AppState, GatewayConfig, MemoryAuditSink, default_collaborators, routes,
    run_server_with_shutdown,
};
use reqwest::{Client, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const INDEX_HTML: &str = "<!doctype html><title>Cabinet</title>";

struct TestServer {
    base_url: String,
    audit: Arc<MemoryAuditSink>,
    _static_root: TempDir,
}

// Helper to spawn a server on a random port
async fn spawn_server(installed: bool) -> TestServer {
    let static_root = tempfile::tempdir().unwrap();
    std::fs::write(static_root.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(static_root.path().join("assets")).unwrap();
    std::fs::write(static_root.path().join("assets/app.css"), "body{}").unwrap();

    let config = GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        static_root: static_root.path().to_path_buf(),
        installed,
        ..Default::default()
    };

    let audit = Arc::new(MemoryAuditSink::new());
    let (collaborators, _worker) = default_collaborators(&config, audit.clone());
    let state = Arc::new(AppState::new(config, collaborators).unwrap());
    let app = routes::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        audit,
        _static_root: static_root,
    }
}

#[tokio::test]
async fn test_unclaimed_api_path_is_not_found() {
    let server = spawn_server(true).await;
    let client = Client::new();

    let res = client
        .post(format!("{}/api/account/login", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["pragma"], "no-cache");

    let result: WebResult = res.json().await.unwrap();
    assert_eq!(result.code, ResultCode::NotFound);
    assert!(result.msg.contains("login"));
}

#[tokio::test]
async fn test_root_serves_index_document() {
    let server = spawn_server(true).await;
    let client = Client::new();

    let res = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    assert_eq!(res.text().await.unwrap(), INDEX_HTML);
}

#[tokio::test]
async fn test_static_assets_and_spa_fallback() {
    let server = spawn_server(true).await;
    let client = Client::new();

    let res = client
        .get(format!("{}/assets/app.css", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/css");
    assert_eq!(res.text().await.unwrap(), "body{}");

    // Client-side routes resolve to the index document
    let res = client
        .get(format!("{}/files/shared/report", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), INDEX_HTML);
}

#[tokio::test]
async fn test_install_flow() {
    let server = spawn_server(false).await;
    let client = Client::new();

    // 1. Everything but the install routes is refused
    let res = client
        .get(format!("{}/api/status", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let result: WebResult = res.json().await.unwrap();
    assert_eq!(result.code, ResultCode::NotInstalled);

    // 2. Static assets stay reachable
    let res = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // 3. Finish installation
    let res = client
        .post(format!("{}/api/install/finish", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // 4. Post-install routes are live, pre-install routes are gone
    let res = client
        .get(format!("{}/api/status", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let result: WebResult = res.json().await.unwrap();
    assert_eq!(result.code, ResultCode::Ok);
    assert_eq!(result.data.unwrap()["service"], "cabinet");

    let res = client
        .post(format!("{}/api/install/finish", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_audit_matches_request_count() {
    let server = spawn_server(true).await;
    let client = Client::new();

    let paths = [
        "/",
        "/api/status",
        "/api/nope",
        "/assets/app.css",
        "/files/recent",
    ];
    for path in paths {
        client
            .get(format!("{}{}", server.base_url, path))
            .send()
            .await
            .unwrap();
    }

    let records = server
        .audit
        .wait_for(paths.len(), Duration::from_secs(5))
        .await;
    assert_eq!(records.len(), paths.len());
    assert!(records
        .iter()
        .all(|r| r.client_ip.as_deref() == Some("127.0.0.1")));
    assert!(records.iter().all(|r| r.request_id.is_some()));

    let failed: Vec<_> = records
        .iter()
        .filter(|r| !r.succeeded)
        .map(|r| r.path.as_str())
        .collect();
    assert_eq!(failed, vec!["/api/nope"]);
}

#[tokio::test]
async fn test_run_server_stops_on_signal() {
    let static_root = tempfile::tempdir().unwrap();
    let config = GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        static_root: static_root.path().to_path_buf(),
        ..Default::default()
    };

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(run_server_with_shutdown(config, async move {
        rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_ok());
}

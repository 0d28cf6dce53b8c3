//! `HttpRemoteClient` against a minimal in-process HTTP server.

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use scout_sync::features::sync::ConnectivityProbe;
use scout_sync::remote::{HttpClientConfig, HttpRemoteClient, RemoteClient, RemoteError};
use scout_sync::scouting::{MatchEntry, PitEntry};

struct Captured {
    head: String,
    body: String,
}

/// Serve exactly one request with a canned response and hand back what was
/// received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            assert!(n > 0, "connection closed before headers");
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let received = String::from_utf8_lossy(&buf[header_end..]).to_string();

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(Captured { head, body: received });
    });

    (format!("http://{addr}"), rx)
}

fn client(base_url: &str, token: Option<&str>) -> HttpRemoteClient {
    HttpRemoteClient::new(&HttpClientConfig {
        base_url: base_url.to_string(),
        token: token.map(str::to_string),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn create_pit_entry_posts_json_and_returns_id() {
    let (url, captured) = serve_once("201 Created", r#"{"id": 42}"#).await;
    let client = client(&url, Some("secret"));

    let mut entry = PitEntry::new("2026casj", 254);
    entry.drivetrain = Some("swerve".to_string());
    let id = client.create_pit_entry(&entry).await.unwrap();
    assert_eq!(id, 42);

    let request = captured.await.unwrap();
    assert!(request.head.starts_with("POST /api/pit-entries HTTP/1.1"));
    assert!(request
        .head
        .to_lowercase()
        .contains("authorization: bearer secret"));
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["teamNumber"], 254);
    assert_eq!(body["drivetrain"], "swerve");
}

#[tokio::test]
async fn update_match_entry_patches_by_remote_id() {
    let (url, captured) = serve_once("204 No Content", "").await;
    let client = client(&url, None);

    client
        .update_match_entry(17, &json!({"fouls": 2}))
        .await
        .unwrap();

    let request = captured.await.unwrap();
    assert!(request.head.starts_with("PATCH /api/match-entries/17 HTTP/1.1"));
    assert!(!request.head.to_lowercase().contains("authorization"));
}

#[tokio::test]
async fn unauthorized_status_is_classified() {
    let (url, _captured) = serve_once("401 Unauthorized", r#"{"error": "expired"}"#).await;
    let client = client(&url, Some("stale"));

    let err = client
        .create_match_entry(&MatchEntry::new("2026casj", 3, 971))
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::Unauthorized { status: 401 });
}

#[tokio::test]
async fn validation_rejection_keeps_server_message() {
    let (url, _captured) = serve_once("422 Unprocessable Entity", "teamNumber must be positive").await;
    let client = client(&url, None);

    let err = client
        .create_pit_entry(&PitEntry::new("2026casj", 254))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "rejected by server (HTTP 422): teamNumber must be positive"
    );
}

#[tokio::test]
async fn success_without_id_is_invalid_response() {
    let (url, _captured) = serve_once("200 OK", r#"{"ok": true}"#).await;
    let client = client(&url, None);

    let err = client
        .create_pit_entry(&PitEntry::new("2026casj", 254))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}

#[tokio::test]
async fn health_probe_reports_reachability() {
    let (url, captured) = serve_once("200 OK", "{}").await;
    let client = client(&url, None);

    assert!(client.is_reachable().await);
    assert!(captured
        .await
        .unwrap()
        .head
        .starts_with("GET /api/health HTTP/1.1"));
}

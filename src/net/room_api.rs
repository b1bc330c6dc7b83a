//! Room backend HTTP client
//!
//! Membership snapshot, launch replication over HTTP and the match start
//! trigger. Room lifecycle itself (create, verify, list) stays with the backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::net::protocol::{ActionPayload, ProtocolError, RoomMessage, RoomSnapshot, TYPE_START};
use crate::net::sync::LaunchSink;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Room API errors
#[derive(Debug, thiserror::Error)]
pub enum RoomApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("room API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Client for one room on the backend
#[derive(Debug, Clone)]
pub struct RoomApiClient {
    client: Client,
    base_url: String,
    room_id: String,
}

impl RoomApiClient {
    pub fn new(base_url: impl Into<String>, room_id: impl Into<String>) -> Result<Self, RoomApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            room_id: room_id.into(),
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rooms/{}/{}", self.base_url, self.room_id, path)
    }

    /// Current room membership
    pub async fn fetch_members(&self) -> Result<RoomSnapshot, RoomApiError> {
        let response = self.client.get(self.endpoint("join")).send().await?;
        let response = check_status(response).await?;
        let snapshot: RoomSnapshot = response.json().await?;
        debug!(room_id = %self.room_id, members = snapshot.users.len(), "Fetched room members");
        Ok(snapshot)
    }

    /// Replicate a launch through the backend instead of the socket
    pub async fn send_action(&self, action: ActionPayload) -> Result<(), RoomApiError> {
        let body = RoomMessage::Action(action).encode()?;
        let response = self
            .client
            .post(self.endpoint("action"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Ask the backend to broadcast `start` to the room
    pub async fn start_match(&self) -> Result<(), RoomApiError> {
        let response = self
            .client
            .post(self.endpoint("start"))
            .json(&serde_json::json!({ "type": TYPE_START }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RoomApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RoomApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Launch sink posting each launch to the room API
///
/// Every launch is sent from its own task; failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct HttpLaunchSink {
    client: Arc<RoomApiClient>,
    runtime: Handle,
}

impl HttpLaunchSink {
    pub fn new(client: Arc<RoomApiClient>, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl LaunchSink for HttpLaunchSink {
    fn send_launch(&self, action: ActionPayload) {
        let client = Arc::clone(&self.client);
        self.runtime.spawn(async move {
            let player_id = action.id.clone();
            if let Err(e) = client.send_action(action).await {
                warn!(player_id = %player_id, error = %e, "Launch replication failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP responder returning the raw request it saw
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_fetch_members() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"users":[{"userId":"a","iconUrl":"","cd":1000,"power":10,"weight":20,"volume":30,"point":[50,60]}]}"#,
        )
        .await;
        let client = RoomApiClient::new(format!("{base}/"), "r1").unwrap();

        let snapshot = client.fetch_members().await.unwrap();

        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].user_id, "a");
        assert!(server.await.unwrap().starts_with("GET /rooms/r1/join "));
    }

    #[tokio::test]
    async fn test_send_action_posts_envelope() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let client = RoomApiClient::new(base, "r1").unwrap();

        tokio_test::assert_ok!(client.send_action(ActionPayload::launch("me".to_string(), 1.0, 42.0)).await);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /rooms/r1/action "));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let decoded = RoomMessage::decode(body).unwrap();
        assert_eq!(decoded, RoomMessage::Action(ActionPayload::launch("me".to_string(), 1.0, 42.0)));
    }

    #[tokio::test]
    async fn test_start_match_body() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let client = RoomApiClient::new(base, "r1").unwrap();

        client.start_match().await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /rooms/r1/start "));
        assert!(request.ends_with(r#"{"type":"start"}"#));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base, server) = serve_once("404 Not Found", r#"{"error":"no room"}"#).await;
        let client = RoomApiClient::new(base, "missing").unwrap();

        let err = client.fetch_members().await.unwrap_err();

        assert!(matches!(err, RoomApiError::Status { status: 404, .. }));
        server.await.unwrap();
    }
}

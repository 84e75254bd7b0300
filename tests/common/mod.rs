//! In-process stand-in for the recognition service.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use scansheet::common::config::{
    CryptoConfig, OutputConfig, PipelineConfig, ScanConfig, ServiceConfig,
};
use scansheet::common::messages::{RequestEnvelope, ResponseEnvelope, ScanRequest};
use scansheet::processing::codec::{Codec, KEY_LEN};

pub const TOKEN: &str = "test-token";
pub const KEY: [u8; KEY_LEN] = [5u8; KEY_LEN];

pub fn key_base64() -> String {
    general_purpose::STANDARD.encode(KEY)
}

pub fn codec() -> Codec {
    Codec::new(&KEY).unwrap()
}

/// What the mock answers to every request.
#[derive(Clone)]
pub enum Reply {
    /// 200 with `{"table": seal(plaintext)}`
    Table(String),
    /// 200 with `{"table": seal(plaintext)}` sealed under another key
    ForeignTable(String),
    /// Given status with a short JSON error body
    Status(u16),
    /// 200 with exactly these bytes
    Raw(Vec<u8>),
    /// Sleep, then 200 with an empty object
    Slow(Duration),
    /// 307 back to the same endpoint, forever
    RedirectLoop,
}

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct Captured {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub request: Option<ScanRequest>,
}

struct MockState {
    reply: Reply,
    captured: Mutex<Vec<Captured>>,
}

pub struct MockService {
    pub url: String,
    state: Arc<MockState>,
}

impl MockService {
    pub async fn start(reply: Reply) -> Self {
        let state = Arc::new(MockState {
            reply,
            captured: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/process-image", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/process-image", addr),
            state,
        }
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.state.captured.lock().unwrap().clone()
    }
}

async fn handle(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    let get_header = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = serde_json::from_slice::<RequestEnvelope>(&body)
        .ok()
        .and_then(|envelope| general_purpose::STANDARD.decode(envelope.payload).ok())
        .and_then(|sealed| codec().open(&sealed).ok())
        .and_then(|plaintext| serde_json::from_slice::<ScanRequest>(&plaintext).ok());
    state.captured.lock().unwrap().push(Captured {
        authorization: get_header(header::AUTHORIZATION),
        content_type: get_header(header::CONTENT_TYPE),
        request,
    });

    match &state.reply {
        Reply::Table(plaintext) => sealed_table(&codec(), plaintext),
        Reply::ForeignTable(plaintext) => sealed_table(&Codec::new(&[6u8; KEY_LEN]).unwrap(), plaintext),
        Reply::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            r#"{"detail":"rejected"}"#.to_string(),
        )
            .into_response(),
        Reply::Raw(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        Reply::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            (StatusCode::OK, "{}".to_string()).into_response()
        }
        Reply::RedirectLoop => Redirect::temporary("/process-image").into_response(),
    }
}

/// Accepts one request and answers 200 with a body shorter than its
/// declared `Content-Length`, then closes the connection.
pub async fn start_truncating_service() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"table\":")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{}/process-image", addr)
}

/// Drains one HTTP request (headers plus `Content-Length` body).
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut received = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        received.extend_from_slice(&chunk[..n]);
        let Some(end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= end + 4 + length {
            return;
        }
    }
}

fn sealed_table(codec: &Codec, plaintext: &str) -> Response {
    let envelope = ResponseEnvelope::wrap(&codec.seal(plaintext.as_bytes()).unwrap());
    (StatusCode::OK, serde_json::to_string(&envelope).unwrap()).into_response()
}

pub fn config(endpoint: &str, output: &Path) -> PipelineConfig {
    PipelineConfig {
        service: ServiceConfig {
            endpoint: endpoint.to_string(),
            auth_token: TOKEN.to_string(),
            timeout_secs: 60,
        },
        crypto: CryptoConfig {
            key_base64: key_base64(),
        },
        output: OutputConfig {
            directory: output.to_path_buf(),
            file_prefix: "ficha_cadastro_".to_string(),
        },
        scan: ScanConfig::default(),
    }
}

/// Reads a persisted table, checking and stripping the BOM.
pub fn read_table(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..3], b"\xEF\xBB\xBF", "missing byte-order marker");
    String::from_utf8(bytes[3..].to_vec()).unwrap()
}

/// Number of entries in `dir`, zero if it does not exist.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use assert_cmd::Command;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use ownerping::fernet::FernetKey;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct Script {
    statuses: Vec<u16>,
    hits: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Webhook endpoint answering each request with the next scripted status
/// (the last one repeats).
pub struct MockWebhook {
    addr: SocketAddr,
    script: Arc<Script>,
}

impl MockWebhook {
    pub fn start(statuses: &[u16]) -> Self {
        let script = Arc::new(Script {
            statuses: statuses.to_vec(),
            ..Script::default()
        });
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&script));
        Self {
            addr: serve(app),
            script,
        }
    }

    /// Records requests but never answers.
    pub fn silent() -> Self {
        let script = Arc::new(Script::default());
        let app = Router::new()
            .fallback(hang)
            .with_state(Arc::clone(&script));
        Self {
            addr: serve(app),
            script,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1/spaces/", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().unwrap().clone()
    }
}

/// Records the request before answering so callers see it once the client returns.
async fn record(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let hit = script.push(method, uri, headers, body);
    let status = script
        .statuses
        .get(hit)
        .or(script.statuses.last())
        .copied()
        .unwrap_or(200);
    StatusCode::from_u16(status).expect("scripted status")
}

async fn hang(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    script.push(method, uri, headers, body);
    std::future::pending().await
}

impl Script {
    /// Returns the zero-based index of this request.
    fn push(&self, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> usize {
        let hit = self.hits.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            target: uri.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        hit
    }
}

/// Serves `app` on a loopback port from its own runtime, so both blocking
/// CLI tests and `#[tokio::test]`s can use it.
fn serve(app: Router) -> SocketAddr {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("mock runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind listener");
            tx.send(listener.local_addr().expect("local addr"))
                .expect("report addr");
            axum::serve(listener, app).await.expect("serve mock");
        });
    });
    rx.recv().expect("mock webhook address")
}

pub const TABLE: &str = "gh-username,wso2-id\nalice,U123\nbob,U456\n";

/// A scratch repository checkout: CODEOWNERS, encrypted table and config.
pub struct Workspace {
    pub dir: TempDir,
    pub key: FernetKey,
}

impl Workspace {
    pub fn new(codeowners: &str, table: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let key = FernetKey::generate();

        fs::create_dir_all(dir.path().join(".github")).unwrap();
        fs::write(dir.path().join(".github/CODEOWNERS"), codeowners).unwrap();
        fs::write(
            dir.path().join("github_users_encrypted.csv"),
            key.encrypt(table.as_bytes()),
        )
        .unwrap();

        Self { dir, key }
    }

    pub fn write_config(&self, base_url: &str, retries: u32, timeout_secs: u64) {
        let toml = format!(
            r#"[webhook]
base_url = "{base_url}"
retries = {retries}
retry_delay_ms = 10
timeout_secs = {timeout_secs}
"#
        );
        fs::write(self.dir.path().join("ownerping.toml"), toml).unwrap();
    }

    pub fn decrypted_exists(&self) -> bool {
        self.dir.path().join("github_users_decrypted.csv").exists()
    }

    /// `ownerping` running inside the workspace with every secret set.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ownerping").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env_remove("LOG_FORMAT")
            .env("ENV_USER_ENCRYPTION_KEY", self.key.to_base64())
            .env("ENV_NOTIFICATIONS_CHAT_ID", "SPACE1")
            .env("ENV_NOTIFICATIONS_CHAT_KEY", "chat-key")
            .env("ENV_NOTIFICATIONS_CHAT_TOKEN", "chat-token");
        cmd
    }
}

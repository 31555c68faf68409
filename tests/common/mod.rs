use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use submission_receiver::config::Config;
use submission_receiver::notify::{Notification, Notifier, NotifyError};
use submission_receiver::state::AppState;
use submission_receiver::store::SubmissionStore;

/// A running test server writing to its own temporary data directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub log_path: PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a JSON body to /submit, return (body, status).
    pub async fn submit_json(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/submit"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// POST an arbitrary body to /submit, return (body, status).
    pub async fn submit_raw(&self, content_type: &str, body: impl Into<reqwest::Body>) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/submit"))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .expect("submit raw failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Write a complete JSON POST on a raw socket and hang up without
    /// waiting for the response.
    pub async fn submit_and_disconnect(&self, data: &Value) {
        let body = data.to_string();
        let request = format!(
            "POST /submit HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            self.addr,
            body.len(),
            body
        );

        let mut stream = TcpStream::connect(self.addr).await.expect("connect failed");
        stream.write_all(request.as_bytes()).await.expect("write failed");
        let _ = stream.shutdown().await;
    }

    /// Every record currently in the log, in file order.
    pub fn records(&self) -> Vec<Value> {
        read_records(&self.log_path)
    }
}

pub fn read_records(path: &PathBuf) -> Vec<Value> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is not JSON"))
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => panic!("cannot read log: {e}"),
    }
}

/// One observed delivery attempt.
#[derive(Debug)]
pub struct Attempt {
    pub notification: Notification,
    /// Records already in the log when the attempt was made.
    pub records_at_send: usize,
}

/// Notifier that reports every attempt on a channel instead of sending mail.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<Attempt>,
    log_path: PathBuf,
    fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let _ = self.tx.send(Attempt {
            notification: notification.clone(),
            records_at_send: read_records(&self.log_path).len(),
        });
        if self.fail {
            Err("connection refused".into())
        } else {
            Ok(())
        }
    }
}

pub enum FakeNotifier {
    Absent,
    Working,
    Failing,
}

pub struct TestOptions {
    pub notifier: FakeNotifier,
    /// Make the data directory path uncreatable.
    pub unwritable: bool,
    pub max_body_size: usize,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            notifier: FakeNotifier::Absent,
            unwritable: false,
            max_body_size: 512 * 1024,
        }
    }
}

/// Spawn a test app with no notifier configured.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await.0
}

/// Spawn a test app; the receiver yields every notification attempt.
pub async fn spawn_app_with(options: TestOptions) -> (TestApp, mpsc::UnboundedReceiver<Attempt>) {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");

    let data_dir = if options.unwritable {
        // A regular file where a directory is expected fails even for root.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        blocker.join("data")
    } else {
        tmp.path().join("data")
    };

    let config = Config {
        data_dir: data_dir.clone(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        max_body_size: options.max_body_size,
        trusted_proxies: vec![],
        log_level: "warn".to_string(),
        smtp: None,
    };

    let store = SubmissionStore::new(&data_dir);
    let log_path = store.path().to_path_buf();

    let (tx, rx) = mpsc::unbounded_channel();
    let notifier: Option<Arc<dyn Notifier>> = match options.notifier {
        FakeNotifier::Absent => None,
        FakeNotifier::Working | FakeNotifier::Failing => Some(Arc::new(RecordingNotifier {
            tx,
            log_path: log_path.clone(),
            fail: matches!(options.notifier, FakeNotifier::Failing),
        })),
    };

    let app = submission_receiver::router(Arc::new(AppState {
        config,
        store,
        notifier,
    }));

    let addr = serve(app).await;

    (
        TestApp {
            addr,
            client: Client::builder().build().unwrap(),
            log_path,
            _tmp: tmp,
        },
        rx,
    )
}

/// Spawn the app the binary would build from `config`, with `data_dir`
/// pointed at a temporary directory.
#[allow(dead_code)]
pub async fn spawn_configured(mut config: Config) -> TestApp {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    config.data_dir = tmp.path().join("data");
    let log_path = SubmissionStore::new(&config.data_dir).path().to_path_buf();

    let addr = serve(submission_receiver::build_app(config)).await;

    TestApp {
        addr,
        client: Client::builder().build().unwrap(),
        log_path,
        _tmp: tmp,
    }
}

/// Bind to a random port and serve `app` in the background.
async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    addr
}

/// Poll the log until its length stops changing.
#[allow(dead_code)]
pub async fn settled_records(app: &TestApp) -> Vec<Value> {
    let mut last = app.records().len();
    loop {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let records = app.records();
        if records.len() == last {
            return records;
        }
        last = records.len();
    }
}

/// Wait briefly for the next notification attempt.
pub async fn next_attempt(rx: &mut mpsc::UnboundedReceiver<Attempt>) -> Option<Attempt> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Assert that no attempt shows up within a short grace period.
pub async fn assert_no_attempt(rx: &mut mpsc::UnboundedReceiver<Attempt>) {
    let attempt = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(
        !matches!(attempt, Ok(Some(_))),
        "unexpected notification attempt: {attempt:?}"
    );
}

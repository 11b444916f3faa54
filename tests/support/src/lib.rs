//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support" }
//! ```
//!
//! Then in tests:
//! ```rust
//! use test_support::{init_tracing, StubServer};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let server = StubServer::start(|_target| (200, "{}".to_string()));
//!     let _base = server.url();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Environment keys the binary reads; cleared by [`cmd_bin`] so a developer's
/// `.env` or shell never leaks into a test run.
pub const APP_ENV_KEYS: &[&str] = &[
    "AIRTABLE_TOKEN",
    "AIRTABLE_API_URL",
    "AIRTABLE_BASE_ID",
    "AIRTABLE_VOLUNTEERS_TABLE",
    "AIRTABLE_ATTENDANCE_TABLE",
    "APRICOT_USERNAME",
    "APRICOT_PASSWORD",
    "APRICOT_BASE_URL",
];

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Example:
/// ```no_run
/// use test_support::cmd_bin;
/// use predicates::prelude::*;
///
/// let mut cmd = cmd_bin("my-cli");
/// cmd.arg("--help").assert().success().stdout(predicate::str::contains("Usage"));
/// ```
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    for k in APP_ENV_KEYS {
        cmd.env_remove(k);
    }
    cmd
}

// --- Stub HTTP server ---

type Handler = Arc<dyn Fn(&str) -> (u16, String) + Send + Sync>;

/// One request seen by [`StubServer`]: request target plus lower-cased headers.
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str())
    }
}

/// Blocking HTTP/1.1 stub on 127.0.0.1. Every connection gets one response
/// from `handler(target)` and is closed.
pub struct StubServer {
    addr: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl StubServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("local addr").to_string();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handler: Handler = Arc::new(handler);

        let worker = {
            let seen = Arc::clone(&seen);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Ok(stream) = stream {
                        serve(stream, &handler, &seen);
                    }
                }
            })
        };

        Self {
            addr,
            seen,
            stop,
            worker: Some(worker),
        }
    }

    /// Base url, e.g. `http://127.0.0.1:40123`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // unblock accept()
        let _ = TcpStream::connect(&self.addr);
        if let Some(w) = self.worker.take() {
            let _ = w.join();
        }
    }
}

fn serve(stream: TcpStream, handler: &Handler, seen: &Mutex<Vec<SeenRequest>>) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() || request_line.is_empty() {
        return;
    }
    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
        }
    }

    seen.lock().unwrap().push(SeenRequest {
        target: target.clone(),
        headers,
    });

    let (status, body) = handler(&target);
    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.flush();
}

#![allow(dead_code)]

pub mod fake_tool;

use infratest::suite::TestCase;
use std::io;
use std::sync::{Arc, Mutex, Once};
use std::time::Instant;
use tracing::info;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        infratest::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

/// Log lines written by the current thread while a closure runs.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}

/// Start a live suite test with logging already initialized.
pub fn live_case(name: &str) -> TestCase {
    init_test_logging();
    TestCase::start(name)
}

/// Config and a terraform-backed harness for live suites.
pub fn live_harness() -> (infratest::HarnessConfig, infratest::Harness) {
    init_test_logging();
    let config = infratest::HarnessConfig::from_env().expect("load config");
    let harness = infratest::Harness::terraform(&config);
    (config, harness)
}

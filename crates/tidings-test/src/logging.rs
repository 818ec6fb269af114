//! Tracing helpers for tests.

use std::io;
use std::sync::{Arc, Mutex, Once};

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

static INIT: Once = Once::new();

/// Install a global test subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Output goes through the test
/// harness so it is only shown for failing tests.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Captures formatted tracing output produced inside a closure.
///
/// ```rust
/// use tidings_test::LogCapture;
///
/// let capture = LogCapture::new();
/// capture.capture(tracing::Level::WARN, || tracing::warn!(event = "tick", "too many"));
/// assert!(capture.contains("too many"));
/// assert_eq!(capture.count("WARN"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with a thread-local subscriber writing into this capture.
    pub fn capture<R>(&self, level: Level, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(level)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    /// Everything captured so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|guard| String::from_utf8_lossy(&guard).into_owned())
            .unwrap_or_default()
    }

    /// Check whether the captured output contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    /// Number of occurrences of `needle` in the captured output.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

/// Writer handed out by [`LogCapture`] for each formatted event.
#[derive(Debug)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .buffer
            .lock()
            .map_err(|_| io::Error::other("log capture lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

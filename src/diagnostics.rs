//! Diagnostic capture for parser invocations.
//!
//! Plugins receive an explicit sink instead of writing to ambient output
//! streams. Whatever a plugin writes during the invocation window is
//! buffered here and becomes the body of the error reply when the job
//! fails, so plugin authors are not required to return structured errors.

use std::sync::Mutex;

/// Collects freeform diagnostic text written by plugins during one job's
/// parser-invocation window.
///
/// One sink exists per job; it is created before the first sub-parser call
/// and drained after dispatch returns.
pub struct DiagnosticSink {
    buffer: Mutex<String>,
}

impl DiagnosticSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(String::new()),
        }
    }

    /// Append one line of diagnostic text.
    ///
    /// A trailing newline is added if the text does not end with one.
    pub fn write(&self, text: &str) {
        let mut buffer = self.buffer.lock().expect("diagnostic buffer lock");
        buffer.push_str(text);
        if !text.ends_with('\n') {
            buffer.push('\n');
        }
    }

    /// Check whether anything has been captured
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().expect("diagnostic buffer lock").is_empty()
    }

    /// Get a copy of the captured text without draining the sink
    pub fn contents(&self) -> String {
        self.buffer.lock().expect("diagnostic buffer lock").clone()
    }

    /// Drain the sink, returning everything captured so far
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock().expect("diagnostic buffer lock"))
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

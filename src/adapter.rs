//! Test framework adapter seam
//!
//! The client knows nothing about any particular test framework. A
//! framework adapter supplies asset evaluation and the `start` hook at
//! construction time, and reports progress back through a
//! [`FrameworkHandle`].

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::common::{Error, Result};
use crate::run::{Asset, SharedExecutionEnvironment};

/// Capability a test-framework adapter provides to the orchestrator
///
/// Injected at client construction. The defaults let a client be built
/// without an adapter, but a run cannot proceed past asset execution:
/// [`TestAdapter::start`] fails with [`Error::AdapterNotImplemented`]
/// unless overridden.
pub trait TestAdapter: Send {
    /// Evaluate one asset in the shared execution environment
    ///
    /// Assets may install globals consumed by later assets; the same
    /// environment instance is passed for every asset of a run. The default
    /// treats evaluation as a no-op; adapters embedding a script engine
    /// override this.
    fn execute_asset(
        &mut self,
        env: &mut SharedExecutionEnvironment,
        asset: &Asset,
    ) -> Result<()> {
        let _ = (env, asset);
        Ok(())
    }

    /// Begin the test run, called after every asset has executed
    fn start(&mut self, config: &Value) -> Result<()> {
        let _ = config;
        Err(Error::AdapterNotImplemented)
    }
}

/// Adapter placeholder for clients built without a framework bridge
#[derive(Debug, Default)]
pub struct UnimplementedAdapter;

impl TestAdapter for UnimplementedAdapter {}

/// Messages a framework adapter pushes into the client loop
#[derive(Debug, Clone)]
pub enum FrameworkMessage {
    /// Informational payload; may carry the run's `total` test count
    Info(Value),
    /// One raw test result
    Result(Value),
    /// Framework-driven run completion
    Complete(Option<Value>),
    /// Uncaught error; terminates the current run
    Error(ErrorReport),
}

/// Cloneable handle the framework adapter uses to report progress
///
/// Messages are queued and processed by the client's dispatch loop in
/// order, one at a time.
#[derive(Debug, Clone)]
pub struct FrameworkHandle {
    tx: mpsc::UnboundedSender<FrameworkMessage>,
}

impl FrameworkHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<FrameworkMessage>) -> Self {
        Self { tx }
    }

    /// Report one raw test result
    pub fn result(&self, result: Value) {
        self.push(FrameworkMessage::Result(result));
    }

    /// Report an informational payload
    pub fn info(&self, info: Value) {
        self.push(FrameworkMessage::Info(info));
    }

    /// Signal run completion
    pub fn complete(&self, result: Option<Value>) {
        self.push(FrameworkMessage::Complete(result));
    }

    /// Report an uncaught error
    ///
    /// Always returns `false` so a host-platform global error hook can
    /// return this value to suppress its default handling.
    pub fn error(&self, report: ErrorReport) -> bool {
        self.push(FrameworkMessage::Error(report));
        false
    }

    fn push(&self, message: FrameworkMessage) {
        if self.tx.send(message).is_err() {
            warn!("Framework message dropped: client loop is gone");
        }
    }
}

/// An uncaught error as delivered by a host-platform error hook
#[derive(Debug, Clone, Default)]
pub struct ErrorReport {
    /// Base error text
    pub message: String,
    /// Source file or URL, if known
    pub source: Option<String>,
    /// Line number, if known
    pub line: Option<u32>,
    /// Column number, if known
    pub col: Option<u32>,
    /// Stack trace, if an error object was available
    pub stack: Option<String>,
}

impl ErrorReport {
    /// Create a report carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Compose the full message text
    ///
    /// Appends `\nat <source>:<line>:<col>` with absent components
    /// omitted, then the stack trace separated by a blank line.
    pub fn format_message(&self) -> String {
        let mut location = String::new();
        if let Some(source) = &self.source {
            location.push_str(source);
        }
        if let Some(line) = self.line {
            location.push_str(&format!(":{}", line));
        }
        if let Some(col) = self.col {
            location.push_str(&format!(":{}", col));
        }

        let mut message = self.message.clone();
        if !location.is_empty() {
            message.push_str("\nat ");
            message.push_str(&location);
        }
        if let Some(stack) = &self.stack {
            message.push_str("\n\n");
            message.push_str(stack);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_full_location() {
        let report = ErrorReport {
            message: "boom".to_string(),
            source: Some("file.js".to_string()),
            line: Some(3),
            col: Some(7),
            stack: None,
        };
        assert_eq!(report.format_message(), "boom\nat file.js:3:7");
    }

    #[test]
    fn omits_absent_column() {
        let report = ErrorReport {
            message: "boom".to_string(),
            source: Some("file.js".to_string()),
            line: Some(3),
            col: None,
            stack: None,
        };
        assert_eq!(report.format_message(), "boom\nat file.js:3");
    }

    #[test]
    fn omits_location_entirely_without_line_fields() {
        let report = ErrorReport {
            message: "boom".to_string(),
            source: None,
            line: None,
            col: None,
            stack: None,
        };
        assert_eq!(report.format_message(), "boom");
    }

    #[test]
    fn appends_stack_after_blank_line() {
        let report = ErrorReport {
            message: "boom".to_string(),
            source: Some("file.js".to_string()),
            line: Some(3),
            col: Some(7),
            stack: Some("at run (file.js:3:7)".to_string()),
        };
        assert_eq!(
            report.format_message(),
            "boom\nat file.js:3:7\n\nat run (file.js:3:7)"
        );
    }
}

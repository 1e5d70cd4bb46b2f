//! Diagnostic events
//!
//! Every resolution, allocation and invocation failure is reported as a
//! structured [`Diagnostic`] to a [`DiagnosticSink`]. Reporting is a side
//! channel: it never changes what an operation returns.

use ember_sdk::{BridgeError, ErrorKind};
use parking_lot::Mutex;
use std::fmt;

/// Log target used for all bridge output
pub const LOG_TARGET: &str = "ember";

/// One reported failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The operation that failed (e.g. "resolve_class", "parallelize()")
    pub operation: String,
    /// Failure classification
    pub kind: ErrorKind,
    /// Human-readable message naming the class/method/signature involved
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(operation: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a diagnostic describing `error`
    pub fn from_error(operation: impl Into<String>, error: &BridgeError) -> Self {
        Self::new(operation, error.kind(), error.to_string())
    }

    /// Whether this diagnostic reports a process-fatal failure
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Environment
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)
    }
}

/// Receiver of diagnostic events.
///
/// Shared by every thread using a bridge, hence `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    /// Record one diagnostic
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        if diagnostic.is_fatal() {
            log::error!(target: LOG_TARGET, "{}", diagnostic);
        } else {
            log::warn!(target: LOG_TARGET, "{}", diagnostic);
        }
    }
}

/// Records diagnostics in memory so callers can inspect them.
#[derive(Debug, Default)]
pub struct CapturingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl CapturingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded diagnostics
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Number of recorded diagnostics of the given kind
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.events.lock().iter().filter(|d| d.kind == kind).count()
    }

    /// Whether any recorded diagnostic came from `operation`
    pub fn has_operation(&self, operation: &str) -> bool {
        self.events.lock().iter().any(|d| d.operation == operation)
    }
}

impl DiagnosticSink for CapturingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        log::debug!(target: LOG_TARGET, "captured: {}", diagnostic);
        self.events.lock().push(diagnostic.clone());
    }
}

//! Environment acquisition
//!
//! An [`Env`] is the calling thread's capability into the managed runtime.
//! It is acquired at the start of every bridge operation and dropped at the
//! end; nothing keeps it across calls, because a thread may be detached and
//! reattached in between. Every lower layer (resolver, marshaller, invocation,
//! exception propagation) is an `impl Env` block taking it as `&self`.

use crate::diagnostics::{Diagnostic, DiagnosticSink, LOG_TARGET};
use ember_sdk::{BridgeError, BridgeResult, ManagedEnv, ManagedRuntime};
use std::fmt;

/// A thread's attached environment plus the sink failures are reported to.
///
/// Not `Send`: an environment belongs to the thread that acquired it.
pub struct Env<'a> {
    raw: Box<dyn ManagedEnv + 'a>,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> Env<'a> {
    /// Acquire the calling thread's environment, attaching it if needed.
    ///
    /// Failure is reported and returned as [`BridgeError::Environment`].
    pub fn try_acquire(
        runtime: &'a dyn ManagedRuntime,
        sink: &'a dyn DiagnosticSink,
    ) -> BridgeResult<Self> {
        match runtime.attach_current_thread() {
            Ok(raw) => {
                log::trace!(target: LOG_TARGET, "environment acquired from {}", runtime.name());
                Ok(Self { raw, sink })
            }
            Err(err) => {
                let err = match err {
                    BridgeError::Environment(_) => err,
                    other => BridgeError::Environment(other.to_string()),
                };
                sink.emit(&Diagnostic::from_error("acquire_environment", &err));
                Err(err)
            }
        }
    }

    /// Acquire the calling thread's environment, aborting the process if
    /// the thread cannot be attached.
    pub fn acquire(runtime: &'a dyn ManagedRuntime, sink: &'a dyn DiagnosticSink) -> Self {
        match Self::try_acquire(runtime, sink) {
            Ok(env) => env,
            Err(err) => {
                log::error!(target: LOG_TARGET, "unrecoverable: {}", err);
                std::process::abort();
            }
        }
    }

    /// The backend primitives behind this environment
    pub fn raw(&self) -> &dyn ManagedEnv {
        self.raw.as_ref()
    }

    /// The sink failures are reported to
    pub fn sink(&self) -> &dyn DiagnosticSink {
        self.sink
    }

    /// Report `error` against `operation` and hand it back.
    pub(crate) fn report(&self, operation: &str, error: BridgeError) -> BridgeError {
        self.sink.emit(&Diagnostic::from_error(operation, &error));
        error
    }
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").finish_non_exhaustive()
    }
}

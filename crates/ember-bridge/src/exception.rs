//! Exception propagation
//!
//! A managed call that throws returns null and leaves the exception pending
//! in the thread's environment. Until it is cleared, any further call into
//! that environment is undefined behavior. [`Env::check_and_clear`] must
//! therefore run after every call whose result may be null because of a
//! throw; [`Env::checked`] folds that check and the null test into one step.

use crate::diagnostics::LOG_TARGET;
use crate::env::Env;
use ember_sdk::{BridgeError, BridgeResult, ObjectRef};
use std::fmt;

/// Description used when the managed runtime cannot render its own exception
pub const UNDESCRIBED_EXCEPTION: &str = "<exception could not be described>";

/// A captured, already-cleared managed exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionDescription(String);

impl ExceptionDescription {
    /// The managed runtime's rendering of the exception
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the rendering
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExceptionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Env<'_> {
    /// Capture and clear the pending exception, if any.
    ///
    /// Returns `None` when nothing was pending. After this returns the
    /// environment has no exception pending, whatever happened while
    /// rendering the description.
    pub fn check_and_clear(&self) -> Option<ExceptionDescription> {
        let raw = self.raw();
        if !raw.exception_check() {
            return None;
        }

        let throwable = raw.exception_occurred();
        raw.exception_clear();

        let rendered = if throwable.is_null() {
            None
        } else {
            raw.describe_throwable(throwable)
        };

        let description = match rendered {
            Some(text) => text,
            None => {
                // toString() itself may have thrown
                if raw.exception_check() {
                    raw.exception_clear();
                }
                UNDESCRIBED_EXCEPTION.to_string()
            }
        };

        log::debug!(target: LOG_TARGET, "cleared managed exception: {}", description);
        Some(ExceptionDescription(description))
    }

    /// Check the outcome of an object-returning call.
    ///
    /// A pending exception wins over the returned value: it is cleared and
    /// reported as [`BridgeError::ManagedException`]. Otherwise a null result
    /// is reported as [`BridgeError::NullResult`].
    pub fn checked(&self, operation: &str, result: ObjectRef) -> BridgeResult<ObjectRef> {
        if let Some(exception) = self.check_and_clear() {
            return Err(self.report(
                operation,
                BridgeError::ManagedException {
                    operation: operation.to_string(),
                    description: exception.into_string(),
                },
            ));
        }
        match result.non_null() {
            Some(obj) => Ok(obj),
            None => Err(self.report(
                operation,
                BridgeError::NullResult {
                    operation: operation.to_string(),
                },
            )),
        }
    }

    /// Check the outcome of a call that returns nothing (region copies).
    pub fn ensure_clear(&self, operation: &str) -> BridgeResult<()> {
        match self.check_and_clear() {
            Some(exception) => Err(self.report(
                operation,
                BridgeError::ManagedException {
                    operation: operation.to_string(),
                    description: exception.into_string(),
                },
            )),
            None => Ok(()),
        }
    }

    /// Clear whatever a failed lookup or allocation left pending. The
    /// caller reports the failure itself; the exception is only logged.
    pub(crate) fn discard_pending(&self, operation: &str) {
        if let Some(exception) = self.check_and_clear() {
            log::debug!(target: LOG_TARGET, "{}: discarded {}", operation, exception);
        }
    }
}

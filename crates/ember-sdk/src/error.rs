//! Error types for the Ember bridge

use crate::value::MethodKind;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Coarse classification of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Class or method lookup failed
    Resolution,
    /// Managed array or object allocation failed
    Allocation,
    /// A managed call threw
    ManagedException,
    /// A managed call returned null without throwing
    NullResult,
    /// A null handle was passed into an operation
    NullHandle,
    /// The calling thread could not be attached
    Environment,
    /// The process-wide runtime slot was misused
    Lifecycle,
}

/// Bridge error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// Class lookup failed
    #[error("Couldn't find class {class}")]
    ClassNotFound {
        /// Fully-qualified, slash-separated class name
        class: String,
    },

    /// Method lookup failed
    #[error("Couldn't find {kind} {name} with signature {signature}")]
    MethodNotFound {
        /// Method name
        name: String,
        /// Descriptor string as given
        signature: String,
        /// Static or instance lookup
        kind: MethodKind,
    },

    /// Managed allocation failed
    #[error("{what} of size {len} cannot be allocated")]
    Allocation {
        /// What was being allocated (e.g. "int[]")
        what: &'static str,
        /// Requested element count
        len: usize,
    },

    /// The managed call threw; the exception has been cleared
    #[error("{operation} threw: {description}")]
    ManagedException {
        /// Failing operation
        operation: String,
        /// The managed runtime's own rendering of the exception
        description: String,
    },

    /// The managed call returned null and left no exception pending
    #[error("{operation} returned NULL")]
    NullResult {
        /// Failing operation
        operation: String,
    },

    /// A null handle was passed into an operation
    #[error("{operation}: {argument} is NULL")]
    NullHandle {
        /// Operation that rejected the handle
        operation: &'static str,
        /// Which argument was null
        argument: &'static str,
    },

    /// The calling thread could not be attached to the managed runtime
    #[error("Cannot attach thread to the managed runtime: {0}")]
    Environment(String),

    /// A runtime was already installed for this process
    #[error("A managed runtime is already installed")]
    AlreadyInstalled,

    /// No runtime has been installed for this process
    #[error("No managed runtime installed")]
    NotInstalled,
}

impl BridgeError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::ClassNotFound { .. } | BridgeError::MethodNotFound { .. } => {
                ErrorKind::Resolution
            }
            BridgeError::Allocation { .. } => ErrorKind::Allocation,
            BridgeError::ManagedException { .. } => ErrorKind::ManagedException,
            BridgeError::NullResult { .. } => ErrorKind::NullResult,
            BridgeError::NullHandle { .. } => ErrorKind::NullHandle,
            BridgeError::Environment(_) => ErrorKind::Environment,
            BridgeError::AlreadyInstalled | BridgeError::NotInstalled => ErrorKind::Lifecycle,
        }
    }

    /// Whether the process can continue after this error.
    ///
    /// Only environment failures are fatal: without an attached thread no
    /// bridge operation is meaningful.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Environment
    }

    /// The managed exception description, if this error carries one
    pub fn exception_description(&self) -> Option<&str> {
        match self {
            BridgeError::ManagedException { description, .. } => Some(description),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_fatality() {
        let err = BridgeError::ClassNotFound {
            class: "Helper".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(!err.is_fatal());

        let err = BridgeError::Environment("detached".to_string());
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.is_fatal());

        assert_eq!(BridgeError::NotInstalled.kind(), ErrorKind::Lifecycle);
    }

    #[test]
    fn test_messages_name_the_failure() {
        let err = BridgeError::MethodNotFound {
            name: "collect".to_string(),
            signature: "(I)V".to_string(),
            kind: MethodKind::Static,
        };
        let msg = err.to_string();
        assert!(msg.contains("static method collect"));
        assert!(msg.contains("(I)V"));

        let err = BridgeError::Allocation {
            what: "int[]",
            len: 12,
        };
        assert_eq!(err.to_string(), "int[] of size 12 cannot be allocated");
    }

    #[test]
    fn test_exception_description() {
        let err = BridgeError::ManagedException {
            operation: "collect()".to_string(),
            description: "java.lang.IllegalStateException: stopped".to_string(),
        };
        assert_eq!(
            err.exception_description(),
            Some("java.lang.IllegalStateException: stopped")
        );
        assert_eq!(BridgeError::NotInstalled.exception_description(), None);
    }
}

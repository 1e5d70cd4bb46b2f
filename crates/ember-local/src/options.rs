//! Local runtime options

use crate::interp::{ClosureInterpreter, IdentityInterpreter};
use std::fmt;
use std::sync::Arc;

/// Default name of the helper class exposing the collection operations
pub const DEFAULT_HELPER_CLASS: &str = "Helper";

/// Resource limits for a local runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceLimits {
    /// Maximum element count of a single array (None = unlimited)
    pub max_array_len: Option<usize>,

    /// Maximum number of live heap objects (None = unlimited)
    pub max_objects: Option<usize>,

    /// Maximum number of attached threads (None = unlimited)
    pub max_threads: Option<usize>,
}

impl ResourceLimits {
    /// Create unlimited resource limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Create resource limits with a maximum array length
    pub fn with_array_limit(max_array_len: usize) -> Self {
        Self {
            max_array_len: Some(max_array_len),
            ..Default::default()
        }
    }

    /// Create resource limits with a maximum live object count
    pub fn with_object_limit(max_objects: usize) -> Self {
        Self {
            max_objects: Some(max_objects),
            ..Default::default()
        }
    }

    /// Create resource limits with a maximum attached thread count
    pub fn with_thread_limit(max_threads: usize) -> Self {
        Self {
            max_threads: Some(max_threads),
            ..Default::default()
        }
    }
}

/// Options for creating a [`LocalRuntime`](crate::LocalRuntime)
#[derive(Clone)]
pub struct LocalOptions {
    /// Resource limits
    pub limits: ResourceLimits,

    /// Name the helper class is registered under
    pub helper_class: String,

    /// Executes serialized closures when a mapped collection is collected
    pub interpreter: Arc<dyn ClosureInterpreter>,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            helper_class: DEFAULT_HELPER_CLASS.to_string(),
            interpreter: Arc::new(IdentityInterpreter),
        }
    }
}

impl LocalOptions {
    /// Use the given closure interpreter
    pub fn with_interpreter(mut self, interpreter: impl ClosureInterpreter + 'static) -> Self {
        self.interpreter = Arc::new(interpreter);
        self
    }

    /// Use the given resource limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl fmt::Debug for LocalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalOptions")
            .field("limits", &self.limits)
            .field("helper_class", &self.helper_class)
            .finish_non_exhaustive()
    }
}

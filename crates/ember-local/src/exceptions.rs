//! Exceptions the local runtime throws

/// Failed class lookup
pub const NO_CLASS_DEF_FOUND: &str = "java.lang.NoClassDefFoundError";
/// Failed method lookup
pub const NO_SUCH_METHOD: &str = "java.lang.NoSuchMethodError";
/// Allocation refused by the resource limits
pub const OUT_OF_MEMORY: &str = "java.lang.OutOfMemoryError";
/// Null receiver or argument
pub const NULL_POINTER: &str = "java.lang.NullPointerException";
/// Argument of the wrong shape or class
pub const ILLEGAL_ARGUMENT: &str = "java.lang.IllegalArgumentException";
/// Region copy outside an array
pub const ARRAY_INDEX_OUT_OF_BOUNDS: &str = "java.lang.ArrayIndexOutOfBoundsException";
/// Unreadable descriptor on a built-in method
pub const CLASS_FORMAT: &str = "java.lang.ClassFormatError";
/// Missing configuration key
pub const NO_SUCH_ELEMENT: &str = "java.util.NoSuchElementException";
/// Raised by `toString()` when describing is set to fail
pub const STACK_OVERFLOW: &str = "java.lang.StackOverflowError";
/// Engine-level failure (bad configuration, aborted job)
pub const SPARK_EXCEPTION: &str = "org.apache.spark.SparkException";

/// An exception about to be raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Thrown {
    pub class: &'static str,
    pub message: Option<String>,
}

impl Thrown {
    pub fn new(class: &'static str, message: impl Into<String>) -> Self {
        Self {
            class,
            message: Some(message.into()),
        }
    }

    pub fn bare(class: &'static str) -> Self {
        Self {
            class,
            message: None,
        }
    }

    pub fn null_pointer(what: &str) -> Self {
        Self::new(NULL_POINTER, format!("{} is null", what))
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(ILLEGAL_ARGUMENT, message)
    }
}

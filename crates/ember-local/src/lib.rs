//! Ember Local - an in-process managed runtime
//!
//! Implements `ember_sdk::ManagedRuntime` without a JVM. It knows the
//! engine's configuration, context and collection classes plus the helper
//! class, keeps objects on a simple heap, and tracks attachment and the
//! pending exception per thread, following the managed runtime's
//! "null result plus pending exception" protocol exactly.
//!
//! Used for single-process runs of bridge-driven programs and as the test
//! engine for the bridge itself. Resource limits and a switchable
//! `toString()` failure allow every failure path to be exercised.
//!
//! # Example
//!
//! ```ignore
//! use ember_local::{LocalOptions, LocalRuntime, ResourceLimits};
//!
//! let runtime = LocalRuntime::with_options(
//!     LocalOptions::default().with_limits(ResourceLimits::with_array_limit(1024)),
//! );
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod classes;
pub mod descriptor;
mod env;
pub mod exceptions;
pub mod heap;
pub mod interp;
pub mod options;
pub mod runtime;

pub use descriptor::{DescriptorError, FieldType, MethodDescriptor};
pub use heap::{Dataset, HeapObject};
pub use interp::{ClosureInterpreter, IdentityInterpreter};
pub use options::{LocalOptions, ResourceLimits, DEFAULT_HELPER_CLASS};
pub use runtime::LocalRuntime;

/// Log target used by the local runtime
pub const LOG_TARGET: &str = "ember::local";

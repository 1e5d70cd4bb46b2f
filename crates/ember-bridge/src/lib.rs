//! Ember Bridge - drive a managed distributed engine from a foreign host
//!
//! The bridge sits between host code and a managed runtime (Spark on the
//! JVM in production). It is layered bottom-up:
//!
//! - [`env`]: per-thread environment acquisition
//! - [`resolve`]: reflective class and method lookup
//! - [`marshal`]: host values to managed arrays and strings, and back
//! - [`invoke`]: constructor, instance and static calls
//! - [`exception`]: pending-exception capture and clearing
//! - [`facade`]: the five distributed operations ([`SparkBridge`])
//!
//! The runtime itself is abstracted by [`ember_sdk::ManagedRuntime`]. The
//! `jvm` feature provides the JNI-backed implementation.
//!
//! # Example
//!
//! ```ignore
//! let bridge = SparkBridge::new(runtime);
//! let conf = bridge.build_configuration("Hello World")?;
//! let context = bridge.build_context(conf)?;
//! let numbers = bridge.parallelize(context, &[1, 2, 3])?;
//! let values = bridge.collect(numbers)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod diagnostics;
pub mod env;
pub mod exception;
pub mod facade;
pub mod invoke;
pub mod marshal;
pub mod resolve;
pub mod runtime;

#[cfg(feature = "jvm")]
pub mod jvm;

pub use config::{BridgeConfig, ConfigError, MethodBinding, SparkBindings};
pub use diagnostics::{CapturingSink, Diagnostic, DiagnosticSink, LogSink, LOG_TARGET};
pub use env::Env;
pub use exception::{ExceptionDescription, UNDESCRIBED_EXCEPTION};
pub use facade::SparkBridge;
pub use invoke::CONSTRUCTOR_NAME;
pub use marshal::MAX_ARRAY_LEN;

#[cfg(feature = "jvm")]
pub use jvm::JvmRuntime;

#[cfg(feature = "jvm")]
pub use jni;

pub use ember_sdk;
pub use ember_sdk::{
    BridgeError, BridgeResult, CollectionRef, ConfRef, ContextRef, ErrorKind, ObjectRef,
    SerializedClosure,
};

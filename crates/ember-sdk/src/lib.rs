//! Ember SDK - handle types and runtime traits
//!
//! This crate provides the types shared by the Ember bridge and the managed
//! runtimes it drives, without depending on any particular backend:
//!
//! - Role-tagged opaque handles (`ClassRef`, `MethodRef`, `ObjectRef`,
//!   `ConfRef`, `ContextRef`, `CollectionRef`)
//! - `ArgValue`, the positional argument union of a managed call
//! - `ManagedRuntime` / `ManagedEnv`, the operations a backend implements
//! - `BridgeError`, the error taxonomy of the bridge

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod context;
pub mod error;
pub mod value;

pub use context::{ManagedEnv, ManagedRuntime};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use value::{
    ArgValue, ClassRef, CollectionRef, ConfRef, ContextRef, MethodKind, MethodRef, ObjectRef,
    RawRef, SerializedClosure,
};

//! ManagedRuntime / ManagedEnv traits: abstract managed-runtime operations
//!
//! Defines the interface a backend implements. The bridge programs against
//! these traits only; it never sees JNI types or a backend's heap.
//!
//! The primitives deliberately keep the managed runtime's own failure
//! protocol: a call that fails returns null (or `None`) and leaves an
//! exception pending in the environment. Collapsing that two-step protocol
//! into a `Result` is the bridge's job, not the backend's.

use crate::error::BridgeResult;
use crate::value::{ArgValue, ClassRef, MethodRef, ObjectRef};

/// The process-wide managed runtime instance.
///
/// Created by the embedder's bootstrap code and installed into the bridge
/// once. Shared read-only by every host thread.
pub trait ManagedRuntime: Send + Sync {
    /// Short backend name for diagnostics (e.g. "jvm", "local")
    fn name(&self) -> &str;

    /// Get the calling thread's environment, attaching the thread first if
    /// the runtime does not know it yet.
    ///
    /// Attachment is permanent; detaching is the embedder's business.
    fn attach_current_thread(&self) -> BridgeResult<Box<dyn ManagedEnv + '_>>;
}

/// A thread's environment inside the managed runtime.
///
/// Implementations are not `Send`: an environment belongs to the thread that
/// acquired it.
pub trait ManagedEnv {
    // ========================================================================
    // Reflection
    // ========================================================================

    /// Look up a class by slash-separated name
    fn find_class(&self, name: &str) -> Option<ClassRef>;

    /// Look up an instance method (or constructor, named `<init>`)
    fn get_method_id(&self, class: ClassRef, name: &str, signature: &str) -> Option<MethodRef>;

    /// Look up a static method
    fn get_static_method_id(
        &self,
        class: ClassRef,
        name: &str,
        signature: &str,
    ) -> Option<MethodRef>;

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Allocate an object and run the given constructor on it
    fn new_object(&self, class: ClassRef, ctor: MethodRef, args: &[ArgValue]) -> ObjectRef;

    /// Call an object-returning instance method
    fn call_object_method(
        &self,
        receiver: ObjectRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef;

    /// Call an object-returning static method
    fn call_static_object_method(
        &self,
        class: ClassRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef;

    // ========================================================================
    // Strings and arrays
    // ========================================================================

    /// Allocate a managed string
    fn new_string_utf(&self, s: &str) -> ObjectRef;

    /// Allocate a zero-filled `int[]`
    fn new_int_array(&self, len: usize) -> ObjectRef;

    /// Allocate a zero-filled `byte[]`
    fn new_byte_array(&self, len: usize) -> ObjectRef;

    /// Allocate a zero-filled `double[]`
    fn new_double_array(&self, len: usize) -> ObjectRef;

    /// Bulk-copy into an `int[]` starting at `start`
    fn set_int_array_region(&self, array: ObjectRef, start: usize, values: &[i32]);

    /// Bulk-copy into a `byte[]` starting at `start`
    fn set_byte_array_region(&self, array: ObjectRef, start: usize, values: &[u8]);

    /// Bulk-copy into a `double[]` starting at `start`
    fn set_double_array_region(&self, array: ObjectRef, start: usize, values: &[f64]);

    /// Length of any managed array
    fn array_length(&self, array: ObjectRef) -> usize;

    /// Bulk-copy out of an `int[]` starting at `start`
    fn get_int_array_region(&self, array: ObjectRef, start: usize, buf: &mut [i32]);

    /// Bulk-copy out of a `byte[]` starting at `start`
    fn get_byte_array_region(&self, array: ObjectRef, start: usize, buf: &mut [u8]);

    /// Bulk-copy out of a `double[]` starting at `start`
    fn get_double_array_region(&self, array: ObjectRef, start: usize, buf: &mut [f64]);

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Check whether an exception is pending
    fn exception_check(&self) -> bool;

    /// The pending throwable, or null
    fn exception_occurred(&self) -> ObjectRef;

    /// Clear the pending exception
    fn exception_clear(&self);

    /// Render a throwable the way the managed runtime does (`toString()`).
    ///
    /// Must be called with no exception pending. Returns `None` if rendering
    /// failed, in which case an exception may be pending again.
    fn describe_throwable(&self, throwable: ObjectRef) -> Option<String>;
}

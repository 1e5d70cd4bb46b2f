//! Method invocation
//!
//! Thin calls into the backend. None of these inspect or clear exceptions,
//! and none check the argument vector against the descriptor: the caller
//! owns both. Every call here must be followed by [`Env::checked`] or
//! [`Env::check_and_clear`].

use crate::diagnostics::LOG_TARGET;
use crate::env::Env;
use ember_sdk::{ArgValue, BridgeResult, ClassRef, MethodRef, ObjectRef};

/// Method name the managed runtime gives constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

impl Env<'_> {
    /// Construct an instance of `class` using the constructor with `signature`.
    ///
    /// `Err` only if the constructor cannot be resolved. A failed
    /// construction comes back as `Ok(null)` with the exception still
    /// pending; the caller's [`Env::checked`] reports it.
    pub fn construct(
        &self,
        class: ClassRef,
        signature: &str,
        args: &[ArgValue],
    ) -> BridgeResult<ObjectRef> {
        let ctor = self.resolve_method(class, CONSTRUCTOR_NAME, signature, false)?;
        let obj = self.raw().new_object(class, ctor, args);
        if obj.is_null() {
            log::debug!(
                target: LOG_TARGET,
                "constructor with signature {} returned null",
                signature
            );
        }
        Ok(obj)
    }

    /// Call an object-returning instance method.
    ///
    /// `receiver` must be non-null.
    pub fn call_instance_method(
        &self,
        receiver: ObjectRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef {
        log::trace!(target: LOG_TARGET, "call {:?} on {:?}", method, receiver);
        self.raw().call_object_method(receiver, method, args)
    }

    /// Call an object-returning static method.
    pub fn call_static_method(
        &self,
        class: ClassRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef {
        log::trace!(target: LOG_TARGET, "call static {:?} on {:?}", method, class);
        self.raw().call_static_object_method(class, method, args)
    }
}

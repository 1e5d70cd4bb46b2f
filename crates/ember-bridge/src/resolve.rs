//! Reflective class and method resolution
//!
//! Lookups are made fresh on every operation; a `ClassRef` or `MethodRef` is
//! only good for the environment that produced it. A failed lookup is an
//! ordinary, reported `Err`, never a panic: a typo in a descriptor must not
//! take the host process down.

use crate::diagnostics::LOG_TARGET;
use crate::env::Env;
use ember_sdk::{BridgeError, BridgeResult, ClassRef, MethodKind, MethodRef};

impl Env<'_> {
    /// Resolve a class by slash-separated name (e.g. `org/apache/spark/SparkConf`).
    ///
    /// On failure the lookup's pending `NoClassDefFoundError` is cleared, so
    /// the environment stays usable.
    pub fn resolve_class(&self, name: &str) -> BridgeResult<ClassRef> {
        match self.raw().find_class(name) {
            Some(class) => {
                log::trace!(target: LOG_TARGET, "resolved class {} -> {:?}", name, class);
                Ok(class)
            }
            None => {
                self.discard_pending("resolve_class");
                Err(self.report(
                    "resolve_class",
                    BridgeError::ClassNotFound {
                        class: name.to_string(),
                    },
                ))
            }
        }
    }

    /// Resolve a method by name and descriptor.
    ///
    /// The descriptor is forwarded as given; a malformed one simply fails to
    /// resolve. On failure the pending `NoSuchMethodError` is cleared.
    pub fn resolve_method(
        &self,
        class: ClassRef,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> BridgeResult<MethodRef> {
        let kind = MethodKind::from_static(is_static);
        let found = match kind {
            MethodKind::Static => self.raw().get_static_method_id(class, name, signature),
            MethodKind::Instance => self.raw().get_method_id(class, name, signature),
        };

        match found {
            Some(method) => {
                log::trace!(
                    target: LOG_TARGET,
                    "resolved {} {}{} -> {:?}",
                    kind,
                    name,
                    signature,
                    method
                );
                Ok(method)
            }
            None => {
                self.discard_pending("resolve_method");
                Err(self.report(
                    "resolve_method",
                    BridgeError::MethodNotFound {
                        name: name.to_string(),
                        signature: signature.to_string(),
                        kind,
                    },
                ))
            }
        }
    }

    /// Resolve a static method of a class named by string.
    pub fn resolve_static(
        &self,
        class_name: &str,
        name: &str,
        signature: &str,
    ) -> BridgeResult<(ClassRef, MethodRef)> {
        let class = self.resolve_class(class_name)?;
        let method = self.resolve_method(class, name, signature, true)?;
        Ok((class, method))
    }
}

//! Value marshalling
//!
//! Host strings and primitive slices become managed objects; managed arrays
//! come back as host-owned `Vec`s. Arrays are allocated at their final
//! length and filled with one region copy, never element by element.

use crate::env::Env;
use ember_sdk::{BridgeError, BridgeResult, ObjectRef};

/// Longest array a managed runtime can hold (lengths are `jint`)
pub const MAX_ARRAY_LEN: usize = i32::MAX as usize;

fn fits_managed_array(len: usize) -> bool {
    len <= MAX_ARRAY_LEN
}

impl Env<'_> {
    /// Allocate a managed string.
    pub fn new_string(&self, s: &str) -> BridgeResult<ObjectRef> {
        let string = self.raw().new_string_utf(s);
        self.allocated("new_string", "String", s.len(), string)
    }

    /// Allocate an `int[]` holding `values`.
    ///
    /// An empty slice yields a valid zero-length array.
    pub fn new_int_array(&self, values: &[i32]) -> BridgeResult<ObjectRef> {
        self.ensure_allocatable("new_int_array", "int[]", values.len())?;
        let raw = self.raw();
        let array = raw.new_int_array(values.len());
        let array = self.allocated("new_int_array", "int[]", values.len(), array)?;
        if !values.is_empty() {
            raw.set_int_array_region(array, 0, values);
            self.ensure_clear("new_int_array")?;
        }
        Ok(array)
    }

    /// Allocate a `byte[]` holding `values`.
    ///
    /// Used for serialized closures; the bytes are copied verbatim.
    pub fn new_byte_array(&self, values: &[u8]) -> BridgeResult<ObjectRef> {
        self.ensure_allocatable("new_byte_array", "byte[]", values.len())?;
        let raw = self.raw();
        let array = raw.new_byte_array(values.len());
        let array = self.allocated("new_byte_array", "byte[]", values.len(), array)?;
        if !values.is_empty() {
            raw.set_byte_array_region(array, 0, values);
            self.ensure_clear("new_byte_array")?;
        }
        Ok(array)
    }

    /// Allocate a `double[]` holding `values`.
    pub fn new_double_array(&self, values: &[f64]) -> BridgeResult<ObjectRef> {
        self.ensure_allocatable("new_double_array", "double[]", values.len())?;
        let raw = self.raw();
        let array = raw.new_double_array(values.len());
        let array = self.allocated("new_double_array", "double[]", values.len(), array)?;
        if !values.is_empty() {
            raw.set_double_array_region(array, 0, values);
            self.ensure_clear("new_double_array")?;
        }
        Ok(array)
    }

    /// Copy an `int[]` out into a host-owned buffer.
    ///
    /// The managed array is left untouched.
    pub fn read_int_array(&self, array: ObjectRef) -> BridgeResult<Vec<i32>> {
        let len = self.array_len("read_int_array", array)?;
        let mut buf = vec![0i32; len];
        if len > 0 {
            self.raw().get_int_array_region(array, 0, &mut buf);
            self.ensure_clear("read_int_array")?;
        }
        Ok(buf)
    }

    /// Copy a `byte[]` out into a host-owned buffer.
    pub fn read_byte_array(&self, array: ObjectRef) -> BridgeResult<Vec<u8>> {
        let len = self.array_len("read_byte_array", array)?;
        let mut buf = vec![0u8; len];
        if len > 0 {
            self.raw().get_byte_array_region(array, 0, &mut buf);
            self.ensure_clear("read_byte_array")?;
        }
        Ok(buf)
    }

    /// Copy a `double[]` out into a host-owned buffer.
    pub fn read_double_array(&self, array: ObjectRef) -> BridgeResult<Vec<f64>> {
        let len = self.array_len("read_double_array", array)?;
        let mut buf = vec![0f64; len];
        if len > 0 {
            self.raw().get_double_array_region(array, 0, &mut buf);
            self.ensure_clear("read_double_array")?;
        }
        Ok(buf)
    }

    fn array_len(&self, operation: &'static str, array: ObjectRef) -> BridgeResult<usize> {
        if array.is_null() {
            return Err(self.report(
                operation,
                BridgeError::NullHandle {
                    operation,
                    argument: "array",
                },
            ));
        }
        let len = self.raw().array_length(array);
        self.ensure_clear(operation)?;
        Ok(len)
    }

    /// Refuse lengths the managed runtime cannot represent instead of
    /// letting the backend truncate them.
    fn ensure_allocatable(
        &self,
        operation: &str,
        what: &'static str,
        len: usize,
    ) -> BridgeResult<()> {
        if fits_managed_array(len) {
            Ok(())
        } else {
            Err(self.report(operation, BridgeError::Allocation { what, len }))
        }
    }

    /// Turn a raw allocation result into a checked one. A null result means
    /// the allocation failed; its pending `OutOfMemoryError` is cleared.
    fn allocated(
        &self,
        operation: &str,
        what: &'static str,
        len: usize,
        obj: ObjectRef,
    ) -> BridgeResult<ObjectRef> {
        match obj.non_null() {
            Some(obj) => Ok(obj),
            None => {
                self.discard_pending(operation);
                Err(self.report(operation, BridgeError::Allocation { what, len }))
            }
        }
    }
}

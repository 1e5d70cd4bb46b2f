//! JNI backend
//!
//! Implements [`ManagedRuntime`] over a real Java VM. Handles cross the
//! trait boundary as raw JNI pointers widened to `u64`; local references are
//! never deleted here, so they live as long as the current JNI frame (or the
//! thread, for threads attached from native code).

use ember_sdk::{
    ArgValue, BridgeError, BridgeResult, ClassRef, ManagedEnv, ManagedRuntime, MethodKind,
    MethodRef, ObjectRef, RawRef,
};
use jni::objects::{
    JByteArray, JClass, JDoubleArray, JIntArray, JMethodID, JObject, JStaticMethodID, JString,
};
use jni::signature::ReturnType;
use jni::sys::{jboolean, jclass, jmethodID, jobject, jsize, jvalue};
use jni::{JNIEnv, JavaVM};
use std::cell::RefCell;

/// A Java VM the bridge can attach threads to.
pub struct JvmRuntime {
    vm: JavaVM,
}

impl JvmRuntime {
    /// Wrap an existing VM
    pub fn new(vm: JavaVM) -> Self {
        Self { vm }
    }

    /// Wrap the VM pointer handed to `JNI_OnLoad` or returned by `JNI_CreateJavaVM`.
    ///
    /// # Safety
    ///
    /// `vm` must point to a live Java VM that outlives the returned value.
    pub unsafe fn from_raw(vm: *mut jni::sys::JavaVM) -> BridgeResult<Self> {
        let vm = JavaVM::from_raw(vm).map_err(|e| BridgeError::Environment(e.to_string()))?;
        Ok(Self { vm })
    }

    /// The wrapped VM
    pub fn vm(&self) -> &JavaVM {
        &self.vm
    }
}

impl ManagedRuntime for JvmRuntime {
    fn name(&self) -> &str {
        "jvm"
    }

    fn attach_current_thread(&self) -> BridgeResult<Box<dyn ManagedEnv + '_>> {
        let env = match self.vm.get_env() {
            Ok(env) => env,
            Err(_) => self.vm.attach_current_thread_permanently().map_err(|e| {
                BridgeError::Environment(format!("could not attach current thread: {}", e))
            })?,
        };
        Ok(Box::new(JvmEnv {
            env: RefCell::new(env),
        }))
    }
}

/// One thread's `JNIEnv`.
struct JvmEnv<'a> {
    env: RefCell<JNIEnv<'a>>,
}

// ============================================================================
// Handle conversion
// ============================================================================

fn object<'a>(obj: ObjectRef) -> JObject<'a> {
    // SAFETY: ObjectRefs handed to this backend were produced by it.
    unsafe { JObject::from_raw(obj.to_raw() as usize as jobject) }
}

fn object_ref(obj: JObject<'_>) -> ObjectRef {
    ObjectRef::from_raw(obj.into_raw() as usize as RawRef)
}

fn class<'a>(class: ClassRef) -> JClass<'a> {
    unsafe { JClass::from_raw(class.to_raw() as usize as jclass) }
}

fn method_raw(method: MethodRef) -> jmethodID {
    method.to_raw() as usize as jmethodID
}

fn int_array<'a>(array: ObjectRef) -> JIntArray<'a> {
    unsafe { JIntArray::from_raw(array.to_raw() as usize as jobject) }
}

fn byte_array<'a>(array: ObjectRef) -> JByteArray<'a> {
    unsafe { JByteArray::from_raw(array.to_raw() as usize as jobject) }
}

fn double_array<'a>(array: ObjectRef) -> JDoubleArray<'a> {
    unsafe { JDoubleArray::from_raw(array.to_raw() as usize as jobject) }
}

fn jvalues(args: &[ArgValue]) -> Vec<jvalue> {
    args.iter()
        .map(|arg| match *arg {
            ArgValue::Object(obj) => jvalue {
                l: obj.to_raw() as usize as jobject,
            },
            ArgValue::Bool(z) => jvalue { z: z as jboolean },
            ArgValue::Byte(b) => jvalue { b },
            ArgValue::Char(c) => jvalue { c },
            ArgValue::Short(s) => jvalue { s },
            ArgValue::Int(i) => jvalue { i },
            ArgValue::Long(j) => jvalue { j },
            ArgValue::Float(f) => jvalue { f },
            ArgValue::Double(d) => jvalue { d },
        })
        .collect()
}

fn as_jbytes(bytes: &[u8]) -> &[i8] {
    // SAFETY: u8 and i8 have the same size and alignment, and every bit
    // pattern is valid for both.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr().cast::<i8>(), bytes.len()) }
}

fn as_jbytes_mut(bytes: &mut [u8]) -> &mut [i8] {
    // SAFETY: as for `as_jbytes`; the borrow is exclusive.
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<i8>(), bytes.len()) }
}

// ============================================================================
// Length checks
// ============================================================================

impl JvmEnv<'_> {
    /// An array length as `jsize`. Lengths that do not fit throw
    /// `OutOfMemoryError`, as the VM does for oversized requests.
    fn array_size(&self, len: usize) -> Option<jsize> {
        match jsize::try_from(len) {
            Ok(len) => Some(len),
            Err(_) => {
                let _ = self.env.borrow_mut().throw_new(
                    "java/lang/OutOfMemoryError",
                    format!("Requested array size {} exceeds VM limit", len),
                );
                None
            }
        }
    }

    /// A region start as `jsize`, provided the whole region is addressable.
    /// Otherwise throws `ArrayIndexOutOfBoundsException`.
    fn region_start(&self, start: usize, len: usize) -> Option<jsize> {
        let end = start.checked_add(len).and_then(|end| jsize::try_from(end).ok());
        match (jsize::try_from(start), end) {
            (Ok(start), Some(_)) => Some(start),
            _ => {
                let _ = self.env.borrow_mut().throw_new(
                    "java/lang/ArrayIndexOutOfBoundsException",
                    format!("Array region {}..+{} out of range", start, len),
                );
                None
            }
        }
    }
}

// ============================================================================
// ManagedEnv
// ============================================================================

impl ManagedEnv for JvmEnv<'_> {
    fn find_class(&self, name: &str) -> Option<ClassRef> {
        let class = self.env.borrow_mut().find_class(name).ok()?;
        ClassRef::from_raw(class.into_raw() as usize as RawRef)
    }

    fn get_method_id(&self, class_ref: ClassRef, name: &str, signature: &str) -> Option<MethodRef> {
        let id = self
            .env
            .borrow_mut()
            .get_method_id(class(class_ref), name, signature)
            .ok()?;
        MethodRef::from_raw(id.into_raw() as usize as RawRef, MethodKind::Instance)
    }

    fn get_static_method_id(
        &self,
        class_ref: ClassRef,
        name: &str,
        signature: &str,
    ) -> Option<MethodRef> {
        let id = self
            .env
            .borrow_mut()
            .get_static_method_id(class(class_ref), name, signature)
            .ok()?;
        MethodRef::from_raw(id.into_raw() as usize as RawRef, MethodKind::Static)
    }

    fn new_object(&self, class_ref: ClassRef, ctor: MethodRef, args: &[ArgValue]) -> ObjectRef {
        let args = jvalues(args);
        // SAFETY: the constructor was resolved against this class, and the
        // caller built `args` from the same descriptor.
        let result = unsafe {
            let ctor = JMethodID::from_raw(method_raw(ctor));
            self.env
                .borrow_mut()
                .new_object_unchecked(class(class_ref), ctor, &args)
        };
        result.map(object_ref).unwrap_or_default()
    }

    fn call_object_method(
        &self,
        receiver: ObjectRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef {
        let args = jvalues(args);
        let receiver = object(receiver);
        let result = unsafe {
            let method = JMethodID::from_raw(method_raw(method));
            self.env
                .borrow_mut()
                .call_method_unchecked(&receiver, method, ReturnType::Object, &args)
        };
        result
            .and_then(|value| value.l())
            .map(object_ref)
            .unwrap_or_default()
    }

    fn call_static_object_method(
        &self,
        class_ref: ClassRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef {
        let args = jvalues(args);
        let result = unsafe {
            let method = JStaticMethodID::from_raw(method_raw(method));
            self.env.borrow_mut().call_static_method_unchecked(
                class(class_ref),
                method,
                ReturnType::Object,
                &args,
            )
        };
        result
            .and_then(|value| value.l())
            .map(object_ref)
            .unwrap_or_default()
    }

    fn new_string_utf(&self, s: &str) -> ObjectRef {
        self.env
            .borrow_mut()
            .new_string(s)
            .map(|s| object_ref(s.into()))
            .unwrap_or_default()
    }

    fn new_int_array(&self, len: usize) -> ObjectRef {
        let Some(len) = self.array_size(len) else {
            return ObjectRef::null();
        };
        self.env
            .borrow_mut()
            .new_int_array(len)
            .map(|a| object_ref(a.into()))
            .unwrap_or_default()
    }

    fn new_byte_array(&self, len: usize) -> ObjectRef {
        let Some(len) = self.array_size(len) else {
            return ObjectRef::null();
        };
        self.env
            .borrow_mut()
            .new_byte_array(len)
            .map(|a| object_ref(a.into()))
            .unwrap_or_default()
    }

    fn new_double_array(&self, len: usize) -> ObjectRef {
        let Some(len) = self.array_size(len) else {
            return ObjectRef::null();
        };
        self.env
            .borrow_mut()
            .new_double_array(len)
            .map(|a| object_ref(a.into()))
            .unwrap_or_default()
    }

    fn set_int_array_region(&self, array: ObjectRef, start: usize, values: &[i32]) {
        let Some(start) = self.region_start(start, values.len()) else {
            return;
        };
        let _ = self
            .env
            .borrow_mut()
            .set_int_array_region(int_array(array), start, values);
    }

    fn set_byte_array_region(&self, array: ObjectRef, start: usize, values: &[u8]) {
        let Some(start) = self.region_start(start, values.len()) else {
            return;
        };
        let _ = self
            .env
            .borrow_mut()
            .set_byte_array_region(byte_array(array), start, as_jbytes(values));
    }

    fn set_double_array_region(&self, array: ObjectRef, start: usize, values: &[f64]) {
        let Some(start) = self.region_start(start, values.len()) else {
            return;
        };
        let _ = self
            .env
            .borrow_mut()
            .set_double_array_region(double_array(array), start, values);
    }

    fn array_length(&self, array: ObjectRef) -> usize {
        // GetArrayLength does not care about the element type
        let array = int_array(array);
        self.env
            .borrow_mut()
            .get_array_length(&array)
            .map(|len| len.max(0) as usize)
            .unwrap_or(0)
    }

    fn get_int_array_region(&self, array: ObjectRef, start: usize, buf: &mut [i32]) {
        let Some(start) = self.region_start(start, buf.len()) else {
            return;
        };
        let _ = self
            .env
            .borrow_mut()
            .get_int_array_region(int_array(array), start, buf);
    }

    fn get_byte_array_region(&self, array: ObjectRef, start: usize, buf: &mut [u8]) {
        let Some(start) = self.region_start(start, buf.len()) else {
            return;
        };
        let _ = self
            .env
            .borrow_mut()
            .get_byte_array_region(byte_array(array), start, as_jbytes_mut(buf));
    }

    fn get_double_array_region(&self, array: ObjectRef, start: usize, buf: &mut [f64]) {
        let Some(start) = self.region_start(start, buf.len()) else {
            return;
        };
        let _ = self
            .env
            .borrow_mut()
            .get_double_array_region(double_array(array), start, buf);
    }

    fn exception_check(&self) -> bool {
        self.env.borrow_mut().exception_check().unwrap_or(false)
    }

    fn exception_occurred(&self) -> ObjectRef {
        self.env
            .borrow_mut()
            .exception_occurred()
            .map(|t| object_ref(t.into()))
            .unwrap_or_default()
    }

    fn exception_clear(&self) {
        let _ = self.env.borrow_mut().exception_clear();
    }

    fn describe_throwable(&self, throwable: ObjectRef) -> Option<String> {
        let mut env = self.env.borrow_mut();
        let throwable = object(throwable);
        let text = env
            .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
            .and_then(|value| value.l())
            .ok()?;
        if text.is_null() {
            return None;
        }
        let text = JString::from(text);
        let rendered: String = env.get_string(&text).ok()?.into();
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_views_share_storage() {
        let mut bytes = vec![0x00, 0x7F, 0x80, 0xFF];
        let ptr = bytes.as_ptr();

        let signed = as_jbytes(&bytes);
        assert_eq!(signed, &[0, 127, -128, -1]);
        assert_eq!(signed.as_ptr().cast::<u8>(), ptr);

        as_jbytes_mut(&mut bytes)[3] = -2;
        assert_eq!(bytes, vec![0x00, 0x7F, 0x80, 0xFE]);
    }
}

//! C FFI bindings for the Ember bridge
//!
//! This module exposes the five distributed operations to foreign hosts.
//! The API follows these principles:
//! - ABI-stable (uses only C-compatible types)
//! - Thread-safe (any attached or attachable thread may call in)
//! - Error handling via out-parameters
//! - Opaque pointers for managed objects
//! - Manual memory management for buffers and errors
//!
//! A runtime must be installed first, either a JVM (`ember_install_jvm`,
//! feature `jvm`) or the in-process runtime (`ember_install_local_runtime`).
//! Configuration is read on the first operation: the JSON file named by
//! `EMBER_CONFIG`, if any, then the `EMBER_*_CLASS` overrides.

use ember_bridge::{runtime, BridgeConfig, ConfigError, SparkBridge};
use ember_local::LocalRuntime;
use ember_sdk::{BridgeError, CollectionRef, ConfRef, ContextRef, ObjectRef, SerializedClosure};
use once_cell::sync::OnceCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

// ============================================================================
// Opaque Types
// ============================================================================

/// Opaque handle to an engine configuration object
#[repr(C)]
pub struct EmberConf {
    _private: [u8; 0],
}

/// Opaque handle to an engine context object
#[repr(C)]
pub struct EmberContext {
    _private: [u8; 0],
}

/// Opaque handle to a distributed collection
#[repr(C)]
pub struct EmberRdd {
    _private: [u8; 0],
}

/// Error information
#[repr(C)]
pub struct EmberError {
    message: *mut c_char,
}

/// Failures detected at the C boundary, before the bridge is reached
#[derive(Debug, thiserror::Error)]
enum FfiError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{function}: {argument} is NULL")]
    NullPointer {
        function: &'static str,
        argument: &'static str,
    },

    #[error("{function}: {argument} is not valid UTF-8")]
    InvalidUtf8 {
        function: &'static str,
        argument: &'static str,
    },
}

type FfiResult<T> = Result<T, FfiError>;

static BRIDGE: OnceCell<SparkBridge<'static>> = OnceCell::new();

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert Rust string to C string (caller must free)
unsafe fn rust_to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create error from FfiError
unsafe fn create_error(error: FfiError) -> *mut EmberError {
    let message = rust_to_c_string(&error.to_string());
    let err = Box::new(EmberError { message });
    Box::into_raw(err)
}

/// Set error out-parameter
unsafe fn set_error(error_out: *mut *mut EmberError, error: FfiError) {
    if !error_out.is_null() {
        *error_out = create_error(error);
    }
}

/// The bridge over the installed runtime, configured from the environment
fn bridge() -> FfiResult<&'static SparkBridge<'static>> {
    let bridge = BRIDGE.get_or_try_init(|| {
        let runtime = runtime::installed()?;
        let config = BridgeConfig::try_from_env()?;
        Ok::<_, FfiError>(SparkBridge::new(runtime).with_config(config))
    })?;
    Ok(bridge)
}

fn object_to_ptr<T>(obj: ObjectRef) -> *mut T {
    obj.to_raw() as usize as *mut T
}

fn ptr_to_object<T>(ptr: *mut T) -> ObjectRef {
    ObjectRef::from_raw(ptr as usize as u64)
}

/// View a C array as a slice; NULL is accepted for an empty array
unsafe fn c_slice<'a, T>(
    data: *const T,
    length: usize,
    function: &'static str,
    argument: &'static str,
) -> FfiResult<&'a [T]> {
    if length == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(FfiError::NullPointer { function, argument });
    }
    Ok(slice::from_raw_parts(data, length))
}

// ============================================================================
// Runtime Installation
// ============================================================================

/// Install the in-process runtime as this process's managed runtime
///
/// # Arguments
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * 0 on success
/// * -1 if a runtime is already installed (check error parameter)
///
/// # Safety
/// `error` must be NULL or point to writable storage for one pointer
#[no_mangle]
pub unsafe extern "C" fn ember_install_local_runtime(error: *mut *mut EmberError) -> c_int {
    match runtime::install(Box::new(LocalRuntime::new())) {
        Ok(()) => 0,
        Err(e) => {
            set_error(error, e.into());
            -1
        }
    }
}

/// Install a Java VM as this process's managed runtime
///
/// # Arguments
/// * `vm` - The `JavaVM*` from `JNI_OnLoad` or `JNI_CreateJavaVM`
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * 0 on success
/// * -1 on failure (check error parameter)
///
/// # Safety
/// `vm` must point to a live Java VM that outlives the process's use of Ember
#[cfg(feature = "jvm")]
#[no_mangle]
pub unsafe extern "C" fn ember_install_jvm(
    vm: *mut ember_bridge::jni::sys::JavaVM,
    error: *mut *mut EmberError,
) -> c_int {
    if vm.is_null() {
        set_error(
            error,
            FfiError::NullPointer {
                function: "ember_install_jvm",
                argument: "vm",
            },
        );
        return -1;
    }
    let installed = ember_bridge::JvmRuntime::from_raw(vm)
        .and_then(|jvm| runtime::install(Box::new(jvm)));
    match installed {
        Ok(()) => 0,
        Err(e) => {
            set_error(error, e.into());
            -1
        }
    }
}

// ============================================================================
// Distributed Operations
// ============================================================================

/// Create an engine configuration with the given application name
///
/// # Arguments
/// * `app_name` - Null-terminated UTF-8 application name
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * Non-null configuration handle on success
/// * NULL on failure (check error parameter)
///
/// # Safety
/// `app_name` must be a valid null-terminated string
///
/// # Example (C)
/// ```c
/// EmberError* error = NULL;
/// EmberConf* conf = ember_new_spark_conf("Hello World", &error);
/// if (conf == NULL) {
///     fprintf(stderr, "Failed to configure: %s\n", ember_error_message(error));
///     ember_error_free(error);
///     return 1;
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn ember_new_spark_conf(
    app_name: *const c_char,
    error: *mut *mut EmberError,
) -> *mut EmberConf {
    const FUNCTION: &str = "ember_new_spark_conf";

    if app_name.is_null() {
        set_error(
            error,
            FfiError::NullPointer {
                function: FUNCTION,
                argument: "app_name",
            },
        );
        return ptr::null_mut();
    }
    let app_name = match CStr::from_ptr(app_name).to_str() {
        Ok(s) => s,
        Err(_) => {
            set_error(
                error,
                FfiError::InvalidUtf8 {
                    function: FUNCTION,
                    argument: "app_name",
                },
            );
            return ptr::null_mut();
        }
    };

    match bridge().and_then(|b| Ok(b.build_configuration(app_name)?)) {
        Ok(conf) => object_to_ptr(conf.as_object()),
        Err(e) => {
            set_error(error, e);
            ptr::null_mut()
        }
    }
}

/// Create an engine context from a configuration
///
/// # Arguments
/// * `conf` - Configuration from `ember_new_spark_conf()`
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * Non-null context handle on success
/// * NULL on failure (check error parameter)
///
/// # Safety
/// `conf` must be NULL or a handle returned by this library
#[no_mangle]
pub unsafe extern "C" fn ember_new_spark_context(
    conf: *mut EmberConf,
    error: *mut *mut EmberError,
) -> *mut EmberContext {
    let conf = ConfRef::from_object_unchecked(ptr_to_object(conf));
    match bridge().and_then(|b| Ok(b.build_context(conf)?)) {
        Ok(context) => object_to_ptr(context.as_object()),
        Err(e) => {
            set_error(error, e);
            ptr::null_mut()
        }
    }
}

/// Distribute an array of integers as a new collection
///
/// # Arguments
/// * `context` - Context from `ember_new_spark_context()`
/// * `data` - Pointer to `length` integers (may be NULL if `length` is 0)
/// * `length` - Number of integers
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * Non-null collection handle on success
/// * NULL on failure (check error parameter)
///
/// # Safety
/// - `context` must be NULL or a handle returned by this library
/// - `data` must be valid for `length` reads
#[no_mangle]
pub unsafe extern "C" fn ember_parallelize(
    context: *mut EmberContext,
    data: *const i32,
    length: usize,
    error: *mut *mut EmberError,
) -> *mut EmberRdd {
    let context = ContextRef::from_object_unchecked(ptr_to_object(context));
    let result = c_slice(data, length, "ember_parallelize", "data")
        .and_then(|data| Ok(bridge()?.parallelize(context, data)?));
    match result {
        Ok(rdd) => object_to_ptr(rdd.as_object()),
        Err(e) => {
            set_error(error, e);
            ptr::null_mut()
        }
    }
}

/// Apply a serialized closure to every element of a collection
///
/// The closure bytes are copied; the caller keeps ownership of `closure`.
///
/// # Arguments
/// * `rdd` - Collection from `ember_parallelize()` or `ember_rdd_map()`
/// * `closure` - Pointer to `length` bytes of serialized closure
/// * `length` - Number of bytes
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * Non-null collection handle on success
/// * NULL on failure (check error parameter)
///
/// # Safety
/// - `rdd` must be NULL or a handle returned by this library
/// - `closure` must be valid for `length` reads
#[no_mangle]
pub unsafe extern "C" fn ember_rdd_map(
    rdd: *mut EmberRdd,
    closure: *const u8,
    length: usize,
    error: *mut *mut EmberError,
) -> *mut EmberRdd {
    let rdd = CollectionRef::from_object_unchecked(ptr_to_object(rdd));
    let result = c_slice(closure, length, "ember_rdd_map", "closure").and_then(|bytes| {
        let closure = SerializedClosure::from(bytes);
        Ok(bridge()?.map(rdd, &closure)?)
    });
    match result {
        Ok(mapped) => object_to_ptr(mapped.as_object()),
        Err(e) => {
            set_error(error, e);
            ptr::null_mut()
        }
    }
}

/// Collect every element of a collection into a new buffer
///
/// # Arguments
/// * `rdd` - Collection to collect
/// * `buffer` - Receives a pointer to the elements
/// * `length` - Receives the number of elements
/// * `error` - Optional pointer to receive error information
///
/// # Returns
/// * 0 on success
/// * -1 on failure (check error parameter)
///
/// # Safety
/// - `rdd` must be NULL or a handle returned by this library
/// - `buffer` and `length` must point to writable storage
/// - On success the buffer must be released with `ember_buffer_free()`,
///   even when `*length` is 0
///
/// # Example (C)
/// ```c
/// int32_t* values = NULL;
/// size_t count = 0;
/// if (ember_collect(rdd, &values, &count, &error) == 0) {
///     for (size_t i = 0; i < count; i++) printf("%d\n", values[i]);
///     ember_buffer_free(values, count);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn ember_collect(
    rdd: *mut EmberRdd,
    buffer: *mut *mut i32,
    length: *mut usize,
    error: *mut *mut EmberError,
) -> c_int {
    const FUNCTION: &str = "ember_collect";

    if buffer.is_null() || length.is_null() {
        let argument = if buffer.is_null() { "buffer" } else { "length" };
        set_error(
            error,
            FfiError::NullPointer {
                function: FUNCTION,
                argument,
            },
        );
        return -1;
    }

    let rdd = CollectionRef::from_object_unchecked(ptr_to_object(rdd));
    match bridge().and_then(|b| Ok(b.collect(rdd)?)) {
        Ok(values) => {
            let values = values.into_boxed_slice();
            *length = values.len();
            *buffer = Box::into_raw(values) as *mut i32;
            0
        }
        Err(e) => {
            set_error(error, e);
            -1
        }
    }
}

/// Free a buffer returned by `ember_collect()`
///
/// # Arguments
/// * `buffer` - Buffer pointer (may be NULL)
/// * `length` - The length `ember_collect()` reported for it
///
/// # Safety
/// - Buffer must come from `ember_collect()` with exactly this length
/// - Buffer must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn ember_buffer_free(buffer: *mut i32, length: usize) {
    if buffer.is_null() {
        return;
    }
    let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(buffer, length));
}

// ============================================================================
// Errors and Version
// ============================================================================

/// Get error message
///
/// # Arguments
/// * `error` - Pointer to EmberError (may be NULL)
///
/// # Returns
/// * Null-terminated error message string
/// * NULL if error is NULL
///
/// # Safety
/// - Error pointer must be valid (created by Ember API)
/// - Returned string is valid until `ember_error_free()` is called
#[no_mangle]
pub unsafe extern "C" fn ember_error_message(error: *const EmberError) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }

    (*error).message
}

/// Free an error
///
/// # Arguments
/// * `error` - Pointer to EmberError (may be NULL)
///
/// # Safety
/// - Error pointer must be valid (created by Ember API)
/// - Error must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn ember_error_free(error: *mut EmberError) {
    if error.is_null() {
        return;
    }

    if !(*error).message.is_null() {
        let _ = CString::from_raw((*error).message);
    }

    let _ = Box::from_raw(error);
}

/// Get the Ember version string
///
/// # Returns
/// * Null-terminated version string (e.g., "0.1.0")
///
/// # Safety
/// - The returned string is a static string and must not be freed
#[no_mangle]
pub unsafe extern "C" fn ember_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// Tests
// ============================================================================

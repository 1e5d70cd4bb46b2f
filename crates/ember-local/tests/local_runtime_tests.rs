//! Tests for the local runtime's managed protocol
//!
//! These drive `ManagedEnv` directly, the way a bridge does, and check that
//! failures follow the "null result plus pending exception" protocol.

use ember_local::{HeapObject, LocalOptions, LocalRuntime, ResourceLimits};
use ember_sdk::{ArgValue, ManagedEnv, ManagedRuntime, MethodKind, ObjectRef};
use std::sync::Arc;
use std::thread;

const CONF: &str = "org/apache/spark/SparkConf";
const CONTEXT: &str = "org/apache/spark/api/java/JavaSparkContext";
const SET_APP_NAME: &str = "(Ljava/lang/String;)Lorg/apache/spark/SparkConf;";
const PARALLELIZE: &str =
    "(Lorg/apache/spark/api/java/JavaSparkContext;[I)Lorg/apache/spark/api/java/JavaRDD;";
const MAP: &str = "(Lorg/apache/spark/api/java/JavaRDD;[B)Lorg/apache/spark/api/java/JavaRDD;";
const COLLECT: &str = "(Lorg/apache/spark/api/java/JavaRDD;)[I";

fn take_exception(env: &dyn ManagedEnv) -> Option<String> {
    if !env.exception_check() {
        return None;
    }
    let throwable = env.exception_occurred();
    env.exception_clear();
    env.describe_throwable(throwable)
}

fn int_array(env: &dyn ManagedEnv, values: &[i32]) -> ObjectRef {
    let array = env.new_int_array(values.len());
    env.set_int_array_region(array, 0, values);
    array
}

fn read_ints(env: &dyn ManagedEnv, array: ObjectRef) -> Vec<i32> {
    let mut buf = vec![0; env.array_length(array)];
    env.get_int_array_region(array, 0, &mut buf);
    buf
}

/// SparkConf with an app name, then a context from it
fn context(env: &dyn ManagedEnv) -> ObjectRef {
    let conf_class = env.find_class(CONF).unwrap();
    let ctor = env.get_method_id(conf_class, "<init>", "()V").unwrap();
    let conf = env.new_object(conf_class, ctor, &[]);
    let set_app_name = env
        .get_method_id(conf_class, "setAppName", SET_APP_NAME)
        .unwrap();
    let name = env.new_string_utf("local-test");
    let returned = env.call_object_method(conf, set_app_name, &[name.into()]);
    assert_eq!(returned, conf);

    let context_class = env.find_class(CONTEXT).unwrap();
    let ctor = env
        .get_method_id(context_class, "<init>", "(Lorg/apache/spark/SparkConf;)V")
        .unwrap();
    let context = env.new_object(context_class, ctor, &[conf.into()]);
    assert!(!context.is_null());
    context
}

// ===== Attachment =====

#[test]
fn test_threads_attach_lazily() {
    let runtime = Arc::new(LocalRuntime::new());
    assert_eq!(runtime.attached_threads(), 0);
    assert!(!runtime.is_current_thread_attached());

    {
        let _env = runtime.attach_current_thread().unwrap();
        let _again = runtime.attach_current_thread().unwrap();
    }
    assert_eq!(runtime.attached_threads(), 1);
    assert_eq!(runtime.current_thread_acquisitions(), 2);

    let rt = Arc::clone(&runtime);
    thread::spawn(move || {
        let _env = rt.attach_current_thread().unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(runtime.attached_threads(), 2);
    assert_eq!(runtime.acquisitions(), 3);
    assert_eq!(runtime.name(), "local");
}

#[test]
fn test_thread_limit() {
    let runtime = Arc::new(LocalRuntime::with_options(
        LocalOptions::default().with_limits(ResourceLimits::with_thread_limit(1)),
    ));
    assert!(runtime.attach_current_thread().is_ok());

    let rt = Arc::clone(&runtime);
    let attached = thread::spawn(move || {
        let attached = rt.attach_current_thread().is_ok();
        attached
    })
    .join()
    .unwrap();
    assert!(!attached);

    // the already-attached thread is unaffected
    assert!(runtime.attach_current_thread().is_ok());
}

// ===== Reflection =====

#[test]
fn test_missing_class_leaves_exception_pending() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();

    assert!(env.find_class("org/apache/spark/Missing").is_none());
    assert!(env.exception_check());
    assert_eq!(
        runtime.pending_exception().as_deref(),
        Some("java.lang.NoClassDefFoundError: org/apache/spark/Missing")
    );

    // refused until cleared
    assert!(env.find_class(CONF).is_none());
    assert_eq!(runtime.protocol_violations(), 1);

    env.exception_clear();
    assert!(env.find_class(CONF).is_some());
}

#[test]
fn test_method_lookup_respects_kind_and_signature() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();
    let helper = env.find_class("Helper").unwrap();

    let collect = env.get_static_method_id(helper, "collect", COLLECT).unwrap();
    assert_eq!(collect.kind(), MethodKind::Static);

    assert!(env.get_method_id(helper, "collect", COLLECT).is_none());
    assert_eq!(
        take_exception(env.as_ref()).as_deref(),
        Some("java.lang.NoSuchMethodError: collect")
    );

    assert!(env.get_static_method_id(helper, "collect", "()[I").is_none());
    assert!(take_exception(env.as_ref()).is_some());
    assert_eq!(runtime.protocol_violations(), 0);
}

// ===== Arrays =====

#[test]
fn test_array_regions() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();

    let ints = int_array(env.as_ref(), &[5, 6, 7]);
    assert_eq!(read_ints(env.as_ref(), ints), vec![5, 6, 7]);

    let bytes = env.new_byte_array(3);
    env.set_byte_array_region(bytes, 1, &[0xff, 0x01]);
    let mut buf = [9u8; 3];
    env.get_byte_array_region(bytes, 0, &mut buf);
    assert_eq!(buf, [0, 0xff, 0x01]);

    let doubles = env.new_double_array(2);
    env.set_double_array_region(doubles, 0, &[1.5, -2.25]);
    assert_eq!(
        runtime.object(doubles),
        Some(HeapObject::DoubleArray(vec![1.5, -2.25]))
    );

    let empty = env.new_int_array(0);
    assert!(!empty.is_null());
    assert_eq!(env.array_length(empty), 0);
    assert!(!env.exception_check());
}

#[test]
fn test_region_out_of_bounds() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();

    let array = env.new_int_array(2);
    env.set_int_array_region(array, 1, &[1, 2]);
    let description = take_exception(env.as_ref()).unwrap();
    assert!(description.starts_with("java.lang.ArrayIndexOutOfBoundsException"));

    // a region copy into the wrong element type is rejected too
    env.set_byte_array_region(array, 0, &[1]);
    assert!(take_exception(env.as_ref())
        .unwrap()
        .starts_with("java.lang.IllegalArgumentException"));
}

#[test]
fn test_array_limit_raises_out_of_memory() {
    let runtime = LocalRuntime::with_options(
        LocalOptions::default().with_limits(ResourceLimits::with_array_limit(4)),
    );
    let env = runtime.attach_current_thread().unwrap();

    assert!(!env.new_int_array(4).is_null());
    assert!(env.new_double_array(5).is_null());
    assert_eq!(
        take_exception(env.as_ref()).as_deref(),
        Some("java.lang.OutOfMemoryError: Requested array size exceeds VM limit")
    );
}

#[test]
fn test_object_limit_raises_out_of_memory() {
    let runtime = LocalRuntime::with_options(
        LocalOptions::default().with_limits(ResourceLimits::with_object_limit(1)),
    );
    let env = runtime.attach_current_thread().unwrap();

    assert!(!env.new_string_utf("first").is_null());
    assert!(env.new_string_utf("second").is_null());
    assert_eq!(
        take_exception(env.as_ref()).as_deref(),
        Some("java.lang.OutOfMemoryError: Java heap space")
    );
}

// ===== Invocation =====

#[test]
fn test_helper_pipeline_is_lazy_and_ordered() {
    let runtime = LocalRuntime::with_options(LocalOptions::default().with_interpreter(
        |closure: &[u8], v: i32| -> Result<i32, String> {
            match closure {
                b"inc" => Ok(v + 1),
                b"fail" => Err(format!("cannot process {}", v)),
                _ => Ok(v),
            }
        },
    ));
    let env = runtime.attach_current_thread().unwrap();
    let context = context(env.as_ref());

    let helper = env.find_class("Helper").unwrap();
    let parallelize = env
        .get_static_method_id(helper, "parallelize", PARALLELIZE)
        .unwrap();
    let map = env.get_static_method_id(helper, "map", MAP).unwrap();
    let collect = env.get_static_method_id(helper, "collect", COLLECT).unwrap();

    let data = int_array(env.as_ref(), &[3, 1, 2]);
    let rdd = env.call_static_object_method(helper, parallelize, &[context.into(), data.into()]);

    let closure = env.new_byte_array(3);
    env.set_byte_array_region(closure, 0, b"inc");
    let inc = env.call_static_object_method(helper, map, &[rdd.into(), closure.into()]);

    let result = env.call_static_object_method(helper, collect, &[inc.into()]);
    assert_eq!(read_ints(env.as_ref(), result), vec![4, 2, 3]);

    // a failing closure only surfaces at collect
    let failing = env.new_byte_array(4);
    env.set_byte_array_region(failing, 0, b"fail");
    let broken = env.call_static_object_method(helper, map, &[inc.into(), failing.into()]);
    assert!(!broken.is_null());
    assert!(!env.exception_check());

    let result = env.call_static_object_method(helper, collect, &[broken.into()]);
    assert!(result.is_null());
    assert_eq!(
        take_exception(env.as_ref()).as_deref(),
        Some("org.apache.spark.SparkException: Job aborted due to stage failure: cannot process 4")
    );
    assert_eq!(runtime.protocol_violations(), 0);
}

#[test]
fn test_context_requires_app_name() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();

    let conf_class = env.find_class(CONF).unwrap();
    let ctor = env.get_method_id(conf_class, "<init>", "()V").unwrap();
    let conf = env.new_object(conf_class, ctor, &[]);

    let context_class = env.find_class(CONTEXT).unwrap();
    let ctor = env
        .get_method_id(context_class, "<init>", "(Lorg/apache/spark/SparkConf;)V")
        .unwrap();
    assert!(env.new_object(context_class, ctor, &[conf.into()]).is_null());
    assert_eq!(
        take_exception(env.as_ref()).as_deref(),
        Some("org.apache.spark.SparkException: An application name must be set in your configuration")
    );

    assert!(env
        .new_object(context_class, ctor, &[ObjectRef::null().into()])
        .is_null());
    assert_eq!(
        take_exception(env.as_ref()).as_deref(),
        Some("java.lang.NullPointerException: conf is null")
    );
}

#[test]
fn test_argument_validation() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();
    let context = context(env.as_ref());

    let helper = env.find_class("Helper").unwrap();
    let parallelize = env
        .get_static_method_id(helper, "parallelize", PARALLELIZE)
        .unwrap();

    // arity
    let result = env.call_static_object_method(helper, parallelize, &[context.into()]);
    assert!(result.is_null());
    assert!(take_exception(env.as_ref())
        .unwrap()
        .contains("wrong number of arguments"));

    // primitive in place of a reference
    let result =
        env.call_static_object_method(helper, parallelize, &[context.into(), ArgValue::Int(3)]);
    assert!(result.is_null());
    assert!(take_exception(env.as_ref()).unwrap().contains("argument 1"));

    // wrong array type
    let bytes = env.new_byte_array(1);
    let result =
        env.call_static_object_method(helper, parallelize, &[context.into(), bytes.into()]);
    assert!(result.is_null());
    assert!(take_exception(env.as_ref())
        .unwrap()
        .contains("argument 1 is [B, expected [I"));
}

#[test]
fn test_app_name_round_trip() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();
    let context = context(env.as_ref());

    let context_class = env.find_class(CONTEXT).unwrap();
    let app_name = env
        .get_method_id(context_class, "appName", "()Ljava/lang/String;")
        .unwrap();
    let name = env.call_object_method(context, app_name, &[]);
    assert_eq!(
        runtime.object(name),
        Some(HeapObject::Str("local-test".to_string()))
    );

    // receiver of the wrong class
    let conf_class = env.find_class(CONF).unwrap();
    let get_app_name = env
        .get_method_id(conf_class, "getAppName", "()Ljava/lang/String;")
        .unwrap();
    assert!(env.call_object_method(context, get_app_name, &[]).is_null());
    assert!(take_exception(env.as_ref()).is_some());
}

// ===== Exceptions =====

#[test]
fn test_describe_failure_leaves_secondary_exception() {
    let runtime = LocalRuntime::new();
    let env = runtime.attach_current_thread().unwrap();

    assert!(env.find_class("Nope").is_none());
    let throwable = env.exception_occurred();
    env.exception_clear();

    runtime.set_describe_fails(true);
    assert!(env.describe_throwable(throwable).is_none());
    assert!(env.exception_check());
    assert_eq!(
        runtime.pending_exception().as_deref(),
        Some("java.lang.StackOverflowError")
    );

    env.exception_clear();
    runtime.set_describe_fails(false);
    assert_eq!(
        env.describe_throwable(throwable).as_deref(),
        Some("java.lang.NoClassDefFoundError: Nope")
    );
}

#[test]
fn test_pending_exception_is_per_thread() {
    let runtime = Arc::new(LocalRuntime::new());
    let env = runtime.attach_current_thread().unwrap();
    assert!(env.find_class("Nope").is_none());
    assert!(env.exception_check());

    let rt = Arc::clone(&runtime);
    let other_clean = thread::spawn(move || {
        let env = rt.attach_current_thread().unwrap();
        let clean = !env.exception_check() && env.find_class(CONF).is_some();
        clean
    })
    .join()
    .unwrap();
    assert!(other_clean);
    assert!(env.exception_check());
}

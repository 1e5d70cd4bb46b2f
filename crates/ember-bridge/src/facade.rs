//! Distributed-operation facade
//!
//! The five operations an embedder sees. A computation moves through them
//! linearly, and the handle types make the order explicit:
//!
//! ```text
//! build_configuration -> ConfRef
//! build_context(ConfRef) -> ContextRef
//! parallelize(ContextRef, &[i32]) -> CollectionRef
//! map(CollectionRef, closure) -> CollectionRef      (repeatable)
//! collect(CollectionRef) -> Vec<i32>
//! ```
//!
//! Each operation acquires the calling thread's environment, resolves what
//! it needs, and checks for a pending exception after every managed call.
//! Failures are reported to the diagnostic sink and returned as `Err`; they
//! never unwind across the bridge.

use crate::config::BridgeConfig;
use crate::diagnostics::{DiagnosticSink, LogSink, LOG_TARGET};
use crate::env::Env;
use ember_sdk::{
    BridgeError, BridgeResult, CollectionRef, ConfRef, ContextRef, ManagedRuntime, ObjectRef,
    SerializedClosure,
};
use std::fmt;
use std::sync::Arc;

/// Entry point for driving the distributed engine.
///
/// Cheap to share between threads: it holds only the runtime, the
/// configuration and the sink. Environments are acquired per call.
pub struct SparkBridge<'rt> {
    runtime: &'rt dyn ManagedRuntime,
    config: BridgeConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl<'rt> SparkBridge<'rt> {
    /// Create a bridge with default configuration, reporting to `log`
    pub fn new(runtime: &'rt dyn ManagedRuntime) -> Self {
        Self {
            runtime,
            config: BridgeConfig::default(),
            sink: Arc::new(LogSink),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the diagnostic sink
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The runtime this bridge drives
    pub fn runtime(&self) -> &'rt dyn ManagedRuntime {
        self.runtime
    }

    /// Acquire the calling thread's environment; aborts if it cannot be attached.
    pub fn env(&self) -> Env<'_> {
        Env::acquire(self.runtime, self.sink.as_ref())
    }

    /// Acquire the calling thread's environment without aborting.
    pub fn try_env(&self) -> BridgeResult<Env<'_>> {
        Env::try_acquire(self.runtime, self.sink.as_ref())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create a configuration object with the given application name.
    pub fn build_configuration(&self, app_name: &str) -> BridgeResult<ConfRef> {
        let env = self.env();
        let spark = &self.config.spark;

        let class = env.resolve_class(&spark.conf_class)?;
        let set_app_name = env.resolve_method(
            class,
            &spark.set_app_name.name,
            &spark.set_app_name.signature,
            false,
        )?;

        let conf = env.construct(class, &spark.conf_constructor, &[])?;
        let conf = env.checked("build_configuration()", conf)?;

        let name = env.new_string(app_name)?;
        let returned = env.call_instance_method(conf, set_app_name, &[name.into()]);
        env.checked("setAppName()", returned)?;

        log::debug!(target: LOG_TARGET, "configuration for '{}' built", app_name);
        Ok(ConfRef::from_object_unchecked(conf))
    }

    /// Create a context object from a configuration.
    pub fn build_context(&self, conf: ConfRef) -> BridgeResult<ContextRef> {
        let env = self.env();
        let conf = non_null(&env, "build_context()", "conf", conf.as_object())?;
        let spark = &self.config.spark;

        let class = env.resolve_class(&spark.context_class)?;
        let context = env.construct(class, &spark.context_constructor, &[conf.into()])?;
        let context = env.checked("build_context()", context)?;

        log::debug!(target: LOG_TARGET, "context built");
        Ok(ContextRef::from_object_unchecked(context))
    }

    /// Distribute `data` as a new collection.
    pub fn parallelize(&self, context: ContextRef, data: &[i32]) -> BridgeResult<CollectionRef> {
        let env = self.env();
        let context = non_null(&env, "parallelize()", "context", context.as_object())?;
        let spark = &self.config.spark;

        let (helper, method) = env.resolve_static(
            &spark.helper_class,
            &spark.parallelize.name,
            &spark.parallelize.signature,
        )?;
        let array = env.new_int_array(data)?;

        let result = env.call_static_method(helper, method, &[context.into(), array.into()]);
        let collection = env.checked("parallelize()", result)?;

        log::debug!(target: LOG_TARGET, "parallelized {} elements", data.len());
        Ok(CollectionRef::from_object_unchecked(collection))
    }

    /// Apply a serialized host closure to every element of `collection`.
    pub fn map(
        &self,
        collection: CollectionRef,
        closure: &SerializedClosure,
    ) -> BridgeResult<CollectionRef> {
        let env = self.env();
        let collection = non_null(&env, "map()", "collection", collection.as_object())?;
        let spark = &self.config.spark;

        let closure_bytes = env.new_byte_array(closure.as_bytes())?;
        let (helper, method) =
            env.resolve_static(&spark.helper_class, &spark.map.name, &spark.map.signature)?;

        let result =
            env.call_static_method(helper, method, &[collection.into(), closure_bytes.into()]);
        let mapped = env.checked("map()", result)?;

        log::debug!(target: LOG_TARGET, "mapped closure of {} bytes", closure.len());
        Ok(CollectionRef::from_object_unchecked(mapped))
    }

    /// Bring every element of `collection` back into a host-owned buffer.
    pub fn collect(&self, collection: CollectionRef) -> BridgeResult<Vec<i32>> {
        let env = self.env();
        let collection = non_null(&env, "collect()", "collection", collection.as_object())?;
        let spark = &self.config.spark;

        let (helper, method) = env.resolve_static(
            &spark.helper_class,
            &spark.collect.name,
            &spark.collect.signature,
        )?;

        let result = env.call_static_method(helper, method, &[collection.into()]);
        let elements = env.checked("collect()", result)?;
        let values = env.read_int_array(elements)?;

        log::debug!(target: LOG_TARGET, "collected {} elements", values.len());
        Ok(values)
    }
}

impl fmt::Debug for SparkBridge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparkBridge")
            .field("runtime", &self.runtime.name())
            .field("config", &self.config)
            .finish()
    }
}

fn non_null(
    env: &Env<'_>,
    operation: &'static str,
    argument: &'static str,
    obj: ObjectRef,
) -> BridgeResult<ObjectRef> {
    obj.non_null().ok_or_else(|| {
        env.report(
            operation,
            BridgeError::NullHandle {
                operation,
                argument,
            },
        )
    })
}

//! LocalEnv: one thread's environment into a [`LocalRuntime`]
//!
//! Follows the managed runtime's failure protocol to the letter: a failing
//! call returns null (or `None`, or nothing) and leaves an exception pending
//! on the thread. Any call other than the exception primitives made while
//! an exception is pending is refused and counted as a protocol violation.

use crate::classes::{Builtin, MethodDef, OBJECT_CLASS};
use crate::descriptor::{FieldType, MethodDescriptor};
use crate::exceptions::{self, Thrown};
use crate::heap::{Dataset, HeapObject};
use crate::runtime::LocalRuntime;
use crate::LOG_TARGET;
use ember_sdk::{ArgValue, ClassRef, ManagedEnv, MethodKind, MethodRef, ObjectRef};
use std::marker::PhantomData;
use std::thread::ThreadId;

/// A thread's environment
pub(crate) struct LocalEnv<'a> {
    rt: &'a LocalRuntime,
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl<'a> LocalEnv<'a> {
    pub(crate) fn new(rt: &'a LocalRuntime, thread: ThreadId) -> Self {
        Self {
            rt,
            thread,
            _not_send: PhantomData,
        }
    }

    // ========================================================================
    // Exception state
    // ========================================================================

    fn pending(&self) -> Option<ObjectRef> {
        self.rt
            .threads
            .lock()
            .get(&self.thread)
            .and_then(|state| state.pending)
    }

    fn set_pending(&self, throwable: Option<ObjectRef>) {
        if let Some(state) = self.rt.threads.lock().get_mut(&self.thread) {
            state.pending = throwable;
        }
    }

    /// Refuse the call if an exception is pending
    fn guard(&self, operation: &str) -> bool {
        if self.pending().is_some() {
            self.rt.record_violation(operation);
            false
        } else {
            true
        }
    }

    fn throw(&self, thrown: Thrown) {
        log::debug!(
            target: LOG_TARGET,
            "throwing {}: {}",
            thrown.class,
            thrown.message.as_deref().unwrap_or("")
        );
        let throwable = self.rt.heap.lock().allocate_unchecked(HeapObject::Throwable {
            class: thrown.class.to_string(),
            message: thrown.message,
        });
        self.set_pending(Some(throwable));
    }

    /// Turn a call outcome into the managed protocol: the object, or null
    /// with an exception pending
    fn complete(&self, outcome: Result<ObjectRef, Thrown>) -> ObjectRef {
        match outcome {
            Ok(obj) => obj,
            Err(thrown) => {
                self.throw(thrown);
                ObjectRef::null()
            }
        }
    }

    // ========================================================================
    // Heap access
    // ========================================================================

    fn allocate(&self, obj: HeapObject) -> Result<ObjectRef, Thrown> {
        self.rt
            .heap
            .lock()
            .allocate(obj)
            .map_err(|e| Thrown::new(exceptions::OUT_OF_MEMORY, e.message()))
    }

    fn allocate_array(
        &self,
        len: usize,
        make: impl FnOnce(usize) -> HeapObject,
    ) -> Result<ObjectRef, Thrown> {
        let limit = self
            .rt
            .options
            .limits
            .max_array_len
            .unwrap_or(i32::MAX as usize);
        if len > limit.min(i32::MAX as usize) {
            return Err(Thrown::new(
                exceptions::OUT_OF_MEMORY,
                crate::heap::AllocError::ArrayTooLarge.message(),
            ));
        }
        self.allocate(make(len))
    }

    /// Read from a non-null object of the expected shape
    fn read<T>(
        &self,
        obj: ObjectRef,
        what: &str,
        f: impl FnOnce(&HeapObject) -> Option<T>,
    ) -> Result<T, Thrown> {
        if obj.is_null() {
            return Err(Thrown::null_pointer(what));
        }
        let heap = self.rt.heap.lock();
        heap.get(obj)
            .and_then(f)
            .ok_or_else(|| Thrown::illegal_argument(format!("{} has the wrong type", what)))
    }

    /// Modify a non-null object of the expected shape
    fn write(
        &self,
        obj: ObjectRef,
        what: &str,
        f: impl FnOnce(&mut HeapObject) -> Option<Result<(), Thrown>>,
    ) -> Result<(), Thrown> {
        if obj.is_null() {
            return Err(Thrown::null_pointer(what));
        }
        let mut heap = self.rt.heap.lock();
        heap.get_mut(obj)
            .and_then(f)
            .unwrap_or_else(|| Err(Thrown::illegal_argument(format!("{} has the wrong type", what))))
    }

    fn read_string(&self, obj: ObjectRef, what: &str) -> Result<String, Thrown> {
        self.read(obj, what, |o| match o {
            HeapObject::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn read_dataset(&self, obj: ObjectRef) -> Result<Dataset, Thrown> {
        self.read(obj, "rdd", |o| match o {
            HeapObject::Collection(ds) => Some(ds.clone()),
            _ => None,
        })
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    fn lookup_method(&self, method: MethodRef, kind: MethodKind) -> Result<&'a MethodDef, Thrown> {
        let rt: &'a LocalRuntime = self.rt;
        rt.classes
            .method(method)
            .filter(|def| def.kind == kind)
            .ok_or_else(|| Thrown::illegal_argument(format!("unknown {} id {:?}", kind, method)))
    }

    fn check_declared(&self, class: ClassRef, def: &MethodDef) -> Result<(), Thrown> {
        if (class.to_raw() as usize).checked_sub(1) == Some(def.class) {
            Ok(())
        } else {
            Err(Thrown::illegal_argument(format!(
                "{} is not declared by {}",
                def.name,
                self.rt.classes.class_name(class).unwrap_or("<unknown>")
            )))
        }
    }

    /// Check arity, primitive shapes and the class of every non-null
    /// reference argument against the method's descriptor
    fn check_args(&self, def: &MethodDef, args: &[ArgValue]) -> Result<(), Thrown> {
        let descriptor = MethodDescriptor::parse(def.descriptor)
            .map_err(|e| Thrown::new(exceptions::CLASS_FORMAT, e.to_string()))?;
        descriptor.check_args(args).map_err(|msg| {
            Thrown::illegal_argument(format!("{}{}: {}", def.name, def.descriptor, msg))
        })?;

        let heap = self.rt.heap.lock();
        for (index, (param, arg)) in descriptor.params.iter().zip(args).enumerate() {
            let obj = match (param, arg) {
                (FieldType::Object(name), _) if name == OBJECT_CLASS => continue,
                (_, ArgValue::Object(obj)) if !obj.is_null() => *obj,
                _ => continue,
            };
            let expected = param.type_name();
            let actual = heap.get(obj).map(HeapObject::type_name);
            if actual.as_deref() != Some(expected.as_str()) {
                return Err(Thrown::illegal_argument(format!(
                    "{}: argument {} is {}, expected {}",
                    def.name,
                    index,
                    actual.as_deref().unwrap_or("an invalid reference"),
                    expected
                )));
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        def: &MethodDef,
        receiver: ObjectRef,
        args: &[ArgValue],
    ) -> Result<ObjectRef, Thrown> {
        self.check_args(def, args)?;
        let arg = |index: usize| {
            args.get(index)
                .and_then(ArgValue::as_object)
                .unwrap_or_default()
        };

        match def.builtin {
            Builtin::ConfInit => self.allocate(HeapObject::Conf { app_name: None }),
            Builtin::SetAppName => {
                let name = arg(0);
                if name.is_null() {
                    return Err(Thrown::null_pointer("null value for spark.app.name"));
                }
                let name = self.read_string(name, "name")?;
                self.write(receiver, "conf", |o| match o {
                    HeapObject::Conf { app_name } => {
                        *app_name = Some(name);
                        Some(Ok(()))
                    }
                    _ => None,
                })?;
                Ok(receiver)
            }
            Builtin::ConfAppName => {
                let name = self.read(receiver, "conf", |o| match o {
                    HeapObject::Conf { app_name } => Some(app_name.clone()),
                    _ => None,
                })?;
                let name = name.ok_or_else(|| {
                    Thrown::new(exceptions::NO_SUCH_ELEMENT, "spark.app.name")
                })?;
                self.allocate(HeapObject::Str(name))
            }
            Builtin::ContextInit => {
                let app_name = self.read(arg(0), "conf", |o| match o {
                    HeapObject::Conf { app_name } => Some(app_name.clone()),
                    _ => None,
                })?;
                let app_name = app_name.ok_or_else(|| {
                    Thrown::new(
                        exceptions::SPARK_EXCEPTION,
                        "An application name must be set in your configuration",
                    )
                })?;
                log::debug!(target: LOG_TARGET, "context created for '{}'", app_name);
                self.allocate(HeapObject::Context { app_name })
            }
            Builtin::ContextAppName => {
                let name = self.read(receiver, "context", |o| match o {
                    HeapObject::Context { app_name } => Some(app_name.clone()),
                    _ => None,
                })?;
                self.allocate(HeapObject::Str(name))
            }
            Builtin::Parallelize => {
                self.read(arg(0), "sc", |o| match o {
                    HeapObject::Context { .. } => Some(()),
                    _ => None,
                })?;
                let source = self.read(arg(1), "data", |o| match o {
                    HeapObject::IntArray(a) => Some(a.clone()),
                    _ => None,
                })?;
                self.allocate(HeapObject::Collection(Dataset {
                    source,
                    stages: Vec::new(),
                }))
            }
            Builtin::Map => {
                let mut dataset = self.read_dataset(arg(0))?;
                let closure = self.read(arg(1), "closure", |o| match o {
                    HeapObject::ByteArray(a) => Some(a.clone()),
                    _ => None,
                })?;
                dataset.stages.push(closure);
                self.allocate(HeapObject::Collection(dataset))
            }
            Builtin::Collect => {
                let dataset = self.read_dataset(arg(0))?;
                let values = self.evaluate(&dataset)?;
                self.allocate_array(values.len(), |_| HeapObject::IntArray(values))
            }
        }
    }

    /// Run every stage over every element, in order
    fn evaluate(&self, dataset: &Dataset) -> Result<Vec<i32>, Thrown> {
        let interpreter = &self.rt.options.interpreter;
        dataset
            .source
            .iter()
            .map(|&value| {
                dataset.stages.iter().try_fold(value, |acc, stage| {
                    interpreter.apply(stage, acc).map_err(|msg| {
                        Thrown::new(
                            exceptions::SPARK_EXCEPTION,
                            format!("Job aborted due to stage failure: {}", msg),
                        )
                    })
                })
            })
            .collect()
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    fn set_region<T: Copy>(
        &self,
        operation: &str,
        array: ObjectRef,
        start: usize,
        values: &[T],
        select: impl FnOnce(&mut HeapObject) -> Option<&mut Vec<T>>,
    ) {
        if !self.guard(operation) {
            return;
        }
        let outcome = self.write(array, "array", |o| {
            let target = select(o)?;
            Some(copy_into(target, start, values))
        });
        if let Err(thrown) = outcome {
            self.throw(thrown);
        }
    }

    fn get_region<T: Copy>(
        &self,
        operation: &str,
        array: ObjectRef,
        start: usize,
        buf: &mut [T],
        select: impl FnOnce(&HeapObject) -> Option<&Vec<T>>,
    ) {
        if !self.guard(operation) {
            return;
        }
        let outcome = self
            .read(array, "array", |o| {
                let source = select(o)?;
                Some(copy_from(source, start, buf))
            })
            .and_then(|copied| copied);
        if let Err(thrown) = outcome {
            self.throw(thrown);
        }
    }

    fn new_array(&self, operation: &str, len: usize, make: fn(usize) -> HeapObject) -> ObjectRef {
        if !self.guard(operation) {
            return ObjectRef::null();
        }
        let outcome = self.allocate_array(len, make);
        self.complete(outcome)
    }
}

fn copy_into<T: Copy>(target: &mut [T], start: usize, values: &[T]) -> Result<(), Thrown> {
    let end = start
        .checked_add(values.len())
        .filter(|&end| end <= target.len())
        .ok_or_else(|| out_of_bounds(start, values.len(), target.len()))?;
    target[start..end].copy_from_slice(values);
    Ok(())
}

fn copy_from<T: Copy>(source: &[T], start: usize, buf: &mut [T]) -> Result<(), Thrown> {
    let end = start
        .checked_add(buf.len())
        .filter(|&end| end <= source.len())
        .ok_or_else(|| out_of_bounds(start, buf.len(), source.len()))?;
    buf.copy_from_slice(&source[start..end]);
    Ok(())
}

fn out_of_bounds(start: usize, len: usize, array_len: usize) -> Thrown {
    Thrown::new(
        exceptions::ARRAY_INDEX_OUT_OF_BOUNDS,
        format!(
            "Array region {}..{} out of bounds for length {}",
            start,
            start.saturating_add(len),
            array_len
        ),
    )
}

impl ManagedEnv for LocalEnv<'_> {
    fn find_class(&self, name: &str) -> Option<ClassRef> {
        if !self.guard("find_class") {
            return None;
        }
        let class = self.rt.classes.find_class(name);
        if class.is_none() {
            self.throw(Thrown::new(exceptions::NO_CLASS_DEF_FOUND, name));
        }
        class
    }

    fn get_method_id(&self, class: ClassRef, name: &str, signature: &str) -> Option<MethodRef> {
        if !self.guard("get_method_id") {
            return None;
        }
        let method = self
            .rt
            .classes
            .find_method(class, name, signature, MethodKind::Instance);
        if method.is_none() {
            self.throw(Thrown::new(exceptions::NO_SUCH_METHOD, name));
        }
        method
    }

    fn get_static_method_id(
        &self,
        class: ClassRef,
        name: &str,
        signature: &str,
    ) -> Option<MethodRef> {
        if !self.guard("get_static_method_id") {
            return None;
        }
        let method = self
            .rt
            .classes
            .find_method(class, name, signature, MethodKind::Static);
        if method.is_none() {
            self.throw(Thrown::new(exceptions::NO_SUCH_METHOD, name));
        }
        method
    }

    fn new_object(&self, class: ClassRef, ctor: MethodRef, args: &[ArgValue]) -> ObjectRef {
        if !self.guard("new_object") {
            return ObjectRef::null();
        }
        let outcome = self.lookup_method(ctor, MethodKind::Instance).and_then(|def| {
            if !def.is_constructor() {
                return Err(Thrown::illegal_argument(format!(
                    "{} is not a constructor",
                    def.name
                )));
            }
            self.check_declared(class, def)?;
            self.invoke(def, ObjectRef::null(), args)
        });
        self.complete(outcome)
    }

    fn call_object_method(
        &self,
        receiver: ObjectRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef {
        if !self.guard("call_object_method") {
            return ObjectRef::null();
        }
        let outcome = self.lookup_method(method, MethodKind::Instance).and_then(|def| {
            if def.is_constructor() {
                return Err(Thrown::illegal_argument("constructors cannot be called"));
            }
            let declaring = self.rt.classes.class_name_at(def.class);
            self.read(receiver, "receiver", |o| {
                (Some(o.type_name().as_str()) == declaring).then_some(())
            })?;
            self.invoke(def, receiver, args)
        });
        self.complete(outcome)
    }

    fn call_static_object_method(
        &self,
        class: ClassRef,
        method: MethodRef,
        args: &[ArgValue],
    ) -> ObjectRef {
        if !self.guard("call_static_object_method") {
            return ObjectRef::null();
        }
        let outcome = self.lookup_method(method, MethodKind::Static).and_then(|def| {
            self.check_declared(class, def)?;
            self.invoke(def, ObjectRef::null(), args)
        });
        self.complete(outcome)
    }

    fn new_string_utf(&self, s: &str) -> ObjectRef {
        if !self.guard("new_string_utf") {
            return ObjectRef::null();
        }
        let outcome = self.allocate(HeapObject::Str(s.to_string()));
        self.complete(outcome)
    }

    fn new_int_array(&self, len: usize) -> ObjectRef {
        self.new_array("new_int_array", len, |len| {
            HeapObject::IntArray(vec![0; len])
        })
    }

    fn new_byte_array(&self, len: usize) -> ObjectRef {
        self.new_array("new_byte_array", len, |len| {
            HeapObject::ByteArray(vec![0; len])
        })
    }

    fn new_double_array(&self, len: usize) -> ObjectRef {
        self.new_array("new_double_array", len, |len| {
            HeapObject::DoubleArray(vec![0.0; len])
        })
    }

    fn set_int_array_region(&self, array: ObjectRef, start: usize, values: &[i32]) {
        self.set_region("set_int_array_region", array, start, values, |o| match o {
            HeapObject::IntArray(a) => Some(a),
            _ => None,
        })
    }

    fn set_byte_array_region(&self, array: ObjectRef, start: usize, values: &[u8]) {
        self.set_region("set_byte_array_region", array, start, values, |o| match o {
            HeapObject::ByteArray(a) => Some(a),
            _ => None,
        })
    }

    fn set_double_array_region(&self, array: ObjectRef, start: usize, values: &[f64]) {
        self.set_region("set_double_array_region", array, start, values, |o| match o {
            HeapObject::DoubleArray(a) => Some(a),
            _ => None,
        })
    }

    fn array_length(&self, array: ObjectRef) -> usize {
        if !self.guard("array_length") {
            return 0;
        }
        match self.read(array, "array", HeapObject::array_len) {
            Ok(len) => len,
            Err(thrown) => {
                self.throw(thrown);
                0
            }
        }
    }

    fn get_int_array_region(&self, array: ObjectRef, start: usize, buf: &mut [i32]) {
        self.get_region("get_int_array_region", array, start, buf, |o| match o {
            HeapObject::IntArray(a) => Some(a),
            _ => None,
        })
    }

    fn get_byte_array_region(&self, array: ObjectRef, start: usize, buf: &mut [u8]) {
        self.get_region("get_byte_array_region", array, start, buf, |o| match o {
            HeapObject::ByteArray(a) => Some(a),
            _ => None,
        })
    }

    fn get_double_array_region(&self, array: ObjectRef, start: usize, buf: &mut [f64]) {
        self.get_region("get_double_array_region", array, start, buf, |o| match o {
            HeapObject::DoubleArray(a) => Some(a),
            _ => None,
        })
    }

    fn exception_check(&self) -> bool {
        self.pending().is_some()
    }

    fn exception_occurred(&self) -> ObjectRef {
        self.pending().unwrap_or_default()
    }

    fn exception_clear(&self) {
        self.set_pending(None);
    }

    fn describe_throwable(&self, throwable: ObjectRef) -> Option<String> {
        if !self.guard("describe_throwable") {
            return None;
        }
        if self.rt.describe_fails() {
            self.throw(Thrown::bare(exceptions::STACK_OVERFLOW));
            return None;
        }
        match self.read(throwable, "throwable", HeapObject::render_throwable) {
            Ok(text) => Some(text),
            Err(thrown) => {
                self.throw(thrown);
                None
            }
        }
    }
}

//! LocalRuntime: the in-process managed runtime
//!
//! Owns the class table, the heap and the per-thread state. Threads attach
//! lazily on their first `attach_current_thread` and stay attached for the
//! runtime's lifetime.

use crate::classes::ClassTable;
use crate::env::LocalEnv;
use crate::heap::{Heap, HeapObject};
use crate::options::LocalOptions;
use crate::LOG_TARGET;
use ember_sdk::{BridgeError, BridgeResult, ManagedEnv, ManagedRuntime, ObjectRef};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

/// State of one attached thread
#[derive(Debug, Default)]
pub(crate) struct ThreadState {
    /// Number of times this thread acquired an environment
    pub acquisitions: u64,
    /// The thread's pending exception
    pub pending: Option<ObjectRef>,
}

/// In-process managed runtime.
///
/// Order-preserving: collecting a collection yields its elements in the
/// order they were parallelized.
pub struct LocalRuntime {
    pub(crate) options: LocalOptions,
    pub(crate) classes: ClassTable,
    pub(crate) heap: Mutex<Heap>,
    pub(crate) threads: Mutex<HashMap<ThreadId, ThreadState>>,
    acquisitions: AtomicU64,
    violations: AtomicU64,
    describe_fails: AtomicBool,
}

impl LocalRuntime {
    /// Create a runtime with default options
    pub fn new() -> Self {
        Self::with_options(LocalOptions::default())
    }

    /// Create a runtime with custom options
    pub fn with_options(options: LocalOptions) -> Self {
        let classes = ClassTable::standard(&options.helper_class);
        log::debug!(
            target: LOG_TARGET,
            "local runtime created with {} classes, limits {:?}",
            classes.class_count(),
            options.limits
        );
        Self {
            heap: Mutex::new(Heap::new(options.limits)),
            classes,
            options,
            threads: Mutex::new(HashMap::new()),
            acquisitions: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            describe_fails: AtomicBool::new(false),
        }
    }

    /// The options this runtime was created with
    pub fn options(&self) -> &LocalOptions {
        &self.options
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of threads attached so far
    pub fn attached_threads(&self) -> usize {
        self.threads.lock().len()
    }

    /// Whether the calling thread is attached
    pub fn is_current_thread_attached(&self) -> bool {
        self.threads.lock().contains_key(&thread::current().id())
    }

    /// Number of environments handed out, across all threads
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Number of environments the calling thread has acquired
    pub fn current_thread_acquisitions(&self) -> u64 {
        self.threads
            .lock()
            .get(&thread::current().id())
            .map_or(0, |state| state.acquisitions)
    }

    /// Number of objects on the heap
    pub fn live_objects(&self) -> usize {
        self.heap.lock().len()
    }

    /// Number of calls made while an exception was pending.
    ///
    /// Such calls are undefined behavior on a real VM; here they are
    /// refused and counted.
    pub fn protocol_violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// The calling thread's pending exception, rendered, without clearing it
    pub fn pending_exception(&self) -> Option<String> {
        let pending = self
            .threads
            .lock()
            .get(&thread::current().id())
            .and_then(|state| state.pending)?;
        self.heap.lock().get(pending)?.render_throwable()
    }

    /// Snapshot of a heap object
    pub fn object(&self, obj: ObjectRef) -> Option<HeapObject> {
        self.heap.lock().get(obj).cloned()
    }

    /// Make `toString()` on throwables throw, so describing an exception fails
    pub fn set_describe_fails(&self, fails: bool) {
        self.describe_fails.store(fails, Ordering::Relaxed);
    }

    pub(crate) fn describe_fails(&self) -> bool {
        self.describe_fails.load(Ordering::Relaxed)
    }

    pub(crate) fn record_violation(&self, operation: &str) {
        self.violations.fetch_add(1, Ordering::Relaxed);
        log::error!(
            target: LOG_TARGET,
            "{} called with an exception pending",
            operation
        );
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRuntime")
            .field("options", &self.options)
            .field("live_objects", &self.live_objects())
            .field("attached_threads", &self.attached_threads())
            .finish()
    }
}

impl ManagedRuntime for LocalRuntime {
    fn name(&self) -> &str {
        "local"
    }

    fn attach_current_thread(&self) -> BridgeResult<Box<dyn ManagedEnv + '_>> {
        let id = thread::current().id();
        {
            let mut threads = self.threads.lock();
            let attached = threads.len();
            let state = match threads.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    if let Some(max) = self.options.limits.max_threads {
                        if attached >= max {
                            return Err(BridgeError::Environment(format!(
                                "thread limit of {} reached",
                                max
                            )));
                        }
                    }
                    log::debug!(target: LOG_TARGET, "attached thread {:?}", id);
                    entry.insert(ThreadState::default())
                }
            };
            state.acquisitions += 1;
        }
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(LocalEnv::new(self, id)))
    }
}

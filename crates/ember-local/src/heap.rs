//! Object heap
//!
//! A slab of managed objects addressed by `ObjectRef` (slot index + 1, so
//! the null reference never names a slot). Objects live until the runtime
//! is dropped; nothing is reclaimed.

use crate::options::ResourceLimits;
use ember_sdk::{ObjectRef, RawRef};

/// Type name of managed strings
pub const STRING_CLASS: &str = "java/lang/String";

/// A lazily evaluated distributed collection.
///
/// `map` only appends a stage; stages run when the collection is collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Elements as parallelized
    pub source: Vec<i32>,
    /// Serialized closures to apply, in order
    pub stages: Vec<Vec<u8>>,
}

/// A managed object
#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    /// `java/lang/String`
    Str(String),
    /// `[I`
    IntArray(Vec<i32>),
    /// `[B`
    ByteArray(Vec<u8>),
    /// `[D`
    DoubleArray(Vec<f64>),
    /// Engine configuration
    Conf {
        /// Application name, once set
        app_name: Option<String>,
    },
    /// Engine context, holding the application name it was created with
    Context {
        /// Application name taken from the configuration
        app_name: String,
    },
    /// Distributed collection
    Collection(Dataset),
    /// A thrown exception
    Throwable {
        /// Dotted class name, e.g. `java.lang.NullPointerException`
        class: String,
        /// Detail message
        message: Option<String>,
    },
}

impl HeapObject {
    /// Slash-separated class name (descriptor for arrays)
    pub fn type_name(&self) -> String {
        match self {
            HeapObject::Str(_) => STRING_CLASS.to_string(),
            HeapObject::IntArray(_) => "[I".to_string(),
            HeapObject::ByteArray(_) => "[B".to_string(),
            HeapObject::DoubleArray(_) => "[D".to_string(),
            HeapObject::Conf { .. } => crate::classes::CONF_CLASS.to_string(),
            HeapObject::Context { .. } => crate::classes::CONTEXT_CLASS.to_string(),
            HeapObject::Collection(_) => crate::classes::COLLECTION_CLASS.to_string(),
            HeapObject::Throwable { class, .. } => class.replace('.', "/"),
        }
    }

    /// Array length, if this is an array
    pub fn array_len(&self) -> Option<usize> {
        match self {
            HeapObject::IntArray(a) => Some(a.len()),
            HeapObject::ByteArray(a) => Some(a.len()),
            HeapObject::DoubleArray(a) => Some(a.len()),
            _ => None,
        }
    }

    /// Render a throwable the way `Throwable.toString()` does
    pub fn render_throwable(&self) -> Option<String> {
        match self {
            HeapObject::Throwable {
                class,
                message: Some(message),
            } => Some(format!("{}: {}", class, message)),
            HeapObject::Throwable {
                class,
                message: None,
            } => Some(class.clone()),
            _ => None,
        }
    }
}

/// Why an allocation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Array longer than `max_array_len`
    ArrayTooLarge,
    /// Live object count at `max_objects`
    HeapExhausted,
}

impl AllocError {
    /// `OutOfMemoryError` detail message for this failure
    pub fn message(self) -> &'static str {
        match self {
            AllocError::ArrayTooLarge => "Requested array size exceeds VM limit",
            AllocError::HeapExhausted => "Java heap space",
        }
    }
}

/// The object heap
#[derive(Debug)]
pub struct Heap {
    slots: Vec<HeapObject>,
    limits: ResourceLimits,
}

impl Heap {
    /// Create an empty heap
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            slots: Vec::new(),
            limits,
        }
    }

    /// Allocate an object, honoring the resource limits
    pub fn allocate(&mut self, obj: HeapObject) -> Result<ObjectRef, AllocError> {
        if let (Some(max), Some(len)) = (self.limits.max_array_len, obj.array_len()) {
            if len > max {
                return Err(AllocError::ArrayTooLarge);
            }
        }
        if let Some(max) = self.limits.max_objects {
            if self.slots.len() >= max {
                return Err(AllocError::HeapExhausted);
            }
        }
        Ok(self.allocate_unchecked(obj))
    }

    /// Allocate an object, ignoring the limits.
    ///
    /// Used for throwables, so an `OutOfMemoryError` can always be raised.
    pub fn allocate_unchecked(&mut self, obj: HeapObject) -> ObjectRef {
        self.slots.push(obj);
        ObjectRef::from_raw(self.slots.len() as RawRef)
    }

    /// Look up an object
    pub fn get(&self, obj: ObjectRef) -> Option<&HeapObject> {
        let index = (obj.to_raw() as usize).checked_sub(1)?;
        self.slots.get(index)
    }

    /// Look up an object mutably
    pub fn get_mut(&mut self, obj: ObjectRef) -> Option<&mut HeapObject> {
        let index = (obj.to_raw() as usize).checked_sub(1)?;
        self.slots.get_mut(index)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_never_resolves() {
        let mut heap = Heap::new(ResourceLimits::default());
        let s = heap.allocate(HeapObject::Str("x".into())).unwrap();
        assert!(!s.is_null());
        assert!(heap.get(ObjectRef::null()).is_none());
        assert_eq!(heap.get(s), Some(&HeapObject::Str("x".into())));
    }

    #[test]
    fn test_limits() {
        let mut heap = Heap::new(ResourceLimits {
            max_array_len: Some(2),
            max_objects: Some(2),
            ..Default::default()
        });
        assert_eq!(
            heap.allocate(HeapObject::IntArray(vec![1, 2, 3])),
            Err(AllocError::ArrayTooLarge)
        );
        heap.allocate(HeapObject::IntArray(vec![1, 2])).unwrap();
        heap.allocate(HeapObject::Str("a".into())).unwrap();
        assert_eq!(
            heap.allocate(HeapObject::Str("b".into())),
            Err(AllocError::HeapExhausted)
        );

        // throwables bypass the limits
        let oom = heap.allocate_unchecked(HeapObject::Throwable {
            class: "java.lang.OutOfMemoryError".into(),
            message: Some(AllocError::HeapExhausted.message().into()),
        });
        assert_eq!(
            heap.get(oom).and_then(HeapObject::render_throwable).as_deref(),
            Some("java.lang.OutOfMemoryError: Java heap space")
        );
        assert_eq!(heap.len(), 3);
    }
}

//! Opaque handles and call arguments
//!
//! Every reference into the managed runtime travels as a raw `u64`. The raw
//! bits are a backend detail (a JNI local reference, a heap slot, ...); the
//! newtypes below exist so a class can never be passed where an object is
//! expected, and a configuration never where a collection is expected.
//!
//! # Validity
//!
//! Handles are scoped to the environment that produced them. They are `Copy`
//! so they can be threaded through a computation, but the bridge never caches
//! them across threads or across re-attachment.

use std::fmt;

/// Raw handle bits as produced by a backend. `0` is the null reference.
pub type RawRef = u64;

const NULL_RAW: RawRef = 0;

// ============================================================================
// Object references
// ============================================================================

/// Reference to any object living in the managed heap.
///
/// May be null. A null `ObjectRef` is only meaningful immediately after a
/// call, as a signal to check for a pending exception.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectRef(RawRef);

impl ObjectRef {
    /// The null reference
    #[inline]
    pub const fn null() -> Self {
        Self(NULL_RAW)
    }

    /// Wrap raw backend bits
    #[inline(always)]
    pub const fn from_raw(raw: RawRef) -> Self {
        Self(raw)
    }

    /// Get raw backend bits
    #[inline(always)]
    pub const fn to_raw(self) -> RawRef {
        self.0
    }

    /// Check if this is the null reference
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == NULL_RAW
    }

    /// `Some(self)` if non-null
    #[inline]
    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectRef::Null")
        } else {
            write!(f, "ObjectRef({:#x})", self.0)
        }
    }
}

/// Declares a role-tagged wrapper around a non-null `ObjectRef`.
macro_rules! object_role {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(ObjectRef);

        impl $name {
            /// Tag an object reference with this role. Returns `None` for null.
            #[inline]
            pub fn new(obj: ObjectRef) -> Option<Self> {
                obj.non_null().map(Self)
            }

            /// Tag an object reference without the null check.
            ///
            /// Used at the C boundary, where handles come back from foreign
            /// code; the facade re-validates before use.
            #[inline]
            pub const fn from_object_unchecked(obj: ObjectRef) -> Self {
                Self(obj)
            }

            /// The underlying object reference
            #[inline]
            pub const fn as_object(self) -> ObjectRef {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0.to_raw())
            }
        }
    };
}

object_role! {
    /// A configured engine configuration object (`SparkConf`).
    ConfRef
}

object_role! {
    /// An engine context object (`JavaSparkContext`).
    ContextRef
}

object_role! {
    /// A handle to a distributed collection (`JavaRDD`).
    ///
    /// Produced by parallelize and map, consumed by map and collect.
    CollectionRef
}

// ============================================================================
// Class and method references
// ============================================================================

/// A resolved class. Never null; absence is reported by the resolver.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ClassRef(RawRef);

impl ClassRef {
    /// Wrap raw backend bits. Returns `None` for null.
    #[inline]
    pub const fn from_raw(raw: RawRef) -> Option<Self> {
        if raw == NULL_RAW {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Get raw backend bits
    #[inline(always)]
    pub const fn to_raw(self) -> RawRef {
        self.0
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({:#x})", self.0)
    }
}

/// Whether a method is looked up and invoked statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Instance method or constructor
    Instance,
    /// Static method
    Static,
}

impl MethodKind {
    /// Map the resolver's `is_static` flag to a kind
    pub const fn from_static(is_static: bool) -> Self {
        if is_static {
            MethodKind::Static
        } else {
            MethodKind::Instance
        }
    }

    /// Check if this is a static method
    pub const fn is_static(self) -> bool {
        matches!(self, MethodKind::Static)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Instance => write!(f, "method"),
            MethodKind::Static => write!(f, "static method"),
        }
    }
}

/// A resolved method ID together with how it must be invoked.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    raw: RawRef,
    kind: MethodKind,
}

impl MethodRef {
    /// Wrap raw backend bits. Returns `None` for null.
    #[inline]
    pub const fn from_raw(raw: RawRef, kind: MethodKind) -> Option<Self> {
        if raw == NULL_RAW {
            None
        } else {
            Some(Self { raw, kind })
        }
    }

    /// Get raw backend bits
    #[inline(always)]
    pub const fn to_raw(self) -> RawRef {
        self.raw
    }

    /// How this method is invoked
    #[inline]
    pub const fn kind(self) -> MethodKind {
        self.kind
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({:#x}, {:?})", self.raw, self.kind)
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// One positional argument of a managed call.
///
/// The variants mirror the managed runtime's primitive encoding. An argument
/// vector must match the target method's descriptor; nothing below the facade
/// checks that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgValue {
    /// Object reference (`L...;` or `[...`)
    Object(ObjectRef),
    /// `Z`
    Bool(bool),
    /// `B`
    Byte(i8),
    /// `C` (UTF-16 code unit)
    Char(u16),
    /// `S`
    Short(i16),
    /// `I`
    Int(i32),
    /// `J`
    Long(i64),
    /// `F`
    Float(f32),
    /// `D`
    Double(f64),
}

impl ArgValue {
    /// The descriptor character for this argument's type
    pub const fn descriptor_char(&self) -> char {
        match self {
            ArgValue::Object(_) => 'L',
            ArgValue::Bool(_) => 'Z',
            ArgValue::Byte(_) => 'B',
            ArgValue::Char(_) => 'C',
            ArgValue::Short(_) => 'S',
            ArgValue::Int(_) => 'I',
            ArgValue::Long(_) => 'J',
            ArgValue::Float(_) => 'F',
            ArgValue::Double(_) => 'D',
        }
    }

    /// Extract an object reference
    pub const fn as_object(&self) -> Option<ObjectRef> {
        match self {
            ArgValue::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    /// Extract an int
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<ObjectRef> for ArgValue {
    fn from(obj: ObjectRef) -> Self {
        ArgValue::Object(obj)
    }
}

impl From<ConfRef> for ArgValue {
    fn from(conf: ConfRef) -> Self {
        ArgValue::Object(conf.as_object())
    }
}

impl From<ContextRef> for ArgValue {
    fn from(ctx: ContextRef) -> Self {
        ArgValue::Object(ctx.as_object())
    }
}

impl From<CollectionRef> for ArgValue {
    fn from(coll: CollectionRef) -> Self {
        ArgValue::Object(coll.as_object())
    }
}

impl From<i32> for ArgValue {
    fn from(i: i32) -> Self {
        ArgValue::Int(i)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<f64> for ArgValue {
    fn from(d: f64) -> Self {
        ArgValue::Double(d)
    }
}

// ============================================================================
// Serialized closures
// ============================================================================

/// A host-side function value in serialized form.
///
/// The bytes are produced and later interpreted by collaborators outside the
/// bridge; the bridge only copies them into a managed byte array.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SerializedClosure {
    bytes: Vec<u8>,
}

impl SerializedClosure {
    /// Wrap serialized closure bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take back the payload
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<&[u8]> for SerializedClosure {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for SerializedClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedClosure")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_null() {
        let null = ObjectRef::null();
        assert!(null.is_null());
        assert_eq!(null.non_null(), None);
        assert_eq!(ObjectRef::default(), null);

        let obj = ObjectRef::from_raw(7);
        assert!(!obj.is_null());
        assert_eq!(obj.non_null(), Some(obj));
        assert_eq!(obj.to_raw(), 7);
    }

    #[test]
    fn test_roles_reject_null() {
        assert!(ConfRef::new(ObjectRef::null()).is_none());
        assert!(ContextRef::new(ObjectRef::null()).is_none());
        assert!(CollectionRef::new(ObjectRef::null()).is_none());

        let coll = CollectionRef::new(ObjectRef::from_raw(3)).unwrap();
        assert_eq!(coll.as_object().to_raw(), 3);
    }

    #[test]
    fn test_class_and_method_refs() {
        assert!(ClassRef::from_raw(0).is_none());
        assert_eq!(ClassRef::from_raw(9).unwrap().to_raw(), 9);

        assert!(MethodRef::from_raw(0, MethodKind::Static).is_none());
        let m = MethodRef::from_raw(4, MethodKind::from_static(true)).unwrap();
        assert!(m.kind().is_static());
        assert_eq!(m.to_raw(), 4);
    }

    #[test]
    fn test_arg_value_descriptor_chars() {
        assert_eq!(ArgValue::from(ObjectRef::null()).descriptor_char(), 'L');
        assert_eq!(ArgValue::from(5).descriptor_char(), 'I');
        assert_eq!(ArgValue::from(true).descriptor_char(), 'Z');
        assert_eq!(ArgValue::Long(1).descriptor_char(), 'J');
        assert_eq!(ArgValue::from(1.5).descriptor_char(), 'D');
        assert_eq!(ArgValue::Int(3).as_int(), Some(3));
        assert_eq!(ArgValue::Int(3).as_object(), None);
    }

    #[test]
    fn test_debug_format() {
        let s = format!("{:?}", ObjectRef::from_raw(0x10));
        assert!(s.contains("0x10"));
        assert_eq!(format!("{:?}", ObjectRef::null()), "ObjectRef::Null");

        let closure = SerializedClosure::new(vec![1u8, 2, 3]);
        assert!(format!("{:?}", closure).contains("len: 3"));
    }
}

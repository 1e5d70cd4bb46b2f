//! Closure interpretation
//!
//! The bridge ships closures as opaque bytes. Executing them is the host's
//! business, so the local runtime delegates to a [`ClosureInterpreter`]
//! supplied by whoever builds it.

/// Applies a serialized closure to one collection element.
pub trait ClosureInterpreter: Send + Sync {
    /// Apply `closure` to `value`. An `Err` aborts the job that evaluated it.
    fn apply(&self, closure: &[u8], value: i32) -> Result<i32, String>;
}

/// Treats every closure as the identity function.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityInterpreter;

impl ClosureInterpreter for IdentityInterpreter {
    fn apply(&self, _closure: &[u8], value: i32) -> Result<i32, String> {
        Ok(value)
    }
}

impl<F> ClosureInterpreter for F
where
    F: Fn(&[u8], i32) -> Result<i32, String> + Send + Sync,
{
    fn apply(&self, closure: &[u8], value: i32) -> Result<i32, String> {
        self(closure, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(IdentityInterpreter.apply(b"anything", 7), Ok(7));
    }

    #[test]
    fn test_fn_interpreter() {
        let double = |_: &[u8], v: i32| -> Result<i32, String> { Ok(v * 2) };
        assert_eq!(double.apply(&[], 21), Ok(42));
    }
}

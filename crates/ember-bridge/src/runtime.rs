//! Process-wide runtime slot
//!
//! The managed runtime is created by the embedder's bootstrap code and
//! installed here exactly once. After that it is read-only shared state;
//! there is no way to replace or tear it down.

use crate::diagnostics::LOG_TARGET;
use ember_sdk::{BridgeError, BridgeResult, ManagedRuntime};
use once_cell::sync::OnceCell;

static RUNTIME: OnceCell<Box<dyn ManagedRuntime>> = OnceCell::new();

/// Install the process-wide runtime.
///
/// Fails with [`BridgeError::AlreadyInstalled`] on every call after the first.
pub fn install(runtime: Box<dyn ManagedRuntime>) -> BridgeResult<()> {
    let name = runtime.name().to_string();
    RUNTIME
        .set(runtime)
        .map_err(|_| BridgeError::AlreadyInstalled)?;
    log::info!(target: LOG_TARGET, "installed managed runtime '{}'", name);
    Ok(())
}

/// The installed runtime
pub fn installed() -> BridgeResult<&'static dyn ManagedRuntime> {
    RUNTIME
        .get()
        .map(|rt| &**rt)
        .ok_or(BridgeError::NotInstalled)
}

/// Check if a runtime has been installed
pub fn is_installed() -> bool {
    RUNTIME.get().is_some()
}

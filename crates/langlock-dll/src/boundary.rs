//! Panic containment for foreign entry points.
//!
//! Unwinding across an `extern "system"` boundary aborts the host process.
//! Every exported function runs its body through [`guarded`], which turns a
//! panic into a logged error and a neutral return value.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

/// Runs `body`, returning `fallback` if it panics.
pub fn guarded<T>(entry: &'static str, fallback: T, body: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(entry, %message, "panic stopped at the library boundary");
            fallback
        }
    }
}

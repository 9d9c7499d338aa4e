//! Domain entities for the input-language locker.
//!
//! Pure values and the shared lock context.  Nothing here calls into the OS;
//! the atomics in [`state`] are the only concession to the fact that hook
//! callbacks run on OS-chosen threads.

/// Opaque keyboard layout identifiers.
pub mod layout;

/// The process-wide lock context shared with detector callbacks.
pub mod state;

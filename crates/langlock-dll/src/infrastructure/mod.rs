//! Infrastructure layer of the locker library.
//!
//! Contains the OS-facing adapters (`win32`), configuration file loading
//! (`storage`), diagnostic log setup (`logging`) and the COM bookkeeping
//! the adapters rely on (`com_state`).
//!
//! **Dependency rule**: this layer implements the traits of `langlock_core`
//! and may depend on it, never the other way round.

pub mod com_state;
pub mod logging;
pub mod storage;

#[cfg(target_os = "windows")]
pub mod win32;

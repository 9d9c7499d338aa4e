//! # lang_locker
//!
//! Windows library that keeps the input language of its host process fixed.
//!
//! A host (a Java IDE plugin through JNI, or any native program) calls
//! `LockInputLanguage` with a keyboard layout handle.  From then on, any
//! switch made with the language bar, a hotkey or a text service is detected
//! by one of three channels and undone shortly after, until
//! `UnlockInputLanguage` is called.
//!
//! # Crate layout
//!
//! - **`bridge`** – the exported C and JNI entry points plus `DllMain`.
//! - **`runtime`** – the single per-process locker that the exports and the
//!   OS callbacks share.
//! - **`infrastructure`** – Win32 implementations of the `langlock_core`
//!   traits, the optional `lang-locker.toml` config and logging.
//! - **`boundary`** – panic containment for foreign calls.
//!
//! The lock semantics themselves live in `langlock_core` and are tested
//! there without any OS involvement.

pub mod boundary;
pub mod infrastructure;

#[cfg(target_os = "windows")]
pub mod bridge;
#[cfg(target_os = "windows")]
pub mod runtime;

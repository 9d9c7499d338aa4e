//! Exported entry points.
//!
//! Native hosts call `LockInputLanguage` / `UnlockInputLanguage`.  Java
//! hosts bind the JNI-mangled aliases of the `LockEngine` class, for both
//! package names the plugin has shipped under; the JNI environment and
//! class arguments are unused.
//!
//! A layout handle crosses the boundary as a pointer-sized integer on the
//! native exports and as a 64-bit `jlong` on the JNI ones.

#![cfg(target_os = "windows")]
#![allow(non_snake_case)]

use std::ffi::c_void;

use langlock_core::LayoutHandle;
use windows::core::BOOL;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

use crate::boundary::guarded;
use crate::infrastructure::win32;
use crate::runtime;

/// Locks the process input language to `layout` (null: the current one).
///
/// Returns the layout locked after the call, or null if nothing is locked.
#[no_mangle]
pub extern "system" fn LockInputLanguage(layout: isize) -> isize {
    guarded("LockInputLanguage", 0, || {
        runtime::get_or_init()
            .lock(LayoutHandle::from_raw(layout))
            .raw()
    })
}

/// Releases the lock.  Harmless when nothing is locked.
#[no_mangle]
pub extern "system" fn UnlockInputLanguage() {
    guarded("UnlockInputLanguage", (), || {
        if let Some(runtime) = runtime::get() {
            runtime.unlock();
        }
    })
}

// ── JNI aliases ───────────────────────────────────────────────────────────────

#[no_mangle]
pub extern "system" fn Java_com_gilecode_langlocker_LockEngine_lockInputLanguage(
    _env: *mut c_void,
    _class: *mut c_void,
    layout: i64,
) -> i64 {
    LockInputLanguage(layout as isize) as i64
}

#[no_mangle]
pub extern "system" fn Java_com_gilecode_langlocker_LockEngine_unlockInputLanguage(
    _env: *mut c_void,
    _class: *mut c_void,
) {
    UnlockInputLanguage();
}

#[no_mangle]
pub extern "system" fn Java_com_excelsior_langlocker_LockEngine_lockInputLanguage(
    _env: *mut c_void,
    _class: *mut c_void,
    layout: i64,
) -> i64 {
    LockInputLanguage(layout as isize) as i64
}

#[no_mangle]
pub extern "system" fn Java_com_excelsior_langlocker_LockEngine_unlockInputLanguage(
    _env: *mut c_void,
    _class: *mut c_void,
) {
    UnlockInputLanguage();
}

// ── Library lifecycle ─────────────────────────────────────────────────────────

/// DLL entry point.
///
/// Attach records the module handle needed for global hooks.  An explicit
/// unload (`reserved` null) releases the lock; on process exit the OS
/// reclaims everything and nothing is touched.
#[no_mangle]
pub extern "system" fn DllMain(module: HMODULE, reason: u32, reserved: *mut c_void) -> BOOL {
    guarded("DllMain", (), || match reason {
        DLL_PROCESS_ATTACH => win32::set_module(module),
        DLL_PROCESS_DETACH if reserved.is_null() => runtime::shutdown(),
        _ => {}
    });
    BOOL(1)
}

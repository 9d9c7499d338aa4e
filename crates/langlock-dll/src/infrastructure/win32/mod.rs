//! Win32 adapters for the core traits.
//!
//! | Module          | Implements                      | OS facility                                   |
//! |-----------------|---------------------------------|-----------------------------------------------|
//! | `switcher`      | `LayoutSwitcher`                | `ActivateKeyboardLayout` / `GetKeyboardLayout` |
//! | `threads`       | `ThreadInspector`               | Toolhelp snapshot, `EnumThreadWindows`        |
//! | `message_hook`  | `DetectorChannel`               | `WH_GETMESSAGE`                               |
//! | `shell_hook`    | `DetectorChannel`               | `WH_SHELL`                                    |
//! | `notify_sink`   | `DetectorChannel`               | `ITfLanguageProfileNotifySink`                |
//! | `com`           | apartment bookkeeping           | `CoInitializeEx` / `CoUninitialize`           |
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

pub mod com;
pub mod message_hook;
pub mod notify_sink;
pub mod shell_hook;
pub mod switcher;
pub mod threads;

use std::ffi::c_void;
use std::sync::atomic::{AtomicIsize, Ordering};

use langlock_core::{DetectorError, DetectorKind, MainThread};
use windows::Win32::Foundation::{HINSTANCE, HMODULE};
use windows::Win32::UI::WindowsAndMessaging::{
    SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, HOOKPROC, WINDOWS_HOOK_ID,
};

/// Module handle of this DLL, recorded on process attach.
static MODULE: AtomicIsize = AtomicIsize::new(0);

/// Records the DLL module handle.  Called from `DllMain`.
pub fn set_module(module: HMODULE) {
    MODULE.store(module.0 as isize, Ordering::Release);
}

/// The DLL module handle, if the library was loaded as a DLL.
pub fn module_instance() -> Option<HINSTANCE> {
    match MODULE.load(Ordering::Acquire) {
        0 => None,
        raw => Some(HINSTANCE(raw as *mut c_void)),
    }
}

/// Installs a hook procedure for `thread`.
///
/// A resolved thread gets a thread-local hook.  An unresolved one gets a
/// global hook, which must name the DLL that contains `proc`.
///
/// Returns the raw hook handle.
pub(crate) fn install_hook(
    kind: DetectorKind,
    id: WINDOWS_HOOK_ID,
    proc: HOOKPROC,
    thread: MainThread,
) -> Result<isize, DetectorError> {
    let module = match thread {
        MainThread::Resolved(_) => None,
        MainThread::Unresolved => Some(module_instance().ok_or_else(|| {
            DetectorError::Unavailable {
                kind,
                reason: "global hook needs the DLL module handle".to_string(),
            }
        })?),
    };

    // SAFETY: `proc` is an `extern "system"` hook procedure living in this
    // module for the lifetime of the process.  `module` is this DLL's handle
    // as recorded by DllMain.
    let hook = unsafe { SetWindowsHookExW(id, proc, module, thread.os_thread_id()) }.map_err(
        |e| DetectorError::InstallFailed {
            kind,
            reason: e.to_string(),
        },
    )?;
    Ok(hook.0 as isize)
}

/// Removes a hook installed by [`install_hook`].
pub(crate) fn remove_hook(kind: DetectorKind, raw: isize) {
    // SAFETY: `raw` came from a successful SetWindowsHookExW and is removed
    // at most once.
    if let Err(e) = unsafe { UnhookWindowsHookEx(HHOOK(raw as *mut c_void)) } {
        tracing::warn!(%kind, error = %e, "UnhookWindowsHookEx failed");
    }
}

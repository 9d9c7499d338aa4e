//! Thread enumeration for main-thread discovery.
//!
//! The process's threads come from a Toolhelp snapshot filtered by process
//! id; window ownership is checked with `EnumThreadWindows`, stopping at the
//! first window found.

#![cfg(target_os = "windows")]

use langlock_core::{ThreadId, ThreadInspector};
use tracing::warn;
use windows::core::BOOL;
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Thread32First, Thread32Next, TH32CS_SNAPTHREAD, THREADENTRY32,
};
use windows::Win32::System::Threading::{GetCurrentProcessId, GetCurrentThreadId};
use windows::Win32::UI::WindowsAndMessaging::EnumThreadWindows;

/// [`ThreadInspector`] over the live process.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32ThreadInspector;

impl Win32ThreadInspector {
    pub fn new() -> Self {
        Self
    }
}

impl ThreadInspector for Win32ThreadInspector {
    fn current_thread(&self) -> ThreadId {
        // SAFETY: GetCurrentThreadId has no preconditions.
        unsafe { GetCurrentThreadId() }
    }

    fn process_threads(&self) -> Vec<ThreadId> {
        match snapshot_process_threads() {
            Ok(threads) => threads,
            Err(e) => {
                warn!(error = %e, "thread snapshot failed");
                Vec::new()
            }
        }
    }

    fn owns_window(&self, thread: ThreadId) -> bool {
        let mut found = false;
        // SAFETY: `stop_at_first_window` only writes through `lparam`, which
        // points to `found` for the duration of this synchronous call.
        unsafe {
            let _ = EnumThreadWindows(
                thread,
                Some(stop_at_first_window),
                LPARAM(&mut found as *mut bool as isize),
            );
        }
        found
    }
}

/// Lists the thread ids of the current process.
fn snapshot_process_threads() -> windows::core::Result<Vec<ThreadId>> {
    // SAFETY: GetCurrentProcessId has no preconditions.
    let pid = unsafe { GetCurrentProcessId() };
    // SAFETY: a thread snapshot ignores the process id argument; the handle
    // is closed below on every path.
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0)? };

    let mut entry = THREADENTRY32 {
        dwSize: std::mem::size_of::<THREADENTRY32>() as u32,
        ..Default::default()
    };
    let mut threads = Vec::new();

    // SAFETY: `snapshot` is a valid snapshot handle and `entry.dwSize` is set.
    let mut more = unsafe { Thread32First(snapshot, &mut entry) }.is_ok();
    while more {
        if entry.th32OwnerProcessID == pid {
            threads.push(entry.th32ThreadID);
        }
        // SAFETY: as above.
        more = unsafe { Thread32Next(snapshot, &mut entry) }.is_ok();
    }

    // SAFETY: `snapshot` is owned here and not used afterwards.
    unsafe {
        let _ = CloseHandle(snapshot);
    }
    Ok(threads)
}

/// `EnumThreadWindows` callback: records a hit and stops.
///
/// # Safety
///
/// `lparam` must point to a live `bool`.
unsafe extern "system" fn stop_at_first_window(_hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut bool);
    *found = true;
    BOOL(0) // stop enumeration
}

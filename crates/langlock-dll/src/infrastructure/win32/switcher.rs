//! Keyboard layout activation through `ActivateKeyboardLayout`.

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use langlock_core::{LayoutHandle, LayoutSwitcher, MainThread, SwitchError};
use tracing::debug;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    ActivateKeyboardLayout, GetKeyboardLayout, HKL, KLF_ACTIVATE, KLF_SETFORPROCESS,
    KLF_SUBSTITUTE_OK,
};

/// [`LayoutSwitcher`] backed by the Win32 keyboard layout API.
///
/// Activation applies to every thread of the process and honours the
/// user's layout substitutions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32LayoutSwitcher;

impl Win32LayoutSwitcher {
    pub fn new() -> Self {
        Self
    }
}

fn to_hkl(layout: LayoutHandle) -> HKL {
    HKL(layout.raw() as *mut c_void)
}

impl LayoutSwitcher for Win32LayoutSwitcher {
    fn activate(&self, layout: LayoutHandle) -> Result<(), SwitchError> {
        if layout.is_none() {
            return Err(SwitchError::NullLayout);
        }

        // SAFETY: ActivateKeyboardLayout only reads the handle value; an
        // unknown layout is reported as an error, not undefined behaviour.
        let result = unsafe {
            ActivateKeyboardLayout(
                to_hkl(layout),
                KLF_ACTIVATE | KLF_SUBSTITUTE_OK | KLF_SETFORPROCESS,
            )
        };

        match result {
            Ok(previous) => {
                debug!(%layout, previous = %LayoutHandle::from_raw(previous.0 as isize), "layout activated");
                Ok(())
            }
            Err(e) => {
                debug!(%layout, error = %e, "ActivateKeyboardLayout failed");
                Err(SwitchError::Rejected(layout))
            }
        }
    }

    fn current_layout(&self, thread: MainThread) -> LayoutHandle {
        // SAFETY: GetKeyboardLayout accepts any thread id; 0 means the
        // calling thread and unknown ids yield a null handle.
        let hkl = unsafe { GetKeyboardLayout(thread.os_thread_id()) };
        LayoutHandle::from_raw(hkl.0 as isize)
    }
}

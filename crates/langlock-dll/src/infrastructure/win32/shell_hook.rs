//! `WH_SHELL` detection channel.
//!
//! Shell notifications arrive on window activation and on language changes.
//! Their payloads vary between Windows versions, so the detector ignores
//! them and compares the live layout instead.  Window activation is also a
//! safe point for a pending revert.

#![cfg(target_os = "windows")]

use langlock_core::{DetectorChannel, DetectorError, DetectorKind, MainThread, ShellEvent};
use tracing::debug;
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, HSHELL_LANGUAGE, HSHELL_RUDEAPPACTIVATED, HSHELL_WINDOWACTIVATED, WH_SHELL,
};

use super::{install_hook, remove_hook};
use crate::runtime;

/// The shell hook channel.
#[derive(Debug, Default)]
pub struct ShellHookChannel {
    hook: Option<isize>,
}

impl ShellHookChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectorChannel for ShellHookChannel {
    fn kind(&self) -> DetectorKind {
        DetectorKind::ShellHook
    }

    fn arm(&mut self, thread: MainThread) -> Result<(), DetectorError> {
        if self.hook.is_some() {
            return Ok(());
        }
        let hook = install_hook(self.kind(), WH_SHELL, Some(shell_proc), thread)?;
        debug!(?thread, "WH_SHELL hook installed");
        self.hook = Some(hook);
        Ok(())
    }

    fn disarm(&mut self) {
        if let Some(hook) = self.hook.take() {
            remove_hook(self.kind(), hook);
            debug!("WH_SHELL hook removed");
        }
    }

    fn is_armed(&self) -> bool {
        self.hook.is_some()
    }
}

impl Drop for ShellHookChannel {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Maps a shell hook code to a [`ShellEvent`].
pub fn classify(code: i32) -> ShellEvent {
    match code {
        c if c == HSHELL_WINDOWACTIVATED as i32 || c == HSHELL_RUDEAPPACTIVATED as i32 => {
            ShellEvent::WindowActivated
        }
        c if c == HSHELL_LANGUAGE as i32 => ShellEvent::LanguageChanged,
        other => ShellEvent::Other(other),
    }
}

/// `WH_SHELL` hook procedure.
///
/// # Safety
///
/// Called by Windows on the hooked thread.  The arguments are only
/// forwarded, never dereferenced.
unsafe extern "system" fn shell_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if n_code >= 0 {
        if let Some(detectors) = runtime::detectors() {
            detectors.on_shell_event(classify(n_code));
        }
    }

    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_codes_map_to_window_activated() {
        assert_eq!(classify(4), ShellEvent::WindowActivated);
        assert_eq!(classify(0x8004), ShellEvent::WindowActivated);
        assert_eq!(
            classify(HSHELL_RUDEAPPACTIVATED as i32),
            ShellEvent::WindowActivated
        );
    }

    #[test]
    fn test_language_code_maps_to_language_changed() {
        assert_eq!(classify(8), ShellEvent::LanguageChanged);
        assert_eq!(classify(HSHELL_LANGUAGE as i32), ShellEvent::LanguageChanged);
    }

    #[test]
    fn test_other_codes_are_passed_through() {
        // HSHELL_WINDOWCREATED
        assert_eq!(classify(1), ShellEvent::Other(1));
    }
}

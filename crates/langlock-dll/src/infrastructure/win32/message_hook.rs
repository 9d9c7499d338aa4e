//! `WH_GETMESSAGE` detection channel.
//!
//! The hook procedure sees every message the main thread retrieves, before
//! the thread dispatches it.  It:
//!
//! 1. neutralises `WM_INPUTLANGCHANGEREQUEST` (rewriting it to `WM_NULL`)
//!    while locked, on systems old enough to still deliver it first;
//! 2. notes `WM_INPUTLANGCHANGE` to a foreign layout as a pending revert;
//! 3. performs the pending revert on the next ordinary message, where the
//!    thread is not inside the layout-change machinery any more.
//!
//! The decisions live in [`SwitchDetectors::on_message`]; this module only
//! translates `MSG` values.
//!
//! [`SwitchDetectors::on_message`]: langlock_core::SwitchDetectors::on_message

#![cfg(target_os = "windows")]

use langlock_core::{
    DetectorChannel, DetectorError, DetectorKind, HookMessage, LayoutHandle, MainThread,
    MessageVerdict,
};
use tracing::debug;
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, HC_ACTION, MSG, WH_GETMESSAGE, WM_DESTROY, WM_INPUTLANGCHANGE,
    WM_INPUTLANGCHANGEREQUEST, WM_NULL,
};

use super::{install_hook, remove_hook};
use crate::runtime;

/// The message hook channel.
#[derive(Debug, Default)]
pub struct MessageHookChannel {
    hook: Option<isize>,
}

impl MessageHookChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectorChannel for MessageHookChannel {
    fn kind(&self) -> DetectorKind {
        DetectorKind::MessageHook
    }

    fn arm(&mut self, thread: MainThread) -> Result<(), DetectorError> {
        if self.hook.is_some() {
            return Ok(());
        }
        let hook = install_hook(self.kind(), WH_GETMESSAGE, Some(get_message_proc), thread)?;
        debug!(?thread, "WH_GETMESSAGE hook installed");
        self.hook = Some(hook);
        Ok(())
    }

    fn disarm(&mut self) {
        if let Some(hook) = self.hook.take() {
            remove_hook(self.kind(), hook);
            debug!("WH_GETMESSAGE hook removed");
        }
    }

    fn is_armed(&self) -> bool {
        self.hook.is_some()
    }
}

impl Drop for MessageHookChannel {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Maps a retrieved message to the detector's view of it.
pub fn classify(message: u32, lparam: LPARAM) -> HookMessage {
    match message {
        WM_INPUTLANGCHANGEREQUEST => HookMessage::LanguageChangeRequest,
        // lParam carries the newly activated HKL
        WM_INPUTLANGCHANGE => HookMessage::LanguageChanged(LayoutHandle::from_raw(lparam.0)),
        WM_DESTROY => HookMessage::Destroy,
        other => HookMessage::Other(other),
    }
}

/// `WH_GETMESSAGE` hook procedure.
///
/// # Safety
///
/// Called by Windows on the hooked thread.  For `HC_ACTION`, `l_param`
/// points to the `MSG` about to be returned to the thread and may be
/// modified in place.
unsafe extern "system" fn get_message_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        if let Some(detectors) = runtime::detectors() {
            // SAFETY: l_param points to a MSG when n_code == HC_ACTION.
            let msg = &mut *(l_param.0 as *mut MSG);
            if detectors.on_message(classify(msg.message, msg.lParam)) == MessageVerdict::Suppress
            {
                msg.message = WM_NULL;
            }
        }
    }

    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

//! Text-services notification sink channel.
//!
//! On Windows 8 and later the message hook often misses layout changes, so
//! a [`ITfLanguageProfileNotifySink`] is registered with the input processor
//! profiles object.  Its pre-change callback vetoes the change while locked
//! (honoured only by older systems); the post-change callback records a
//! pending revert that a hook performs later.
//!
//! A fresh sink object is created on every arm.  The channel keeps only the
//! advise cookie, so it stays `Send` without holding COM pointers.  Arm and
//! disarm may run on different host threads; each joins COM before use, and
//! the cookie is kept until an unadvise actually succeeds.

#![cfg(target_os = "windows")]

use std::sync::Arc;

use langlock_core::{DetectorChannel, DetectorError, DetectorKind, MainThread, SwitchDetectors};
use tracing::{debug, warn};
use windows::core::{implement, Interface, BOOL};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};
use windows::Win32::UI::TextServices::{
    CLSID_TF_InputProcessorProfiles, ITfInputProcessorProfiles, ITfLanguageProfileNotifySink,
    ITfLanguageProfileNotifySink_Impl, ITfSource,
};

use super::com;
use super::switcher::Win32LayoutSwitcher;
use crate::infrastructure::com_state::SinkCookie;

type Detectors = Arc<SwitchDetectors<Win32LayoutSwitcher>>;

/// COM object forwarding language-profile notifications to the detectors.
#[implement(ITfLanguageProfileNotifySink)]
struct LockingNotifySink {
    detectors: Detectors,
}

impl ITfLanguageProfileNotifySink_Impl for LockingNotifySink_Impl {
    fn OnLanguageChange(&self, langid: u16) -> windows::core::Result<BOOL> {
        Ok(BOOL::from(self.detectors.on_language_change(langid)))
    }

    fn OnLanguageChanged(&self) -> windows::core::Result<()> {
        self.detectors.on_language_changed();
        Ok(())
    }
}

/// The notify sink channel.
pub struct NotifySinkChannel {
    detectors: Detectors,
    cookie: SinkCookie,
}

impl NotifySinkChannel {
    pub fn new(detectors: Detectors) -> Self {
        Self {
            detectors,
            cookie: SinkCookie::default(),
        }
    }

    fn unavailable(reason: impl ToString) -> DetectorError {
        DetectorError::Unavailable {
            kind: DetectorKind::NotifySink,
            reason: reason.to_string(),
        }
    }
}

/// Obtains the event source of the input processor profiles object.
fn profiles_source() -> windows::core::Result<ITfSource> {
    // SAFETY: COM is initialised on this thread (see `com::ComApartment`).
    let profiles: ITfInputProcessorProfiles =
        unsafe { CoCreateInstance(&CLSID_TF_InputProcessorProfiles, None, CLSCTX_INPROC_SERVER)? };
    profiles.cast()
}

impl DetectorChannel for NotifySinkChannel {
    fn kind(&self) -> DetectorKind {
        DetectorKind::NotifySink
    }

    fn arm(&mut self, _thread: MainThread) -> Result<(), DetectorError> {
        if self.cookie.is_set() {
            return Ok(());
        }
        com::apartment().ensure().map_err(Self::unavailable)?;
        let source = profiles_source().map_err(Self::unavailable)?;

        let sink: ITfLanguageProfileNotifySink = LockingNotifySink {
            detectors: Arc::clone(&self.detectors),
        }
        .into();

        // SAFETY: `sink` is a valid COM object; the source holds its own
        // reference until UnadviseSink.
        let cookie = unsafe { source.AdviseSink(&ITfLanguageProfileNotifySink::IID, &sink) }
            .map_err(|e| DetectorError::InstallFailed {
                kind: DetectorKind::NotifySink,
                reason: e.to_string(),
            })?;

        debug!(cookie, "language profile notify sink advised");
        self.cookie.set(cookie);
        Ok(())
    }

    fn disarm(&mut self) {
        let Some(cookie) = self.cookie.get() else {
            return;
        };
        if let Err(e) = com::apartment().ensure() {
            warn!(cookie, error = %e, "cannot unadvise notify sink; it stays registered");
            return;
        }
        let result = self.cookie.release(|cookie| {
            let source = profiles_source()?;
            // SAFETY: `cookie` was returned by AdviseSink on this object kind.
            unsafe { source.UnadviseSink(cookie) }
        });
        match result {
            Ok(_) => debug!(cookie, "language profile notify sink unadvised"),
            Err(e) => warn!(cookie, error = %e, "UnadviseSink failed; sink stays registered"),
        }
    }

    fn is_armed(&self) -> bool {
        self.cookie.is_set()
    }
}

impl Drop for NotifySinkChannel {
    fn drop(&mut self) {
        self.disarm();
    }
}

//! Process-wide locker runtime.
//!
//! The exported functions and the OS callbacks need one shared locker per
//! process.  [`Runtime`] owns it:
//!
//! - the [`LockController`] sits behind a `Mutex`, taken only by the
//!   exported lock/unlock entry points;
//! - the [`SwitchDetectors`] are reachable lock-free through
//!   [`detectors`], because hook procedures run re-entrantly inside
//!   `ActivateKeyboardLayout` while the controller is held.
//!
//! The runtime is created on the first `LockInputLanguage` call: the config
//! file is read, logging is started and the enabled channels are built.

#![cfg(target_os = "windows")]

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use langlock_core::{
    DetectorKind, DetectorSet, LayoutHandle, LockController, LockState, SwitchDetectors,
};
use tracing::{info, warn};

use crate::infrastructure::logging::start_logging;
use crate::infrastructure::storage::config::{load_config, LockerConfig};
use crate::infrastructure::win32::{
    com, message_hook::MessageHookChannel, notify_sink::NotifySinkChannel,
    shell_hook::ShellHookChannel, switcher::Win32LayoutSwitcher, threads::Win32ThreadInspector,
};

type Win32Controller = LockController<Win32LayoutSwitcher, Win32ThreadInspector>;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The locker shared by every entry point of the process.
pub struct Runtime {
    controller: Mutex<Win32Controller>,
    detectors: Arc<SwitchDetectors<Win32LayoutSwitcher>>,
}

/// Returns the runtime, creating it on first use.
pub fn get_or_init() -> &'static Runtime {
    RUNTIME.get_or_init(Runtime::start)
}

/// Returns the runtime if it has been created.
pub fn get() -> Option<&'static Runtime> {
    RUNTIME.get()
}

/// Detector callbacks for the hook procedures.  `None` before the first
/// lock and in processes the DLL was injected into by a global hook.
pub fn detectors() -> Option<&'static SwitchDetectors<Win32LayoutSwitcher>> {
    RUNTIME.get().map(|runtime| runtime.detectors.as_ref())
}

/// Releases any lock and leaves the COM apartment.  Called on library
/// unload.
pub fn shutdown() {
    if let Some(runtime) = get() {
        runtime.unlock();
    }
    com::apartment().shutdown();
}

impl Runtime {
    fn start() -> Self {
        let (config, load_error) = match load_config() {
            Ok(config) => (config, None),
            Err(e) => (LockerConfig::default(), Some(e)),
        };
        // Reaches a host-installed subscriber even when our own log file failed.
        if let Some(e) = start_logging(&config.logging) {
            warn!(error = %e, "diagnostic log file unavailable");
        }
        if let Some(e) = load_error {
            warn!(error = %e, "config file unusable; using defaults");
        }

        let runtime = Self::from_config(&config);
        info!(
            version = env!("CARGO_PKG_VERSION"),
            channels = ?config.detectors.enabled_kinds(),
            "input language locker started"
        );
        runtime
    }

    fn from_config(config: &LockerConfig) -> Self {
        let state = Arc::new(LockState::new());
        let switcher = Arc::new(Win32LayoutSwitcher::new());
        let detectors = Arc::new(SwitchDetectors::new(
            Arc::clone(&state),
            Arc::clone(&switcher),
        ));

        let mut channels = DetectorSet::new();
        for kind in config.detectors.enabled_kinds() {
            match kind {
                DetectorKind::MessageHook => {
                    channels.register(Box::new(MessageHookChannel::new()))
                }
                DetectorKind::ShellHook => channels.register(Box::new(ShellHookChannel::new())),
                DetectorKind::NotifySink => {
                    channels.register(Box::new(NotifySinkChannel::new(Arc::clone(&detectors))))
                }
            }
        }

        Self {
            controller: Mutex::new(LockController::new(
                state,
                switcher,
                Win32ThreadInspector::new(),
                channels,
            )),
            detectors,
        }
    }

    fn controller(&self) -> MutexGuard<'_, Win32Controller> {
        self.controller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Locks (or changes the lock to) `requested`; see [`LockController::lock`].
    pub fn lock(&self, requested: LayoutHandle) -> LayoutHandle {
        self.controller().lock(requested)
    }

    /// Releases the lock; see [`LockController::unlock`].
    pub fn unlock(&self) {
        self.controller().unlock();
    }

    /// Currently locked layout, if any.
    pub fn locked_layout(&self) -> Option<LayoutHandle> {
        self.controller().locked_layout()
    }
}

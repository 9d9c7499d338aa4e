//! COM apartment management for the notify sink.
//!
//! COM is initialised per thread.  Any thread that arms or disarms the sink
//! joins a single-threaded apartment first, unless the host already
//! initialised COM there in another mode, in which case that apartment is
//! used as is.  On shutdown only the calling thread's own apartment is
//! left; apartments entered on other threads end with those threads.

#![cfg(target_os = "windows")]

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::debug;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows::Win32::System::Threading::GetCurrentThreadId;

use crate::infrastructure::com_state::{ApartmentLedger, ThreadApartment};

/// Error type for COM initialisation.
#[derive(Debug, Error)]
pub enum ComError {
    /// `CoInitializeEx` failed for a reason other than a mode mismatch.
    #[error("CoInitializeEx failed on thread {thread}: {source}")]
    Initialize {
        thread: u32,
        #[source]
        source: windows::core::Error,
    },
}

/// Process-wide record of the threads that made COM usable.
#[derive(Debug)]
pub struct ComApartment {
    ledger: Mutex<ApartmentLedger>,
}

static APARTMENT: ComApartment = ComApartment {
    ledger: Mutex::new(ApartmentLedger::new()),
};

/// The process-wide apartment record.
pub fn apartment() -> &'static ComApartment {
    &APARTMENT
}

fn current_thread() -> u32 {
    // SAFETY: GetCurrentThreadId has no preconditions.
    unsafe { GetCurrentThreadId() }
}

impl ComApartment {
    fn ledger(&self) -> MutexGuard<'_, ApartmentLedger> {
        self.ledger.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Makes COM usable on the calling thread.  Idempotent per thread.
    ///
    /// # Errors
    ///
    /// Returns [`ComError::Initialize`] if COM cannot be initialised on this
    /// thread; a later call retries.
    pub fn ensure(&self) -> Result<(), ComError> {
        let thread = current_thread();
        let mut ledger = self.ledger();
        if !ledger.needs_init(thread) {
            return Ok(());
        }

        // SAFETY: CoInitializeEx may be called repeatedly; S_FALSE still
        // counts as a reference to balance with CoUninitialize.
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        let apartment = if hr == RPC_E_CHANGED_MODE {
            debug!(thread, "COM already initialised in another mode; reusing it");
            ThreadApartment::Borrowed
        } else {
            hr.ok()
                .map_err(|source| ComError::Initialize { thread, source })?;
            debug!(thread, "COM apartment entered");
            ThreadApartment::Owned
        };
        ledger.record(thread, apartment);
        Ok(())
    }

    /// Leaves the calling thread's apartment if [`ensure`](Self::ensure)
    /// entered it, and forgets every other thread.
    pub fn shutdown(&self) {
        let thread = current_thread();
        let mut ledger = self.ledger();
        if ledger.release(thread) {
            // SAFETY: balances the CoInitializeEx `ensure` made on this thread.
            unsafe { CoUninitialize() };
            debug!(thread, "COM apartment left");
        }
        let others = ledger.drain_owned();
        if !others.is_empty() {
            debug!(?others, "COM apartments of other threads end with those threads");
        }
    }

    /// Returns `true` if COM is usable on the calling thread.
    pub fn is_ready(&self) -> bool {
        !self.ledger().needs_init(current_thread())
    }
}

//! Layout activation seam.

use thiserror::Error;

use crate::domain::{layout::LayoutHandle, state::MainThread};

/// Error type for layout activation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwitchError {
    /// The platform rejected the layout or it is not installed.
    #[error("input layout {0} was rejected or is not installed")]
    Rejected(LayoutHandle),
    /// The null sentinel cannot be activated.
    #[error("cannot activate the null layout")]
    NullLayout,
}

/// Activates input layouts and reports the live one.
///
/// The production implementation calls `ActivateKeyboardLayout` /
/// `GetKeyboardLayout`; tests use [`FakeKeyboard`](super::mock::FakeKeyboard)
/// or a `mockall` mock.
#[cfg_attr(test, mockall::automock)]
pub trait LayoutSwitcher: Send + Sync {
    /// Makes `layout` the active input layout for the process.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Rejected`] when the platform refuses the layout.
    fn activate(&self, layout: LayoutHandle) -> Result<(), SwitchError>;

    /// The layout currently active on `thread` (the calling thread when
    /// unresolved).
    fn current_layout(&self, thread: MainThread) -> LayoutHandle;
}

//! # langlock-core
//!
//! Platform-independent heart of the input-language locker: the lock state
//! machine, the decision logic shared by the three switch-detection channels,
//! and the main-thread resolution algorithm.
//!
//! This crate has zero dependencies on OS APIs.  Every OS interaction goes
//! through a trait ([`LayoutSwitcher`], [`ThreadInspector`],
//! [`DetectorChannel`]) so the whole state machine can be exercised in tests
//! with the in-memory fakes from [`application::mock`].
//!
//! # Architecture overview (for beginners)
//!
//! Once the host application "locks" the input language, nothing is allowed
//! to change it silently.  The OS does not offer one reliable notification
//! for layout changes, so three independent channels watch for switches:
//!
//! - a **message hook** on the thread running the window message loop,
//! - a **shell hook** reporting window activation and language events,
//! - a **notification sink** registered with the text-services subsystem.
//!
//! Any channel may *detect* an unwanted switch.  Correcting it from inside
//! the notification that reported it would trigger another notification (and
//! loop forever), so detection only marks a revert as pending; the correction
//! happens at the next callback known to be safe.
//!
//! - **`domain`** – the shared lock context (`LockState`), the two-phase
//!   revert flag and the `LayoutHandle` / `MainThread` value types.
//! - **`application`** – the `LockController`, the detector logic and the
//!   traits the Windows adapter implements.

pub mod application;
pub mod domain;

pub use application::detectors::{
    DetectorChannel, DetectorError, DetectorKind, DetectorSet, HookMessage, MessageVerdict,
    ShellEvent, SwitchDetectors,
};
pub use application::lock_controller::LockController;
pub use application::main_thread::{MainThreadLocator, ThreadInspector};
pub use application::switcher::{LayoutSwitcher, SwitchError};
pub use domain::layout::LayoutHandle;
pub use domain::state::{LockState, MainThread, RevertFlag, RevertState, ThreadId};

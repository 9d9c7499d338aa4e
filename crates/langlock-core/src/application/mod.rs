//! Application layer: the lock use case and the seams to the OS.
//!
//! Code here orchestrates the domain types and depends only on traits, so
//! the Windows adapter can be swapped for the fakes in [`mock`] in tests.
//!
//! # Sub-modules
//!
//! - **`switcher`**       – the [`LayoutSwitcher`](switcher::LayoutSwitcher)
//!   seam that activates and queries input layouts.
//! - **`main_thread`**    – resolves which thread owns the message loop.
//! - **`detectors`**      – decision logic of the three switch-detection
//!   channels and the set of armable channels.
//! - **`lock_controller`** – the Lock / Unlock state machine.
//! - **`mock`**           – in-memory fakes for tests and benches.

pub mod detectors;
pub mod lock_controller;
pub mod main_thread;
pub mod mock;
pub mod switcher;

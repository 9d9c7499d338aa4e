//! Process-wide lock context.
//!
//! Exactly one [`LockState`] exists per process.  The [`LockController`]
//! mutates it on lock/unlock; the detector callbacks read it and flip the
//! revert flag from whatever thread the OS dispatches them on.  Every field
//! is an atomic so that a callback can read-check-write within a single
//! invocation without taking a lock that the controller might be holding
//! while it calls into the OS.
//!
//! # Two-phase revert protocol
//!
//! ```text
//!            mark()                      take()
//!   Clean ──────────▶ Pending ──────────────────▶ Clean
//!     ▲   (any detector,        (safe call site only;        │
//!     │    any thread)           winner issues exactly       │
//!     │                          one corrective activation)  │
//!     └──────────────────── reset() on unlock ◀──────────────┘
//! ```
//!
//! [`LockController`]: crate::application::lock_controller::LockController

use std::sync::atomic::{AtomicIsize, AtomicU32, AtomicU8, Ordering};

use super::layout::LayoutHandle;

/// OS thread identifier.
pub type ThreadId = u32;

/// The thread that owns the process's message loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainThread {
    /// A single window-owning thread was identified.
    Resolved(ThreadId),
    /// Not resolved (yet, or ambiguously).  Layout queries use the calling
    /// thread and hooks are installed without a thread scope.
    Unresolved,
}

impl MainThread {
    /// Thread id to hand to OS calls, `0` when unresolved.
    pub fn os_thread_id(self) -> ThreadId {
        match self {
            MainThread::Resolved(id) => id,
            MainThread::Unresolved => 0,
        }
    }

    /// Returns `true` for [`MainThread::Resolved`].
    pub fn is_resolved(self) -> bool {
        matches!(self, MainThread::Resolved(_))
    }
}

/// State of the two-phase revert protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RevertState {
    /// No deviation from the locked layout is known.
    Clean = 0,
    /// A deviation was detected and awaits correction at a safe call site.
    Pending = 1,
}

/// Atomic "revert pending" flag with explicit transitions.
#[derive(Debug)]
pub struct RevertFlag(AtomicU8);

impl RevertFlag {
    /// Creates a clean flag.
    pub const fn new() -> Self {
        Self(AtomicU8::new(RevertState::Clean as u8))
    }

    /// Current state.
    pub fn state(&self) -> RevertState {
        match self.0.load(Ordering::SeqCst) {
            0 => RevertState::Clean,
            _ => RevertState::Pending,
        }
    }

    /// Returns `true` while a revert is pending.
    pub fn is_pending(&self) -> bool {
        self.state() == RevertState::Pending
    }

    /// `Clean -> Pending`.  Returns `true` if this call made the transition,
    /// `false` if a revert was already pending.
    pub fn mark(&self) -> bool {
        self.transition(RevertState::Clean, RevertState::Pending)
    }

    /// `Pending -> Clean`.  Returns `true` if this call made the transition;
    /// the caller then owns the single corrective activation.
    pub fn take(&self) -> bool {
        self.transition(RevertState::Pending, RevertState::Clean)
    }

    /// Forces the flag back to `Clean`.
    pub fn reset(&self) {
        self.0.store(RevertState::Clean as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: RevertState, to: RevertState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for RevertFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared lock context: `{ lockedLayout, revertPending, mainThread }`.
#[derive(Debug, Default)]
pub struct LockState {
    /// Raw locked layout, `0` when unlocked.
    locked: AtomicIsize,
    revert: RevertFlag,
    /// Raw resolved main thread id, `0` when unresolved.
    main_thread: AtomicU32,
}

impl LockState {
    /// Creates an unlocked state with an unresolved main thread.
    pub const fn new() -> Self {
        Self {
            locked: AtomicIsize::new(0),
            revert: RevertFlag::new(),
            main_thread: AtomicU32::new(0),
        }
    }

    /// The layout the process is locked to, if any.
    pub fn locked_layout(&self) -> Option<LayoutHandle> {
        LayoutHandle::from_raw(self.locked.load(Ordering::SeqCst)).non_null()
    }

    /// Returns `true` while a lock is held.
    pub fn is_locked(&self) -> bool {
        self.locked_layout().is_some()
    }

    /// Records `layout` as the locked layout.  Passing [`LayoutHandle::NONE`]
    /// is equivalent to [`LockState::clear_lock`].
    pub fn set_locked_layout(&self, layout: LayoutHandle) {
        if layout.is_none() {
            self.clear_lock();
        } else {
            self.locked.store(layout.raw(), Ordering::SeqCst);
        }
    }

    /// Clears the lock and any pending revert with it.
    pub fn clear_lock(&self) {
        self.revert.reset();
        self.locked.store(0, Ordering::SeqCst);
    }

    /// The two-phase revert flag.
    pub fn revert(&self) -> &RevertFlag {
        &self.revert
    }

    /// Marks a revert as pending, but only while locked.  Returns `true` if
    /// this call made the `Clean -> Pending` transition.
    pub fn mark_revert(&self) -> bool {
        self.is_locked() && self.revert.mark()
    }

    /// Claims a pending revert.  Returns the layout to re-activate if this
    /// call won the `Pending -> Clean` transition while a lock is held.
    pub fn take_revert(&self) -> Option<LayoutHandle> {
        if !self.revert.take() {
            return None;
        }
        self.locked_layout()
    }

    /// The resolved main thread, or [`MainThread::Unresolved`].
    pub fn main_thread(&self) -> MainThread {
        match self.main_thread.load(Ordering::SeqCst) {
            0 => MainThread::Unresolved,
            id => MainThread::Resolved(id),
        }
    }

    /// Publishes the resolved main thread.
    pub fn set_main_thread(&self, thread: MainThread) {
        self.main_thread
            .store(thread.os_thread_id(), Ordering::SeqCst);
    }
}

//! In-memory fakes of the OS seams.
//!
//! Lets unit tests, the integration tests in `tests/` and the benches drive
//! the lock state machine without hooks, COM or a message loop.
//! All fakes are cheap to clone and share their state between clones, so a
//! test can keep a handle after moving one into the controller.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use super::detectors::{DetectorChannel, DetectorError, DetectorKind};
use super::main_thread::ThreadInspector;
use super::switcher::{LayoutSwitcher, SwitchError};
use crate::domain::{
    layout::LayoutHandle,
    state::{MainThread, ThreadId},
};

// ── Keyboard ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct KeyboardInner {
    live: LayoutHandle,
    installed: Vec<LayoutHandle>,
    activations: Vec<LayoutHandle>,
}

/// A fake keyboard with a set of installed layouts and a live layout.
#[derive(Debug, Clone)]
pub struct FakeKeyboard {
    inner: Arc<Mutex<KeyboardInner>>,
}

impl FakeKeyboard {
    /// Creates a keyboard whose live layout is `live` and which accepts the
    /// `installed` layouts.
    pub fn new(live: LayoutHandle, installed: &[LayoutHandle]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(KeyboardInner {
                live,
                installed: installed.to_vec(),
                activations: Vec::new(),
            })),
        }
    }

    /// The live layout.
    pub fn live(&self) -> LayoutHandle {
        self.lock().live
    }

    /// Every layout passed to [`LayoutSwitcher::activate`], in call order,
    /// including rejected ones.
    pub fn activations(&self) -> Vec<LayoutHandle> {
        self.lock().activations.clone()
    }

    /// Forgets the recorded activations.
    pub fn clear_activations(&self) {
        self.lock().activations.clear();
    }

    /// Simulates a switch made by the user or the OS, bypassing the lock.
    pub fn external_switch(&self, layout: LayoutHandle) {
        self.lock().live = layout;
    }

    /// Removes `layout` from the installed set.
    pub fn uninstall(&self, layout: LayoutHandle) {
        self.lock().installed.retain(|&l| l != layout);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, KeyboardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LayoutSwitcher for FakeKeyboard {
    fn activate(&self, layout: LayoutHandle) -> Result<(), SwitchError> {
        let mut inner = self.lock();
        inner.activations.push(layout);
        if layout.is_none() {
            return Err(SwitchError::NullLayout);
        }
        if !inner.installed.contains(&layout) {
            return Err(SwitchError::Rejected(layout));
        }
        inner.live = layout;
        Ok(())
    }

    fn current_layout(&self, _thread: MainThread) -> LayoutHandle {
        self.lock().live
    }
}

// ── Threads ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ThreadsInner {
    current: ThreadId,
    threads: Vec<ThreadId>,
    window_owners: Vec<ThreadId>,
    enumerations: usize,
}

/// A fake process with a fixed thread list and configurable window owners.
#[derive(Debug, Clone)]
pub struct FakeThreads {
    inner: Arc<Mutex<ThreadsInner>>,
}

impl FakeThreads {
    /// Creates a process whose calling thread is `current`.
    pub fn new(current: ThreadId, threads: Vec<ThreadId>, window_owners: Vec<ThreadId>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ThreadsInner {
                current,
                threads,
                window_owners,
                enumerations: 0,
            })),
        }
    }

    /// A process whose calling thread owns the only window.
    pub fn single_window_thread(thread: ThreadId) -> Self {
        Self::new(thread, vec![thread], vec![thread])
    }

    /// Replaces the set of window-owning threads.
    pub fn set_window_owners(&self, owners: Vec<ThreadId>) {
        self.lock().window_owners = owners;
    }

    /// How many times the thread list was enumerated.
    pub fn enumerations(&self) -> usize {
        self.lock().enumerations
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ThreadsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ThreadInspector for FakeThreads {
    fn current_thread(&self) -> ThreadId {
        self.lock().current
    }

    fn process_threads(&self) -> Vec<ThreadId> {
        let mut inner = self.lock();
        inner.enumerations += 1;
        inner.threads.clone()
    }

    fn owns_window(&self, thread: ThreadId) -> bool {
        self.lock().window_owners.contains(&thread)
    }
}

// ── Detector channels ────────────────────────────────────────────────────────

/// Observable state of a [`RecordingChannel`], kept after the channel is
/// boxed into a detector set.
#[derive(Debug, Clone, Default)]
pub struct ChannelTracker {
    armed: Arc<AtomicBool>,
    arms: Arc<AtomicUsize>,
    disarms: Arc<AtomicUsize>,
    last_target: Arc<Mutex<Option<MainThread>>>,
}

impl ChannelTracker {
    /// Returns `true` while the channel is armed.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Number of successful arm transitions.
    pub fn arm_count(&self) -> usize {
        self.arms.load(Ordering::SeqCst)
    }

    /// Number of disarm transitions.
    pub fn disarm_count(&self) -> usize {
        self.disarms.load(Ordering::SeqCst)
    }

    /// Thread target of the most recent arm attempt.
    pub fn last_target(&self) -> Option<MainThread> {
        *self
            .last_target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A detection channel that only records arm/disarm transitions.
#[derive(Debug)]
pub struct RecordingChannel {
    kind: DetectorKind,
    fail: bool,
    tracker: ChannelTracker,
}

impl RecordingChannel {
    /// A channel that arms successfully.
    pub fn new(kind: DetectorKind) -> Self {
        Self {
            kind,
            fail: false,
            tracker: ChannelTracker::default(),
        }
    }

    /// A channel whose installation always fails.
    pub fn failing(kind: DetectorKind) -> Self {
        Self {
            fail: true,
            ..Self::new(kind)
        }
    }

    /// Handle for observing this channel after it is moved.
    pub fn tracker(&self) -> ChannelTracker {
        self.tracker.clone()
    }
}

impl DetectorChannel for RecordingChannel {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn arm(&mut self, thread: MainThread) -> Result<(), DetectorError> {
        *self
            .tracker
            .last_target
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(thread);
        if self.fail {
            return Err(DetectorError::InstallFailed {
                kind: self.kind,
                reason: "simulated failure".to_string(),
            });
        }
        if !self.tracker.armed.swap(true, Ordering::SeqCst) {
            self.tracker.arms.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn disarm(&mut self) {
        if self.tracker.armed.swap(false, Ordering::SeqCst) {
            self.tracker.disarms.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_armed(&self) -> bool {
        self.tracker.is_armed()
    }
}

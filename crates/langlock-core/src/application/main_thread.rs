//! Main (message-pump) thread resolution.
//!
//! The message hook only sees messages retrieved by the thread it is
//! installed on, so it has to go on the thread that runs the process's
//! window message loop.  That thread is not necessarily the one calling
//! `Lock` (managed hosts often call from a worker thread).
//!
//! # Algorithm
//!
//! 1. If the calling thread owns at least one window, it is the main thread.
//! 2. Otherwise enumerate every thread of the process and keep those owning
//!    a window.  Exactly one candidate resolves; zero or several candidates
//!    leave the thread [`MainThread::Unresolved`] and the hooks fall back to
//!    an unscoped installation.
//!
//! Only a successful resolution is cached.  An ambiguous result is retried
//! on the next lock, by which time the host may have created its window.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::domain::state::{LockState, MainThread, ThreadId};

/// OS queries needed to find the main thread.
pub trait ThreadInspector: Send + Sync {
    /// Id of the calling thread.
    fn current_thread(&self) -> ThreadId;
    /// Ids of every thread in the current process.
    fn process_threads(&self) -> Vec<ThreadId>;
    /// Returns `true` if `thread` owns at least one window.
    fn owns_window(&self, thread: ThreadId) -> bool;
}

/// Resolves and caches the main thread.
pub struct MainThreadLocator<I> {
    inspector: I,
    resolved: OnceLock<ThreadId>,
}

impl<I: ThreadInspector> MainThreadLocator<I> {
    /// Creates an unresolved locator.
    pub fn new(inspector: I) -> Self {
        Self {
            inspector,
            resolved: OnceLock::new(),
        }
    }

    /// Returns the cached main thread, resolving it first if needed, and
    /// publishes the result into `state`.
    pub fn resolve(&self, state: &LockState) -> MainThread {
        let thread = match self.resolved.get() {
            Some(&id) => MainThread::Resolved(id),
            None => match self.locate() {
                MainThread::Resolved(id) => {
                    let id = *self.resolved.get_or_init(|| id);
                    debug!(thread_id = id, "main thread resolved");
                    MainThread::Resolved(id)
                }
                MainThread::Unresolved => MainThread::Unresolved,
            },
        };
        state.set_main_thread(thread);
        thread
    }

    /// The cached main thread without attempting resolution.
    pub fn cached(&self) -> MainThread {
        self.resolved
            .get()
            .map_or(MainThread::Unresolved, |&id| MainThread::Resolved(id))
    }

    /// Runs the resolution algorithm without touching the cache.
    pub fn locate(&self) -> MainThread {
        let current = self.inspector.current_thread();
        if self.inspector.owns_window(current) {
            return MainThread::Resolved(current);
        }

        let candidates: Vec<ThreadId> = self
            .inspector
            .process_threads()
            .into_iter()
            .filter(|&thread| self.inspector.owns_window(thread))
            .collect();

        match candidates.as_slice() {
            [single] => MainThread::Resolved(*single),
            [] => {
                warn!("no window-owning thread found; hooks will be installed unscoped");
                MainThread::Unresolved
            }
            many => {
                warn!(
                    candidates = ?many,
                    "several window-owning threads found; hooks will be installed unscoped"
                );
                MainThread::Unresolved
            }
        }
    }
}

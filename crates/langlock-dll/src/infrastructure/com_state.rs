//! Platform-independent bookkeeping for COM use.
//!
//! COM initialisation is per thread.  Every thread that creates the
//! text-services objects must have joined an apartment first, and only the
//! thread that entered an apartment may leave it again.
//!
//! - [`ApartmentLedger`] records, per OS thread, how COM became usable there.
//! - [`SinkCookie`] holds an advise registration and forgets it only once
//!   the unadvise call succeeded, so a channel never reports itself disarmed
//!   while its sink is still registered.

/// OS thread identifier (`GetCurrentThreadId`).
pub type OsThreadId = u32;

/// How COM became usable on one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadApartment {
    /// Entered by this library; the same thread must leave it.
    Owned,
    /// Initialised by the host in a different mode; never left by us.
    Borrowed,
}

/// Per-thread record of COM initialisation.
#[derive(Debug, Default)]
pub struct ApartmentLedger {
    threads: Vec<(OsThreadId, ThreadApartment)>,
}

impl ApartmentLedger {
    pub const fn new() -> Self {
        Self {
            threads: Vec::new(),
        }
    }

    /// How COM was made usable on `thread`, if it was.
    pub fn apartment(&self, thread: OsThreadId) -> Option<ThreadApartment> {
        self.threads
            .iter()
            .find(|(id, _)| *id == thread)
            .map(|(_, apartment)| *apartment)
    }

    /// Returns `true` if `thread` still has to initialise COM.
    pub fn needs_init(&self, thread: OsThreadId) -> bool {
        self.apartment(thread).is_none()
    }

    /// Records a successful initialisation on `thread`.  A second record for
    /// the same thread is ignored.
    pub fn record(&mut self, thread: OsThreadId, apartment: ThreadApartment) {
        if self.needs_init(thread) {
            self.threads.push((thread, apartment));
        }
    }

    /// Forgets `thread`.  Returns `true` if the caller, running on that
    /// thread, must now call `CoUninitialize`.
    pub fn release(&mut self, thread: OsThreadId) -> bool {
        let Some(pos) = self.threads.iter().position(|(id, _)| *id == thread) else {
            return false;
        };
        self.threads.swap_remove(pos).1 == ThreadApartment::Owned
    }

    /// Forgets every remaining thread and returns those whose owned
    /// apartments can only be left by the thread itself (or its exit).
    pub fn drain_owned(&mut self) -> Vec<OsThreadId> {
        let mut owned: Vec<OsThreadId> = self
            .threads
            .drain(..)
            .filter(|(_, apartment)| *apartment == ThreadApartment::Owned)
            .map(|(id, _)| id)
            .collect();
        owned.sort_unstable();
        owned
    }

    /// Number of threads with a recorded apartment.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

/// Advise cookie of a registered notification sink.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkCookie(Option<u32>);

impl SinkCookie {
    /// The held cookie, if a sink is registered.
    pub fn get(&self) -> Option<u32> {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Records the cookie returned by a successful advise.
    pub fn set(&mut self, cookie: u32) {
        self.0 = Some(cookie);
    }

    /// Runs `unadvise` for the held cookie.
    ///
    /// The cookie is forgotten only when `unadvise` succeeds; returns the
    /// released cookie, or `None` when nothing was registered.
    ///
    /// # Errors
    ///
    /// Propagates the error of `unadvise`; the cookie is kept.
    pub fn release<E>(
        &mut self,
        unadvise: impl FnOnce(u32) -> Result<(), E>,
    ) -> Result<Option<u32>, E> {
        let Some(cookie) = self.0 else {
            return Ok(None);
        };
        unadvise(cookie)?;
        self.0 = None;
        Ok(Some(cookie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── ApartmentLedger ───────────────────────────────────────────────────────

    #[test]
    fn test_each_thread_needs_its_own_init() {
        // Arrange: thread 10 locked first and entered an apartment
        let mut ledger = ApartmentLedger::new();
        ledger.record(10, ThreadApartment::Owned);

        // Act / Assert: a later unlock on thread 20 must initialise too
        assert!(!ledger.needs_init(10));
        assert!(ledger.needs_init(20));
    }

    #[test]
    fn test_release_on_owning_thread_requires_uninit() {
        let mut ledger = ApartmentLedger::new();
        ledger.record(10, ThreadApartment::Owned);

        assert!(ledger.release(10));
        assert!(ledger.needs_init(10));
    }

    #[test]
    fn test_release_on_thread_that_never_initialised_requires_nothing() {
        // Arrange
        let mut ledger = ApartmentLedger::new();
        ledger.record(10, ThreadApartment::Owned);

        // Act: unload happens on thread 30
        let must_uninit = ledger.release(30);

        // Assert: thread 30 must not call CoUninitialize; 10 is still recorded
        assert!(!must_uninit);
        assert_eq!(ledger.apartment(10), Some(ThreadApartment::Owned));
    }

    #[test]
    fn test_borrowed_apartment_is_never_left() {
        let mut ledger = ApartmentLedger::new();
        ledger.record(10, ThreadApartment::Borrowed);

        assert!(!ledger.release(10));
    }

    #[test]
    fn test_duplicate_record_keeps_first() {
        let mut ledger = ApartmentLedger::new();
        ledger.record(10, ThreadApartment::Borrowed);
        ledger.record(10, ThreadApartment::Owned);

        assert_eq!(ledger.apartment(10), Some(ThreadApartment::Borrowed));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_drain_owned_reports_only_owned_threads() {
        // Arrange
        let mut ledger = ApartmentLedger::new();
        ledger.record(30, ThreadApartment::Owned);
        ledger.record(20, ThreadApartment::Borrowed);
        ledger.record(10, ThreadApartment::Owned);

        // Act
        let owned = ledger.drain_owned();

        // Assert
        assert_eq!(owned, vec![10, 30]);
        assert!(ledger.is_empty());
    }

    // ── SinkCookie ────────────────────────────────────────────────────────────

    #[test]
    fn test_failed_unadvise_keeps_cookie() {
        // Arrange: a sink advised on another thread
        let mut cookie = SinkCookie::default();
        cookie.set(7);

        // Act: unadvise from a thread without COM fails
        let result = cookie.release(|_| Err("CO_E_NOTINITIALIZED"));

        // Assert: still reported as registered
        assert_eq!(result, Err("CO_E_NOTINITIALIZED"));
        assert!(cookie.is_set());
        assert_eq!(cookie.get(), Some(7));
    }

    #[test]
    fn test_successful_unadvise_clears_cookie() {
        let mut cookie = SinkCookie::default();
        cookie.set(7);
        let mut unadvised = None;

        let result: Result<_, ()> = cookie.release(|c| {
            unadvised = Some(c);
            Ok(())
        });

        assert_eq!(result, Ok(Some(7)));
        assert_eq!(unadvised, Some(7));
        assert!(!cookie.is_set());
    }

    #[test]
    fn test_release_without_cookie_does_not_call_unadvise() {
        let mut cookie = SinkCookie::default();
        let mut called = false;

        let result: Result<_, ()> = cookie.release(|_| {
            called = true;
            Ok(())
        });

        assert_eq!(result, Ok(None));
        assert!(!called);
    }

    #[test]
    fn test_retry_after_failed_unadvise_releases_same_cookie() {
        let mut cookie = SinkCookie::default();
        cookie.set(42);
        let _ = cookie.release(|_| Err(()));

        let result: Result<_, ()> = cookie.release(|_| Ok(()));

        assert_eq!(result, Ok(Some(42)));
        assert!(!cookie.is_set());
    }
}

//! LockController: the Lock / Unlock use case.
//!
//! Owns the detector set and main-thread locator, shares the [`LockState`]
//! and switcher with [`SwitchDetectors`](super::detectors::SwitchDetectors),
//! and decides when layouts are activated.
//!
//! # Lock
//!
//! ```text
//!                   ┌──────────── unlocked ────────────┐
//!   lock(req) ──────┤ target = req or live layout      │
//!                   │ activate(target) if != live      │── fail ──▶ NONE, stays unlocked
//!                   │ record lock, resolve main thread │
//!                   │ arm detectors, activate again    │──────────▶ target
//!                   └──────────────────────────────────┘
//!                   ┌───────────── locked to L ────────┐
//!                   │ req null or == live              │──────────▶ L
//!                   │ record req, activate(req)        │── ok ────▶ req
//!                   │                                  │── fail ──▶ record L, activate(L), L
//!                   └──────────────────────────────────┘
//! ```
//!
//! The second activation after arming matters: Windows silently ignores an
//! activation for a process whose window is not in the foreground, and an
//! event between the first activation and arming may already have switched
//! away.  Once the detectors are armed any such loss gets caught.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::detectors::{DetectorKind, DetectorSet};
use super::main_thread::{MainThreadLocator, ThreadInspector};
use super::switcher::LayoutSwitcher;
use crate::domain::{
    layout::LayoutHandle,
    state::{LockState, MainThread},
};

/// The input-language lock state machine.
pub struct LockController<S, I> {
    state: Arc<LockState>,
    switcher: Arc<S>,
    locator: MainThreadLocator<I>,
    detectors: DetectorSet,
}

impl<S: LayoutSwitcher, I: ThreadInspector> LockController<S, I> {
    /// Creates an unlocked controller.
    ///
    /// `state` and `switcher` must be the same instances handed to the
    /// [`SwitchDetectors`](super::detectors::SwitchDetectors) the channels in
    /// `detectors` report to.
    pub fn new(
        state: Arc<LockState>,
        switcher: Arc<S>,
        inspector: I,
        detectors: DetectorSet,
    ) -> Self {
        Self {
            state,
            switcher,
            locator: MainThreadLocator::new(inspector),
            detectors,
        }
    }

    /// Locks the input language to `requested`, or to the live layout when
    /// `requested` is [`LayoutHandle::NONE`].
    ///
    /// Returns the locked layout, or [`LayoutHandle::NONE`] if no lock could
    /// be established.  A failed change request while locked keeps the
    /// previous lock and returns it.
    pub fn lock(&mut self, requested: LayoutHandle) -> LayoutHandle {
        let live = self.switcher.current_layout(self.state.main_thread());
        debug!(%requested, %live, "lock requested");

        match self.state.locked_layout() {
            None => self.lock_fresh(requested, live),
            Some(previous) => self.change_lock(previous, requested, live),
        }
    }

    /// Releases the lock and disarms every detector.  No-op when unlocked.
    pub fn unlock(&mut self) {
        let Some(layout) = self.state.locked_layout() else {
            return;
        };
        self.detectors.disarm_all();
        self.state.clear_lock();
        info!(%layout, "input language unlocked");
    }

    /// The layout currently locked, if any.
    pub fn locked_layout(&self) -> Option<LayoutHandle> {
        self.state.locked_layout()
    }

    /// Returns `true` while a detected deviation awaits correction.
    pub fn is_revert_pending(&self) -> bool {
        self.state.revert().is_pending()
    }

    /// Kinds of the currently armed detection channels.
    pub fn armed_channels(&self) -> Vec<DetectorKind> {
        self.detectors.armed()
    }

    /// The main thread as last resolved.
    pub fn main_thread(&self) -> MainThread {
        self.locator.cached()
    }

    /// The shared lock context.
    pub fn state(&self) -> &Arc<LockState> {
        &self.state
    }

    fn lock_fresh(&mut self, requested: LayoutHandle, live: LayoutHandle) -> LayoutHandle {
        let target = requested.non_null().unwrap_or(live);

        if target != live {
            if let Err(e) = self.switcher.activate(target) {
                warn!(%target, error = %e, "failed to switch to the requested layout");
                return LayoutHandle::NONE;
            }
        }

        self.state.revert().reset();
        self.state.set_locked_layout(target);

        let thread = self.locator.resolve(&self.state);
        let armed = self.detectors.arm_all(thread);
        if armed < self.detectors.len() {
            warn!(
                armed,
                registered = self.detectors.len(),
                "input language locked with reduced detection coverage"
            );
        }
        info!(layout = %target, ?thread, armed, "input language locked");

        if let Err(e) = self.switcher.activate(target) {
            debug!(%target, error = %e, "repeated activation after arming failed");
        }
        target
    }

    fn change_lock(
        &mut self,
        previous: LayoutHandle,
        requested: LayoutHandle,
        live: LayoutHandle,
    ) -> LayoutHandle {
        if requested.is_none() || requested == live {
            return previous;
        }

        info!(%previous, %requested, "change of locked layout requested");
        // Recorded before activating so the detectors accept the switch.
        self.state.set_locked_layout(requested);

        match self.switcher.activate(requested) {
            Ok(()) => requested,
            Err(e) => {
                warn!(%requested, error = %e, "failed to switch locked layout; keeping previous lock");
                self.state.set_locked_layout(previous);
                if let Err(e) = self.switcher.activate(previous) {
                    warn!(%previous, error = %e, "failed to restore previously locked layout");
                }
                previous
            }
        }
    }
}

impl<S, I> Drop for LockController<S, I> {
    fn drop(&mut self) {
        self.detectors.disarm_all();
        self.state.clear_lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock::{ChannelTracker, FakeKeyboard, FakeThreads, RecordingChannel};
    use crate::application::switcher::MockLayoutSwitcher;
    use mockall::{predicate::eq, Sequence};

    const EN: LayoutHandle = LayoutHandle::from_raw(0x0409_0409);
    const FR: LayoutHandle = LayoutHandle::from_raw(0x040C_040C);
    const DE: LayoutHandle = LayoutHandle::from_raw(0x0407_0407);

    struct Fixture {
        controller: LockController<FakeKeyboard, FakeThreads>,
        keyboard: FakeKeyboard,
        trackers: Vec<ChannelTracker>,
    }

    fn fixture(live: LayoutHandle, installed: &[LayoutHandle]) -> Fixture {
        let keyboard = FakeKeyboard::new(live, installed);
        let channels = [
            RecordingChannel::new(DetectorKind::MessageHook),
            RecordingChannel::new(DetectorKind::ShellHook),
            RecordingChannel::new(DetectorKind::NotifySink),
        ];
        let trackers = channels.iter().map(RecordingChannel::tracker).collect();
        let mut detectors = DetectorSet::new();
        for channel in channels {
            detectors.register(Box::new(channel));
        }
        let controller = LockController::new(
            Arc::new(LockState::new()),
            Arc::new(keyboard.clone()),
            FakeThreads::single_window_thread(11),
            detectors,
        );
        Fixture {
            controller,
            keyboard,
            trackers,
        }
    }

    fn all_armed(trackers: &[ChannelTracker]) -> bool {
        trackers.iter().all(ChannelTracker::is_armed)
    }

    fn none_armed(trackers: &[ChannelTracker]) -> bool {
        trackers.iter().all(|p| !p.is_armed())
    }

    // ── Fresh lock ────────────────────────────────────────────────────────────

    #[test]
    fn test_lock_null_locks_live_layout_and_arms_detectors() {
        // Arrange
        let mut fx = fixture(EN, &[EN, FR]);

        // Act
        let result = fx.controller.lock(LayoutHandle::NONE);

        // Assert
        assert_eq!(result, EN);
        assert_eq!(fx.controller.locked_layout(), Some(EN));
        assert_eq!(fx.keyboard.live(), EN);
        assert!(all_armed(&fx.trackers));
        assert_eq!(fx.controller.main_thread(), MainThread::Resolved(11));
    }

    #[test]
    fn test_lock_specific_layout_switches_then_reactivates_after_arming() {
        let mut fx = fixture(EN, &[EN, FR]);

        let result = fx.controller.lock(FR);

        assert_eq!(result, FR);
        assert_eq!(fx.keyboard.live(), FR);
        assert_eq!(fx.keyboard.activations(), vec![FR, FR]);
    }

    #[test]
    fn test_lock_matching_live_layout_activates_once_after_arming() {
        let mut fx = fixture(EN, &[EN, FR]);

        fx.controller.lock(EN);

        assert_eq!(fx.keyboard.activations(), vec![EN]);
    }

    #[test]
    fn test_lock_unavailable_layout_leaves_state_unlocked() {
        // Arrange
        let mut fx = fixture(EN, &[EN]);

        // Act
        let result = fx.controller.lock(FR);

        // Assert
        assert_eq!(result, LayoutHandle::NONE);
        assert_eq!(fx.controller.locked_layout(), None);
        assert!(none_armed(&fx.trackers));
        assert_eq!(fx.keyboard.live(), EN);
    }

    #[test]
    fn test_lock_passes_resolved_main_thread_to_channels() {
        let mut fx = fixture(EN, &[EN]);

        fx.controller.lock(LayoutHandle::NONE);

        for tracker in &fx.trackers {
            assert_eq!(tracker.last_target(), Some(MainThread::Resolved(11)));
        }
    }

    #[test]
    fn test_lock_proceeds_degraded_with_failing_channel_and_ambiguous_main_thread() {
        // Arrange: shell hook cannot install; the caller (1) owns no window
        // and two other threads do
        let keyboard = FakeKeyboard::new(EN, &[EN, FR]);
        let message = RecordingChannel::new(DetectorKind::MessageHook);
        let shell = RecordingChannel::failing(DetectorKind::ShellHook);
        let sink = RecordingChannel::new(DetectorKind::NotifySink);
        let trackers = [message.tracker(), shell.tracker(), sink.tracker()];
        let detectors = DetectorSet::new()
            .with(Box::new(message))
            .with(Box::new(shell))
            .with(Box::new(sink));
        let mut controller = LockController::new(
            Arc::new(LockState::new()),
            Arc::new(keyboard.clone()),
            FakeThreads::new(1, vec![1, 2, 3], vec![2, 3]),
            detectors,
        );

        // Act
        let result = controller.lock(LayoutHandle::NONE);

        // Assert: locked anyway, hooks aimed at the unscoped target
        assert_eq!(result, EN);
        assert_eq!(controller.locked_layout(), Some(EN));
        assert_eq!(controller.main_thread(), MainThread::Unresolved);
        assert_eq!(
            controller.armed_channels(),
            vec![DetectorKind::MessageHook, DetectorKind::NotifySink]
        );
        for tracker in &trackers {
            assert_eq!(tracker.last_target(), Some(MainThread::Unresolved));
        }
        assert!(!trackers[1].is_armed());

        // Act: unlock leaves nothing armed
        controller.unlock();

        // Assert
        assert!(none_armed(&trackers));
        assert!(controller.armed_channels().is_empty());
        assert_eq!(keyboard.live(), EN);
    }

    #[test]
    fn test_lock_with_every_channel_failing_still_locks() {
        let detectors = DetectorSet::new()
            .with(Box::new(RecordingChannel::failing(DetectorKind::MessageHook)))
            .with(Box::new(RecordingChannel::failing(DetectorKind::ShellHook)));
        let mut controller = LockController::new(
            Arc::new(LockState::new()),
            Arc::new(FakeKeyboard::new(EN, &[EN, FR])),
            FakeThreads::single_window_thread(5),
            detectors,
        );

        let result = controller.lock(FR);

        assert_eq!(result, FR);
        assert_eq!(controller.locked_layout(), Some(FR));
        assert!(controller.armed_channels().is_empty());
    }

    // ── Lock while locked ─────────────────────────────────────────────────────

    #[test]
    fn test_lock_same_layout_again_is_noop() {
        let mut fx = fixture(EN, &[EN, FR]);
        fx.controller.lock(EN);
        fx.keyboard.clear_activations();

        let result = fx.controller.lock(EN);

        assert_eq!(result, EN);
        assert!(fx.keyboard.activations().is_empty());
        assert_eq!(fx.trackers[0].arm_count(), 1);
    }

    #[test]
    fn test_lock_null_while_locked_returns_locked_layout() {
        let mut fx = fixture(EN, &[EN, FR]);
        fx.controller.lock(EN);

        assert_eq!(fx.controller.lock(LayoutHandle::NONE), EN);
    }

    #[test]
    fn test_lock_change_to_available_layout_updates_lock() {
        let mut fx = fixture(EN, &[EN, FR]);
        fx.controller.lock(EN);

        let result = fx.controller.lock(FR);

        assert_eq!(result, FR);
        assert_eq!(fx.controller.locked_layout(), Some(FR));
        assert_eq!(fx.keyboard.live(), FR);
        assert!(all_armed(&fx.trackers));
    }

    #[test]
    fn test_lock_change_to_unavailable_layout_rolls_back() {
        // Arrange
        let mut fx = fixture(EN, &[EN, FR]);
        fx.controller.lock(EN);
        fx.keyboard.clear_activations();

        // Act
        let result = fx.controller.lock(DE);

        // Assert
        assert_eq!(result, EN);
        assert_eq!(fx.controller.locked_layout(), Some(EN));
        assert_eq!(fx.keyboard.live(), EN);
        assert_eq!(fx.keyboard.activations(), vec![DE, EN]);
        assert!(all_armed(&fx.trackers), "a failed change never drops the lock");
    }

    // ── Unlock ────────────────────────────────────────────────────────────────

    #[test]
    fn test_unlock_disarms_and_clears() {
        let mut fx = fixture(EN, &[EN]);
        fx.controller.lock(EN);

        fx.controller.unlock();

        assert_eq!(fx.controller.locked_layout(), None);
        assert!(none_armed(&fx.trackers));
        assert!(fx.controller.armed_channels().is_empty());
    }

    #[test]
    fn test_unlock_twice_is_noop() {
        let mut fx = fixture(EN, &[EN]);
        fx.controller.lock(EN);

        fx.controller.unlock();
        fx.controller.unlock();

        assert_eq!(fx.trackers[0].disarm_count(), 1);
    }

    #[test]
    fn test_unlock_when_never_locked_is_noop() {
        let mut fx = fixture(EN, &[EN]);
        fx.controller.unlock();
        assert_eq!(fx.trackers[0].disarm_count(), 0);
    }

    #[test]
    fn test_unlock_clears_pending_revert() {
        let mut fx = fixture(EN, &[EN, FR]);
        fx.controller.lock(EN);
        fx.controller.state().mark_revert();

        fx.controller.unlock();

        assert!(!fx.controller.is_revert_pending());
    }

    #[test]
    fn test_relock_after_unlock_rearms() {
        let mut fx = fixture(EN, &[EN, FR]);
        fx.controller.lock(EN);
        fx.controller.unlock();

        let result = fx.controller.lock(FR);

        assert_eq!(result, FR);
        assert_eq!(fx.trackers[1].arm_count(), 2);
        assert!(all_armed(&fx.trackers));
    }

    #[test]
    fn test_drop_disarms_detectors() {
        let Fixture {
            mut controller,
            trackers,
            ..
        } = fixture(EN, &[EN]);
        controller.lock(EN);

        drop(controller);

        assert!(none_armed(&trackers));
    }

    // ── Activation sequence with a strict mock ────────────────────────────────

    #[test]
    fn test_failed_change_restores_previous_layout_in_order() {
        // Arrange
        let mut seq = Sequence::new();
        let mut switcher = MockLayoutSwitcher::new();
        switcher.expect_current_layout().return_const(EN);
        switcher
            .expect_activate()
            .with(eq(EN))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        switcher
            .expect_activate()
            .with(eq(FR))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|l| Err(crate::application::switcher::SwitchError::Rejected(l)));
        switcher
            .expect_activate()
            .with(eq(EN))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut controller = LockController::new(
            Arc::new(LockState::new()),
            Arc::new(switcher),
            FakeThreads::single_window_thread(1),
            DetectorSet::new(),
        );

        // Act
        let first = controller.lock(LayoutHandle::NONE);
        let second = controller.lock(FR);

        // Assert
        assert_eq!(first, EN);
        assert_eq!(second, EN);
        assert_eq!(controller.locked_layout(), Some(EN));
    }
}

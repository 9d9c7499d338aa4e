//! Switch detection: the three channels and their shared decision logic.
//!
//! No single OS signal fires reliably for layout changes on every supported
//! Windows version, so three channels are armed together:
//!
//! | Channel        | Blocks?                    | Detects after the fact        | Safe to correct on        |
//! |----------------|----------------------------|-------------------------------|---------------------------|
//! | message hook   | `WM_INPUTLANGCHANGEREQUEST` | `WM_INPUTLANGCHANGE`          | any other message         |
//! | shell hook     | no                         | window activated / language   | window activated          |
//! | notify sink    | `OnLanguageChange` (old OS) | `OnLanguageChanged`           | never (would recurse)     |
//!
//! [`SwitchDetectors`] holds the decisions; the Win32 callbacks translate
//! their raw arguments into [`HookMessage`] / [`ShellEvent`] and act on the
//! returned verdict.  [`DetectorSet`] arms and disarms the concrete channels.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::switcher::LayoutSwitcher;
use crate::domain::{
    layout::LayoutHandle,
    state::{LockState, MainThread},
};

/// Identifies a detection channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// `WH_GETMESSAGE` hook on the main thread.
    MessageHook,
    /// `WH_SHELL` hook.
    ShellHook,
    /// Text-services language-profile notification sink.
    NotifySink,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectorKind::MessageHook => "message hook",
            DetectorKind::ShellHook => "shell hook",
            DetectorKind::NotifySink => "notify sink",
        })
    }
}

/// Error type for arming a detection channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectorError {
    /// The OS refused to install the hook or register the sink.
    #[error("failed to install {kind}: {reason}")]
    InstallFailed { kind: DetectorKind, reason: String },
    /// The service the channel relies on is not available in this process.
    #[error("{kind} unavailable: {reason}")]
    Unavailable { kind: DetectorKind, reason: String },
}

/// A switch-detection channel that can be armed and disarmed.
pub trait DetectorChannel: Send {
    /// Which channel this is.
    fn kind(&self) -> DetectorKind;

    /// Installs the channel targeting `thread`.  Arming an armed channel is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError`] when the channel cannot be installed; the
    /// channel stays disarmed.
    fn arm(&mut self, thread: MainThread) -> Result<(), DetectorError>;

    /// Removes the channel.  Disarming a disarmed channel is a no-op.
    fn disarm(&mut self);

    /// Returns `true` while installed.
    fn is_armed(&self) -> bool;
}

/// The set of channels armed on lock and disarmed on unlock.
#[derive(Default)]
pub struct DetectorSet {
    channels: Vec<Box<dyn DetectorChannel>>,
}

impl DetectorSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel to the set.
    pub fn register(&mut self, channel: Box<dyn DetectorChannel>) {
        self.channels.push(channel);
    }

    /// Builder form of [`DetectorSet::register`].
    pub fn with(mut self, channel: Box<dyn DetectorChannel>) -> Self {
        self.register(channel);
        self
    }

    /// Arms every channel independently and returns how many are armed.
    ///
    /// A failing channel is logged and skipped: the lock continues with
    /// reduced detection coverage.
    pub fn arm_all(&mut self, thread: MainThread) -> usize {
        for channel in &mut self.channels {
            match channel.arm(thread) {
                Ok(()) => debug!(channel = %channel.kind(), ?thread, "detector armed"),
                Err(e) => warn!(error = %e, "detector not armed; continuing with fewer channels"),
            }
        }
        self.armed_count()
    }

    /// Disarms every armed channel.
    pub fn disarm_all(&mut self) {
        for channel in self.channels.iter_mut().filter(|c| c.is_armed()) {
            channel.disarm();
            if channel.is_armed() {
                warn!(channel = %channel.kind(), "detector could not be disarmed");
            } else {
                debug!(channel = %channel.kind(), "detector disarmed");
            }
        }
    }

    /// Kinds of the currently armed channels.
    pub fn armed(&self) -> Vec<DetectorKind> {
        self.channels
            .iter()
            .filter(|c| c.is_armed())
            .map(|c| c.kind())
            .collect()
    }

    /// Number of currently armed channels.
    pub fn armed_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_armed()).count()
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// A message observed by the message hook, reduced to what the lock cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMessage {
    /// `WM_INPUTLANGCHANGEREQUEST`: a switch is about to happen.
    LanguageChangeRequest,
    /// `WM_INPUTLANGCHANGE`: the layout changed to the carried handle.
    LanguageChanged(LayoutHandle),
    /// `WM_DESTROY`: never used as a correction point.
    Destroy,
    /// Any other message id.
    Other(u32),
}

/// What the message hook should do with the observed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVerdict {
    /// Let the message through unchanged.
    Pass,
    /// Neutralize the message so the switch does not happen.
    Suppress,
}

/// A shell-hook event, reduced to what the lock cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    /// A top-level window was activated (including "rude" activations).
    WindowActivated,
    /// The keyboard language changed.
    LanguageChanged,
    /// Any other shell hook code.
    Other(i32),
}

/// Decision logic shared by the three detection channels.
///
/// Holds the same [`LockState`] the controller mutates plus the switcher
/// used for corrections.  Every method completes synchronously and never
/// issues a correction from the notification that reported the deviation.
pub struct SwitchDetectors<S> {
    state: Arc<LockState>,
    switcher: Arc<S>,
}

impl<S: LayoutSwitcher> SwitchDetectors<S> {
    /// Creates the detectors over a shared state and switcher.
    pub fn new(state: Arc<LockState>, switcher: Arc<S>) -> Self {
        Self { state, switcher }
    }

    /// The shared lock context.
    pub fn state(&self) -> &Arc<LockState> {
        &self.state
    }

    /// Message hook: called for every message retrieved by the hooked thread.
    pub fn on_message(&self, message: HookMessage) -> MessageVerdict {
        match message {
            // Only effective before Windows XP: later versions switch before
            // this message reaches hooks.  Kept since it costs nothing.
            HookMessage::LanguageChangeRequest => {
                if self.state.is_locked() && !self.state.revert().is_pending() {
                    info!("input language switch blocked in language change request");
                    return MessageVerdict::Suppress;
                }
            }
            HookMessage::LanguageChanged(new_layout) => {
                // Windows 8+ may skip this message for hooks, hence the sink.
                if let Some(locked) = self.state.locked_layout() {
                    if new_layout != locked && self.state.mark_revert() {
                        debug!(%new_layout, %locked, "message hook detected unblocked switch");
                    }
                }
            }
            HookMessage::Destroy => {}
            HookMessage::Other(message_id) => {
                self.correct_if_pending("message hook", Some(message_id));
            }
        }
        MessageVerdict::Pass
    }

    /// Shell hook: called for shell events on the hooked thread.
    pub fn on_shell_event(&self, event: ShellEvent) {
        if matches!(event, ShellEvent::Other(_)) {
            return;
        }

        // The event payload is unreliable across versions; ask for the live layout.
        if let Some(locked) = self.state.locked_layout() {
            let live = self.live_layout();
            if live != locked && self.state.mark_revert() {
                debug!(?event, %live, %locked, "shell hook detected unblocked switch");
            }
        }

        if event == ShellEvent::WindowActivated {
            self.correct_if_pending("shell hook", None);
        }
    }

    /// Notify sink, pre-change notice.  Returns whether the change is accepted.
    ///
    /// Windows 8 and later ignore the answer (and mostly stop calling it).
    pub fn on_language_change(&self, language_id: u16) -> bool {
        if self.state.is_locked() {
            info!(language_id, "input language switch rejected by notify sink");
            return false;
        }
        true
    }

    /// Notify sink, post-change notice.
    pub fn on_language_changed(&self) {
        let Some(locked) = self.state.locked_layout() else {
            return;
        };
        if self.state.revert().is_pending() {
            return;
        }
        let live = self.live_layout();
        if live != locked && self.state.mark_revert() {
            debug!(%live, %locked, "notify sink detected unblocked switch");
        }
    }

    /// Live layout of the main thread (the calling thread while unresolved).
    pub fn live_layout(&self) -> LayoutHandle {
        self.switcher.current_layout(self.state.main_thread())
    }

    fn correct_if_pending(&self, channel: &'static str, message_id: Option<u32>) {
        let Some(locked) = self.state.take_revert() else {
            return;
        };
        debug!(channel, ?message_id, %locked, "reverting unblocked input language switch");
        if let Err(e) = self.switcher.activate(locked) {
            warn!(channel, error = %e, "corrective layout activation failed");
        }
    }
}

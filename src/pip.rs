//! Picture-in-picture lifecycle
//!
//! Tells "the user left PiP and came back" apart from "the user closed the
//! app". Focus regain after a PiP exit lands slightly after the mode change
//! is reported, so the exit path polls focus a bounded number of times
//! before giving up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::published::Published;

/// Focus checks made after a non-terminal PiP exit
pub const PIP_RESTORE_ATTEMPTS: u32 = 3;
/// Delay before each focus check
pub const PIP_RESTORE_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipState {
    #[default]
    Idle,
    Requesting,
    InPip,
    ExitingRestoreCheck,
    ExitingFinishing,
}

/// Host window surface the controller drives
pub trait PipHost: Send + Sync {
    /// Platform offers PiP at all
    fn is_supported(&self) -> bool;

    fn is_in_pip(&self) -> bool;

    /// Ask the platform to enter PiP; false when refused
    fn enter_pip(&self) -> bool;

    fn has_focus(&self) -> bool;

    fn is_finishing(&self) -> bool;

    fn is_destroyed(&self) -> bool;

    fn set_ui_hidden(&self, hidden: bool);
}

/// Retry budget of the focus poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: PIP_RESTORE_ATTEMPTS,
            interval: PIP_RESTORE_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Same budget, no delay
    pub fn immediate() -> Self {
        Self {
            attempts: PIP_RESTORE_ATTEMPTS,
            interval: Duration::ZERO,
        }
    }
}

pub type PipCallback = Box<dyn FnOnce() + Send>;

struct PendingCallbacks {
    on_restore: PipCallback,
    on_close: PipCallback,
}

/// How a PiP cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipExit {
    Restored,
    Closed,
}

pub struct PipController {
    host: Arc<dyn PipHost>,
    policy: PollPolicy,
    state: Published<PipState>,
    pending: Mutex<Option<PendingCallbacks>>,
    ui_hidden: AtomicBool,
}

impl PipController {
    pub fn new(host: Arc<dyn PipHost>) -> Self {
        Self::with_policy(host, PollPolicy::default())
    }

    pub fn with_policy(host: Arc<dyn PipHost>, policy: PollPolicy) -> Self {
        Self {
            host,
            policy,
            state: Published::default(),
            pending: Mutex::new(None),
            ui_hidden: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PipState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipState> {
        self.state.subscribe()
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingCallbacks>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn show_ui(&self) {
        if self.ui_hidden.swap(false, Ordering::SeqCst) {
            self.host.set_ui_hidden(false);
        }
    }

    /// Try to enter PiP. Returns false, with nothing changed, when PiP is
    /// unavailable or already active or the platform refuses.
    pub fn request_pip(
        &self,
        hide_ui: bool,
        on_restore: impl FnOnce() + Send + 'static,
        on_close: impl FnOnce() + Send + 'static,
    ) -> bool {
        if !self.host.is_supported() || self.state() != PipState::Idle || self.host.is_in_pip() {
            debug!("PiP request ignored");
            return false;
        }

        *self.pending() = Some(PendingCallbacks {
            on_restore: Box::new(on_restore),
            on_close: Box::new(on_close),
        });
        if hide_ui {
            self.ui_hidden.store(true, Ordering::SeqCst);
            self.host.set_ui_hidden(true);
        }
        self.state.set(PipState::Requesting);

        if self.host.enter_pip() {
            debug!("PiP requested");
            return true;
        }

        // Roll back everything the attempt touched
        self.show_ui();
        *self.pending() = None;
        self.state.set(PipState::Idle);
        info!("Platform refused PiP");
        false
    }

    /// Platform reported a PiP mode change.
    ///
    /// Returns how the cycle ended, or `None` when the change did not end a
    /// cycle this controller started.
    pub async fn on_mode_changed(&self, is_in_pip: bool, is_finishing: bool) -> Option<PipExit> {
        if is_in_pip {
            self.state.set_if_changed(PipState::InPip);
            return None;
        }

        // Taking the callbacks here makes a second report for the same exit a no-op
        let Some(callbacks) = self.pending().take() else {
            // PiP the platform entered on its own still has to end in Idle.
            // A cycle already exiting finishes on its own.
            if self.state() == PipState::InPip {
                self.show_ui();
                self.state.set(PipState::Idle);
                debug!("PiP exited without a pending request");
            }
            return None;
        };
        self.show_ui();

        let exit = if is_finishing {
            self.state.set(PipState::ExitingFinishing);
            PipExit::Closed
        } else {
            self.state.set(PipState::ExitingRestoreCheck);
            self.poll_for_focus().await
        };

        match exit {
            PipExit::Restored => (callbacks.on_restore)(),
            PipExit::Closed => (callbacks.on_close)(),
        }
        info!(?exit, "PiP cycle finished");
        self.state.set(PipState::Idle);
        Some(exit)
    }

    async fn poll_for_focus(&self) -> PipExit {
        for attempt in 1..=self.policy.attempts {
            tokio::time::sleep(self.policy.interval).await;
            if self.host.has_focus() && !self.host.is_finishing() && !self.host.is_destroyed() {
                debug!(attempt, "Focus regained after PiP");
                return PipExit::Restored;
            }
        }
        PipExit::Closed
    }
}

#[cfg(test)]
#[path = "pip_tests.rs"]
mod tests;

//! Form-submission retry notifier.
//!
//! Forms marked `can-retry` get a persistent "saving..." notice on submit.
//! The server is never actually consulted: the escalation is driven purely by
//! elapsed time, through an explicit state machine with a single cancellable
//! timer per form instead of chained anonymous timeouts. If the warn deadline
//! passes, the notice turns into an error-severity warning; if the retry
//! deadline passes, the form is re-submitted and the cycle restarts.
//!
//! Blind resubmission can duplicate server-side effects when the original
//! submission was merely slow. That tradeoff is the point of the mechanism,
//! so it is a policy knob (`resubmit`) rather than something to paper over.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::behaviors::flash::{FlashBehavior, Severity};
use crate::behaviors::TimerEvent;
use crate::page::{NodeId, Page};
use crate::timer::{TimerId, TimerQueue};

pub const SAVING_TEXT: &str = "saving...";
pub const WARN_TEXT: &str =
    "The server is taking too long to respond. Retrying in 30 seconds.";
pub const RETRY_TEXT: &str = "retrying...";

/// Id reserved for the shared saving-progress notice.
const SAVE_MESSAGE_ID: &str = "save-message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPhase {
    #[default]
    Idle,
    Waiting,
    Warning,
    Retrying,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the slow-server warning.
    pub warn_after: Duration,
    /// Total delay before the blind resubmit.
    pub retry_after: Duration,
    /// Whether to actually resubmit, or stop at the warning.
    pub resubmit: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            warn_after: Duration::from_millis(7_000),
            retry_after: Duration::from_millis(30_000),
            resubmit: true,
        }
    }
}

#[derive(Debug, Default)]
struct RetryState {
    phase: RetryPhase,
    timer: Option<TimerId>,
}

pub struct RetryBehavior {
    policy: RetryPolicy,
    states: HashMap<NodeId, RetryState>,
}

impl RetryBehavior {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            states: HashMap::new(),
        }
    }

    pub fn phase(&self, form: NodeId) -> RetryPhase {
        self.states.get(&form).map(|s| s.phase).unwrap_or_default()
    }

    /// A submit always resets the cycle from scratch: any outstanding stage
    /// timer is cancelled before the new one is scheduled.
    pub fn on_submit(
        &mut self,
        page: &mut Page,
        flash: &mut FlashBehavior,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
        form: NodeId,
    ) {
        let state = self.states.entry(form).or_default();
        if let Some(timer) = state.timer.take() {
            timers.cancel(timer);
        }
        state.phase = RetryPhase::Waiting;
        state.timer = Some(timers.schedule(now, self.policy.warn_after, TimerEvent::RetryWarn(form)));

        let notice = Self::ensure_save_message(page, flash, timers, now);
        flash.set_text(page, notice, SAVING_TEXT);
        flash.set_severity(notice, Severity::Notice);
        flash.show(page, notice);
    }

    /// The warn deadline: express our concern.
    pub fn on_warn(
        &mut self,
        page: &mut Page,
        flash: &mut FlashBehavior,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
        form: NodeId,
    ) {
        let Some(state) = self.states.get_mut(&form) else { return };
        if state.phase != RetryPhase::Waiting {
            return;
        }
        state.phase = RetryPhase::Warning;
        state.timer = if self.policy.resubmit {
            let remaining = self.policy.retry_after.saturating_sub(self.policy.warn_after);
            Some(timers.schedule(now, remaining, TimerEvent::RetryFire(form)))
        } else {
            None
        };

        let notice = Self::ensure_save_message(page, flash, timers, now);
        flash.set_text(page, notice, WARN_TEXT);
        flash.set_severity(notice, Severity::Error);
        // Re-shown even if the user closed it; this one matters.
        flash.show(page, notice);
        tracing::warn!("form submission slow, warning shown");
    }

    /// The retry deadline: give up waiting and ask the host to resubmit.
    /// Returns true when the form should be submitted again.
    pub fn on_retry_deadline(
        &mut self,
        page: &mut Page,
        flash: &mut FlashBehavior,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
        form: NodeId,
    ) -> bool {
        let Some(state) = self.states.get_mut(&form) else { return false };
        if state.phase != RetryPhase::Warning {
            return false;
        }
        state.phase = RetryPhase::Retrying;
        state.timer = None;

        let notice = Self::ensure_save_message(page, flash, timers, now);
        flash.set_text(page, notice, RETRY_TEXT);
        flash.show(page, notice);
        tracing::warn!("form submission timed out, resubmitting");
        true
    }

    /// The submission completed (the navigation analog): cancel the pending
    /// stage and dismiss the saving notice.
    pub fn resolve(
        &mut self,
        page: &mut Page,
        flash: &mut FlashBehavior,
        timers: &mut TimerQueue<TimerEvent>,
        form: NodeId,
    ) {
        let Some(state) = self.states.get_mut(&form) else { return };
        if let Some(timer) = state.timer.take() {
            timers.cancel(timer);
        }
        state.phase = RetryPhase::Idle;
        if let Some(notice) = page.by_id(SAVE_MESSAGE_ID) {
            flash.hide(page, notice, timers);
        }
    }

    /// Find or create the shared saving notice.
    fn ensure_save_message(
        page: &mut Page,
        flash: &mut FlashBehavior,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
    ) -> NodeId {
        if let Some(existing) = page.by_id(SAVE_MESSAGE_ID) {
            return existing;
        }
        let notice = flash.flash(page, timers, now, SAVING_TEXT, Severity::Notice, None);
        if let Some(node) = page.get_mut(notice) {
            node.id = Some(SAVE_MESSAGE_ID.to_string());
        }
        notice
    }
}

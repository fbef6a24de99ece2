//! Flash notices: transient banners with a severity, a close box and an
//! optional auto-dismiss.
//!
//! Pre-rendered notices are seeded from the `#flash` staging container into
//! the `#notifications` area at init; notices posted later through `flash`
//! land in the same area and are covered by the same delegated close-box
//! binding, so nothing is ever rebound.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::behaviors::TimerEvent;
use crate::dispatch::{Dispatcher, Route};
use crate::page::selector::sel;
use crate::page::{Node, NodeId, NodeKind, Page};
use crate::timer::{TimerId, TimerQueue};

/// Fade-out duration before a dismissed notice is hidden.
pub const FADE_DURATION: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Notice,
    Ok,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Notice => "notice",
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    pub fn from_class(class: &str) -> Option<Self> {
        Some(match class {
            "notice" => Severity::Notice,
            "ok" => Severity::Ok,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => return None,
        })
    }
}

#[derive(Debug)]
struct NoticeState {
    severity: Severity,
    dismiss: Option<TimerId>,
    fading_since: Option<Instant>,
}

pub struct FlashBehavior {
    dismiss_after: Duration,
    notices: HashMap<NodeId, NoticeState>,
    /// Error-severity texts shown since the last drain; the host application
    /// may surface them as desktop notifications.
    errors_raised: Vec<String>,
    bound: bool,
}

impl FlashBehavior {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            dismiss_after,
            notices: HashMap::new(),
            errors_raised: Vec::new(),
            bound: false,
        }
    }

    /// Seed pre-rendered notices and register the one delegated close-box
    /// binding.
    pub fn setup(
        &mut self,
        page: &mut Page,
        dispatcher: &mut Dispatcher,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
    ) {
        if !self.bound {
            dispatcher.bind(sel("#notifications .close-box"), Route::NoticeClose);
            self.bound = true;
        }
        let area = self.ensure_area(page);
        if let Some(staging) = page.by_id("flash") {
            // Reverse so prepending preserves the staged order, newest first.
            let staged: Vec<NodeId> = page.children(staging).to_vec();
            for notice in staged.into_iter().rev() {
                page.reparent_prepend(notice, area);
            }
        }
        // Wire every notice in the area that has not been adopted yet.
        for notice in page.select_within(area, &sel("notice")) {
            if self.notices.contains_key(&notice) {
                continue;
            }
            let severity = page
                .get(notice)
                .map(|n| {
                    n.classes
                        .iter()
                        .find_map(|c| Severity::from_class(c))
                        .unwrap_or_default()
                })
                .unwrap_or_default();
            self.adopt(page, timers, now, notice, severity, Some(self.dismiss_after));
        }
    }

    fn ensure_area(&self, page: &mut Page) -> NodeId {
        if let Some(area) = page.by_id("notifications") {
            return area;
        }
        let root = page.root();
        page.prepend(root, Node::new(NodeKind::NoticeArea).id("notifications"))
    }

    fn adopt(
        &mut self,
        page: &mut Page,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
        notice: NodeId,
        severity: Severity,
        timeout: Option<Duration>,
    ) {
        page.prepend(notice, Node::new(NodeKind::Link).class("close-box").text("x"));
        let dismiss =
            timeout.map(|t| timers.schedule(now, t, TimerEvent::NoticeDismiss(notice)));
        self.notices.insert(
            notice,
            NoticeState {
                severity,
                dismiss,
                fading_since: None,
            },
        );
        if severity == Severity::Error {
            self.raise_error(page, notice);
        }
    }

    /// Post a new notice. `timeout` of `None` means the notice stays until
    /// closed. Returns the notice id so callers can update it later.
    pub fn flash(
        &mut self,
        page: &mut Page,
        timers: &mut TimerQueue<TimerEvent>,
        now: Instant,
        text: &str,
        severity: Severity,
        timeout: Option<Duration>,
    ) -> NodeId {
        let area = self.ensure_area(page);
        let notice = page.prepend(area, Node::new(NodeKind::Notice));
        page.append(notice, Node::new(NodeKind::Text).text(text));
        self.adopt(page, timers, now, notice, severity, timeout);
        notice
    }

    /// Close-box click: hide the enclosing notice. The notice stays in the
    /// tree and can be re-shown.
    pub fn close(&mut self, page: &mut Page, close_box: NodeId) {
        if let Some(notice) = page.closest(close_box, &sel("notice")) {
            if let Some(node) = page.get_mut(notice) {
                node.hidden = true;
            }
        }
    }

    pub fn set_text(&self, page: &mut Page, notice: NodeId, text: &str) {
        if let Some(body) = page.select_within(notice, &sel("text")).first().copied() {
            if let Some(node) = page.get_mut(body) {
                node.text = text.to_string();
            }
        }
    }

    pub fn set_severity(&mut self, notice: NodeId, severity: Severity) {
        if let Some(state) = self.notices.get_mut(&notice) {
            state.severity = severity;
        }
    }

    /// Un-hide a notice, interrupting any fade in progress.
    pub fn show(&mut self, page: &mut Page, notice: NodeId) {
        if let Some(node) = page.get_mut(notice) {
            node.hidden = false;
        }
        let severity = match self.notices.get_mut(&notice) {
            Some(state) => {
                state.fading_since = None;
                state.severity
            }
            None => return,
        };
        if severity == Severity::Error {
            self.raise_error(page, notice);
        }
    }

    pub fn hide(&mut self, page: &mut Page, notice: NodeId, timers: &mut TimerQueue<TimerEvent>) {
        if let Some(node) = page.get_mut(notice) {
            node.hidden = true;
        }
        if let Some(state) = self.notices.get_mut(&notice) {
            state.fading_since = None;
            if let Some(id) = state.dismiss.take() {
                timers.cancel(id);
            }
        }
    }

    /// The auto-dismiss deadline: start the fade-out.
    pub fn begin_fade(&mut self, notice: NodeId, now: Instant) {
        if let Some(state) = self.notices.get_mut(&notice) {
            state.dismiss = None;
            state.fading_since = Some(now);
        }
    }

    /// Advance fades; a completed fade hides the notice.
    pub fn tick(&mut self, page: &mut Page, now: Instant) {
        for (notice, state) in self.notices.iter_mut() {
            if let Some(started) = state.fading_since {
                if now.duration_since(started) >= FADE_DURATION {
                    state.fading_since = None;
                    if let Some(node) = page.get_mut(*notice) {
                        node.hidden = true;
                    }
                }
            }
        }
    }

    pub fn severity_of(&self, notice: NodeId) -> Option<Severity> {
        self.notices.get(&notice).map(|s| s.severity)
    }

    pub fn is_fading(&self, notice: NodeId) -> bool {
        self.notices
            .get(&notice)
            .map(|s| s.fading_since.is_some())
            .unwrap_or(false)
    }

    fn raise_error(&mut self, page: &Page, notice: NodeId) {
        let text = page
            .select_within(notice, &sel("text"))
            .first()
            .and_then(|t| page.get(*t))
            .map(|n| n.text.clone())
            .unwrap_or_default();
        if !text.is_empty() {
            self.errors_raised.push(text);
        }
    }

    pub fn take_errors_raised(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors_raised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold() -> (Page, Dispatcher, TimerQueue<TimerEvent>, FlashBehavior, Instant) {
        (
            Page::new(),
            Dispatcher::new(),
            TimerQueue::new(),
            FlashBehavior::new(Duration::from_millis(45_000)),
            Instant::now(),
        )
    }

    fn seed_staging(page: &mut Page, classes: &[&str]) -> Vec<NodeId> {
        let root = page.root();
        let staging = page.append(root, Node::new(NodeKind::Section).id("flash"));
        let _area = page.append(root, Node::new(NodeKind::NoticeArea).id("notifications"));
        classes
            .iter()
            .map(|c| {
                let mut node = Node::new(NodeKind::Notice);
                if !c.is_empty() {
                    node = node.class(*c);
                }
                let notice = page.append(staging, node);
                page.append(notice, Node::new(NodeKind::Text).text("hello"));
                notice
            })
            .collect()
    }

    #[test]
    fn test_seeding_defaults_to_notice_severity() {
        let (mut page, mut d, mut t, mut flash, now) = scaffold();
        let staged = seed_staging(&mut page, &["", "error"]);
        flash.setup(&mut page, &mut d, &mut t, now);

        assert_eq!(flash.severity_of(staged[0]), Some(Severity::Notice));
        assert_eq!(flash.severity_of(staged[1]), Some(Severity::Error));
        // Each acquired a close box and an auto-dismiss timer
        assert!(!page.select_within(staged[0], &sel(".close-box")).is_empty());
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_seeding_preserves_order_newest_first() {
        let (mut page, mut d, mut t, mut flash, now) = scaffold();
        let staged = seed_staging(&mut page, &["", ""]);
        flash.setup(&mut page, &mut d, &mut t, now);
        let area = page.by_id("notifications").unwrap();
        assert_eq!(page.children(area), staged.as_slice());
    }

    #[test]
    fn test_flash_and_close() {
        let (mut page, mut d, mut t, mut flash, now) = scaffold();
        flash.setup(&mut page, &mut d, &mut t, now);
        let notice = flash.flash(&mut page, &mut t, now, "saved", Severity::Ok, None);
        assert_eq!(flash.severity_of(notice), Some(Severity::Ok));
        assert!(!page.get(notice).unwrap().hidden);

        let close = page.select_within(notice, &sel(".close-box"))[0];
        flash.close(&mut page, close);
        assert!(page.get(notice).unwrap().hidden);
    }

    #[test]
    fn test_auto_dismiss_fades_then_hides() {
        let (mut page, mut d, mut t, mut flash, now) = scaffold();
        flash.setup(&mut page, &mut d, &mut t, now);
        let notice = flash.flash(
            &mut page,
            &mut t,
            now,
            "bye",
            Severity::Notice,
            Some(Duration::from_millis(1000)),
        );

        let fired = t.fire_due(now + Duration::from_millis(1000));
        assert_eq!(fired, vec![TimerEvent::NoticeDismiss(notice)]);
        flash.begin_fade(notice, now + Duration::from_millis(1000));
        assert!(flash.is_fading(notice));
        assert!(!page.get(notice).unwrap().hidden);

        flash.tick(&mut page, now + Duration::from_millis(1000) + FADE_DURATION);
        assert!(!flash.is_fading(notice));
        assert!(page.get(notice).unwrap().hidden);
    }

    #[test]
    fn test_show_interrupts_fade() {
        let (mut page, mut d, mut t, mut flash, now) = scaffold();
        flash.setup(&mut page, &mut d, &mut t, now);
        let notice = flash.flash(&mut page, &mut t, now, "hi", Severity::Notice, None);
        flash.begin_fade(notice, now);
        flash.show(&mut page, notice);
        flash.tick(&mut page, now + FADE_DURATION * 2);
        assert!(!page.get(notice).unwrap().hidden);
    }

    #[test]
    fn test_error_notices_are_raised_for_the_host() {
        let (mut page, mut d, mut t, mut flash, now) = scaffold();
        flash.setup(&mut page, &mut d, &mut t, now);
        flash.flash(&mut page, &mut t, now, "boom", Severity::Error, None);
        assert_eq!(flash.take_errors_raised(), vec!["boom".to_string()]);
        assert!(flash.take_errors_raised().is_empty());
    }
}

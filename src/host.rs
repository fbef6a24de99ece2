//! The page host: one page, one dispatcher, one timer queue, one controller
//! per behavior.
//!
//! Every entry point takes `now` explicitly so tests drive time; the binary
//! passes `Instant::now()`. Handlers run synchronously to completion before
//! the next event is read, and timer payloads fire from `tick` on the host's
//! cadence.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use serde::Serialize;

use crate::behaviors::editable::{EditMode, EditableBehavior};
use crate::behaviors::fields::FieldBehavior;
use crate::behaviors::flash::{FlashBehavior, Severity};
use crate::behaviors::help::HelpBehavior;
use crate::behaviors::panes::PaneBehavior;
use crate::behaviors::retry::{RetryBehavior, RetryPolicy};
use crate::behaviors::{assign_tab_order, PageContext, TimerEvent};
use crate::dispatch::{Dispatcher, Route, Verdict};
use crate::page::selector::sel;
use crate::page::{NodeId, NodeKind, Page, Selector};
use crate::timer::TimerQueue;

#[derive(Debug, Clone)]
pub struct HostOptions {
    pub retry: RetryPolicy,
    pub dismiss_after: Duration,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            dismiss_after: Duration::from_millis(45_000),
        }
    }
}

pub struct PageHost {
    pub page: Page,
    dispatcher: Dispatcher,
    timers: TimerQueue<TimerEvent>,
    pub editables: EditableBehavior,
    pub retry: RetryBehavior,
    pub panes: PaneBehavior,
    pub flash: FlashBehavior,
    pub fields: FieldBehavior,
    pub help: HelpBehavior,
    retry_forms: Selector,
    /// Hit map: rectangle per interactive node, recorded at render time.
    rects: HashMap<NodeId, Rect>,
    /// Forms submitted since the last drain, for the host application.
    submissions: Vec<NodeId>,
}

impl PageHost {
    pub fn new(page: Page, options: HostOptions) -> Self {
        Self {
            page,
            dispatcher: Dispatcher::new(),
            timers: TimerQueue::new(),
            editables: EditableBehavior::new(),
            retry: RetryBehavior::new(options.retry),
            panes: PaneBehavior::new(),
            flash: FlashBehavior::new(options.dismiss_after),
            fields: FieldBehavior::new(),
            help: HelpBehavior::new(),
            retry_forms: sel("form.can-retry"),
            rects: HashMap::new(),
            submissions: Vec::new(),
        }
    }

    /// Run every setup pass in a fixed order. Safe to call again to wire
    /// nodes added since the last pass.
    pub fn init(&mut self, ctx: &mut PageContext, now: Instant) {
        self.help.setup(&mut self.page, &mut self.dispatcher);
        self.panes
            .setup(&mut self.page, &mut self.dispatcher, ctx.anchor.as_deref());
        self.editables.setup(&mut self.page, &mut self.dispatcher);
        self.flash
            .setup(&mut self.page, &mut self.dispatcher, &mut self.timers, now);
        self.fields.setup(&mut self.page);
        assign_tab_order(&mut self.page, ctx);
    }

    /// Deliver a click: walk from the target up to the root, firing every
    /// matching binding at each node. A `Stop` verdict ends the walk after
    /// the current node's bindings finish.
    pub fn click(&mut self, target: NodeId, now: Instant) {
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            let routes = self.dispatcher.routes_at(&self.page, node);
            let mut stop = false;
            for route in routes {
                if self.run_route(route, node, target, now) == Verdict::Stop {
                    stop = true;
                }
            }
            if stop {
                break;
            }
            cursor = self.page.parent(node);
        }
    }

    fn run_route(&mut self, route: Route, node: NodeId, target: NodeId, now: Instant) -> Verdict {
        match route {
            Route::EditActivate => {
                let width = self.rects.get(&node).map(|r| r.width);
                self.editables.activate(&self.page, node, width, now);
                // The edit affordance keeps propagating so an outer toggle
                // (an accordion title) still fires; any other click in the
                // viewer stays here.
                if self.is_edit_affordance(target) {
                    Verdict::Continue
                } else {
                    Verdict::Stop
                }
            }
            Route::EditViewerLink => {
                if self.is_edit_affordance(node) {
                    Verdict::Continue
                } else {
                    Verdict::Stop
                }
            }
            Route::EditCancel => {
                self.editables.cancel(&mut self.page, node);
                Verdict::Stop
            }
            Route::EditSave => {
                if let Some(form) = self.page.closest(node, &sel("form")) {
                    self.submit(form, now);
                }
                Verdict::Stop
            }
            Route::PaneToggle => {
                self.panes.toggle(&mut self.page, node, now);
                Verdict::Continue
            }
            Route::NoticeClose => {
                self.flash.close(&mut self.page, node);
                Verdict::Continue
            }
            Route::HelpToggle => {
                self.help.toggle(&self.page, node);
                Verdict::Stop
            }
        }
    }

    fn is_edit_affordance(&self, node: NodeId) -> bool {
        self.page
            .get(node)
            .map(|n| n.has_class("edit_btn"))
            .unwrap_or(false)
    }

    pub fn focus(&mut self, target: NodeId, _now: Instant) {
        self.fields.focus(&mut self.page, target);
    }

    pub fn blur(&mut self, target: NodeId, _now: Instant) {
        self.fields.blur(&mut self.page, target);
    }

    /// Submit a form. Retry-enabled forms start (or restart) the retry
    /// cycle; every submission is queued for the host application.
    pub fn submit(&mut self, form: NodeId, now: Instant) {
        self.submissions.push(form);
        if self.page.matches(form, &self.retry_forms) {
            self.retry
                .on_submit(&mut self.page, &mut self.flash, &mut self.timers, now, form);
        }
    }

    /// The submission completed: stop the retry escalation for this form.
    pub fn resolve_submission(&mut self, form: NodeId, _now: Instant) {
        self.retry
            .resolve(&mut self.page, &mut self.flash, &mut self.timers, form);
    }

    /// Fire due timers and advance animations. Called once per loop pass.
    pub fn tick(&mut self, now: Instant) {
        for event in self.timers.fire_due(now) {
            match event {
                TimerEvent::RetryWarn(form) => {
                    self.retry
                        .on_warn(&mut self.page, &mut self.flash, &mut self.timers, now, form);
                }
                TimerEvent::RetryFire(form) => {
                    let resubmit = self.retry.on_retry_deadline(
                        &mut self.page,
                        &mut self.flash,
                        &mut self.timers,
                        now,
                        form,
                    );
                    if resubmit {
                        self.submit(form, now);
                    }
                }
                TimerEvent::NoticeDismiss(notice) => {
                    self.flash.begin_fade(notice, now);
                }
            }
        }
        self.panes.tick(&mut self.page, now);
        self.flash.tick(&mut self.page, now);
    }

    pub fn post_flash(
        &mut self,
        text: &str,
        severity: Severity,
        timeout: Option<Duration>,
        now: Instant,
    ) -> NodeId {
        self.flash
            .flash(&mut self.page, &mut self.timers, now, text, severity, timeout)
    }

    /// Forms submitted since the last call, oldest first.
    pub fn take_submissions(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.submissions)
    }

    /// Error-severity notice texts shown since the last call.
    pub fn take_error_notices(&mut self) -> Vec<String> {
        self.flash.take_errors_raised()
    }

    // ----- rendering support -----

    pub fn clear_rects(&mut self) {
        self.rects.clear();
    }

    pub fn record_rect(&mut self, node: NodeId, rect: Rect) {
        self.rects.insert(node, rect);
    }

    pub fn rect_of(&self, node: NodeId) -> Option<Rect> {
        self.rects.get(&node).copied()
    }

    /// Deepest recorded node under the given position: smallest containing
    /// rectangle wins.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<NodeId> {
        self.rects
            .iter()
            .filter(|(_, r)| {
                column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
            })
            .min_by_key(|(_, r)| (r.width as u32) * (r.height as u32))
            .map(|(id, _)| *id)
    }

    /// Static classes plus state-derived markers. The only place typed state
    /// turns back into class names.
    pub fn render_classes(&self, id: NodeId) -> Vec<String> {
        let Some(node) = self.page.get(id) else { return Vec::new() };
        let mut classes = node.classes.clone();
        let push = |classes: &mut Vec<String>, c: &str| {
            if !classes.iter().any(|existing| existing == c) {
                classes.push(c.to_string());
            }
        };
        match self.editables.mode_of(id) {
            Some(EditMode::Editing) => push(&mut classes, "editing"),
            Some(EditMode::Viewing) => push(&mut classes, "viewing"),
            None => {}
        }
        match self.panes.is_closed(id) {
            Some(true) => push(&mut classes, "closed"),
            Some(false) => {
                classes.retain(|c| c != "closed");
            }
            None => {}
        }
        if let Some(severity) = self.flash.severity_of(id) {
            classes.retain(|c| Severity::from_class(c).is_none());
            push(&mut classes, severity.as_str());
        }
        if self.fields.is_placeholder_active(id) {
            push(&mut classes, "defaultTextActive");
        }
        if self.fields.is_prompted(id) {
            push(&mut classes, "prompted");
        }
        if node.hidden {
            push(&mut classes, "hidden");
        }
        classes
    }

    /// Is the node shown, taking its own hidden flag, hidden ancestors, and
    /// the viewer/editor mode of enclosing editables into account?
    pub fn node_visible(&self, id: NodeId) -> bool {
        for node in self.page.ancestors(id) {
            let Some(data) = self.page.get(node) else { return false };
            if data.hidden {
                return false;
            }
            let mode = self
                .page
                .closest(node, &sel(".editable"))
                .and_then(|c| self.editables.mode_of(c));
            match (data.kind, mode) {
                (NodeKind::Viewer, Some(EditMode::Editing)) => return false,
                (NodeKind::Editor, Some(EditMode::Viewing)) => return false,
                _ => {}
            }
        }
        true
    }

    /// Visible focusable controls in tab order.
    pub fn focus_order(&self) -> Vec<NodeId> {
        let mut order: Vec<(u16, NodeId)> = self
            .page
            .all()
            .into_iter()
            .filter(|id| self.node_visible(*id))
            .filter_map(|id| self.page.get(id).and_then(|n| n.tab_index).map(|t| (t, id)))
            .collect();
        order.sort_by_key(|(t, _)| *t);
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// Snapshot of the initialized page for `--inspect`.
    pub fn inspect(&self) -> InspectNode {
        self.inspect_node(self.page.root())
    }

    fn inspect_node(&self, id: NodeId) -> InspectNode {
        let Some(node) = self.page.get(id) else {
            return InspectNode::default();
        };
        InspectNode {
            kind: node.kind.name(),
            id: node.id.clone(),
            classes: self.render_classes(id),
            text: node.text.clone(),
            value: node.value.clone(),
            tab_index: node.tab_index,
            visible: self.node_visible(id),
            children: self
                .page
                .children(id)
                .iter()
                .map(|c| self.inspect_node(*c))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::panes::SLIDE_DURATION;
    use crate::behaviors::retry::{RetryPhase, SAVING_TEXT, WARN_TEXT};
    use crate::page::Node;

    struct Fixture {
        host: PageHost,
        t0: Instant,
        form: NodeId,
        pane: NodeId,
        viewer: NodeId,
        inner_link: NodeId,
        editable: NodeId,
    }

    /// A retry-enabled form holding an accordion pane whose title contains
    /// an editable widget, the original's most layered arrangement.
    fn fixture() -> Fixture {
        let mut page = Page::new();
        let root = page.root();
        let form = page.append(root, Node::new(NodeKind::Form).class("can-retry"));
        let pane = page.append(
            form,
            Node::new(NodeKind::Section).class("title-pane").id("summary-pane"),
        );
        let title = page.append(pane, Node::new(NodeKind::Label).class("title"));
        let editable = page.append(title, Node::new(NodeKind::Section).class("editable"));
        let viewer = page.append(
            editable,
            Node::new(NodeKind::Viewer).class("viewer").text("My project"),
        );
        let inner_link = page.append(viewer, Node::new(NodeKind::Link).text("browse"));
        let editor = page.append(editable, Node::new(NodeKind::Editor).class("editor"));
        page.append(editor, Node::new(NodeKind::Field).value("My project"));
        page.append(pane, Node::new(NodeKind::Section).class("content"));

        let mut host = PageHost::new(page, HostOptions::default());
        let t0 = Instant::now();
        let mut ctx = PageContext::new(None);
        host.init(&mut ctx, t0);
        Fixture {
            host,
            t0,
            form,
            pane,
            viewer,
            inner_link,
            editable,
        }
    }

    fn edit_btn(fx: &Fixture) -> NodeId {
        fx.host.page.select_within(fx.viewer, &sel(".edit_btn"))[0]
    }

    fn cancel_btn(fx: &Fixture) -> NodeId {
        fx.host.page.select_within(fx.editable, &sel(".cancel_btn"))[0]
    }

    #[test]
    fn test_mode_markers_are_mutually_exclusive() {
        let mut fx = fixture();
        let classes = fx.host.render_classes(fx.editable);
        assert!(classes.contains(&"viewing".to_string()));
        assert!(!classes.contains(&"editing".to_string()));

        fx.host.click(fx.viewer, fx.t0);
        let classes = fx.host.render_classes(fx.editable);
        assert!(classes.contains(&"editing".to_string()));
        assert!(!classes.contains(&"viewing".to_string()));

        fx.host.click(cancel_btn(&fx), fx.t0);
        let classes = fx.host.render_classes(fx.editable);
        assert!(classes.contains(&"viewing".to_string()));
        assert!(!classes.contains(&"editing".to_string()));
    }

    #[test]
    fn test_viewer_click_does_not_reach_pane_title() {
        let mut fx = fixture();
        fx.host.click(fx.viewer, fx.t0);
        assert_eq!(fx.host.editables.mode_of(fx.editable), Some(EditMode::Editing));
        fx.host.tick(fx.t0 + SLIDE_DURATION);
        assert_eq!(fx.host.panes.is_closed(fx.pane), Some(false));
    }

    #[test]
    fn test_edit_affordance_click_still_toggles_pane() {
        let mut fx = fixture();
        let btn = edit_btn(&fx);
        fx.host.click(btn, fx.t0);
        assert_eq!(fx.host.editables.mode_of(fx.editable), Some(EditMode::Editing));
        // Propagation reached the accordion title.
        fx.host.tick(fx.t0 + SLIDE_DURATION);
        assert_eq!(fx.host.panes.is_closed(fx.pane), Some(true));
    }

    #[test]
    fn test_other_viewer_link_swallows_click() {
        let mut fx = fixture();
        fx.host.click(fx.inner_link, fx.t0);
        assert_eq!(fx.host.editables.mode_of(fx.editable), Some(EditMode::Viewing));
        fx.host.tick(fx.t0 + SLIDE_DURATION);
        assert_eq!(fx.host.panes.is_closed(fx.pane), Some(false));
    }

    #[test]
    fn test_save_submits_enclosing_form() {
        let mut fx = fixture();
        fx.host.click(fx.viewer, fx.t0);
        let save = fx.host.page.select_within(fx.editable, &sel(".save_btn"))[0];
        fx.host.click(save, fx.t0);
        assert_eq!(fx.host.take_submissions(), vec![fx.form]);
        assert_eq!(fx.host.retry.phase(fx.form), RetryPhase::Waiting);
    }

    fn save_message_text(host: &PageHost) -> String {
        let notice = host.page.by_id("save-message").expect("save message");
        let body = host.page.select_within(notice, &sel("text"))[0];
        host.page.get(body).unwrap().text.clone()
    }

    #[test]
    fn test_retry_timeline_through_tick() {
        let mut fx = fixture();
        fx.host.submit(fx.form, fx.t0);
        fx.host.take_submissions();
        assert_eq!(save_message_text(&fx.host), SAVING_TEXT);

        fx.host.tick(fx.t0 + Duration::from_millis(7_000));
        assert_eq!(fx.host.retry.phase(fx.form), RetryPhase::Warning);
        assert_eq!(save_message_text(&fx.host), WARN_TEXT);
        let notice = fx.host.page.by_id("save-message").unwrap();
        assert!(fx.host.render_classes(notice).contains(&"error".to_string()));

        // The blind resubmit restarts the cycle and surfaces the submission.
        fx.host.tick(fx.t0 + Duration::from_millis(30_000));
        assert_eq!(fx.host.take_submissions(), vec![fx.form]);
        assert_eq!(fx.host.retry.phase(fx.form), RetryPhase::Waiting);
    }

    #[test]
    fn test_resolve_stops_escalation() {
        let mut fx = fixture();
        fx.host.submit(fx.form, fx.t0);
        fx.host.resolve_submission(fx.form, fx.t0 + Duration::from_millis(1_000));
        fx.host.tick(fx.t0 + Duration::from_millis(60_000));
        assert_eq!(fx.host.retry.phase(fx.form), RetryPhase::Idle);
        let notice = fx.host.page.by_id("save-message").unwrap();
        assert!(fx.host.page.get(notice).unwrap().hidden);
    }

    #[test]
    fn test_late_notice_close_box_works_without_rebinding() {
        let mut fx = fixture();
        let notice = fx
            .host
            .post_flash("import finished", Severity::Ok, None, fx.t0);
        let close = fx.host.page.select_within(notice, &sel(".close-box"))[0];
        fx.host.click(close, fx.t0);
        assert!(fx.host.page.get(notice).unwrap().hidden);
    }

    #[test]
    fn test_editor_hidden_while_viewing_and_inverse() {
        let mut fx = fixture();
        let editor = fx.host.page.select_within(fx.editable, &sel("editor"))[0];
        let field = fx.host.page.select_within(editor, &sel("field"))[0];
        assert!(fx.host.node_visible(fx.viewer));
        assert!(!fx.host.node_visible(field));

        fx.host.click(fx.viewer, fx.t0);
        assert!(!fx.host.node_visible(fx.viewer));
        assert!(fx.host.node_visible(field));
    }

    #[test]
    fn test_focus_order_skips_invisible_controls() {
        let mut fx = fixture();
        // Only the search-less fixture's save button and field exist inside
        // the editor, both hidden while viewing.
        assert!(fx.host.focus_order().is_empty());
        fx.host.click(fx.viewer, fx.t0);
        assert_eq!(fx.host.focus_order().len(), 2);
    }

    #[test]
    fn test_hit_test_prefers_smallest_rect() {
        let mut fx = fixture();
        fx.host.record_rect(fx.viewer, Rect::new(0, 0, 40, 1));
        let btn = edit_btn(&fx);
        fx.host.record_rect(btn, Rect::new(35, 0, 5, 1));
        assert_eq!(fx.host.hit_test(10, 0), Some(fx.viewer));
        assert_eq!(fx.host.hit_test(36, 0), Some(btn));
        assert_eq!(fx.host.hit_test(10, 5), None);
    }

    #[test]
    fn test_inspect_reports_derived_classes() {
        let fx = fixture();
        let json = serde_json::to_value(fx.host.inspect()).unwrap();
        let text = json.to_string();
        assert!(text.contains("\"viewing\""));
        assert!(text.contains("can-retry"));
    }
}

#[derive(Debug, Default, Serialize)]
pub struct InspectNode {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_index: Option<u16>,
    pub visible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<InspectNode>,
}

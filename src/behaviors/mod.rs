//! Behavior controllers: one per interactive page behavior.
//!
//! Each controller owns its runtime state (modes, snapshots, animation
//! progress) keyed by node id; the page tree itself carries only authored
//! structure. Controllers register their delegated bindings during setup and
//! are driven by the host through clicks, focus changes, submits and ticks.

pub mod editable;
pub mod fields;
pub mod flash;
pub mod help;
pub mod panes;
pub mod retry;

use crate::page::{NodeId, Page};

/// Payloads carried by the host's timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// First retry stage: warn that the server is slow.
    RetryWarn(NodeId),
    /// Second retry stage: resubmit the form.
    RetryFire(NodeId),
    /// Auto-dismiss deadline for a notice.
    NoticeDismiss(NodeId),
}

/// Per-page-load initialization context, passed to every setup routine and
/// discarded on teardown. Replaces page-global mutable state: the fragment
/// anchor and the tab-index counter live here and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Fragment identifier naming a pane to force open at load.
    pub anchor: Option<String>,
    /// Next tab-order slot to hand out.
    pub next_tab_index: u16,
}

impl PageContext {
    pub fn new(anchor: Option<String>) -> Self {
        Self {
            anchor,
            next_tab_index: 0,
        }
    }
}

/// Assign a strictly increasing tab index to every focusable control in
/// document order, starting wherever the context counter stands. Controls
/// already carrying an index keep it, so re-running is idempotent.
pub fn assign_tab_order(page: &mut Page, ctx: &mut PageContext) {
    for id in page.all() {
        let Some(node) = page.get_mut(id) else { continue };
        if node.kind.focusable() && node.tab_index.is_none() {
            node.tab_index = Some(ctx.next_tab_index);
            ctx.next_tab_index += 1;
        }
    }
}

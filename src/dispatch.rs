//! Delegated event dispatch.
//!
//! All bindings are registered once, during page init, against the page root:
//! a list of (selector, route) pairs. When a click arrives, the host walks
//! the path from the target up to the root; at each node it fires every
//! binding whose selector matches that node, in registration order. A
//! handler's verdict of `Stop` ends the upward walk after the current node's
//! bindings have run. Because matching happens at dispatch time, nodes added
//! after init (new notices, injected controls) are covered with no rebinding.

use crate::page::{NodeId, Page, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Click { target: NodeId },
    FocusIn { target: NodeId },
    FocusOut { target: NodeId },
    Submit { form: NodeId },
}

/// Propagation verdict returned by each handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop,
}

/// Handler routes. Routing by enum rather than boxed closures keeps dispatch
/// borrow-friendly: the host matches a route and calls into the owning
/// behavior with full access to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Click inside a viewer activates its editable container.
    EditActivate,
    /// Link inside a viewer that is not the edit affordance swallows the
    /// click so the container stays in viewing mode.
    EditViewerLink,
    /// Cancel affordance: roll values back, return to viewing.
    EditCancel,
    /// Save control: submit the enclosing form.
    EditSave,
    /// Pane title toggles the collapsible content.
    PaneToggle,
    /// Close box hides the enclosing notice.
    NoticeClose,
    /// Help icon toggles the tooltip for its label.
    HelpToggle,
}

struct Binding {
    selector: Selector,
    route: Route,
}

pub struct Dispatcher {
    bindings: Vec<Binding>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    pub fn bind(&mut self, selector: Selector, route: Route) {
        self.bindings.push(Binding { selector, route });
    }

    /// Routes bound to selectors matching `node`, in registration order.
    pub fn routes_at(&self, page: &Page, node: NodeId) -> Vec<Route> {
        self.bindings
            .iter()
            .filter(|b| page.matches(node, &b.selector))
            .map(|b| b.route)
            .collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

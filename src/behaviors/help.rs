//! Help tooltips for labels carrying descriptive title text.

use std::collections::HashMap;

use crate::dispatch::{Dispatcher, Route};
use crate::page::selector::sel;
use crate::page::{Node, NodeId, NodeKind, Page};

pub struct HelpBehavior {
    /// Icon node to the label it explains.
    icons: HashMap<NodeId, NodeId>,
    /// Currently shown tooltip: the label anchor and its text.
    pub active: Option<(NodeId, String)>,
    bound: bool,
}

impl HelpBehavior {
    pub fn new() -> Self {
        Self {
            icons: HashMap::new(),
            active: None,
            bound: false,
        }
    }

    /// Append a help icon to every titled label that lacks one.
    pub fn setup(&mut self, page: &mut Page, dispatcher: &mut Dispatcher) {
        if !self.bound {
            dispatcher.bind(sel("label .help_icon"), Route::HelpToggle);
            self.bound = true;
        }
        for label in page.select(&sel("label")) {
            let Some(node) = page.get(label) else { continue };
            let has_title = node.attrs.get("title").map(|t| !t.is_empty()).unwrap_or(false);
            if !has_title || !page.select_within(label, &sel(".help_icon")).is_empty() {
                continue;
            }
            let icon = page.append(label, Node::new(NodeKind::Link).class("help_icon").text("?"));
            self.icons.insert(icon, label);
        }
    }

    /// Icon click: show the label's title as a tooltip, or hide it when it
    /// is already showing for this label.
    pub fn toggle(&mut self, page: &Page, icon: NodeId) {
        let Some(label) = self.icons.get(&icon).copied() else { return };
        if self.active.as_ref().map(|(l, _)| *l) == Some(label) {
            self.active = None;
            return;
        }
        let text = page
            .get(label)
            .and_then(|n| n.attrs.get("title").cloned())
            .unwrap_or_default();
        self.active = Some((label, text));
    }

    /// Any keystroke dismisses the tooltip.
    pub fn dismiss(&mut self) {
        self.active = None;
    }
}

impl Default for HelpBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icons_only_for_titled_labels() {
        let mut page = Page::new();
        let root = page.root();
        let titled = page.append(
            root,
            Node::new(NodeKind::Label).text("Name").attr("title", "Shown on the project page"),
        );
        let plain = page.append(root, Node::new(NodeKind::Label).text("Internal"));

        let mut help = HelpBehavior::new();
        let mut dispatcher = Dispatcher::new();
        help.setup(&mut page, &mut dispatcher);

        assert_eq!(page.select_within(titled, &sel(".help_icon")).len(), 1);
        assert!(page.select_within(plain, &sel(".help_icon")).is_empty());

        // Re-running setup does not duplicate icons
        help.setup(&mut page, &mut dispatcher);
        assert_eq!(page.select_within(titled, &sel(".help_icon")).len(), 1);
    }

    #[test]
    fn test_toggle_shows_and_hides() {
        let mut page = Page::new();
        let root = page.root();
        let label = page.append(
            root,
            Node::new(NodeKind::Label).text("Name").attr("title", "help me"),
        );
        let mut help = HelpBehavior::new();
        let mut dispatcher = Dispatcher::new();
        help.setup(&mut page, &mut dispatcher);
        let icon = page.select_within(label, &sel(".help_icon"))[0];

        help.toggle(&page, icon);
        assert_eq!(help.active, Some((label, "help me".to_string())));
        help.toggle(&page, icon);
        assert_eq!(help.active, None);

        help.toggle(&page, icon);
        help.dismiss();
        assert_eq!(help.active, None);
    }
}

//! Text-field niceties: default (placeholder) text, select-on-focus, and
//! prompt text for empty display nodes.

use std::collections::HashSet;

use crate::page::selector::sel;
use crate::page::{NodeId, Page};

pub struct FieldBehavior {
    /// Fields currently displaying their placeholder.
    default_active: HashSet<NodeId>,
    /// Fields whose contents are selected after a focus.
    selected: HashSet<NodeId>,
    /// Display nodes filled with prompt text, styled dim.
    prompted: HashSet<NodeId>,
}

impl FieldBehavior {
    pub fn new() -> Self {
        Self {
            default_active: HashSet::new(),
            selected: HashSet::new(),
            prompted: HashSet::new(),
        }
    }

    /// Apply the initial blur rule to `.defaultText` fields and fill prompt
    /// text into whitespace-only `[data-prompt]` nodes.
    pub fn setup(&mut self, page: &mut Page) {
        for field in page.select(&sel("field.defaultText")) {
            self.blur(page, field);
        }
        for id in page.all() {
            let Some(node) = page.get(id) else { continue };
            let Some(prompt) = node.attrs.get("data-prompt") else { continue };
            if node.text.trim().is_empty() {
                let prompt = prompt.clone();
                if let Some(node) = page.get_mut(id) {
                    node.text = prompt;
                }
                self.prompted.insert(id);
            }
        }
    }

    pub fn focus(&mut self, page: &mut Page, field: NodeId) {
        let Some(node) = page.get(field) else { return };
        if node.has_class("defaultText") && self.default_active.contains(&field) {
            // Only clear when the field still shows the placeholder; a real
            // value that happens to be set is left alone.
            let placeholder = node.attrs.get("title").cloned().unwrap_or_default();
            if node.value == placeholder {
                self.default_active.remove(&field);
                if let Some(node) = page.get_mut(field) {
                    node.value.clear();
                }
            }
        }
        if page.get(field).map(|n| n.has_class("selectText")).unwrap_or(false) {
            self.selected.insert(field);
        }
    }

    pub fn blur(&mut self, page: &mut Page, field: NodeId) {
        self.selected.remove(&field);
        let Some(node) = page.get(field) else { return };
        if node.has_class("defaultText") && node.value.is_empty() {
            let placeholder = node.attrs.get("title").cloned().unwrap_or_default();
            if let Some(node) = page.get_mut(field) {
                node.value = placeholder;
            }
            self.default_active.insert(field);
        }
    }

    /// True while the field shows its placeholder, rendered inactive.
    pub fn is_placeholder_active(&self, field: NodeId) -> bool {
        self.default_active.contains(&field)
    }

    pub fn is_selected(&self, field: NodeId) -> bool {
        self.selected.contains(&field)
    }

    pub fn is_prompted(&self, node: NodeId) -> bool {
        self.prompted.contains(&node)
    }

    /// Typing into a field with selected contents replaces them: the caller
    /// clears the value when this returns true.
    pub fn take_selection(&mut self, field: NodeId) -> bool {
        self.selected.remove(&field)
    }
}

impl Default for FieldBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Node, NodeKind};

    fn search_field(page: &mut Page) -> NodeId {
        let root = page.root();
        page.append(
            root,
            Node::new(NodeKind::Field)
                .class("defaultText")
                .attr("title", "Search"),
        )
    }

    #[test]
    fn test_default_text_shown_when_empty() {
        let mut page = Page::new();
        let field = search_field(&mut page);
        let mut fields = FieldBehavior::new();
        fields.setup(&mut page);
        assert_eq!(page.get(field).unwrap().value, "Search");
        assert!(fields.is_placeholder_active(field));
    }

    #[test]
    fn test_focus_clears_placeholder_blur_restores() {
        let mut page = Page::new();
        let field = search_field(&mut page);
        let mut fields = FieldBehavior::new();
        fields.setup(&mut page);

        fields.focus(&mut page, field);
        assert_eq!(page.get(field).unwrap().value, "");
        assert!(!fields.is_placeholder_active(field));

        fields.blur(&mut page, field);
        assert_eq!(page.get(field).unwrap().value, "Search");
        assert!(fields.is_placeholder_active(field));
    }

    #[test]
    fn test_typed_value_survives_blur() {
        let mut page = Page::new();
        let field = search_field(&mut page);
        let mut fields = FieldBehavior::new();
        fields.setup(&mut page);

        fields.focus(&mut page, field);
        page.get_mut(field).unwrap().value = "widgets".to_string();
        fields.blur(&mut page, field);
        assert_eq!(page.get(field).unwrap().value, "widgets");
        assert!(!fields.is_placeholder_active(field));
    }

    #[test]
    fn test_preset_value_left_alone() {
        let mut page = Page::new();
        let root = page.root();
        let field = page.append(
            root,
            Node::new(NodeKind::Field)
                .class("defaultText")
                .attr("title", "Search")
                .value("existing"),
        );
        let mut fields = FieldBehavior::new();
        fields.setup(&mut page);
        assert_eq!(page.get(field).unwrap().value, "existing");
        assert!(!fields.is_placeholder_active(field));
    }

    #[test]
    fn test_select_text_selects_on_focus() {
        let mut page = Page::new();
        let root = page.root();
        let field = page.append(
            root,
            Node::new(NodeKind::Field).class("selectText").value("token"),
        );
        let mut fields = FieldBehavior::new();
        fields.setup(&mut page);

        fields.focus(&mut page, field);
        assert!(fields.is_selected(field));
        // First keystroke consumes the selection
        assert!(fields.take_selection(field));
        assert!(!fields.is_selected(field));
    }

    #[test]
    fn test_prompt_fills_whitespace_only_nodes() {
        let mut page = Page::new();
        let root = page.root();
        let empty = page.append(
            root,
            Node::new(NodeKind::Text).attr("data-prompt", "no status set").text("   "),
        );
        let full = page.append(
            root,
            Node::new(NodeKind::Text).attr("data-prompt", "unused").text("running"),
        );
        let mut fields = FieldBehavior::new();
        fields.setup(&mut page);

        assert_eq!(page.get(empty).unwrap().text, "no status set");
        assert!(fields.is_prompted(empty));
        assert_eq!(page.get(full).unwrap().text, "running");
        assert!(!fields.is_prompted(full));
    }
}

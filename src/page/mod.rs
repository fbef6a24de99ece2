//! Retained page tree: the document the behaviors operate on.
//!
//! A `Page` is an arena of `Node`s addressed by `NodeId`. Nodes carry only
//! author-assigned structure (kind, id, static classes, attributes, text);
//! runtime state such as editing mode or pane collapse lives in the behavior
//! controllers and is folded back into class names at render time.

pub mod selector;

use std::collections::HashMap;

use thiserror::Error;

pub use selector::Selector;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Section,
    Form,
    Viewer,
    Editor,
    Field,
    Button,
    Link,
    Label,
    Text,
    NoticeArea,
    Notice,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Section => "section",
            NodeKind::Form => "form",
            NodeKind::Viewer => "viewer",
            NodeKind::Editor => "editor",
            NodeKind::Field => "field",
            NodeKind::Button => "button",
            NodeKind::Link => "link",
            NodeKind::Label => "label",
            NodeKind::Text => "text",
            NodeKind::NoticeArea => "notices",
            NodeKind::Notice => "notice",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "section" => NodeKind::Section,
            "form" => NodeKind::Form,
            "viewer" => NodeKind::Viewer,
            "editor" => NodeKind::Editor,
            "field" => NodeKind::Field,
            "button" => NodeKind::Button,
            "link" => NodeKind::Link,
            "label" => NodeKind::Label,
            "text" => NodeKind::Text,
            "notices" => NodeKind::NoticeArea,
            "notice" => NodeKind::Notice,
            _ => return None,
        })
    }

    /// Focusable controls participate in the page tab order.
    pub fn focusable(&self) -> bool {
        matches!(self, NodeKind::Field | NodeKind::Button)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: HashMap<String, String>,
    /// Text content for labels, text runs and notices.
    pub text: String,
    /// Current value for fields.
    pub value: String,
    /// Visibility flag (the `hidden` marker), toggled by behaviors.
    pub hidden: bool,
    /// Tab-order slot for focusable controls, assigned at init.
    pub tab_index: Option<u16>,

    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: None,
            classes: Vec::new(),
            attrs: HashMap::new(),
            text: String::new(),
            value: String::new(),
            hidden: false,
            tab_index: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

pub struct Page {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Page {
    pub fn new() -> Self {
        let mut root = Node::new(NodeKind::Section);
        root.id = Some("root".to_string());
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Checked accessor for the public API boundary.
    pub fn node(&self, id: NodeId) -> Result<&Node, PageError> {
        self.get(id).ok_or(PageError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn append(&mut self, parent: NodeId, node: Node) -> NodeId {
        self.insert(parent, node, InsertPos::Last)
    }

    pub fn prepend(&mut self, parent: NodeId, node: Node) -> NodeId {
        self.insert(parent, node, InsertPos::First)
    }

    fn insert(&mut self, parent: NodeId, mut node: Node, pos: InsertPos) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        let siblings = &mut self.nodes[parent.0].children;
        match pos {
            InsertPos::First => siblings.insert(0, id),
            InsertPos::Last => siblings.push(id),
        }
        id
    }

    /// Detach a node from its parent and re-attach it as the first child of
    /// `new_parent`. Used when seeded notices move from the staging container
    /// into the notification area.
    pub fn reparent_prepend(&mut self, id: NodeId, new_parent: NodeId) {
        if let Some(old_parent) = self.nodes[id.0].parent {
            self.nodes[old_parent.0].children.retain(|c| *c != id);
        }
        self.nodes[id.0].parent = Some(new_parent);
        self.nodes[new_parent.0].children.insert(0, id);
    }

    /// Walk from `id` up to the root, inclusive.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = Some(id);
        std::iter::from_fn(move || {
            let here = cur?;
            cur = self.parent(here);
            Some(here)
        })
    }

    /// All nodes under `id` (exclusive) in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// All nodes in document order, root first.
    pub fn all(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(self.descendants(self.root));
        out
    }

    /// Does the node at `id` match `selector`, taking ancestors into account
    /// for descendant combinators?
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// All matching nodes in document order.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.all()
            .into_iter()
            .filter(|id| self.matches(*id, selector))
            .collect()
    }

    /// Matching descendants of `scope`, in document order.
    pub fn select_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.matches(*id, selector))
            .collect()
    }

    /// Nearest ancestor-or-self matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        self.ancestors(id).find(|n| self.matches(*n, selector))
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.all()
            .into_iter()
            .find(|n| self.get(*n).map(|n| n.id.as_deref() == Some(id)).unwrap_or(false))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

enum InsertPos {
    First,
    Last,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Page, NodeId, NodeId, NodeId) {
        let mut page = Page::new();
        let pane = page.append(
            page.root(),
            Node::new(NodeKind::Section).class("title-pane").id("details"),
        );
        let title = page.append(pane, Node::new(NodeKind::Label).class("title").text("Details"));
        let content = page.append(pane, Node::new(NodeKind::Section).class("content"));
        (page, pane, title, content)
    }

    #[test]
    fn test_document_order() {
        let (page, pane, title, content) = sample();
        assert_eq!(page.all(), vec![page.root(), pane, title, content]);
        assert_eq!(page.descendants(pane), vec![title, content]);
    }

    #[test]
    fn test_closest_walks_ancestors() {
        let (page, pane, title, _) = sample();
        let sel: Selector = ".title-pane".parse().unwrap();
        assert_eq!(page.closest(title, &sel), Some(pane));
        assert_eq!(page.closest(page.root(), &sel), None);
    }

    #[test]
    fn test_reparent_prepend_moves_to_front() {
        let (mut page, pane, title, content) = sample();
        let area = page.append(page.root(), Node::new(NodeKind::NoticeArea).id("notifications"));
        page.reparent_prepend(title, area);
        assert_eq!(page.children(pane), &[content]);
        assert_eq!(page.children(area), &[title]);
        assert_eq!(page.parent(title), Some(area));
    }

    #[test]
    fn test_by_id() {
        let (page, pane, ..) = sample();
        assert_eq!(page.by_id("details"), Some(pane));
        assert_eq!(page.by_id("missing"), None);
    }
}

//! Inline click-to-edit widgets.
//!
//! An editable container holds one viewer and one editor; the mode is an
//! explicit enum on the controller state, and the `editing`/`viewing` markers
//! are derived from it at render time. Setup injects the edit affordance and
//! the Save/Cancel controls, and snapshots every field's value once so
//! cancellation can roll edits back.

use std::collections::HashMap;
use std::time::Instant;

use crate::dispatch::{Dispatcher, Route};
use crate::page::selector::sel;
use crate::page::{Node, NodeId, NodeKind, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Viewing,
    Editing,
}

#[derive(Debug)]
pub struct EditableState {
    pub viewer: NodeId,
    pub editor: NodeId,
    pub mode: EditMode,
    /// Field values captured at setup, restored on cancel.
    snapshots: Vec<(NodeId, String)>,
    /// Width forced onto an `overlap` editor at activation, taken from the
    /// viewer's last rendered rectangle.
    pub editor_width: Option<u16>,
}

pub struct EditableBehavior {
    states: HashMap<NodeId, EditableState>,
    bound: bool,
}

impl EditableBehavior {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            bound: false,
        }
    }

    /// First layout pass over every `.editable` container. Re-running wires
    /// containers and fields added since the last pass and leaves existing
    /// snapshots untouched.
    pub fn setup(&mut self, page: &mut Page, dispatcher: &mut Dispatcher) {
        if !self.bound {
            // Order matters at the link node: the swallow rule runs before
            // anything an ancestor might do with the click.
            dispatcher.bind(sel(".viewer link"), Route::EditViewerLink);
            dispatcher.bind(sel(".viewer button"), Route::EditViewerLink);
            dispatcher.bind(sel(".editable .viewer"), Route::EditActivate);
            dispatcher.bind(sel(".editor .cancel_btn"), Route::EditCancel);
            dispatcher.bind(sel(".editor .save_btn"), Route::EditSave);
            self.bound = true;
        }

        for container in page.select(&sel(".editable")) {
            let viewer = page.select_within(container, &sel("viewer")).first().copied();
            let editor = page.select_within(container, &sel("editor")).first().copied();
            // Malformed markup is tolerated as a no-op.
            let (Some(viewer), Some(editor)) = (viewer, editor) else { continue };

            if page.select_within(viewer, &sel(".edit_btn")).is_empty() {
                page.append(viewer, Node::new(NodeKind::Link).class("edit_btn").text("edit"));
            }

            let state = self.states.entry(container).or_insert_with(|| EditableState {
                viewer,
                editor,
                mode: EditMode::Viewing,
                snapshots: Vec::new(),
                editor_width: None,
            });

            for field in page.select_within(editor, &sel("field")) {
                if state.snapshots.iter().any(|(id, _)| *id == field) {
                    continue;
                }
                let value = page.get(field).map(|n| n.value.clone()).unwrap_or_default();
                state.snapshots.push((field, value));
            }

            if page.select_within(editor, &sel(".cancel_btn")).is_empty() {
                Self::inject_save_controls(page, editor);
            }
        }
    }

    /// Build the Save/Cancel pair. Multi-line editors get them in a dedicated
    /// holder row (reusing one the author supplied); single-line editors get
    /// a two-cell row with the first field in one cell and the controls in
    /// the other.
    fn inject_save_controls(page: &mut Page, editor: NodeId) {
        let controls_parent = if page
            .get(editor)
            .map(|n| n.has_class("multiline"))
            .unwrap_or(false)
        {
            page.select_within(editor, &sel(".save_holder"))
                .first()
                .copied()
                .unwrap_or_else(|| {
                    page.append(editor, Node::new(NodeKind::Section).class("save_holder"))
                })
        } else {
            let field = page.select_within(editor, &sel("field")).first().copied();
            let holder = page.append(editor, Node::new(NodeKind::Section).class("holder_table"));
            if let Some(field) = field {
                page.reparent_prepend(field, holder);
            }
            page.append(holder, Node::new(NodeKind::Section).class("save_controls"))
        };
        page.append(
            controls_parent,
            Node::new(NodeKind::Button).class("save_btn").text("Save"),
        );
        page.append(
            controls_parent,
            Node::new(NodeKind::Link).class("cancel_btn").text("Cancel"),
        );
    }

    /// Viewer click: switch to editing. `viewer_width` is the viewer's last
    /// rendered width, applied to `overlap` editors so they cover the same
    /// footprint.
    pub fn activate(
        &mut self,
        page: &Page,
        viewer: NodeId,
        viewer_width: Option<u16>,
        _now: Instant,
    ) {
        let Some(container) = page.closest(viewer, &sel(".editable")) else { return };
        let Some(state) = self.states.get_mut(&container) else { return };
        state.mode = EditMode::Editing;
        let overlap = page
            .get(state.editor)
            .map(|n| n.has_class("overlap"))
            .unwrap_or(false);
        if overlap {
            state.editor_width = viewer_width;
        }
    }

    /// Cancel click: roll every field back to its snapshot and return to
    /// viewing. Does not submit.
    pub fn cancel(&mut self, page: &mut Page, cancel_btn: NodeId) {
        let Some(container) = page.closest(cancel_btn, &sel(".editable")) else { return };
        let Some(state) = self.states.get_mut(&container) else { return };
        state.mode = EditMode::Viewing;
        for (field, value) in &state.snapshots {
            if let Some(node) = page.get_mut(*field) {
                node.value = value.clone();
            }
        }
    }

    pub fn mode_of(&self, container: NodeId) -> Option<EditMode> {
        self.states.get(&container).map(|s| s.mode)
    }

    pub fn state_of(&self, container: NodeId) -> Option<&EditableState> {
        self.states.get(&container)
    }

    /// The editing container enclosing `node`, if any.
    pub fn editing_container_of(&self, page: &Page, node: NodeId) -> Option<NodeId> {
        let container = page.closest(node, &sel(".editable"))?;
        match self.mode_of(container)? {
            EditMode::Editing => Some(container),
            EditMode::Viewing => None,
        }
    }

    /// The cancel affordance of a container, for keyboard-driven cancel.
    pub fn cancel_btn_of(&self, page: &Page, container: NodeId) -> Option<NodeId> {
        let state = self.states.get(&container)?;
        page.select_within(state.editor, &sel(".cancel_btn")).first().copied()
    }
}

impl Default for EditableBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_value(page: &Page, field: NodeId) -> &str {
        &page.get(field).unwrap().value
    }

    /// One single-line editable and one multiline overlap editable.
    fn scaffold() -> (Page, Dispatcher, EditableBehavior, NodeId, NodeId, NodeId, NodeId) {
        let mut page = Page::new();
        let root = page.root();

        let single = page.append(root, Node::new(NodeKind::Section).class("editable"));
        page.append(single, Node::new(NodeKind::Viewer).class("viewer").text("My project"));
        let editor = page.append(single, Node::new(NodeKind::Editor).class("editor"));
        let title_field = page.append(editor, Node::new(NodeKind::Field).value("My project"));

        let multi = page.append(root, Node::new(NodeKind::Section).class("editable"));
        page.append(multi, Node::new(NodeKind::Viewer).class("viewer").text("notes"));
        let multi_editor = page.append(
            multi,
            Node::new(NodeKind::Editor).class("editor").class("multiline").class("overlap"),
        );
        let notes_field = page.append(
            multi_editor,
            Node::new(NodeKind::Field).class("multiline").value("line one"),
        );

        let mut behavior = EditableBehavior::new();
        let mut dispatcher = Dispatcher::new();
        behavior.setup(&mut page, &mut dispatcher);
        (page, dispatcher, behavior, single, multi, title_field, notes_field)
    }

    #[test]
    fn test_setup_injects_controls() {
        let (page, _, _, single, multi, ..) = scaffold();
        // Edit affordance in each viewer
        assert_eq!(page.select_within(single, &sel(".viewer .edit_btn")).len(), 1);
        assert_eq!(page.select_within(multi, &sel(".viewer .edit_btn")).len(), 1);
        // Single-line: field moved into the two-cell holder
        assert_eq!(page.select_within(single, &sel(".holder_table field")).len(), 1);
        assert_eq!(
            page.select_within(single, &sel(".save_controls .cancel_btn")).len(),
            1
        );
        // Multiline: controls in a holder row, no table
        assert_eq!(page.select_within(multi, &sel(".save_holder .save_btn")).len(), 1);
        assert!(page.select_within(multi, &sel(".holder_table")).is_empty());
    }

    #[test]
    fn test_setup_is_idempotent() {
        let (mut page, mut dispatcher, mut behavior, single, ..) = scaffold();
        behavior.setup(&mut page, &mut dispatcher);
        assert_eq!(page.select_within(single, &sel(".edit_btn")).len(), 1);
        assert_eq!(page.select_within(single, &sel(".cancel_btn")).len(), 1);
    }

    #[test]
    fn test_activate_and_cancel_flip_mode() {
        let (mut page, _, mut behavior, single, _, title_field, _) = scaffold();
        assert_eq!(behavior.mode_of(single), Some(EditMode::Viewing));

        let viewer = page.select_within(single, &sel("viewer"))[0];
        behavior.activate(&page, viewer, Some(40), Instant::now());
        assert_eq!(behavior.mode_of(single), Some(EditMode::Editing));
        // Not an overlap editor: no width capture
        assert_eq!(behavior.state_of(single).unwrap().editor_width, None);

        page.get_mut(title_field).unwrap().value = "Renamed".to_string();
        let cancel = page.select_within(single, &sel(".cancel_btn"))[0];
        behavior.cancel(&mut page, cancel);
        assert_eq!(behavior.mode_of(single), Some(EditMode::Viewing));
        assert_eq!(field_value(&page, title_field), "My project");
    }

    #[test]
    fn test_overlap_editor_captures_viewer_width() {
        let (page, _, mut behavior, _, multi, ..) = scaffold();
        let viewer = page.select_within(multi, &sel("viewer"))[0];
        behavior.activate(&page, viewer, Some(62), Instant::now());
        assert_eq!(behavior.state_of(multi).unwrap().editor_width, Some(62));
    }

    #[test]
    fn test_cancel_restores_snapshot_not_latest_edit() {
        let (mut page, _, mut behavior, _, multi, _, notes_field) = scaffold();
        let viewer = page.select_within(multi, &sel("viewer"))[0];
        behavior.activate(&page, viewer, None, Instant::now());
        page.get_mut(notes_field).unwrap().value = "draft A".to_string();
        page.get_mut(notes_field).unwrap().value = "draft B".to_string();
        let cancel = page.select_within(multi, &sel(".cancel_btn"))[0];
        behavior.cancel(&mut page, cancel);
        assert_eq!(field_value(&page, notes_field), "line one");
    }

    #[test]
    fn test_late_fields_need_a_new_pass() {
        let (mut page, mut dispatcher, mut behavior, single, ..) = scaffold();
        let editor = page.select_within(single, &sel("editor"))[0];
        let late = page.append(editor, Node::new(NodeKind::Field).value("later"));

        // Unwired until setup runs again
        page.get_mut(late).unwrap().value = "edited".to_string();
        let cancel = page.select_within(single, &sel(".cancel_btn"))[0];
        behavior.cancel(&mut page, cancel);
        assert_eq!(field_value(&page, late), "edited");

        behavior.setup(&mut page, &mut dispatcher);
        // Snapshot captured at the new pass, not at first append
        page.get_mut(late).unwrap().value = "edited again".to_string();
        behavior.cancel(&mut page, cancel);
        assert_eq!(field_value(&page, late), "edited");
    }

    #[test]
    fn test_author_supplied_save_holder_is_reused() {
        let mut page = Page::new();
        let container = page.append(page.root(), Node::new(NodeKind::Section).class("editable"));
        page.append(container, Node::new(NodeKind::Viewer).class("viewer"));
        let editor = page.append(
            container,
            Node::new(NodeKind::Editor).class("editor").class("multiline"),
        );
        page.append(editor, Node::new(NodeKind::Field));
        let holder = page.append(editor, Node::new(NodeKind::Section).class("save_holder"));

        let mut behavior = EditableBehavior::new();
        let mut dispatcher = Dispatcher::new();
        behavior.setup(&mut page, &mut dispatcher);

        assert_eq!(page.select_within(editor, &sel(".save_holder")).len(), 1);
        assert_eq!(page.select_within(holder, &sel(".save_btn")).len(), 1);
    }

    #[test]
    fn test_malformed_container_is_a_noop() {
        let mut page = Page::new();
        page.append(page.root(), Node::new(NodeKind::Section).class("editable"));
        let mut behavior = EditableBehavior::new();
        let mut dispatcher = Dispatcher::new();
        behavior.setup(&mut page, &mut dispatcher);
        // No viewer/editor: no state, no panic
        assert!(behavior.states.is_empty());
    }
}

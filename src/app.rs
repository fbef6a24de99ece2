//! Demo application: a "project settings" page exercising every behavior,
//! plus a simulated form-submission server so the retry cycle is observable.

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use tokio::sync::mpsc;

use crate::behaviors::PageContext;
use crate::config::AppConfig;
use crate::host::PageHost;
use crate::page::selector::sel;
use crate::page::{Node, NodeId, NodeKind, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

pub struct App {
    pub host: PageHost,
    pub config: AppConfig,
    pub popup: Popup,
    pub focused: Option<NodeId>,

    // Status message (shown in footer, auto-clears after timeout)
    pub status_message: Option<String>,
    status_message_time: Option<Instant>,

    // Simulated server: submissions come back over this channel after the
    // configured delay. No sender task exists when the delay is unset.
    server_tx: mpsc::UnboundedSender<NodeId>,
    server_rx: mpsc::UnboundedReceiver<NodeId>,
}

impl App {
    pub fn new(config: AppConfig, anchor: Option<String>) -> Result<Self> {
        let host = Self::build_host(&config, anchor);
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        Ok(Self {
            host,
            config,
            popup: Popup::None,
            focused: None,
            status_message: None,
            status_message_time: None,
            server_tx,
            server_rx,
        })
    }

    /// Build and initialize the demo page. Also used by `--inspect`.
    pub fn build_host(config: &AppConfig, anchor: Option<String>) -> PageHost {
        let mut host = PageHost::new(Self::demo_page(), config.host_options());
        let mut ctx = PageContext::new(anchor);
        host.init(&mut ctx, Instant::now());
        host
    }

    /// The sample "project settings" document.
    fn demo_page() -> Page {
        let mut page = Page::new();
        let root = page.root();

        // Pre-rendered notices waiting in the staging container.
        let staging = page.append(root, Node::new(NodeKind::Section).id("flash"));
        let welcome = page.append(staging, Node::new(NodeKind::Notice));
        page.append(welcome, Node::new(NodeKind::Text).text("Welcome back, maintainer"));
        let imported = page.append(staging, Node::new(NodeKind::Notice).class("ok"));
        page.append(imported, Node::new(NodeKind::Text).text("Repository import completed"));
        page.append(root, Node::new(NodeKind::NoticeArea).id("notifications"));

        let form = page.append(root, Node::new(NodeKind::Form).class("can-retry").id("settings-form"));

        // Editable one-line project title
        page.append(
            form,
            Node::new(NodeKind::Label)
                .text("Project name")
                .attr("title", "Shown at the top of every project page"),
        );
        let title = page.append(form, Node::new(NodeKind::Section).class("editable"));
        page.append(title, Node::new(NodeKind::Viewer).class("viewer").text("My project"));
        let title_editor = page.append(title, Node::new(NodeKind::Editor).class("editor"));
        page.append(title_editor, Node::new(NodeKind::Field).value("My project"));

        // Editable multiline description with an overlap editor
        page.append(
            form,
            Node::new(NodeKind::Label)
                .text("Description")
                .attr("title", "Plain text, a sentence or two"),
        );
        let desc = page.append(form, Node::new(NodeKind::Section).class("editable"));
        page.append(
            desc,
            Node::new(NodeKind::Viewer).class("viewer").text("A place to keep the widgets."),
        );
        let desc_editor = page.append(
            desc,
            Node::new(NodeKind::Editor).class("editor").class("multiline").class("overlap"),
        );
        page.append(
            desc_editor,
            Node::new(NodeKind::Field).class("multiline").value("A place to keep the widgets."),
        );

        // Status line fed by prompt text
        page.append(
            form,
            Node::new(NodeKind::Text).attr("data-prompt", "no status set").text("  "),
        );

        // Collapsible panes
        let details = page.append(
            form,
            Node::new(NodeKind::Section).class("title-pane").id("details"),
        );
        page.append(details, Node::new(NodeKind::Label).class("title").text("Details"));
        let details_content = page.append(details, Node::new(NodeKind::Section).class("content"));
        page.append(details_content, Node::new(NodeKind::Label).text("Search projects"));
        page.append(
            details_content,
            Node::new(NodeKind::Field).class("defaultText").attr("title", "Search"),
        );
        page.append(details_content, Node::new(NodeKind::Label).text("Deploy key"));
        page.append(
            details_content,
            Node::new(NodeKind::Field).class("selectText").value("ABC-123-KEY"),
        );

        let metadata = page.append(
            form,
            Node::new(NodeKind::Section).class("title-pane").class("closed").id("metadata"),
        );
        page.append(metadata, Node::new(NodeKind::Label).class("title").text("Metadata"));
        let metadata_content = page.append(metadata, Node::new(NodeKind::Section).class("content"));
        page.append(
            metadata_content,
            Node::new(NodeKind::Label)
                .text("Icon URL")
                .attr("title", "Square image, at least 48x48"),
        );
        page.append(metadata_content, Node::new(NodeKind::Field));

        let danger = page.append(
            form,
            Node::new(NodeKind::Section).class("title-pane").class("closed").id("danger"),
        );
        page.append(danger, Node::new(NodeKind::Label).class("title").text("Danger zone"));
        let danger_content = page.append(danger, Node::new(NodeKind::Section).class("content"));
        page.append(danger_content, Node::new(NodeKind::Link).text("delete this project"));

        // Default submit control for the whole form
        page.append(form, Node::new(NodeKind::Button).class("submit").text("Save settings"));

        page
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let now = Instant::now();

        // Any keystroke dismisses an open tooltip.
        self.host.help.dismiss();

        if self.popup == Popup::Help {
            match key.code {
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter => self.popup = Popup::None,
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('?') if self.focused_field().is_none() => self.popup = Popup::Help,
            KeyCode::Tab => self.move_focus(1, now),
            KeyCode::BackTab => self.move_focus(-1, now),
            KeyCode::Enter => self.activate_focused(now),
            KeyCode::Char(' ') if self.focused_field().is_none() => self.activate_focused(now),
            KeyCode::Esc => self.cancel_editing(now),
            KeyCode::Backspace => {
                if let Some(field) = self.focused_field() {
                    if self.host.fields.take_selection(field) {
                        if let Some(node) = self.host.page.get_mut(field) {
                            node.value.clear();
                        }
                    } else if let Some(node) = self.host.page.get_mut(field) {
                        node.value.pop();
                    }
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.focused_field() {
                    if self.host.fields.take_selection(field) {
                        if let Some(node) = self.host.page.get_mut(field) {
                            node.value.clear();
                        }
                    }
                    if let Some(node) = self.host.page.get_mut(field) {
                        node.value.push(c);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// True while keystrokes go into a field rather than the app.
    pub fn is_typing(&self) -> bool {
        self.focused_field().is_some()
    }

    fn focused_field(&self) -> Option<NodeId> {
        let focused = self.focused?;
        let node = self.host.page.get(focused)?;
        (node.kind == NodeKind::Field && self.host.node_visible(focused)).then_some(focused)
    }

    fn move_focus(&mut self, delta: i32, now: Instant) {
        let order = self.host.focus_order();
        if order.is_empty() {
            self.set_focus(None, now);
            return;
        }
        let next = match self.focused.and_then(|f| order.iter().position(|n| *n == f)) {
            Some(i) => {
                let len = order.len() as i32;
                ((i as i32 + delta).rem_euclid(len)) as usize
            }
            None => {
                if delta > 0 {
                    0
                } else {
                    order.len() - 1
                }
            }
        };
        self.set_focus(Some(order[next]), now);
    }

    fn set_focus(&mut self, target: Option<NodeId>, now: Instant) {
        if self.focused == target {
            return;
        }
        if let Some(old) = self.focused.take() {
            self.host.blur(old, now);
        }
        if let Some(new) = target {
            self.host.focus(new, now);
        }
        self.focused = target;
    }

    /// Enter/Space: buttons and links are clicked, a field submits its form.
    fn activate_focused(&mut self, now: Instant) {
        let Some(focused) = self.focused else { return };
        let Some(node) = self.host.page.get(focused) else { return };
        match node.kind {
            NodeKind::Field => {
                if let Some(form) = self.host.page.closest(focused, &sel("form")) {
                    self.host.submit(form, now);
                }
            }
            _ => {
                if node.has_class("submit") {
                    if let Some(form) = self.host.page.closest(focused, &sel("form")) {
                        self.host.submit(form, now);
                        return;
                    }
                }
                self.host.click(focused, now);
            }
        }
    }

    /// Esc rolls back the editable the focus sits in, if it is editing.
    fn cancel_editing(&mut self, now: Instant) {
        let Some(focused) = self.focused else { return };
        let Some(container) = self.host.editables.editing_container_of(&self.host.page, focused)
        else {
            return;
        };
        if let Some(cancel) = self.host.editables.cancel_btn_of(&self.host.page, container) {
            self.host.click(cancel, now);
            self.set_focus(None, now);
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        if event.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let now = Instant::now();
        if self.popup == Popup::Help {
            self.popup = Popup::None;
            return;
        }
        let Some(target) = self.host.hit_test(event.column, event.row) else {
            return;
        };
        let focusable = self
            .host
            .page
            .get(target)
            .map(|n| n.kind.focusable())
            .unwrap_or(false);
        if focusable {
            self.set_focus(Some(target), now);
        }
        if self
            .host
            .page
            .get(target)
            .map(|n| n.has_class("submit"))
            .unwrap_or(false)
        {
            if let Some(form) = self.host.page.closest(target, &sel("form")) {
                self.host.submit(form, now);
                return;
            }
        }
        self.host.click(target, now);
    }

    /// Periodic pass: fire timers, service the simulated server, expire the
    /// status message.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.host.tick(now);

        for form in self.host.take_submissions() {
            self.set_status("Submitting...");
            if let Some(delay_ms) = self.config.demo.server_delay_ms {
                let tx = self.server_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    let _ = tx.send(form);
                });
            }
            // No delay configured: the server never answers and the retry
            // cycle keeps escalating.
        }

        while let Ok(form) = self.server_rx.try_recv() {
            self.host.resolve_submission(form, now);
            self.set_status("Saved");
        }

        if self.config.notices.desktop_notifications {
            for text in self.host.take_error_notices() {
                if let Err(e) = notify("foliant", &text) {
                    tracing::warn!("Could not show desktop notification: {}", e);
                }
            }
        } else {
            self.host.take_error_notices();
        }

        if let Some(at) = self.status_message_time {
            if now.duration_since(at) > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("dialog-warning")
        .show()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::selector::sel;

    #[test]
    fn test_demo_page_initializes_every_behavior() {
        let host = App::build_host(&AppConfig::default(), None);

        // Seeded notices moved out of staging, default severity applied
        let staging = host.page.by_id("flash").unwrap();
        assert!(host.page.children(staging).is_empty());
        let area = host.page.by_id("notifications").unwrap();
        assert_eq!(host.page.children(area).len(), 2);

        // Editables wired with affordances
        assert_eq!(host.page.select(&sel(".edit_btn")).len(), 2);
        assert_eq!(host.page.select(&sel(".cancel_btn")).len(), 2);

        // Panes: details open, metadata and danger closed
        assert_eq!(host.panes.is_closed(host.page.by_id("details").unwrap()), Some(false));
        assert_eq!(host.panes.is_closed(host.page.by_id("metadata").unwrap()), Some(true));

        // Default text applied by the initial blur rule
        let search = host.page.select(&sel("field.defaultText"))[0];
        assert_eq!(host.page.get(search).unwrap().value, "Search");

        // Prompt text filled in
        let status = host
            .page
            .all()
            .into_iter()
            .find(|n| host.page.get(*n).unwrap().attrs.contains_key("data-prompt"))
            .unwrap();
        assert_eq!(host.page.get(status).unwrap().text, "no status set");
    }

    #[test]
    fn test_anchor_opens_named_pane() {
        let host = App::build_host(&AppConfig::default(), Some("metadata".to_string()));
        assert_eq!(host.panes.is_closed(host.page.by_id("metadata").unwrap()), Some(false));
    }

    #[test]
    fn test_tab_indices_unique_and_increasing() {
        let host = App::build_host(&AppConfig::default(), None);
        let indices: Vec<u16> = host
            .page
            .all()
            .into_iter()
            .filter_map(|n| host.page.get(n).unwrap().tab_index)
            .collect();
        assert!(!indices.is_empty());
        assert_eq!(indices[0], 0);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }
}

//! Page rendering: walks the page tree, draws each node by kind, and records
//! a hit rectangle for every interactive node so mouse clicks can be routed
//! back through the dispatcher.

use std::sync::OnceLock;
use std::time::Instant;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Popup};
use crate::behaviors::editable::EditMode;
use crate::behaviors::flash::Severity;
use crate::page::selector::sel;
use crate::page::{NodeId, NodeKind};
use crate::theme::Theme;

// Load theme colors once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Notice => theme().notice,
        Severity::Ok => theme().ok,
        Severity::Warning => theme().warning,
        Severity::Error => theme().error,
    }
}

pub fn draw(f: &mut Frame, app: &mut App, now: Instant) {
    let area = f.area();
    app.host.clear_rects();

    let notice_count = visible_notices(app).len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(notice_count),   // Notification area
            Constraint::Min(4),                 // Page body
            Constraint::Length(1),              // Footer
        ])
        .split(area);

    draw_notices(f, app, chunks[0]);
    draw_body(f, app, chunks[1], now);
    draw_footer(f, app, chunks[2]);

    if let Some((label, tip)) = app.host.help.active.clone() {
        draw_tooltip(f, app, label, &tip);
    }
    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn visible_notices(app: &App) -> Vec<NodeId> {
    let Some(area) = app.host.page.by_id("notifications") else {
        return Vec::new();
    };
    app.host
        .page
        .children(area)
        .iter()
        .copied()
        .filter(|n| app.host.page.get(*n).map(|n| !n.hidden).unwrap_or(false))
        .collect()
}

fn draw_notices(f: &mut Frame, app: &mut App, area: Rect) {
    let notices = visible_notices(app);
    for (i, notice) in notices.into_iter().enumerate() {
        if i as u16 >= area.height {
            break;
        }
        let row = Rect::new(area.x, area.y + i as u16, area.width, 1);
        let severity = app.host.flash.severity_of(notice).unwrap_or_default();
        let color = if app.host.flash.is_fading(notice) {
            text_dim()
        } else {
            severity_color(severity)
        };
        let body = app
            .host
            .page
            .select_within(notice, &sel("text"))
            .first()
            .and_then(|t| app.host.page.get(*t))
            .map(|n| n.text.clone())
            .unwrap_or_default();

        let line = Line::from(vec![
            Span::styled(" x ", Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled("│ ", Style::default().fg(inactive())),
            Span::styled(body, Style::default().fg(color)),
        ]);
        f.render_widget(Paragraph::new(line), row);

        app.host.record_rect(notice, row);
        if let Some(close) = app
            .host
            .page
            .select_within(notice, &sel(".close-box"))
            .first()
            .copied()
        {
            app.host.record_rect(close, Rect::new(row.x, row.y, 3, 1));
        }
    }
}

fn draw_body(f: &mut Frame, app: &mut App, area: Rect, now: Instant) {
    let root = app.host.page.root();
    let mut y = area.y;
    for child in app.host.page.children(root).to_vec() {
        if y >= area.y + area.height {
            break;
        }
        let remaining = Rect::new(area.x, y, area.width, area.y + area.height - y);
        y += draw_node(f, app, child, remaining, now);
    }
}

/// Draw one node and return the height it used.
fn draw_node(f: &mut Frame, app: &mut App, node: NodeId, area: Rect, now: Instant) -> u16 {
    if area.height == 0 {
        return 0;
    }
    let (kind, hidden, staging, pane, editable) = match app.host.page.get(node) {
        Some(data) => (
            data.kind,
            data.hidden,
            data.id.as_deref() == Some("flash"),
            data.has_class("title-pane"),
            data.has_class("editable"),
        ),
        None => return 0,
    };
    // The staging container and the notification area never render in the
    // body; hidden nodes and the side of an editable that is switched away
    // render as nothing.
    if staging || hidden || kind == NodeKind::NoticeArea {
        return 0;
    }
    match kind {
        NodeKind::Section if pane => draw_pane(f, app, node, area, now),
        NodeKind::Section | NodeKind::Form => {
            if editable {
                return draw_editable(f, app, node, area, now);
            }
            let mut y = area.y;
            for child in app.host.page.children(node).to_vec() {
                if y >= area.y + area.height {
                    break;
                }
                let remaining = Rect::new(area.x, y, area.width, area.y + area.height - y);
                y += draw_node(f, app, child, remaining, now);
            }
            y - area.y
        }
        NodeKind::Label => draw_label(f, app, node, area),
        NodeKind::Field => draw_field(f, app, node, area, area.width),
        NodeKind::Button => draw_button(f, app, node, area),
        NodeKind::Link => draw_link(f, app, node, area),
        NodeKind::Text => draw_text(f, app, node, area),
        // Viewers and editors outside an editable degrade to plain stacks
        NodeKind::Viewer | NodeKind::Editor => {
            let mut y = area.y;
            for child in app.host.page.children(node).to_vec() {
                if y >= area.y + area.height {
                    break;
                }
                let remaining = Rect::new(area.x, y, area.width, area.y + area.height - y);
                y += draw_node(f, app, child, remaining, now);
            }
            y - area.y
        }
        NodeKind::Notice | NodeKind::NoticeArea => 0,
    }
}

fn draw_pane(f: &mut Frame, app: &mut App, pane: NodeId, area: Rect, now: Instant) -> u16 {
    let title_node = app.host.page.select_within(pane, &sel(".title")).first().copied();
    let content_node = app.host.page.select_within(pane, &sel(".content")).first().copied();

    let closed = app.host.panes.is_closed(pane).unwrap_or(false);
    let reveal = app.host.panes.reveal(pane, now);
    let content_height = match content_node {
        Some(content) if reveal > 0.0 => {
            let full = measure_children(app, content, area.width.saturating_sub(2));
            ((full as f32) * reveal).ceil() as u16
        }
        _ => 0,
    };
    let height = (content_height + 2).min(area.height);
    let pane_area = Rect::new(area.x, area.y, area.width, height);

    let title_text = title_node
        .and_then(|t| app.host.page.get(t))
        .map(|n| n.text.clone())
        .unwrap_or_default();
    let marker = if closed { "▸" } else { "▾" };
    let block = Block::default()
        .title(Span::styled(
            format!(" {} {} ", marker, title_text),
            Style::default().fg(accent()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(pane_area);
    f.render_widget(block, pane_area);

    // The whole top border row toggles the pane.
    if let Some(title) = title_node {
        app.host.record_rect(title, Rect::new(pane_area.x, pane_area.y, pane_area.width, 1));
    }

    if let Some(content) = content_node {
        if content_height > 0 {
            let content_area = Rect::new(inner.x, inner.y, inner.width, content_height.min(inner.height));
            let mut y = content_area.y;
            for child in app.host.page.children(content).to_vec() {
                if y >= content_area.y + content_area.height {
                    break;
                }
                let remaining =
                    Rect::new(content_area.x, y, content_area.width, content_area.y + content_area.height - y);
                y += draw_node(f, app, child, remaining, now);
            }
        }
    }
    height
}

fn draw_editable(f: &mut Frame, app: &mut App, container: NodeId, area: Rect, now: Instant) -> u16 {
    let mode = app.host.editables.mode_of(container).unwrap_or_default();
    match mode {
        EditMode::Viewing => draw_viewer_line(f, app, container, area),
        EditMode::Editing => draw_editor(f, app, container, area, now),
    }
}

fn draw_viewer_line(f: &mut Frame, app: &mut App, container: NodeId, area: Rect) -> u16 {
    let Some(viewer) = app.host.page.select_within(container, &sel("viewer")).first().copied()
    else {
        return 0;
    };
    let Some(data) = app.host.page.get(viewer) else { return 0 };
    let body = data.text.clone();

    let mut spans = vec![Span::styled(body.clone(), Style::default().fg(text()))];
    let mut x = area.x + body.len() as u16;
    // Extra links the author put in the viewer, then the edit affordance
    for link in app.host.page.select_within(viewer, &sel("link")) {
        let Some(node) = app.host.page.get(link) else { continue };
        let label = if node.has_class("edit_btn") {
            format!(" [{}]", node.text)
        } else {
            format!(" <{}>", node.text)
        };
        let style = if node.has_class("edit_btn") {
            Style::default().fg(accent())
        } else {
            Style::default().fg(text_dim()).add_modifier(Modifier::UNDERLINED)
        };
        spans.push(Span::styled(label.clone(), style));
        app.host
            .record_rect(link, Rect::new(x + 1, area.y, label.len() as u16 - 1, 1));
        x += label.len() as u16;
    }

    let row = Rect::new(area.x, area.y, area.width, 1);
    f.render_widget(Paragraph::new(Line::from(spans)), row);
    app.host.record_rect(viewer, row);
    1
}

fn draw_editor(f: &mut Frame, app: &mut App, container: NodeId, area: Rect, now: Instant) -> u16 {
    let Some(editor) = app.host.page.select_within(container, &sel("editor")).first().copied()
    else {
        return 0;
    };
    let multiline = app
        .host
        .page
        .get(editor)
        .map(|n| n.has_class("multiline"))
        .unwrap_or(false);
    let width = app
        .host
        .editables
        .state_of(container)
        .and_then(|s| s.editor_width)
        .unwrap_or(area.width)
        .min(area.width);
    let editor_area = Rect::new(area.x, area.y, width, area.height);

    if multiline {
        // Field box on top, Save/Cancel on their own holder row.
        let field = app.host.page.select_within(editor, &sel("field")).first().copied();
        let mut used = 0;
        if let Some(field) = field {
            used += draw_multiline_field(f, app, field, editor_area);
        }
        let controls = Rect::new(editor_area.x, editor_area.y + used, editor_area.width, 1);
        used + draw_save_controls(f, app, editor, controls)
    } else {
        // Two-cell row: field then controls.
        let field = app.host.page.select_within(editor, &sel("field")).first().copied();
        let controls_width = 18u16.min(editor_area.width / 2);
        let field_width = editor_area.width.saturating_sub(controls_width);
        if let Some(field) = field {
            let cell = Rect::new(editor_area.x, editor_area.y, field_width, 1);
            draw_field(f, app, field, cell, field_width);
        }
        let controls = Rect::new(
            editor_area.x + field_width,
            editor_area.y,
            controls_width,
            1,
        );
        draw_save_controls(f, app, editor, controls);
        1
    }
}

fn draw_save_controls(f: &mut Frame, app: &mut App, editor: NodeId, area: Rect) -> u16 {
    if area.height == 0 {
        return 0;
    }
    let save = app.host.page.select_within(editor, &sel(".save_btn")).first().copied();
    let cancel = app.host.page.select_within(editor, &sel(".cancel_btn")).first().copied();
    let mut spans = Vec::new();
    let mut x = area.x;
    if let Some(save) = save {
        let focused = app.focused == Some(save);
        let style = if focused {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD)
        };
        spans.push(Span::styled("[ Save ]", style));
        app.host.record_rect(save, Rect::new(x, area.y, 8, 1));
        x += 8;
    }
    if let Some(cancel) = cancel {
        spans.push(Span::styled(
            " Cancel",
            Style::default().fg(text_dim()).add_modifier(Modifier::UNDERLINED),
        ));
        app.host.record_rect(cancel, Rect::new(x + 1, area.y, 6, 1));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
    1
}

fn draw_multiline_field(f: &mut Frame, app: &mut App, field: NodeId, area: Rect) -> u16 {
    let height = 3.min(area.height);
    if height == 0 {
        return 0;
    }
    let Some(data) = app.host.page.get(field) else { return 0 };
    let focused = app.focused == Some(field);
    let border = if focused { accent() } else { inactive() };
    let box_area = Rect::new(area.x, area.y, area.width, height);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let body = Paragraph::new(data.value.clone())
        .style(field_style(app, field))
        .wrap(Wrap { trim: false })
        .block(block);
    f.render_widget(body, box_area);
    app.host.record_rect(field, box_area);
    height
}

fn field_style(app: &App, field: NodeId) -> Style {
    if app.host.fields.is_placeholder_active(field) {
        Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC)
    } else if app.host.fields.is_selected(field) {
        Style::default().fg(text()).bg(bg_selected())
    } else {
        Style::default().fg(text())
    }
}

fn draw_field(f: &mut Frame, app: &mut App, field: NodeId, area: Rect, width: u16) -> u16 {
    if area.height == 0 {
        return 0;
    }
    let Some(data) = app.host.page.get(field) else { return 0 };
    if data.has_class("multiline") {
        return draw_multiline_field(f, app, field, Rect::new(area.x, area.y, width, area.height));
    }
    let focused = app.focused == Some(field);
    let bracket = if focused { accent() } else { inactive() };
    let line = Line::from(vec![
        Span::styled("[", Style::default().fg(bracket)),
        Span::styled(data.value.clone(), field_style(app, field)),
        Span::styled("]", Style::default().fg(bracket)),
    ]);
    let row = Rect::new(area.x, area.y, width.min(area.width), 1);
    f.render_widget(Paragraph::new(line), row);
    app.host.record_rect(field, row);
    1
}

fn draw_label(f: &mut Frame, app: &mut App, label: NodeId, area: Rect) -> u16 {
    let Some(data) = app.host.page.get(label) else { return 0 };
    let body = data.text.clone();
    let mut spans = vec![Span::styled(
        body.clone(),
        Style::default().fg(text()).add_modifier(Modifier::BOLD),
    )];
    if let Some(icon) = app.host.page.select_within(label, &sel(".help_icon")).first().copied() {
        spans.push(Span::styled(" (?)", Style::default().fg(accent())));
        app.host
            .record_rect(icon, Rect::new(area.x + body.len() as u16 + 1, area.y, 3, 1));
    }
    let row = Rect::new(area.x, area.y, area.width, 1);
    f.render_widget(Paragraph::new(Line::from(spans)), row);
    app.host.record_rect(label, row);
    1
}

fn draw_button(f: &mut Frame, app: &mut App, button: NodeId, area: Rect) -> u16 {
    let Some(data) = app.host.page.get(button) else { return 0 };
    let focused = app.focused == Some(button);
    let style = if focused {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    };
    let label = format!("[ {} ]", data.text);
    let row = Rect::new(area.x, area.y, area.width, 1);
    f.render_widget(Paragraph::new(Span::styled(label.clone(), style)), row);
    app.host
        .record_rect(button, Rect::new(area.x, area.y, label.len() as u16, 1));
    1
}

fn draw_link(f: &mut Frame, app: &mut App, link: NodeId, area: Rect) -> u16 {
    let Some(data) = app.host.page.get(link) else { return 0 };
    let label = data.text.clone();
    let row = Rect::new(area.x, area.y, area.width, 1);
    f.render_widget(
        Paragraph::new(Span::styled(
            label.clone(),
            Style::default().fg(text_dim()).add_modifier(Modifier::UNDERLINED),
        )),
        row,
    );
    app.host
        .record_rect(link, Rect::new(area.x, area.y, label.len() as u16, 1));
    1
}

fn draw_text(f: &mut Frame, app: &mut App, node: NodeId, area: Rect) -> u16 {
    let Some(data) = app.host.page.get(node) else { return 0 };
    let style = if app.host.fields.is_prompted(node) {
        Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC)
    } else {
        Style::default().fg(text())
    };
    let row = Rect::new(area.x, area.y, area.width, 1);
    f.render_widget(Paragraph::new(Span::styled(data.text.clone(), style)), row);
    1
}

/// Height the children of `node` would use at the given width, mirroring the
/// draw functions. Used to size pane content for the slide animation.
fn measure_children(app: &App, node: NodeId, width: u16) -> u16 {
    app.host
        .page
        .children(node)
        .iter()
        .map(|c| measure_node(app, *c, width))
        .sum()
}

fn measure_node(app: &App, node: NodeId, width: u16) -> u16 {
    let Some(data) = app.host.page.get(node) else { return 0 };
    if data.hidden || data.id.as_deref() == Some("flash") || data.kind == NodeKind::NoticeArea {
        return 0;
    }
    match data.kind {
        NodeKind::Section if data.has_class("title-pane") => {
            // Nested panes measure at rest
            let closed = app.host.panes.is_closed(node).unwrap_or(false);
            let content = app
                .host
                .page
                .select_within(node, &sel(".content"))
                .first()
                .copied();
            match content {
                Some(content) if !closed => measure_children(app, content, width.saturating_sub(2)) + 2,
                _ => 2,
            }
        }
        NodeKind::Section | NodeKind::Form => {
            if data.has_class("editable") {
                match app.host.editables.mode_of(node).unwrap_or_default() {
                    EditMode::Viewing => 1,
                    EditMode::Editing => {
                        let multiline = app
                            .host
                            .page
                            .select_within(node, &sel("editor"))
                            .first()
                            .and_then(|e| app.host.page.get(*e))
                            .map(|n| n.has_class("multiline"))
                            .unwrap_or(false);
                        if multiline {
                            4
                        } else {
                            1
                        }
                    }
                }
            } else {
                measure_children(app, node, width)
            }
        }
        NodeKind::Field if data.has_class("multiline") => 3,
        NodeKind::Label | NodeKind::Field | NodeKind::Button | NodeKind::Link | NodeKind::Text => 1,
        NodeKind::Viewer | NodeKind::Editor => measure_children(app, node, width),
        NodeKind::Notice | NodeKind::NoticeArea => 0,
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.clone(), Style::default().fg(theme().warning)))
    } else {
        Line::from(vec![
            Span::styled("Tab", Style::default().fg(accent())),
            Span::styled(" move  ", Style::default().fg(text_dim())),
            Span::styled("Enter", Style::default().fg(accent())),
            Span::styled(" activate  ", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" cancel  ", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled(" help  ", Style::default().fg(text_dim())),
            Span::styled("q", Style::default().fg(accent())),
            Span::styled(" quit", Style::default().fg(text_dim())),
        ])
    };
    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_tooltip(f: &mut Frame, app: &App, label: NodeId, tip: &str) {
    let screen = f.area();
    let anchor = app
        .host
        .rect_of(label)
        .unwrap_or(Rect::new(screen.width / 4, screen.height / 2, 1, 1));
    let width = (tip.len() as u16 + 4).min(screen.width.saturating_sub(anchor.x));
    let y = (anchor.y + 1).min(screen.height.saturating_sub(3));
    let area = Rect::new(anchor.x, y, width, 3);

    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(
        Paragraph::new(Span::styled(tip.to_string(), Style::default().fg(text()))).block(block),
        area,
    );
}

fn draw_help_popup(f: &mut Frame) {
    let screen = f.area();
    let width = 46.min(screen.width);
    let height = 12.min(screen.height);
    let area = Rect::new(
        (screen.width - width) / 2,
        (screen.height - height) / 2,
        width,
        height,
    );

    let lines = vec![
        Line::from(Span::styled("Keys", Style::default().fg(accent()).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("  Tab / Shift-Tab   move between controls"),
        Line::from("  Enter / Space     activate, submit a form"),
        Line::from("  Esc               cancel editing"),
        Line::from("  type              edit the focused field"),
        Line::from("  click             everything is clickable"),
        Line::from(""),
        Line::from("  ?                 toggle this help"),
        Line::from("  q / Ctrl-C        quit"),
    ];

    f.render_widget(Clear, area);
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

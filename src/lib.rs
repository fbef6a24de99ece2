//! foliant: a terminal-friendly page toolkit.
//!
//! Interactive form glue over a retained page tree rendered with ratatui:
//! tooltip help icons, collapsible title panes, inline click-to-edit
//! widgets, placeholder text, flash notices, and a form-submission retry
//! notifier. Events route through a single delegated dispatcher, timers
//! live in one cancellable queue, and all runtime state is typed on the
//! behavior controllers rather than encoded in class names.

pub mod app;
pub mod behaviors;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod page;
pub mod theme;
pub mod timer;
pub mod ui;

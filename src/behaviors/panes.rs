//! Collapsible title panes.
//!
//! Clicking a pane's title slides its content open or closed; the `closed`
//! marker and the content's `hidden` flag flip together when the slide
//! completes, matching the animate-then-toggle order of the original markup
//! conventions. A pane named by the page's fragment anchor is forced open at
//! load, without animation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::dispatch::{Dispatcher, Route};
use crate::page::selector::sel;
use crate::page::{NodeId, Page};

pub const SLIDE_DURATION: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
struct Slide {
    started: Instant,
    /// Progress at the moment the slide (re)started, 0 closed .. 1 open.
    from: f32,
    opening: bool,
}

impl Slide {
    fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.duration_since(self.started).as_secs_f32()
            / SLIDE_DURATION.as_secs_f32();
        let p = if self.opening {
            self.from + elapsed
        } else {
            self.from - elapsed
        };
        p.clamp(0.0, 1.0)
    }

    fn done(&self, now: Instant) -> bool {
        let p = self.progress(now);
        if self.opening {
            p >= 1.0
        } else {
            p <= 0.0
        }
    }
}

#[derive(Debug)]
struct PaneState {
    content: Option<NodeId>,
    closed: bool,
    slide: Option<Slide>,
}

pub struct PaneBehavior {
    states: HashMap<NodeId, PaneState>,
    bound: bool,
}

impl PaneBehavior {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            bound: false,
        }
    }

    /// Wire every `.title-pane`. Initial collapse comes from the authored
    /// `closed` class; a pane whose id matches `anchor` is forced open.
    pub fn setup(&mut self, page: &mut Page, dispatcher: &mut Dispatcher, anchor: Option<&str>) {
        if !self.bound {
            dispatcher.bind(sel(".title-pane .title"), Route::PaneToggle);
            self.bound = true;
        }
        for pane in page.select(&sel(".title-pane")) {
            if self.states.contains_key(&pane) {
                continue;
            }
            let content = page.select_within(pane, &sel(".content")).first().copied();
            let mut closed = page.get(pane).map(|n| n.has_class("closed")).unwrap_or(false);
            let is_anchor = anchor.is_some()
                && page.get(pane).map(|n| n.id.as_deref()) == Some(anchor);
            if is_anchor {
                closed = false;
            }
            if let Some(content) = content {
                if let Some(node) = page.get_mut(content) {
                    node.hidden = closed;
                }
            }
            self.states.insert(pane, PaneState { content, closed, slide: None });
        }
    }

    /// Title click: start the slide, or reverse one already in flight from
    /// its current progress.
    pub fn toggle(&mut self, page: &mut Page, title: NodeId, now: Instant) {
        let Some(pane) = page.closest(title, &sel(".title-pane")) else { return };
        let Some(state) = self.states.get_mut(&pane) else { return };
        match state.slide.take() {
            Some(slide) => {
                state.slide = Some(Slide {
                    started: now,
                    from: slide.progress(now),
                    opening: !slide.opening,
                });
            }
            None => {
                let opening = state.closed;
                if opening {
                    // Content becomes visible immediately and grows.
                    if let Some(content) = state.content {
                        if let Some(node) = page.get_mut(content) {
                            node.hidden = false;
                        }
                    }
                }
                state.slide = Some(Slide { started: now, from: if opening { 0.0 } else { 1.0 }, opening });
            }
        }
    }

    /// Complete finished slides: flip the closed marker and the content's
    /// hidden flag together.
    pub fn tick(&mut self, page: &mut Page, now: Instant) {
        for state in self.states.values_mut() {
            let Some(slide) = state.slide else { continue };
            if !slide.done(now) {
                continue;
            }
            state.slide = None;
            state.closed = !slide.opening;
            if let Some(content) = state.content {
                if let Some(node) = page.get_mut(content) {
                    node.hidden = state.closed;
                }
            }
        }
    }

    pub fn is_closed(&self, pane: NodeId) -> Option<bool> {
        self.states.get(&pane).map(|s| s.closed)
    }

    /// Content reveal fraction for rendering, 0 fully closed .. 1 fully open.
    pub fn reveal(&self, pane: NodeId, now: Instant) -> f32 {
        match self.states.get(&pane) {
            Some(state) => match state.slide {
                Some(slide) => slide.progress(now),
                None if state.closed => 0.0,
                None => 1.0,
            },
            None => 1.0,
        }
    }
}

impl Default for PaneBehavior {
    fn default() -> Self {
        Self::new()
    }
}

//! A deliberately small selector language: `#id`, `.class`, `kind`,
//! `kind.class`, and a whitespace descendant combinator. Enough to express
//! every convention the behaviors rely on; not a CSS engine.

use std::str::FromStr;

use super::{NodeId, NodeKind, Page, PageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Ancestor-to-target parts; the last part must match the node itself.
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Part {
    kind: Option<NodeKind>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Part {
    fn matches(&self, page: &Page, id: NodeId) -> bool {
        let Some(node) = page.get(id) else { return false };
        if let Some(kind) = self.kind {
            if node.kind != kind {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if node.id.as_deref() != Some(want.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| node.has_class(c))
    }

    fn parse(token: &str) -> Result<Self, PageError> {
        let mut part = Part::default();
        let mut rest = token;
        // Leading kind name, if any
        if !rest.starts_with(['#', '.']) {
            let end = rest.find(['#', '.']).unwrap_or(rest.len());
            let (name, tail) = rest.split_at(end);
            part.kind = Some(
                NodeKind::from_name(name)
                    .ok_or_else(|| PageError::InvalidSelector(token.to_string()))?,
            );
            rest = tail;
        }
        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let (name, tail) = body.split_at(end);
            if name.is_empty() {
                return Err(PageError::InvalidSelector(token.to_string()));
            }
            match marker {
                b'#' => {
                    if part.id.replace(name.to_string()).is_some() {
                        return Err(PageError::InvalidSelector(token.to_string()));
                    }
                }
                b'.' => part.classes.push(name.to_string()),
                _ => return Err(PageError::InvalidSelector(token.to_string())),
            }
            rest = tail;
        }
        Ok(part)
    }
}

impl Selector {
    /// True when `id` matches the last part and each earlier part matches
    /// some strictly-higher ancestor, in order.
    pub fn matches(&self, page: &Page, id: NodeId) -> bool {
        let Some((target, ancestors)) = self.parts.split_last() else {
            return false;
        };
        if !target.matches(page, id) {
            return false;
        }
        let mut cursor = page.parent(id);
        for part in ancestors.iter().rev() {
            loop {
                match cursor {
                    Some(node) => {
                        cursor = page.parent(node);
                        if part.matches(page, node) {
                            break;
                        }
                    }
                    None => return false,
                }
            }
        }
        true
    }
}

impl FromStr for Selector {
    type Err = PageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<Part> = s
            .split_whitespace()
            .map(Part::parse)
            .collect::<Result<_, _>>()?;
        if parts.is_empty() {
            return Err(PageError::InvalidSelector(s.to_string()));
        }
        Ok(Selector { parts })
    }
}

/// Parse a selector that is known-good at compile time.
///
/// Only for literals; author input goes through `FromStr`.
pub(crate) fn sel(s: &str) -> Selector {
    s.parse().unwrap_or_else(|_| panic!("bad literal selector: {s}"))
}

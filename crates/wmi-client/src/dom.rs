//! Headless projection of the lists
//!
//! Applies [`RenderOp`] patches to a plain node tree, the way the browser
//! DOM would. Used by tests to check what a user would see, and by the
//! CLI to print the state of a watched page.

use crate::list::{Motion, RenderOp, RowKey};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// One attached row node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Identity
    pub key: RowKey,
    /// Rendering
    pub html: String,
    /// Hidden by a filter or a replacement
    pub hidden: bool,
    /// Slot of the last placement
    pub slot: Option<usize>,
    /// Offset of the last placement
    pub top_px: u32,
    /// Whether the last placement was animated
    pub animated: bool,
    /// Cell texts set by updates
    pub cells: BTreeMap<String, String>,
    /// Cell classes set by updates
    pub classes: BTreeMap<String, BTreeSet<String>>,
    /// Checkbox state
    pub checked: bool,
}

/// Projection of one list
#[derive(Debug, Clone)]
pub struct ListView {
    nodes: Vec<Node>,
    empty_state: bool,
    count: usize,
}

impl Default for ListView {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            empty_state: true,
            count: 0,
        }
    }
}

impl ListView {
    /// Attached nodes in document order
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Whether the "create one?" placeholder is shown instead of the table
    #[must_use]
    pub const fn shows_empty_state(&self) -> bool {
        self.empty_state
    }

    /// Whether the table header is shown
    #[must_use]
    pub const fn shows_header(&self) -> bool {
        !self.empty_state
    }

    /// Displayed count, e.g. `(3)`
    #[must_use]
    pub fn count_label(&self) -> String {
        format!("({})", self.count)
    }

    /// Visible nodes ordered by slot, document order for unplaced ones
    #[must_use]
    pub fn visible(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.iter().filter(|n| !n.hidden).collect();
        nodes.sort_by_key(|n| n.slot.unwrap_or(usize::MAX));
        nodes
    }

    /// Ids of visible nodes in display order
    #[must_use]
    pub fn visible_ids(&self) -> Vec<&str> {
        self.visible().into_iter().map(|n| n.key.id.as_str()).collect()
    }

    /// Number of visible nodes carrying `id`
    #[must_use]
    pub fn visible_count_of(&self, id: &str) -> usize {
        self.nodes
            .iter()
            .filter(|n| !n.hidden && n.key.id == id)
            .count()
    }

    fn node_mut(&mut self, key: &RowKey) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.key == *key)
    }

    fn apply(&mut self, op: RenderOp) {
        match op {
            RenderOp::InsertBefore { key, before, html } => {
                let index = self
                    .nodes
                    .iter()
                    .position(|n| n.key == before)
                    .unwrap_or(self.nodes.len());
                self.nodes.insert(index, new_node(key, html));
            }
            RenderOp::Append { key, html } => self.nodes.push(new_node(key, html)),
            RenderOp::Hide(key) => {
                if let Some(node) = self.node_mut(&key) {
                    node.hidden = true;
                    node.slot = None;
                }
            }
            RenderOp::Show(key) => {
                if let Some(node) = self.node_mut(&key) {
                    node.hidden = false;
                }
            }
            RenderOp::Remove(key) => self.nodes.retain(|n| n.key != key),
            RenderOp::Place {
                key,
                slot,
                top_px,
                motion,
            } => {
                if let Some(node) = self.node_mut(&key) {
                    node.slot = Some(slot);
                    node.top_px = top_px;
                    node.animated = matches!(motion, Motion::Animated(_));
                }
            }
            RenderOp::SetCell {
                key,
                column,
                value,
                add_classes,
                remove_classes,
            } => {
                if let Some(node) = self.node_mut(&key) {
                    let classes = node.classes.entry(column.clone()).or_default();
                    for class in remove_classes {
                        classes.remove(&class);
                    }
                    classes.extend(add_classes);
                    node.cells.insert(column, value);
                }
            }
            RenderOp::SetSelected { key, selected } => {
                if let Some(node) = self.node_mut(&key) {
                    node.checked = selected;
                }
            }
            RenderOp::EmptyState(shown) => self.empty_state = shown,
            RenderOp::Count(count) => self.count = count,
        }
    }
}

fn new_node(key: RowKey, html: String) -> Node {
    Node {
        key,
        html,
        hidden: false,
        slot: None,
        top_px: 0,
        animated: false,
        cells: BTreeMap::new(),
        classes: BTreeMap::new(),
        checked: false,
    }
}

/// Projection of every list of a page
#[derive(Debug, Clone, Default)]
pub struct HeadlessDom {
    lists: BTreeMap<String, ListView>,
}

impl HeadlessDom {
    /// Create an empty projection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply patches of list `name`
    pub fn apply(&mut self, name: &str, ops: impl IntoIterator<Item = RenderOp>) {
        let view = self.lists.entry(name.to_string()).or_default();
        for op in ops {
            view.apply(op);
        }
    }

    /// Projection of list `name`
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&ListView> {
        self.lists.get(name)
    }

    /// Plain-text dump, one line per visible row
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (name, view) in &self.lists {
            let _ = writeln!(out, "{name} {}", view.count_label());
            if view.shows_empty_state() {
                let _ = writeln!(out, "  (empty, create one?)");
                continue;
            }
            for node in view.visible() {
                let mark = if node.checked { 'x' } else { ' ' };
                let _ = write!(out, "  [{mark}] {}", node.key.id);
                for (column, value) in &node.cells {
                    let _ = write!(out, " {column}={value}");
                }
                out.push('\n');
            }
        }
        out
    }
}

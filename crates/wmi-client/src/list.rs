//! List synchronization widget
//!
//! A [`List`] is the in-memory mirror of one server-side collection. It is
//! the single source of truth for its rows: every mutation updates the row
//! store first and then queues [`RenderOp`] patches describing how the
//! projection (the DOM, or a [`crate::dom::HeadlessDom`]) must change.
//!
//! Replacing a row never mutates its node in place. The old node is tagged
//! stale and hidden, the new rendering gets a fresh [`RowKey`] and is
//! spliced in at the old position, and the stale node is purged later.
//! Stale rows are invisible to every query.

use crate::config::WmiConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// Rows
// ============================================================================

/// Identity of one rendered node: the row id plus a generation that changes
/// on every replacement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    /// Row id
    pub id: String,
    /// Rendering generation, unique within the list
    pub generation: u64,
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.id, self.generation)
    }
}

/// One list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Node identity
    pub key: RowKey,
    /// Column name to displayed text
    pub attributes: BTreeMap<String, String>,
    /// Rendered fragment
    pub html: String,
    /// Checked for massive operations
    pub selected: bool,
    /// Passed the last search
    pub visible: bool,
    /// Replaced or removed, waiting to be purged
    pub stale: bool,
    /// Slot of the last placement, `None` until placed or while hidden
    pub slot: Option<usize>,
}

impl Row {
    /// Row id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// Displayed text of a column, empty when absent
    #[must_use]
    pub fn cell(&self, column: &str) -> &str {
        self.attributes.get(column).map_or("", String::as_str)
    }

    /// Whether the row is neither stale nor filtered out
    #[must_use]
    pub const fn is_shown(&self) -> bool {
        self.visible && !self.stale
    }
}

fn cell_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"class="([^"]*)"[^>]*>([^<]*)<"#).ok())
        .as_ref()
}

/// Column values of a rendered row.
///
/// A cell is an element whose class list holds `<list>_<column>`; its text
/// up to the next tag is the displayed value. `<list>_row` is the row
/// wrapper itself and is skipped.
#[must_use]
pub fn extract_attributes(list: &str, html: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let Some(pattern) = cell_pattern() else {
        return attributes;
    };
    let prefix = format!("{list}_");
    for caps in pattern.captures_iter(html) {
        let text = caps[2].trim();
        for class in caps[1].split_whitespace() {
            if let Some(column) = class.strip_prefix(&prefix) {
                if column != "row" && !column.is_empty() {
                    attributes
                        .entry(column.to_string())
                        .or_insert_with(|| text.to_string());
                }
            }
        }
    }
    attributes
}

/// Lowercase with diacritics removed: `"Café"` folds to `"cafe"`
#[must_use]
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordering of two displayed cell values.
///
/// Values that both parse as numbers compare numerically, two non-numbers
/// compare case-insensitively, and numbers sort before text so the order
/// stays total over mixed columns.
#[must_use]
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// Parse `asc`/`desc`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Current sort of a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    /// Sorted column
    pub column: String,
    /// Direction
    pub direction: SortDirection,
}

/// How rows move to their slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Animated move, per-row duration in milliseconds
    Animated(u64),
    /// Direct placement
    Direct,
}

/// Sort animation tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortAnimation {
    /// Perceived duration of a whole sort
    pub total_ms: u64,
    /// Per-row floor
    pub min_ms: u64,
    /// Per-row ceiling
    pub max_ms: u64,
    /// Row count above which nothing is animated
    pub cutover: usize,
    /// Slot height
    pub row_height_px: u32,
}

impl SortAnimation {
    /// Tuning from the client configuration
    #[must_use]
    pub const fn from_config(config: &WmiConfig) -> Self {
        Self {
            total_ms: config.sort_animation_total_ms,
            min_ms: config.sort_animation_min_ms,
            max_ms: config.sort_animation_max_ms,
            cutover: config.animate_cutover,
            row_height_px: config.row_height_px,
        }
    }

    /// Motion for a reflow of `rows` live rows, `visible` of them shown
    #[must_use]
    pub fn motion(&self, rows: usize, visible: usize) -> Motion {
        if rows > self.cutover {
            return Motion::Direct;
        }
        let per_row = self.total_ms / visible.max(1) as u64;
        Motion::Animated(per_row.max(self.min_ms).min(self.max_ms))
    }
}

// ============================================================================
// Render patches
// ============================================================================

/// One change to the projection of a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    /// Insert a node right before another one
    InsertBefore {
        /// New node
        key: RowKey,
        /// Existing node
        before: RowKey,
        /// Rendering
        html: String,
    },
    /// Insert a node after the last one
    Append {
        /// New node
        key: RowKey,
        /// Rendering
        html: String,
    },
    /// Hide a node
    Hide(RowKey),
    /// Show a node
    Show(RowKey),
    /// Detach a node for good
    Remove(RowKey),
    /// Move a node to a slot
    Place {
        /// Node
        key: RowKey,
        /// Slot index among shown rows
        slot: usize,
        /// Vertical offset in pixels
        top_px: u32,
        /// How to get there
        motion: Motion,
    },
    /// Change the text and classes of one cell
    SetCell {
        /// Node
        key: RowKey,
        /// Column
        column: String,
        /// New text
        value: String,
        /// Classes to add
        add_classes: Vec<String>,
        /// Classes to remove
        remove_classes: Vec<String>,
    },
    /// Check or uncheck a row
    SetSelected {
        /// Node
        key: RowKey,
        /// Checked
        selected: bool,
    },
    /// Swap between the table (header and rows) and the "create one?"
    /// placeholder
    EmptyState(bool),
    /// Update the displayed row count
    Count(usize),
}

// ============================================================================
// List
// ============================================================================

/// Result of [`List::insert_or_replace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// A new row was appended
    Inserted(RowKey),
    /// An existing row was replaced
    Replaced {
        /// Stale node
        old: RowKey,
        /// New node
        new: RowKey,
    },
}

impl Upsert {
    /// Key of the live node
    #[must_use]
    pub const fn key(&self) -> &RowKey {
        match self {
            Self::Inserted(key) | Self::Replaced { new: key, .. } => key,
        }
    }
}

/// Client-side mirror of one collection
#[derive(Debug, Clone)]
pub struct List {
    name: String,
    rows: Vec<Row>,
    sort: Option<SortState>,
    search_term: String,
    search_columns: Vec<String>,
    active_columns: Vec<String>,
    animation: SortAnimation,
    generation: u64,
    empty_shown: bool,
    ops: Vec<RenderOp>,
}

impl List {
    /// Create an empty list mounted as `name`
    #[must_use]
    pub fn new(name: impl Into<String>, animation: SortAnimation) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            sort: None,
            search_term: String::new(),
            search_columns: Vec::new(),
            active_columns: Vec::new(),
            animation,
            generation: 0,
            empty_shown: true,
            ops: Vec::new(),
        }
    }

    /// Set the columns searched when no explicit columns are given
    #[must_use]
    pub fn with_search_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Start sorted on `column`; no patches are emitted
    #[must_use]
    pub fn with_sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortState {
            column: column.into(),
            direction,
        });
        self
    }

    /// List name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current sort
    #[must_use]
    pub const fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Current search term
    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Live rows in current order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| !r.stale)
    }

    /// Live row by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows().find(|r| r.id() == id)
    }

    /// Number of live rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows().count()
    }

    /// Whether the list has no live row
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of shown rows in display order
    #[must_use]
    pub fn visible_ids(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.is_shown())
            .map(Row::id)
            .collect()
    }

    /// Number of stale rows waiting for [`List::purge_stale`]
    #[must_use]
    pub fn stale_count(&self) -> usize {
        self.rows.iter().filter(|r| r.stale).count()
    }

    /// Text of the count next to the list title
    #[must_use]
    pub fn count_label(&self) -> String {
        format!("({})", self.len())
    }

    /// Drain the queued patches
    pub fn take_ops(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.ops)
    }

    fn live_index(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| !r.stale && r.id() == id)
    }

    fn next_key(&mut self, id: &str) -> RowKey {
        self.generation += 1;
        RowKey {
            id: id.to_string(),
            generation: self.generation,
        }
    }

    fn matches_search(&self, row: &Row, term: &str, columns: &[String]) -> bool {
        if term.is_empty() {
            return true;
        }
        let needle = fold(term);
        if columns.is_empty() {
            row.attributes.values().any(|v| fold(v).contains(&needle))
        } else {
            columns.iter().any(|c| fold(row.cell(c)).contains(&needle))
        }
    }

    fn slot_top(&self, slot: usize) -> u32 {
        u32::try_from(slot)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.animation.row_height_px)
    }

    fn set_empty_state(&mut self) {
        let empty = self.is_empty();
        if empty != self.empty_shown {
            self.empty_shown = empty;
            self.ops.push(RenderOp::EmptyState(empty));
        }
    }

    /// Insert a rendered row, or replace the live row with the same id.
    /// Column values are read from the fragment.
    pub fn insert_or_replace(&mut self, id: &str, html: &str) -> Upsert {
        let attributes = extract_attributes(&self.name, html);
        self.upsert(id, html, attributes)
    }

    /// Insert or replace a row with explicit column values
    pub fn upsert(&mut self, id: &str, html: &str, attributes: BTreeMap<String, String>) -> Upsert {
        let key = self.next_key(id);
        let mut row = Row {
            key: key.clone(),
            attributes,
            html: html.to_string(),
            selected: false,
            visible: true,
            stale: false,
            slot: None,
        };
        row.visible = self.matches_search(&row, &self.search_term, &self.active_columns);

        let outcome = if let Some(index) = self.live_index(id) {
            let old = &mut self.rows[index];
            old.stale = true;
            let old_key = old.key.clone();
            let old_slot = old.slot.take();
            row.selected = old.selected;
            self.ops.push(RenderOp::Hide(old_key.clone()));
            self.ops.push(RenderOp::InsertBefore {
                key: key.clone(),
                before: old_key.clone(),
                html: row.html.clone(),
            });
            // The new node takes over the old one's place until the next reflow
            if let Some(slot) = old_slot.filter(|_| row.visible) {
                row.slot = Some(slot);
                self.ops.push(RenderOp::Place {
                    key: key.clone(),
                    slot,
                    top_px: self.slot_top(slot),
                    motion: Motion::Direct,
                });
            }
            self.rows.insert(index, row);
            Upsert::Replaced {
                old: old_key,
                new: key,
            }
        } else {
            self.ops.push(RenderOp::Append {
                key: key.clone(),
                html: row.html.clone(),
            });
            self.rows.push(row);
            self.set_empty_state();
            self.ops.push(RenderOp::Count(self.len()));
            Upsert::Inserted(key)
        };

        if !self.rows.iter().any(|r| r.key == *outcome.key() && r.visible) {
            self.ops.push(RenderOp::Hide(outcome.key().clone()));
        }
        tracing::debug!(list = %self.name, row = %outcome.key(), "row upserted");
        outcome
    }

    /// Tag the live row `id` stale and hide it. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<RowKey> {
        let index = self.live_index(id)?;
        let row = &mut self.rows[index];
        row.stale = true;
        row.slot = None;
        let key = row.key.clone();
        self.ops.push(RenderOp::Hide(key.clone()));
        self.ops.push(RenderOp::Count(self.len()));
        self.set_empty_state();
        tracing::debug!(list = %self.name, row = %key, "row removed");
        Some(key)
    }

    /// Detach stale rows for good
    pub fn purge_stale(&mut self) -> usize {
        let (stale, live): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.rows).into_iter().partition(|r| r.stale);
        self.rows = live;
        for row in &stale {
            self.ops.push(RenderOp::Remove(row.key.clone()));
        }
        stale.len()
    }

    /// Change one displayed value. `class_changes` entries are `+class` or
    /// `-class`; a bare name is added, never treated as a removal. Returns
    /// false for unknown rows.
    pub fn update_value(&mut self, id: &str, column: &str, value: &str, class_changes: &[String]) -> bool {
        let Some(index) = self.live_index(id) else {
            return false;
        };
        let row = &mut self.rows[index];
        row.attributes.insert(column.to_string(), value.to_string());
        let mut add_classes = Vec::new();
        let mut remove_classes = Vec::new();
        for change in class_changes {
            if let Some(class) = change.strip_prefix('-') {
                remove_classes.push(class.to_string());
            } else {
                add_classes.push(change.strip_prefix('+').unwrap_or(change).to_string());
            }
        }
        self.ops.push(RenderOp::SetCell {
            key: row.key.clone(),
            column: column.to_string(),
            value: value.to_string(),
            add_classes,
            remove_classes,
        });
        true
    }

    /// Check or uncheck one row. Returns false for unknown rows.
    pub fn set_selected(&mut self, id: &str, selected: bool) -> bool {
        let Some(index) = self.live_index(id) else {
            return false;
        };
        let row = &mut self.rows[index];
        if row.selected != selected {
            row.selected = selected;
            self.ops.push(RenderOp::SetSelected {
                key: row.key.clone(),
                selected,
            });
        }
        true
    }

    /// Flip the selection of one row
    pub fn toggle_selected(&mut self, id: &str) -> bool {
        match self.get(id).map(|r| r.selected) {
            Some(selected) => self.set_selected(id, !selected),
            None => false,
        }
    }

    /// Check or uncheck every shown row; hidden rows keep their state
    pub fn select_all_visible(&mut self, selected: bool) {
        let ids: Vec<String> = self.visible_ids().into_iter().map(String::from).collect();
        for id in ids {
            self.set_selected(&id, selected);
        }
    }

    /// Rows targeted by a massive operation: checked and shown
    #[must_use]
    pub fn selected(&self) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|r| r.selected && r.is_shown())
            .collect()
    }

    /// Stable sort on `column` and reflow
    pub fn sort(&mut self, direction: SortDirection, column: &str) {
        self.sort = Some(SortState {
            column: column.to_string(),
            direction,
        });
        self.apply_sort();
        self.reflow();
    }

    /// Sort again with the current sort state, then reflow
    pub fn resort(&mut self) {
        self.apply_sort();
        self.reflow();
    }

    fn apply_sort(&mut self) {
        let Some(SortState { column, direction }) = self.sort.clone() else {
            return;
        };
        // stale rows go last, in their current order
        self.rows.sort_by(|a, b| match (a.stale, b.stale) {
            (false, false) => {
                let ord = compare_cells(a.cell(&column), b.cell(&column));
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
            (sa, sb) => sa.cmp(&sb),
        });
    }

    /// Place shown rows into consecutive slots in current order
    pub fn reflow(&mut self) {
        let visible = self.rows.iter().filter(|r| r.is_shown()).count();
        let motion = self.animation.motion(self.len(), visible);
        let mut placements = Vec::with_capacity(visible);
        let mut next = 0;
        for row in &mut self.rows {
            if row.is_shown() {
                row.slot = Some(next);
                placements.push((row.key.clone(), next));
                next += 1;
            } else {
                row.slot = None;
            }
        }
        for (key, slot) in placements {
            let top_px = self.slot_top(slot);
            self.ops.push(RenderOp::Place {
                key,
                slot,
                top_px,
                motion,
            });
        }
    }

    /// Filter on `term` across `columns` (the list's search columns when
    /// empty). A one-character term is ignored and returns false.
    pub fn search(&mut self, term: &str, columns: &[String]) -> bool {
        let term = term.trim();
        if term.chars().count() == 1 {
            return false;
        }
        let columns = if columns.is_empty() {
            self.search_columns.clone()
        } else {
            columns.to_vec()
        };
        self.search_term = term.to_string();
        self.active_columns.clone_from(&columns);

        let mut ops = Vec::new();
        let mut shown = 0;
        for index in 0..self.rows.len() {
            if self.rows[index].stale {
                continue;
            }
            let visible = self.matches_search(&self.rows[index], term, &columns);
            let row = &mut self.rows[index];
            if visible != row.visible {
                row.visible = visible;
                ops.push(if visible {
                    RenderOp::Show(row.key.clone())
                } else {
                    RenderOp::Hide(row.key.clone())
                });
            }
            shown += usize::from(visible);
        }
        self.ops.extend(ops);
        tracing::debug!(list = %self.name, term, shown, "search");
        self.reflow();
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn animation() -> SortAnimation {
        SortAnimation::from_config(&WmiConfig::default())
    }

    fn row_html(id: &str, login: &str, uid: u32) -> String {
        format!(
            r#"<div class="users_row" id="users_{id}"><div class="users_login odd">{login}</div><div class="users_uid">{uid}</div></div>"#
        )
    }

    fn users(rows: &[(&str, &str, u32)]) -> List {
        let mut list = List::new("users", animation()).with_search_columns(["login"]);
        for (id, login, uid) in rows {
            list.insert_or_replace(id, &row_html(id, login, *uid));
        }
        list.take_ops();
        list
    }

    mod extraction_tests {
        use super::*;

        #[test]
        fn test_extracts_prefixed_cells() {
            let attrs = extract_attributes("users", &row_html("7", "  alice ", 1007));
            assert_eq!(attrs.get("login").map(String::as_str), Some("alice"));
            assert_eq!(attrs.get("uid").map(String::as_str), Some("1007"));
            assert!(!attrs.contains_key("row"));
        }

        #[test]
        fn test_ignores_other_lists() {
            let html = r#"<span class="groups_name">admins</span>"#;
            assert!(extract_attributes("users", html).is_empty());
        }

        #[test]
        fn test_fold_strips_accents_and_case() {
            assert_eq!(fold("Café"), "cafe");
            assert_eq!(fold("ÉLODIE Noël"), "elodie noel");
        }

        #[test]
        fn test_compare_cells() {
            assert_eq!(compare_cells("9", "10"), Ordering::Less);
            assert_eq!(compare_cells("b", "A"), Ordering::Greater);
            assert_eq!(compare_cells("10", "abc"), Ordering::Less);
            assert_eq!(compare_cells("1.5", " 1.50 "), Ordering::Equal);
        }
    }

    mod upsert_tests {
        use super::*;

        #[test]
        fn test_first_insert_leaves_empty_state() {
            let mut list = List::new("users", animation());
            let outcome = list.insert_or_replace("42", &row_html("42", "bob", 1042));
            assert!(matches!(outcome, Upsert::Inserted(_)));
            let ops = list.take_ops();
            assert!(ops.contains(&RenderOp::EmptyState(false)));
            assert!(ops.contains(&RenderOp::Count(1)));
            assert_eq!(list.count_label(), "(1)");
            assert_eq!(list.visible_ids(), vec!["42"]);
        }

        #[test]
        fn test_replace_splices_before_old_and_hides_it() {
            let mut list = users(&[("1", "alice", 1001), ("2", "bob", 1002)]);
            let outcome = list.insert_or_replace("1", &row_html("1", "alicia", 1001));
            let Upsert::Replaced { old, new } = outcome else {
                panic!("expected a replacement");
            };
            let ops = list.take_ops();
            assert_eq!(ops[0], RenderOp::Hide(old.clone()));
            assert!(matches!(&ops[1], RenderOp::InsertBefore { key, before, .. } if *key == new && *before == old));
            assert_eq!(list.visible_ids(), vec!["1", "2"]);
            assert_eq!(list.get("1").unwrap().cell("login"), "alicia");
            assert_eq!(list.stale_count(), 1);
            assert_eq!(list.purge_stale(), 1);
            assert_eq!(list.take_ops(), vec![RenderOp::Remove(old)]);
        }

        #[test]
        fn test_replace_keeps_selection() {
            let mut list = users(&[("1", "alice", 1001)]);
            list.set_selected("1", true);
            list.insert_or_replace("1", &row_html("1", "alice", 1001));
            assert_eq!(list.selected().len(), 1);
        }

        #[test]
        fn test_replace_after_sort_takes_the_old_slot() {
            let mut list = users(&[("1", "carol", 3), ("2", "alice", 1), ("3", "bob", 2)]);
            list.sort(SortDirection::Asc, "login");
            list.take_ops();
            let outcome = list.insert_or_replace("2", &row_html("2", "alice", 1));
            let ops = list.take_ops();
            assert!(ops.contains(&RenderOp::Place {
                key: outcome.key().clone(),
                slot: 0,
                top_px: 0,
                motion: Motion::Direct,
            }));
            assert_eq!(list.get("2").unwrap().slot, Some(0));
        }

        #[test]
        fn test_insert_uses_columns_of_active_search() {
            let mut list = users(&[("1", "alice", 5600)]);
            list.search("56", &["uid".to_string()]);
            list.insert_or_replace("2", &row_html("2", "bob", 5601));
            list.insert_or_replace("3", &row_html("3", "x56", 1));
            assert_eq!(list.visible_ids(), vec!["1", "2"]);
        }

        #[test]
        fn test_insert_respects_active_search() {
            let mut list = users(&[("1", "alice", 1001)]);
            list.search("ali", &[]);
            list.take_ops();
            let outcome = list.insert_or_replace("2", &row_html("2", "bob", 1002));
            assert!(list.take_ops().contains(&RenderOp::Hide(outcome.key().clone())));
            assert_eq!(list.visible_ids(), vec!["1"]);
            assert_eq!(list.len(), 2);
        }
    }

    mod remove_tests {
        use super::*;

        #[test]
        fn test_remove_last_row_shows_placeholder() {
            let mut list = users(&[("1", "alice", 1001)]);
            assert!(list.remove("1").is_some());
            let ops = list.take_ops();
            assert!(ops.contains(&RenderOp::EmptyState(true)));
            assert!(ops.contains(&RenderOp::Count(0)));
            assert!(list.is_empty());
        }

        #[test]
        fn test_remove_unknown_is_noop() {
            let mut list = users(&[("1", "alice", 1001)]);
            assert!(list.remove("99").is_none());
            list.remove("1");
            list.take_ops();
            assert!(list.remove("1").is_none());
            assert!(list.take_ops().is_empty());
        }
    }

    mod sort_tests {
        use super::*;

        #[test]
        fn test_numeric_and_lexical_sort() {
            let mut list = users(&[("a", "Zoe", 20), ("b", "adam", 3), ("c", "Marc", 100)]);
            list.sort(SortDirection::Asc, "uid");
            assert_eq!(list.visible_ids(), vec!["b", "a", "c"]);
            list.sort(SortDirection::Asc, "login");
            assert_eq!(list.visible_ids(), vec!["b", "c", "a"]);
            list.sort(SortDirection::Desc, "login");
            assert_eq!(list.visible_ids(), vec!["a", "c", "b"]);
        }

        #[test]
        fn test_sort_is_stable() {
            let mut list = users(&[("1", "same", 1), ("2", "same", 2), ("3", "same", 3)]);
            list.sort(SortDirection::Desc, "login");
            assert_eq!(list.visible_ids(), vec!["1", "2", "3"]);
        }

        #[test]
        fn test_small_list_animates_with_clamped_duration() {
            let mut list = users(&[("1", "a", 1), ("2", "b", 2)]);
            list.sort(SortDirection::Asc, "login");
            let ops = list.take_ops();
            // 3000 ms over 2 rows, clamped to 750
            assert!(ops.iter().all(|op| matches!(op, RenderOp::Place { motion: Motion::Animated(750), .. })));
            assert!(matches!(ops[1], RenderOp::Place { slot: 1, top_px: 51, .. }));
        }

        #[test]
        fn test_duration_scales_inversely() {
            let anim = animation();
            assert_eq!(anim.motion(10, 10), Motion::Animated(300));
            assert_eq!(anim.motion(60, 60), Motion::Animated(100));
            assert_eq!(anim.motion(1, 1), Motion::Animated(750));
            assert_eq!(anim.motion(101, 101), Motion::Direct);
        }

        #[test]
        fn test_inverted_bounds_do_not_panic() {
            let anim = SortAnimation {
                min_ms: 800,
                max_ms: 200,
                ..animation()
            };
            assert_eq!(anim.motion(10, 10), Motion::Animated(200));
        }

        #[test]
        fn test_large_list_is_placed_directly() {
            let rows: Vec<(String, String, u32)> = (0..150)
                .map(|i| (format!("{i}"), format!("user{:03}", 149 - i), i))
                .collect();
            let mut list = List::new("users", animation());
            for (id, login, uid) in &rows {
                list.insert_or_replace(id, &row_html(id, login, *uid));
            }
            list.take_ops();
            list.sort(SortDirection::Asc, "login");
            let ops = list.take_ops();
            assert_eq!(ops.len(), 150);
            assert!(ops.iter().all(|op| matches!(op, RenderOp::Place { motion: Motion::Direct, .. })));
            let ids = list.visible_ids();
            assert_eq!(ids.first(), Some(&"149"));
            assert_eq!(ids.last(), Some(&"0"));
        }
    }

    mod search_tests {
        use super::*;

        #[test]
        fn test_accent_folded_search() {
            let mut list = users(&[("1", "café", 1), ("2", "tea", 2)]);
            assert!(list.search("CAFE", &[]));
            assert_eq!(list.visible_ids(), vec!["1"]);
        }

        #[test]
        fn test_one_character_is_noop() {
            let mut list = users(&[("1", "alice", 1), ("2", "bob", 2)]);
            assert!(!list.search("b", &[]));
            assert!(list.take_ops().is_empty());
            assert_eq!(list.visible_ids().len(), 2);
        }

        #[test]
        fn test_matching_rows_are_repacked() {
            let mut list = users(&[("1", "alice", 1), ("2", "bob", 2), ("3", "alina", 3)]);
            list.search("ali", &[]);
            let ops = list.take_ops();
            assert!(ops.contains(&RenderOp::Hide(list.rows().nth(1).unwrap().key.clone())));
            let slots: Vec<_> = ops
                .iter()
                .filter_map(|op| match op {
                    RenderOp::Place { key, slot, .. } => Some((key.id.as_str(), *slot)),
                    _ => None,
                })
                .collect();
            assert_eq!(slots, vec![("1", 0), ("3", 1)]);
        }

        #[test]
        fn test_explicit_columns() {
            let mut list = users(&[("1", "alice", 1234), ("2", "bob", 5678)]);
            list.search("56", &["uid".to_string()]);
            assert_eq!(list.visible_ids(), vec!["2"]);
            list.search("", &[]);
            assert_eq!(list.visible_ids(), vec!["1", "2"]);
        }
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn test_selected_excludes_hidden_rows() {
            let mut list = users(&[("1", "alice", 1), ("2", "bob", 2)]);
            list.set_selected("1", true);
            list.set_selected("2", true);
            list.search("bob", &[]);
            let ids: Vec<_> = list.selected().iter().map(|r| r.id()).collect();
            assert_eq!(ids, vec!["2"]);
        }

        #[test]
        fn test_select_all_visible_skips_hidden() {
            let mut list = users(&[("1", "alice", 1), ("2", "bob", 2)]);
            list.search("alice", &[]);
            list.select_all_visible(true);
            list.search("", &[]);
            let ids: Vec<_> = list.selected().iter().map(|r| r.id()).collect();
            assert_eq!(ids, vec!["1"]);
            assert!(list.toggle_selected("2"));
            assert!(list.toggle_selected("1"));
            let ids: Vec<_> = list.selected().iter().map(|r| r.id()).collect();
            assert_eq!(ids, vec!["2"]);
        }

        #[test]
        fn test_update_value_and_classes() {
            let mut list = users(&[("1", "alice", 1)]);
            let changes = vec!["+locked".to_string(), "-active".to_string(), "bold".to_string()];
            assert!(list.update_value("1", "login", "alice2", &changes));
            assert!(!list.update_value("9", "login", "x", &[]));
            match &list.take_ops()[..] {
                [RenderOp::SetCell { value, add_classes, remove_classes, .. }] => {
                    assert_eq!(value, "alice2");
                    assert_eq!(add_classes, &["locked", "bold"]);
                    assert_eq!(remove_classes, &["active"]);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Upsert(u8, String),
            Remove(u8),
            Search(String),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..8, "[a-zé]{0,6}").prop_map(|(id, name)| Op::Upsert(id, name)),
                (0u8..8).prop_map(Op::Remove),
                "[a-z]{0,3}".prop_map(Op::Search),
            ]
        }

        fn apply(list: &mut List, op: &Op) {
            match op {
                Op::Upsert(id, name) => {
                    list.insert_or_replace(&id.to_string(), &row_html(&id.to_string(), name, u32::from(*id)));
                }
                Op::Remove(id) => {
                    list.remove(&id.to_string());
                }
                Op::Search(term) => {
                    list.search(term, &[]);
                }
            }
        }

        proptest! {
            #[test]
            fn prop_one_live_row_per_id(ops in proptest::collection::vec(op(), 0..40)) {
                let mut list = List::new("users", animation());
                for op in &ops {
                    apply(&mut list, op);
                    let mut ids: Vec<_> = list.rows().map(Row::id).collect();
                    let total = ids.len();
                    ids.sort_unstable();
                    ids.dedup();
                    prop_assert_eq!(ids.len(), total);
                }
            }

            #[test]
            fn prop_sort_is_idempotent(names in proptest::collection::vec("[a-zA-Z0-9]{0,5}", 0..30), desc: bool) {
                let mut list = List::new("users", animation());
                for (i, name) in names.iter().enumerate() {
                    list.insert_or_replace(&i.to_string(), &row_html(&i.to_string(), name, 0));
                }
                let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
                list.sort(direction, "login");
                let once: Vec<String> = list.visible_ids().into_iter().map(String::from).collect();
                list.sort(direction, "login");
                let twice: Vec<String> = list.visible_ids().into_iter().map(String::from).collect();
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn prop_empty_search_restores_everything(ops in proptest::collection::vec(op(), 0..30), term in "[a-z]{2,4}") {
                let mut list = List::new("users", animation());
                for op in &ops {
                    apply(&mut list, op);
                }
                list.search(&term, &[]);
                list.search("", &[]);
                prop_assert_eq!(list.visible_ids().len(), list.len());
            }

            #[test]
            fn prop_insert_then_remove_keeps_visible_count(ops in proptest::collection::vec(op(), 0..30)) {
                let mut list = List::new("users", animation());
                for op in &ops {
                    apply(&mut list, op);
                }
                let before = list.visible_ids().len();
                list.insert_or_replace("fresh", &row_html("fresh", "fresh", 0));
                list.remove("fresh");
                prop_assert_eq!(list.visible_ids().len(), before);
            }
        }
    }
}

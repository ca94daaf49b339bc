//! Page context: everything one console page owns
//!
//! A [`PageContext`] holds the lists of the page, the sub-content lock,
//! the notification banner, the debounce timers and the queue of requests
//! the page wants sent. It is the context the push call registry runs
//! against, so server-initiated updates and user input go through the same
//! methods.
//!
//! Time only moves through [`PageContext::advance_to`], which fires due
//! timers. Nothing here reads the wall clock.

use crate::config::WmiConfig;
use crate::dom::HeadlessDom;
use crate::list::{List, SortAnimation, SortDirection, Upsert};
use crate::notify::{Notice, NotificationCenter};
use crate::registry::{CallRegistry, Text};
use crate::result::{WmiError, WmiResult};
use crate::timers::Debouncer;
use crate::wire::{Mutation, MutationReply};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

// ============================================================================
// Sub-content lock
// ============================================================================

/// Lock pinning the detail panel to the row being edited.
///
/// While held, hover previews may not replace the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelLock {
    holder: Option<(String, String)>,
}

impl PanelLock {
    /// Pin the panel to row `id` of `list`
    pub fn lock(&mut self, list: &str, id: &str) {
        self.holder = Some((list.to_string(), id.to_string()));
    }

    /// Release the panel; returns the previous holder
    pub fn unlock(&mut self) -> Option<(String, String)> {
        self.holder.take()
    }

    /// Whether the panel is pinned
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.holder.is_some()
    }

    /// Whether row `id` of `list` holds the panel
    #[must_use]
    pub fn is_held_by(&self, list: &str, id: &str) -> bool {
        self.holder
            .as_ref()
            .is_some_and(|(l, i)| l == list && i == id)
    }

    /// Current holder
    #[must_use]
    pub fn holder(&self) -> Option<(&str, &str)> {
        self.holder.as_ref().map(|(l, i)| (l.as_str(), i.as_str()))
    }
}

// ============================================================================
// Timers and outgoing requests
// ============================================================================

/// Logical operation a debounce timer belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Deferred sort of a list
    Sort(String),
    /// Search box of a list
    Search(String),
    /// Instant-apply edit of one field of one object
    Field {
        /// Object id
        id: String,
        /// Field name
        field: String,
    },
    /// Hover preview
    Hover,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TimerAction {
    Sort,
    Search(String),
    Apply(Mutation),
    Preview { list: String, id: String },
}

/// A request the page wants sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Side-effecting request
    Mutation(Mutation),
    /// View to load into the detail panel (edit form, creation form, preview)
    Load(String),
}

impl Outgoing {
    /// Request path
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Mutation(m) => m.path(),
            Self::Load(path) => path.clone(),
        }
    }
}

/// A confirmation dialog waiting for Enter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDialog {
    /// Question shown to the user
    pub title: String,
    /// Request sent on confirmation
    pub mutation: Mutation,
}

// ============================================================================
// Page context
// ============================================================================

/// State of one console page
#[derive(Debug)]
pub struct PageContext {
    config: WmiConfig,
    collection: String,
    now: Instant,
    lists: BTreeMap<String, List>,
    dom: HeadlessDom,
    pub(crate) lock: PanelLock,
    notifications: NotificationCenter,
    pub(crate) timers: Debouncer<TimerKey, TimerAction>,
    pub(crate) cursor: Option<usize>,
    pub(crate) dialog: Option<PendingDialog>,
    outbox: Vec<Outgoing>,
    location: Option<String>,
    pub(crate) search_focused: bool,
    pub(crate) search_text: String,
    preview: Option<(String, String)>,
    highlight: Option<(String, String)>,
    pub(crate) default_skel: Option<String>,
}

impl PageContext {
    /// Create the page of `collection` (`users`, `groups`...) with its
    /// main list, at time `now`
    #[must_use]
    pub fn new(config: WmiConfig, collection: &str, now: Instant) -> Self {
        let main = List::new(collection, SortAnimation::from_config(&config));
        let mut dom = HeadlessDom::new();
        dom.apply(collection, std::iter::empty());
        let notifications = NotificationCenter::new(config.notification_timeout());
        Self {
            config,
            collection: collection.to_string(),
            now,
            lists: BTreeMap::from([(collection.to_string(), main)]),
            dom,
            lock: PanelLock::default(),
            notifications,
            timers: Debouncer::new(),
            cursor: None,
            dialog: None,
            outbox: Vec::new(),
            location: None,
            search_focused: false,
            search_text: String::new(),
            preview: None,
            highlight: None,
            default_skel: None,
        }
    }

    /// Set the searchable columns and initial sort of the main list
    #[must_use]
    pub fn with_main_list(mut self, search_columns: &[&str], sort: Option<(&str, SortDirection)>) -> Self {
        if let Some(list) = self.lists.remove(&self.collection) {
            let mut list = list.with_search_columns(search_columns.iter().copied());
            if let Some((column, direction)) = sort {
                list = list.with_sort(column, direction);
            }
            self.lists.insert(self.collection.clone(), list);
        }
        self
    }

    /// Skeleton used by the keyboard "apply skel" action
    #[must_use]
    pub fn with_default_skel(mut self, skel: impl Into<String>) -> Self {
        self.default_skel = Some(skel.into());
        self
    }

    /// Mount an additional list
    pub fn add_list(&mut self, list: List) {
        let name = list.name().to_string();
        self.dom.apply(&name, std::iter::empty());
        self.lists.insert(name, list);
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &WmiConfig {
        &self.config
    }

    /// Collection of the page
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Current page time
    #[must_use]
    pub const fn now(&self) -> Instant {
        self.now
    }

    /// List by name
    #[must_use]
    pub fn list(&self, name: &str) -> Option<&List> {
        self.lists.get(name)
    }

    /// The page's main list
    #[must_use]
    pub fn main_list(&self) -> Option<&List> {
        self.lists.get(&self.collection)
    }

    pub(crate) fn list_mut(&mut self, name: &str) -> WmiResult<&mut List> {
        self.lists.get_mut(name).ok_or_else(|| WmiError::UnknownList {
            name: name.to_string(),
        })
    }

    /// Projection of the lists
    #[must_use]
    pub const fn dom(&self) -> &HeadlessDom {
        &self.dom
    }

    /// Sub-content lock
    #[must_use]
    pub const fn panel_lock(&self) -> &PanelLock {
        &self.lock
    }

    /// Notification banner
    #[must_use]
    pub const fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Open confirmation dialog
    #[must_use]
    pub const fn dialog(&self) -> Option<&PendingDialog> {
        self.dialog.as_ref()
    }

    /// Row whose preview is loaded in the panel
    #[must_use]
    pub fn preview(&self) -> Option<(&str, &str)> {
        self.preview.as_ref().map(|(l, i)| (l.as_str(), i.as_str()))
    }

    /// Row highlighted as the one being worked on. Independent of the
    /// checkboxes used by massive operations.
    #[must_use]
    pub fn highlighted(&self) -> Option<(&str, &str)> {
        self.highlight.as_ref().map(|(l, i)| (l.as_str(), i.as_str()))
    }

    /// Location the server asked the page to move to
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Whether `key` has a pending timer
    #[must_use]
    pub fn is_scheduled(&self, key: &TimerKey) -> bool {
        self.timers.is_pending(key)
    }

    /// Take the requests queued since the last call
    pub fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn send(&mut self, request: Outgoing) {
        tracing::debug!(path = %request.path(), "request queued");
        self.outbox.push(request);
    }

    pub(crate) fn flush(&mut self, name: &str) {
        if let Some(list) = self.lists.get_mut(name) {
            let ops = list.take_ops();
            self.dom.apply(name, ops);
        }
    }

    pub(crate) fn schedule(&mut self, key: TimerKey, delay: Duration, action: TimerAction) {
        if self.timers.schedule(key.clone(), self.now, delay, action) {
            tracing::trace!(?key, "timer replaced");
        }
    }

    // ------------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------------

    /// Move page time to `now`, firing due timers and expiring
    /// notifications. Returns the number of timers fired.
    pub fn advance_to(&mut self, now: Instant) -> usize {
        self.now = self.now.max(now);
        let due = self.timers.take_due(self.now);
        let fired = due.len();
        for (key, action) in due {
            if let Err(err) = self.fire(&key, action) {
                tracing::warn!(?key, error = %err, "timer action failed");
            }
        }
        self.notifications.expire(self.now);
        fired
    }

    /// Earliest moment something is due
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timers.next_deadline(), self.notifications.next_expiry()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn fire(&mut self, key: &TimerKey, action: TimerAction) -> WmiResult<()> {
        match (key, action) {
            (TimerKey::Sort(name), TimerAction::Sort) => {
                let list = self.list_mut(name)?;
                list.resort();
                list.purge_stale();
                self.flush(name);
            }
            (TimerKey::Search(name), TimerAction::Search(term)) => {
                self.search_now(name, &term)?;
            }
            (_, TimerAction::Apply(mutation)) => self.send(Outgoing::Mutation(mutation)),
            (_, TimerAction::Preview { list, id }) => {
                if !self.lock.is_locked() {
                    self.send(Outgoing::Load(format!("/{list}/edit/{id}")));
                    self.preview = Some((list, id));
                }
            }
            (key, action) => {
                tracing::warn!(?key, ?action, "mismatched timer");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------------

    /// Insert or replace a rendered row and schedule the deferred sort
    pub fn insert_or_replace(&mut self, list: &str, id: &str, html: &str) -> WmiResult<Upsert> {
        let outcome = self.list_mut(list)?.insert_or_replace(id, html);
        self.flush(list);
        self.schedule_sort(list);
        Ok(outcome)
    }

    /// Remove a row and schedule the deferred sort. Releases the panel when
    /// the row held it. Unknown rows are a no-op returning false.
    pub fn remove(&mut self, list: &str, id: &str) -> WmiResult<bool> {
        let removed = self.list_mut(list)?.remove(id).is_some();
        if !removed {
            return Ok(false);
        }
        if self.lock.is_held_by(list, id) {
            self.lock.unlock();
        }
        if self.preview() == Some((list, id)) {
            self.preview = None;
        }
        if self.highlighted() == Some((list, id)) {
            self.highlight = None;
        }
        self.flush(list);
        self.schedule_sort(list);
        Ok(true)
    }

    /// Change one displayed value of a row
    pub fn update_value(
        &mut self,
        list: &str,
        id: &str,
        column: &str,
        value: &str,
        class_changes: &[String],
    ) -> WmiResult<bool> {
        let updated = self
            .list_mut(list)?
            .update_value(id, column, value, class_changes);
        self.flush(list);
        Ok(updated)
    }

    /// Sort a list now
    pub fn sort(&mut self, list: &str, direction: SortDirection, column: &str) -> WmiResult<()> {
        self.list_mut(list)?.sort(direction, column);
        self.flush(list);
        Ok(())
    }

    /// Schedule the deferred sort of a list, replacing a pending one
    pub fn schedule_sort(&mut self, list: &str) {
        let delay = self.config.sort_debounce();
        self.schedule(TimerKey::Sort(list.to_string()), delay, TimerAction::Sort);
    }

    /// Check or uncheck a row
    pub fn select_row(&mut self, list: &str, id: &str, selected: bool) -> WmiResult<bool> {
        let found = self.list_mut(list)?.set_selected(id, selected);
        self.flush(list);
        Ok(found)
    }

    /// Check or uncheck every visible row of a list
    pub fn select_all_visible(&mut self, list: &str, selected: bool) -> WmiResult<()> {
        self.list_mut(list)?.select_all_visible(selected);
        self.flush(list);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Give or take focus from the search box
    pub fn focus_search(&mut self, focused: bool) {
        self.search_focused = focused;
    }

    /// Text typed in the search box
    #[must_use]
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// A keystroke in the search box: debounce the search of `list`
    pub fn type_search(&mut self, list: &str, text: &str) {
        self.search_text = text.to_string();
        let delay = self.config.search_debounce();
        self.schedule(
            TimerKey::Search(list.to_string()),
            delay,
            TimerAction::Search(text.to_string()),
        );
    }

    /// Search a list now on its default columns
    pub fn search_now(&mut self, list: &str, term: &str) -> WmiResult<bool> {
        let searched = self.list_mut(list)?.search(term, &[]);
        self.cursor = None;
        self.flush(list);
        Ok(searched)
    }

    // ------------------------------------------------------------------------
    // Panel
    // ------------------------------------------------------------------------

    /// Open a row for editing: pin the panel and load the edit view
    pub fn open_row(&mut self, list: &str, id: &str) -> WmiResult<()> {
        if self.list_mut(list)?.get(id).is_none() {
            return Ok(());
        }
        self.timers.cancel(&TimerKey::Hover);
        self.lock.lock(list, id);
        self.highlight = Some((list.to_string(), id.to_string()));
        self.preview = Some((list.to_string(), id.to_string()));
        self.send(Outgoing::Load(format!("/{list}/edit/{id}")));
        Ok(())
    }

    /// Release the panel
    pub fn release_panel(&mut self) -> bool {
        self.lock.unlock().is_some()
    }

    /// Drop the highlight and close the panel: release the lock, clear the
    /// preview and cancel pending field edits. Checkboxes are kept.
    pub fn unselect_row(&mut self) {
        self.release_panel();
        self.highlight = None;
        self.preview = None;
        self.timers
            .cancel_where(|key| matches!(key, TimerKey::Field { .. }));
    }

    /// Pointer entered a row: schedule its preview unless the panel is
    /// pinned. Returns whether a preview was scheduled.
    pub fn hover_row(&mut self, list: &str, id: &str) -> bool {
        if self.lock.is_locked() {
            return false;
        }
        let delay = self.config.hover_preview();
        self.schedule(
            TimerKey::Hover,
            delay,
            TimerAction::Preview {
                list: list.to_string(),
                id: id.to_string(),
            },
        );
        true
    }

    /// Pointer left the row
    pub fn leave_row(&mut self) {
        self.timers.cancel(&TimerKey::Hover);
    }

    // ------------------------------------------------------------------------
    // Notifications and navigation
    // ------------------------------------------------------------------------

    /// Show a notice in the banner
    pub fn notify(&mut self, notice: Notice) -> u64 {
        self.notifications.show(self.now, notice)
    }

    /// Withdraw banner messages carrying `css_class`
    pub fn remove_notification(&mut self, css_class: &str) -> usize {
        self.notifications.remove_class(css_class)
    }

    /// Surface the banner message of a mutation reply, if any
    pub fn handle_reply(&mut self, reply: &MutationReply) -> Option<u64> {
        let message = reply.notification()?.to_string();
        Some(self.notify(Notice::new(message)))
    }

    /// The server asked the page to move to `location`
    pub fn head_over_to(&mut self, location: &str) {
        tracing::info!(location, "navigation requested");
        self.location = Some(location.to_string());
    }
}

// ============================================================================
// Remote-callable handlers
// ============================================================================

/// Registry with the handlers the server calls over the push channel
pub fn default_registry() -> WmiResult<CallRegistry<PageContext>> {
    let mut registry = CallRegistry::new();

    registry.register(
        "show_message_through_notification",
        |page: &mut PageContext, (message, timeout, class): (Text, Option<Text>, Option<Text>)| {
            let mut notice = Notice::new(message.0);
            // An empty string stands for the default lifetime
            notice.timeout_ms = timeout.and_then(|t| t.0.parse().ok());
            notice.css_class = class.map(|c| c.0).filter(|c| !c.is_empty());
            page.notify(notice);
            Ok(())
        },
    )?;
    registry.register(
        "remove_notification",
        |page: &mut PageContext, (class,): (Text,)| {
            page.remove_notification(&class.0);
            Ok(())
        },
    )?;
    for name in ["update_instance", "add_row"] {
        registry.register(
            name,
            |page: &mut PageContext, (list, id, html): (Text, Text, Text)| {
                page.insert_or_replace(&list.0, &id.0, &html.0).map(|_| ())
            },
        )?;
    }
    registry.register(
        "del_row",
        |page: &mut PageContext, (list, id): (Text, Text)| page.remove(&list.0, &id.0).map(|_| ()),
    )?;
    registry.register(
        "update_row_value",
        |page: &mut PageContext, (list, id, column, value, classes): (Text, Text, Text, Text, Option<Vec<String>>)| {
            page.update_value(&list.0, &id.0, &column.0, &value.0, &classes.unwrap_or_default())
                .map(|_| ())
        },
    )?;
    registry.register(
        "head_over_to",
        |page: &mut PageContext, (location,): (Text,)| {
            page.head_over_to(&location.0);
            Ok(())
        },
    )?;

    Ok(registry)
}

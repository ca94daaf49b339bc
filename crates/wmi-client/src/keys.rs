//! Keyboard shortcuts of a list page

use crate::massive::MassiveAction;
use crate::notify::Notice;
use crate::page::{Outgoing, PageContext, TimerKey};
use crate::wire::ExportFormat;

/// A key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Escape
    Escape,
    /// Enter
    Enter,
    /// A printable key
    Char(char),
}

/// Letter shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// `J`: move the preselection cursor down
    Next,
    /// `K`: move it up
    Previous,
    /// `S`: toggle the selection of the preselected row
    ToggleSelection,
    /// `N`: open the creation form
    CreateNew,
    /// `X`: massive export
    Export,
    /// `L`: massive skeleton reapply
    Skel,
    /// `P`: massive permissiveness toggle
    Permissions,
}

impl Shortcut {
    /// Shortcut bound to a letter, case-insensitive
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'j' => Some(Self::Next),
            'k' => Some(Self::Previous),
            's' => Some(Self::ToggleSelection),
            'n' => Some(Self::CreateNew),
            'x' => Some(Self::Export),
            'l' => Some(Self::Skel),
            'p' => Some(Self::Permissions),
            _ => None,
        }
    }
}

impl PageContext {
    /// Id of the preselected row
    #[must_use]
    pub fn cursor_row(&self) -> Option<String> {
        let list = self.main_list()?;
        list.visible_ids()
            .get(self.cursor?)
            .map(|id| (*id).to_string())
    }

    /// Handle a key press; returns whether the page consumed it
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Escape => self.escape(),
            Key::Enter => self.enter(),
            Key::Char(_) if self.search_focused => false,
            Key::Char(c) => match Shortcut::from_char(c) {
                Some(shortcut) => self.shortcut(shortcut),
                None => false,
            },
        }
    }

    fn escape(&mut self) -> bool {
        if self.cancel_dialog() {
            return true;
        }
        let collection = self.collection().to_string();
        if self.search_focused && !self.search_text.is_empty() {
            self.search_text.clear();
            self.timers.cancel(&TimerKey::Search(collection.clone()));
            if let Err(err) = self.search_now(&collection, "") {
                tracing::warn!(error = %err, "search reset failed");
            }
            return true;
        }
        self.unselect_row();
        true
    }

    fn enter(&mut self) -> bool {
        if self.confirm_dialog() {
            return true;
        }
        let Some(id) = self.cursor_row() else {
            return false;
        };
        let collection = self.collection().to_string();
        self.open_row(&collection, &id).is_ok()
    }

    fn shortcut(&mut self, shortcut: Shortcut) -> bool {
        let collection = self.collection().to_string();
        let visible = self.main_list().map_or(0, |l| l.visible_ids().len());
        match shortcut {
            Shortcut::Next | Shortcut::Previous if visible == 0 => {
                self.cursor = None;
                false
            }
            Shortcut::Next => {
                self.cursor = Some(self.cursor.map_or(0, |c| (c + 1).min(visible - 1)));
                true
            }
            Shortcut::Previous => {
                self.cursor = Some(self.cursor.map_or(visible - 1, |c| c.saturating_sub(1)));
                true
            }
            Shortcut::ToggleSelection => {
                let Some(id) = self.cursor_row() else {
                    return false;
                };
                if let Ok(list) = self.list_mut(&collection) {
                    list.toggle_selected(&id);
                }
                self.flush(&collection);
                true
            }
            Shortcut::CreateNew => {
                self.send(Outgoing::Load(format!("/{collection}/new")));
                true
            }
            Shortcut::Export => {
                // failures are already in the banner
                let _ = self.request_massive(MassiveAction::Export(ExportFormat::Csv));
                true
            }
            Shortcut::Skel => {
                match self.default_skel.clone() {
                    Some(skel) => {
                        let _ = self.request_massive(MassiveAction::Skel(skel));
                    }
                    None => {
                        self.notify(Notice::new("Please select a skeleton."));
                    }
                }
                true
            }
            Shortcut::Permissions => {
                let _ = self.request_massive(MassiveAction::Permissiveness);
                true
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::WmiConfig;
    use std::time::{Duration, Instant};

    fn page(ids: &[&str]) -> (PageContext, Instant) {
        let t0 = Instant::now();
        let mut page = PageContext::new(WmiConfig::default(), "users", t0)
            .with_default_skel("/etc/skel");
        for id in ids {
            let html = format!(r#"<div class="users_row"><span class="users_login">user{id}</span></div>"#);
            page.insert_or_replace("users", id, &html).unwrap();
        }
        page.take_outbox();
        (page, t0)
    }

    #[test]
    fn test_shortcut_letters() {
        assert_eq!(Shortcut::from_char('J'), Some(Shortcut::Next));
        assert_eq!(Shortcut::from_char('x'), Some(Shortcut::Export));
        assert_eq!(Shortcut::from_char('L'), Some(Shortcut::Skel));
        assert_eq!(Shortcut::from_char('p'), Some(Shortcut::Permissions));
        assert_eq!(Shortcut::from_char('q'), None);
    }

    #[test]
    fn test_cursor_moves_and_clamps() {
        let (mut page, _) = page(&["1", "2", "3"]);
        assert!(page.handle_key(Key::Char('j')));
        assert_eq!(page.cursor_row().as_deref(), Some("1"));
        page.handle_key(Key::Char('j'));
        page.handle_key(Key::Char('j'));
        page.handle_key(Key::Char('j'));
        assert_eq!(page.cursor_row().as_deref(), Some("3"));
        page.handle_key(Key::Char('k'));
        assert_eq!(page.cursor_row().as_deref(), Some("2"));
    }

    #[test]
    fn test_cursor_on_empty_list() {
        let (mut page, _) = page(&[]);
        assert!(!page.handle_key(Key::Char('j')));
        assert!(!page.handle_key(Key::Enter));
    }

    #[test]
    fn test_select_then_enter_opens_row() {
        let (mut page, _) = page(&["1", "2"]);
        page.handle_key(Key::Char('k'));
        page.handle_key(Key::Char('s'));
        assert_eq!(page.main_list().unwrap().selected()[0].id(), "2");
        assert!(page.handle_key(Key::Enter));
        assert!(page.panel_lock().is_held_by("users", "2"));
        assert_eq!(page.take_outbox(), vec![Outgoing::Load("/users/edit/2".into())]);
    }

    #[test]
    fn test_escape_releases_and_keeps_checkboxes() {
        let (mut page, t0) = page(&["1", "2"]);
        page.select_row("users", "1", true).unwrap();
        page.select_row("users", "2", true).unwrap();
        page.open_row("users", "1").unwrap();
        assert_eq!(page.highlighted(), Some(("users", "1")));
        page.edit_field("1", "gecos", "Bob");
        assert!(page.handle_key(Key::Escape));
        assert!(!page.panel_lock().is_locked());
        assert_eq!(page.highlighted(), None);
        assert_eq!(page.preview(), None);
        assert_eq!(page.main_list().unwrap().selected().len(), 2);
        page.take_outbox();
        page.advance_to(t0 + Duration::from_secs(2));
        assert!(page.take_outbox().is_empty());
    }

    #[test]
    fn test_escape_clears_focused_search_first() {
        let (mut page, t0) = page(&["1", "2"]);
        page.open_row("users", "1").unwrap();
        page.focus_search(true);
        page.type_search("users", "user2");
        page.advance_to(t0 + Duration::from_secs(1));
        assert_eq!(page.main_list().unwrap().visible_ids(), vec!["2"]);

        assert!(!page.handle_key(Key::Char('j')));
        assert!(page.handle_key(Key::Escape));
        assert_eq!(page.search_text(), "");
        assert_eq!(page.main_list().unwrap().visible_ids().len(), 2);
        assert!(page.panel_lock().is_locked());

        page.handle_key(Key::Escape);
        assert!(!page.panel_lock().is_locked());
    }

    #[test]
    fn test_enter_confirms_dialog_and_escape_closes_it() {
        let (mut page, _) = page(&["1"]);
        page.select_row("users", "1", true).unwrap();
        page.handle_key(Key::Char('l'));
        assert!(page.dialog().is_some());
        assert!(page.handle_key(Key::Escape));
        assert!(page.dialog().is_none());

        page.handle_key(Key::Char('L'));
        assert!(page.handle_key(Key::Enter));
        assert_eq!(page.take_outbox()[0].path(), "/users/massive/skel/1/%2Fetc%2Fskel");
    }

    #[test]
    fn test_new_and_export() {
        let (mut page, _) = page(&["1"]);
        page.handle_key(Key::Char('n'));
        page.handle_key(Key::Char('x'));
        assert_eq!(page.take_outbox(), vec![Outgoing::Load("/users/new".into())]);
        assert_eq!(page.notifications().visible().len(), 1);
        page.handle_key(Key::Char('p'));
        assert_eq!(page.notifications().visible().len(), 2);
    }
}

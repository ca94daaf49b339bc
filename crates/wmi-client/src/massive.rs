//! Massive operations: one request over every selected, visible row
//!
//! Destructive operations open a [`PendingDialog`] first and are only sent
//! once the dialog is confirmed.

use crate::notify::Notice;
use crate::page::{Outgoing, PageContext, PendingDialog};
use crate::result::{WmiError, WmiResult};
use crate::wire::{ExportFormat, Mutation};

/// Shown when a massive operation finds nothing selected
pub const EMPTY_SELECTION_MESSAGE: &str = "Please select at least one account.";

/// A batch action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MassiveAction {
    /// Delete the objects
    Delete {
        /// Skip archiving their data
        no_archive: bool,
    },
    /// Export the objects
    Export(ExportFormat),
    /// Reapply a home skeleton (users)
    Skel(String),
    /// Toggle the lock (users)
    Lock,
    /// Toggle the permissiveness (groups)
    Permissiveness,
    /// Open the mass edit view (users)
    Edit,
}

impl MassiveAction {
    fn only_on(&self) -> Option<&'static str> {
        match self {
            Self::Skel(_) | Self::Lock | Self::Edit => Some("users"),
            Self::Permissiveness => Some("groups"),
            Self::Delete { .. } | Self::Export(_) => None,
        }
    }

    const fn needs_confirmation(&self) -> bool {
        matches!(self, Self::Delete { .. } | Self::Skel(_))
    }

    fn mutation(self, collection: &str, ids: Vec<String>) -> Mutation {
        let collection = collection.to_string();
        match self {
            Self::Delete { no_archive } => Mutation::MassiveDelete {
                collection,
                ids,
                no_archive,
            },
            Self::Export(format) => Mutation::MassiveExport {
                collection,
                ids,
                format,
            },
            Self::Skel(skel) => Mutation::MassiveSkel { ids, skel },
            Self::Lock => Mutation::MassiveLock { ids },
            Self::Permissiveness => Mutation::MassivePermissiveness { ids },
            Self::Edit => Mutation::MassiveEdit { ids },
        }
    }

    fn title(&self, count: usize) -> String {
        match self {
            Self::Delete { no_archive: true } => {
                format!("Delete {count} account(s) without archiving their data?")
            }
            Self::Delete { no_archive: false } => format!("Delete {count} account(s)?"),
            Self::Skel(skel) => format!("Reapply skeleton {skel} to {count} account(s)?"),
            _ => format!("Apply to {count} account(s)?"),
        }
    }
}

impl PageContext {
    fn reject(&mut self, message: &str) -> WmiError {
        self.notify(Notice::new(message));
        WmiError::validation(message)
    }

    /// Start a massive operation on the selected visible rows of the main
    /// list. Validation failures are shown in the banner and returned.
    pub fn request_massive(&mut self, action: MassiveAction) -> WmiResult<()> {
        let collection = self.collection().to_string();
        if let Some(only) = action.only_on() {
            if only != collection {
                return Err(self.reject(&format!("This action is only available for {only}.")));
            }
        }
        if matches!(&action, MassiveAction::Skel(skel) if skel.is_empty()) {
            return Err(self.reject("Please select a skeleton."));
        }
        let ids: Vec<String> = self
            .main_list()
            .map(|list| list.selected().iter().map(|r| r.id().to_string()).collect())
            .unwrap_or_default();
        if ids.is_empty() {
            return Err(self.reject(EMPTY_SELECTION_MESSAGE));
        }

        tracing::info!(?action, count = ids.len(), "massive operation");
        if action.needs_confirmation() {
            let title = action.title(ids.len());
            self.dialog = Some(PendingDialog {
                title,
                mutation: action.mutation(&collection, ids),
            });
        } else {
            self.send(Outgoing::Mutation(action.mutation(&collection, ids)));
        }
        Ok(())
    }

    /// Ask for confirmation before deleting one object
    pub fn request_delete(&mut self, id: &str, no_archive: bool) {
        self.dialog = Some(PendingDialog {
            title: format!("Delete {id}?"),
            mutation: Mutation::Delete {
                collection: self.collection().to_string(),
                id: id.to_string(),
                no_archive,
            },
        });
    }

    /// Confirm the open dialog: send its request. A deletion releases the
    /// panel when a deleted row holds it.
    pub fn confirm_dialog(&mut self) -> bool {
        let Some(dialog) = self.dialog.take() else {
            return false;
        };
        let collection = self.collection().to_string();
        let deleted: Vec<String> = match &dialog.mutation {
            Mutation::Delete { id, .. } => vec![id.clone()],
            Mutation::MassiveDelete { ids, .. } => ids.clone(),
            _ => Vec::new(),
        };
        if deleted.iter().any(|id| self.lock.is_held_by(&collection, id)) {
            self.lock.unlock();
        }
        self.send(Outgoing::Mutation(dialog.mutation));
        true
    }

    /// Close the open dialog without sending anything
    pub fn cancel_dialog(&mut self) -> bool {
        self.dialog.take().is_some()
    }
}

//! Instant apply: edit forms save themselves as the user types
//!
//! Text and select fields are debounced per field, checkboxes are sent at
//! once, and the two password fields are only sent together once they
//! agree.

use crate::notify::Notice;
use crate::page::{Outgoing, PageContext, TimerAction, TimerKey};
use crate::result::{WmiError, WmiResult};
use crate::wire::{wire_bool, Mutation};

/// Field name of the password pair
pub const PASSWORD_FIELD: &str = "password";
/// Shown when the two password fields differ
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Incorrect passwords";

impl PageContext {
    fn modify(&self, id: &str, field: &str, value: &str) -> Mutation {
        Mutation::Modify {
            collection: self.collection().to_string(),
            id: id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// A text or select field of object `id` changed
    pub fn edit_field(&mut self, id: &str, field: &str, value: &str) {
        let mutation = self.modify(id, field, value);
        let delay = self.config().instant_apply();
        self.schedule(
            TimerKey::Field {
                id: id.to_string(),
                field: field.to_string(),
            },
            delay,
            TimerAction::Apply(mutation),
        );
    }

    /// A checkbox of object `id` changed: sent immediately
    pub fn toggle_checkbox(&mut self, id: &str, field: &str, checked: bool) {
        self.timers.cancel(&TimerKey::Field {
            id: id.to_string(),
            field: field.to_string(),
        });
        let mutation = self.modify(id, field, wire_bool(checked));
        self.send(Outgoing::Mutation(mutation));
    }

    /// One of the two password fields changed.
    ///
    /// Nothing happens while either field is empty. Differing passwords
    /// are a validation failure shown in the banner; matching ones are
    /// scheduled like any other field. Returns whether a save was
    /// scheduled.
    pub fn edit_password(&mut self, id: &str, password: &str, confirmation: &str) -> WmiResult<bool> {
        if password.is_empty() || confirmation.is_empty() {
            return Ok(false);
        }
        if password != confirmation {
            self.timers.cancel(&TimerKey::Field {
                id: id.to_string(),
                field: PASSWORD_FIELD.to_string(),
            });
            self.notify(Notice::new(PASSWORD_MISMATCH_MESSAGE));
            return Err(WmiError::validation(PASSWORD_MISMATCH_MESSAGE));
        }
        self.edit_field(id, PASSWORD_FIELD, password);
        Ok(true)
    }
}

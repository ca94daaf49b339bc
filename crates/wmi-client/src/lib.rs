//! Licorn WMI client: push channel and list synchronization
//!
//! The WMI console keeps its pages in sync with the server through two
//! cooperating pieces:
//!
//! ```text
//! ┌──────────────┐  GET /setup<path>  ┌──────────────┐
//! │  PushClient  │ ─────────────────► │              │
//! │  (tokio task)│  GET /push (parks) │  WMI server  │
//! │              │ ◄───────────────── │              │
//! └──────┬───────┘   {data: [calls]}  └──────▲───────┘
//!        │ PushEvent::Calls                  │ GET /<collection>/mod/...
//!        ▼                                   │
//! ┌──────────────┐  CallRegistry   ┌─────────┴────┐
//! │ PageContext  │ ──────────────► │ List (rows)  │──► RenderOp ──► HeadlessDom
//! │ lock, timers │                 └──────────────┘
//! └──────────────┘
//! ```
//!
//! The push channel owns no page state. It hands each batch of calls to
//! the page loop and waits until the batch has run; the page resolves call
//! names through a [`CallRegistry`] of typed handlers.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod config;
mod result;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod dom;
#[allow(clippy::missing_errors_doc)]
pub mod forms;
pub mod keys;
#[allow(clippy::cast_possible_truncation, clippy::missing_errors_doc)]
pub mod list;
#[allow(clippy::missing_errors_doc)]
pub mod massive;
pub mod notify;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod page;
#[allow(clippy::missing_errors_doc)]
pub mod push;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod registry;
pub mod timers;
#[allow(clippy::missing_errors_doc)]
pub mod transport;
#[allow(clippy::missing_errors_doc)]
pub mod wire;

pub use config::{
    WmiConfig, DEFAULT_ANIMATE_CUTOVER, DEFAULT_GRACE_PERIOD_MS, DEFAULT_HOVER_PREVIEW_MS,
    DEFAULT_INSTANT_APPLY_MS, DEFAULT_NOTIFICATION_TIMEOUT_MS, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_ROW_HEIGHT_PX, DEFAULT_SEARCH_DEBOUNCE_MS, DEFAULT_SORT_DEBOUNCE_MS,
};
pub use dom::{HeadlessDom, ListView, Node};
pub use keys::{Key, Shortcut};
pub use list::{List, Motion, RenderOp, Row, RowKey, SortAnimation, SortDirection, SortState, Upsert};
pub use massive::{MassiveAction, EMPTY_SELECTION_MESSAGE};
pub use notify::{Notice, Notification, NotificationCenter, PUSH_RECONNECTION_CLASS};
pub use page::{default_registry, Outgoing, PageContext, PanelLock, PendingDialog, TimerKey};
pub use push::{setup_path, PushClient, PushEvent, PushSession, PushState, PushSwitch};
pub use registry::{CallRegistry, DispatchReport, FromArgs, Text};
pub use result::{WmiError, WmiResult};
pub use timers::Debouncer;
pub use transport::{HttpReply, HttpTransport, MockReply, MockTransport, PathPattern, Transport};
pub use wire::{ExportFormat, Mutation, MutationReply, PendingCall, PushPayload};

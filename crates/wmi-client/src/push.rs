//! Push channel: long-polling notifications from the WMI server
//!
//! The server cannot reach the browser, so the client keeps one request
//! parked on `/push` at all times. When the server has calls queued for the
//! session it answers, the client hands the calls to the page, waits for
//! them to run, then parks a new request.
//!
//! ```text
//!   SettingUp ──ok──► Polling ──calls──► Evaluating ──┐
//!       ▲               │  ▲ └──empty──┘              │
//!       │               │  └──────────────────────────┘
//!       │             error
//!       └─ retry ── ErrorBackoff ◄── error (from any state)
//! ```
//!
//! Every failure is retried forever after a fixed delay. A first failure
//! stays silent for a grace period because reloads and navigation break
//! the stream as a matter of course. The [`PushSwitch`] turns visible
//! effects off (notices and call execution) without ever stopping the
//! reconnection loop.

use crate::config::WmiConfig;
use crate::notify::{Notice, PUSH_RECONNECTION_CLASS};
use crate::result::{WmiError, WmiResult};
use crate::transport::Transport;
use crate::wire::{PendingCall, PushPayload};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Prefix of the setup request
pub const SETUP_PREFIX: &str = "/setup";
/// Path of the long-poll request
pub const PUSH_PATH: &str = "/push";

const BACK_ONLINE_MESSAGE: &str = "Push connection back online, rock'n roll!";
const BACK_ONLINE_TIMEOUT_MS: u64 = 5_000;

/// Setup path for a page location: `/users/new` gives `/setup/users/new`.
/// A full URL is reduced to its path and query.
#[must_use]
pub fn setup_path(location: &str) -> String {
    let path = location
        .split_once("://")
        .map_or(location, |(_, rest)| {
            rest.find('/').map_or("", |slash| &rest[slash..])
        });
    format!("{SETUP_PREFIX}/{path}").replacen("//", "/", 1)
}

/// State of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// Registering the page location with the server
    SettingUp,
    /// A long poll is in flight
    Polling,
    /// A batch of calls is being run by the page
    Evaluating,
    /// Waiting before the next setup attempt
    ErrorBackoff,
}

impl std::fmt::Display for PushState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SettingUp => "setting-up",
            Self::Polling => "polling",
            Self::Evaluating => "evaluating",
            Self::ErrorBackoff => "error-backoff",
        };
        f.write_str(name)
    }
}

/// Shared handle on the push channel, held by the page.
///
/// Deactivating suppresses notices and call execution; the channel keeps
/// reconnecting in the background so a later activation finds it alive.
#[derive(Debug, Clone)]
pub struct PushSwitch {
    active: Arc<AtomicBool>,
    next_location: Arc<Mutex<Option<String>>>,
}

impl Default for PushSwitch {
    fn default() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            next_location: Arc::new(Mutex::new(None)),
        }
    }
}

impl PushSwitch {
    /// Whether visible effects are enabled
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Enable visible effects
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Disable visible effects
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// The page is leaving for `location`: go quiet now, and set the channel
    /// up for the new location once the in-flight request completes.
    pub fn navigate(&self, location: &str) {
        self.deactivate();
        *self
            .next_location
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(location.to_string());
    }

    fn take_location(&self) -> Option<String> {
        self.next_location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// What the push channel tells the page
#[derive(Debug)]
pub enum PushEvent {
    /// Run these calls in order, then signal `done`
    Calls {
        /// Calls of one `/push` reply
        calls: Vec<PendingCall>,
        /// Dropped or fired once the batch has run
        done: oneshot::Sender<()>,
    },
    /// Show a notice in the banner
    Notice(Notice),
    /// Withdraw banner notices carrying this CSS class
    Withdraw(String),
    /// The channel changed state
    State(PushState),
}

/// Session bookkeeping of the push channel
#[derive(Debug)]
pub struct PushSession {
    switch: PushSwitch,
    setup_url: String,
    last_known_good_url: Option<String>,
    error_streak: bool,
    first_failure_at: Option<Instant>,
}

impl PushSession {
    /// Setup path used for the next attempt
    #[must_use]
    pub fn setup_url(&self) -> &str {
        &self.setup_url
    }

    /// Setup path of the last successful setup
    #[must_use]
    pub fn last_known_good_url(&self) -> Option<&str> {
        self.last_known_good_url.as_deref()
    }

    /// Whether the channel is in a failure streak
    #[must_use]
    pub const fn error_streak(&self) -> bool {
        self.error_streak
    }

    /// Whether visible effects are enabled
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.switch.is_active()
    }
}

/// Long-polling client over a [`Transport`]
#[derive(Debug)]
pub struct PushClient<T> {
    transport: T,
    session: PushSession,
    state: PushState,
    pending: Vec<PendingCall>,
    retry_delay: Duration,
    grace_period: Duration,
}

impl<T: Transport> PushClient<T> {
    /// Create a client for the page at `location`
    pub fn new(transport: T, config: &WmiConfig, location: &str) -> Self {
        Self {
            transport,
            session: PushSession {
                switch: PushSwitch::default(),
                setup_url: setup_path(location),
                last_known_good_url: None,
                error_streak: false,
                first_failure_at: None,
            },
            state: PushState::SettingUp,
            pending: Vec::new(),
            retry_delay: config.retry_delay(),
            grace_period: config.grace_period(),
        }
    }

    /// Handle for the page to (de)activate the channel or navigate
    #[must_use]
    pub fn switch(&self) -> PushSwitch {
        self.session.switch.clone()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PushState {
        self.state
    }

    /// Session bookkeeping
    #[must_use]
    pub const fn session(&self) -> &PushSession {
        &self.session
    }

    /// Drive the channel until the page side of `events` is dropped
    pub async fn run(mut self, events: mpsc::Sender<PushEvent>) -> WmiResult<()> {
        tracing::info!(setup = %self.session.setup_url, "push channel starting");
        loop {
            match self.step(&events).await {
                Ok(_) => {}
                Err(WmiError::ChannelClosed) => {
                    tracing::info!("page closed, push channel stopping");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Perform the work of the current state and move to the next one
    pub async fn step(&mut self, events: &mpsc::Sender<PushEvent>) -> WmiResult<PushState> {
        let next = match self.state {
            PushState::SettingUp => self.setup(events).await?,
            PushState::Polling => self.poll().await,
            PushState::Evaluating => self.evaluate(events).await?,
            PushState::ErrorBackoff => self.backoff(events).await?,
        };
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, "push state");
            send(events, PushEvent::State(next)).await?;
        }
        self.state = next;
        Ok(next)
    }

    async fn setup(&mut self, events: &mpsc::Sender<PushEvent>) -> WmiResult<PushState> {
        if let Some(location) = self.session.switch.take_location() {
            self.session.setup_url = setup_path(&location);
        }
        let url = self.session.setup_url.clone();
        match self.transport.get(&url).await.and_then(|r| r.error_for_status(&url)) {
            Ok(_) => {
                if self.session.error_streak && self.session.is_active() {
                    send(events, PushEvent::Withdraw(PUSH_RECONNECTION_CLASS.to_string())).await?;
                    send(
                        events,
                        PushEvent::Notice(
                            Notice::new(BACK_ONLINE_MESSAGE).with_timeout(BACK_ONLINE_TIMEOUT_MS),
                        ),
                    )
                    .await?;
                }
                self.session.error_streak = false;
                self.session.first_failure_at = None;
                self.session.last_known_good_url = Some(url);
                Ok(PushState::Polling)
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "push setup failed");
                Ok(PushState::ErrorBackoff)
            }
        }
    }

    async fn poll(&mut self) -> PushState {
        let result = self
            .transport
            .get(PUSH_PATH)
            .await
            .and_then(|r| r.error_for_status(PUSH_PATH))
            .and_then(|r| PushPayload::decode(&r.body));

        match result {
            Ok(calls) if calls.is_empty() => self.after_poll(PushState::Polling),
            Ok(calls) => {
                tracing::debug!(count = calls.len(), "push calls received");
                self.pending = calls;
                PushState::Evaluating
            }
            Err(err) => {
                tracing::warn!(error = %err, "push connection lost");
                PushState::ErrorBackoff
            }
        }
    }

    fn after_poll(&self, next: PushState) -> PushState {
        let navigating = self
            .session
            .switch
            .next_location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if navigating {
            PushState::SettingUp
        } else {
            next
        }
    }

    async fn evaluate(&mut self, events: &mpsc::Sender<PushEvent>) -> WmiResult<PushState> {
        let calls = std::mem::take(&mut self.pending);
        if self.session.is_active() {
            let (done, evaluated) = oneshot::channel();
            send(events, PushEvent::Calls { calls, done }).await?;
            // A dropped sender also means the batch is over.
            let _ = evaluated.await;
        } else {
            tracing::debug!(count = calls.len(), "push inactive, calls dropped");
        }
        Ok(self.after_poll(PushState::Polling))
    }

    async fn backoff(&mut self, events: &mpsc::Sender<PushEvent>) -> WmiResult<PushState> {
        let now = Instant::now();
        let retry_at = now + self.retry_delay;
        let first_failure = *self.session.first_failure_at.get_or_insert(now);
        self.session.error_streak = true;

        let notify_at = first_failure + self.grace_period;
        if notify_at < retry_at {
            tokio::time::sleep_until(notify_at.max(now)).await;
            if self.session.is_active() && self.session.error_streak {
                let remaining = retry_at.saturating_duration_since(Instant::now());
                send(events, PushEvent::Notice(reconnection_notice(remaining))).await?;
            }
        }

        tokio::time::sleep_until(retry_at).await;
        Ok(PushState::SettingUp)
    }
}

fn reconnection_notice(remaining: Duration) -> Notice {
    let secs = remaining.as_millis().div_ceil(1_000);
    Notice::new(format!("Push connection lost. Retrying in {secs} seconds."))
        .with_timeout(u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX))
        .with_class(PUSH_RECONNECTION_CLASS)
}

async fn send(events: &mpsc::Sender<PushEvent>, event: PushEvent) -> WmiResult<()> {
    events.send(event).await.map_err(|_| WmiError::ChannelClosed)
}

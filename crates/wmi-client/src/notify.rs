//! Notification banner model
//!
//! Messages stack in the banner, each with its own lifetime. A CSS class
//! tags related messages so they can be withdrawn together, which is how
//! the push channel clears its "connection lost" notice once reconnected.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// CSS class of the push reconnection notices
pub const PUSH_RECONNECTION_CLASS: &str = "push_reconnection_notification";

/// A message to show, not yet placed in a banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Text (may contain markup)
    pub message: String,
    /// Lifetime in milliseconds; `None` uses the banner default
    pub timeout_ms: Option<u64>,
    /// Optional CSS class
    pub css_class: Option<String>,
}

impl Notice {
    /// Create a notice with the default lifetime
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout_ms: None,
            css_class: None,
        }
    }

    /// Set the lifetime
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Set the CSS class
    #[must_use]
    pub fn with_class(mut self, css_class: impl Into<String>) -> Self {
        self.css_class = Some(css_class.into());
        self
    }
}

/// A message shown in the banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Monotonic id
    pub id: u64,
    /// Text
    pub message: String,
    /// CSS class, if any
    pub css_class: Option<String>,
    /// When the message disappears
    pub expires_at: Instant,
}

/// The banner: currently displayed notifications
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    items: Vec<Notification>,
    next_id: u64,
    default_timeout: Duration,
}

impl NotificationCenter {
    /// Create an empty banner
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
            default_timeout,
        }
    }

    /// Show a notice; returns its id
    pub fn show(&mut self, now: Instant, notice: Notice) -> u64 {
        self.next_id += 1;
        let timeout = notice
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map_or(self.default_timeout, Duration::from_millis);
        tracing::info!(message = %notice.message, "notification");
        self.items.push(Notification {
            id: self.next_id,
            message: notice.message,
            css_class: notice.css_class,
            expires_at: now + timeout,
        });
        self.next_id
    }

    /// Withdraw every notification carrying `css_class`
    pub fn remove_class(&mut self, css_class: &str) -> usize {
        let before = self.items.len();
        self.items
            .retain(|n| n.css_class.as_deref() != Some(css_class));
        before - self.items.len()
    }

    /// Drop expired notifications and return them
    pub fn expire(&mut self, now: Instant) -> Vec<Notification> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|n| n.expires_at <= now);
        self.items = kept;
        expired
    }

    /// Earliest expiry among displayed notifications
    #[must_use]
    pub fn next_expiry(&self) -> Option<Instant> {
        self.items.iter().map(|n| n.expires_at).min()
    }

    /// Displayed notifications, oldest first
    #[must_use]
    pub fn visible(&self) -> &[Notification] {
        &self.items
    }

    /// Whether the banner is shown at all
    #[must_use]
    pub fn is_displayed(&self) -> bool {
        !self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_custom_lifetimes() {
        let t0 = Instant::now();
        let mut banner = NotificationCenter::new(Duration::from_millis(7_000));
        banner.show(t0, Notice::new("default"));
        banner.show(t0, Notice::new("short").with_timeout(3_000));
        banner.show(t0, Notice::new("zero means default").with_timeout(0));

        let expired = banner.expire(t0 + Duration::from_millis(3_000));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].message, "short");
        assert_eq!(banner.visible().len(), 2);
        assert_eq!(banner.next_expiry(), Some(t0 + Duration::from_millis(7_000)));

        banner.expire(t0 + Duration::from_millis(7_000));
        assert!(!banner.is_displayed());
    }

    #[test]
    fn test_remove_by_class() {
        let t0 = Instant::now();
        let mut banner = NotificationCenter::new(Duration::from_secs(7));
        banner.show(t0, Notice::new("lost").with_class(PUSH_RECONNECTION_CLASS));
        banner.show(t0, Notice::new("other"));
        banner.show(t0, Notice::new("lost again").with_class(PUSH_RECONNECTION_CLASS));

        assert_eq!(banner.remove_class(PUSH_RECONNECTION_CLASS), 2);
        assert_eq!(banner.visible()[0].message, "other");
    }

    #[test]
    fn test_ids_are_monotonic() {
        let t0 = Instant::now();
        let mut banner = NotificationCenter::new(Duration::from_secs(1));
        let a = banner.show(t0, Notice::new("a"));
        let b = banner.show(t0, Notice::new("b"));
        assert!(b > a);
    }
}

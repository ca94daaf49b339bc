//! Client configuration
//!
//! Every timing constant of the push channel and the list widget lives here
//! so that a deployment (or a test) can tune them without touching the
//! state machines.

use crate::result::{WmiError, WmiResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default delay before a failed push channel is set up again
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5_000;
/// Default grace period before a lost connection is shown to the user
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2_000;
/// Default debounce of the deferred sort after inserts and removals
pub const DEFAULT_SORT_DEBOUNCE_MS: u64 = 500;
/// Default debounce of search box keystrokes
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 750;
/// Default debounce of instant-apply field edits
pub const DEFAULT_INSTANT_APPLY_MS: u64 = 1_000;
/// Default delay before a hovered row loads its preview
pub const DEFAULT_HOVER_PREVIEW_MS: u64 = 250;
/// Default lifetime of a banner notification
pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 7_000;
/// Row count above which lists are reflowed without animation
pub const DEFAULT_ANIMATE_CUTOVER: usize = 100;
/// Height of one list row in pixels
pub const DEFAULT_ROW_HEIGHT_PX: u32 = 51;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmiConfig {
    /// Base URL of the WMI server, e.g. `https://localhost:3356`
    pub base_url: String,
    /// Delay between a push failure and the next setup attempt
    pub retry_delay_ms: u64,
    /// Time a first push failure stays invisible
    pub grace_period_ms: u64,
    /// Deferred sort debounce
    pub sort_debounce_ms: u64,
    /// Search box debounce
    pub search_debounce_ms: u64,
    /// Instant-apply debounce
    pub instant_apply_ms: u64,
    /// Hover preview delay
    pub hover_preview_ms: u64,
    /// Default notification lifetime
    pub notification_timeout_ms: u64,
    /// Lists with more rows than this are never animated
    pub animate_cutover: usize,
    /// Row height used for slot placement
    pub row_height_px: u32,
    /// Total time a sort animation should take, spread over the visible rows
    pub sort_animation_total_ms: u64,
    /// Shortest per-row sort animation
    pub sort_animation_min_ms: u64,
    /// Longest per-row sort animation
    pub sort_animation_max_ms: u64,
}

impl Default for WmiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3356".to_string(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            sort_debounce_ms: DEFAULT_SORT_DEBOUNCE_MS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            instant_apply_ms: DEFAULT_INSTANT_APPLY_MS,
            hover_preview_ms: DEFAULT_HOVER_PREVIEW_MS,
            notification_timeout_ms: DEFAULT_NOTIFICATION_TIMEOUT_MS,
            animate_cutover: DEFAULT_ANIMATE_CUTOVER,
            row_height_px: DEFAULT_ROW_HEIGHT_PX,
            sort_animation_total_ms: 3_000,
            sort_animation_min_ms: 100,
            sort_animation_max_ms: 750,
        }
    }
}

impl WmiConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> WmiResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn load(path: &Path) -> WmiResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> WmiResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check the values make sense together
    pub fn validate(&self) -> WmiResult<()> {
        if self.base_url.is_empty() {
            return Err(WmiError::config("base_url must not be empty"));
        }
        if self.retry_delay_ms == 0 {
            return Err(WmiError::config("retry_delay_ms must be positive"));
        }
        if self.row_height_px == 0 {
            return Err(WmiError::config("row_height_px must be positive"));
        }
        if self.sort_animation_min_ms > self.sort_animation_max_ms {
            return Err(WmiError::config(
                "sort_animation_min_ms must not exceed sort_animation_max_ms",
            ));
        }
        Ok(())
    }

    /// Set the server base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the push retry delay
    #[must_use]
    pub const fn with_retry_delay(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Set the push grace period
    #[must_use]
    pub const fn with_grace_period(mut self, ms: u64) -> Self {
        self.grace_period_ms = ms;
        self
    }

    /// Set the deferred sort debounce
    #[must_use]
    pub const fn with_sort_debounce(mut self, ms: u64) -> Self {
        self.sort_debounce_ms = ms;
        self
    }

    /// Set the animation cutover
    #[must_use]
    pub const fn with_animate_cutover(mut self, rows: usize) -> Self {
        self.animate_cutover = rows;
        self
    }

    /// Set the default notification lifetime
    #[must_use]
    pub const fn with_notification_timeout(mut self, ms: u64) -> Self {
        self.notification_timeout_ms = ms;
        self
    }

    /// Retry delay as a [`Duration`]
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Grace period as a [`Duration`]
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Sort debounce as a [`Duration`]
    #[must_use]
    pub const fn sort_debounce(&self) -> Duration {
        Duration::from_millis(self.sort_debounce_ms)
    }

    /// Search debounce as a [`Duration`]
    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Instant-apply debounce as a [`Duration`]
    #[must_use]
    pub const fn instant_apply(&self) -> Duration {
        Duration::from_millis(self.instant_apply_ms)
    }

    /// Hover preview delay as a [`Duration`]
    #[must_use]
    pub const fn hover_preview(&self) -> Duration {
        Duration::from_millis(self.hover_preview_ms)
    }

    /// Notification lifetime as a [`Duration`]
    #[must_use]
    pub const fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}

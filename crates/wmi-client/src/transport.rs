//! HTTP transport
//!
//! Every request the client makes is a plain `GET` on a path of the WMI
//! server. The [`Transport`] trait is the network seam: [`HttpTransport`]
//! talks to a real server through `reqwest`, [`MockTransport`] replays
//! scripted replies and records what was requested.

use crate::result::{WmiError, WmiResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpReply {
    /// A 200 reply
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Turn a non-2xx reply into an error
    pub fn error_for_status(self, path: &str) -> WmiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(WmiError::Status {
                url: path.to_string(),
                status: self.status,
            })
        }
    }
}

/// Issues `GET` requests against the WMI server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `path` (absolute, starting with `/`). Only failures to obtain a
    /// reply are errors; any status is returned as a reply.
    async fn get(&self, path: &str) -> WmiResult<HttpReply>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `base_url`. No request timeout is set: the
    /// long poll blocks until the server has something to say.
    pub fn new(base_url: impl Into<String>) -> WmiResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WmiError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a transport with a custom client (cookies, TLS roots...)
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Server base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> WmiResult<HttpReply> {
        let url = format!("{}{path}", self.base_url);
        let transport_error = |e: reqwest::Error| WmiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        };
        let resp = self.client.get(&url).send().await.map_err(transport_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport_error)?;
        Ok(HttpReply { status, body })
    }
}

/// Pattern for matching request paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Exact path
    Exact(String),
    /// Path prefix
    Prefix(String),
    /// Any path
    Any,
}

impl PathPattern {
    /// Check whether `path` matches
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => path.starts_with(p.as_str()),
            Self::Any => true,
        }
    }
}

/// A scripted reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Reply after `delay_ms`
    Reply {
        /// Status code
        status: u16,
        /// Body
        body: String,
        /// Artificial latency
        delay_ms: u64,
    },
    /// Fail after `delay_ms`, as a dropped connection would
    Fail {
        /// Error message
        message: String,
        /// Artificial latency
        delay_ms: u64,
    },
    /// Never answer
    Hang,
}

impl MockReply {
    /// Immediate 200 reply
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Reply {
            status: 200,
            body: body.into(),
            delay_ms: 0,
        }
    }

    /// Immediate reply with a status
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Reply {
            status,
            body: String::new(),
            delay_ms: 0,
        }
    }

    /// Immediate connection failure
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            delay_ms: 0,
        }
    }

    /// Add latency
    #[must_use]
    pub fn after(self, ms: u64) -> Self {
        match self {
            Self::Reply { status, body, .. } => Self::Reply {
                status,
                body,
                delay_ms: ms,
            },
            Self::Fail { message, .. } => Self::Fail {
                message,
                delay_ms: ms,
            },
            Self::Hang => Self::Hang,
        }
    }
}

#[derive(Debug)]
struct MockRoute {
    pattern: PathPattern,
    replies: VecDeque<MockReply>,
    then: Option<MockReply>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<MockRoute>,
    requests: Vec<String>,
}

/// Scripted transport for tests and demos. Clones share their script and
/// their request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with no routes; every request fails
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for paths matching `pattern`, used in order; once
    /// consumed, `then` (if any) answers every further request.
    #[must_use]
    pub fn route(
        self,
        pattern: PathPattern,
        replies: impl IntoIterator<Item = MockReply>,
        then: Option<MockReply>,
    ) -> Self {
        self.lock().routes.push(MockRoute {
            pattern,
            replies: replies.into_iter().collect(),
            then,
        });
        self
    }

    /// Paths requested so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of requests whose path starts with `prefix`
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|p| p.starts_with(prefix))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self, path: &str) -> Option<MockReply> {
        let mut state = self.lock();
        state.requests.push(path.to_string());
        state
            .routes
            .iter_mut()
            .filter(|r| r.pattern.matches(path))
            .find_map(|r| r.replies.pop_front().or_else(|| r.then.clone()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str) -> WmiResult<HttpReply> {
        match self.next_reply(path) {
            Some(MockReply::Reply {
                status,
                body,
                delay_ms,
            }) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(HttpReply { status, body })
            }
            Some(MockReply::Fail { message, delay_ms }) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Err(WmiError::Transport {
                    url: path.to_string(),
                    message,
                })
            }
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(WmiError::Transport {
                url: path.to_string(),
                message: "no mock route".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_path_patterns() {
        assert!(PathPattern::Exact("/push".to_string()).matches("/push"));
        assert!(!PathPattern::Exact("/push".to_string()).matches("/push/x"));
        assert!(PathPattern::Prefix("/setup".to_string()).matches("/setup/users/"));
        assert!(PathPattern::Any.matches("/anything"));
    }

    #[test]
    fn test_error_for_status() {
        assert!(HttpReply::ok("DONE.").error_for_status("/setup/").is_ok());
        let err = HttpReply {
            status: 403,
            body: String::new(),
        }
        .error_for_status("/setup/")
        .unwrap_err();
        assert!(matches!(err, WmiError::Status { status: 403, .. }));
    }

    #[test]
    fn test_http_transport_strips_trailing_slash() {
        let transport = HttpTransport::new("http://localhost:3356/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:3356");
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_then_fallback() {
        let mock = MockTransport::new().route(
            PathPattern::Exact("/push".to_string()),
            [MockReply::ok("one"), MockReply::fail("reset")],
            Some(MockReply::status(502)),
        );
        assert_eq!(mock.get("/push").await.unwrap().body, "one");
        assert!(mock.get("/push").await.is_err());
        assert_eq!(mock.get("/push").await.unwrap().status, 502);
        assert_eq!(mock.get("/push").await.unwrap().status, 502);
        assert!(mock.get("/other").await.is_err());
        assert_eq!(mock.count("/push"), 4);
        assert_eq!(mock.requests().last().map(String::as_str), Some("/other"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency() {
        let mock = MockTransport::new().route(
            PathPattern::Any,
            [MockReply::ok("late").after(1_000)],
            None,
        );
        let start = tokio::time::Instant::now();
        mock.get("/x").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1_000));
    }
}

//! Wire contract with the WMI server
//!
//! Covers the push payload (`{"data": [{"method", "arguments"}]}`), the
//! path-encoded mutation requests and the replies they produce.
//!
//! Two legacy rules of the server are kept explicit here:
//!
//! - every push argument is JSON-encoded on its own by the server, so a
//!   string argument holding a JSON document is decoded once more;
//! - booleans travel as `"True"` or the empty string, because the server
//!   treats any non-empty string as true.

use crate::result::{WmiError, WmiResult};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire form of `true`
pub const WIRE_TRUE: &str = "True";
/// Wire form of `false`
pub const WIRE_FALSE: &str = "";

/// Encode a boolean the way the server expects it in a path segment
#[must_use]
pub const fn wire_bool(value: bool) -> &'static str {
    if value {
        WIRE_TRUE
    } else {
        WIRE_FALSE
    }
}

/// Decode a path-segment boolean: any non-empty string is true
#[must_use]
pub fn parse_wire_bool(segment: &str) -> bool {
    !segment.is_empty()
}

/// One remote invocation delivered over the push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCall {
    /// Name of the handler to run
    pub method: String,
    /// Positional arguments
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl PendingCall {
    /// Create a call
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Body of a `/push` reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    /// Calls to run, in order
    #[serde(default)]
    pub data: Vec<PendingCall>,
}

impl PushPayload {
    /// Decode a `/push` body into calls with their arguments unwrapped.
    /// A blank body is an empty payload.
    pub fn decode(body: &str) -> WmiResult<Vec<PendingCall>> {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let payload: Self =
            serde_json::from_str(body).map_err(|e| WmiError::MalformedPayload {
                message: e.to_string(),
            })?;
        Ok(payload
            .data
            .into_iter()
            .map(|call| PendingCall {
                arguments: call.arguments.iter().map(decode_argument).collect(),
                method: call.method,
            })
            .collect())
    }
}

/// Undo the per-argument JSON encoding done by the server. Strings that are
/// not valid JSON are kept verbatim.
#[must_use]
pub fn decode_argument(raw: &Value) -> Value {
    match raw {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| raw.clone()),
        other => other.clone(),
    }
}

/// Format of a massive export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Comma separated values
    Csv,
    /// XML document
    Xml,
}

impl ExportFormat {
    /// Path segment
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Xml => "XML",
        }
    }
}

/// A side-effecting request, issued as a plain `GET` with its arguments in
/// the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Change one field of one object
    Modify {
        /// Collection (`users`, `groups`, `machines`)
        collection: String,
        /// Object id
        id: String,
        /// Field name
        field: String,
        /// New value, already in wire form
        value: String,
    },
    /// Delete one object
    Delete {
        /// Collection
        collection: String,
        /// Object id
        id: String,
        /// Skip archiving the object's data
        no_archive: bool,
    },
    /// Delete many objects
    MassiveDelete {
        /// Collection
        collection: String,
        /// Object ids
        ids: Vec<String>,
        /// Skip archiving
        no_archive: bool,
    },
    /// Export many objects
    MassiveExport {
        /// Collection
        collection: String,
        /// Object ids
        ids: Vec<String>,
        /// Output format
        format: ExportFormat,
    },
    /// Reapply a home skeleton to many users
    MassiveSkel {
        /// User ids
        ids: Vec<String>,
        /// Skeleton name
        skel: String,
    },
    /// Toggle the lock of many users
    MassiveLock {
        /// User ids
        ids: Vec<String>,
    },
    /// Toggle the permissiveness of many groups
    MassivePermissiveness {
        /// Group ids
        ids: Vec<String>,
    },
    /// Open the mass edit view for many users
    MassiveEdit {
        /// User ids
        ids: Vec<String>,
    },
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn encode_ids(ids: &[String]) -> String {
    encode(&ids.join(","))
}

impl Mutation {
    /// Request path, relative to the server root
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Modify {
                collection,
                id,
                field,
                value,
            } => format!(
                "/{collection}/mod/{}/{}/{}",
                encode(id),
                encode(field),
                encode(value)
            ),
            Self::Delete {
                collection,
                id,
                no_archive,
            } => format!(
                "/{collection}/delete/{}/{}",
                encode(id),
                wire_bool(*no_archive)
            ),
            Self::MassiveDelete {
                collection,
                ids,
                no_archive,
            } => format!(
                "/{collection}/massive/delete/{}/{}",
                encode_ids(ids),
                wire_bool(*no_archive)
            ),
            Self::MassiveExport {
                collection,
                ids,
                format,
            } => format!(
                "/{collection}/massive/export/{}/{}",
                encode_ids(ids),
                format.as_str()
            ),
            Self::MassiveSkel { ids, skel } => {
                format!("/users/massive/skel/{}/{}", encode_ids(ids), encode(skel))
            }
            Self::MassiveLock { ids } => format!("/users/massive/lock/{}", encode_ids(ids)),
            Self::MassivePermissiveness { ids } => {
                format!("/groups/massive/permissiveness/{}", encode_ids(ids))
            }
            Self::MassiveEdit { ids } => format!("/users/massive/edit/{}", encode_ids(ids)),
        }
    }
}

/// Decoded reply to a mutation request
#[derive(Debug, Clone, PartialEq)]
pub enum MutationReply {
    /// Nothing to show
    Empty,
    /// Plain text to show in the banner
    Notification(String),
    /// Rendered fragment to splice into the page
    Fragment(String),
    /// JSON document, with its decoded `notif` field if any
    Json {
        /// Whole document
        value: Value,
        /// Banner message carried by the document
        notif: Option<String>,
    },
}

impl MutationReply {
    /// Classify a reply body
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                let notif = value
                    .get("notif")
                    .and_then(Value::as_str)
                    .and_then(decode_notif);
                return Self::Json { value, notif };
            }
        }
        if trimmed.starts_with('<') {
            Self::Fragment(body.to_string())
        } else {
            Self::Notification(trimmed.to_string())
        }
    }

    /// Message to show in the banner, if the reply carries one
    #[must_use]
    pub fn notification(&self) -> Option<&str> {
        match self {
            Self::Notification(text) => Some(text),
            Self::Json { notif, .. } => notif.as_deref(),
            Self::Empty | Self::Fragment(_) => None,
        }
    }
}

/// Decode a base64 `notif` field into text
#[must_use]
pub fn decode_notif(encoded: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    String::from_utf8(bytes).ok()
}

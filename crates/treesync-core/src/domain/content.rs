//! File contents and their remote body format
//!
//! The body of a file is stored remotely as its text, optionally followed by
//! a trailing comment that carries the structured parts:
//!
//! ```text
//! # My note
//! <!--treesync_data:
//! eyJwcm9wZXJ0aWVzIjoidGl0bGU6IE15IG5vdGVcbiJ9
//! -->
//! ```
//!
//! The payload is Base64 of a JSON object holding the non-empty parts among
//! `properties`, `discussions` and `comments`, wrapped every 50 characters.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DomainError;
use super::hashing::hash_without_hash_field;
use super::item::ItemType;
use super::sync_data::content_key;

const DATA_MARKER: &str = "<!--treesync_data:\n";
const DATA_END: &str = "\n-->";
const WRAP_WIDTH: usize = 50;

/// Body of a file item, keyed `<fileId>/content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// `<fileId>/content`
    pub id: String,
    /// Always [`ItemType::Content`]
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Markdown text
    pub text: String,
    /// Front-matter style properties (YAML text)
    #[serde(default)]
    pub properties: String,
    /// Discussion threads keyed by discussion id
    #[serde(default)]
    pub discussions: Map<String, Value>,
    /// Comments keyed by comment id
    #[serde(default)]
    pub comments: Map<String, Value>,
    /// Hash of the canonical form of the content
    #[serde(default)]
    pub hash: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EmbeddedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discussions: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comments: Option<Map<String, Value>>,
}

impl EmbeddedData {
    fn is_empty(&self) -> bool {
        self.properties.is_none() && self.discussions.is_none() && self.comments.is_none()
    }
}

impl Content {
    /// Creates an empty content for the given file id
    pub fn empty(file_id: &str) -> Self {
        Self {
            id: content_key(file_id),
            item_type: ItemType::Content,
            text: String::new(),
            properties: String::new(),
            discussions: Map::new(),
            comments: Map::new(),
            hash: 0,
        }
    }

    /// Creates a content with the given text and its hash computed
    ///
    /// # Errors
    /// Returns error if hashing fails
    pub fn with_text(file_id: &str, text: impl Into<String>) -> Result<Self, DomainError> {
        let mut content = Self::empty(file_id);
        content.text = text.into();
        content.with_computed_hash()
    }

    /// Returns the content with its hash set from its canonical form
    ///
    /// # Errors
    /// Returns error if a discussion or comment cannot be represented as JSON
    pub fn with_computed_hash(mut self) -> Result<Self, DomainError> {
        self.hash = hash_without_hash_field(&self)?;
        Ok(self)
    }

    /// Renders the remote body of this content
    ///
    /// # Errors
    /// Returns error if the embedded data cannot be serialized
    pub fn serialize(&self) -> Result<String, DomainError> {
        let data = EmbeddedData {
            properties: (!self.properties.trim().is_empty()).then(|| self.properties.clone()),
            discussions: (!self.discussions.is_empty()).then(|| self.discussions.clone()),
            comments: (!self.comments.is_empty()).then(|| self.comments.clone()),
        };

        let mut body = self.text.clone();
        if data.is_empty() {
            return Ok(body);
        }

        let json = serde_json::to_string(&data)
            .map_err(|e| DomainError::MalformedPayload(format!("Cannot serialize data: {e}")))?;
        let encoded = STANDARD.encode(json.as_bytes());
        let wrapped = encoded
            .as_bytes()
            .chunks(WRAP_WIDTH)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n");

        body.push_str(DATA_MARKER);
        body.push_str(&wrapped);
        body.push_str(DATA_END);
        Ok(body)
    }

    /// Parses a remote body into the content of `file_id`, computing its hash
    ///
    /// A malformed data block is not an error: the whole body is kept as text.
    ///
    /// # Errors
    /// Returns error only if hashing fails
    pub fn parse(body: &str, file_id: &str) -> Result<Self, DomainError> {
        let mut content = Self::empty(file_id);
        content.text = body.to_string();

        if let Some((text, data)) = extract_data(body) {
            content.text = text.to_string();
            if let Some(properties) = data.properties {
                content.properties = properties;
            }
            if let Some(discussions) = data.discussions {
                content.discussions = discussions;
            }
            if let Some(comments) = data.comments {
                content.comments = comments;
            }
        }

        content.with_computed_hash()
    }
}

/// Splits a body into its text and decoded data block, if a valid one is present
fn extract_data(body: &str) -> Option<(&str, EmbeddedData)> {
    if !body.ends_with("-->") {
        return None;
    }
    let start = body.rfind(DATA_MARKER)?;
    let payload = &body[start + DATA_MARKER.len()..body.len() - "-->".len()];
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD.decode(compact.as_bytes()).ok()?;
    let data: EmbeddedData = serde_json::from_slice(&decoded).ok()?;
    Some((&body[..start], data))
}

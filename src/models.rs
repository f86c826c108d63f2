//! Input/output DTOs and provider payload types
//!
//! Gmail REST payloads are modelled as typed structs with explicit optional
//! fields. Tool inputs carry `JsonSchema` for the advertised tool schemas.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::mime::RawMessage;

/// A single message header as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Inline body of a payload node
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartBody {
    /// Base64url-encoded content, absent for attachments and containers
    pub data: Option<String>,
}

/// Payload node of a provider message
///
/// The top-level payload and each entry of `parts` share this shape. Either
/// `parts` or an inline `body.data` carries the content; see
/// [`MessagePart::content`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<PartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

/// Borrowed view of where a payload node keeps its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadContent<'a> {
    /// Node is a container; content lives in the child parts
    Parts(&'a [MessagePart]),
    /// Node carries base64url data inline
    Inline(&'a str),
    /// Node has neither parts nor inline data
    Empty,
}

impl MessagePart {
    /// Classify the node; a present `parts` list wins over inline data
    pub fn content(&self) -> PayloadContent<'_> {
        match (&self.parts, self.inline_data()) {
            (Some(parts), _) => PayloadContent::Parts(parts),
            (None, Some(data)) => PayloadContent::Inline(data),
            (None, None) => PayloadContent::Empty,
        }
    }

    /// Inline base64url data, if this node has any
    pub fn inline_data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    /// Headers of this node, if the provider returned any
    pub fn headers(&self) -> Option<&[Header]> {
        self.headers.as_deref()
    }
}

/// Message resource returned by `users.messages.get`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
}

impl GmailMessage {
    /// Top-level headers of the message payload
    pub fn headers(&self) -> Option<&[Header]> {
        self.payload.as_ref().and_then(MessagePart::headers)
    }
}

/// Message reference returned by `users.messages.list`
///
/// Only the id is read; the full message is fetched separately.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// Response of `users.messages.list`
///
/// `messages` is omitted entirely when nothing matches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageRef>>,
}

/// Body of `users.drafts.create`
#[derive(Debug, Clone, Serialize)]
pub struct DraftRequest {
    pub message: DraftMessage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMessage {
    pub raw: RawMessage,
    pub thread_id: String,
}

/// Draft resource returned by `users.drafts.create`
///
/// Echoed back to the agent as the `create_draft_reply` success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<DraftMessageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMessageRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,
}

/// One listed unread message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender: String,
    pub snippet: String,
    /// Plain-text body, at most 500 characters
    pub body: String,
}

/// Input: `get_unread_emails`
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetUnreadEmailsInput {
    /// Maximum number of emails to fetch (default: 10)
    pub max_results: Option<f64>,
}

/// Input: `create_draft_reply`
///
/// Every field is optional at the serde level so that absent arguments are
/// reported through the error envelope rather than as a protocol error.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CreateDraftReplyInput {
    /// The ID of the message to reply to
    pub message_id: Option<String>,
    /// The thread ID of the conversation
    pub thread_id: Option<String>,
    /// The text content of the reply
    pub reply_body: Option<String>,
}

/// Response envelope produced by the dispatcher
///
/// Both variants hold serialized JSON text: the success payload, or an
/// `{"error": "<message>"}` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResponse {
    Success(String),
    Error(String),
}

impl ToolResponse {
    /// Serialize `payload` as pretty JSON, falling back to an error envelope
    pub fn success<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => Self::Success(text),
            Err(e) => Self::error(format!("serialization failure: {e}")),
        }
    }

    /// Build an `{"error": message}` envelope
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(serde_json::json!({ "error": message.into() }).to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{GmailMessage, PayloadContent, ToolResponse};

    #[test]
    fn deserializes_provider_message_with_nested_parts() {
        let raw = serde_json::json!({
            "id": "m1",
            "threadId": "t1",
            "snippet": "hi",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [{ "name": "Subject", "value": "Hello" }],
                "body": { "size": 0 },
                "parts": [
                    { "mimeType": "text/plain", "body": { "size": 5, "data": "aGVsbG8=" } }
                ]
            }
        });
        let msg: GmailMessage = serde_json::from_value(raw).expect("valid message");
        assert_eq!(msg.thread_id, "t1");
        assert_eq!(msg.headers().map(<[_]>::len), Some(1));

        let payload = msg.payload.expect("payload present");
        match payload.content() {
            PayloadContent::Parts(parts) => {
                assert_eq!(parts.len(), 1);
                assert_eq!(parts[0].content(), PayloadContent::Inline("aGVsbG8="));
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn empty_parts_list_is_still_a_container() {
        let payload: super::MessagePart = serde_json::from_value(serde_json::json!({
            "parts": [],
            "body": { "data": "aGVsbG8=" }
        }))
        .expect("valid payload");
        assert_eq!(payload.content(), PayloadContent::Parts(&[]));
    }

    #[test]
    fn error_envelope_is_a_json_object() {
        let resp = ToolResponse::error("Unknown tool: nope");
        assert!(resp.is_error());
        let parsed: serde_json::Value = serde_json::from_str(resp.text()).expect("json");
        assert_eq!(parsed["error"], "Unknown tool: nope");
    }
}

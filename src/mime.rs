//! MIME encoding and payload body decoding
//!
//! Builds the single-part `text/plain` reply that is handed to the provider
//! as a draft, and extracts a bounded plain-text body from provider payloads.
//! Header and body formatting is delegated to `lettre`'s message types so
//! that non-ASCII subjects and bodies get standard encodings.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use lettre::message::SinglePart;
use lettre::message::header::{
    HeaderName, HeaderValue, Headers, InReplyTo, MIME_VERSION_1_0, References, Subject,
};
use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::models::{MessagePart, PayloadContent};
use crate::recipient;

/// Maximum characters of decoded body text kept per listed message
pub const BODY_MAX_CHARS: usize = 500;

/// Base64url engine used for provider payloads
///
/// Encodes with padding; decodes with or without it, since the provider is not
/// consistent about trailing `=`.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Base64url-encoded RFC 5322 message, ready for `users.drafts.create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawMessage(String);

impl RawMessage {
    fn from_mime_bytes(bytes: &[u8]) -> Self {
        Self(GMAIL_BASE64.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outgoing reply content, before encoding
#[derive(Debug, Clone, Default)]
pub struct OutgoingReply<'a> {
    pub recipient: &'a str,
    pub subject: Option<&'a str>,
    pub body: Option<&'a str>,
    pub in_reply_to: Option<&'a str>,
    pub references: Option<&'a str>,
}

/// Encode a reply as a base64url RFC 5322 message
///
/// The recipient is sanitized again here regardless of what the caller did,
/// and the sanitized value is written to `To` verbatim.
///
/// # Errors
///
/// - `InvalidRecipient` if the recipient does not sanitize to an address
pub fn encode_reply(reply: &OutgoingReply<'_>) -> AppResult<RawMessage> {
    let to = recipient::sanitize(reply.recipient).ok_or(AppError::InvalidRecipient)?;

    let mut headers = Headers::new();
    headers.insert_raw(HeaderValue::new(
        HeaderName::new_from_ascii_str("To"),
        to.to_string(),
    ));
    headers.set(Subject::from(reply.subject.unwrap_or_default().to_owned()));
    if let Some(in_reply_to) = reply.in_reply_to.filter(|v| !v.is_empty()) {
        headers.set(InReplyTo::from(in_reply_to.to_owned()));
    }
    if let Some(references) = reply.references.filter(|v| !v.is_empty()) {
        headers.set(References::from(references.to_owned()));
    }
    headers.set(MIME_VERSION_1_0);

    let body = SinglePart::plain(reply.body.unwrap_or_default().to_owned());

    let mut bytes = headers.to_string().into_bytes();
    bytes.extend_from_slice(&body.formatted());
    Ok(RawMessage::from_mime_bytes(&bytes))
}

/// Extract the plain-text body of a payload, truncated to [`BODY_MAX_CHARS`]
///
/// A container payload yields the first direct `text/plain` child that has
/// inline data; nested containers are not searched. A leaf payload yields its
/// own inline data.
///
/// # Errors
///
/// - `PayloadDecode` if the chosen data is not base64url or not UTF-8
pub fn decode_body(payload: &MessagePart) -> AppResult<String> {
    let data = match payload.content() {
        PayloadContent::Parts(parts) => parts
            .iter()
            .filter(|part| part.mime_type.as_deref() == Some("text/plain"))
            .find_map(MessagePart::inline_data),
        PayloadContent::Inline(data) => Some(data),
        PayloadContent::Empty => None,
    };

    match data {
        Some(data) => Ok(truncate_chars(decode_data(data)?, BODY_MAX_CHARS)),
        None => Ok(String::new()),
    }
}

/// Decode base64url inline data into UTF-8 text
fn decode_data(data: &str) -> AppResult<String> {
    let bytes = GMAIL_BASE64
        .decode(data)
        .map_err(|e| AppError::PayloadDecode(format!("invalid base64url data: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::PayloadDecode(format!("body is not valid UTF-8: {e}")))
}

/// Truncate string to maximum characters (Unicode-aware)
///
/// Preserves complete characters, never splitting multi-byte sequences.
pub fn truncate_chars(input: String, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => input[..cut].to_owned(),
        None => input,
    }
}

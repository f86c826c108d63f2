//! Reply composition
//!
//! Derives the recipient, subject, and threading headers of a reply from the
//! headers of the message being answered. `In-Reply-To` names the immediate
//! parent and `References` accumulates the ancestor chain; mail clients need
//! both to group the draft into the original thread.

use crate::errors::{AppError, AppResult};
use crate::headers::header_value;
use crate::models::Header;
use crate::recipient::{self, EmailAddress};

/// Headers requested from the provider when replying
pub const REPLY_METADATA_HEADERS: [&str; 5] =
    ["From", "Reply-To", "Subject", "Message-ID", "References"];

/// Everything needed to encode a threaded reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub recipient: EmailAddress,
    pub subject: String,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

/// Build the reply context for a message with the given headers
///
/// # Errors
///
/// - `RecipientResolution` if neither `Reply-To` nor `From` holds a usable
///   address
pub fn compose_reply(headers: Option<&[Header]>) -> AppResult<ReplyContext> {
    let recipient = recipient::sanitize(header_value(headers, "Reply-To"))
        .or_else(|| recipient::sanitize(header_value(headers, "From")))
        .ok_or(AppError::RecipientResolution)?;

    let subject = reply_subject(header_value(headers, "Subject"));

    let in_reply_to = non_empty(header_value(headers, "Message-ID"));
    let references = non_empty(header_value(headers, "References"));
    let references = match (&in_reply_to, references) {
        (Some(parent), Some(chain)) => Some(format!("{chain} {parent}").trim().to_owned()),
        (Some(parent), None) => Some(parent.clone()),
        (None, chain) => chain,
    };

    Ok(ReplyContext {
        recipient,
        subject,
        in_reply_to,
        references,
    })
}

/// Prefix `Re: ` unless the subject already starts with `re:` in any case
fn reply_subject(original: &str) -> String {
    let already_reply = original
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        original.to_owned()
    } else {
        format!("Re: {original}").trim().to_owned()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

//! Recipient sanitization
//!
//! Reduces an arbitrary address header (`Reply-To`, `From`) to at most one
//! plain email address. Parsing goes through `mailparse::addrparse` first.
//! Headers the parser rejects are read from their `<...>` section, and only a
//! header with no address structure at all falls back to a pattern scan. The
//! single candidate is then validated once; a rejected candidate is never
//! replaced by a fragment found elsewhere in the header.
//!
//! Only the first valid address is ever returned, even for comma-separated
//! lists: outgoing drafts are single-recipient.

use std::fmt;
use std::sync::LazyLock;

use mailparse::MailAddr;
use regex::Regex;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("email pattern compiles")
});

/// A single validated email address
///
/// Only produced by [`sanitize`], so it always holds exactly one `@`, no
/// whitespace, and a value `mailparse` accepts as an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce `raw` to a single valid address, or `None`
pub fn sanitize(raw: &str) -> Option<EmailAddress> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    candidate_address(raw)
        .filter(|addr| is_valid_address(addr))
        .map(EmailAddress)
}

/// The one address-like value a header offers, before validation
fn candidate_address(raw: &str) -> Option<String> {
    first_parsed_address(raw)
        .or_else(|| bracketed_address(raw))
        .or_else(|| EMAIL_PATTERN.find(raw).map(|m| m.as_str().to_owned()))
}

/// Content of the first `<...>` section; an unterminated one runs to the end
fn bracketed_address(raw: &str) -> Option<String> {
    let (_, rest) = raw.split_once('<')?;
    let inner = rest.split_once('>').map_or(rest, |(inner, _)| inner).trim();
    (!inner.is_empty()).then(|| inner.to_owned())
}

/// Check whether `value` is usable as a single `To` address
///
/// The whitespace check covers the whole input, not just the parsed address,
/// so `"a b@c.com"` is rejected.
pub fn is_valid_address(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    first_parsed_address(value).is_some_and(|addr| has_single_at(&addr))
}

/// Address portion of the first entry in an address list
///
/// For a group, the first member is used.
fn first_parsed_address(raw: &str) -> Option<String> {
    let first = mailparse::addrparse(raw).ok()?.into_inner().into_iter().next()?;
    let addr = match first {
        MailAddr::Single(info) => info.addr,
        MailAddr::Group(group) => group.addrs.into_iter().next()?.addr,
    };
    let addr = addr.trim();
    (!addr.is_empty()).then(|| addr.to_owned())
}

fn has_single_at(addr: &str) -> bool {
    addr.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && !domain.is_empty() && !domain.contains('@')
    })
}

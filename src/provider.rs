//! Mailbox provider abstraction
//!
//! The dispatcher only talks to the mailbox through this trait, which lets
//! tests substitute an in-memory provider for the Gmail client.

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::mime::RawMessage;
use crate::models::{DraftRecord, GmailMessage};

/// Detail level requested when fetching a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Headers, snippet, and the full body tree
    Full,
    /// Headers only, optionally restricted to named headers
    Metadata,
}

impl MessageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Metadata => "metadata",
        }
    }
}

/// Remote mailbox operations used by the tools
///
/// Implementations report every failure as an opaque `AppError`; callers
/// never retry.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Ids of unread messages, newest first, single page of at most `max_results`
    async fn list_unread_message_ids(&self, max_results: u32) -> AppResult<Vec<String>>;

    /// Fetch one message; `header_names` only applies to [`MessageFormat::Metadata`]
    async fn get_message(
        &self,
        id: &str,
        format: MessageFormat,
        header_names: &[&str],
    ) -> AppResult<GmailMessage>;

    /// Store `raw` as a draft in `thread_id`
    async fn create_draft(&self, raw: &RawMessage, thread_id: &str) -> AppResult<DraftRecord>;
}

//! Tool dispatch
//!
//! Routes a tool name plus raw JSON arguments to the matching operation and
//! always answers with a [`ToolResponse`]. Argument validation, provider
//! failures, and composition errors are all rendered into the
//! `{"error": ...}` envelope here; nothing propagates past this boundary.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::MAX_RESULTS_LIMIT;
use crate::errors::{AppError, AppResult};
use crate::headers::header_value;
use crate::mime::{self, OutgoingReply};
use crate::models::{
    CreateDraftReplyInput, DraftRecord, EmailSummary, GetUnreadEmailsInput, ToolResponse,
};
use crate::provider::{MailProvider, MessageFormat};
use crate::reply::{self, REPLY_METADATA_HEADERS};

pub const GET_UNREAD_EMAILS: &str = "get_unread_emails";
pub const CREATE_DRAFT_REPLY: &str = "create_draft_reply";

/// Tool dispatcher over an injected mailbox provider
pub struct Dispatcher<P> {
    provider: Arc<P>,
    /// Page size used when `max_results` is omitted
    default_max_results: u32,
}

impl<P> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            default_max_results: self.default_max_results,
        }
    }
}

impl<P: MailProvider> Dispatcher<P> {
    pub fn new(provider: Arc<P>, default_max_results: u32) -> Self {
        Self {
            provider,
            default_max_results,
        }
    }

    /// Run the tool `name` with `arguments`
    ///
    /// Unknown names yield `{"error": "Unknown tool: <name>"}`.
    pub async fn dispatch(&self, name: &str, arguments: Map<String, Value>) -> ToolResponse {
        let started = Instant::now();
        let response = match name {
            GET_UNREAD_EMAILS => match parse_args::<GetUnreadEmailsInput>(name, arguments) {
                Ok(input) => self.get_unread_emails(input).await,
                Err(e) => ToolResponse::error(e.to_string()),
            },
            CREATE_DRAFT_REPLY => match parse_args::<CreateDraftReplyInput>(name, arguments) {
                Ok(input) => self.create_draft_reply(input).await,
                Err(e) => ToolResponse::error(e.to_string()),
            },
            _ => ToolResponse::error(format!("Unknown tool: {name}")),
        };
        tracing::debug!(
            tool = name,
            is_error = response.is_error(),
            duration_ms = duration_ms(started),
            "tool call finished"
        );
        response
    }

    /// Tool: list unread messages with a bounded plain-text body
    ///
    /// Provider and decode failures degrade to an empty list.
    async fn get_unread_emails(&self, input: GetUnreadEmailsInput) -> ToolResponse {
        let max_results = match resolve_max_results(input.max_results, self.default_max_results) {
            Ok(n) => n,
            Err(e) => return ToolResponse::error(e.to_string()),
        };

        match self.list_unread(max_results).await {
            Ok(emails) => ToolResponse::success(&emails),
            Err(e) => {
                tracing::warn!(
                    code = e.code(),
                    error = %e,
                    "unread listing failed, returning empty list"
                );
                ToolResponse::success(&Vec::<EmailSummary>::new())
            }
        }
    }

    async fn list_unread(&self, max_results: u32) -> AppResult<Vec<EmailSummary>> {
        let ids = self.provider.list_unread_message_ids(max_results).await?;
        let mut emails = Vec::with_capacity(ids.len());
        for id in &ids {
            let message = self
                .provider
                .get_message(id, MessageFormat::Full, &[])
                .await?;
            let headers = message.headers();
            let body = match &message.payload {
                Some(payload) => mime::decode_body(payload)?,
                None => String::new(),
            };
            emails.push(EmailSummary {
                subject: or_default(header_value(headers, "Subject"), "No Subject"),
                sender: or_default(header_value(headers, "From"), "Unknown"),
                snippet: message.snippet.clone().unwrap_or_default(),
                body,
                id: message.id,
                thread_id: message.thread_id,
            });
        }
        Ok(emails)
    }

    /// Tool: draft a threaded reply to an existing message
    async fn create_draft_reply(&self, input: CreateDraftReplyInput) -> ToolResponse {
        let missing: Vec<&str> = [
            ("message_id", &input.message_id),
            ("thread_id", &input.thread_id),
            ("reply_body", &input.reply_body),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return ToolResponse::error(AppError::MissingArgument(missing.join(", ")).to_string());
        }

        let message_id = input.message_id.unwrap_or_default();
        let thread_id = input.thread_id.unwrap_or_default();
        let reply_body = input.reply_body.unwrap_or_default();

        match self.draft_reply(&message_id, &thread_id, &reply_body).await {
            Ok(draft) => {
                tracing::info!(
                    draft_id = %draft.id,
                    message_id = %message_id,
                    thread_id = %thread_id,
                    "draft reply created"
                );
                ToolResponse::success(&draft)
            }
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, message_id = %message_id, "draft reply failed");
                ToolResponse::error(format!("Tool execution failed: {e}"))
            }
        }
    }

    async fn draft_reply(
        &self,
        message_id: &str,
        thread_id: &str,
        reply_body: &str,
    ) -> AppResult<DraftRecord> {
        let original = self
            .provider
            .get_message(message_id, MessageFormat::Metadata, &REPLY_METADATA_HEADERS)
            .await?;
        let context = reply::compose_reply(original.headers())?;
        let raw = mime::encode_reply(&OutgoingReply {
            recipient: context.recipient.as_str(),
            subject: Some(context.subject.as_str()),
            body: Some(reply_body),
            in_reply_to: context.in_reply_to.as_deref(),
            references: context.references.as_deref(),
        })?;
        self.provider.create_draft(&raw, thread_id).await
    }
}

/// Deserialize tool arguments, reporting type mismatches as `InvalidInput`
fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Map<String, Value>) -> AppResult<T> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|e| AppError::invalid(format!("invalid arguments for {tool}: {e}")))
}

/// Truncate a JSON number to a page size within `1..=MAX_RESULTS_LIMIT`
fn resolve_max_results(requested: Option<f64>, default: u32) -> AppResult<u32> {
    let Some(value) = requested else {
        return Ok(default);
    };
    let truncated = value.trunc();
    if !(1.0..=f64::from(MAX_RESULTS_LIMIT)).contains(&truncated) {
        return Err(AppError::invalid(format!(
            "max_results must be between 1 and {MAX_RESULTS_LIMIT}"
        )));
    }
    Ok(truncated as u32)
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}

/// Calculate elapsed milliseconds
fn duration_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE;
    use serde_json::{Map, Value, json};

    use super::{Dispatcher, resolve_max_results};
    use crate::errors::{AppError, AppResult};
    use crate::mime::RawMessage;
    use crate::models::{DraftMessageRef, DraftRecord, GmailMessage, ToolResponse};
    use crate::provider::{MailProvider, MessageFormat};

    #[derive(Default)]
    struct FakeProvider {
        unread: Vec<String>,
        messages: HashMap<String, GmailMessage>,
        fail_listing: bool,
        list_calls: Mutex<Vec<u32>>,
        get_calls: Mutex<Vec<(String, MessageFormat, Vec<String>)>>,
        drafts: Mutex<Vec<(RawMessage, String)>>,
    }

    impl FakeProvider {
        fn with_message(mut self, value: Value) -> Self {
            let msg: GmailMessage = serde_json::from_value(value).expect("valid message");
            self.unread.push(msg.id.clone());
            self.messages.insert(msg.id.clone(), msg);
            self
        }

        fn drafts(&self) -> Vec<(RawMessage, String)> {
            self.drafts.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl MailProvider for FakeProvider {
        async fn list_unread_message_ids(&self, max_results: u32) -> AppResult<Vec<String>> {
            self.list_calls.lock().expect("lock").push(max_results);
            if self.fail_listing {
                return Err(AppError::Provider("backend unavailable".to_owned()));
            }
            Ok(self
                .unread
                .iter()
                .take(max_results as usize)
                .cloned()
                .collect())
        }

        async fn get_message(
            &self,
            id: &str,
            format: MessageFormat,
            header_names: &[&str],
        ) -> AppResult<GmailMessage> {
            self.get_calls.lock().expect("lock").push((
                id.to_owned(),
                format,
                header_names.iter().map(|h| (*h).to_owned()).collect(),
            ));
            self.messages
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::Provider(format!("message {id} not found")))
        }

        async fn create_draft(&self, raw: &RawMessage, thread_id: &str) -> AppResult<DraftRecord> {
            let mut drafts = self.drafts.lock().expect("lock");
            drafts.push((raw.clone(), thread_id.to_owned()));
            Ok(DraftRecord {
                id: format!("r-{}", drafts.len()),
                message: Some(DraftMessageRef {
                    id: "m-draft".to_owned(),
                    thread_id: Some(thread_id.to_owned()),
                    label_ids: Some(vec!["DRAFT".to_owned()]),
                }),
            })
        }
    }

    fn b64(text: &str) -> String {
        URL_SAFE.encode(text.as_bytes())
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn dispatcher(provider: FakeProvider) -> (Dispatcher<FakeProvider>, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (Dispatcher::new(Arc::clone(&provider), 10), provider)
    }

    fn error_message(resp: &ToolResponse) -> String {
        assert!(resp.is_error(), "expected error, got {}", resp.text());
        let parsed: Value = serde_json::from_str(resp.text()).expect("json");
        parsed["error"].as_str().expect("error string").to_owned()
    }

    fn reply_target(headers: Value) -> Value {
        json!({
            "id": "m1",
            "threadId": "t1",
            "payload": { "headers": headers }
        })
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_in_envelope() {
        let (d, _) = dispatcher(FakeProvider::default());
        let resp = d.dispatch("delete_everything", Map::new()).await;
        assert_eq!(error_message(&resp), "Unknown tool: delete_everything");
    }

    #[tokio::test]
    async fn lists_unread_messages_in_provider_order() {
        let provider = FakeProvider::default()
            .with_message(json!({
                "id": "a",
                "threadId": "ta",
                "snippet": "first",
                "payload": {
                    "headers": [
                        { "name": "Subject", "value": "Hello" },
                        { "name": "From", "value": "Jane <jane@example.com>" }
                    ],
                    "parts": [
                        { "mimeType": "text/html", "body": { "data": b64("<b>x</b>") } },
                        { "mimeType": "text/plain", "body": { "data": b64("plain body") } }
                    ]
                }
            }))
            .with_message(json!({ "id": "b", "threadId": "tb", "payload": {} }));
        let (d, provider) = dispatcher(provider);

        let resp = d.dispatch("get_unread_emails", Map::new()).await;
        assert!(!resp.is_error());
        let emails: Value = serde_json::from_str(resp.text()).expect("json");
        assert_eq!(emails[0]["id"], "a");
        assert_eq!(emails[0]["threadId"], "ta");
        assert_eq!(emails[0]["subject"], "Hello");
        assert_eq!(emails[0]["sender"], "Jane <jane@example.com>");
        assert_eq!(emails[0]["snippet"], "first");
        assert_eq!(emails[0]["body"], "plain body");
        assert_eq!(emails[1]["subject"], "No Subject");
        assert_eq!(emails[1]["sender"], "Unknown");
        assert_eq!(emails[1]["snippet"], "");
        assert_eq!(emails[1]["body"], "");

        assert_eq!(*provider.list_calls.lock().expect("lock"), vec![10]);
        let gets = provider.get_calls.lock().expect("lock");
        assert_eq!(gets.len(), 2);
        assert!(gets.iter().all(|(_, format, _)| *format == MessageFormat::Full));
        assert!(resp.text().contains("\n  "), "payload is pretty-printed");
    }

    #[tokio::test]
    async fn listing_failure_degrades_to_empty_list() {
        let (d, _) = dispatcher(FakeProvider {
            fail_listing: true,
            ..Default::default()
        });
        let resp = d.dispatch("get_unread_emails", Map::new()).await;
        assert!(!resp.is_error());
        assert_eq!(resp.text(), "[]");
    }

    #[tokio::test]
    async fn undecodable_body_degrades_to_empty_list() {
        let provider = FakeProvider::default().with_message(json!({
            "id": "a",
            "threadId": "ta",
            "payload": { "body": { "data": "_w==" } }
        }));
        let (d, _) = dispatcher(provider);
        let resp = d.dispatch("get_unread_emails", Map::new()).await;
        assert_eq!(resp.text(), "[]");
    }

    #[tokio::test]
    async fn max_results_is_truncated_and_range_checked() {
        let (d, provider) = dispatcher(FakeProvider::default());
        let resp = d
            .dispatch("get_unread_emails", args(json!({ "max_results": 3.9 })))
            .await;
        assert!(!resp.is_error());
        assert_eq!(*provider.list_calls.lock().expect("lock"), vec![3]);

        for bad in [json!(0), json!(0.5), json!(501), json!(-2)] {
            let resp = d
                .dispatch("get_unread_emails", args(json!({ "max_results": bad })))
                .await;
            assert!(error_message(&resp).contains("max_results"), "input {bad}");
        }

        let resp = d
            .dispatch("get_unread_emails", args(json!({ "max_results": "ten" })))
            .await;
        assert!(error_message(&resp).starts_with("invalid arguments for get_unread_emails: "));
    }

    #[test]
    fn max_results_defaults_when_absent() {
        assert_eq!(resolve_max_results(None, 25).expect("default"), 25);
        assert_eq!(resolve_max_results(Some(500.0), 10).expect("upper bound"), 500);
        assert!(resolve_max_results(Some(f64::NAN), 10).is_err());
    }

    #[tokio::test]
    async fn missing_draft_arguments_are_named_without_provider_calls() {
        let (d, provider) = dispatcher(FakeProvider::default());
        let resp = d
            .dispatch("create_draft_reply", args(json!({ "thread_id": "t1", "reply_body": "" })))
            .await;
        assert_eq!(
            error_message(&resp),
            "Missing required parameters: message_id, reply_body"
        );
        assert!(provider.get_calls.lock().expect("lock").is_empty());
        assert!(provider.drafts().is_empty());
    }

    #[tokio::test]
    async fn creates_threaded_draft_reply() {
        let provider = FakeProvider::default().with_message(reply_target(json!([
            { "name": "From", "value": "Jane Doe <jane@example.com>" },
            { "name": "Subject", "value": "Lunch" },
            { "name": "Message-ID", "value": "<1@example.com>" }
        ])));
        let (d, provider) = dispatcher(provider);

        let resp = d
            .dispatch(
                "create_draft_reply",
                args(json!({ "message_id": "m1", "thread_id": "t1", "reply_body": "Sounds good" })),
            )
            .await;
        assert!(!resp.is_error(), "{}", resp.text());
        let draft: Value = serde_json::from_str(resp.text()).expect("json");
        assert_eq!(draft["id"], "r-1");
        assert_eq!(draft["message"]["threadId"], "t1");

        let gets = provider.get_calls.lock().expect("lock").clone();
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0].1, MessageFormat::Metadata);
        assert_eq!(
            gets[0].2,
            vec!["From", "Reply-To", "Subject", "Message-ID", "References"]
        );

        let drafts = provider.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].1, "t1");
        let mime = URL_SAFE.decode(drafts[0].0.as_str()).expect("base64url");
        let mime = String::from_utf8(mime).expect("utf-8");
        assert!(mime.contains("To: jane@example.com"));
        assert!(mime.contains("Subject: Re: Lunch"));
        assert!(mime.contains("In-Reply-To: <1@example.com>"));
        assert!(mime.contains("References: <1@example.com>"));
        assert!(mime.contains("Sounds good"));
    }

    #[tokio::test]
    async fn unresolvable_recipient_fails_without_creating_draft() {
        let provider = FakeProvider::default().with_message(reply_target(json!([
            { "name": "Reply-To", "value": "" },
            { "name": "From", "value": "Mailer Daemon" },
            { "name": "Subject", "value": "Bounce" }
        ])));
        let (d, provider) = dispatcher(provider);

        let resp = d
            .dispatch(
                "create_draft_reply",
                args(json!({ "message_id": "m1", "thread_id": "t1", "reply_body": "hi" })),
            )
            .await;
        let message = error_message(&resp);
        assert!(message.starts_with("Tool execution failed: "));
        assert!(message.contains("could not extract a valid recipient"));
        assert!(provider.drafts().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_execution_error() {
        let (d, provider) = dispatcher(FakeProvider::default());
        let resp = d
            .dispatch(
                "create_draft_reply",
                args(json!({ "message_id": "gone", "thread_id": "t1", "reply_body": "hi" })),
            )
            .await;
        let message = error_message(&resp);
        assert!(message.starts_with("Tool execution failed: provider error"));
        assert!(provider.drafts().is_empty());
    }
}

//! MCP server implementation
//!
//! Implements the `ServerHandler` trait directly instead of through the tool
//! router macros: every `tools/call`, including unknown names and calls with
//! missing arguments, is forwarded to the [`Dispatcher`] so that failures come
//! back as `{"error": ...}` tool results rather than protocol errors.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, JsonObject, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use schemars::JsonSchema;

use crate::dispatch::{CREATE_DRAFT_REPLY, Dispatcher, GET_UNREAD_EMAILS};
use crate::models::{CreateDraftReplyInput, GetUnreadEmailsInput, ToolResponse};
use crate::provider::MailProvider;

/// Gmail MCP server
///
/// Thin protocol adapter around a [`Dispatcher`]; holds no state of its own.
pub struct GmailMcpServer<P> {
    dispatcher: Dispatcher<P>,
}

impl<P> Clone for GmailMcpServer<P> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<P: MailProvider> GmailMcpServer<P> {
    pub fn new(dispatcher: Dispatcher<P>) -> Self {
        Self { dispatcher }
    }
}

impl<P: MailProvider + 'static> ServerHandler for GmailMcpServer<P> {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Gmail MCP server. Lists unread messages and creates threaded reply drafts; drafts are never sent.".to_owned(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let response = self
            .dispatcher
            .dispatch(&request.name, request.arguments.unwrap_or_default())
            .await;
        Ok(to_call_result(response))
    }
}

/// Advertised tools with their input schemas
pub fn tool_definitions() -> Vec<Tool> {
    let mut draft_schema = input_schema::<CreateDraftReplyInput>();
    draft_schema.insert(
        "required".to_owned(),
        serde_json::json!(["message_id", "thread_id", "reply_body"]),
    );

    vec![
        Tool::new(
            GET_UNREAD_EMAILS,
            "Retrieve unread emails from Gmail",
            Arc::new(input_schema::<GetUnreadEmailsInput>()),
        ),
        Tool::new(
            CREATE_DRAFT_REPLY,
            "Create a draft reply to an email",
            Arc::new(draft_schema),
        ),
    ]
}

fn input_schema<T: JsonSchema>() -> JsonObject {
    schemars::schema_for!(T)
        .as_object()
        .cloned()
        .unwrap_or_default()
}

/// Wrap the dispatcher's JSON text in a single text content item
fn to_call_result(response: ToolResponse) -> CallToolResult {
    let content = vec![Content::text(response.text())];
    if response.is_error() {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

#[cfg(test)]
mod tests {
    use super::{to_call_result, tool_definitions};
    use crate::models::ToolResponse;

    #[test]
    fn advertises_both_tools() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["get_unread_emails", "create_draft_reply"]);

        let listing = &tools[0].input_schema;
        assert!(listing["properties"].get("max_results").is_some());
    }

    #[test]
    fn draft_reply_schema_requires_all_arguments() {
        let tools = tool_definitions();
        let schema = &tools[1].input_schema;
        assert_eq!(
            schema["required"],
            serde_json::json!(["message_id", "thread_id", "reply_body"])
        );
        for field in ["message_id", "thread_id", "reply_body"] {
            assert!(schema["properties"].get(field).is_some(), "{field}");
        }
    }

    #[test]
    fn error_envelope_is_flagged() {
        let ok = to_call_result(ToolResponse::Success("[]".to_owned()));
        assert_eq!(ok.is_error, Some(false));

        let err = to_call_result(ToolResponse::error("Unknown tool: x"));
        assert_eq!(err.is_error, Some(true));
        assert_eq!(err.content.len(), 1);
    }
}

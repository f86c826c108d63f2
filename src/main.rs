//! gmail-mcp-rs: Gmail reply-drafting MCP server over stdio
//!
//! This server lets an agent read unread Gmail messages and prepare threaded
//! reply drafts via the Model Context Protocol (MCP) over stdio. Drafts are
//! stored in the mailbox and never sent.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading and stdio serving
//! - [`config`]: Environment-driven OAuth credentials and server settings
//! - [`errors`]: Application error model rendered into tool error envelopes
//! - [`gmail`]: Gmail REST client with token refresh
//! - [`provider`]: Mailbox provider trait consumed by the dispatcher
//! - [`dispatch`]: Tool routing, argument validation, and orchestration
//! - [`server`]: MCP protocol adapter and tool schemas
//! - [`models`]: Provider payloads, tool inputs, and response DTOs
//! - [`headers`]: Header lookup over provider header lists
//! - [`recipient`]: Reply address sanitization
//! - [`reply`]: Reply subject, recipient, and threading header derivation
//! - [`mime`]: Reply MIME encoding and payload body decoding

mod config;
mod dispatch;
mod errors;
mod gmail;
mod headers;
mod mime;
mod models;
mod provider;
mod recipient;
mod reply;
mod server;

use std::sync::Arc;

use config::ServerConfig;
use dispatch::Dispatcher;
use gmail::GmailClient;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

/// Application entry point
///
/// Initializes tracing from environment, loads config, authenticates against
/// Gmail once, and serves the MCP server over stdio. This process expects to
/// be spawned by an MCP client via `stdio` transport.
///
/// # Environment Variables
///
/// See [`ServerConfig::load_from_env`] for full configuration options.
///
/// # Example
///
/// ```no_run
/// GMAIL_MCP_TOKEN_FILE=~/.config/gmail-mcp/token.json \
/// cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::load_from_env()?;
    let client = GmailClient::connect(&config).await?;
    let dispatcher = Dispatcher::new(Arc::new(client), config.default_max_results);
    let service = server::GmailMcpServer::new(dispatcher)
        .serve(stdio())
        .await?;
    service.waiting().await?;
    Ok(())
}

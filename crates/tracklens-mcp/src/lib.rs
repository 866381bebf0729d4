//! MCP (Model Context Protocol) server for tracklens.
//!
//! Exposes the Jira and GitLab providers as MCP tools over stdio. Tool
//! results are Markdown; resolution failures come back as error results
//! carrying the alternatives the agent can retry with.

pub mod format;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use handlers::ToolHandler;
pub use server::McpServer;

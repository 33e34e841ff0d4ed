//! Error handling utilities for the MCP server

use std::fmt::Display;

use rmcp::ErrorData;

/// Wrap a tracker or edit failure into an MCP error with some context.
pub fn to_mcp_error(message: &str, error: impl Display) -> ErrorData {
    ErrorData::internal_error(format!("{message}: {error:#}"), None)
}

//! MCP server for StepTags
//!
//! Exposes projects, the step tree and the status board as Model Context
//! Protocol tools over stdio. Step edits run through the same session path
//! as the CLI.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use steptags_core::Tracker;
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use handlers::{
    AddStep, CreateProject, ImportOutline, ListActivity, McpHandlers, McpResult, MoveCard,
    MoveStep, ProjectRef, StepRef, UpdateStep,
};

/// MCP server for StepTags
#[derive(Clone)]
pub struct StepTagsMcpServer {
    tracker: Arc<Tracker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl StepTagsMcpServer {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self {
            tracker,
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> McpHandlers {
        McpHandlers::new(Arc::clone(&self.tracker))
    }

    #[tool(
        name = "list_projects",
        description = "List the projects you are a member of, with your role and how many steps are complete. Returns project IDs for the other tools."
    )]
    async fn list_projects(&self) -> McpResult {
        self.handlers().list_projects().await
    }

    #[tool(
        name = "create_project",
        description = "Create a project. Requires a title; description, start_date and due_date (YYYY-MM-DD) and background are optional. You become its owner."
    )]
    async fn create_project(&self, params: Parameters<CreateProject>) -> McpResult {
        self.handlers().create_project(params).await
    }

    #[tool(
        name = "show_tree",
        description = "Show a project's steps as a nested list in order, with status icons, due dates and step IDs."
    )]
    async fn show_tree(&self, params: Parameters<ProjectRef>) -> McpResult {
        self.handlers().show_tree(params).await
    }

    #[tool(
        name = "show_board",
        description = "Show a project's top-level steps grouped into the four status columns: not-started, in-progress, in-review and complete."
    )]
    async fn show_board(&self, params: Parameters<ProjectRef>) -> McpResult {
        self.handlers().show_board(params).await
    }

    #[tool(
        name = "add_step",
        description = "Add a step to a project, appended after its siblings. Give parent_id to nest it under another step. Optional: notes, status, due_date (YYYY-MM-DD), assignee."
    )]
    async fn add_step(&self, params: Parameters<AddStep>) -> McpResult {
        self.handlers().add_step(params).await
    }

    #[tool(
        name = "update_step",
        description = "Change a step's name, notes, status, due_date or assignee. Omitted fields stay as they are; an empty string clears notes, due_date or assignee."
    )]
    async fn update_step(&self, params: Parameters<UpdateStep>) -> McpResult {
        self.handlers().update_step(params).await
    }

    #[tool(
        name = "move_step",
        description = "Move a step in the tree: under parent_id (or to the top level when omitted) at position among the new siblings (appended when omitted). A step cannot move under its own descendant."
    )]
    async fn move_step(&self, params: Parameters<MoveStep>) -> McpResult {
        self.handlers().move_step(params).await
    }

    #[tool(
        name = "move_card",
        description = "Move a top-level step's card to a status column, optionally at a position. Changing the column changes the step's status."
    )]
    async fn move_card(&self, params: Parameters<MoveCard>) -> McpResult {
        self.handlers().move_card(params).await
    }

    #[tool(
        name = "delete_step",
        description = "Delete a step together with all of its sub-steps."
    )]
    async fn delete_step(&self, params: Parameters<StepRef>) -> McpResult {
        self.handlers().delete_step(params).await
    }

    #[tool(
        name = "import_outline",
        description = "Create many steps at once from an indented outline: one step per line, two spaces or a tab per nesting level. Optionally under parent_id."
    )]
    async fn import_outline(&self, params: Parameters<ImportOutline>) -> McpResult {
        self.handlers().import_outline(params).await
    }

    #[tool(
        name = "list_members",
        description = "List the active members of a project with their roles."
    )]
    async fn list_members(&self, params: Parameters<ProjectRef>) -> McpResult {
        self.handlers().list_members(params).await
    }

    #[tool(
        name = "list_activity",
        description = "Show recent changes in a project, newest first. Optional limit (default 50)."
    )]
    async fn list_activity(&self, params: Parameters<ListActivity>) -> McpResult {
        self.handlers().list_activity(params).await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for StepTagsMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "steptags".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(r#"StepTags tracks projects as nested steps.

## Core Concepts
- **Projects**: shared between members with a role (owner, admin, member, guest)
- **Steps**: ordered under a parent step or at the top level; each has a status (not-started, in-progress, in-review, complete)
- **Board**: the top-level steps grouped by status

## Workflow
1. `list_projects` to find a project ID
2. `show_tree` or `show_board` to see its steps and their IDs
3. `add_step` / `import_outline` to add work, `update_step`, `move_step` and `move_card` to change it
4. `list_activity` to see what others changed

Guests can read but not change steps."#
                .to_string()),
        }
    }
}

/// Run the MCP server with stdio transport
pub async fn run_stdio_server(server: StepTagsMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting StepTags MCP server on stdio");
    debug!("Server created with {} tools", server.tool_router.list_all().len());

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}

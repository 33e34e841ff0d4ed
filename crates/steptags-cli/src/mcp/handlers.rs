//! MCP tool handlers
//!
//! Each handler converts its parameters through the core `params` types and
//! returns markdown produced by the core display types.

use std::sync::Arc;

use log::debug;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};
use schemars::JsonSchema;
use serde::Deserialize;
use steptags_core::{
    display::{
        ActivityFeed, BoardView, CreateResult, DeleteResult, Members, ProjectSummaries, TreeView,
        UpdateResult,
    },
    params as core,
    session::DEFAULT_GRACE_WINDOW,
    ProjectId, Session, SessionConfig, StepId, Tracker, Workspace,
};

use super::errors::to_mcp_error;
use crate::edits;

/// Transparent wrapper giving core parameter types the derives the MCP
/// layer needs, so the core stays free of rmcp.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

pub type ProjectRef = McpParams<core::ProjectRef>;
pub type StepRef = McpParams<core::StepRef>;
pub type CreateProject = McpParams<core::CreateProject>;
pub type AddStep = McpParams<core::AddStep>;
pub type UpdateStep = McpParams<core::UpdateStep>;
pub type MoveStep = McpParams<core::MoveStep>;
pub type MoveCard = McpParams<core::MoveCard>;
pub type ImportOutline = McpParams<core::ImportOutline>;
pub type ListActivity = McpParams<core::ListActivity>;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn text(markdown: impl Into<String>) -> McpResult {
    Ok(CallToolResult::success(vec![Content::text(markdown.into())]))
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    tracker: Arc<Tracker>,
}

impl McpHandlers {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    async fn load_workspace(&self, project_id: &ProjectId) -> Result<Workspace, ErrorData> {
        let steps = self
            .tracker
            .list_steps(project_id)
            .await
            .map_err(|e| to_mcp_error("Failed to load steps", e))?;
        let mut workspace = Workspace::new(project_id.clone(), DEFAULT_GRACE_WINDOW);
        workspace.replace_all(steps);
        Ok(workspace)
    }

    pub async fn list_projects(&self) -> McpResult {
        debug!("list_projects");

        let projects = self
            .tracker
            .list_projects()
            .await
            .map_err(|e| to_mcp_error("Failed to list projects", e))?;
        text(format!("# Projects\n\n{}", ProjectSummaries(projects)))
    }

    pub async fn create_project(&self, Parameters(params): Parameters<CreateProject>) -> McpResult {
        debug!("create_project: {params:?}");

        let new = params
            .as_ref()
            .to_new_project()
            .map_err(|e| to_mcp_error("Invalid project", e))?;
        let project = self
            .tracker
            .create_project(new)
            .await
            .map_err(|e| to_mcp_error("Failed to create project", e))?;
        text(CreateResult::new(project).to_string())
    }

    pub async fn show_tree(&self, Parameters(params): Parameters<ProjectRef>) -> McpResult {
        debug!("show_tree: {params:?}");

        let workspace = self.load_workspace(&params.as_ref().id()).await?;
        text(TreeView::new(&workspace).with_ids(true).to_string())
    }

    pub async fn show_board(&self, Parameters(params): Parameters<ProjectRef>) -> McpResult {
        debug!("show_board: {params:?}");

        let workspace = self.load_workspace(&params.as_ref().id()).await?;
        text(BoardView::new(&workspace).with_ids(true).to_string())
    }

    pub async fn add_step(&self, Parameters(params): Parameters<AddStep>) -> McpResult {
        debug!("add_step: {params:?}");

        let new = params
            .as_ref()
            .to_new_step()
            .map_err(|e| to_mcp_error("Invalid step", e))?;
        let step = self
            .tracker
            .create_step(&new)
            .await
            .map_err(|e| to_mcp_error("Failed to add step", e))?;
        text(CreateResult::new(step).to_string())
    }

    pub async fn update_step(&self, Parameters(params): Parameters<UpdateStep>) -> McpResult {
        debug!("update_step: {params:?}");

        let params = params.as_ref();
        let id = params.id();
        let patch = params
            .to_patch()
            .map_err(|e| to_mcp_error("Invalid update", e))?;
        let changes = patch.fields().iter().map(|f| f.as_str().to_string()).collect();

        let workspace = self
            .in_session(&id, |session| session.edit(&id, patch))
            .await?;
        let step = edits::edited_step(&workspace, &id)
            .map_err(|e| to_mcp_error("Failed to update step", e))?;
        text(UpdateResult::with_changes(step, changes).to_string())
    }

    pub async fn move_step(&self, Parameters(params): Parameters<MoveStep>) -> McpResult {
        debug!("move_step: {params:?}");

        let params = params.as_ref();
        let id = params.id();
        let workspace = self
            .in_session(&id, |session| session.move_step(&id, params.target()))
            .await?;
        text(TreeView::new(&workspace).with_ids(true).to_string())
    }

    pub async fn move_card(&self, Parameters(params): Parameters<MoveCard>) -> McpResult {
        debug!("move_card: {params:?}");

        let params = params.as_ref();
        let id = params.id();
        let status = params
            .status()
            .map_err(|e| to_mcp_error("Invalid status", e))?;
        let position = params.position.unwrap_or(usize::MAX);
        let workspace = self
            .in_session(&id, |session| session.move_card(&id, status, position))
            .await?;
        text(BoardView::new(&workspace).with_ids(true).to_string())
    }

    /// Sent right away, without an undo window.
    pub async fn delete_step(&self, Parameters(params): Parameters<StepRef>) -> McpResult {
        debug!("delete_step: {params:?}");

        let id = params.as_ref().id();
        let mut removed = Vec::new();
        self.in_session(&id, |session| {
            removed = edits::subtree(session.workspace(), &id);
            session.delete(&id)
        })
        .await?;
        text(DeleteResult::new(removed).to_string())
    }

    pub async fn import_outline(&self, Parameters(params): Parameters<ImportOutline>) -> McpResult {
        debug!("import_outline: {params:?}");

        let params = params.as_ref();
        let parent = params.parent_id.as_deref().map(StepId::from);
        let steps = self
            .tracker
            .import_outline(
                &ProjectId::from(params.project_id.as_str()),
                parent.as_ref(),
                &params.outline,
            )
            .await
            .map_err(|e| to_mcp_error("Failed to import outline", e))?;
        text(CreateResult::new(steps).to_string())
    }

    pub async fn list_members(&self, Parameters(params): Parameters<ProjectRef>) -> McpResult {
        debug!("list_members: {params:?}");

        let members = self
            .tracker
            .list_members(&params.as_ref().id())
            .await
            .map_err(|e| to_mcp_error("Failed to list members", e))?;
        text(format!("# Members\n\n{}", Members(members)))
    }

    pub async fn list_activity(&self, Parameters(params): Parameters<ListActivity>) -> McpResult {
        debug!("list_activity: {params:?}");

        let params = params.as_ref();
        let entries = self
            .tracker
            .list_activity(&ProjectId::from(params.project_id.as_str()), params.limit)
            .await
            .map_err(|e| to_mcp_error("Failed to list activity", e))?;
        text(format!("# Activity\n\n{}", ActivityFeed(entries)))
    }

    /// Apply one edit through a session on the step's project and return the
    /// reconciled workspace.
    async fn in_session<F>(&self, id: &StepId, apply: F) -> Result<Workspace, ErrorData>
    where
        F: FnOnce(&mut Session<Tracker>) -> steptags_core::Result<()>,
    {
        let mut session = edits::open_for_step(&self.tracker, id, SessionConfig::default())
            .await
            .map_err(|e| to_mcp_error("Failed to open step", e))?;
        apply(&mut session).map_err(|e| to_mcp_error("Edit rejected", e))?;
        edits::finish(session)
            .await
            .map_err(|e| to_mcp_error("Edit failed", e))
    }
}

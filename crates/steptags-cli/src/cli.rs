//! Subcommand arguments and their handlers
//!
//! Argument structures carry the clap attributes and convert into the core
//! `params` types, which hold all parsing and validation:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Tracker / Session
//! ```
//!
//! Reads and creates go straight to the [`Tracker`]. Edits, moves and
//! deletes of existing steps run through a short-lived session (see
//! [`crate::edits`]) so they follow the same optimistic path as an
//! interactive client, including the undo window for deletes.

use std::{
    fmt,
    io::{self, Read},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use steptags_core::{
    display::{
        ActivityFeed, BoardView, CreateResult, DeleteResult, Invites, Members, OperationStatus,
        ProjectSummaries, TreeView, UpdateResult,
    },
    models::InviteId,
    params::{
        parse_role, AddStep, ChangeRole, CreateProject, ImportOutline, InviteMember, MoveCard,
        MoveStep, ProjectRef, UpdateProject, UpdateStep,
    },
    session::DEFAULT_GRACE_WINDOW,
    ProjectId, Session, SessionConfig, SessionEvent, StepId, Tracker, UserId, Workspace,
};

use crate::{edits, renderer::TerminalRenderer};

// ============================================================================
// Projects
// ============================================================================

/// Create a new project
#[derive(Args)]
pub struct CreateProjectArgs {
    /// Title of the project
    pub title: String,
    #[arg(short, long, help = "Optional description of the project")]
    pub description: Option<String>,
    #[arg(long, help = "Start date (YYYY-MM-DD)")]
    pub start: Option<String>,
    #[arg(long, help = "Due date (YYYY-MM-DD)")]
    pub due: Option<String>,
    #[arg(long, help = "Background color or image reference")]
    pub background: Option<String>,
}

impl From<CreateProjectArgs> for CreateProject {
    fn from(val: CreateProjectArgs) -> Self {
        CreateProject {
            title: val.title,
            description: val.description,
            start_date: val.start,
            due_date: val.due,
            background: val.background,
        }
    }
}

/// A command that only needs a project
#[derive(Args)]
pub struct ProjectIdArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
}

impl From<ProjectIdArgs> for ProjectRef {
    fn from(val: ProjectIdArgs) -> Self {
        ProjectRef {
            project_id: val.project_id,
        }
    }
}

/// Update a project's details
///
/// An empty string clears an optional field.
#[derive(Args)]
pub struct UpdateProjectArgs {
    #[arg(help = "ID of the project to update")]
    pub project_id: String,
    #[arg(short, long, help = "New title")]
    pub title: Option<String>,
    #[arg(short, long, help = "New description")]
    pub description: Option<String>,
    #[arg(long, help = "New start date (YYYY-MM-DD)")]
    pub start: Option<String>,
    #[arg(long, help = "New due date (YYYY-MM-DD)")]
    pub due: Option<String>,
    #[arg(long, help = "New background")]
    pub background: Option<String>,
}

impl From<UpdateProjectArgs> for UpdateProject {
    fn from(val: UpdateProjectArgs) -> Self {
        UpdateProject {
            project_id: val.project_id,
            title: val.title,
            description: val.description,
            start_date: val.start,
            due_date: val.due,
            background: val.background,
        }
    }
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    #[command(alias = "c")]
    Create(CreateProjectArgs),
    /// List your projects
    #[command(aliases = ["l", "ls"])]
    List,
    /// Show a project with its step tree
    #[command(alias = "s")]
    Show(ProjectIdArgs),
    /// Update a project's details
    #[command(alias = "u")]
    Update(UpdateProjectArgs),
}

// ============================================================================
// Steps
// ============================================================================

/// Add a step to a project
///
/// The step is appended after its siblings, at the top level or under
/// `--parent`.
#[derive(Args)]
pub struct AddStepArgs {
    #[arg(help = "ID of the project to add the step to")]
    pub project_id: String,
    /// Name of the step
    pub name: String,
    #[arg(short, long, help = "Parent step; omit for a top-level step")]
    pub parent: Option<String>,
    #[arg(short, long, help = "Free-form notes")]
    pub notes: Option<String>,
    #[arg(short, long, help = "Initial status (defaults to not-started)")]
    pub status: Option<StepStatusArg>,
    #[arg(long, help = "Due date (YYYY-MM-DD)")]
    pub due: Option<String>,
    #[arg(short, long, help = "User to assign the step to")]
    pub assignee: Option<String>,
}

impl From<AddStepArgs> for AddStep {
    fn from(val: AddStepArgs) -> Self {
        AddStep {
            project_id: val.project_id,
            parent_id: val.parent,
            name: val.name,
            notes: val.notes,
            status: val.status.map(|s| s.to_string()),
            due_date: val.due,
            assignee: val.assignee,
        }
    }
}

/// Show a single step
#[derive(Args)]
pub struct ShowStepArgs {
    #[arg(help = "ID of the step to show")]
    pub id: String,
}

/// Update a step's fields
///
/// An empty string clears notes, due date or assignee.
#[derive(Args)]
pub struct UpdateStepArgs {
    #[arg(help = "ID of the step to update")]
    pub id: String,
    #[arg(long, help = "New name")]
    pub name: Option<String>,
    #[arg(short, long, help = "New notes")]
    pub notes: Option<String>,
    #[arg(short, long, help = "New status")]
    pub status: Option<StepStatusArg>,
    #[arg(long, help = "New due date (YYYY-MM-DD)")]
    pub due: Option<String>,
    #[arg(short, long, help = "New assignee")]
    pub assignee: Option<String>,
}

impl From<UpdateStepArgs> for UpdateStep {
    fn from(val: UpdateStepArgs) -> Self {
        UpdateStep {
            step_id: val.id,
            name: val.name,
            notes: val.notes,
            status: val.status.map(|s| s.to_string()),
            due_date: val.due,
            assignee: val.assignee,
        }
    }
}

/// Move a step within the tree
///
/// Without `--parent` the step moves to the top level. Without
/// `--position` it is appended after its new siblings.
#[derive(Args)]
pub struct MoveStepArgs {
    #[arg(help = "ID of the step to move")]
    pub id: String,
    #[arg(short, long, help = "New parent step")]
    pub parent: Option<String>,
    #[arg(long, help = "0-based position among the new siblings")]
    pub position: Option<usize>,
}

impl From<MoveStepArgs> for MoveStep {
    fn from(val: MoveStepArgs) -> Self {
        MoveStep {
            step_id: val.id,
            parent_id: val.parent,
            position: val.position,
        }
    }
}

/// Move a top-level step's card on the status board
#[derive(Args)]
pub struct MoveCardArgs {
    #[arg(help = "ID of a top-level step")]
    pub id: String,
    #[arg(help = "Target column")]
    pub status: StepStatusArg,
    #[arg(long, help = "0-based position in the column; omit to append")]
    pub position: Option<usize>,
}

impl From<MoveCardArgs> for MoveCard {
    fn from(val: MoveCardArgs) -> Self {
        MoveCard {
            step_id: val.id,
            status: val.status.to_string(),
            position: val.position,
        }
    }
}

/// Delete a step and its sub-steps
///
/// The delete is held back for the grace window; press Ctrl-C within it to
/// undo.
#[derive(Args)]
pub struct DeleteStepArgs {
    #[arg(help = "ID of the step to delete")]
    pub id: String,
    #[arg(long, default_value_t = DEFAULT_GRACE_WINDOW.as_secs(), help = "Seconds to wait before the delete is sent")]
    pub grace_secs: u64,
    #[arg(long, help = "Send the delete immediately, without an undo window")]
    pub no_wait: bool,
}

/// Import an indented outline as steps
///
/// One step per line; two spaces or a tab per nesting level. Reads stdin
/// when no file is given.
#[derive(Args)]
pub struct ImportArgs {
    #[arg(help = "ID of the project to import into")]
    pub project_id: String,
    #[arg(help = "Outline file; reads stdin when omitted")]
    pub file: Option<PathBuf>,
    #[arg(short, long, help = "Step to import under")]
    pub parent: Option<String>,
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Add a step to a project
    #[command(alias = "a")]
    Add(AddStepArgs),
    /// Show a single step
    #[command(alias = "s")]
    Show(ShowStepArgs),
    /// Update a step's fields
    #[command(alias = "u")]
    Update(UpdateStepArgs),
    /// Move a step within the tree
    #[command(alias = "mv")]
    Move(MoveStepArgs),
    /// Move a card on the status board
    #[command(alias = "c")]
    Card(MoveCardArgs),
    /// Delete a step and its sub-steps
    #[command(aliases = ["d", "rm"])]
    Delete(DeleteStepArgs),
    /// Import an indented outline
    #[command(alias = "i")]
    Import(ImportArgs),
}

/// Show a project's step tree
#[derive(Args)]
pub struct TreeArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
    #[arg(long, help = "Print step IDs")]
    pub ids: bool,
}

/// Show a project's status board
#[derive(Args)]
pub struct BoardArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
    #[arg(long, help = "Print step IDs")]
    pub ids: bool,
}

// ============================================================================
// Members, invites, activity
// ============================================================================

/// Invite someone to a project by email
#[derive(Args)]
pub struct InviteMemberArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
    #[arg(help = "Email address to invite")]
    pub email: String,
    #[arg(short, long, help = "Role to grant (defaults to member)")]
    pub role: Option<RoleArg>,
}

impl From<InviteMemberArgs> for InviteMember {
    fn from(val: InviteMemberArgs) -> Self {
        InviteMember {
            project_id: val.project_id,
            email: val.email,
            role: val.role.map(|r| r.to_string()),
        }
    }
}

/// Change a member's role
#[derive(Args)]
pub struct ChangeRoleArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
    #[arg(help = "User whose role changes")]
    pub user_id: String,
    #[arg(help = "New role")]
    pub role: RoleArg,
}

impl From<ChangeRoleArgs> for ChangeRole {
    fn from(val: ChangeRoleArgs) -> Self {
        ChangeRole {
            project_id: val.project_id,
            user_id: val.user_id,
            role: val.role.to_string(),
        }
    }
}

/// Remove a member from a project
#[derive(Args)]
pub struct RemoveMemberArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
    #[arg(help = "User to remove")]
    pub user_id: String,
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// List active members
    #[command(aliases = ["l", "ls"])]
    List(ProjectIdArgs),
    /// Invite someone by email
    #[command(alias = "i")]
    Invite(InviteMemberArgs),
    /// Change a member's role
    #[command(alias = "r")]
    Role(ChangeRoleArgs),
    /// Remove a member
    #[command(alias = "rm")]
    Remove(RemoveMemberArgs),
}

#[derive(Subcommand)]
pub enum InviteCommands {
    /// Join a project with an invite token
    #[command(alias = "a")]
    Accept {
        #[arg(help = "Token from the invitation link")]
        token: String,
    },
    /// Revoke a pending invite
    #[command(alias = "r")]
    Revoke {
        #[arg(help = "ID of the project")]
        project_id: String,
        #[arg(help = "ID of the invite")]
        invite_id: String,
    },
    /// List pending invites
    #[command(aliases = ["l", "ls"])]
    List(ProjectIdArgs),
}

/// Show recent activity
#[derive(Args)]
pub struct ActivityArgs {
    #[arg(help = "ID of the project")]
    pub project_id: String,
    #[arg(short = 'n', long, help = "Maximum number of entries")]
    pub limit: Option<usize>,
}

/// Board column as a command-line value
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum StepStatusArg {
    /// Not picked up yet
    #[value(alias = "todo")]
    NotStarted,
    /// Being worked on
    InProgress,
    /// Waiting for review
    InReview,
    /// Finished
    #[value(alias = "done")]
    Complete,
}

impl fmt::Display for StepStatusArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatusArg::NotStarted => write!(f, "not-started"),
            StepStatusArg::InProgress => write!(f, "in-progress"),
            StepStatusArg::InReview => write!(f, "in-review"),
            StepStatusArg::Complete => write!(f, "complete"),
        }
    }
}

/// Grantable role as a command-line value
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum RoleArg {
    Admin,
    Member,
    Guest,
}

impl fmt::Display for RoleArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleArg::Admin => write!(f, "admin"),
            RoleArg::Member => write!(f, "member"),
            RoleArg::Guest => write!(f, "guest"),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub struct Cli {
    tracker: Arc<Tracker>,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(tracker: Arc<Tracker>, renderer: TerminalRenderer) -> Self {
        Self { tracker, renderer }
    }

    async fn load_workspace(&self, project_id: &ProjectId) -> Result<Workspace> {
        let steps = self.tracker.list_steps(project_id).await?;
        let mut workspace = Workspace::new(project_id.clone(), DEFAULT_GRACE_WINDOW);
        workspace.replace_all(steps);
        Ok(workspace)
    }

    pub async fn list_projects(&self) -> Result<()> {
        let projects = self
            .tracker
            .list_projects()
            .await
            .context("Failed to list projects")?;
        self.renderer.render(&ProjectSummaries(projects).to_string())
    }

    pub async fn handle_project_command(&self, command: ProjectCommands) -> Result<()> {
        match command {
            ProjectCommands::Create(args) => {
                let params: CreateProject = args.into();
                let project = self
                    .tracker
                    .create_project(params.to_new_project()?)
                    .await
                    .context("Failed to create project")?;
                self.renderer.render(&CreateResult::new(project).to_string())
            }
            ProjectCommands::List => self.list_projects().await,
            ProjectCommands::Show(args) => {
                let id = ProjectRef::from(args).id();
                let (project, role) = self
                    .tracker
                    .show_project(&id)
                    .await
                    .with_context(|| format!("Failed to show project {id}"))?;
                let workspace = self.load_workspace(&id).await?;
                self.renderer.render(&format!(
                    "{project}\n**Your role**: {role}\n\n{}",
                    TreeView::new(&workspace).with_ids(true)
                ))
            }
            ProjectCommands::Update(args) => {
                let params: UpdateProject = args.into();
                let id = ProjectId::from(params.project_id.as_str());
                let project = self
                    .tracker
                    .update_project(&id, params.to_patch()?)
                    .await
                    .with_context(|| format!("Failed to update project {id}"))?;
                self.renderer.render(&UpdateResult::new(project).to_string())
            }
        }
    }

    pub async fn handle_step_command(&self, command: StepCommands) -> Result<()> {
        match command {
            StepCommands::Add(args) => {
                let params: AddStep = args.into();
                let step = self
                    .tracker
                    .create_step(&params.to_new_step()?)
                    .await
                    .context("Failed to add step")?;
                self.renderer.render(&CreateResult::new(step).to_string())
            }
            StepCommands::Show(args) => {
                let id = StepId::from(args.id.as_str());
                let step = self
                    .tracker
                    .get_step(&id)
                    .await
                    .with_context(|| format!("Failed to show step {id}"))?;
                self.renderer.render(&step.to_string())
            }
            StepCommands::Update(args) => self.update_step(args.into()).await,
            StepCommands::Move(args) => self.move_step(args.into()).await,
            StepCommands::Card(args) => self.move_card(args.into()).await,
            StepCommands::Delete(args) => self.delete_step(args).await,
            StepCommands::Import(args) => self.import_outline(args).await,
        }
    }

    async fn update_step(&self, params: UpdateStep) -> Result<()> {
        let id = params.id();
        let patch = params.to_patch()?;
        let changes = patch.fields().iter().map(|f| f.as_str().to_string()).collect();

        let mut session = edits::open_for_step(&self.tracker, &id, SessionConfig::default()).await?;
        session.edit(&id, patch)?;
        let workspace = edits::finish(session)
            .await
            .with_context(|| format!("Failed to update step {id}"))?;
        let step = edits::edited_step(&workspace, &id)?;
        self.renderer
            .render(&UpdateResult::with_changes(step, changes).to_string())
    }

    async fn move_step(&self, params: MoveStep) -> Result<()> {
        let id = params.id();
        let mut session = edits::open_for_step(&self.tracker, &id, SessionConfig::default()).await?;
        session.move_step(&id, params.target())?;
        let workspace = edits::finish(session)
            .await
            .with_context(|| format!("Failed to move step {id}"))?;
        self.renderer.render(&TreeView::new(&workspace).to_string())
    }

    async fn move_card(&self, params: MoveCard) -> Result<()> {
        let id = params.id();
        let status = params.status()?;
        let mut session = edits::open_for_step(&self.tracker, &id, SessionConfig::default()).await?;
        session.move_card(&id, status, params.position.unwrap_or(usize::MAX))?;
        let workspace = edits::finish(session)
            .await
            .with_context(|| format!("Failed to move card {id}"))?;
        self.renderer.render(&BoardView::new(&workspace).to_string())
    }

    async fn delete_step(&self, args: DeleteStepArgs) -> Result<()> {
        let id = StepId::from(args.id.as_str());
        let config = SessionConfig {
            grace_window: Duration::from_secs(args.grace_secs),
        };
        let mut session = edits::open_for_step(&self.tracker, &id, config).await?;
        let removed = edits::subtree(session.workspace(), &id);

        session.delete(&id)?;
        if !args.no_wait {
            self.renderer.notices(&session.notices());
            eprintln!("Press Ctrl-C to undo");
            if wait_for_delete(&mut session).await {
                edits::finish(session).await?;
                return self
                    .renderer
                    .render(&OperationStatus::success(format!("Restored step {id}")).to_string());
            }
        }

        edits::finish(session)
            .await
            .with_context(|| format!("Failed to delete step {id}"))?;
        self.renderer.render(&DeleteResult::new(removed).to_string())
    }

    async fn import_outline(&self, args: ImportArgs) -> Result<()> {
        let outline = match &args.file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            None => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read outline from stdin")?;
                buf
            }
        };
        let params = ImportOutline {
            project_id: args.project_id,
            parent_id: args.parent,
            outline,
        };

        let parent = params.parent_id.as_deref().map(StepId::from);
        let steps = self
            .tracker
            .import_outline(
                &ProjectId::from(params.project_id.as_str()),
                parent.as_ref(),
                &params.outline,
            )
            .await
            .context("Failed to import outline")?;
        self.renderer.render(&CreateResult::new(steps).to_string())
    }

    pub async fn show_tree(&self, args: TreeArgs) -> Result<()> {
        let workspace = self.load_workspace(&ProjectId::from(args.project_id.as_str())).await?;
        self.renderer
            .render(&TreeView::new(&workspace).with_ids(args.ids).to_string())
    }

    pub async fn show_board(&self, args: BoardArgs) -> Result<()> {
        let workspace = self.load_workspace(&ProjectId::from(args.project_id.as_str())).await?;
        self.renderer
            .render(&BoardView::new(&workspace).with_ids(args.ids).to_string())
    }

    pub async fn handle_member_command(&self, command: MemberCommands) -> Result<()> {
        match command {
            MemberCommands::List(args) => {
                let id = ProjectRef::from(args).id();
                let members = self
                    .tracker
                    .list_members(&id)
                    .await
                    .context("Failed to list members")?;
                self.renderer.render(&Members(members).to_string())
            }
            MemberCommands::Invite(args) => {
                let params: InviteMember = args.into();
                let created = self
                    .tracker
                    .invite_member(
                        &ProjectId::from(params.project_id.as_str()),
                        &params.email,
                        params.role()?,
                    )
                    .await
                    .context("Failed to invite member")?;
                self.renderer.render(&CreateResult::new(created).to_string())
            }
            MemberCommands::Role(args) => {
                let params: ChangeRole = args.into();
                let membership = self
                    .tracker
                    .change_role(
                        &ProjectId::from(params.project_id.as_str()),
                        &UserId::from(params.user_id.as_str()),
                        parse_role(&params.role)?,
                    )
                    .await
                    .context("Failed to change role")?;
                self.renderer.render(
                    &OperationStatus::success(format!(
                        "{} is now {}",
                        membership.user_id, membership.role
                    ))
                    .to_string(),
                )
            }
            MemberCommands::Remove(args) => {
                let user = UserId::from(args.user_id.as_str());
                self.tracker
                    .remove_member(&ProjectId::from(args.project_id.as_str()), &user)
                    .await
                    .context("Failed to remove member")?;
                self.renderer
                    .render(&OperationStatus::success(format!("Removed {user}")).to_string())
            }
        }
    }

    pub async fn handle_invite_command(&self, command: InviteCommands) -> Result<()> {
        match command {
            InviteCommands::Accept { token } => {
                let membership = self
                    .tracker
                    .accept_invite(&token)
                    .await
                    .context("Failed to accept invite")?;
                self.renderer.render(
                    &OperationStatus::success(format!(
                        "Joined project {} as {}",
                        membership.project_id, membership.role
                    ))
                    .to_string(),
                )
            }
            InviteCommands::Revoke {
                project_id,
                invite_id,
            } => {
                self.tracker
                    .revoke_invite(
                        &ProjectId::from(project_id.as_str()),
                        &InviteId::from(invite_id.as_str()),
                    )
                    .await
                    .context("Failed to revoke invite")?;
                self.renderer
                    .render(&OperationStatus::success(format!("Revoked invite {invite_id}")).to_string())
            }
            InviteCommands::List(args) => {
                let id = ProjectRef::from(args).id();
                let invites = self
                    .tracker
                    .list_invites(&id)
                    .await
                    .context("Failed to list invites")?;
                self.renderer.render(&Invites(invites).to_string())
            }
        }
    }

    pub async fn show_activity(&self, args: ActivityArgs) -> Result<()> {
        let entries = self
            .tracker
            .list_activity(&ProjectId::from(args.project_id.as_str()), args.limit)
            .await
            .context("Failed to list activity")?;
        self.renderer.render(&ActivityFeed(entries).to_string())
    }
}

/// Drive the session until the pending delete is sent. Returns true when
/// the user pressed Ctrl-C in time and the delete was undone.
async fn wait_for_delete(session: &mut Session<Tracker>) -> bool {
    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(SessionEvent::DeleteSent(_)) | None => return false,
                // Deleted elsewhere while the window was open
                Some(_) if session.workspace().pending_delete().is_none() => return false,
                Some(_) => {}
            },
            Ok(()) = tokio::signal::ctrl_c() => {
                return session.undo_delete().is_some();
            }
        }
    }
}

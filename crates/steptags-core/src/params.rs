//! Parameter structures shared by the CLI and the MCP server.
//!
//! Ids, dates, statuses and roles arrive here as strings; each structure
//! converts itself into the typed request the [`crate::Tracker`] or
//! [`crate::Session`] expects, reporting bad input as
//! [`TrackerError::InvalidInput`]. JSON schemas for MCP tools are derived
//! behind the `schema` feature.
//!
//! For optional text and date fields of an update, an empty string clears
//! the value and an absent field leaves it unchanged.
//!
//! ```rust
//! use steptags_core::params::UpdateStep;
//!
//! let params = UpdateStep {
//!     step_id: "s1".to_string(),
//!     status: Some("done".to_string()),
//!     due_date: Some(String::new()),
//!     ..Default::default()
//! };
//! let patch = params.to_patch()?;
//! assert_eq!(patch.due_date, Some(None));
//! # Ok::<(), steptags_core::TrackerError>(())
//! ```

use jiff::civil::Date;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    db::project_queries::NewProject,
    error::{Result, TrackerError},
    models::{NewStep, ProjectId, ProjectPatch, Role, StepId, StepPatch, StepStatus, UserId},
    workspace::MoveTarget,
};

fn parse_date(field: &str, raw: &str) -> Result<Date> {
    raw.trim().parse::<Date>().map_err(|e| {
        TrackerError::invalid_input(field).with_reason(format!("'{raw}' is not a YYYY-MM-DD date: {e}"))
    })
}

fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<Date>> {
    raw.map(|r| parse_date(field, r)).transpose()
}

/// `None` leaves the date alone, an empty string clears it.
fn date_change(field: &str, raw: Option<&str>) -> Result<Option<Option<Date>>> {
    match raw {
        None => Ok(None),
        Some(r) if r.trim().is_empty() => Ok(Some(None)),
        Some(r) => parse_date(field, r).map(|d| Some(Some(d))),
    }
}

fn text_change(raw: Option<&str>) -> Option<Option<String>> {
    raw.map(|r| {
        let trimmed = r.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

pub fn parse_status(raw: &str) -> Result<StepStatus> {
    raw.parse::<StepStatus>().map_err(|_| {
        TrackerError::invalid_input("status").with_reason(format!(
            "Invalid status: {raw}. Must be 'not-started', 'in-progress', 'in-review' or 'complete'"
        ))
    })
}

pub fn parse_role(raw: &str) -> Result<Role> {
    raw.parse::<Role>().map_err(|_| {
        TrackerError::invalid_input("role")
            .with_reason(format!("Invalid role: {raw}. Must be 'admin', 'member' or 'guest'"))
    })
}

/// Parameters naming a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ProjectRef {
    /// ID of the project
    pub project_id: String,
}

impl ProjectRef {
    pub fn id(&self) -> ProjectId {
        ProjectId::from(self.project_id.as_str())
    }
}

/// Parameters naming a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StepRef {
    /// ID of the step
    pub step_id: String,
}

impl StepRef {
    pub fn id(&self) -> StepId {
        StepId::from(self.step_id.as_str())
    }
}

/// Parameters for creating a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CreateProject {
    /// Title of the project (required)
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Start date, YYYY-MM-DD
    pub start_date: Option<String>,
    /// Due date, YYYY-MM-DD
    pub due_date: Option<String>,
    /// Background color (#rrggbb) or image path
    pub background: Option<String>,
}

impl CreateProject {
    pub fn to_new_project(&self) -> Result<NewProject> {
        Ok(NewProject {
            title: self.title.clone(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
            start_date: optional_date("start_date", self.start_date.as_deref())?,
            due_date: optional_date("due_date", self.due_date.as_deref())?,
            background: self.background.clone().filter(|b| !b.trim().is_empty()),
        })
    }
}

/// Parameters for changing project settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UpdateProject {
    /// ID of the project
    pub project_id: String,
    pub title: Option<String>,
    /// New description; empty to clear
    pub description: Option<String>,
    /// New start date (YYYY-MM-DD); empty to clear
    pub start_date: Option<String>,
    /// New due date (YYYY-MM-DD); empty to clear
    pub due_date: Option<String>,
    /// New background; empty to clear
    pub background: Option<String>,
}

impl UpdateProject {
    pub fn to_patch(&self) -> Result<ProjectPatch> {
        Ok(ProjectPatch {
            title: self.title.clone(),
            description: text_change(self.description.as_deref()),
            start_date: date_change("start_date", self.start_date.as_deref())?,
            due_date: date_change("due_date", self.due_date.as_deref())?,
            background: text_change(self.background.as_deref()),
        })
    }
}

/// Parameters for adding a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AddStep {
    /// ID of the project to add the step to
    pub project_id: String,
    /// Parent step; omit for a top-level step
    pub parent_id: Option<String>,
    /// Name of the step (required)
    pub name: String,
    pub notes: Option<String>,
    /// Initial status, defaults to not-started
    pub status: Option<String>,
    /// Due date, YYYY-MM-DD
    pub due_date: Option<String>,
    /// User to assign
    pub assignee: Option<String>,
}

impl AddStep {
    pub fn to_new_step(&self) -> Result<NewStep> {
        let mut new = NewStep::new(
            ProjectId::from(self.project_id.as_str()),
            self.parent_id.as_deref().map(StepId::from),
            self.name.trim(),
        );
        new.notes = self.notes.clone().filter(|n| !n.trim().is_empty());
        if let Some(status) = &self.status {
            new.status = parse_status(status)?;
        }
        new.due_date = optional_date("due_date", self.due_date.as_deref())?;
        new.assignee = self.assignee.as_deref().map(UserId::from);
        Ok(new)
    }
}

/// Parameters for editing a step's fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UpdateStep {
    /// ID of the step
    pub step_id: String,
    pub name: Option<String>,
    /// New notes; empty to clear
    pub notes: Option<String>,
    /// 'not-started', 'in-progress', 'in-review' or 'complete'
    pub status: Option<String>,
    /// New due date (YYYY-MM-DD); empty to clear
    pub due_date: Option<String>,
    /// User to assign; empty to unassign
    pub assignee: Option<String>,
}

impl UpdateStep {
    pub fn id(&self) -> StepId {
        StepId::from(self.step_id.as_str())
    }

    /// Build the patch, rejecting an update that changes nothing.
    pub fn to_patch(&self) -> Result<StepPatch> {
        let patch = StepPatch {
            name: self.name.as_ref().map(|n| n.trim().to_string()),
            notes: text_change(self.notes.as_deref()),
            status: self.status.as_deref().map(parse_status).transpose()?,
            due_date: date_change("due_date", self.due_date.as_deref())?,
            assignee: text_change(self.assignee.as_deref()).map(|a| a.map(UserId::from)),
            ..Default::default()
        };
        if patch.is_empty() {
            return Err(TrackerError::invalid_input("step").with_reason("Nothing to update"));
        }
        patch.validate()?;
        Ok(patch)
    }
}

/// Parameters for moving a step in the tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct MoveStep {
    /// ID of the step to move
    pub step_id: String,
    /// New parent; omit to move to the top level
    pub parent_id: Option<String>,
    /// Position among the new siblings (0-indexed); omit to append
    pub position: Option<usize>,
}

impl MoveStep {
    pub fn id(&self) -> StepId {
        StepId::from(self.step_id.as_str())
    }

    pub fn target(&self) -> MoveTarget {
        MoveTarget {
            parent: self.parent_id.as_deref().map(StepId::from),
            position: self.position,
        }
    }
}

/// Parameters for dragging a card on the status board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct MoveCard {
    /// ID of a top-level step
    pub step_id: String,
    /// Target column: 'not-started', 'in-progress', 'in-review' or 'complete'
    pub status: String,
    /// Position in the column (0-indexed); omit to append
    pub position: Option<usize>,
}

impl MoveCard {
    pub fn id(&self) -> StepId {
        StepId::from(self.step_id.as_str())
    }

    pub fn status(&self) -> Result<StepStatus> {
        parse_status(&self.status)
    }
}

/// Parameters for importing an indented outline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ImportOutline {
    pub project_id: String,
    /// Step to import under; omit for the top level
    pub parent_id: Option<String>,
    /// One step per line, two spaces or a tab per nesting level
    pub outline: String,
}

/// Parameters for inviting someone to a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct InviteMember {
    pub project_id: String,
    pub email: String,
    /// 'admin', 'member' or 'guest'; defaults to member
    pub role: Option<String>,
}

impl InviteMember {
    pub fn role(&self) -> Result<Role> {
        self.role.as_deref().map_or(Ok(Role::Member), parse_role)
    }
}

/// Parameters for changing a member's role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ChangeRole {
    pub project_id: String,
    pub user_id: String,
    pub role: String,
}

/// Parameters for listing activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListActivity {
    pub project_id: String,
    /// Maximum number of entries, newest first
    pub limit: Option<usize>,
}

//! Project, membership, invite and activity records.

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use super::{
    InviteId, InviteStatus, MembershipStatus, ProjectId, Role, StepStatus, UserId,
};

/// A named container owning steps, members and activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,

    /// Background color (`#rrggbb`) or storage path of a background image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// Creator; holds the owner role
    pub created_by: UserId,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

/// A project as seen by one member, with step counts for list views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub project: Project,
    pub role: Role,
    pub total_steps: u32,
    pub complete_steps: u32,
}

/// Partial project update. Nullable fields use a nested `Option`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<Date>>,
    pub due_date: Option<Option<Date>>,
    pub background: Option<Option<String>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
            && self.background.is_none()
    }

    pub fn apply_to(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(due_date) = self.due_date {
            project.due_date = due_date;
        }
        if let Some(background) = &self.background {
            project.background = background.clone();
        }
    }

    /// A start date after the due date is rejected.
    pub fn validate_against(&self, project: &Project) -> crate::Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(crate::TrackerError::invalid_input("title")
                    .with_reason("Title cannot be empty"));
            }
        }
        let start = self.start_date.unwrap_or(project.start_date);
        let due = self.due_date.unwrap_or(project.due_date);
        if let (Some(start), Some(due)) = (start, due) {
            if start > due {
                return Err(crate::TrackerError::invalid_input("start_date")
                    .with_reason(format!("Start date {start} is after due date {due}")));
            }
        }
        Ok(())
    }
}

/// Ties a user to a project with a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role: Role,
    pub status: MembershipStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<Timestamp>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

/// A pending or settled invitation to join a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invite {
    pub id: InviteId,
    pub project_id: ProjectId,
    pub email: String,
    pub role: Role,
    pub status: InviteStatus,
    pub token: String,
    pub created_by: UserId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<Timestamp>,
}

impl Invite {
    pub fn is_usable(&self, now: Timestamp) -> bool {
        self.status == InviteStatus::Pending && now < self.expires_at
    }
}

/// What an activity entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProjectCreated,
    ProjectUpdated,
    StepCreated,
    StepUpdated,
    StepMoved,
    StepDeleted,
    StepsImported,
    MemberInvited,
    MemberJoined,
    MemberRoleChanged,
    MemberRemoved,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::ProjectCreated => "project_created",
            ActivityKind::ProjectUpdated => "project_updated",
            ActivityKind::StepCreated => "step_created",
            ActivityKind::StepUpdated => "step_updated",
            ActivityKind::StepMoved => "step_moved",
            ActivityKind::StepDeleted => "step_deleted",
            ActivityKind::StepsImported => "steps_imported",
            ActivityKind::MemberInvited => "member_invited",
            ActivityKind::MemberJoined => "member_joined",
            ActivityKind::MemberRoleChanged => "member_role_changed",
            ActivityKind::MemberRemoved => "member_removed",
        }
    }

    /// Short label for feeds.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::ProjectCreated => "Project created",
            ActivityKind::ProjectUpdated => "Project updated",
            ActivityKind::StepCreated => "Step added",
            ActivityKind::StepUpdated => "Step edited",
            ActivityKind::StepMoved => "Step moved",
            ActivityKind::StepDeleted => "Step deleted",
            ActivityKind::StepsImported => "Steps imported",
            ActivityKind::MemberInvited => "Member invited",
            ActivityKind::MemberJoined => "Member joined",
            ActivityKind::MemberRoleChanged => "Role changed",
            ActivityKind::MemberRemoved => "Member removed",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("Invalid activity kind: {s}"))
    }
}

/// One entry of a project's activity feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub id: i64,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
    pub kind: ActivityKind,
    pub ref_table: String,
    #[serde(default)]
    pub meta: serde_json::Value,
    pub created_at: Timestamp,
}

/// Counts shown in a project's summary panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub total: u32,
    pub complete: u32,
    pub open: u32,
    /// Top-level steps per status, in board column order
    pub top_level_by_status: [u32; 4],
}

impl StepSummary {
    /// Summarize the live (non-deleted) steps.
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a super::Step>) -> Self {
        let mut summary = Self::default();
        for step in steps.into_iter().filter(|s| !s.is_deleted()) {
            summary.total += 1;
            if step.status == StepStatus::Complete {
                summary.complete += 1;
            }
            if step.is_top_level() {
                summary.top_level_by_status[step.status.index()] += 1;
            }
        }
        summary.open = summary.total - summary.complete;
        summary
    }
}

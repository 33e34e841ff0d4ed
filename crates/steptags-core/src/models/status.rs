//! Status and role enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a step; one board column per variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    /// Freshly created, nobody has picked it up
    #[default]
    NotStarted,

    /// Being worked on
    InProgress,

    /// Waiting for review
    InReview,

    /// Finished
    Complete,
}

impl StepStatus {
    /// All statuses in board column order.
    pub const ALL: [StepStatus; 4] = [
        StepStatus::NotStarted,
        StepStatus::InProgress,
        StepStatus::InReview,
        StepStatus::Complete,
    ];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::NotStarted => "not-started",
            StepStatus::InProgress => "in-progress",
            StepStatus::InReview => "in-review",
            StepStatus::Complete => "complete",
        }
    }

    /// Board column index.
    pub fn index(&self) -> usize {
        match self {
            StepStatus::NotStarted => 0,
            StepStatus::InProgress => 1,
            StepStatus::InReview => 2,
            StepStatus::Complete => 3,
        }
    }

    /// Human-readable column title.
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::NotStarted => "Not Started",
            StepStatus::InProgress => "In Progress",
            StepStatus::InReview => "In Review",
            StepStatus::Complete => "Complete",
        }
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steptags_core::models::StepStatus;
    ///
    /// assert_eq!(StepStatus::Complete.with_icon(), "✓ Complete");
    /// assert_eq!(StepStatus::NotStarted.with_icon(), "○ Not Started");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            StepStatus::NotStarted => "○ Not Started",
            StepStatus::InProgress => "➤ In Progress",
            StepStatus::InReview => "◎ In Review",
            StepStatus::Complete => "✓ Complete",
        }
    }
}

impl FromStr for StepStatus {
    type Err = String;

    /// Accepts the canonical names plus the aliases older clients and the
    /// hosted database use (`todo`, `open`, `review`, `done`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not-started" | "not_started" | "notstarted" | "todo" | "open" | "backlog" => {
                Ok(StepStatus::NotStarted)
            }
            "in-progress" | "in_progress" | "inprogress" => Ok(StepStatus::InProgress),
            "in-review" | "in_review" | "inreview" | "review" => Ok(StepStatus::InReview),
            "complete" | "completed" | "done" => Ok(StepStatus::Complete),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a member within a project, most privileged first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Guest => "guest",
        }
    }

    /// Project settings, invites and member management. True only for the
    /// two most privileged roles.
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Creating, editing, moving and deleting steps. Guests are read-only.
    pub fn can_edit_steps(&self) -> bool {
        !matches!(self, Role::Guest)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "guest" => Ok(Role::Guest),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a membership is still in effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    #[default]
    Active,
    Removed,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Removed => "removed",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MembershipStatus::Active),
            "removed" => Ok(MembershipStatus::Removed),
            _ => Err(format!("Invalid membership status: {s}")),
        }
    }
}

/// Lifecycle of an invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Revoked,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Revoked => "revoked",
        }
    }
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            "revoked" => Ok(InviteStatus::Revoked),
            _ => Err(format!("Invalid invite status: {s}")),
        }
    }
}

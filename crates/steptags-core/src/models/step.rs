//! Step model definition and related functionality.

use std::{cmp::Ordering, collections::BTreeSet};

use jiff::{civil::Date, Timestamp};
use serde::{Deserialize, Serialize};

use super::{ProjectId, StepId, StepStatus, UserId};

/// A single work item in a project's step forest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Unique identifier assigned by the backend
    pub id: StepId,

    /// Owning project
    pub project_id: ProjectId,

    /// Parent step; `None` for a top-level step
    pub parent_id: Option<StepId>,

    /// Display name
    pub name: String,

    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Lifecycle status
    pub status: StepStatus,

    /// Calendar due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,

    /// Position among siblings; only the relative order matters
    pub order: f64,

    /// Assigned user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,

    /// Timestamp when the step was created (UTC)
    pub created_at: Timestamp,

    /// Timestamp when the step was last updated (UTC)
    pub updated_at: Timestamp,

    /// Soft-delete marker; a deleted step is hidden from every view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Step {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Total order among siblings: `order`, then creation time, then id.
    pub fn sibling_cmp(&self, other: &Step) -> Ordering {
        self.order
            .total_cmp(&other.order)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Overwrite this record with `pushed`, except for the fields in `keep`.
    pub fn merge_from(&mut self, pushed: &Step, keep: &BTreeSet<StepField>) {
        let take = |field: StepField| !keep.contains(&field);

        if take(StepField::Name) {
            self.name = pushed.name.clone();
        }
        if take(StepField::Notes) {
            self.notes = pushed.notes.clone();
        }
        if take(StepField::Status) {
            self.status = pushed.status;
        }
        if take(StepField::DueDate) {
            self.due_date = pushed.due_date;
        }
        if take(StepField::Parent) {
            self.parent_id = pushed.parent_id.clone();
        }
        if take(StepField::Order) {
            self.order = pushed.order;
        }
        if take(StepField::Assignee) {
            self.assignee = pushed.assignee.clone();
        }
        self.project_id = pushed.project_id.clone();
        self.created_at = pushed.created_at;
        self.updated_at = pushed.updated_at;
        self.deleted_at = pushed.deleted_at;
    }
}

/// A user-editable step field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepField {
    Name,
    Notes,
    Status,
    DueDate,
    Parent,
    Order,
    Assignee,
}

impl StepField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepField::Name => "name",
            StepField::Notes => "notes",
            StepField::Status => "status",
            StepField::DueDate => "due_date",
            StepField::Parent => "parent_id",
            StepField::Order => "order",
            StepField::Assignee => "assignee",
        }
    }
}

/// Partial update of a step. Nullable fields use a nested `Option` so that
/// `Some(None)` clears the value while `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub name: Option<String>,
    pub notes: Option<Option<String>>,
    pub status: Option<StepStatus>,
    pub due_date: Option<Option<Date>>,
    pub parent_id: Option<Option<StepId>>,
    pub order: Option<f64>,
    pub assignee: Option<Option<UserId>>,
}

impl StepPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn status(status: StepStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn order(order: f64) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    /// Fields this patch writes.
    pub fn fields(&self) -> BTreeSet<StepField> {
        let mut fields = BTreeSet::new();
        if self.name.is_some() {
            fields.insert(StepField::Name);
        }
        if self.notes.is_some() {
            fields.insert(StepField::Notes);
        }
        if self.status.is_some() {
            fields.insert(StepField::Status);
        }
        if self.due_date.is_some() {
            fields.insert(StepField::DueDate);
        }
        if self.parent_id.is_some() {
            fields.insert(StepField::Parent);
        }
        if self.order.is_some() {
            fields.insert(StepField::Order);
        }
        if self.assignee.is_some() {
            fields.insert(StepField::Assignee);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Apply the patch in place. Timestamps are left to the caller.
    pub fn apply_to(&self, step: &mut Step) {
        if let Some(name) = &self.name {
            step.name = name.clone();
        }
        if let Some(notes) = &self.notes {
            step.notes = notes.clone();
        }
        if let Some(status) = self.status {
            step.status = status;
        }
        if let Some(due_date) = self.due_date {
            step.due_date = due_date;
        }
        if let Some(parent_id) = &self.parent_id {
            step.parent_id = parent_id.clone();
        }
        if let Some(order) = self.order {
            step.order = order;
        }
        if let Some(assignee) = &self.assignee {
            step.assignee = assignee.clone();
        }
    }

    /// Reject values the backend would refuse anyway.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(order) = self.order {
            if !order.is_finite() {
                return Err(crate::TrackerError::invalid_input("order")
                    .with_reason("Order must be a finite number"));
            }
        }
        Ok(())
    }
}

/// Request to create a step.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
    pub project_id: ProjectId,
    pub parent_id: Option<StepId>,
    pub name: String,
    pub notes: Option<String>,
    pub status: StepStatus,
    pub due_date: Option<Date>,
    pub assignee: Option<UserId>,
    /// Explicit order; `None` appends after the existing siblings
    pub order: Option<f64>,
}

impl NewStep {
    pub fn new(project_id: ProjectId, parent_id: Option<StepId>, name: impl Into<String>) -> Self {
        Self {
            project_id,
            parent_id,
            name: name.into(),
            notes: None,
            status: StepStatus::default(),
            due_date: None,
            assignee: None,
            order: None,
        }
    }
}

pub(crate) fn validate_name(name: &str) -> crate::Result<()> {
    if name.trim().is_empty() {
        return Err(crate::TrackerError::invalid_input("name").with_reason("Name cannot be empty"));
    }
    Ok(())
}

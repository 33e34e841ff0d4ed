//! Result wrapper types for displaying operation outcomes.

use std::fmt;

use crate::{
    models::{Project, Step},
    tracker::InviteCreated,
};

/// Confirmation of a create operation followed by the new record.
pub struct CreateResult<T> {
    pub resource: T,
}

impl<T> CreateResult<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl fmt::Display for CreateResult<Project> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created project with ID: {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for CreateResult<Step> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created step with ID: {}", self.resource.id)?;
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for CreateResult<Vec<Step>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created {} step(s):", self.resource.len())?;
        writeln!(f)?;
        for step in &self.resource {
            writeln!(f, "- {} `{}`", step.name, step.id)?;
        }
        Ok(())
    }
}

impl fmt::Display for CreateResult<InviteCreated> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let invite = &self.resource.invite;
        writeln!(f, "Invited {} as {}", invite.email, invite.role)?;
        writeln!(f)?;
        writeln!(f, "- Link: {}", self.resource.link)?;
        writeln!(f, "- Token: `{}`", invite.token)?;
        writeln!(f)?;
        writeln!(f, "**{}**", self.resource.message.subject)?;
        writeln!(f)?;
        for line in self.resource.message.text.lines() {
            writeln!(f, "> {line}")?;
        }
        Ok(())
    }
}

/// Confirmation of an update with the list of changed fields.
pub struct UpdateResult<T> {
    pub resource: T,
    pub changes: Vec<String>,
}

impl<T> UpdateResult<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource,
            changes: Vec::new(),
        }
    }

    pub fn with_changes(resource: T, changes: Vec<String>) -> Self {
        Self { resource, changes }
    }
}

impl<T: fmt::Display> UpdateResult<T> {
    fn fmt_changes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.changes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Changes made:")?;
            for change in &self.changes {
                writeln!(f, "- {change}")?;
            }
        }
        writeln!(f)?;
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for UpdateResult<Project> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated project with ID: {}", self.resource.id)?;
        self.fmt_changes(f)
    }
}

impl fmt::Display for UpdateResult<Step> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Updated step with ID: {}", self.resource.id)?;
        self.fmt_changes(f)
    }
}

/// Confirmation of a step delete. Holds the requested step first and then
/// the descendants removed with it.
pub struct DeleteResult {
    pub steps: Vec<Step>,
}

impl DeleteResult {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

impl fmt::Display for DeleteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.steps.first() else {
            return writeln!(f, "Nothing was deleted.");
        };
        write!(f, "Deleted step '{}' (ID: {})", root.name, root.id)?;
        match self.steps.len() - 1 {
            0 => writeln!(f),
            1 => writeln!(f, " and 1 sub-step"),
            n => writeln!(f, " and {n} sub-steps"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::StepStatus, test_support::step};

    #[test]
    fn test_delete_result_counts_descendants() {
        let steps = vec![
            step("a", None, 0.0, StepStatus::NotStarted),
            step("b", Some("a"), 0.0, StepStatus::NotStarted),
            step("c", Some("a"), 1.0, StepStatus::NotStarted),
        ];
        assert_eq!(
            DeleteResult::new(steps).to_string(),
            "Deleted step 'Step a' (ID: a) and 2 sub-steps\n"
        );
    }

    #[test]
    fn test_update_result_lists_changes() {
        let s = step("a", None, 0.0, StepStatus::Complete);
        let output = UpdateResult::with_changes(s, vec!["status".to_string()]).to_string();
        assert!(output.starts_with("Updated step with ID: a\n\nChanges made:\n- status\n"));
    }
}

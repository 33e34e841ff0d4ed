//! Display implementations for the records in [`crate::models`].

use std::fmt;

use super::datetime::{LocalDateTime, RelativeTime};
use crate::models::{Activity, Invite, Membership, Project, ProjectSummary, Step};

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.title)?;
        writeln!(f)?;

        writeln!(f, "- ID: `{}`", self.id)?;
        match (self.start_date, self.due_date) {
            (Some(start), Some(due)) => writeln!(f, "- Dates: {start} → {due}")?,
            (Some(start), None) => writeln!(f, "- Starts: {start}")?,
            (None, Some(due)) => writeln!(f, "- Due: {due}")?,
            (None, None) => {}
        }
        if let Some(background) = &self.background {
            writeln!(f, "- Background: {background}")?;
        }
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        if let Some(desc) = &self.description {
            writeln!(f)?;
            writeln!(f, "{desc}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ProjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let progress = if self.total_steps > 0 {
            format!(" ({}/{})", self.complete_steps, self.total_steps)
        } else {
            String::new()
        };

        writeln!(f, "## {}{progress}", self.project.title)?;
        writeln!(f)?;
        writeln!(f, "- **ID**: `{}`", self.project.id)?;
        writeln!(f, "- **Role**: {}", self.role)?;
        if let Some(due) = self.project.due_date {
            writeln!(f, "- **Due**: {due}")?;
        }
        if let Some(desc) = &self.project.description {
            writeln!(f, "- **Description**: {desc}")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### {} ({})", self.name, self.status.with_icon())?;
        writeln!(f)?;

        writeln!(f, "- ID: `{}`", self.id)?;
        if let Some(parent) = &self.parent_id {
            writeln!(f, "- Parent: `{parent}`")?;
        }
        if let Some(due) = self.due_date {
            writeln!(f, "- Due: {due}")?;
        }
        if let Some(assignee) = &self.assignee {
            writeln!(f, "- Assignee: {assignee}")?;
        }
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        if let Some(notes) = &self.notes {
            writeln!(f)?;
            writeln!(f, "{notes}")?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "- **{}** ({}) since {}",
            self.user_id,
            self.role,
            LocalDateTime(&self.created_at)
        )
    }
}

impl fmt::Display for Invite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "- {} as {} (`{}`), expires {}",
            self.email,
            self.role,
            self.id,
            LocalDateTime(&self.expires_at)
        )
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}", self.kind.label())?;
        if let Some(name) = self.meta.get("name").and_then(|v| v.as_str()) {
            write!(f, ": {name}")?;
        } else if let Some(email) = self.meta.get("email").and_then(|v| v.as_str()) {
            write!(f, ": {email}")?;
        }
        if let Some(actor) = &self.actor_id {
            write!(f, " by {actor}")?;
        }
        writeln!(f, ", {}", RelativeTime::since_now(self.created_at))
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use serde_json::json;

    use super::*;
    use crate::{
        models::{ActivityKind, ProjectId, Role, StepStatus, UserId},
        test_support::step,
    };

    #[test]
    fn test_step_display() {
        let mut s = step("s1", None, 0.0, StepStatus::InReview);
        s.notes = Some("Check the copy".to_string());
        let output = s.to_string();
        assert!(output.starts_with("### Step s1 (◎ In Review)"));
        assert!(output.contains("- ID: `s1`"));
        assert!(output.contains("Check the copy"));
    }

    #[test]
    fn test_activity_display() {
        let activity = Activity {
            id: 1,
            project_id: ProjectId::from("p1"),
            actor_id: Some(UserId::from("ada")),
            kind: ActivityKind::StepCreated,
            ref_table: "steps".to_string(),
            meta: json!({ "name": "Design" }),
            created_at: Timestamp::now(),
        };
        assert_eq!(activity.to_string(), "- Step added: Design by ada, just now\n");
    }

    #[test]
    fn test_summary_progress() {
        let summary = ProjectSummary {
            project: Project {
                id: ProjectId::from("p1"),
                title: "Launch".to_string(),
                description: None,
                start_date: None,
                due_date: None,
                background: None,
                created_by: UserId::from("ada"),
                created_at: Timestamp::UNIX_EPOCH,
                updated_at: Timestamp::UNIX_EPOCH,
            },
            role: Role::Admin,
            total_steps: 4,
            complete_steps: 1,
        };
        let output = summary.to_string();
        assert!(output.starts_with("## Launch (1/4)"));
        assert!(output.contains("- **Role**: admin"));
    }
}

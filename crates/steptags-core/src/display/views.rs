//! The two projections of a workspace: the nested step list and the
//! status board.

use std::fmt;

use crate::{models::StepStatus, workspace::Workspace};

/// Nested markdown list of the visible steps, in sibling order.
pub struct TreeView<'a> {
    pub workspace: &'a Workspace,
    /// Print step ids after the names
    pub show_ids: bool,
}

impl<'a> TreeView<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            workspace,
            show_ids: false,
        }
    }

    pub fn with_ids(mut self, show_ids: bool) -> Self {
        self.show_ids = show_ids;
        self
    }
}

impl fmt::Display for TreeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forest = self.workspace.forest();
        if forest.is_empty() {
            return writeln!(f, "No steps yet.");
        }

        for (step, depth) in forest.flatten() {
            let icon = step.status.with_icon().split(' ').next().unwrap_or_default();
            write!(f, "{}- {icon} {}", "  ".repeat(depth), step.name)?;
            if let Some(due) = step.due_date {
                write!(f, " _(due {due})_")?;
            }
            if self.show_ids {
                write!(f, " `{}`", step.id)?;
            }
            writeln!(f)?;
        }

        let summary = self.workspace.summary();
        writeln!(f)?;
        writeln!(f, "{} of {} steps complete", summary.complete, summary.total)
    }
}

/// One section per status column, top-level steps only.
pub struct BoardView<'a> {
    pub workspace: &'a Workspace,
    pub show_ids: bool,
}

impl<'a> BoardView<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            workspace,
            show_ids: false,
        }
    }

    pub fn with_ids(mut self, show_ids: bool) -> Self {
        self.show_ids = show_ids;
        self
    }
}

impl fmt::Display for BoardView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let board = self.workspace.board();
        for (i, status) in StepStatus::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let bucket = board.bucket(*status);
            writeln!(f, "## {} ({})", status.with_icon(), bucket.len())?;
            writeln!(f)?;
            if bucket.is_empty() {
                writeln!(f, "_Empty_")?;
                continue;
            }
            for id in bucket {
                let Some(step) = self.workspace.step(id) else {
                    continue;
                };
                write!(f, "- {}", step.name)?;
                if self.show_ids {
                    write!(f, " `{}`", step.id)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        models::ProjectId,
        test_support::{step, PROJECT},
    };

    fn workspace() -> Workspace {
        let mut ws = Workspace::new(ProjectId::from(PROJECT), Duration::from_secs(5));
        ws.replace_all(vec![
            step("a", None, 0.0, StepStatus::InProgress),
            step("b", None, 1.0, StepStatus::Complete),
            step("c", Some("a"), 0.0, StepStatus::NotStarted),
        ]);
        ws
    }

    #[test]
    fn test_tree_view_nests_children() {
        let ws = workspace();
        let output = TreeView::new(&ws).to_string();
        assert!(output.starts_with("- ➤ Step a\n  - ○ Step c\n- ✓ Step b\n"));
        assert!(output.contains("1 of 3 steps complete"));
    }

    #[test]
    fn test_board_view_lists_top_level_only() {
        let ws = workspace();
        let output = BoardView::new(&ws).with_ids(true).to_string();
        assert!(output.contains("## ○ Not Started (0)\n\n_Empty_"));
        assert!(output.contains("## ➤ In Progress (1)\n\n- Step a `a`"));
        assert!(!output.contains("Step c"));
    }
}

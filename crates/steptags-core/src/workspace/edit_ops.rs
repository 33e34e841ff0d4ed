//! Optimistic edits.

use jiff::civil::Date;

use super::{Command, Workspace};
use crate::{
    error::{Result, TrackerError},
    forest::{is_descendant, SiblingIndex},
    models::{step::validate_name, NewStep, Step, StepId, StepPatch, StepStatus, UserId},
    ordering::{order_after, place_at, Placement},
};

/// Destination of a tree move.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoveTarget {
    /// New parent; `None` moves to the top level
    pub parent: Option<StepId>,
    /// Index among the new siblings; `None` appends
    pub position: Option<usize>,
}

impl MoveTarget {
    pub fn top_level(position: usize) -> Self {
        Self {
            parent: None,
            position: Some(position),
        }
    }

    pub fn under(parent: StepId) -> Self {
        Self {
            parent: Some(parent),
            position: None,
        }
    }
}

impl Workspace {
    fn require_visible(&self, id: &StepId) -> Result<&Step> {
        self.steps.get(id).ok_or_else(|| TrackerError::step_not_found(id))
    }

    /// Apply a field edit locally and return the write to send.
    ///
    /// A patch that changes the parent goes through the same cycle check as
    /// [`Workspace::move_step`].
    pub fn edit(&mut self, id: &StepId, patch: StepPatch) -> Result<Command> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(TrackerError::invalid_input("patch").with_reason("Nothing to update"));
        }
        self.require_visible(id)?;
        if let Some(Some(parent)) = &patch.parent_id {
            self.check_parent(id, parent)?;
        }

        self.begin_write(id, &patch.fields());
        self.apply_local(id, &patch);
        self.refresh_card(id);
        log::debug!("Edited step {id}: {:?}", patch.fields());
        Ok(Command::Update {
            id: id.clone(),
            patch,
        })
    }

    pub fn rename(&mut self, id: &StepId, name: impl Into<String>) -> Result<Command> {
        self.edit(id, StepPatch::name(name))
    }

    /// Inline status change. The card moves to the tail of its new column.
    pub fn set_status(&mut self, id: &StepId, status: StepStatus) -> Result<Command> {
        self.edit(id, StepPatch::status(status))
    }

    pub fn set_due_date(&mut self, id: &StepId, due_date: Option<Date>) -> Result<Command> {
        self.edit(
            id,
            StepPatch {
                due_date: Some(due_date),
                ..Default::default()
            },
        )
    }

    pub fn set_notes(&mut self, id: &StepId, notes: Option<String>) -> Result<Command> {
        self.edit(
            id,
            StepPatch {
                notes: Some(notes.filter(|n| !n.trim().is_empty())),
                ..Default::default()
            },
        )
    }

    pub fn assign(&mut self, id: &StepId, assignee: Option<UserId>) -> Result<Command> {
        self.edit(
            id,
            StepPatch {
                assignee: Some(assignee),
                ..Default::default()
            },
        )
    }

    /// Drag a card to `status` at `position`.
    ///
    /// Only the status is written to the backend; the position is kept on
    /// the board alone. Reordering within a column writes nothing.
    pub fn move_card(&mut self, id: &StepId, status: StepStatus, position: usize) -> Result<Option<Command>> {
        let step = self.require_visible(id)?;
        if !step.is_top_level() {
            return Err(TrackerError::invalid_input("step")
                .with_reason(format!("Step {id} is nested and has no board card")));
        }
        let unchanged = step.status == status;

        self.board.move_card(id, status, position);
        if unchanged {
            return Ok(None);
        }

        let patch = StepPatch::status(status);
        self.begin_write(id, &patch.fields());
        self.apply_local(id, &patch);
        log::debug!("Moved card {id} to {status} at {position}");
        Ok(Some(Command::Update {
            id: id.clone(),
            patch,
        }))
    }

    /// Reparent and/or reorder a step in the tree.
    ///
    /// The first command moves the step itself; when the sibling list had to
    /// be renumbered, order-only updates for the other siblings follow.
    pub fn move_step(&mut self, id: &StepId, target: MoveTarget) -> Result<Vec<Command>> {
        self.require_visible(id)?;
        if let Some(parent) = &target.parent {
            self.check_parent(id, parent)?;
        }

        let placement = {
            let index = SiblingIndex::new(self.steps.values());
            let siblings: Vec<&Step> = index
                .siblings(target.parent.as_ref())
                .iter()
                .copied()
                .filter(|s| &s.id != id)
                .collect();
            let position = target.position.unwrap_or(siblings.len());
            place_at(&siblings, id, position)
        };

        let moved_patch = |order: f64| StepPatch {
            parent_id: Some(target.parent.clone()),
            order: Some(order),
            ..Default::default()
        };

        let mut patches = Vec::new();
        match placement {
            Placement::Order(order) => patches.push((id.clone(), moved_patch(order))),
            Placement::Renumber(orders) => {
                let mut others = Vec::new();
                for (sibling, order) in orders {
                    if &sibling == id {
                        patches.push((sibling, moved_patch(order)));
                    } else if self.steps.get(&sibling).is_some_and(|s| s.order != order) {
                        others.push((sibling, StepPatch::order(order)));
                    }
                }
                patches.extend(others);
            }
        }

        let mut commands = Vec::with_capacity(patches.len());
        for (step_id, patch) in patches {
            self.begin_write(&step_id, &patch.fields());
            self.apply_local(&step_id, &patch);
            commands.push(Command::Update { id: step_id, patch });
        }

        self.place_moved_card(id);
        log::debug!("Moved step {id} under {:?}", target.parent);
        Ok(commands)
    }

    /// Keep the board in step with a tree move: a top-level step's card goes
    /// right before the next top-level sibling sharing its column.
    fn place_moved_card(&mut self, id: &StepId) {
        let Some(step) = self.steps.get(id) else {
            return;
        };
        if !step.is_top_level() {
            self.board.remove(id);
            return;
        }
        let status = step.status;
        let followers: Vec<StepId> = {
            let index = SiblingIndex::new(self.steps.values());
            index
                .siblings(None)
                .iter()
                .map(|s| s.id.clone())
                .skip_while(|sibling| sibling != id)
                .skip(1)
                .collect()
        };
        self.board.insert_before_any(id, status, &followers);
    }

    fn check_parent(&self, id: &StepId, parent: &StepId) -> Result<()> {
        if !self.steps.contains_key(parent) {
            return Err(TrackerError::step_not_found(parent));
        }
        if is_descendant(&self.steps, parent, id) {
            return Err(TrackerError::Cycle {
                step: id.to_string(),
                parent: parent.to_string(),
            });
        }
        Ok(())
    }

    /// Creation request for a new step appended after its siblings.
    pub fn draft_step(&self, parent: Option<StepId>, name: impl Into<String>) -> Result<NewStep> {
        let name = name.into();
        validate_name(&name)?;
        if let Some(parent) = &parent {
            self.require_visible(parent)?;
        }

        let index = SiblingIndex::new(self.steps.values());
        let last = index.siblings(parent.as_ref()).last().map(|s| s.order);
        let mut draft = NewStep::new(self.project_id.clone(), parent, name.trim());
        draft.order = Some(order_after(last));
        Ok(draft)
    }

    /// Record a step the backend just created. Safe to call after the
    /// realtime echo already inserted it.
    pub fn insert_created(&mut self, step: Step) {
        if step.is_deleted() || self.tombstones.contains(&step.id) || self.is_hidden(&step.id) {
            return;
        }
        self.upsert(step);
    }
}

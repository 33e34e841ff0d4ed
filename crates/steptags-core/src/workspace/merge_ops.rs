//! Folding backend results and realtime pushes into the workspace.
//!
//! Every merge here is idempotent: a write confirmation followed by the
//! realtime echo of the same write leaves the collection exactly as one of
//! them alone would.

use std::collections::BTreeSet;

use super::{Command, Notice, Workspace};
use crate::{
    models::{Step, StepField, StepId},
    realtime::ChangeEvent,
};

impl Workspace {
    /// Apply one realtime event. Returns [`Command::Reload`] when the feed
    /// lost events.
    pub fn apply_change(&mut self, event: ChangeEvent) -> Option<Command> {
        match event {
            ChangeEvent::Inserted(step) => {
                if self.belongs_here(&step) {
                    self.merge_insert(step);
                }
                None
            }
            ChangeEvent::Updated(step) => {
                if self.belongs_here(&step) {
                    self.merge_update(step);
                }
                None
            }
            ChangeEvent::Deleted { project_id, id } => {
                if project_id.map_or(true, |p| p == self.project_id) {
                    self.merge_delete(&id);
                }
                None
            }
            ChangeEvent::Resync => Some(Command::Reload),
        }
    }

    fn belongs_here(&self, step: &Step) -> bool {
        step.project_id == self.project_id
    }

    fn merge_insert(&mut self, step: Step) {
        if step.is_deleted() {
            self.merge_delete(&step.id);
            return;
        }
        let known = self.steps.contains_key(&step.id)
            || self.is_hidden(&step.id)
            || self.tombstones.contains(&step.id);
        if !known {
            log::debug!("Realtime insert of step {}", step.id);
            self.upsert(step);
        }
    }

    fn merge_update(&mut self, step: Step) {
        if step.is_deleted() {
            self.merge_delete(&step.id);
            return;
        }
        if self.tombstones.contains(&step.id) {
            return;
        }
        // Hidden copies take the push so an undo restores current data
        if let Some(hidden) = self.hidden_mut(&step.id) {
            hidden.merge_from(&step, &BTreeSet::new());
            return;
        }
        self.upsert(step);
    }

    fn merge_delete(&mut self, id: &StepId) {
        // Our own delete is on its way; its outcome settles the subtree
        if self.deleting.contains_key(id) {
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            if &pending.id == id {
                log::debug!("Step {id} was deleted elsewhere during its undo window");
                pending.deleted_elsewhere = true;
                return;
            }
            pending.removed.retain(|s| &s.id != id);
        }
        for removed in self.deleting.values_mut() {
            removed.retain(|s| &s.id != id);
        }
        if self.steps.remove(id).is_some() {
            log::debug!("Realtime delete of step {id}");
        }
        self.board.remove(id);
        self.in_flight.remove(id);
        self.tombstones.insert(id.clone());
    }

    /// A write finished. `confirmed` is the record the backend returned,
    /// when it returned one.
    ///
    /// Fields this write carried keep their local value, which is never older
    /// than the confirmation, whatever order confirmations arrive in.
    pub fn write_succeeded(&mut self, id: &StepId, fields: &BTreeSet<StepField>, confirmed: Option<Step>) {
        self.end_write(id, fields);
        let Some(step) = confirmed else {
            return;
        };
        if step.is_deleted() {
            self.merge_delete(&step.id);
            return;
        }
        if &step.id != id || self.tombstones.contains(id) {
            return;
        }

        let mut keep = self.in_flight_fields(id);
        keep.extend(fields.iter().copied());
        if let Some(hidden) = self.hidden_mut(id) {
            hidden.merge_from(&step, &keep);
            return;
        }
        if let Some(local) = self.steps.get_mut(id) {
            local.merge_from(&step, &keep);
            self.refresh_card(id);
        }
    }

    /// A write failed. The whole collection is reloaded, which also reverts
    /// any other local edit that has not reached the backend yet.
    pub fn write_failed(&mut self, id: &StepId, fields: &BTreeSet<StepField>, reason: &str) -> Command {
        self.end_write(id, fields);
        let name = self
            .steps
            .get(id)
            .map_or_else(|| id.to_string(), |s| s.name.clone());
        self.notify(Notice::error(format!("Could not save \"{name}\": {reason}")));
        Command::Reload
    }
}

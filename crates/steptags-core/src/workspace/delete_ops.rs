//! Delete with a grace window.
//!
//! A requested delete hides the step and its subtree at once but holds the
//! backend call back until the window elapses. Only one delete can wait at a
//! time: requesting a second one sends the first immediately.

use std::time::Duration;

use tokio::time::Instant;

use super::{Command, Notice, PendingDelete, Workspace};
use crate::{
    error::{Result, TrackerError},
    models::{Step, StepId, StepStatus},
};

impl Workspace {
    /// Hide `id` and its subtree and start the undo window.
    ///
    /// Returns the soft delete of a previously pending step, which is
    /// finalized rather than left racing a second timer.
    pub fn request_delete(&mut self, id: &StepId, now: Instant) -> Result<Option<Command>> {
        if !self.steps.contains_key(id) {
            return Err(TrackerError::step_not_found(id));
        }
        let finalized = self.flush_delete();

        let subtree = self.subtree_ids(id);
        let board_slot = self.board.remove(id);
        let removed: Vec<_> = subtree
            .iter()
            .filter_map(|step_id| self.steps.remove(step_id))
            .collect();
        let name = removed.first().map(|s| s.name.clone()).unwrap_or_default();

        self.pending = Some(PendingDelete {
            id: id.clone(),
            removed,
            board_slot,
            deadline: now + self.grace_window,
            deleted_elsewhere: false,
        });
        self.notify(Notice::info(format!(
            "Deleted \"{name}\". Undo within {}",
            window_label(self.grace_window)
        )));
        Ok(finalized)
    }

    /// Step currently inside its undo window.
    pub fn pending_delete(&self) -> Option<&StepId> {
        self.pending.as_ref().map(|p| &p.id)
    }

    /// When the pending delete will be sent.
    pub fn delete_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Cancel the pending delete, putting the subtree back where it was.
    ///
    /// Nothing comes back when the backend already deleted the step on
    /// behalf of someone else; `None` is returned then.
    pub fn undo_delete(&mut self) -> Option<StepId> {
        let pending = self.pending.take()?;
        if pending.deleted_elsewhere {
            let name = pending.removed.first().map(|s| s.name.clone()).unwrap_or_default();
            self.bury(pending.removed);
            self.notify(Notice::info(format!("\"{name}\" was already deleted by someone else")));
            return None;
        }
        self.restore(pending.removed, pending.board_slot);
        log::debug!("Undid delete of step {}", pending.id);
        Some(pending.id)
    }

    /// Send the pending delete if its window has elapsed by `now`.
    pub fn expire(&mut self, now: Instant) -> Option<Command> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.flush_delete(),
            _ => None,
        }
    }

    /// Send the pending delete without waiting. A step the backend already
    /// deleted is finalized locally with no call.
    pub fn flush_delete(&mut self) -> Option<Command> {
        let pending = self.pending.take()?;
        log::debug!("Finalizing delete of step {}", pending.id);
        if pending.deleted_elsewhere {
            self.bury(pending.removed);
            return None;
        }
        self.deleting.insert(pending.id.clone(), pending.removed);
        Some(Command::SoftDelete { id: pending.id })
    }

    pub fn delete_succeeded(&mut self, id: &StepId) {
        if let Some(removed) = self.deleting.remove(id) {
            self.bury(removed);
        }
    }

    /// The backend refused the delete: bring the subtree back and reload so
    /// the view matches the backend again.
    pub fn delete_failed(&mut self, id: &StepId, reason: &str) -> Option<Command> {
        let removed = self.deleting.remove(id)?;
        let name = removed.first().map(|s| s.name.clone()).unwrap_or_default();
        self.restore(removed, None);
        self.notify(Notice::error(format!("Could not delete \"{name}\": {reason}")));
        Some(Command::Reload)
    }

    fn bury(&mut self, removed: Vec<Step>) {
        for step in removed {
            self.in_flight.remove(&step.id);
            self.tombstones.insert(step.id);
        }
    }

    fn restore(&mut self, removed: Vec<Step>, board_slot: Option<(StepStatus, usize)>) {
        let root = removed.first().map(|s| s.id.clone());
        for step in removed {
            if !self.tombstones.contains(&step.id) {
                self.steps.entry(step.id.clone()).or_insert(step);
            }
        }

        let Some(root) = root else {
            return;
        };
        let status = self.steps.get(&root).filter(|s| s.is_top_level()).map(|s| s.status);
        match (status, board_slot) {
            (Some(status), Some((slot_status, idx))) if status == slot_status => {
                self.board.move_card(&root, status, idx);
            }
            (Some(status), _) => self.board.append(&root, status),
            (None, _) => {}
        }
    }
}

/// `5s`, `250ms`; partial seconds above one second round up.
fn window_label(window: Duration) -> String {
    if window.subsec_nanos() == 0 {
        format!("{}s", window.as_secs())
    } else if window < Duration::from_secs(1) {
        format!("{}ms", window.as_millis().max(1))
    } else {
        format!("{}s", window.as_secs() + 1)
    }
}

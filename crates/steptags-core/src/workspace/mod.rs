//! Client-side state container for one open project.
//!
//! A [`Workspace`] owns the flat step collection together with everything
//! derived from it or layered on top of it: the status [`Board`], the
//! per-step set of fields with a write in flight, the single pending delete
//! and the notices waiting to be shown. It performs no I/O. Every mutating
//! method updates the in-memory state synchronously and returns the
//! [`Command`]s a driver has to execute against the backend; the driver
//! reports the outcome back through the `*_succeeded` / `*_failed` methods.
//!
//! ```text
//!   user edit ──▶ edit_ops ───┐
//!   timer ──────▶ delete_ops ─┼──▶ Workspace state ──▶ Forest / Board
//!   push ───────▶ merge_ops ──┘          │
//!                                        ▼
//!                                  Vec<Command> ──▶ backend
//! ```
//!
//! ## Submodules
//!
//! - [`edit_ops`]: optimistic field edits, card moves and tree moves
//! - [`delete_ops`]: the grace-window delete with undo
//! - [`merge_ops`]: realtime pushes, write outcomes and reloads
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use steptags_core::{
//!     models::{ProjectId, StepStatus},
//!     workspace::{Command, Workspace},
//! };
//!
//! let mut workspace = Workspace::new(ProjectId::from("p1"), Duration::from_secs(5));
//! assert!(workspace.forest().is_empty());
//! assert!(workspace.board().bucket(StepStatus::NotStarted).is_empty());
//! assert!(workspace.take_notices().is_empty());
//! ```

pub mod delete_ops;
pub mod edit_ops;
pub mod merge_ops;


use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt,
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    board::Board,
    forest::Forest,
    models::{ProjectId, Step, StepField, StepId, StepPatch, StepStatus, StepSummary},
};

pub use edit_ops::MoveTarget;

/// Backend call a driver must make after a workspace mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Update { id: StepId, patch: StepPatch },
    SoftDelete { id: StepId },
    /// Refetch the whole collection and pass it to [`Workspace::replace_all`].
    Reload,
}

/// Reconciliation state of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Matches the last known backend state
    Clean,
    /// At least one field has a write in flight
    LocallyEdited,
    /// Hidden, inside the undo window
    PendingDelete,
    /// Delete sent to (or confirmed by) the backend
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The delete currently inside its undo window.
#[derive(Debug, Clone)]
pub(crate) struct PendingDelete {
    pub(crate) id: StepId,
    /// The step and its whole subtree, as they were when hidden
    pub(crate) removed: Vec<Step>,
    /// Board column and index the card occupied, for top-level steps
    pub(crate) board_slot: Option<(StepStatus, usize)>,
    pub(crate) deadline: Instant,
    /// The backend reported the step deleted while the window was open
    pub(crate) deleted_elsewhere: bool,
}

/// Owned application state for one project view.
pub struct Workspace {
    project_id: ProjectId,
    /// Visible steps
    steps: HashMap<StepId, Step>,
    board: Board,
    /// Outstanding writes per step and field
    in_flight: HashMap<StepId, BTreeMap<StepField, u32>>,
    pending: Option<PendingDelete>,
    /// Deletes sent to the backend and not yet answered, with their hidden subtree
    deleting: HashMap<StepId, Vec<Step>>,
    /// Ids the backend confirmed deleted
    tombstones: HashSet<StepId>,
    grace_window: Duration,
    notices: Vec<Notice>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("project_id", &self.project_id)
            .field("steps", &self.steps.len())
            .field("pending", &self.pending.as_ref().map(|p| &p.id))
            .field("deleting", &self.deleting.len())
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(project_id: ProjectId, grace_window: Duration) -> Self {
        Self {
            project_id,
            steps: HashMap::new(),
            board: Board::default(),
            in_flight: HashMap::new(),
            pending: None,
            deleting: HashMap::new(),
            tombstones: HashSet::new(),
            grace_window,
            notices: Vec::new(),
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn grace_window(&self) -> Duration {
        self.grace_window
    }

    /// A visible step.
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.get(id)
    }

    /// Visible steps, unordered.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    pub fn forest(&self) -> Forest {
        Forest::build(self.steps.values())
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn summary(&self) -> StepSummary {
        StepSummary::from_steps(self.steps.values())
    }

    pub fn state_of(&self, id: &StepId) -> Option<StepState> {
        if self.pending_contains(id) {
            return Some(StepState::PendingDelete);
        }
        if self.tombstones.contains(id) || self.deleting.values().flatten().any(|s| &s.id == id) {
            return Some(StepState::Deleted);
        }
        self.steps.get(id).map(|_| {
            if self.in_flight_fields(id).is_empty() {
                StepState::Clean
            } else {
                StepState::LocallyEdited
            }
        })
    }

    /// Whether any write is still awaiting its outcome.
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty() || !self.deleting.is_empty()
    }

    /// Notices queued since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice.message),
            NoticeLevel::Error => log::warn!("{}", notice.message),
        }
        self.notices.push(notice);
    }

    /// Fields of `id` with at least one write outstanding.
    pub fn in_flight_fields(&self, id: &StepId) -> BTreeSet<StepField> {
        self.in_flight
            .get(id)
            .map(|fields| fields.keys().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn begin_write(&mut self, id: &StepId, fields: &BTreeSet<StepField>) {
        let counters = self.in_flight.entry(id.clone()).or_default();
        for field in fields {
            *counters.entry(*field).or_insert(0) += 1;
        }
    }

    pub(crate) fn end_write(&mut self, id: &StepId, fields: &BTreeSet<StepField>) {
        let Some(counters) = self.in_flight.get_mut(id) else {
            return;
        };
        for field in fields {
            if let Some(count) = counters.get_mut(field) {
                *count -= 1;
                if *count == 0 {
                    counters.remove(field);
                }
            }
        }
        if counters.is_empty() {
            self.in_flight.remove(id);
        }
    }

    fn pending_contains(&self, id: &StepId) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.removed.iter().any(|s| &s.id == id))
    }

    /// Hidden copy of a step inside the pending or an in-flight delete.
    pub(crate) fn hidden_mut(&mut self, id: &StepId) -> Option<&mut Step> {
        let pending = self.pending.as_mut().map(|p| p.removed.iter_mut()).into_iter().flatten();
        let deleting = self.deleting.values_mut().flatten();
        pending.chain(deleting).find(|s| &s.id == id)
    }

    pub(crate) fn is_hidden(&self, id: &StepId) -> bool {
        self.pending_contains(id) || self.deleting.values().flatten().any(|s| &s.id == id)
    }

    /// `id` and every visible step below it, parents before children.
    pub(crate) fn subtree_ids(&self, id: &StepId) -> Vec<StepId> {
        let mut children: HashMap<&StepId, Vec<&StepId>> = HashMap::new();
        for step in self.steps.values() {
            if let Some(parent) = &step.parent_id {
                children.entry(parent).or_default().push(&step.id);
            }
        }

        let mut out = vec![id.clone()];
        let mut cursor = 0;
        while cursor < out.len() {
            if let Some(kids) = children.get(&out[cursor]) {
                out.extend(kids.iter().map(|k| (*k).clone()));
            }
            cursor += 1;
        }
        out
    }

    /// Bring the card of `id` in line with the step's status and level.
    /// A card that changes column goes to the tail of the new one.
    pub(crate) fn refresh_card(&mut self, id: &StepId) {
        let wanted = self
            .steps
            .get(id)
            .filter(|s| s.is_top_level() && !s.is_deleted())
            .map(|s| s.status);
        if wanted == self.board.status_of(id) {
            return;
        }
        match wanted {
            Some(status) => self.board.append(id, status),
            None => {
                self.board.remove(id);
            }
        }
    }

    /// Insert or merge a backend record. Fields with a write in flight keep
    /// their local value.
    pub(crate) fn upsert(&mut self, incoming: Step) {
        let keep = self.in_flight_fields(&incoming.id);
        let id = incoming.id.clone();
        match self.steps.get_mut(&id) {
            Some(local) => local.merge_from(&incoming, &keep),
            None => {
                self.steps.insert(id.clone(), incoming);
            }
        }
        self.refresh_card(&id);
    }

    /// Replace the collection with a fresh backend listing.
    ///
    /// Fields with a write in flight keep their local values, the pending
    /// delete stays hidden, and the board keeps its local column order.
    pub fn replace_all(&mut self, fetched: Vec<Step>) {
        let mut next = HashMap::with_capacity(fetched.len());
        for incoming in fetched {
            if incoming.is_deleted() || incoming.project_id != self.project_id {
                continue;
            }
            if self.tombstones.contains(&incoming.id) {
                continue;
            }
            if let Some(hidden) = self.hidden_mut(&incoming.id) {
                hidden.merge_from(&incoming, &BTreeSet::new());
                continue;
            }
            let keep = self.in_flight_fields(&incoming.id);
            let merged = match self.steps.get(&incoming.id) {
                Some(local) if !keep.is_empty() => {
                    let mut merged = local.clone();
                    merged.merge_from(&incoming, &keep);
                    merged
                }
                _ => incoming,
            };
            next.insert(merged.id.clone(), merged);
        }

        self.steps = next;
        self.board.resync(self.steps.values());
        log::debug!(
            "Reloaded project {} with {} visible steps",
            self.project_id,
            self.steps.len()
        );
    }

    /// Apply a local patch without issuing a write.
    pub(crate) fn apply_local(&mut self, id: &StepId, patch: &StepPatch) -> Option<&Step> {
        let step = self.steps.get_mut(id)?;
        patch.apply_to(step);
        Some(step)
    }
}

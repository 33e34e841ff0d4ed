//! Async driver tying a [`Workspace`] to a [`StepBackend`].
//!
//! The session is the single dispatcher for one project view. User edits are
//! applied to the workspace synchronously; the resulting backend calls run as
//! spawned tasks and report back over a channel. [`Session::next_event`]
//! waits on three sources at once: those call outcomes, the realtime
//! subscription, and the grace-window deadline of a pending delete. Failures
//! never escape the loop; they turn into notices and reloads.
//!
//! ```text
//!   edits ──▶ Workspace ──▶ Command ──▶ tokio::spawn(backend call)
//!                ▲                              │
//!                │        mpsc outcome ◀────────┘
//!                ├──────── Subscription::recv()
//!                └──────── sleep_until(delete deadline)
//! ```

use std::{collections::BTreeSet, future, sync::Arc, time::Duration};

use jiff::civil::Date;
use tokio::{
    sync::mpsc,
    time::{self, Instant},
};

use crate::{
    backend::StepBackend,
    error::{Result, TrackerError},
    models::{ProjectId, Step, StepField, StepId, StepPatch, StepStatus, UserId},
    realtime::{ChangeEvent, Subscription},
    workspace::{Command, MoveTarget, Notice, Workspace},
};

/// Default undo window for deletes.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a delete stays undoable before it is sent
    pub grace_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
        }
    }
}

/// What [`Session::next_event`] handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An update call resolved (successfully or not)
    WriteSettled(StepId),
    /// The grace window elapsed and the delete was sent
    DeleteSent(StepId),
    /// A delete call resolved
    DeleteSettled(StepId),
    /// A reload finished
    Reloaded,
    /// A realtime change was merged
    Remote,
    /// The change feed went away
    FeedClosed,
}

enum Outcome {
    Updated {
        id: StepId,
        fields: BTreeSet<StepField>,
        result: Result<Step>,
    },
    Deleted {
        id: StepId,
        result: Result<()>,
    },
    Reloaded(Result<Vec<Step>>),
}

/// One open project view.
pub struct Session<B: StepBackend + 'static> {
    backend: Arc<B>,
    workspace: Workspace,
    subscription: Option<Subscription>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
    in_flight: usize,
}

impl<B: StepBackend + 'static> Session<B> {
    /// Subscribe to the project's changes, then load it. Subscribing first
    /// means nothing written in between is missed.
    pub async fn open(backend: Arc<B>, project_id: ProjectId, config: SessionConfig) -> Result<Self> {
        let subscription = backend.subscribe(&project_id);
        let steps = backend.list_steps(&project_id).await?;

        let mut workspace = Workspace::new(project_id, config.grace_window);
        workspace.replace_all(steps);
        log::info!(
            "Opened session for project {} with {} steps",
            workspace.project_id(),
            workspace.steps().count()
        );

        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Ok(Self {
            backend,
            workspace,
            subscription: Some(subscription),
            outcome_tx,
            outcome_rx,
            in_flight: 0,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Notices queued since the last call.
    pub fn notices(&mut self) -> Vec<Notice> {
        self.workspace.take_notices()
    }

    /// Backend calls still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn dispatch(&mut self, command: Command) {
        let backend = Arc::clone(&self.backend);
        let tx = self.outcome_tx.clone();
        self.in_flight += 1;

        match command {
            Command::Update { id, patch } => {
                tokio::spawn(async move {
                    let result = backend.update_step(&id, &patch).await;
                    let fields = patch.fields();
                    let _ = tx.send(Outcome::Updated { id, fields, result });
                });
            }
            Command::SoftDelete { id } => {
                tokio::spawn(async move {
                    let result = backend.soft_delete_step(&id).await;
                    let _ = tx.send(Outcome::Deleted { id, result });
                });
            }
            Command::Reload => {
                let project_id = self.workspace.project_id().clone();
                tokio::spawn(async move {
                    let result = backend.list_steps(&project_id).await;
                    let _ = tx.send(Outcome::Reloaded(result));
                });
            }
        }
    }

    fn dispatch_all(&mut self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.dispatch(command);
        }
    }

    pub fn edit(&mut self, id: &StepId, patch: StepPatch) -> Result<()> {
        let command = self.workspace.edit(id, patch)?;
        self.dispatch(command);
        Ok(())
    }

    pub fn rename(&mut self, id: &StepId, name: impl Into<String>) -> Result<()> {
        let command = self.workspace.rename(id, name)?;
        self.dispatch(command);
        Ok(())
    }

    pub fn set_status(&mut self, id: &StepId, status: StepStatus) -> Result<()> {
        let command = self.workspace.set_status(id, status)?;
        self.dispatch(command);
        Ok(())
    }

    pub fn set_due_date(&mut self, id: &StepId, due_date: Option<Date>) -> Result<()> {
        let command = self.workspace.set_due_date(id, due_date)?;
        self.dispatch(command);
        Ok(())
    }

    pub fn set_notes(&mut self, id: &StepId, notes: Option<String>) -> Result<()> {
        let command = self.workspace.set_notes(id, notes)?;
        self.dispatch(command);
        Ok(())
    }

    pub fn assign(&mut self, id: &StepId, assignee: Option<UserId>) -> Result<()> {
        let command = self.workspace.assign(id, assignee)?;
        self.dispatch(command);
        Ok(())
    }

    pub fn move_card(&mut self, id: &StepId, status: StepStatus, position: usize) -> Result<()> {
        let command = self.workspace.move_card(id, status, position)?;
        self.dispatch_all(command);
        Ok(())
    }

    pub fn move_step(&mut self, id: &StepId, target: MoveTarget) -> Result<()> {
        let commands = self.workspace.move_step(id, target)?;
        self.dispatch_all(commands);
        Ok(())
    }

    /// Hide the step and start its undo window.
    pub fn delete(&mut self, id: &StepId) -> Result<()> {
        let finalized = self.workspace.request_delete(id, Instant::now())?;
        self.dispatch_all(finalized);
        Ok(())
    }

    pub fn undo_delete(&mut self) -> Option<StepId> {
        self.workspace.undo_delete()
    }

    /// Create a step under `parent` (or at the top level), appended after
    /// its siblings. Waits for the backend since the id is assigned there.
    pub async fn create_step(&mut self, parent: Option<StepId>, name: &str) -> Result<Step> {
        let draft = self.workspace.draft_step(parent, name)?;
        match self.backend.create_step(&draft).await {
            Ok(step) => {
                self.workspace.insert_created(step.clone());
                Ok(step)
            }
            Err(e) => {
                self.workspace
                    .notify(Notice::error(format!("Could not add \"{}\": {e}", draft.name)));
                Err(e)
            }
        }
    }

    /// Wait for and handle the next outcome, change or timer.
    ///
    /// Returns `None` when nothing can happen any more: no call running, no
    /// delete pending and no subscription.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let deadline = self.workspace.delete_deadline();
            if self.in_flight == 0 && deadline.is_none() && self.subscription.is_none() {
                return None;
            }

            tokio::select! {
                Some(outcome) = self.outcome_rx.recv(), if self.in_flight > 0 => {
                    self.in_flight -= 1;
                    return Some(self.handle_outcome(outcome));
                }
                change = next_change(&mut self.subscription) => {
                    return Some(self.handle_change(change));
                }
                () = sleep_until(deadline) => {
                    if let Some(event) = self.finish_expired_delete() {
                        return Some(event);
                    }
                }
            }
        }
    }

    /// Send the delete whose window elapsed. One the backend already
    /// deleted elsewhere settles right away without a call.
    fn finish_expired_delete(&mut self) -> Option<SessionEvent> {
        let id = self.workspace.pending_delete()?.clone();
        match self.workspace.expire(Instant::now()) {
            Some(command) => {
                self.dispatch(command);
                Some(SessionEvent::DeleteSent(id))
            }
            None if self.workspace.pending_delete().is_none() => Some(SessionEvent::DeleteSettled(id)),
            None => None,
        }
    }

    fn handle_outcome(&mut self, outcome: Outcome) -> SessionEvent {
        match outcome {
            Outcome::Updated { id, fields, result } => {
                match result {
                    Ok(step) => self.workspace.write_succeeded(&id, &fields, Some(step)),
                    Err(e) => {
                        let reload = self.workspace.write_failed(&id, &fields, &e.to_string());
                        self.dispatch(reload);
                    }
                }
                SessionEvent::WriteSettled(id)
            }
            Outcome::Deleted { id, result } => {
                match result {
                    // Already gone is what we asked for
                    Ok(()) | Err(TrackerError::StepNotFound { .. }) => self.workspace.delete_succeeded(&id),
                    Err(e) => {
                        if let Some(reload) = self.workspace.delete_failed(&id, &e.to_string()) {
                            self.dispatch(reload);
                        }
                    }
                }
                SessionEvent::DeleteSettled(id)
            }
            Outcome::Reloaded(result) => {
                match result {
                    Ok(steps) => self.workspace.replace_all(steps),
                    Err(e) => self
                        .workspace
                        .notify(Notice::error(format!("Could not reload steps: {e}"))),
                }
                SessionEvent::Reloaded
            }
        }
    }

    fn handle_change(&mut self, change: Option<ChangeEvent>) -> SessionEvent {
        let Some(event) = change else {
            log::warn!("Change feed closed for project {}", self.workspace.project_id());
            self.subscription = None;
            return SessionEvent::FeedClosed;
        };
        if let Some(command) = self.workspace.apply_change(event) {
            self.dispatch(command);
        }
        SessionEvent::Remote
    }

    /// Run until no call is running and no delete is pending.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 || self.workspace.pending_delete().is_some() {
            if self.next_event().await.is_none() {
                break;
            }
        }
    }

    /// Send any pending delete now, wait for every call, and stop listening.
    pub async fn close(mut self) -> Workspace {
        if let Some(command) = self.workspace.flush_delete() {
            self.dispatch(command);
        }
        self.settle().await;
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.workspace
    }
}

async fn next_change(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

//! Step edits made through a short-lived [`Session`].
//!
//! The CLI and the MCP server change steps the same way an interactive
//! client does: open a session on the step's project, apply the edit to the
//! workspace, wait for the backend to answer and read back the reconciled
//! state. A failed write surfaces as an error notice after the session's
//! reload, which is turned into an error here.

use std::sync::Arc;

use anyhow::{bail, Result};
use steptags_core::{
    forest::ForestNode, NoticeLevel, Session, SessionConfig, Step, StepId, Tracker, Workspace,
};

/// Open a session on the project that owns `id`.
pub async fn open_for_step(
    tracker: &Arc<Tracker>,
    id: &StepId,
    config: SessionConfig,
) -> Result<Session<Tracker>> {
    let step = tracker.get_step(id).await?;
    let session = Session::open(Arc::clone(tracker), step.project_id, config).await?;
    Ok(session)
}

/// Close the session and fail if any write was refused.
pub async fn finish(session: Session<Tracker>) -> Result<Workspace> {
    let mut workspace = session.close().await;
    let errors: Vec<String> = workspace
        .take_notices()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .map(|n| n.message)
        .collect();
    if !errors.is_empty() {
        bail!(errors.join("; "));
    }
    Ok(workspace)
}

/// The step and every visible descendant, parent first.
pub fn subtree(workspace: &Workspace, id: &StepId) -> Vec<Step> {
    fn walk(node: &ForestNode, out: &mut Vec<Step>) {
        out.push(node.step.clone());
        for child in &node.children {
            walk(child, out);
        }
    }

    let mut out = Vec::new();
    if let Some(node) = workspace.forest().find(id) {
        walk(node, &mut out);
    }
    out
}

/// The reconciled step after an edit.
pub fn edited_step(workspace: &Workspace, id: &StepId) -> Result<Step> {
    match workspace.step(id) {
        Some(step) => Ok(step.clone()),
        None => bail!("Step {id} is no longer visible"),
    }
}

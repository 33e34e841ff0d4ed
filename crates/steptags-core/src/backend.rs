//! The backend contract the client side relies on.

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{NewStep, ProjectId, Step, StepId, StepPatch},
    realtime::Subscription,
};

/// Step storage plus its change feed.
///
/// [`crate::Tracker`] implements this over SQLite; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait StepBackend: Send + Sync {
    /// Non-deleted steps of a project, ordered by parent then order.
    async fn list_steps(&self, project_id: &ProjectId) -> Result<Vec<Step>>;

    async fn create_step(&self, step: &NewStep) -> Result<Step>;

    async fn update_step(&self, id: &StepId, patch: &StepPatch) -> Result<Step>;

    /// Mark the step and its subtree deleted.
    async fn soft_delete_step(&self, id: &StepId) -> Result<()>;

    fn subscribe(&self, project_id: &ProjectId) -> Subscription;
}

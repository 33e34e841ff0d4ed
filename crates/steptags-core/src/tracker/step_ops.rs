//! Step operations for the Tracker.

use async_trait::async_trait;
use serde_json::json;

use super::{
    permissions::{authorize, Access},
    Tracker,
};
use crate::{
    backend::StepBackend,
    db::Database,
    error::{Result, TrackerError},
    import::parse_outline,
    models::{ActivityKind, NewStep, ProjectId, Step, StepId, StepPatch},
    realtime::{ChangeEvent, Subscription},
};

fn live_step(db: &Database, id: &StepId) -> Result<Step> {
    db.get_step(id)?.ok_or_else(|| TrackerError::step_not_found(id))
}

impl Tracker {
    /// Live steps of a project, parents before children, siblings in order.
    pub async fn list_steps(&self, project_id: &ProjectId) -> Result<Vec<Step>> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();

        self.with_db(move |db| {
            authorize(db, &project_id, &user, Access::Read)?;
            db.list_steps(&project_id)
        })
        .await
    }

    pub async fn get_step(&self, id: &StepId) -> Result<Step> {
        let user = self.acting_user()?;
        let id = id.clone();

        self.with_db(move |db| {
            let step = live_step(db, &id)?;
            authorize(db, &step.project_id, &user, Access::Read)?;
            Ok(step)
        })
        .await
    }

    /// Adds a step; without an explicit order it goes after its siblings.
    pub async fn create_step(&self, new: &NewStep) -> Result<Step> {
        let user = self.acting_user()?;
        let new = new.clone();

        let step = self
            .with_db(move |db| {
                authorize(db, &new.project_id, &user, Access::EditSteps)?;
                let step = db.create_step(&new)?;
                db.log_activity(
                    &step.project_id,
                    Some(&user),
                    ActivityKind::StepCreated,
                    "steps",
                    &json!({ "step_id": step.id, "name": step.name }),
                )?;
                Ok(step)
            })
            .await?;

        log::debug!("Created step {} in project {}", step.id, step.project_id);
        self.feed.publish(ChangeEvent::Inserted(step.clone()));
        Ok(step)
    }

    /// Applies a partial update and returns the stored record.
    pub async fn update_step(&self, id: &StepId, patch: &StepPatch) -> Result<Step> {
        let user = self.acting_user()?;
        let id = id.clone();
        let patch = patch.clone();

        let step = self
            .with_db(move |db| {
                let current = live_step(db, &id)?;
                authorize(db, &current.project_id, &user, Access::EditSteps)?;
                if patch.is_empty() {
                    return Err(TrackerError::invalid_input("patch").with_reason("Nothing to update"));
                }
                let step = db.update_step(&id, &patch)?;

                let kind = if patch.parent_id.is_some() || patch.order.is_some() {
                    ActivityKind::StepMoved
                } else {
                    ActivityKind::StepUpdated
                };
                let fields: Vec<&str> = patch.fields().iter().map(|f| f.as_str()).collect();
                db.log_activity(
                    &step.project_id,
                    Some(&user),
                    kind,
                    "steps",
                    &json!({ "step_id": step.id, "name": step.name, "fields": fields }),
                )?;
                Ok(step)
            })
            .await?;

        self.feed.publish(ChangeEvent::Updated(step.clone()));
        Ok(step)
    }

    /// Soft-deletes a step and everything under it. Returns the deleted
    /// rows, the requested step first.
    pub async fn delete_step(&self, id: &StepId) -> Result<Vec<Step>> {
        let user = self.acting_user()?;
        let id = id.clone();

        let deleted = self
            .with_db(move |db| {
                let current = live_step(db, &id)?;
                authorize(db, &current.project_id, &user, Access::EditSteps)?;
                let deleted = db.soft_delete_step(&id)?;
                db.log_activity(
                    &current.project_id,
                    Some(&user),
                    ActivityKind::StepDeleted,
                    "steps",
                    &json!({ "step_id": current.id, "name": current.name, "count": deleted.len() }),
                )?;
                Ok(deleted)
            })
            .await?;

        log::info!("Deleted {} step(s)", deleted.len());
        for step in &deleted {
            self.feed.publish(ChangeEvent::Updated(step.clone()));
        }
        Ok(deleted)
    }

    /// Creates nested steps from indented outline text, appended after the
    /// existing children of `parent` (or the top-level steps).
    pub async fn import_outline(&self, project_id: &ProjectId, parent: Option<&StepId>, text: &str) -> Result<Vec<Step>> {
        let user = self.acting_user()?;
        let entries = parse_outline(text)?;
        let project_id = project_id.clone();
        let parent = parent.cloned();

        let created = self
            .with_db(move |db| {
                authorize(db, &project_id, &user, Access::EditSteps)?;
                let created = db.import_outline(&project_id, parent.as_ref(), &entries)?;
                db.log_activity(
                    &project_id,
                    Some(&user),
                    ActivityKind::StepsImported,
                    "steps",
                    &json!({ "count": created.len() }),
                )?;
                Ok(created)
            })
            .await?;

        log::info!("Imported {} step(s)", created.len());
        for step in &created {
            self.feed.publish(ChangeEvent::Inserted(step.clone()));
        }
        Ok(created)
    }
}

#[async_trait]
impl StepBackend for Tracker {
    async fn list_steps(&self, project_id: &ProjectId) -> Result<Vec<Step>> {
        Tracker::list_steps(self, project_id).await
    }

    async fn create_step(&self, step: &NewStep) -> Result<Step> {
        Tracker::create_step(self, step).await
    }

    async fn update_step(&self, id: &StepId, patch: &StepPatch) -> Result<Step> {
        Tracker::update_step(self, id, patch).await
    }

    async fn soft_delete_step(&self, id: &StepId) -> Result<()> {
        self.delete_step(id).await.map(|_| ())
    }

    fn subscribe(&self, project_id: &ProjectId) -> Subscription {
        self.feed.subscribe(project_id)
    }
}

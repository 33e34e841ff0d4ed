//! Project operations for the Tracker.

use serde_json::json;

use super::{
    permissions::{authorize, Access},
    Tracker,
};
use crate::{
    db::project_queries::NewProject,
    error::{Result, TrackerError},
    models::{ActivityKind, Project, ProjectId, ProjectPatch, ProjectSummary, Role},
};

impl Tracker {
    /// Creates a project owned by the acting user.
    pub async fn create_project(&self, new: NewProject) -> Result<Project> {
        let user = self.acting_user()?;

        let project = self
            .with_db(move |db| {
                let project = db.create_project(&new, &user)?;
                db.log_activity(
                    &project.id,
                    Some(&user),
                    ActivityKind::ProjectCreated,
                    "projects",
                    &json!({ "title": project.title }),
                )?;
                Ok(project)
            })
            .await?;
        log::info!("Created project {} ({})", project.title, project.id);
        Ok(project)
    }

    /// Projects the acting user is an active member of.
    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let user = self.acting_user()?;
        self.with_db(move |db| db.list_projects_for(&user)).await
    }

    /// A project together with the acting user's role in it.
    pub async fn show_project(&self, id: &ProjectId) -> Result<(Project, Role)> {
        let user = self.acting_user()?;
        let id = id.clone();

        self.with_db(move |db| {
            let actor = authorize(db, &id, &user, Access::Read)?;
            Ok((actor.project, actor.role))
        })
        .await
    }

    /// Changes project settings. Owners and admins only.
    pub async fn update_project(&self, id: &ProjectId, patch: ProjectPatch) -> Result<Project> {
        let user = self.acting_user()?;
        let id = id.clone();

        self.with_db(move |db| {
            authorize(db, &id, &user, Access::Manage)?;
            if patch.is_empty() {
                return Err(TrackerError::invalid_input("project").with_reason("Nothing to update"));
            }
            let project = db.update_project(&id, &patch)?;
            db.log_activity(
                &id,
                Some(&user),
                ActivityKind::ProjectUpdated,
                "projects",
                &json!({ "title": project.title }),
            )?;
            Ok(project)
        })
        .await
    }
}

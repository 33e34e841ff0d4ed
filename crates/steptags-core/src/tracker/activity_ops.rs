use super::{
    permissions::{authorize, Access},
    Tracker,
};
use crate::{
    error::Result,
    models::{Activity, ProjectId},
};

/// Entries returned when no limit is given.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;

impl Tracker {
    /// Most recent activity of a project, newest first.
    pub async fn list_activity(&self, project_id: &ProjectId, limit: Option<usize>) -> Result<Vec<Activity>> {
        let user = self.acting_user()?;
        let project_id = project_id.clone();
        let limit = limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);

        self.with_db(move |db| {
            authorize(db, &project_id, &user, Access::Read)?;
            db.list_activity(&project_id, limit)
        })
        .await
    }
}

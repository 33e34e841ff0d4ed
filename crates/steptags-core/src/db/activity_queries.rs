use jiff::Timestamp;
use rusqlite::params;

use super::{parsed_column, timestamp_column};
use crate::{
    error::{DatabaseResultExt, Result},
    models::{Activity, ActivityKind, ProjectId, UserId},
};

const INSERT_ACTIVITY_SQL: &str =
    "INSERT INTO activities (project_id, actor_id, kind, ref_table, meta, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
const LIST_ACTIVITY_SQL: &str = "SELECT id, project_id, actor_id, kind, ref_table, meta, created_at FROM activities
     WHERE project_id = ?1 ORDER BY id DESC LIMIT ?2";

impl super::Database {
    fn build_activity_from_row(row: &rusqlite::Row) -> rusqlite::Result<Activity> {
        let meta: String = row.get(5)?;
        Ok(Activity {
            id: row.get(0)?,
            project_id: ProjectId::new(row.get::<_, String>(1)?),
            actor_id: row.get::<_, Option<String>>(2)?.map(UserId::new),
            kind: parsed_column::<ActivityKind>(row, 3)?,
            ref_table: row.get(4)?,
            meta: serde_json::from_str(&meta).unwrap_or(serde_json::Value::Null),
            created_at: timestamp_column(row, 6)?,
        })
    }

    /// Append an entry to a project's activity log.
    pub fn log_activity(
        &self,
        project_id: &ProjectId,
        actor_id: Option<&UserId>,
        kind: ActivityKind,
        ref_table: &str,
        meta: &serde_json::Value,
    ) -> Result<i64> {
        self.connection
            .execute(
                INSERT_ACTIVITY_SQL,
                params![
                    project_id.as_str(),
                    actor_id.map(UserId::as_str),
                    kind.as_str(),
                    ref_table,
                    meta.to_string(),
                    Timestamp::now().to_string(),
                ],
            )
            .db_context("Failed to record activity")?;
        Ok(self.connection.last_insert_rowid())
    }

    /// Most recent entries first.
    pub fn list_activity(&self, project_id: &ProjectId, limit: usize) -> Result<Vec<Activity>> {
        let mut stmt = self
            .connection
            .prepare(LIST_ACTIVITY_SQL)
            .db_context("Failed to prepare activity query")?;

        let entries = stmt
            .query_map(
                params![project_id.as_str(), i64::try_from(limit).unwrap_or(i64::MAX)],
                Self::build_activity_from_row,
            )
            .db_context("Failed to query activity")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read activity rows")?;
        Ok(entries)
    }
}

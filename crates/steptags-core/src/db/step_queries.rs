//! Step CRUD operations and queries.

use jiff::Timestamp;
use rusqlite::{params, OptionalExtension, Transaction};

use super::{optional_date_column, optional_timestamp_column, parsed_column, timestamp_column};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    import::OutlineEntry,
    models::{step::validate_name, NewStep, ProjectId, Step, StepId, StepPatch, UserId},
    ordering::order_after,
};

const STEP_COLUMNS: &str = "id, project_id, parent_id, name, notes, status, due_date, order_num, assigned_to, created_at, updated_at, deleted_at";
const CHECK_PROJECT_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)";
const SELECT_LIVE_STEP_PROJECT_SQL: &str =
    "SELECT project_id FROM steps WHERE id = ?1 AND deleted_at IS NULL";
const MAX_SIBLING_ORDER_SQL: &str = "SELECT MAX(order_num) FROM steps WHERE project_id = ?1 AND parent_id IS ?2 AND deleted_at IS NULL";
const INSERT_STEP_SQL: &str = "INSERT INTO steps (id, project_id, parent_id, name, notes, status, due_date, order_num, assigned_to, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
const UPDATE_STEP_SQL: &str = "UPDATE steps SET parent_id = ?1, name = ?2, notes = ?3, status = ?4, due_date = ?5, order_num = ?6, assigned_to = ?7, updated_at = ?8 WHERE id = ?9";
const UPDATE_PROJECT_TIMESTAMP_SQL: &str = "UPDATE projects SET updated_at = ?1 WHERE id = ?2";
// Walks up from ?1; true when ?2 is on the way (or is ?1 itself)
const IS_ANCESTOR_OR_SELF_SQL: &str = "WITH RECURSIVE chain(id, parent_id) AS (
        SELECT id, parent_id FROM steps WHERE id = ?1
        UNION
        SELECT s.id, s.parent_id FROM steps s JOIN chain c ON s.id = c.parent_id
    )
    SELECT EXISTS(SELECT 1 FROM chain WHERE id = ?2)";
const LIVE_SUBTREE_SQL: &str = "WITH RECURSIVE subtree(id) AS (
        SELECT id FROM steps WHERE id = ?1
        UNION
        SELECT s.id FROM steps s JOIN subtree t ON s.parent_id = t.id WHERE s.deleted_at IS NULL
    )
    SELECT id FROM subtree";
const SOFT_DELETE_STEP_SQL: &str =
    "UPDATE steps SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL";

impl super::Database {
    /// Helper function to construct a Step from a database row
    fn build_step_from_row(row: &rusqlite::Row) -> rusqlite::Result<Step> {
        Ok(Step {
            id: StepId::new(row.get::<_, String>(0)?),
            project_id: ProjectId::new(row.get::<_, String>(1)?),
            parent_id: row.get::<_, Option<String>>(2)?.map(StepId::new),
            name: row.get(3)?,
            notes: row.get(4)?,
            status: parsed_column(row, 5)?,
            due_date: optional_date_column(row, 6)?,
            order: row.get(7)?,
            assignee: row.get::<_, Option<String>>(8)?.map(UserId::new),
            created_at: timestamp_column(row, 9)?,
            updated_at: timestamp_column(row, 10)?,
            deleted_at: optional_timestamp_column(row, 11)?,
        })
    }

    /// Non-deleted steps of a project, top level first, then by parent and
    /// sibling order.
    pub fn list_steps(&self, project_id: &ProjectId) -> Result<Vec<Step>> {
        let sql = format!(
            "SELECT {STEP_COLUMNS} FROM steps WHERE project_id = ?1 AND deleted_at IS NULL \
             ORDER BY parent_id IS NOT NULL, parent_id, order_num, created_at, id"
        );
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare step list query")?;

        let steps = stmt
            .query_map(params![project_id.as_str()], Self::build_step_from_row)
            .db_context("Failed to query steps")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read step rows")?;
        Ok(steps)
    }

    /// A live step by id.
    pub fn get_step(&self, id: &StepId) -> Result<Option<Step>> {
        let sql = format!("SELECT {STEP_COLUMNS} FROM steps WHERE id = ?1 AND deleted_at IS NULL");
        self.connection
            .query_row(&sql, params![id.as_str()], Self::build_step_from_row)
            .optional()
            .db_context("Failed to fetch step")
    }

    /// A step by id, soft-deleted or not.
    fn get_step_any(tx: &Transaction, id: &str) -> Result<Option<Step>> {
        let sql = format!("SELECT {STEP_COLUMNS} FROM steps WHERE id = ?1");
        tx.query_row(&sql, params![id], Self::build_step_from_row)
            .optional()
            .db_context("Failed to fetch step")
    }

    fn require_project(tx: &Transaction, project_id: &ProjectId) -> Result<()> {
        let exists: bool = tx
            .query_row(CHECK_PROJECT_EXISTS_SQL, params![project_id.as_str()], |row| row.get(0))
            .db_context("Failed to check project existence")?;
        if exists {
            Ok(())
        } else {
            Err(TrackerError::project_not_found(project_id))
        }
    }

    /// The parent must be live and in the same project.
    fn require_parent(tx: &Transaction, project_id: &ProjectId, parent: &StepId) -> Result<()> {
        let owner: Option<String> = tx
            .query_row(SELECT_LIVE_STEP_PROJECT_SQL, params![parent.as_str()], |row| row.get(0))
            .optional()
            .db_context("Failed to look up parent step")?;
        match owner {
            Some(owner) if owner == project_id.as_str() => Ok(()),
            Some(_) => Err(TrackerError::invalid_input("parent_id")
                .with_reason(format!("Step {parent} belongs to another project"))),
            None => Err(TrackerError::step_not_found(parent)),
        }
    }

    fn next_sibling_order(tx: &Transaction, project_id: &ProjectId, parent: Option<&StepId>) -> Result<f64> {
        let last: Option<f64> = tx
            .query_row(
                MAX_SIBLING_ORDER_SQL,
                params![project_id.as_str(), parent.map(StepId::as_str)],
                |row| row.get(0),
            )
            .db_context("Failed to get next step order")?;
        Ok(order_after(last))
    }

    fn insert_step(tx: &Transaction, new: &NewStep, order: f64, now: Timestamp) -> Result<Step> {
        let step = Step {
            id: StepId::generate(),
            project_id: new.project_id.clone(),
            parent_id: new.parent_id.clone(),
            name: new.name.trim().to_string(),
            notes: new.notes.clone(),
            status: new.status,
            due_date: new.due_date,
            order,
            assignee: new.assignee.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let now_str = now.to_string();

        tx.execute(
            INSERT_STEP_SQL,
            params![
                step.id.as_str(),
                step.project_id.as_str(),
                step.parent_id.as_ref().map(StepId::as_str),
                &step.name,
                step.notes.as_deref(),
                step.status.as_str(),
                step.due_date.map(|d| d.to_string()),
                step.order,
                step.assignee.as_ref().map(UserId::as_str),
                &now_str,
                &now_str,
            ],
        )
        .db_context("Failed to insert step")?;
        Ok(step)
    }

    /// Creates a step, appended after its live siblings unless an explicit
    /// order is given.
    pub fn create_step(&mut self, new: &NewStep) -> Result<Step> {
        validate_name(&new.name)?;
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        Self::require_project(&tx, &new.project_id)?;
        if let Some(parent) = &new.parent_id {
            Self::require_parent(&tx, &new.project_id, parent)?;
        }
        let order = match new.order {
            Some(order) if order.is_finite() => order,
            Some(_) => {
                return Err(TrackerError::invalid_input("order").with_reason("Order must be a finite number"))
            }
            None => Self::next_sibling_order(&tx, &new.project_id, new.parent_id.as_ref())?,
        };

        let now = Timestamp::now();
        let step = Self::insert_step(&tx, new, order, now)?;
        tx.execute(UPDATE_PROJECT_TIMESTAMP_SQL, params![now.to_string(), new.project_id.as_str()])
            .db_context("Failed to update project timestamp")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(step)
    }

    /// Creates nested steps from outline entries in one transaction.
    ///
    /// Depth-0 entries land under `parent` (or at the top level), each
    /// deeper entry under the closest preceding entry one level up.
    pub fn import_outline(
        &mut self,
        project_id: &ProjectId,
        parent: Option<&StepId>,
        entries: &[OutlineEntry],
    ) -> Result<Vec<Step>> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        Self::require_project(&tx, project_id)?;
        if let Some(parent) = parent {
            Self::require_parent(&tx, project_id, parent)?;
        }

        let now = Timestamp::now();
        let mut created = Vec::with_capacity(entries.len());
        // Most recent step per depth
        let mut stack: Vec<StepId> = Vec::new();
        for entry in entries {
            stack.truncate(entry.depth);
            let parent_id = match entry.depth {
                0 => parent.cloned(),
                _ => stack.last().cloned(),
            };
            let order = Self::next_sibling_order(&tx, project_id, parent_id.as_ref())?;
            let new = NewStep::new(project_id.clone(), parent_id, entry.name.clone());
            let step = Self::insert_step(&tx, &new, order, now)?;
            stack.push(step.id.clone());
            created.push(step);
        }

        tx.execute(UPDATE_PROJECT_TIMESTAMP_SQL, params![now.to_string(), project_id.as_str()])
            .db_context("Failed to update project timestamp")?;
        tx.commit().db_context("Failed to commit transaction")?;
        Ok(created)
    }

    /// Applies a partial update. A new parent must be live, in the same
    /// project, and not the step itself or one of its descendants.
    pub fn update_step(&mut self, id: &StepId, patch: &StepPatch) -> Result<Step> {
        patch.validate()?;
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let mut step = Self::get_step_any(&tx, id.as_str())?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| TrackerError::step_not_found(id))?;

        if let Some(Some(parent)) = &patch.parent_id {
            Self::require_parent(&tx, &step.project_id, parent)?;
            let cycle: bool = tx
                .query_row(IS_ANCESTOR_OR_SELF_SQL, params![parent.as_str(), id.as_str()], |row| {
                    row.get(0)
                })
                .db_context("Failed to check step ancestry")?;
            if cycle {
                return Err(TrackerError::Cycle {
                    step: id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        patch.apply_to(&mut step);
        step.updated_at = Timestamp::now();
        let now_str = step.updated_at.to_string();

        tx.execute(
            UPDATE_STEP_SQL,
            params![
                step.parent_id.as_ref().map(StepId::as_str),
                &step.name,
                step.notes.as_deref(),
                step.status.as_str(),
                step.due_date.map(|d| d.to_string()),
                step.order,
                step.assignee.as_ref().map(UserId::as_str),
                &now_str,
                id.as_str(),
            ],
        )
        .db_context("Failed to update step")?;
        tx.execute(UPDATE_PROJECT_TIMESTAMP_SQL, params![&now_str, step.project_id.as_str()])
            .db_context("Failed to update project timestamp")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(step)
    }

    /// Soft-deletes a step and its live subtree. Returns the affected rows,
    /// the requested step first.
    pub fn soft_delete_step(&mut self, id: &StepId) -> Result<Vec<Step>> {
        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;

        let project: Option<String> = tx
            .query_row(SELECT_LIVE_STEP_PROJECT_SQL, params![id.as_str()], |row| row.get(0))
            .optional()
            .db_context("Failed to look up step")?;
        let project = project.ok_or_else(|| TrackerError::step_not_found(id))?;

        let subtree: Vec<String> = {
            let mut stmt = tx
                .prepare(LIVE_SUBTREE_SQL)
                .db_context("Failed to prepare subtree query")?;
            let rows = stmt
                .query_map(params![id.as_str()], |row| row.get::<_, String>(0))
                .db_context("Failed to query subtree")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .db_context("Failed to read subtree")?
        };

        let now_str = Timestamp::now().to_string();
        let mut deleted = Vec::with_capacity(subtree.len());
        for step_id in &subtree {
            tx.execute(SOFT_DELETE_STEP_SQL, params![&now_str, step_id])
                .db_context("Failed to soft-delete step")?;
            let step = Self::get_step_any(&tx, step_id)?
                .ok_or_else(|| TrackerError::step_not_found(step_id))?;
            deleted.push(step);
        }
        tx.execute(UPDATE_PROJECT_TIMESTAMP_SQL, params![&now_str, &project])
            .db_context("Failed to update project timestamp")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(deleted)
    }
}

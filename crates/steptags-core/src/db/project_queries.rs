//! Project CRUD operations and queries.

use jiff::{civil::Date, Timestamp};
use rusqlite::{params, OptionalExtension};

use super::{optional_date_column, parsed_column, timestamp_column};
use crate::{
    error::{DatabaseResultExt, Result, TrackerError},
    models::{Project, ProjectId, ProjectPatch, ProjectSummary, Role, UserId},
};

const PROJECT_COLUMNS: &str =
    "p.id, p.title, p.description, p.start_date, p.due_date, p.background, p.created_by, p.created_at, p.updated_at";
const INSERT_PROJECT_SQL: &str = "INSERT INTO projects (id, title, description, start_date, due_date, background, created_by, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
const INSERT_OWNER_SQL: &str = "INSERT INTO project_members (project_id, user_id, role, status, created_at) VALUES (?1, ?2, 'owner', 'active', ?3)";
const UPDATE_PROJECT_SQL: &str = "UPDATE projects SET title = ?1, description = ?2, start_date = ?3, due_date = ?4, background = ?5, updated_at = ?6 WHERE id = ?7";

/// Fields of a new project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub due_date: Option<Date>,
    pub background: Option<String>,
}

impl super::Database {
    fn build_project_from_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
        Ok(Project {
            id: ProjectId::new(row.get::<_, String>(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            start_date: optional_date_column(row, 3)?,
            due_date: optional_date_column(row, 4)?,
            background: row.get(5)?,
            created_by: UserId::new(row.get::<_, String>(6)?),
            created_at: timestamp_column(row, 7)?,
            updated_at: timestamp_column(row, 8)?,
        })
    }

    /// Creates a project; the creator becomes its owner.
    pub fn create_project(&mut self, new: &NewProject, created_by: &UserId) -> Result<Project> {
        let now = Timestamp::now();
        let project = Project {
            id: ProjectId::generate(),
            title: new.title.trim().to_string(),
            description: new.description.clone(),
            start_date: new.start_date,
            due_date: new.due_date,
            background: new.background.clone(),
            created_by: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        // Title and date range go through the same checks as an update
        ProjectPatch {
            title: Some(new.title.clone()),
            ..Default::default()
        }
        .validate_against(&project)?;

        let tx = self
            .connection
            .transaction()
            .db_context("Failed to begin transaction")?;
        let now_str = now.to_string();

        tx.execute(
            INSERT_PROJECT_SQL,
            params![
                project.id.as_str(),
                &project.title,
                project.description.as_deref(),
                project.start_date.map(|d| d.to_string()),
                project.due_date.map(|d| d.to_string()),
                project.background.as_deref(),
                created_by.as_str(),
                &now_str,
                &now_str,
            ],
        )
        .db_context("Failed to insert project")?;
        tx.execute(INSERT_OWNER_SQL, params![project.id.as_str(), created_by.as_str(), &now_str])
            .db_context("Failed to add project owner")?;

        tx.commit().db_context("Failed to commit transaction")?;
        Ok(project)
    }

    /// Retrieves a project by its ID.
    pub fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1");
        self.connection
            .query_row(&sql, params![id.as_str()], Self::build_project_from_row)
            .optional()
            .db_context("Failed to fetch project")
    }

    pub fn update_project(&mut self, id: &ProjectId, patch: &ProjectPatch) -> Result<Project> {
        let mut project = self
            .get_project(id)?
            .ok_or_else(|| TrackerError::project_not_found(id))?;
        patch.validate_against(&project)?;
        patch.apply_to(&mut project);
        project.title = project.title.trim().to_string();
        project.updated_at = Timestamp::now();

        self.connection
            .execute(
                UPDATE_PROJECT_SQL,
                params![
                    &project.title,
                    project.description.as_deref(),
                    project.start_date.map(|d| d.to_string()),
                    project.due_date.map(|d| d.to_string()),
                    project.background.as_deref(),
                    project.updated_at.to_string(),
                    id.as_str(),
                ],
            )
            .db_context("Failed to update project")?;
        Ok(project)
    }

    /// Projects where `user` is an active member, most recently updated first.
    pub fn list_projects_for(&self, user: &UserId) -> Result<Vec<ProjectSummary>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS}, m.role,
                (SELECT COUNT(*) FROM steps s WHERE s.project_id = p.id AND s.deleted_at IS NULL),
                (SELECT COUNT(*) FROM steps s WHERE s.project_id = p.id AND s.deleted_at IS NULL AND s.status = 'complete')
             FROM projects p
             JOIN project_members m ON m.project_id = p.id
             WHERE m.user_id = ?1 AND m.status = 'active'
             ORDER BY p.updated_at DESC, p.title"
        );
        let mut stmt = self
            .connection
            .prepare(&sql)
            .db_context("Failed to prepare project list query")?;

        let projects = stmt
            .query_map(params![user.as_str()], |row| {
                Ok(ProjectSummary {
                    project: Self::build_project_from_row(row)?,
                    role: parsed_column::<Role>(row, 9)?,
                    total_steps: row.get(10)?,
                    complete_steps: row.get(11)?,
                })
            })
            .db_context("Failed to query projects")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_context("Failed to read project rows")?;
        Ok(projects)
    }
}

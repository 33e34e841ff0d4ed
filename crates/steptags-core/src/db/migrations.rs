//! Database schema initialization and migrations.

use crate::error::{DatabaseResultExt, Result};

impl super::Database {
    /// Initializes the database schema using the embedded SQL file.
    pub(super) fn initialize_schema(&self) -> Result<()> {
        self.connection
            .execute("PRAGMA foreign_keys = ON", [])
            .db_context("Failed to enable foreign keys")?;

        let schema_sql = include_str!("../../assets/schema.sql");
        self.connection
            .execute_batch(schema_sql)
            .db_context("Failed to initialize database schema")?;

        self.apply_migrations()
    }

    /// Bring databases created by older builds up to the current schema.
    fn apply_migrations(&self) -> Result<()> {
        // Early databases predate project backgrounds
        let has_background: bool = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('projects') WHERE name = 'background'",
                [],
                |row| row.get(0),
            )
            .map(|count: i64| count > 0)
            .db_context("Failed to inspect projects table")?;

        if !has_background {
            log::info!("Adding background column to projects table");
            self.connection
                .execute("ALTER TABLE projects ADD COLUMN background TEXT", [])
                .db_context("Failed to add background column to projects table")?;
        }

        Ok(())
    }
}

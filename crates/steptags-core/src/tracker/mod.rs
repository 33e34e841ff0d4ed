//! SQLite-backed tracker service.
//!
//! [`Tracker`] is the reference backend behind the CLI and the MCP server.
//! Each call opens the database on a blocking thread, checks the acting
//! user's role on the project, performs the write, records an activity entry
//! and finally publishes the changed rows on the shared [`ChangeFeed`], so
//! open [`crate::Session`]s see writes made by anyone else.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ CLI / MCP /  │───▶│ Tracker          │───▶│ Database     │
//! │ Session      │    │ (roles, activity)│    │ (db/)        │
//! └──────────────┘    └────────┬─────────┘    └──────────────┘
//!        ▲                     │ publish
//!        └──── Subscription ◀──┘ ChangeFeed
//! ```
//!
//! ## Submodules
//!
//! - [`builder`]: configuration and construction
//! - [`permissions`]: the role matrix
//! - [`project_ops`], [`step_ops`], [`member_ops`], [`activity_ops`]: the
//!   operations, one file per record type
//!
//! # Example
//!
//! ```rust,no_run
//! use steptags_core::{db::project_queries::NewProject, TrackerBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = TrackerBuilder::new()
//!     .with_database_path(Some("/tmp/steptags.db"))
//!     .with_user(Some("ada"))
//!     .build()
//!     .await?;
//!
//! let project = tracker
//!     .create_project(NewProject {
//!         title: "Launch".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! let steps = tracker.import_outline(&project.id, None, "Design\n  Sketch\nBuild").await?;
//! assert_eq!(steps.len(), 3);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use tokio::task;

use crate::{
    db::Database,
    error::{Result, TrackerError},
    models::UserId,
    realtime::ChangeFeed,
};

pub mod activity_ops;
pub mod builder;
pub mod member_ops;
pub mod permissions;
pub mod project_ops;
pub mod step_ops;


pub use builder::TrackerBuilder;
pub use member_ops::InviteCreated;

/// Default base of invite links.
pub const DEFAULT_INVITE_BASE_URL: &str = "https://steptags.app";

/// Main tracker interface.
#[derive(Debug, Clone)]
pub struct Tracker {
    pub(crate) db_path: PathBuf,
    pub(crate) user: Option<UserId>,
    pub(crate) feed: ChangeFeed,
    pub(crate) invite_base_url: String,
}

impl Tracker {
    pub(crate) fn new(db_path: PathBuf, user: Option<UserId>, feed: ChangeFeed, invite_base_url: String) -> Self {
        Self {
            db_path,
            user,
            feed,
            invite_base_url,
        }
    }

    /// The acting user, if one is configured.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// The feed every write is published on.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// The same tracker acting as another user. Database and change feed
    /// are shared.
    pub fn acting_as(&self, user: impl Into<UserId>) -> Self {
        Self {
            user: Some(user.into()),
            ..self.clone()
        }
    }

    pub(crate) fn acting_user(&self) -> Result<UserId> {
        self.user.clone().ok_or(TrackerError::NotAuthenticated)
    }

    /// Run `f` against a freshly opened database on the blocking pool.
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.db_path.clone();
        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            f(&mut db)
        })
        .await
        .map_err(|e| TrackerError::Configuration {
            message: format!("Task join error: {e}"),
        })?
    }
}

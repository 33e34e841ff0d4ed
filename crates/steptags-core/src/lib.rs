//! Core library for StepTags, a shared project tracker built around nested
//! steps.
//!
//! A project's steps form an ordered forest. The same collection is shown
//! two ways: as a tree ([`forest`]) and, for top-level steps, as a four
//! column status board ([`board`]). Edits are applied locally first and
//! reconciled with the backend's confirmations and realtime pushes
//! ([`workspace`]); deletes wait out a short undo window before they are
//! sent. A [`Session`] drives one workspace against a [`StepBackend`] on
//! tokio, and [`Tracker`] is the SQLite-backed backend used by the CLI.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use steptags_core::{
//!     db::project_queries::NewProject, display::TreeView, Session, SessionConfig, StepStatus,
//!     TrackerBuilder,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = Arc::new(
//!     TrackerBuilder::new()
//!         .with_database_path(Some("steptags.db"))
//!         .with_user(Some("ada"))
//!         .build()
//!         .await?,
//! );
//! let project = tracker
//!     .create_project(NewProject {
//!         title: "Launch".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let mut session = Session::open(Arc::clone(&tracker), project.id, SessionConfig::default()).await?;
//! let step = session.create_step(None, "Design").await?;
//! session.set_status(&step.id, StepStatus::InProgress)?;
//! session.settle().await;
//! println!("{}", TreeView::new(session.workspace()));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod board;
pub mod db;
pub mod display;
pub mod error;
pub mod forest;
pub mod import;
pub mod invite;
pub mod models;
pub mod ordering;
pub mod params;
pub mod realtime;
pub mod session;
pub mod tracker;
pub mod workspace;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use backend::StepBackend;
pub use board::Board;
pub use db::Database;
pub use error::{Result, TrackerError};
pub use forest::Forest;
pub use models::{
    Activity, ActivityKind, Invite, Membership, NewStep, Project, ProjectId, ProjectPatch,
    ProjectSummary, Role, Step, StepId, StepPatch, StepStatus, StepSummary, UserId,
};
pub use realtime::{ChangeEvent, ChangeFeed, Subscription};
pub use session::{Session, SessionConfig, SessionEvent};
pub use tracker::{Tracker, TrackerBuilder};
pub use workspace::{Command, MoveTarget, Notice, NoticeLevel, Workspace};

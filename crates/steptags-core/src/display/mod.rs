//! Markdown formatting for terminal and MCP output.
//!
//! Records implement [`std::fmt::Display`] directly ([`models`]); groups of
//! records and operation outcomes get newtype wrappers so each context can
//! pick its own layout. Everything produced here is markdown, rendered by the
//! CLI's terminal renderer or returned verbatim to MCP clients.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Records        │    │ Wrappers, views │    │   Markdown      │
//! │  (Step, ...)    │───▶│ & result types  │───▶│  (Terminal/MCP) │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! - [`collections`]: lists of projects, members, invites and activity
//! - [`views`]: the step tree and the status board of a [`crate::Workspace`]
//! - [`results`]: create / update / delete confirmations
//! - [`status`]: operation status lines and workspace notices
//! - [`datetime`]: local and relative timestamps
//!
//! ```rust
//! use steptags_core::display::OperationStatus;
//!
//! let status = OperationStatus::success("Invite revoked");
//! assert_eq!(status.to_string(), "Success: Invite revoked\n");
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;
pub mod status;
pub mod views;

pub use collections::{ActivityFeed, Invites, Members, ProjectSummaries};
pub use datetime::{LocalDateTime, RelativeTime};
pub use results::{CreateResult, DeleteResult, UpdateResult};
pub use status::OperationStatus;
pub use views::{BoardView, TreeView};

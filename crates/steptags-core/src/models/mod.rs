//! Data models for projects, steps and memberships.
//!
//! This module contains the strongly-typed records the rest of the crate works
//! with. Rows coming from a backend are validated once, in [`decode`], and
//! never travel through the crate as untyped JSON. Display implementations
//! live in [`crate::display::models`] so presentation stays out of the data
//! definitions.
//!
//! # Examples
//!
//! ```rust
//! use steptags_core::models::{Step, StepId, StepPatch, StepStatus};
//!
//! let patch = StepPatch::status(StepStatus::InReview);
//! assert_eq!(patch.fields().len(), 1);
//! assert_eq!("done".parse::<StepStatus>(), Ok(StepStatus::Complete));
//! assert_eq!(StepId::from("s1").as_str(), "s1");
//! ```

pub mod decode;
pub mod ids;
pub mod project;
pub mod status;
pub mod step;


pub use decode::{decode_step, decode_step_key, DecodeError};
pub use ids::{InviteId, ProjectId, StepId, UserId};
pub use project::{
    Activity, ActivityKind, Invite, Membership, Project, ProjectPatch, ProjectSummary,
    StepSummary,
};
pub use status::{InviteStatus, MembershipStatus, Role, StepStatus};
pub use step::{NewStep, Step, StepField, StepPatch};

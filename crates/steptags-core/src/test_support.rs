//! Fixtures shared by the unit test modules.

use jiff::Timestamp;

use crate::models::{ProjectId, Step, StepId, StepStatus};

pub(crate) const PROJECT: &str = "p1";

/// A live step in project `p1`. Creation time grows with the id's first byte
/// so ties on `order` still sort deterministically.
pub(crate) fn step(id: &str, parent: Option<&str>, order: f64, status: StepStatus) -> Step {
    let created = Timestamp::from_second(1_767_225_600 + i64::from(id.as_bytes()[0]))
        .expect("valid fixture timestamp");
    Step {
        id: StepId::from(id),
        project_id: ProjectId::from(PROJECT),
        parent_id: parent.map(StepId::from),
        name: format!("Step {id}"),
        notes: None,
        status,
        due_date: None,
        order,
        assignee: None,
        created_at: created,
        updated_at: created,
        deleted_at: None,
    }
}

pub(crate) fn ids(list: &[&str]) -> Vec<StepId> {
    list.iter().map(|id| StepId::from(*id)).collect()
}

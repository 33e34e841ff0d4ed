//! Validation of loosely-typed backend rows at the boundary.
//!
//! The hosted database hands out JSON rows (`order_num`, `assigned_to`, status
//! aliases such as `open`/`done`). Everything entering the typed model goes
//! through [`decode_step`], which fails with a [`DecodeError`] naming the
//! offending field instead of letting a malformed row through.

use jiff::{civil::Date, Timestamp};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{ProjectId, Step, StepId, StepStatus, UserId};

/// A backend row or realtime payload did not have the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unknown change operation '{0}'")]
    UnknownOperation(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn object(value: &Value) -> Result<&Map<String, Value>, DecodeError> {
    value.as_object().ok_or(DecodeError::NotAnObject)
}

/// `None` for both a missing key and an explicit `null`.
fn optional<'a>(row: &'a Map<String, Value>, field: &'static str) -> Option<&'a Value> {
    row.get(field).filter(|v| !v.is_null())
}

fn required<'a>(row: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, DecodeError> {
    optional(row, field).ok_or(DecodeError::MissingField(field))
}

fn string(value: &Value, field: &'static str) -> Result<String, DecodeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        // Integer primary keys are accepted and carried as strings
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid(field, format!("expected a string, got {other}"))),
    }
}

fn optional_string(row: &Map<String, Value>, field: &'static str) -> Result<Option<String>, DecodeError> {
    optional(row, field).map(|v| string(v, field)).transpose()
}

fn timestamp(value: &Value, field: &'static str) -> Result<Timestamp, DecodeError> {
    let raw = string(value, field)?;
    raw.parse::<Timestamp>()
        .map_err(|e| invalid(field, format!("'{raw}' is not a timestamp: {e}")))
}

fn date(value: &Value, field: &'static str) -> Result<Date, DecodeError> {
    let raw = string(value, field)?;
    // Some rows carry a full timestamp in the date column; keep the date part
    let day = raw.get(..10).unwrap_or(&raw);
    day.parse::<Date>()
        .map_err(|e| invalid(field, format!("'{raw}' is not a date: {e}")))
}

/// Decode a step row. Accepts both the hosted column names (`order_num`,
/// `assigned_to`) and the model's own (`order`, `assignee`).
pub fn decode_step(value: &Value) -> Result<Step, DecodeError> {
    let row = object(value)?;

    let status_raw = string(required(row, "status")?, "status")?;
    let status = status_raw
        .parse::<StepStatus>()
        .map_err(|reason| invalid("status", reason))?;

    let order_value = optional(row, "order_num")
        .or_else(|| optional(row, "order"))
        .ok_or(DecodeError::MissingField("order_num"))?;
    let order = order_value
        .as_f64()
        .filter(|o| o.is_finite())
        .ok_or_else(|| invalid("order_num", format!("expected a finite number, got {order_value}")))?;

    let assignee = match optional_string(row, "assigned_to")? {
        Some(user) => Some(user),
        None => optional_string(row, "assignee")?,
    };

    let name = string(required(row, "name")?, "name")?;

    Ok(Step {
        id: StepId::new(string(required(row, "id")?, "id")?),
        project_id: ProjectId::new(string(required(row, "project_id")?, "project_id")?),
        parent_id: optional_string(row, "parent_id")?.map(StepId::new),
        name,
        notes: optional_string(row, "notes")?,
        status,
        due_date: optional(row, "due_date").map(|v| date(v, "due_date")).transpose()?,
        order,
        assignee: assignee.map(UserId::new),
        created_at: timestamp(required(row, "created_at")?, "created_at")?,
        updated_at: timestamp(required(row, "updated_at")?, "updated_at")?,
        deleted_at: optional(row, "deleted_at")
            .map(|v| timestamp(v, "deleted_at"))
            .transpose()?,
    })
}

/// Decode just the identity of a row (delete payloads only carry keys).
pub fn decode_step_key(value: &Value) -> Result<(StepId, Option<ProjectId>), DecodeError> {
    let row = object(value)?;
    let id = StepId::new(string(required(row, "id")?, "id")?);
    let project_id = optional_string(row, "project_id")?.map(ProjectId::new);
    Ok((id, project_id))
}

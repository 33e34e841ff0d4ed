//! Realtime change feed.
//!
//! Backend writes are announced as [`ChangeEvent`]s on a broadcast channel.
//! A [`Subscription`] is scoped to one project and owns its receiver, so once
//! it is dropped or [`Subscription::unsubscribe`]d nothing more can be
//! observed through it. Delivery is best effort: a receiver that falls behind
//! gets a single [`ChangeEvent::Resync`] in place of the events it missed.

use serde_json::Value;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::models::{decode_step, decode_step_key, DecodeError, ProjectId, Step, StepId};

/// Default number of buffered events per subscriber.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// One change to a project's step collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Inserted(Step),
    Updated(Step),
    /// Delete payloads only carry the row key; the project may be unknown.
    Deleted {
        project_id: Option<ProjectId>,
        id: StepId,
    },
    /// Events were lost; the receiver should reload.
    Resync,
}

impl ChangeEvent {
    /// Decode a postgres-changes style payload:
    /// `{"eventType": "INSERT" | "UPDATE" | "DELETE", "new": {..}, "old": {..}}`.
    pub fn decode(payload: &Value) -> Result<Self, DecodeError> {
        let object = payload.as_object().ok_or(DecodeError::NotAnObject)?;
        let operation = object
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("eventType"))?;
        let record = |field: &'static str| object.get(field).ok_or(DecodeError::MissingField(field));

        match operation.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(ChangeEvent::Inserted(decode_step(record("new")?)?)),
            "UPDATE" => Ok(ChangeEvent::Updated(decode_step(record("new")?)?)),
            "DELETE" => {
                let (id, project_id) = decode_step_key(record("old")?)?;
                Ok(ChangeEvent::Deleted { project_id, id })
            }
            other => Err(DecodeError::UnknownOperation(other.to_string())),
        }
    }

    /// Project the event belongs to, when known.
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            ChangeEvent::Inserted(step) | ChangeEvent::Updated(step) => Some(&step.project_id),
            ChangeEvent::Deleted { project_id, .. } => project_id.as_ref(),
            ChangeEvent::Resync => None,
        }
    }

    fn concerns(&self, project: &ProjectId) -> bool {
        self.project_id().map_or(true, |p| p == project)
    }
}

/// Publisher side of the feed. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Announce a change. Returns the number of live subscribers reached.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // No subscribers is not an error
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, project_id: &ProjectId) -> Subscription {
        log::debug!("Subscribing to changes for project {project_id}");
        Subscription {
            project_id: project_id.clone(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Project-scoped receiving end of a [`ChangeFeed`].
#[derive(Debug)]
pub struct Subscription {
    project_id: ProjectId,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    /// Next event for this project; `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.concerns(&self.project_id) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("Change feed lagged by {missed} events for project {}", self.project_id);
                    return Some(ChangeEvent::Resync);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-buffered event, without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.concerns(&self.project_id) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(missed)) => {
                    log::warn!("Change feed lagged by {missed} events for project {}", self.project_id);
                    return Some(ChangeEvent::Resync);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Stop listening. Consumes the handle.
    pub fn unsubscribe(self) {
        log::debug!("Unsubscribed from project {}", self.project_id);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{models::StepStatus, test_support::step};

    fn row(id: &str, project: &str) -> Value {
        json!({
            "id": id, "project_id": project, "parent_id": null, "name": "Row",
            "status": "todo", "order_num": 0,
            "created_at": "2026-10-01T10:00:00Z", "updated_at": "2026-10-01T10:00:00Z"
        })
    }

    #[test]
    fn test_decode_insert_update_delete() {
        let insert = ChangeEvent::decode(&json!({"eventType": "INSERT", "new": row("s1", "p1")})).unwrap();
        assert!(matches!(insert, ChangeEvent::Inserted(ref s) if s.id.as_str() == "s1"));

        let update = ChangeEvent::decode(&json!({"eventType": "UPDATE", "new": row("s1", "p1"), "old": {"id": "s1"}})).unwrap();
        assert!(matches!(update, ChangeEvent::Updated(_)));

        let delete = ChangeEvent::decode(&json!({"eventType": "DELETE", "old": {"id": "s1"}})).unwrap();
        assert_eq!(
            delete,
            ChangeEvent::Deleted {
                project_id: None,
                id: StepId::from("s1")
            }
        );
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert_eq!(
            ChangeEvent::decode(&json!({"eventType": "TRUNCATE"})),
            Err(DecodeError::UnknownOperation("TRUNCATE".to_string()))
        );
        assert_eq!(
            ChangeEvent::decode(&json!({"new": {}})),
            Err(DecodeError::MissingField("eventType"))
        );
        assert_eq!(
            ChangeEvent::decode(&json!({"eventType": "INSERT"})),
            Err(DecodeError::MissingField("new"))
        );
    }

    #[tokio::test]
    async fn test_subscription_filters_by_project() {
        let feed = ChangeFeed::new(8);
        let mut sub = feed.subscribe(&ProjectId::from("p1"));

        let mut other = step("x", None, 0.0, StepStatus::NotStarted);
        other.project_id = ProjectId::from("p2");
        feed.publish(ChangeEvent::Inserted(other));
        feed.publish(ChangeEvent::Inserted(step("a", None, 0.0, StepStatus::NotStarted)));

        let event = sub.recv().await;
        assert!(matches!(event, Some(ChangeEvent::Inserted(ref s)) if s.id.as_str() == "a"));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_gets_resync() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe(&ProjectId::from("p1"));
        for i in 0..5 {
            feed.publish(ChangeEvent::Inserted(step(&format!("s{i}"), None, 0.0, StepStatus::NotStarted)));
        }

        assert_eq!(sub.recv().await, Some(ChangeEvent::Resync));
    }

    #[test]
    fn test_unsubscribe_releases_receiver() {
        let feed = ChangeFeed::default();
        let sub = feed.subscribe(&ProjectId::from("p1"));
        assert_eq!(feed.subscriber_count(), 1);

        sub.unsubscribe();

        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish(ChangeEvent::Resync), 0);
    }
}

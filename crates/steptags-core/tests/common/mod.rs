#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use jiff::Timestamp;
use steptags_core::{
    ChangeEvent, ChangeFeed, NewStep, ProjectId, Result, Step, StepBackend, StepId, StepPatch,
    StepStatus, Subscription, Tracker, TrackerBuilder, TrackerError,
};
use tempfile::TempDir;

pub const PROJECT: &str = "p1";

/// Helper function to create a test tracker acting as "owner"
pub async fn create_test_tracker() -> (TempDir, Tracker) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let tracker = TrackerBuilder::new()
        .with_database_path(Some(&db_path))
        .with_user(Some("owner"))
        .build()
        .await
        .expect("Failed to create tracker");
    (temp_dir, tracker)
}

/// A live step of project `p1`.
pub fn step(id: &str, parent: Option<&str>, order: f64, status: StepStatus) -> Step {
    let created = Timestamp::from_second(1_767_225_600).expect("valid fixture timestamp");
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

/// In-memory backend that publishes its writes like the real one and can
/// be told to fail.
pub struct FakeBackend {
    steps: Mutex<HashMap<StepId, Step>>,
    feed: ChangeFeed,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().map(|s| (s.id.clone(), s)).collect()),
            feed: ChangeFeed::default(),
            fail_updates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Backend calls made so far, e.g. `update s1 [status]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stored(&self, id: &str) -> Option<Step> {
        self.steps.lock().unwrap().get(&StepId::from(id)).cloned()
    }

    /// Another client changed a step.
    pub fn remote_update(&self, step: Step) {
        self.steps.lock().unwrap().insert(step.id.clone(), step.clone());
        self.feed.publish(ChangeEvent::Updated(step));
    }

    /// The step vanished without this client seeing a push for it.
    pub fn forget(&self, id: &str) {
        self.steps.lock().unwrap().remove(&StepId::from(id));
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StepBackend for FakeBackend {
    async fn list_steps(&self, project_id: &ProjectId) -> Result<Vec<Step>> {
        self.record("list".to_string());
        let mut steps: Vec<Step> = self
            .steps
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.project_id == project_id && !s.is_deleted())
            .cloned()
            .collect();
        steps.sort_by(|a, b| a.sibling_cmp(b));
        Ok(steps)
    }

    async fn create_step(&self, new: &NewStep) -> Result<Step> {
        let id = format!("n{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.record(format!("create {id}"));
        let now = Timestamp::now();
        let step = Step {
            id: StepId::from(id.as_str()),
            project_id: new.project_id.clone(),
            parent_id: new.parent_id.clone(),
            name: new.name.clone(),
            notes: new.notes.clone(),
            status: new.status,
            due_date: new.due_date,
            order: new.order.unwrap_or(0.0),
            assignee: new.assignee.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.steps.lock().unwrap().insert(step.id.clone(), step.clone());
        self.feed.publish(ChangeEvent::Inserted(step.clone()));
        Ok(step)
    }

    async fn update_step(&self, id: &StepId, patch: &StepPatch) -> Result<Step> {
        let fields: Vec<&str> = patch.fields().iter().map(|f| f.as_str()).collect();
        self.record(format!("update {id} [{}]", fields.join(",")));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(TrackerError::Configuration {
                message: "backend unavailable".to_string(),
            });
        }
        let updated = {
            let mut steps = self.steps.lock().unwrap();
            let step = steps
                .get_mut(id)
                .filter(|s| !s.is_deleted())
                .ok_or_else(|| TrackerError::step_not_found(id))?;
            patch.apply_to(step);
            step.updated_at = Timestamp::now();
            step.clone()
        };
        self.feed.publish(ChangeEvent::Updated(updated.clone()));
        Ok(updated)
    }

    async fn soft_delete_step(&self, id: &StepId) -> Result<()> {
        self.record(format!("delete {id}"));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(TrackerError::Configuration {
                message: "backend unavailable".to_string(),
            });
        }
        let deleted = {
            let mut steps = self.steps.lock().unwrap();
            if !steps.get(id).is_some_and(|s| !s.is_deleted()) {
                return Err(TrackerError::step_not_found(id));
            }
            let mut subtree = vec![id.clone()];
            let mut i = 0;
            while i < subtree.len() {
                let parent = subtree[i].clone();
                subtree.extend(
                    steps
                        .values()
                        .filter(|s| s.parent_id.as_ref() == Some(&parent))
                        .map(|s| s.id.clone()),
                );
                i += 1;
            }
            let now = Timestamp::now();
            subtree
                .iter()
                .filter_map(|step_id| {
                    let step = steps.get_mut(step_id)?;
                    step.deleted_at = Some(now);
                    Some(step.clone())
                })
                .collect::<Vec<_>>()
        };
        for step in deleted {
            self.feed.publish(ChangeEvent::Updated(step));
        }
        Ok(())
    }

    fn subscribe(&self, project_id: &ProjectId) -> Subscription {
        self.feed.subscribe(project_id)
    }
}

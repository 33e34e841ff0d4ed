mod common;

use std::{sync::Arc, time::Duration};

use common::{create_test_tracker, step, FakeBackend, PROJECT};
use steptags_core::{
    db::project_queries::NewProject,
    workspace::StepState,
    NewStep, NoticeLevel, ProjectId, Session, SessionConfig, SessionEvent, StepBackend, StepId,
    StepStatus,
};
use tokio::time;

fn id(value: &str) -> StepId {
    StepId::from(value)
}

fn fixture() -> Arc<FakeBackend> {
    Arc::new(FakeBackend::new(vec![
        step("s1", None, 0.0, StepStatus::NotStarted),
        step("s2", Some("s1"), 0.0, StepStatus::NotStarted),
        step("s3", None, 1.0, StepStatus::NotStarted),
    ]))
}

async fn open(backend: &Arc<FakeBackend>) -> Session<FakeBackend> {
    Session::open(Arc::clone(backend), ProjectId::from(PROJECT), SessionConfig::default())
        .await
        .expect("Failed to open session")
}

/// Handle every event that is ready now, without waiting for timers.
async fn drain<B: StepBackend + 'static>(session: &mut Session<B>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = time::timeout(Duration::from_millis(100), session.next_event()).await {
        events.push(event);
    }
    events
}

fn delete_calls(backend: &FakeBackend) -> Vec<String> {
    backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("delete"))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_delete_waits_for_grace_window() {
    let backend = fixture();
    let mut session = open(&backend).await;

    session.delete(&id("s1")).unwrap();
    assert!(session.workspace().step(&id("s1")).is_none());
    assert!(session.workspace().step(&id("s2")).is_none());
    assert_eq!(session.workspace().state_of(&id("s1")), Some(StepState::PendingDelete));

    let notices = session.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Deleted \"Step s1\". Undo within 5s");

    // Still inside the window
    let early = time::timeout(Duration::from_secs(4), session.next_event()).await;
    assert!(early.is_err());
    assert!(delete_calls(&backend).is_empty());

    let sent = session.next_event().await;
    assert_eq!(sent, Some(SessionEvent::DeleteSent(id("s1"))));

    let events = drain(&mut session).await;
    assert!(events.contains(&SessionEvent::DeleteSettled(id("s1"))));
    assert_eq!(delete_calls(&backend), vec!["delete s1"]);
    assert_eq!(session.workspace().state_of(&id("s1")), Some(StepState::Deleted));
    assert!(backend.stored("s2").unwrap().is_deleted());
    assert!(session.workspace().step(&id("s3")).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_undo_restores_card_and_sends_nothing() {
    let backend = fixture();
    let mut session = open(&backend).await;
    let slot = session.workspace().board().position_of(&id("s1"));

    session.delete(&id("s1")).unwrap();
    assert_eq!(session.undo_delete(), Some(id("s1")));

    assert!(session.workspace().step(&id("s1")).is_some());
    assert!(session.workspace().step(&id("s2")).is_some());
    assert_eq!(session.workspace().board().position_of(&id("s1")), slot);

    let later = time::timeout(Duration::from_secs(30), session.next_event()).await;
    assert!(later.is_err());
    assert!(delete_calls(&backend).is_empty());
    assert!(!backend.stored("s1").unwrap().is_deleted());
}

#[tokio::test(start_paused = true)]
async fn test_second_delete_finalizes_first() {
    let backend = fixture();
    let mut session = open(&backend).await;

    session.delete(&id("s1")).unwrap();
    session.delete(&id("s3")).unwrap();
    assert_eq!(session.workspace().pending_delete(), Some(&id("s3")));

    let events = drain(&mut session).await;
    assert!(events.contains(&SessionEvent::DeleteSettled(id("s1"))));
    assert_eq!(delete_calls(&backend), vec!["delete s1"]);

    // Undo only reaches the newest delete
    assert_eq!(session.undo_delete(), Some(id("s3")));
    assert!(session.workspace().step(&id("s3")).is_some());
    assert!(session.workspace().step(&id("s1")).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_reverts_by_reload() {
    let backend = fixture();
    let mut session = open(&backend).await;
    backend.fail_updates(true);

    session.set_status(&id("s3"), StepStatus::InProgress).unwrap();
    assert_eq!(session.workspace().step(&id("s3")).unwrap().status, StepStatus::InProgress);
    assert_eq!(session.workspace().state_of(&id("s3")), Some(StepState::LocallyEdited));
    assert_eq!(
        session.workspace().board().status_of(&id("s3")),
        Some(StepStatus::InProgress)
    );

    let events = drain(&mut session).await;
    assert!(events.contains(&SessionEvent::WriteSettled(id("s3"))));
    assert!(events.contains(&SessionEvent::Reloaded));

    let step = session.workspace().step(&id("s3")).unwrap();
    assert_eq!(step.status, StepStatus::NotStarted);
    assert_eq!(
        session.workspace().board().status_of(&id("s3")),
        Some(StepStatus::NotStarted)
    );

    let notices = session.notices();
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Error && n.message.starts_with("Could not save \"Step s3\"")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_brings_subtree_back() {
    let backend = fixture();
    let mut session = open(&backend).await;
    backend.fail_deletes(true);

    session.delete(&id("s1")).unwrap();
    time::sleep(Duration::from_secs(6)).await;
    assert_eq!(session.next_event().await, Some(SessionEvent::DeleteSent(id("s1"))));
    drain(&mut session).await;

    assert!(session.workspace().step(&id("s1")).is_some());
    assert!(session.workspace().step(&id("s2")).is_some());
    assert!(session.workspace().board().contains(&id("s1")));
    assert!(session
        .notices()
        .iter()
        .any(|n| n.message.starts_with("Could not delete \"Step s1\"")));
}

#[tokio::test(start_paused = true)]
async fn test_own_echo_is_idempotent() {
    let backend = fixture();
    let mut session = open(&backend).await;

    session.rename(&id("s3"), "Ship it").unwrap();
    let events = drain(&mut session).await;
    assert!(events.contains(&SessionEvent::WriteSettled(id("s3"))));
    assert!(events.contains(&SessionEvent::Remote));

    let step = session.workspace().step(&id("s3")).unwrap();
    assert_eq!(step.name, "Ship it");
    assert_eq!(session.workspace().state_of(&id("s3")), Some(StepState::Clean));
    assert_eq!(session.workspace().steps().count(), 3);
    assert_eq!(session.workspace().board().bucket(StepStatus::NotStarted).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_remote_change_is_merged() {
    let backend = fixture();
    let mut session = open(&backend).await;

    let mut changed = backend.stored("s3").unwrap();
    changed.name = "Renamed elsewhere".to_string();
    changed.status = StepStatus::Complete;
    backend.remote_update(changed);

    let events = drain(&mut session).await;
    assert_eq!(events, vec![SessionEvent::Remote]);
    let step = session.workspace().step(&id("s3")).unwrap();
    assert_eq!(step.name, "Renamed elsewhere");
    assert_eq!(session.workspace().board().status_of(&id("s3")), Some(StepStatus::Complete));
}

#[tokio::test(start_paused = true)]
async fn test_stale_push_does_not_clobber_local_edit() {
    let backend = fixture();
    let mut session = open(&backend).await;

    session.set_status(&id("s3"), StepStatus::InProgress).unwrap();

    // Another client renames the step before our write lands
    let mut stale = backend.stored("s3").unwrap();
    stale.name = "Renamed elsewhere".to_string();
    backend.remote_update(stale);

    drain(&mut session).await;
    let step = session.workspace().step(&id("s3")).unwrap();
    assert_eq!(step.status, StepStatus::InProgress);
    assert_eq!(step.name, "Renamed elsewhere");
}

#[tokio::test(start_paused = true)]
async fn test_close_flushes_delete_and_unsubscribes() {
    let backend = fixture();
    let mut session = open(&backend).await;
    assert_eq!(backend.feed().subscriber_count(), 1);

    session.delete(&id("s3")).unwrap();
    let workspace = session.close().await;

    assert_eq!(delete_calls(&backend), vec!["delete s3"]);
    assert_eq!(workspace.state_of(&id("s3")), Some(StepState::Deleted));
    assert_eq!(backend.feed().subscriber_count(), 0);
}

#[tokio::test]
async fn test_session_against_tracker() {
    let (_temp_dir, tracker) = create_test_tracker().await;
    let project = tracker
        .create_project(NewProject {
            title: "Launch".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let tracker = Arc::new(tracker);
    let config = SessionConfig {
        grace_window: Duration::from_millis(20),
    };
    let mut session = Session::open(Arc::clone(&tracker), project.id.clone(), config)
        .await
        .unwrap();

    let design = session.create_step(None, "Design").await.unwrap();
    let sketch = session.create_step(Some(design.id.clone()), "Sketch").await.unwrap();
    session.set_status(&design.id, StepStatus::InReview).unwrap();
    session.settle().await;

    let stored = tracker.get_step(&design.id).await.unwrap();
    assert_eq!(stored.status, StepStatus::InReview);
    assert_eq!(session.workspace().forest().len(), 2);

    session.delete(&design.id).unwrap();
    session.settle().await;
    assert!(tracker.get_step(&sketch.id).await.is_err());
    assert!(tracker.list_steps(&project.id).await.unwrap().is_empty());

    let workspace = session.close().await;
    assert_eq!(workspace.steps().count(), 0);
}

#[tokio::test]
async fn test_delete_elsewhere_during_undo_window() {
    let (_temp_dir, tracker) = create_test_tracker().await;
    let project = tracker
        .create_project(NewProject {
            title: "Launch".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let design = tracker
        .create_step(&NewStep::new(project.id.clone(), None, "Design"))
        .await
        .unwrap();
    let tracker = Arc::new(tracker);
    let other_client = tracker.acting_as("owner");

    let config = SessionConfig {
        grace_window: Duration::from_millis(200),
    };
    let mut session = Session::open(Arc::clone(&tracker), project.id.clone(), config)
        .await
        .unwrap();
    session.delete(&design.id).unwrap();
    session.notices();

    other_client.delete_step(&design.id).await.unwrap();
    session.settle().await;

    assert!(tracker.list_steps(&project.id).await.unwrap().is_empty());
    assert!(session.workspace().step(&design.id).is_none());
    assert!(!session.workspace().board().contains(&design.id));
    assert_eq!(session.workspace().state_of(&design.id), Some(StepState::Deleted));
    assert!(session
        .notices()
        .iter()
        .all(|n| n.level != NoticeLevel::Error));
    assert_eq!(session.undo_delete(), None);
}

#[tokio::test(start_paused = true)]
async fn test_delete_of_missing_step_counts_as_done() {
    let backend = fixture();
    let mut session = open(&backend).await;

    session.delete(&id("s3")).unwrap();
    backend.forget("s3");
    time::sleep(Duration::from_secs(6)).await;
    assert_eq!(session.next_event().await, Some(SessionEvent::DeleteSent(id("s3"))));
    let events = drain(&mut session).await;

    assert!(events.contains(&SessionEvent::DeleteSettled(id("s3"))));
    assert!(!events.contains(&SessionEvent::Reloaded));
    assert_eq!(session.workspace().state_of(&id("s3")), Some(StepState::Deleted));
    assert!(session.workspace().step(&id("s3")).is_none());
    assert!(session.notices().iter().all(|n| n.level != NoticeLevel::Error));
}

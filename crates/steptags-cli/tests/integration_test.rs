//! CLI output compared against the core display types
//!
//! With `--no-color` the CLI prints the markdown from the core display
//! wrappers unchanged, so a project set up through the library must render
//! identically through the binary.

use std::{process::Command, time::Duration};

use steptags_core::{
    db::project_queries::NewProject,
    display::{BoardView, Members, TreeView},
    NewStep, StepPatch, StepStatus, Tracker, TrackerBuilder, Workspace,
};
use tempfile::TempDir;

async fn create_test_tracker() -> (Tracker, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let tracker = TrackerBuilder::new()
        .with_database_path(Some(temp_dir.path().join("test.db")))
        .with_user(Some("owner"))
        .build()
        .await
        .expect("Failed to create tracker");
    (tracker, temp_dir)
}

/// Run a CLI command as `owner` and capture its output
fn run_cli_command(tracker: &Tracker, args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_st"))
        .env_remove("STEPTAGS_USER")
        .arg("--no-color")
        .arg("--database-file")
        .arg(tracker.database_path())
        .args(["--user", "owner"])
        .args(args)
        .output()
        .expect("Failed to run CLI command");
    assert!(
        output.status.success(),
        "st {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("Invalid UTF-8 in CLI output")
}

#[tokio::test]
async fn test_tree_and_board_match_display() {
    let (tracker, _temp_dir) = create_test_tracker().await;
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
    tracker
        .create_step(&NewStep::new(project.id.clone(), Some(design.id.clone()), "Sketch"))
        .await
        .unwrap();
    let build = tracker
        .create_step(&NewStep::new(project.id.clone(), None, "Build"))
        .await
        .unwrap();
    tracker
        .update_step(&build.id, &StepPatch::status(StepStatus::InReview))
        .await
        .unwrap();

    let mut workspace = Workspace::new(project.id.clone(), Duration::from_secs(5));
    workspace.replace_all(tracker.list_steps(&project.id).await.unwrap());

    let tree = run_cli_command(&tracker, &["tree", project.id.as_str(), "--ids"]);
    assert_eq!(tree, TreeView::new(&workspace).with_ids(true).to_string());

    let board = run_cli_command(&tracker, &["board", project.id.as_str()]);
    assert_eq!(board, BoardView::new(&workspace).to_string());
}

#[tokio::test]
async fn test_cli_edits_visible_to_library() {
    let (tracker, _temp_dir) = create_test_tracker().await;
    let project = tracker
        .create_project(NewProject {
            title: "Launch".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let step = tracker
        .create_step(&NewStep::new(project.id.clone(), None, "Design"))
        .await
        .unwrap();

    run_cli_command(
        &tracker,
        &["step", "update", step.id.as_str(), "--name", "Design v2", "--assignee", "ada"],
    );

    let stored = tracker.get_step(&step.id).await.unwrap();
    assert_eq!(stored.name, "Design v2");
    assert_eq!(stored.assignee.as_ref().map(|u| u.as_str()), Some("ada"));

    // Clearing with an empty string
    run_cli_command(&tracker, &["step", "update", step.id.as_str(), "--assignee", ""]);
    assert_eq!(tracker.get_step(&step.id).await.unwrap().assignee, None);
}

#[tokio::test]
async fn test_member_list_matches_display() {
    let (tracker, _temp_dir) = create_test_tracker().await;
    let project = tracker
        .create_project(NewProject {
            title: "Launch".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let members = tracker.list_members(&project.id).await.unwrap();
    let output = run_cli_command(&tracker, &["member", "list", project.id.as_str()]);
    assert_eq!(output, Members(members).to_string());
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Temporary database plus the user every command acts as
struct TestEnv {
    _temp_dir: TempDir,
    db_path: String,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        let db_path = temp_dir
            .path()
            .join("cli_test.db")
            .to_str()
            .expect("Temp path is not UTF-8")
            .to_string();
        Self {
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// `st --no-color --database-file <db> --user <user>`
    fn st_as(&self, user: &str) -> Command {
        let mut cmd = Command::cargo_bin("st").expect("Failed to find st binary");
        cmd.env_remove("STEPTAGS_USER")
            .args(["--no-color", "--database-file", &self.db_path, "--user", user]);
        cmd
    }

    fn st(&self) -> Command {
        self.st_as("owner")
    }

    fn run(&self, args: &[&str]) -> String {
        let output = self.st().args(args).assert().success().get_output().stdout.clone();
        String::from_utf8(output).expect("Invalid UTF-8")
    }

    fn create_project(&self, title: &str) -> String {
        extract_id(&self.run(&["project", "create", title]), "Created project with ID: ")
    }

    fn add_step(&self, project_id: &str, name: &str, parent: Option<&str>) -> String {
        let mut args = vec!["step", "add", project_id, name];
        if let Some(parent) = parent {
            args.extend(["--parent", parent]);
        }
        extract_id(&self.run(&args), "Created step with ID: ")
    }
}

fn extract_id(output: &str, prefix: &str) -> String {
    output
        .lines()
        .find_map(|line| line.strip_prefix(prefix))
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| panic!("No ID in output:\n{output}"))
}

fn extract_token(output: &str) -> String {
    output
        .lines()
        .find_map(|line| line.strip_prefix("- Token: `"))
        .and_then(|rest| rest.strip_suffix('`'))
        .map(str::to_string)
        .unwrap_or_else(|| panic!("No token in output:\n{output}"))
}

#[test]
fn test_cli_create_project() {
    let env = TestEnv::new();

    env.st()
        .args(["project", "create", "Launch", "--description", "Ship the thing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project with ID:"))
        .stdout(predicate::str::contains("# Launch"))
        .stdout(predicate::str::contains("Ship the thing"));
}

#[test]
fn test_cli_list_empty_projects() {
    let env = TestEnv::new();

    env.st()
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));
}

#[test]
fn test_cli_requires_user() {
    let env = TestEnv::new();

    Command::cargo_bin("st")
        .expect("Failed to find st binary")
        .env_remove("STEPTAGS_USER")
        .args(["--no-color", "--database-file", &env.db_path, "project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not authenticated"));
}

#[test]
fn test_cli_user_from_environment() {
    let env = TestEnv::new();
    env.create_project("Launch");

    Command::cargo_bin("st")
        .expect("Failed to find st binary")
        .env("STEPTAGS_USER", "owner")
        .args(["--no-color", "--database-file", &env.db_path, "project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Launch"))
        .stdout(predicate::str::contains("- **Role**: owner"));
}

#[test]
fn test_cli_rejects_bad_dates() {
    let env = TestEnv::new();

    env.st()
        .args(["project", "create", "Launch", "--start", "2026-05-01", "--due", "2026-04-01"])
        .assert()
        .failure();
    env.st()
        .args(["project", "create", "Launch", "--due", "next week"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_cli_tree_shows_nesting() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let design = env.add_step(&project, "Design", None);
    env.add_step(&project, "Sketch", Some(&design));
    env.add_step(&project, "Build", None);

    env.st()
        .args(["tree", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("- ○ Design\n  - ○ Sketch\n- ○ Build\n"))
        .stdout(predicate::str::contains("0 of 3 steps complete"));
}

#[test]
fn test_cli_update_step_through_session() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let step = env.add_step(&project, "Design", None);

    env.st()
        .args(["step", "update", &step, "--status", "in-progress", "--due", "2026-11-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated step with ID"))
        .stdout(predicate::str::contains("- status"))
        .stdout(predicate::str::contains("- due_date"))
        .stdout(predicate::str::contains("➤ In Progress"));

    env.st()
        .args(["board", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("## ➤ In Progress (1)\n\n- Design"))
        .stdout(predicate::str::contains("## ○ Not Started (0)\n\n_Empty_"));
}

#[test]
fn test_cli_move_card_changes_status() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let step = env.add_step(&project, "Design", None);

    env.st()
        .args(["step", "card", &step, "done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## ✓ Complete (1)"));

    env.st()
        .args(["tree", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 1 steps complete"));
}

#[test]
fn test_cli_move_step_rejects_cycle() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let parent = env.add_step(&project, "Parent", None);
    let child = env.add_step(&project, "Child", Some(&parent));

    env.st()
        .args(["step", "move", &parent, "--parent", &child])
        .assert()
        .failure()
        .stderr(predicate::str::contains("own ancestor"));

    env.st()
        .args(["step", "move", &child])
        .assert()
        .success()
        .stdout(predicate::str::contains("- ○ Parent\n- ○ Child\n"));
}

#[test]
fn test_cli_delete_without_wait() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let design = env.add_step(&project, "Design", None);
    env.add_step(&project, "Sketch", Some(&design));

    env.st()
        .args(["step", "delete", &design, "--no-wait"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted step 'Design'"))
        .stdout(predicate::str::contains("and 1 sub-step"));

    env.st()
        .args(["tree", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("No steps yet."));
}

#[test]
fn test_cli_delete_after_grace_window() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let step = env.add_step(&project, "Design", None);

    env.st()
        .args(["step", "delete", &step, "--grace-secs", "0"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Undo within 0s"))
        .stdout(predicate::str::contains("Deleted step 'Design'"));

    env.st()
        .args(["step", "show", &step])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_import_outline_from_stdin() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");

    env.st()
        .args(["step", "import", &project])
        .write_stdin("Design\n  Sketch\nBuild\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 3 step(s)"));

    env.st()
        .args(["tree", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("- ○ Design\n  - ○ Sketch\n- ○ Build\n"));
}

#[test]
fn test_cli_invite_and_guest_permissions() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");

    let output = env.run(&["member", "invite", &project, "Ada@Example.com", "--role", "guest"]);
    assert!(output.contains("Invited ada@example.com as guest"));
    assert!(output.contains(&format!("/projects/{project}?invite=")));
    let token = extract_token(&output);

    env.st_as("ada")
        .args(["invite", "accept", &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("as guest"));

    // Tokens are single use
    env.st_as("bob")
        .args(["invite", "accept", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invite not found"));

    env.st_as("ada")
        .args(["tree", &project])
        .assert()
        .success();
    env.st_as("ada")
        .args(["step", "add", &project, "Sneaky"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));

    env.st()
        .args(["member", "list", &project])
        .assert()
        .success()
        .stdout(predicate::str::contains("**owner** (owner)"))
        .stdout(predicate::str::contains("**ada** (guest)"));
}

#[test]
fn test_cli_outsider_cannot_read() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");

    env.st_as("mallory")
        .args(["board", &project])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));
}

#[test]
fn test_cli_activity_feed() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    env.add_step(&project, "Design", None);

    env.st()
        .args(["activity", &project, "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Step added: Design by owner"))
        .stdout(predicate::str::contains("Project created").not());
}

#[test]
fn test_cli_rejects_unknown_status() {
    let env = TestEnv::new();
    let project = env.create_project("Launch");
    let step = env.add_step(&project, "Design", None);

    env.st()
        .args(["step", "update", &step, "--status", "blocked"])
        .assert()
        .failure();
}

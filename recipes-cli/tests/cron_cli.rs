use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const RECIPE: &str = r#"---
id: development-team
kind: team
cronJobs:
  - id: daily-report
    schedule: "0 9 * * *"
    message: Send the daily report
    enabledByDefault: true
  - id: weekly-cleanup
    schedule: "0 3 * * 0"
    task: Archive done tickets
    channel: slack
    enabledByDefault: true
---
# Development team
"#;

struct Env {
    home: TempDir,
}

impl Env {
    fn new(mode: &str) -> Self {
        let home = TempDir::new().unwrap();
        let config_dir = home.path().join(".recipes");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.yaml"),
            format!("cron_installation: \"{mode}\"\nscheduler: local\n"),
        )
        .unwrap();
        Self { home }
    }

    fn write_recipe(&self, body: &str) -> PathBuf {
        let path = self.home.path().join("development-team.md");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("recipes").unwrap();
        cmd.env("HOME", self.home.path())
            .env("USERPROFILE", self.home.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn sync(&self, recipe: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["cron", "sync"])
            .arg(recipe)
            .args(["--team", "dev-team"])
            .args(extra)
            .assert()
    }

    fn mapping_path(&self) -> PathBuf {
        self.home
            .path()
            .join(".openclaw")
            .join("workspace-dev-team")
            .join("notes")
            .join("cron-jobs.json")
    }

    fn jobs_path(&self) -> PathBuf {
        self.home
            .path()
            .join(".openclaw")
            .join("cron")
            .join("jobs.json")
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}

#[test]
fn sync_installs_jobs_and_is_idempotent() {
    let env = Env::new("on");
    let recipe = env.write_recipe(RECIPE);

    env.sync(&recipe, &[])
        .success()
        .stdout(predicate::str::contains("2 created"));

    let jobs = Env::read_json(&env.jobs_path());
    let jobs = jobs["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j["enabled"] == true));
    assert_eq!(
        jobs[1]["payload"]["text"],
        "Archive done tickets\n[recipes] recipes.teamId=dev-team"
    );

    let mapping = Env::read_json(&env.mapping_path());
    assert_eq!(mapping["version"], 1);
    let entries = mapping["entries"].as_object().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.contains_key("team:dev-team:development-team:daily-report"));

    let mapping_before = std::fs::read(env.mapping_path()).unwrap();
    let jobs_before = std::fs::read(env.jobs_path()).unwrap();

    env.sync(&recipe, &[])
        .success()
        .stdout(predicate::str::contains("nothing to do"));

    assert_eq!(std::fs::read(env.mapping_path()).unwrap(), mapping_before);
    assert_eq!(std::fs::read(env.jobs_path()).unwrap(), jobs_before);
}

#[test]
fn removed_job_is_disabled_on_next_sync() {
    let env = Env::new("on");
    let recipe = env.write_recipe(RECIPE);
    env.sync(&recipe, &[]).success();

    let trimmed = RECIPE.replace(
        "  - id: weekly-cleanup\n    schedule: \"0 3 * * 0\"\n    task: Archive done tickets\n    channel: slack\n    enabledByDefault: true\n",
        "",
    );
    env.write_recipe(&trimmed);

    let output = env.sync(&recipe, &["--json"]).success().get_output().stdout.clone();
    let summary: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["changed"], true);
    assert_eq!(summary["removed"][0]["jobId"], "weekly-cleanup");
    assert_eq!(summary["removed"][0]["action"], "disabled-removed");

    let jobs = Env::read_json(&env.jobs_path());
    assert_eq!(jobs["jobs"][1]["enabled"], false);
    let mapping = Env::read_json(&env.mapping_path());
    assert_eq!(
        mapping["entries"]["team:dev-team:development-team:weekly-cleanup"]["orphaned"],
        true
    );
}

#[test]
fn mode_off_touches_nothing() {
    let env = Env::new("off");
    let recipe = env.write_recipe(RECIPE);

    env.sync(&recipe, &[])
        .success()
        .stdout(predicate::str::contains("cron installation is off"));

    assert!(!env.jobs_path().exists());
    assert!(!env.mapping_path().exists());
}

#[test]
fn prompt_without_terminal_installs_disabled() {
    let env = Env::new("prompt");
    let recipe = env.write_recipe(RECIPE);

    env.sync(&recipe, &[])
        .success()
        .stdout(predicate::str::contains("left disabled"));

    let jobs = Env::read_json(&env.jobs_path());
    assert!(jobs["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .all(|j| j["enabled"] == false));
}

#[test]
fn dry_run_writes_nothing() {
    let env = Env::new("on");
    let recipe = env.write_recipe(RECIPE);

    env.sync(&recipe, &["--dry-run"])
        .success()
        .stdout(predicate::str::contains("[dry-run]"));

    assert!(!env.jobs_path().exists());
    assert!(!env.mapping_path().exists());
}

#[test]
fn invalid_cron_jobs_fail_before_any_write() {
    let env = Env::new("on");
    let recipe = env.write_recipe(
        "---\nid: broken\ncronJobs:\n  - id: a\n    schedule: \"* * * * *\"\n    message: x\n  - id: a\n    schedule: \"* * * * *\"\n    message: y\n---\n",
    );

    env.sync(&recipe, &[])
        .failure()
        .stderr(predicate::str::contains("duplicate cronJobs[].id: a"));

    assert!(!env.jobs_path().exists());
}

#[test]
fn owner_flags_are_mutually_exclusive() {
    let env = Env::new("on");
    let recipe = env.write_recipe(RECIPE);

    env.cmd()
        .args(["cron", "sync"])
        .arg(&recipe)
        .args(["--team", "a", "--agent", "b"])
        .assert()
        .failure();
}

#[test]
fn status_lists_recorded_jobs() {
    let env = Env::new("on");
    let recipe = env.write_recipe(RECIPE);
    env.sync(&recipe, &[]).success();

    env.cmd()
        .args(["cron", "status", "--team", "dev-team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("daily-report"))
        .stdout(predicate::str::contains("weekly-cleanup"))
        .stdout(predicate::str::contains("ACTIVE"));

    let output = env
        .cmd()
        .args(["cron", "status", "--agent", "nobody", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let status: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(status["owner"], "agent:nobody");
    assert!(status["jobs"].as_array().unwrap().is_empty());
}

#[test]
fn config_set_then_show() {
    let env = Env::new("prompt");

    env.cmd()
        .args(["config", "set", "cron_installation", "on"])
        .assert()
        .success();

    env.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cron_installation:    on"))
        .stdout(predicate::str::contains("scheduler:            local"));
}

#[test]
fn remove_plan_finds_stamped_jobs() {
    let env = Env::new("on");
    let recipe = env.write_recipe(RECIPE);
    env.sync(&recipe, &[]).success();

    let output = env
        .cmd()
        .args(["cron", "remove-plan", "--team", "dev-team", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let plan: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(plan["teamId"], "dev-team");
    assert_eq!(plan["protected"], false);
    assert_eq!(plan["exact"].as_array().unwrap().len(), 2);
    assert!(plan["ambiguous"].as_array().unwrap().is_empty());

    env.cmd()
        .args(["cron", "remove-plan", "--team", "development-team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("protected"));
}

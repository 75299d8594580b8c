//! `calculate` against scratch git repositories.
//!
//! Every test builds its own repository in a temp dir. Tests return early
//! when `git` is not installed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn has_git() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {args:?} failed");
}

fn commit(dir: &Path, message: &str) {
    git(dir, &["commit", "-q", "--allow-empty", "-m", message]);
}

/// A repository on `main` with one commit tagged `v1.2.3`.
fn tagged_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    git(tmp.path(), &["init", "-q"]);
    git(tmp.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    commit(tmp.path(), "initial");
    git(tmp.path(), &["tag", "v1.2.3"]);
    tmp
}

fn calculate(dir: &Path, extra: &[&str]) -> String {
    let output = cmd()
        .args(["-C", dir.to_str().unwrap(), "calculate"])
        .args(extra)
        .env_remove("BRANCHVER_OVERRIDE_VERSION")
        .assert()
        .success();
    String::from_utf8_lossy(&output.get_output().stdout)
        .trim()
        .to_string()
}

// =============================================================================
// Flat Strategy
// =============================================================================

#[test]
fn main_branch_bumps_patch_of_latest_tag() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    commit(repo.path(), "fix");

    assert_eq!(calculate(repo.path(), &[]), "1.2.4");
}

#[test]
fn feature_branch_gets_label_and_commit_count() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["checkout", "-q", "-b", "feature/my_thing"]);
    commit(repo.path(), "one");
    commit(repo.path(), "two");

    assert_eq!(calculate(repo.path(), &[]), "1.2.4-my_thing.2");
}

#[test]
fn zero_padded_ticket_branch_calculates() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["checkout", "-q", "-b", "feature/0042"]);
    commit(repo.path(), "one");

    assert_eq!(calculate(repo.path(), &[]), "1.2.4-feature-0042.1");
}

#[test]
fn release_candidate_branch_gets_rc_label() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["checkout", "-q", "-b", "rc/next"]);
    commit(repo.path(), "one");

    assert_eq!(calculate(repo.path(), &[]), "1.2.4-rc.1");
}

#[test]
fn untagged_repository_reports_initial_version() {
    if !has_git() {
        return;
    }
    let tmp = TempDir::new().unwrap();
    git(tmp.path(), &["init", "-q"]);
    git(tmp.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    commit(tmp.path(), "initial");

    assert_eq!(calculate(tmp.path(), &[]), "0.1.0");
}

#[test]
fn forced_scope_and_stage() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["checkout", "-q", "-b", "feature/x"]);
    commit(repo.path(), "one");

    assert_eq!(
        calculate(repo.path(), &["--scope", "minor", "--stage", "beta"]),
        "1.3.0-beta.1"
    );
}

// =============================================================================
// Overrides & Configuration
// =============================================================================

#[test]
fn override_flag_wins() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();

    assert_eq!(
        calculate(repo.path(), &["--override-version", "v9.9.9"]),
        "9.9.9"
    );
}

#[test]
fn override_from_environment() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();

    cmd()
        .args(["-C", repo.path().to_str().unwrap(), "calculate"])
        .env("BRANCHVER_OVERRIDE_VERSION", "2.0.0-rc.1")
        .assert()
        .success()
        .stdout("2.0.0-rc.1\n");
}

#[test]
fn custom_tag_prefix_from_config() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["tag", "release-3.0.0"]);
    fs::write(
        repo.path().join(".branchver.toml"),
        r#"tag_prefix = "release-""#,
    )
    .unwrap();

    assert_eq!(calculate(repo.path(), &[]), "3.0.1");
}

#[test]
fn unmatched_branch_fails_with_custom_rules() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    fs::write(
        repo.path().join(".branchver.toml"),
        r#"
[[branch_matching]]
pattern = "^main$"
target = "main"
"#,
    )
    .unwrap();
    git(repo.path(), &["checkout", "-q", "-b", "someone/elses"]);

    cmd()
        .args(["-C", repo.path().to_str().unwrap(), "calculate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to calculate version"))
        .stderr(predicate::str::contains("someone/elses"));
}

#[test]
fn flow_feature_without_develop_fails() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["checkout", "-q", "-b", "feature/login"]);
    commit(repo.path(), "one");

    cmd()
        .args(["-C", repo.path().to_str().unwrap(), "calculate"])
        .args(["--strategy", "flow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("develop"));
}

// =============================================================================
// Output Formats
// =============================================================================

#[test]
fn json_output_reports_derivation() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();
    git(repo.path(), &["checkout", "-q", "-b", "feature/json"]);
    commit(repo.path(), "one");

    let output = cmd()
        .args(["-C", repo.path().to_str().unwrap(), "--json", "calculate"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["branch"], "feature/json");
    assert_eq!(json["role"], "feature");
    assert_eq!(json["target"], "main");
    assert_eq!(json["pattern"], ".*");
    assert_eq!(json["base_version"], "1.2.3");
    assert_eq!(json["version"], "1.2.4-json.1");
}

#[test]
fn explain_output_names_rule() {
    if !has_git() {
        return;
    }
    let repo = tagged_repo();

    cmd()
        .args(["-C", repo.path().to_str().unwrap(), "calculate", "--explain"])
        .env_remove("BRANCHVER_OVERRIDE_VERSION")
        .assert()
        .success()
        .stdout(predicate::str::contains("Role"))
        .stdout(predicate::str::contains("Rule"))
        .stdout(predicate::str::contains("Base version"))
        .stdout(predicate::str::contains("1.2.3"))
        .stdout(predicate::str::contains("1.2.4"));
}

#[test]
fn calculate_outside_repository_fails() {
    if !has_git() {
        return;
    }
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "calculate"])
        .env_remove("BRANCHVER_OVERRIDE_VERSION")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn override_works_outside_repository() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "calculate"])
        .args(["--branch", "feature/x", "--override-version", "3.1.0"])
        .assert()
        .success()
        .stdout("3.1.0\n");
}

#[test]
fn override_json_outside_repository() {
    let tmp = TempDir::new().unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "--json", "calculate"])
        .env("BRANCHVER_OVERRIDE_VERSION", "v2.0.0")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["version"], "2.0.0");
    assert_eq!(json["branch"], "HEAD");
    assert!(json.get("base_version").is_none());
}

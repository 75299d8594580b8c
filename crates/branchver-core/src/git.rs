//! Read-only git queries used to resolve versions.
//!
//! Shells out to `git` for all operations, so the user's configuration
//! (worktrees, alternates, safe.directory) applies unchanged. Nothing here
//! mutates the repository.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// `git` is not on `PATH`.
    #[error("git is not installed or not on PATH")]
    NotInstalled,

    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "rev-list").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// A branch exists neither locally nor on `origin`.
    #[error("branch {name} not found locally or on origin")]
    UnknownBranch {
        /// The branch name.
        name: String,
    },

    /// HEAD does not point at a branch.
    #[error("HEAD is detached; pass a branch name explicitly")]
    DetachedHead,

    /// `git` printed something we could not interpret.
    #[error("unexpected output from git {command}: {output}")]
    UnexpectedOutput {
        /// The git subcommand.
        command: String,
        /// The offending output.
        output: String,
    },
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A tag as listed by `git for-each-ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    /// Short tag name (e.g., `v1.2.3`).
    pub name: String,
    /// The commit the tag points at, peeled through annotated tag objects.
    pub commit: String,
}

/// Fail early with [`GitError::NotInstalled`] when `git` cannot be found.
#[instrument]
pub fn ensure_installed() -> GitResult<()> {
    match which::which("git") {
        Ok(path) => {
            debug!(path = %path.display(), "found git");
            Ok(())
        }
        Err(_) => Err(GitError::NotInstalled),
    }
}

/// Get the current branch name.
///
/// Returns `None` if in a detached HEAD state.
#[instrument]
pub fn current_branch() -> GitResult<Option<String>> {
    let output = git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" {
        debug!("detached HEAD");
        Ok(None)
    } else {
        debug!(%branch, "current branch");
        Ok(Some(branch))
    }
}

/// Detect the authoritative branch by checking for `main` then `master`.
///
/// Returns the first one that exists as a local branch.
#[instrument]
pub fn detect_release_branch() -> GitResult<Option<String>> {
    for candidate in &["main", "master"] {
        if ref_exists(&format!("refs/heads/{candidate}"))? {
            debug!(branch = candidate, "detected release branch");
            return Ok(Some((*candidate).to_string()));
        }
    }
    debug!("no main/master branch found");
    Ok(None)
}

/// Check whether a revision resolves to a commit.
#[instrument]
pub fn ref_exists(rev: &str) -> GitResult<bool> {
    let spec = format!("{rev}^{{commit}}");
    match git(&["rev-parse", "--verify", "--quiet", &spec]) {
        Ok(_) => Ok(true),
        Err(GitError::Command { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Resolve a branch name to a revision that can be walked.
///
/// Tries the local branch, then `origin/<name>`. Returns `None` when the
/// branch exists in neither place.
#[instrument]
pub fn resolve_branch_ref(name: &str) -> GitResult<Option<String>> {
    for candidate in [
        format!("refs/heads/{name}"),
        format!("refs/remotes/origin/{name}"),
    ] {
        if ref_exists(&candidate)? {
            debug!(%candidate, "resolved branch ref");
            return Ok(Some(candidate));
        }
    }
    debug!(%name, "branch has no local or remote ref");
    Ok(None)
}

/// List every tag with the commit it points at.
#[instrument]
pub fn tag_refs() -> GitResult<Vec<TagRef>> {
    let output = git(&[
        "for-each-ref",
        "--format=%(refname:short)%09%(objectname)%09%(*objectname)",
        "refs/tags",
    ])?;

    let tags: Vec<TagRef> = output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(parse_tag_line)
        .collect();

    debug!(count = tags.len(), "listed tags");
    Ok(tags)
}

/// Commits reachable from `rev`, nearest first.
#[instrument]
pub fn rev_list(rev: &str) -> GitResult<Vec<String>> {
    let output = git(&["rev-list", rev])?;
    let commits: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect();
    debug!(count = commits.len(), "walked history");
    Ok(commits)
}

/// Number of commits reachable from `head` but not from `base`.
#[instrument]
pub fn count_commits_between(base: &str, head: &str) -> GitResult<u64> {
    let range = format!("{base}..{head}");
    let output = git(&["rev-list", "--count", &range])?;
    let trimmed = output.trim();
    let count = trimmed
        .parse::<u64>()
        .map_err(|_| GitError::UnexpectedOutput {
            command: "rev-list".to_string(),
            output: trimmed.to_string(),
        })?;
    debug!(%range, count, "counted commits");
    Ok(count)
}

/// Check if we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    let result = git(&["rev-parse", "--is-inside-work-tree"]);
    match result {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Parse one `name<TAB>object<TAB>peeled` line.
///
/// Lightweight tags have an empty peeled column; annotated tags point the
/// object column at the tag object, so the peeled commit wins.
fn parse_tag_line(line: &str) -> Option<TagRef> {
    let mut fields = line.split('\t');
    let name = fields.next()?.trim();
    let object = fields.next()?.trim();
    let peeled = fields.next().map(str::trim).unwrap_or_default();

    if name.is_empty() || object.is_empty() {
        return None;
    }

    let commit = if peeled.is_empty() { object } else { peeled };
    Some(TagRef {
        name: name.to_string(),
        commit: commit.to_string(),
    })
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}

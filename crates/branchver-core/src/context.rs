//! Repository state consumed by the calculator.
//!
//! [`ContextProvider`] is the only way the calculator sees the repository.
//! [`GitContextProvider`] answers from the `git` CLI; tests substitute fixed
//! answers.

use semver::Version;
use tracing::{debug, instrument};

use crate::branch::Branch;
use crate::git::{self, GitError, GitResult};
use crate::tags::TagMap;

/// Answers the repository questions a version calculation needs.
pub trait ContextProvider {
    /// The branch currently checked out.
    fn current_branch(&self) -> GitResult<Branch>;

    /// The last version recorded on `target`, as seen while calculating for
    /// `current`. `None` when `target` carries no version yet.
    fn branch_version(&self, current: &Branch, target: &Branch) -> GitResult<Option<Version>>;

    /// Commits on `current` since it diverged from `target`.
    fn commits_since_branch_point(&self, current: &Branch, target: &Branch) -> GitResult<u64>;
}

/// [`ContextProvider`] backed by the repository in the working directory.
///
/// Tags are listed once, when the provider is built. The branch being
/// versioned is always the checked-out state (`HEAD`), whatever name it is
/// given; target branches resolve to a local branch, then `origin/<name>`.
#[derive(Debug)]
pub struct GitContextProvider {
    tags: TagMap,
}

impl GitContextProvider {
    /// Open the repository containing the working directory and index its
    /// version tags.
    #[instrument]
    pub fn discover(tag_prefix: &str) -> GitResult<Self> {
        git::ensure_installed()?;
        if !git::is_inside_repo()? {
            return Err(GitError::NotARepo);
        }
        let tags = TagMap::from_refs(tag_prefix, git::tag_refs()?);
        debug!(versions = tags.len(), "git context ready");
        Ok(Self { tags })
    }

    /// The indexed version tags.
    pub const fn tags(&self) -> &TagMap {
        &self.tags
    }

    fn revision_for(current: &Branch, branch: &Branch) -> GitResult<Option<String>> {
        if branch == current {
            return Ok(Some("HEAD".to_string()));
        }
        git::resolve_branch_ref(branch.name())
    }
}

impl ContextProvider for GitContextProvider {
    fn current_branch(&self) -> GitResult<Branch> {
        git::current_branch()?
            .map(Branch::new)
            .ok_or(GitError::DetachedHead)
    }

    #[instrument(skip_all, fields(current = %current, target = %target))]
    fn branch_version(&self, current: &Branch, target: &Branch) -> GitResult<Option<Version>> {
        let Some(rev) = Self::revision_for(current, target)? else {
            return Ok(None);
        };
        let walk = git::rev_list(&rev)?;
        let version = self.tags.latest_in(walk.iter().map(String::as_str)).cloned();
        debug!(?version, %rev, "branch version");
        Ok(version)
    }

    #[instrument(skip_all, fields(current = %current, target = %target))]
    fn commits_since_branch_point(&self, current: &Branch, target: &Branch) -> GitResult<u64> {
        let base = Self::revision_for(current, target)?.ok_or_else(|| GitError::UnknownBranch {
            name: target.to_string(),
        })?;
        git::count_commits_between(&base, "HEAD")
    }
}

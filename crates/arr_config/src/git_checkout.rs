//! Local checkouts of the guide and template repositories.
//!
//! A checkout is cloned on first use and afterwards fetched and hard-reset to the requested
//! revision, so local modifications in the cache directory never survive a run.

use crate::{ConfigurationError, ConfigurationResult};
use git2::{FetchOptions, Object, Repository, ResetType};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[cfg(test)]
#[path = "git_checkout_tests.rs"]
mod tests;

const REMOTE_NAME: &str = "origin";

/// A working tree of a remote repository pinned to one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCheckout {
    path: PathBuf,
    revision: String,
    commit: String,
}

impl GitCheckout {
    /// Makes `dest` a checkout of `url` at `revision` (branch, tag or commit id).
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::GitOperationFailed` when the clone, fetch, revision
    /// lookup or reset fails.
    pub fn ensure(url: &str, revision: &str, dest: &Path) -> ConfigurationResult<Self> {
        let failed = |reason: String| {
            error!(repository = url, "{}", reason);
            ConfigurationError::GitOperationFailed {
                repository: url.to_string(),
                reason,
            }
        };

        let repo = if dest.join(".git").exists() {
            debug!("Updating checkout of {} in {:?}", url, dest);
            let repo = Repository::open(dest)
                .map_err(|e| failed(format!("Failed to open checkout: {}", e)))?;
            fetch(&repo, url).map_err(|e| failed(format!("Failed to fetch: {}", e)))?;
            repo
        } else {
            info!("Cloning {} into {:?}", url, dest);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| failed(format!("Failed to create {:?}: {}", parent, e)))?;
            }
            Repository::clone(url, dest).map_err(|e| failed(format!("Failed to clone: {}", e)))?
        };

        let target = resolve_revision(&repo, revision)
            .map_err(|e| failed(format!("Unknown revision '{}': {}", revision, e)))?;
        let commit = target
            .peel_to_commit()
            .map_err(|e| failed(format!("Revision '{}' is not a commit: {}", revision, e)))?;

        repo.reset(commit.as_object(), ResetType::Hard, None)
            .map_err(|e| failed(format!("Failed to reset to '{}': {}", revision, e)))?;

        info!(
            repository = url,
            revision = revision,
            commit = %commit.id(),
            "Checkout ready"
        );

        Ok(Self {
            path: dest.to_path_buf(),
            revision: revision.to_string(),
            commit: commit.id().to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Full id of the checked-out commit.
    pub fn commit(&self) -> &str {
        &self.commit
    }
}

fn fetch(repo: &Repository, url: &str) -> Result<(), git2::Error> {
    let mut remote = match repo.find_remote(REMOTE_NAME) {
        Ok(remote) => remote,
        Err(_) => repo.remote(REMOTE_NAME, url)?,
    };
    let mut options = FetchOptions::new();
    options.download_tags(git2::AutotagOption::All);
    remote.fetch(
        &[
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*",
        ],
        Some(&mut options),
        None,
    )
}

/// Resolves a remote branch first so a stale local branch never shadows it.
fn resolve_revision<'r>(repo: &'r Repository, revision: &str) -> Result<Object<'r>, git2::Error> {
    let candidates = [
        format!("refs/remotes/{}/{}", REMOTE_NAME, revision),
        format!("refs/tags/{}", revision),
        revision.to_string(),
    ];

    let mut last_error = None;
    for candidate in &candidates {
        match repo.revparse_single(candidate) {
            Ok(object) => return Ok(object),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| git2::Error::from_str("no candidates")))
}

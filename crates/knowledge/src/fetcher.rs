//! Source fetcher: obtains a working copy of the repository to index.
//!
//! Remote repositories are cloned with the system `git` binary into a
//! checkout directory keyed by a short hash of the clone URL. Local
//! directories are used in place.

use crate::types::{RepoSource, RepositoryReference};
use explain_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Length of the hex prefix naming a checkout directory.
const CHECKOUT_HASH_LEN: usize = 12;

/// When an existing working copy may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchPolicy {
    /// Reuse any existing checkout as-is, whatever branch it is on.
    /// The working copy can be stale.
    ReuseIfPresent,

    /// Reuse only when the checked-out branch is the requested one,
    /// otherwise fetch and switch.
    #[default]
    RefetchOnBranchChange,

    /// Remove the checkout and clone again.
    AlwaysRefetch,
}

/// A resolved working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub path: PathBuf,
    /// True when no clone, fetch or branch switch happened
    pub reused: bool,
}

/// Produces working copies under a checkouts directory.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    checkouts_dir: PathBuf,
    policy: FetchPolicy,
}

impl SourceFetcher {
    pub fn new(checkouts_dir: impl Into<PathBuf>, policy: FetchPolicy) -> Self {
        Self {
            checkouts_dir: checkouts_dir.into(),
            policy,
        }
    }

    /// Location of the working copy for a clone URL.
    pub fn checkout_path(&self, url: &str) -> PathBuf {
        self.checkouts_dir.join(short_hash(url))
    }

    /// Ensure a working copy for `reference` exists and return its path.
    pub async fn fetch(&self, reference: &RepositoryReference) -> AppResult<Checkout> {
        match &reference.source {
            RepoSource::Local(path) => {
                if !path.is_dir() {
                    return Err(AppError::Ingestion(format!(
                        "Local repository path does not exist: {}",
                        path.display()
                    )));
                }
                tracing::debug!(
                    "Using local directory {:?} in place; branch '{}' is not resolved",
                    path,
                    reference.branch
                );
                Ok(Checkout {
                    path: path.clone(),
                    reused: true,
                })
            }
            RepoSource::Remote(url) => self.fetch_remote(url, &reference.branch).await,
        }
    }

    async fn fetch_remote(&self, url: &str, branch: &str) -> AppResult<Checkout> {
        validate_url(url)?;
        validate_branch(branch)?;

        let dest = self.checkout_path(url);
        let present = dest.join(".git").exists();

        if !present {
            if dest.exists() {
                tracing::debug!("Removing incomplete checkout at {:?}", dest);
                remove_checkout(&dest).await?;
            }
            git_clone(url, branch, &dest).await?;
            return Ok(Checkout {
                path: dest,
                reused: false,
            });
        }

        match self.policy {
            FetchPolicy::ReuseIfPresent => {
                tracing::info!("Reusing existing checkout at {:?}", dest);
                Ok(Checkout {
                    path: dest,
                    reused: true,
                })
            }
            FetchPolicy::RefetchOnBranchChange => {
                let current = git_current_branch(&dest).await?;
                if current == branch {
                    tracing::info!("Reusing checkout at {:?} (branch '{}')", dest, branch);
                    return Ok(Checkout {
                        path: dest,
                        reused: true,
                    });
                }
                tracing::info!(
                    "Checkout at {:?} is on '{}', switching to '{}'",
                    dest,
                    current,
                    branch
                );
                git_switch_branch(&dest, branch).await?;
                Ok(Checkout {
                    path: dest,
                    reused: false,
                })
            }
            FetchPolicy::AlwaysRefetch => {
                tracing::info!("Re-cloning {} into {:?}", url, dest);
                remove_checkout(&dest).await?;
                git_clone(url, branch, &dest).await?;
                Ok(Checkout {
                    path: dest,
                    reused: false,
                })
            }
        }
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(CHECKOUT_HASH_LEN);
    encoded
}

/// Reject clone URLs git would parse as an option.
fn validate_url(url: &str) -> AppResult<()> {
    if url.trim().is_empty() {
        return Err(AppError::Ingestion("Repository URL is empty".to_string()));
    }
    if url.starts_with('-') {
        return Err(AppError::Ingestion(format!(
            "Invalid repository URL '{}': must not start with '-'",
            url
        )));
    }
    Ok(())
}

/// Apply git's branch name rules (`git check-ref-format --branch`) without
/// spawning git, so option-like names never reach the command line.
fn validate_branch(branch: &str) -> AppResult<()> {
    let invalid = |reason: &str| -> AppResult<()> {
        Err(AppError::Ingestion(format!(
            "Invalid branch name '{}': {}",
            branch, reason
        )))
    };

    if branch.is_empty() {
        return invalid("empty");
    }
    if branch.starts_with('-') {
        return invalid("must not start with '-'");
    }
    if branch == "@" || branch.contains("@{") || branch.contains("..") {
        return invalid("reserved sequence");
    }
    if branch
        .chars()
        .any(|c| c.is_ascii_control() || c == ' ' || "~^:?*[\\".contains(c))
    {
        return invalid("forbidden character");
    }
    if branch.ends_with('.') || branch.ends_with(".lock") {
        return invalid("bad suffix");
    }
    if branch
        .split('/')
        .any(|part| part.is_empty() || part.starts_with('.'))
    {
        return invalid("bad path component");
    }
    Ok(())
}

async fn remove_checkout(dest: &Path) -> AppResult<()> {
    tokio::fs::remove_dir_all(dest).await.map_err(|e| {
        AppError::Ingestion(format!(
            "Failed to remove checkout {}: {}",
            dest.display(),
            e
        ))
    })
}

/// Run git and return trimmed stdout, mapping every failure to an ingestion error.
async fn run_git(args: &[&str], cwd: Option<&Path>) -> AppResult<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!("Running git {}", args.join(" "));

    let output = cmd.output().await.map_err(|e| {
        AppError::Ingestion(format!(
            "Failed to execute 'git {}'. Is git installed? ({})",
            args.first().copied().unwrap_or_default(),
            e
        ))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Ingestion(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn git_clone(url: &str, branch: &str, dest: &Path) -> AppResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::Ingestion(format!(
                "Failed to create checkout directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let dest_str = dest.to_string_lossy().to_string();
    tracing::info!("Cloning {} (branch '{}') into {:?}", url, branch, dest);
    run_git(
        &[
            "clone",
            "--branch",
            branch,
            "--single-branch",
            "--",
            url,
            dest_str.as_str(),
        ],
        None,
    )
    .await?;
    Ok(())
}

async fn git_current_branch(repo_dir: &Path) -> AppResult<String> {
    run_git(&["rev-parse", "--abbrev-ref", "HEAD"], Some(repo_dir)).await
}

async fn git_switch_branch(repo_dir: &Path, branch: &str) -> AppResult<()> {
    run_git(&["fetch", "--end-of-options", "origin", branch], Some(repo_dir)).await?;
    run_git(&["checkout", "-B", branch, "FETCH_HEAD"], Some(repo_dir)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn git_available() -> bool {
        StdCommand::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
            .args([
                "-c",
                "user.name=test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {:?} failed", args);
    }

    /// Upstream repo with `main` (a.py) and `dev` (a.py + b.py).
    fn upstream_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["checkout", "-q", "-b", "main"]);
        std::fs::write(dir.path().join("a.py"), "print('main')\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "main"]);
        git(dir.path(), &["checkout", "-q", "-b", "dev"]);
        std::fs::write(dir.path().join("b.py"), "print('dev')\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "dev"]);
        git(dir.path(), &["checkout", "-q", "main"]);
        dir
    }

    fn remote_ref(upstream: &TempDir, branch: &str) -> RepositoryReference {
        RepositoryReference::new(RepoSource::Remote(
            upstream.path().to_string_lossy().to_string(),
        ))
        .with_branch(branch)
    }

    #[test]
    fn test_checkout_path_keyed_by_url() {
        let fetcher = SourceFetcher::new("/tmp/checkouts", FetchPolicy::default());
        let a = fetcher.checkout_path("https://github.com/octo/a.git");
        let b = fetcher.checkout_path("https://github.com/octo/b.git");

        assert_ne!(a, b);
        assert_eq!(a, fetcher.checkout_path("https://github.com/octo/a.git"));
        assert_eq!(a.file_name().unwrap().len(), CHECKOUT_HASH_LEN);
        assert!(a.starts_with("/tmp/checkouts"));
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(FetchPolicy::default(), FetchPolicy::RefetchOnBranchChange);
    }

    #[tokio::test]
    async fn test_local_source_used_in_place() {
        let repo = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(repo.path().join("unused"), FetchPolicy::default());
        let reference = RepositoryReference::new(RepoSource::Local(repo.path().to_path_buf()));

        let checkout = fetcher.fetch(&reference).await.unwrap();
        assert_eq!(checkout.path, repo.path());
        assert!(!repo.path().join("unused").exists());
    }

    #[tokio::test]
    async fn test_missing_local_source() {
        let fetcher = SourceFetcher::new("/tmp/checkouts", FetchPolicy::default());
        let reference =
            RepositoryReference::new(RepoSource::Local(PathBuf::from("/definitely/not/here")));

        let result = fetcher.fetch(&reference).await;
        assert!(matches!(result, Err(AppError::Ingestion(_))));
    }

    #[tokio::test]
    async fn test_clone_failure_is_ingestion_error() {
        if !git_available() {
            return;
        }
        let checkouts = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(checkouts.path(), FetchPolicy::default());
        let missing = checkouts.path().join("no-such-upstream");
        let reference = RepositoryReference::new(RepoSource::Remote(
            missing.to_string_lossy().to_string(),
        ));

        let result = fetcher.fetch(&reference).await;
        assert!(matches!(result, Err(AppError::Ingestion(msg)) if msg.contains("git clone failed")));
    }

    #[tokio::test]
    async fn test_refetch_on_branch_change() {
        if !git_available() {
            return;
        }
        let upstream = upstream_repo();
        let checkouts = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(checkouts.path(), FetchPolicy::RefetchOnBranchChange);

        let first = fetcher.fetch(&remote_ref(&upstream, "main")).await.unwrap();
        assert!(!first.reused);
        assert!(first.path.join("a.py").exists());
        assert!(!first.path.join("b.py").exists());

        let again = fetcher.fetch(&remote_ref(&upstream, "main")).await.unwrap();
        assert!(again.reused);
        assert_eq!(again.path, first.path);

        let switched = fetcher.fetch(&remote_ref(&upstream, "dev")).await.unwrap();
        assert!(!switched.reused);
        assert!(switched.path.join("b.py").exists());
        assert_eq!(git_current_branch(&switched.path).await.unwrap(), "dev");
    }

    #[tokio::test]
    async fn test_option_like_branch_never_reaches_git() {
        if !git_available() {
            return;
        }
        let upstream = upstream_repo();
        let checkouts = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(checkouts.path(), FetchPolicy::RefetchOnBranchChange);
        fetcher.fetch(&remote_ref(&upstream, "main")).await.unwrap();

        let marker = checkouts.path().join("marker");
        let hostile = format!("--upload-pack=touch {}; git-upload-pack", marker.display());
        let result = fetcher.fetch(&remote_ref(&upstream, &hostile)).await;

        assert!(matches!(result, Err(AppError::Ingestion(ref msg)) if msg.contains("Invalid branch name")));
        assert!(!marker.exists());
        assert_eq!(
            git_current_branch(&fetcher.checkout_path(&upstream.path().to_string_lossy()))
                .await
                .unwrap(),
            "main"
        );
    }

    #[tokio::test]
    async fn test_option_like_url_rejected_before_clone() {
        let checkouts = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(checkouts.path(), FetchPolicy::default());
        let reference = RepositoryReference::new(RepoSource::Remote(
            "--upload-pack=touch pwned".to_string(),
        ));

        let result = fetcher.fetch(&reference).await;
        assert!(matches!(result, Err(AppError::Ingestion(ref msg)) if msg.contains("must not start with '-'")));
        assert!(std::fs::read_dir(checkouts.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_branch_name_rules() {
        for ok in ["main", "master", "feature/login", "release-1.2", "v2_fix"] {
            assert!(validate_branch(ok).is_ok(), "{} should be accepted", ok);
        }
        for bad in [
            "",
            "-b",
            "--upload-pack=sh",
            "a..b",
            "has space",
            "x~1",
            "ref:",
            "topic/",
            "/topic",
            "a//b",
            ".hidden",
            "dir/.hidden",
            "name.lock",
            "trailing.",
            "@",
            "head@{1}",
        ] {
            assert!(
                matches!(validate_branch(bad), Err(AppError::Ingestion(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_reuse_if_present_ignores_branch() {
        if !git_available() {
            return;
        }
        let upstream = upstream_repo();
        let checkouts = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(checkouts.path(), FetchPolicy::ReuseIfPresent);

        fetcher.fetch(&remote_ref(&upstream, "main")).await.unwrap();
        let reused = fetcher.fetch(&remote_ref(&upstream, "dev")).await.unwrap();

        assert!(reused.reused);
        assert!(!reused.path.join("b.py").exists());
    }

    #[tokio::test]
    async fn test_always_refetch_reclones() {
        if !git_available() {
            return;
        }
        let upstream = upstream_repo();
        let checkouts = TempDir::new().unwrap();
        let fetcher = SourceFetcher::new(checkouts.path(), FetchPolicy::AlwaysRefetch);

        let first = fetcher.fetch(&remote_ref(&upstream, "main")).await.unwrap();
        std::fs::write(first.path.join("stray.py"), "x = 1\n").unwrap();

        let second = fetcher.fetch(&remote_ref(&upstream, "main")).await.unwrap();
        assert!(!second.reused);
        assert!(!second.path.join("stray.py").exists());
    }
}

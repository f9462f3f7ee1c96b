// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! git / git-lfs command runner

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::VcsConfig;
use crate::{AssetLibError, Result};

/// Runs git and git-lfs in a given working directory
#[derive(Debug, Clone)]
pub struct Git {
    git: String,
    git_lfs: String,
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git", "git-lfs")
    }
}

impl Git {
    pub fn new(git: impl Into<String>, git_lfs: impl Into<String>) -> Self {
        Self {
            git: git.into(),
            git_lfs: git_lfs.into(),
        }
    }

    pub fn from_config(config: &VcsConfig) -> Self {
        Self::new(&config.git, &config.git_lfs)
    }

    /// Check whether `path` is a git working copy
    pub fn is_repository(path: &Path) -> bool {
        path.join(".git").exists()
    }

    pub async fn clone_repo(&self, url: &str, dest: &Path, cancel: Option<watch::Receiver<bool>>) -> Result<String> {
        let dest = dest.to_string_lossy();
        let parent = Path::new(".");
        run(&self.git, &["clone", url, dest.as_ref()], parent, cancel).await
    }

    pub async fn lfs_fetch(&self, repo: &Path, cancel: Option<watch::Receiver<bool>>) -> Result<String> {
        run(&self.git_lfs, &["fetch"], repo, cancel).await
    }

    pub async fn lfs_checkout(&self, repo: &Path, cancel: Option<watch::Receiver<bool>>) -> Result<String> {
        run(&self.git_lfs, &["checkout"], repo, cancel).await
    }

    pub async fn add(&self, repo: &Path, path: &str) -> Result<String> {
        run(&self.git, &["add", path], repo, None).await
    }

    pub async fn status(&self, repo: &Path) -> Result<String> {
        run(&self.git, &["status"], repo, None).await
    }

    /// Commit all tracked changes. Returns `false` when there was nothing
    /// to commit.
    pub async fn commit(&self, repo: &Path, message: &str) -> Result<bool> {
        match run(&self.git, &["commit", "-a", "-m", message], repo, None).await {
            Ok(_) => Ok(true),
            Err(AssetLibError::VcsCommand { ref stderr, .. }) if is_nothing_to_commit(stderr) => {
                info!("Nothing to commit");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn pull(&self, repo: &Path) -> Result<String> {
        run(&self.git, &["pull"], repo, None).await
    }

    pub async fn push(&self, repo: &Path) -> Result<String> {
        run(&self.git, &["push"], repo, None).await
    }
}

fn is_nothing_to_commit(output: &str) -> bool {
    output.contains("nothing to commit") || output.contains("nothing added to commit")
}

/// Run a command to completion in `cwd`, returning stdout.
///
/// When `cancel` flips to `true` the child is killed and
/// [`AssetLibError::Cancelled`] is returned.
async fn run(program: &str, args: &[&str], cwd: &Path, cancel: Option<watch::Receiver<bool>>) -> Result<String> {
    let command_line = format!("{} {}", program, args.join(" "));
    debug!("Running `{}` in {:?}", command_line, cwd);

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AssetLibError::VcsCommand {
            command: command_line.clone(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;

    let output = match cancel {
        Some(mut cancel) => {
            if *cancel.borrow() {
                return Err(AssetLibError::Cancelled);
            }
            tokio::select! {
                out = child.wait_with_output() => out?,
                _ = wait_cancelled(&mut cancel) => return Err(AssetLibError::Cancelled),
            }
        }
        None => child.wait_with_output().await?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        // git prints "nothing to commit" on stdout
        let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            stderr = stdout.trim().to_string();
        }
        return Err(AssetLibError::VcsCommand {
            command: command_line,
            status: output.status.to_string(),
            stderr,
        });
    }

    debug!("`{}` finished", command_line);
    Ok(stdout)
}

/// Resolves once the flag is set; never resolves if the sender is dropped
/// without setting it
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = run("echo", &["hello"], dir.path(), None).await.unwrap();
        assert_eq!(out.trim(), "hello");

        let err = run("false", &[], dir.path(), None).await.unwrap_err();
        assert!(matches!(err, AssetLibError::VcsCommand { .. }));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let err = run("definitely-not-a-real-binary", &[], dir.path(), None).await.unwrap_err();
        match err {
            AssetLibError::VcsCommand { status, .. } => assert_eq!(status, "not started"),
            other => panic!("Expected VcsCommand, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let cwd = dir.path().to_path_buf();
            async move { run("sleep", &["30"], &cwd, Some(rx)).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        assert!(matches!(handle.await.unwrap(), Err(AssetLibError::Cancelled)));
    }

    #[tokio::test]
    async fn test_failure_reports_stdout_when_stderr_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = run("sh", &["-c", "echo 'nothing to commit, working tree clean'; exit 1"], dir.path(), None)
            .await
            .unwrap_err();
        match err {
            AssetLibError::VcsCommand { stderr, .. } => assert!(is_nothing_to_commit(&stderr)),
            other => panic!("Expected VcsCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_nothing_to_commit_detection() {
        assert!(is_nothing_to_commit("On branch master\nnothing to commit, working tree clean"));
        assert!(is_nothing_to_commit("nothing added to commit but untracked files present"));
        assert!(!is_nothing_to_commit("error: pathspec 'x' did not match"));
    }
}

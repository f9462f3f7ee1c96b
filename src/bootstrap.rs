// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Repository bootstrap: clone plus LFS fetch/checkout in the background
//!
//! Progress is reported as typed events on a channel. Loading the TOC
//! afterwards is up to the caller, once [`Progress::Done`] arrives.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::vcs::Git;
use crate::{AssetLibError, Result};

/// Milestones of a bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Cloning,
    FetchingLfs,
    CheckingOutLfs,
    Done,
    Failed(String),
}

impl Progress {
    /// Position on a 0..=100 progress bar
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Cloning => Some(1),
            Self::FetchingLfs => Some(33),
            Self::CheckingOutLfs => Some(66),
            Self::Done => Some(100),
            Self::Failed(_) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloning => f.write_str("Cloning git repository..."),
            Self::FetchingLfs => f.write_str("Fetching LFS objects..."),
            Self::CheckingOutLfs => f.write_str("Checkout LFS objects..."),
            Self::Done => f.write_str("Repository ready"),
            Self::Failed(reason) => write!(f, "Bootstrap failed: {}", reason),
        }
    }
}

/// Handle to a running bootstrap
pub struct CloneTask {
    events: mpsc::Receiver<Progress>,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
    last: Option<Progress>,
}

impl CloneTask {
    /// Start cloning `url` into `dest` on a tokio task
    pub fn spawn(git: Git, url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        let url = url.into();
        let dest = dest.into();
        let (tx, events) = mpsc::channel(8);
        let (cancel, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let result = run_clone(&git, &url, &dest, &tx, cancel_rx).await;
            let last = match result {
                Ok(()) => {
                    info!("Repository ready at {:?}", dest);
                    Progress::Done
                }
                Err(e) => {
                    warn!("Bootstrap of {:?} failed: {}", dest, e);
                    Progress::Failed(e.to_string())
                }
            };
            let _ = tx.send(last).await;
        });

        Self {
            events,
            cancel,
            handle,
            last: None,
        }
    }

    /// Wait for the next event; `None` once the task is gone
    pub async fn next(&mut self) -> Option<Progress> {
        let event = self.events.recv().await;
        if let Some(ref e) = event {
            self.last = Some(e.clone());
        }
        event
    }

    /// Non-blocking poll, for callers that check on every redraw
    pub fn try_next(&mut self) -> Option<Progress> {
        let event = self.events.try_recv().ok();
        if let Some(ref e) = event {
            self.last = Some(e.clone());
        }
        event
    }

    /// Most recent event seen through `next`/`try_next`
    pub fn last(&self) -> Option<&Progress> {
        self.last.as_ref()
    }

    /// Ask the task to stop; the running command is killed
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Drain events until the task finishes
    pub async fn wait(mut self) -> Result<()> {
        let mut outcome = Err(AssetLibError::Cancelled);
        while let Some(event) = self.next().await {
            match event {
                Progress::Done => outcome = Ok(()),
                Progress::Failed(reason) => {
                    outcome = Err(AssetLibError::VcsCommand {
                        command: "bootstrap".to_string(),
                        status: "failed".to_string(),
                        stderr: reason,
                    })
                }
                _ => {}
            }
        }
        let _ = (&mut self.handle).await;
        outcome
    }
}

impl Drop for CloneTask {
    /// Nobody is listening any more: stop the task and kill its child
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}

async fn run_clone(
    git: &Git,
    url: &str,
    dest: &Path,
    tx: &mpsc::Sender<Progress>,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    let _ = tx.send(Progress::Cloning).await;
    info!("Cloning {} into {:?}", url, dest);
    git.clone_repo(url, dest, Some(cancel.clone())).await?;

    let _ = tx.send(Progress::FetchingLfs).await;
    git.lfs_fetch(dest, Some(cancel.clone())).await?;

    let _ = tx.send(Progress::CheckingOutLfs).await;
    git.lfs_checkout(dest, Some(cancel)).await?;

    Ok(())
}

/// Bring LFS objects of an existing clone up to date
pub async fn refresh(git: &Git, repo: &Path) -> Result<()> {
    info!("Updating repository at {:?}", repo);
    git.lfs_fetch(repo, None).await?;
    git.lfs_checkout(repo, None).await?;
    Ok(())
}

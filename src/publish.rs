// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Publishing a reconciled manifest
//!
//! Order of work: files into the repository working copy, TOC, git
//! commit and push, then the same files and TOC to the remote store.
//! The first failing step aborts the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::model::{AssetKind, Distribution, Manifest};
use crate::reconcile::{commit, remote_sync_plan, SyncPlan};
use crate::remote::{apply_plan, store_from_config, ApplyStats, DirStore, RemoteStore};
use crate::vcs::Git;
use crate::{toc, Result};

/// Where and how to publish
pub struct PublishContext {
    /// Git working copy of the asset repository
    pub repo: PathBuf,
    /// Fallback directory for asset sources without a recorded path
    pub source_dir: Option<PathBuf>,
    pub git: Git,
    pub commit_message: String,
    /// Public file store; `None` publishes to the repository only
    pub remote: Option<Box<dyn RemoteStore>>,
    /// Compute the plan without touching anything
    pub dry_run: bool,
}

impl PublishContext {
    /// Fails when the configured remote cannot be set up, e.g. the FTP
    /// password is missing from the environment
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            repo: config.repo_path(),
            source_dir: config.source_dir.as_ref().map(PathBuf::from),
            git: Git::from_config(&config.vcs),
            commit_message: config.vcs.commit_message.clone(),
            remote: store_from_config(&config.remote)?,
            dry_run: false,
        })
    }
}

/// Summary of a publish run
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub timestamp: DateTime<Utc>,
    pub kind: AssetKind,
    pub distribution: Distribution,
    /// Live entries in the published TOC
    pub assets: usize,
    pub plan: SyncPlan,
    pub repository: ApplyStats,
    pub remote: Option<ApplyStats>,
    /// `false` when git had nothing to commit
    pub committed: bool,
    pub dry_run: bool,
}

/// Publish `manifest`. On success the manifest is replaced by its
/// committed form; on a dry run it is left as is.
pub async fn publish(ctx: &PublishContext, manifest: &mut Manifest) -> Result<PublishReport> {
    let plan = remote_sync_plan(manifest);
    for name in &plan.missing_previews {
        warn!("{} has no preview image", name);
    }

    let mut report = PublishReport {
        timestamp: Utc::now(),
        kind: manifest.kind,
        distribution: manifest.distribution,
        assets: manifest.live_count(),
        plan,
        repository: ApplyStats::default(),
        remote: None,
        committed: false,
        dry_run: ctx.dry_run,
    };

    if ctx.dry_run {
        info!(
            "Dry run: {} upload(s), {} deletion(s)",
            report.plan.uploads.len(),
            report.plan.deletions.len()
        );
        return Ok(report);
    }

    let staging = tempfile::tempdir()?;
    let source_dir = ctx.source_dir.as_deref();

    let repo_store = DirStore::new(&ctx.repo);
    report.repository = apply_plan(&repo_store, &report.plan, source_dir, staging.path()).await?;

    let toc_file = toc::save(&ctx.repo, manifest)?;
    let toc_name = toc_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| manifest.file_name().to_string());

    ctx.git.add(&ctx.repo, &toc_name).await?;
    let kind_dir = manifest.kind.dir();
    if ctx.repo.join(kind_dir).is_dir() {
        ctx.git.add(&ctx.repo, kind_dir).await?;
    }
    ctx.git.status(&ctx.repo).await?;
    report.committed = ctx.git.commit(&ctx.repo, &ctx.commit_message).await?;
    ctx.git.pull(&ctx.repo).await?;
    ctx.git.push(&ctx.repo).await?;
    info!("Repository updated");

    if let Some(remote) = &ctx.remote {
        let json = toc::to_json(manifest)?;
        remote.put(&toc_name, json.as_bytes()).await?;
        report.remote = Some(apply_plan(remote.as_ref(), &report.plan, source_dir, staging.path()).await?);
        info!("Remote store {} updated", remote.name());
    }

    *manifest = commit(manifest);
    Ok(report)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::AssetRecord;
    use crate::reconcile::{accept, mark_deleted};

    fn record(stem: &str, hash: char) -> AssetRecord {
        let mut rec = AssetRecord::from_stem(stem, hash.to_string().repeat(64));
        rec.bbox_min = Some([0.0; 3]);
        rec.bbox_max = Some([1.0; 3]);
        rec
    }

    struct Fixture {
        repo: tempfile::TempDir,
        src: tempfile::TempDir,
        remote: tempfile::TempDir,
        manifest: Manifest,
    }

    /// Repository holding Old; Lamp newly added, Old deleted
    fn fixture() -> Fixture {
        let repo = tempfile::tempdir().unwrap();
        let src = tempfile::tempdir().unwrap();
        let remote = tempfile::tempdir().unwrap();

        std::fs::create_dir_all(repo.path().join("model/preview")).unwrap();
        std::fs::write(repo.path().join("model/Old.zip"), b"zip").unwrap();
        std::fs::write(repo.path().join("model/preview/Old.jpg"), b"jpg").unwrap();
        std::fs::write(src.path().join("Lamp.blend"), b"BLENDER-v300").unwrap();
        std::fs::write(src.path().join("Lamp.jpg"), b"jpg").unwrap();

        let mut manifest = Manifest::new(AssetKind::Model, Distribution::Standard);
        manifest.assets.push(record("Old", '1'));
        let mut lamp = record("Lamp", '2');
        lamp.source_ref = Some(src.path().join("Lamp.blend"));
        lamp.thumbnail_ref = Some(src.path().join("Lamp.jpg"));
        accept(&mut manifest, &lamp).unwrap();
        let old = manifest.find_by_name("Old").unwrap().key();
        mark_deleted(&mut manifest, &old).unwrap();

        Fixture {
            repo,
            src,
            remote,
            manifest,
        }
    }

    fn context(f: &Fixture, git: Git) -> PublishContext {
        PublishContext {
            repo: f.repo.path().to_path_buf(),
            source_dir: Some(f.src.path().to_path_buf()),
            git,
            commit_message: "Update Assets".to_string(),
            remote: Some(Box::new(DirStore::new(f.remote.path()))),
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_publish_updates_repo_and_remote() {
        let mut f = fixture();
        let ctx = context(&f, Git::new("true", "true"));

        let report = publish(&ctx, &mut f.manifest).await.unwrap();
        assert_eq!(report.assets, 1);
        assert_eq!(report.repository, ApplyStats { uploaded: 2, deleted: 2 });
        // Deleting files the remote never had still counts
        assert_eq!(report.remote, Some(ApplyStats { uploaded: 2, deleted: 2 }));
        assert!(report.committed);

        let repo = f.repo.path();
        assert!(repo.join("model/Lamp.zip").is_file());
        assert!(repo.join("model/preview/Lamp.jpg").is_file());
        assert!(!repo.join("model/Old.zip").exists());

        let published = toc::load(repo, AssetKind::Model, Distribution::Standard).unwrap();
        assert_eq!(published.assets.len(), 1);
        assert_eq!(published.assets[0].name, "Lamp");

        let remote_toc = std::fs::read_to_string(f.remote.path().join("assets_model.json")).unwrap();
        assert_eq!(remote_toc, toc::to_json(&published).unwrap());
        assert!(f.remote.path().join("model/Lamp.zip").is_file());

        // Committed: nothing left to sync
        assert!(remote_sync_plan(&f.manifest).is_empty());
        assert!(f.manifest.assets.iter().all(|a| !a.is_new));
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let mut f = fixture();
        let mut ctx = context(&f, Git::new("false", "false"));
        ctx.dry_run = true;
        let before = f.manifest.clone();

        let report = publish(&ctx, &mut f.manifest).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.plan.uploads.len(), 2);
        assert_eq!(report.plan.deletions, vec!["model/Old.zip".to_string(), "model/preview/Old.jpg".to_string()]);
        assert_eq!(f.manifest, before);
        assert!(f.repo.path().join("model/Old.zip").exists());
        assert!(!f.repo.path().join("assets_model.json").exists());
    }

    #[tokio::test]
    async fn test_git_failure_stops_before_remote() {
        let mut f = fixture();
        let ctx = context(&f, Git::new("false", "true"));
        let before = f.manifest.clone();

        assert!(publish(&ctx, &mut f.manifest).await.is_err());
        assert_eq!(f.manifest, before);
        assert!(!f.remote.path().join("assets_model.json").exists());
    }

    #[test]
    fn test_context_remote_from_config() {
        let mut config = AppConfig::default();
        assert!(PublishContext::from_config(&config).unwrap().remote.is_none());

        config.remote.root = Some("/mnt/lol".to_string());
        let ctx = PublishContext::from_config(&config).unwrap();
        assert_eq!(ctx.remote.unwrap().name(), "/mnt/lol");

        config.remote.host = Some("ftp.example.org".to_string());
        config.remote.username = Some("lux".to_string());
        config.remote.password_env = "ASSETLIB_TEST_PUBLISH_PASSWORD_UNSET".to_string();
        assert!(matches!(
            PublishContext::from_config(&config),
            Err(crate::AssetLibError::Config(_))
        ));
    }
}

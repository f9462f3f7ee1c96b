// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Manifest reconciliation
//!
//! Merges scanned candidates into a manifest, tracks soft deletes and
//! works out what the remote side needs to change. None of these
//! functions touch the file system.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConflictError;
use crate::model::{AssetKey, AssetRecord, Distribution, Manifest, SortKey};
use crate::{AssetLibError, Result};

/// Candidates compared against a manifest
#[derive(Debug, Clone, Default)]
pub struct Diff {
    /// Every candidate, in scan order
    pub new_candidates: Vec<AssetRecord>,
    /// Candidate names already used by a live manifest entry
    pub name_collisions: Vec<String>,
}

/// What happened to one candidate in [`accept_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Added,
    SkippedDuplicateHash,
    SkippedDuplicateName,
}

impl From<&ConflictError> for Outcome {
    fn from(err: &ConflictError) -> Self {
        match err {
            ConflictError::DuplicateHash { .. } => Self::SkippedDuplicateHash,
            ConflictError::DuplicateName { .. } => Self::SkippedDuplicateName,
        }
    }
}

/// Flag candidates whose name is already taken. Informational only.
pub fn diff(manifest: &Manifest, candidates: &[AssetRecord]) -> Diff {
    let names: HashSet<&str> = manifest.live().map(|a| a.name.as_str()).collect();

    let name_collisions: Vec<String> = candidates
        .iter()
        .filter(|c| names.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();

    for name in &name_collisions {
        info!("Found in assets: {}", name);
    }

    Diff {
        new_candidates: candidates.to_vec(),
        name_collisions,
    }
}

/// Append `candidate` unless its hash or name is already live.
///
/// The manifest is left untouched when a conflict is returned.
pub fn accept(manifest: &mut Manifest, candidate: &AssetRecord) -> std::result::Result<(), ConflictError> {
    if manifest.live().any(|a| a.content_hash == candidate.content_hash) {
        return Err(ConflictError::DuplicateHash {
            name: candidate.name.clone(),
            hash: candidate.content_hash.clone(),
        });
    }
    if manifest.live().any(|a| a.name == candidate.name) {
        return Err(ConflictError::DuplicateName {
            name: candidate.name.clone(),
        });
    }

    let mut record = candidate.clone();
    record.is_new = true;
    record.is_deleted = false;
    if !manifest.kind.has_bbox() {
        record.bbox_min = None;
        record.bbox_max = None;
    }

    info!("Added {} to database", record.name);
    manifest.assets.push(record);
    Ok(())
}

/// [`accept`] every candidate in order, never stopping on a conflict
pub fn accept_all(manifest: &mut Manifest, candidates: &[AssetRecord]) -> Vec<(AssetRecord, Outcome)> {
    candidates
        .iter()
        .map(|candidate| {
            let outcome = match accept(manifest, candidate) {
                Ok(()) => Outcome::Added,
                Err(err) => {
                    info!("{}", err);
                    Outcome::from(&err)
                }
            };
            (candidate.clone(), outcome)
        })
        .collect()
}

/// Soft-delete the entry identified by `key`
pub fn mark_deleted(manifest: &mut Manifest, key: &AssetKey) -> Result<()> {
    let entry = manifest
        .assets
        .iter_mut()
        .find(|a| a.matches(key) && !a.is_deleted)
        .ok_or_else(|| AssetLibError::NotFound(key.to_string()))?;
    entry.is_deleted = true;
    debug!("Marked {} deleted", key);
    Ok(())
}

/// Soft-delete by position in the displayed list.
///
/// `index` counts live entries sorted with `sort`, the same view
/// [`Manifest::sorted`] returns. Returns the key that was deleted.
pub fn mark_deleted_at(manifest: &mut Manifest, sort: SortKey, index: usize) -> Result<AssetKey> {
    let key = manifest
        .sorted(sort)
        .get(index)
        .map(|a| a.key())
        .ok_or_else(|| AssetLibError::NotFound(format!("asset #{}", index)))?;
    mark_deleted(manifest, &key)?;
    Ok(key)
}

/// Undo a soft delete
pub fn restore(manifest: &mut Manifest, key: &AssetKey) -> Result<()> {
    let entry = manifest
        .assets
        .iter_mut()
        .find(|a| a.matches(key) && a.is_deleted)
        .ok_or_else(|| AssetLibError::NotFound(key.to_string()))?;
    entry.is_deleted = false;
    Ok(())
}

/// The manifest as it should be persisted: deleted entries dropped,
/// session-only fields cleared, bounds kept for models only.
pub fn commit(manifest: &Manifest) -> Manifest {
    let keep_bbox = manifest.kind.has_bbox();
    let assets = manifest
        .live()
        .map(|a| AssetRecord {
            name: a.name.clone(),
            url: a.url.clone(),
            category: a.category.clone(),
            content_hash: a.content_hash.clone(),
            bbox_min: a.bbox_min.filter(|_| keep_bbox),
            bbox_max: a.bbox_max.filter(|_| keep_bbox),
            thumbnail_ref: None,
            source_ref: None,
            is_new: false,
            is_deleted: false,
        })
        .collect();

    Manifest {
        kind: manifest.kind,
        distribution: manifest.distribution,
        assets,
    }
}

/// A file to place on the remote side
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Upload {
    /// Zip the asset source and store it at `remote`
    Archive {
        asset: String,
        source: Option<PathBuf>,
        remote: String,
    },
    /// Copy the preview image to `remote`
    Preview {
        asset: String,
        local: PathBuf,
        remote: String,
    },
}

impl Upload {
    pub fn remote(&self) -> &str {
        match self {
            Self::Archive { remote, .. } | Self::Preview { remote, .. } => remote,
        }
    }
}

/// Remote changes implied by a manifest's new and deleted entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncPlan {
    pub uploads: Vec<Upload>,
    /// Remote paths to remove
    pub deletions: Vec<String>,
    /// New assets that have no preview image to upload
    pub missing_previews: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.deletions.is_empty()
    }
}

/// Work out uploads for new entries and deletions for removed ones.
///
/// Restricted assets keep no archive on the remote, only a preview.
/// Previews are stored as `<stem>.jpg`, so a thumbnail that is not a JPEG
/// counts as missing. A file is deleted only when no surviving entry maps
/// to the same name, and each path is deleted once.
/// Entries both added and deleted in the same session never reached the
/// remote and are ignored.
pub fn remote_sync_plan(manifest: &Manifest) -> SyncPlan {
    let kind = manifest.kind;
    let with_archives = manifest.distribution == Distribution::Standard;
    let mut plan = SyncPlan::default();

    for asset in manifest.assets.iter().filter(|a| a.is_new && !a.is_deleted) {
        if with_archives {
            plan.uploads.push(Upload::Archive {
                asset: asset.name.clone(),
                source: asset.source_ref.clone(),
                remote: asset.archive_path(kind),
            });
        }
        match asset.thumbnail_ref.as_ref().filter(|p| is_jpeg(p)) {
            Some(local) => plan.uploads.push(Upload::Preview {
                asset: asset.name.clone(),
                local: local.clone(),
                remote: asset.preview_path(kind),
            }),
            None => plan.missing_previews.push(asset.name.clone()),
        }
    }

    let used_archives: HashSet<&str> = manifest.live().map(|a| a.url.as_str()).collect();
    let used_images: HashSet<String> = manifest.live().map(|a| a.preview_name()).collect();

    let mut seen = HashSet::new();
    for asset in manifest.assets.iter().filter(|a| a.is_deleted && !a.is_new) {
        if with_archives && !used_archives.contains(asset.url.as_str()) {
            let path = asset.archive_path(kind);
            if seen.insert(path.clone()) {
                plan.deletions.push(path);
            }
        }
        if !used_images.contains(&asset.preview_name()) {
            let path = asset.preview_path(kind);
            if seen.insert(path.clone()) {
                plan.deletions.push(path);
            }
        }
    }

    plan
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

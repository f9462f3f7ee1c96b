// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Editing session over one manifest
//!
//! Holds the current selection, the loaded manifest, candidates waiting
//! to be added and the messages produced along the way. Every user
//! action is a method; nothing here talks to git or the remote.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::ConflictError;
use crate::model::{AssetKey, AssetKind, AssetRecord, Distribution, Manifest, SortKey};
use crate::reconcile::{self, Outcome};
use crate::scanner::Scanner;
use crate::{toc, AssetLibError, Result};

#[derive(Debug, Clone)]
pub struct Session {
    kind: AssetKind,
    distribution: Distribution,
    sort: SortKey,
    manifest: Manifest,
    candidates: Vec<AssetRecord>,
    messages: Vec<String>,
    library_dir: Option<PathBuf>,
}

impl Session {
    /// Start an empty session. Restricted always means models.
    pub fn new(kind: AssetKind, distribution: Distribution) -> Self {
        let kind = if distribution == Distribution::Restricted {
            AssetKind::Model
        } else {
            kind
        };
        Self {
            kind,
            distribution,
            sort: SortKey::default(),
            manifest: Manifest::new(kind, distribution),
            candidates: Vec::new(),
            messages: Vec::new(),
            library_dir: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut session = Self::new(config.kind, config.distribution);
        session.sort = config.sort;
        session.library_dir = config.library_dir();
        session
    }

    /// Directory holding `<kind>/preview/` images for loaded entries
    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Mutable access for publishing, which replaces the manifest with
    /// its committed form
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Candidates from the last check that have not been added
    pub fn candidates(&self) -> &[AssetRecord] {
        &self.candidates
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Replace the manifest with the TOC of the current selection in `repo`
    pub fn load_toc(&mut self, repo: &Path) -> Result<()> {
        let mut manifest = toc::load(repo, self.kind, self.distribution)?;

        if let Some(lib) = &self.library_dir {
            let preview_dir = lib.join(self.kind.dir()).join("preview");
            for asset in &mut manifest.assets {
                let preview = preview_dir.join(asset.preview_name());
                if preview.is_file() {
                    asset.thumbnail_ref = Some(preview);
                }
            }
        }

        info!("Loaded {} {} asset(s)", manifest.live_count(), self.kind);
        self.manifest = manifest;
        Ok(())
    }

    /// Scan `dir` for new assets, replacing any pending candidates
    pub fn check_path(&mut self, scanner: &Scanner, dir: &Path) -> Result<()> {
        if scanner.kind() != self.kind {
            return Err(AssetLibError::Config(format!(
                "Scanner is set up for {} but the session holds {}",
                scanner.kind(),
                self.kind
            )));
        }

        self.messages.clear();
        self.candidates.clear();

        let (candidates, warnings) = scanner.scan(dir)?.partition();
        let diff = reconcile::diff(&self.manifest, &candidates);

        let mut pending = diff.new_candidates;
        pending.sort_by(|a, b| SortKey::Name.compare(a, b));
        self.candidates = pending;
        self.messages.extend(warnings.iter().map(|w| w.to_string()));

        debug!(
            "{} candidate(s), {} already named in the manifest",
            self.candidates.len(),
            diff.name_collisions.len()
        );
        Ok(())
    }

    /// Add one pending candidate. Returns `false` when it was refused; the
    /// reason replaces the messages and the candidate stays pending.
    pub fn add(&mut self, key: &AssetKey) -> Result<bool> {
        self.messages.clear();
        let index = self
            .candidates
            .iter()
            .position(|c| c.matches(key))
            .ok_or_else(|| AssetLibError::NotFound(format!("candidate {}", key)))?;

        match reconcile::accept(&mut self.manifest, &self.candidates[index]) {
            Ok(()) => {
                self.candidates.remove(index);
                Ok(true)
            }
            Err(err) => {
                self.messages.push(err.to_string());
                Ok(false)
            }
        }
    }

    /// Add every pending candidate; refusals become messages
    pub fn add_all(&mut self) -> Vec<(AssetRecord, Outcome)> {
        self.messages.clear();
        let candidates = std::mem::take(&mut self.candidates);
        let results = reconcile::accept_all(&mut self.manifest, &candidates);

        for (candidate, outcome) in &results {
            let conflict = match outcome {
                Outcome::Added => continue,
                Outcome::SkippedDuplicateHash => ConflictError::DuplicateHash {
                    name: candidate.name.clone(),
                    hash: candidate.content_hash.clone(),
                },
                Outcome::SkippedDuplicateName => ConflictError::DuplicateName {
                    name: candidate.name.clone(),
                },
            };
            self.messages.push(conflict.to_string());
        }
        results
    }

    pub fn remove(&mut self, key: &AssetKey) -> Result<()> {
        reconcile::mark_deleted(&mut self.manifest, key)
    }

    /// Remove by position in [`Session::visible_assets`]
    pub fn remove_at(&mut self, index: usize) -> Result<AssetKey> {
        reconcile::mark_deleted_at(&mut self.manifest, self.sort, index)
    }

    pub fn restore(&mut self, key: &AssetKey) -> Result<()> {
        reconcile::restore(&mut self.manifest, key)
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    /// Switch asset kind. Materials are never restricted.
    pub fn set_kind(&mut self, kind: AssetKind) {
        self.kind = kind;
        if kind == AssetKind::Material {
            self.distribution = Distribution::Standard;
        }
        self.reset();
    }

    /// Switch distribution. Restricted assets are always models.
    pub fn set_distribution(&mut self, distribution: Distribution) {
        self.distribution = distribution;
        if distribution == Distribution::Restricted {
            self.kind = AssetKind::Model;
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.manifest = Manifest::new(self.kind, self.distribution);
        self.candidates.clear();
    }

    /// Live entries in display order
    pub fn visible_assets(&self) -> Vec<&AssetRecord> {
        self.manifest.sorted(self.sort)
    }

    pub fn asset_count(&self) -> usize {
        self.manifest.live_count()
    }
}

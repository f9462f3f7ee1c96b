// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Table-of-contents persistence and linting

use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::{toc_file_name, AssetKind, AssetRecord, Distribution, Manifest};
use crate::reconcile::commit;
use crate::{AssetLibError, Result};

/// Path of the TOC for a selection inside a repository
pub fn toc_path(repo: &Path, kind: AssetKind, distribution: Distribution) -> PathBuf {
    repo.join(toc_file_name(kind, distribution))
}

/// Load a TOC; a missing file is an empty manifest
pub fn load(repo: &Path, kind: AssetKind, distribution: Distribution) -> Result<Manifest> {
    let path = toc_path(repo, kind, distribution);
    if !path.is_file() {
        info!("No TOC at {:?}, starting empty", path);
        return Ok(Manifest::new(kind, distribution));
    }

    let content = std::fs::read_to_string(&path)?;
    let manifest = from_json(&content, kind, distribution)?;
    debug!("Loaded {} asset(s) from {:?}", manifest.assets.len(), path);
    Ok(manifest)
}

/// Parse TOC JSON for the given selection
pub fn from_json(content: &str, kind: AssetKind, distribution: Distribution) -> Result<Manifest> {
    let mut assets: Vec<AssetRecord> = serde_json::from_str(content)?;
    if !kind.has_bbox() {
        for asset in &mut assets {
            asset.bbox_min = None;
            asset.bbox_max = None;
        }
    }
    Ok(Manifest {
        kind,
        distribution,
        assets,
    })
}

/// Committed form of the manifest as pretty-printed JSON
pub fn to_json(manifest: &Manifest) -> Result<String> {
    Ok(serde_json::to_string_pretty(&commit(manifest).assets)?)
}

/// Write the committed manifest into `repo`, replacing the file in one step
pub fn save(repo: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let json = to_json(manifest)?;
    let path = toc_path(repo, manifest.kind, manifest.distribution);

    let mut tmp = tempfile::NamedTempFile::new_in(repo)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| AssetLibError::FileSystem(e.error))?;

    info!("Saved {} asset(s) to {:?}", manifest.live_count(), path);
    Ok(path)
}

/// Problem found in a TOC
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TocIssue {
    DuplicateName { name: String },
    DuplicateHash { hash: String, names: Vec<String> },
    BadUrl { name: String, url: String },
    BadHash { name: String },
    MissingBbox { name: String },
    UnexpectedBbox { name: String },
}

impl std::fmt::Display for TocIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "name '{}' is used more than once", name),
            Self::DuplicateHash { hash, names } => {
                write!(f, "hash {} is shared by {}", hash, names.join(", "))
            }
            Self::BadUrl { name, url } => write!(f, "{}: url '{}' is not a .zip file", name, url),
            Self::BadHash { name } => write!(f, "{}: hash is not a SHA-256 hex digest", name),
            Self::MissingBbox { name } => write!(f, "{}: model without bounding box", name),
            Self::UnexpectedBbox { name } => write!(f, "{}: material with bounding box", name),
        }
    }
}

/// Check the invariants of the live entries of a manifest
pub fn validate(manifest: &Manifest) -> Vec<TocIssue> {
    let mut issues = Vec::new();
    let mut names: HashMap<&str, usize> = HashMap::new();
    let mut hashes: HashMap<&str, Vec<String>> = HashMap::new();

    for asset in manifest.live() {
        *names.entry(asset.name.as_str()).or_insert(0) += 1;
        hashes
            .entry(asset.content_hash.as_str())
            .or_default()
            .push(asset.name.clone());

        if !asset.url.ends_with(".zip") || asset.url.len() <= ".zip".len() {
            issues.push(TocIssue::BadUrl {
                name: asset.name.clone(),
                url: asset.url.clone(),
            });
        }
        if !is_sha256_hex(&asset.content_hash) {
            issues.push(TocIssue::BadHash { name: asset.name.clone() });
        }

        let has_bbox = asset.bbox_min.is_some() && asset.bbox_max.is_some();
        match (manifest.kind.has_bbox(), has_bbox) {
            (true, false) => issues.push(TocIssue::MissingBbox { name: asset.name.clone() }),
            (false, true) => issues.push(TocIssue::UnexpectedBbox { name: asset.name.clone() }),
            _ => {}
        }
    }

    let mut dup_names: Vec<&str> = names.into_iter().filter(|(_, n)| *n > 1).map(|(k, _)| k).collect();
    dup_names.sort_unstable();
    issues.extend(dup_names.into_iter().map(|name| TocIssue::DuplicateName { name: name.to_string() }));

    let mut dup_hashes: Vec<(&str, Vec<String>)> = hashes.into_iter().filter(|(_, v)| v.len() > 1).collect();
    dup_hashes.sort_by(|a, b| a.0.cmp(b.0));
    issues.extend(dup_hashes.into_iter().map(|(hash, names)| TocIssue::DuplicateHash {
        hash: hash.to_string(),
        names,
    }));

    issues
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortKey;
    use crate::reconcile::{accept, mark_deleted};

    const H1: &str = "1111111111111111111111111111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222222222222222222222222222";

    fn model(stem: &str, hash: &str) -> AssetRecord {
        let mut rec = AssetRecord::from_stem(stem, hash);
        rec.bbox_min = Some([-0.5, -0.5, 0.0]);
        rec.bbox_max = Some([0.5, 0.5, 1.25]);
        rec
    }

    #[test]
    fn test_json_layout() {
        let mut m = Manifest::new(AssetKind::Model, Distribution::Standard);
        m.assets.push(model("Chair", H1));

        let json = to_json(&m).unwrap();
        assert!(json.starts_with("[\n  {\n    \"name\": \"Chair\""));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value[0];
        assert_eq!(entry["url"], "Chair.zip");
        assert_eq!(entry["category"], "Misc");
        assert_eq!(entry["hash"], H1);
        assert_eq!(entry["bbox_max"][2], 1.25);
        assert!(entry.get("is_new").is_none());
        assert!(entry.get("thumbnail_ref").is_none());
    }

    #[test]
    fn test_material_json_has_no_bbox() {
        let mut m = Manifest::new(AssetKind::Material, Distribution::Standard);
        m.assets.push(model("Gold", H1));
        let json = to_json(&m).unwrap();
        assert!(!json.contains("bbox"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Manifest::new(AssetKind::Model, Distribution::Standard);
        m.assets.push(model("Chair", H1));
        accept(&mut m, &model("Old_Table", H2)).unwrap();
        accept(&mut m, &model("Gone", "3333")).unwrap();
        let key = m.find_by_name("Gone").unwrap().key();
        mark_deleted(&mut m, &key).unwrap();

        let path = save(dir.path(), &m).unwrap();
        assert_eq!(path, dir.path().join("assets_model.json"));

        let loaded = load(dir.path(), AssetKind::Model, Distribution::Standard).unwrap();
        assert_eq!(loaded, commit(&m));
        assert_eq!(loaded.sorted(SortKey::Name)[1].name, "Old Table");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Manifest::new(AssetKind::Model, Distribution::Restricted);
        m.assets.push(model("Chair", H1));
        save(dir.path(), &m).unwrap();
        m.assets.push(model("Desk", H2));
        save(dir.path(), &m).unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["assets_model_patreon.json".to_string()]);
        let loaded = load(dir.path(), AssetKind::Model, Distribution::Restricted).unwrap();
        assert_eq!(loaded.assets.len(), 2);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let m = load(dir.path(), AssetKind::Material, Distribution::Standard).unwrap();
        assert!(m.assets.is_empty());
        assert_eq!(m.kind, AssetKind::Material);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("assets_model.json"), "[{\"name\": 3}]").unwrap();
        assert!(matches!(
            load(dir.path(), AssetKind::Model, Distribution::Standard),
            Err(AssetLibError::Json(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut m = Manifest::new(AssetKind::Model, Distribution::Standard);
        m.assets.push(model("Chair", H1));
        m.assets.push(model("Chair", H2));
        m.assets.push(model("Copy", H1));
        let mut bad = AssetRecord::from_stem("Lamp", "xyz");
        bad.url = "Lamp.blend".to_string();
        m.assets.push(bad);

        let issues = validate(&m);
        assert!(issues.contains(&TocIssue::DuplicateName { name: "Chair".into() }));
        assert!(issues.contains(&TocIssue::DuplicateHash {
            hash: H1.into(),
            names: vec!["Chair".into(), "Copy".into()],
        }));
        assert!(issues.contains(&TocIssue::BadUrl { name: "Lamp".into(), url: "Lamp.blend".into() }));
        assert!(issues.contains(&TocIssue::BadHash { name: "Lamp".into() }));
        assert!(issues.contains(&TocIssue::MissingBbox { name: "Lamp".into() }));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn test_validate_clean() {
        let mut m = Manifest::new(AssetKind::Model, Distribution::Standard);
        m.assets.push(model("Chair", H1));
        m.assets.push(model("Desk", H2));
        assert!(validate(&m).is_empty());
    }
}

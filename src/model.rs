// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Asset records, manifests and the tags that select them

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Axis-aligned vector as stored in the TOC
pub type Vec3 = [f64; 3];

/// Category given to freshly scanned assets
pub const DEFAULT_CATEGORY: &str = "Misc";

/// Kind of asset a manifest lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Model,
    Material,
}

impl AssetKind {
    /// Storage directory, both in the repository and on the remote
    pub fn dir(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Material => "material",
        }
    }

    pub fn has_bbox(self) -> bool {
        self == Self::Model
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "material" => Ok(Self::Material),
            other => Err(format!("unknown asset kind '{}' (expected model or material)", other)),
        }
    }
}

/// Which published set of assets a manifest belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    #[default]
    Standard,
    /// Subscriber-only assets; archives are not stored on the public remote
    #[serde(alias = "patreon")]
    Restricted,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Restricted => f.write_str("restricted"),
        }
    }
}

impl FromStr for Distribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "restricted" | "patreon" => Ok(Self::Restricted),
            other => Err(format!(
                "unknown distribution '{}' (expected standard or restricted)",
                other
            )),
        }
    }
}

/// Display order for asset lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Category,
}

impl SortKey {
    /// Case-insensitive comparison; category sort falls back to name
    pub fn compare(self, a: &AssetRecord, b: &AssetRecord) -> Ordering {
        let by_name = || a.name.to_lowercase().cmp(&b.name.to_lowercase());
        match self {
            Self::Name => by_name(),
            Self::Category => a
                .category
                .to_lowercase()
                .cmp(&b.category.to_lowercase())
                .then_with(by_name),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "category" => Ok(Self::Category),
            other => Err(format!("unknown sort key '{}' (expected name or category)", other)),
        }
    }
}

/// Stable identity of an asset across re-sorted views
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    pub name: String,
    pub hash: String,
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.hash.get(..12).unwrap_or(&self.hash);
        write!(f, "{} ({})", self.name, short)
    }
}

/// One asset as listed in a TOC, or as found by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    /// Archive filename relative to the kind directory
    pub url: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Hex SHA-256 of the primary asset file
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_min: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_max: Option<Vec3>,

    /// Local preview image
    #[serde(skip)]
    pub thumbnail_ref: Option<PathBuf>,
    /// Primary asset file the record was scanned from
    #[serde(skip)]
    pub source_ref: Option<PathBuf>,
    #[serde(skip)]
    pub is_new: bool,
    #[serde(skip)]
    pub is_deleted: bool,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl AssetRecord {
    /// Build a record for an asset source file stem such as `Old_Chair`
    pub fn from_stem(stem: &str, content_hash: impl Into<String>) -> Self {
        Self {
            name: name_from_stem(stem),
            url: format!("{}.zip", stem),
            category: default_category(),
            content_hash: content_hash.into(),
            bbox_min: None,
            bbox_max: None,
            thumbnail_ref: None,
            source_ref: None,
            is_new: false,
            is_deleted: false,
        }
    }

    pub fn key(&self) -> AssetKey {
        AssetKey {
            name: self.name.clone(),
            hash: self.content_hash.clone(),
        }
    }

    pub fn matches(&self, key: &AssetKey) -> bool {
        self.name == key.name && self.content_hash == key.hash
    }

    /// File stem shared by the archive and the preview
    pub fn stem(&self) -> &str {
        Path::new(&self.url)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.url)
    }

    pub fn preview_name(&self) -> String {
        format!("{}.jpg", self.stem())
    }

    /// Remote/repository path of the zipped asset
    pub fn archive_path(&self, kind: AssetKind) -> String {
        format!("{}/{}", kind.dir(), self.url)
    }

    /// Remote/repository path of the preview image
    pub fn preview_path(&self, kind: AssetKind) -> String {
        format!("{}/preview/{}", kind.dir(), self.preview_name())
    }
}

/// Derive a display name from a file stem
pub fn name_from_stem(stem: &str) -> String {
    stem.replace('_', " ")
}

/// Ordered list of assets of one kind and distribution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pub kind: AssetKind,
    pub distribution: Distribution,
    pub assets: Vec<AssetRecord>,
}

impl Manifest {
    pub fn new(kind: AssetKind, distribution: Distribution) -> Self {
        Self {
            kind,
            distribution,
            assets: Vec::new(),
        }
    }

    /// TOC filename for this manifest's selection
    pub fn file_name(&self) -> &'static str {
        toc_file_name(self.kind, self.distribution)
    }

    /// Entries that have not been marked deleted
    pub fn live(&self) -> impl Iterator<Item = &AssetRecord> {
        self.assets.iter().filter(|a| !a.is_deleted)
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    pub fn find(&self, key: &AssetKey) -> Option<&AssetRecord> {
        self.assets.iter().find(|a| a.matches(key))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&AssetRecord> {
        self.live().find(|a| a.name == name)
    }

    /// Live entries in display order
    pub fn sorted(&self, sort: SortKey) -> Vec<&AssetRecord> {
        let mut view: Vec<&AssetRecord> = self.live().collect();
        view.sort_by(|a, b| sort.compare(a, b));
        view
    }
}

/// TOC filename for a (kind, distribution) pair
pub fn toc_file_name(kind: AssetKind, distribution: Distribution) -> &'static str {
    match (kind, distribution) {
        (_, Distribution::Restricted) => "assets_model_patreon.json",
        (AssetKind::Material, Distribution::Standard) => "assets_material.json",
        (AssetKind::Model, Distribution::Standard) => "assets_model.json",
    }
}

/// Inverse of [`toc_file_name`]
pub fn selection_for_file_name(name: &str) -> Option<(AssetKind, Distribution)> {
    match name {
        "assets_model.json" => Some((AssetKind::Model, Distribution::Standard)),
        "assets_material.json" => Some((AssetKind::Material, Distribution::Standard)),
        "assets_model_patreon.json" => Some((AssetKind::Model, Distribution::Restricted)),
        _ => None,
    }
}

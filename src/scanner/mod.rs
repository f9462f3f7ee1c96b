// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Local scanner: turns a directory of asset sources into candidate records

pub mod blend;
pub mod bounds;

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::model::{AssetKind, AssetRecord};
use crate::{AssetLibError, Result};

pub use blend::BlendSceneLoader;
pub use bounds::{scene_bounds, SceneObject};

/// Block size used when hashing asset files
const HASH_BLOCK_SIZE: usize = 65536;

/// Host-side loader for asset content.
///
/// `verify` must fail for files that are not valid asset content; the
/// scanner turns that failure into a warning and moves on.
pub trait SceneLoader: Send + Sync {
    /// Name of this loader
    fn name(&self) -> &'static str;

    /// Check that a file holds readable asset content
    fn verify(&self, path: &Path) -> Result<()>;

    /// Objects of the file, with local bounds and world transforms.
    /// Called for models only, once `verify` has passed.
    fn objects(&self, path: &Path) -> Result<Vec<SceneObject>>;
}

/// Something the scanner produced for one file
#[derive(Debug)]
pub enum ScanEvent {
    Candidate(AssetRecord),
    Warning(ScanWarning),
}

/// A file that was skipped
#[derive(Debug)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub error: AssetLibError,
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        write!(f, "{}: {}", name, self.error)
    }
}

/// Directory scanner for one asset kind
pub struct Scanner {
    kind: AssetKind,
    loader: Box<dyn SceneLoader>,
    patterns: Vec<glob::Pattern>,
    preview_extensions: Vec<String>,
}

impl Scanner {
    /// Create a scanner matching `*.blend` sources with `.jpg` previews
    pub fn new(kind: AssetKind, loader: Box<dyn SceneLoader>) -> Self {
        let patterns = glob::Pattern::new("*.blend").into_iter().collect();
        Self {
            kind,
            loader,
            patterns,
            preview_extensions: vec!["jpg".to_string()],
        }
    }

    pub fn from_config(kind: AssetKind, loader: Box<dyn SceneLoader>, config: &ScannerConfig) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| AssetLibError::Config(format!("Invalid scan pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind,
            loader,
            patterns,
            preview_extensions: config.preview_extensions.clone(),
        })
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Check if a file is an asset source
    pub fn is_source(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => return false,
        };
        if filename.starts_with('.') {
            return false;
        }
        self.patterns.iter().any(|p| p.matches(filename))
    }

    /// List asset sources in `dir` and return a lazy scan over them.
    ///
    /// Files are visited in name order. Nothing is read until the
    /// iterator is advanced.
    pub fn scan(&self, dir: &Path) -> Result<Scan<'_>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.is_source(p))
            .collect();
        paths.sort();

        info!("Found {} {} source(s) in {:?}", paths.len(), self.kind, dir);

        Ok(Scan {
            scanner: self,
            paths: paths.into_iter(),
        })
    }

    /// Build the candidate record for a single source file
    pub fn inspect(&self, path: &Path) -> Result<AssetRecord> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AssetLibError::parse(path, "file name is not valid UTF-8"))?;

        self.loader.verify(path)?;

        let mut record = AssetRecord::from_stem(stem, hash_file(path)?);
        record.source_ref = Some(path.to_path_buf());

        if self.kind.has_bbox() {
            let objects = self.loader.objects(path)?;
            let (min, max) = scene_bounds(&objects);
            debug!("{}: {} object(s), bbox {:?}..{:?}", record.name, objects.len(), min, max);
            record.bbox_min = Some(min);
            record.bbox_max = Some(max);
        }

        record.thumbnail_ref = self.find_preview(path);
        if record.thumbnail_ref.is_none() {
            debug!("No preview image for {:?}", path);
        }

        Ok(record)
    }

    /// Sibling image sharing the source's stem
    fn find_preview(&self, path: &Path) -> Option<PathBuf> {
        self.preview_extensions
            .iter()
            .map(|ext| path.with_extension(ext))
            .find(|p| p.is_file())
    }
}

/// Lazy sequence of scan events, one per source file
pub struct Scan<'a> {
    scanner: &'a Scanner,
    paths: std::vec::IntoIter<PathBuf>,
}

impl Scan<'_> {
    /// Drain the scan into candidates and warnings
    pub fn partition(self) -> (Vec<AssetRecord>, Vec<ScanWarning>) {
        let mut candidates = Vec::new();
        let mut warnings = Vec::new();
        for event in self {
            match event {
                ScanEvent::Candidate(c) => candidates.push(c),
                ScanEvent::Warning(w) => warnings.push(w),
            }
        }
        (candidates, warnings)
    }
}

impl Iterator for Scan<'_> {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(match self.scanner.inspect(&path) {
            Ok(record) => ScanEvent::Candidate(record),
            Err(error) => {
                warn!("Skipping {:?}: {}", path, error);
                ScanEvent::Warning(ScanWarning { path, error })
            }
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

/// SHA-256 of a file, read in fixed-size blocks
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut block = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let n = file.read(&mut block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::scanner::bounds::box_corners;

    /// Loader for plain-text fixtures: `ASSET` on the first line, then one
    /// `min_x min_y min_z max_x max_y max_z` box per line.
    pub struct FixtureLoader;

    impl FixtureLoader {
        fn read(path: &Path) -> Result<String> {
            let text = std::fs::read_to_string(path)
                .map_err(|e| AssetLibError::parse(path, e.to_string()))?;
            if !text.starts_with("ASSET") {
                return Err(AssetLibError::parse(path, "missing ASSET header"));
            }
            Ok(text)
        }
    }

    impl SceneLoader for FixtureLoader {
        fn name(&self) -> &'static str {
            "fixture"
        }

        fn verify(&self, path: &Path) -> Result<()> {
            Self::read(path).map(|_| ())
        }

        fn objects(&self, path: &Path) -> Result<Vec<SceneObject>> {
            let text = Self::read(path)?;
            text.lines()
                .skip(1)
                .filter(|l| !l.trim().is_empty())
                .map(|line| {
                    let v: Vec<f64> = line
                        .split_whitespace()
                        .map(|n| n.parse::<f64>())
                        .collect::<std::result::Result<_, _>>()
                        .map_err(|e| AssetLibError::parse(path, e.to_string()))?;
                    if v.len() != 6 {
                        return Err(AssetLibError::parse(path, "expected six numbers per box"));
                    }
                    Ok(SceneObject::local(box_corners([v[0], v[1], v[2]], [v[3], v[4], v[5]])))
                })
                .collect()
        }
    }

    pub fn write_asset(dir: &Path, file: &str, body: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, body).unwrap();
        path
    }
}

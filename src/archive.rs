// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Zip packaging of asset sources

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::{AssetLibError, Result};

/// Write a deflate-compressed zip at `dest` holding `source` under its file name
pub fn pack(source: &Path, dest: &Path) -> Result<()> {
    let entry_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AssetLibError::parse(source, "file name is not valid UTF-8"))?;

    let mut input = BufReader::new(File::open(source)?);
    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)?;
    let bytes = std::io::copy(&mut input, &mut zip)?;
    zip.finish()?.flush()?;

    debug!("Packed {:?} ({} bytes) into {:?}", source, bytes, dest);
    Ok(())
}

/// Names of the entries in a zip file
pub fn list(path: &Path) -> Result<Vec<String>> {
    let archive = zip::ZipArchive::new(File::open(path)?)?;
    Ok(archive.file_names().map(String::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_pack_single_deflated_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Old_Chair.blend");
        let data = b"BLENDER-v300".repeat(200);
        std::fs::write(&source, &data).unwrap();

        let dest = dir.path().join("Old_Chair.zip");
        pack(&source, &dest).unwrap();

        assert_eq!(list(&dest).unwrap(), vec!["Old_Chair.blend".to_string()]);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut out = Vec::new();
        entry.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_pack_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = pack(&dir.path().join("nope.blend"), &dir.path().join("nope.zip")).unwrap_err();
        assert!(matches!(err, AssetLibError::FileSystem(_)));
    }
}

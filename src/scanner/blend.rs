// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Loader for `.blend` files
//!
//! The header is checked in-process. Object bounds need the host
//! application, so they come from an exporter command that opens the file
//! in a throwaway session and prints the bounds as JSON on a marked line.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::{SceneLoader, SceneObject};
use crate::{AssetLibError, Result};

/// Prefix of the exporter's output line carrying the JSON payload
pub const BOUNDS_MARKER: &str = "ASSETLIB_BOUNDS:";

/// Script run inside a headless Blender to dump evaluated object bounds
pub const EXPORT_SCRIPT: &str = r#"import bpy, json
deps = bpy.context.evaluated_depsgraph_get()
objs = []
for obj in bpy.data.objects:
    ev = obj.evaluated_get(deps)
    objs.append({
        "bound_box": [list(c) for c in ev.bound_box],
        "matrix_world": [list(r) for r in ev.matrix_world],
    })
print("ASSETLIB_BOUNDS:" + json.dumps(objs))
"#;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Loader for Blender files
pub struct BlendSceneLoader {
    exporter: Vec<String>,
}

impl BlendSceneLoader {
    /// `exporter` is the command line for the bounds exporter; `{file}` is
    /// replaced with the asset path and `{script}` with [`EXPORT_SCRIPT`].
    pub fn new(exporter: Vec<String>) -> Self {
        Self { exporter }
    }

    /// Loader that only validates headers
    pub fn header_only() -> Self {
        Self { exporter: Vec::new() }
    }

    fn read_header(path: &Path) -> Result<[u8; 12]> {
        let mut header = [0u8; 12];
        let mut file = File::open(path)?;
        file.read_exact(&mut header)
            .map_err(|_| AssetLibError::parse(path, "file too short for a .blend header"))?;
        Ok(header)
    }

    fn export(&self, path: &Path) -> Result<String> {
        let (program, args) = self
            .exporter
            .split_first()
            .ok_or_else(|| AssetLibError::Config("no scene exporter command configured".to_string()))?;

        let file = path.to_string_lossy();
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace("{file}", &file).replace("{script}", EXPORT_SCRIPT))
            .collect();

        debug!("Exporting bounds of {:?} with {}", path, program);
        let output = Command::new(program).args(&args).output()?;

        if !output.status.success() {
            return Err(AssetLibError::parse(
                path,
                format!(
                    "exporter exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for BlendSceneLoader {
    fn default() -> Self {
        Self::header_only()
    }
}

impl SceneLoader for BlendSceneLoader {
    fn name(&self) -> &'static str {
        "blend"
    }

    fn verify(&self, path: &Path) -> Result<()> {
        let header = Self::read_header(path)?;
        if is_blend_header(&header) || header.starts_with(&GZIP_MAGIC) || header.starts_with(&ZSTD_MAGIC) {
            Ok(())
        } else {
            Err(AssetLibError::parse(path, "not a Blender file"))
        }
    }

    fn objects(&self, path: &Path) -> Result<Vec<SceneObject>> {
        let stdout = self.export(path)?;
        parse_exporter_output(&stdout).map_err(|reason| AssetLibError::parse(path, reason))
    }
}

/// `BLENDER`, pointer size (`_` or `-`), endianness (`v` or `V`), 3-digit version
fn is_blend_header(header: &[u8; 12]) -> bool {
    header.starts_with(b"BLENDER")
        && matches!(header[7], b'_' | b'-')
        && matches!(header[8], b'v' | b'V')
        && header[9..12].iter().all(u8::is_ascii_digit)
}

/// Find the marked line in exporter output and decode it
pub fn parse_exporter_output(stdout: &str) -> std::result::Result<Vec<SceneObject>, String> {
    let payload = stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix(BOUNDS_MARKER))
        .ok_or_else(|| "exporter printed no bounds".to_string())?;
    serde_json::from_str(payload).map_err(|e| format!("bad exporter output: {}", e))
}

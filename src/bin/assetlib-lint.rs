// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! assetlib TOC linter
//!
//! Checks TOC files for duplicate names and hashes, malformed urls and
//! hashes, and bounding boxes that do not match the asset kind.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use assetlib::model::{selection_for_file_name, AssetKind, Distribution};
use assetlib::toc::{self, TocIssue};

#[derive(Parser, Debug)]
#[command(name = "assetlib-lint")]
#[command(version)]
#[command(about = "Check asset library TOC files")]
struct Args {
    /// TOC files, or repository directories to check every known TOC in
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Print issues as JSON lines
    #[arg(long)]
    json: bool,
}

/// Known TOC files under a repository directory
fn toc_files(dir: &Path) -> Vec<PathBuf> {
    [
        (AssetKind::Model, Distribution::Standard),
        (AssetKind::Material, Distribution::Standard),
        (AssetKind::Model, Distribution::Restricted),
    ]
    .into_iter()
    .map(|(kind, dist)| toc::toc_path(dir, kind, dist))
    .filter(|p| p.is_file())
    .collect()
}

fn lint(path: &Path) -> Result<Vec<TocIssue>, Box<dyn std::error::Error>> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let (kind, distribution) = selection_for_file_name(file_name)
        .ok_or_else(|| format!("{:?} is not a known TOC file name", path))?;
    let content = std::fs::read_to_string(path)?;
    let manifest = toc::from_json(&content, kind, distribution)?;
    Ok(toc::validate(&manifest))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut files = Vec::new();
    for path in &args.paths {
        if path.is_dir() {
            files.extend(toc_files(path));
        } else {
            files.push(path.clone());
        }
    }

    if files.is_empty() {
        eprintln!("No TOC files found.");
        return ExitCode::from(2);
    }

    let mut failed = false;
    for file in &files {
        match lint(file) {
            Ok(issues) if issues.is_empty() => {
                if !args.json {
                    println!("{}: ok", file.display());
                }
            }
            Ok(issues) => {
                failed = true;
                for issue in &issues {
                    if args.json {
                        let line = serde_json::json!({
                            "file": file.to_string_lossy(),
                            "issue": issue,
                        });
                        println!("{}", line);
                    } else {
                        println!("{}: {}", file.display(), issue);
                    }
                }
            }
            Err(e) => {
                failed = true;
                eprintln!("{}: {}", file.display(), e);
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! assetlib: asset library manifest sync
//!
//! Clones the asset repository, scans local asset sources, reconciles
//! them with the library TOC and publishes the result.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{info, warn};

use assetlib::bootstrap::{self, CloneTask, Progress};
use assetlib::config::AppConfig;
use assetlib::model::{AssetKind, AssetRecord, Distribution, SortKey};
use assetlib::publish::{publish, PublishContext};
use assetlib::reconcile::Outcome;
use assetlib::scanner::{BlendSceneLoader, Scanner};
use assetlib::session::Session;
use assetlib::vcs::Git;
use assetlib::{AssetLibError, Result};

/// assetlib CLI - asset library manifest sync
#[derive(Parser, Debug)]
#[command(name = "assetlib")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Scan, reconcile and publish asset library TOCs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Which TOC to work on; unset values come from the config
#[derive(Args, Debug, Default)]
struct Selection {
    /// Asset kind: model or material
    #[arg(short, long)]
    kind: Option<AssetKind>,

    /// Distribution: standard or restricted
    #[arg(short, long)]
    distribution: Option<Distribution>,

    /// Sort order: name or category
    #[arg(short, long)]
    sort: Option<SortKey>,

    /// Repository working copy (overrides config)
    #[arg(long)]
    repo: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone the asset repository, or update an existing clone
    Clone {
        /// Repository URL (overrides config)
        #[arg(long)]
        url: Option<String>,

        /// Target directory (overrides config)
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// List the assets of a TOC
    List {
        #[command(flatten)]
        selection: Selection,
    },

    /// Scan a directory and show which assets would be added
    Check {
        /// Directory of asset sources (overrides config)
        dir: Option<PathBuf>,

        #[command(flatten)]
        selection: Selection,
    },

    /// Add and remove assets, then publish the TOC and files
    Publish {
        /// Directory of asset sources (overrides config)
        dir: Option<PathBuf>,

        /// Add a scanned asset by name (repeatable)
        #[arg(long)]
        add: Vec<String>,

        /// Add every scanned asset
        #[arg(long, conflicts_with = "add")]
        add_all: bool,

        /// Remove an asset by name (repeatable)
        #[arg(long)]
        remove: Vec<String>,

        /// Show the plan without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Remote store directory (overrides the configured remote, FTPS included)
        #[arg(long)]
        remote: Option<PathBuf>,

        #[command(flatten)]
        selection: Selection,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Clone { url, dest }) => run_clone(config, url, dest).await,
        Some(Commands::List { selection }) => run_list(apply_selection(config, &selection)?, &cli.format),
        Some(Commands::Check { dir, selection }) => {
            run_check(apply_selection(config, &selection)?, dir, &cli.format)
        }
        Some(Commands::Publish { dir, add, add_all, remove, dry_run, remote, selection }) => {
            let mut config = apply_selection(config, &selection)?;
            if let Some(remote) = remote {
                config.remote.root = Some(remote.to_string_lossy().to_string());
                config.remote.host = None;
            }
            let edits = Edits { add, add_all, remove };
            run_publish(config, dir, edits, dry_run, &cli.format).await
        }
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        None => run_list(config, &cli.format),
    }
}

/// Fold command line selection into the config
fn apply_selection(mut config: AppConfig, selection: &Selection) -> Result<AppConfig> {
    if let Some(kind) = selection.kind {
        config.kind = kind;
        if kind == AssetKind::Material && selection.distribution.is_none() {
            config.distribution = Distribution::Standard;
        }
    }
    if let Some(distribution) = selection.distribution {
        config.distribution = distribution;
    }
    if let Some(sort) = selection.sort {
        config.sort = sort;
    }
    if let Some(repo) = &selection.repo {
        config.repo_path = repo.to_string_lossy().to_string();
    }
    config.validate()?;
    Ok(config)
}

fn source_dir(config: &AppConfig, dir: Option<PathBuf>) -> Result<PathBuf> {
    dir.or_else(|| config.source_dir.as_ref().map(PathBuf::from))
        .ok_or_else(|| AssetLibError::Config("No source directory given and none configured".to_string()))
}

fn build_scanner(config: &AppConfig) -> Result<Scanner> {
    let loader = BlendSceneLoader::new(config.scanner.exporter_command.clone());
    Scanner::from_config(config.kind, Box::new(loader), &config.scanner)
}

fn open_session(config: &AppConfig) -> Result<Session> {
    let mut session = Session::from_config(config);
    session.load_toc(&config.repo_path())?;
    Ok(session)
}

/// Clone the repository, or refresh LFS objects of an existing clone
async fn run_clone(mut config: AppConfig, url: Option<String>, dest: Option<PathBuf>) -> Result<()> {
    let url = url.unwrap_or_else(|| config.upstream_url.clone());
    let dest = dest.unwrap_or_else(|| config.repo_path());
    config.repo_path = dest.to_string_lossy().to_string();
    let git = Git::from_config(&config.vcs);

    if Git::is_repository(&dest) {
        bootstrap::refresh(&git, &dest).await?;
    } else {
        let mut task = CloneTask::spawn(git, url, &dest);
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut cancelled = false;

        loop {
            tokio::select! {
                event = task.next() => match event {
                    Some(progress) => match progress.percent() {
                        Some(pct) => info!("[{:>3}%] {}", pct, progress),
                        None => warn!("{}", progress),
                    },
                    None => break,
                },
                _ = &mut ctrl_c, if !cancelled => {
                    info!("Received Ctrl+C, cancelling...");
                    cancelled = true;
                    task.cancel();
                }
            }
        }

        match task.last() {
            Some(Progress::Done) => {}
            Some(Progress::Failed(reason)) if !cancelled => {
                return Err(AssetLibError::VcsCommand {
                    command: "clone".to_string(),
                    status: "failed".to_string(),
                    stderr: reason.clone(),
                })
            }
            _ => return Err(AssetLibError::Cancelled),
        }
    }

    let session = open_session(&config)?;
    info!("{} {} asset(s) in {:?}", session.asset_count(), session.kind(), dest);
    Ok(())
}

fn print_assets(assets: &[&AssetRecord], format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(assets)?),
        "jsonl" => {
            for asset in assets {
                println!("{}", serde_json::to_string(asset)?);
            }
        }
        _ => {
            for asset in assets {
                println!("{:<32} {:<16} {}", asset.name, asset.category, asset.url);
            }
        }
    }
    Ok(())
}

fn run_list(config: AppConfig, format: &str) -> Result<()> {
    let session = open_session(&config)?;
    print_assets(&session.visible_assets(), format)?;
    if format == "text" {
        println!("\n{} asset(s) in {}", session.asset_count(), session.manifest().file_name());
    }
    Ok(())
}

fn run_check(config: AppConfig, dir: Option<PathBuf>, format: &str) -> Result<()> {
    let dir = source_dir(&config, dir)?;
    let scanner = build_scanner(&config)?;
    let mut session = open_session(&config)?;
    session.check_path(&scanner, &dir)?;

    let candidates: Vec<&AssetRecord> = session.candidates().iter().collect();
    if format == "text" {
        for candidate in &candidates {
            let marker = if session.manifest().find_by_name(&candidate.name).is_some() {
                "!"
            } else {
                "+"
            };
            let short = candidate.content_hash.get(..12).unwrap_or(&candidate.content_hash);
            println!("{} {:<32} {}", marker, candidate.name, short);
        }
    } else {
        print_assets(&candidates, format)?;
    }

    for message in session.messages() {
        eprintln!("{}", message);
    }
    Ok(())
}

/// Manifest edits requested on the command line
struct Edits {
    add: Vec<String>,
    add_all: bool,
    remove: Vec<String>,
}

async fn run_publish(config: AppConfig, dir: Option<PathBuf>, edits: Edits, dry_run: bool, format: &str) -> Result<()> {
    let mut session = open_session(&config)?;

    if edits.add_all || !edits.add.is_empty() {
        let dir = source_dir(&config, dir)?;
        let scanner = build_scanner(&config)?;
        session.check_path(&scanner, &dir)?;

        if edits.add_all {
            let added = session
                .add_all()
                .iter()
                .filter(|(_, outcome)| *outcome == Outcome::Added)
                .count();
            info!("Added {} asset(s)", added);
        } else {
            for name in &edits.add {
                let key = session
                    .candidates()
                    .iter()
                    .find(|c| &c.name == name)
                    .map(|c| c.key())
                    .ok_or_else(|| AssetLibError::NotFound(format!("scanned asset '{}'", name)))?;
                session.add(&key)?;
            }
        }
    }

    for name in &edits.remove {
        let key = session
            .manifest()
            .find_by_name(name)
            .map(|a| a.key())
            .ok_or_else(|| AssetLibError::NotFound(format!("asset '{}'", name)))?;
        session.remove(&key)?;
        info!("Removed {}", name);
    }

    for message in session.messages() {
        warn!("{}", message);
    }

    let mut ctx = PublishContext::from_config(&config)?;
    ctx.dry_run = dry_run;
    let report = publish(&ctx, session.manifest_mut()).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "jsonl" => println!("{}", serde_json::to_string(&report)?),
        _ => {
            if dry_run {
                println!("Dry run - nothing was changed");
            }
            for upload in &report.plan.uploads {
                println!("  upload {}", upload.remote());
            }
            for path in &report.plan.deletions {
                println!("  delete {}", path);
            }
            for name in &report.plan.missing_previews {
                println!("  no preview for {}", name);
            }
            println!(
                "{} asset(s) in {} at {}",
                report.assets,
                session.manifest().file_name(),
                report.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Repository: {}", config.repo_path);
            println!("  Selection: {} / {}", config.kind, config.distribution);
            println!("  Scan patterns: {:?}", config.scanner.patterns);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["assetlib"]).unwrap();
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_publish_command() {
        let cli = Cli::try_parse_from([
            "assetlib", "publish", "/tmp/src", "--add", "Chair", "--add", "Old Table",
            "--remove", "Lamp", "--dry-run", "--kind", "material",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Publish { dir, add, remove, dry_run, selection, .. }) => {
                assert_eq!(dir, Some(PathBuf::from("/tmp/src")));
                assert_eq!(add, vec!["Chair".to_string(), "Old Table".to_string()]);
                assert_eq!(remove, vec!["Lamp".to_string()]);
                assert!(dry_run);
                assert_eq!(selection.kind, Some(AssetKind::Material));
            }
            _ => panic!("Expected Publish command"),
        }
    }

    #[test]
    fn test_cli_add_conflicts_with_add_all() {
        assert!(Cli::try_parse_from(["assetlib", "publish", "--add", "Chair", "--add-all"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["assetlib", "list", "--kind", "texture"]).is_err());
    }

    #[test]
    fn test_cli_accepts_patreon_alias() {
        let cli = Cli::try_parse_from(["assetlib", "list", "-d", "patreon"]).unwrap();
        match cli.command {
            Some(Commands::List { selection }) => {
                assert_eq!(selection.distribution, Some(Distribution::Restricted))
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_apply_selection_couples_kind_and_distribution() {
        let mut config = AppConfig::default();
        config.distribution = Distribution::Restricted;
        let selection = Selection {
            kind: Some(AssetKind::Material),
            ..Default::default()
        };
        let config = apply_selection(config, &selection).unwrap();
        assert_eq!(config.distribution, Distribution::Standard);

        let bad = Selection {
            kind: Some(AssetKind::Material),
            distribution: Some(Distribution::Restricted),
            ..Default::default()
        };
        assert!(apply_selection(config, &bad).is_err());
    }
}

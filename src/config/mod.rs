// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for assetlib

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{AssetKind, Distribution, SortKey};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Local clone of the asset repository
    #[serde(default = "default_repo_path")]
    pub repo_path: String,

    /// Upstream repository cloned on bootstrap
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Downloaded asset library, used to find previews of published assets
    #[serde(default)]
    pub library_dir: Option<String>,

    /// Directory holding new asset sources
    #[serde(default)]
    pub source_dir: Option<String>,

    #[serde(default)]
    pub kind: AssetKind,

    #[serde(default)]
    pub distribution: Distribution,

    #[serde(default)]
    pub sort: SortKey,

    /// Scanner settings
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// git / git-lfs settings
    #[serde(default)]
    pub vcs: VcsConfig,

    /// Remote file store settings
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    /// Glob patterns (matched against file names) that identify asset sources
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    #[serde(default = "default_preview_extensions")]
    pub preview_extensions: Vec<String>,
    /// Command printing object bounds for a model file; `{file}` is replaced
    /// with the asset path and `{script}` with the export script. Model scans
    /// fail when empty.
    #[serde(default = "default_exporter_command")]
    pub exporter_command: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VcsConfig {
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_git_lfs")]
    pub git_lfs: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RemoteConfig {
    /// Root of a mounted remote store; publishing skips the remote when
    /// neither this nor `host` is set
    #[serde(default)]
    pub root: Option<String>,
    /// FTPS server; takes precedence over `root`
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    /// Environment variable the FTP password is read from
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Library directory on the FTP server
    #[serde(default = "default_ftp_dir")]
    pub ftp_dir: String,
}

// Default value functions
fn default_repo_path() -> String { "LoL".to_string() }
fn default_upstream_url() -> String { "https://github.com/LuxCoreRender/LoL".to_string() }
fn default_patterns() -> Vec<String> { vec!["*.blend".to_string()] }
fn default_git() -> String { "git".to_string() }
fn default_git_lfs() -> String { "git-lfs".to_string() }
fn default_commit_message() -> String { "Update Assets".to_string() }
fn default_ftp_port() -> u16 { 21 }
fn default_password_env() -> String { "ASSETLIB_FTP_PASSWORD".to_string() }
fn default_ftp_dir() -> String { "/".to_string() }

fn default_preview_extensions() -> Vec<String> {
    vec!["jpg".to_string()]
}

fn default_exporter_command() -> Vec<String> {
    vec!["blender", "--background", "{file}", "--python-expr", "{script}"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repo_path: default_repo_path(),
            upstream_url: default_upstream_url(),
            library_dir: None,
            source_dir: None,
            kind: AssetKind::default(),
            distribution: Distribution::default(),
            sort: SortKey::default(),
            scanner: ScannerConfig::default(),
            vcs: VcsConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            preview_extensions: default_preview_extensions(),
            exporter_command: default_exporter_command(),
        }
    }
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            git_lfs: default_git_lfs(),
            commit_message: default_commit_message(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            root: None,
            host: None,
            port: default_ftp_port(),
            username: None,
            password_env: default_password_env(),
            ftp_dir: default_ftp_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::AssetLibError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject selections the library cannot hold
    pub fn validate(&self) -> crate::Result<()> {
        if self.kind == AssetKind::Material && self.distribution == Distribution::Restricted {
            return Err(crate::AssetLibError::Config(
                "restricted distribution only exists for models".to_string(),
            ));
        }
        if self.remote.host.is_some() && self.remote.username.is_none() {
            return Err(crate::AssetLibError::Config(
                "remote.username is required with remote.host".to_string(),
            ));
        }
        if self.scanner.patterns.is_empty() {
            return Err(crate::AssetLibError::Config(
                "scanner.patterns must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn repo_path(&self) -> PathBuf {
        PathBuf::from(&self.repo_path)
    }

    pub fn library_dir(&self) -> Option<PathBuf> {
        self.library_dir.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.repo_path, "LoL");
        assert_eq!(config.scanner.patterns, vec!["*.blend"]);
        assert_eq!(config.vcs.commit_message, "Update Assets");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"repo_path": "/srv/lol", "kind": "material"}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.repo_path, "/srv/lol");
        assert_eq!(config.kind, AssetKind::Material);
        assert_eq!(config.distribution, Distribution::Standard);
        assert_eq!(config.vcs.git, "git");
    }

    #[test]
    fn test_restricted_material_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"kind": "material", "distribution": "restricted"}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_ftp_remote_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"remote": {"host": "ftp.example.org", "username": "lux"}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.remote.port, 21);
        assert_eq!(config.remote.password_env, "ASSETLIB_FTP_PASSWORD");
        assert_eq!(config.remote.ftp_dir, "/");
        assert!(config.remote.root.is_none());

        std::fs::write(&path, r#"{"remote": {"host": "ftp.example.org"}}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.source_dir = Some("new_assets".to_string());
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.source_dir.as_deref(), Some("new_assets"));
    }
}

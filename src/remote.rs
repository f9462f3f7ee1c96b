// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Remote asset storage
//!
//! Layout: `<kind>/<stem>.zip`, `<kind>/preview/<stem>.jpg` and the TOC
//! files at the root. Paths are always `/`-separated and relative.

use async_trait::async_trait;
use std::fmt;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpResult, NativeTlsConnector, NativeTlsFtpStream, Status};
use tracing::{debug, info};

use crate::archive;
use crate::config::RemoteConfig;
use crate::reconcile::{SyncPlan, Upload};
use crate::{AssetLibError, Result};

/// A place published assets are stored
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Store `data` at `path`, replacing any existing file
    async fn put(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Store the contents of a local file at `path`
    async fn put_file(&self, path: &str, local: &Path) -> Result<()> {
        let data = tokio::fs::read(local).await?;
        self.put(path, &data).await
    }

    /// Remove `path`; removing a missing file is not an error
    async fn delete(&self, path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Store backed by a local directory: the repository working copy, or a
/// mounted remote
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path under the root, refusing anything that escapes it
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(relative(path)?))
    }
}

/// `path` without its leading slashes; empty paths and `.`/`..`
/// components are rejected
fn relative(path: &str) -> Result<&str> {
    let rel = path.trim_start_matches('/');
    if rel.is_empty() || Path::new(rel).components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(AssetLibError::remote(path, "invalid store path"));
    }
    Ok(rel)
}

#[async_trait]
impl RemoteStore for DirStore {
    fn name(&self) -> &str {
        self.root.to_str().unwrap_or("directory store")
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AssetLibError::remote(path, e))?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| AssetLibError::remote(path, e))?;
        debug!("Stored {} ({} bytes)", path, data.len());
        Ok(())
    }

    async fn put_file(&self, path: &str, local: &Path) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AssetLibError::remote(path, e))?;
        }
        tokio::fs::copy(local, &target)
            .await
            .map_err(|e| AssetLibError::remote(path, format!("copy from {:?}: {}", local, e)))?;
        debug!("Copied {:?} to {}", local, path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                debug!("Deleted {}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AssetLibError::remote(path, e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target)
            .await
            .map_err(|e| AssetLibError::remote(path, e))
    }
}

/// Store on an FTP server, over explicit TLS
#[derive(Clone)]
pub struct FtpsStore {
    host: String,
    port: u16,
    username: String,
    password: String,
    root: String,
    label: String,
}

impl fmt::Debug for FtpsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpsStore")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FtpsStore {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        root: impl Into<String>,
    ) -> Self {
        let host = host.into();
        let root = root.into();
        let label = format!("ftps://{}:{}{}", host, port, root);
        Self {
            host,
            port,
            username: username.into(),
            password: password.into(),
            root,
            label,
        }
    }

    fn connect(&self) -> FtpResult<NativeTlsFtpStream> {
        let connector = TlsConnector::new().map_err(|e| FtpError::SecureError(e.to_string()))?;
        let mut ftp = NativeTlsFtpStream::connect(format!("{}:{}", self.host, self.port))?
            .into_secure(NativeTlsConnector::from(connector), &self.host)?;
        ftp.login(self.username.as_str(), self.password.as_str())?;
        ftp.transfer_type(FileType::Binary)?;
        Ok(ftp)
    }

    /// Run `op` on a fresh logged-in connection, on the blocking pool.
    /// `op` gets the server directory and file name `path` maps to.
    async fn session<T, F>(&self, path: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut NativeTlsFtpStream, &str, &str) -> FtpResult<T> + Send + 'static,
    {
        let (dir, file) = locate(&self.root, path)?;
        let store = self.clone();
        let target = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut ftp = store.connect().map_err(|e| AssetLibError::remote(target.as_str(), e))?;
            let result = op(&mut ftp, &dir, &file);
            let _ = ftp.quit();
            result.map_err(|e| AssetLibError::remote(target.as_str(), e))
        })
        .await
        .map_err(|e| AssetLibError::remote(path, e))?
    }
}

/// Split a store path into the server directory under `root` and the
/// file name
fn locate(root: &str, path: &str) -> Result<(String, String)> {
    let rel = relative(path)?;
    let parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();
    let (file, dirs) = parts
        .split_last()
        .ok_or_else(|| AssetLibError::remote(path, "invalid store path"))?;

    let base = root.trim_end_matches('/');
    let dir = match (base.is_empty(), dirs.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => base.to_string(),
        (_, false) => format!("{}/{}", base, dirs.join("/")),
    };
    Ok((dir, file.to_string()))
}

/// Change into `dir`, creating missing levels when `create` is set
fn enter(ftp: &mut NativeTlsFtpStream, dir: &str, create: bool) -> FtpResult<()> {
    match ftp.cwd(dir) {
        Err(_) if create => {
            if dir.starts_with('/') {
                ftp.cwd("/")?;
            }
            for part in dir.split('/').filter(|p| !p.is_empty()) {
                if ftp.cwd(part).is_err() {
                    ftp.mkdir(part)?;
                    ftp.cwd(part)?;
                }
            }
            Ok(())
        }
        other => other,
    }
}

/// 550: no such file or directory
fn is_unavailable(err: &FtpError) -> bool {
    matches!(err, FtpError::UnexpectedResponse(r) if r.status == Status::FileUnavailable)
}

#[async_trait]
impl RemoteStore for FtpsStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let data = data.to_vec();
        let len = data.len();
        self.session(path, move |ftp, dir, file| {
            enter(ftp, dir, true)?;
            ftp.put_file(file, &mut Cursor::new(data)).map(|_| ())
        })
        .await?;
        debug!("Stored {} ({} bytes) on {}", path, len, self.label);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.session(path, |ftp, dir, file| {
            match enter(ftp, dir, false).and_then(|()| ftp.rm(file)) {
                Err(e) if is_unavailable(&e) => Ok(()),
                other => other,
            }
        })
        .await?;
        debug!("Deleted {} on {}", path, self.label);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.session(path, |ftp, dir, file| {
            match enter(ftp, dir, false).and_then(|()| ftp.size(file)) {
                Ok(_) => Ok(true),
                Err(e) if is_unavailable(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
    }
}

/// Build the remote store the configuration describes: FTPS when a host
/// is set, a directory store when only a root is, otherwise none
pub fn store_from_config(config: &RemoteConfig) -> Result<Option<Box<dyn RemoteStore>>> {
    if let Some(host) = &config.host {
        let username = config
            .username
            .as_deref()
            .ok_or_else(|| AssetLibError::Config("remote.username is required with remote.host".to_string()))?;
        let password = std::env::var(&config.password_env).map_err(|_| {
            AssetLibError::Config(format!("FTP password not set in ${}", config.password_env))
        })?;
        let store = FtpsStore::new(host, config.port, username, password, &config.ftp_dir);
        return Ok(Some(Box::new(store)));
    }
    Ok(config
        .root
        .as_ref()
        .map(|root| Box::new(DirStore::new(root)) as Box<dyn RemoteStore>))
}

/// Counts of what [`apply_plan`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ApplyStats {
    pub uploaded: usize,
    pub deleted: usize,
}

/// Execute a sync plan against a store.
///
/// Archives are zipped into `staging` from the upload's source file, or
/// from `<source_dir>/<stem>.blend` when the record carries none. Stops at
/// the first failure.
pub async fn apply_plan(
    store: &dyn RemoteStore,
    plan: &SyncPlan,
    source_dir: Option<&Path>,
    staging: &Path,
) -> Result<ApplyStats> {
    let mut stats = ApplyStats::default();

    for upload in &plan.uploads {
        match upload {
            Upload::Archive { asset, source, remote } => {
                let source = archive_source(source.as_deref(), source_dir, remote).ok_or_else(|| {
                    AssetLibError::NotFound(format!("source file for '{}'", asset))
                })?;
                let file_name = Path::new(remote)
                    .file_name()
                    .ok_or_else(|| AssetLibError::remote(remote.as_str(), "no file name"))?;
                let zip_path = staging.join(file_name);
                archive::pack(&source, &zip_path)?;
                store.put_file(remote, &zip_path).await?;
            }
            Upload::Preview { local, remote, .. } => {
                store.put_file(remote, local).await?;
            }
        }
        info!("Uploaded {} to {}", upload.remote(), store.name());
        stats.uploaded += 1;
    }

    for path in &plan.deletions {
        store.delete(path).await?;
        info!("Deleted {} from {}", path, store.name());
        stats.deleted += 1;
    }

    Ok(stats)
}

fn archive_source(explicit: Option<&Path>, source_dir: Option<&Path>, remote: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let stem = Path::new(remote).file_stem()?.to_str()?;
    Some(source_dir?.join(format!("{}.blend", stem)))
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for assetlib

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for assetlib operations
pub type Result<T> = std::result::Result<T, AssetLibError>;

/// assetlib error types
#[derive(Error, Debug)]
pub enum AssetLibError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Cannot read asset {path:?}: {reason}")]
    AssetParse { path: PathBuf, reason: String },

    #[error("Remote storage error at '{path}': {reason}")]
    RemoteIo { path: String, reason: String },

    #[error("`{command}` failed ({status}): {stderr}")]
    VcsCommand {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// Reasons a candidate is refused by the manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("{name}: Asset with same hash number is already in database. Asset not added.")]
    DuplicateHash { name: String, hash: String },

    #[error("{name}: Asset with same name is already in database. Asset not added.")]
    DuplicateName { name: String },
}

impl AssetLibError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::AssetParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn remote(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

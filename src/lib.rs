// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! assetlib: asset library manifest sync
//!
//! Scans a directory of asset sources, reconciles them against the
//! library's table of contents and publishes the result to a git
//! repository and a remote file store.

pub mod archive;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod model;
pub mod publish;
pub mod reconcile;
pub mod remote;
pub mod scanner;
pub mod session;
pub mod toc;
pub mod vcs;

pub use config::AppConfig;
pub use error::{AssetLibError, ConflictError, Result};

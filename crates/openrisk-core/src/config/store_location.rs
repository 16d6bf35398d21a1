//! Store location resolution.

use std::path::{Path, PathBuf};

use super::SourcesConfig;

/// Environment variable overriding the store location.
pub const STORE_ENV: &str = "OPENRISK_DB";

/// Compiled default store location.
pub const DEFAULT_SQLITE_PATH: &str = "data/sqlite/opendigger.db";

/// Resolve the SQLite store path.
///
/// Resolution order (highest priority first):
/// 1. `--db` flag
/// 2. `OPENRISK_DB` environment variable
/// 3. `sources.yaml` `defaults.sqlite_path`
/// 4. Compiled default
pub fn resolve_store_path(cli: Option<&Path>, sources: &SourcesConfig) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(env) = std::env::var(STORE_ENV) {
        if !env.trim().is_empty() {
            return PathBuf::from(env);
        }
    }
    sources
        .defaults
        .sqlite_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH))
}

//! # openrisk-storage
//!
//! SQLite persistence for the signal engine. Input tables (`repos`,
//! `metrics`, `time_series`, `derived_features`) are owned by upstream
//! collaborators and only read here; `signal_events`, `weak_labels` and
//! `weak_label_meta` are written by this workspace.

pub mod connection;
pub mod migrations;
pub mod queries;

pub use connection::DatabaseManager;

use openrisk_core::errors::StorageError;

pub(crate) fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

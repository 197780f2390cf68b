//! Timestamped database backups with retention.
//!
//! Backups are consistent copies written with `VACUUM INTO`, named
//! `backup_YYYY-MM-DD_HH-MM-SS.db` so that name order is age order.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

use crate::error::{Result, TrackerError};

/// Retention used when the configuration does not override it.
pub const DEFAULT_KEEP: usize = 30;

const PREFIX: &str = "backup_";
const SUFFIX: &str = ".db";

/// Back up `db_path` into `backup_dir`, keeping the newest `keep` backups.
///
/// Returns `None` when there is no database yet.
pub fn backup_database(db_path: &Path, backup_dir: &Path, keep: usize) -> Result<Option<PathBuf>> {
    if !db_path.exists() {
        tracing::debug!(path = %db_path.display(), "no database to back up");
        return Ok(None);
    }

    std::fs::create_dir_all(backup_dir).map_err(|source| TrackerError::FileWrite {
        path: backup_dir.to_path_buf(),
        source,
    })?;

    let target = next_backup_path(backup_dir);
    let conn = Connection::open(db_path).map_err(TrackerError::store(format!(
        "failed to open db at {}",
        db_path.display()
    )))?;
    conn.execute("VACUUM INTO ?1", params![target.to_string_lossy()])
        .map_err(TrackerError::store(format!(
            "failed to write backup {}",
            target.display()
        )))?;

    let removed = prune_backups(backup_dir, keep.max(1))?;
    tracing::info!(path = %target.display(), removed, "database backup created");
    Ok(Some(target))
}

fn next_backup_path(backup_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let mut candidate = backup_dir.join(format!("{PREFIX}{stamp}{SUFFIX}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = backup_dir.join(format!("{PREFIX}{stamp}_{n}{SUFFIX}"));
        n += 1;
    }
    candidate
}

/// Backup files in `backup_dir`, oldest first.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(backup_dir).map_err(|source| TrackerError::FileRead {
        path: backup_dir.to_path_buf(),
        source,
    })?;
    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(PREFIX) && name.ends_with(SUFFIX))
        })
        .collect();
    backups.sort();
    Ok(backups)
}

fn prune_backups(backup_dir: &Path, keep: usize) -> Result<usize> {
    let backups = list_backups(backup_dir)?;
    let excess = backups.len().saturating_sub(keep);
    for old in &backups[..excess] {
        std::fs::remove_file(old).map_err(|source| TrackerError::FileWrite {
            path: old.clone(),
            source,
        })?;
        tracing::debug!(path = %old.display(), "deleted old backup");
    }
    Ok(excess)
}

//! Per-invocation context: configuration, store and name resolution.
//!
//! Every mutating command follows the same cycle: load the current snapshot,
//! apply one transition, save it back with the revision guard.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use gatetrack_core::gateway::parse_date_strict;
use gatetrack_core::{
    EntityId, MasterChecklist, Module, Portfolio, Project, SnapshotStore, SqliteStore, SubModule,
    TrackerConfig, TrackerError, backup_database,
};

pub struct App {
    pub config: TrackerConfig,
    db_path: PathBuf,
    store: SqliteStore,
}

impl App {
    /// Load configuration, run the startup backup and open the store.
    pub fn open(config_path: Option<&Path>, db_override: Option<&Path>) -> anyhow::Result<Self> {
        let config = TrackerConfig::load(config_path).context("failed to load configuration")?;
        let db_path = db_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.resolved_db_path());

        if config.backup.enabled && config.backup.on_startup {
            let dir = backup_dir(&config, db_override);
            if let Err(err) = backup_database(&db_path, &dir, config.backup.keep) {
                tracing::warn!(
                    error = %err,
                    category = err.category().as_str(),
                    "startup backup failed"
                );
            }
        }

        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open store at {}", db_path.display()))?;
        Ok(Self {
            config,
            db_path,
            store,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn backup_dir(&self) -> PathBuf {
        backup_dir(&self.config, Some(&self.db_path))
    }

    pub fn snapshot(&self) -> anyhow::Result<Portfolio> {
        Ok(self.store.load()?)
    }

    /// Guarded save of an edited snapshot.
    pub fn commit(&mut self, next: &Portfolio) -> anyhow::Result<u64> {
        Ok(self.store.save(next)?)
    }

    /// Unguarded save; the caller accepts last-writer-wins.
    pub fn commit_overwrite(&mut self, next: &Portfolio) -> anyhow::Result<u64> {
        Ok(self.store.save_overwrite(next)?)
    }

    pub fn checklist(&self) -> anyhow::Result<MasterChecklist> {
        let path = self.config.resolved_checklist_path();
        Ok(MasterChecklist::load(path.as_deref())?)
    }
}

/// Backups live next to the database actually in use unless configured.
fn backup_dir(config: &TrackerConfig, db_override: Option<&Path>) -> PathBuf {
    match (&config.backup.dir, db_override) {
        (None, Some(db)) => db
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups")),
        _ => config.resolved_backup_dir(),
    }
}

/// clap value parser for `YYYY-MM-DD` arguments.
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate, TrackerError> {
    parse_date_strict(raw)?.ok_or_else(|| TrackerError::InvalidDate(raw.to_string()))
}

pub fn find_module<'a>(project: &'a Project, name: &str) -> Result<&'a Module, TrackerError> {
    project
        .module_by_name(name)
        .ok_or_else(|| TrackerError::ModuleNotFound(format!("{name} (in {})", project.name)))
}

pub fn find_sub_module<'a>(module: &'a Module, name: &str) -> Result<&'a SubModule, TrackerError> {
    module
        .sub_module_by_name(name)
        .ok_or_else(|| TrackerError::SubModuleNotFound(format!("{name} (in {})", module.name)))
}

/// Resolved `(project, module, sub-module)` ids for a module-level command.
pub struct ModulePath {
    pub project: EntityId,
    pub module: EntityId,
    pub sub_module: Option<EntityId>,
}

impl ModulePath {
    pub fn resolve(
        portfolio: &Portfolio,
        project: &str,
        module: &str,
        sub_module: Option<&str>,
    ) -> Result<Self, TrackerError> {
        let project = portfolio.find_project(project)?;
        let module = find_module(project, module)?;
        let sub_module = sub_module
            .map(|name| find_sub_module(module, name).map(|s| s.id))
            .transpose()?;
        Ok(Self {
            project: project.id,
            module: module.id,
            sub_module,
        })
    }
}

/// Pretty JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

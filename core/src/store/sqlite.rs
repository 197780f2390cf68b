//! SQLite snapshot store.
//!
//! Every save runs in one IMMEDIATE transaction: check the stored revision,
//! delete all rows, insert the snapshot, bump the revision, commit. Any
//! error drops the transaction, which rolls it back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use super::SnapshotStore;
use crate::error::{Result, TrackerError};
use crate::gateway::{GatewayId, GatewaySet, format_date, parse_date};
use crate::model::{
    Deliverable, DeliverableStatus, EntityId, Module, Project, ProjectType, SubModule,
};
use crate::portfolio::Portfolio;

/// Embedded schema
const SCHEMA_SQL: &str = include_str!("schema.sql");

const KIND_PROJECT: &str = "project";
const KIND_MODULE: &str = "module";
const KIND_SUB_MODULE: &str = "sub_module";

pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| TrackerError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(TrackerError::store(format!(
            "failed to open db at {}",
            path.display()
        )))?;
        Self::apply_schema(&conn)?;

        tracing::debug!(path = %path.display(), "snapshot store opened");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(TrackerError::store("failed to open in-memory db"))?;
        Self::apply_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn apply_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(TrackerError::store("failed to apply schema"))
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Revision currently stored.
    pub fn revision(&self) -> Result<u64> {
        read_revision(&self.conn)
    }

    /// Replace the stored snapshot without the revision check (last writer wins).
    pub fn save_overwrite(&mut self, portfolio: &Portfolio) -> Result<u64> {
        self.write(portfolio, false)
    }

    fn write(&mut self, portfolio: &Portfolio, guarded: bool) -> Result<u64> {
        let snapshot = Portfolio::new(portfolio.revision(), portfolio.projects().to_vec());
        snapshot.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(TrackerError::store("failed to begin transaction"))?;

        let found = read_revision(&tx)?;
        if guarded && found != snapshot.revision() {
            return Err(TrackerError::StaleSnapshot {
                expected: snapshot.revision(),
                found,
            });
        }

        clear_snapshot(&tx)?;
        for (ordinal, project) in snapshot.projects().iter().enumerate() {
            insert_project(&tx, ordinal, project)?;
        }

        let next = found + 1;
        tx.execute(
            "UPDATE store_meta SET value = ?1 WHERE key = 'revision'",
            params![revision_to_sql(next)?],
        )
        .map_err(TrackerError::store("failed to bump revision"))?;
        tx.commit()
            .map_err(TrackerError::store("failed to commit snapshot"))?;

        tracing::info!(
            revision = next,
            projects = snapshot.projects().len(),
            guarded,
            "saved snapshot"
        );
        Ok(next)
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self) -> Result<Portfolio> {
        let revision = read_revision(&self.conn)?;
        let mut gateways = load_gateways(&self.conn)?;
        let mut deliverables = load_deliverables(&self.conn)?;
        let mut modules = load_modules(&self.conn, &mut gateways)?;

        let projects = query_rows(
            &self.conn,
            "SELECT id, name, project_type FROM projects ORDER BY ordinal",
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?
        .into_iter()
        .map(|(id, name, project_type)| -> Result<Project> {
            let id = parse_id(&id)?;
            let project_type = project_type
                .parse::<ProjectType>()
                .map_err(|err| TrackerError::CorruptStore(err.to_string()))?;
            Ok(Project {
                id,
                name,
                project_type,
                gateways: gateways.remove(&id).unwrap_or_default(),
                modules: modules.remove(&id).unwrap_or_default(),
                deliverables: deliverables.remove(&id).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let portfolio = Portfolio::new(revision, projects);
        portfolio.validate()?;
        tracing::debug!(revision, projects = portfolio.projects().len(), "loaded snapshot");
        Ok(portfolio)
    }

    fn save(&mut self, portfolio: &Portfolio) -> Result<u64> {
        self.write(portfolio, true)
    }
}

fn read_revision(conn: &Connection) -> Result<u64> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'revision'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(TrackerError::store("failed to read revision"))?;
    u64::try_from(value.unwrap_or(0))
        .map_err(|_| TrackerError::CorruptStore(format!("negative revision {value:?}")))
}

fn revision_to_sql(revision: u64) -> Result<i64> {
    i64::try_from(revision)
        .map_err(|_| TrackerError::CorruptStore(format!("revision {revision} out of range")))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| TrackerError::CorruptStore(format!("invalid id {raw:?}")))
}

fn query_rows<T, F>(conn: &Connection, sql: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn
        .prepare(sql)
        .map_err(TrackerError::store("failed to prepare query"))?;
    let rows = stmt
        .query_map([], map)
        .map_err(TrackerError::store("failed to run query"))?
        .collect::<rusqlite::Result<Vec<T>>>()
        .map_err(TrackerError::store("failed to read row"))?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// Writing
// ─────────────────────────────────────────────────────────────────────────────

fn clear_snapshot(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        "DELETE FROM deliverables; DELETE FROM gateways; DELETE FROM modules; DELETE FROM projects;",
    )
    .map_err(TrackerError::store("failed to clear snapshot"))
}

fn insert_gateways(
    tx: &Transaction<'_>,
    kind: &str,
    entity_id: EntityId,
    gateways: &GatewaySet,
) -> Result<()> {
    for (gateway, record) in gateways.iter() {
        tx.execute(
            "INSERT INTO gateways (entity_kind, entity_id, gateway, plan, entered_actual, actual, change_note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                kind,
                entity_id.to_string(),
                gateway.as_str(),
                format_date(record.plan),
                format_date(record.entered_actual),
                format_date(record.actual),
                record.change_note,
            ],
        )
        .map_err(TrackerError::store("failed to insert gateway"))?;
    }
    Ok(())
}

fn insert_module(
    tx: &Transaction<'_>,
    project_id: EntityId,
    parent_id: Option<EntityId>,
    ordinal: usize,
    id: EntityId,
    name: &str,
) -> Result<()> {
    tx.execute(
        "INSERT INTO modules (id, project_id, parent_module_id, ordinal, name) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id.to_string(),
            project_id.to_string(),
            parent_id.map(|p| p.to_string()),
            ordinal as i64,
            name,
        ],
    )
    .map_err(TrackerError::store("failed to insert module"))?;
    Ok(())
}

fn insert_project(tx: &Transaction<'_>, ordinal: usize, project: &Project) -> Result<()> {
    tx.execute(
        "INSERT INTO projects (id, ordinal, name, project_type) VALUES (?1, ?2, ?3, ?4)",
        params![
            project.id.to_string(),
            ordinal as i64,
            project.name,
            project.project_type.as_str(),
        ],
    )
    .map_err(TrackerError::store("failed to insert project"))?;
    insert_gateways(tx, KIND_PROJECT, project.id, &project.gateways)?;

    for (ordinal, module) in project.modules.iter().enumerate() {
        insert_module(tx, project.id, None, ordinal, module.id, &module.name)?;
        insert_gateways(tx, KIND_MODULE, module.id, &module.gateways)?;
        for (ordinal, sub) in module.sub_modules.iter().enumerate() {
            insert_module(tx, project.id, Some(module.id), ordinal, sub.id, &sub.name)?;
            insert_gateways(tx, KIND_SUB_MODULE, sub.id, &sub.gateways)?;
        }
    }

    for (ordinal, deliverable) in project.deliverables.iter().enumerate() {
        tx.execute(
            "INSERT INTO deliverables (id, project_id, ordinal, gateway_stage, name, status, evidence, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                deliverable.id().to_string(),
                project.id.to_string(),
                ordinal as i64,
                deliverable.gateway_stage().as_str(),
                deliverable.name(),
                deliverable.status.as_str(),
                deliverable.evidence,
                deliverable.remarks,
            ],
        )
        .map_err(TrackerError::store("failed to insert deliverable"))?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────────────────────

fn load_gateways(conn: &Connection) -> Result<HashMap<EntityId, GatewaySet>> {
    let rows = query_rows(
        conn,
        "SELECT entity_id, gateway, plan, entered_actual, actual, change_note FROM gateways",
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        },
    )?;

    let mut sets: HashMap<EntityId, GatewaySet> = HashMap::new();
    for (entity_id, gateway, plan, entered_actual, actual, change_note) in rows {
        let gateway = gateway
            .parse::<GatewayId>()
            .map_err(|err| TrackerError::CorruptStore(err.to_string()))?;
        let record = &mut sets.entry(parse_id(&entity_id)?).or_default()[gateway];
        record.plan = parse_date(&plan);
        record.entered_actual = parse_date(&entered_actual);
        record.actual = parse_date(&actual);
        record.change_note = change_note;
    }
    Ok(sets)
}

/// Top-level modules per project, each with its sub-modules attached.
fn load_modules(
    conn: &Connection,
    gateways: &mut HashMap<EntityId, GatewaySet>,
) -> Result<HashMap<EntityId, Vec<Module>>> {
    let rows = query_rows(
        conn,
        "SELECT id, project_id, parent_module_id, name FROM modules ORDER BY ordinal",
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    )?;

    let mut modules: HashMap<EntityId, Vec<Module>> = HashMap::new();
    let mut subs: HashMap<EntityId, Vec<SubModule>> = HashMap::new();
    for (id, project_id, parent_id, name) in rows {
        let id = parse_id(&id)?;
        let set = gateways.remove(&id).unwrap_or_default();
        match parent_id {
            Some(parent_id) => subs.entry(parse_id(&parent_id)?).or_default().push(SubModule {
                id,
                name,
                gateways: set,
            }),
            None => modules.entry(parse_id(&project_id)?).or_default().push(Module {
                id,
                name,
                gateways: set,
                sub_modules: Vec::new(),
            }),
        }
    }

    for module in modules.values_mut().flatten() {
        module.sub_modules = subs.remove(&module.id).unwrap_or_default();
    }
    if let Some(orphan) = subs.keys().next() {
        return Err(TrackerError::CorruptStore(format!(
            "sub-modules reference missing module {orphan}"
        )));
    }
    Ok(modules)
}

fn load_deliverables(conn: &Connection) -> Result<HashMap<EntityId, Vec<Deliverable>>> {
    let rows = query_rows(
        conn,
        "SELECT id, project_id, gateway_stage, name, status, evidence, remarks
         FROM deliverables ORDER BY ordinal",
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        },
    )?;

    let mut deliverables: HashMap<EntityId, Vec<Deliverable>> = HashMap::new();
    for (id, project_id, gateway, name, status, evidence, remarks) in rows {
        let corrupt = |err: TrackerError| TrackerError::CorruptStore(err.to_string());
        let project_id = parse_id(&project_id)?;
        let gateway = gateway.parse::<GatewayId>().map_err(corrupt)?;
        let mut deliverable = Deliverable::restore(parse_id(&id)?, project_id, gateway, name);
        deliverable.status = status.parse::<DeliverableStatus>().map_err(corrupt)?;
        deliverable.evidence = evidence;
        deliverable.remarks = remarks;
        deliverables.entry(project_id).or_default().push(deliverable);
    }
    Ok(deliverables)
}

//! Tabular export/import and database backups.
//!
//! Rows travel as a JSON array of objects keyed by the template column
//! names (`Project Name`, `P_D0`, `D0_Act`, ...).

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use gatetrack_core::{TabularRow, export_rows, merge_upload, template_headers};

use crate::app::{App, print_json};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Write rows to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON file holding an array of rows
    #[arg(long)]
    pub file: PathBuf,

    /// Save even if another session changed the store since it was read
    #[arg(long)]
    pub force: bool,
}

pub fn cmd_export(app: &App, args: &ExportArgs) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let rows = export_rows(portfolio.projects());

    let Some(path) = &args.out else {
        return print_json(&rows);
    };
    let json = serde_json::to_string_pretty(&rows)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn cmd_template() -> anyhow::Result<()> {
    print_json(&[TabularRow::default()])
}

pub fn cmd_import(app: &mut App, args: &ImportArgs) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let rows = parse_rows(&content)?;

    let checklist = app.checklist()?;
    let current = app.snapshot()?;
    let (next, report) = merge_upload(&current, &rows, &checklist)?;
    let revision = if args.force {
        app.commit_overwrite(&next)?
    } else {
        app.commit(&next)?
    };
    tracing::info!(revision, rows = rows.len(), "import saved");

    println!(
        "Applied {} rows ({} skipped): {} projects, {} modules, {} sub-modules created",
        report.rows_applied,
        report.rows_skipped,
        report.projects_created,
        report.modules_created,
        report.sub_modules_created
    );
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

/// Decode uploaded rows, warning about columns the template does not know.
fn parse_rows(content: &str) -> anyhow::Result<Vec<TabularRow>> {
    let raw: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(content).context("upload must be a JSON array of row objects")?;
    let known = template_headers();

    raw.into_iter()
        .enumerate()
        .map(|(index, object)| {
            for key in object.keys() {
                if !known.contains(&key.as_str()) {
                    tracing::warn!(row = index + 1, column = %key, "ignoring unknown column");
                }
            }
            serde_json::from_value(serde_json::Value::Object(object))
                .with_context(|| format!("row {}: cells must be strings", index + 1))
        })
        .collect()
}

pub fn cmd_backup(app: &App) -> anyhow::Result<()> {
    let dir = app.backup_dir();
    match gatetrack_core::backup_database(app.db_path(), &dir, app.config.backup.keep)? {
        Some(path) => println!("Backup written to {}", path.display()),
        None => println!("No database at {}; nothing to back up", app.db_path().display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_rows_reads_template_columns() {
        let rows = parse_rows(
            r#"[{"Project Name": "Falcon", "Type": "Major", "Module Name": "Body",
                 "P_D0": "2024-01-01", "D0_Act": "2024-01-05", "Colour": "red"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].project_name, "Falcon");
        assert_eq!(rows[0].module_name, "Body");
        assert_eq!(rows[0].p_d0, "2024-01-01");
        assert_eq!(rows[0].d0_act, "2024-01-05");
        assert_eq!(rows[0].parent_module, "");
    }

    #[test]
    fn parse_rows_rejects_non_string_cells() {
        let err = parse_rows(r#"[{"Project Name": 7}]"#).unwrap_err();
        assert!(format!("{err:#}").contains("row 1"));
    }

    #[test]
    fn parse_rows_rejects_non_array() {
        assert!(parse_rows(r#"{"Project Name": "Falcon"}"#).is_err());
    }
}

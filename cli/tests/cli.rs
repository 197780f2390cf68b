//! End-to-end tests of the `gatetrack` binary against a temporary store.

use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let config = dir.path().join("config.toml");
        let db = dir.path().join("data").join("gatetrack.db");
        std::fs::write(
            &config,
            format!(
                "db_path = {:?}\n\n[backup]\non_startup = false\nkeep = 2\n",
                db.to_string_lossy()
            ),
        )?;
        Ok(Self { dir, config })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("gatetrack")?;
        cmd.env_remove("GATETRACK_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config);
        Ok(cmd)
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.cmd()?.args(args).assert().success().get_output().clone();
        Ok(String::from_utf8(output.stdout)?)
    }

    fn json(&self, args: &[&str]) -> Result<Value> {
        Ok(serde_json::from_str(&self.run(args)?)?)
    }

    fn create_falcon(&self) -> Result<()> {
        self.run(&[
            "project", "create", "--name", "Falcon", "--type", "Major", "--d0", "2024-01-01",
        ])?;
        Ok(())
    }
}

#[test]
fn create_and_list_project() -> Result<()> {
    let env = Env::new()?;
    env.cmd()?
        .args([
            "project", "create", "--name", "Falcon", "--type", "Major", "--d0", "2024-01-01",
            "--modules", "2",
        ])
        .assert()
        .success()
        .stdout(contains("Created Falcon (Major) with 2 modules and 17 deliverables"));

    let list = env.json(&["project", "list", "--json"])?;
    let rows = list.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Falcon");
    assert_eq!(rows[0]["headline"], "on-track");
    assert_eq!(rows[0]["items"], "0/4 Items");
    assert_eq!(rows[0]["modules"], 2);
    Ok(())
}

#[test]
fn duplicate_project_name_is_rejected() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;
    env.cmd()?
        .args([
            "project", "create", "--name", "Falcon", "--type", "Minor", "--d0", "2024-02-01",
        ])
        .assert()
        .failure()
        .stderr(contains("already exists"));
    Ok(())
}

#[test]
fn actual_dates_roll_up_into_headline() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;

    env.run(&[
        "actual", "set", "--project", "Falcon", "--module", "Module 1", "--gateway", "D0",
        "--date", "2024-01-05",
    ])?;
    let brief = env.json(&["brief", "--project", "Falcon"])?;
    assert_eq!(brief["headline"], "at-risk");
    assert_eq!(brief["delays"][0]["module"], "Module 1");
    assert_eq!(brief["delays"][0]["days"], 4);

    // A later gateway on time makes the earlier slip history.
    env.run(&[
        "project", "plan", "--project", "Falcon", "--gateway", "D1", "--date", "2024-03-01",
    ])?;
    env.run(&[
        "actual", "set", "--project", "Falcon", "--module", "Module 1", "--gateway", "D1",
        "--date", "2024-02-20",
    ])?;
    let brief = env.json(&["brief", "--project", "Falcon"])?;
    assert_eq!(brief["headline"], "on-track");

    let readiness = env.json(&["readiness", "--project", "Falcon", "--json"])?;
    assert_eq!(readiness["summary"], "0/8 Items");
    assert_eq!(readiness["active_stages"], serde_json::json!(["D0", "D1"]));
    Ok(())
}

#[test]
fn derived_module_actual_cannot_be_set() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;
    env.run(&[
        "sub-module", "add", "--project", "Falcon", "--module", "Module 1", "--name", "Doors",
    ])?;

    env.cmd()?
        .args([
            "actual", "set", "--project", "Falcon", "--module", "Module 1", "--gateway", "D0",
            "--date", "2024-01-05",
        ])
        .assert()
        .failure()
        .stderr(contains("derived"));

    env.run(&[
        "actual", "set", "--project", "Falcon", "--module", "Module 1", "--sub-module", "Doors",
        "--gateway", "D0", "--date", "2024-01-09",
    ])?;
    let show = env.json(&["project", "show", "--project", "Falcon", "--json"])?;
    assert_eq!(show["modules"][0]["gateways"]["D0"]["actual"], "2024-01-09");
    assert_eq!(show["gateways"]["D0"]["actual"], "2024-01-09");
    Ok(())
}

#[test]
fn deliverable_update_moves_readiness() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;

    let items = env.json(&[
        "deliverable", "list", "--project", "Falcon", "--gateway", "D0", "--json",
    ])?;
    let items = items.as_array().expect("array");
    assert_eq!(items.len(), 4);
    let id = items[0]["id"].as_str().expect("id").to_string();

    env.cmd()?
        .args([
            "deliverable", "update", "--project", "Falcon", "--id", &id, "--status", "Completed",
            "--evidence", "DOC-17",
        ])
        .assert()
        .success()
        .stdout(contains("readiness 25% (1/4 Items)"));

    env.cmd()?
        .args(["deliverable", "update", "--project", "Falcon", "--id", &id, "--status", "N/A"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn unknown_project_fails() -> Result<()> {
    let env = Env::new()?;
    env.cmd()?
        .args(["readiness", "--project", "Nope"])
        .assert()
        .failure()
        .stderr(contains("project not found: Nope"));
    Ok(())
}

#[test]
fn export_then_import_into_fresh_store() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;
    env.run(&[
        "actual", "set", "--project", "Falcon", "--module", "Module 1", "--gateway", "D0",
        "--date", "2024-01-05",
    ])?;
    let export = env.path().join("rows.json");
    env.run(&["export", "--out", export.to_str().expect("utf-8 path")])?;

    let other = Env::new()?;
    other
        .cmd()?
        .args(["import", "--file", export.to_str().expect("utf-8 path")])
        .assert()
        .success()
        .stdout(contains("1 projects, 1 modules"));

    let brief = other.json(&["brief", "--project", "Falcon"])?;
    assert_eq!(brief["headline"], "at-risk");
    assert_eq!(brief["readiness"]["total"], 4);
    Ok(())
}

#[test]
fn dashboard_filters_by_type() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;
    env.run(&[
        "project", "create", "--name", "Legacy", "--type", "Carryover", "--d0", "2024-01-01",
    ])?;

    let all = env.json(&["dashboard", "--json"])?;
    assert_eq!(all["stats"]["total"], 2);

    let carryover = env.json(&["dashboard", "--type", "Carryover", "--json"])?;
    assert_eq!(carryover["stats"]["total"], 1);
    assert_eq!(carryover["projects"][0]["name"], "Legacy");
    assert_eq!(carryover["projects"][0]["readiness"], 100.0);
    assert_eq!(carryover["projects"][0]["band"], "healthy");
    Ok(())
}

#[test]
fn template_lists_upload_columns() -> Result<()> {
    let env = Env::new()?;
    let template = env.json(&["template"])?;
    let row = template[0].as_object().expect("row object");
    assert_eq!(row.len(), 19);
    assert!(row.contains_key("Project Name"));
    assert!(row.contains_key("D4_ECN"));
    Ok(())
}

#[test]
fn template_needs_no_config_or_store() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("missing.toml");
    Command::cargo_bin("gatetrack")?
        .env_remove("GATETRACK_CONFIG")
        .arg("--config")
        .arg(&missing)
        .arg("template")
        .assert()
        .success()
        .stdout(contains("Project Name"));

    Command::cargo_bin("gatetrack")?
        .env_remove("GATETRACK_CONFIG")
        .arg("--config")
        .arg(&missing)
        .arg("dashboard")
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
    assert!(!dir.path().join("data").exists());
    Ok(())
}

#[test]
fn backup_writes_into_backup_dir() -> Result<()> {
    let env = Env::new()?;
    env.create_falcon()?;
    env.cmd()?
        .arg("backup")
        .assert()
        .success()
        .stdout(contains("Backup written to"));

    let backups: Vec<_> = std::fs::read_dir(env.path().join("data").join("backups"))?
        .collect::<std::io::Result<_>>()?;
    assert_eq!(backups.len(), 1);
    Ok(())
}

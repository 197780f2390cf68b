//! `gatetrack` command-line front end.
//!
//! Thin layer over `gatetrack-core`: argument parsing, name resolution and
//! output formatting. All computation lives in the core crate.

pub mod app;
pub mod deliverable_cmd;
pub mod project_cmd;
pub mod report_cmd;
pub mod transfer_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::App;
use crate::deliverable_cmd::DeliverableCli;
use crate::project_cmd::{ActualCli, ModuleCli, NoteCli, ProjectCli, SubModuleCli};
use crate::report_cmd::{BriefArgs, DashboardArgs, ReadinessArgs};
use crate::transfer_cmd::{ExportArgs, ImportArgs};

/// Gateway tracker for program timelines
#[derive(Debug, Parser)]
#[command(name = "gatetrack", version, about)]
pub struct Cli {
    /// Config file (default: $GATETRACK_CONFIG, then ~/.config/gatetrack/config.toml)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the configured one
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fleet overview: status counts, adherence and per-project readiness
    Dashboard(DashboardArgs),
    /// Create, inspect and edit projects
    Project(ProjectCli),
    /// Add or remove modules
    Module(ModuleCli),
    /// Add or remove sub-modules
    SubModule(SubModuleCli),
    /// Record actual gateway dates on modules and sub-modules
    Actual(ActualCli),
    /// Record gateway change notes (ECN)
    Note(NoteCli),
    /// List and update checklist deliverables
    Deliverable(DeliverableCli),
    /// Readiness score of one project
    Readiness(ReadinessArgs),
    /// Structured project summary as JSON
    Brief(BriefArgs),
    /// Export every project as tabular rows (JSON)
    Export(ExportArgs),
    /// Print an empty upload template
    Template,
    /// Merge tabular rows into the portfolio
    Import(ImportArgs),
    /// Snapshot the database into the backup directory
    Backup,
}

impl Cli {
    pub fn run(&self) -> anyhow::Result<()> {
        // Only `template` runs without configuration or a store.
        let open = || App::open(self.config.as_deref(), self.db.as_deref());
        match &self.command {
            Command::Template => transfer_cmd::cmd_template(),
            Command::Dashboard(args) => report_cmd::cmd_dashboard(&open()?, args),
            Command::Project(cli) => cli.run(&mut open()?),
            Command::Module(cli) => cli.run(&mut open()?),
            Command::SubModule(cli) => cli.run(&mut open()?),
            Command::Actual(cli) => cli.run(&mut open()?),
            Command::Note(cli) => cli.run(&mut open()?),
            Command::Deliverable(cli) => cli.run(&mut open()?),
            Command::Readiness(args) => report_cmd::cmd_readiness(&open()?, args),
            Command::Brief(args) => report_cmd::cmd_brief(&open()?, args),
            Command::Export(args) => transfer_cmd::cmd_export(&open()?, args),
            Command::Import(args) => transfer_cmd::cmd_import(&mut open()?, args),
            Command::Backup => transfer_cmd::cmd_backup(&open()?),
        }
    }
}

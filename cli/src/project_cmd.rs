//! Hierarchy editing: projects, modules, sub-modules, actuals and notes.
//!
//! Each mutating command loads the snapshot, applies one transition and
//! saves it back; a concurrent writer in between makes the save fail with a
//! stale-snapshot error and nothing is written.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use gatetrack_core::gateway::format_date;
use gatetrack_core::{
    GatewayId, NewProject, Project, ProjectType, classify, display_readiness, headline_status,
    readiness,
};
use serde::Serialize;

use crate::app::{App, ModulePath, find_module, parse_date_arg, print_json};

// ─────────────────────────────────────────────────────────────────────────────
// Shared arguments
// ─────────────────────────────────────────────────────────────────────────────

/// A date to set, or `--clear` to remove it.
#[derive(Debug, Args)]
pub struct DateArg {
    /// Date as YYYY-MM-DD
    #[arg(
        long,
        value_parser = parse_date_arg,
        required_unless_present = "clear",
        conflicts_with = "clear"
    )]
    pub date: Option<NaiveDate>,

    /// Clear the date instead of setting one
    #[arg(long)]
    pub clear: bool,
}

impl DateArg {
    fn value(&self) -> Option<NaiveDate> {
        if self.clear { None } else { self.date }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// project
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct ProjectCli {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Create a project and seed its checklist
    Create {
        #[arg(long)]
        name: String,
        /// Major, Minor or Carryover
        #[arg(long = "type")]
        project_type: ProjectType,
        /// Planned D0 date
        #[arg(long = "d0", value_parser = parse_date_arg)]
        d0_plan: NaiveDate,
        /// Number of placeholder modules to create
        #[arg(long, default_value_t = 1)]
        modules: usize,
    },
    /// List projects with headline status and readiness
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one project's gateways and modules
    Show {
        #[arg(long)]
        project: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a project with its modules and deliverables
    Remove {
        #[arg(long)]
        project: String,
    },
    /// Rename a project
    Rename {
        #[arg(long)]
        project: String,
        #[arg(long = "to")]
        new_name: String,
    },
    /// Change a project's type (existing deliverables are kept)
    SetType {
        #[arg(long)]
        project: String,
        #[arg(long = "type")]
        project_type: ProjectType,
    },
    /// Set or clear a project gateway plan
    Plan {
        #[arg(long)]
        project: String,
        #[arg(long)]
        gateway: GatewayId,
        #[command(flatten)]
        date: DateArg,
    },
}

impl ProjectCli {
    pub fn run(&self, app: &mut App) -> anyhow::Result<()> {
        match &self.command {
            ProjectCommand::Create {
                name,
                project_type,
                d0_plan,
                modules,
            } => cmd_create(app, name, *project_type, *d0_plan, *modules),
            ProjectCommand::List { json } => cmd_list(app, *json),
            ProjectCommand::Show { project, json } => cmd_show(app, project, *json),
            ProjectCommand::Remove { project } => {
                let current = app.snapshot()?;
                let id = current.find_project(project)?.id;
                app.commit(&current.remove_project(id)?)?;
                println!("Removed project {project}");
                Ok(())
            }
            ProjectCommand::Rename { project, new_name } => {
                let current = app.snapshot()?;
                let id = current.find_project(project)?.id;
                app.commit(&current.rename_project(id, new_name)?)?;
                println!("Renamed {project} to {}", new_name.trim());
                Ok(())
            }
            ProjectCommand::SetType {
                project,
                project_type,
            } => {
                let current = app.snapshot()?;
                let id = current.find_project(project)?.id;
                app.commit(&current.set_project_type(id, *project_type)?)?;
                println!("{project} is now {project_type}");
                Ok(())
            }
            ProjectCommand::Plan {
                project,
                gateway,
                date,
            } => {
                let current = app.snapshot()?;
                let id = current.find_project(project)?.id;
                app.commit(&current.set_project_plan(id, *gateway, date.value())?)?;
                println!("{project} {gateway} plan: {}", display_date(date.value()));
                Ok(())
            }
        }
    }
}

fn cmd_create(
    app: &mut App,
    name: &str,
    project_type: ProjectType,
    d0_plan: NaiveDate,
    modules: usize,
) -> anyhow::Result<()> {
    let checklist = app.checklist()?;
    let current = app.snapshot()?;
    let next = current.create_project(
        NewProject {
            name: name.to_string(),
            project_type,
            d0_plan,
            initial_modules: modules,
        },
        &checklist,
    )?;
    let revision = app.commit(&next)?;
    tracing::info!(project = name, revision, "project created");

    let created = next.find_project(name.trim())?;
    println!(
        "Created {} ({}) with {} modules and {} deliverables",
        created.name,
        created.project_type,
        created.modules.len(),
        created.deliverables.len()
    );
    Ok(())
}

#[derive(Serialize)]
struct ProjectRow<'a> {
    name: &'a str,
    project_type: ProjectType,
    headline: &'static str,
    readiness: f64,
    items: String,
    modules: usize,
}

fn cmd_list(app: &App, json: bool) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let rows: Vec<ProjectRow<'_>> = portfolio
        .projects()
        .iter()
        .map(|p| ProjectRow {
            name: &p.name,
            project_type: p.project_type,
            headline: headline_status(p).as_str(),
            readiness: display_readiness(p).round(),
            items: readiness(p).summary(),
            modules: p.modules.len(),
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    println!(
        "{:<24} {:<10} {:<9} {:>9}  {:<12} {:>7}",
        "PROJECT", "TYPE", "STATUS", "READINESS", "ITEMS", "MODULES"
    );
    for row in &rows {
        println!(
            "{:<24} {:<10} {:<9} {:>8}%  {:<12} {:>7}",
            row.name,
            row.project_type.as_str(),
            row.headline,
            row.readiness,
            row.items,
            row.modules
        );
    }
    Ok(())
}

fn cmd_show(app: &App, name: &str, json: bool) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let project = portfolio.find_project(name)?;
    if json {
        return print_json(project);
    }
    print_project(project);
    Ok(())
}

fn print_project(project: &Project) {
    println!("{} ({})", project.name, project.project_type);
    println!("Headline: {}", headline_status(project));
    println!();
    println!("{:<4} {:<12} {:<12} {:<9}", "GW", "PLAN", "ACTUAL", "STATUS");
    for (gateway, record) in project.gateways.iter() {
        println!(
            "{:<4} {:<12} {:<12} {:<9}",
            gateway.as_str(),
            display_date(record.plan),
            display_date(record.actual),
            classify(record.plan, record.actual).as_str()
        );
    }

    for module in &project.modules {
        println!();
        let kind = if module.is_leaf() { "" } else { " (derived)" };
        println!("Module {}{kind}", module.name);
        print_actuals("  ", &module.gateways);
        for sub in &module.sub_modules {
            println!("  Sub-module {}", sub.name);
            print_actuals("    ", &sub.gateways);
        }
    }
}

fn print_actuals(indent: &str, gateways: &gatetrack_core::GatewaySet) {
    for (gateway, record) in gateways.iter() {
        if record.actual.is_none() && record.change_note.is_empty() {
            continue;
        }
        let note = if record.change_note.is_empty() {
            String::new()
        } else {
            format!("  ECN: {}", record.change_note)
        };
        println!("{indent}{gateway} {}{note}", display_date(record.actual));
    }
}

pub(crate) fn display_date(date: Option<NaiveDate>) -> String {
    if date.is_some() {
        format_date(date)
    } else {
        "-".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// module / sub-module
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
pub struct ModuleCli {
    #[command(subcommand)]
    pub command: ModuleCommand,
}

#[derive(Debug, Subcommand)]
pub enum ModuleCommand {
    /// Add a module to a project
    Add {
        #[arg(long)]
        project: String,
        #[arg(long)]
        name: String,
    },
    /// Remove a module and its sub-modules
    Remove {
        #[arg(long)]
        project: String,
        #[arg(long)]
        module: String,
    },
}

impl ModuleCli {
    pub fn run(&self, app: &mut App) -> anyhow::Result<()> {
        let current = app.snapshot()?;
        match &self.command {
            ModuleCommand::Add { project, name } => {
                let id = current.find_project(project)?.id;
                app.commit(&current.add_module(id, name)?)?;
                println!("Added module {} to {project}", name.trim());
            }
            ModuleCommand::Remove { project, module } => {
                let owner = current.find_project(project)?;
                let module_id = find_module(owner, module)?.id;
                app.commit(&current.remove_module(owner.id, module_id)?)?;
                println!("Removed module {module} from {project}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct SubModuleCli {
    #[command(subcommand)]
    pub command: SubModuleCommand,
}

#[derive(Debug, Subcommand)]
pub enum SubModuleCommand {
    /// Add a sub-module; the parent's actuals become derived
    Add {
        #[arg(long)]
        project: String,
        #[arg(long)]
        module: String,
        #[arg(long)]
        name: String,
    },
    /// Remove a sub-module
    Remove {
        #[arg(long)]
        project: String,
        #[arg(long)]
        module: String,
        #[arg(long = "sub-module")]
        sub_module: String,
    },
}

impl SubModuleCli {
    pub fn run(&self, app: &mut App) -> anyhow::Result<()> {
        let current = app.snapshot()?;
        match &self.command {
            SubModuleCommand::Add {
                project,
                module,
                name,
            } => {
                let path = ModulePath::resolve(&current, project, module, None)?;
                app.commit(&current.add_sub_module(path.project, path.module, name)?)?;
                println!("Added sub-module {} to {module}", name.trim());
            }
            SubModuleCommand::Remove {
                project,
                module,
                sub_module,
            } => {
                let path = ModulePath::resolve(&current, project, module, Some(sub_module))?;
                let Some(sub_module_id) = path.sub_module else {
                    anyhow::bail!("sub-module {sub_module} not resolved");
                };
                app.commit(&current.remove_sub_module(path.project, path.module, sub_module_id)?)?;
                println!("Removed sub-module {sub_module} from {module}");
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// actual / note
// ─────────────────────────────────────────────────────────────────────────────

/// Addresses a module, or one of its sub-modules when `--sub-module` is set.
#[derive(Debug, Args)]
pub struct TargetArgs {
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub module: String,
    #[arg(long = "sub-module")]
    pub sub_module: Option<String>,
    #[arg(long)]
    pub gateway: GatewayId,
}

impl TargetArgs {
    fn describe(&self) -> String {
        match &self.sub_module {
            Some(sub) => format!("{}/{}/{sub} {}", self.project, self.module, self.gateway),
            None => format!("{}/{} {}", self.project, self.module, self.gateway),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ActualCli {
    #[command(subcommand)]
    pub command: ActualCommand,
}

#[derive(Debug, Subcommand)]
pub enum ActualCommand {
    /// Set or clear an actual date on a leaf module or a sub-module
    Set {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        date: DateArg,
    },
}

impl ActualCli {
    pub fn run(&self, app: &mut App) -> anyhow::Result<()> {
        let ActualCommand::Set { target, date } = &self.command;
        let current = app.snapshot()?;
        let path = ModulePath::resolve(
            &current,
            &target.project,
            &target.module,
            target.sub_module.as_deref(),
        )?;
        let next = match path.sub_module {
            Some(sub_module_id) => current.set_sub_module_actual(
                path.project,
                path.module,
                sub_module_id,
                target.gateway,
                date.value(),
            )?,
            None => {
                current.set_module_actual(path.project, path.module, target.gateway, date.value())?
            }
        };
        app.commit(&next)?;

        let project = next.find_project(&target.project)?;
        let rolled = &project.gateways[target.gateway];
        println!(
            "{} actual: {} (project {} now {})",
            target.describe(),
            display_date(date.value()),
            target.gateway,
            display_date(rolled.actual)
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct NoteCli {
    #[command(subcommand)]
    pub command: NoteCommand,
}

#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    /// Set the change note of a module or sub-module gateway
    Set {
        #[command(flatten)]
        target: TargetArgs,
        /// Note text; an empty string clears it
        #[arg(long)]
        note: String,
    },
}

impl NoteCli {
    pub fn run(&self, app: &mut App) -> anyhow::Result<()> {
        let NoteCommand::Set { target, note } = &self.command;
        let current = app.snapshot()?;
        let path = ModulePath::resolve(
            &current,
            &target.project,
            &target.module,
            target.sub_module.as_deref(),
        )?;
        let next = current.set_change_note(
            path.project,
            path.module,
            path.sub_module,
            target.gateway,
            note,
        )?;
        app.commit(&next)?;
        println!("{} note updated", target.describe());
        Ok(())
    }
}

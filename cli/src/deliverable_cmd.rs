//! Checklist deliverables of a project.

use clap::{Parser, Subcommand};
use gatetrack_core::{Deliverable, DeliverableStatus, DeliverableUpdate, GatewayId, active_stages};
use uuid::Uuid;

use crate::app::{App, print_json};

#[derive(Debug, Parser)]
pub struct DeliverableCli {
    #[command(subcommand)]
    pub command: DeliverableCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeliverableCommand {
    /// List a project's deliverables
    List {
        #[arg(long)]
        project: String,
        /// Only deliverables gated on this stage
        #[arg(long)]
        gateway: Option<GatewayId>,
        #[arg(long)]
        json: bool,
    },
    /// Update status, evidence or remarks of one deliverable
    Update {
        #[arg(long)]
        project: String,
        /// Deliverable id as shown by `deliverable list`
        #[arg(long)]
        id: Uuid,
        /// Pending, WIP, Completed or NA
        #[arg(long)]
        status: Option<DeliverableStatus>,
        #[arg(long)]
        evidence: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
    },
}

impl DeliverableCli {
    pub fn run(&self, app: &mut App) -> anyhow::Result<()> {
        match &self.command {
            DeliverableCommand::List {
                project,
                gateway,
                json,
            } => cmd_list(app, project, *gateway, *json),
            DeliverableCommand::Update {
                project,
                id,
                status,
                evidence,
                remarks,
            } => {
                let update = DeliverableUpdate {
                    status: *status,
                    evidence: evidence.clone(),
                    remarks: remarks.clone(),
                };
                cmd_update(app, project, *id, update)
            }
        }
    }
}

fn cmd_list(app: &App, name: &str, gateway: Option<GatewayId>, json: bool) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let project = portfolio.find_project(name)?;
    let selected: Vec<&Deliverable> = project
        .deliverables
        .iter()
        .filter(|d| gateway.is_none_or(|g| d.gateway_stage() == g))
        .collect();

    if json {
        return print_json(&selected);
    }
    if selected.is_empty() {
        println!("No deliverables.");
        return Ok(());
    }

    let active = active_stages(project);
    println!("{:<36}  {:<3} {:<10} NAME", "ID", "GW", "STATUS");
    for deliverable in selected {
        let marker = if active.contains(&deliverable.gateway_stage()) {
            ""
        } else {
            " (inactive)"
        };
        let id = deliverable.id().to_string();
        println!(
            "{id:<36}  {:<3} {:<10} {}{marker}",
            deliverable.gateway_stage().as_str(),
            deliverable.status.as_str(),
            deliverable.name()
        );
    }
    Ok(())
}

fn cmd_update(
    app: &mut App,
    name: &str,
    id: Uuid,
    update: DeliverableUpdate,
) -> anyhow::Result<()> {
    if update.status.is_none() && update.evidence.is_none() && update.remarks.is_none() {
        anyhow::bail!("nothing to update: pass --status, --evidence or --remarks");
    }

    let current = app.snapshot()?;
    let project_id = current.find_project(name)?.id;
    let next = current.update_deliverable(project_id, id, update)?;
    app.commit(&next)?;

    let readiness = next.readiness(project_id)?;
    println!(
        "Updated deliverable {id}; {name} readiness {:.0}% ({})",
        readiness.score,
        readiness.summary()
    );
    Ok(())
}

//! Read-only views: fleet dashboard, readiness and project brief.

use clap::Args;
use gatetrack_core::{
    Adherence, FleetStats, GatewayId, Project, ProjectBrief, ProjectType, ReadinessBand,
    ReleaseBreakdown, active_stages, adherence, display_readiness, filter_by_type, fleet_stats,
    headline_status, latest_released_gateway, readiness, release_breakdown,
};
use serde::Serialize;

use crate::app::{App, print_json};

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Only include these project types (repeatable)
    #[arg(long = "type")]
    pub types: Vec<ProjectType>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReadinessArgs {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct BriefArgs {
    #[arg(long)]
    pub project: String,
}

#[derive(Debug, Serialize)]
struct DashboardView {
    stats: FleetStats,
    adherence: Adherence,
    projects: Vec<DashboardRow>,
}

#[derive(Debug, Serialize)]
struct DashboardRow {
    name: String,
    project_type: ProjectType,
    headline: &'static str,
    latest_gateway: Option<&'static str>,
    readiness: f64,
    band: ReadinessBand,
    released: ReleaseBreakdown,
}

pub fn cmd_dashboard(app: &App, args: &DashboardArgs) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let selected: Vec<Project> = filter_by_type(portfolio.projects(), &args.types)
        .into_iter()
        .cloned()
        .collect();
    let thresholds = app.config.display.thresholds();

    let view = DashboardView {
        stats: fleet_stats(&selected),
        adherence: adherence(&selected),
        projects: selected
            .iter()
            .map(|project| {
                let score = display_readiness(project);
                DashboardRow {
                    name: project.name.clone(),
                    project_type: project.project_type,
                    headline: headline_status(project).as_str(),
                    latest_gateway: latest_released_gateway(project).map(GatewayId::as_str),
                    readiness: score,
                    band: thresholds.band(score),
                    released: release_breakdown(project),
                }
            })
            .collect(),
    };

    if args.json {
        return print_json(&view);
    }

    let stats = view.stats;
    println!(
        "Projects: {} total, {} active | on-track {} | at-risk {} | delay {}",
        stats.total, stats.active, stats.on_track, stats.at_risk, stats.delay
    );
    println!(
        "Gateway adherence: {:.1}% ({}/{} released on time)",
        view.adherence.rate, view.adherence.on_time, view.adherence.released
    );
    if view.projects.is_empty() {
        return Ok(());
    }

    println!();
    println!(
        "{:<24} {:<10} {:<9} {:<6} {:>9}  {:<8} {:>11}",
        "PROJECT", "TYPE", "STATUS", "LATEST", "READINESS", "BAND", "ON/RISK/DLY"
    );
    for row in &view.projects {
        let mix = format!(
            "{}/{}/{}",
            row.released.on_track, row.released.at_risk, row.released.delay
        );
        println!(
            "{:<24} {:<10} {:<9} {:<6} {:>8.0}%  {:<8} {mix:>11}",
            row.name,
            row.project_type.as_str(),
            row.headline,
            row.latest_gateway.unwrap_or("-"),
            row.readiness,
            row.band.as_str(),
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReadinessView {
    project: String,
    score: f64,
    display_score: f64,
    achieved: usize,
    total: usize,
    summary: String,
    band: ReadinessBand,
    active_stages: Vec<&'static str>,
}

pub fn cmd_readiness(app: &App, args: &ReadinessArgs) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let project = portfolio.find_project(&args.project)?;
    let raw = readiness(project);
    let display_score = display_readiness(project);

    let view = ReadinessView {
        project: project.name.clone(),
        score: raw.score,
        display_score,
        achieved: raw.achieved,
        total: raw.total,
        summary: raw.summary(),
        band: app.config.display.thresholds().band(display_score),
        active_stages: active_stages(project)
            .into_iter()
            .map(GatewayId::as_str)
            .collect(),
    };

    if args.json {
        return print_json(&view);
    }
    println!(
        "{}: {:.0}% ({}) [{}]",
        view.project,
        view.display_score,
        view.summary,
        view.band.as_str()
    );
    println!("Active stages: {}", view.active_stages.join(", "));
    Ok(())
}

pub fn cmd_brief(app: &App, args: &BriefArgs) -> anyhow::Result<()> {
    let portfolio = app.snapshot()?;
    let project = portfolio.find_project(&args.project)?;
    print_json(&ProjectBrief::for_project(project))
}

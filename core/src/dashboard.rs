//! Fleet dashboard reductions.
//!
//! Two distinct axes are computed here and must not be confused:
//!
//! - the *headline* status of a project, decided solely by its latest
//!   released gateway (earlier lateness is forgiven once a later gateway
//!   ships);
//! - the *adherence* rate, over every (module, gateway) pair in the fleet
//!   that has a module actual, for all gateways and all time.

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayId;
use crate::model::{Project, ProjectType};
use crate::readiness::{Readiness, readiness};
use crate::status::{GatewayStatus, HeadlineStatus, classify, slip_days};

/// Highest gateway whose effective actual is present.
pub fn latest_released_gateway(project: &Project) -> Option<GatewayId> {
    project
        .gateways
        .iter()
        .filter(|(_, record)| record.is_released())
        .map(|(gateway, _)| gateway)
        .last()
}

/// Single status for a project. Nothing released yet is on track.
pub fn headline_status(project: &Project) -> HeadlineStatus {
    match latest_released_gateway(project) {
        None => HeadlineStatus::OnTrack,
        Some(gateway) => {
            let record = &project.gateways[gateway];
            classify(record.plan, record.actual).headline()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    /// Equals `total`; there is no archived state.
    pub active: usize,
    pub on_track: usize,
    pub at_risk: usize,
    pub delay: usize,
}

pub fn fleet_stats(projects: &[Project]) -> FleetStats {
    let mut stats = FleetStats {
        total: projects.len(),
        active: projects.len(),
        ..FleetStats::default()
    };
    for project in projects {
        match headline_status(project) {
            HeadlineStatus::OnTrack => stats.on_track += 1,
            HeadlineStatus::AtRisk => stats.at_risk += 1,
            HeadlineStatus::Delay => stats.delay += 1,
        }
    }
    stats
}

/// Fleet-wide share of released module gateways that met the project plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Adherence {
    /// (module, gateway) pairs with a module actual.
    pub released: usize,
    /// Of those, pairs with a project plan and `actual <= plan`.
    pub on_time: usize,
    /// Percentage; 0 when nothing is released.
    pub rate: f64,
}

pub fn adherence(projects: &[Project]) -> Adherence {
    let mut released = 0usize;
    let mut on_time = 0usize;

    for project in projects {
        for module in &project.modules {
            for (gateway, record) in module.gateways.iter() {
                let Some(actual) = record.actual else {
                    continue;
                };
                released += 1;
                if project.gateways[gateway]
                    .plan
                    .is_some_and(|plan| actual <= plan)
                {
                    on_time += 1;
                }
            }
        }
    }

    let rate = if released == 0 {
        0.0
    } else {
        on_time as f64 / released as f64 * 100.0
    };
    Adherence {
        released,
        on_time,
        rate,
    }
}

/// Per-project split of released module gateways by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseBreakdown {
    pub on_track: usize,
    pub at_risk: usize,
    pub delay: usize,
    /// Pairs with both a project plan and a module actual.
    pub total: usize,
}

pub fn release_breakdown(project: &Project) -> ReleaseBreakdown {
    let mut breakdown = ReleaseBreakdown::default();
    for module in &project.modules {
        for (gateway, record) in module.gateways.iter() {
            match classify(project.gateways[gateway].plan, record.actual) {
                GatewayStatus::Pending => continue,
                GatewayStatus::OnTrack => breakdown.on_track += 1,
                GatewayStatus::AtRisk => breakdown.at_risk += 1,
                GatewayStatus::Delay => breakdown.delay += 1,
            }
            breakdown.total += 1;
        }
    }
    breakdown
}

/// A module gateway that shipped after the project plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDelay {
    pub module: String,
    pub gateway: GatewayId,
    pub days: i64,
}

/// Late module gateways in module order, then gateway order.
pub fn schedule_delays(project: &Project) -> Vec<ScheduleDelay> {
    let mut delays = Vec::new();
    for module in &project.modules {
        for (gateway, record) in module.gateways.iter() {
            if let Some(days) = slip_days(project.gateways[gateway].plan, record.actual)
                && days > 0
            {
                delays.push(ScheduleDelay {
                    module: module.name.clone(),
                    gateway,
                    days,
                });
            }
        }
    }
    delays
}

/// Everything an external summarizer receives about one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBrief {
    pub name: String,
    pub project_type: ProjectType,
    pub headline: HeadlineStatus,
    pub readiness: Readiness,
    pub delays: Vec<ScheduleDelay>,
}

impl ProjectBrief {
    pub fn for_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            project_type: project.project_type,
            headline: headline_status(project),
            readiness: readiness(project),
            delays: schedule_delays(project),
        }
    }
}

/// Projects whose type is in `types`; an empty filter keeps everything.
pub fn filter_by_type<'a>(projects: &'a [Project], types: &[ProjectType]) -> Vec<&'a Project> {
    projects
        .iter()
        .filter(|p| types.is_empty() || types.contains(&p.project_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::parse_date;
    use crate::model::Module;
    use crate::rollup::rollup;
    use pretty_assertions::assert_eq;

    fn project(plans: &[(GatewayId, &str)], actuals: &[(GatewayId, &str)]) -> Project {
        let mut project = Project::new("Falcon", ProjectType::Major);
        for (gateway, plan) in plans {
            project.gateways[*gateway].plan = parse_date(plan);
        }
        let mut module = Module::new("Chassis");
        for (gateway, actual) in actuals {
            module.gateways[*gateway].entered_actual = parse_date(actual);
        }
        project.modules.push(module);
        rollup(&project)
    }

    #[test]
    fn nothing_released_is_on_track() {
        let p = project(&[(GatewayId::D0, "2024-01-01")], &[]);
        assert_eq!(latest_released_gateway(&p), None);
        assert_eq!(headline_status(&p), HeadlineStatus::OnTrack);
    }

    #[test]
    fn latest_gateway_forgives_history() {
        let p = project(
            &[(GatewayId::D1, "2024-01-01"), (GatewayId::D2, "2024-06-01")],
            &[(GatewayId::D1, "2024-03-31"), (GatewayId::D2, "2024-05-20")],
        );
        assert_eq!(latest_released_gateway(&p), Some(GatewayId::D2));
        assert_eq!(headline_status(&p), HeadlineStatus::OnTrack);
    }

    #[test]
    fn missing_plan_on_latest_gateway_is_on_track() {
        let p = project(&[], &[(GatewayId::D3, "2024-05-20")]);
        assert_eq!(headline_status(&p), HeadlineStatus::OnTrack);
    }

    #[test]
    fn fleet_counts_each_headline() {
        let on_track = project(&[(GatewayId::D0, "2024-01-01")], &[(GatewayId::D0, "2024-01-01")]);
        let at_risk = project(&[(GatewayId::D0, "2024-01-01")], &[(GatewayId::D0, "2024-01-20")]);
        let delay = project(&[(GatewayId::D0, "2024-01-01")], &[(GatewayId::D0, "2024-03-01")]);
        let stats = fleet_stats(&[on_track, at_risk, delay.clone(), delay]);
        assert_eq!(
            stats,
            FleetStats {
                total: 4,
                active: 4,
                on_track: 1,
                at_risk: 1,
                delay: 2,
            }
        );
    }

    #[test]
    fn adherence_requires_plan_for_numerator() {
        let p = project(
            &[(GatewayId::D0, "2024-01-10"), (GatewayId::D1, "2024-02-01")],
            &[
                (GatewayId::D0, "2024-01-10"),
                (GatewayId::D1, "2024-02-05"),
                (GatewayId::D2, "2024-03-01"),
            ],
        );
        let a = adherence(&[p]);
        assert_eq!((a.released, a.on_time), (3, 1));
        assert!((a.rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn adherence_empty_fleet_is_zero() {
        assert_eq!(adherence(&[]).rate, 0.0);
    }

    #[test]
    fn breakdown_and_delays_skip_unplanned_pairs() {
        let p = project(
            &[(GatewayId::D0, "2024-01-01"), (GatewayId::D1, "2024-02-01")],
            &[
                (GatewayId::D0, "2024-01-15"),
                (GatewayId::D1, "2024-04-01"),
                (GatewayId::D2, "2024-05-01"),
            ],
        );
        assert_eq!(
            release_breakdown(&p),
            ReleaseBreakdown {
                on_track: 0,
                at_risk: 1,
                delay: 1,
                total: 2,
            }
        );
        assert_eq!(
            schedule_delays(&p),
            vec![
                ScheduleDelay {
                    module: "Chassis".to_string(),
                    gateway: GatewayId::D0,
                    days: 14,
                },
                ScheduleDelay {
                    module: "Chassis".to_string(),
                    gateway: GatewayId::D1,
                    days: 60,
                },
            ]
        );
    }

    #[test]
    fn type_filter() {
        let major = Project::new("A", ProjectType::Major);
        let carry = Project::new("B", ProjectType::Carryover);
        let all = [major, carry];
        assert_eq!(filter_by_type(&all, &[]).len(), 2);
        let only = filter_by_type(&all, &[ProjectType::Carryover]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "B");
    }
}

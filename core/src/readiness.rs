//! Deliverable-based readiness scoring.
//!
//! ```text
//! active   = {D0} ∪ {g : project.gateway[g].actual present}
//! selected = deliverables gated on an active stage
//! achieved = |selected with status Completed or NA|
//! score    = achieved / |selected| * 100   (0 when nothing is selected)
//! ```
//!
//! Carryover projects are shown as fully ready; that override lives in
//! [`display_readiness`] and never in [`readiness`] itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayId;
use crate::model::{Project, ProjectType};

/// Readiness of one project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    /// Percentage in `[0, 100]`.
    pub score: f64,
    pub achieved: usize,
    pub total: usize,
}

impl Readiness {
    /// `"{achieved}/{total} Items"`
    pub fn summary(&self) -> String {
        format!("{}/{} Items", self.achieved, self.total)
    }
}

/// Stages whose deliverables count towards readiness.
pub fn active_stages(project: &Project) -> BTreeSet<GatewayId> {
    let mut stages = BTreeSet::from([GatewayId::D0]);
    stages.extend(
        project
            .gateways
            .iter()
            .filter(|(_, record)| record.is_released())
            .map(|(gateway, _)| gateway),
    );
    stages
}

/// Score deliverable completion against the active stages.
pub fn readiness(project: &Project) -> Readiness {
    let stages = active_stages(project);
    let (achieved, total) = project
        .deliverables
        .iter()
        .filter(|d| stages.contains(&d.gateway_stage()))
        .fold((0usize, 0usize), |(achieved, total), d| {
            (achieved + usize::from(d.status.is_achieved()), total + 1)
        });

    let score = if total == 0 {
        0.0
    } else {
        achieved as f64 / total as f64 * 100.0
    };

    Readiness {
        score,
        achieved,
        total,
    }
}

/// Readiness as shown to people: Carryover programs are pinned at 100.
pub fn display_readiness(project: &Project) -> f64 {
    match project.project_type {
        ProjectType::Carryover => 100.0,
        ProjectType::Major | ProjectType::Minor => readiness(project).score,
    }
}

/// Colour band for a displayed readiness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessBand {
    Healthy,
    Warning,
    Critical,
}

impl ReadinessBand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Band boundaries; scores strictly below a boundary fall into that band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadinessThresholds {
    pub warn_below: f64,
    pub critical_below: f64,
}

impl Default for ReadinessThresholds {
    fn default() -> Self {
        Self {
            warn_below: 90.0,
            critical_below: 75.0,
        }
    }
}

impl ReadinessThresholds {
    pub fn band(&self, score: f64) -> ReadinessBand {
        if score < self.critical_below {
            ReadinessBand::Critical
        } else if score < self.warn_below {
            ReadinessBand::Warning
        } else {
            ReadinessBand::Healthy
        }
    }
}

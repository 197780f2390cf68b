//! Bottom-up actual-date rollup.
//!
//! Two passes per project and gateway:
//!
//! 1. Sub-Module → Module: a module with sub-modules takes the latest
//!    sub-module actual, or becomes empty when none has one.
//! 2. Module → Project: the project takes the latest module actual, or
//!    becomes empty.
//!
//! True leaves (sub-modules, and modules without sub-modules) get
//! `actual = entered_actual`. Derived levels have `entered_actual` cleared,
//! so the rollup is the only writer of non-leaf state. The recomputation is
//! total and idempotent: running it twice equals running it once.

use chrono::NaiveDate;

use crate::gateway::GatewayId;
use crate::model::{Module, Project};

/// Latest present date, or `None`.
pub fn latest_actual<I>(dates: I) -> Option<NaiveDate>
where
    I: IntoIterator<Item = Option<NaiveDate>>,
{
    dates.into_iter().flatten().max()
}

fn rollup_module(module: &mut Module) {
    if module.is_leaf() {
        for (_, record) in module.gateways.iter_mut() {
            record.actual = record.entered_actual;
        }
        return;
    }

    for sub in &mut module.sub_modules {
        for (_, record) in sub.gateways.iter_mut() {
            record.actual = record.entered_actual;
        }
    }

    for gateway in GatewayId::ALL {
        let derived = latest_actual(module.sub_modules.iter().map(|s| s.gateways[gateway].actual));
        let record = &mut module.gateways[gateway];
        if record.entered_actual.is_some() {
            tracing::debug!(
                module = %module.name,
                %gateway,
                "discarding entered actual on derived module"
            );
        }
        record.entered_actual = None;
        record.actual = derived;
    }
}

/// Recompute every derived actual of `project` in place.
pub fn rollup_in_place(project: &mut Project) {
    for module in &mut project.modules {
        rollup_module(module);
    }

    for gateway in GatewayId::ALL {
        let derived = latest_actual(project.modules.iter().map(|m| m.gateways[gateway].actual));
        let record = &mut project.gateways[gateway];
        record.entered_actual = None;
        record.actual = derived;
    }

    tracing::debug!(project_id = %project.id, modules = project.modules.len(), "rolled up project");
}

/// Pure form of [`rollup_in_place`].
pub fn rollup(project: &Project) -> Project {
    let mut out = project.clone();
    rollup_in_place(&mut out);
    out
}

/// Whether every derived field already equals its recomputed value.
pub fn is_consistent(project: &Project) -> bool {
    rollup(project) == *project
}

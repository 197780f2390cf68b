//! Flattened one-row-per-entity view for spreadsheet round trips.
//!
//! Export writes one row per module and per sub-module (a project without
//! modules gets a single project-only row). Project plan dates repeat on
//! every row; actual and change-note columns belong to the row's entity.
//!
//! Upload merges rows back by name. The merge works on a copy of the
//! snapshot and either applies every row or none of them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::checklist::MasterChecklist;
use crate::error::{Result, TrackerError};
use crate::gateway::{GatewayId, GatewaySet, format_date, parse_date_strict};
use crate::model::{EntityId, Module, Project, ProjectType, SubModule};
use crate::portfolio::Portfolio;

/// Column headers in export order.
pub const TEMPLATE_HEADERS: [&str; 19] = [
    "Project Name",
    "Type",
    "Module Name",
    "Parent Module",
    "P_D0",
    "P_D1",
    "P_D2",
    "P_D3",
    "P_D4",
    "D0_Act",
    "D0_ECN",
    "D1_Act",
    "D1_ECN",
    "D2_Act",
    "D2_ECN",
    "D3_Act",
    "D3_ECN",
    "D4_Act",
    "D4_ECN",
];

pub fn template_headers() -> &'static [&'static str] {
    &TEMPLATE_HEADERS
}

/// One spreadsheet row. Every cell is raw text; empty means "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularRow {
    #[serde(rename = "Project Name")]
    pub project_name: String,
    #[serde(rename = "Type")]
    pub project_type: String,
    #[serde(rename = "Module Name")]
    pub module_name: String,
    #[serde(rename = "Parent Module")]
    pub parent_module: String,
    #[serde(rename = "P_D0")]
    pub p_d0: String,
    #[serde(rename = "P_D1")]
    pub p_d1: String,
    #[serde(rename = "P_D2")]
    pub p_d2: String,
    #[serde(rename = "P_D3")]
    pub p_d3: String,
    #[serde(rename = "P_D4")]
    pub p_d4: String,
    #[serde(rename = "D0_Act")]
    pub d0_act: String,
    #[serde(rename = "D0_ECN")]
    pub d0_ecn: String,
    #[serde(rename = "D1_Act")]
    pub d1_act: String,
    #[serde(rename = "D1_ECN")]
    pub d1_ecn: String,
    #[serde(rename = "D2_Act")]
    pub d2_act: String,
    #[serde(rename = "D2_ECN")]
    pub d2_ecn: String,
    #[serde(rename = "D3_Act")]
    pub d3_act: String,
    #[serde(rename = "D3_ECN")]
    pub d3_ecn: String,
    #[serde(rename = "D4_Act")]
    pub d4_act: String,
    #[serde(rename = "D4_ECN")]
    pub d4_ecn: String,
}

impl TabularRow {
    pub fn plan(&self, gateway: GatewayId) -> &str {
        match gateway {
            GatewayId::D0 => &self.p_d0,
            GatewayId::D1 => &self.p_d1,
            GatewayId::D2 => &self.p_d2,
            GatewayId::D3 => &self.p_d3,
            GatewayId::D4 => &self.p_d4,
        }
    }

    pub fn actual(&self, gateway: GatewayId) -> &str {
        match gateway {
            GatewayId::D0 => &self.d0_act,
            GatewayId::D1 => &self.d1_act,
            GatewayId::D2 => &self.d2_act,
            GatewayId::D3 => &self.d3_act,
            GatewayId::D4 => &self.d4_act,
        }
    }

    pub fn ecn(&self, gateway: GatewayId) -> &str {
        match gateway {
            GatewayId::D0 => &self.d0_ecn,
            GatewayId::D1 => &self.d1_ecn,
            GatewayId::D2 => &self.d2_ecn,
            GatewayId::D3 => &self.d3_ecn,
            GatewayId::D4 => &self.d4_ecn,
        }
    }

    fn plan_mut(&mut self, gateway: GatewayId) -> &mut String {
        match gateway {
            GatewayId::D0 => &mut self.p_d0,
            GatewayId::D1 => &mut self.p_d1,
            GatewayId::D2 => &mut self.p_d2,
            GatewayId::D3 => &mut self.p_d3,
            GatewayId::D4 => &mut self.p_d4,
        }
    }

    fn entity_cells_mut(&mut self, gateway: GatewayId) -> (&mut String, &mut String) {
        match gateway {
            GatewayId::D0 => (&mut self.d0_act, &mut self.d0_ecn),
            GatewayId::D1 => (&mut self.d1_act, &mut self.d1_ecn),
            GatewayId::D2 => (&mut self.d2_act, &mut self.d2_ecn),
            GatewayId::D3 => (&mut self.d3_act, &mut self.d3_ecn),
            GatewayId::D4 => (&mut self.d4_act, &mut self.d4_ecn),
        }
    }

    fn for_project(project: &Project) -> Self {
        let mut row = Self {
            project_name: project.name.clone(),
            project_type: project.project_type.to_string(),
            ..Self::default()
        };
        for (gateway, record) in project.gateways.iter() {
            *row.plan_mut(gateway) = format_date(record.plan);
        }
        row
    }

    fn with_entity(mut self, name: &str, parent: &str, gateways: &GatewaySet) -> Self {
        self.module_name = name.to_string();
        self.parent_module = parent.to_string();
        for (gateway, record) in gateways.iter() {
            let (act, ecn) = self.entity_cells_mut(gateway);
            *act = format_date(record.actual);
            ecn.clone_from(&record.change_note);
        }
        self
    }
}

/// Flatten projects into export rows.
pub fn export_rows(projects: &[Project]) -> Vec<TabularRow> {
    let mut rows = Vec::new();
    for project in projects {
        let base = TabularRow::for_project(project);
        if project.modules.is_empty() {
            rows.push(base);
            continue;
        }
        for module in &project.modules {
            rows.push(base.clone().with_entity(&module.name, "", &module.gateways));
            for sub in &module.sub_modules {
                rows.push(
                    base.clone()
                        .with_entity(&sub.name, &module.name, &sub.gateways),
                );
            }
        }
    }
    rows
}

/// Outcome of a successful upload merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub rows_applied: usize,
    pub rows_skipped: usize,
    pub projects_created: usize,
    pub modules_created: usize,
    pub sub_modules_created: usize,
    pub warnings: Vec<String>,
}

/// Dates of one row, parsed strictly.
struct RowDates {
    plans: [Option<NaiveDate>; 5],
    actuals: [Option<NaiveDate>; 5],
}

impl RowDates {
    fn parse(row_no: usize, row: &TabularRow) -> Result<Self> {
        let strict = |raw: &str| {
            parse_date_strict(raw).map_err(|err| TrackerError::UploadRow {
                row: row_no,
                message: err.to_string(),
            })
        };
        let mut dates = Self {
            plans: [None; 5],
            actuals: [None; 5],
        };
        for gateway in GatewayId::ALL {
            dates.plans[gateway.index()] = strict(row.plan(gateway))?;
            dates.actuals[gateway.index()] = strict(row.actual(gateway))?;
        }
        Ok(dates)
    }
}

/// An actual uploaded onto a module whose actual is derived.
struct IgnoredActual {
    row_no: usize,
    project_id: EntityId,
    module: String,
    gateway: GatewayId,
    value: NaiveDate,
}

/// Merge uploaded rows into `portfolio` by name.
///
/// Row numbers in errors are 1-based. Two existing projects sharing a name
/// make the whole merge fail with [`TrackerError::AmbiguousName`].
pub fn merge_upload(
    portfolio: &Portfolio,
    rows: &[TabularRow],
    checklist: &MasterChecklist,
) -> Result<(Portfolio, MergeReport)> {
    let mut projects = portfolio.projects().to_vec();
    let mut report = MergeReport::default();
    let mut ignored = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row_no = index + 1;
        if row.project_name.trim().is_empty() {
            report.rows_skipped += 1;
            continue;
        }
        merge_row(&mut projects, row_no, row, checklist, &mut report, &mut ignored)?;
        report.rows_applied += 1;
    }

    let merged = Portfolio::new(portfolio.revision(), projects);
    merged.validate()?;
    warn_on_ignored_actuals(&merged, &ignored, &mut report);
    tracing::info!(
        rows = rows.len(),
        applied = report.rows_applied,
        skipped = report.rows_skipped,
        projects_created = report.projects_created,
        "merged upload"
    );
    Ok((merged, report))
}

fn merge_row(
    projects: &mut Vec<Project>,
    row_no: usize,
    row: &TabularRow,
    checklist: &MasterChecklist,
    report: &mut MergeReport,
    ignored: &mut Vec<IgnoredActual>,
) -> Result<()> {
    let row_error = |err: TrackerError| TrackerError::UploadRow {
        row: row_no,
        message: err.to_string(),
    };
    let name = row.project_name.trim();
    let project_type = match row.project_type.trim() {
        "" => None,
        raw => Some(raw.parse::<ProjectType>().map_err(row_error)?),
    };
    let dates = RowDates::parse(row_no, row)?;

    let matching: Vec<usize> = projects
        .iter()
        .enumerate()
        .filter(|(_, p)| p.name == name)
        .map(|(i, _)| i)
        .collect();
    let project_index = match matching.as_slice() {
        [] => {
            let Some(project_type) = project_type else {
                return Err(TrackerError::UploadRow {
                    row: row_no,
                    message: format!("new project {name:?} needs a Type"),
                });
            };
            let mut project = Project::new(name, project_type);
            project.deliverables = checklist.populate(project.id, project_type);
            projects.push(project);
            report.projects_created += 1;
            projects.len() - 1
        }
        [only] => *only,
        many => {
            return Err(TrackerError::AmbiguousName {
                name: name.to_string(),
                count: many.len(),
            });
        }
    };
    let project = &mut projects[project_index];
    let project_id = project.id;

    if let Some(project_type) = project_type {
        project.project_type = project_type;
    }
    for gateway in GatewayId::ALL {
        if let Some(plan) = dates.plans[gateway.index()] {
            project.gateways[gateway].plan = Some(plan);
        }
    }

    let module_name = row.module_name.trim();
    if module_name.is_empty() {
        return Ok(());
    }

    let (gateways, derived) = locate_entity(project, module_name, row.parent_module.trim(), report);
    for gateway in GatewayId::ALL {
        let record = &mut gateways[gateway];
        if let Some(plan) = dates.plans[gateway.index()] {
            record.plan = Some(plan);
        }
        if let Some(actual) = dates.actuals[gateway.index()] {
            if derived {
                ignored.push(IgnoredActual {
                    row_no,
                    project_id,
                    module: module_name.to_string(),
                    gateway,
                    value: actual,
                });
            } else {
                record.entered_actual = Some(actual);
            }
        }
        let ecn = row.ecn(gateway).trim();
        if !ecn.is_empty() {
            record.change_note = ecn.to_string();
        }
    }
    Ok(())
}

/// Compare ignored actuals with the rolled-up result, so a row carrying the
/// value its sub-modules derive in the same upload stays silent.
fn warn_on_ignored_actuals(
    merged: &Portfolio,
    ignored: &[IgnoredActual],
    report: &mut MergeReport,
) {
    for entry in ignored {
        let derived = merged
            .project(entry.project_id)
            .and_then(|p| p.module_by_name(&entry.module))
            .and_then(|m| m.gateways[entry.gateway].actual);
        if derived == Some(entry.value) {
            continue;
        }
        tracing::warn!(
            row = entry.row_no,
            gateway = %entry.gateway,
            module = %entry.module,
            "ignoring actual on derived module"
        );
        report.warnings.push(format!(
            "row {}: {} actual for {:?} ignored; it is derived from sub-modules",
            entry.row_no, entry.gateway, entry.module
        ));
    }
}

/// Find or create the row's module or sub-module. Returns its gateways and
/// whether its actual is derived.
fn locate_entity<'a>(
    project: &'a mut Project,
    module_name: &str,
    parent_name: &str,
    report: &mut MergeReport,
) -> (&'a mut GatewaySet, bool) {
    if !parent_name.is_empty() {
        if let Some(parent) = project.modules.iter().position(|m| m.name == parent_name) {
            let parent = &mut project.modules[parent];
            let sub = match parent.sub_modules.iter().position(|s| s.name == module_name) {
                Some(found) => found,
                None => {
                    parent.sub_modules.push(SubModule::new(module_name));
                    report.sub_modules_created += 1;
                    parent.sub_modules.len() - 1
                }
            };
            return (&mut parent.sub_modules[sub].gateways, false);
        }
        let warning = format!(
            "parent module {parent_name:?} not found in {:?}; {module_name:?} added as a top-level module",
            project.name
        );
        tracing::warn!(project_id = %project.id, parent = parent_name, "parent module not found");
        report.warnings.push(warning);
    }

    let index = match project.modules.iter().position(|m| m.name == module_name) {
        Some(found) => found,
        None => {
            project.modules.push(Module::new(module_name));
            report.modules_created += 1;
            project.modules.len() - 1
        }
    };
    let module = &mut project.modules[index];
    let derived = !module.is_leaf();
    (&mut module.gateways, derived)
}

//! Immutable portfolio snapshots and the edit transitions between them.
//!
//! A [`Portfolio`] is the whole working set plus the store revision it was
//! loaded at. Every edit takes `&Portfolio` and returns a new, rolled-up and
//! validated `Portfolio`; the input is never touched. The application keeps
//! one "current" snapshot and swaps it wholesale after each edit.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::checklist::MasterChecklist;
use crate::error::{Result, TrackerError};
use crate::gateway::{GatewayId, GatewaySet};
use crate::model::{DeliverableStatus, EntityId, Module, Project, ProjectType, SubModule};
use crate::readiness::{Readiness, readiness};
use crate::rollup::rollup_in_place;

/// Upper bound on seed modules for a new project.
pub const MAX_INITIAL_MODULES: usize = 20;

/// Input for [`Portfolio::create_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub project_type: ProjectType,
    pub d0_plan: NaiveDate,
    /// Number of `Module N` seeds, at most [`MAX_INITIAL_MODULES`].
    pub initial_modules: usize,
}

/// Fields a person may change on a deliverable. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverableUpdate {
    pub status: Option<DeliverableStatus>,
    pub evidence: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    revision: u64,
    projects: Vec<Project>,
}

impl Portfolio {
    /// Snapshot at `revision`; derived fields are recomputed.
    pub fn new(revision: u64, mut projects: Vec<Project>) -> Self {
        for project in &mut projects {
            rollup_in_place(project);
        }
        Self { revision, projects }
    }

    /// Store revision this snapshot is based on.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn into_projects(self) -> Vec<Project> {
        self.projects
    }

    pub fn project(&self, id: EntityId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// The single project called `name`.
    pub fn find_project(&self, name: &str) -> Result<&Project> {
        let mut matches = self.projects.iter().filter(|p| p.name == name);
        match (matches.next(), matches.count()) {
            (None, _) => Err(TrackerError::ProjectNotFound(name.to_string())),
            (Some(project), 0) => Ok(project),
            (Some(_), rest) => Err(TrackerError::AmbiguousName {
                name: name.to_string(),
                count: rest + 1,
            }),
        }
    }

    pub fn readiness(&self, project_id: EntityId) -> Result<Readiness> {
        self.project(project_id)
            .map(readiness)
            .ok_or_else(|| TrackerError::ProjectNotFound(project_id.to_string()))
    }

    /// Reject duplicate identities anywhere and duplicate project names.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for project in &self.projects {
            if !names.insert(project.name.as_str()) {
                return Err(TrackerError::DuplicateName {
                    entity: "project",
                    name: project.name.clone(),
                });
            }
            let module_ids = project.modules.iter().flat_map(|m| {
                std::iter::once(m.id).chain(m.sub_modules.iter().map(|s| s.id))
            });
            let deliverable_ids = project.deliverables.iter().map(|d| d.id());
            for id in std::iter::once(project.id)
                .chain(module_ids)
                .chain(deliverable_ids)
            {
                if !ids.insert(id) {
                    return Err(TrackerError::DuplicateId(id));
                }
            }
        }
        Ok(())
    }

    /// Apply `change` to a copy of the projects, then roll up and validate.
    fn edit<F>(&self, change: F) -> Result<Portfolio>
    where
        F: FnOnce(&mut Vec<Project>) -> Result<()>,
    {
        let mut projects = self.projects.clone();
        change(&mut projects)?;
        let next = Portfolio::new(self.revision, projects);
        next.validate()?;
        Ok(next)
    }

    pub fn create_project(
        &self,
        new: NewProject,
        checklist: &MasterChecklist,
    ) -> Result<Portfolio> {
        let name = checked_name(&new.name, "project")?;
        if new.initial_modules > MAX_INITIAL_MODULES {
            return Err(TrackerError::TooManyModules(new.initial_modules));
        }
        self.edit(|projects| {
            if projects.iter().any(|p| p.name == name) {
                return Err(TrackerError::DuplicateName {
                    entity: "project",
                    name,
                });
            }
            let mut project = Project::new(name, new.project_type);
            project.gateways = GatewaySet::with_plan(GatewayId::D0, new.d0_plan);
            project.modules = (1..=new.initial_modules)
                .map(|i| {
                    let mut module = Module::new(format!("Module {i}"));
                    module.gateways = GatewaySet::with_plan(GatewayId::D0, new.d0_plan);
                    module
                })
                .collect();
            project.deliverables = checklist.populate(project.id, new.project_type);
            tracing::info!(
                project_id = %project.id,
                modules = project.modules.len(),
                deliverables = project.deliverables.len(),
                "created project"
            );
            projects.push(project);
            Ok(())
        })
    }

    pub fn remove_project(&self, project_id: EntityId) -> Result<Portfolio> {
        self.edit(|projects| {
            let before = projects.len();
            projects.retain(|p| p.id != project_id);
            if projects.len() == before {
                return Err(TrackerError::ProjectNotFound(project_id.to_string()));
            }
            Ok(())
        })
    }

    pub fn rename_project(&self, project_id: EntityId, name: &str) -> Result<Portfolio> {
        let name = checked_name(name, "project")?;
        self.edit(|projects| {
            if projects.iter().any(|p| p.id != project_id && p.name == name) {
                return Err(TrackerError::DuplicateName {
                    entity: "project",
                    name,
                });
            }
            project_mut(projects, project_id)?.name = name;
            Ok(())
        })
    }

    /// Changes the type only; existing deliverables are kept as they are.
    pub fn set_project_type(
        &self,
        project_id: EntityId,
        project_type: ProjectType,
    ) -> Result<Portfolio> {
        self.edit(|projects| {
            project_mut(projects, project_id)?.project_type = project_type;
            Ok(())
        })
    }

    pub fn set_project_plan(
        &self,
        project_id: EntityId,
        gateway: GatewayId,
        plan: Option<NaiveDate>,
    ) -> Result<Portfolio> {
        self.edit(|projects| {
            project_mut(projects, project_id)?.gateways[gateway].plan = plan;
            Ok(())
        })
    }

    pub fn add_module(&self, project_id: EntityId, name: &str) -> Result<Portfolio> {
        let name = checked_name(name, "module")?;
        self.edit(|projects| {
            let project = project_mut(projects, project_id)?;
            if project.module_by_name(&name).is_some() {
                return Err(TrackerError::DuplicateName {
                    entity: "module",
                    name,
                });
            }
            project.modules.push(Module::new(name));
            Ok(())
        })
    }

    pub fn remove_module(&self, project_id: EntityId, module_id: EntityId) -> Result<Portfolio> {
        self.edit(|projects| {
            let project = project_mut(projects, project_id)?;
            let before = project.modules.len();
            project.modules.retain(|m| m.id != module_id);
            if project.modules.len() == before {
                return Err(TrackerError::ModuleNotFound(module_id.to_string()));
            }
            Ok(())
        })
    }

    pub fn add_sub_module(
        &self,
        project_id: EntityId,
        module_id: EntityId,
        name: &str,
    ) -> Result<Portfolio> {
        let name = checked_name(name, "sub-module")?;
        self.edit(|projects| {
            let module = module_mut(project_mut(projects, project_id)?, module_id)?;
            if module.sub_module_by_name(&name).is_some() {
                return Err(TrackerError::DuplicateName {
                    entity: "sub-module",
                    name,
                });
            }
            module.sub_modules.push(SubModule::new(name));
            Ok(())
        })
    }

    pub fn remove_sub_module(
        &self,
        project_id: EntityId,
        module_id: EntityId,
        sub_module_id: EntityId,
    ) -> Result<Portfolio> {
        self.edit(|projects| {
            let module = module_mut(project_mut(projects, project_id)?, module_id)?;
            let before = module.sub_modules.len();
            module.sub_modules.retain(|s| s.id != sub_module_id);
            if module.sub_modules.len() == before {
                return Err(TrackerError::SubModuleNotFound(sub_module_id.to_string()));
            }
            Ok(())
        })
    }

    /// Author the actual of a leaf module.
    pub fn set_module_actual(
        &self,
        project_id: EntityId,
        module_id: EntityId,
        gateway: GatewayId,
        actual: Option<NaiveDate>,
    ) -> Result<Portfolio> {
        self.edit(|projects| {
            let module = module_mut(project_mut(projects, project_id)?, module_id)?;
            if !module.is_leaf() {
                return Err(TrackerError::DerivedField {
                    module: module.name.clone(),
                });
            }
            module.gateways[gateway].entered_actual = actual;
            Ok(())
        })
    }

    pub fn set_sub_module_actual(
        &self,
        project_id: EntityId,
        module_id: EntityId,
        sub_module_id: EntityId,
        gateway: GatewayId,
        actual: Option<NaiveDate>,
    ) -> Result<Portfolio> {
        self.edit(|projects| {
            let module = module_mut(project_mut(projects, project_id)?, module_id)?;
            sub_module_mut(module, sub_module_id)?.gateways[gateway].entered_actual = actual;
            Ok(())
        })
    }

    /// Set the change note of a module, or of one of its sub-modules.
    pub fn set_change_note(
        &self,
        project_id: EntityId,
        module_id: EntityId,
        sub_module_id: Option<EntityId>,
        gateway: GatewayId,
        note: &str,
    ) -> Result<Portfolio> {
        let note = note.trim().to_string();
        self.edit(|projects| {
            let module = module_mut(project_mut(projects, project_id)?, module_id)?;
            let gateways = match sub_module_id {
                Some(id) => &mut sub_module_mut(module, id)?.gateways,
                None => &mut module.gateways,
            };
            gateways[gateway].change_note = note;
            Ok(())
        })
    }

    pub fn update_deliverable(
        &self,
        project_id: EntityId,
        deliverable_id: EntityId,
        update: DeliverableUpdate,
    ) -> Result<Portfolio> {
        self.edit(|projects| {
            let deliverable = project_mut(projects, project_id)?
                .deliverables
                .iter_mut()
                .find(|d| d.id() == deliverable_id)
                .ok_or(TrackerError::DeliverableNotFound(deliverable_id))?;
            if let Some(status) = update.status {
                deliverable.status = status;
            }
            if let Some(evidence) = update.evidence {
                deliverable.evidence = evidence;
            }
            if let Some(remarks) = update.remarks {
                deliverable.remarks = remarks;
            }
            Ok(())
        })
    }
}

fn checked_name(raw: &str, entity: &'static str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TrackerError::EmptyName { entity });
    }
    Ok(name.to_string())
}

pub(crate) fn project_mut(projects: &mut [Project], id: EntityId) -> Result<&mut Project> {
    projects
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| TrackerError::ProjectNotFound(id.to_string()))
}

fn module_mut(project: &mut Project, id: EntityId) -> Result<&mut Module> {
    project
        .modules
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| TrackerError::ModuleNotFound(id.to_string()))
}

fn sub_module_mut(module: &mut Module, id: EntityId) -> Result<&mut SubModule> {
    module
        .sub_modules
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| TrackerError::SubModuleNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::ChecklistItem;
    use crate::gateway::parse_date;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn checklist() -> MasterChecklist {
        MasterChecklist::new(vec![
            ChecklistItem {
                gateway: GatewayId::D0,
                name: "Charter".to_string(),
                major: true,
                minor: true,
            },
            ChecklistItem {
                gateway: GatewayId::D1,
                name: "DFMEA".to_string(),
                major: true,
                minor: false,
            },
        ])
    }

    fn with_project(name: &str, project_type: ProjectType, modules: usize) -> Portfolio {
        Portfolio::default()
            .create_project(
                NewProject {
                    name: name.to_string(),
                    project_type,
                    d0_plan: date("2024-01-01"),
                    initial_modules: modules,
                },
                &checklist(),
            )
            .unwrap()
    }

    #[test]
    fn create_project_seeds_modules_and_deliverables() {
        let portfolio = with_project("Falcon", ProjectType::Major, 3);
        let project = portfolio.find_project("Falcon").unwrap();

        assert_eq!(project.gateways[GatewayId::D0].plan, Some(date("2024-01-01")));
        let names: Vec<&str> = project.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Module 1", "Module 2", "Module 3"]);
        assert!(
            project
                .modules
                .iter()
                .all(|m| m.gateways[GatewayId::D0].plan == Some(date("2024-01-01")))
        );
        assert_eq!(project.deliverables.len(), 2);
    }

    #[test]
    fn create_project_rejects_bad_input() {
        let portfolio = with_project("Falcon", ProjectType::Minor, 0);
        let new = |name: &str, modules| NewProject {
            name: name.to_string(),
            project_type: ProjectType::Major,
            d0_plan: date("2024-01-01"),
            initial_modules: modules,
        };

        assert!(matches!(
            portfolio.create_project(new("Falcon", 1), &checklist()),
            Err(TrackerError::DuplicateName { .. })
        ));
        assert!(matches!(
            portfolio.create_project(new("  ", 1), &checklist()),
            Err(TrackerError::EmptyName { .. })
        ));
        assert!(matches!(
            portfolio.create_project(new("Kestrel", 21), &checklist()),
            Err(TrackerError::TooManyModules(21))
        ));
    }

    #[test]
    fn edits_leave_the_input_untouched() {
        let before = with_project("Falcon", ProjectType::Major, 1);
        let project = before.find_project("Falcon").unwrap();
        let module = project.modules[0].id;

        let after = before
            .set_module_actual(project.id, module, GatewayId::D0, Some(date("2024-01-05")))
            .unwrap();

        assert_eq!(before.projects()[0].gateways[GatewayId::D0].actual, None);
        assert_eq!(
            after.projects()[0].gateways[GatewayId::D0].actual,
            Some(date("2024-01-05"))
        );
        assert_eq!(after.revision(), before.revision());
    }

    #[test]
    fn derived_module_actual_is_not_editable() {
        let portfolio = with_project("Falcon", ProjectType::Major, 1);
        let project_id = portfolio.projects()[0].id;
        let module_id = portfolio.projects()[0].modules[0].id;
        let portfolio = portfolio.add_sub_module(project_id, module_id, "Doors").unwrap();

        let err = portfolio
            .set_module_actual(project_id, module_id, GatewayId::D0, Some(date("2024-01-05")))
            .unwrap_err();
        assert!(matches!(err, TrackerError::DerivedField { .. }));
    }

    #[test]
    fn sub_module_actual_rolls_up_and_clears_on_removal() {
        let portfolio = with_project("Falcon", ProjectType::Major, 1);
        let project_id = portfolio.projects()[0].id;
        let module_id = portfolio.projects()[0].modules[0].id;
        let portfolio = portfolio
            .set_module_actual(project_id, module_id, GatewayId::D0, Some(date("2024-01-02")))
            .unwrap()
            .add_sub_module(project_id, module_id, "Doors")
            .unwrap();
        let sub_id = portfolio.projects()[0].modules[0].sub_modules[0].id;

        let module = &portfolio.projects()[0].modules[0];
        assert_eq!(module.gateways[GatewayId::D0].actual, None);

        let portfolio = portfolio
            .set_sub_module_actual(
                project_id,
                module_id,
                sub_id,
                GatewayId::D0,
                Some(date("2024-01-09")),
            )
            .unwrap();
        assert_eq!(
            portfolio.projects()[0].gateways[GatewayId::D0].actual,
            Some(date("2024-01-09"))
        );

        let portfolio = portfolio.remove_sub_module(project_id, module_id, sub_id).unwrap();
        let module = &portfolio.projects()[0].modules[0];
        assert!(module.is_leaf());
        assert_eq!(module.gateways[GatewayId::D0].actual, None);
    }

    #[test]
    fn sibling_names_must_be_unique() {
        let portfolio = with_project("Falcon", ProjectType::Major, 1);
        let project_id = portfolio.projects()[0].id;
        assert!(matches!(
            portfolio.add_module(project_id, "Module 1"),
            Err(TrackerError::DuplicateName { entity: "module", .. })
        ));

        let portfolio = with_project("Kestrel", ProjectType::Minor, 0);
        assert!(matches!(
            portfolio.rename_project(Uuid::nil(), "X"),
            Err(TrackerError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn change_notes_on_module_and_sub_module() {
        let portfolio = with_project("Falcon", ProjectType::Major, 1);
        let project_id = portfolio.projects()[0].id;
        let module_id = portfolio.projects()[0].modules[0].id;
        let portfolio = portfolio
            .add_sub_module(project_id, module_id, "Doors")
            .unwrap();
        let sub_id = portfolio.projects()[0].modules[0].sub_modules[0].id;

        let portfolio = portfolio
            .set_change_note(project_id, module_id, None, GatewayId::D1, "ECN-7")
            .unwrap()
            .set_change_note(project_id, module_id, Some(sub_id), GatewayId::D1, " ECN-8 ")
            .unwrap();
        let module = &portfolio.projects()[0].modules[0];
        assert_eq!(module.gateways[GatewayId::D1].change_note, "ECN-7");
        assert_eq!(module.sub_modules[0].gateways[GatewayId::D1].change_note, "ECN-8");
    }

    #[test]
    fn deliverable_update_changes_only_mutable_fields() {
        let portfolio = with_project("Falcon", ProjectType::Major, 0);
        let project = &portfolio.projects()[0];
        let target = project.deliverables[0].clone();

        let portfolio = portfolio
            .update_deliverable(
                project.id,
                target.id(),
                DeliverableUpdate {
                    status: Some(DeliverableStatus::Completed),
                    evidence: Some("DOC-1".to_string()),
                    remarks: None,
                },
            )
            .unwrap();
        let updated = portfolio.projects()[0].deliverable(target.id()).unwrap();
        assert_eq!(updated.status, DeliverableStatus::Completed);
        assert_eq!(updated.evidence, "DOC-1");
        assert_eq!(updated.name(), target.name());
        assert_eq!(updated.gateway_stage(), target.gateway_stage());

        let r = portfolio.readiness(project.id).unwrap();
        assert_eq!(r.summary(), "1/1 Items");
    }

    #[test]
    fn validate_rejects_duplicate_ids_and_names() {
        let a = Project::new("Falcon", ProjectType::Major);
        let mut b = a.clone();
        b.name = "Kestrel".to_string();
        let err = Portfolio::new(0, vec![a.clone(), b]).validate().unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateId(id) if id == a.id));

        let c = Project::new("Falcon", ProjectType::Minor);
        let err = Portfolio::new(0, vec![a, c]).validate().unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateName { entity: "project", .. }));
    }

    #[test]
    fn find_project_reports_ambiguity() {
        let portfolio = Portfolio::new(
            0,
            vec![
                Project::new("Falcon", ProjectType::Major),
                Project::new("Falcon", ProjectType::Minor),
            ],
        );
        assert!(matches!(
            portfolio.find_project("Falcon"),
            Err(TrackerError::AmbiguousName { count: 2, .. })
        ));
        assert!(matches!(
            portfolio.find_project("Nope"),
            Err(TrackerError::ProjectNotFound(_))
        ));
    }
}

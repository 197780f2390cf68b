//! Master gateway checklist.
//!
//! The checklist is keyed by gateway stage and deliverable name, with one
//! applicability flag per project type:
//!
//! ```toml
//! [[item]]
//! gateway = "D0"
//! name = "Program charter signed"
//! major = true
//! minor = false
//! ```
//!
//! Carryover programs never receive deliverables.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TrackerError};
use crate::gateway::GatewayId;
use crate::model::{Deliverable, EntityId, ProjectType};

/// Checklist compiled into the binary.
const BUILTIN_CHECKLIST: &str = include_str!("../master_checklist.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChecklistItem {
    pub gateway: GatewayId,
    pub name: String,
    #[serde(default)]
    pub major: bool,
    #[serde(default)]
    pub minor: bool,
}

impl ChecklistItem {
    fn applies_to(&self, project_type: ProjectType) -> bool {
        match project_type {
            ProjectType::Major => self.major,
            ProjectType::Minor => self.minor,
            ProjectType::Carryover => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MasterChecklist {
    #[serde(default, rename = "item")]
    items: Vec<ChecklistItem>,
}

impl MasterChecklist {
    pub fn new(items: Vec<ChecklistItem>) -> Self {
        Self { items }
    }

    /// The checklist shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CHECKLIST, "built-in checklist")
    }

    /// Parse checklist TOML; `what` names the source in errors.
    pub fn parse(content: &str, what: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| TrackerError::ConfigParse {
            what: what.to_string(),
            source,
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| TrackerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let checklist = Self::parse(&content, &path.display().to_string())?;
        tracing::debug!(
            path = %path.display(),
            items = checklist.items.len(),
            "loaded master checklist"
        );
        Ok(checklist)
    }

    /// Explicit path if given, else the built-in checklist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// `(gateway, name)` pairs flagged for `project_type`, in checklist order.
    pub fn items_for(&self, project_type: ProjectType) -> Vec<(GatewayId, String)> {
        self.items
            .iter()
            .filter(|item| item.applies_to(project_type))
            .map(|item| (item.gateway, item.name.clone()))
            .collect()
    }

    /// Fresh pending deliverables for a new project.
    pub fn populate(&self, project_id: EntityId, project_type: ProjectType) -> Vec<Deliverable> {
        self.items_for(project_type)
            .into_iter()
            .map(|(gateway, name)| Deliverable::new(project_id, gateway, name))
            .collect()
    }
}

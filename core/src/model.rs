//! Program hierarchy: Project → Module → Sub-Module, plus deliverables.
//!
//! Identities are random v4 UUIDs: unique within the snapshot and never
//! reused. A deliverable's name and gateway stage are fixed at creation;
//! only status, evidence and remarks change afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::gateway::{GatewayId, GatewaySet};

/// Identity of any entity in the hierarchy.
pub type EntityId = Uuid;

/// Allocate a fresh identity.
pub fn new_id() -> EntityId {
    Uuid::new_v4()
}

/// Program classification; drives which checklist items apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    Major,
    Minor,
    Carryover,
}

impl ProjectType {
    pub const ALL: [ProjectType; 3] = [Self::Major, Self::Minor, Self::Carryover];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Carryover => "Carryover",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "carryover" => Ok(Self::Carryover),
            _ => Err(TrackerError::InvalidProjectType(s.to_string())),
        }
    }
}

/// Deliverable completion state.
///
/// Only the four canonical spellings are accepted; variants such as
/// `"N/A"` are rejected at the write boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeliverableStatus {
    #[default]
    Pending,
    #[serde(rename = "WIP")]
    Wip,
    Completed,
    #[serde(rename = "NA")]
    Na,
}

impl DeliverableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Wip => "WIP",
            Self::Completed => "Completed",
            Self::Na => "NA",
        }
    }

    /// Counts towards readiness.
    pub fn is_achieved(self) -> bool {
        matches!(self, Self::Completed | Self::Na)
    }
}

impl fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliverableStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "wip" => Ok(Self::Wip),
            "completed" => Ok(Self::Completed),
            "na" => Ok(Self::Na),
            _ => Err(TrackerError::InvalidStatus(s.to_string())),
        }
    }
}

/// Terminal node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubModule {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub gateways: GatewaySet,
}

impl SubModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            gateways: GatewaySet::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub gateways: GatewaySet,
    #[serde(default)]
    pub sub_modules: Vec<SubModule>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            gateways: GatewaySet::default(),
            sub_modules: Vec::new(),
        }
    }

    /// A module without sub-modules owns its actual dates.
    pub fn is_leaf(&self) -> bool {
        self.sub_modules.is_empty()
    }

    pub fn sub_module(&self, id: EntityId) -> Option<&SubModule> {
        self.sub_modules.iter().find(|s| s.id == id)
    }

    pub fn sub_module_by_name(&self, name: &str) -> Option<&SubModule> {
        self.sub_modules.iter().find(|s| s.name == name)
    }
}

/// A checklist item tracked for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    id: EntityId,
    project_id: EntityId,
    gateway_stage: GatewayId,
    name: String,
    #[serde(default)]
    pub status: DeliverableStatus,
    /// Evidence reference (link or document id).
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub remarks: String,
}

impl Deliverable {
    /// New pending deliverable.
    pub fn new(project_id: EntityId, gateway_stage: GatewayId, name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            project_id,
            gateway_stage,
            name: name.into(),
            status: DeliverableStatus::Pending,
            evidence: String::new(),
            remarks: String::new(),
        }
    }

    /// Rebuild a deliverable from stored fields.
    pub(crate) fn restore(
        id: EntityId,
        project_id: EntityId,
        gateway_stage: GatewayId,
        name: String,
    ) -> Self {
        Self {
            id,
            project_id,
            gateway_stage,
            name,
            status: DeliverableStatus::Pending,
            evidence: String::new(),
            remarks: String::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn project_id(&self) -> EntityId {
        self.project_id
    }

    pub fn gateway_stage(&self) -> GatewayId {
        self.gateway_stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Root of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub project_type: ProjectType,
    #[serde(default)]
    pub gateways: GatewaySet,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
}

impl Project {
    pub fn new(name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            project_type,
            gateways: GatewaySet::default(),
            modules: Vec::new(),
            deliverables: Vec::new(),
        }
    }

    pub fn module(&self, id: EntityId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn deliverable(&self, id: EntityId) -> Option<&Deliverable> {
        self.deliverables.iter().find(|d| d.id == id)
    }
}

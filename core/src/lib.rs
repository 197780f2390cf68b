//! Gateway rollup and readiness engine for program timelines.
//!
//! Programs are tracked as Project → Module → Sub-Module, each carrying plan
//! and actual dates for the five gateways D0..D4, plus a per-project
//! deliverables checklist gated by those stages.
//!
//! The engine (classification, rollup, readiness and dashboard reductions)
//! is pure. State changes go through [`Portfolio`] transitions and are
//! persisted as whole snapshots by a [`SnapshotStore`].

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod backup;
pub mod checklist;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod model;
pub mod portfolio;
pub mod readiness;
pub mod rollup;
pub mod status;
pub mod store;
pub mod tabular;

pub use backup::backup_database;
pub use checklist::{ChecklistItem, MasterChecklist};
pub use config::TrackerConfig;
pub use dashboard::{
    Adherence, FleetStats, ProjectBrief, ReleaseBreakdown, ScheduleDelay, adherence, fleet_stats,
    filter_by_type, headline_status, latest_released_gateway, release_breakdown, schedule_delays,
};
pub use error::{ErrorCategory, Result, TrackerError};
pub use gateway::{GatewayId, GatewayRecord, GatewaySet};
pub use model::{Deliverable, DeliverableStatus, EntityId, Module, Project, ProjectType, SubModule};
pub use portfolio::{DeliverableUpdate, NewProject, Portfolio};
pub use readiness::{
    Readiness, ReadinessBand, ReadinessThresholds, active_stages, display_readiness, readiness,
};
pub use rollup::{is_consistent, rollup, rollup_in_place};
pub use status::{GatewayStatus, HeadlineStatus, classify, classify_str, slip_days};
pub use store::{SnapshotStore, SqliteStore};
pub use tabular::{MergeReport, TabularRow, export_rows, merge_upload, template_headers};

/// gatetrack version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

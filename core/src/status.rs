//! Plan-vs-actual status classification.
//!
//! ```text
//! plan or actual absent        -> pending
//! diff = actual - plan (days)
//! diff <= 0                    -> on-track
//! 0 < diff <= 30               -> at-risk
//! diff > 30                    -> delay
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::gateway::parse_date;

/// Slip (in days) up to which a late gateway is "at risk" rather than delayed.
pub const AT_RISK_WINDOW_DAYS: i64 = 30;

/// Status of a single plan/actual pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatewayStatus {
    Pending,
    OnTrack,
    AtRisk,
    Delay,
}

impl GatewayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OnTrack => "on-track",
            Self::AtRisk => "at-risk",
            Self::Delay => "delay",
        }
    }

    /// Collapse to a headline status; nothing to judge counts as on track.
    pub fn headline(self) -> HeadlineStatus {
        match self {
            Self::Pending | Self::OnTrack => HeadlineStatus::OnTrack,
            Self::AtRisk => HeadlineStatus::AtRisk,
            Self::Delay => HeadlineStatus::Delay,
        }
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single status shown for a whole project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadlineStatus {
    OnTrack,
    AtRisk,
    Delay,
}

impl HeadlineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnTrack => "on-track",
            Self::AtRisk => "at-risk",
            Self::Delay => "delay",
        }
    }
}

impl fmt::Display for HeadlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed slip in whole days (`actual - plan`), if both are present.
pub fn slip_days(plan: Option<NaiveDate>, actual: Option<NaiveDate>) -> Option<i64> {
    Some((actual? - plan?).num_days())
}

/// Classify a plan/actual pair.
pub fn classify(plan: Option<NaiveDate>, actual: Option<NaiveDate>) -> GatewayStatus {
    match slip_days(plan, actual) {
        None => GatewayStatus::Pending,
        Some(diff) if diff <= 0 => GatewayStatus::OnTrack,
        Some(diff) if diff <= AT_RISK_WINDOW_DAYS => GatewayStatus::AtRisk,
        Some(_) => GatewayStatus::Delay,
    }
}

/// Classify raw date strings; unparseable input is treated as absent.
pub fn classify_str(plan: &str, actual: &str) -> GatewayStatus {
    classify(parse_date(plan), parse_date(actual))
}

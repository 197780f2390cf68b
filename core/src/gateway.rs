//! Program gateways (D0–D4) and the per-entity gateway records.
//!
//! Every project, module and sub-module carries exactly five gateway
//! records, one per [`GatewayId`], in the fixed order
//! Concept → Prototype → Pilot → Launch → Close.
//!
//! Dates are calendar days (`YYYY-MM-DD`) with no timezone. Parsing is
//! lenient on the read path: an empty or malformed date is simply absent.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TrackerError;

/// Canonical on-disk and on-wire date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One of the five fixed program gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GatewayId {
    D0,
    D1,
    D2,
    D3,
    D4,
}

impl GatewayId {
    /// All gateways in program order.
    pub const ALL: [GatewayId; 5] = [Self::D0, Self::D1, Self::D2, Self::D3, Self::D4];

    /// Position in program order (0..=4).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::D0 => "D0",
            Self::D1 => "D1",
            Self::D2 => "D2",
            Self::D3 => "D3",
            Self::D4 => "D4",
        }
    }

    /// Milestone name shown next to the id.
    pub fn label(self) -> &'static str {
        match self {
            Self::D0 => "Concept",
            Self::D1 => "Prototype",
            Self::D2 => "Pilot",
            Self::D3 => "Launch",
            Self::D4 => "Close",
        }
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayId {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D0" => Ok(Self::D0),
            "D1" => Ok(Self::D1),
            "D2" => Ok(Self::D2),
            "D3" => Ok(Self::D3),
            "D4" => Ok(Self::D4),
            _ => Err(TrackerError::InvalidGateway(s.to_string())),
        }
    }
}

/// Parse a date leniently: empty or malformed input yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok()
}

/// Parse a date at the write boundary: empty input is `None`, malformed
/// input is an error.
pub fn parse_date_strict(raw: &str) -> Result<Option<NaiveDate>, TrackerError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_date(raw)
        .map(Some)
        .ok_or_else(|| TrackerError::InvalidDate(raw.to_string()))
}

/// Render a date in canonical form, or `""` when absent.
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Serde adapter: `Option<NaiveDate>` as `"YYYY-MM-DD"` / `""`, lenient on read.
pub(crate) mod lenient_date {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_date(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_date))
    }
}

/// Plan/actual record for one gateway of one entity.
///
/// `entered_actual` is what a person typed; it only means something on a
/// true leaf. `actual` is the effective value and is written exclusively
/// by [`crate::rollup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRecord {
    #[serde(default, with = "lenient_date")]
    pub plan: Option<NaiveDate>,

    #[serde(default, with = "lenient_date")]
    pub entered_actual: Option<NaiveDate>,

    #[serde(default, with = "lenient_date")]
    pub actual: Option<NaiveDate>,

    /// Engineering change note; only meaningful on modules and sub-modules.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub change_note: String,
}

impl GatewayRecord {
    /// Whether this gateway has been released (has an effective actual).
    pub fn is_released(&self) -> bool {
        self.actual.is_some()
    }
}

/// The five gateway records of an entity, indexed by [`GatewayId`].
///
/// Serialized as a map keyed by gateway id; keys missing on input come back
/// as empty records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewaySet([GatewayRecord; 5]);

impl GatewaySet {
    /// A set with a single plan date filled in.
    pub fn with_plan(gateway: GatewayId, plan: NaiveDate) -> Self {
        let mut set = Self::default();
        set[gateway].plan = Some(plan);
        set
    }

    pub fn get(&self, gateway: GatewayId) -> &GatewayRecord {
        &self.0[gateway.index()]
    }

    pub fn get_mut(&mut self, gateway: GatewayId) -> &mut GatewayRecord {
        &mut self.0[gateway.index()]
    }

    /// Records in program order.
    pub fn iter(&self) -> impl Iterator<Item = (GatewayId, &GatewayRecord)> {
        GatewayId::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GatewayId, &mut GatewayRecord)> {
        GatewayId::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl Index<GatewayId> for GatewaySet {
    type Output = GatewayRecord;

    fn index(&self, gateway: GatewayId) -> &GatewayRecord {
        self.get(gateway)
    }
}

impl IndexMut<GatewayId> for GatewaySet {
    fn index_mut(&mut self, gateway: GatewayId) -> &mut GatewayRecord {
        self.get_mut(gateway)
    }
}

impl Serialize for GatewaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for GatewaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = BTreeMap::<GatewayId, GatewayRecord>::deserialize(deserializer)?;
        let mut set = Self::default();
        for (gateway, record) in set.iter_mut() {
            if let Some(found) = map.remove(&gateway) {
                *record = found;
            }
        }
        Ok(set)
    }
}

//! Raw usage statistics document, as published upstream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Occurrence counts keyed by label (item, move, ability, spread, teammate).
///
/// Upstream counts are weighted, so they arrive as decimals as often as integers.
pub type Counts = BTreeMap<String, f64>;

/// Per-entity record in a usage document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Fraction of teams containing the entity. Absent entities are not ranked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<f64>,

    #[serde(rename = "Raw count", default)]
    pub raw_count: u64,

    #[serde(rename = "Items", default)]
    pub items: Counts,

    #[serde(rename = "Moves", default)]
    pub moves: Counts,

    #[serde(rename = "Abilities", default)]
    pub abilities: Counts,

    /// Keyed by `"<Nature>:<HP>/<Atk>/<Def>/<SpA>/<SpD>/<Spe>"`.
    #[serde(rename = "Spreads", default)]
    pub spreads: Counts,

    #[serde(rename = "Teammates", default)]
    pub teammates: Counts,
}

impl EntityRecord {
    /// Create a record with only a usage fraction set.
    pub fn with_usage(usage: f64) -> Self {
        Self {
            usage: Some(usage),
            ..Default::default()
        }
    }
}

/// Document metadata block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub metagame: Option<String>,

    #[serde(default)]
    pub cutoff: Option<f64>,

    #[serde(rename = "number of battles", default)]
    pub number_of_battles: Option<u64>,
}

/// A full usage document for one (period, format).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatsDocument {
    #[serde(default)]
    pub info: Option<DocumentInfo>,

    #[serde(default)]
    pub data: BTreeMap<String, EntityRecord>,
}

impl RawStatsDocument {
    pub fn new(data: BTreeMap<String, EntityRecord>) -> Self {
        Self { info: None, data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.data.get(name)
    }

    /// Entities that carry a usage fraction, paired with it.
    pub fn usage_bearing(&self) -> impl Iterator<Item = (&str, &EntityRecord, f64)> {
        self.data
            .iter()
            .filter_map(|(name, record)| record.usage.map(|u| (name.as_str(), record, u)))
    }
}

impl FromIterator<(String, EntityRecord)> for RawStatsDocument {
    fn from_iter<I: IntoIterator<Item = (String, EntityRecord)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

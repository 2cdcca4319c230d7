//! Reference tables: base stats and the restricted list.
//!
//! Both are loaded once at startup and shared read-only behind traits, so
//! tests can substitute in-memory tables. A missing or unparseable file is a
//! degraded condition, not a failure: the loaders log a warning and fall back
//! to an empty table.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::BaseStats;

/// Errors that can occur while loading a reference file.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Base stat lookup by entity name.
pub trait BaseStatsLookup: Send + Sync {
    fn base_stats(&self, name: &str) -> Option<BaseStats>;
}

/// Membership in the restricted tier.
pub trait RestrictedList: Send + Sync {
    fn is_restricted(&self, name: &str) -> bool;
}

/// Lowercase ASCII alphanumerics only: `"Calyrex-Shadow"` → `"calyrexshadow"`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Deserialize)]
struct PokedexEntry {
    #[serde(default)]
    name: Option<String>,

    #[serde(rename = "baseStats", default)]
    base_stats: Option<BaseStats>,
}

/// Base stats keyed by id and display name.
#[derive(Debug, Clone, Default)]
pub struct Pokedex {
    entries: HashMap<String, BaseStats>,
}

impl Pokedex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pokedex keyed by id: `{"fluttermane": {"name": "Flutter Mane", "baseStats": {...}}}`.
    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        let raw: HashMap<String, PokedexEntry> = serde_json::from_str(json)?;

        let mut pokedex = Self::new();
        for (id, entry) in raw {
            let Some(stats) = entry.base_stats else {
                continue;
            };
            if let Some(name) = entry.name {
                pokedex.entries.insert(name, stats);
            }
            pokedex.entries.insert(id, stats);
        }
        Ok(pokedex)
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load, or fall back to an empty pokedex with a warning.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(pokedex) => {
                info!("Loaded {} pokedex entries from {:?}", pokedex.len(), path);
                pokedex
            }
            Err(e) => {
                warn!("Could not load pokedex from {:?}: {}", path, e);
                Self::new()
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, stats: BaseStats) {
        self.entries.insert(name.into(), stats);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BaseStatsLookup for Pokedex {
    fn base_stats(&self, name: &str) -> Option<BaseStats> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&normalize_name(name)))
            .copied()
    }
}

/// Restricted entity names.
#[derive(Debug, Clone, Default)]
pub struct RestrictedNames {
    names: HashSet<String>,
}

impl RestrictedNames {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a JSON array of names.
    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        let names: Vec<String> = serde_json::from_str(json)?;
        Ok(Self::from_names(names))
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load, or fall back to an empty list with a warning.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(list) => {
                info!("Loaded {} restricted names from {:?}", list.len(), path);
                list
            }
            Err(e) => {
                warn!("Could not load restricted list from {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl RestrictedList for RestrictedNames {
    fn is_restricted(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

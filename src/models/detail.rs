//! Per-entity detail models.

use serde::{Deserialize, Serialize};

use super::{BaseStats, StatSlot};

/// `(label, "<pct>%")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRow(pub String, pub String);

impl BreakdownRow {
    pub fn new(label: impl Into<String>, pct: impl Into<String>) -> Self {
        Self(label.into(), pct.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn pct(&self) -> &str {
        &self.1
    }
}

/// `(nature, "<pct>%", common_spreads)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatureRow(pub String, pub String, pub String);

impl NatureRow {
    pub fn nature(&self) -> &str {
        &self.0
    }

    pub fn pct(&self) -> &str {
        &self.1
    }

    pub fn common_spreads(&self) -> &str {
        &self.2
    }
}

/// `(stat_value, "<pct>%")`.
pub type DistributionRow = BreakdownRow;

/// The six reconstructed stat distributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDistributions {
    pub hp_distribution: Vec<DistributionRow>,
    pub attack_distribution: Vec<DistributionRow>,
    pub defense_distribution: Vec<DistributionRow>,
    pub sp_atk_distribution: Vec<DistributionRow>,
    pub sp_def_distribution: Vec<DistributionRow>,
    pub speed_distribution: Vec<DistributionRow>,
}

impl StatDistributions {
    pub fn get(&self, slot: StatSlot) -> &[DistributionRow] {
        match slot {
            StatSlot::Hp => &self.hp_distribution,
            StatSlot::Atk => &self.attack_distribution,
            StatSlot::Def => &self.defense_distribution,
            StatSlot::Spa => &self.sp_atk_distribution,
            StatSlot::Spd => &self.sp_def_distribution,
            StatSlot::Spe => &self.speed_distribution,
        }
    }

    pub fn set(&mut self, slot: StatSlot, rows: Vec<DistributionRow>) {
        let field = match slot {
            StatSlot::Hp => &mut self.hp_distribution,
            StatSlot::Atk => &mut self.attack_distribution,
            StatSlot::Def => &mut self.defense_distribution,
            StatSlot::Spa => &mut self.sp_atk_distribution,
            StatSlot::Spd => &mut self.sp_def_distribution,
            StatSlot::Spe => &mut self.speed_distribution,
        };
        *field = rows;
    }

    pub fn is_empty(&self) -> bool {
        StatSlot::ALL.iter().all(|slot| self.get(*slot).is_empty())
    }
}

/// Derived breakdown for one entity in one (period, format).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub name: String,
    pub period: String,
    pub format: String,
    pub usage_percentage: f64,
    pub raw_count: u64,
    pub is_restricted: bool,
    pub base_stats: Option<BaseStats>,

    pub items: Vec<BreakdownRow>,
    pub moves: Vec<BreakdownRow>,
    pub abilities: Vec<BreakdownRow>,
    pub natures: Vec<NatureRow>,

    #[serde(flatten)]
    pub distributions: StatDistributions,
}

impl EntityDetail {
    pub fn has_stat_distributions(&self) -> bool {
        !self.distributions.is_empty()
    }

    pub fn has_overview_data(&self) -> bool {
        !(self.items.is_empty()
            && self.moves.is_empty()
            && self.abilities.is_empty()
            && self.natures.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_row_serializes_as_tuple() {
        let row = BreakdownRow::new("Choice Specs", "66.67%");
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"["Choice Specs","66.67%"]"#);
    }

    #[test]
    fn test_nature_row_serializes_as_triple() {
        let row = NatureRow(
            "Timid".to_string(),
            "80.0%".to_string(),
            "4/0/0/252/0/252 (100.0%)".to_string(),
        );
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"["Timid","80.0%","4/0/0/252/0/252 (100.0%)"]"#);
    }

    #[test]
    fn test_distributions_set_and_get() {
        let mut dists = StatDistributions::default();
        assert!(dists.is_empty());

        dists.set(StatSlot::Spe, vec![BreakdownRow::new("187", "100.0%")]);
        assert_eq!(dists.get(StatSlot::Spe).len(), 1);
        assert!(dists.get(StatSlot::Hp).is_empty());
        assert!(!dists.is_empty());
    }

    #[test]
    fn test_detail_flags() {
        let mut detail = EntityDetail::default();
        assert!(!detail.has_overview_data());
        assert!(!detail.has_stat_distributions());

        detail.abilities.push(BreakdownRow::new("Protosynthesis", "100.0%"));
        assert!(detail.has_overview_data());
    }

    #[test]
    fn test_detail_serialization_flattens_distributions() {
        let detail = EntityDetail::default();
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json["speed_distribution"].is_array());
        assert!(json["hp_distribution"].is_array());
        assert!(json.get("distributions").is_none());
    }
}

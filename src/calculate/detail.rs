//! Per-entity breakdowns: items, moves, abilities, natures and stat spreads.

use std::collections::BTreeMap;

use crate::models::{
    BaseStats, BreakdownRow, Counts, EntityDetail, EntityRecord, NatureRow, StatDistributions,
    StatSlot,
};

use super::distribution::{calculate_distribution, parse_spread};
use super::{format_pct, percentage, ranked, round2, sort_ranked, total};

pub const TOP_ITEMS: usize = 10;
pub const TOP_MOVES: usize = 10;
pub const TOP_SPREADS_PER_NATURE: usize = 5;

/// Move percentages are scaled by four move slots against the summed move counts.
pub const MOVE_SCALE: f64 = 400.0;

/// Separates the common spreads listed for one nature.
pub const SPREAD_SEPARATOR: &str = "<br>";

/// Ranked `(label, "<pct>%")` rows, truncated to `limit` before zero rows are dropped.
pub fn breakdown(counts: &Counts, limit: Option<usize>, scale: f64) -> Vec<BreakdownRow> {
    let total = total(counts);
    if total <= 0.0 {
        return Vec::new();
    }

    let mut rows = ranked(counts);
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    rows.into_iter()
        .filter_map(|(label, count)| {
            percentage(count, total, scale).map(|pct| BreakdownRow::new(label, format_pct(pct)))
        })
        .collect()
}

pub fn calculate_items(record: &EntityRecord) -> Vec<BreakdownRow> {
    breakdown(&record.items, Some(TOP_ITEMS), 100.0)
}

pub fn calculate_moves(record: &EntityRecord) -> Vec<BreakdownRow> {
    breakdown(&record.moves, Some(TOP_MOVES), MOVE_SCALE)
}

pub fn calculate_abilities(record: &EntityRecord) -> Vec<BreakdownRow> {
    breakdown(&record.abilities, None, 100.0)
}

/// One row per nature with its share of all spreads and its most common EV
/// allocations. Malformed spread keys are left out of both.
pub fn calculate_natures(spreads: &Counts) -> Vec<NatureRow> {
    let mut nature_totals: BTreeMap<&str, f64> = BTreeMap::new();
    let mut nature_spreads: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();

    for (key, count) in spreads {
        let Some(spread) = parse_spread(key) else {
            continue;
        };
        *nature_totals.entry(spread.nature).or_default() += count;
        nature_spreads
            .entry(spread.nature)
            .or_default()
            .push((spread.ev_text, *count));
    }

    let total_spreads: f64 = nature_totals.values().sum();
    let mut natures: Vec<(&str, f64)> = nature_totals.into_iter().collect();
    sort_ranked(&mut natures);

    natures
        .into_iter()
        .filter_map(|(nature, nature_total)| {
            let pct = percentage(nature_total, total_spreads, 100.0)?;

            let mut variants = nature_spreads.remove(nature).unwrap_or_default();
            sort_ranked(&mut variants);
            let common_spreads = variants
                .into_iter()
                .take(TOP_SPREADS_PER_NATURE)
                .filter_map(|(evs, count)| {
                    percentage(count, nature_total, 100.0)
                        .map(|spread_pct| format!("{} ({})", evs, format_pct(spread_pct)))
                })
                .collect::<Vec<_>>()
                .join(SPREAD_SEPARATOR);

            Some(NatureRow(nature.to_string(), format_pct(pct), common_spreads))
        })
        .collect()
}

/// All six distributions, or none when base stats are unknown.
pub fn calculate_distributions(spreads: &Counts, base_stats: Option<&BaseStats>) -> StatDistributions {
    let mut distributions = StatDistributions::default();
    let Some(base_stats) = base_stats else {
        return distributions;
    };

    for slot in StatSlot::ALL {
        distributions.set(
            slot,
            calculate_distribution(spreads, Some(base_stats.get(slot)), slot),
        );
    }
    distributions
}

/// Derive the full breakdown for one entity record.
///
/// Identity fields (name, period, format, tier) are left for the caller.
pub fn calculate_entity_detail(record: &EntityRecord, base_stats: Option<&BaseStats>) -> EntityDetail {
    EntityDetail {
        usage_percentage: record.usage.map(|u| round2(u * 100.0)).unwrap_or(0.0),
        raw_count: record.raw_count,
        base_stats: base_stats.copied(),
        items: calculate_items(record),
        moves: calculate_moves(record),
        abilities: calculate_abilities(record),
        natures: calculate_natures(&record.spreads),
        distributions: calculate_distributions(&record.spreads, base_stats),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counts(entries: &[(&str, f64)]) -> Counts {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn flutter_mane() -> EntityRecord {
        EntityRecord {
            usage: Some(0.42),
            raw_count: 2048,
            items: counts(&[("Choice Specs", 100.0), ("Focus Sash", 50.0)]),
            moves: counts(&[
                ("Moonblast", 100.0),
                ("Shadow Ball", 100.0),
                ("Protect", 100.0),
                ("Dazzling Gleam", 100.0),
            ]),
            abilities: counts(&[("Protosynthesis", 150.0)]),
            spreads: counts(&[
                ("Timid:4/0/0/252/0/252", 80.0),
                ("Timid:252/0/0/4/0/252", 20.0),
                ("Modest:4/0/0/252/0/252", 50.0),
            ]),
            teammates: Counts::new(),
        }
    }

    fn flutter_base_stats() -> BaseStats {
        BaseStats {
            hp: 55,
            atk: 55,
            def: 55,
            spa: 135,
            spd: 135,
            spe: 135,
        }
    }

    #[test]
    fn test_items_breakdown() {
        assert_eq!(
            calculate_items(&flutter_mane()),
            vec![
                BreakdownRow::new("Choice Specs", "66.67%"),
                BreakdownRow::new("Focus Sash", "33.33%"),
            ]
        );
    }

    #[test]
    fn test_items_top_ten() {
        let many: Vec<(String, f64)> = (0..15).map(|i| (format!("Item {:02}", i), 10.0)).collect();
        let record = EntityRecord {
            items: many.into_iter().collect(),
            ..Default::default()
        };

        let rows = calculate_items(&record);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], BreakdownRow::new("Item 00", "6.67%"));
        assert_eq!(rows[9].label(), "Item 09");
    }

    #[test]
    fn test_moves_use_four_slot_scale() {
        let rows = calculate_moves(&flutter_mane());
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.pct() == "100.0%"));
        // Ties fall back to alphabetical order
        assert_eq!(rows[0].label(), "Dazzling Gleam");
        assert_eq!(rows[3].label(), "Shadow Ball");
    }

    #[test]
    fn test_abilities_are_not_capped() {
        let abilities: Vec<(String, f64)> =
            (0..12).map(|i| (format!("Ability {:02}", i), 1.0)).collect();
        let record = EntityRecord {
            abilities: abilities.into_iter().collect(),
            ..Default::default()
        };

        assert_eq!(calculate_abilities(&record).len(), 12);
    }

    #[test]
    fn test_empty_breakdowns() {
        let record = EntityRecord::default();
        assert!(calculate_items(&record).is_empty());
        assert!(calculate_moves(&record).is_empty());
        assert!(calculate_abilities(&record).is_empty());
        assert!(calculate_natures(&record.spreads).is_empty());
    }

    #[test]
    fn test_zero_count_rows_dropped() {
        let record = EntityRecord {
            items: counts(&[("Choice Specs", 100_000.0), ("Lum Berry", 1.0), ("None", 0.0)]),
            ..Default::default()
        };
        assert_eq!(
            calculate_items(&record),
            vec![BreakdownRow::new("Choice Specs", "100.0%")]
        );
    }

    #[test]
    fn test_natures_with_common_spreads() {
        let rows = calculate_natures(&flutter_mane().spreads);

        assert_eq!(
            rows,
            vec![
                NatureRow(
                    "Timid".to_string(),
                    "66.67%".to_string(),
                    "4/0/0/252/0/252 (80.0%)<br>252/0/0/4/0/252 (20.0%)".to_string(),
                ),
                NatureRow(
                    "Modest".to_string(),
                    "33.33%".to_string(),
                    "4/0/0/252/0/252 (100.0%)".to_string(),
                ),
            ]
        );
    }

    #[test]
    fn test_natures_keep_top_five_spreads() {
        let spreads: Vec<(String, f64)> = (0..8)
            .map(|i| (format!("Bold:252/0/{}/0/0/0", i * 4), (10 - i) as f64))
            .collect();
        let rows = calculate_natures(&spreads.into_iter().collect());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].common_spreads().split(SPREAD_SEPARATOR).count(), 5);
        assert!(rows[0].common_spreads().starts_with("252/0/0/0/0/0"));
    }

    #[test]
    fn test_natures_skip_malformed_keys() {
        let spreads = counts(&[("Timid:4/0/0/252/0/252", 10.0), ("Timid", 90.0)]);
        let rows = calculate_natures(&spreads);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pct(), "100.0%");
    }

    #[test]
    fn test_entity_detail_with_base_stats() {
        let base = flutter_base_stats();
        let detail = calculate_entity_detail(&flutter_mane(), Some(&base));

        assert_eq!(detail.usage_percentage, 42.0);
        assert_eq!(detail.raw_count, 2048);
        assert_eq!(detail.base_stats, Some(base));
        assert!(detail.has_overview_data());
        assert!(detail.has_stat_distributions());
        assert_eq!(
            detail.distributions.speed_distribution,
            vec![
                BreakdownRow::new("187", "33.33%"),
                BreakdownRow::new("205", "66.67%"),
            ]
        );
        assert_eq!(
            detail.distributions.hp_distribution,
            vec![
                BreakdownRow::new("131", "86.67%"),
                BreakdownRow::new("162", "13.33%"),
            ]
        );
    }

    #[test]
    fn test_entity_detail_without_base_stats_keeps_breakdowns() {
        let detail = calculate_entity_detail(&flutter_mane(), None);

        assert!(!detail.has_stat_distributions());
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.natures.len(), 2);
        assert!(detail.base_stats.is_none());
    }

    #[test]
    fn test_entity_detail_is_deterministic() {
        let base = flutter_base_stats();
        let first = calculate_entity_detail(&flutter_mane(), Some(&base));
        let second = calculate_entity_detail(&flutter_mane(), Some(&base));

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

//! Stat distributions reconstructed from EV spreads.

use std::collections::BTreeMap;

use crate::models::{Counts, DistributionRow, NatureEffect, StatSlot};

use super::{format_pct, percentage};

/// Level used by the reconstruction formula.
const LEVEL: u32 = 50;

/// IV assumed for every stat unless a lowering nature meets a zero EV.
const DEFAULT_IV: u32 = 31;

/// A spread key split into nature and EVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpread<'a> {
    pub nature: &'a str,
    /// The EV segment exactly as written in the key.
    pub ev_text: &'a str,
    pub evs: [u32; 6],
}

/// Parse `"<Nature>:<HP>/<Atk>/<Def>/<SpA>/<SpD>/<Spe>"`.
///
/// Returns `None` unless there are exactly two colon-delimited parts and
/// exactly six integer EVs.
pub fn parse_spread(key: &str) -> Option<ParsedSpread<'_>> {
    let mut parts = key.split(':');
    let nature = parts.next()?;
    let ev_text = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let mut evs = [0u32; 6];
    let mut segments = ev_text.split('/');
    for ev in evs.iter_mut() {
        *ev = segments.next()?.parse().ok()?;
    }
    if segments.next().is_some() {
        return None;
    }

    Some(ParsedSpread {
        nature,
        ev_text,
        evs,
    })
}

/// Level 50 stat value for one spread slot.
///
/// EVs are not range-checked; `None` when the value does not fit in a `u32`.
pub fn calculate_stat(base_stat: u32, ev: u32, nature: &str, slot: StatSlot) -> Option<u32> {
    let effect = slot.nature_effect(nature);

    let iv = if slot != StatSlot::Hp && effect == NatureEffect::Lowers && ev == 0 {
        0
    } else {
        DEFAULT_IV
    };

    let base_term = base_stat
        .checked_mul(2)?
        .checked_add(iv)?
        .checked_add(ev / 4)?
        .checked_mul(LEVEL)?
        / 100;

    match slot {
        StatSlot::Hp => base_term.checked_add(LEVEL + 10),
        _ => {
            let value = (base_term.checked_add(5)? as f64 * effect.multiplier()).floor();
            (value <= u32::MAX as f64).then_some(value as u32)
        }
    }
}

/// Bucket every spread by its reconstructed stat value.
///
/// Rows come back ascending by stat value; malformed spread keys and spreads
/// whose stat overflows are skipped, zero-percentage buckets dropped. No base
/// stat means no rows.
pub fn calculate_distribution(
    spreads: &Counts,
    base_stat: Option<u32>,
    slot: StatSlot,
) -> Vec<DistributionRow> {
    let Some(base_stat) = base_stat else {
        return Vec::new();
    };

    let mut buckets: BTreeMap<u32, f64> = BTreeMap::new();
    for (key, count) in spreads {
        let Some(spread) = parse_spread(key) else {
            continue;
        };
        let Some(value) =
            calculate_stat(base_stat, spread.evs[slot.ev_index()], spread.nature, slot)
        else {
            continue;
        };
        *buckets.entry(value).or_default() += count;
    }

    let total: f64 = buckets.values().sum();

    buckets
        .into_iter()
        .filter_map(|(value, count)| {
            percentage(count, total, 100.0)
                .map(|pct| DistributionRow::new(value.to_string(), format_pct(pct)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spreads(entries: &[(&str, f64)]) -> Counts {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_parse_spread() {
        let spread = parse_spread("Timid:4/0/0/252/0/252").unwrap();
        assert_eq!(spread.nature, "Timid");
        assert_eq!(spread.ev_text, "4/0/0/252/0/252");
        assert_eq!(spread.evs, [4, 0, 0, 252, 0, 252]);
    }

    #[test]
    fn test_parse_spread_rejects_malformed() {
        assert!(parse_spread("Timid").is_none());
        assert!(parse_spread("Timid:4/0/0/252/0").is_none());
        assert!(parse_spread("Timid:4/0/0/252/0/252/0").is_none());
        assert!(parse_spread("Timid:4/0/x/252/0/252").is_none());
        assert!(parse_spread("Timid:4/0/0/252/0/252:extra").is_none());
        assert!(parse_spread("Timid:-4/0/0/252/0/252").is_none());
    }

    #[test]
    fn test_calculate_stat_hp() {
        // Flutter Mane, base 55 HP, 4 EVs
        assert_eq!(calculate_stat(55, 4, "Timid", StatSlot::Hp), Some(131));
        assert_eq!(calculate_stat(55, 252, "Timid", StatSlot::Hp), Some(162));
    }

    #[test]
    fn test_calculate_stat_boosting_nature() {
        // base 135 Spe, 252 EVs, Timid: floor(187 * 1.1)
        assert_eq!(calculate_stat(135, 252, "Timid", StatSlot::Spe), Some(205));
        assert_eq!(calculate_stat(135, 252, "Modest", StatSlot::Spe), Some(187));
    }

    #[test]
    fn test_calculate_stat_lowering_nature_zero_ev_uses_zero_iv() {
        // base 55 Atk, Timid, 0 EVs: IV 0, floor(60 * 0.9)
        assert_eq!(calculate_stat(55, 0, "Timid", StatSlot::Atk), Some(54));
        // Any EV investment keeps the 31 IV
        assert_eq!(calculate_stat(135, 4, "Brave", StatSlot::Spe), Some(140));
    }

    #[test]
    fn test_calculate_stat_hp_ignores_nature() {
        assert_eq!(
            calculate_stat(100, 0, "Bold", StatSlot::Hp),
            calculate_stat(100, 0, "Hardy", StatSlot::Hp)
        );
    }

    #[test]
    fn test_stat_monotonic_in_ev() {
        let natures = ["Hardy", "Timid", "Brave", "Bold", "Modest", "Careful"];
        for slot in StatSlot::ALL {
            for nature in natures {
                for base in [1, 45, 100, 135, 255] {
                    let mut previous = 0;
                    for ev in 0..=252 {
                        let value = calculate_stat(base, ev, nature, slot).unwrap();
                        assert!(
                            value >= previous,
                            "{} {} base {} ev {}: {} < {}",
                            slot,
                            nature,
                            base,
                            ev,
                            value,
                            previous
                        );
                        previous = value;
                    }
                }
            }
        }
    }

    #[test]
    fn test_distribution_buckets_ascending() {
        let spreads = spreads(&[
            ("Timid:4/0/0/252/0/252", 60.0),
            ("Modest:4/0/0/252/0/252", 30.0),
            ("Timid:252/0/4/0/0/252", 10.0),
        ]);

        let rows = calculate_distribution(&spreads, Some(135), StatSlot::Spe);
        assert_eq!(
            rows,
            vec![
                DistributionRow::new("187", "30.0%"),
                DistributionRow::new("205", "70.0%"),
            ]
        );
    }

    #[test]
    fn test_distribution_skips_malformed_keys() {
        let spreads = spreads(&[
            ("Timid:4/0/0/252/0/252", 50.0),
            ("garbage", 50.0),
            ("Timid:1/2/3", 50.0),
        ]);

        let rows = calculate_distribution(&spreads, Some(55), StatSlot::Hp);
        assert_eq!(rows, vec![DistributionRow::new("131", "100.0%")]);
    }

    #[test]
    fn test_distribution_drops_zero_buckets() {
        let spreads = spreads(&[
            ("Timid:4/0/0/252/0/252", 100_000.0),
            ("Timid:252/0/0/252/0/4", 1.0),
        ]);

        let rows = calculate_distribution(&spreads, Some(55), StatSlot::Hp);
        assert_eq!(rows, vec![DistributionRow::new("131", "100.0%")]);
    }

    #[test]
    fn test_calculate_stat_oversized_ev() {
        assert_eq!(calculate_stat(135, u32::MAX, "Timid", StatSlot::Spe), None);
        assert_eq!(calculate_stat(55, u32::MAX, "Timid", StatSlot::Hp), None);
        // Out of the usual range but still computable
        assert_eq!(calculate_stat(55, 1000, "Hardy", StatSlot::Hp), Some(255));
    }

    #[test]
    fn test_distribution_skips_overflowing_spreads() {
        let spreads = spreads(&[
            ("Timid:4/0/0/252/0/252", 10.0),
            ("Timid:4/0/0/252/0/4294967295", 1.0),
        ]);

        let rows = calculate_distribution(&spreads, Some(135), StatSlot::Spe);
        assert_eq!(rows, vec![DistributionRow::new("205", "100.0%")]);
    }

    #[test]
    fn test_distribution_missing_base_stat_or_spreads() {
        let spreads = spreads(&[("Timid:4/0/0/252/0/252", 1.0)]);
        assert!(calculate_distribution(&spreads, None, StatSlot::Spe).is_empty());
        assert!(calculate_distribution(&Counts::new(), Some(100), StatSlot::Spe).is_empty());
    }
}

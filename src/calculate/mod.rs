//! Statistics calculation engine.
//!
//! Pure derivations over a raw usage document:
//! - Stat distributions reconstructed from EV spreads
//! - Per-entity item, move, ability and nature breakdowns
//! - Usage rankings and restricted pair co-occurrence
//!
//! Every ranked list is ordered by descending count, ties broken by ascending
//! label, so repeated runs over the same input produce identical output.

pub mod detail;
pub mod distribution;
pub mod usage;

pub use detail::calculate_entity_detail;
pub use distribution::{calculate_distribution, calculate_stat};
pub use usage::{aggregate_usage, pair_key};

use crate::models::Counts;

/// Round half away from zero to 2 decimal places.
///
/// Rounds the decimal value the float stands for, so `1.005` (stored as
/// `1.00499999...`) becomes `1.01`.
pub fn round2(value: f64) -> f64 {
    if value < 0.0 {
        return -round2(-value);
    }

    let mut scaled = (value * 100.0).round();
    if (scaled + 0.5) / 100.0 <= value {
        scaled += 1.0;
    }
    scaled / 100.0
}

/// Render a percentage rounded to 2 places, always with a fractional digit.
///
/// `42.0` renders as `"42.0%"`, `100.0 / 3.0` as `"33.33%"`.
pub fn format_pct(value: f64) -> String {
    let rounded = round2(value);
    if rounded.fract() == 0.0 {
        format!("{:.1}%", rounded)
    } else {
        format!("{}%", rounded)
    }
}

/// `count / total * scale`, rounded. `None` when the total is empty or the
/// rounded value is zero, so callers can drop the row.
pub fn percentage(count: f64, total: f64, scale: f64) -> Option<f64> {
    if total <= 0.0 {
        return None;
    }
    let pct = round2(count / total * scale);
    if pct <= 0.0 {
        None
    } else {
        Some(pct)
    }
}

/// Entries sorted by descending count, then ascending label.
pub fn ranked(counts: &Counts) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    sort_ranked(&mut entries);
    entries
}

/// Sort `(label, count)` pairs by descending count, then ascending label.
pub fn sort_ranked<L: Ord>(entries: &mut [(L, f64)]) {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// Sum of all counts.
pub fn total(counts: &Counts) -> f64 {
    counts.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pct_thirds() {
        assert_eq!(format_pct(100.0 / 3.0), "33.33%");
        assert_eq!(format_pct(200.0 / 3.0), "66.67%");
    }

    #[test]
    fn test_format_pct_whole_numbers_keep_a_decimal() {
        assert_eq!(format_pct(42.0), "42.0%");
        assert_eq!(format_pct(100.0), "100.0%");
        assert_eq!(format_pct(0.42 * 100.0), "42.0%");
    }

    #[test]
    fn test_format_pct_single_decimal() {
        assert_eq!(format_pct(12.5), "12.5%");
        assert_eq!(format_pct(12.499), "12.5%");
    }

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(2.675_1), 2.68);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn test_round2_decimal_halves_round_up() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(0.285), 0.29);
        assert_eq!(round2(201.0 / 20000.0 * 100.0), 1.01);
        assert_eq!(round2(-1.005), -1.01);
        assert_eq!(round2(1.0049), 1.0);
    }

    #[test]
    fn test_format_pct_decimal_half() {
        assert_eq!(format_pct(201.0 / 20000.0 * 100.0), "1.01%");
        assert_eq!(format_pct(0.285), "0.29%");
        assert_eq!(percentage(201.0, 20000.0, 100.0), Some(1.01));
    }

    #[test]
    fn test_percentage_drops_zero() {
        assert_eq!(percentage(1.0, 100_000.0, 100.0), None);
        assert_eq!(percentage(5.0, 100_000.0, 100.0), Some(0.01));
        assert_eq!(percentage(1.0, 0.0, 100.0), None);
        assert_eq!(percentage(0.0, 10.0, 100.0), None);
    }

    #[test]
    fn test_ranked_orders_by_count_then_label() {
        let counts: Counts = [
            ("Protect".to_string(), 50.0),
            ("Moonblast".to_string(), 90.0),
            ("Icy Wind".to_string(), 50.0),
        ]
        .into_iter()
        .collect();

        let order: Vec<&str> = ranked(&counts).into_iter().map(|(l, _)| l).collect();
        assert_eq!(order, vec!["Moonblast", "Icy Wind", "Protect"]);
    }

    #[test]
    fn test_total() {
        let counts: Counts = [("a".to_string(), 1.5), ("b".to_string(), 2.5)]
            .into_iter()
            .collect();
        assert_eq!(total(&counts), 4.0);
        assert_eq!(total(&Counts::new()), 0.0);
    }
}

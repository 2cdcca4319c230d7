//! Usage rankings and restricted pair co-occurrence.

use std::collections::BTreeMap;

use crate::models::{PairEntry, RankedEntry, RawStatsDocument, UsageCharts, UsageEntry, UsageSummary};
use crate::reference::RestrictedList;

use super::{percentage, round2, sort_ranked};

pub const TOP_REGULAR: usize = 12;
pub const TOP_RESTRICTED: usize = 8;
pub const TOP_PAIRS: usize = 8;

/// Canonical, order-independent key for two co-occurring entities.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{} + {}", a, b)
    } else {
        format!("{} + {}", b, a)
    }
}

/// Usage-bearing entities by descending usage, ties by name.
fn ranked_usage(document: &RawStatsDocument) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = document
        .usage_bearing()
        .map(|(name, _, usage)| (name, usage))
        .collect();
    sort_ranked(&mut entries);
    entries
}

fn usage_entry(name: &str, usage: f64) -> UsageEntry {
    UsageEntry {
        name: name.to_string(),
        usage_percentage: round2(usage * 100.0),
    }
}

/// Top restricted pairs by summed teammate counts.
///
/// Both directions of a pairing contribute, so the shares are relative to
/// every restricted-with-restricted teammate count in the document.
pub fn calculate_restricted_pairs(
    document: &RawStatsDocument,
    restricted: &dyn RestrictedList,
) -> Vec<PairEntry> {
    let mut pair_counts: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_teams = 0.0;

    for (name, record) in &document.data {
        if !restricted.is_restricted(name) {
            continue;
        }
        for (teammate, count) in &record.teammates {
            if !restricted.is_restricted(teammate) {
                continue;
            }
            *pair_counts.entry(pair_key(name, teammate)).or_default() += count;
            total_teams += count;
        }
    }

    let mut pairs: Vec<(String, f64)> = pair_counts.into_iter().collect();
    sort_ranked(&mut pairs);

    pairs
        .into_iter()
        .take(TOP_PAIRS)
        .filter_map(|(pair_name, count)| {
            percentage(count, total_teams, 100.0).map(|usage_percentage| PairEntry {
                pair_name,
                usage_percentage,
            })
        })
        .collect()
}

/// Rank a document into chart lists and the full sidebar list.
pub fn aggregate_usage(document: &RawStatsDocument, restricted: &dyn RestrictedList) -> UsageSummary {
    let ranked = ranked_usage(document);

    let (restricted_entries, regular_entries): (Vec<_>, Vec<_>) = ranked
        .iter()
        .partition(|(name, _)| restricted.is_restricted(name));

    let top_regular = regular_entries
        .iter()
        .take(TOP_REGULAR)
        .map(|(name, usage)| usage_entry(name, *usage))
        .collect();

    let top_restricted = restricted_entries
        .iter()
        .take(TOP_RESTRICTED)
        .map(|(name, usage)| usage_entry(name, *usage))
        .collect();

    let ranked_list = ranked
        .iter()
        .map(|(name, usage)| RankedEntry {
            name: name.to_string(),
            usage_percentage: round2(usage * 100.0),
            is_restricted: restricted.is_restricted(name),
        })
        .collect();

    UsageSummary {
        charts: UsageCharts {
            top_regular,
            top_restricted,
            restricted_pairs: calculate_restricted_pairs(document, restricted),
        },
        ranked_list,
    }
}

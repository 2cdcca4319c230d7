//! Usage ranking models.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{DocumentInfo, RawStatsDocument};
use crate::calculate::format_pct;

/// A ranked entity with its usage percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub name: String,
    pub usage_percentage: f64,
}

impl UsageEntry {
    /// `(name, "<pct>%")` for display.
    pub fn formatted(&self) -> (String, String) {
        (self.name.clone(), format_pct(self.usage_percentage))
    }
}

/// Co-occurrence of two restricted entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEntry {
    pub pair_name: String,
    pub usage_percentage: f64,
}

impl PairEntry {
    pub fn formatted(&self) -> (String, String) {
        (self.pair_name.clone(), format_pct(self.usage_percentage))
    }
}

/// Sidebar entry: every usage-bearing entity, tagged with its tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub usage_percentage: f64,
    pub is_restricted: bool,
}

/// Labels and values for one chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Chart projection of [`UsageCharts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub regular: ChartSeries,
    pub restricted: ChartSeries,
    pub pairs: ChartSeries,
}

/// Top-N usage lists for a format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageCharts {
    pub top_regular: Vec<UsageEntry>,
    pub top_restricted: Vec<UsageEntry>,
    pub restricted_pairs: Vec<PairEntry>,
}

impl UsageCharts {
    pub fn has_regular(&self) -> bool {
        !self.top_regular.is_empty()
    }

    pub fn has_restricted(&self) -> bool {
        !self.top_restricted.is_empty()
    }

    pub fn has_restricted_pairs(&self) -> bool {
        !self.restricted_pairs.is_empty()
    }

    pub fn chart_data(&self) -> ChartData {
        fn series<'a>(entries: impl Iterator<Item = (&'a str, f64)>) -> ChartSeries {
            let (labels, values) = entries.map(|(l, v)| (l.to_string(), v)).unzip();
            ChartSeries { labels, values }
        }

        ChartData {
            regular: series(
                self.top_regular
                    .iter()
                    .map(|e| (e.name.as_str(), e.usage_percentage)),
            ),
            restricted: series(
                self.top_restricted
                    .iter()
                    .map(|e| (e.name.as_str(), e.usage_percentage)),
            ),
            pairs: series(
                self.restricted_pairs
                    .iter()
                    .map(|p| (p.pair_name.as_str(), p.usage_percentage)),
            ),
        }
    }
}

/// Output of the usage aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub charts: UsageCharts,
    pub ranked_list: Vec<RankedEntry>,
}

/// Cached overview for one (period, format).
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub period: String,
    pub format: String,

    /// Source document, kept for detail derivation.
    #[serde(skip)]
    pub document: Arc<RawStatsDocument>,

    pub info: Option<DocumentInfo>,
    pub usage_charts: ChartData,
    pub ranked_list: Vec<RankedEntry>,
}

impl Overview {
    pub fn new(
        period: impl Into<String>,
        format: impl Into<String>,
        document: Arc<RawStatsDocument>,
        summary: UsageSummary,
    ) -> Self {
        Self {
            period: period.into(),
            format: format.into(),
            info: document.info.clone(),
            document,
            usage_charts: summary.charts.chart_data(),
            ranked_list: summary.ranked_list,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charts() -> UsageCharts {
        UsageCharts {
            top_regular: vec![
                UsageEntry {
                    name: "Flutter Mane".to_string(),
                    usage_percentage: 42.0,
                },
                UsageEntry {
                    name: "Incineroar".to_string(),
                    usage_percentage: 38.5,
                },
            ],
            top_restricted: vec![],
            restricted_pairs: vec![PairEntry {
                pair_name: "Koraidon + Miraidon".to_string(),
                usage_percentage: 40.0,
            }],
        }
    }

    #[test]
    fn test_usage_entry_formatted() {
        let entry = &charts().top_regular[0];
        assert_eq!(
            entry.formatted(),
            ("Flutter Mane".to_string(), "42.0%".to_string())
        );
    }

    #[test]
    fn test_chart_data_projection() {
        let data = charts().chart_data();

        assert_eq!(data.regular.labels, vec!["Flutter Mane", "Incineroar"]);
        assert_eq!(data.regular.values, vec![42.0, 38.5]);
        assert!(data.restricted.labels.is_empty());
        assert_eq!(data.pairs.labels, vec!["Koraidon + Miraidon"]);
    }

    #[test]
    fn test_chart_presence_flags() {
        let c = charts();
        assert!(c.has_regular());
        assert!(!c.has_restricted());
        assert!(c.has_restricted_pairs());
    }

    #[test]
    fn test_overview_serialization_skips_document() {
        let doc = Arc::new(RawStatsDocument::default());
        let overview = Overview::new(
            "2024-06",
            "gen9vgc2024regg-bo3-1760.json",
            doc,
            UsageSummary::default(),
        );

        let json = serde_json::to_value(&overview).unwrap();
        assert!(json.get("document").is_none());
        assert_eq!(json["period"], "2024-06");
        assert!(json["usage_charts"]["regular"]["labels"].is_array());
        assert!(overview.is_empty());
    }
}

//! One chart per interaction: `filter -> aggregate -> shape`.

use serde::{Deserialize, Serialize};

use crate::chart::{self, ChartKind, Renderable, ShapeInput, ShapeOptions};
use crate::config::DashboardConfig;
use crate::data::aggregate::{aggregate, AggregateOp};
use crate::data::catalog::{Catalog, Dimension};
use crate::data::filter::{filter, FilterSelection};
use crate::data::model::{Dataset, Metric};

/// The charts the dashboard can draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartRequest {
    /// Mean of a metric per country on the world map.
    Choropleth { metric: Metric },
    /// Countries with the highest mean; `n` falls back to the configured top-N.
    TopCountries { metric: Metric, n: Option<usize> },
    /// Mean of a metric per continent.
    ContinentAverages { metric: Metric },
    /// Yearly mean, one series per value of `by` (a single series when unset).
    Trend {
        metric: Metric,
        by: Option<Dimension>,
    },
    /// Per-country means of two metrics against each other.
    Scatter { x: Metric, y: Metric },
    /// Correlations between `features`; every metric with data when empty.
    Heatmap { features: Vec<Metric> },
    /// Risk factor levels through continents to levels of `target`.
    Sankey { target: Metric },
}

impl ChartRequest {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartRequest::Choropleth { .. } => ChartKind::Choropleth,
            ChartRequest::TopCountries { .. } | ChartRequest::ContinentAverages { .. } => {
                ChartKind::Bar
            }
            ChartRequest::Trend { .. } => ChartKind::Line,
            ChartRequest::Scatter { .. } => ChartKind::Scatter,
            ChartRequest::Heatmap { .. } => ChartKind::Heatmap,
            ChartRequest::Sankey { .. } => ChartKind::Sankey,
        }
    }
}

impl Default for ChartRequest {
    fn default() -> Self {
        ChartRequest::Choropleth {
            metric: Metric::MortalityRate,
        }
    }
}

/// Evaluate one request against the dataset. Never fails: empty selections
/// and degenerate data come back as flagged renderables.
pub fn run(
    dataset: &Dataset,
    catalog: &Catalog,
    config: &DashboardConfig,
    selection: &FilterSelection,
    request: &ChartRequest,
) -> Renderable {
    let subset = filter(dataset, selection);
    let options = ShapeOptions {
        catalog,
        guard: config.correlation,
        regression: config.regression,
    };
    let kind = request.kind();

    let renderable = match request {
        ChartRequest::Choropleth { metric } => {
            let result = aggregate(&subset, &[Dimension::Country], *metric, AggregateOp::Mean);
            chart::shape(ShapeInput::Aggregated(&result), kind, &options)
        }
        ChartRequest::TopCountries { metric, n } => {
            let n = n.unwrap_or(config.top_n);
            if n == 0 {
                return Renderable::insufficient(
                    format!("Top {n} by {}", metric.label()),
                    "top-N needs at least one country",
                );
            }
            let result = aggregate(&subset, &[Dimension::Country], *metric, AggregateOp::TopN(n));
            chart::shape(ShapeInput::Aggregated(&result), kind, &options)
        }
        ChartRequest::ContinentAverages { metric } => {
            let result = aggregate(&subset, &[Dimension::Region], *metric, AggregateOp::Mean);
            chart::shape(ShapeInput::Aggregated(&result), kind, &options)
        }
        ChartRequest::Trend { metric, by } => {
            let group_by: Vec<Dimension> = by
                .iter()
                .copied()
                .filter(|d| *d != Dimension::Year)
                .chain([Dimension::Year])
                .collect();
            let result = aggregate(&subset, &group_by, *metric, AggregateOp::Mean);
            chart::shape(ShapeInput::Aggregated(&result), kind, &options)
        }
        ChartRequest::Scatter { x, y } => {
            let xs = aggregate(&subset, &[Dimension::Country], *x, AggregateOp::Mean);
            let ys = aggregate(&subset, &[Dimension::Country], *y, AggregateOp::Mean);
            chart::shape(ShapeInput::Paired { x: &xs, y: &ys }, kind, &options)
        }
        ChartRequest::Heatmap { features } => {
            let features: &[Metric] = if features.is_empty() {
                catalog.metrics()
            } else {
                features.as_slice()
            };
            chart::shape(ShapeInput::Rows { subset: &subset, features }, kind, &options)
        }
        ChartRequest::Sankey { target } => chart::shape(
            ShapeInput::Rows {
                subset: &subset,
                features: std::slice::from_ref(target),
            },
            kind,
            &options,
        ),
    };

    log::debug!(
        "{kind} request over {} of {} rows -> {:?} ({} annotations)",
        subset.len(),
        dataset.len(),
        renderable.status,
        renderable.annotations.len()
    );
    renderable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartData, RenderStatus};
    use crate::data::model::tests::record;
    use crate::data::region::Continent;

    fn dataset() -> Dataset {
        let rows = [
            ("France", Continent::Europe, 2019, 100.0, 21.0),
            ("France", Continent::Europe, 2020, 110.0, 22.0),
            ("Kenya", Continent::Africa, 2019, 200.0, 7.0),
            ("Kenya", Continent::Africa, 2020, 190.0, 8.0),
            ("Peru", Continent::SouthAmerica, 2020, 150.0, 20.0),
        ];
        let records = rows
            .into_iter()
            .map(|(country, continent, year, mortality, obesity)| {
                let mut rec = record(country, continent, year);
                rec.metrics.set(Metric::MortalityRate, Some(mortality));
                rec.metrics.set(Metric::ObesityRate, Some(obesity));
                rec
            })
            .collect();
        Dataset::from_records(records).unwrap()
    }

    fn run_default(selection: &FilterSelection, request: &ChartRequest) -> Renderable {
        let ds = dataset();
        let catalog = Catalog::from_dataset(&ds);
        run(&ds, &catalog, &DashboardConfig::default(), selection, request)
    }

    #[test]
    fn test_top_countries_uses_configured_n() {
        let out = run_default(
            &FilterSelection::new().with_year(2020),
            &ChartRequest::TopCountries {
                metric: Metric::MortalityRate,
                n: Some(2),
            },
        );
        let ChartData::Bar(data) = out.chart else {
            panic!("expected bar");
        };
        assert_eq!(data.categories, vec!["Kenya", "Peru"]);
    }

    #[test]
    fn test_top_zero_is_insufficient_not_empty() {
        let out = run_default(
            &FilterSelection::new().with_year(2020),
            &ChartRequest::TopCountries {
                metric: Metric::MortalityRate,
                n: Some(0),
            },
        );
        assert_eq!(out.status, RenderStatus::InsufficientData);
    }

    #[test]
    fn test_trend_by_region() {
        let out = run_default(
            &FilterSelection::new(),
            &ChartRequest::Trend {
                metric: Metric::ObesityRate,
                by: Some(Dimension::Region),
            },
        );
        let ChartData::Line(data) = out.chart else {
            panic!("expected line");
        };
        assert_eq!(data.years, vec![2019, 2020]);
        let names: Vec<&str> = data.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Africa", "Europe", "South America"]);
        assert_eq!(data.series[2].values, vec![None, Some(20.0)]);
    }

    #[test]
    fn test_empty_selection_result_is_no_data() {
        let out = run_default(
            &FilterSelection::new().with_year(1990),
            &ChartRequest::default(),
        );
        assert_eq!(out.status, RenderStatus::NoData);
    }

    #[test]
    fn test_scatter_fits_line() {
        let out = run_default(
            &FilterSelection::new().with_year(2020),
            &ChartRequest::Scatter {
                x: Metric::ObesityRate,
                y: Metric::MortalityRate,
            },
        );
        assert_eq!(out.status, RenderStatus::Ready);
        let ChartData::Scatter(data) = out.chart else {
            panic!("expected scatter");
        };
        assert_eq!(data.x.len(), 3);
        assert!(data.regression.is_some());
    }

    #[test]
    fn test_heatmap_defaults_to_metrics_with_data() {
        let out = run_default(&FilterSelection::new(), &ChartRequest::Heatmap { features: vec![] });
        let ChartData::Heatmap(data) = out.chart else {
            panic!("expected heatmap");
        };
        assert_eq!(data.features, vec![Metric::MortalityRate, Metric::ObesityRate]);
    }

    #[test]
    fn test_request_json_shape() {
        let request: ChartRequest =
            serde_json::from_str(r#"{"chart": "sankey", "target": "prevalence_rate"}"#).unwrap();
        assert_eq!(
            request,
            ChartRequest::Sankey {
                target: Metric::PrevalenceRate
            }
        );
        assert_eq!(request.kind(), ChartKind::Sankey);
    }

    #[test]
    fn test_trend_request_with_series_dimension() {
        let request: ChartRequest = serde_json::from_str(
            r#"{"chart": "trend", "metric": "mortality_rate", "by": "region"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            ChartRequest::Trend {
                metric: Metric::MortalityRate,
                by: Some(Dimension::Region),
            }
        );
        let without: ChartRequest =
            serde_json::from_str(r#"{"chart": "trend", "metric": "obesity_rate"}"#).unwrap();
        assert_eq!(
            without,
            ChartRequest::Trend {
                metric: Metric::ObesityRate,
                by: None,
            }
        );
    }
}

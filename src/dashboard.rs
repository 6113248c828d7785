use std::sync::Arc;

use serde::Serialize;

use crate::chart::Renderable;
use crate::config::DashboardConfig;
use crate::data::catalog::{Catalog, Dimension};
use crate::data::filter::{FilterSelection, YearRange};
use crate::data::model::{Dataset, DimensionValue};
use crate::data::overview::{key_stats, KeyStats};
use crate::pipeline::{self, ChartRequest};

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// What the user is looking at: active filters plus the selected chart.
/// Interactions never mutate a view, they produce the next one.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewState {
    pub selection: FilterSelection,
    pub request: ChartRequest,
}

/// A user action on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    SetYears(YearRange),
    /// Add or remove one accepted value of a dimension.
    ToggleValue {
        dimension: Dimension,
        value: DimensionValue,
    },
    /// Remove every constraint on a dimension.
    ClearDimension(Dimension),
    SelectChart(ChartRequest),
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// The loaded dataset with its catalog; shared read-only between views.
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: Arc<Dataset>,
    catalog: Arc<Catalog>,
    config: DashboardConfig,
}

impl Dashboard {
    pub fn new(dataset: Dataset, config: DashboardConfig) -> Self {
        let catalog = Catalog::from_dataset(&dataset);
        log::info!(
            "dashboard ready: {} records, {} metrics with data, years {:?}..={:?}",
            dataset.len(),
            catalog.metrics().len(),
            catalog.earliest_year(),
            catalog.latest_year()
        );
        Dashboard {
            dataset: Arc::new(dataset),
            catalog: Arc::new(catalog),
            config,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Starting view: latest year, configured default age group and gender,
    /// world map of mortality.
    pub fn initial_view(&self) -> ViewState {
        let mut selection = self.config.default_selection(&self.catalog);
        if let Some(year) = self.catalog.latest_year() {
            selection = selection.with_year(year);
        }
        ViewState {
            selection,
            request: ChartRequest::default(),
        }
    }

    pub fn key_stats(&self) -> KeyStats {
        key_stats(&self.dataset, &self.catalog)
    }

    /// Evaluate the chart of a view.
    pub fn render(&self, view: &ViewState) -> Renderable {
        for (dimension, value) in self.catalog.unknown_values(&view.selection) {
            log::warn!("selected {dimension} {value} does not occur in the dataset");
        }
        pipeline::run(
            &self.dataset,
            &self.catalog,
            &self.config,
            &view.selection,
            &view.request,
        )
    }

    /// Apply an interaction, returning the next view and its chart.
    pub fn handle(&self, view: &ViewState, interaction: Interaction) -> (ViewState, Renderable) {
        log::debug!("interaction: {interaction:?}");
        let next = match interaction {
            Interaction::SetYears(range) => ViewState {
                selection: view.selection.clone().with_years(range),
                ..view.clone()
            },
            Interaction::ToggleValue { dimension, value } => ViewState {
                selection: view.selection.clone().toggled(dimension, value),
                ..view.clone()
            },
            Interaction::ClearDimension(dimension) => ViewState {
                selection: view.selection.clone().cleared(dimension),
                ..view.clone()
            },
            Interaction::SelectChart(request) => ViewState {
                request,
                ..view.clone()
            },
        };
        let renderable = self.render(&next);
        (next, renderable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartData, RenderStatus};
    use crate::data::model::tests::record;
    use crate::data::model::{Gender, Metric};
    use crate::data::region::Continent;

    fn dashboard() -> Dashboard {
        let rows = [
            ("France", Continent::Europe, 2019, Gender::Both, 100.0),
            ("France", Continent::Europe, 2020, Gender::Both, 110.0),
            ("France", Continent::Europe, 2020, Gender::Male, 130.0),
            ("Kenya", Continent::Africa, 2020, Gender::Both, 190.0),
        ];
        let records = rows
            .into_iter()
            .map(|(country, continent, year, gender, mortality)| {
                let mut rec = record(country, continent, year);
                rec.gender = Some(gender);
                rec.metrics.set(Metric::MortalityRate, Some(mortality));
                rec
            })
            .collect();
        Dashboard::new(
            Dataset::from_records(records).unwrap(),
            DashboardConfig::default(),
        )
    }

    #[test]
    fn test_initial_view_applies_defaults() {
        let dash = dashboard();
        let view = dash.initial_view();
        assert_eq!(view.selection.years(), Some(YearRange::single(2020)));
        assert!(view
            .selection
            .accepted(Dimension::Gender)
            .is_some_and(|g| g.contains(&DimensionValue::from("Both"))));
        let out = dash.render(&view);
        let ChartData::Choropleth(data) = out.chart else {
            panic!("expected choropleth");
        };
        assert_eq!(data.values, vec![110.0, 190.0]);
    }

    #[test]
    fn test_handle_leaves_previous_view_untouched() {
        let dash = dashboard();
        let view = dash.initial_view();
        let (next, out) = dash.handle(
            &view,
            Interaction::ToggleValue {
                dimension: Dimension::Country,
                value: "Kenya".into(),
            },
        );
        assert_ne!(view, next);
        assert!(view.selection.accepted(Dimension::Country).is_none());
        let ChartData::Choropleth(data) = out.chart else {
            panic!("expected choropleth");
        };
        assert_eq!(data.countries, vec!["Kenya"]);
    }

    #[test]
    fn test_unknown_value_renders_no_data() {
        let dash = dashboard();
        let view = dash.initial_view();
        let (_, out) = dash.handle(
            &view,
            Interaction::ToggleValue {
                dimension: Dimension::Country,
                value: "Atlantis".into(),
            },
        );
        assert_eq!(out.status, RenderStatus::NoData);
    }

    #[test]
    fn test_select_chart_and_clear_years() {
        let dash = dashboard();
        let view = dash.initial_view();
        let (view, _) = dash.handle(&view, Interaction::ClearDimension(Dimension::Year));
        assert_eq!(view.selection.years(), None);
        let (view, out) = dash.handle(
            &view,
            Interaction::SelectChart(ChartRequest::Trend {
                metric: Metric::MortalityRate,
                by: None,
            }),
        );
        assert!(matches!(view.request, ChartRequest::Trend { .. }));
        let ChartData::Line(data) = out.chart else {
            panic!("expected line");
        };
        assert_eq!(data.years, vec![2019, 2020]);
        assert_eq!(data.series[0].values, vec![Some(100.0), Some(150.0)]);
    }
}

use serde::Serialize;

use super::{Annotation, ChartData, Renderable};
use crate::color::{green_blue, purple_blue, ColorScale};
use crate::data::aggregate::AggregationResult;
use crate::data::catalog::{Catalog, Dimension};
use crate::data::model::Metric;

const SCALE_STEPS: usize = 9;

/// World map payload: one entry per country with a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethData {
    pub metric: Metric,
    pub label: String,
    /// ISO alpha-3 code per entry; `None` falls back to matching by name.
    pub locations: Vec<Option<String>>,
    pub countries: Vec<String>,
    pub values: Vec<f64>,
    /// Countries in the selection without a value.
    pub missing: Vec<String>,
    pub range: Option<(f64, f64)>,
    pub scale: ColorScale,
}

pub(crate) fn shape(result: &AggregationResult, catalog: &Catalog) -> Renderable {
    let title = format!("Global Distribution of {}", result.metric.label());
    if result.is_empty() {
        return Renderable::no_data(title);
    }
    let Some(position) = result.key_position(Dimension::Country) else {
        return Renderable::insufficient(title, "choropleth needs results grouped by country");
    };

    let mut data = ChoroplethData {
        metric: result.metric,
        label: result.metric.label().to_string(),
        locations: Vec::new(),
        countries: Vec::new(),
        values: Vec::new(),
        missing: Vec::new(),
        range: None,
        scale: if result.metric.is_economic() {
            purple_blue(SCALE_STEPS)
        } else {
            green_blue(SCALE_STEPS)
        },
    };

    for group in &result.groups {
        let country = group
            .key
            .get(position)
            .map(|v| v.to_string())
            .unwrap_or_default();
        match group.value {
            Some(value) => {
                data.locations
                    .push(catalog.country_code(&country).map(str::to_string));
                data.countries.push(country);
                data.values.push(value);
                data.range = Some(match data.range {
                    Some((lo, hi)) => (lo.min(value), hi.max(value)),
                    None => (value, value),
                });
            }
            None => data.missing.push(country),
        }
    }

    let mut annotations = Vec::new();
    if !data.missing.is_empty() {
        annotations.push(Annotation::MissingValues {
            groups: data.missing.clone(),
        });
    }
    if data.values.is_empty() {
        annotations.push(Annotation::InsufficientData {
            message: format!("no country has a value for {}", result.metric.label()),
        });
    }

    Renderable::ready(title, ChartData::Choropleth(data), annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::RenderStatus;
    use crate::data::aggregate::{aggregate, AggregateOp};
    use crate::data::filter::{filter, FilterSelection};
    use crate::data::model::tests::record;
    use crate::data::model::Dataset;
    use crate::data::region::Continent;

    fn dataset() -> Dataset {
        let mut fr = record("France", Continent::Europe, 2020);
        fr.country_code = Some("FRA".into());
        fr.metrics.set(Metric::MortalityRate, Some(90.0));
        fr.metrics.set(Metric::GdpPerCapita, Some(40_000.0));
        let mut ke = record("Kenya", Continent::Africa, 2020);
        ke.metrics.set(Metric::MortalityRate, Some(210.0));
        let td = record("Chad", Continent::Africa, 2020);
        Dataset::from_records(vec![fr, ke, td]).unwrap()
    }

    fn shaped(metric: Metric) -> Renderable {
        let ds = dataset();
        let catalog = Catalog::from_dataset(&ds);
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Country], metric, AggregateOp::Mean);
        shape(&result, &catalog)
    }

    #[test]
    fn test_locations_values_and_missing() {
        let out = shaped(Metric::MortalityRate);
        assert_eq!(out.status, RenderStatus::Ready);
        let ChartData::Choropleth(data) = out.chart else {
            panic!("expected choropleth");
        };
        assert_eq!(data.countries, vec!["France", "Kenya"]);
        assert_eq!(data.locations, vec![Some("FRA".to_string()), None]);
        assert_eq!(data.missing, vec!["Chad"]);
        assert_eq!(data.range, Some((90.0, 210.0)));
        assert_eq!(data.scale.name, "GnBu");
        assert!(matches!(out.annotations[0], Annotation::MissingValues { .. }));
    }

    #[test]
    fn test_economic_metric_uses_purple_scale() {
        let out = shaped(Metric::GdpPerCapita);
        let ChartData::Choropleth(data) = out.chart else {
            panic!("expected choropleth");
        };
        assert_eq!(data.scale.name, "PuBu");
    }

    #[test]
    fn test_requires_country_key() {
        let ds = dataset();
        let catalog = Catalog::from_dataset(&ds);
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Region], Metric::MortalityRate, AggregateOp::Mean);
        assert_eq!(shape(&result, &catalog).status, RenderStatus::InsufficientData);
    }
}

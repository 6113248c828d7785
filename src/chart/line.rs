use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::{Annotation, ChartData, Renderable};
use crate::color::generate_palette;
use crate::data::aggregate::{AggregationResult, GroupKey};
use crate::data::catalog::Dimension;
use crate::data::model::Metric;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    /// Aligned with [`LineData::years`]; a year without a value is `None`.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineData {
    pub metric: Metric,
    pub years: Vec<i32>,
    pub series: Vec<Series>,
}

/// One series per combination of the non-year key dimensions, x axis over
/// every year present in the result.
pub(crate) fn shape(result: &AggregationResult) -> Renderable {
    let title = format!("{} over time", result.metric.label());
    if result.is_empty() {
        return Renderable::no_data(title);
    }
    let Some(year_pos) = result.key_position(Dimension::Year) else {
        return Renderable::insufficient(title, "line chart needs results grouped by year");
    };

    let mut years = BTreeSet::new();
    let mut by_series: BTreeMap<GroupKey, BTreeMap<i32, Option<f64>>> = BTreeMap::new();
    for group in &result.groups {
        let Some(year) = group.key.get(year_pos).and_then(|v| v.as_year()) else {
            continue;
        };
        let series_key = GroupKey(
            group
                .key
                .0
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != year_pos)
                .map(|(_, v)| v.clone())
                .collect(),
        );
        years.insert(year);
        by_series.entry(series_key).or_default().insert(year, group.value);
    }

    let years: Vec<i32> = years.into_iter().collect();
    let colors = generate_palette(by_series.len());
    let series: Vec<Series> = by_series
        .into_iter()
        .zip(colors)
        .map(|((key, points), color)| Series {
            name: key.to_string(),
            color,
            values: years
                .iter()
                .map(|y| points.get(y).copied().flatten())
                .collect(),
        })
        .collect();

    let gaps: Vec<String> = series
        .iter()
        .filter(|s| s.values.iter().any(Option::is_none))
        .map(|s| s.name.clone())
        .collect();
    let mut annotations = Vec::new();
    if !gaps.is_empty() {
        annotations.push(Annotation::MissingValues { groups: gaps });
    }

    Renderable::ready(
        title,
        ChartData::Line(LineData {
            metric: result.metric,
            years,
            series,
        }),
        annotations,
    )
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
        let rows = [
            ("France", Continent::Europe, 2019, Some(100.0)),
            ("France", Continent::Europe, 2020, Some(110.0)),
            ("Kenya", Continent::Africa, 2019, Some(200.0)),
            ("Kenya", Continent::Africa, 2020, None),
        ];
        let records = rows
            .into_iter()
            .map(|(country, continent, year, value)| {
                let mut rec = record(country, continent, year);
                rec.metrics.set(Metric::ObesityRate, value);
                rec
            })
            .collect();
        Dataset::from_records(records).unwrap()
    }

    #[test]
    fn test_series_per_region_with_gaps() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(
            &subset,
            &[Dimension::Region, Dimension::Year],
            Metric::ObesityRate,
            AggregateOp::Mean,
        );
        let out = shape(&result);
        assert_eq!(out.status, RenderStatus::Ready);
        let ChartData::Line(data) = out.chart else {
            panic!("expected line");
        };
        assert_eq!(data.years, vec![2019, 2020]);
        assert_eq!(data.series.len(), 2);
        assert_eq!(data.series[0].name, "Africa");
        assert_eq!(data.series[0].values, vec![Some(200.0), None]);
        assert_eq!(data.series[1].values, vec![Some(100.0), Some(110.0)]);
        assert_eq!(
            out.annotations,
            vec![Annotation::MissingValues {
                groups: vec!["Africa".to_string()]
            }]
        );
    }

    #[test]
    fn test_single_series_without_other_dimensions() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Year], Metric::ObesityRate, AggregateOp::Mean);
        let ChartData::Line(data) = shape(&result).chart else {
            panic!("expected line");
        };
        assert_eq!(data.series.len(), 1);
        assert_eq!(data.series[0].name, "All");
        assert_eq!(data.series[0].values, vec![Some(150.0), Some(110.0)]);
    }

    #[test]
    fn test_requires_year_key() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Country], Metric::ObesityRate, AggregateOp::Mean);
        assert_eq!(shape(&result).status, RenderStatus::InsufficientData);
    }
}

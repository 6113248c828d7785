use serde::Serialize;

use super::aggregate::{aggregate, AggregateOp};
use super::catalog::{Catalog, Dimension};
use super::filter::{filter, FilterSelection};
use super::model::{Dataset, Gender, Metric};

/// Direction of a year-over-year change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
    /// One of the two years has no data.
    Unknown,
}

impl Trend {
    fn between(current: Option<f64>, previous: Option<f64>) -> Self {
        match (current, previous) {
            (Some(c), Some(p)) if c > p => Trend::Up,
            (Some(c), Some(p)) if c < p => Trend::Down,
            (Some(_), Some(_)) => Trend::Flat,
            _ => Trend::Unknown,
        }
    }
}

/// Latest-year mean of a risk factor compared with the year before.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub metric: Metric,
    pub label: &'static str,
    pub latest: Option<f64>,
    pub previous: Option<f64>,
    pub trend: Trend,
}

/// Headline numbers of the landing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStats {
    pub total_countries: usize,
    pub latest_year: Option<i32>,
    /// Mean over the combined-gender rows of every year.
    pub avg_mortality: Option<f64>,
    pub avg_prevalence: Option<f64>,
    pub risk_factors: Vec<Indicator>,
}

fn overall_mean(dataset: &Dataset, selection: &FilterSelection, metric: Metric) -> Option<f64> {
    let subset = filter(dataset, selection);
    aggregate(&subset, &[], metric, AggregateOp::Mean)
        .groups
        .first()
        .and_then(|g| g.value)
}

pub fn key_stats(dataset: &Dataset, catalog: &Catalog) -> KeyStats {
    let both = FilterSelection::new().with_value(Dimension::Gender, Gender::Both.as_str());
    let latest_year = catalog.latest_year();

    let risk_factors = [
        Metric::ObesityRate,
        Metric::PhysicalActivityRate,
        Metric::AlcoholConsumption,
        Metric::DiabetesPrevalence,
    ]
    .into_iter()
    .map(|metric| {
        let (latest, previous) = match latest_year {
            Some(year) => (
                overall_mean(dataset, &FilterSelection::new().with_year(year), metric),
                year.checked_sub(1).and_then(|prev| {
                    overall_mean(dataset, &FilterSelection::new().with_year(prev), metric)
                }),
            ),
            None => (None, None),
        };
        Indicator {
            metric,
            label: metric.label(),
            latest,
            previous,
            trend: Trend::between(latest, previous),
        }
    })
    .collect();

    KeyStats {
        total_countries: catalog.domain(Dimension::Country).count(),
        latest_year,
        avg_mortality: overall_mean(dataset, &both, Metric::MortalityRate),
        avg_prevalence: overall_mean(dataset, &both, Metric::PrevalenceRate),
        risk_factors,
    }
}

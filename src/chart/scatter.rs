use std::collections::BTreeSet;

use serde::Serialize;

use super::{Annotation, ChartData, Renderable};
use crate::color::ColorMap;
use crate::data::aggregate::AggregationResult;
use crate::data::catalog::{Catalog, Dimension};
use crate::data::model::{DimensionValue, Metric};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
    /// Fitted line evaluated at the smallest and largest x.
    pub start: (f64, f64),
    pub end: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterData {
    pub x_metric: Metric,
    pub y_metric: Metric,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub labels: Vec<String>,
    /// Continent of each point, used as colour group.
    pub groups: Vec<String>,
    pub colors: Vec<String>,
    /// Continent name and colour, one entry per group present.
    pub legend: Vec<(String, String)>,
    pub regression: Option<Regression>,
}

/// Ordinary least squares fit of `y = slope * x + intercept`.
///
/// `None` with fewer than two points or when every x is the same.
pub fn ols(x: &[f64], y: &[f64]) -> Option<Regression> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    // Relative to the scale of x, so tiny but distinct values still fit.
    let sum_sq_x: f64 = x.iter().map(|v| v * v).sum();
    if sxx <= f64::EPSILON * sum_sq_x {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    // A flat y is fitted exactly.
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };
    let min_x = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Regression {
        slope,
        intercept,
        r_squared,
        n,
        start: (min_x, slope * min_x + intercept),
        end: (max_x, slope * max_x + intercept),
    })
}

/// Pair `x` and `y` on their group keys. A point exists for every key present
/// in both results with non-null values on both sides, in the order of `x`.
pub(crate) fn shape(
    x: &AggregationResult,
    y: &AggregationResult,
    catalog: &Catalog,
    regression: bool,
) -> Renderable {
    let title = format!("{} vs {}", y.metric.label(), x.metric.label());
    if x.is_empty() || y.is_empty() {
        return Renderable::no_data(title);
    }
    if x.group_by != y.group_by {
        return Renderable::insufficient(title, "x and y are grouped differently");
    }

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut labels = Vec::new();
    let mut groups = Vec::new();
    let mut dropped = Vec::new();
    for gx in &x.groups {
        let paired = gx
            .value
            .zip(y.get(&gx.key).and_then(|gy| gy.value));
        match paired {
            Some((vx, vy)) => {
                xs.push(vx);
                ys.push(vy);
                labels.push(gx.key.to_string());
                groups.push(continent_group(x, &gx.key.0, catalog));
            }
            None => dropped.push(gx.key.to_string()),
        }
    }

    let domain: BTreeSet<DimensionValue> =
        groups.iter().map(|g| DimensionValue::from(g.as_str())).collect();
    let color_map = ColorMap::new(&domain);
    let colors = groups
        .iter()
        .map(|g| color_map.color_for(&DimensionValue::from(g.as_str())).to_string())
        .collect();
    let legend = color_map.legend_entries();

    let mut annotations = Vec::new();
    if !dropped.is_empty() {
        annotations.push(Annotation::MissingValues { groups: dropped });
    }
    if xs.is_empty() {
        annotations.push(Annotation::InsufficientData {
            message: "no group has both values".to_string(),
        });
    }

    let fit = if regression && !xs.is_empty() {
        let fit = ols(&xs, &ys);
        if fit.is_none() {
            annotations.push(Annotation::InsufficientData {
                message: format!(
                    "regression needs at least two points with distinct x, got {}",
                    xs.len()
                ),
            });
        }
        fit
    } else {
        None
    };

    Renderable::ready(
        title,
        ChartData::Scatter(ScatterData {
            x_metric: x.metric,
            y_metric: y.metric,
            x: xs,
            y: ys,
            labels,
            groups,
            colors,
            legend,
            regression: fit,
        }),
        annotations,
    )
}

fn continent_group(result: &AggregationResult, key: &[DimensionValue], catalog: &Catalog) -> String {
    if let Some(pos) = result.key_position(Dimension::Region) {
        return key[pos].to_string();
    }
    result
        .key_position(Dimension::Country)
        .and_then(|pos| key[pos].as_str())
        .and_then(|country| catalog.continent_of(country))
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| "All".to_string())
}

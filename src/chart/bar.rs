use serde::Serialize;

use super::{Annotation, ChartData, Renderable};
use crate::color::generate_palette;
use crate::data::aggregate::{AggregateOp, AggregationResult};
use crate::data::model::Metric;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarData {
    pub metric: Metric,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
    /// Present for top-N and rank results.
    pub ranks: Vec<Option<usize>>,
    pub colors: Vec<String>,
    pub missing: Vec<String>,
}

pub(crate) fn shape(result: &AggregationResult) -> Renderable {
    let title = match result.op {
        AggregateOp::TopN(n) => format!("Top {n} by {}", result.metric.label()),
        _ => format!("{} by {}", result.metric.label(), group_label(result)),
    };
    if result.is_empty() {
        return Renderable::no_data(title);
    }

    let (present, missing): (Vec<_>, Vec<_>) =
        result.groups.iter().partition(|g| g.value.is_some());

    let data = BarData {
        metric: result.metric,
        categories: present.iter().map(|g| g.key.to_string()).collect(),
        values: present.iter().filter_map(|g| g.value).collect(),
        ranks: present.iter().map(|g| g.rank).collect(),
        colors: generate_palette(present.len()),
        missing: missing.iter().map(|g| g.key.to_string()).collect(),
    };

    let mut annotations = Vec::new();
    if !data.missing.is_empty() {
        annotations.push(Annotation::MissingValues {
            groups: data.missing.clone(),
        });
    }
    if data.values.is_empty() {
        annotations.push(Annotation::InsufficientData {
            message: format!("no group has a value for {}", result.metric.label()),
        });
    }
    Renderable::ready(title, ChartData::Bar(data), annotations)
}

fn group_label(result: &AggregationResult) -> String {
    if result.group_by.is_empty() {
        return "All".to_string();
    }
    result
        .group_by
        .iter()
        .map(|d| super::title_case(&d.to_string()))
        .collect::<Vec<_>>()
        .join(" / ")
}

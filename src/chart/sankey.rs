use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::{ChartData, Renderable};
use crate::data::filter::Subset;
use crate::data::model::Metric;

/// Quantile with linear interpolation between closest ranks. `sorted` must be
/// ascending and non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Level {
    Low,
    Moderate,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "Low",
            Level::Moderate => "Moderate",
            Level::High => "High",
        })
    }
}

/// 25th and 75th percentile cut points of one metric over the subset.
#[derive(Debug, Clone, Copy)]
struct Bins {
    q25: f64,
    q75: f64,
}

impl Bins {
    fn of(subset: &Subset<'_>, metric: Metric) -> Option<Self> {
        let mut values: Vec<f64> = subset.iter().filter_map(|r| r.metric(metric)).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Bins {
            q25: quantile(&values, 0.25),
            q75: quantile(&values, 0.75),
        })
    }

    fn level(&self, value: f64) -> Level {
        if value <= self.q25 {
            Level::Low
        } else if value <= self.q75 {
            Level::Moderate
        } else {
            Level::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyData {
    pub target: Metric,
    pub nodes: Vec<String>,
    pub links: Vec<Link>,
}

/// Node labels in first-seen order.
#[derive(Default)]
struct Nodes {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Nodes {
    fn id(&mut self, label: &str) -> usize {
        if let Some(&id) = self.index.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), id);
        id
    }
}

/// Flows from each risk-factor level to continents, then from continents to
/// the level of `target`. A row only feeds the flows of the metrics it has a
/// value for.
pub(crate) fn shape(subset: &Subset<'_>, target: Metric) -> Renderable {
    let title = format!("Risk Factors, Regions and {}", target.short_name());
    if !Metric::OUTCOMES.contains(&target) {
        // A risk factor as target would feed its own level nodes.
        return Renderable::insufficient(
            title,
            format!("{} is not a heart disease outcome", target.label()),
        );
    }
    if subset.is_empty() {
        return Renderable::no_data(title);
    }
    let Some(target_bins) = Bins::of(subset, target) else {
        return Renderable::insufficient(title, format!("no values for {}", target.label()));
    };

    // (source label, target label) -> rows; `order` keeps first-seen links.
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut order: Vec<(String, String)> = Vec::new();
    let mut count = |source: String, dest: String| {
        let key = (source, dest);
        let slot = counts.entry(key.clone()).or_insert(0);
        if *slot == 0 {
            order.push(key);
        }
        *slot += 1;
    };

    for factor in Metric::RISK_FACTORS {
        let Some(bins) = Bins::of(subset, factor) else {
            continue;
        };
        for rec in subset.iter() {
            if let Some(v) = rec.metric(factor) {
                count(
                    format!("{} {}", bins.level(v), factor.short_name()),
                    rec.continent.name().to_string(),
                );
            }
        }
    }
    for rec in subset.iter() {
        if let Some(v) = rec.metric(target) {
            count(
                rec.continent.name().to_string(),
                format!("{} {}", target_bins.level(v), target.short_name()),
            );
        }
    }

    let mut nodes = Nodes::default();
    let links = order
        .into_iter()
        .map(|key| {
            let value = counts[&key];
            let (source, dest) = key;
            Link {
                source: nodes.id(&source),
                target: nodes.id(&dest),
                value,
            }
        })
        .collect::<Vec<_>>();

    log::debug!("sankey: {} nodes, {} links", nodes.labels.len(), links.len());
    Renderable::ready(
        title,
        ChartData::Sankey(SankeyData {
            target,
            nodes: nodes.labels,
            links,
        }),
        Vec::new(),
    )
}

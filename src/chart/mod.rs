//! Chart data shaping: aggregated results (or, for correlation and flow
//! charts, the filtered rows) converted to the record layout each chart kind
//! expects.
//!
//! Shaping never fails. Empty input yields [`RenderStatus::NoData`];
//! degenerate input (one point for a regression, constant features for a
//! correlation) yields [`RenderStatus::InsufficientData`] with annotations
//! saying what was skipped.

pub mod bar;
pub mod choropleth;
pub mod heatmap;
pub mod line;
pub mod sankey;
pub mod scatter;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::data::aggregate::AggregationResult;
use crate::data::catalog::Catalog;
use crate::data::filter::Subset;
use crate::data::model::{normalize_name, Metric};
use crate::error::{DashError, Result};

pub use heatmap::CorrelationGuard;

// ---------------------------------------------------------------------------
// Renderable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Ready,
    /// The filtered selection is empty.
    NoData,
    /// There is data, but not enough for the requested statistic.
    InsufficientData,
}

/// Warnings attached to a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    NoData {
        message: String,
    },
    /// Groups present in the selection whose statistic is null.
    MissingValues {
        groups: Vec<String>,
    },
    InsufficientSamples {
        series: String,
        samples: usize,
        required: usize,
    },
    LowVariance {
        series: String,
        variance: f64,
        threshold: f64,
    },
    InsufficientData {
        message: String,
    },
}

impl Annotation {
    fn is_blocking(&self) -> bool {
        matches!(self, Annotation::NoData { .. } | Annotation::InsufficientData { .. })
    }
}

/// Chart payload, one variant per chart kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chart", rename_all = "snake_case")]
pub enum ChartData {
    Choropleth(choropleth::ChoroplethData),
    Bar(bar::BarData),
    Line(line::LineData),
    Scatter(scatter::ScatterData),
    Heatmap(heatmap::HeatmapData),
    Sankey(sankey::SankeyData),
    Empty,
}

/// What the charting collaborator receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Renderable {
    pub title: String,
    pub status: RenderStatus,
    pub annotations: Vec<Annotation>,
    pub chart: ChartData,
}

impl Renderable {
    pub fn ready(title: impl Into<String>, chart: ChartData, annotations: Vec<Annotation>) -> Self {
        let status = if annotations.iter().any(Annotation::is_blocking) {
            RenderStatus::InsufficientData
        } else {
            RenderStatus::Ready
        };
        Renderable {
            title: title.into(),
            status,
            annotations,
            chart,
        }
    }

    pub fn no_data(title: impl Into<String>) -> Self {
        Renderable {
            title: title.into(),
            status: RenderStatus::NoData,
            annotations: vec![Annotation::NoData {
                message: "No data available for selected filters".to_string(),
            }],
            chart: ChartData::Empty,
        }
    }

    pub fn insufficient(title: impl Into<String>, message: impl Into<String>) -> Self {
        Renderable {
            title: title.into(),
            status: RenderStatus::InsufficientData,
            annotations: vec![Annotation::InsufficientData {
                message: message.into(),
            }],
            chart: ChartData::Empty,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == RenderStatus::Ready
    }
}

// ---------------------------------------------------------------------------
// Chart kinds and dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Choropleth,
    Bar,
    Line,
    Scatter,
    Heatmap,
    Sankey,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Choropleth => "choropleth",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Sankey => "sankey",
        };
        f.write_str(name)
    }
}

impl FromStr for ChartKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_name(s).as_str() {
            "choropleth" | "map" => Ok(ChartKind::Choropleth),
            "bar" | "barplot" => Ok(ChartKind::Bar),
            "line" | "trend" => Ok(ChartKind::Line),
            "scatter" | "scatterplot" => Ok(ChartKind::Scatter),
            "heatmap" | "correlation" => Ok(ChartKind::Heatmap),
            "sankey" => Ok(ChartKind::Sankey),
            _ => Err(DashError::UnknownChartKind(s.to_string())),
        }
    }
}

/// Input of the shaper. Grouped charts take one aggregation result, the
/// scatter plot takes two aligned on the same keys, correlation and flow
/// charts work on the filtered rows.
#[derive(Debug, Clone, Copy)]
pub enum ShapeInput<'r, 'a> {
    Aggregated(&'r AggregationResult),
    Paired {
        x: &'r AggregationResult,
        y: &'r AggregationResult,
    },
    /// For a Sankey diagram the first feature is the target metric.
    Rows {
        subset: &'r Subset<'a>,
        features: &'r [Metric],
    },
}

/// Settings the shapers share.
#[derive(Debug, Clone, Copy)]
pub struct ShapeOptions<'c> {
    pub catalog: &'c Catalog,
    pub guard: CorrelationGuard,
    pub regression: bool,
}

/// Shape an input for a chart kind.
///
/// A mismatched input/kind pair yields an `insufficient_data` renderable
/// rather than an error.
pub fn shape(input: ShapeInput<'_, '_>, kind: ChartKind, options: &ShapeOptions<'_>) -> Renderable {
    match (kind, input) {
        (ChartKind::Choropleth, ShapeInput::Aggregated(result)) => {
            choropleth::shape(result, options.catalog)
        }
        (ChartKind::Bar, ShapeInput::Aggregated(result)) => bar::shape(result),
        (ChartKind::Line, ShapeInput::Aggregated(result)) => line::shape(result),
        (ChartKind::Scatter, ShapeInput::Paired { x, y }) => {
            scatter::shape(x, y, options.catalog, options.regression)
        }
        (ChartKind::Heatmap, ShapeInput::Rows { subset, features }) => {
            heatmap::shape(subset, features, &options.guard)
        }
        (ChartKind::Sankey, ShapeInput::Rows { subset, features }) => match features.first() {
            Some(target) => sankey::shape(subset, *target),
            None => Renderable::insufficient("Sankey", "no target metric selected"),
        },
        (kind, _) => Renderable::insufficient(
            kind.to_string(),
            format!("{kind} chart cannot be built from this input"),
        ),
    }
}

/// Human-readable version of a metric or column key: `_` to spaces, title case.
pub(crate) fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

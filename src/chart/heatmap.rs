use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Annotation, ChartData, Renderable};
use crate::color::{red_blue, ColorScale};
use crate::data::filter::Subset;
use crate::data::model::Metric;

/// Minimum evidence before a correlation coefficient is reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationGuard {
    /// Pairwise-complete observations required; never below 2.
    pub min_samples: usize,
    /// Sample variance each side must exceed.
    pub min_variance: f64,
}

impl Default for CorrelationGuard {
    fn default() -> Self {
        CorrelationGuard {
            min_samples: 3,
            min_variance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData {
    pub features: Vec<Metric>,
    pub labels: Vec<String>,
    /// Symmetric; `None` where the guard rejected the pair.
    pub matrix: Vec<Vec<Option<f64>>>,
    /// Pairwise-complete observation counts.
    pub samples: Vec<Vec<usize>>,
    pub scale: ColorScale,
}

enum Correlation {
    Value(f64),
    TooFew(usize),
    Flat { series: Metric, variance: f64 },
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
}

fn correlate(subset: &Subset<'_>, fa: Metric, fb: Metric, guard: &CorrelationGuard) -> (Correlation, usize) {
    let (a, b): (Vec<f64>, Vec<f64>) = subset
        .iter()
        .filter_map(|rec| rec.metric(fa).zip(rec.metric(fb)))
        .unzip();
    let n = a.len();
    if n < guard.min_samples.max(2) {
        return (Correlation::TooFew(n), n);
    }
    for (series, values) in [(fa, &a), (fb, &b)] {
        let variance = variance(values);
        if variance <= guard.min_variance {
            return (Correlation::Flat { series, variance }, n);
        }
    }
    (Correlation::Value(pearson(&a, &b)), n)
}

/// Pearson correlation matrix over the subset rows, pairwise-complete.
pub(crate) fn shape(subset: &Subset<'_>, features: &[Metric], guard: &CorrelationGuard) -> Renderable {
    let title = "Correlation Matrix";
    if subset.is_empty() {
        return Renderable::no_data(title);
    }
    if features.len() < 2 {
        return Renderable::insufficient(title, "correlation needs at least two features");
    }

    let k = features.len();
    let mut matrix = vec![vec![None; k]; k];
    let mut samples = vec![vec![0; k]; k];
    let mut annotations = Vec::new();
    // One annotation per flat feature, however many pairs it appears in.
    let mut flat_features: BTreeMap<Metric, f64> = BTreeMap::new();

    for i in 0..k {
        for j in i..k {
            let (correlation, n) = correlate(subset, features[i], features[j], guard);
            samples[i][j] = n;
            samples[j][i] = n;
            let series = if i == j {
                features[i].key().to_string()
            } else {
                format!("{} ~ {}", features[i].key(), features[j].key())
            };
            let value = match correlation {
                // Exact on the diagonal regardless of rounding.
                Correlation::Value(r) => Some(if i == j { 1.0 } else { r }),
                Correlation::TooFew(samples) => {
                    annotations.push(Annotation::InsufficientSamples {
                        series,
                        samples,
                        required: guard.min_samples.max(2),
                    });
                    None
                }
                Correlation::Flat { series: flat, variance } => {
                    flat_features.entry(flat).or_insert(variance);
                    None
                }
            };
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }

    annotations.extend(flat_features.into_iter().map(|(feature, variance)| {
        Annotation::LowVariance {
            series: feature.key().to_string(),
            variance,
            threshold: guard.min_variance,
        }
    }));

    if matrix.iter().flatten().all(Option::is_none) {
        annotations.push(Annotation::InsufficientData {
            message: "no feature pair passed the sample and variance checks".to_string(),
        });
    }
    log::debug!("correlation over {} rows, {} features", subset.len(), k);

    Renderable::ready(
        title,
        ChartData::Heatmap(HeatmapData {
            features: features.to_vec(),
            labels: features.iter().map(|f| f.label().to_string()).collect(),
            matrix,
            samples,
            scale: red_blue(11),
        }),
        annotations,
    )
}

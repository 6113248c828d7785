use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::catalog::Dimension;
use super::filter::Subset;
use super::model::{DimensionValue, Metric};
use crate::error::{DashError, Result};

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Statistic computed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "n", rename_all = "snake_case")]
pub enum AggregateOp {
    Mean,
    Sum,
    /// Number of non-null samples.
    Count,
    Min,
    Max,
    /// The `n` groups with the highest mean, descending.
    TopN(usize),
    /// Every group with a value, descending by mean.
    Rank,
}

impl FromStr for AggregateOp {
    type Err = DashError;

    /// `mean`, `sum`, `count`, `min`, `max`, `rank`, `top10`, `top-5`, `top:3`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let op = match lower.as_str() {
            "mean" | "avg" | "average" => AggregateOp::Mean,
            "sum" => AggregateOp::Sum,
            "count" => AggregateOp::Count,
            "min" => AggregateOp::Min,
            "max" => AggregateOp::Max,
            "rank" => AggregateOp::Rank,
            other => {
                let n = other
                    .strip_prefix("top")
                    .map(|rest| rest.trim_start_matches(['-', '_', ':']))
                    .and_then(|digits| digits.parse::<usize>().ok())
                    .ok_or_else(|| DashError::UnknownAggregation(s.to_string()))?;
                AggregateOp::TopN(n)
            }
        };
        Ok(op)
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Values of the group-by dimensions, in `group_by` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<DimensionValue>);

impl GroupKey {
    pub fn get(&self, position: usize) -> Option<&DimensionValue> {
        self.0.get(position)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("All");
        }
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join(" / "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: GroupKey,
    /// `None` when every value of the group was null.
    pub value: Option<f64>,
    /// Records in the group, null or not.
    pub rows: usize,
    /// Non-null values that fed `value`.
    pub samples: usize,
    /// 1-based position for `TopN` / `Rank`.
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub group_by: Vec<Dimension>,
    pub metric: Metric,
    pub op: AggregateOp,
    /// Size of the subset the result was computed from.
    pub subset_rows: usize,
    pub groups: Vec<Group>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.iter().find(|g| &g.key == key)
    }

    /// Position of a dimension inside the group keys.
    pub fn key_position(&self, dimension: Dimension) -> Option<usize> {
        self.group_by.iter().position(|d| *d == dimension)
    }

    /// Groups whose statistic is null.
    pub fn missing(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| g.value.is_none())
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Accumulator {
    rows: usize,
    samples: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Accumulator {
            rows: 0,
            samples: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.samples += 1;
            self.sum += v;
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    fn finalize(&self, op: AggregateOp) -> Option<f64> {
        if op == AggregateOp::Count {
            return Some(self.samples as f64);
        }
        if self.samples == 0 {
            return None;
        }
        match op {
            AggregateOp::Sum => Some(self.sum),
            AggregateOp::Min => Some(self.min),
            AggregateOp::Max => Some(self.max),
            _ => Some(self.sum / self.samples as f64),
        }
    }
}

/// Group the subset by `group_by` and compute `op` over `metric`.
///
/// Null metric values never enter a statistic. Plain statistics come back in
/// ascending key order; `TopN` and `Rank` come back by descending mean with
/// ties kept in first-seen order, and leave out groups without a value. An
/// empty `group_by` produces one overall group for a non-empty subset.
pub fn aggregate(
    subset: &Subset<'_>,
    group_by: &[Dimension],
    metric: Metric,
    op: AggregateOp,
) -> AggregationResult {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut accumulators: Vec<(GroupKey, Accumulator)> = Vec::new();

    for rec in subset.iter() {
        let key = GroupKey(group_by.iter().map(|d| d.value_of(rec)).collect());
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), accumulators.len());
                accumulators.push((key, Accumulator::new()));
                accumulators.len() - 1
            }
        };
        accumulators[slot].1.add(rec.metric(metric));
    }

    let groups = match op {
        AggregateOp::TopN(n) => {
            let mut ranked = ranked(accumulators);
            ranked.truncate(n);
            ranked
        }
        AggregateOp::Rank => ranked(accumulators),
        _ => {
            let mut groups: Vec<Group> = accumulators
                .into_iter()
                .map(|(key, acc)| Group {
                    value: acc.finalize(op),
                    rows: acc.rows,
                    samples: acc.samples,
                    rank: None,
                    key,
                })
                .collect();
            groups.sort_by(|a, b| a.key.cmp(&b.key));
            groups
        }
    };

    log::debug!(
        "aggregate {:?} of {} by {:?}: {} rows -> {} groups",
        op,
        metric,
        group_by,
        subset.len(),
        groups.len()
    );

    AggregationResult {
        group_by: group_by.to_vec(),
        metric,
        op,
        subset_rows: subset.len(),
        groups,
    }
}

/// Groups with a mean, descending. `sort_by` is stable and the accumulators
/// are in first-seen order, so equal values keep first-seen order.
fn ranked(accumulators: Vec<(GroupKey, Accumulator)>) -> Vec<Group> {
    let mut groups: Vec<Group> = accumulators
        .into_iter()
        .filter_map(|(key, acc)| {
            acc.finalize(AggregateOp::Mean).map(|value| Group {
                key,
                value: Some(value),
                rows: acc.rows,
                samples: acc.samples,
                rank: None,
            })
        })
        .collect();
    groups.sort_by(|a, b| {
        let (a, b) = (a.value.unwrap_or(f64::NAN), b.value.unwrap_or(f64::NAN));
        b.total_cmp(&a)
    });
    for (i, group) in groups.iter_mut().enumerate() {
        group.rank = Some(i + 1);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, FilterSelection};
    use crate::data::model::tests::record;
    use crate::data::model::{Dataset, Record};
    use crate::data::region::Continent;

    fn with_mortality(mut rec: Record, value: Option<f64>) -> Record {
        rec.metrics.set(Metric::MortalityRate, value);
        rec
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            with_mortality(record("France", Continent::Europe, 2020), Some(100.0)),
            with_mortality(record("Spain", Continent::Europe, 2020), None),
            with_mortality(record("Italy", Continent::Europe, 2020), Some(200.0)),
            with_mortality(record("Kenya", Continent::Africa, 2020), Some(300.0)),
            with_mortality(record("Chad", Continent::Africa, 2020), Some(300.0)),
            with_mortality(record("Fiji", Continent::Oceania, 2020), None),
        ])
        .unwrap()
    }

    fn key(value: &str) -> GroupKey {
        GroupKey(vec![DimensionValue::from(value)])
    }

    #[test]
    fn test_empty_subset_yields_no_groups() {
        let subset = Subset::from_records(Vec::new());
        for op in [AggregateOp::Mean, AggregateOp::Sum, AggregateOp::Count, AggregateOp::Rank] {
            let result = aggregate(&subset, &[Dimension::Region], Metric::MortalityRate, op);
            assert!(result.is_empty());
        }
        let overall = aggregate(&subset, &[], Metric::MortalityRate, AggregateOp::Mean);
        assert!(overall.is_empty());
    }

    #[test]
    fn test_mean_skips_nulls() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Region], Metric::MortalityRate, AggregateOp::Mean);
        let europe = result.get(&key("Europe")).unwrap();
        assert_eq!(europe.value, Some(150.0));
        assert_eq!(europe.rows, 3);
        assert_eq!(europe.samples, 2);
    }

    #[test]
    fn test_all_null_group_is_null_not_zero() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        for op in [AggregateOp::Mean, AggregateOp::Sum, AggregateOp::Min, AggregateOp::Max] {
            let result = aggregate(&subset, &[Dimension::Region], Metric::MortalityRate, op);
            let oceania = result.get(&key("Oceania")).unwrap();
            assert_eq!(oceania.value, None, "{op:?}");
            assert_eq!(oceania.rows, 1);
        }
        let count = aggregate(&subset, &[Dimension::Region], Metric::MortalityRate, AggregateOp::Count);
        assert_eq!(count.get(&key("Oceania")).unwrap().value, Some(0.0));
    }

    #[test]
    fn test_plain_stats_sorted_by_key() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Region], Metric::MortalityRate, AggregateOp::Sum);
        let keys: Vec<String> = result.groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["Africa", "Europe", "Oceania"]);
        assert_eq!(result.get(&key("Africa")).unwrap().value, Some(600.0));
    }

    #[test]
    fn test_top_n_ties_keep_first_seen() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Country], Metric::MortalityRate, AggregateOp::TopN(3));
        let names: Vec<String> = result.groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(names, vec!["Kenya", "Chad", "Italy"]);
        assert_eq!(result.groups[0].rank, Some(1));
        assert_eq!(result.groups[2].rank, Some(3));
    }

    #[test]
    fn test_rank_orders_descending_and_drops_nulls() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[Dimension::Country], Metric::MortalityRate, AggregateOp::Rank);
        let names: Vec<String> = result.groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(names, vec!["Kenya", "Chad", "Italy", "France"]);
        let ranks: Vec<Option<usize>> = result.groups.iter().map(|g| g.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_overall_group_without_group_by() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(&subset, &[], Metric::MortalityRate, AggregateOp::Mean);
        assert_eq!(result.len(), 1);
        assert_eq!(result.groups[0].key.to_string(), "All");
        assert_eq!(result.groups[0].value, Some(225.0));
        assert_eq!(result.subset_rows, 6);
    }

    #[test]
    fn test_multi_dimension_keys() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        let result = aggregate(
            &subset,
            &[Dimension::Region, Dimension::Year],
            Metric::MortalityRate,
            AggregateOp::Mean,
        );
        assert_eq!(result.key_position(Dimension::Year), Some(1));
        assert_eq!(result.groups[0].key.to_string(), "Africa / 2020");
    }

    #[test]
    fn test_parse_ops() {
        assert_eq!("mean".parse::<AggregateOp>().unwrap(), AggregateOp::Mean);
        assert_eq!("top10".parse::<AggregateOp>().unwrap(), AggregateOp::TopN(10));
        assert_eq!("top-5".parse::<AggregateOp>().unwrap(), AggregateOp::TopN(5));
        assert_eq!("Rank".parse::<AggregateOp>().unwrap(), AggregateOp::Rank);
        assert!("median".parse::<AggregateOp>().is_err());
        assert!("top".parse::<AggregateOp>().is_err());
    }
}

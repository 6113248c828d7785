use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::catalog::Dimension;
use super::model::{Dataset, DimensionValue, Record};

// ---------------------------------------------------------------------------
// Filter selection: which values are accepted per dimension
// ---------------------------------------------------------------------------

/// Inclusive year range; either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn single(year: i32) -> Self {
        YearRange {
            start: Some(year),
            end: Some(year),
        }
    }

    pub fn between(start: i32, end: i32) -> Self {
        YearRange {
            start: Some(start.min(end)),
            end: Some(start.max(end)),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |s| year >= s) && self.end.map_or(true, |e| year <= e)
    }

    fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// The user's active filters for one interaction.
///
/// Immutable by convention: every edit returns a new selection. A dimension
/// that is absent, or present with an empty value set, imposes no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterSelection {
    years: Option<YearRange>,
    values: BTreeMap<Dimension, BTreeSet<DimensionValue>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_years(mut self, range: YearRange) -> Self {
        self.years = (!range.is_open()).then_some(range);
        self
    }

    pub fn with_year(self, year: i32) -> Self {
        self.with_years(YearRange::single(year))
    }

    /// Accept one more value for a dimension.
    pub fn with_value(mut self, dimension: Dimension, value: impl Into<DimensionValue>) -> Self {
        self.values.entry(dimension).or_default().insert(value.into());
        self
    }

    pub fn with_values<I, V>(self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DimensionValue>,
    {
        values
            .into_iter()
            .fold(self, |sel, v| sel.with_value(dimension, v))
    }

    /// Toggle a single value in a dimension's accepted set.
    pub fn toggled(mut self, dimension: Dimension, value: impl Into<DimensionValue>) -> Self {
        let value = value.into();
        let selected = self.values.entry(dimension).or_default();
        if !selected.remove(&value) {
            selected.insert(value);
        }
        if selected.is_empty() {
            self.values.remove(&dimension);
        }
        self
    }

    /// Drop every constraint on a dimension.
    pub fn cleared(mut self, dimension: Dimension) -> Self {
        self.values.remove(&dimension);
        if dimension == Dimension::Year {
            self.years = None;
        }
        self
    }

    pub fn years(&self) -> Option<YearRange> {
        self.years
    }

    /// Dimensions with a non-empty accepted set.
    pub fn values(&self) -> impl Iterator<Item = (&Dimension, &BTreeSet<DimensionValue>)> {
        self.values.iter().filter(|(_, vals)| !vals.is_empty())
    }

    pub fn accepted(&self, dimension: Dimension) -> Option<&BTreeSet<DimensionValue>> {
        self.values.get(&dimension).filter(|vals| !vals.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_none() && self.values().next().is_none()
    }

    /// Whether a record satisfies every active constraint.
    ///
    /// A record with a null gender or age group only passes a constraint on
    /// that dimension if the accepted set contains [`DimensionValue::Null`].
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(range) = &self.years {
            if !range.contains(record.year) {
                return false;
            }
        }
        self.values()
            .all(|(dim, accepted)| accepted.contains(&dim.value_of(record)))
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Rows of the dataset matching a selection, in source order.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    records: Vec<&'a Record>,
}

impl<'a> Subset<'a> {
    pub fn from_records(records: Vec<&'a Record>) -> Self {
        Subset { records }
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Narrow an existing subset further.
    pub fn refine(&self, selection: &FilterSelection) -> Subset<'a> {
        Subset {
            records: self
                .records
                .iter()
                .copied()
                .filter(|rec| selection.matches(rec))
                .collect(),
        }
    }
}

/// Return indices of records that pass all active filters.
pub fn filtered_indices(dataset: &Dataset, selection: &FilterSelection) -> Vec<usize> {
    dataset
        .iter()
        .enumerate()
        .filter(|(_, rec)| selection.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Conjunctive filter over the whole dataset. An empty result is not an error.
pub fn filter<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> Subset<'a> {
    let records: Vec<&Record> = dataset.iter().filter(|rec| selection.matches(rec)).collect();
    log::debug!(
        "filter kept {} of {} records ({} active dimensions)",
        records.len(),
        dataset.len(),
        selection.values().count() + usize::from(selection.years.is_some())
    );
    Subset { records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use crate::data::model::Gender;
    use crate::data::region::Continent;

    fn dataset() -> Dataset {
        let mut rows = Vec::new();
        for (country, continent) in [
            ("France", Continent::Europe),
            ("Kenya", Continent::Africa),
            ("Peru", Continent::SouthAmerica),
        ] {
            for year in 2018..=2020 {
                for gender in [Gender::Male, Gender::Female] {
                    let mut rec = record(country, continent, year);
                    rec.gender = Some(gender);
                    rows.push(rec);
                }
            }
        }
        let mut orphan = record("Chad", Continent::Africa, 2020);
        orphan.gender = None;
        rows.push(orphan);
        Dataset::from_records(rows).unwrap()
    }

    #[test]
    fn test_empty_selection_keeps_everything() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new());
        assert_eq!(subset.len(), ds.len());
    }

    #[test]
    fn test_filter_is_sound_and_complete() {
        let ds = dataset();
        let selection = FilterSelection::new()
            .with_years(YearRange::between(2019, 2020))
            .with_value(Dimension::Region, "Africa")
            .with_value(Dimension::Gender, "Female");
        let kept = filtered_indices(&ds, &selection);
        for (i, rec) in ds.iter().enumerate() {
            let expected = (2019..=2020).contains(&rec.year)
                && rec.continent == Continent::Africa
                && rec.gender == Some(Gender::Female);
            assert_eq!(kept.contains(&i), expected, "row {i}: {rec:?}");
        }
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_preserves_source_order() {
        let ds = dataset();
        let selection = FilterSelection::new().with_year(2020);
        let kept = filtered_indices(&ds, &selection);
        let mut sorted = kept.clone();
        sorted.sort_unstable();
        assert_eq!(kept, sorted);
        assert_eq!(filtered_indices(&ds, &selection), kept);
    }

    #[test]
    fn test_no_match_is_empty_subset() {
        let ds = dataset();
        let selection = FilterSelection::new()
            .with_value(Dimension::Country, "France")
            .with_value(Dimension::Region, "Africa");
        assert!(filter(&ds, &selection).is_empty());
    }

    #[test]
    fn test_null_gender_needs_explicit_null() {
        let ds = dataset();
        let by_gender = FilterSelection::new().with_value(Dimension::Gender, "Male");
        assert!(filter(&ds, &by_gender).iter().all(|r| r.country != "Chad"));

        let with_null = by_gender.with_value(Dimension::Gender, DimensionValue::Null);
        assert!(filter(&ds, &with_null).iter().any(|r| r.country == "Chad"));
    }

    #[test]
    fn test_toggle_and_clear() {
        let selection = FilterSelection::new()
            .toggled(Dimension::Country, "Peru")
            .toggled(Dimension::Country, "Kenya");
        assert_eq!(selection.accepted(Dimension::Country).map(|s| s.len()), Some(2));

        let selection = selection
            .toggled(Dimension::Country, "Peru")
            .toggled(Dimension::Country, "Kenya");
        assert!(selection.accepted(Dimension::Country).is_none());
        assert!(selection.is_empty());

        let selection = FilterSelection::new().with_year(2019).cleared(Dimension::Year);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_open_year_range() {
        let ds = dataset();
        let selection = FilterSelection::new().with_years(YearRange {
            start: Some(2020),
            end: None,
        });
        let subset = filter(&ds, &selection);
        assert!(subset.iter().all(|r| r.year >= 2020));
        assert_eq!(subset.len(), 7);
    }

    #[test]
    fn test_refine_subset() {
        let ds = dataset();
        let subset = filter(&ds, &FilterSelection::new().with_year(2020));
        let refined = subset.refine(&FilterSelection::new().with_value(Dimension::Country, "Peru"));
        assert_eq!(refined.len(), 2);
        assert!(refined.iter().all(|r| r.country == "Peru" && r.year == 2020));
    }
}

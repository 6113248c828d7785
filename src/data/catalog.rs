use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filter::FilterSelection;
use super::model::{normalize_name, Dataset, DimensionValue, Gender, Metric, Record};
use super::region::Continent;
use crate::error::{DashError, Result};

// ---------------------------------------------------------------------------
// Dimension – filterable / groupable attributes
// ---------------------------------------------------------------------------

/// A categorical attribute of a record that can be filtered on or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Year,
    Region,
    Country,
    Gender,
    AgeGroup,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Year,
        Dimension::Region,
        Dimension::Country,
        Dimension::Gender,
        Dimension::AgeGroup,
    ];

    /// Column name in the merged source file.
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Year => "Year",
            Dimension::Region => "Region",
            Dimension::Country => "Country",
            Dimension::Gender => "Gender",
            Dimension::AgeGroup => "Age_Group",
        }
    }

    /// Value of this dimension on a record.
    pub fn value_of(self, record: &Record) -> DimensionValue {
        match self {
            Dimension::Year => DimensionValue::Year(record.year),
            Dimension::Region => DimensionValue::Text(record.continent.name().to_string()),
            Dimension::Country => DimensionValue::Text(record.country.clone()),
            Dimension::Gender => record.gender.map(|g| g.as_str()).into(),
            Dimension::AgeGroup => record.age_group.as_deref().into(),
        }
    }

    /// Parse a user-supplied value for this dimension.
    pub fn parse_value(self, raw: &str) -> Result<DimensionValue> {
        let raw = raw.trim();
        match self {
            Dimension::Year => raw
                .parse::<i32>()
                .map(DimensionValue::Year)
                .map_err(|_| DashError::InvalidValue {
                    field: "year".into(),
                    value: raw.to_string(),
                }),
            // Canonicalise spellings so the value matches what records hold.
            Dimension::Region => Ok(DimensionValue::Text(
                raw.parse::<Continent>()?.name().to_string(),
            )),
            Dimension::Gender => Ok(DimensionValue::Text(
                raw.parse::<Gender>()?.as_str().to_string(),
            )),
            Dimension::Country | Dimension::AgeGroup => Ok(DimensionValue::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Year => "year",
            Dimension::Region => "region",
            Dimension::Country => "country",
            Dimension::Gender => "gender",
            Dimension::AgeGroup => "age_group",
        };
        f.write_str(name)
    }
}

impl FromStr for Dimension {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_name(s).as_str() {
            "year" => Ok(Dimension::Year),
            "region" | "continent" => Ok(Dimension::Region),
            "country" => Ok(Dimension::Country),
            "gender" | "sex" => Ok(Dimension::Gender),
            "agegroup" | "age" | "agename" => Ok(Dimension::AgeGroup),
            _ => Err(DashError::UnknownDimension(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog – value domains of the loaded dataset
// ---------------------------------------------------------------------------

/// Valid values of every dimension plus the metrics that carry data, computed
/// once from the loaded dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    /// For each dimension the sorted set of values present in the dataset.
    domains: BTreeMap<Dimension, BTreeSet<DimensionValue>>,
    /// Metrics with at least one non-null value.
    metrics: Vec<Metric>,
    /// Country name → ISO alpha-3 code (first code seen).
    #[serde(skip)]
    country_codes: HashMap<String, String>,
    #[serde(skip)]
    continents: HashMap<String, Continent>,
}

impl Catalog {
    /// Build the domains from the dataset.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut domains: BTreeMap<Dimension, BTreeSet<DimensionValue>> = BTreeMap::new();
        let mut has_data = [false; Metric::COUNT];
        let mut country_codes = HashMap::new();
        let mut continents = HashMap::new();

        for rec in dataset.iter() {
            for dim in Dimension::ALL {
                domains.entry(dim).or_default().insert(dim.value_of(rec));
            }
            for (i, metric) in Metric::ALL.into_iter().enumerate() {
                has_data[i] |= rec.metric(metric).is_some();
            }
            continents
                .entry(rec.country.clone())
                .or_insert(rec.continent);
            if let Some(code) = &rec.country_code {
                country_codes
                    .entry(rec.country.clone())
                    .or_insert_with(|| code.clone());
            }
        }

        let metrics = Metric::ALL
            .into_iter()
            .zip(has_data)
            .filter_map(|(m, present)| present.then_some(m))
            .collect();

        Catalog {
            domains,
            metrics,
            country_codes,
            continents,
        }
    }

    /// Sorted values of a dimension (empty for an empty dataset).
    pub fn domain(&self, dimension: Dimension) -> impl Iterator<Item = &DimensionValue> {
        self.domains.get(&dimension).into_iter().flatten()
    }

    pub fn contains(&self, dimension: Dimension, value: &DimensionValue) -> bool {
        self.domains
            .get(&dimension)
            .is_some_and(|vals| vals.contains(value))
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.domain(Dimension::Year).filter_map(DimensionValue::as_year)
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years().max()
    }

    pub fn earliest_year(&self) -> Option<i32> {
        self.years().min()
    }

    pub fn country_code(&self, country: &str) -> Option<&str> {
        self.country_codes.get(country).map(String::as_str)
    }

    pub fn continent_of(&self, country: &str) -> Option<Continent> {
        self.continents.get(country).copied()
    }

    /// Selected values that do not occur in the dataset. They are not an
    /// error (the filter simply matches nothing), but worth surfacing.
    pub fn unknown_values(&self, selection: &FilterSelection) -> Vec<(Dimension, DimensionValue)> {
        selection
            .values()
            .flat_map(|(dim, vals)| {
                let dim = *dim;
                vals.iter()
                    .filter(move |v| !self.contains(dim, v))
                    .map(move |v| (dim, v.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn dataset() -> Dataset {
        let mut a = record("France", Continent::Europe, 2019);
        a.country_code = Some("FRA".into());
        a.metrics.set(Metric::MortalityRate, Some(120.0));
        let mut b = record("Kenya", Continent::Africa, 2020);
        b.gender = None;
        Dataset::from_records(vec![a, b]).unwrap()
    }

    #[test]
    fn test_domains_from_dataset() {
        let catalog = Catalog::from_dataset(&dataset());
        let years: Vec<i32> = catalog.years().collect();
        assert_eq!(years, vec![2019, 2020]);
        let regions: Vec<String> = catalog
            .domain(Dimension::Region)
            .map(|v| v.to_string())
            .collect();
        assert_eq!(regions, vec!["Africa", "Europe"]);
        assert!(catalog.contains(Dimension::Gender, &DimensionValue::Null));
        assert_eq!(catalog.latest_year(), Some(2020));
    }

    #[test]
    fn test_metrics_with_data_only() {
        let catalog = Catalog::from_dataset(&dataset());
        assert_eq!(catalog.metrics(), &[Metric::MortalityRate]);
        assert_eq!(catalog.country_code("France"), Some("FRA"));
        assert_eq!(catalog.country_code("Kenya"), None);
        assert_eq!(catalog.continent_of("Kenya"), Some(Continent::Africa));
    }

    #[test]
    fn test_dimension_parse_value_canonicalises() {
        assert_eq!(
            Dimension::Region.parse_value("north america").unwrap(),
            DimensionValue::from("North America")
        );
        assert_eq!(
            Dimension::Gender.parse_value("female").unwrap(),
            DimensionValue::from("Female")
        );
        assert_eq!(Dimension::Year.parse_value("2020").unwrap(), DimensionValue::Year(2020));
        assert!(Dimension::Year.parse_value("twenty").is_err());
        assert_eq!("continent".parse::<Dimension>().unwrap(), Dimension::Region);
        assert_eq!("Age_Group".parse::<Dimension>().unwrap(), Dimension::AgeGroup);
    }

    #[test]
    fn test_unknown_values_reported() {
        let catalog = Catalog::from_dataset(&dataset());
        let selection = FilterSelection::default()
            .with_value(Dimension::Country, "France")
            .with_value(Dimension::Country, "Atlantis");
        let unknown = catalog.unknown_values(&selection);
        assert_eq!(unknown, vec![(Dimension::Country, DimensionValue::from("Atlantis"))]);
    }
}

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::region::Continent;
use crate::error::{DashError, Result};

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Demographic slice of a record. `Both` is the combined row the source
/// publishes alongside the per-sex rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Both,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Both => "Both",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = DashError;

    /// Accepts the labels and the numeric codes used by the upstream
    /// preprocessing (`0` = male, `1` = female).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" | "0" | "0.0" => Ok(Gender::Male),
            "female" | "f" | "1" | "1.0" => Ok(Gender::Female),
            "both" | "both sexes" => Ok(Gender::Both),
            _ => Err(DashError::InvalidValue {
                field: "gender".into(),
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric – the numeric columns of a record
// ---------------------------------------------------------------------------

/// Every numeric column of the health dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MortalityRate,
    PrevalenceRate,
    IncidenceRate,
    GdpPerCapita,
    HealthExpenditurePctGdp,
    ObesityRate,
    PhysicalActivityRate,
    AlcoholConsumption,
    DiabetesPrevalence,
    LifeExpectancy,
}

impl Metric {
    pub const COUNT: usize = 10;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::MortalityRate,
        Metric::PrevalenceRate,
        Metric::IncidenceRate,
        Metric::GdpPerCapita,
        Metric::HealthExpenditurePctGdp,
        Metric::ObesityRate,
        Metric::PhysicalActivityRate,
        Metric::AlcoholConsumption,
        Metric::DiabetesPrevalence,
        Metric::LifeExpectancy,
    ];

    /// Heart-disease outcome metrics, the targets of the Sankey view.
    pub const OUTCOMES: [Metric; 3] = [
        Metric::PrevalenceRate,
        Metric::MortalityRate,
        Metric::IncidenceRate,
    ];

    /// Behavioural risk factors, in the order the flow diagram lists them.
    pub const RISK_FACTORS: [Metric; 4] = [
        Metric::AlcoholConsumption,
        Metric::ObesityRate,
        Metric::DiabetesPrevalence,
        Metric::PhysicalActivityRate,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case key used on the command line and in JSON output.
    pub fn key(self) -> &'static str {
        match self {
            Metric::MortalityRate => "mortality_rate",
            Metric::PrevalenceRate => "prevalence_rate",
            Metric::IncidenceRate => "incidence_rate",
            Metric::GdpPerCapita => "gdp_per_capita",
            Metric::HealthExpenditurePctGdp => "health_expenditure_pct_gdp",
            Metric::ObesityRate => "obesity_rate",
            Metric::PhysicalActivityRate => "physical_activity_rate",
            Metric::AlcoholConsumption => "alcohol_consumption",
            Metric::DiabetesPrevalence => "diabetes_prevalence",
            Metric::LifeExpectancy => "life_expectancy",
        }
    }

    /// Column name in the merged source file.
    pub fn column(self) -> &'static str {
        match self {
            Metric::MortalityRate => "MortalityRate",
            Metric::PrevalenceRate => "PrevalenceRate",
            Metric::IncidenceRate => "IncidenceRate",
            Metric::GdpPerCapita => "GDP",
            Metric::HealthExpenditurePctGdp => "Health_Expenditure (% of GDP)",
            Metric::ObesityRate => "Obesity_Prevalence_Rate",
            Metric::PhysicalActivityRate => "Activity_Prevalence_Rate",
            Metric::AlcoholConsumption => "Alcohol_Value",
            Metric::DiabetesPrevalence => "Diabetes_Prevalence_Rate",
            Metric::LifeExpectancy => "Life_Expectancy",
        }
    }

    /// Axis / legend label.
    pub fn label(self) -> &'static str {
        match self {
            Metric::MortalityRate => "Mortality Rate (per 100,000)",
            Metric::PrevalenceRate => "Prevalence Rate (per 100,000)",
            Metric::IncidenceRate => "Incidence Rate (per 100,000)",
            Metric::GdpPerCapita => "GDP per Capita (USD)",
            Metric::HealthExpenditurePctGdp => "Healthcare Expenditure (% of GDP)",
            Metric::ObesityRate => "Obesity Prevalence (%)",
            Metric::PhysicalActivityRate => "Physical Activity Prevalence (%)",
            Metric::AlcoholConsumption => "Alcohol Consumption (litres per capita)",
            Metric::DiabetesPrevalence => "Diabetes Prevalence (%)",
            Metric::LifeExpectancy => "Life Expectancy (years)",
        }
    }

    /// Short name used for Sankey levels ("High Obesity", ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Metric::MortalityRate => "Mortality",
            Metric::PrevalenceRate => "Prevalence",
            Metric::IncidenceRate => "Incidence",
            Metric::GdpPerCapita => "GDP",
            Metric::HealthExpenditurePctGdp => "Health Expenditure",
            Metric::ObesityRate => "Obesity",
            Metric::PhysicalActivityRate => "Physical Activity",
            Metric::AlcoholConsumption => "Alcohol",
            Metric::DiabetesPrevalence => "Diabetes",
            Metric::LifeExpectancy => "Life Expectancy",
        }
    }

    pub fn is_economic(self) -> bool {
        matches!(self, Metric::GdpPerCapita | Metric::HealthExpenditurePctGdp)
    }

    /// Extra accepted spellings, already normalised (lowercase alphanumerics).
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Metric::MortalityRate => &["mortality"],
            Metric::PrevalenceRate => &["prevalence"],
            Metric::IncidenceRate => &["incidence"],
            Metric::GdpPerCapita => &["gdp"],
            Metric::HealthExpenditurePctGdp => &["healthexpenditure"],
            Metric::ObesityRate => &["obesity"],
            Metric::PhysicalActivityRate => &["activity", "physicalactivity"],
            Metric::AlcoholConsumption => &["alcohol"],
            Metric::DiabetesPrevalence => &["diabetes"],
            Metric::LifeExpectancy => &[],
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lowercase and drop everything that is not alphanumeric, so
/// `MortalityRate`, `mortality_rate` and `Mortality Rate` compare equal.
pub(crate) fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for Metric {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_name(s);
        Metric::ALL
            .into_iter()
            .find(|m| {
                normalize_name(m.key()) == wanted
                    || normalize_name(m.column()) == wanted
                    || m.aliases().contains(&wanted.as_str())
            })
            .ok_or_else(|| DashError::UnknownMetric(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MetricValues – nullable numeric cells of one row
// ---------------------------------------------------------------------------

/// The numeric cells of one record. Missing data is `None`; NaN and
/// infinities from the source are stored as `None` too.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricValues([Option<f64>; Metric::COUNT]);

impl MetricValues {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0[metric.index()]
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        self.0[metric.index()] = value.filter(|v| v.is_finite());
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }
}

// ---------------------------------------------------------------------------
// DimensionValue – a single cell in a filterable / groupable column
// ---------------------------------------------------------------------------

/// Value of a categorical dimension. Used for filter selections, group keys
/// and catalog domains, so it has to be `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Null,
    Year(i32),
    Text(String),
}

impl DimensionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DimensionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_year(&self) -> Option<i32> {
        match self {
            DimensionValue::Year(y) => Some(*y),
            _ => None,
        }
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Null => write!(f, "<null>"),
            DimensionValue::Year(y) => write!(f, "{y}"),
            DimensionValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for DimensionValue {
    fn from(s: &str) -> Self {
        DimensionValue::Text(s.to_string())
    }
}

impl From<String> for DimensionValue {
    fn from(s: String) -> Self {
        DimensionValue::Text(s)
    }
}

impl From<i32> for DimensionValue {
    fn from(y: i32) -> Self {
        DimensionValue::Year(y)
    }
}

impl<T: Into<DimensionValue>> From<Option<T>> for DimensionValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DimensionValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the dataset
// ---------------------------------------------------------------------------

/// One country / year / demographic slice of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub country: String,
    /// ISO 3166-1 alpha-3 code, when the source carries one.
    pub country_code: Option<String>,
    pub continent: Continent,
    pub year: i32,
    pub gender: Option<Gender>,
    pub age_group: Option<String>,
    pub metrics: MetricValues,
}

impl Record {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(metric)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full dataset, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    /// Source rows dropped by the loader (empty country, bad year).
    skipped_rows: usize,
}

impl Dataset {
    /// Build the store, checking that every country resolves to a single
    /// continent across all of its rows.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut seen: HashMap<&str, Continent> = HashMap::new();
        for rec in &records {
            match seen.get(rec.country.as_str()) {
                Some(first) if *first != rec.continent => {
                    return Err(DashError::InconsistentContinent {
                        country: rec.country.clone(),
                        first: first.to_string(),
                        second: rec.continent.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(&rec.country, rec.continent);
                }
            }
        }
        Ok(Dataset {
            records,
            skipped_rows: 0,
        })
    }

    pub(crate) fn with_skipped_rows(mut self, skipped: usize) -> Self {
        self.skipped_rows = skipped;
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Compact record constructor shared by the unit tests of the data layer.
    pub(crate) fn record(country: &str, continent: Continent, year: i32) -> Record {
        Record {
            country: country.to_string(),
            country_code: None,
            continent,
            year,
            gender: Some(Gender::Both),
            age_group: Some("Age-standardized".to_string()),
            metrics: MetricValues::default(),
        }
    }

    #[test]
    fn test_metric_from_str_accepts_all_spellings() {
        assert_eq!("mortality_rate".parse::<Metric>().unwrap(), Metric::MortalityRate);
        assert_eq!("MortalityRate".parse::<Metric>().unwrap(), Metric::MortalityRate);
        assert_eq!("GDP".parse::<Metric>().unwrap(), Metric::GdpPerCapita);
        assert_eq!(
            "Health_Expenditure (% of GDP)".parse::<Metric>().unwrap(),
            Metric::HealthExpenditurePctGdp
        );
        assert_eq!("Alcohol_Value".parse::<Metric>().unwrap(), Metric::AlcoholConsumption);
        assert!("cholesterol".parse::<Metric>().is_err());
    }

    #[test]
    fn test_gender_numeric_codes() {
        assert_eq!("0".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("1".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("Both".parse::<Gender>().unwrap(), Gender::Both);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_metric_values_drop_nan() {
        let mut values = MetricValues::default();
        values.set(Metric::GdpPerCapita, Some(f64::NAN));
        assert_eq!(values.get(Metric::GdpPerCapita), None);
        values.set(Metric::GdpPerCapita, Some(1200.0));
        assert_eq!(values.get(Metric::GdpPerCapita), Some(1200.0));
    }

    #[test]
    fn test_inconsistent_continent_rejected() {
        let records = vec![
            record("Turkey", Continent::Asia, 2019),
            record("Turkey", Continent::Europe, 2020),
        ];
        let err = Dataset::from_records(records).unwrap_err();
        assert!(matches!(err, DashError::InconsistentContinent { .. }));
    }

    #[test]
    fn test_consistent_dataset_accepted() {
        let records = vec![
            record("France", Continent::Europe, 2019),
            record("France", Continent::Europe, 2020),
            record("Kenya", Continent::Africa, 2020),
        ];
        let ds = Dataset::from_records(records).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.skipped_rows(), 0);
    }
}

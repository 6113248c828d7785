use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::model::normalize_name;
use crate::error::{DashError, Result};

// ---------------------------------------------------------------------------
// Continent
// ---------------------------------------------------------------------------

/// Continental region used by the region filter and continent groupings.
/// The Americas are split into North and South.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Continent {
    Africa,
    Asia,
    Europe,
    NorthAmerica,
    SouthAmerica,
    Oceania,
    Unknown,
}

impl Continent {
    pub const KNOWN: [Continent; 6] = [
        Continent::Africa,
        Continent::Asia,
        Continent::Europe,
        Continent::NorthAmerica,
        Continent::SouthAmerica,
        Continent::Oceania,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::SouthAmerica => "South America",
            Continent::Oceania => "Oceania",
            Continent::Unknown => "Unknown Region",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Continent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Continent {
    type Err = DashError;

    /// Accepts full names ("North America") and two-letter continent codes.
    fn from_str(s: &str) -> Result<Self> {
        match normalize_name(s).as_str() {
            "africa" | "af" => Ok(Continent::Africa),
            "asia" | "as" => Ok(Continent::Asia),
            "europe" | "eu" => Ok(Continent::Europe),
            "northamerica" | "na" => Ok(Continent::NorthAmerica),
            "southamerica" | "sa" => Ok(Continent::SouthAmerica),
            "oceania" | "oc" => Ok(Continent::Oceania),
            "unknownregion" | "unknown" => Ok(Continent::Unknown),
            _ => Err(DashError::InvalidValue {
                field: "region".into(),
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup collaborator
// ---------------------------------------------------------------------------

/// Maps a country code to its continent. Pure lookup, no I/O.
pub trait ContinentLookup {
    fn continent_of(&self, country_code: &str) -> Option<Continent>;
}

/// ISO 3166-1 alpha-3 codes per continent.
const AFRICA: &[&str] = &[
    "DZA", "AGO", "BEN", "BWA", "BFA", "BDI", "CPV", "CMR", "CAF", "TCD", "COM", "COG", "COD",
    "CIV", "DJI", "EGY", "GNQ", "ERI", "SWZ", "ETH", "GAB", "GMB", "GHA", "GIN", "GNB", "KEN",
    "LSO", "LBR", "LBY", "MDG", "MWI", "MLI", "MRT", "MUS", "MYT", "MAR", "MOZ", "NAM", "NER",
    "NGA", "REU", "RWA", "SHN", "STP", "SEN", "SYC", "SLE", "SOM", "ZAF", "SSD", "SDN", "TZA",
    "TGO", "TUN", "UGA", "ESH", "ZMB", "ZWE",
];

const ASIA: &[&str] = &[
    "AFG", "ARM", "AZE", "BHR", "BGD", "BTN", "BRN", "KHM", "CHN", "CYP", "GEO", "HKG", "IND",
    "IDN", "IRN", "IRQ", "ISR", "JPN", "JOR", "KAZ", "KWT", "KGZ", "LAO", "LBN", "MAC", "MYS",
    "MDV", "MNG", "MMR", "NPL", "PRK", "OMN", "PAK", "PSE", "PHL", "QAT", "SAU", "SGP", "KOR",
    "LKA", "SYR", "TWN", "TJK", "THA", "TUR", "TKM", "ARE", "UZB", "VNM", "YEM",
];

const EUROPE: &[&str] = &[
    "ALB", "AND", "AUT", "BLR", "BEL", "BIH", "BGR", "HRV", "CZE", "DNK", "EST", "FRO", "FIN",
    "FRA", "DEU", "GIB", "GRC", "GGY", "HUN", "ISL", "IRL", "IMN", "ITA", "JEY", "LVA", "LIE",
    "LTU", "LUX", "MLT", "MDA", "MCO", "MNE", "NLD", "MKD", "NOR", "POL", "PRT", "ROU", "RUS",
    "SMR", "SRB", "SVK", "SVN", "ESP", "SWE", "CHE", "UKR", "GBR", "VAT", "ALA",
];

const NORTH_AMERICA: &[&str] = &[
    "AIA", "ATG", "ABW", "BHS", "BRB", "BLZ", "BMU", "VGB", "CAN", "CYM", "CRI", "CUB", "CUW",
    "DMA", "DOM", "SLV", "GRL", "GRD", "GLP", "GTM", "HTI", "HND", "JAM", "MTQ", "MEX", "MSR",
    "NIC", "PAN", "PRI", "KNA", "LCA", "SPM", "VCT", "TTO", "TCA", "USA", "VIR", "BES", "MAF",
    "BLM",
];

const SOUTH_AMERICA: &[&str] = &[
    "ARG", "BOL", "BRA", "CHL", "COL", "ECU", "FLK", "GUF", "GUY", "PRY", "PER", "SUR", "URY",
    "VEN",
];

const OCEANIA: &[&str] = &[
    "ASM", "AUS", "COK", "FJI", "PYF", "GUM", "KIR", "MHL", "FSM", "NRU", "NCL", "NZL", "NIU",
    "NFK", "MNP", "PLW", "PNG", "PCN", "WSM", "SLB", "TKL", "TON", "TUV", "VUT", "WLF",
];

/// Codes that are not (or not reliably) in the ISO table but appear in the
/// merged dataset.
const MANUAL_OVERRIDES: &[(&str, Continent)] = &[
    ("XKX", Continent::Europe),
    ("OWID_KOS", Continent::Europe),
    ("SXM", Continent::NorthAmerica),
    ("TLS", Continent::Asia),
];

/// Static alpha-3 → continent table with manual overrides.
#[derive(Debug, Clone)]
pub struct IsoContinentTable {
    table: HashMap<String, Continent>,
}

impl Default for IsoContinentTable {
    fn default() -> Self {
        let groups: [(&[&str], Continent); 6] = [
            (AFRICA, Continent::Africa),
            (ASIA, Continent::Asia),
            (EUROPE, Continent::Europe),
            (NORTH_AMERICA, Continent::NorthAmerica),
            (SOUTH_AMERICA, Continent::SouthAmerica),
            (OCEANIA, Continent::Oceania),
        ];
        let mut table = HashMap::new();
        for (codes, continent) in groups {
            for code in codes {
                table.insert(code.to_string(), continent);
            }
        }
        for (code, continent) in MANUAL_OVERRIDES {
            table.insert(code.to_string(), *continent);
        }
        IsoContinentTable { table }
    }
}

impl IsoContinentTable {
    /// Add or replace a mapping.
    pub fn with_override(mut self, code: &str, continent: Continent) -> Self {
        self.table.insert(code.to_ascii_uppercase(), continent);
        self
    }
}

impl ContinentLookup for IsoContinentTable {
    fn continent_of(&self, country_code: &str) -> Option<Continent> {
        self.table
            .get(country_code.trim().to_ascii_uppercase().as_str())
            .copied()
    }
}

impl<F> ContinentLookup for F
where
    F: Fn(&str) -> Option<Continent>,
{
    fn continent_of(&self, country_code: &str) -> Option<Continent> {
        self(country_code)
    }
}

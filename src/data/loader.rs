use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{normalize_name, Dataset, Gender, Metric, MetricValues, Record};
use super::region::{Continent, ContinentLookup, IsoContinentTable};
use crate::error::DashError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the health dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – the merged dataset as written by pandas / polars (recommended)
/// * `.json`    – `[{ "Country": "France", "Year": 2020, ... }, ...]`
/// * `.csv`     – header row with column names
///
/// Continents come from a `Region` column when present, otherwise from the
/// built-in ISO table keyed by `Country_Code`.
pub fn load_file(path: &Path) -> Result<Dataset> {
    load_file_with(path, &IsoContinentTable::default())
}

/// Same as [`load_file`] with a caller-supplied continent lookup.
pub fn load_file_with(path: &Path, lookup: &dyn ContinentLookup) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "parquet" | "pq" => parquet_rows(path)?,
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            json_rows(&text)?
        }
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            csv_rows(file)?
        }
        other => return Err(DashError::UnsupportedFormat(other.to_string()).into()),
    };

    let dataset = build_dataset(rows, lookup)
        .with_context(|| format!("building dataset from {}", path.display()))?;
    log::info!(
        "loaded {} records from {} ({} rows skipped)",
        dataset.len(),
        path.display(),
        dataset.skipped_rows()
    );
    Ok(dataset)
}

/// Parse CSV content from any reader.
pub fn read_csv<R: Read>(reader: R, lookup: &dyn ContinentLookup) -> Result<Dataset> {
    build_dataset(csv_rows(reader)?, lookup)
}

/// Parse a JSON array of records.
pub fn read_json(text: &str, lookup: &dyn ContinentLookup) -> Result<Dataset> {
    build_dataset(json_rows(text)?, lookup)
}

// ---------------------------------------------------------------------------
// Column classification
// ---------------------------------------------------------------------------

/// Which record field a source column feeds.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Country,
    CountryCode,
    Year,
    Gender,
    AgeGroup,
    Region,
    Metric(Metric),
}

impl Column {
    /// Map a header to a field. Unknown headers are ignored by the loaders.
    fn classify(header: &str) -> Option<Column> {
        match normalize_name(header).as_str() {
            "country" | "location" => Some(Column::Country),
            "countrycode" | "code" => Some(Column::CountryCode),
            "year" => Some(Column::Year),
            "gender" | "sex" => Some(Column::Gender),
            "agegroup" | "agename" => Some(Column::AgeGroup),
            "region" | "continent" => Some(Column::Region),
            _ => header.parse::<Metric>().ok().map(Column::Metric),
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Column::Year | Column::Metric(_))
    }
}

/// A raw cell before it is assigned to a record field.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{}", n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    fn number(self) -> Option<f64> {
        let value = match self {
            Cell::Null => None,
            Cell::Number(n) => Some(n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|v| v.is_finite())
    }
}

/// One source row, fields still unvalidated.
#[derive(Debug, Default)]
struct RawRow {
    country: Option<String>,
    country_code: Option<String>,
    year: Option<f64>,
    gender: Option<String>,
    age_group: Option<String>,
    region: Option<String>,
    metrics: MetricValues,
}

impl RawRow {
    fn set(&mut self, column: Column, cell: Cell) {
        match column {
            Column::Country => self.country = cell.text(),
            Column::CountryCode => self.country_code = cell.text(),
            Column::Year => self.year = cell.number(),
            Column::Gender => self.gender = cell.text(),
            Column::AgeGroup => self.age_group = cell.text(),
            Column::Region => self.region = cell.text(),
            Column::Metric(m) => self.metrics.set(m, cell.number()),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn build_dataset(rows: Vec<RawRow>, lookup: &dyn ContinentLookup) -> Result<Dataset> {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for (row_no, raw) in rows.into_iter().enumerate() {
        let Some(country) = raw.country else {
            log::debug!("row {row_no}: empty country, skipped");
            skipped += 1;
            continue;
        };
        let year = match raw.year {
            Some(y) if y.fract() == 0.0 && y >= i32::MIN as f64 && y <= i32::MAX as f64 => y as i32,
            other => {
                log::debug!("row {row_no}: invalid year {other:?} for {country}, skipped");
                skipped += 1;
                continue;
            }
        };

        let continent = raw
            .region
            .as_deref()
            .and_then(|r| r.parse::<Continent>().ok())
            .filter(|c| *c != Continent::Unknown)
            .or_else(|| raw.country_code.as_deref().and_then(|c| lookup.continent_of(c)))
            .unwrap_or(Continent::Unknown);

        let gender = raw.gender.as_deref().and_then(|g| match g.parse::<Gender>() {
            Ok(g) => Some(g),
            Err(_) => {
                log::debug!("row {row_no}: unrecognised gender '{g}'");
                None
            }
        });

        records.push(Record {
            country,
            country_code: raw.country_code,
            continent,
            year,
            gender,
            age_group: raw.age_group,
            metrics: raw.metrics,
        });
    }

    // Rows of a country missing its code inherit the continent resolved on
    // its other rows.
    let resolved: HashMap<String, Continent> = records
        .iter()
        .filter(|r| r.continent != Continent::Unknown)
        .map(|r| (r.country.clone(), r.continent))
        .collect();
    for rec in records.iter_mut().filter(|r| r.continent == Continent::Unknown) {
        if let Some(continent) = resolved.get(&rec.country) {
            rec.continent = *continent;
        }
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} rows with an empty country or invalid year");
    }

    Ok(Dataset::from_records(records)?.with_skipped_rows(skipped))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Country": "France", "Country_Code": "FRA", "Year": 2020,
///     "Gender": "Both", "Age_Group": "Age-standardized", "MortalityRate": 120.5 },
///   ...
/// ]
/// ```
fn json_rows(text: &str) -> Result<Vec<RawRow>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = RawRow::default();
        for (key, val) in obj {
            if let Some(column) = Column::classify(key) {
                row.set(column, json_to_cell(val));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::Null => Cell::Null,
        JsonValue::Number(n) => n.as_f64().map_or(Cell::Null, Cell::Number),
        JsonValue::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line. Empty
/// cells are null.
fn csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns: Vec<Option<Column>> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(Column::classify)
        .collect();

    if !columns.contains(&Some(Column::Country)) {
        bail!("CSV missing 'Country' column");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut row = RawRow::default();
        for (column, value) in columns.iter().zip(record.iter()) {
            if let Some(column) = column {
                row.set(*column, Cell::Text(value.to_string()));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load the merged dataset from Parquet.
///
/// Text columns of any string or dictionary type and numeric columns of any
/// integer or float type are accepted; everything is cast to `Utf8` or
/// `Float64` before reading.
fn parquet_rows(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let mut columns: Vec<(Column, ArrayRef)> = Vec::new();
        for (idx, field) in schema.fields().iter().enumerate() {
            let Some(column) = Column::classify(field.name()) else {
                continue;
            };
            let target = if column.is_numeric() {
                DataType::Float64
            } else {
                DataType::Utf8
            };
            let array = cast(batch.column(idx), &target)
                .with_context(|| format!("casting column '{}' to {target:?}", field.name()))?;
            columns.push((column, array));
        }

        for row in 0..batch.num_rows() {
            let mut raw = RawRow::default();
            for (column, array) in &columns {
                raw.set(*column, arrow_cell(array, row));
            }
            rows.push(raw);
        }
    }

    Ok(rows)
}

/// Read one cell of a column already cast to `Utf8` or `Float64`.
fn arrow_cell(array: &ArrayRef, row: usize) -> Cell {
    if array.is_null(row) {
        return Cell::Null;
    }
    match array.data_type() {
        DataType::Float64 => Cell::Number(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Cell::Text(array.as_string::<i32>().value(row).to_string()),
        _ => Cell::Null,
    }
}

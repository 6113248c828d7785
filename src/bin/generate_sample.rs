use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use healthdash::data::model::Metric;

/// Writes a synthetic country-level heart disease dataset.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// `.parquet` or `.csv`.
    #[arg(long, default_value = "sample_health.parquet")]
    output: PathBuf,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 2010)]
    first_year: i32,
    #[arg(long, default_value_t = 2019)]
    last_year: i32,
    /// Share of metric cells left empty.
    #[arg(long, default_value_t = 0.03)]
    null_rate: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (country, ISO alpha-3, mortality baseline, GDP per capita baseline)
const COUNTRIES: [(&str, &str, f64, f64); 12] = [
    ("France", "FRA", 95.0, 40_000.0),
    ("Germany", "DEU", 140.0, 46_000.0),
    ("Russia", "RUS", 420.0, 11_000.0),
    ("Kenya", "KEN", 210.0, 1_800.0),
    ("Nigeria", "NGA", 250.0, 2_200.0),
    ("India", "IND", 270.0, 2_000.0),
    ("Japan", "JPN", 60.0, 39_000.0),
    ("United States", "USA", 150.0, 62_000.0),
    ("Mexico", "MEX", 170.0, 9_500.0),
    ("Brazil", "BRA", 180.0, 8_800.0),
    ("Peru", "PER", 90.0, 6_900.0),
    ("Australia", "AUS", 80.0, 55_000.0),
];

const GENDERS: [(&str, f64); 3] = [("Male", 1.25), ("Female", 0.8), ("Both", 1.0)];

const AGE_GROUPS: [(&str, f64); 2] = [("Age-standardized", 1.0), ("All ages", 1.3)];

struct Row {
    country: &'static str,
    code: &'static str,
    year: i32,
    gender: &'static str,
    age_group: &'static str,
    metrics: Vec<Option<f64>>,
}

fn generate(args: &Args) -> Vec<Row> {
    let mut rng = SimpleRng::new(args.seed);
    let mut rows = Vec::new();

    for &(country, code, mortality, gdp) in &COUNTRIES {
        let affluence = (gdp / 60_000.0).min(1.0);
        for year in args.first_year..=args.last_year {
            let t = (year - args.first_year) as f64;
            for &(gender, gender_factor) in &GENDERS {
                for &(age_group, age_factor) in &AGE_GROUPS {
                    let scale = gender_factor * age_factor;
                    let mut value = |metric: Metric| -> f64 {
                        let base = match metric {
                            Metric::MortalityRate => mortality * scale * (1.0 - 0.01 * t),
                            Metric::PrevalenceRate => mortality * 28.0 * scale,
                            Metric::IncidenceRate => mortality * 2.4 * scale,
                            Metric::GdpPerCapita => gdp * (1.0 + 0.02 * t),
                            Metric::HealthExpenditurePctGdp => 3.0 + 8.0 * affluence,
                            Metric::ObesityRate => 6.0 + 22.0 * affluence + 0.3 * t,
                            Metric::PhysicalActivityRate => 20.0 + 15.0 * affluence,
                            Metric::AlcoholConsumption => 2.0 + 9.0 * affluence,
                            Metric::DiabetesPrevalence => 5.0 + 4.0 * affluence + 0.1 * t,
                            Metric::LifeExpectancy => 60.0 + 22.0 * affluence + 0.15 * t,
                        };
                        (base * (1.0 + rng.gauss(0.0, 0.05))).max(0.0)
                    };
                    let metrics = Metric::ALL.into_iter().map(&mut value).collect::<Vec<_>>();
                    let metrics = metrics
                        .into_iter()
                        .map(|v| (rng.next_f64() >= args.null_rate).then_some(v))
                        .collect();
                    rows.push(Row {
                        country,
                        code,
                        year,
                        gender,
                        age_group,
                        metrics,
                    });
                }
            }
        }
    }
    rows
}

const TEXT_COLUMNS: [&str; 4] = ["Country", "Country_Code", "Gender", "Age_Group"];

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    let mut header: Vec<&str> = TEXT_COLUMNS.to_vec();
    header.insert(2, "Year");
    header.extend(Metric::ALL.iter().map(|m| m.column()));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.country.to_string(),
            row.code.to_string(),
            row.year.to_string(),
            row.gender.to_string(),
            row.age_group.to_string(),
        ];
        record.extend(
            row.metrics
                .iter()
                .map(|v| v.map(|v| format!("{v:.3}")).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let text = |f: fn(&Row) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let mut fields = vec![
        Field::new("Country", DataType::Utf8, false),
        Field::new("Country_Code", DataType::Utf8, false),
        Field::new("Year", DataType::Int64, false),
        Field::new("Gender", DataType::Utf8, false),
        Field::new("Age_Group", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        text(|r| r.country),
        text(|r| r.code),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.year as i64).collect::<Vec<_>>(),
        )),
        text(|r| r.gender),
        text(|r| r.age_group),
    ];
    for (i, metric) in Metric::ALL.iter().enumerate() {
        fields.push(Field::new(metric.column(), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|r| r.metrics[i]).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating Parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.first_year > args.last_year {
        bail!("--first-year must not be after --last-year");
    }

    let rows = generate(&args);
    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(&args.output, &rows)?,
        "csv" => write_csv(&args.output, &rows)?,
        other => bail!("unsupported output extension {other:?}, use .parquet or .csv"),
    }

    log::info!("wrote {} rows to {}", rows.len(), args.output.display());
    println!("Wrote {} rows to {}", rows.len(), args.output.display());
    Ok(())
}

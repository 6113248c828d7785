use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use healthdash::chart::ChartKind;
use healthdash::data::catalog::Dimension;
use healthdash::data::filter::{FilterSelection, YearRange};
use healthdash::data::loader::load_file;
use healthdash::data::model::Metric;
use healthdash::{ChartRequest, Dashboard, DashboardConfig};

#[derive(Parser)]
#[command(name = "healthdash", version, about = "Cardiovascular health dashboard data service")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Dataset file; overrides the configuration.
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
    /// Compact JSON instead of pretty-printed.
    #[arg(long, global = true)]
    compact: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Headline statistics: countries, latest year, risk-factor trends.
    Overview,
    /// Values of every dimension and the metrics with data.
    Domains,
    /// Shape one chart for a filter selection.
    Chart(ChartArgs),
}

#[derive(Args)]
struct FilterArgs {
    /// Single year.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    year: Option<i32>,
    #[arg(long)]
    from: Option<i32>,
    #[arg(long)]
    to: Option<i32>,
    #[arg(long = "region", value_delimiter = ',')]
    regions: Vec<String>,
    #[arg(long = "country", value_delimiter = ',')]
    countries: Vec<String>,
    /// Replaces the configured default gender.
    #[arg(long)]
    gender: Option<String>,
    /// Replaces the configured default age group.
    #[arg(long)]
    age_group: Option<String>,
    /// Start from an empty selection instead of the configured defaults.
    #[arg(long)]
    no_defaults: bool,
}

#[derive(Args)]
struct ChartArgs {
    #[arg(long)]
    kind: ChartKind,
    #[arg(long, default_value = "mortality_rate")]
    metric: Metric,
    /// Bar charts: `region` for continent averages; line charts: series split.
    #[arg(long)]
    by: Option<Dimension>,
    /// Bar charts: number of countries.
    #[arg(long, value_parser = parse_top_n)]
    top: Option<usize>,
    #[arg(long, default_value = "gdp_per_capita")]
    x: Metric,
    #[arg(long, default_value = "mortality_rate")]
    y: Metric,
    /// Heatmap features; every metric with data when omitted.
    #[arg(long, value_delimiter = ',')]
    features: Vec<Metric>,
    /// Sankey target metric.
    #[arg(long, default_value = "prevalence_rate")]
    target: Metric,
    #[command(flatten)]
    filters: FilterArgs,
}

impl ChartArgs {
    fn request(&self) -> ChartRequest {
        match self.kind {
            ChartKind::Choropleth => ChartRequest::Choropleth {
                metric: self.metric,
            },
            ChartKind::Bar if self.by == Some(Dimension::Region) => {
                ChartRequest::ContinentAverages {
                    metric: self.metric,
                }
            }
            ChartKind::Bar => ChartRequest::TopCountries {
                metric: self.metric,
                n: self.top,
            },
            ChartKind::Line => ChartRequest::Trend {
                metric: self.metric,
                by: self.by,
            },
            ChartKind::Scatter => ChartRequest::Scatter {
                x: self.x,
                y: self.y,
            },
            ChartKind::Heatmap => ChartRequest::Heatmap {
                features: self.features.clone(),
            },
            ChartKind::Sankey => ChartRequest::Sankey {
                target: self.target,
            },
        }
    }
}

impl FilterArgs {
    fn selection(&self, dashboard: &Dashboard) -> Result<FilterSelection> {
        let mut selection = if self.no_defaults {
            FilterSelection::new()
        } else {
            dashboard.config().default_selection(dashboard.catalog())
        };

        if let Some(year) = self.year {
            selection = selection.with_year(year);
        } else if self.from.is_some() || self.to.is_some() {
            selection = selection.with_years(YearRange {
                start: self.from,
                end: self.to,
            });
        }

        let singles = [
            (Dimension::Gender, self.gender.as_deref()),
            (Dimension::AgeGroup, self.age_group.as_deref()),
        ];
        for (dimension, raw) in singles {
            if let Some(raw) = raw {
                let value = dimension.parse_value(raw)?;
                selection = selection.cleared(dimension).with_value(dimension, value);
            }
        }

        for (dimension, raws) in [
            (Dimension::Region, &self.regions),
            (Dimension::Country, &self.countries),
        ] {
            for raw in raws {
                selection = selection.with_value(dimension, dimension.parse_value(raw)?);
            }
        }
        Ok(selection)
    }
}

fn parse_top_n(raw: &str) -> std::result::Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DashboardConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.dataset {
        config.dataset = Some(path);
    }
    let path = config
        .dataset
        .clone()
        .context("no dataset given: pass --dataset or set HEALTHDASH_DATASET")?;
    let dataset = load_file(&path)?;
    let dashboard = Dashboard::new(dataset, config);

    match &cli.command {
        Command::Overview => print_json(&dashboard.key_stats(), cli.compact),
        Command::Domains => print_json(dashboard.catalog(), cli.compact),
        Command::Chart(args) => {
            let view = healthdash::ViewState {
                selection: args.filters.selection(&dashboard)?,
                request: args.request(),
            };
            print_json(&dashboard.render(&view), cli.compact)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_must_be_positive() {
        assert_eq!(parse_top_n("5"), Ok(5));
        assert!(parse_top_n("0").is_err());
        assert!(parse_top_n("ten").is_err());
    }

    #[test]
    fn test_cli_rejects_zero_top() {
        let parsed = Cli::try_parse_from([
            "healthdash", "--dataset", "x.csv", "chart", "--kind", "bar", "--top", "0",
        ]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "healthdash", "--dataset", "x.csv", "chart", "--kind", "bar", "--top", "3",
        ]);
        assert!(parsed.is_ok());
    }
}

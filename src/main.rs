use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use health_survey::{ChartKind, ChartSelection, DashboardState, Settings};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Chart {
    /// Outcome distribution by income level.
    Distribution,
    /// Mean health score by food security and immigrant status.
    CrossTab,
    /// Behavior against health utility, colored by income.
    Scatter,
}

impl From<Chart> for ChartKind {
    fn from(chart: Chart) -> Self {
        match chart {
            Chart::Distribution => ChartKind::Distribution,
            Chart::CrossTab => ChartKind::CrossTab,
            Chart::Scatter => ChartKind::Scatter,
        }
    }
}

/// Load the health survey once and print one chart's data as JSON.
#[derive(Parser, Debug)]
#[command(name = "health-survey", version, about)]
struct Args {
    /// JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raw survey file (overrides the config).
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Where to write the decoded table (overrides the config).
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Print the filter options instead of a chart.
    #[arg(long)]
    options: bool,

    #[arg(long, value_enum, default_value = "distribution")]
    chart: Chart,

    #[arg(long, default_value = "All")]
    province: String,

    /// One of 12-19, 20-34, 35-49, 50-64, 65+.
    #[arg(long, default_value = "All")]
    age_group: String,

    #[arg(long, default_value = "All")]
    gender: String,

    #[arg(long, default_value = "All")]
    income: String,

    #[arg(long, default_value = "All")]
    immigrant: String,

    #[arg(long, default_value = "All")]
    aboriginal: String,

    /// Outcome variable for distribution and cross-tab charts.
    #[arg(long)]
    outcome: Option<String>,

    /// Behavior variable for the scatter chart.
    #[arg(long)]
    behavior: Option<String>,

    /// Increase output logging verbosity.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(raw) = &args.raw {
        settings.raw_path = raw.clone();
    }
    if let Some(cache) = &args.cache {
        settings.cache_path = cache.clone();
    }

    let state = DashboardState::load(&settings);
    log::info!("{}", state.status_message());

    let json = if args.options {
        serde_json::to_string_pretty(state.options())
    } else {
        let defaults = ChartSelection::default();
        let selection = ChartSelection {
            province: args.province,
            age_group: args.age_group,
            gender: args.gender,
            income: args.income,
            immigrant: args.immigrant,
            aboriginal: args.aboriginal,
            outcome_var: args.outcome.unwrap_or(defaults.outcome_var),
            behavior_var: args.behavior.unwrap_or(defaults.behavior_var),
        };
        serde_json::to_string_pretty(&state.render(&selection, args.chart.into()))
    }
    .context("serializing output")?;

    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_flag_maps_to_chart_kind() {
        let args = Args::try_parse_from(["health-survey", "--chart", "cross-tab"]).unwrap();
        assert_eq!(ChartKind::from(args.chart), ChartKind::CrossTab);

        let args = Args::try_parse_from(["health-survey"]).unwrap();
        assert_eq!(ChartKind::from(args.chart), ChartKind::Distribution);
        assert!(Args::try_parse_from(["health-survey", "--chart", "pie"]).is_err());
    }
}

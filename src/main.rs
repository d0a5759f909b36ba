use anyhow::{Context, Result};
use blister::config::{AppConfig, OutputFormat};
use blister::dedup::deduplicate_with_report;
use blister::insights::{Band, MetricInsights};
use blister::logging::{init_logging, LogFormat};
use blister::{analyze_whoop, BlisterError, MetricsEngine, MetricsResponse, PerformanceMetrics, PlatformData, WhoopAnalysis};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::Level;

/// Blister - training load and readiness from synced platform data
///
/// Reads platform JSON documents (WHOOP, Strava) as stored by the sync
/// layer and computes training load, readiness and summary statistics.
#[derive(Parser)]
#[command(name = "blister")]
#[command(version)]
#[command(about = "Training load and readiness metrics", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute performance metrics for one or more platform documents
    Metrics {
        /// Platform JSON documents
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Evaluate as of this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<String>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Summarize the WHOOP section of a platform document
    Whoop {
        file: PathBuf,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the normalized, deduplicated workout list
    Dedup { file: PathBuf },

    /// Show or initialize the configuration file
    Config {
        /// Print the effective configuration (default)
        #[arg(long, conflicts_with = "init")]
        show: bool,

        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl Row {
    fn new(metric: &str, value: impl ToString) -> Self {
        Row {
            metric: metric.to_string(),
            value: value.to_string(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let config = if cli.config.is_some() {
        AppConfig::load_from_file(&config_path)?
    } else {
        AppConfig::load_or_default()?
    };

    let mut log_config = config.logging.clone().with_verbosity(cli.verbose);
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Metrics { files, now, format } => {
            let now = match now {
                Some(ts) => DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| BlisterError::Validation(format!("--now {:?}: {}", ts, e)))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let format = format.unwrap_or(config.output.default_format);
            let engine = MetricsEngine::with_config(config.metrics.clone());

            let responses: Vec<(PathBuf, Result<MetricsResponse>)> = files
                .par_iter()
                .map(|path| (path.clone(), metrics_for_file(&engine, path, now)))
                .collect();

            let mut failures = 0;
            for (path, response) in responses {
                match response {
                    Ok(response) => print_metrics(&path, &response, format, config.output.pretty_json)?,
                    Err(e) => {
                        failures += 1;
                        let (level, message) = match e.downcast_ref::<BlisterError>() {
                            Some(err) => (err.severity().to_tracing_level(), err.user_message()),
                            None => (Level::ERROR, format!("{:#}", e)),
                        };
                        log_failure(level, &path, &e);
                        eprintln!("{} {}: {}", "✗".red(), path.display(), message);
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} of {} documents failed", failures, files.len());
            }
        }

        Commands::Whoop { file, format } => {
            let data = read_platform_data(&file)?;
            let format = format.unwrap_or(config.output.default_format);
            match data.whoop.as_ref().and_then(analyze_whoop) {
                Some(analysis) => print_whoop(&analysis, format, config.output.pretty_json)?,
                None => println!("{}", "No WHOOP data available".yellow()),
            }
        }

        Commands::Dedup { file } => {
            let data = read_platform_data(&file)?;
            let normalized = data.normalize();
            let outcome = deduplicate_with_report(normalized.workouts);
            eprintln!(
                "{}",
                format!(
                    "{} workouts kept, {} duplicates removed, {} records skipped",
                    outcome.retained.len(),
                    outcome.discarded,
                    normalized.skipped
                )
                .dimmed()
            );
            println!("{}", to_json(&outcome.retained, config.output.pretty_json)?);
        }

        Commands::Config { show, init } => {
            if init {
                if config_path.exists() {
                    println!("Config already exists: {}", config_path.display());
                } else {
                    let mut fresh = AppConfig::default();
                    fresh.save_to_file(&config_path)?;
                    println!("{} {}", "✓ Wrote".green(), config_path.display());
                }
            }

            if shows_config(show, init) {
                println!("{}", format!("# {}", config_path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// `--show` is implied unless only `--init` was given
fn shows_config(show: bool, init: bool) -> bool {
    show || !init
}

fn log_failure(level: Level, path: &Path, error: &anyhow::Error) {
    if level == Level::ERROR {
        tracing::error!(path = %path.display(), error = %error, "Failed to compute metrics");
    } else if level == Level::WARN {
        tracing::warn!(path = %path.display(), error = %error, "Failed to compute metrics");
    } else {
        tracing::info!(path = %path.display(), error = %error, "Failed to compute metrics");
    }
}

fn read_platform_data(path: &Path) -> Result<PlatformData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    PlatformData::from_json(&content).with_context(|| format!("Invalid platform data in {}", path.display()))
}

fn metrics_for_file(engine: &MetricsEngine, path: &Path, now: DateTime<Utc>) -> Result<MetricsResponse> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let response = MetricsResponse::from_platform_json(engine, &document, now)?;
    Ok(response)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn print_metrics(path: &Path, response: &MetricsResponse, format: OutputFormat, pretty: bool) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", to_json(response, pretty)?);
        return Ok(());
    }

    println!("{}", path.display().to_string().blue().bold());
    let Some(metrics) = &response.metrics else {
        println!("  {}", response.message.as_deref().unwrap_or("No metrics").yellow());
        return Ok(());
    };

    println!("{}", metrics_table(metrics));

    if let Some(insights) = &response.insights {
        print_insights(insights);
    }
    if let Some(last_sync) = &response.last_sync {
        println!("  Last sync: {}", last_sync.dimmed());
    }
    Ok(())
}

fn metrics_table(metrics: &PerformanceMetrics) -> String {
    let mut rows = vec![
        Row::new("Recent training load (ATL)", format!("{:.1}", metrics.recent_training_load)),
        Row::new("Long-term training load (CTL)", format!("{:.1}", metrics.long_term_training_load)),
        Row::new("Training balance", format!("{:.1}", metrics.training_balance)),
        Row::new("Training readiness", format!("{:.1}", metrics.training_readiness)),
        Row::new("Race readiness", format!("{:.1}", metrics.race_readiness)),
        Row::new("Total workouts", metrics.total_workouts),
        Row::new("Recent workouts", metrics.recent_workouts),
        Row::new("Total distance", format!("{:.1} km", metrics.total_distance_km)),
        Row::new(
            "HRV today / baseline",
            format!("{:.0} / {:.0} ms", metrics.today.hrv, metrics.baseline.hrv),
        ),
        Row::new(
            "Resting HR today / baseline",
            format!(
                "{:.0} / {:.0} bpm",
                metrics.today.resting_heart_rate, metrics.baseline.resting_heart_rate
            ),
        ),
    ];

    for (kind, count) in &metrics.workouts_by_type {
        rows.push(Row::new(&format!("  {}", kind), count));
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

fn print_insights(insights: &MetricInsights) {
    let pct = |v: Option<f64>| v.map(|p| format!("{:+.1}%", p)).unwrap_or_else(|| "n/a".to_string());
    println!("  {}", insights.balance_description.cyan());
    println!(
        "  Load vs. chronic: {}  HRV vs. baseline: {}  Sleep: {}",
        pct(insights.load_trend_pct),
        pct(insights.recovery_trend_pct),
        colorize_band(insights.sleep_band)
    );
}

fn print_whoop(analysis: &WhoopAnalysis, format: OutputFormat, pretty: bool) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", to_json(analysis, pretty)?);
        return Ok(());
    }

    let r = &analysis.recovery;
    let w = &analysis.workouts;
    let s = &analysis.sleep;
    let rows = vec![
        Row::new(
            "Recovery score",
            format!("{:.0}% ({}, {})", r.average_score, colorize_band(Band::from_recovery_score(r.average_score)), r.recent_trend),
        ),
        Row::new("Resting HR", format!("{:.0} bpm", r.average_resting_hr)),
        Row::new(
            "Workout strain",
            format!("{:.1} ({}, {})", w.average_strain, colorize_band(Band::from_strain(w.average_strain)), w.recent_trend),
        ),
        Row::new("Workouts", w.total_workouts),
        Row::new("Workout duration", format!("{:.0} min", w.average_duration / 60_000.0)),
        Row::new(
            "Sleep quality",
            format!("{:.0} ({}, {})", s.average_quality, colorize_band(Band::from_sleep_score(s.average_quality)), s.recent_trend),
        ),
        Row::new("Sleep duration", format!("{:.1} h", s.average_duration / 3_600_000.0)),
        Row::new("Sleep debt", format!("{:.0} min", s.average_debt / 60_000.0)),
    ];

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", "WHOOP Metrics".magenta().bold());
    println!("{}", table);
    Ok(())
}

fn colorize_band(band: Band) -> ColoredString {
    match band {
        Band::Green => band.to_string().green(),
        Band::Yellow => band.to_string().yellow(),
        Band::Red => band.to_string().red(),
    }
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;

use vac_oxide::{Settings, VacError};
use vac_oxide::constants::config::SETTINGS_FILE;
use vac_oxide::constants::series::INDEX_COLUMN;
use vac_oxide::data::{
    FileData, OutlierMethod, QualityConfig, analyze_quality, calculate_statistics, detect_outliers,
};
use vac_oxide::state::Workspace;
use vac_oxide::vacuum::{
    analyze_pump_down_curve, analyze_vacuum_system_performance, calculate_base_pressure,
    calculate_leak_rate, calculate_outgassing_rate, detect_pressure_spikes, detect_pump_down_cycles,
};

#[derive(Parser, Debug)]
#[command(name = "vac-oxide")]
#[command(about = "Vacuum pressure-curve analysis")]
#[command(version)]
struct CliArgs {
    /// Settings file (defaults are used when it does not exist)
    #[arg(long, global = true, env = "VAC_OXIDE_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// A pressure trace read from two columns of a file
#[derive(Args, Debug)]
struct TraceArgs {
    /// CSV or Parquet file
    file: PathBuf,

    /// Time column, or "Index" for row numbers
    #[arg(long, default_value = INDEX_COLUMN)]
    time: String,

    /// Pressure column (mbar)
    #[arg(long)]
    pressure: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutlierArg {
    Iqr,
    Zscore,
    Mad,
}

impl From<OutlierArg> for OutlierMethod {
    fn from(arg: OutlierArg) -> Self {
        match arg {
            OutlierArg::Iqr => OutlierMethod::Iqr,
            OutlierArg::Zscore => OutlierMethod::ZScore,
            OutlierArg::Mad => OutlierMethod::Mad,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Column classification, row count and quality score
    Inspect { file: PathBuf },

    /// Statistics and outliers for one column
    Stats {
        file: PathBuf,
        #[arg(long)]
        column: String,
        /// Outlier method (defaults to the settings)
        #[arg(long, value_enum)]
        method: Option<OutlierArg>,
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Pearson correlation matrix over numeric columns
    Correlate {
        file: PathBuf,
        /// Comma-separated columns (all numeric columns when omitted)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Data-quality report for one column
    Quality {
        file: PathBuf,
        #[arg(long)]
        column: String,
        /// Timestamp column used for gap detection
        #[arg(long)]
        time: Option<String>,
    },

    /// Full vacuum system performance report
    Analyze {
        #[command(flatten)]
        trace: TraceArgs,
        /// Chamber volume in litres (defaults to the settings)
        #[arg(long)]
        volume: Option<f64>,
    },

    /// Base pressure from the most stable window
    Base {
        #[command(flatten)]
        trace: TraceArgs,
        #[arg(long)]
        window_minutes: Option<f64>,
        #[arg(long)]
        sample_rate: Option<f64>,
    },

    /// Leak rate from a pressure rise
    Leak {
        #[command(flatten)]
        trace: TraceArgs,
        /// Pressure at the start of the rise (defaults to the first sample)
        #[arg(long)]
        start_pressure: Option<f64>,
        #[arg(long)]
        end_pressure: Option<f64>,
    },

    /// Pump-down milestones, rates and decay fit
    Pumpdown {
        #[command(flatten)]
        trace: TraceArgs,
    },

    /// Repeated pump-down cycles
    Cycles {
        #[command(flatten)]
        trace: TraceArgs,
    },

    /// Pressure spikes
    Spikes {
        #[command(flatten)]
        trace: TraceArgs,
        /// Threshold in rolling standard deviations
        #[arg(long)]
        sigma: Option<f64>,
        #[arg(long)]
        min_duration: Option<usize>,
    },

    /// Outgassing rate Q = V dP/dt
    Outgassing {
        #[command(flatten)]
        trace: TraceArgs,
        #[arg(long)]
        volume: Option<f64>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the file into a workspace and return `(time, pressure)`
fn load_trace(trace: &TraceArgs, settings: &Settings) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let mut workspace = Workspace::new(settings.clone());
    let file_id = workspace
        .load_file(&trace.file)
        .with_context(|| format!("loading {}", trace.file.display()))?;

    let id = workspace.create_series(&trace.pressure, &file_id, &trace.time, &trace.pressure)?;
    let problems = workspace.series(&id)?.validate(workspace.file(&file_id)?);
    if !problems.is_empty() {
        anyhow::bail!("invalid series: {}", problems.join("; "));
    }

    let (time, pressure) = workspace.series_data(&id)?;
    tracing::info!(
        points = pressure.len(),
        file = %trace.file.display(),
        missing = settings.missing_data_method.label(),
        "trace loaded"
    );
    Ok((time, pressure))
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let settings_path = args.settings.unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("reading settings {}", settings_path.display()))?;

    match args.command {
        Command::Inspect { file } => {
            let data = FileData::load(&file)?;
            print_json(&json!({
                "filename": data.filename,
                "rows": data.height(),
                "columns": data.columns(),
                "quality_score": data.quality_score(),
            }))
        }
        Command::Stats {
            file,
            column,
            method,
            threshold,
        } => {
            let data = FileData::load(&file)?;
            let values = data.column_as_f64(&column)?;
            // An explicit method without a threshold uses that method's usual k
            let (method, fallback) = match method.map(OutlierMethod::from) {
                Some(m) => (m, m.default_threshold()),
                None => (settings.outlier_method, settings.outlier_threshold),
            };
            let threshold = threshold.unwrap_or(fallback);
            print_json(&json!({
                "column": column,
                "statistics": calculate_statistics(&values)?,
                "outliers": detect_outliers(&values, method, threshold),
            }))
        }
        Command::Correlate { file, columns } => {
            let data = FileData::load(&file)?;
            print_json(&data.correlation_matrix(&columns)?)
        }
        Command::Quality { file, column, time } => {
            let data = FileData::load(&file)?;
            let values = data.column_as_f64(&column)?;
            let timestamps = time.map(|t| data.column_as_f64(&t)).transpose()?;
            let report = analyze_quality(&values, timestamps.as_deref(), &QualityConfig::default());
            print_json(&json!({
                "column": column,
                "score": report.score(),
                "grade": report.grade(),
                "report": report,
            }))
        }
        Command::Analyze { trace, volume } => {
            let (time, pressure) = load_trace(&trace, &settings)?;
            print_json(&analyze_vacuum_system_performance(
                &pressure,
                &time,
                Some(volume.unwrap_or(settings.system_volume_liters)),
                &settings.thresholds(),
            )?)
        }
        Command::Base {
            trace,
            window_minutes,
            sample_rate,
        } => {
            let (_, pressure) = load_trace(&trace, &settings)?;
            print_json(&calculate_base_pressure(
                &pressure,
                window_minutes.unwrap_or(settings.base_window_minutes),
                sample_rate.unwrap_or(settings.sample_rate_hz),
            )?)
        }
        Command::Leak {
            trace,
            start_pressure,
            end_pressure,
        } => {
            let (time, pressure) = load_trace(&trace, &settings)?;
            let start = start_pressure
                .or_else(|| pressure.first().copied())
                .context("no pressure samples")?;
            print_json(&calculate_leak_rate(&pressure, &time, start, end_pressure)?)
        }
        Command::Pumpdown { trace } => {
            let (time, pressure) = load_trace(&trace, &settings)?;
            print_json(&analyze_pump_down_curve(&pressure, &time)?)
        }
        Command::Cycles { trace } => {
            let (time, pressure) = load_trace(&trace, &settings)?;
            print_json(&detect_pump_down_cycles(
                &pressure,
                &time,
                settings.cycle_min_drop,
                settings.cycle_min_duration,
            )?)
        }
        Command::Spikes {
            trace,
            sigma,
            min_duration,
        } => {
            let (_, pressure) = load_trace(&trace, &settings)?;
            print_json(&detect_pressure_spikes(
                &pressure,
                sigma.unwrap_or(settings.spike_sigma),
                min_duration.unwrap_or(settings.spike_min_duration),
            ))
        }
        Command::Outgassing { trace, volume } => {
            let (time, pressure) = load_trace(&trace, &settings)?;
            print_json(&calculate_outgassing_rate(
                &pressure,
                &time,
                volume.unwrap_or(settings.system_volume_liters),
            )?)
        }
    }
}

#[cfg(feature = "profile-with-puffin")]
fn start_puffin_server() -> Option<puffin_http::Server> {
    puffin::set_scopes_on(true);
    match puffin_http::Server::new(&format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT)) {
        Ok(server) => {
            tracing::info!(port = puffin_http::DEFAULT_PORT, "puffin server listening");
            Some(server)
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not start puffin server");
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "profile-with-puffin")]
    let _puffin_server = start_puffin_server();

    let args = CliArgs::parse();
    let result = run(args);
    profiling::finish_frame!();

    if let Err(err) = &result {
        if let Some(vac) = err.downcast_ref::<VacError>() {
            tracing::error!(kind = vac.title(), "{}", vac.user_message());
        }
    }
    result
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::constants::datetime::{DATE_FORMAT_LENGTH, MIN_TIMESTAMP_LENGTH, TIME_FORMAT_LENGTH};
use crate::constants::quality::{SNIFF_RATIO, SNIFF_ROWS};
use crate::constants::series::INDEX_COLUMN;
use crate::data::stats::{CorrelationMatrix, Statistics, calculate_correlation_matrix, calculate_statistics};
use crate::error::{Result, VacError};

/// How a column's values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Datetime,
    Text,
}

/// Per-column metadata computed when the data is (re)analyzed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub dtype: String,
    pub null_count: usize,
    pub missing_percent: f64,
}

/// Statistics for a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric(Statistics),
    Categorical {
        unique: usize,
        most_common: Option<String>,
    },
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a date/time string to Unix seconds (UTC)
///
/// Accepts the compact `YYYYMMDD HHMMSS` layout as well as common
/// ISO and day-first/month-first formats.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let trimmed = s.trim();

    if trimmed.len() >= MIN_TIMESTAMP_LENGTH
        && trimmed.chars().all(|c| c.is_ascii_digit() || c.is_ascii_whitespace())
    {
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() == 2 && parts[0].len() == DATE_FORMAT_LENGTH && parts[1].len() == TIME_FORMAT_LENGTH {
            let compact = format!("{}{}", parts[0], parts[1]);
            if let Ok(dt) = NaiveDateTime::parse_from_str(&compact, "%Y%m%d%H%M%S") {
                return Some(dt.and_utc().timestamp() as f64);
            }
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc().timestamp() as f64);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp() as f64);
        }
    }
    None
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn seconds_per_unit(unit: &TimeUnit) -> f64 {
    match unit {
        TimeUnit::Milliseconds => 1e3,
        TimeUnit::Microseconds => 1e6,
        TimeUnit::Nanoseconds => 1e9,
    }
}

/// Classify a string column by sniffing its leading non-empty values
fn sniff_strings(values: &StringChunked) -> ColumnKind {
    let sample: Vec<&str> = values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(SNIFF_ROWS)
        .collect();
    if sample.is_empty() {
        return ColumnKind::Text;
    }

    let needed = SNIFF_RATIO * sample.len() as f64;
    let numeric = sample.iter().filter(|s| s.parse::<f64>().is_ok()).count();
    if numeric as f64 >= needed {
        return ColumnKind::Numeric;
    }
    let dates = sample.iter().filter(|s| parse_timestamp(s).is_some()).count();
    if dates as f64 >= needed {
        return ColumnKind::Datetime;
    }
    ColumnKind::Text
}

fn classify(series: &Series) -> ColumnKind {
    match series.dtype() {
        dt if is_numeric_dtype(dt) => ColumnKind::Numeric,
        DataType::Boolean => ColumnKind::Numeric,
        DataType::Datetime(_, _) | DataType::Date => ColumnKind::Datetime,
        DataType::String => match series.str() {
            Ok(values) => sniff_strings(values),
            Err(_) => ColumnKind::Text,
        },
        _ => ColumnKind::Text,
    }
}

/// A loaded data file and its column metadata
#[derive(Debug, Clone)]
pub struct FileData {
    pub id: String,
    pub path: PathBuf,
    pub filename: String,
    pub load_time: DateTime<Utc>,
    data: DataFrame,
    original: DataFrame,
    columns: Vec<ColumnInfo>,
    quality_score: f64,
}

impl FileData {
    /// Load a CSV or Parquet file
    pub fn load(path: &Path) -> Result<Self> {
        profiling::scope!("FileData::load");

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| VacError::UnsupportedFormat {
                extension: String::new(),
            })?;

        let lazy = match extension.as_str() {
            "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
            "csv" => LazyCsvReader::new(path)
                .with_has_header(true)
                .with_infer_schema_length(Some(100))
                .with_try_parse_dates(true)
                .finish()?,
            _ => return Err(VacError::UnsupportedFormat { extension }),
        };

        let df = lazy.collect()?;
        tracing::info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded data file"
        );
        Ok(Self::from_dataframe(df, path))
    }

    /// Wrap an already materialized DataFrame
    pub fn from_dataframe(df: DataFrame, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut file = Self {
            id: Uuid::new_v4().to_string(),
            path,
            filename,
            load_time: Utc::now(),
            original: df.clone(),
            data: df,
            columns: Vec::new(),
            quality_score: 0.0,
        };
        file.analyze();
        file
    }

    fn analyze(&mut self) {
        let height = self.data.height();
        self.columns = self
            .data
            .get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                let null_count = series.null_count();
                ColumnInfo {
                    name: series.name().to_string(),
                    kind: classify(series),
                    dtype: series.dtype().to_string(),
                    null_count,
                    missing_percent: if height > 0 {
                        null_count as f64 / height as f64 * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        self.quality_score = if self.columns.is_empty() || height == 0 {
            0.0
        } else {
            let missing: f64 = self.columns.iter().map(|c| c.missing_percent).sum();
            100.0 - missing / self.columns.len() as f64
        };

        tracing::debug!(
            file = %self.filename,
            quality = self.quality_score,
            "analyzed columns"
        );
    }

    /// Replace the data and re-run the column analysis
    pub fn replace_data(&mut self, df: DataFrame) {
        self.data = df;
        self.analyze();
    }

    /// Restore the data as it was first loaded
    pub fn reset(&mut self) {
        self.data = self.original.clone();
        self.analyze();
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn width(&self) -> usize {
        self.data.width()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_info(&self, name: &str) -> Result<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| VacError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    fn columns_of(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Numeric)
    }

    pub fn datetime_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Datetime)
    }

    pub fn text_columns(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Text)
    }

    pub fn has_numeric(&self) -> bool {
        self.columns.iter().any(|c| c.kind == ColumnKind::Numeric)
    }

    pub fn has_datetime(&self) -> bool {
        self.columns.iter().any(|c| c.kind == ColumnKind::Datetime)
    }

    /// Null count per column
    pub fn null_counts(&self) -> HashMap<String, usize> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.null_count))
            .collect()
    }

    /// Overall quality score (0-100) from the mean missing percentage
    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    fn series(&self, name: &str) -> Result<&Series> {
        self.data
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| VacError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Column values as `f64`
    ///
    /// Datetime and date columns become Unix seconds, text that looks like
    /// a timestamp is parsed the same way, and anything unparsable is NaN.
    /// The `"Index"` pseudo-column yields row numbers.
    pub fn column_as_f64(&self, name: &str) -> Result<Vec<f64>> {
        if name == INDEX_COLUMN && !self.has_column(name) {
            return Ok((0..self.height()).map(|i| i as f64).collect());
        }

        let series = self.series(name)?;
        match series.dtype() {
            DataType::Datetime(unit, _) => {
                let scale = seconds_per_unit(unit);
                return Ok(series
                    .datetime()?
                    .into_iter()
                    .map(|opt| opt.map(|ts| ts as f64 / scale).unwrap_or(f64::NAN))
                    .collect());
            }
            DataType::Date => {
                return Ok(series
                    .date()?
                    .into_iter()
                    .map(|opt| opt.map(|days| days as f64 * 86400.0).unwrap_or(f64::NAN))
                    .collect());
            }
            DataType::String => {
                let datetime = self.column_info(name)?.kind == ColumnKind::Datetime;
                return Ok(series
                    .str()?
                    .into_iter()
                    .map(|opt| {
                        opt.and_then(|s| {
                            if datetime {
                                parse_timestamp(s)
                            } else {
                                s.trim().parse::<f64>().ok()
                            }
                        })
                        .unwrap_or(f64::NAN)
                    })
                    .collect());
            }
            _ => {}
        }

        match series.cast(&DataType::Float64) {
            Ok(s) => Ok(s
                .f64()?
                .into_iter()
                .map(|opt| opt.unwrap_or(f64::NAN))
                .collect()),
            Err(_) => Ok(vec![f64::NAN; series.len()]),
        }
    }

    /// Column values rendered as strings, empty for nulls
    pub fn column_as_string(&self, name: &str) -> Result<Vec<String>> {
        let series = self.series(name)?;
        let as_text = series.cast(&DataType::String)?;
        Ok(as_text
            .str()?
            .into_iter()
            .map(|opt| opt.unwrap_or("").to_string())
            .collect())
    }

    /// Pearson correlation matrix over the numeric columns among `columns`
    ///
    /// An empty selection means every numeric column. Non-numeric columns
    /// are skipped; unknown names are an error.
    pub fn correlation_matrix(&self, columns: &[String]) -> Result<CorrelationMatrix> {
        let selected = if columns.is_empty() {
            self.numeric_columns()
        } else {
            let mut numeric = Vec::new();
            for name in columns {
                if self.column_info(name)?.kind == ColumnKind::Numeric {
                    numeric.push(name.clone());
                } else {
                    tracing::debug!(column = %name, "skipping non-numeric column in correlation");
                }
            }
            numeric
        };

        let series = selected
            .into_iter()
            .map(|name| {
                let values = self.column_as_f64(&name)?;
                Ok((name, values))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(calculate_correlation_matrix(&series))
    }

    /// Statistics for one column
    pub fn column_stats(&self, name: &str) -> Result<ColumnStats> {
        let info = self.column_info(name)?;
        if info.kind == ColumnKind::Numeric {
            let values = self.column_as_f64(name)?;
            return Ok(ColumnStats::Numeric(calculate_statistics(&values)?));
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        let series = self.series(name)?;
        let as_text = series.cast(&DataType::String)?;
        for value in as_text.str()?.into_iter().flatten() {
            *counts.entry(value.to_string()).or_default() += 1;
        }
        let most_common = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(value, _)| value.clone());

        Ok(ColumnStats::Categorical {
            unique: counts.len(),
            most_common,
        })
    }
}

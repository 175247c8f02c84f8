//! Series configuration: a styled, processed view over one file's columns

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::series::{
    DEFAULT_ALPHA, DEFAULT_LINE_WIDTH, DEFAULT_MA_WINDOW, DEFAULT_MARKER_SIZE,
    DEFAULT_PEAK_PROMINENCE, DEFAULT_SMOOTHING_WINDOW, INDEX_COLUMN,
};
use crate::data::cleaning::{MissingDataMethod, SmoothingMethod, cap_outliers, handle_missing, remove_outliers, smooth};
use crate::data::source::{ColumnKind, FileData};
use crate::data::stats::{OutlierMethod, perform_regression};
use crate::error::{Result, VacError};
use crate::settings::Settings;
use crate::signal::calculate_moving_average;
use crate::signal::fit::linear_fit;

/// Line dash pattern, stored with the matplotlib-style codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    #[serde(rename = "-")]
    Solid,
    #[serde(rename = "--")]
    Dashed,
    #[serde(rename = ":")]
    Dotted,
    #[serde(rename = "-.")]
    DashDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierHandling {
    #[default]
    Keep,
    Remove,
    Cap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAxis {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    #[default]
    Linear,
    Polynomial,
    Exponential,
    MovingAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    /// Polynomial degree
    pub degree: usize,
    /// Moving-average window
    pub window: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            degree: 1,
            window: DEFAULT_MA_WINDOW,
        }
    }
}

/// One plotted series: which columns of which file, and how to treat them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub id: String,
    pub name: String,
    pub file_id: String,
    /// X column, or `"Index"` for row numbers
    pub x_column: String,
    pub y_column: String,
    pub start_index: usize,
    /// Exclusive; `None` runs to the end of the data
    pub end_index: Option<usize>,

    // Appearance
    /// Plot color, auto-assigned when `None`
    pub color: Option<String>,
    pub line_style: LineStyle,
    /// Marker code, empty for none
    pub marker: String,
    pub line_width: f64,
    pub marker_size: f64,
    pub alpha: f64,
    pub fill_area: bool,
    pub gradient_fill: bool,

    // Data processing
    pub missing_data_method: MissingDataMethod,
    pub outlier_handling: OutlierHandling,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub smoothing: bool,
    pub smoothing_method: SmoothingMethod,
    pub smoothing_window: usize,
    /// `"auto"` or a chrono format string
    pub datetime_format: String,

    // Display
    pub visible: bool,
    pub show_in_legend: bool,
    pub legend_label: String,
    pub y_axis: YAxis,

    // Analysis overlays
    pub show_statistics: bool,
    pub show_trendline: bool,
    pub trend_type: TrendType,
    pub trend_params: TrendParams,
    pub show_peaks: bool,
    pub peak_prominence: f64,
    pub show_moving_average: bool,
    pub moving_average_window: usize,
    pub show_confidence_interval: bool,
    pub confidence_level: f64,
    pub highlight_outliers: bool,

    // Vacuum overlays
    pub highlight_base_pressure: bool,
    pub highlight_spikes: bool,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            file_id: String::new(),
            x_column: INDEX_COLUMN.to_string(),
            y_column: String::new(),
            start_index: 0,
            end_index: None,

            color: None,
            line_style: LineStyle::default(),
            marker: String::new(),
            line_width: DEFAULT_LINE_WIDTH,
            marker_size: DEFAULT_MARKER_SIZE,
            alpha: DEFAULT_ALPHA,
            fill_area: false,
            gradient_fill: false,

            missing_data_method: MissingDataMethod::default(),
            outlier_handling: OutlierHandling::default(),
            outlier_method: OutlierMethod::default(),
            outlier_threshold: OutlierMethod::default().default_threshold(),
            smoothing: false,
            smoothing_method: SmoothingMethod::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            datetime_format: "auto".to_string(),

            visible: true,
            show_in_legend: true,
            legend_label: String::new(),
            y_axis: YAxis::default(),

            show_statistics: false,
            show_trendline: false,
            trend_type: TrendType::default(),
            trend_params: TrendParams::default(),
            show_peaks: false,
            peak_prominence: DEFAULT_PEAK_PROMINENCE,
            show_moving_average: false,
            moving_average_window: DEFAULT_MA_WINDOW,
            show_confidence_interval: false,
            confidence_level: 0.95,
            highlight_outliers: false,

            highlight_base_pressure: false,
            highlight_spikes: false,

            created_at: now,
            modified_at: now,
        }
    }
}

impl SeriesConfig {
    pub fn new(
        name: impl Into<String>,
        file_id: impl Into<String>,
        x_column: impl Into<String>,
        y_column: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            legend_label: name.clone(),
            name,
            file_id: file_id.into(),
            x_column: x_column.into(),
            y_column: y_column.into(),
            ..Self::default()
        }
    }

    /// Take the data-handling defaults from the user settings
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.missing_data_method = settings.missing_data_method;
        self.outlier_method = settings.outlier_method;
        self.outlier_threshold = settings.outlier_threshold;
        self.smoothing_window = settings.smoothing_window;
        self
    }

    /// Restrict the series to rows `start..end`
    pub fn with_range(mut self, start: usize, end: Option<usize>) -> Self {
        self.start_index = start;
        self.end_index = end;
        self
    }

    /// Mark the configuration as modified now
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    /// Label shown in a legend
    pub fn display_label(&self) -> &str {
        if self.legend_label.is_empty() {
            &self.name
        } else {
            &self.legend_label
        }
    }

    pub fn uses_index(&self) -> bool {
        self.x_column == INDEX_COLUMN
    }

    /// Row range clamped to a data length
    pub fn row_range(&self, len: usize) -> Range<usize> {
        let start = self.start_index.min(len);
        let end = self.end_index.unwrap_or(len).clamp(start, len);
        start..end
    }

    /// Raw `(x, y)` values for the configured columns and row range
    ///
    /// With the `"Index"` X column, x holds the original row numbers.
    pub fn get_data(&self, file: &FileData) -> Result<(Vec<f64>, Vec<f64>)> {
        if file.id != self.file_id {
            return Err(VacError::UnknownFile(self.file_id.clone()));
        }
        let range = self.row_range(file.height());
        let y = file.column_as_f64(&self.y_column)?;
        let x = file.column_as_f64(&self.x_column)?;
        Ok((x[range.clone()].to_vec(), y[range].to_vec()))
    }

    /// [`get_data`](Self::get_data) with outlier handling, the missing-data
    /// method and optional smoothing applied to y
    pub fn processed_data(&self, file: &FileData) -> Result<(Vec<f64>, Vec<f64>)> {
        let (x, y) = self.get_data(file)?;

        let y = match self.outlier_handling {
            OutlierHandling::Keep => y,
            OutlierHandling::Remove => remove_outliers(&y, self.outlier_method, self.outlier_threshold),
            OutlierHandling::Cap => cap_outliers(&y, self.outlier_method, self.outlier_threshold),
        };

        let (x, y) = handle_missing(&x, &y, self.missing_data_method);
        let y = if self.smoothing {
            smooth(&y, self.smoothing_window, self.smoothing_method)
        } else {
            y
        };
        Ok((x, y))
    }

    /// Trend line evaluated at each x, per `trend_type`
    pub fn trend_line(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        match self.trend_type {
            TrendType::Linear => Ok(perform_regression(x, y, 1)?.predictions),
            TrendType::Polynomial => Ok(perform_regression(x, y, self.trend_params.degree.max(1))?.predictions),
            TrendType::MovingAverage => calculate_moving_average(y, self.trend_params.window),
            TrendType::Exponential => {
                let (xs, log_y): (Vec<f64>, Vec<f64>) = x
                    .iter()
                    .zip(y)
                    .filter(|(a, b)| !a.is_nan() && **b > 0.0)
                    .map(|(a, b)| (*a, b.ln()))
                    .unzip();
                let fit = linear_fit(&xs, &log_y)?;
                Ok(x.iter().map(|&v| fit.predict(v).exp()).collect())
            }
        }
    }

    /// Problems that would stop this series from plotting, empty when valid
    pub fn validate(&self, file: &FileData) -> Vec<String> {
        let mut problems = Vec::new();

        if file.id != self.file_id {
            problems.push(format!("Series refers to file '{}', not '{}'", self.file_id, file.filename));
        }
        if !self.uses_index() && !file.has_column(&self.x_column) {
            problems.push(format!("X column '{}' not found", self.x_column));
        }
        match file.column_info(&self.y_column) {
            Ok(info) if info.kind == ColumnKind::Text => {
                problems.push(format!("Y column '{}' is not numeric", self.y_column))
            }
            Ok(_) => {}
            Err(_) => problems.push(format!("Y column '{}' not found", self.y_column)),
        }

        let height = file.height();
        if self.start_index >= height && height > 0 {
            problems.push(format!("Start index {} is beyond the {} data rows", self.start_index, height));
        }
        if let Some(end) = self.end_index {
            if end <= self.start_index {
                problems.push(format!("End index {} must be greater than start index {}", end, self.start_index));
            }
        }

        if self.line_width <= 0.0 {
            problems.push("Line width must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            problems.push("Alpha must be between 0 and 1".to_string());
        }
        if self.smoothing && self.smoothing_window < 2 {
            problems.push("Smoothing window must be at least 2".to_string());
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            problems.push("Confidence level must be between 0 and 1".to_string());
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn sample_file() -> FileData {
        let df = df! {
            "time" => [0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            "pressure" => [1e-3, f64::NAN, 1e-4, 5e-5, 2e-5, 1e-5],
            "note" => ["a", "b", "c", "d", "e", "f"],
        }
        .unwrap();
        FileData::from_dataframe(df, "chamber.csv")
    }

    #[test]
    fn test_defaults() {
        let series = SeriesConfig::new("Chamber", "file", "time", "pressure");
        assert_eq!(series.legend_label, "Chamber");
        assert_eq!(series.line_width, 2.5);
        assert_eq!(series.marker_size, 6.0);
        assert_eq!(series.alpha, 0.9);
        assert_eq!(series.peak_prominence, 0.1);
        assert_eq!(series.moving_average_window, 20);
        assert_eq!(series.missing_data_method, MissingDataMethod::Drop);
        assert_eq!(series.outlier_method, OutlierMethod::ZScore);
        assert_eq!(series.outlier_threshold, 3.0);
        assert!(series.visible);
    }

    #[test]
    fn test_with_settings() {
        let settings = Settings {
            missing_data_method: MissingDataMethod::Forward,
            outlier_method: OutlierMethod::Mad,
            outlier_threshold: 4.0,
            smoothing_window: 9,
            ..Settings::default()
        };
        let series = SeriesConfig::new("s", "f", "x", "y").with_settings(&settings);
        assert_eq!(series.missing_data_method, MissingDataMethod::Forward);
        assert_eq!(series.outlier_method, OutlierMethod::Mad);
        assert_eq!(series.outlier_threshold, 4.0);
        assert_eq!(series.smoothing_window, 9);
    }

    #[test]
    fn test_row_range_clamps() {
        let series = SeriesConfig::new("s", "f", "x", "y").with_range(2, Some(100));
        assert_eq!(series.row_range(10), 2..10);
        assert_eq!(series.row_range(1), 1..1);

        let open = SeriesConfig::new("s", "f", "x", "y").with_range(3, None);
        assert_eq!(open.row_range(5), 3..5);
    }

    #[test]
    fn test_get_data_with_range_and_index() {
        let file = sample_file();
        let series = SeriesConfig::new("s", file.id.clone(), INDEX_COLUMN, "pressure").with_range(2, Some(5));

        let (x, y) = series.get_data(&file).unwrap();
        assert_eq!(x, vec![2.0, 3.0, 4.0]);
        assert_eq!(y, vec![1e-4, 5e-5, 2e-5]);
    }

    #[test]
    fn test_get_data_wrong_file() {
        let file = sample_file();
        let series = SeriesConfig::new("s", "other", "time", "pressure");
        assert!(matches!(series.get_data(&file), Err(VacError::UnknownFile(_))));
    }

    #[test]
    fn test_processed_data_fills_missing() {
        let file = sample_file();
        let mut series = SeriesConfig::new("s", file.id.clone(), "time", "pressure");

        let (x, y) = series.processed_data(&file).unwrap();
        assert_eq!(x, vec![0.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(y.len(), 5);

        series.missing_data_method = MissingDataMethod::Interpolate;
        let (x, y) = series.processed_data(&file).unwrap();
        assert_eq!(x.len(), 6);
        assert!((y[1] - 5.5e-4).abs() < 1e-12);
    }

    #[test]
    fn test_trend_lines() {
        let series = SeriesConfig::new("s", "f", "x", "y");
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let trend = series.trend_line(&x, &y).unwrap();
        assert!((trend[9] - 19.0).abs() < 1e-9);

        let exponential = SeriesConfig {
            trend_type: TrendType::Exponential,
            ..series
        };
        let y: Vec<f64> = x.iter().map(|v| (0.5 * v).exp()).collect();
        let trend = exponential.trend_line(&x, &y).unwrap();
        assert!((trend[4] - 2f64.exp()).abs() < 1e-9);
    }

    #[test]
    fn test_validate_reports_problems() {
        let file = sample_file();
        let good = SeriesConfig::new("s", file.id.clone(), "time", "pressure");
        assert!(good.validate(&file).is_empty());

        let mut bad = SeriesConfig::new("s", file.id.clone(), "missing", "note").with_range(4, Some(2));
        bad.alpha = 1.5;
        let problems = bad.validate(&file);
        assert_eq!(problems.len(), 4);
    }

    #[test]
    fn test_line_style_codes() {
        assert_eq!(serde_json::to_string(&LineStyle::Dashed).unwrap(), "\"--\"");
        let style: LineStyle = serde_json::from_str("\"-.\"").unwrap();
        assert_eq!(style, LineStyle::DashDot);
    }
}

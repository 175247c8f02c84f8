//! User-tunable analysis defaults, persisted as JSON

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::config::MAX_RECENT_FILES;
use crate::constants::series::DEFAULT_SMOOTHING_WINDOW;
use crate::constants::vacuum::{
    DEFAULT_BASE_WINDOW_MINUTES, DEFAULT_CYCLE_MIN_DROP, DEFAULT_CYCLE_MIN_DURATION,
    DEFAULT_SAMPLE_RATE_HZ, DEFAULT_SPIKE_MIN_DURATION, DEFAULT_SPIKE_SIGMA, DEFAULT_SYSTEM_VOLUME_L,
};
use crate::data::cleaning::MissingDataMethod;
use crate::data::stats::OutlierMethod;
use crate::error::Result;
use crate::vacuum::DetectionThresholds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Base pressure
    pub base_window_minutes: f64,
    pub sample_rate_hz: f64,

    // Spikes
    pub spike_sigma: f64,
    pub spike_min_duration: usize,

    // Pump-down cycles
    pub cycle_min_drop: f64,
    pub cycle_min_duration: usize,

    /// Chamber volume used when none is given (L)
    pub system_volume_liters: f64,

    // Data handling
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub missing_data_method: MissingDataMethod,
    pub smoothing_window: usize,

    pub max_recent_files: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_window_minutes: DEFAULT_BASE_WINDOW_MINUTES,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            spike_sigma: DEFAULT_SPIKE_SIGMA,
            spike_min_duration: DEFAULT_SPIKE_MIN_DURATION,
            cycle_min_drop: DEFAULT_CYCLE_MIN_DROP,
            cycle_min_duration: DEFAULT_CYCLE_MIN_DURATION,
            system_volume_liters: DEFAULT_SYSTEM_VOLUME_L,
            outlier_method: OutlierMethod::default(),
            outlier_threshold: OutlierMethod::default().default_threshold(),
            missing_data_method: MissingDataMethod::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            max_recent_files: MAX_RECENT_FILES,
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

impl Settings {
    /// Load settings, filling absent keys with defaults
    ///
    /// A missing file yields the defaults. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&contents)?;
        settings.validate();
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Spike and cycle parameters for the performance report
    pub fn thresholds(&self) -> DetectionThresholds {
        DetectionThresholds {
            spike_sigma: self.spike_sigma,
            spike_min_duration: self.spike_min_duration,
            cycle_min_drop: self.cycle_min_drop,
            cycle_min_duration: self.cycle_min_duration,
        }
    }

    /// Validate and clamp values
    pub fn validate(&mut self) {
        self.base_window_minutes = positive_or(self.base_window_minutes, DEFAULT_BASE_WINDOW_MINUTES);
        self.sample_rate_hz = positive_or(self.sample_rate_hz, DEFAULT_SAMPLE_RATE_HZ);

        self.spike_sigma = self.spike_sigma.clamp(0.5, 10.0);
        self.spike_min_duration = self.spike_min_duration.max(1);

        self.cycle_min_drop = self.cycle_min_drop.clamp(0.1, 12.0);
        self.cycle_min_duration = self.cycle_min_duration.max(2);

        self.system_volume_liters = positive_or(self.system_volume_liters, DEFAULT_SYSTEM_VOLUME_L);

        self.outlier_threshold = self.outlier_threshold.clamp(0.5, 10.0);

        // Smoothing needs at least two samples per window
        self.smoothing_window = self.smoothing_window.max(2);
        self.max_recent_files = self.max_recent_files.clamp(1, 50);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"spike_sigma": 4.0, "outlier_method": "mad"}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.spike_sigma, 4.0);
        assert_eq!(settings.outlier_method, OutlierMethod::Mad);
        assert_eq!(settings.base_window_minutes, DEFAULT_BASE_WINDOW_MINUTES);
        assert_eq!(settings.max_recent_files, MAX_RECENT_FILES);
    }

    #[test]
    fn test_data_defaults_match_series() {
        let settings = Settings::default();
        let series = crate::state::SeriesConfig::default();
        assert_eq!(settings.outlier_method, OutlierMethod::ZScore);
        assert_eq!(settings.outlier_method, series.outlier_method);
        assert_eq!(settings.outlier_threshold, series.outlier_threshold);
        assert_eq!(settings.missing_data_method, MissingDataMethod::Drop);
        assert_eq!(settings.smoothing_window, series.smoothing_window);
    }

    #[test]
    fn test_thresholds_follow_settings() {
        let settings = Settings {
            spike_sigma: 5.0,
            cycle_min_drop: 3.0,
            ..Settings::default()
        };
        let thresholds = settings.thresholds();
        assert_eq!(thresholds.spike_sigma, 5.0);
        assert_eq!(thresholds.cycle_min_drop, 3.0);
        assert_eq!(thresholds.spike_min_duration, settings.spike_min_duration);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            cycle_min_drop: 3.0,
            system_volume_liters: 42.0,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_validate_clamps() {
        let mut settings = Settings {
            base_window_minutes: -1.0,
            spike_sigma: 100.0,
            spike_min_duration: 0,
            system_volume_liters: 0.0,
            smoothing_window: 0,
            max_recent_files: 0,
            ..Settings::default()
        };
        settings.validate();

        assert_eq!(settings.base_window_minutes, DEFAULT_BASE_WINDOW_MINUTES);
        assert_eq!(settings.spike_sigma, 10.0);
        assert_eq!(settings.spike_min_duration, 1);
        assert_eq!(settings.system_volume_liters, DEFAULT_SYSTEM_VOLUME_L);
        assert_eq!(settings.smoothing_window, 2);
        assert_eq!(settings.max_recent_files, 1);
    }
}

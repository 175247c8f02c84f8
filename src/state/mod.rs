//! Session state
//!
//! A [`Workspace`] owns the loaded files, the series drawn from them and the
//! annotations placed on the plot. It converts to and from a
//! [`ProjectFile`] for persistence.

pub mod annotation;
pub mod export;
pub mod project;
pub mod series;

pub use annotation::{AnnotationConfig, AnnotationKind};
pub use project::{FileReference, PlotConfig, ProjectFile, export_series_config, import_series_config};
pub use series::{LineStyle, OutlierHandling, SeriesConfig, TrendType, YAxis};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::data::source::FileData;
use crate::error::{Result, VacError};
use crate::settings::Settings;
use crate::vacuum::{PerformanceReport, analyze_vacuum_system_performance};

/// Main session state container
#[derive(Debug, Default)]
pub struct Workspace {
    /// Loaded files by id
    files: HashMap<String, FileData>,

    /// Series in display order
    series: Vec<SeriesConfig>,

    pub annotations: Vec<AnnotationConfig>,

    pub plot_config: PlotConfig,

    /// Most recent first
    pub recent_files: Vec<PathBuf>,

    pub settings: Settings,
}

impl Workspace {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Drop all files, series and annotations, keeping settings and recent files
    pub fn clear(&mut self) {
        self.files.clear();
        self.series.clear();
        self.annotations.clear();
        self.plot_config = PlotConfig::default();
    }

    pub fn has_data(&self) -> bool {
        !self.files.is_empty()
    }

    /// Load a file from disk and return its id
    pub fn load_file(&mut self, path: &Path) -> Result<String> {
        let file = FileData::load(path)?;
        self.push_recent(path);
        Ok(self.add_file(file))
    }

    /// Add an already loaded file and return its id
    pub fn add_file(&mut self, file: FileData) -> String {
        let id = file.id.clone();
        self.files.insert(id.clone(), file);
        id
    }

    pub fn file(&self, id: &str) -> Result<&FileData> {
        self.files.get(id).ok_or_else(|| VacError::UnknownFile(id.to_string()))
    }

    pub fn file_mut(&mut self, id: &str) -> Result<&mut FileData> {
        self.files.get_mut(id).ok_or_else(|| VacError::UnknownFile(id.to_string()))
    }

    /// Loaded files ordered by load time
    pub fn files(&self) -> Vec<&FileData> {
        let mut files: Vec<&FileData> = self.files.values().collect();
        files.sort_by_key(|f| f.load_time);
        files
    }

    /// Remove a file together with every series that reads from it
    pub fn remove_file(&mut self, id: &str) -> Result<FileData> {
        let file = self
            .files
            .remove(id)
            .ok_or_else(|| VacError::UnknownFile(id.to_string()))?;

        let before = self.series.len();
        self.series.retain(|s| s.file_id != id);
        tracing::info!(
            file = %file.filename,
            removed_series = before - self.series.len(),
            "file removed"
        );
        Ok(file)
    }

    /// Add a series; its file must be loaded
    pub fn add_series(&mut self, series: SeriesConfig) -> Result<String> {
        if !self.files.contains_key(&series.file_id) {
            return Err(VacError::UnknownFile(series.file_id.clone()));
        }
        let id = series.id.clone();
        self.series.push(series);
        Ok(id)
    }

    /// Add a series over `file_id` seeded from the workspace settings
    pub fn create_series(
        &mut self,
        name: &str,
        file_id: &str,
        x_column: &str,
        y_column: &str,
    ) -> Result<String> {
        let series = SeriesConfig::new(name, file_id, x_column, y_column).with_settings(&self.settings);
        self.add_series(series)
    }

    pub fn series(&self, id: &str) -> Result<&SeriesConfig> {
        self.series
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| VacError::UnknownSeries(id.to_string()))
    }

    pub fn series_mut(&mut self, id: &str) -> Result<&mut SeriesConfig> {
        self.series
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| VacError::UnknownSeries(id.to_string()))
    }

    pub fn series_list(&self) -> &[SeriesConfig] {
        &self.series
    }

    pub fn remove_series(&mut self, id: &str) -> Result<SeriesConfig> {
        let pos = self
            .series
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| VacError::UnknownSeries(id.to_string()))?;
        Ok(self.series.remove(pos))
    }

    /// Processed `(x, y)` data for a series
    pub fn series_data(&self, id: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        let series = self.series(id)?;
        series.processed_data(self.file(&series.file_id)?)
    }

    /// Vacuum performance report treating a series' x as time and y as pressure
    ///
    /// `system_volume` defaults to the configured chamber volume. Spike and
    /// cycle detection use the workspace settings.
    pub fn analyze_series(&self, id: &str, system_volume: Option<f64>) -> Result<PerformanceReport> {
        let (time, pressure) = self.series_data(id)?;
        let volume = system_volume.unwrap_or(self.settings.system_volume_liters);
        analyze_vacuum_system_performance(&pressure, &time, Some(volume), &self.settings.thresholds())
    }

    /// Write a series' processed data to CSV or Parquet
    pub fn export_series_data(&self, id: &str, path: &Path) -> Result<()> {
        let series = self.series(id)?;
        let (x, y) = self.series_data(id)?;
        let mut df = export::pairs_to_dataframe(&series.x_column, &series.y_column, &x, &y)?;
        export::write_dataframe(&mut df, path)
    }

    pub fn add_annotation(&mut self, annotation: AnnotationConfig) -> String {
        let id = annotation.id.clone();
        self.annotations.push(annotation);
        id
    }

    pub fn remove_annotation(&mut self, id: &str) -> Option<AnnotationConfig> {
        let pos = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(pos))
    }

    /// Move `path` to the front of the recent-file list
    pub fn push_recent(&mut self, path: &Path) {
        self.recent_files.retain(|p| p != path);
        self.recent_files.insert(0, path.to_path_buf());
        self.recent_files.truncate(self.settings.max_recent_files);
    }

    /// Snapshot for saving
    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            files: self.files().into_iter().map(FileReference::from).collect(),
            series: self.series.clone(),
            annotations: self.annotations.clone(),
            plot_config: self.plot_config.clone(),
            ..ProjectFile::default()
        }
    }

    /// Rebuild a session from a project, reloading every referenced file
    ///
    /// Files that fail to load are skipped with a warning, and so are the
    /// series that depend on them. Reloaded files keep their saved ids.
    pub fn from_project(project: ProjectFile, settings: Settings) -> Self {
        let mut workspace = Self::new(settings);

        for reference in &project.files {
            match FileData::load(&reference.filepath) {
                Ok(mut file) => {
                    file.id = reference.id.clone();
                    workspace.push_recent(&reference.filepath);
                    workspace.add_file(file);
                }
                Err(err) => tracing::warn!(
                    path = %reference.filepath.display(),
                    error = %err,
                    "could not reload project file"
                ),
            }
        }

        for series in project.series {
            let name = series.name.clone();
            if let Err(err) = workspace.add_series(series) {
                tracing::warn!(series = %name, error = %err, "dropping series without its file");
            }
        }

        workspace.annotations = project.annotations;
        workspace.plot_config = project.plot_config;
        workspace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cleaning::MissingDataMethod;
    use polars::prelude::*;

    fn pump_file() -> FileData {
        let time: Vec<f64> = (0..120).map(|i| i as f64).collect();
        let pressure: Vec<f64> = time.iter().map(|t| 1e-1 * (-t / 10.0).exp() + 1e-7).collect();
        let df = df! {
            "time" => time,
            "pressure" => pressure,
        }
        .unwrap();
        FileData::from_dataframe(df, "pump.csv")
    }

    #[test]
    fn test_add_and_remove_cascade() {
        let mut ws = Workspace::default();
        let file_id = ws.add_file(pump_file());
        let other_id = ws.add_file(pump_file());

        let a = ws.add_series(SeriesConfig::new("a", file_id.clone(), "time", "pressure")).unwrap();
        ws.add_series(SeriesConfig::new("b", file_id.clone(), "Index", "pressure")).unwrap();
        let c = ws.add_series(SeriesConfig::new("c", other_id.clone(), "time", "pressure")).unwrap();

        ws.remove_file(&file_id).unwrap();
        assert_eq!(ws.series_list().len(), 1);
        assert_eq!(ws.series_list()[0].id, c);
        assert!(matches!(ws.series(&a), Err(VacError::UnknownSeries(_))));
        assert!(matches!(ws.file(&file_id), Err(VacError::UnknownFile(_))));
    }

    #[test]
    fn test_create_series_uses_settings() {
        let mut ws = Workspace::new(Settings {
            smoothing_window: 11,
            missing_data_method: MissingDataMethod::Mean,
            ..Settings::default()
        });
        let file_id = ws.add_file(pump_file());
        let id = ws.create_series("pump", &file_id, "time", "pressure").unwrap();

        let series = ws.series(&id).unwrap();
        assert_eq!(series.smoothing_window, 11);
        assert_eq!(series.missing_data_method, MissingDataMethod::Mean);
        assert!(ws.create_series("orphan", "missing", "time", "pressure").is_err());
    }

    #[test]
    fn test_series_requires_loaded_file() {
        let mut ws = Workspace::default();
        let result = ws.add_series(SeriesConfig::new("orphan", "missing", "time", "pressure"));
        assert!(matches!(result, Err(VacError::UnknownFile(_))));
    }

    #[test]
    fn test_analyze_series() {
        let mut ws = Workspace::default();
        let file_id = ws.add_file(pump_file());
        let id = ws.add_series(SeriesConfig::new("pump", file_id, "time", "pressure")).unwrap();

        let report = ws.analyze_series(&id, None).unwrap();
        assert_eq!(report.basic_metrics.data_points, 120);
        assert_eq!(report.system_volume.volume_liters, ws.settings.system_volume_liters);
        assert!(!report.system_volume.estimated);
    }

    #[test]
    fn test_analyze_series_uses_spike_settings() {
        let time: Vec<f64> = (0..300).map(|i| i as f64).collect();
        let mut pressure: Vec<f64> = time.iter().map(|t| 1e-6 * (1.0 + 0.01 * (t * 0.9).sin())).collect();
        pressure[150] = 3e-6;
        let df = df! { "time" => time, "pressure" => pressure }.unwrap();

        let mut ws = Workspace::default();
        let file_id = ws.add_file(FileData::from_dataframe(df, "burst.csv"));
        let id = ws.add_series(SeriesConfig::new("burst", file_id, "time", "pressure")).unwrap();

        assert_eq!(ws.analyze_series(&id, None).unwrap().pressure_spikes.len(), 1);

        ws.settings.spike_sigma = 6.0;
        assert!(ws.analyze_series(&id, None).unwrap().pressure_spikes.is_empty());
    }

    #[test]
    fn test_recent_files_dedup_and_limit() {
        let mut ws = Workspace::new(Settings {
            max_recent_files: 2,
            ..Settings::default()
        });
        ws.push_recent(Path::new("a.csv"));
        ws.push_recent(Path::new("b.csv"));
        ws.push_recent(Path::new("a.csv"));
        ws.push_recent(Path::new("c.csv"));

        assert_eq!(ws.recent_files, vec![PathBuf::from("c.csv"), PathBuf::from("a.csv")]);
    }

    #[test]
    fn test_project_snapshot_drops_unloadable_files() {
        let mut ws = Workspace::default();
        let file_id = ws.add_file(pump_file());
        ws.add_series(SeriesConfig::new("pump", file_id.clone(), "time", "pressure")).unwrap();
        ws.add_annotation(AnnotationConfig::new(AnnotationKind::VerticalLine { x_pos: 30.0 }));

        let project = ws.to_project();
        assert_eq!(project.files.len(), 1);
        assert_eq!(project.files[0].id, file_id);
        assert_eq!(project.series.len(), 1);

        // "pump.csv" was never written to disk
        let restored = Workspace::from_project(project, Settings::default());
        assert!(!restored.has_data());
        assert!(restored.series_list().is_empty());
        assert_eq!(restored.annotations.len(), 1);
    }

    #[test]
    fn test_annotations() {
        let mut ws = Workspace::default();
        let id = ws.add_annotation(AnnotationConfig::new(AnnotationKind::text(1.0, 2.0, "vent")));
        assert!(ws.remove_annotation(&id).is_some());
        assert!(ws.remove_annotation(&id).is_none());
    }
}

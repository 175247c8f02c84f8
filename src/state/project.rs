//! Project and series-configuration files

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::config::PROJECT_VERSION;
use crate::data::source::FileData;
use crate::error::{Result, VacError};

use super::annotation::AnnotationConfig;
use super::series::SeriesConfig;

/// Reference to a data file used by a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReference {
    pub id: String,
    pub filepath: PathBuf,
    pub filename: String,
    pub load_time: DateTime<Utc>,
}

impl From<&FileData> for FileReference {
    fn from(file: &FileData) -> Self {
        Self {
            id: file.id.clone(),
            filepath: file.path.clone(),
            filename: file.filename.clone(),
            load_time: file.load_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotType {
    #[default]
    Line,
    Scatter,
    Bar,
}

/// Figure-level plot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub title: String,
    pub title_size: f64,
    pub xlabel: String,
    pub xlabel_size: f64,
    pub ylabel: String,
    pub ylabel_size: f64,
    pub log_scale_x: bool,
    pub log_scale_y: bool,
    pub show_grid: bool,
    pub show_legend: bool,
    pub grid_alpha: f64,
    pub fig_width: f64,
    pub fig_height: f64,
    pub plot_type: PlotType,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            title: "Multi-File Data Analysis".to_string(),
            title_size: 16.0,
            xlabel: "X Axis".to_string(),
            xlabel_size: 12.0,
            ylabel: "Y Axis".to_string(),
            ylabel_size: 12.0,
            log_scale_x: false,
            log_scale_y: false,
            show_grid: true,
            show_legend: true,
            grid_alpha: 0.3,
            fig_width: 14.0,
            fig_height: 9.0,
            plot_type: PlotType::default(),
        }
    }
}

/// Everything needed to restore a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_version")]
    pub version: String,
    pub creation_date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<FileReference>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
    #[serde(default)]
    pub annotations: Vec<AnnotationConfig>,
    #[serde(default)]
    pub plot_config: PlotConfig,
}

fn default_version() -> String {
    PROJECT_VERSION.to_string()
}

impl Default for ProjectFile {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: default_version(),
            creation_date: now,
            last_modified: now,
            files: Vec::new(),
            series: Vec::new(),
            annotations: Vec::new(),
            plot_config: PlotConfig::default(),
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

impl ProjectFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write pretty JSON, keeping the previous file as `<path>.backup`
    /// until the write succeeds
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_modified = Utc::now();
        let json = serde_json::to_string_pretty(self)?;

        let backup = backup_path(path);
        let had_previous = path.exists();
        if had_previous {
            if let Err(err) = fs::rename(path, &backup) {
                tracing::warn!(error = %err, path = %path.display(), "could not create project backup");
            }
        }

        match fs::write(path, json) {
            Ok(()) => {
                if backup.exists() {
                    if let Err(err) = fs::remove_file(&backup) {
                        tracing::warn!(error = %err, "could not remove project backup");
                    }
                }
                tracing::info!(path = %path.display(), series = self.series.len(), "project saved");
                Ok(())
            }
            Err(err) => {
                if backup.exists() {
                    if let Err(restore) = fs::rename(&backup, path) {
                        tracing::error!(error = %restore, "could not restore project backup");
                    }
                }
                Err(err.into())
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let project: ProjectFile = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            version = %project.version,
            files = project.files.len(),
            series = project.series.len(),
            "project loaded"
        );
        Ok(project)
    }
}

#[derive(Serialize)]
struct SeriesExport<'a> {
    version: &'a str,
    series: &'a [SeriesConfig],
}

/// Write series configurations as `{ "version", "series": [...] }`
pub fn export_series_config(series: &[SeriesConfig], path: &Path) -> Result<()> {
    let export = SeriesExport {
        version: PROJECT_VERSION,
        series,
    };
    fs::write(path, serde_json::to_string_pretty(&export)?)?;
    Ok(())
}

/// Read series configurations written by [`export_series_config`]
pub fn import_series_config(path: &Path) -> Result<Vec<SeriesConfig>> {
    let contents = fs::read_to_string(path)?;
    let mut value: Value = serde_json::from_str(&contents)?;
    let series = value
        .get_mut("series")
        .map(Value::take)
        .ok_or_else(|| VacError::Validation("Invalid configuration file: missing 'series' key".to_string()))?;
    Ok(serde_json::from_value(series)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::annotation::AnnotationKind;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut project = ProjectFile::new();
        project.series.push(SeriesConfig::new("Chamber A", "f1", "time", "pressure"));
        project
            .annotations
            .push(AnnotationConfig::new(AnnotationKind::HorizontalLine { y_pos: 1e-6 }));
        project.plot_config.log_scale_y = true;
        project.save(&path).unwrap();

        let loaded = ProjectFile::load(&path).unwrap();
        assert_eq!(loaded, project);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_overwrite_removes_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut project = ProjectFile::new();
        project.save(&path).unwrap();
        project.plot_config.title = "Second".to_string();
        project.save(&path).unwrap();

        assert_eq!(ProjectFile::load(&path).unwrap().plot_config.title, "Second");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(ProjectFile::load(&missing), Err(VacError::FileIo(_))));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(ProjectFile::load(&broken), Err(VacError::Json(_))));
    }

    #[test]
    fn test_series_export_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.json");
        let series = vec![
            SeriesConfig::new("A", "f1", "time", "p1"),
            SeriesConfig::new("B", "f1", "Index", "p2").with_range(10, Some(50)),
        ];

        export_series_config(&series, &path).unwrap();
        assert_eq!(import_series_config(&path).unwrap(), series);
    }

    #[test]
    fn test_import_requires_series_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.json");
        fs::write(&path, r#"{"version": "1.0"}"#).unwrap();

        assert!(matches!(import_series_config(&path), Err(VacError::Validation(_))));
    }

    #[test]
    fn test_sparse_project_uses_defaults() {
        let json = r#"{
            "creation_date": "2024-01-01T00:00:00Z",
            "last_modified": "2024-01-02T00:00:00Z"
        }"#;
        let project: ProjectFile = serde_json::from_str(json).unwrap();
        assert_eq!(project.version, "1.0");
        assert!(project.series.is_empty());
        assert_eq!(project.plot_config, PlotConfig::default());
    }
}

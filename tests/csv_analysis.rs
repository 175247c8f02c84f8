use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::{Duration, NaiveDate};
use tempfile::tempdir;

use vac_oxide::Settings;
use vac_oxide::data::{ColumnKind, FileData};
use vac_oxide::state::{SeriesConfig, Workspace};
use vac_oxide::vacuum::{CycleEfficiency, analyze_pump_down_curve, calculate_leak_rate};

const TAU: f64 = 20.0;

fn pressure_at(i: usize) -> f64 {
    1e-1 * (-(i as f64) / TAU).exp() + 1e-8
}

/// Five minutes of 1 Hz pump-down logged with wall-clock timestamps
fn write_pump_log(path: &Path) {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();

    let mut csv = String::from("timestamp,pressure\n");
    for i in 0..300 {
        let t = start + Duration::seconds(i as i64);
        writeln!(csv, "{},{:e}", t.format("%Y-%m-%d %H:%M:%S"), pressure_at(i)).unwrap();
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn test_timestamp_column_becomes_seconds() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pump.csv");
    write_pump_log(&path);

    let file = FileData::load(&path).unwrap();
    assert_eq!(file.height(), 300);
    assert_eq!(file.column_info("timestamp").unwrap().kind, ColumnKind::Datetime);
    assert_eq!(file.column_info("pressure").unwrap().kind, ColumnKind::Numeric);

    let time = file.column_as_f64("timestamp").unwrap();
    for pair in time.windows(2) {
        assert!((pair[1] - pair[0] - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_pump_down_from_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pump.csv");
    write_pump_log(&path);

    let file = FileData::load(&path).unwrap();
    let time = file.column_as_f64("timestamp").unwrap();
    let pressure = file.column_as_f64("pressure").unwrap();

    let result = analyze_pump_down_curve(&pressure, &time).unwrap();
    assert_eq!(result.total_pump_time, 299.0);

    // 1e-2 down to 1e-7; the curve never reaches 1e-8
    assert_eq!(result.milestones.len(), 6);
    for pair in result.milestones.windows(2) {
        assert!(pair[1].duration > pair[0].duration);
    }

    let tau = result.time_constant.unwrap();
    assert!((tau - TAU).abs() < 1.0, "tau = {tau}");
    assert!(result.fit_quality > 0.99);
}

#[test]
fn test_workspace_performance_report() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pump.csv");
    write_pump_log(&path);

    let mut workspace = Workspace::new(Settings::default());
    let file_id = workspace.load_file(&path).unwrap();
    let series_id = workspace
        .add_series(SeriesConfig::new("Chamber", file_id, "timestamp", "pressure"))
        .unwrap();

    let report = workspace.analyze_series(&series_id, Some(50.0)).unwrap();

    assert_eq!(report.basic_metrics.data_points, 300);
    assert_eq!(report.system_volume.volume_liters, 50.0);
    assert!(report.base_pressure < 1e-6);

    // The decay runs to the end of the log, so the whole trace is one cycle
    assert_eq!(report.pump_cycles.len(), 1);
    assert_eq!(report.pump_cycles[0].efficiency, CycleEfficiency::High);
    assert_eq!(report.pump_cycles[0].end_index, 300);

    let rating = &report.system_rating;
    assert!((0.0..=100.0).contains(&rating.score));
    assert_eq!(rating.factors.len(), 4);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["system_rating"]["grade"].is_string());
}

#[test]
fn test_leak_rise_from_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rise.csv");

    let mut csv = String::from("t,p\n");
    for i in 0..200 {
        writeln!(csv, "{},{:e}", i as f64 * 0.5, 2e-6 + 5e-8 * i as f64 * 0.5).unwrap();
    }
    fs::write(&path, csv).unwrap();

    let file = FileData::load(&path).unwrap();
    let time = file.column_as_f64("t").unwrap();
    let pressure = file.column_as_f64("p").unwrap();

    let leak = calculate_leak_rate(&pressure, &time, pressure[0], None).unwrap();
    assert!((leak.linear.leak_rate - 5e-8).abs() / 5e-8 < 1e-6);
    assert!(leak.linear.fit_quality > 0.999);
    assert_eq!(leak.summary.analysis_duration, 99.5);
}

#[test]
fn test_excel_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.xlsx");
    fs::write(&path, b"not really excel").unwrap();

    assert!(matches!(
        FileData::load(&path),
        Err(vac_oxide::VacError::UnsupportedFormat { .. })
    ));
}

/// Flat 1e-6 mbar trace with 1% ripple and a single 3x burst at row 150
fn write_burst_log(path: &Path) {
    let mut csv = String::from("t,p\n");
    for i in 0..300 {
        let t = i as f64;
        let p = if i == 150 { 3e-6 } else { 1e-6 * (1.0 + 0.01 * (t * 0.9).sin()) };
        writeln!(csv, "{t},{p:e}").unwrap();
    }
    fs::write(path, csv).unwrap();
}

fn write_settings(path: &Path) {
    fs::write(
        path,
        r#"{"spike_sigma": 6.0, "cycle_min_drop": 8.0, "system_volume_liters": 25.0, "smoothing_window": 9}"#,
    )
    .unwrap();
}

#[test]
fn test_workspace_report_follows_settings_file() {
    let dir = tempdir().unwrap();
    let pump = dir.path().join("pump.csv");
    let burst = dir.path().join("burst.csv");
    let settings_path = dir.path().join("settings.json");
    write_pump_log(&pump);
    write_burst_log(&burst);
    write_settings(&settings_path);

    let mut defaults = Workspace::new(Settings::default());
    let burst_id = defaults.load_file(&burst).unwrap();
    let series = defaults.create_series("burst", &burst_id, "t", "p").unwrap();
    assert_eq!(defaults.analyze_series(&series, None).unwrap().pressure_spikes.len(), 1);

    let settings = Settings::load(&settings_path).unwrap();
    let mut workspace = Workspace::new(settings);
    let pump_id = workspace.load_file(&pump).unwrap();
    let burst_id = workspace.load_file(&burst).unwrap();
    let pump_series = workspace.create_series("pump", &pump_id, "timestamp", "pressure").unwrap();
    let burst_series = workspace.create_series("burst", &burst_id, "t", "p").unwrap();

    assert_eq!(workspace.series(&pump_series).unwrap().smoothing_window, 9);

    // The 6.4 decade pump-down is below the configured 8 decade minimum
    let report = workspace.analyze_series(&pump_series, None).unwrap();
    assert!(report.pump_cycles.is_empty());
    assert_eq!(report.system_volume.volume_liters, 25.0);
    assert!(!report.system_volume.estimated);

    let report = workspace.analyze_series(&burst_series, None).unwrap();
    assert!(report.pressure_spikes.is_empty());
}

#[test]
fn test_cli_analyze_uses_settings() {
    let dir = tempdir().unwrap();
    let burst = dir.path().join("burst.csv");
    let settings_path = dir.path().join("settings.json");
    write_burst_log(&burst);
    write_settings(&settings_path);

    let run = |settings: &Path| -> serde_json::Value {
        let output = Command::new(env!("CARGO_BIN_EXE_vac-oxide"))
            .arg("--settings")
            .arg(settings)
            .arg("analyze")
            .arg(&burst)
            .args(["--time", "t", "--pressure", "p"])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap()
    };

    let tuned = run(&settings_path);
    assert_eq!(tuned["pressure_spikes"].as_array().unwrap().len(), 0);

    // An absent settings file means defaults
    let default = run(&dir.path().join("absent.json"));
    assert_eq!(default["pressure_spikes"].as_array().unwrap().len(), 1);
    assert_eq!(default["system_volume"]["volume_liters"], 10.0);
    assert_eq!(tuned["system_volume"]["volume_liters"], 25.0);
}

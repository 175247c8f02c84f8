//! Writing processed series data back out as CSV or Parquet

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::{Result, VacError};

/// Two-column frame from paired values
pub fn pairs_to_dataframe(x_name: &str, y_name: &str, x: &[f64], y: &[f64]) -> Result<DataFrame> {
    if x.len() != y.len() {
        return Err(VacError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    // Same-named columns would be rejected by polars
    let y_name = if x_name == y_name { format!("{y_name}_y") } else { y_name.to_string() };

    Ok(DataFrame::new(vec![
        Series::new(x_name.into(), x).into(),
        Series::new(y_name.as_str().into(), y).into(),
    ])?)
}

/// Write a frame, choosing the format from the extension
pub fn write_dataframe(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {
            let mut file = File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        "parquet" => {
            let file = File::create(path)?;
            ParquetWriter::new(file).finish(df)?;
        }
        _ => return Err(VacError::UnsupportedFormat { extension }),
    }

    tracing::info!(path = %path.display(), rows = df.height(), "exported series data");
    Ok(())
}

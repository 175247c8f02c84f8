//! Vacuum pressure-curve analysis
//!
//! Load tabular logs with [`data::FileData`], pick pressure and time columns
//! through a [`state::SeriesConfig`], and run the analyses in [`vacuum`].

pub mod constants;
pub mod data;
pub mod error;
pub mod settings;
pub mod signal;
pub mod state;
pub mod vacuum;

pub use error::{Result, VacError};
pub use settings::Settings;

//! Application-wide constants and default values
//!
//! This module centralizes the fixed thresholds used by the analysis
//! functions, so every ladder and breakpoint has exactly one definition.

/// Vacuum analysis defaults and classification thresholds
pub mod vacuum {
    /// Default base-pressure analysis window in minutes
    pub const DEFAULT_BASE_WINDOW_MINUTES: f64 = 10.0;

    /// Default sampling rate in Hz
    pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 1.0;

    /// Percentile used by the performance report for base pressure
    pub const BASE_PRESSURE_PERCENTILE: f64 = 10.0;

    /// Default spike threshold in rolling standard deviations
    pub const DEFAULT_SPIKE_SIGMA: f64 = 3.0;

    /// Default minimum spike duration in samples
    pub const DEFAULT_SPIKE_MIN_DURATION: usize = 1;

    /// Minimum valid samples before spike detection runs
    pub const SPIKE_MIN_SAMPLES: usize = 10;

    /// Bounds for the adaptive spike window
    pub const SPIKE_WINDOW_MIN: usize = 10;
    pub const SPIKE_WINDOW_MAX: usize = 100;

    /// Spike severity ratio breakpoints (max / baseline)
    pub const SPIKE_RATIO_CRITICAL: f64 = 100.0;
    pub const SPIKE_RATIO_HIGH: f64 = 10.0;
    pub const SPIKE_RATIO_MEDIUM: f64 = 3.0;

    /// Chamber volumes (L) evaluated by the conductance leak heuristic
    pub const CONDUCTANCE_VOLUMES_L: [f64; 4] = [1.0, 10.0, 100.0, 1000.0];

    /// Scale applied by the conductance heuristic
    pub const CONDUCTANCE_SCALE: f64 = 1e-3;

    /// Exponential leak estimate is preferred above this fit quality
    pub const EXPONENTIAL_PREFERENCE_R2: f64 = 0.8;

    /// Leak severity thresholds (mbar·L/s)
    pub const LEAK_SEVERE: f64 = 1e-6;
    pub const LEAK_SIGNIFICANT: f64 = 1e-8;
    pub const LEAK_MINOR: f64 = 1e-10;

    /// Pump-down milestone pressures (mbar)
    pub const MILESTONES_MBAR: [f64; 8] = [1e-2, 1e-3, 1e-4, 1e-5, 1e-6, 1e-7, 1e-8, 1e-9];

    /// Minimum window for local pump-rate fits
    pub const PUMP_RATE_MIN_WINDOW: usize = 10;

    /// Pump-rate window as a fraction of the curve (N / divisor)
    pub const PUMP_RATE_WINDOW_DIVISOR: usize = 20;

    /// Initial time-constant guess for the exponential decay fit (s)
    pub const DECAY_TAU_GUESS: f64 = 100.0;

    /// Lower bound on the fitted time constant (s)
    pub const DECAY_TAU_MIN: f64 = 1.0;

    /// Surface area assumed for specific outgassing (m²)
    pub const OUTGASSING_AREA_M2: f64 = 1.0;

    /// Outgassing level thresholds (mbar·L/s)
    pub const OUTGASSING_HIGH: f64 = 1e-6;
    pub const OUTGASSING_MODERATE: f64 = 1e-8;
    pub const OUTGASSING_LOW: f64 = 1e-10;

    /// Log-pressure derivative below which a sample counts as pumping
    pub const CYCLE_DERIVATIVE_THRESHOLD: f64 = -0.001;

    /// Offset added before taking log10 in cycle detection
    pub const CYCLE_LOG_OFFSET: f64 = 1e-12;

    /// Default minimum pressure drop for a cycle (decades)
    pub const DEFAULT_CYCLE_MIN_DROP: f64 = 2.0;

    /// Default minimum cycle duration (samples)
    pub const DEFAULT_CYCLE_MIN_DURATION: usize = 10;

    /// Cycle efficiency breakpoints (decades)
    pub const CYCLE_EFFICIENCY_HIGH: f64 = 4.0;
    pub const CYCLE_EFFICIENCY_MODERATE: f64 = 2.0;

    /// Minimum valid samples for the performance report
    pub const PERFORMANCE_MIN_SAMPLES: usize = 10;

    /// The report only looks for leaks above this many samples
    pub const PERFORMANCE_LEAK_MIN_SAMPLES: usize = 50;

    /// Rising samples needed before a leak analysis is attempted
    pub const PERFORMANCE_LEAK_MIN_RISING: usize = 10;

    /// Volume assumed when none is supplied (L)
    pub const DEFAULT_SYSTEM_VOLUME_L: f64 = 10.0;
}

/// System rating ladders
pub mod rating {
    /// Points per sub-metric grade (A, B, C, D)
    pub const GRADE_POINTS: [f64; 4] = [25.0, 18.75, 12.5, 0.0];

    /// Base pressure breakpoints (mbar), lower is better
    pub const BASE_PRESSURE: [f64; 3] = [1e-8, 1e-6, 1e-4];

    /// Mean pump-down drop breakpoints (decades), higher is better
    pub const PUMP_EFFICIENCY: [f64; 3] = [5.0, 3.0, 1.0];

    /// Spikes per 1000 samples, lower is better
    pub const SPIKE_RATE: [f64; 3] = [1.0, 5.0, 10.0];

    /// Relative standard deviation, lower is better
    pub const STABILITY: [f64; 3] = [0.1, 0.3, 0.5];

    /// Overall score breakpoints for grades A, B, C
    pub const OVERALL: [f64; 3] = [87.5, 62.5, 37.5];
}

/// Statistics defaults
pub mod stats {
    /// Default IQR outlier multiplier
    pub const DEFAULT_IQR_THRESHOLD: f64 = 1.5;

    /// Default z-score outlier threshold
    pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

    /// Minimum valid points for outlier detection
    pub const OUTLIER_MIN_POINTS: usize = 3;
}

/// Data-quality analysis defaults
pub mod quality {
    /// Values with magnitude below this count as zeros
    pub const ZERO_THRESHOLD: f64 = 1e-10;

    /// IQR multiplier for quality outliers
    pub const OUTLIER_THRESHOLD: f64 = 3.0;

    /// Consecutive values closer than this are duplicates
    pub const DUPLICATE_THRESHOLD: f64 = 1e-6;

    /// Timestamp gap, in median intervals, that counts as missing data
    pub const GAP_FACTOR: f64 = 10.0;

    /// Share of a string column that must parse before it is reclassified
    pub const SNIFF_RATIO: f64 = 0.8;

    /// Rows inspected when sniffing string columns
    pub const SNIFF_ROWS: usize = 100;
}

/// Series defaults
pub mod series {
    /// Pseudo-column that selects row numbers as X data
    pub const INDEX_COLUMN: &str = "Index";

    /// Default smoothing window
    pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

    /// Default line width
    pub const DEFAULT_LINE_WIDTH: f64 = 2.5;

    /// Default marker size
    pub const DEFAULT_MARKER_SIZE: f64 = 6.0;

    /// Default opacity
    pub const DEFAULT_ALPHA: f64 = 0.9;

    /// Default peak prominence
    pub const DEFAULT_PEAK_PROMINENCE: f64 = 0.1;

    /// Default moving average window
    pub const DEFAULT_MA_WINDOW: usize = 20;
}

/// Date/time parsing constants
pub mod datetime {
    /// Minimum string length for compact timestamp parsing
    pub const MIN_TIMESTAMP_LENGTH: usize = 15;

    /// YYYYMMDD format length
    pub const DATE_FORMAT_LENGTH: usize = 8;

    /// HHMMSS format length
    pub const TIME_FORMAT_LENGTH: usize = 6;
}

/// Numeric precision constants
pub mod numeric {
    /// Matrix singularity check tolerance
    pub const SINGULARITY_TOLERANCE: f64 = 1e-12;

    /// Levenberg-Marquardt iteration cap
    pub const LM_MAX_ITERATIONS: usize = 500;
}

/// Persistence constants
pub mod config {
    /// Settings file name
    pub const SETTINGS_FILE: &str = "vac-oxide.json";

    /// Project file format version
    pub const PROJECT_VERSION: &str = "1.0";

    /// Maximum number of recent files to track
    pub const MAX_RECENT_FILES: usize = 10;
}

//! Centralized error handling for spatial_stats
//!
//! Every fallible operation in the crate returns [`SpatialStatsError`]. Errors are
//! grouped into a small taxonomy ([`ErrorKind`]) that the binary maps onto process
//! exit codes.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of an error, used for exit codes and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing configuration option
    Configuration,
    /// Input exists but is not a usable gridded dataset
    FileFormat,
    /// Input file, variable or coordinate is absent
    NotFound,
    /// A requested subset resolves to an empty index range
    OutOfRange,
    /// An output could not be written
    Io,
    /// Anything else (library failures, thread pool setup)
    Internal,
}

/// Main error type for spatial_stats operations
#[derive(Debug, Error)]
pub enum SpatialStatsError {
    /// Invalid or missing configuration option
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input dataset does not exist
    #[error("Input file '{}' does not exist", path.display())]
    InputNotFound { path: PathBuf },

    /// Input dataset exists but could not be opened as NetCDF
    #[error("'{}' is not a readable NetCDF dataset: {source}", path.display())]
    FileFormat {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// Coordinate variable not found in NetCDF file
    #[error("Coordinate '{name}' not found in file")]
    CoordinateNotFound { name: String },

    /// Variable is not laid out as (time, lat, lon)
    #[error("Variable '{var}' has an unsupported layout: {message}")]
    UnsupportedLayout { var: String, message: String },

    /// Coordinate values are empty, non-finite or not monotonic
    #[error("Invalid coordinate axis '{name}': {message}")]
    InvalidAxis { name: String, message: String },

    /// No coordinate value lies within the requested bounds
    #[error("No {axis} coordinate lies within [{lower}, {upper}]")]
    OutOfRange { axis: String, lower: f64, upper: f64 },

    /// Index range does not fit the axis it is applied to
    #[error("Index range {start}..{end} is invalid for {axis} axis of length {len}")]
    IndexOutOfBounds {
        axis: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// Output file could not be staged or committed
    #[error("Cannot write output '{}': {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output NetCDF file could not be created or written
    #[error("Cannot write NetCDF output '{}': {source}", path.display())]
    OutputNetCDF {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    /// NetCDF library errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Plot rendering failure
    #[error("Plot rendering error: {0}")]
    PlotError(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

impl SpatialStatsError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::InputNotFound { .. }
            | Self::VariableNotFound { .. }
            | Self::CoordinateNotFound { .. } => ErrorKind::NotFound,
            Self::FileFormat { .. } | Self::UnsupportedLayout { .. } | Self::InvalidAxis { .. } => {
                ErrorKind::FileFormat
            }
            Self::OutOfRange { .. } | Self::IndexOutOfBounds { .. } => ErrorKind::OutOfRange,
            Self::OutputWrite { .. } | Self::OutputNetCDF { .. } | Self::PlotError(_) => {
                ErrorKind::Io
            }
            Self::NetCDFError(_)
            | Self::IoError(_)
            | Self::ArrayError(_)
            | Self::ThreadPoolError(_) => ErrorKind::Internal,
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::FileFormat | ErrorKind::NotFound => 3,
            ErrorKind::OutOfRange => 4,
            ErrorKind::Io => 5,
            ErrorKind::Internal => 1,
        }
    }
}

/// Result type alias for spatial_stats operations
pub type Result<T> = std::result::Result<T, SpatialStatsError>;

//! spatial_stats: spatial mean and variance of gridded NetCDF climate variables
//!
//! For each retained time step of a 3-D `(time, lat, lon)` variable, the crate
//! computes the mean and variance over a user-selected latitude/longitude box,
//! writes both series to a new NetCDF file and renders a static plot.
//!
//! ## Module Organization
//!
//! - [`dataset`]: Opening NetCDF files, reading coordinate axes and data variables
//! - [`selection`]: Coordinate axes and bound-to-index-range resolution
//! - [`statistics`]: Per-time-step spatial reductions, serial or parallel
//! - [`netcdf_io`]: Writing and reading the output series file
//! - [`plot`]: Static plot rendering with `plotters`
//! - [`config`]: Layered run configuration (defaults, file, flags)
//! - [`pipeline`]: The end-to-end run
//! - [`time`]: CF time units and date bounds
//! - [`metadata`]: Dataset listings
//! - [`parallel`]: Rayon thread pool configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use spatial_stats::prelude::*;
//!
//! let config = AnalysisConfig {
//!     input_path: Some("era_interim.nc".into()),
//!     lat_min: Some(30.0),
//!     lat_max: Some(60.0),
//!     ..AnalysisConfig::default()
//! };
//! let summary = run_analysis(&config)?;
//! println!("{} steps written to {}", summary.steps(), summary.output_path.display());
//! # Ok::<(), SpatialStatsError>(())
//! ```
//!
//! Lower-level pieces can be combined directly:
//!
//! ```rust,no_run
//! use spatial_stats::prelude::*;
//!
//! let dataset = Dataset::open("era_interim.nc")?;
//! let variable = dataset.read_variable("t2m")?;
//! let lat = dataset.axis_for_dimension(&variable.dimensions[1])?;
//! let lat_range = select(&lat, -30.0, 30.0)?;
//! # Ok::<(), SpatialStatsError>(())
//! ```

pub mod cli;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod selection;
pub mod staging;
pub mod statistics;
pub mod time;

pub use errors::{ErrorKind, Result, SpatialStatsError};

/// Commonly used items
pub mod prelude {
    pub use crate::config::AnalysisConfig;
    pub use crate::dataset::{DataVariable, Dataset};
    pub use crate::errors::{ErrorKind, Result, SpatialStatsError};
    pub use crate::metadata::DatasetSummary;
    pub use crate::netcdf_io::{read_series, write_series, SeriesData, SeriesMetadata};
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{run_analysis, AnalysisSummary};
    pub use crate::plot::{write_plot, PlotBackend, PlotLayout, PlotOptions};
    pub use crate::selection::{
        select, select_indices, select_optional, CoordinateAxis, IndexRange, SelectionMode,
    };
    pub use crate::statistics::{
        reduce, MissingDetection, ReduceConfig, ReductionResult, SpatialMoments, VarianceKind,
    };
    pub use crate::time::TimeBound;
}

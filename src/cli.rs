//! Defines command-line interface options using `clap` for the spatialstats application.
//!
//! Every analysis option is optional here: values left unset fall back to the
//! configuration file, then to built-in defaults (see [`crate::config`]).

use crate::plot::{PlotBackend, PlotLayout};
use crate::selection::SelectionMode;
use crate::statistics::{MissingDetection, VarianceKind};
use crate::time::TimeBound;
use clap::Parser;
use std::path::PathBuf;

/// Spatial mean and variance time series from gridded NetCDF climate data
#[derive(Parser, Debug, Default)]
#[command(
    name = "spatialstats",
    version,
    about = "Compute spatial mean and variance over a subset of a NetCDF variable",
    long_about = "
Selects a time range and latitude/longitude box from a 3-D (time, lat, lon)
NetCDF variable, reduces every retained time step to its spatial mean and
variance, then writes both series to a new NetCDF file and renders a plot.

Options may come from a JSON or YAML configuration file; flags override it.

EXAMPLES:
  spatialstats -i era_interim.nc -n t2m --lat-min 30 --lat-max 60 --lon-min -10 --lon-max 40

  spatialstats --config analysis.json --time-start 1990-01-01 --time-end 1999-12-31

  spatialstats -i era_interim.nc --list-vars
"
)]
pub struct Args {
    /// Configuration file (JSON or YAML); flags override its values
    #[arg(short, long, env = "SPATIALSTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input NetCDF dataset
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output NetCDF file for the mean/variance series
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output plot image
    #[arg(short, long)]
    pub plot: Option<PathBuf>,

    /// Variable to reduce (must be 3-D: time, lat, lon)
    #[arg(short = 'n', long)]
    pub variable: Option<String>,

    /// Start of the time range: axis offset, index (index mode) or date
    #[arg(long, allow_negative_numbers = true)]
    pub time_start: Option<TimeBound>,

    /// End of the time range: axis offset, index (index mode) or date
    #[arg(long, allow_negative_numbers = true)]
    pub time_end: Option<TimeBound>,

    /// Southern latitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lat_min: Option<f64>,

    /// Northern latitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lat_max: Option<f64>,

    /// Western longitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lon_min: Option<f64>,

    /// Eastern longitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub lon_max: Option<f64>,

    /// Interpret bounds as coordinate values or as half-open index ranges
    #[arg(long, value_enum)]
    pub selection: Option<SelectionMode>,

    /// Variance divisor
    #[arg(long, value_enum)]
    pub variance: Option<VarianceKind>,

    /// How missing grid points are detected
    #[arg(long, value_enum)]
    pub missing: Option<MissingDetection>,

    /// Fill value overriding the variable's _FillValue/missing_value attributes
    #[arg(long, allow_negative_numbers = true)]
    pub fill_value: Option<f64>,

    /// Image renderer; both write straight to file without a display
    #[arg(long, value_enum)]
    pub plot_backend: Option<PlotBackend>,

    /// Plot arrangement
    #[arg(long, value_enum)]
    pub plot_layout: Option<PlotLayout>,

    /// Plot width in pixels
    #[arg(long)]
    pub plot_width: Option<u32>,

    /// Plot height in pixels
    #[arg(long)]
    pub plot_height: Option<u32>,

    /// Plot title (defaults to one naming the variable)
    #[arg(long)]
    pub plot_title: Option<String>,

    /// Reduce time steps in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Number of threads for parallel reduction (implies --parallel)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// List dimensions and variables of the input file, then exit
    #[arg(long)]
    pub list_vars: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_bounds_and_enums() {
        let args = Args::try_parse_from([
            "spatialstats",
            "-i",
            "era.nc",
            "--lat-min",
            "-30",
            "--lat-max",
            "30.5",
            "--time-start",
            "1990-01-01",
            "--time-end",
            "365",
            "--variance",
            "sample",
            "--missing",
            "non-finite",
            "--plot-backend",
            "svg",
            "--plot-layout",
            "error-band",
            "--selection",
            "index",
        ])
        .unwrap();

        assert_eq!(args.input, Some(PathBuf::from("era.nc")));
        assert_eq!(args.lat_min, Some(-30.0));
        assert_eq!(args.lat_max, Some(30.5));
        assert_eq!(args.time_start, Some(TimeBound::Date("1990-01-01".to_string())));
        assert_eq!(args.time_end, Some(TimeBound::Offset(365.0)));
        assert_eq!(args.variance, Some(VarianceKind::Sample));
        assert_eq!(args.missing, Some(MissingDetection::NonFinite));
        assert_eq!(args.plot_backend, Some(PlotBackend::Svg));
        assert_eq!(args.plot_layout, Some(PlotLayout::ErrorBand));
        assert_eq!(args.selection, Some(SelectionMode::Index));
        assert!(!args.parallel);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["spatialstats", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_invalid_time_bound_is_rejected() {
        assert!(Args::try_parse_from(["spatialstats", "--time-start", "soon"]).is_err());
    }
}

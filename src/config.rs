//! Analysis configuration
//!
//! [`AnalysisConfig`] gathers every run option. Values are layered as
//! built-in defaults, then a JSON or YAML file, then command-line flags, and
//! validated once before any file is touched.
//!
//! A configuration file looks like:
//!
//! ```json
//! {
//!   "input_path": "era_interim.nc",
//!   "variable_name": "t2m",
//!   "time_start": "1990-01-01",
//!   "time_end": "1999-12-31",
//!   "lat_min": 30.0,
//!   "lat_max": 60.0,
//!   "lon_min": -10.0,
//!   "lon_max": 40.0,
//!   "variance": "sample",
//!   "plot": { "backend": "svg", "layout": "error-band" }
//! }
//! ```
//!
//! Upper-case keys (`INPUT_FILE`, `OUTPUT_FILE`, `PLOT_FILE`, `VAR_NAME`,
//! `TIME_MIN`, `TIME_MAX`, `LAT_MIN`, ...) are accepted as aliases.

use crate::cli::Args;
use crate::errors::{Result, SpatialStatsError};
use crate::parallel::ParallelConfig;
use crate::plot::PlotOptions;
use crate::selection::SelectionMode;
use crate::statistics::{MissingDetection, ReduceConfig, VarianceKind};
use crate::time::TimeBound;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Every option of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    #[serde(alias = "INPUT_FILE")]
    pub input_path: Option<PathBuf>,
    #[serde(alias = "OUTPUT_FILE")]
    pub output_path: PathBuf,
    #[serde(alias = "PLOT_FILE")]
    pub plot_path: PathBuf,
    #[serde(alias = "VAR_NAME")]
    pub variable_name: String,

    #[serde(alias = "TIME_MIN")]
    pub time_start: Option<TimeBound>,
    #[serde(alias = "TIME_MAX")]
    pub time_end: Option<TimeBound>,
    #[serde(alias = "LAT_MIN")]
    pub lat_min: Option<f64>,
    #[serde(alias = "LAT_MAX")]
    pub lat_max: Option<f64>,
    #[serde(alias = "LON_MIN")]
    pub lon_min: Option<f64>,
    #[serde(alias = "LON_MAX")]
    pub lon_max: Option<f64>,

    pub selection: SelectionMode,
    pub variance: VarianceKind,
    pub missing: MissingDetection,
    pub fill_value: Option<f64>,

    /// Coordinate variable names, when they differ from the variable's dimension names
    pub time_dimension: Option<String>,
    pub lat_dimension: Option<String>,
    pub lon_dimension: Option<String>,

    pub plot: PlotOptions,
    pub parallel: bool,
    /// Thread count for the pool; setting it also turns on parallel reduction
    pub threads: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: PathBuf::from("out.nc"),
            plot_path: PathBuf::from("plot.png"),
            variable_name: "t2m".to_string(),
            time_start: None,
            time_end: None,
            lat_min: None,
            lat_max: None,
            lon_min: None,
            lon_max: None,
            selection: SelectionMode::Coordinate,
            variance: VarianceKind::Population,
            missing: MissingDetection::FillValue,
            fill_value: None,
            time_dimension: None,
            lat_dimension: None,
            lon_dimension: None,
            plot: PlotOptions::default(),
            parallel: false,
            threads: None,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration file; `.yaml`/`.yml` files are read as YAML, anything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SpatialStatsError::Configuration(format!(
                "cannot read configuration file '{}': {e}",
                path.display()
            ))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let config = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .map_err(|e| match e {
            SpatialStatsError::Configuration(msg) => {
                SpatialStatsError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a JSON configuration string
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] for invalid JSON or option values.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SpatialStatsError::Configuration(format!("invalid JSON: {e}")))
    }

    /// Parse a YAML configuration string
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] for invalid YAML or option values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SpatialStatsError::Configuration(format!("invalid YAML: {e}")))
    }

    /// Defaults, overlaid with the file named by `--config` (if any), overlaid with flags
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] if the configuration file cannot be loaded.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        Ok(config)
    }

    /// Replace every option that was given on the command line
    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(input) = &args.input {
            self.input_path = Some(input.clone());
        }
        if let Some(output) = &args.output {
            self.output_path.clone_from(output);
        }
        if let Some(plot) = &args.plot {
            self.plot_path.clone_from(plot);
        }
        if let Some(variable) = &args.variable {
            self.variable_name.clone_from(variable);
        }

        if args.time_start.is_some() {
            self.time_start.clone_from(&args.time_start);
        }
        if args.time_end.is_some() {
            self.time_end.clone_from(&args.time_end);
        }
        self.lat_min = args.lat_min.or(self.lat_min);
        self.lat_max = args.lat_max.or(self.lat_max);
        self.lon_min = args.lon_min.or(self.lon_min);
        self.lon_max = args.lon_max.or(self.lon_max);

        self.selection = args.selection.unwrap_or(self.selection);
        self.variance = args.variance.unwrap_or(self.variance);
        self.missing = args.missing.unwrap_or(self.missing);
        self.fill_value = args.fill_value.or(self.fill_value);

        self.plot.backend = args.plot_backend.unwrap_or(self.plot.backend);
        self.plot.layout = args.plot_layout.unwrap_or(self.plot.layout);
        self.plot.width = args.plot_width.unwrap_or(self.plot.width);
        self.plot.height = args.plot_height.unwrap_or(self.plot.height);
        if args.plot_title.is_some() {
            self.plot.title.clone_from(&args.plot_title);
        }

        self.threads = args.threads.or(self.threads);
        self.parallel |= args.parallel;
    }

    /// Check the configuration before any file I/O.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let input = self.input()?;
        if self.variable_name.trim().is_empty() {
            return Err(config_error("variable_name must not be empty"));
        }

        for (name, path) in [("output_path", &self.output_path), ("plot_path", &self.plot_path)] {
            if path.file_name().is_none() {
                return Err(config_error(format!(
                    "{name} '{}' does not name a file",
                    path.display()
                )));
            }
            if path == input {
                return Err(config_error(format!(
                    "{name} must differ from the input file '{}'",
                    input.display()
                )));
            }
        }
        if self.output_path == self.plot_path {
            return Err(config_error(format!(
                "output_path and plot_path are both '{}'",
                self.output_path.display()
            )));
        }

        for (name, value) in [
            ("lat_min", self.lat_min),
            ("lat_max", self.lat_max),
            ("lon_min", self.lon_min),
            ("lon_max", self.lon_max),
            ("fill_value", self.fill_value),
        ] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(config_error(format!("{name} must be a finite number")));
            }
        }
        for (name, bound) in [("time_start", &self.time_start), ("time_end", &self.time_end)] {
            if let Some(TimeBound::Offset(v)) = bound {
                if !v.is_finite() {
                    return Err(config_error(format!("{name} must be a finite number")));
                }
            }
        }

        if self.selection == SelectionMode::Index {
            for bound in [&self.time_start, &self.time_end].into_iter().flatten() {
                bound.as_index()?;
            }
            for (name, value) in [
                ("lat_min", self.lat_min),
                ("lat_max", self.lat_max),
                ("lon_min", self.lon_min),
                ("lon_max", self.lon_max),
            ] {
                if let Some(v) = value {
                    TimeBound::Offset(v).as_index().map_err(|_| {
                        config_error(format!(
                            "{name} must be a non-negative integer in index mode, got {v}"
                        ))
                    })?;
                }
            }
        }

        self.plot.backend.check_extension(&self.plot_path)?;
        self.plot.validate()?;
        if self.threads == Some(0) {
            return Err(config_error("threads must be at least 1"));
        }
        Ok(())
    }

    /// The input path, which has no default
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] when unset.
    pub fn input(&self) -> Result<&Path> {
        self.input_path
            .as_deref()
            .ok_or_else(|| config_error("no input file given (use --input or input_path)"))
    }

    /// Settings for [`crate::statistics::reduce`]
    #[must_use]
    pub fn reduce_config(&self) -> ReduceConfig {
        ReduceConfig {
            variance: self.variance,
            missing: self.missing,
            fill_value: self.fill_value,
            parallel: self.runs_parallel(),
        }
    }

    /// Parallel reduction was requested, either directly or by giving a thread count
    #[must_use]
    pub fn runs_parallel(&self) -> bool {
        self.parallel || self.threads.is_some()
    }

    /// Thread pool settings, or `None` for a serial run
    #[must_use]
    pub fn parallel_config(&self) -> Option<ParallelConfig> {
        if !self.runs_parallel() {
            return None;
        }
        Some(match self.threads {
            Some(n) => ParallelConfig::new(Some(n)),
            None => ParallelConfig::all_cores(),
        })
    }
}

fn config_error(message: impl Into<String>) -> SpatialStatsError {
    SpatialStatsError::Configuration(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{PlotBackend, PlotLayout};
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn with_input() -> AnalysisConfig {
        AnalysisConfig {
            input_path: Some(PathBuf::from("in.nc")),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.output_path, PathBuf::from("out.nc"));
        assert_eq!(config.plot_path, PathBuf::from("plot.png"));
        assert_eq!(config.variable_name, "t2m");
        assert_eq!(config.variance, VarianceKind::Population);
        assert_eq!(config.missing, MissingDetection::FillValue);
        assert!(config.lat_min.is_none());
        assert!(!config.parallel);
    }

    #[test]
    fn test_json_with_nested_plot() {
        let config = AnalysisConfig::from_json(
            r#"{
                "input_path": "era.nc",
                "time_start": "1990-01-01",
                "time_end": 3650,
                "lat_min": -30,
                "variance": "sample",
                "missing": "non-finite",
                "plot": { "backend": "svg", "layout": "overlay", "width": 800 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.input_path, Some(PathBuf::from("era.nc")));
        assert_eq!(config.time_start, Some(TimeBound::Date("1990-01-01".to_string())));
        assert_eq!(config.time_end, Some(TimeBound::Offset(3650.0)));
        assert_eq!(config.lat_min, Some(-30.0));
        assert_eq!(config.variance, VarianceKind::Sample);
        assert_eq!(config.missing, MissingDetection::NonFinite);
        assert_eq!(config.plot.backend, PlotBackend::Svg);
        assert_eq!(config.plot.layout, PlotLayout::Overlay);
        assert_eq!(config.plot.width, 800);
        assert_eq!(config.plot.height, 768);
        assert_eq!(config.variable_name, "t2m");
    }

    #[test]
    fn test_legacy_upper_case_keys() {
        let config = AnalysisConfig::from_json(
            r#"{
                "INPUT_FILE": "ERA_Interim.nc",
                "OUTPUT_FILE": "stats.nc",
                "PLOT_FILE": "stats.png",
                "VAR_NAME": "sst",
                "LAT_MIN": 5, "LAT_MAX": 50,
                "LON_MIN": 10, "LON_MAX": 100,
                "TIME_MIN": 0, "TIME_MAX": 10,
                "JSON_FILE": null
            }"#,
        )
        .unwrap();

        assert_eq!(config.input_path, Some(PathBuf::from("ERA_Interim.nc")));
        assert_eq!(config.output_path, PathBuf::from("stats.nc"));
        assert_eq!(config.plot_path, PathBuf::from("stats.png"));
        assert_eq!(config.variable_name, "sst");
        assert_eq!(config.lat_max, Some(50.0));
        assert_eq!(config.lon_min, Some(10.0));
        assert_eq!(config.time_end, Some(TimeBound::Offset(10.0)));
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "input_path: era.nc\nselection: index\ntime_start: 0\ntime_end: 12\nparallel: true\nthreads: 2"
        )
        .unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.selection, SelectionMode::Index);
        assert_eq!(config.time_end, Some(TimeBound::Offset(12.0)));
        assert_eq!(config.parallel_config(), Some(ParallelConfig::new(Some(2))));
    }

    #[test]
    fn test_bad_file_is_configuration_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        let err = AnalysisConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = AnalysisConfig::from_file("/no/such/config.json").unwrap_err();
        assert!(matches!(err, SpatialStatsError::Configuration(_)));
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        assert!(AnalysisConfig::from_json(r#"{"variance": "unbiased"}"#).is_err());
    }

    #[test]
    fn test_flags_override_file_values() {
        let mut config = AnalysisConfig::from_json(
            r#"{"input_path": "a.nc", "variable_name": "t2m", "lat_min": 10, "lat_max": 20}"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "spatialstats",
            "-n",
            "sst",
            "--lat-min",
            "-5",
            "--threads",
            "4",
            "--plot-layout",
            "error-band",
            "--plot-width",
            "640",
            "--plot-title",
            "Tropical band",
        ])
        .unwrap();
        config.apply_overrides(&args);

        assert_eq!(config.input_path, Some(PathBuf::from("a.nc")));
        assert_eq!(config.variable_name, "sst");
        assert_eq!(config.lat_min, Some(-5.0));
        assert_eq!(config.lat_max, Some(20.0));
        assert!(config.runs_parallel());
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.plot.layout, PlotLayout::ErrorBand);
        assert_eq!(config.plot.width, 640);
        assert_eq!(config.plot.height, 768);
        assert_eq!(config.plot.title.as_deref(), Some("Tropical band"));
    }

    #[test]
    fn test_plot_options_from_file_survive_missing_flags() {
        let mut config = AnalysisConfig::from_json(
            r#"{"input_path": "a.nc", "plot": {"height": 400, "title": "From file"}}"#,
        )
        .unwrap();
        config.apply_overrides(&Args::try_parse_from(["spatialstats", "--plot-height", "500"]).unwrap());
        assert_eq!(config.plot.height, 500);
        assert_eq!(config.plot.title.as_deref(), Some("From file"));
    }

    #[test]
    fn test_threads_in_file_imply_parallel() {
        let config = AnalysisConfig::from_json(r#"{"input_path": "a.nc", "threads": 3}"#).unwrap();
        assert!(!config.parallel);
        assert!(config.runs_parallel());
        assert!(config.reduce_config().parallel);
        assert_eq!(config.parallel_config(), Some(ParallelConfig::new(Some(3))));

        let mut from_flags = with_input();
        from_flags.apply_overrides(&Args::try_parse_from(["spatialstats", "-t", "3"]).unwrap());
        assert_eq!(from_flags.reduce_config(), config.reduce_config());
        assert_eq!(from_flags.parallel_config(), config.parallel_config());
    }

    #[test]
    fn test_validate_requires_input() {
        let err = AnalysisConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("no input file"));
        assert!(with_input().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_conflicting_paths() {
        let config = AnalysisConfig {
            output_path: PathBuf::from("in.nc"),
            ..with_input()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            plot_path: PathBuf::from("out.nc"),
            ..with_input()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_plot_extension_and_size() {
        let mut config = AnalysisConfig {
            plot_path: PathBuf::from("plot.svg"),
            ..with_input()
        };
        assert!(config.validate().is_err());
        config.plot.backend = PlotBackend::Svg;
        assert!(config.validate().is_ok());
        config.plot.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds() {
        let config = AnalysisConfig {
            lat_min: Some(f64::NAN),
            ..with_input()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            selection: SelectionMode::Index,
            lon_max: Some(2.5),
            ..with_input()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            selection: SelectionMode::Index,
            time_start: Some(TimeBound::Date("2000-01-01".to_string())),
            ..with_input()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            threads: Some(0),
            ..with_input()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reduce_config_follows_options() {
        let config = AnalysisConfig {
            variance: VarianceKind::Sample,
            fill_value: Some(-999.0),
            ..with_input()
        };
        let reduce = config.reduce_config();
        assert_eq!(reduce.variance, VarianceKind::Sample);
        assert_eq!(reduce.fill_value, Some(-999.0));
        assert!(!reduce.parallel);
        assert!(config.parallel_config().is_none());
    }
}

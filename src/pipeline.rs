//! End-to-end analysis run
//!
//! Open the dataset, resolve the requested subset on each axis, reduce it,
//! then write the series file and the plot. Both outputs are staged and only
//! moved into place once both have been produced.

use crate::config::AnalysisConfig;
use crate::dataset::{DataVariable, Dataset};
use crate::errors::{Result, SpatialStatsError};
use crate::netcdf_io::{stage_series, SeriesMetadata};
use crate::plot::stage_plot;
use crate::selection::{select_indices, select_optional, CoordinateAxis, IndexRange, SelectionMode};
use crate::statistics::{reduce, ReductionResult};
use crate::time::TimeBound;
use std::path::PathBuf;

/// Resolved subset of one axis
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSelection {
    pub range: IndexRange,
    /// Coordinate values at the first and last retained index
    pub first: f64,
    pub last: f64,
}

impl AxisSelection {
    fn new(axis: &CoordinateAxis, range: IndexRange) -> Self {
        let values = axis.values();
        Self {
            range,
            first: values[range.start],
            last: values[range.end],
        }
    }
}

/// What a run produced
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub variable: String,
    pub time: AxisSelection,
    pub lat: AxisSelection,
    pub lon: AxisSelection,
    /// Retained time coordinates, aligned with `result`
    pub time_axis: CoordinateAxis,
    pub result: ReductionResult,
    pub output_path: PathBuf,
    pub plot_path: PathBuf,
}

impl AnalysisSummary {
    #[must_use]
    pub fn steps(&self) -> usize {
        self.result.len()
    }
}

/// Coordinate axes matching a variable's three dimensions
#[derive(Debug, Clone)]
pub struct GridAxes {
    pub time: CoordinateAxis,
    pub lat: CoordinateAxis,
    pub lon: CoordinateAxis,
}

/// Run the whole analysis described by `config`
///
/// # Errors
///
/// Any error from validation, reading, selection, reduction or output, see
/// [`SpatialStatsError`]. Nothing is written unless both outputs succeed.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisSummary> {
    config.validate()?;
    let input = config.input()?;

    let dataset = Dataset::open(input)?;
    let variable = dataset.read_variable(&config.variable_name)?;
    let axes = load_axes(&dataset, &variable, config)?;
    dataset.close()?;

    let (time, lat, lon) = select_ranges(&axes, config)?;
    let result = reduce(
        &variable,
        time.range,
        lat.range,
        lon.range,
        &config.reduce_config(),
    )?;
    let time_axis = axes.time.subset(time.range)?;

    let metadata = SeriesMetadata {
        variable: variable.name.clone(),
        units: variable.units.clone(),
        long_name: variable.long_name.clone(),
        source: Some(input.to_path_buf()),
        selection: Some(describe_selection(&axes, &time, &lat, &lon)),
    };
    let mut plot_options = config.plot.clone();
    if plot_options.title.is_none() {
        let label = variable.long_name.as_deref().unwrap_or(&variable.name);
        plot_options.title = Some(format!("Spatial Mean and Variance of {label}"));
    }

    let series = stage_series(&config.output_path, &time_axis, &result, &metadata)?;
    let plot = stage_plot(&config.plot_path, &time_axis, &result, &plot_options)?;
    let output_path = series.commit()?;
    let plot_path = match plot.commit() {
        Ok(path) => path,
        Err(e) => {
            // A failed run leaves no partial output
            if let Err(remove) = std::fs::remove_file(&output_path) {
                log::warn!("Could not remove '{}': {remove}", output_path.display());
            }
            return Err(e);
        }
    };

    Ok(AnalysisSummary {
        variable: variable.name,
        time,
        lat,
        lon,
        time_axis,
        result,
        output_path,
        plot_path,
    })
}

/// Read the coordinate axes of `variable`, honoring the configured coordinate names
///
/// # Errors
///
/// - [`SpatialStatsError::CoordinateNotFound`] if a configured coordinate is absent
/// - [`SpatialStatsError::InvalidAxis`] if an axis does not match the variable's shape
pub fn load_axes(
    dataset: &Dataset,
    variable: &DataVariable,
    config: &AnalysisConfig,
) -> Result<GridAxes> {
    let (nt, ny, nx) = variable.shape();
    let [time_dim, lat_dim, lon_dim] = &variable.dimensions;

    let load = |dim: &str, name_override: Option<&String>, len: usize| -> Result<CoordinateAxis> {
        let axis = match name_override {
            Some(name) => dataset.read_axis(name)?,
            None => dataset.axis_for_dimension(dim)?,
        };
        if axis.len() != len {
            return Err(SpatialStatsError::InvalidAxis {
                name: axis.name().to_string(),
                message: format!(
                    "has {} values but dimension '{dim}' of '{}' has {len}",
                    axis.len(),
                    variable.name
                ),
            });
        }
        Ok(axis)
    };

    Ok(GridAxes {
        time: load(time_dim.as_str(), config.time_dimension.as_ref(), nt)?,
        lat: load(lat_dim.as_str(), config.lat_dimension.as_ref(), ny)?,
        lon: load(lon_dim.as_str(), config.lon_dimension.as_ref(), nx)?,
    })
}

/// Turn the configured bounds into index ranges on each axis
///
/// # Errors
///
/// - [`SpatialStatsError::OutOfRange`] / [`SpatialStatsError::IndexOutOfBounds`] for empty selections
/// - [`SpatialStatsError::Configuration`] for unusable time bounds
pub fn select_ranges(
    axes: &GridAxes,
    config: &AnalysisConfig,
) -> Result<(AxisSelection, AxisSelection, AxisSelection)> {
    let (time, lat, lon) = match config.selection {
        SelectionMode::Coordinate => {
            let units = axes.time.units();
            let calendar = axes.time.calendar();
            let resolve = |bound: &Option<TimeBound>| {
                bound
                    .as_ref()
                    .map(|b| b.resolve(units, calendar))
                    .transpose()
            };
            (
                select_optional(&axes.time, resolve(&config.time_start)?, resolve(&config.time_end)?)?,
                select_optional(&axes.lat, config.lat_min, config.lat_max)?,
                select_optional(&axes.lon, config.lon_min, config.lon_max)?,
            )
        }
        SelectionMode::Index => {
            let time_start = config.time_start.as_ref().map(TimeBound::as_index).transpose()?;
            let time_end = config.time_end.as_ref().map(TimeBound::as_index).transpose()?;
            (
                index_range(&axes.time, time_start, time_end)?,
                index_range(&axes.lat, as_index(config.lat_min), as_index(config.lat_max))?,
                index_range(&axes.lon, as_index(config.lon_min), as_index(config.lon_max))?,
            )
        }
    };

    Ok((
        AxisSelection::new(&axes.time, time),
        AxisSelection::new(&axes.lat, lat),
        AxisSelection::new(&axes.lon, lon),
    ))
}

fn index_range(axis: &CoordinateAxis, start: Option<usize>, end: Option<usize>) -> Result<IndexRange> {
    select_indices(
        axis.name(),
        axis.len(),
        start.unwrap_or(0),
        end.unwrap_or(axis.len()),
    )
}

/// Validated index-mode bound; `validate` has already rejected fractional and negative values
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_index(value: Option<f64>) -> Option<usize> {
    value.map(|v| v as usize)
}

fn describe_selection(
    axes: &GridAxes,
    time: &AxisSelection,
    lat: &AxisSelection,
    lon: &AxisSelection,
) -> String {
    [(&axes.time, time), (&axes.lat, lat), (&axes.lon, lon)]
        .iter()
        .map(|(axis, sel)| {
            format!(
                "{}[{}:{}] ({} to {})",
                axis.name(),
                sel.range.start,
                sel.range.end + 1,
                sel.first,
                sel.last
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

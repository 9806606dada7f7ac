//! NetCDF output of the reduced series
//!
//! The output file holds one `time` dimension, the retained time coordinates
//! and the two statistics as double-precision variables with a NaN
//! `_FillValue`. [`read_series`] reads such a file back.

use crate::errors::{Result, SpatialStatsError};
use crate::selection::CoordinateAxis;
use crate::staging::StagedOutput;
use crate::statistics::ReductionResult;
use chrono::Utc;
use ndarray::{Array1, ArrayView1};
use netcdf::{create, File};
use std::path::{Path, PathBuf};

pub const TIME_DIMENSION: &str = "time";
pub const TIME_VARIABLE: &str = "time";
pub const MEAN_VARIABLE: &str = "temporal_spatial_mean";
pub const VARIANCE_VARIABLE: &str = "temporal_spatial_variance";

/// Descriptive attributes carried into the output file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMetadata {
    /// Name of the reduced input variable
    pub variable: String,
    pub units: Option<String>,
    pub long_name: Option<String>,
    /// Input dataset path, stored in the global `source` attribute
    pub source: Option<PathBuf>,
    /// Human readable subset description, stored in `history`
    pub selection: Option<String>,
}

/// A series read back from an output file
#[derive(Debug, Clone)]
pub struct SeriesData {
    pub time: Array1<f64>,
    pub time_units: Option<String>,
    pub mean: Array1<f64>,
    pub variance: Array1<f64>,
    pub variance_convention: Option<String>,
}

/// Writer for the mean/variance series
pub struct SeriesWriter<'a> {
    time_axis: &'a CoordinateAxis,
    result: &'a ReductionResult,
    metadata: &'a SeriesMetadata,
}

impl<'a> SeriesWriter<'a> {
    /// Create a new series writer
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::InvalidAxis`] if the axis and result lengths differ.
    pub fn new(
        time_axis: &'a CoordinateAxis,
        result: &'a ReductionResult,
        metadata: &'a SeriesMetadata,
    ) -> Result<Self> {
        if time_axis.len() != result.len() {
            return Err(SpatialStatsError::InvalidAxis {
                name: time_axis.name().to_string(),
                message: format!(
                    "{} time values for {} reduced steps",
                    time_axis.len(),
                    result.len()
                ),
            });
        }
        Ok(Self {
            time_axis,
            result,
            metadata,
        })
    }

    /// Write the series to a new NetCDF file at `path`, replacing any existing file
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::OutputNetCDF`] if the file cannot be created or written.
    pub fn write(&self, path: &Path) -> Result<()> {
        self.write_into(path, path)
    }

    /// Write into `target`, reporting failures against `destination`
    fn write_into(&self, target: &Path, destination: &Path) -> Result<()> {
        self.define_and_put(target)
            .map_err(|source| SpatialStatsError::OutputNetCDF {
                path: destination.to_path_buf(),
                source,
            })?;
        log::debug!(
            "Wrote {} time steps to {}",
            self.result.len(),
            destination.display()
        );
        Ok(())
    }

    fn define_and_put(&self, path: &Path) -> std::result::Result<(), netcdf::Error> {
        let mut file = create(path)?;
        let n = self.result.len();
        file.add_dimension(TIME_DIMENSION, n)?;

        let mut time = file.add_variable::<f64>(TIME_VARIABLE, &[TIME_DIMENSION])?;
        if let Some(units) = self.time_axis.units() {
            time.put_attribute("units", units)?;
        }
        if let Some(calendar) = self.time_axis.calendar() {
            time.put_attribute("calendar", calendar)?;
        }
        time.put_attribute("axis", "T")?;
        time.put(ArrayView1::from(self.time_axis.values()), ..)?;

        let variable = &self.metadata.variable;
        let long_name = self
            .metadata
            .long_name
            .as_deref()
            .unwrap_or(variable.as_str());

        let mean = self.result.means();
        put_statistic(
            &mut file,
            MEAN_VARIABLE,
            &mean,
            &format!("Spatial mean of {long_name}"),
            self.metadata.units.clone(),
        )?;

        // Variance carries the square of the input units
        let variance_units = self.metadata.units.as_ref().map(|u| format!("({u})^2"));
        let variance = self.result.variances();
        put_statistic(
            &mut file,
            VARIANCE_VARIABLE,
            &variance,
            &format!("Spatial variance of {long_name}"),
            variance_units,
        )?;

        let mut history = format!(
            "Created by spatialstats {} on {}: spatial mean and variance of '{variable}'",
            env!("CARGO_PKG_VERSION"),
            Utc::now().to_rfc3339()
        );
        if let Some(selection) = &self.metadata.selection {
            history.push_str(&format!(" over {selection}"));
        }
        file.add_attribute("history", history)?;
        if let Some(source) = &self.metadata.source {
            file.add_attribute("source", source.display().to_string())?;
        }
        file.add_attribute("variance_convention", self.result.variance.as_str())?;

        file.close()
    }
}

fn put_statistic(
    file: &mut netcdf::FileMut,
    name: &str,
    values: &Array1<f64>,
    long_name: &str,
    units: Option<String>,
) -> std::result::Result<(), netcdf::Error> {
    let mut var = file.add_variable::<f64>(name, &[TIME_DIMENSION])?;
    var.put_attribute("_FillValue", f64::NAN)?;
    var.put_attribute("long_name", long_name)?;
    if let Some(units) = units {
        var.put_attribute("units", units)?;
    }
    var.put(values.view(), ..)?;
    Ok(())
}

/// Write the series to `path` directly.
///
/// # Errors
///
/// See [`SeriesWriter::write`].
pub fn write_series(
    path: &Path,
    time_axis: &CoordinateAxis,
    result: &ReductionResult,
    metadata: &SeriesMetadata,
) -> Result<()> {
    SeriesWriter::new(time_axis, result, metadata)?.write(path)
}

/// Write the series into a temporary file beside `path`, to be committed later.
///
/// # Errors
///
/// Returns [`SpatialStatsError::OutputWrite`] if the destination directory
/// cannot hold the staged file, or [`SpatialStatsError::OutputNetCDF`] if
/// writing into it fails.
pub fn stage_series(
    path: &Path,
    time_axis: &CoordinateAxis,
    result: &ReductionResult,
    metadata: &SeriesMetadata,
) -> Result<StagedOutput> {
    let writer = SeriesWriter::new(time_axis, result, metadata)?;
    let staged = StagedOutput::create(path)?;
    writer.write_into(staged.temp_path(), path)?;
    Ok(staged)
}

/// Read a series file written by [`write_series`]
///
/// # Errors
///
/// - [`SpatialStatsError::InputNotFound`] / [`SpatialStatsError::FileFormat`] if the file cannot be opened
/// - [`SpatialStatsError::VariableNotFound`] if one of the three variables is missing
pub fn read_series(path: &Path) -> Result<SeriesData> {
    if !path.exists() {
        return Err(SpatialStatsError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = netcdf::open(path).map_err(|source| SpatialStatsError::FileFormat {
        path: path.to_path_buf(),
        source,
    })?;

    let time = read_1d(&file, TIME_VARIABLE)?;
    let mean = read_1d(&file, MEAN_VARIABLE)?;
    let variance = read_1d(&file, VARIANCE_VARIABLE)?;
    let time_units = file
        .variable(TIME_VARIABLE)
        .and_then(|v| string_value(v.attribute("units")?.value().ok()?));
    let variance_convention = file
        .attribute("variance_convention")
        .and_then(|a| string_value(a.value().ok()?));

    Ok(SeriesData {
        time,
        time_units,
        mean,
        variance,
        variance_convention,
    })
}

fn read_1d(file: &File, name: &str) -> Result<Array1<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| SpatialStatsError::VariableNotFound {
            var: name.to_string(),
        })?;
    Ok(Array1::from(var.get_values::<f64, _>(..)?))
}

fn string_value(value: netcdf::AttributeValue) -> Option<String> {
    match value {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{SpatialMoments, VarianceKind};
    use tempfile::tempdir;

    fn series() -> (CoordinateAxis, ReductionResult) {
        let axis = CoordinateAxis::new("time", vec![0.0, 6.0, 12.0])
            .unwrap()
            .with_units(Some("hours since 2000-01-01 00:00:00".to_string()))
            .with_calendar(Some("gregorian".to_string()));
        let result = ReductionResult {
            moments: vec![
                SpatialMoments {
                    mean: 271.5,
                    variance: 4.0,
                    valid_count: 4,
                },
                SpatialMoments::no_data(),
                SpatialMoments {
                    mean: 273.25,
                    variance: 0.5,
                    valid_count: 3,
                },
            ],
            variance: VarianceKind::Sample,
        };
        (axis, result)
    }

    #[test]
    fn test_write_then_read_preserves_series() {
        let (axis, result) = series();
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.nc");
        let metadata = SeriesMetadata {
            variable: "t2m".to_string(),
            units: Some("K".to_string()),
            ..SeriesMetadata::default()
        };

        write_series(&path, &axis, &result, &metadata).unwrap();
        let data = read_series(&path).unwrap();

        assert_eq!(data.time.to_vec(), vec![0.0, 6.0, 12.0]);
        assert_eq!(data.mean[0], 271.5);
        assert!(data.mean[1].is_nan());
        assert!(data.variance[1].is_nan());
        assert_eq!(data.variance[2], 0.5);
        assert_eq!(
            data.time_units.as_deref(),
            Some("hours since 2000-01-01 00:00:00")
        );
        assert_eq!(data.variance_convention.as_deref(), Some("sample"));
    }

    #[test]
    fn test_attributes_are_written() {
        let (axis, result) = series();
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.nc");
        let metadata = SeriesMetadata {
            variable: "t2m".to_string(),
            units: Some("K".to_string()),
            long_name: Some("2 metre temperature".to_string()),
            source: Some(PathBuf::from("era.nc")),
            selection: Some("lat [30, 60]".to_string()),
        };
        write_series(&path, &axis, &result, &metadata).unwrap();

        let file = netcdf::open(&path).unwrap();
        let var = file.variable(MEAN_VARIABLE).unwrap();
        assert_eq!(
            string_value(var.attribute("long_name").unwrap().value().unwrap()).as_deref(),
            Some("Spatial mean of 2 metre temperature")
        );
        let var = file.variable(VARIANCE_VARIABLE).unwrap();
        assert_eq!(
            string_value(var.attribute("units").unwrap().value().unwrap()).as_deref(),
            Some("(K)^2")
        );
        assert_eq!(
            string_value(file.attribute("source").unwrap().value().unwrap()).as_deref(),
            Some("era.nc")
        );
        let history = string_value(file.attribute("history").unwrap().value().unwrap()).unwrap();
        assert!(history.contains("'t2m'"));
        assert!(history.contains("lat [30, 60]"));
    }

    #[test]
    fn test_stage_then_commit() {
        let (axis, result) = series();
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.nc");
        let metadata = SeriesMetadata {
            variable: "t2m".to_string(),
            ..SeriesMetadata::default()
        };

        let staged = stage_series(&path, &axis, &result, &metadata).unwrap();
        assert!(!path.exists());
        staged.commit().unwrap();
        assert_eq!(read_series(&path).unwrap().mean.len(), 3);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let (_, result) = series();
        let axis = CoordinateAxis::new("time", vec![0.0]).unwrap();
        let dir = tempdir().unwrap();
        let err = write_series(
            &dir.path().join("x.nc"),
            &axis,
            &result,
            &SeriesMetadata::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SpatialStatsError::InvalidAxis { .. }));
    }

    #[test]
    fn test_unwritable_path_is_an_output_error() {
        let (axis, result) = series();
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.nc");

        let err = write_series(&path, &axis, &result, &SeriesMetadata::default()).unwrap_err();
        match &err {
            SpatialStatsError::OutputNetCDF { path: reported, .. } => assert_eq!(reported, &path),
            other => panic!("Expected OutputNetCDF, got {other:?}"),
        }
        assert_eq!(err.kind(), crate::errors::ErrorKind::Io);
        assert_eq!(err.exit_code(), 5);
    }
}

//! Read access to gridded NetCDF datasets
//!
//! [`Dataset`] owns the open file for the duration of a run. Coordinate axes and
//! data variables are read into memory as f64, with CF packing
//! (`scale_factor`/`add_offset`) applied on load.

use crate::errors::{Result, SpatialStatsError};
use crate::metadata::{DatasetSummary, DimensionInfo, VariableInfo};
use crate::selection::CoordinateAxis;
use ndarray::{Array3, Ix3};
use netcdf::{AttributeValue, File, Variable};
use std::path::{Path, PathBuf};

/// A 3-D `(time, lat, lon)` variable loaded into memory
#[derive(Debug, Clone)]
pub struct DataVariable {
    pub name: String,
    /// Dimension names in storage order
    pub dimensions: [String; 3],
    pub data: Array3<f64>,
    /// `_FillValue`, in unpacked units
    pub fill_value: Option<f64>,
    /// `missing_value`, in unpacked units
    pub missing_value: Option<f64>,
    pub units: Option<String>,
    pub long_name: Option<String>,
}

impl DataVariable {
    /// Shape as `(time, lat, lon)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Every sentinel the file declares for this variable
    #[must_use]
    pub fn sentinels(&self) -> Vec<f64> {
        self.fill_value
            .into_iter()
            .chain(self.missing_value)
            .filter(|v| !v.is_nan())
            .collect()
    }
}

/// An open NetCDF dataset. Closed by [`Dataset::close`] or on drop.
pub struct Dataset {
    path: PathBuf,
    file: File,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset").field("path", &self.path).finish()
    }
}

impl Dataset {
    /// Open a dataset for reading
    ///
    /// # Errors
    ///
    /// - [`SpatialStatsError::InputNotFound`] if `path` does not exist
    /// - [`SpatialStatsError::FileFormat`] if it is not a readable NetCDF container
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SpatialStatsError::InputNotFound { path });
        }

        let file = netcdf::open(&path).map_err(|source| SpatialStatsError::FileFormat {
            path: path.clone(),
            source,
        })?;
        log::info!("Opened NetCDF dataset {}", path.display());

        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a 1-D coordinate variable
    ///
    /// # Errors
    ///
    /// - [`SpatialStatsError::CoordinateNotFound`] if no such variable exists
    /// - [`SpatialStatsError::InvalidAxis`] if it is not 1-D, or its values are not monotonic
    pub fn read_axis(&self, name: &str) -> Result<CoordinateAxis> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| SpatialStatsError::CoordinateNotFound {
                name: name.to_string(),
            })?;

        if var.dimensions().len() != 1 {
            return Err(SpatialStatsError::InvalidAxis {
                name: name.to_string(),
                message: format!("expected 1 dimension, found {}", var.dimensions().len()),
            });
        }

        let raw = var.get_values::<f64, _>(..)?;
        let packing = Packing::of(&var);
        let values = raw.into_iter().map(|v| packing.apply(v)).collect();

        Ok(CoordinateAxis::new(name, values)?
            .with_units(string_attribute(&var, "units"))
            .with_calendar(string_attribute(&var, "calendar")))
    }

    /// Coordinate axis for a dimension: the variable of the same name, or plain indices
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::InvalidAxis`] if a coordinate variable exists but is
    /// unusable, or if the dimension has no records.
    pub fn axis_for_dimension(&self, dim_name: &str) -> Result<CoordinateAxis> {
        match self.read_axis(dim_name) {
            Err(SpatialStatsError::CoordinateNotFound { .. }) => {
                let len = self
                    .file
                    .dimension(dim_name)
                    .map(|d| d.len())
                    .ok_or_else(|| SpatialStatsError::CoordinateNotFound {
                        name: dim_name.to_string(),
                    })?;
                log::warn!(
                    "Dimension '{dim_name}' has no coordinate variable; using indices 0..{len}"
                );
                CoordinateAxis::from_indices(dim_name, len)
            }
            other => other,
        }
    }

    /// Read a 3-D data variable fully into memory as f64
    ///
    /// # Errors
    ///
    /// - [`SpatialStatsError::VariableNotFound`] if the variable is absent
    /// - [`SpatialStatsError::UnsupportedLayout`] if it is not 3-D or has an empty dimension
    pub fn read_variable(&self, name: &str) -> Result<DataVariable> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| SpatialStatsError::VariableNotFound {
                var: name.to_string(),
            })?;

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let dimensions: [String; 3] =
            dims.clone()
                .try_into()
                .map_err(|_| SpatialStatsError::UnsupportedLayout {
                    var: name.to_string(),
                    message: format!(
                        "expected 3 dimensions (time, lat, lon), found [{}]",
                        dims.join(", ")
                    ),
                })?;

        let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
        if shape.contains(&0) {
            return Err(SpatialStatsError::UnsupportedLayout {
                var: name.to_string(),
                message: format!("shape {shape:?} holds no values"),
            });
        }
        log::info!("Loading '{name}' with shape {shape:?}");

        let packing = Packing::of(&var);
        let data = var
            .get::<f64, _>(..)?
            .into_dimensionality::<Ix3>()?
            .mapv_into(|v| packing.apply(v));

        Ok(DataVariable {
            name: name.to_string(),
            dimensions,
            data,
            fill_value: numeric_attribute(&var, "_FillValue").map(|v| packing.apply(v)),
            missing_value: numeric_attribute(&var, "missing_value").map(|v| packing.apply(v)),
            units: string_attribute(&var, "units"),
            long_name: string_attribute(&var, "long_name"),
        })
    }

    /// Dimensions and variables of the file
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let dimensions = self
            .file
            .dimensions()
            .map(|d| DimensionInfo {
                name: d.name(),
                length: d.len(),
                is_unlimited: d.is_unlimited(),
            })
            .collect();
        let variables = self
            .file
            .variables()
            .map(|v| VariableInfo {
                name: v.name(),
                dimensions: v.dimensions().iter().map(|d| d.name()).collect(),
                shape: v.dimensions().iter().map(netcdf::Dimension::len).collect(),
                units: string_attribute(&v, "units"),
            })
            .collect();

        DatasetSummary {
            path: self.path.clone(),
            dimensions,
            variables,
        }
    }

    /// Close the underlying file
    ///
    /// # Errors
    ///
    /// Returns the NetCDF error raised while closing.
    pub fn close(self) -> Result<()> {
        log::debug!("Closing {}", self.path.display());
        self.file.close()?;
        Ok(())
    }
}

/// CF packing parameters of a variable
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    scale_factor: f64,
    add_offset: f64,
}

impl Packing {
    fn of(var: &Variable<'_>) -> Self {
        Self {
            scale_factor: numeric_attribute(var, "scale_factor").unwrap_or(1.0),
            add_offset: numeric_attribute(var, "add_offset").unwrap_or(0.0),
        }
    }

    #[inline]
    fn apply(self, raw: f64) -> f64 {
        if self.scale_factor == 1.0 && self.add_offset == 0.0 {
            raw
        } else {
            raw * self.scale_factor + self.add_offset
        }
    }
}

/// First value of a numeric attribute, widened to f64
fn numeric_attribute(var: &Variable<'_>, name: &str) -> Option<f64> {
    let value = var.attribute(name)?.value().ok()?;
    match value {
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        #[allow(clippy::cast_precision_loss)]
        AttributeValue::Longlong(v) => Some(v as f64),
        #[allow(clippy::cast_precision_loss)]
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Shorts(v) => v.first().copied().map(f64::from),
        AttributeValue::Ints(v) => v.first().copied().map(f64::from),
        AttributeValue::Floats(v) => v.first().copied().map(f64::from),
        AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    }
}

fn string_attribute(var: &Variable<'_>, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

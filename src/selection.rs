//! Coordinate axes and subset selection
//!
//! Turns user-facing bounds (coordinate values, or raw indices in index mode)
//! into inclusive [`IndexRange`]s over a [`CoordinateAxis`].

use crate::errors::{Result, SpatialStatsError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Ordered, strictly monotonic coordinate values labelling one dimension
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateAxis {
    name: String,
    values: Vec<f64>,
    units: Option<String>,
    calendar: Option<String>,
}

impl CoordinateAxis {
    /// Create an axis, rejecting empty, non-finite or non-monotonic values.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::InvalidAxis`] when the values cannot be searched.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(SpatialStatsError::InvalidAxis {
                name,
                message: "axis has no values".to_string(),
            });
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(SpatialStatsError::InvalidAxis {
                name,
                message: format!("non-finite value at index {pos}"),
            });
        }
        let ascending = values.windows(2).all(|w| w[0] < w[1]);
        let descending = values.windows(2).all(|w| w[0] > w[1]);
        if !ascending && !descending {
            return Err(SpatialStatsError::InvalidAxis {
                name,
                message: "values are not strictly monotonic".to_string(),
            });
        }

        Ok(Self {
            name,
            values,
            units: None,
            calendar: None,
        })
    }

    /// Axis labelled by its own indices `0..len`, for dimensions without a coordinate variable
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::InvalidAxis`] when `len` is zero.
    pub fn from_indices(name: impl Into<String>, len: usize) -> Result<Self> {
        #[allow(clippy::cast_precision_loss)]
        let values = (0..len).map(|i| i as f64).collect();
        Self::new(name, values)
    }

    #[must_use]
    pub fn with_units(mut self, units: Option<String>) -> Self {
        self.units = units;
        self
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar: Option<String>) -> Self {
        self.calendar = calendar;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    #[must_use]
    pub fn calendar(&self) -> Option<&str> {
        self.calendar.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when values increase with index (a single value counts as ascending)
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.values.len() < 2 || self.values[0] < self.values[1]
    }

    /// Sub-axis covering `range`, keeping name and metadata
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::IndexOutOfBounds`] if the range does not fit.
    pub fn subset(&self, range: IndexRange) -> Result<Self> {
        range.check_within(&self.name, self.len())?;
        Ok(Self {
            name: self.name.clone(),
            values: self.values[range.as_range()].to_vec(),
            units: self.units.clone(),
            calendar: self.calendar.clone(),
        })
    }
}

/// Inclusive pair of offsets into an axis; `start <= end` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    /// Inclusive range `start..=end`. Returns `None` when `start > end`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Option<Self> {
        if start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Range covering a whole axis of `len` elements (`len` must be non-zero)
    #[must_use]
    pub const fn full(len: usize) -> Option<Self> {
        if len == 0 {
            None
        } else {
            Some(Self {
                start: 0,
                end: len - 1,
            })
        }
    }

    /// Number of indices covered
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Half-open equivalent, for slicing
    #[must_use]
    pub const fn as_range(&self) -> Range<usize> {
        self.start..self.end + 1
    }

    /// Check the range against an axis of length `len`
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::IndexOutOfBounds`] when `end >= len`.
    pub fn check_within(&self, axis: &str, len: usize) -> Result<()> {
        if self.start > self.end || self.end >= len {
            return Err(SpatialStatsError::IndexOutOfBounds {
                axis: axis.to_string(),
                start: self.start,
                end: self.end + 1,
                len,
            });
        }
        Ok(())
    }
}

/// How bounding values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Bounds are coordinate values, resolved by search over the axis
    #[default]
    Coordinate,
    /// Bounds are half-open `[start, end)` integer offsets
    Index,
}

/// Smallest contiguous index range whose coordinates lie in `[min(lower, upper), max(lower, upper)]`.
///
/// Endpoints exactly equal to a bound are included. Works on ascending and
/// descending axes alike, so reversed latitude grids need no special handling.
///
/// # Errors
///
/// - [`SpatialStatsError::Configuration`] if a bound is not finite
/// - [`SpatialStatsError::OutOfRange`] if no coordinate lies inside the bounds
pub fn select(axis: &CoordinateAxis, lower: f64, upper: f64) -> Result<IndexRange> {
    if !lower.is_finite() || !upper.is_finite() {
        return Err(SpatialStatsError::Configuration(format!(
            "bounds for '{}' must be finite, got [{lower}, {upper}]",
            axis.name()
        )));
    }
    let lo = lower.min(upper);
    let hi = lower.max(upper);
    let values = axis.values();

    let (start, end_exclusive) = if axis.is_ascending() {
        (
            values.partition_point(|&v| v < lo),
            values.partition_point(|&v| v <= hi),
        )
    } else {
        (
            values.partition_point(|&v| v > hi),
            values.partition_point(|&v| v >= lo),
        )
    };

    if start >= end_exclusive {
        return Err(SpatialStatsError::OutOfRange {
            axis: axis.name().to_string(),
            lower: lo,
            upper: hi,
        });
    }

    log::debug!(
        "Selected {}[{}..={}] for bounds [{lo}, {hi}]",
        axis.name(),
        start,
        end_exclusive - 1
    );

    Ok(IndexRange {
        start,
        end: end_exclusive - 1,
    })
}

/// Like [`select`] but either bound may be omitted, extending the range to that end of the axis.
///
/// # Errors
///
/// Same as [`select`], plus [`SpatialStatsError::InvalidAxis`] for an empty axis.
pub fn select_optional(
    axis: &CoordinateAxis,
    lower: Option<f64>,
    upper: Option<f64>,
) -> Result<IndexRange> {
    let (Some(&first), Some(&last)) = (axis.values().first(), axis.values().last()) else {
        return Err(SpatialStatsError::InvalidAxis {
            name: axis.name().to_string(),
            message: "axis has no values".to_string(),
        });
    };
    let (axis_min, axis_max) = if axis.is_ascending() {
        (first, last)
    } else {
        (last, first)
    };

    match (lower, upper) {
        (None, None) => Ok(IndexRange {
            start: 0,
            end: axis.len() - 1,
        }),
        (Some(lo), None) => select(axis, lo, axis_max.max(lo)),
        (None, Some(hi)) => select(axis, axis_min.min(hi), hi),
        (Some(lo), Some(hi)) => select(axis, lo, hi),
    }
}

/// Index-mode selection over the half-open slice `[start, end)`.
///
/// # Errors
///
/// Returns [`SpatialStatsError::IndexOutOfBounds`] if the slice is empty or exceeds `axis_len`.
pub fn select_indices(axis: &str, axis_len: usize, start: usize, end: usize) -> Result<IndexRange> {
    if start >= end || end > axis_len {
        return Err(SpatialStatsError::IndexOutOfBounds {
            axis: axis.to_string(),
            start,
            end,
            len: axis_len,
        });
    }
    Ok(IndexRange {
        start,
        end: end - 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(values: &[f64]) -> CoordinateAxis {
        CoordinateAxis::new("test", values.to_vec()).unwrap()
    }

    #[test]
    fn test_select_ascending_interior() {
        let a = axis(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(select(&a, 2.5, 6.5).unwrap(), IndexRange { start: 3, end: 6 });
    }

    #[test]
    fn test_select_descending_latitude() {
        let lat = axis(&[90.0, 45.0, 0.0, -45.0, -90.0]);
        let expected = IndexRange { start: 1, end: 3 };
        assert_eq!(select(&lat, -50.0, 50.0).unwrap(), expected);
        assert_eq!(select(&lat, 50.0, -50.0).unwrap(), expected);
    }

    #[test]
    fn test_select_includes_exact_endpoints() {
        let a = axis(&[0.0, 10.0, 20.0, 30.0]);
        assert_eq!(select(&a, 10.0, 20.0).unwrap(), IndexRange { start: 1, end: 2 });
        assert_eq!(select(&a, 30.0, 30.0).unwrap(), IndexRange { start: 3, end: 3 });
    }

    #[test]
    fn test_select_bound_order_invariance_and_coverage() {
        let ascending = axis(&[-3.0, -1.5, 0.0, 0.5, 2.0, 4.5, 7.0]);
        let descending = axis(&[7.0, 4.5, 2.0, 0.5, 0.0, -1.5, -3.0]);
        let bounds = [(-2.0, 1.0), (0.0, 0.0), (-10.0, 10.0), (0.25, 4.5), (6.9, 7.0)];

        for a in [&ascending, &descending] {
            for &(lo, hi) in &bounds {
                let forward = select(a, lo, hi).unwrap();
                let reversed = select(a, hi, lo).unwrap();
                assert_eq!(forward, reversed);

                // The range covers exactly the values inside the bounds
                for (i, &v) in a.values().iter().enumerate() {
                    let inside = lo <= v && v <= hi;
                    let covered = forward.as_range().contains(&i);
                    assert_eq!(inside, covered, "value {v} at {i} for [{lo}, {hi}]");
                }
            }
        }
    }

    #[test]
    fn test_select_empty_is_out_of_range() {
        let a = axis(&[0.0, 1.0, 2.0]);
        for (lo, hi) in [(0.2, 0.8), (5.0, 6.0), (-2.0, -1.0)] {
            match select(&a, lo, hi) {
                Err(SpatialStatsError::OutOfRange { axis, .. }) => assert_eq!(axis, "test"),
                other => panic!("Expected OutOfRange, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_select_rejects_non_finite_bounds() {
        let a = axis(&[0.0, 1.0]);
        assert!(matches!(
            select(&a, f64::NAN, 1.0),
            Err(SpatialStatsError::Configuration(_))
        ));
    }

    #[test]
    fn test_select_optional_open_ends() {
        let lat = axis(&[90.0, 45.0, 0.0, -45.0, -90.0]);
        assert_eq!(
            select_optional(&lat, None, None).unwrap(),
            IndexRange { start: 0, end: 4 }
        );
        assert_eq!(
            select_optional(&lat, Some(0.0), None).unwrap(),
            IndexRange { start: 0, end: 2 }
        );
        assert_eq!(
            select_optional(&lat, None, Some(0.0)).unwrap(),
            IndexRange { start: 2, end: 4 }
        );
    }

    #[test]
    fn test_select_optional_empty_axis_is_an_error() {
        let empty = CoordinateAxis {
            name: "time".to_string(),
            values: Vec::new(),
            units: None,
            calendar: None,
        };
        for (lo, hi) in [(None, None), (Some(1.0), None), (None, Some(1.0))] {
            assert!(matches!(
                select_optional(&empty, lo, hi),
                Err(SpatialStatsError::InvalidAxis { .. })
            ));
        }
    }

    #[test]
    fn test_select_indices_half_open() {
        assert_eq!(
            select_indices("time", 10, 0, 10).unwrap(),
            IndexRange { start: 0, end: 9 }
        );
        assert_eq!(
            select_indices("lat", 73, 5, 50).unwrap(),
            IndexRange { start: 5, end: 49 }
        );
        assert!(select_indices("time", 10, 4, 4).is_err());
        assert!(select_indices("time", 10, 2, 11).is_err());
    }

    #[test]
    fn test_axis_validation() {
        assert!(CoordinateAxis::new("empty", vec![]).is_err());
        assert!(CoordinateAxis::new("flat", vec![1.0, 1.0]).is_err());
        assert!(CoordinateAxis::new("zigzag", vec![0.0, 2.0, 1.0]).is_err());
        assert!(CoordinateAxis::new("nan", vec![0.0, f64::NAN]).is_err());
        assert!(CoordinateAxis::new("single", vec![3.0]).is_ok());
    }

    #[test]
    fn test_index_axis_rejects_zero_length() {
        let time = CoordinateAxis::from_indices("time", 3).unwrap();
        assert_eq!(time.values(), &[0.0, 1.0, 2.0]);
        assert!(matches!(
            CoordinateAxis::from_indices("time", 0),
            Err(SpatialStatsError::InvalidAxis { .. })
        ));
    }

    #[test]
    fn test_axis_subset_keeps_metadata() {
        let time = axis(&[0.0, 30.0, 60.0, 90.0])
            .with_units(Some("days since 2000-01-01".to_string()))
            .with_calendar(Some("standard".to_string()));
        let sub = time.subset(IndexRange { start: 1, end: 2 }).unwrap();
        assert_eq!(sub.values(), &[30.0, 60.0]);
        assert_eq!(sub.units(), Some("days since 2000-01-01"));
        assert_eq!(sub.calendar(), Some("standard"));
        assert!(time.subset(IndexRange { start: 2, end: 4 }).is_err());
    }
}

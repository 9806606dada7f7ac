//! Core statistical types and traits
//!
//! This module defines the reduction configuration, the per-time-step moments
//! and the [`SpatialReduction`] trait implemented for 2-D spatial slices.

use clap::ValueEnum;
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Divisor used for the variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VarianceKind {
    /// Divide by N
    #[default]
    Population,
    /// Divide by N - 1
    Sample,
}

impl VarianceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Sample => "sample",
        }
    }
}

/// How missing elements are recognised inside a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDetection {
    /// NaN, or equal to one of the variable's sentinels (`_FillValue`, `missing_value`)
    #[default]
    FillValue,
    /// Any NaN or infinite element; sentinels are ignored
    NonFinite,
}

/// Explicit reducer settings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReduceConfig {
    pub variance: VarianceKind,
    pub missing: MissingDetection,
    /// Replaces the variable's own sentinels when set
    pub fill_value: Option<f64>,
    /// Reduce time steps on the rayon pool
    pub parallel: bool,
}

/// Predicate deciding whether an element is missing
#[derive(Debug, Clone, PartialEq)]
pub struct MissingMask {
    detection: MissingDetection,
    sentinels: Vec<f64>,
}

impl MissingMask {
    #[must_use]
    pub fn new(detection: MissingDetection, sentinels: Vec<f64>) -> Self {
        Self {
            detection,
            sentinels,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_missing(&self, value: f64) -> bool {
        match self.detection {
            MissingDetection::FillValue => {
                value.is_nan() || self.sentinels.iter().any(|&s| s == value)
            }
            MissingDetection::NonFinite => !value.is_finite(),
        }
    }
}

/// Mean and variance of one spatial slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMoments {
    pub mean: f64,
    pub variance: f64,
    /// Number of non-missing elements that contributed
    pub valid_count: usize,
}

impl SpatialMoments {
    /// The "no data" result: NaN mean and variance
    #[must_use]
    pub const fn no_data() -> Self {
        Self {
            mean: f64::NAN,
            variance: f64::NAN,
            valid_count: 0,
        }
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.valid_count > 0
    }
}

/// Trait for spatial slices that can be reduced to mean and variance
pub trait SpatialReduction {
    /// Two-pass mean and variance over all non-missing elements, accumulated in f64
    fn spatial_moments(&self, mask: &MissingMask, variance: VarianceKind) -> SpatialMoments;
}

impl SpatialReduction for ArrayView2<'_, f64> {
    fn spatial_moments(&self, mask: &MissingMask, variance: VarianceKind) -> SpatialMoments {
        let (count, sum) = self.fold((0_usize, 0.0_f64), |(n, s), &v| {
            if mask.is_missing(v) {
                (n, s)
            } else {
                (n + 1, s + v)
            }
        });
        if count == 0 {
            return SpatialMoments::no_data();
        }

        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        let mean = sum / n;
        let squared_deviations = self.fold(0.0_f64, |acc, &v| {
            if mask.is_missing(v) {
                acc
            } else {
                let d = v - mean;
                acc + d * d
            }
        });

        let variance = match variance {
            VarianceKind::Population => squared_deviations / n,
            VarianceKind::Sample if count > 1 => squared_deviations / (n - 1.0),
            VarianceKind::Sample => f64::NAN,
        };

        SpatialMoments {
            mean,
            variance,
            valid_count: count,
        }
    }
}

/// Per-time-step moments aligned with the retained time indices
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionResult {
    pub moments: Vec<SpatialMoments>,
    pub variance: VarianceKind,
}

impl ReductionResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.moments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    #[must_use]
    pub fn means(&self) -> Array1<f64> {
        self.moments.iter().map(|m| m.mean).collect()
    }

    #[must_use]
    pub fn variances(&self) -> Array1<f64> {
        self.moments.iter().map(|m| m.variance).collect()
    }

    /// Time steps whose whole slice was missing
    #[must_use]
    pub fn empty_steps(&self) -> usize {
        self.moments.iter().filter(|m| !m.has_data()).count()
    }
}

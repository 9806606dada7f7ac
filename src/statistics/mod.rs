//! Spatial mean and variance reductions
//!
//! This module collapses the spatial axes of a `(time, lat, lon)` subset into one
//! mean/variance pair per retained time step.
//!
//! # Organization
//!
//! - [`operations`]: Reduction settings, moments and the [`SpatialReduction`] trait
//! - [`parallel`]: Serial and rayon-backed per-time-step drivers
//! - [`reducer`]: The variable-level [`reduce`] entry point

pub mod operations;
pub mod parallel;
pub mod reducer;

pub use operations::{
    MissingDetection, MissingMask, ReduceConfig, ReductionResult, SpatialMoments,
    SpatialReduction, VarianceKind,
};
pub use parallel::{parallel_moments_axis, serial_moments_axis};
pub use reducer::{reduce, reduce_array};

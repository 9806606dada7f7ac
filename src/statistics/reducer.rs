//! Variable-level reduction entry point

use super::operations::{MissingMask, ReduceConfig, ReductionResult};
use super::parallel::{parallel_moments_axis, serial_moments_axis};
use crate::dataset::DataVariable;
use crate::errors::Result;
use crate::selection::IndexRange;
use ndarray::{s, ArrayView3};

/// Mean and variance of `variable[t, lat_range, lon_range]` for every `t` in `time_range`.
///
/// Missing elements are skipped according to `config.missing`; sentinels come
/// from `config.fill_value` when set, otherwise from the variable's own
/// `_FillValue`/`missing_value`. A time step with no valid element reports NaN
/// for both statistics.
///
/// # Errors
///
/// Returns [`crate::SpatialStatsError::IndexOutOfBounds`] if a range does not fit the variable.
pub fn reduce(
    variable: &DataVariable,
    time_range: IndexRange,
    lat_range: IndexRange,
    lon_range: IndexRange,
    config: &ReduceConfig,
) -> Result<ReductionResult> {
    let (nt, ny, nx) = variable.shape();
    let [time_dim, lat_dim, lon_dim] = &variable.dimensions;
    time_range.check_within(time_dim, nt)?;
    lat_range.check_within(lat_dim, ny)?;
    lon_range.check_within(lon_dim, nx)?;

    let subset = variable.data.slice(s![
        time_range.as_range(),
        lat_range.as_range(),
        lon_range.as_range()
    ]);

    let sentinels = config
        .fill_value
        .map_or_else(|| variable.sentinels(), |fill| vec![fill]);

    log::info!(
        "Reducing '{}' over {} time steps x {} x {} points ({} variance)",
        variable.name,
        time_range.len(),
        lat_range.len(),
        lon_range.len(),
        config.variance.as_str()
    );

    let result = reduce_array(subset, &sentinels, config);
    let empty = result.empty_steps();
    if empty > 0 {
        log::warn!("{empty} time step(s) contain no valid data and are reported as NaN");
    }
    Ok(result)
}

/// Reduce an already-sliced `(time, lat, lon)` view
#[must_use]
pub fn reduce_array(
    subset: ArrayView3<'_, f64>,
    sentinels: &[f64],
    config: &ReduceConfig,
) -> ReductionResult {
    let mask = MissingMask::new(config.missing, sentinels.to_vec());
    let moments = if config.parallel {
        parallel_moments_axis(subset, &mask, config.variance)
    } else {
        serial_moments_axis(subset, &mask, config.variance)
    };

    ReductionResult {
        moments,
        variance: config.variance,
    }
}

//! Time-step reductions over a 3-D subset
//!
//! Each time step reads a disjoint spatial slab and fills its own output slot,
//! so the steps can be reduced serially or on the rayon pool with identical results.

use super::operations::{MissingMask, SpatialMoments, SpatialReduction, VarianceKind};
use ndarray::parallel::prelude::*;
use ndarray::{ArrayView3, Axis};

/// Reduces every time step of `subset` one after another
#[must_use]
pub fn serial_moments_axis(
    subset: ArrayView3<'_, f64>,
    mask: &MissingMask,
    variance: VarianceKind,
) -> Vec<SpatialMoments> {
    subset
        .axis_iter(Axis(0))
        .map(|slab| slab.spatial_moments(mask, variance))
        .collect()
}

/// Reduces the time steps of `subset` across the rayon pool, preserving order
#[must_use]
pub fn parallel_moments_axis(
    subset: ArrayView3<'_, f64>,
    mask: &MissingMask,
    variance: VarianceKind,
) -> Vec<SpatialMoments> {
    log::debug!(
        "Reducing {} time steps across {} threads",
        subset.len_of(Axis(0)),
        rayon::current_num_threads()
    );

    subset
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|slab| slab.spatial_moments(mask, variance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::operations::MissingDetection;
    use ndarray::Array3;

    #[test]
    fn test_parallel_matches_serial() {
        let data = Array3::from_shape_fn((16, 5, 7), |(t, y, x)| {
            let v = (t * 35 + y * 7 + x) as f64;
            if (t + x) % 11 == 0 {
                -1.0e20
            } else {
                280.0 + (v * 0.37).sin() * 12.0
            }
        });
        let mask = MissingMask::new(MissingDetection::FillValue, vec![-1.0e20]);

        let serial = serial_moments_axis(data.view(), &mask, VarianceKind::Population);
        let parallel = parallel_moments_axis(data.view(), &mask, VarianceKind::Population);
        assert_eq!(serial.len(), 16);
        assert_eq!(serial, parallel);
    }
}

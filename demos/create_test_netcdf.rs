//! Creates a sample ERA-style NetCDF file for trying out spatialstats.
//!
//! The file has a descending latitude axis, a daily time axis and a `t2m`
//! variable with a few fill values, so every selection path can be exercised:
//!
//! ```text
//! cargo run --example create_test_netcdf
//! spatialstats -i test_data.nc --lat-min 20 --lat-max 60 --time-start 2023-01-10
//! ```

use ndarray::{Array1, Array3};
use netcdf::create;
use std::path::Path;

const FILL: f32 = -32767.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = Path::new("test_data.nc");
    println!("Creating test NetCDF file: {}", output_path.display());

    if output_path.exists() {
        std::fs::remove_file(output_path)?;
    }
    let mut file = create(output_path)?;

    file.add_attribute("title", "Synthetic 2 metre temperature")?;
    file.add_attribute("created_by", "create_test_netcdf.rs")?;

    let (nt, ny, nx) = (60, 37, 72);
    file.add_dimension("time", nt)?;
    file.add_dimension("latitude", ny)?;
    file.add_dimension("longitude", nx)?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "hours since 2023-01-01 00:00:00")?;
        time_var.put_attribute("calendar", "gregorian")?;
        let hours = Array1::from_iter((0..nt).map(|i| i as f64 * 24.0));
        time_var.put(hours.view(), ..)?;
    }

    // North to south, as in ERA-Interim
    {
        let mut lat_var = file.add_variable::<f32>("latitude", &["latitude"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        let lats = Array1::from_iter((0..ny).map(|i| 90.0 - i as f32 * 5.0));
        lat_var.put(lats.view(), ..)?;
    }

    {
        let mut lon_var = file.add_variable::<f32>("longitude", &["longitude"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        let lons = Array1::from_iter((0..nx).map(|i| i as f32 * 5.0));
        lon_var.put(lons.view(), ..)?;
    }

    {
        let mut t2m = file.add_variable::<f32>("t2m", &["time", "latitude", "longitude"])?;
        t2m.put_attribute("_FillValue", FILL)?;
        t2m.put_attribute("units", "K")?;
        t2m.put_attribute("long_name", "2 metre temperature")?;

        let data = Array3::from_shape_fn((nt, ny, nx), |(t, y, x)| {
            // A patch of missing land points
            if (10..14).contains(&y) && (20..26).contains(&x) {
                return FILL;
            }
            let lat = (90.0 - y as f32 * 5.0).to_radians();
            let season = (t as f32 / 365.0 * std::f32::consts::TAU).cos();
            let zonal = (x as f32 * 5.0).to_radians().sin();
            273.15 + 30.0 * lat.cos() - 10.0 * season * lat.sin() + 2.0 * zonal
        });
        t2m.put(data.view(), ..)?;
    }

    println!("Wrote {nt} x {ny} x {nx} grid of 't2m'");
    Ok(())
}

//! Console reporting for the `spatialstats` binary

use crate::config::AnalysisConfig;
use crate::parallel::get_parallel_info;
use crate::pipeline::{AnalysisSummary, AxisSelection};
use crate::time::TimeUnits;

pub fn show_greeting() {
    println!(
        r#"
------------------------------------------------------------------
                        spatialstats {}
       spatial mean and variance of gridded NetCDF variables
------------------------------------------------------------------"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn bound<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "*".to_string(), ToString::to_string)
}

pub fn config_echo(config: &AnalysisConfig) {
    println!("\nConfiguration:");
    if let Some(input) = &config.input_path {
        println!("  Input NetCDF:  {}", input.display());
    }
    println!("  Variable:      {}", config.variable_name);
    println!("  Output NetCDF: {}", config.output_path.display());
    println!("  Plot:          {}", config.plot_path.display());
    println!(
        "  Time:          [{}, {}]",
        bound(config.time_start.as_ref()),
        bound(config.time_end.as_ref())
    );
    println!(
        "  Latitude:      [{}, {}]",
        bound(config.lat_min.as_ref()),
        bound(config.lat_max.as_ref())
    );
    println!(
        "  Longitude:     [{}, {}]",
        bound(config.lon_min.as_ref()),
        bound(config.lon_max.as_ref())
    );
    println!(
        "  Selection:     {:?}, {} variance, {:?} missing detection",
        config.selection,
        config.variance.as_str(),
        config.missing
    );
    if config.runs_parallel() {
        let info = get_parallel_info();
        println!(
            "  Parallel:      {} threads ({} cores available)",
            config.threads.unwrap_or(info.current_threads),
            info.available_cores
        );
    }
}

fn describe(name: &str, selection: &AxisSelection) {
    println!(
        "  {name:<10} indices {}..={} ({} values, {} to {})",
        selection.range.start,
        selection.range.end,
        selection.range.len(),
        selection.first,
        selection.last
    );
}

pub fn show_summary(summary: &AnalysisSummary) {
    println!("\nSelection:");
    describe("time", &summary.time);
    describe("latitude", &summary.lat);
    describe("longitude", &summary.lon);

    let units = summary
        .time_axis
        .units()
        .and_then(|u| TimeUnits::parse(u).ok());
    println!("\nSpatial statistics of '{}':", summary.variable);
    println!("  {:<22} {:>16} {:>16}", "time", "mean", "variance");
    for (t, m) in summary.time_axis.values().iter().zip(&summary.result.moments) {
        let label = units
            .and_then(|u| u.datetime_at(*t))
            .map_or_else(|| t.to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string());
        println!("  {label:<22} {:>16.6} {:>16.6}", m.mean, m.variance);
    }

    let empty = summary.result.empty_steps();
    if empty > 0 {
        println!("  ({empty} step(s) without valid data reported as NaN)");
    }
}

pub fn show_farewell(summary: &AnalysisSummary) {
    println!("\nSaved series to {}", summary.output_path.display());
    println!("Saved plot to {}", summary.plot_path.display());
    println!("\n=== {} time steps reduced successfully ===", summary.steps());
}

//! Static plots of the mean and variance series
//!
//! Rendering goes through `plotters` straight to a file, so no display server
//! is ever needed. The backend is chosen explicitly ([`PlotBackend`]) rather
//! than guessed from the environment.

use crate::errors::{Result, SpatialStatsError};
use crate::selection::CoordinateAxis;
use crate::staging::StagedOutput;
use crate::statistics::ReductionResult;
use crate::time::TimeUnits;
use clap::ValueEnum;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

const BITMAP_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

const MEAN_COLOR: RGBColor = RGBColor(31, 119, 180);
const VARIANCE_COLOR: RGBColor = RGBColor(214, 39, 40);

/// Image renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlotBackend {
    /// Raster image; PNG, JPEG or BMP chosen by file extension
    #[default]
    Bitmap,
    /// Vector image
    Svg,
}

impl PlotBackend {
    /// Check that `path` has an extension this backend can write
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] on a mismatch.
    pub fn check_extension(self, path: &Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let ok = match self {
            Self::Bitmap => BITMAP_EXTENSIONS.contains(&ext.as_str()),
            Self::Svg => ext == "svg",
        };
        if ok {
            Ok(())
        } else {
            let expected = match self {
                Self::Bitmap => BITMAP_EXTENSIONS.join(", "),
                Self::Svg => "svg".to_string(),
            };
            Err(SpatialStatsError::Configuration(format!(
                "plot file '{}' needs one of the extensions [{expected}] for the {self:?} backend",
                path.display()
            )))
        }
    }
}

/// Arrangement of the two series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlotLayout {
    /// Mean above, variance below, each with its own y axis
    #[default]
    Stacked,
    /// Mean line inside a band of one standard deviation
    ErrorBand,
    /// Both series on a single y axis
    Overlay,
}

/// Plot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    pub backend: PlotBackend,
    pub layout: PlotLayout,
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            backend: PlotBackend::Bitmap,
            layout: PlotLayout::Stacked,
            width: 1024,
            height: 768,
            title: None,
        }
    }
}

impl PlotOptions {
    /// Check sizes
    ///
    /// # Errors
    ///
    /// Returns [`SpatialStatsError::Configuration`] for a zero width or height.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SpatialStatsError::Configuration(format!(
                "plot size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Render the series straight to `path`.
///
/// # Errors
///
/// - [`SpatialStatsError::Configuration`] if the extension does not match the backend
/// - [`SpatialStatsError::PlotError`] if rendering fails
pub fn write_plot(
    path: &Path,
    time_axis: &CoordinateAxis,
    result: &ReductionResult,
    options: &PlotOptions,
) -> Result<()> {
    options.backend.check_extension(path)?;
    options.validate()?;
    let series = PlotSeries::new(time_axis, result)?;
    let size = (options.width, options.height);

    match options.backend {
        PlotBackend::Bitmap => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            render(&root, &series, options)?;
            root.present().map_err(plot_error)
        }
        PlotBackend::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            render(&root, &series, options)?;
            root.present().map_err(plot_error)
        }
    }
}

/// Render into a temporary file beside `path`, to be committed later.
///
/// # Errors
///
/// Same as [`write_plot`], plus [`SpatialStatsError::OutputWrite`] if the
/// destination directory cannot hold the staged file.
pub fn stage_plot(
    path: &Path,
    time_axis: &CoordinateAxis,
    result: &ReductionResult,
    options: &PlotOptions,
) -> Result<StagedOutput> {
    options.backend.check_extension(path)?;
    let staged = StagedOutput::create(path)?;
    write_plot(staged.temp_path(), time_axis, result, options)?;
    Ok(staged)
}

/// Time coordinates paired with the two statistics
struct PlotSeries {
    time: Vec<f64>,
    mean: Vec<f64>,
    variance: Vec<f64>,
    units: Option<TimeUnits>,
    x_label: String,
}

impl PlotSeries {
    fn new(time_axis: &CoordinateAxis, result: &ReductionResult) -> Result<Self> {
        if time_axis.len() != result.len() {
            return Err(SpatialStatsError::PlotError(format!(
                "{} time values for {} reduced steps",
                time_axis.len(),
                result.len()
            )));
        }
        let units = time_axis.units().and_then(|u| TimeUnits::parse(u).ok());
        let x_label = match time_axis.units() {
            Some(u) => format!("{} ({u})", time_axis.name()),
            None => time_axis.name().to_string(),
        };

        Ok(Self {
            time: time_axis.values().to_vec(),
            mean: result.moments.iter().map(|m| m.mean).collect(),
            variance: result.moments.iter().map(|m| m.variance).collect(),
            units,
            x_label,
        })
    }

    fn x_range(&self) -> Range<f64> {
        padded_range(self.time.iter().copied(), 0.0)
    }

    fn format_x(&self, x: f64) -> String {
        self.units
            .and_then(|u| u.datetime_at(x))
            .map_or_else(|| format!("{x}"), |d| d.format("%Y-%m-%d").to_string())
    }

    fn mean_band(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.time
            .iter()
            .zip(&self.mean)
            .zip(&self.variance)
            .map(|((&t, &m), &v)| {
                let sd = v.sqrt();
                (t, m - sd, m + sd)
            })
    }
}

fn plot_error<E: std::fmt::Display>(e: E) -> SpatialStatsError {
    SpatialStatsError::PlotError(e.to_string())
}

fn render<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &PlotSeries,
    options: &PlotOptions,
) -> Result<()> {
    root.fill(&WHITE).map_err(plot_error)?;
    let title = options
        .title
        .as_deref()
        .unwrap_or("Spatial Mean and Variance");
    let root = root
        .titled(title, ("sans-serif", 28).into_font())
        .map_err(plot_error)?;

    match options.layout {
        PlotLayout::Stacked => {
            let panels = root.split_evenly((2, 1));
            draw_lines(
                &panels[0],
                series,
                &[("Spatial Mean", &series.mean[..], MEAN_COLOR)],
                None,
            )?;
            draw_lines(
                &panels[1],
                series,
                &[("Spatial Variance", &series.variance[..], VARIANCE_COLOR)],
                None,
            )
        }
        PlotLayout::Overlay => draw_lines(
            &root,
            series,
            &[
                ("Spatial Mean", &series.mean[..], MEAN_COLOR),
                ("Spatial Variance", &series.variance[..], VARIANCE_COLOR),
            ],
            None,
        ),
        PlotLayout::ErrorBand => draw_lines(
            &root,
            series,
            &[("Spatial Mean", &series.mean[..], MEAN_COLOR)],
            Some("Mean ± 1 std. dev."),
        ),
    }
}

/// One chart with a line per entry of `lines`, plus the standard-deviation band when `band` is set
fn draw_lines<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &PlotSeries,
    lines: &[(&str, &[f64], RGBColor)],
    band: Option<&str>,
) -> Result<()> {
    let mut y_values: Vec<f64> = lines.iter().flat_map(|(_, v, _)| v.iter().copied()).collect();
    if band.is_some() {
        y_values.extend(series.mean_band().flat_map(|(_, lo, hi)| [lo, hi]));
    }

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(series.x_range(), padded_range(y_values.into_iter(), 0.05))
        .map_err(plot_error)?;

    let y_desc = match lines {
        [(label, _, _)] => (*label).to_string(),
        _ => "value".to_string(),
    };
    chart
        .configure_mesh()
        .x_desc(series.x_label.as_str())
        .y_desc(y_desc)
        .x_label_formatter(&|x| series.format_x(*x))
        .draw()
        .map_err(plot_error)?;

    if let Some(label) = band {
        let fill = MEAN_COLOR.mix(0.2);
        let segments = finite_segments(series.mean_band());
        chart
            .draw_series(segments.into_iter().map(|segment| {
                let upper = segment.iter().map(|&(t, _, hi)| (t, hi));
                let lower = segment.iter().rev().map(|&(t, lo, _)| (t, lo));
                Polygon::new(upper.chain(lower).collect::<Vec<_>>(), fill.filled())
            }))
            .map_err(plot_error)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], fill.filled()));
    }

    for &(label, values, color) in lines {
        let points = series.time.iter().zip(values).map(|(&t, &v)| (t, v, v));
        let segments = finite_segments(points);

        chart
            .draw_series(segments.iter().map(|segment| {
                PathElement::new(
                    segment.iter().map(|&(t, v, _)| (t, v)).collect::<Vec<_>>(),
                    color.stroke_width(2),
                )
            }))
            .map_err(plot_error)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        chart
            .draw_series(
                segments
                    .iter()
                    .flatten()
                    .map(|&(t, v, _)| Circle::new((t, v), 2, color.filled())),
            )
            .map_err(plot_error)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    Ok(())
}

/// Runs of consecutive points whose values are all finite; NaN steps split the line
fn finite_segments(
    points: impl Iterator<Item = (f64, f64, f64)>,
) -> Vec<Vec<(f64, f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for point in points {
        if point.1.is_finite() && point.2.is_finite() {
            current.push(point);
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Finite extent of `values` widened by `pad` of its span; never empty
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    if lo == hi {
        let half = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return (lo - half)..(hi + half);
    }
    let margin = (hi - lo) * pad;
    (lo - margin)..(hi + margin)
}

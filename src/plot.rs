//! SVG rendering of elbow curves and silhouette bar charts
use crate::elbow::ElbowCurve;
use crate::error::{Error, Result};
use log::info;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

/// Pixels per inch used when rasterising a [`FigureSize`].
pub const DPI: f64 = 100.0;

pub const ELBOW_TITLE: &str = "The Elbow Method showing the optimal k";

/// Figure dimensions in inches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FigureSize {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureSize {
    fn default() -> Self {
        FigureSize {
            width: 8.0,
            height: 6.0,
        }
    }
}

impl FigureSize {
    pub fn new(width: f64, height: f64) -> Self {
        FigureSize { width, height }
    }

    /// Size suited to a chart of `n_bars` horizontal bars: the default size up
    /// to 64 bars, `(n / 8, n / 4)` beyond that.
    pub fn for_bars(n_bars: usize) -> Self {
        if n_bars > 64 {
            FigureSize::new(n_bars as f64 / 8.0, n_bars as f64 / 4.0)
        } else {
            FigureSize::default()
        }
    }

    pub fn pixels(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * DPI).round().max(1.0) as u32;
        (px(self.width), px(self.height))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// A horizontal bar chart. The first bar is drawn at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub bars: Vec<Bar>,
    pub size: FigureSize,
}

fn plot_err(e: impl Display) -> Error {
    Error::Plot(e.to_string())
}

fn padded(lo: f64, hi: f64) -> std::ops::Range<f64> {
    let pad = ((hi - lo) * 0.05).max(0.05);
    (lo - pad)..(hi + pad)
}

/// Renders an elbow curve as an SVG document: distortion against `k`, one
/// cross per fitted cluster count.
pub fn render_elbow(curve: &ElbowCurve, size: FigureSize) -> Result<String> {
    let points: Vec<(f64, f64)> = curve
        .points
        .iter()
        .map(|p| (p.k as f64, p.distortion))
        .collect();
    if points.is_empty() {
        return Err(Error::EmptyData);
    }
    let (k_lo, k_hi) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (d_lo, d_hi) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size.pixels()).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(ELBOW_TITLE, ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((k_lo - 0.5)..(k_hi + 0.5), padded(d_lo, d_hi))
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc("k")
            .y_desc("Distortion")
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
            .map_err(plot_err)?;
        chart
            .draw_series(points.iter().map(|&p| Cross::new(p, 5, BLUE.stroke_width(2))))
            .map_err(plot_err)?;

        root.present().map_err(plot_err)?;
    }
    Ok(svg)
}

/// Renders a bar chart as an SVG document.
pub fn render_bars(chart: &BarChart) -> Result<String> {
    if chart.bars.is_empty() {
        return Err(Error::EmptyData);
    }
    let n = chart.bars.len();
    let (lo, hi) = chart
        .bars
        .iter()
        .fold((0f64, 0f64), |(lo, hi), b| (lo.min(b.value), hi.max(b.value)));
    // row i sits at height n - 1 - i so the first bar is on top
    let label_at = |y: &f64| -> String {
        let row = y.round();
        if (y - row).abs() > 1e-6 || row < 0.0 || row as usize >= n {
            return String::new();
        }
        chart.bars[n - 1 - row as usize].label.clone()
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, chart.size.pixels()).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let mut plot = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(padded(lo, hi), -0.5..(n as f64 - 0.5))
            .map_err(plot_err)?;

        plot.configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&label_at)
            .x_desc(chart.x_desc.as_str())
            .y_desc(chart.y_desc.as_str())
            .draw()
            .map_err(plot_err)?;

        plot.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
            let y = (n - 1 - i) as f64;
            Rectangle::new(
                [(0.0, y - 0.4), (bar.value, y + 0.4)],
                Palette99::pick(i).filled(),
            )
        }))
        .map_err(plot_err)?;

        root.present().map_err(plot_err)?;
    }
    Ok(svg)
}

/// Writes a rendered SVG document to `path`.
pub fn save_svg(path: impl AsRef<Path>, svg: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, svg)?;
    info!("wrote {}", path.display());
    Ok(())
}

//! Plot Tool
//!
//! Renders bar, line, scatter and histogram charts to PNG in memory.
//! Text is drawn with DejaVu Sans, compiled into the binary.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::ops::Range;
use std::str::FromStr;
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use serde_json::json;

use analyst_core::artifact::MIME_PNG;
use analyst_core::dataset::CellKey;
use analyst_core::{
    ArtifactDraft, ArtifactKind, Dataset, ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolResult,
    ToolSpec,
};

use super::resolve_column;

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const HIST_BINS: usize = 20;
const DEFAULT_TITLE: &str = "Data Visualization";
const FONT_FAMILY: &str = "sans-serif";
const FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const MARK_COLOR: RGBColor = RGBColor(31, 119, 180);
const AXIS_COLOR: RGBColor = RGBColor(64, 64, 64);

pub struct PlotTool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlotKind {
    Bar,
    Line,
    Scatter,
    Hist,
}

impl FromStr for PlotKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            "scatter" => Ok(Self::Scatter),
            "hist" | "histogram" => Ok(Self::Hist),
            _ => Err(ToolError::InvalidPlot(format!(
                "unknown plot type '{s}' (use bar, line, scatter or hist)"
            ))),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Hist => "hist",
        };
        write!(f, "{name}")
    }
}

/// Geometry ready to draw, in data coordinates
#[derive(Debug)]
enum Marks {
    /// Category position and height
    Bars(Vec<(f64, f64)>),
    Line(Vec<(f64, f64)>),
    Points(Vec<(f64, f64)>),
    /// Bin start, bin end, count
    Bins(Vec<(f64, f64, f64)>),
}

/// Text drawn around the plotting area
#[derive(Debug)]
struct Labels<'a> {
    title: &'a str,
    x: &'a str,
    y: &'a str,
    /// Tick names for a categorical x axis, by position; empty when x is numeric
    categories: Vec<String>,
}

impl Tool for PlotTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("plot", "Create a visualization of the data")
            .param(
                ParamSpec::string("plot_type", "Type of plot: 'bar', 'line', 'scatter', 'hist'").required(),
            )
            .param(ParamSpec::string("x_column", "Column for x-axis"))
            .param(ParamSpec::string("y_column", "Column for y-axis (not needed for hist)"))
            .param(ParamSpec::string("title", "Plot title").with_default(json!(DEFAULT_TITLE)))
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let kind: PlotKind = args.str("plot_type")?.parse()?;
        let title = args.opt_str("title")?.unwrap_or(DEFAULT_TITLE);
        let x_name = args.opt_str("x_column")?;
        let y_name = args.opt_str("y_column")?;

        let (marks, labels) = match (kind, x_name, y_name) {
            (PlotKind::Hist, Some(x), _) => {
                let labels = Labels {
                    title,
                    x,
                    y: "Frequency",
                    categories: Vec::new(),
                };
                (histogram_marks(dataset, x)?, labels)
            }
            (PlotKind::Hist, None, _) => {
                return Err(ToolError::InvalidPlot("hist needs x_column".into()));
            }
            (_, Some(x), Some(y)) => {
                let (marks, categories) = xy_marks(kind, dataset, x, y)?;
                let labels = Labels {
                    title,
                    x,
                    y,
                    categories,
                };
                (marks, labels)
            }
            _ => {
                return Err(ToolError::InvalidPlot(format!("{kind} needs x_column and y_column")));
            }
        };

        let bytes = render(&marks, &labels)?;
        tracing::debug!(plot = %kind, bytes = bytes.len(), "Rendered chart");

        let artifact = ArtifactDraft {
            kind: ArtifactKind::Plot,
            extension: "png",
            filename: format!("{}.png", title.replace(' ', "_")),
            mime_type: MIME_PNG,
            bytes,
        };
        Ok(ToolOutput::text(format!("Created {kind} plot: {title}")).with_artifact(artifact))
    }
}

fn histogram_marks(dataset: &Dataset, x: &str) -> Result<Marks, ToolError> {
    let index = resolve_column(dataset, x)?;
    let values: Vec<f64> = dataset.column(index).filter_map(|c| c.coerce_number()).collect();
    if values.is_empty() {
        return Err(ToolError::NotNumeric(x.to_string()));
    }
    Ok(Marks::Bins(bin(&values, HIST_BINS)))
}

fn bin(values: &[f64], bins: usize) -> Vec<(f64, f64, f64)> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return vec![(min - 0.5, min + 0.5, values.len() as f64)];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let slot = (((v - min) / width) as usize).min(bins - 1);
        counts[slot] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            let start = min + width * i as f64;
            (start, start + width, n as f64)
        })
        .collect()
}

fn xy_marks(kind: PlotKind, dataset: &Dataset, x: &str, y: &str) -> Result<(Marks, Vec<String>), ToolError> {
    let xi = resolve_column(dataset, x)?;
    let yi = resolve_column(dataset, y)?;

    let pairs: Vec<_> = dataset
        .rows()
        .iter()
        .filter(|row| !row[xi].is_missing())
        .filter_map(|row| row[yi].coerce_number().map(|v| (&row[xi], v)))
        .collect();
    if pairs.is_empty() {
        return Err(ToolError::InvalidPlot(format!(
            "no rows with a value in '{x}' and a number in '{y}'"
        )));
    }

    let numeric_x: Option<Vec<f64>> = if kind == PlotKind::Bar {
        None
    } else {
        pairs.iter().map(|(c, _)| c.coerce_number()).collect()
    };

    // Categorical x values are laid out in order of first appearance
    let mut categories = Vec::new();
    let xs = numeric_x.unwrap_or_else(|| {
        let mut positions: HashMap<CellKey, usize> = HashMap::new();
        pairs
            .iter()
            .map(|(c, _)| {
                let next = positions.len();
                *positions.entry(c.key()).or_insert_with(|| {
                    categories.push(c.to_string());
                    next
                }) as f64
            })
            .collect()
    });

    let points: Vec<(f64, f64)> = xs.into_iter().zip(pairs.iter().map(|(_, v)| *v)).collect();
    let marks = match kind {
        PlotKind::Bar => Marks::Bars(points),
        PlotKind::Line => Marks::Line(points),
        _ => Marks::Points(points),
    };
    Ok((marks, categories))
}

impl Marks {
    fn bounds(&self) -> (Range<f64>, Range<f64>) {
        match self {
            Self::Bars(points) => {
                let slots = points.iter().map(|p| p.0).fold(0.0, f64::max);
                let (lo, hi) = extent(points.iter().map(|p| p.1).chain([0.0]));
                (-0.5..slots + 0.5, padded(lo, hi))
            }
            Self::Line(points) | Self::Points(points) => {
                let (x0, x1) = extent(points.iter().map(|p| p.0));
                let (y0, y1) = extent(points.iter().map(|p| p.1));
                (padded(x0, x1), padded(y0, y1))
            }
            Self::Bins(bins) => {
                let x0 = bins.first().map_or(0.0, |b| b.0);
                let x1 = bins.last().map_or(1.0, |b| b.1);
                let (_, top) = extent(bins.iter().map(|b| b.2));
                (x0..x1, padded(0.0, top))
            }
        }
    }
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn padded(lo: f64, hi: f64) -> Range<f64> {
    if hi - lo <= f64::EPSILON {
        return (lo - 1.0)..(hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

fn render_error(err: impl fmt::Display) -> ToolError {
    ToolError::Failed(format!("chart rendering failed: {err}"))
}

/// Registers the embedded font once per process
fn ensure_font() -> Result<(), ToolError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    if *REGISTERED.get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT).is_ok()) {
        Ok(())
    } else {
        Err(render_error("embedded font could not be loaded"))
    }
}

/// Category name for a tick sitting on an integer position, blank otherwise
fn category_label(categories: &[String], value: f64) -> String {
    let slot = value.round();
    if slot < 0.0 || (value - slot).abs() > 1e-6 {
        return String::new();
    }
    categories.get(slot as usize).cloned().unwrap_or_default()
}

fn render(marks: &Marks, labels: &Labels<'_>) -> Result<Vec<u8>, ToolError> {
    ensure_font()?;

    let (x_range, y_range) = marks.bounds();
    let baseline = 0.0_f64.clamp(y_range.start, y_range.end);
    let mut pixels = vec![0u8; (WIDTH * HEIGHT * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(labels.title, (FONT_FAMILY, 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(render_error)?;

        let categorical = |v: &f64| category_label(&labels.categories, *v);
        let mut mesh = chart.configure_mesh();
        mesh.x_desc(labels.x)
            .y_desc(labels.y)
            .axis_desc_style((FONT_FAMILY, 18))
            .label_style((FONT_FAMILY, 14));
        if !labels.categories.is_empty() {
            mesh.x_labels(labels.categories.len()).x_label_formatter(&categorical);
        }
        mesh.draw().map_err(render_error)?;

        match marks {
            Marks::Bars(points) => {
                chart
                    .draw_series(points.iter().map(|&(x, y)| {
                        Rectangle::new([(x - 0.4, baseline), (x + 0.4, y)], MARK_COLOR.filled())
                    }))
                    .map_err(render_error)?;
            }
            Marks::Line(points) => {
                let mut ordered = points.clone();
                ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
                chart
                    .draw_series(LineSeries::new(ordered, MARK_COLOR.stroke_width(2)))
                    .map_err(render_error)?;
            }
            Marks::Points(points) => {
                chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 4, MARK_COLOR.filled())))
                    .map_err(render_error)?;
            }
            Marks::Bins(bins) => {
                chart
                    .draw_series(bins.iter().map(|&(start, end, count)| {
                        Rectangle::new([(start, 0.0), (end, count)], MARK_COLOR.filled())
                    }))
                    .map_err(render_error)?;
            }
        }

        if baseline > y_range.start {
            chart
                .draw_series(LineSeries::new(
                    [(x_range.start, baseline), (x_range.end, baseline)],
                    AXIS_COLOR.stroke_width(1),
                ))
                .map_err(render_error)?;
        }

        root.present().map_err(render_error)?;
    }

    encode_png(pixels)
}

fn encode_png(pixels: Vec<u8>) -> Result<Vec<u8>, ToolError> {
    let image = image::RgbImage::from_raw(WIDTH, HEIGHT, pixels)
        .ok_or_else(|| render_error("pixel buffer does not match the image size"))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(render_error)?;
    Ok(png.into_inner())
}

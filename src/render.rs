//! Rendering collaborator seam.
//!
//! The dashboard never draws anything itself. Each selection becomes three
//! draw requests (one per chart surface) and one metadata panel update, handed
//! to a [`Renderer`]. Trace payloads follow the plotly.js trace schema so a
//! browser front end can pass them straight through.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::io::Write;

use crate::views::{BarSeries, BubbleSeries};

pub const BAR_SURFACE: &str = "bar";
pub const BUBBLE_SURFACE: &str = "bubble";
pub const GAUGE_SURFACE: &str = "gauge";
pub const METADATA_SURFACE: &str = "sample-metadata";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeStep {
    pub range: [f64; 2],
    pub color: String,
}

/// Presentation settings. Not part of the view logic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartStyle {
    pub bar_title: String,
    pub bar_x_axis: String,
    pub bubble_title: String,
    pub bubble_x_axis: String,
    pub bubble_y_axis: String,
    /// Chart title above the gauge
    pub gauge_title: String,
    /// Label inside the gauge, next to the number
    pub gauge_label: String,
    pub bubble_sizeref: f64,
    pub bubble_colorscale: String,
    pub bubble_opacity: f64,
    pub gauge_range: [f64; 2],
    pub gauge_steps: Vec<GaugeStep>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        let colors = [
            "rgba(255, 255, 255, 0)",
            "rgba(232, 226, 202, 0.5)",
            "rgba(210, 206, 145, 0.5)",
            "rgba(202, 209, 95, 0.5)",
            "rgba(170, 202, 42, 0.5)",
            "rgba(110, 154, 22, 0.5)",
            "rgba(14, 127, 0, 0.5)",
            "rgba(0, 102, 0, 0.5)",
            "rgba(0, 51, 0, 0.5)",
        ];
        let gauge_steps = colors
            .iter()
            .enumerate()
            .map(|(i, c)| GaugeStep {
                range: [i as f64, (i + 1) as f64],
                color: c.to_string(),
            })
            .collect();
        Self {
            bar_title: "Top 10 OTUs".to_string(),
            bar_x_axis: "Sequencing Read Numbers".to_string(),
            bubble_title: "All OTU Counts".to_string(),
            bubble_x_axis: "OTU ID".to_string(),
            bubble_y_axis: "Sequencing Read Numbers".to_string(),
            gauge_title: "Belly Button Washing Frequency".to_string(),
            gauge_label: "Scrubs per Week".to_string(),
            bubble_sizeref: 0.2,
            bubble_colorscale: "Portland".to_string(),
            bubble_opacity: 0.8,
            gauge_range: [0.0, 9.0],
            gauge_steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar {
        x: Vec<f64>,
        y: Vec<String>,
        orientation: String,
    },
    Scatter {
        x: Vec<u32>,
        y: Vec<f64>,
        text: Vec<String>,
        mode: String,
        marker: serde_json::Value,
    },
    Indicator {
        value: f64,
        mode: String,
        title: serde_json::Value,
        gauge: serde_json::Value,
    },
}

impl Trace {
    pub fn bar(series: &BarSeries) -> Self {
        Trace::Bar {
            x: series.values.clone(),
            y: series.labels.clone(),
            orientation: "h".to_string(),
        }
    }

    pub fn bubble(series: &BubbleSeries, style: &ChartStyle) -> Self {
        Trace::Scatter {
            x: series.otu_ids.clone(),
            y: series.sample_values.clone(),
            text: series.otu_labels.clone(),
            mode: "markers".to_string(),
            marker: json!({
                "size": series.marker_sizes(),
                "sizemode": "area",
                "sizeref": style.bubble_sizeref,
                "color": series.marker_colors(),
                "colorscale": style.bubble_colorscale,
                "opacity": style.bubble_opacity,
            }),
        }
    }

    pub fn gauge(value: f64, style: &ChartStyle) -> Self {
        Trace::Indicator {
            value,
            mode: "gauge+number".to_string(),
            title: json!({ "text": style.gauge_label }),
            gauge: json!({
                "axis": { "range": style.gauge_range },
                "steps": style.gauge_steps,
            }),
        }
    }

    /// Number of plotted points.
    pub fn points(&self) -> usize {
        match self {
            Trace::Bar { x, .. } => x.len(),
            Trace::Scatter { x, .. } => x.len(),
            Trace::Indicator { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRequest {
    pub surface: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    pub traces: Vec<Trace>,
}

impl DrawRequest {
    pub fn new(surface: &str, title: &str, trace: Trace) -> Self {
        Self {
            surface: surface.to_string(),
            title: title.to_string(),
            x_axis: None,
            y_axis: None,
            traces: vec![trace],
        }
    }

    pub fn with_axes(mut self, x_axis: Option<&str>, y_axis: Option<&str>) -> Self {
        self.x_axis = x_axis.map(str::to_string);
        self.y_axis = y_axis.map(str::to_string);
        self
    }
}

/// Receiver of everything the dashboard wants displayed.
pub trait Renderer {
    fn populate_selector(&mut self, names: &[String]) -> Result<()>;
    fn draw(&mut self, request: DrawRequest) -> Result<()>;
    fn update_metadata_panel(&mut self, lines: &[String]) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn populate_selector(&mut self, names: &[String]) -> Result<()> {
        (**self).populate_selector(names)
    }

    fn draw(&mut self, request: DrawRequest) -> Result<()> {
        (**self).draw(request)
    }

    fn update_metadata_panel(&mut self, lines: &[String]) -> Result<()> {
        (**self).update_metadata_panel(lines)
    }
}

/// Writes one JSON object per request, tagged by `op`.
pub struct JsonLinesRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: serde_json::Value) -> Result<()> {
        serde_json::to_writer(&mut self.out, &value).context("render encode failed")?;
        self.out.write_all(b"\n").context("render write failed")?;
        self.out.flush().context("render flush failed")?;
        Ok(())
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    fn populate_selector(&mut self, names: &[String]) -> Result<()> {
        self.emit(json!({ "op": "populate_selector", "options": names }))
    }

    fn draw(&mut self, request: DrawRequest) -> Result<()> {
        let mut payload = json!({
            "op": "draw",
            "surface": request.surface,
            "title": request.title,
            "traces": request.traces,
        });
        if let Some(title) = request.x_axis {
            payload["xaxis"] = json!({ "title": title });
        }
        if let Some(title) = request.y_axis {
            payload["yaxis"] = json!({ "title": title });
        }
        self.emit(payload)
    }

    fn update_metadata_panel(&mut self, lines: &[String]) -> Result<()> {
        self.emit(json!({
            "op": "update_panel",
            "surface": METADATA_SURFACE,
            "lines": lines,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    PopulateSelector(Vec<String>),
    Draw(DrawRequest),
    UpdateMetadataPanel(Vec<String>),
}

/// Keeps every request in memory, in call order.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub ops: Vec<RenderOp>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRequest> {
        self.ops.iter().filter_map(|op| match op {
            RenderOp::Draw(req) => Some(req),
            _ => None,
        })
    }

    pub fn panels(&self) -> impl Iterator<Item = &Vec<String>> {
        self.ops.iter().filter_map(|op| match op {
            RenderOp::UpdateMetadataPanel(lines) => Some(lines),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn populate_selector(&mut self, names: &[String]) -> Result<()> {
        self.ops.push(RenderOp::PopulateSelector(names.to_vec()));
        Ok(())
    }

    fn draw(&mut self, request: DrawRequest) -> Result<()> {
        self.ops.push(RenderOp::Draw(request));
        Ok(())
    }

    fn update_metadata_panel(&mut self, lines: &[String]) -> Result<()> {
        self.ops.push(RenderOp::UpdateMetadataPanel(lines.to_vec()));
        Ok(())
    }
}

use anyhow::Result;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::data::Dataset;
use crate::logging::{
    log_dataset_loaded, log_dataset_warning, log_draw, log_input_error, log_load_failed,
    log_lookup_miss, log_selection, v_str, ProfileScope,
};
use crate::render::{
    ChartStyle, DrawRequest, Renderer, Trace, BAR_SURFACE, BUBBLE_SURFACE, GAUGE_SURFACE,
};
use crate::views::{MetadataEntry, SubjectViewBuilder, SubjectViews};

/// A change of the subject selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    pub subject_id: String,
}

impl SelectionEvent {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
        }
    }
}

/// Drives the view builder from selection events and forwards the results
/// to a renderer.
pub struct Dashboard<R: Renderer> {
    dataset: Arc<Dataset>,
    top_n: usize,
    label_prefix: String,
    style: ChartStyle,
    renderer: R,
    selections: u64,
}

impl<R: Renderer> Dashboard<R> {
    pub fn new(dataset: Arc<Dataset>, cfg: &Config, renderer: R) -> Self {
        Self {
            dataset,
            top_n: cfg.top_n,
            label_prefix: cfg.label_prefix.clone(),
            style: ChartStyle::default(),
            renderer,
            selections: 0,
        }
    }

    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn selections(&self) -> u64 {
        self.selections
    }

    /// Populate the selector and show the first subject, if any.
    pub fn start(&mut self) -> Result<Option<SubjectViews>> {
        let _scope = ProfileScope::new("start");
        let dataset = Arc::clone(&self.dataset);
        self.renderer.populate_selector(&dataset.names)?;
        match dataset.names.first() {
            Some(first) => self.refresh(first).map(Some),
            None => Ok(None),
        }
    }

    /// Build every view for `subject_id` and hand them to the renderer.
    pub fn refresh(&mut self, subject_id: &str) -> Result<SubjectViews> {
        let _scope = ProfileScope::with_context("refresh", &[("subject_id", v_str(subject_id))]);
        log_selection(subject_id);
        self.selections += 1;

        let views = SubjectViewBuilder::new(&self.dataset)
            .top_n(self.top_n)
            .label_prefix(&self.label_prefix)
            .build(subject_id);

        if views.metadata.is_empty() {
            log_lookup_miss("metadata", subject_id);
        }
        let lines: Vec<String> = views.metadata.iter().map(MetadataEntry::line).collect();
        self.renderer.update_metadata_panel(&lines)?;

        match &views.top_samples {
            Some(bar) => self.draw(
                DrawRequest::new(BAR_SURFACE, &self.style.bar_title, Trace::bar(bar))
                    .with_axes(Some(self.style.bar_x_axis.as_str()), None),
            )?,
            None => log_lookup_miss("bar", subject_id),
        }

        match &views.all_samples {
            Some(bubble) => self.draw(
                DrawRequest::new(
                    BUBBLE_SURFACE,
                    &self.style.bubble_title,
                    Trace::bubble(bubble, &self.style),
                )
                .with_axes(
                    Some(self.style.bubble_x_axis.as_str()),
                    Some(self.style.bubble_y_axis.as_str()),
                ),
            )?,
            None => log_lookup_miss("bubble", subject_id),
        }

        // A missing record still draws the gauge, at zero.
        let gauge = views.wash_frequency.unwrap_or(0.0);
        self.draw(DrawRequest::new(
            GAUGE_SURFACE,
            &self.style.gauge_title,
            Trace::gauge(gauge, &self.style),
        ))?;

        Ok(views)
    }

    fn draw(&mut self, request: DrawRequest) -> Result<()> {
        let points: usize = request.traces.iter().map(Trace::points).sum();
        log_draw(&request.surface, points);
        self.renderer.draw(request)
    }

    /// Handle selection events in arrival order until every sender is gone.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<SelectionEvent>) -> Result<u64> {
        let mut handled = 0u64;
        while let Some(event) = rx.recv().await {
            self.refresh(&event.subject_id)?;
            handled += 1;
        }
        Ok(handled)
    }
}

/// Load the configured dataset and show the first subject.
///
/// A failed load is logged and yields `Ok(None)` without touching the
/// renderer: the selector stays empty and nothing is drawn.
pub async fn load_and_start<R: Renderer>(
    cfg: &Config,
    renderer: R,
) -> Result<Option<Dashboard<R>>> {
    let source = cfg.data_source.describe();
    let dataset = {
        let _scope = ProfileScope::with_context("dataset_load", &[("source", v_str(&source))]);
        match Dataset::fetch(&cfg.data_source, cfg.fetch_timeout()).await {
            Ok(ds) => ds,
            Err(err) => {
                log_load_failed(&source, &err);
                return Ok(None);
            }
        }
    };

    let report = dataset.validate();
    log_dataset_loaded(
        &source,
        report.names,
        report.metadata_records,
        report.sample_records,
    );
    for warning in &report.warnings {
        log_dataset_warning(warning);
    }

    let mut dashboard = Dashboard::new(Arc::new(dataset), cfg, renderer);
    dashboard.start()?;
    Ok(Some(dashboard))
}

/// Feed one selection event per non-blank input line from a dedicated thread.
///
/// Blocking reads never sit on the async runtime, so shutdown does not wait
/// on interactive input. The thread ends at end of input, on a read error,
/// or once the receiver is dropped.
pub fn spawn_line_reader<B>(input: B, tx: mpsc::Sender<SelectionEvent>) -> JoinHandle<()>
where
    B: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log_input_error(&err.to_string());
                    break;
                }
            };
            let subject_id = line.trim();
            if subject_id.is_empty() {
                continue;
            }
            if tx.blocking_send(SelectionEvent::new(subject_id)).is_err() {
                break;
            }
        }
    })
}

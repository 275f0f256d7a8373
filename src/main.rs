use anyhow::Result;
use std::io::BufReader;
use std::time::Instant;
use tokio::sync::mpsc;

use otu_dashboard::config::Config;
use otu_dashboard::dashboard::{load_and_start, spawn_line_reader};
use otu_dashboard::logging::{log_session_summary, log_startup};
use otu_dashboard::render::JsonLinesRenderer;

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cfg = Config::from_env().with_source_arg(std::env::args().nth(1));
    log_startup(&cfg.data_source.describe(), cfg.top_n);

    let renderer = JsonLinesRenderer::new(std::io::stdout());
    let Some(mut dashboard) = load_and_start(&cfg, renderer).await? else {
        // Nothing to show; the selector stays empty.
        return Ok(());
    };

    // The reader thread is left detached: it may be parked on a terminal read
    // when the loop ends, and process exit reclaims it.
    let (tx, rx) = mpsc::channel(cfg.event_buffer);
    let _reader = spawn_line_reader(BufReader::new(std::io::stdin()), tx);

    dashboard.run(rx).await?;

    log_session_summary(started.elapsed().as_secs(), dashboard.selections());
    Ok(())
}

//! End-to-end: a dataset file on disk through load, selection and render.

use std::fs;
use std::sync::Arc;

use otu_dashboard::config::Config;
use otu_dashboard::dashboard::{load_and_start, Dashboard, SelectionEvent};
use otu_dashboard::data::{DataSource, Dataset};
use otu_dashboard::render::{JsonLinesRenderer, RecordingRenderer, Trace};
use otu_dashboard::views::{self, DEFAULT_TOP_N};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const SUBJECT_941: &str = r#"{
    "names": ["941"],
    "metadata": [{"id": "941", "wfreq": "4"}],
    "samples": [{"id": "941", "otu_ids": [1, 2, 3], "sample_values": [10, 20, 30], "otu_labels": ["a", "b", "c"]}]
}"#;

fn write_dataset(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("samples.json");
    fs::write(&path, body).unwrap();
    path
}

/// Serve `body` at `/samples.json`; every other path is a 404.
async fn serve_dataset(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let (status, payload) = if head.starts_with("GET /samples.json ") {
                    ("200 OK", body)
                } else {
                    ("404 Not Found", "Not Found")
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    payload.len(),
                    payload
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

#[test]
fn selecting_941_yields_expected_views() {
    let ds = Dataset::from_json_str(SUBJECT_941).unwrap();

    assert_eq!(views::wash_frequency(&ds, "941"), Some(4.0));
    let bar = views::top_samples_view(&ds, "941", DEFAULT_TOP_N).unwrap();
    assert_eq!(bar.otu_ids, vec![3, 2, 1]);
    assert_eq!(bar.labels, vec!["OTU 3", "OTU 2", "OTU 1"]);
    assert_eq!(bar.values, vec![30.0, 20.0, 10.0]);

    let md = views::metadata_view(&ds, "941");
    let keys: Vec<&str> = md.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["id", "wfreq"]);
}

#[test]
fn every_listed_name_has_full_views() {
    let ds = Dataset::from_json_str(
        r#"{"names": ["940", "941"],
            "metadata": [{"id": 940, "age": 24.0, "wfreq": 2.0}, {"id": 941, "age": 34.0, "wfreq": null}],
            "samples": [
                {"id": "940", "otu_ids": [1, 2], "sample_values": [5, 4], "otu_labels": ["x", "y"]},
                {"id": "941", "otu_ids": [7], "sample_values": [9], "otu_labels": ["z"]}
            ]}"#,
    )
    .unwrap();
    assert!(ds.validate().ok);

    for name in &ds.names {
        let md = views::metadata_view(&ds, name);
        let record = ds.find_metadata(name).unwrap();
        assert_eq!(md.len(), record.len());

        let bubble = views::all_samples_view(&ds, name).unwrap();
        let samples = ds.find_samples(name).unwrap();
        assert_eq!(bubble.len(), samples.otu_ids.len());
        assert_eq!(bubble.otu_labels.len(), samples.otu_labels.len());

        let bar = views::top_samples_view(&ds, name, 10).unwrap();
        assert_eq!(bar.len(), samples.len().min(10));
    }
    // null wfreq coerces to zero
    assert_eq!(views::wash_frequency(&ds, "941"), Some(0.0));
}

#[tokio::test]
async fn fetch_from_file_and_drive_dashboard() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir, SUBJECT_941);
    let source = DataSource::parse(path.to_str().unwrap());

    let ds = Dataset::fetch(&source, Duration::from_secs(5)).await.unwrap();
    let mut dash = Dashboard::new(Arc::new(ds), &Config::default(), RecordingRenderer::new());
    dash.start().unwrap();

    let (tx, rx) = mpsc::channel(2);
    tx.send(SelectionEvent::new("941")).await.unwrap();
    tx.send(SelectionEvent::new("missing")).await.unwrap();
    drop(tx);
    assert_eq!(dash.run(rx).await.unwrap(), 2);

    let gauges: Vec<f64> = dash
        .renderer()
        .draws()
        .filter(|d| d.surface == "gauge")
        .map(|d| match &d.traces[0] {
            Trace::Indicator { value, .. } => *value,
            other => panic!("unexpected trace {:?}", other),
        })
        .collect();
    assert_eq!(gauges, vec![4.0, 4.0, 0.0]);
}

#[tokio::test]
async fn fetch_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let source = DataSource::parse(dir.path().join("absent.json").to_str().unwrap());
    assert!(Dataset::fetch(&source, Duration::from_secs(1)).await.is_err());
}

#[tokio::test]
async fn fetch_over_http_parses_dataset() {
    let addr = serve_dataset(SUBJECT_941).await;
    let source = DataSource::parse(&format!("http://{}/samples.json", addr));
    assert!(matches!(source, DataSource::Url(_)));

    let ds = Dataset::fetch(&source, Duration::from_secs(5)).await.unwrap();
    assert_eq!(ds.names, vec!["941"]);
    assert_eq!(views::wash_frequency(&ds, "941"), Some(4.0));
}

#[tokio::test]
async fn fetch_over_http_rejects_error_status() {
    let addr = serve_dataset(SUBJECT_941).await;
    let source = DataSource::parse(&format!("http://{}/missing.json", addr));

    let err = Dataset::fetch(&source, Duration::from_secs(5)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("404"));
}

#[tokio::test]
async fn failed_load_leaves_dashboard_empty() {
    let dir = TempDir::new().unwrap();
    let cfg = Config::default()
        .with_source_arg(Some(dir.path().join("absent.json").display().to_string()));
    let mut recorder = RecordingRenderer::new();

    assert!(load_and_start(&cfg, &mut recorder).await.unwrap().is_none());
    assert!(recorder.ops.is_empty());
}

#[tokio::test]
async fn load_and_start_shows_first_subject() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir, SUBJECT_941);
    let cfg = Config::default().with_source_arg(Some(path.display().to_string()));
    let mut recorder = RecordingRenderer::new();

    let dash = load_and_start(&cfg, &mut recorder).await.unwrap().unwrap();
    assert_eq!(dash.selections(), 1);
    drop(dash);
    assert_eq!(recorder.ops.len(), 5);
    assert_eq!(recorder.draws().count(), 3);
}

#[test]
fn json_lines_stream_for_one_selection() {
    let ds = Dataset::from_json_str(SUBJECT_941).unwrap();
    let mut dash = Dashboard::new(
        Arc::new(ds),
        &Config::default(),
        JsonLinesRenderer::new(Vec::new()),
    );
    dash.refresh("941").unwrap();

    let out = String::from_utf8(dash.into_renderer().into_inner()).unwrap();
    let ops: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    let kinds: Vec<&str> = ops.iter().map(|o| o["op"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["update_panel", "draw", "draw", "draw"]);
    assert_eq!(ops[0]["lines"][1], "wfreq: 4");
    assert_eq!(ops[1]["traces"][0]["y"][0], "OTU 3");
    assert_eq!(ops[2]["traces"][0]["marker"]["size"][2], 30.0);
}

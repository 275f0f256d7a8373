pub mod scalar;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use self::scalar::id_key;

/// Metadata field read by the washing-frequency gauge.
pub const WFREQ_FIELD: &str = "wfreq";

/// Where the dataset document is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(Url),
}

impl DataSource {
    /// `http(s)://` sources are fetched over the network, everything else is a path.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => DataSource::Url(url),
            _ => DataSource::File(PathBuf::from(raw)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::File(path) => path.display().to_string(),
            DataSource::Url(url) => url.to_string(),
        }
    }
}

/// One subject's metadata: an open, ordered mapping of field name to scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord(Map<String, Value>);

impl MetadataRecord {
    pub fn id_key(&self) -> Option<String> {
        self.0.get("id").and_then(id_key)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Fields in document order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One subject's OTU counts as three parallel arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub otu_ids: Vec<u32>,
    pub sample_values: Vec<f64>,
    pub otu_labels: Vec<String>,
}

impl SampleRecord {
    /// Usable length: the shortest of the parallel arrays.
    pub fn len(&self) -> usize {
        self.otu_ids
            .len()
            .min(self.sample_values.len())
            .min(self.otu_labels.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_aligned(&self) -> bool {
        self.otu_ids.len() == self.sample_values.len()
            && self.otu_ids.len() == self.otu_labels.len()
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    id_key(&raw).ok_or_else(|| serde::de::Error::custom(format!("id must be a string or number, got {}", raw)))
}

/// The whole dashboard dataset, read once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub names: Vec<String>,
    pub metadata: Vec<MetadataRecord>,
    pub samples: Vec<SampleRecord>,
}

impl Dataset {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("dataset is not valid samples json")
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_slice(text.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("cannot read dataset {}", path.display()))?;
        Self::from_slice(&bytes)
    }

    /// Read the dataset from a file or URL. Awaited once at startup.
    pub async fn fetch(source: &DataSource, timeout: Duration) -> Result<Self> {
        let bytes = fetch_bytes(source, timeout).await?;
        Self::from_slice(&bytes).with_context(|| format!("while loading {}", source.describe()))
    }

    /// First metadata record whose id matches `subject_id`.
    pub fn find_metadata(&self, subject_id: &str) -> Option<&MetadataRecord> {
        let wanted = subject_id.trim();
        self.metadata
            .iter()
            .find(|m| m.id_key().as_deref() == Some(wanted))
    }

    /// First sample record whose id matches `subject_id`.
    pub fn find_samples(&self, subject_id: &str) -> Option<&SampleRecord> {
        let wanted = subject_id.trim();
        self.samples.iter().find(|s| s.id == wanted)
    }

    pub fn validate(&self) -> DatasetReport {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for name in &self.names {
            if !seen.insert(name.as_str()) {
                warnings.push(format!("duplicate_name: {}", name));
            }
        }

        for name in &self.names {
            if self.find_metadata(name).is_none() {
                warnings.push(format!("missing_metadata: {}", name));
            }
            if self.find_samples(name).is_none() {
                warnings.push(format!("missing_samples: {}", name));
            }
        }

        for (idx, record) in self.metadata.iter().enumerate() {
            match record.id_key() {
                None => warnings.push(format!("metadata_without_id: index={}", idx)),
                Some(id) if record.get(WFREQ_FIELD).is_none() => {
                    warnings.push(format!("missing_wfreq: {}", id))
                }
                Some(_) => {}
            }
        }

        for record in &self.samples {
            if !record.is_aligned() {
                warnings.push(format!(
                    "unaligned_samples: {} otu_ids={} sample_values={} otu_labels={}",
                    record.id,
                    record.otu_ids.len(),
                    record.sample_values.len(),
                    record.otu_labels.len()
                ));
            }
        }

        DatasetReport {
            names: self.names.len() as u64,
            metadata_records: self.metadata.len() as u64,
            sample_records: self.samples.len() as u64,
            ok: warnings.is_empty(),
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReport {
    pub names: u64,
    pub metadata_records: u64,
    pub sample_records: u64,
    pub ok: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub bytes: u64,
    pub names: u64,
    pub metadata_records: u64,
    pub sample_records: u64,
    pub warnings: Vec<String>,
    pub generated_at_epoch: u64,
}

/// Hash, count and validate a dataset file.
pub fn analyze_dataset(path: &Path, now_ts: u64) -> Result<DatasetManifest> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("cannot read dataset {}", path.display()))?;
    let dataset = Dataset::from_slice(&bytes)?;
    let report = dataset.validate();
    Ok(DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
        names: report.names,
        metadata_records: report.metadata_records,
        sample_records: report.sample_records,
        warnings: report.warnings,
        generated_at_epoch: now_ts,
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("samples.json");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}

async fn fetch_bytes(source: &DataSource, timeout: Duration) -> Result<Vec<u8>> {
    match source {
        DataSource::File(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read dataset {}", path.display())),
        DataSource::Url(url) => {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("cannot build http client")?;
            let resp = client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("can't fetch {}", url))?;
            let status = resp.status();
            if !status.is_success() {
                bail!("can't fetch {}: http {}", url, status);
            }
            let body = resp.bytes().await.context("dataset body read failed")?;
            Ok(body.to_vec())
        }
    }
}

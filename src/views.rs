//! Subject views: lookups over the dataset reshaped for the four panels.
//!
//! Every function here is a pure function of `(dataset, subject_id)`. A
//! subject with no record produces an empty metadata list or `None`, never
//! an error.

use serde::Serialize;
use serde_json::Value;

use crate::data::scalar::{coerce_number, scalar_text};
use crate::data::{Dataset, WFREQ_FIELD};

pub const DEFAULT_TOP_N: usize = 10;
pub const OTU_LABEL_PREFIX: &str = "OTU ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: Value,
}

impl MetadataEntry {
    /// Panel line, `"key: value"`.
    pub fn line(&self) -> String {
        format!("{}: {}", self.key, scalar_text(&self.value))
    }
}

/// Top-N horizontal bar data, smallest of the top N first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub values: Vec<f64>,
    pub otu_ids: Vec<u32>,
    pub labels: Vec<String>,
}

impl BarSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Every OTU of a subject; values drive both the y position and marker size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleSeries {
    pub otu_ids: Vec<u32>,
    pub sample_values: Vec<f64>,
    pub otu_labels: Vec<String>,
}

impl BubbleSeries {
    pub fn marker_sizes(&self) -> &[f64] {
        &self.sample_values
    }

    pub fn marker_colors(&self) -> &[u32] {
        &self.otu_ids
    }

    pub fn len(&self) -> usize {
        self.otu_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.otu_ids.is_empty()
    }
}

/// All four views for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectViews {
    pub subject_id: String,
    pub metadata: Vec<MetadataEntry>,
    pub top_samples: Option<BarSeries>,
    pub all_samples: Option<BubbleSeries>,
    pub wash_frequency: Option<f64>,
}

impl SubjectViews {
    /// True when no panel found a record for the subject.
    pub fn is_miss(&self) -> bool {
        self.metadata.is_empty()
            && self.top_samples.is_none()
            && self.all_samples.is_none()
            && self.wash_frequency.is_none()
    }
}

pub fn metadata_view(dataset: &Dataset, subject_id: &str) -> Vec<MetadataEntry> {
    dataset
        .find_metadata(subject_id)
        .map(|record| {
            record
                .fields()
                .map(|(key, value)| MetadataEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn top_samples_view(dataset: &Dataset, subject_id: &str, n: usize) -> Option<BarSeries> {
    top_samples_with_prefix(dataset, subject_id, n, OTU_LABEL_PREFIX)
}

pub fn top_samples_with_prefix(
    dataset: &Dataset,
    subject_id: &str,
    n: usize,
    prefix: &str,
) -> Option<BarSeries> {
    let record = dataset.find_samples(subject_id)?;
    let take = n.min(record.len());

    let values: Vec<f64> = record.sample_values[..take].iter().rev().copied().collect();
    let otu_ids: Vec<u32> = record.otu_ids[..take].iter().rev().copied().collect();
    let labels = otu_ids.iter().map(|id| format!("{}{}", prefix, id)).collect();

    Some(BarSeries {
        values,
        otu_ids,
        labels,
    })
}

pub fn all_samples_view(dataset: &Dataset, subject_id: &str) -> Option<BubbleSeries> {
    dataset.find_samples(subject_id).map(|record| BubbleSeries {
        otu_ids: record.otu_ids.clone(),
        sample_values: record.sample_values.clone(),
        otu_labels: record.otu_labels.clone(),
    })
}

/// Gauge input. `None` when no metadata record matches; a record without
/// `wfreq` yields NaN.
pub fn wash_frequency(dataset: &Dataset, subject_id: &str) -> Option<f64> {
    dataset
        .find_metadata(subject_id)
        .map(|record| record.get(WFREQ_FIELD).map_or(f64::NAN, coerce_number))
}

/// Builder bound to one dataset with the dashboard's top-N and label prefix.
#[derive(Debug, Clone, Copy)]
pub struct SubjectViewBuilder<'a> {
    dataset: &'a Dataset,
    top_n: usize,
    label_prefix: &'a str,
}

impl<'a> SubjectViewBuilder<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            top_n: DEFAULT_TOP_N,
            label_prefix: OTU_LABEL_PREFIX,
        }
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn label_prefix(mut self, prefix: &'a str) -> Self {
        self.label_prefix = prefix;
        self
    }

    pub fn metadata(&self, subject_id: &str) -> Vec<MetadataEntry> {
        metadata_view(self.dataset, subject_id)
    }

    pub fn top_samples(&self, subject_id: &str) -> Option<BarSeries> {
        top_samples_with_prefix(self.dataset, subject_id, self.top_n, self.label_prefix)
    }

    pub fn all_samples(&self, subject_id: &str) -> Option<BubbleSeries> {
        all_samples_view(self.dataset, subject_id)
    }

    pub fn wash_frequency(&self, subject_id: &str) -> Option<f64> {
        wash_frequency(self.dataset, subject_id)
    }

    pub fn build(&self, subject_id: &str) -> SubjectViews {
        SubjectViews {
            subject_id: subject_id.to_string(),
            metadata: self.metadata(subject_id),
            top_samples: self.top_samples(subject_id),
            all_samples: self.all_samples(subject_id),
            wash_frequency: self.wash_frequency(subject_id),
        }
    }
}

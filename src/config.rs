use std::time::Duration;

use crate::data::DataSource;
use crate::views::{DEFAULT_TOP_N, OTU_LABEL_PREFIX};

#[derive(Debug, Clone)]
pub struct Config {
    pub data_source: DataSource,
    /// Bars in the top-N chart
    pub top_n: usize,
    pub label_prefix: String,
    pub fetch_timeout_secs: u64,
    /// Pending selection events before the reader waits
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: DataSource::parse("data/samples.json"),
            top_n: DEFAULT_TOP_N,
            label_prefix: OTU_LABEL_PREFIX.to_string(),
            fetch_timeout_secs: 30,
            event_buffer: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_source: std::env::var("DATA_SOURCE")
                .map(|v| DataSource::parse(&v))
                .unwrap_or(defaults.data_source),
            top_n: std::env::var("TOP_N")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.top_n),
            label_prefix: std::env::var("OTU_LABEL_PREFIX").unwrap_or(defaults.label_prefix),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_timeout_secs),
            event_buffer: std::env::var("EVENT_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.event_buffer),
        }
    }

    /// First CLI argument, when present, replaces the configured source.
    pub fn with_source_arg(mut self, arg: Option<String>) -> Self {
        if let Some(raw) = arg.filter(|a| !a.trim().is_empty()) {
            self.data_source = DataSource::parse(&raw);
        }
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.top_n, 10);
        assert_eq!(cfg.label_prefix, "OTU ");
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_source_arg_overrides() {
        let cfg = Config::default().with_source_arg(Some("other.json".to_string()));
        assert_eq!(cfg.data_source, DataSource::File(PathBuf::from("other.json")));
        let cfg = Config::default().with_source_arg(Some("  ".to_string()));
        assert_eq!(cfg.data_source, DataSource::File(PathBuf::from("data/samples.json")));
    }
}

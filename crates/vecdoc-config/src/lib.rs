mod discovery;

pub use discovery::candidate_paths;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vecdoc_core::VecDocError;

/// Encodings a `StoreConfig` can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Format implied by the file extension (`toml`, `json`, `yaml`, `yml`; any case).
    pub fn for_path(path: &Path) -> Result<Self, VecDocError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(VecDocError::Config(format!(
                "{}: store config must be a .toml, .json, .yaml or .yml file",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        })
    }
}

/// Per-store settings for embedding generation and table shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Model name passed to the embedding provider.
    pub embedding_model: String,
    /// Default number of texts per provider call.
    pub batch_size: usize,
    /// Default pause between provider calls, in milliseconds.
    pub batch_delay_ms: u64,
    /// Upper bound for a single provider call, in milliseconds.
    pub embed_timeout_ms: Option<u64>,
    /// Extra attempts per batch after a provider error or timeout.
    pub max_retries: u32,
    /// Pre-declared embedding dimension. When unset the first stored
    /// document decides it.
    pub dimension: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-small".to_string(),
            batch_size: 100,
            batch_delay_ms: 1000,
            embed_timeout_ms: None,
            max_retries: 0,
            dimension: None,
        }
    }
}

impl StoreConfig {
    /// Load from `path`, or from the first of [`candidate_paths`] that exists.
    ///
    /// An explicit path must exist. Falls back to defaults when discovery
    /// finds nothing.
    pub fn load(path: Option<&Path>) -> Result<Self, VecDocError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match discovery::first_existing() {
                Some(found) => Self::from_file(&found),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, VecDocError> {
        let format = ConfigFormat::for_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            VecDocError::Config(format!("cannot read store config {}: {e}", path.display()))
        })?;
        let config = Self::decode(&content, format).map_err(|e| {
            VecDocError::Config(format!("invalid store config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, VecDocError> {
        let config = Self::decode(content, format)
            .map_err(|e| VecDocError::Config(format!("invalid {format} store config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn decode(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), VecDocError> {
        if self.embedding_model.trim().is_empty() {
            return Err(VecDocError::Config(
                "embedding_model must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(VecDocError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.dimension == Some(0) {
            return Err(VecDocError::Config(
                "dimension must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn embed_timeout(&self) -> Option<Duration> {
        self.embed_timeout_ms.map(Duration::from_millis)
    }
}

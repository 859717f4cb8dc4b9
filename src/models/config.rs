use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "index";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Transcription backend; audio/video providers are disabled when absent.
    #[serde(default)]
    pub transcription: Option<TranscriptionConfig>,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("chunkmill").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            return Ok(config);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate backend-dependent requirements.
    ///
    /// Misconfiguration fails here, at startup, never at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.driver == StoreDriver::PgVector && self.store.url.is_none() {
            return Err(ConfigError::ValidationError(
                "with store driver `pgvector`: store.url is required but was not given".to_string(),
            ));
        }
        validate_collection_name(&self.store.collection)?;

        if let Some(ref stt) = self.transcription
            && stt.url.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "transcription.url must not be empty when a transcription backend is configured"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

static COLLECTION_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid pattern"));

/// Validate a collection/index name against the strictest rules any backend
/// enforces, so one name works across all of them.
pub fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    if name.len() < 2 || name.len() > 128 {
        return Err(ConfigError::ValidationError(
            "invalid collection name: must be between 2 and 128 characters long".to_string(),
        ));
    }
    if !COLLECTION_NAME_PATTERN.is_match(name) {
        return Err(ConfigError::ValidationError(
            "invalid collection name: only lower case ascii letters, numbers, `-` and `_` are allowed"
                .to_string(),
        ));
    }
    Ok(())
}

/// Which vector store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreDriver {
    #[default]
    Qdrant,
    #[serde(rename = "pgvector")]
    PgVector,
    /// Discards writes, returns empty reads. For tests and disabled setups.
    DevNull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub driver: StoreDriver,

    /// Connection URL. Defaults to a local Qdrant for the qdrant driver;
    /// required for pgvector.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: StoreDriver::Qdrant,
            url: None,
            collection: default_collection(),
            api_key: None,
        }
    }
}

impl StoreConfig {
    pub fn qdrant_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string())
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingDriver {
    #[default]
    Http,
    /// Deterministic hash-derived vectors. For tests and disabled setups.
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub driver: EmbeddingDriver,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: u32,

    /// Vector width of the test embedder.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_timeout() -> u64 {
    120
}

fn default_embedding_batch_size() -> u32 {
    8
}

fn default_embedding_dimension() -> u32 {
    1024
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            driver: EmbeddingDriver::Http,
            url: default_embedding_url(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_embedding_batch_size(),
            dimension: default_embedding_dimension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of an OpenAI-compatible transcription API.
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_transcription_model")]
    pub model: String,

    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_transcription_timeout() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Store-write batch size; unset means one batch per file.
    #[serde(default)]
    pub batch_size: Option<usize>,

    /// Files at or above this size run their parse in an isolated worker
    /// (when the provider allows it).
    #[serde(default = "default_filesize_threshold")]
    pub filesize_threshold: u64,

    /// Length of audio segments handed to the transcription backend.
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u64,
}

fn default_filesize_threshold() -> u64 {
    100_000
}

fn default_segment_duration() -> u64 {
    300
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            filesize_threshold: default_filesize_threshold(),
            segment_duration: default_segment_duration(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// SQLite database for ingestion metrics; unset disables recording.
    #[serde(default)]
    pub path: Option<std::path::PathBuf>,
}

use std::sync::Arc;

use ppio_api::{Codec, CodecError, CodecFactory};
use ppio_engine::{ReadOnlyPolicy, TabularCodec};
use ppio_storage_csv::{CsvStorageAdapter, CsvStoreConfig};

pub const CONTENT_TYPE: &str = "text/csv";
pub const EXTENSION: &str = "csv";

// ═══════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct CsvCodecConfig {
    /// Content type the codec registers under (default `text/csv`).
    pub content_type: String,

    /// Scratch file extension (default `csv`).
    pub extension: String,

    /// Encode behavior when the store only grants read-only sessions.
    pub on_read_only: ReadOnlyPolicy,

    #[serde(flatten)]
    pub store: CsvStoreConfig,
}

impl Default for CsvCodecConfig {
    fn default() -> Self {
        Self {
            content_type: CONTENT_TYPE.to_string(),
            extension: EXTENSION.to_string(),
            on_read_only: ReadOnlyPolicy::default(),
            store: CsvStoreConfig::default(),
        }
    }
}

impl CsvCodecConfig {
    pub fn from_json(config_json: &str) -> Result<Self, CodecError> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(config_json)
            .map_err(|e| CodecError::config(format!("csv codec config: {e}")))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Factory
// ═══════════════════════════════════════════════════════════════

/// Builds the CSV codec: a `TabularCodec` over `CsvStorageAdapter`.
pub fn csv_codec(config: &CsvCodecConfig) -> Result<TabularCodec, CodecError> {
    if config.content_type.trim().is_empty() {
        return Err(CodecError::config("CSV: content_type must not be empty"));
    }
    let adapter = CsvStorageAdapter::new(&config.store)?;
    Ok(
        TabularCodec::new(&config.content_type, &config.extension, Arc::new(adapter))
            .with_read_only_policy(config.on_read_only),
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvCodecFactory;

impl CodecFactory for CsvCodecFactory {
    fn name(&self) -> &str {
        "csv"
    }

    fn create(&self, config_json: &str) -> Result<Arc<dyn Codec>, CodecError> {
        let cfg = CsvCodecConfig::from_json(config_json)?;
        let codec = csv_codec(&cfg)?;
        tracing::debug!(
            content_type = %cfg.content_type,
            delimiter = ?cfg.store.delimiter,
            on_read_only = ?cfg.on_read_only,
            "created csv codec"
        );
        Ok(Arc::new(codec))
    }
}

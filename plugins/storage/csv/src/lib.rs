//! Delimited-text storage adapter.
//!
//! Opens a single CSV file either with the infer strategy (header names and
//! column types sampled from content) or with the preserve strategy (schema
//! supplied by `create_schema` and written as the header row, attributes
//! only, geometries as WKT).

mod config;
mod infer;
mod parser;
mod store;

use std::path::Path;

use ppio_api::{CodecError, StoreHandle, Strategy, TabularStorageAdapter};

use config::Options;
pub use config::CsvStoreConfig;
pub use store::CsvStore;

// ════════════════════════════════════════════════════════════════
//  CsvStorageAdapter
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CsvStorageAdapter {
    options: Options,
}

impl CsvStorageAdapter {
    pub fn new(config: &CsvStoreConfig) -> Result<Self, CodecError> {
        Ok(Self {
            options: Options::try_from(config)?,
        })
    }

    pub fn delimiter(&self) -> char {
        self.options.delimiter
    }
}

impl Default for CsvStorageAdapter {
    fn default() -> Self {
        Self {
            options: Options {
                delimiter: ',',
                quoting: true,
                lat_lon: false,
                read_only: false,
            },
        }
    }
}

impl TabularStorageAdapter for CsvStorageAdapter {
    fn name(&self) -> &str {
        "csv"
    }

    fn open(&self, path: &Path, strategy: Strategy) -> Result<Box<dyn StoreHandle>, CodecError> {
        if strategy == Strategy::Infer && !path.is_file() {
            return Err(CodecError::storage(format!(
                "CSV: {} does not exist",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), %strategy, "opened csv store");
        Ok(Box::new(CsvStore::new(path, strategy, self.options)))
    }
}

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EngineError;

/// Root configuration. TOML by default; other formats plug in through
/// `ConfigParser`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Where process scopes create their scratch directories. Defaults to
    /// the system temp directory.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Route structured (non-byte) inputs to the JSON fallback decoder.
    #[serde(default = "default_json_fallback")]
    pub json_fallback: bool,

    /// Codec definitions.
    #[serde(default)]
    pub codecs: Vec<CodecConfig>,
}

fn default_json_fallback() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            json_fallback: default_json_fallback(),
            codecs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodecConfig {
    /// Factory name, e.g. `"csv"`.
    pub plugin: String,
    /// Passed to the factory as JSON.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

impl CodecConfig {
    pub fn config_json(&self) -> Result<String, EngineError> {
        match &self.config {
            Some(v) => serde_json::to_string(v).map_err(|e| EngineError::Config(e.to_string())),
            None => Ok("{}".to_string()),
        }
    }
}

/// A configuration file format.
pub trait ConfigParser {
    /// File extensions handled, without the dot.
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<EngineConfig, EngineError>;
}

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<EngineConfig, EngineError> {
        EngineConfig::parse(content)
    }
}

impl EngineConfig {
    /// Load configuration from a file. The parser is picked by extension
    /// among `parsers`; anything unmatched is read as TOML.
    pub fn load(path: &Path, parsers: &[&dyn ConfigParser]) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let parser = parsers
            .iter()
            .copied()
            .find(|p| p.extensions().contains(&ext.as_str()))
            .unwrap_or(&TomlParser);
        parser
            .parse(&content)
            .map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

use ppio_api::CodecError;

// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct CsvStoreConfig {
    /// Field delimiter (default ","). `"\t"` or `"\\t"` for TSV.
    pub delimiter: String,

    /// RFC 4180 double-quote handling (default true).
    pub quoting: bool,

    /// Infer strategy folds a numeric latitude/longitude column pair into a
    /// `location` point (default false, so plain numeric columns round-trip).
    pub lat_lon: bool,

    /// Sessions are read-only: schema creation still writes the header row,
    /// features cannot be added (default false).
    pub read_only: bool,
}

impl Default for CsvStoreConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            quoting: true,
            lat_lon: false,
            read_only: false,
        }
    }
}

/// Validated options a store works with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Options {
    pub delimiter: char,
    pub quoting: bool,
    pub lat_lon: bool,
    pub read_only: bool,
}

impl TryFrom<&CsvStoreConfig> for Options {
    type Error = CodecError;

    fn try_from(cfg: &CsvStoreConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            delimiter: parse_delimiter(&cfg.delimiter)?,
            quoting: cfg.quoting,
            lat_lon: cfg.lat_lon,
            read_only: cfg.read_only,
        })
    }
}

pub(crate) fn parse_delimiter(s: &str) -> Result<char, CodecError> {
    let mut chars = s.chars();
    let d = match (s, chars.next(), chars.next()) {
        ("\\t", _, _) => '\t',
        (_, Some(c), None) => c,
        (other, _, _) => {
            return Err(CodecError::config(format!(
                "CSV: delimiter must be a single character, got {other:?}"
            )));
        }
    };
    if matches!(d, '"' | '\r' | '\n') {
        return Err(CodecError::config(format!("CSV: {d:?} cannot be used as delimiter")));
    }
    Ok(d)
}

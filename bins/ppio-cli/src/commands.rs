use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ppio_api::{CodecError, CodecFactory, CodecInput, FeatureCollection};
use ppio_config_hcl::HclParser;
use ppio_engine::{CodecConfig, Engine, EngineConfig, EngineError};
use ppio_format_csv::CsvCodecFactory;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid feature collection JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

/// Every codec factory this binary ships with.
pub fn factories() -> Vec<Arc<dyn CodecFactory>> {
    vec![Arc::new(CsvCodecFactory)]
}

/// Engine from a config file, or a CSV-only default when none is given.
pub fn load_engine(config: Option<&Path>) -> Result<Engine, CliError> {
    let config = match config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            EngineConfig::load(path, &[&HclParser])?
        }
        None => EngineConfig {
            codecs: vec![CodecConfig {
                plugin: "csv".to_string(),
                config: None,
            }],
            ..EngineConfig::default()
        },
    };
    tracing::debug!(codecs = config.codecs.len(), "bootstrapping engine");
    Ok(Engine::bootstrap(&config, &factories())?)
}

/// Explicit content type, or the one registered for the file's extension.
pub fn resolve_content_type(
    engine: &Engine,
    explicit: Option<&str>,
    file: Option<&Path>,
) -> Result<String, CliError> {
    if let Some(ct) = explicit {
        return Ok(ct.to_string());
    }
    let ext = file
        .and_then(|p| p.extension())
        .map(|e| e.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::Usage("--content-type is required when the file has no extension".into())
        })?;
    engine
        .registry()
        .by_extension(&ext)
        .map(|c| c.content_type().to_string())
        .ok_or_else(|| CliError::Usage(format!("no codec registered for extension '{ext}'")))
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

// ---- decode ----

pub struct DecodeArgs {
    pub content_type: Option<String>,
    pub input: Option<PathBuf>,
    pub inline: Option<String>,
    pub pretty: bool,
}

/// Decode a file, stdin or inline text and print the collection as JSON.
pub fn decode(engine: &Engine, args: DecodeArgs, out: &mut dyn Write) -> Result<usize, CliError> {
    let content_type =
        resolve_content_type(engine, args.content_type.as_deref(), args.input.as_deref())?;

    let input = match (args.inline, &args.input) {
        (Some(text), None) => CodecInput::from(text),
        (None, Some(path)) if path.as_os_str() != "-" => {
            CodecInput::stream(BufReader::new(File::open(path)?))
        }
        (None, _) => CodecInput::stream(std::io::stdin()),
        (Some(_), Some(_)) => {
            return Err(CliError::Usage("--inline and --input are mutually exclusive".into()));
        }
    };

    let collection = engine.decode(&content_type, input)?;
    let json = collection.to_json();
    if args.pretty {
        serde_json::to_writer_pretty(&mut *out, &json)?;
    } else {
        serde_json::to_writer(&mut *out, &json)?;
    }
    writeln!(out)?;
    Ok(collection.len())
}

pub fn decode_to(
    engine: &Engine,
    args: DecodeArgs,
    output: Option<&Path>,
) -> Result<usize, CliError> {
    let mut out = open_output(output)?;
    let n = decode(engine, args, &mut out)?;
    out.flush()?;
    Ok(n)
}

// ---- encode ----

pub struct EncodeArgs {
    pub content_type: Option<String>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Read a feature collection as JSON and write it in the target format.
pub fn encode(engine: &Engine, args: EncodeArgs, out: &mut dyn Write) -> Result<usize, CliError> {
    let content_type =
        resolve_content_type(engine, args.content_type.as_deref(), args.output.as_deref())?;

    let mut text = String::new();
    match args.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            File::open(path)?.read_to_string(&mut text)?;
        }
        _ => {
            std::io::stdin().read_to_string(&mut text)?;
        }
    }
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let collection = FeatureCollection::from_json(&json)?;

    engine.encode(&content_type, &collection, out)?;
    Ok(collection.len())
}

pub fn encode_to(engine: &Engine, args: EncodeArgs) -> Result<usize, CliError> {
    let output = args.output.clone();
    let mut out = open_output(output.as_deref())?;
    let n = encode(engine, args, &mut out)?;
    out.flush()?;
    Ok(n)
}

// ---- formats ----

pub fn formats(engine: &Engine, out: &mut dyn Write) -> Result<(), CliError> {
    for content_type in engine.registry().content_types() {
        if let Some(codec) = engine.registry().get(&content_type) {
            writeln!(out, "{content_type}\t.{}", codec.file_extension())?;
        }
    }
    Ok(())
}

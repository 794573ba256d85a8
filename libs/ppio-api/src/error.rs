use std::fmt;

/// Category of a codec error. Lets the host decide how to report a failed
/// process parameter without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input shape not recognised and no fallback decoder accepted it.
    UnsupportedInputKind,
    /// Staging input bytes into scratch space failed.
    DecodeIo,
    /// The storage adapter could not derive a schema from content.
    SchemaInference,
    /// The storage adapter rejected a supplied schema.
    SchemaCreation,
    /// Copying the encoded scratch content into the caller's sink failed.
    EncodeIo,
    /// The resolved store session does not accept writes.
    ReadOnlyStore,
    /// Any other adapter-side failure (type mismatch on write, unknown type name).
    Storage,
    /// A feature violates its collection's schema.
    InvalidFeature,
    /// Invalid codec or engine configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedInputKind => f.write_str("unsupported input kind"),
            ErrorKind::DecodeIo => f.write_str("decode io"),
            ErrorKind::SchemaInference => f.write_str("schema inference"),
            ErrorKind::SchemaCreation => f.write_str("schema creation"),
            ErrorKind::EncodeIo => f.write_str("encode io"),
            ErrorKind::ReadOnlyStore => f.write_str("read-only store"),
            ErrorKind::Storage => f.write_str("storage"),
            ErrorKind::InvalidFeature => f.write_str("invalid feature"),
            ErrorKind::Config => f.write_str("config"),
        }
    }
}

/// Error returned by every codec, adapter and scratch-space method.
///
/// Collaborator errors travel to the host unchanged; `with_context` only
/// prefixes the message and never changes the kind.
#[derive(Clone, PartialEq, Eq)]
pub struct CodecError {
    kind: ErrorKind,
    message: String,
}

impl CodecError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn unsupported_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedInputKind, msg)
    }

    pub fn decode_io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeIo, msg)
    }

    pub fn schema_inference(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaInference, msg)
    }

    pub fn schema_creation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaCreation, msg)
    }

    pub fn encode_io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::EncodeIo, msg)
    }

    pub fn read_only(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReadOnlyStore, msg)
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, msg)
    }

    pub fn invalid_feature(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFeature, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Debug for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CodecError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → CodecError with a sensible ErrorKind.
// Call sites that know better (decode vs encode copy) map explicitly.
// ---------------------------------------------------------------------------

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::storage(e.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::config(e.to_string())
    }
}

impl From<std::str::Utf8Error> for CodecError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::schema_inference(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for CodecError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::schema_inference(e.to_string())
    }
}

use ppio_api::{CodecError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("no codec registered for content type '{0}'")]
    UnknownContentType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Codec` variant, context is added to the inner `CodecError`.
    /// For other variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Codec(e) => EngineError::Codec(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Kind of the underlying codec error, if any.
    pub fn codec_kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::Codec(e) => Some(e.kind()),
            _ => None,
        }
    }
}

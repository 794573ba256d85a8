use std::io::{Cursor, Read};

/// A text value wrapped by the host's request model (e.g. an XML text node
/// carrying CSV inline). Exposes its text through `value()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedText {
    value: String,
}

impl WrappedText {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

/// Process input as handed over by the host. The host decides the variant
/// at the boundary; codecs never inspect runtime types.
pub enum CodecInput {
    /// Raw byte stream (request body, uploaded file).
    Stream(Box<dyn Read + Send>),
    /// Raw bytes already in memory.
    Bytes(Vec<u8>),
    /// Plain inline text.
    Text(String),
    /// Inline text wrapped by the host.
    Wrapped(WrappedText),
    /// Anything else; only a fallback decoder can make sense of it.
    Opaque(serde_json::Value),
}

impl CodecInput {
    pub fn kind(&self) -> &'static str {
        match self {
            CodecInput::Stream(_) => "stream",
            CodecInput::Bytes(_) => "bytes",
            CodecInput::Text(_) => "text",
            CodecInput::Wrapped(_) => "wrapped text",
            CodecInput::Opaque(_) => "opaque",
        }
    }

    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        CodecInput::Stream(Box::new(reader))
    }

    /// Text-like and byte inputs as a single byte stream; text is encoded as
    /// UTF-8. `Opaque` is handed back unchanged.
    pub fn into_reader(self) -> Result<Box<dyn Read + Send>, serde_json::Value> {
        match self {
            CodecInput::Stream(r) => Ok(r),
            CodecInput::Bytes(b) => Ok(Box::new(Cursor::new(b))),
            CodecInput::Text(s) => Ok(Box::new(Cursor::new(s.into_bytes()))),
            CodecInput::Wrapped(w) => Ok(Box::new(Cursor::new(w.into_value().into_bytes()))),
            CodecInput::Opaque(v) => Err(v),
        }
    }
}

impl std::fmt::Debug for CodecInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CodecInput").field(&self.kind()).finish()
    }
}

impl From<&str> for CodecInput {
    fn from(s: &str) -> Self {
        CodecInput::Text(s.to_string())
    }
}

impl From<String> for CodecInput {
    fn from(s: String) -> Self {
        CodecInput::Text(s)
    }
}

impl From<Vec<u8>> for CodecInput {
    fn from(b: Vec<u8>) -> Self {
        CodecInput::Bytes(b)
    }
}

impl From<WrappedText> for CodecInput {
    fn from(w: WrappedText) -> Self {
        CodecInput::Wrapped(w)
    }
}

impl From<serde_json::Value> for CodecInput {
    fn from(v: serde_json::Value) -> Self {
        CodecInput::Opaque(v)
    }
}

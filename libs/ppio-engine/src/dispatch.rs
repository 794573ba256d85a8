use std::io::Write;
use std::sync::Arc;

use ppio_api::{Codec, CodecError, CodecInput, FallbackDecoder, FeatureCollection, ScratchSpace};

/// Routes a tagged input to the right decode path of one codec.
///
/// Byte streams go straight through; bytes, text and wrapped text are read
/// as UTF-8 bytes; anything else goes to the fallback decoder, if one is
/// configured.
#[derive(Clone)]
pub struct CodecDispatcher {
    codec: Arc<dyn Codec>,
    fallback: Option<Arc<dyn FallbackDecoder>>,
}

impl std::fmt::Debug for CodecDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecDispatcher")
            .field("content_type", &self.codec.content_type())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl CodecDispatcher {
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self {
            codec,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackDecoder>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn decode(
        &self,
        input: CodecInput,
        scratch: &dyn ScratchSpace,
    ) -> Result<FeatureCollection, CodecError> {
        let kind = input.kind();
        match input.into_reader() {
            Ok(mut reader) => {
                tracing::trace!(
                    content_type = %self.codec.content_type(),
                    kind,
                    "decoding byte input"
                );
                self.codec.decode_stream(&mut reader, scratch)
            }
            Err(opaque) => match &self.fallback {
                Some(fallback) => {
                    tracing::debug!(
                        content_type = %self.codec.content_type(),
                        kind,
                        "delegating to fallback decoder"
                    );
                    fallback.decode(opaque)
                }
                None => Err(CodecError::unsupported_input(format!(
                    "{} codec cannot decode {kind} input and no fallback decoder is configured",
                    self.codec.content_type()
                ))),
            },
        }
    }

    pub fn encode(
        &self,
        value: &FeatureCollection,
        sink: &mut dyn Write,
        scratch: &dyn ScratchSpace,
    ) -> Result<(), CodecError> {
        self.codec.encode(value, sink, scratch)
    }
}

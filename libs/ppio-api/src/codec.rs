use std::any::TypeId;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::CodecError;
use crate::feature::FeatureCollection;
use crate::scratch::ScratchSpace;

/// A format codec: what the host routes a declared content type to.
///
/// - `content_type()` / `file_extension()`: registration surface.
/// - `decode_stream()`: external bytes → `FeatureCollection`.
/// - `encode()`: `FeatureCollection` → external bytes in `sink`.
///
/// The scratch space is passed per call; codecs keep no temporary state.
pub trait Codec: Send + Sync {
    /// MIME-like tag, e.g. `"text/csv"`.
    fn content_type(&self) -> &str;

    /// Canonical file extension without the dot, e.g. `"csv"`.
    fn file_extension(&self) -> &str;

    /// Structured type produced by decode and consumed by encode.
    fn value_type(&self) -> TypeId {
        TypeId::of::<FeatureCollection>()
    }

    fn decode_stream(
        &self,
        input: &mut dyn Read,
        scratch: &dyn ScratchSpace,
    ) -> Result<FeatureCollection, CodecError>;

    fn encode(
        &self,
        value: &FeatureCollection,
        sink: &mut dyn Write,
        scratch: &dyn ScratchSpace,
    ) -> Result<(), CodecError>;
}

/// Generic decoder for inputs no byte-oriented codec understands.
pub trait FallbackDecoder: Send + Sync {
    fn decode(&self, input: serde_json::Value) -> Result<FeatureCollection, CodecError>;
}

/// Builds codecs from configuration.
///
/// `config_json` is the codec's config section rendered as JSON; `"{}"` when
/// absent.
pub trait CodecFactory: Send + Sync {
    /// Name used by `[[codecs]] plugin = "..."`.
    fn name(&self) -> &str;

    fn create(&self, config_json: &str) -> Result<Arc<dyn Codec>, CodecError>;
}

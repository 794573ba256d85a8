use std::io::{Read, Write};
use std::sync::Arc;

use ppio_api::{
    Codec, CodecError, FeatureCollection, ScratchSpace, Session, Strategy, TabularStorageAdapter,
};

/// What encode does when the adapter hands back a read-only session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOnlyPolicy {
    /// Fail the encode with a `ReadOnlyStore` error.
    #[default]
    Fail,
    /// Log a warning and emit the file as it stands (schema only).
    Skip,
}

// ════════════════════════════════════════════════════════════════
//  TabularCodec
// ════════════════════════════════════════════════════════════════

/// Codec for file-backed tabular formats.
///
/// Bytes are staged in a scratch file and handed to a storage adapter:
/// decode opens it with `Strategy::Infer`, encode with `Strategy::Preserve`.
/// The codec holds no per-call state and is shared across threads.
pub struct TabularCodec {
    content_type: String,
    extension: String,
    adapter: Arc<dyn TabularStorageAdapter>,
    read_only: ReadOnlyPolicy,
}

impl std::fmt::Debug for TabularCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabularCodec")
            .field("content_type", &self.content_type)
            .field("extension", &self.extension)
            .field("adapter", &self.adapter.name())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl TabularCodec {
    pub fn new(
        content_type: impl Into<String>,
        extension: impl Into<String>,
        adapter: Arc<dyn TabularStorageAdapter>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
            adapter,
            read_only: ReadOnlyPolicy::default(),
        }
    }

    pub fn with_read_only_policy(mut self, policy: ReadOnlyPolicy) -> Self {
        self.read_only = policy;
        self
    }

    pub fn read_only_policy(&self) -> ReadOnlyPolicy {
        self.read_only
    }

    pub fn adapter(&self) -> &Arc<dyn TabularStorageAdapter> {
        &self.adapter
    }
}

impl Codec for TabularCodec {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn file_extension(&self) -> &str {
        &self.extension
    }

    fn decode_stream(
        &self,
        input: &mut dyn Read,
        scratch: &dyn ScratchSpace,
    ) -> Result<FeatureCollection, CodecError> {
        // --- 1. Stage bytes into a scratch file ---
        let resource = scratch.allocate(&self.extension)?;
        {
            let mut file = resource
                .create()
                .map_err(|e| CodecError::decode_io(e.message()))?;
            let copied = std::io::copy(input, &mut file).map_err(|e| {
                CodecError::decode_io(format!(
                    "stage input into {}: {e}",
                    resource.path().display()
                ))
            })?;
            file.flush()
                .map_err(|e| CodecError::decode_io(format!("flush staged input: {e}")))?;
            tracing::trace!(bytes = copied, path = %resource.path().display(), "staged input");
        }

        // --- 2. Open with the infer strategy and read ---
        // On error the handle is dropped, which closes it without reporting.
        let mut store = self.adapter.open(resource.path(), Strategy::Infer)?;
        let collection = store.read()?;
        store.dispose()?;

        tracing::info!(
            content_type = %self.content_type,
            adapter = %self.adapter.name(),
            features = collection.len(),
            "decoded features"
        );
        Ok(collection)
    }

    fn encode(
        &self,
        value: &FeatureCollection,
        sink: &mut dyn Write,
        scratch: &dyn ScratchSpace,
    ) -> Result<(), CodecError> {
        // --- 1. Fresh scratch file, preserve strategy ---
        let resource = scratch.allocate(&self.extension)?;
        let mut store = self.adapter.open(resource.path(), Strategy::Preserve)?;

        // --- 2. Schema, then features through the session ---
        store.create_schema(value.schema())?;
        let type_name = store.type_name().to_string();
        match store.session(&type_name)? {
            Session::Writable(mut session) => {
                let written = session.write(value)?;
                tracing::debug!(type_name = %type_name, written, "wrote features");
            }
            Session::ReadOnly => match self.read_only {
                ReadOnlyPolicy::Fail => {
                    return Err(CodecError::read_only(format!(
                        "{} store '{type_name}' is read-only",
                        self.adapter.name()
                    )));
                }
                ReadOnlyPolicy::Skip => {
                    tracing::warn!(
                        type_name = %type_name,
                        adapter = %self.adapter.name(),
                        features = value.len(),
                        "store is read-only, features not written"
                    );
                }
            },
        }
        store.dispose()?;

        // --- 3. Copy the finished file into the sink ---
        let mut file = resource
            .open()
            .map_err(|e| CodecError::encode_io(e.message()))?;
        std::io::copy(&mut file, sink)
            .and_then(|_| sink.flush())
            .map_err(|e| CodecError::encode_io(format!("copy encoded output: {e}")))?;

        tracing::info!(
            content_type = %self.content_type,
            adapter = %self.adapter.name(),
            features = value.len(),
            "encoded features"
        );
        Ok(())
    }
}

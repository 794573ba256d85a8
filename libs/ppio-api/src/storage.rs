use std::path::Path;

use crate::error::CodecError;
use crate::feature::FeatureCollection;
use crate::schema::Schema;

/// How a store learns its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Derive field names and types from content. Decode path only.
    Infer,
    /// Accept the schema given to `create_schema` verbatim, no re-inference.
    /// Encode path only.
    Preserve,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Infer => f.write_str("infer"),
            Strategy::Preserve => f.write_str("preserve"),
        }
    }
}

/// Result of resolving a session for a type name.
pub enum Session<'a> {
    Writable(Box<dyn WriteSession + 'a>),
    /// The store was opened without write access.
    ReadOnly,
}

/// Write-capable session. Auto-commit: every `write` is durable in the
/// backing file when it returns; there is no multi-call batch.
pub trait WriteSession {
    /// Append all features, returning how many were written.
    fn write(&mut self, features: &FeatureCollection) -> Result<usize, CodecError>;
}

/// Open adapter session over one backing file.
///
/// Owned by a single codec call. `dispose` releases adapter resources and
/// reports failures; dropping without `dispose` (error paths) must still
/// close everything, silently.
pub trait StoreHandle: Send {
    fn strategy(&self) -> Strategy;

    /// Type name the store exposes (for file stores, the file stem).
    fn type_name(&self) -> &str;

    /// Create the backing schema. Fails with `SchemaCreation` if unsupported.
    fn create_schema(&mut self, schema: &Schema) -> Result<(), CodecError>;

    /// Read every feature. With `Infer`, failures to derive a schema surface
    /// as `SchemaInference`.
    fn read(&mut self) -> Result<FeatureCollection, CodecError>;

    /// Resolve a session for `type_name`.
    fn session(&mut self, type_name: &str) -> Result<Session<'_>, CodecError>;

    fn dispose(self: Box<Self>) -> Result<(), CodecError>;
}

/// Pluggable tabular storage backend. Opening is cheap and side-effect free
/// apart from what the chosen strategy needs.
pub trait TabularStorageAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self, path: &Path, strategy: Strategy) -> Result<Box<dyn StoreHandle>, CodecError>;
}

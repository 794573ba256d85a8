use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::CodecError;

/// A uniquely named, extension-tagged temporary file.
///
/// The handle does not delete anything itself: the `ScratchSpace` that
/// allocated it owns the file and removes it when the enclosing process
/// invocation completes, whatever path the codec call took.
#[derive(Debug, Clone)]
pub struct ScratchResource {
    path: PathBuf,
}

impl ScratchResource {
    /// Only scratch spaces construct resources.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate and open for writing.
    pub fn create(&self) -> Result<File, CodecError> {
        File::create(&self.path)
            .map_err(|e| CodecError::storage(format!("create {}: {e}", self.path.display())))
    }

    pub fn open(&self) -> Result<File, CodecError> {
        File::open(&self.path)
            .map_err(|e| CodecError::storage(format!("open {}: {e}", self.path.display())))
    }
}

/// Temporary resource manager capability, handed to every codec call.
///
/// Implementations must hand out unique names under concurrent allocation
/// and guarantee deletion when the owning process invocation finishes.
pub trait ScratchSpace: Send + Sync {
    /// `extension` without the leading dot, e.g. `"csv"`.
    fn allocate(&self, extension: &str) -> Result<ScratchResource, CodecError>;
}

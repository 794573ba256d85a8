use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::{TempDir, TempPath};

use ppio_api::{CodecError, ScratchResource, ScratchSpace};

// ════════════════════════════════════════════════════════════════
//  ResourceManager
// ════════════════════════════════════════════════════════════════

/// Hands out one `ProcessScope` per process invocation, each in its own
/// directory under `root`.
#[derive(Debug, Clone)]
pub struct ResourceManager {
    root: PathBuf,
}

impl ResourceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scopes under the system temp directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a scope for one process invocation.
    pub fn begin(&self, process: &str) -> Result<ProcessScope, CodecError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            CodecError::storage(format!("scratch root {}: {e}", self.root.display()))
        })?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("ppio-{}-", sanitize(process)))
            .tempdir_in(&self.root)
            .map_err(|e| {
                CodecError::storage(format!("scratch dir under {}: {e}", self.root.display()))
            })?;

        tracing::debug!(process, dir = %dir.path().display(), "began process scope");
        Ok(ProcessScope {
            process: process.to_string(),
            dir: Some(dir),
            resources: Mutex::new(Vec::new()),
        })
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::system()
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ════════════════════════════════════════════════════════════════
//  ProcessScope
// ════════════════════════════════════════════════════════════════

/// Scratch space of a single process invocation.
///
/// Every resource allocated here is deleted by `finish`, or by drop when the
/// invocation unwinds early. Allocation is safe from several threads.
#[derive(Debug)]
pub struct ProcessScope {
    process: String,
    dir: Option<TempDir>,
    resources: Mutex<Vec<TempPath>>,
}

impl ProcessScope {
    pub fn process(&self) -> &str {
        &self.process
    }

    /// Directory holding this scope's resources. Empty once released.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Resources allocated and not yet released.
    pub fn live_resources(&self) -> usize {
        self.lock().len()
    }

    /// Delete every resource and the scope directory. Returns how many
    /// resources were released.
    pub fn finish(mut self) -> Result<usize, CodecError> {
        self.release()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TempPath>> {
        match self.resources.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("scratch resource list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn release(&mut self) -> Result<usize, CodecError> {
        let paths = std::mem::take(&mut *self.lock());
        let released = paths.len();

        let mut failures = Vec::new();
        for path in paths {
            let display = path.display().to_string();
            if let Err(e) = path.close() {
                failures.push(format!("{display}: {e}"));
            }
        }
        if let Some(dir) = self.dir.take() {
            let display = dir.path().display().to_string();
            if let Err(e) = dir.close() {
                failures.push(format!("{display}: {e}"));
            }
        }

        tracing::debug!(process = %self.process, released, "released process scope");
        if failures.is_empty() {
            Ok(released)
        } else {
            Err(CodecError::storage(format!(
                "scratch cleanup for '{}' failed: {}",
                self.process,
                failures.join("; ")
            )))
        }
    }
}

impl ScratchSpace for ProcessScope {
    fn allocate(&self, extension: &str) -> Result<ScratchResource, CodecError> {
        let dir = self.dir.as_ref().ok_or_else(|| {
            CodecError::storage(format!("process scope '{}' already released", self.process))
        })?;
        let suffix = format!(".{}", extension.trim_start_matches('.'));

        // The file is created empty so the name is reserved; the handle is
        // closed right away and only the path is tracked.
        let path = tempfile::Builder::new()
            .prefix("scratch-")
            .suffix(&suffix)
            .tempfile_in(dir.path())
            .map_err(|e| {
                CodecError::storage(format!("allocate scratch in {}: {e}", dir.path().display()))
            })?
            .into_temp_path();

        let resource = ScratchResource::new(path.to_path_buf());
        tracing::trace!(
            process = %self.process,
            path = %resource.path().display(),
            "allocated scratch resource"
        );
        self.lock().push(path);
        Ok(resource)
    }
}

impl Drop for ProcessScope {
    fn drop(&mut self) {
        if self.dir.is_none() {
            return;
        }
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "scratch cleanup on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_unique_and_tagged() {
        let root = tempfile::tempdir().unwrap();
        let scope = ResourceManager::new(root.path()).begin("decode").unwrap();

        let a = scope.allocate("csv").unwrap();
        let b = scope.allocate(".csv").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().extension().unwrap(), "csv");
        assert_eq!(b.path().extension().unwrap(), "csv");
        assert!(a.path().starts_with(scope.path().unwrap()));
        assert_eq!(scope.live_resources(), 2);
    }

    #[test]
    fn finish_deletes_everything() {
        let root = tempfile::tempdir().unwrap();
        let scope = ResourceManager::new(root.path()).begin("encode").unwrap();
        let dir = scope.path().unwrap().to_path_buf();
        let res = scope.allocate("csv").unwrap();
        std::fs::write(res.path(), "a\n1\n").unwrap();

        assert_eq!(scope.finish().unwrap(), 1);
        assert!(!res.path().exists());
        assert!(!dir.exists());
    }

    #[test]
    fn drop_deletes_everything() {
        let root = tempfile::tempdir().unwrap();
        let (dir, path) = {
            let scope = ResourceManager::new(root.path()).begin("p/1").unwrap();
            let res = scope.allocate("csv").unwrap();
            (scope.path().unwrap().to_path_buf(), res.path().to_path_buf())
        };
        assert!(!path.exists());
        assert!(!dir.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn concurrent_allocation() {
        let root = tempfile::tempdir().unwrap();
        let scope = ResourceManager::new(root.path()).begin("many").unwrap();

        let paths: Vec<PathBuf> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| scope.allocate("csv").unwrap().path().to_path_buf()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut unique = paths.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
        assert_eq!(scope.finish().unwrap(), 8);
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn process_name_is_sanitized() {
        assert_eq!(sanitize("a/b c"), "a_b_c");
        assert_eq!(sanitize("decode-7"), "decode-7");
    }
}

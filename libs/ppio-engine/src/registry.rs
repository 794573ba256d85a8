use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ppio_api::{Codec, FallbackDecoder};

use crate::dispatch::CodecDispatcher;

/// `"Text/CSV; charset=utf-8"` → `"text/csv"`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Codecs by content type.
///
/// Uses interior mutability so codecs can be registered after the engine is
/// shared between threads.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn Codec>>>,
    fallback: Option<Arc<dyn FallbackDecoder>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("content_types", &self.content_types())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback handed to every dispatcher this registry builds.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackDecoder>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Codec>>> {
        match self.codecs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("codec registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Codec>>> {
        match self.codecs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("codec registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Register under the codec's own content type. Returns the codec it
    /// replaced, if any.
    pub fn register(&self, codec: Arc<dyn Codec>) -> Option<Arc<dyn Codec>> {
        let key = normalize_content_type(codec.content_type());
        let previous = self.write().insert(key.clone(), codec);
        if previous.is_some() {
            tracing::warn!(content_type = %key, "replaced registered codec");
        }
        previous
    }

    pub fn get(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        self.read().get(&normalize_content_type(content_type)).cloned()
    }

    /// First codec whose file extension matches, ignoring case and a
    /// leading dot. Ties resolve to the smallest content type.
    pub fn by_extension(&self, extension: &str) -> Option<Arc<dyn Codec>> {
        let ext = extension.trim_start_matches('.');
        let guard = self.read();
        let mut matches: Vec<(&String, &Arc<dyn Codec>)> = guard
            .iter()
            .filter(|(_, c)| c.file_extension().eq_ignore_ascii_case(ext))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches.first().map(|(_, c)| Arc::clone(c))
    }

    pub fn dispatcher(&self, content_type: &str) -> Option<CodecDispatcher> {
        let codec = self.get(content_type)?;
        let dispatcher = CodecDispatcher::new(codec);
        Some(match &self.fallback {
            Some(f) => dispatcher.with_fallback(f.clone()),
            None => dispatcher,
        })
    }

    /// Sorted.
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn contains(&self, content_type: &str) -> bool {
        self.read().contains_key(&normalize_content_type(content_type))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use ppio_api::{CodecError, FeatureCollection, ScratchSpace};

    use super::*;

    struct Named(&'static str, &'static str);

    impl Codec for Named {
        fn content_type(&self) -> &str {
            self.0
        }

        fn file_extension(&self) -> &str {
            self.1
        }

        fn decode_stream(
            &self,
            _input: &mut dyn Read,
            _scratch: &dyn ScratchSpace,
        ) -> Result<FeatureCollection, CodecError> {
            Err(CodecError::decode_io("not used"))
        }

        fn encode(
            &self,
            _value: &FeatureCollection,
            _sink: &mut dyn Write,
            _scratch: &dyn ScratchSpace,
        ) -> Result<(), CodecError> {
            Ok(())
        }
    }

    #[test]
    fn lookup_ignores_case_and_parameters() {
        let reg = CodecRegistry::new();
        assert!(reg.register(Arc::new(Named("text/csv", "csv"))).is_none());

        assert!(reg.get("Text/CSV; charset=utf-8").is_some());
        assert!(reg.contains(" text/csv "));
        assert!(reg.get("application/json").is_none());
        assert!(reg.dispatcher("text/csv").is_some());
    }

    #[test]
    fn extension_lookup() {
        let reg = CodecRegistry::new();
        reg.register(Arc::new(Named("text/tab-separated-values", "tsv")));
        reg.register(Arc::new(Named("text/csv", "csv")));

        let codec = reg.by_extension(".CSV").unwrap();
        assert_eq!(codec.content_type(), "text/csv");
        assert!(reg.by_extension("shp").is_none());
        assert_eq!(reg.content_types(), vec!["text/csv", "text/tab-separated-values"]);
    }

    #[test]
    fn re_registering_replaces() {
        let reg = CodecRegistry::new();
        reg.register(Arc::new(Named("text/csv", "csv")));
        let old = reg.register(Arc::new(Named("text/csv", "txt"))).unwrap();
        assert_eq!(old.file_extension(), "csv");
        assert_eq!(reg.get("text/csv").unwrap().file_extension(), "txt");
    }
}

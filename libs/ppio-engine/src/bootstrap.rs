use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ppio_api::{CodecError, CodecFactory, CodecInput, FeatureCollection};

use crate::config::EngineConfig;
use crate::dispatch::CodecDispatcher;
use crate::error::EngineError;
use crate::fallback::JsonFallbackDecoder;
use crate::registry::CodecRegistry;
use crate::scratch::{ProcessScope, ResourceManager};

/// The running engine: registered codecs plus the scratch resource manager.
///
/// Every `decode`/`encode` call is one process invocation with its own
/// scratch scope, released before the call returns. Calls may run
/// concurrently from several threads.
pub struct Engine {
    registry: Arc<CodecRegistry>,
    resources: ResourceManager,
    invocations: AtomicU64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("resources", &self.resources)
            .finish()
    }
}

impl Engine {
    /// Bootstrap the engine from a parsed configuration.
    ///
    /// Each `[[codecs]]` entry is built by the factory of the same name.
    pub fn bootstrap(
        config: &EngineConfig,
        factories: &[Arc<dyn CodecFactory>],
    ) -> Result<Self, EngineError> {
        let mut registry = CodecRegistry::new();
        if config.json_fallback {
            registry = registry.with_fallback(Arc::new(JsonFallbackDecoder::default()));
        }

        for codec_cfg in &config.codecs {
            let codec_ctx = format!("codec plugin '{}'", codec_cfg.plugin);

            let factory = factories
                .iter()
                .find(|f| f.name() == codec_cfg.plugin)
                .ok_or_else(|| EngineError::Config(format!("{codec_ctx}: no such plugin")))?;
            let config_json = codec_cfg
                .config_json()
                .map_err(|e| e.with_context(&codec_ctx))?;
            let codec = factory
                .create(&config_json)
                .map_err(|e| EngineError::from(e).with_context(&codec_ctx))?;

            tracing::info!(
                plugin = %codec_cfg.plugin,
                content_type = %codec.content_type(),
                extension = %codec.file_extension(),
                "registered codec"
            );
            registry.register(codec);
        }

        let resources = match &config.scratch_dir {
            Some(dir) => ResourceManager::new(dir),
            None => ResourceManager::system(),
        };

        Ok(Engine {
            registry: Arc::new(registry),
            resources,
            invocations: AtomicU64::new(0),
        })
    }

    /// Get the codec registry.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    fn dispatcher(&self, content_type: &str) -> Result<CodecDispatcher, EngineError> {
        self.registry
            .dispatcher(content_type)
            .ok_or_else(|| EngineError::UnknownContentType(content_type.to_string()))
    }

    /// Decode `input` declared as `content_type`.
    pub fn decode(
        &self,
        content_type: &str,
        input: CodecInput,
    ) -> Result<FeatureCollection, EngineError> {
        let dispatcher = self.dispatcher(content_type)?;
        self.invoke("decode", |scope| dispatcher.decode(input, scope))
            .map_err(|e| e.with_context(format!("decode {content_type}")))
    }

    /// Encode `value` as `content_type` into `sink`. Nothing reaches the sink
    /// unless the encoded file was completed.
    pub fn encode(
        &self,
        content_type: &str,
        value: &FeatureCollection,
        sink: &mut dyn Write,
    ) -> Result<(), EngineError> {
        let dispatcher = self.dispatcher(content_type)?;
        self.invoke("encode", |scope| dispatcher.encode(value, sink, scope))
            .map_err(|e| e.with_context(format!("encode {content_type}")))
    }

    /// Run `op` as one process invocation with a fresh scratch scope.
    fn invoke<T>(
        &self,
        op: &str,
        f: impl FnOnce(&ProcessScope) -> Result<T, CodecError>,
    ) -> Result<T, EngineError> {
        let id = self.invocations.fetch_add(1, Ordering::Relaxed);
        let scope = self.resources.begin(&format!("{op}-{id}"))?;

        let result = f(&scope);
        match (result, scope.finish()) {
            (Ok(v), Ok(_)) => Ok(v),
            (Ok(_), Err(cleanup)) => Err(cleanup.into()),
            (Err(e), Ok(_)) => Err(e.into()),
            (Err(e), Err(cleanup)) => {
                tracing::warn!(error = %cleanup, "scratch cleanup failed after codec error");
                Err(e.into())
            }
        }
    }
}

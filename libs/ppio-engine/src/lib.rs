//! Host side of the process-parameter codec framework: scratch resource
//! management, the tabular codec built on storage adapters, input dispatch,
//! the content-type registry and configuration bootstrap.

pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod registry;
pub mod scratch;
pub mod tabular;

pub use bootstrap::Engine;
pub use config::{CodecConfig, ConfigParser, EngineConfig, TomlParser};
pub use dispatch::CodecDispatcher;
pub use error::EngineError;
pub use fallback::JsonFallbackDecoder;
pub use registry::CodecRegistry;
pub use scratch::{ProcessScope, ResourceManager};
pub use tabular::{ReadOnlyPolicy, TabularCodec};

pub mod codec;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod input;
pub mod schema;
pub mod scratch;
pub mod storage;
pub mod value;

pub use codec::{Codec, CodecFactory, FallbackDecoder};
pub use error::{CodecError, ErrorKind};
pub use feature::{Feature, FeatureCollection};
pub use geometry::{Coord, Geometry};
pub use input::{CodecInput, WrappedText};
pub use schema::{Field, FieldType, Schema};
pub use scratch::{ScratchResource, ScratchSpace};
pub use storage::{Session, StoreHandle, Strategy, TabularStorageAdapter, WriteSession};
pub use value::Value;

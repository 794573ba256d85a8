//! CSV codec: `text/csv` content through the delimited-text storage adapter.
//!
//! Decode infers the schema from the header row and the cell values; encode
//! writes the schema as the header row and every feature as one record,
//! attributes only, geometries as WKT.

mod codec;

pub use codec::{CONTENT_TYPE, CsvCodecConfig, CsvCodecFactory, EXTENSION, csv_codec};

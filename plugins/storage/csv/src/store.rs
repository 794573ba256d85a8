use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ppio_api::{
    CodecError, FeatureCollection, Schema, Session, StoreHandle, Strategy, WriteSession,
};

use super::config::Options;
use super::infer::{Inferred, convert};
use super::parser::{parse_records, push_header, push_row, split_header};

// ════════════════════════════════════════════════════════════════
//  CsvStore
// ════════════════════════════════════════════════════════════════

/// One delimited-text file opened with a fixed strategy.
///
/// The type name is the file stem. With `Preserve`, the writer opened by
/// `create_schema` lives until `dispose` (or drop).
pub struct CsvStore {
    path: PathBuf,
    type_name: String,
    strategy: Strategy,
    options: Options,
    schema: Option<Schema>,
    writer: Option<BufWriter<File>>,
}

impl CsvStore {
    pub(crate) fn new(path: &Path, strategy: Strategy, options: Options) -> Self {
        let type_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "features".to_string());
        Self {
            path: path.to_path_buf(),
            type_name,
            strategy,
            options,
            schema: None,
            writer: None,
        }
    }

    fn read_text(&self) -> Result<String, CodecError> {
        let bytes = std::fs::read(&self.path)
            .map_err(|e| CodecError::storage(format!("read {}: {e}", self.path.display())))?;
        String::from_utf8(bytes).map_err(|e| {
            let msg = format!("{}: not UTF-8 text: {e}", self.path.display());
            match self.strategy {
                Strategy::Infer => CodecError::schema_inference(msg),
                Strategy::Preserve => CodecError::storage(msg),
            }
        })
    }

    /// Infer strategy: header names + sampled types.
    fn read_inferred(&self) -> Result<FeatureCollection, CodecError> {
        let text = self.read_text()?;
        let records = parse_records(&text, self.options.delimiter, self.options.quoting);
        let Some((header, records)) = split_header(records) else {
            return Err(CodecError::schema_inference(format!(
                "{}: no header row",
                self.path.display()
            )));
        };
        let inferred =
            Inferred::from_records(&self.type_name, &header, &records, self.options.lat_lon)?;

        let mut collection = FeatureCollection::new(inferred.schema.clone());
        for (i, row) in records.iter().enumerate() {
            collection.push_row(inferred.row_values(row, i + 2)?)?;
        }
        Ok(collection)
    }

    /// Preserve strategy: cells parsed with the declared schema, never
    /// re-inferred. The header must match the schema's field names.
    fn read_declared(&self, schema: &Schema) -> Result<FeatureCollection, CodecError> {
        let text = self.read_text()?;
        let records = parse_records(&text, self.options.delimiter, self.options.quoting);
        let mut collection = FeatureCollection::new(schema.clone());
        let Some((header, records)) = split_header(records) else {
            return Ok(collection);
        };

        let names: Vec<&str> = header.iter().map(|c| c.as_deref().unwrap_or("")).collect();
        let expected: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        if names != expected {
            return Err(CodecError::storage(format!(
                "{}: header {names:?} does not match schema {expected:?}",
                self.path.display()
            )));
        }

        for (r, row) in records.iter().enumerate() {
            let mut values = Vec::with_capacity(schema.len());
            for (c, field) in schema.fields().iter().enumerate() {
                let cell = row.get(c).and_then(|c| c.as_deref());
                values.push(convert(cell, field.field_type, r + 2, &field.name)?);
            }
            collection.push_row(values)?;
        }
        Ok(collection)
    }

    fn validate_schema(&self, schema: &Schema) -> Result<(), CodecError> {
        if schema.is_empty() {
            return Err(CodecError::schema_creation("CSV: schema has no fields"));
        }
        for field in schema.fields() {
            if field.name.trim().is_empty() || field.name.trim() != field.name {
                return Err(CodecError::schema_creation(format!(
                    "CSV: field name {:?} is blank or has surrounding whitespace",
                    field.name
                )));
            }
            if field.name.contains(['\n', '\r']) {
                return Err(CodecError::schema_creation(format!(
                    "CSV: field name {:?} contains a line break",
                    field.name
                )));
            }
            if !self.options.quoting
                && (field.name.contains(self.options.delimiter) || field.name.contains('"'))
            {
                return Err(CodecError::schema_creation(format!(
                    "CSV: field name {:?} needs quoting but quoting is disabled",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

impl StoreHandle for CsvStore {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create_schema(&mut self, schema: &Schema) -> Result<(), CodecError> {
        if self.strategy == Strategy::Infer {
            return Err(CodecError::schema_creation(
                "CSV: store opened with the infer strategy does not accept a schema",
            ));
        }
        self.validate_schema(schema)?;

        let mut header = String::new();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        push_header(&mut header, &names, self.options.delimiter, self.options.quoting)
            .map_err(|e| CodecError::schema_creation(e.message()))?;

        let file = File::create(&self.path).map_err(|e| {
            CodecError::schema_creation(format!("create {}: {e}", self.path.display()))
        })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(header.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| CodecError::schema_creation(format!("write header: {e}")))?;

        tracing::debug!(
            path = %self.path.display(),
            fields = schema.len(),
            "created csv schema"
        );
        self.schema = Some(schema.renamed(&self.type_name));
        self.writer = Some(writer);
        Ok(())
    }

    fn read(&mut self) -> Result<FeatureCollection, CodecError> {
        // Pending writes must be visible to the reader.
        if let Some(w) = self.writer.as_mut() {
            w.flush()
                .map_err(|e| CodecError::storage(format!("flush: {e}")))?;
        }
        match (self.strategy, &self.schema) {
            (Strategy::Infer, _) => self.read_inferred(),
            (Strategy::Preserve, Some(schema)) => self.read_declared(schema),
            (Strategy::Preserve, None) => Err(CodecError::storage(
                "CSV: preserve store has no schema; call create_schema first",
            )),
        }
    }

    fn session(&mut self, type_name: &str) -> Result<Session<'_>, CodecError> {
        if type_name != self.type_name {
            return Err(CodecError::storage(format!(
                "CSV: unknown type name '{type_name}', store holds '{}'",
                self.type_name
            )));
        }
        if self.strategy == Strategy::Infer || self.options.read_only {
            return Ok(Session::ReadOnly);
        }
        let (Some(schema), Some(writer)) = (self.schema.as_ref(), self.writer.as_mut()) else {
            return Err(CodecError::storage(
                "CSV: no schema created for this store",
            ));
        };
        Ok(Session::Writable(Box::new(CsvWriteSession {
            schema,
            writer,
            options: self.options,
        })))
    }

    fn dispose(mut self: Box<Self>) -> Result<(), CodecError> {
        if let Some(mut w) = self.writer.take() {
            w.flush()
                .map_err(|e| CodecError::storage(format!("flush {}: {e}", self.path.display())))?;
        }
        tracing::debug!(
            path = %self.path.display(),
            strategy = %self.strategy,
            "disposed csv store"
        );
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════
//  CsvWriteSession
// ════════════════════════════════════════════════════════════════

struct CsvWriteSession<'a> {
    schema: &'a Schema,
    writer: &'a mut BufWriter<File>,
    options: Options,
}

impl WriteSession for CsvWriteSession<'_> {
    fn write(&mut self, features: &FeatureCollection) -> Result<usize, CodecError> {
        if !features.schema().same_fields(self.schema) {
            return Err(CodecError::storage(format!(
                "CSV: features of '{}' do not match store schema '{}'",
                features.schema().name(),
                self.schema.name()
            )));
        }

        let mut buf = String::new();
        for feature in features.features() {
            push_row(&mut buf, feature.values(), self.options.delimiter, self.options.quoting)?;
        }
        self.writer
            .write_all(buf.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| CodecError::storage(format!("write features: {e}")))?;
        Ok(features.len())
    }
}

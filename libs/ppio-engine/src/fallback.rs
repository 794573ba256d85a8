use ppio_api::feature::value_from_json;
use ppio_api::{CodecError, FallbackDecoder, FeatureCollection, Field, FieldType, Schema};

/// Generic decoder for structured (non-byte) inputs.
///
/// Accepts either the interchange form `{"schema": ..., "features": [...]}`
/// or an array of flat JSON objects. For the latter, fields are ordered by
/// key as the JSON map yields them and typed from the values (integers,
/// numbers, strings, `{"wkt": ...}` geometries).
#[derive(Debug, Clone)]
pub struct JsonFallbackDecoder {
    type_name: String,
}

impl Default for JsonFallbackDecoder {
    fn default() -> Self {
        Self::new("features")
    }
}

impl JsonFallbackDecoder {
    /// `type_name` names schemas derived from object arrays.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl FallbackDecoder for JsonFallbackDecoder {
    fn decode(&self, input: serde_json::Value) -> Result<FeatureCollection, CodecError> {
        use serde_json::Value as J;

        match &input {
            J::Object(obj) if obj.contains_key("schema") => FeatureCollection::from_json(&input),
            J::Array(items) => self.decode_objects(items),
            other => Err(CodecError::unsupported_input(format!(
                "fallback decoder expects a feature collection or an array of objects, got {}",
                json_kind(other)
            ))),
        }
    }
}

impl JsonFallbackDecoder {
    fn decode_objects(&self, items: &[serde_json::Value]) -> Result<FeatureCollection, CodecError> {
        // --- 1. Field order by first appearance, type widened per value ---
        let mut columns: Vec<(String, Option<FieldType>)> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let obj = item.as_object().ok_or_else(|| {
                CodecError::unsupported_input(format!(
                    "item {i} is {}, expected an object",
                    json_kind(item)
                ))
            })?;
            for (name, raw) in obj {
                let observed = json_field_type(raw)
                    .map_err(|e| e.with_context(format!("item {i}, field '{name}'")))?;
                let idx = match columns.iter().position(|(n, _)| n == name) {
                    Some(p) => p,
                    None => {
                        columns.push((name.clone(), None));
                        columns.len() - 1
                    }
                };
                let current = columns[idx].1;
                columns[idx].1 = widen(current, observed).ok_or_else(|| {
                    CodecError::invalid_feature(format!(
                        "item {i}, field '{name}': {} values mixed with {}",
                        type_label(current),
                        type_label(observed)
                    ))
                })?;
            }
        }

        // --- 2. Schema; all-null columns are strings ---
        let fields = columns
            .into_iter()
            .map(|(name, t)| Field::new(name, t.unwrap_or(FieldType::String)))
            .collect();
        let schema = Schema::new(self.type_name.clone(), fields)?;

        // --- 3. Features ---
        let mut collection = FeatureCollection::new(schema);
        for (i, item) in items.iter().enumerate() {
            let mut record = Vec::new();
            if let Some(obj) = item.as_object() {
                for (name, raw) in obj {
                    let field_type = collection
                        .schema()
                        .field(name)
                        .map(|f| f.field_type)
                        .unwrap_or(FieldType::String);
                    let value = value_from_json(raw, field_type)
                        .map_err(|e| e.with_context(format!("item {i}, field '{name}'")))?;
                    record.push((name.clone(), value));
                }
            }
            collection.push(record)?;
        }

        tracing::debug!(
            type_name = %self.type_name,
            fields = collection.schema().len(),
            features = collection.len(),
            "decoded object array"
        );
        Ok(collection)
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Field type a single JSON value asks for; `None` for null.
fn json_field_type(raw: &serde_json::Value) -> Result<Option<FieldType>, CodecError> {
    use serde_json::Value as J;

    match raw {
        J::Null => Ok(None),
        J::Number(n) if n.is_i64() => Ok(Some(FieldType::Integer)),
        J::Number(_) => Ok(Some(FieldType::Double)),
        J::String(_) => Ok(Some(FieldType::String)),
        J::Object(obj) if obj.len() == 1 && obj.get("wkt").is_some_and(J::is_string) => {
            Ok(Some(FieldType::Geometry))
        }
        other => Err(CodecError::invalid_feature(format!(
            "{} cannot be a field value",
            json_kind(other)
        ))),
    }
}

/// Least type holding both; `None` when they conflict.
fn widen(a: Option<FieldType>, b: Option<FieldType>) -> Option<Option<FieldType>> {
    match (a, b) {
        (None, t) | (t, None) => Some(t),
        (Some(x), Some(y)) if x == y => Some(Some(x)),
        (Some(FieldType::Integer), Some(FieldType::Double))
        | (Some(FieldType::Double), Some(FieldType::Integer)) => Some(Some(FieldType::Double)),
        _ => None,
    }
}

fn type_label(t: Option<FieldType>) -> String {
    t.map_or_else(|| "null".to_string(), |t| t.to_string())
}

use crate::error::CodecError;
use crate::geometry::Geometry;
use crate::schema::{FieldType, Schema};
use crate::value::Value;

/// One record. Values are positional, aligned with the owning collection's
/// `Schema.fields`; fields a record does not supply hold `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    values: Vec<Value>,
}

impl Feature {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// The structured value exchanged by tabular codecs: ordered features plus
/// the schema they all share.
///
/// Features can only be added through `push`/`push_row`, which enforce that
/// every field is declared by the schema and every value fits its field type.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    schema: Schema,
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            features: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Add a record given as `(field name, value)` pairs. Omitted fields are null.
    pub fn push<I, K, V>(&mut self, record: I) -> Result<(), CodecError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut values = vec![Value::Null; self.schema.len()];
        for (name, value) in record {
            let name = name.as_ref();
            let idx = self.schema.index_of(name).ok_or_else(|| {
                CodecError::invalid_feature(format!(
                    "field '{name}' is not declared by schema '{}'",
                    self.schema.name()
                ))
            })?;
            values[idx] = value.into();
        }
        self.push_row(values)
    }

    /// Add a record given positionally; must have exactly one value per field.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), CodecError> {
        if values.len() != self.schema.len() {
            return Err(CodecError::invalid_feature(format!(
                "feature has {} values, schema '{}' declares {} fields",
                values.len(),
                self.schema.name(),
                self.schema.len()
            )));
        }
        for (field, value) in self.schema.fields().iter().zip(&values) {
            if !value.fits(field.field_type) {
                return Err(CodecError::invalid_feature(format!(
                    "field '{}' is {}, got {value:?}",
                    field.name, field.field_type
                )));
            }
        }
        self.features.push(Feature { values });
        Ok(())
    }

    /// Value of field `name` in feature `index`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        let field_idx = self.schema.index_of(name)?;
        self.features.get(index)?.value(field_idx)
    }

    // ── JSON form ──
    //
    // {"schema": {"name": .., "fields": [{"name": .., "type": ..}]},
    //  "features": [{"field": value, ..}]}
    //
    // Geometries travel as {"wkt": "..."}.

    pub fn to_json(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .features
            .iter()
            .map(|f| {
                let mut obj = serde_json::Map::new();
                for (field, value) in self.schema.fields().iter().zip(f.values()) {
                    obj.insert(field.name.clone(), value_to_json(value));
                }
                serde_json::Value::Object(obj)
            })
            .collect();

        serde_json::json!({
            "schema": self.schema,
            "features": features,
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self, CodecError> {
        let schema_json = json
            .get("schema")
            .ok_or_else(|| CodecError::invalid_feature("missing \"schema\""))?;
        let schema: Schema = serde_json::from_value(schema_json.clone())
            .map_err(|e| CodecError::invalid_feature(format!("schema: {e}")))?;

        let mut collection = FeatureCollection::new(schema);
        let features: &[serde_json::Value] = match json.get("features") {
            Some(serde_json::Value::Array(items)) => items.as_slice(),
            Some(serde_json::Value::Null) | None => &[],
            Some(other) => {
                return Err(CodecError::invalid_feature(format!(
                    "\"features\" must be an array, got {other}"
                )));
            }
        };

        for (i, item) in features.iter().enumerate() {
            let obj = item.as_object().ok_or_else(|| {
                CodecError::invalid_feature(format!("feature {i} is not an object"))
            })?;
            let mut record = Vec::with_capacity(obj.len());
            for (name, raw) in obj {
                let field = collection.schema.field(name).ok_or_else(|| {
                    CodecError::invalid_feature(format!("feature {i}: unknown field '{name}'"))
                })?;
                let value = value_from_json(raw, field.field_type)
                    .map_err(|e| e.with_context(format!("feature {i}, field '{name}'")))?;
                record.push((name.clone(), value));
            }
            collection.push(record)?;
        }
        Ok(collection)
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Integer(v) => serde_json::Value::Number((*v).into()),
        Value::Double(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Geometry(g) => serde_json::json!({ "wkt": g.to_string() }),
    }
}

/// Convert a JSON scalar into a value of the requested field type.
pub fn value_from_json(
    raw: &serde_json::Value,
    field_type: FieldType,
) -> Result<Value, CodecError> {
    use serde_json::Value as J;

    let mismatch = || CodecError::invalid_feature(format!("expected {field_type}, got {raw}"));

    match (field_type, raw) {
        (_, J::Null) => Ok(Value::Null),
        (FieldType::String, J::String(s)) => Ok(Value::String(s.clone())),
        (FieldType::Integer, J::Number(n)) => n.as_i64().map(Value::Integer).ok_or_else(mismatch),
        (FieldType::Double, J::Number(n)) => n.as_f64().map(Value::Double).ok_or_else(mismatch),
        (FieldType::Geometry, J::String(wkt)) => parse_wkt(wkt),
        (FieldType::Geometry, J::Object(obj)) => match obj.get("wkt") {
            Some(J::String(wkt)) => parse_wkt(wkt),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn parse_wkt(wkt: &str) -> Result<Value, CodecError> {
    wkt.parse::<Geometry>()
        .map(Value::Geometry)
        .map_err(|e| CodecError::invalid_feature(e.to_string()))
}

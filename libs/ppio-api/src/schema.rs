use std::collections::HashSet;

use crate::error::CodecError;

/// Attribute type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Double,
    Geometry,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Integer => f.write_str("integer"),
            FieldType::Double => f.write_str("double"),
            FieldType::Geometry => f.write_str("geometry"),
        }
    }
}

/// A single named, typed field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered field list shared by every feature of a collection.
///
/// Field position determines the index into `Feature` values. Names are
/// unique and non-empty; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, CodecError> {
        let name = name.into();
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(CodecError::schema_creation(format!(
                    "schema '{name}': empty field name"
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(CodecError::schema_creation(format!(
                    "schema '{name}': duplicate field '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { name, fields })
    }

    /// Type name under which stores expose this schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Same field names, order and types; the schema name is ignored.
    pub fn same_fields(&self, other: &Schema) -> bool {
        self.fields == other.fields
    }

    /// Copy of this schema under a different type name.
    pub fn renamed(&self, name: impl Into<String>) -> Schema {
        Schema {
            name: name.into(),
            fields: self.fields.clone(),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Schema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            name: String,
            fields: Vec<Field>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Schema::new(raw.name, raw.fields).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_names() {
        let err = Schema::new(
            "t",
            vec![Field::new("a", FieldType::String), Field::new("a", FieldType::Integer)],
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaCreation);
    }

    #[test]
    fn deserialize_validates() {
        let json = r#"{"name":"t","fields":[{"name":"x","type":"double"},{"name":"","type":"string"}]}"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());

        let json = r#"{"name":"t","fields":[{"name":"x","type":"double"}]}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.fields()[0], Field::new("x", FieldType::Double));
    }
}

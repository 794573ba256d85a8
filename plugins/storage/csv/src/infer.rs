use ppio_api::{CodecError, Field, FieldType, Geometry, Schema, Value};

use super::parser::Cell;

const LAT_NAMES: [&str; 2] = ["lat", "latitude"];
const LON_NAMES: [&str; 4] = ["lon", "lng", "long", "longitude"];
const LOCATION: &str = "location";

/// Column layout derived from content: header names plus inferred types,
/// and the optional lat/lon pair folded into a point.
pub(crate) struct Inferred {
    pub schema: Schema,
    columns: Vec<FieldType>,
    lat_lon: Option<(usize, usize)>,
}

fn has_digit(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
}

fn is_integer(s: &str) -> bool {
    has_digit(s) && s.trim().parse::<i64>().is_ok()
}

fn is_double(s: &str) -> bool {
    has_digit(s) && s.trim().parse::<f64>().is_ok()
}

fn is_geometry(s: &str) -> bool {
    Geometry::looks_like_wkt(s) && s.parse::<Geometry>().is_ok()
}

/// Most specific type every non-empty cell satisfies. Integer → Double →
/// Geometry → String; a column with no values is a string column.
fn column_type<'a>(mut values: impl Iterator<Item = &'a str> + Clone) -> FieldType {
    if values.clone().next().is_none() {
        return FieldType::String;
    }
    if values.clone().all(is_integer) {
        FieldType::Integer
    } else if values.clone().all(is_double) {
        FieldType::Double
    } else if values.all(is_geometry) {
        FieldType::Geometry
    } else {
        FieldType::String
    }
}

fn cell_text(row: &[Cell], col: usize) -> Option<&str> {
    row.get(col).and_then(|c| c.as_deref())
}

/// Parse a cell as `field_type`; `row`/`col` only feed the message.
pub(crate) fn convert(
    cell: Option<&str>,
    field_type: FieldType,
    row: usize,
    col: &str,
) -> Result<Value, CodecError> {
    let Some(text) = cell else {
        return Ok(Value::Null);
    };
    let bad = || {
        CodecError::storage(format!(
            "row {row}, column '{col}': {text:?} is not a valid {field_type}"
        ))
    };
    match field_type {
        FieldType::String => Ok(Value::String(text.to_string())),
        FieldType::Integer => text.trim().parse().map(Value::Integer).map_err(|_| bad()),
        FieldType::Double => text.trim().parse().map(Value::Double).map_err(|_| bad()),
        FieldType::Geometry => text.parse().map(Value::Geometry).map_err(|_| bad()),
    }
}

impl Inferred {
    /// Derive the schema from the header and all data rows.
    ///
    /// Rows shorter than the header are padded with nulls; rows longer than
    /// the header are rejected.
    pub fn from_records(
        type_name: &str,
        header: &[Cell],
        rows: &[Vec<Cell>],
        lat_lon: bool,
    ) -> Result<Self, CodecError> {
        let mut names = Vec::with_capacity(header.len());
        for (i, cell) in header.iter().enumerate() {
            match cell.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => names.push(name.to_string()),
                _ => {
                    return Err(CodecError::schema_inference(format!(
                        "header column {} has no name",
                        i + 1
                    )));
                }
            }
        }

        for (r, row) in rows.iter().enumerate() {
            if row.len() > names.len() {
                return Err(CodecError::schema_inference(format!(
                    "row {} has {} values but the header declares {} columns",
                    r + 2,
                    row.len(),
                    names.len()
                )));
            }
        }

        let columns: Vec<FieldType> = (0..names.len())
            .map(|col| column_type(rows.iter().filter_map(move |row| cell_text(row, col))))
            .collect();

        let pair = if lat_lon { find_lat_lon(&names, &columns) } else { None };

        let mut fields: Vec<Field> = names
            .iter()
            .zip(&columns)
            .enumerate()
            .filter(|(i, _)| pair.is_none_or(|(lat, lon)| *i != lat && *i != lon))
            .map(|(_, (name, t))| Field::new(name.clone(), *t))
            .collect();
        if pair.is_some() {
            fields.push(Field::new(LOCATION, FieldType::Geometry));
        }

        let schema = Schema::new(type_name, fields)
            .map_err(|e| CodecError::schema_inference(e.message()))?;

        Ok(Self {
            schema,
            columns,
            lat_lon: pair,
        })
    }

    /// Convert one raw row into schema-ordered values.
    pub fn row_values(&self, row: &[Cell], row_no: usize) -> Result<Vec<Value>, CodecError> {
        let mut values = Vec::with_capacity(self.schema.len());
        for (col, field_type) in self.columns.iter().enumerate() {
            if self.lat_lon.is_some_and(|(lat, lon)| col == lat || col == lon) {
                continue;
            }
            let name = &self.schema.fields()[values.len()].name;
            values.push(convert(cell_text(row, col), *field_type, row_no, name)?);
        }
        if let Some((lat, lon)) = self.lat_lon {
            let y = convert(cell_text(row, lat), self.columns[lat], row_no, "lat")?;
            let x = convert(cell_text(row, lon), self.columns[lon], row_no, "lon")?;
            values.push(match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Value::Geometry(Geometry::point(x, y)),
                _ => Value::Null,
            });
        }
        Ok(values)
    }
}

fn find_lat_lon(names: &[String], columns: &[FieldType]) -> Option<(usize, usize)> {
    if names.iter().any(|n| n.eq_ignore_ascii_case(LOCATION)) {
        return None;
    }
    let numeric = |i: &usize| matches!(columns[*i], FieldType::Integer | FieldType::Double);
    let find = |candidates: &[&str]| {
        names
            .iter()
            .position(|n| candidates.iter().any(|c| n.eq_ignore_ascii_case(c)))
            .filter(|i| numeric(i))
    };
    Some((find(&LAT_NAMES)?, find(&LON_NAMES)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_records, split_header};

    fn infer(text: &str, lat_lon: bool) -> Result<(Inferred, Vec<Vec<Cell>>), CodecError> {
        let (header, recs) = split_header(parse_records(text, ',', true)).unwrap();
        let inferred = Inferred::from_records("t", &header, &recs, lat_lon)?;
        Ok((inferred, recs))
    }

    fn types(i: &Inferred) -> Vec<FieldType> {
        i.schema.fields().iter().map(|f| f.field_type).collect()
    }

    #[test]
    fn most_specific_types() {
        let (i, _) = infer("n,x,s,g,e\n1,1.5,a,POINT (1 2),\n2,3,7,\"LINESTRING (0 0, 1 1)\",\n", false).unwrap();
        assert_eq!(
            types(&i),
            vec![
                FieldType::Integer,
                FieldType::Double,
                FieldType::String,
                FieldType::Geometry,
                FieldType::String
            ]
        );
    }

    #[test]
    fn words_like_nan_stay_strings() {
        let (i, _) = infer("w\nNaN\ninf\n", false).unwrap();
        assert_eq!(types(&i), vec![FieldType::String]);
    }

    #[test]
    fn lat_lon_pair_becomes_location() {
        let (i, recs) = infer("name,Latitude,lon\nA,37.5,-122.25\nB,,\n", true).unwrap();
        assert_eq!(
            i.schema.fields(),
            &[Field::new("name", FieldType::String), Field::new("location", FieldType::Geometry)]
        );
        assert_eq!(
            i.row_values(&recs[0], 2).unwrap(),
            vec![Value::from("A"), Value::Geometry(Geometry::point(-122.25, 37.5))]
        );
        assert_eq!(i.row_values(&recs[1], 3).unwrap(), vec![Value::from("B"), Value::Null]);
    }

    #[test]
    fn lat_lon_disabled_keeps_columns() {
        let (i, _) = infer("lat,lon\n1.5,2.5\n", false).unwrap();
        assert_eq!(types(&i), vec![FieldType::Double, FieldType::Double]);
    }

    #[test]
    fn short_rows_pad_long_rows_fail() {
        let (i, recs) = infer("a,b,c\n1,2\n", false).unwrap();
        assert_eq!(
            i.row_values(&recs[0], 2).unwrap(),
            vec![Value::Integer(1), Value::Integer(2), Value::Null]
        );

        let err = infer("a,b\n1,2,3\n", false).err().unwrap();
        assert_eq!(err.kind(), ppio_api::ErrorKind::SchemaInference);
        assert!(err.message().contains("row 2 has 3 values"));
    }

    #[test]
    fn header_problems_are_inference_errors() {
        let err = infer("a,,c\n", false).err().unwrap();
        assert_eq!(err.kind(), ppio_api::ErrorKind::SchemaInference);
        let err = infer("a,a\n1,2\n", false).err().unwrap();
        assert_eq!(err.kind(), ppio_api::ErrorKind::SchemaInference);
    }
}

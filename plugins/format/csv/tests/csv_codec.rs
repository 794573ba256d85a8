use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use ppio_api::{
    Codec, CodecInput, ErrorKind, FeatureCollection, Field, FieldType, Geometry,
    Schema, Value, WrappedText,
};
use ppio_engine::{CodecConfig, Engine, EngineConfig, EngineError, ResourceManager};
use ppio_format_csv::{CsvCodecConfig, CsvCodecFactory, csv_codec};

use tempfile::tempdir;

fn engine_with(scratch: &Path, config: serde_json::Value) -> Engine {
    let config = EngineConfig {
        scratch_dir: Some(scratch.to_path_buf()),
        codecs: vec![CodecConfig {
            plugin: "csv".to_string(),
            config: Some(config),
        }],
        ..EngineConfig::default()
    };
    Engine::bootstrap(&config, &[Arc::new(CsvCodecFactory)]).unwrap()
}

fn engine(scratch: &Path) -> Engine {
    engine_with(scratch, serde_json::json!({}))
}

fn scratch_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}

fn wells() -> FeatureCollection {
    let schema = Schema::new(
        "wells",
        vec![
            Field::new("id", FieldType::Integer),
            Field::new("name", FieldType::String),
            Field::new("depth", FieldType::Double),
            Field::new("geom", FieldType::Geometry),
        ],
    )
    .unwrap();
    let mut fc = FeatureCollection::new(schema);
    fc.push([
        ("id", Value::from(1i64)),
        ("name", Value::from("Alpha, north")),
        ("depth", Value::from(12.0)),
        ("geom", Value::from(Geometry::point(10.25, -3.5))),
    ])
    .unwrap();
    fc.push([
        ("id", Value::from(2i64)),
        ("name", Value::from("say \"hi\"\nthere")),
        ("depth", Value::from(0.1 + 0.2)),
    ])
    .unwrap();
    fc.push([
        ("id", Value::from(-3i64)),
        ("name", Value::from("")),
        ("geom", Value::from("LINESTRING (0 0, 1 1.5)".parse::<Geometry>().unwrap())),
    ])
    .unwrap();
    fc
}

fn encode_to_vec(engine: &Engine, fc: &FeatureCollection) -> Vec<u8> {
    let mut out = Vec::new();
    engine.encode("text/csv", fc, &mut out).unwrap();
    out
}

// ---- Round trip ----

#[test]
fn round_trip_preserves_names_types_and_order() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let original = wells();

    let bytes = encode_to_vec(&engine, &original);
    let back = engine.decode("text/csv", CodecInput::from(bytes)).unwrap();

    assert!(back.schema().same_fields(original.schema()), "{:?}", back.schema());
    assert_eq!(back.features(), original.features());
    assert_eq!(back.get(1, "depth"), Some(&Value::Double(0.1 + 0.2)));
}

#[test]
fn string_and_byte_inputs_decode_identically() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let text = "a,b\n1,2\n";

    let inputs = [
        CodecInput::from(text),
        CodecInput::from(text.as_bytes().to_vec()),
        CodecInput::stream(Cursor::new(text.as_bytes().to_vec())),
        CodecInput::from(WrappedText::new(text)),
    ];
    let decoded: Vec<FeatureCollection> = inputs
        .into_iter()
        .map(|input| engine.decode("text/csv", input).unwrap())
        .collect();

    let first = &decoded[0];
    assert_eq!(
        first.schema().fields(),
        &[Field::new("a", FieldType::Integer), Field::new("b", FieldType::Integer)]
    );
    assert_eq!(first.get(0, "b"), Some(&Value::Integer(2)));
    for other in &decoded[1..] {
        assert!(other.schema().same_fields(first.schema()));
        assert_eq!(other.features(), first.features());
    }
}

// ---- Empty input ----

#[test]
fn empty_collection_is_header_only() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let schema = Schema::new(
        "empty",
        vec![Field::new("code", FieldType::String), Field::new("label", FieldType::String)],
    )
    .unwrap();
    let empty = FeatureCollection::new(schema);

    let bytes = encode_to_vec(&engine, &empty);
    assert_eq!(bytes, b"code,label\n");

    let back = engine.decode("text/csv", CodecInput::from(bytes)).unwrap();
    assert!(back.is_empty());
    assert!(back.schema().same_fields(empty.schema()));
}

#[test]
fn empty_collection_keeps_field_order() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let empty = FeatureCollection::new(wells().schema().clone());

    let bytes = encode_to_vec(&engine, &empty);
    let back = engine.decode("text/csv", CodecInput::from(bytes)).unwrap();
    let names: Vec<&str> = back.schema().fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "depth", "geom"]);
    assert!(back.is_empty());
}

#[test]
fn empty_bytes_cannot_be_inferred() {
    let scratch = tempdir().unwrap();
    let err = engine(scratch.path())
        .decode("text/csv", CodecInput::from(Vec::new()))
        .unwrap_err();
    assert_eq!(err.codec_kind(), Some(ErrorKind::SchemaInference));
}

// ---- Resource cleanup ----

#[test]
fn scratch_released_after_success_and_failure() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());

    encode_to_vec(&engine, &wells());
    assert_eq!(scratch_entries(scratch.path()), 0);

    engine.decode("text/csv", CodecInput::from("x\n1\n")).unwrap();
    assert_eq!(scratch_entries(scratch.path()), 0);

    let err = engine
        .decode("text/csv", CodecInput::from("a,b\n1,2,3\n"))
        .unwrap_err();
    assert_eq!(err.codec_kind(), Some(ErrorKind::SchemaInference));
    assert_eq!(scratch_entries(scratch.path()), 0);

    let bad = Schema::new("bad", vec![Field::new("two\nlines", FieldType::String)]).unwrap();
    let mut out = Vec::new();
    let err = engine
        .encode("text/csv", &FeatureCollection::new(bad), &mut out)
        .unwrap_err();
    assert_eq!(err.codec_kind(), Some(ErrorKind::SchemaCreation));
    assert!(out.is_empty());
    assert_eq!(scratch_entries(scratch.path()), 0);
}

#[test]
fn failing_input_stream_is_decode_io_and_released() {
    struct Broken(usize);
    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0 == 0 {
                return Err(std::io::Error::other("peer went away"));
            }
            self.0 -= 1;
            buf[0] = b'a';
            Ok(1)
        }
    }

    let scratch = tempdir().unwrap();
    let err = engine(scratch.path())
        .decode("text/csv", CodecInput::stream(Broken(3)))
        .unwrap_err();
    assert_eq!(err.codec_kind(), Some(ErrorKind::DecodeIo));
    assert_eq!(scratch_entries(scratch.path()), 0);
}

#[test]
fn codec_allocations_live_until_scope_finishes() {
    let scratch = tempdir().unwrap();
    let codec = csv_codec(&CsvCodecConfig::default()).unwrap();
    let scope = ResourceManager::new(scratch.path()).begin("manual").unwrap();

    let mut out = Vec::new();
    codec.encode(&wells(), &mut out, &scope).unwrap();
    codec.decode_stream(&mut out.as_slice(), &scope).unwrap();
    assert_eq!(scope.live_resources(), 2);

    assert_eq!(scope.finish().unwrap(), 2);
    assert_eq!(scratch_entries(scratch.path()), 0);
}

// ---- Schema fidelity ----

#[test]
fn encode_writes_declared_schema_verbatim() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let schema = Schema::new(
        "codes",
        vec![
            Field::new("ratio", FieldType::Double),
            Field::new("code", FieldType::String),
            Field::new("count", FieldType::Integer),
        ],
    )
    .unwrap();
    let mut fc = FeatureCollection::new(schema);
    fc.push([
        ("ratio", Value::from(2.0)),
        ("code", Value::from("007")),
        ("count", Value::from(5i64)),
    ])
    .unwrap();

    let text = String::from_utf8(encode_to_vec(&engine, &fc)).unwrap();
    assert_eq!(text, "ratio,code,count\n2.0,007,5\n");
}

// ---- Malformed content ----

#[test]
fn short_rows_are_padded_with_nulls() {
    let scratch = tempdir().unwrap();
    let fc = engine(scratch.path())
        .decode("text/csv", CodecInput::from("a,b,c\n1,x\n2,y,3.5\n"))
        .unwrap();

    assert_eq!(fc.len(), 2);
    assert_eq!(fc.get(0, "c"), Some(&Value::Null));
    assert_eq!(fc.get(1, "c"), Some(&Value::Double(3.5)));
}

#[test]
fn long_rows_are_inference_errors() {
    let scratch = tempdir().unwrap();
    let err = engine(scratch.path())
        .decode("text/csv", CodecInput::from("a,b\n1,2\n3,4,5\n"))
        .unwrap_err();

    assert_eq!(err.codec_kind(), Some(ErrorKind::SchemaInference));
    assert!(err.to_string().contains("row 3 has 3 values"), "{err}");
}

#[test]
fn lat_lon_columns_fold_into_location_when_enabled() {
    let scratch = tempdir().unwrap();
    let fc = engine_with(scratch.path(), serde_json::json!({ "lat_lon": true }))
        .decode("text/csv", CodecInput::from("name,lat,lon\nA,46.5,6.25\n"))
        .unwrap();

    assert_eq!(
        fc.schema().fields(),
        &[Field::new("name", FieldType::String), Field::new("location", FieldType::Geometry)]
    );
    assert_eq!(fc.get(0, "location"), Some(&Value::from(Geometry::point(6.25, 46.5))));

    let plain = engine(scratch.path())
        .decode("text/csv", CodecInput::from("name,lat,lon\nA,46.5,6.25\n"))
        .unwrap();
    assert_eq!(plain.schema().len(), 3);
}

#[test]
fn lat_lon_doubles_round_trip_by_default() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let schema = Schema::new(
        "points",
        vec![Field::new("lat", FieldType::Double), Field::new("lon", FieldType::Double)],
    )
    .unwrap();
    let mut fc = FeatureCollection::new(schema.clone());
    fc.push_row(vec![Value::Double(46.5), Value::Double(6.25)]).unwrap();

    let text = encode_to_vec(&engine, &fc);
    let back = engine.decode("text/csv", CodecInput::from(text)).unwrap();

    assert_eq!(back.schema().fields(), schema.fields());
    assert_eq!(back.get(0, "lat"), Some(&Value::Double(46.5)));
    assert_eq!(back.get(0, "lon"), Some(&Value::Double(6.25)));
}

#[test]
fn single_column_nulls_keep_their_rows() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let schema = Schema::new("tags", vec![Field::new("tag", FieldType::String)]).unwrap();
    let mut fc = FeatureCollection::new(schema);
    for value in [Value::from("a"), Value::Null, Value::from("b"), Value::Null] {
        fc.push_row(vec![value]).unwrap();
    }

    let text = encode_to_vec(&engine, &fc);
    let back = engine.decode("text/csv", CodecInput::from(text)).unwrap();

    assert_eq!(back.len(), 4);
    assert_eq!(back.features(), fc.features());
}

#[test]
fn non_finite_doubles_fail_encode() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());
    let schema = Schema::new("m", vec![Field::new("v", FieldType::Double)]).unwrap();
    let mut fc = FeatureCollection::new(schema);
    fc.push_row(vec![Value::Double(1.5)]).unwrap();
    fc.push_row(vec![Value::Double(f64::NAN)]).unwrap();

    let mut out = Vec::new();
    let err = engine.encode("text/csv", &fc, &mut out).unwrap_err();

    assert_eq!(err.codec_kind(), Some(ErrorKind::Storage));
    assert!(out.is_empty());
    assert_eq!(scratch_entries(scratch.path()), 0);
}

// ---- Concurrency ----

#[test]
fn concurrent_encodes_do_not_mix() {
    let scratch = tempdir().unwrap();
    let engine = engine(scratch.path());

    let collections: Vec<FeatureCollection> = (0..8i64)
        .map(|n| {
            let schema = Schema::new(
                format!("batch{n}"),
                vec![Field::new("batch", FieldType::Integer), Field::new("row", FieldType::Integer)],
            )
            .unwrap();
            let mut fc = FeatureCollection::new(schema);
            for row in 0..=n {
                fc.push_row(vec![Value::Integer(n), Value::Integer(row)]).unwrap();
            }
            fc
        })
        .collect();

    let shared = &engine;
    let outputs: Vec<Vec<u8>> = std::thread::scope(|s| {
        let handles: Vec<_> = collections
            .iter()
            .map(|fc| s.spawn(move || encode_to_vec(shared, fc)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (fc, bytes) in collections.iter().zip(outputs) {
        let back = engine.decode("text/csv", CodecInput::from(bytes)).unwrap();
        assert_eq!(back.features(), fc.features());
    }
    assert_eq!(scratch_entries(scratch.path()), 0);
}

// ---- Read-only stores ----

#[test]
fn read_only_store_fails_encode_by_default() {
    let scratch = tempdir().unwrap();
    let engine = engine_with(scratch.path(), serde_json::json!({ "read_only": true }));

    let mut out = Vec::new();
    let err = engine.encode("text/csv", &wells(), &mut out).unwrap_err();
    assert_eq!(err.codec_kind(), Some(ErrorKind::ReadOnlyStore));
    assert!(out.is_empty());
    assert_eq!(scratch_entries(scratch.path()), 0);
}

#[test]
fn read_only_store_can_be_skipped() {
    let scratch = tempdir().unwrap();
    let engine = engine_with(
        scratch.path(),
        serde_json::json!({ "read_only": true, "on_read_only": "skip" }),
    );

    let out = encode_to_vec(&engine, &wells());
    assert_eq!(out, b"id,name,depth,geom\n");
}

// ---- Dispatch ----

#[test]
fn structured_input_goes_to_fallback() {
    let scratch = tempdir().unwrap();
    let original = wells();
    let fc = engine(scratch.path())
        .decode("text/csv; charset=utf-8", CodecInput::from(original.to_json()))
        .unwrap();
    assert_eq!(fc, original);
}

#[test]
fn structured_input_without_fallback_is_unsupported() {
    let scratch = tempdir().unwrap();
    let config = EngineConfig {
        scratch_dir: Some(scratch.path().to_path_buf()),
        json_fallback: false,
        codecs: vec![CodecConfig {
            plugin: "csv".to_string(),
            config: None,
        }],
    };
    let engine = Engine::bootstrap(&config, &[Arc::new(CsvCodecFactory)]).unwrap();

    let err = engine
        .decode("text/csv", CodecInput::from(serde_json::json!({"a": 1})))
        .unwrap_err();
    assert_eq!(err.codec_kind(), Some(ErrorKind::UnsupportedInputKind));
}

#[test]
fn bad_codec_config_fails_bootstrap() {
    let config = EngineConfig {
        codecs: vec![CodecConfig {
            plugin: "csv".to_string(),
            config: Some(serde_json::json!({ "delimiter": "ab" })),
        }],
        ..EngineConfig::default()
    };
    let err = Engine::bootstrap(&config, &[Arc::new(CsvCodecFactory)]).unwrap_err();
    assert!(matches!(err, EngineError::Codec(ref e) if e.kind() == ErrorKind::Config));
}

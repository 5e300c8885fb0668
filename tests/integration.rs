//! Integration tests: round trips through every protocol, marshaled headers,
//! transcoding, forward compatibility, runtime schemas loaded from files.

#![cfg(all(feature = "compact", feature = "simple", feature = "json"))]

use bondcore::{
    bond_enum, bond_record, marshal, marshal_to_vec, marshal_value, select_protocol_and_apply, serialize, transcode,
    unmarshal, unmarshal_value, CompactReader, CompactWriter, CoreError, JsonDocument, JsonWriter, ProtocolType, Record,
    SchemaDef, SimpleReader, SimpleVersion, SimpleWriter, ToValue, Value, WString,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

bond_enum! {
    pub enum Color {
        Red = 0,
        Green = 1,
        Blue = 2,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Point("tests.Point") {
        1 => Required x: i32,
        2 => Optional y: i32 = bondcore::DefaultValue::Int(-1),
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Shape("tests.Shape") {
        0 => Optional id: u64,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Polygon("tests.Polygon"): Shape {
        1 => Optional name: String,
        2 => Optional wide: WString,
        3 => Optional color: Color,
        4 => Optional points: Vec<Point>,
        5 => Optional tags: BTreeSet<String>,
        6 => Optional weights: BTreeMap<u32, f64>,
        7 => Optional origin: Option<Point>,
        8 => Optional scale: f32,
        9 => Optional flags: Vec<bool>,
        10 => Optional delta: i16,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Version1("tests.Versioned") {
        1 => Optional name: String,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Version2("tests.Versioned") {
        1 => Optional name: String,
        2 => Optional added: Vec<i64>,
        3 => Optional child: Point,
    }
}

fn sample() -> Polygon {
    Polygon {
        base: Shape { id: 77 },
        name: "tri".into(),
        wide: WString::from("wide ☃"),
        color: Color::Blue,
        points: vec![Point { x: 0, y: 0 }, Point { x: 4, y: -1 }, Point { x: -2, y: 9 }],
        tags: BTreeSet::from(["a".to_string(), "b".to_string()]),
        weights: BTreeMap::from([(1, 0.5), (7, -2.25)]),
        origin: Some(Point { x: 1, y: 1 }),
        scale: 0.75,
        flags: vec![true, false],
        delta: -300,
    }
}

#[test]
fn test_round_trip_every_protocol() {
    let polygon = sample();
    for protocol in [ProtocolType::Compact, ProtocolType::Simple, ProtocolType::SimpleJson] {
        let bytes = marshal_to_vec(&polygon, protocol).expect("marshal");
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), protocol.magic());
        let back: Polygon = unmarshal(&bytes).expect("unmarshal");
        assert_eq!(back, polygon, "{protocol:?}");
    }
}

#[test]
fn test_simple_v2_round_trip() {
    let polygon = sample();
    let mut w = SimpleWriter::new(Vec::new(), SimpleVersion::V2);
    marshal(&polygon, &mut w).expect("marshal");
    let bytes = w.into_inner();
    assert_eq!(&bytes[..4], [0x53, 0x50, 0x02, 0x00]);
    let back: Polygon = unmarshal(&bytes).expect("unmarshal");
    assert_eq!(back, polygon);

    let mut reader = SimpleReader::new(&bytes[4..], SimpleVersion::V2);
    let again: Polygon = bondcore::deserialize(&mut reader).expect("deserialize");
    assert_eq!(again, polygon);
}

#[test]
fn test_unknown_protocol() {
    let err = unmarshal::<Point>(&[0x12, 0x34, 0x01, 0x00, 0x00]).expect_err("unknown magic");
    assert!(matches!(err, CoreError::UnknownProtocol { magic: Some(0x3412) }));
    let err = unmarshal::<Point>(&[0x43]).expect_err("no header");
    assert!(matches!(err, CoreError::UnknownProtocol { magic: None }));
    let err = unmarshal::<Point>(&[0x53, 0x50, 0x03, 0x00]).expect_err("simple v3");
    assert!(matches!(err, CoreError::UnknownProtocol { magic: Some(0x5053) }));
}

#[test]
fn test_truncated_input_is_stream_error() {
    let bytes = marshal_to_vec(&sample(), ProtocolType::Compact).expect("marshal");
    for cut in [5, bytes.len() / 2, bytes.len() - 1] {
        let err = unmarshal::<Polygon>(&bytes[..cut]).expect_err("truncated");
        assert!(err.is_stream_error(), "cut at {cut}: {err}");
    }
}

#[test]
fn test_compact_layers_base_with_stop_base() {
    let polygon = Polygon { base: Shape { id: 3 }, name: "x".into(), ..Polygon::default() };
    let bytes = marshal_to_vec(&polygon, ProtocolType::Compact).expect("marshal");
    assert_eq!(bytes, [0x43, 0x42, 0x01, 0x00, 0x06, 0x03, 0x01, 0x29, 0x01, b'x', 0x00]);
}

#[test]
fn test_transcode_compact_json_compact_is_identity() {
    let polygon = sample();
    let mut compact = CompactWriter::new(Vec::new());
    serialize(&polygon, &mut compact).expect("serialize");
    let original = compact.into_inner();

    let mut json = JsonWriter::new();
    transcode(&original, ProtocolType::Compact, 1, Polygon::schema(), &mut json).expect("to json");
    let text = json.into_bytes().expect("json bytes");

    let mut compact = CompactWriter::new(Vec::new());
    transcode(&text, ProtocolType::SimpleJson, 1, Polygon::schema(), &mut compact).expect("to compact");
    assert_eq!(compact.into_inner(), original);
}

#[test]
fn test_forward_compatibility() {
    let newer = Version2 { name: "n".into(), added: vec![1, -2], child: Point { x: 5, y: 6 } };
    let bytes = marshal_to_vec(&newer, ProtocolType::Compact).expect("marshal");

    let older: Version1 = unmarshal(&bytes).expect("old reader");
    assert_eq!(older.name, "n");

    let dynamic = unmarshal_value(&bytes, Version1::schema()).expect("dynamic");
    assert_eq!(dynamic.get(2), Some(&Value::List(vec![Value::I64(1), Value::I64(-2)])));
    let child = dynamic.get(3).and_then(Value::as_struct).expect("unknown struct kept");
    assert_eq!(child.get(1), Some(&Value::I32(5)));

    // Unknown fields survive a pass through the old schema.
    let mut w = CompactWriter::new(Vec::new());
    transcode(&bytes[4..], ProtocolType::Compact, 1, Version1::schema(), &mut w).expect("transcode");
    let body = w.into_inner();
    let mut reader = CompactReader::new(&body);
    let round: Version2 = bondcore::deserialize(&mut reader).expect("newer reader");
    assert_eq!(round, newer);
}

#[test]
fn test_backward_compatibility() {
    let older = Version1 { name: "o".into() };
    for protocol in [ProtocolType::Compact, ProtocolType::SimpleJson] {
        let bytes = marshal_to_vec(&older, protocol).expect("marshal");
        let newer: Version2 = unmarshal(&bytes).expect("newer reader");
        assert_eq!(newer, Version2 { name: "o".into(), ..Version2::default() });
    }
}

#[test]
fn test_runtime_schema_from_file() {
    let def = SchemaDef::from_static(Polygon::schema());
    let file = tempfile::NamedTempFile::new().expect("temp file");
    std::fs::write(file.path(), def.to_json().expect("to json")).expect("write");
    let loaded = SchemaDef::from_json_file(file.path()).expect("load");

    let bytes = marshal_to_vec(&sample(), ProtocolType::Compact).expect("marshal");
    let from_static = unmarshal_value(&bytes, Polygon::schema()).expect("static");
    let from_runtime = unmarshal_value(&bytes, loaded.root()).expect("runtime");
    assert_eq!(from_static, from_runtime);

    let mut w = CompactWriter::new(Vec::new());
    marshal_value(&from_runtime, loaded.root(), &mut w).expect("marshal value");
    let back: Polygon = unmarshal(&w.into_inner()).expect("unmarshal");
    assert_eq!(back, sample());
}

#[test]
fn test_invalid_schema_document_rejected() {
    let err = SchemaDef::from_json(r#"{"structs": [], "root": {"id": "Struct", "struct_def": 3}}"#)
        .expect_err("dangling root");
    assert!(matches!(err, CoreError::Schema(_)));
}

#[test]
fn test_select_protocol_reports_protocol() {
    let bytes = marshal_to_vec(&Point { x: 1, y: 2 }, ProtocolType::SimpleJson).expect("marshal");
    let mut to = ToValue::new();
    let (protocol, done) = select_protocol_and_apply(&bytes, Point::schema(), &mut to).expect("apply");
    assert_eq!(protocol, ProtocolType::SimpleJson);
    assert!(!done);
    assert_eq!(to.into_struct().get(2), Some(&Value::I32(2)));
}

#[test]
fn test_json_document_shape() {
    let bytes = marshal_to_vec(&sample(), ProtocolType::SimpleJson).expect("marshal");
    let doc = JsonDocument::parse(&bytes[4..]).expect("json");
    let root = doc.root();
    assert_eq!(root["id"], 77);
    assert_eq!(root["weights"], serde_json::json!([1, 0.5, 7, -2.25]));
    assert_eq!(root["points"][1], serde_json::json!({"x": 4}));
}

proptest! {
    #[test]
    fn prop_round_trip(
        name in "\\PC*",
        id in any::<u64>(),
        delta in any::<i16>(),
        xs in prop::collection::vec(any::<i32>(), 0..8),
    ) {
        let polygon = Polygon {
            base: Shape { id },
            name,
            delta,
            points: xs.iter().map(|&x| Point { x, y: x.wrapping_neg() }).collect(),
            origin: Some(Point::default()),
            ..Polygon::default()
        };
        for protocol in [ProtocolType::Compact, ProtocolType::Simple, ProtocolType::SimpleJson] {
            let bytes = marshal_to_vec(&polygon, protocol).expect("marshal");
            let back: Polygon = unmarshal(&bytes).expect("unmarshal");
            prop_assert_eq!(&back, &polygon);
        }
    }
}

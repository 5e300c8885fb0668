//! Transforms: typed assignment with required-field validation and the
//! matching rule, path mapping, field extraction, and the serializer's
//! default-omission rule.

#![cfg(all(feature = "compact", feature = "simple", feature = "json"))]

use bondcore::{
    bond_enum, bond_record, deserialize, marshal_to_vec, serialize, transcode, unmarshal, CompactReader,
    CompactWriter, ContainerHeader, CoreError, DataType, DefaultValue, ExtractField, JsonWriter, MapTo, Mapping,
    Mappings, ProtocolType, Reader, Record, SimpleReader, SimpleVersion, SimpleWriter, To, Value, Writer,
    MAPPING_BASE,
};
use std::collections::BTreeMap;

bond_enum! {
    pub enum Level {
        Low = 0,
        High = 10,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Account("tests.Account") {
        1 => Required owner: String,
        2 => Optional balance: i64,
        3 => Required number: u32,
        4 => Optional level: Level,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Defaults("tests.Defaults") {
        1 => Optional n: u32 = DefaultValue::UInt(5),
        2 => Optional s: String,
        3 => Optional list: Vec<u8>,
        4 => Required r: u32,
        5 => Optional maybe: Option<u16>,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Widened("tests.Widened") {
        1 => Optional small: u64,
        2 => Optional signed: i64,
        3 => Optional real: f64,
        4 => Optional flag: i32 = DefaultValue::Int(-1),
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person("tests.Person") {
        1 => Optional first: String,
        2 => Optional age: u8,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Entry("tests.Entry") {
        1 => Optional who: Person,
        2 => Optional note: String,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Meta("tests.Meta") {
        7 => Optional note: String,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Row("tests.Row"): Meta {
        1 => Optional name: String,
        2 => Optional age: u32,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Paint("tests.Paint") {
        1 => Optional level: Level,
        2 => Optional n: u32,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Item("tests.Item") {
        1 => Required must: u32,
        2 => Optional opt: u32,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Holder("tests.Holder") {
        1 => Optional items: Vec<Item>,
        2 => Optional by_key: BTreeMap<u32, Item>,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Pair("tests.Pair") {
        1 => Optional a: u32,
        3 => Optional c: u32,
    }
}

fn compact_body(fields: &[(u16, Value)]) -> Vec<u8> {
    let mut w = CompactWriter::new(Vec::new());
    for (id, value) in fields {
        w.write_field_begin(value.data_type(), *id, None).expect("header");
        w.write_basic(value).expect("value");
    }
    w.write_struct_end(false).expect("stop");
    w.into_inner()
}

fn read_into<T: Record>(bytes: &[u8], record: &mut T) -> bondcore::Result<()> {
    let schema = record.record_schema();
    CompactReader::new(bytes).parse(&mut To::new(record), schema, false).map(drop)
}

#[test]
fn test_required_fields_present() {
    let account = Account { owner: "ann".into(), balance: 0, number: 12, level: Level::High };
    let bytes = marshal_to_vec(&account, ProtocolType::Compact).expect("marshal");
    let back: Account = unmarshal(&bytes).expect("unmarshal");
    assert_eq!(back, account);
}

#[test]
fn test_missing_required_field_message() {
    let bytes = compact_body(&[(1, Value::from("ann")), (2, Value::I64(5))]);
    let mut account = Account::default();
    let err = read_into(&bytes, &mut account).expect_err("number missing");
    assert!(matches!(err, CoreError::MissingField { id: 3, .. }));
    assert_eq!(
        err.to_string(),
        "De-serialization failed: required field 3 is missing from tests.Account"
    );
}

#[test]
fn test_matching_rule_widens_numbers() {
    let bytes = compact_body(&[
        (1, Value::U16(700)),
        (2, Value::I8(-8)),
        (3, Value::Float(1.5)),
    ]);
    let mut record = Widened::default();
    read_into(&bytes, &mut record).expect("read");
    assert_eq!(record, Widened { small: 700, signed: -8, real: 1.5, flag: -1 });
}

#[test]
fn test_mismatched_types_are_skipped() {
    let bytes = compact_body(&[
        (1, Value::I32(-1)),
        (2, Value::U8(3)),
        (4, Value::Bool(true)),
    ]);
    let mut record = Widened::default();
    read_into(&bytes, &mut record).expect("read");
    assert_eq!(record, Widened::default());
}

#[test]
fn test_unknown_enum_value_keeps_default() {
    let bytes = compact_body(&[(1, Value::I32(2)), (2, Value::U32(9))]);
    let mut paint = Paint::default();
    read_into(&bytes, &mut paint).expect("newer enum value");
    assert_eq!(paint, Paint { level: Level::Low, n: 9 });
}

/// Holder whose first list element and map value both lack `Item::must`.
fn holder_missing_required(in_map: bool) -> Vec<u8> {
    let mut w = CompactWriter::new(Vec::new());
    let (id, kind, key) = if in_map { (2, DataType::Map, Some(DataType::UInt32)) } else { (1, DataType::List, None) };
    w.write_field_begin(kind, id, None).expect("header");
    w.write_container_begin(&ContainerHeader { kind, len: 1, element: DataType::Struct, key }).expect("container");
    if in_map {
        w.write_basic(&Value::U32(4)).expect("key");
    }
    w.write_field_begin(DataType::UInt32, 2, None).expect("opt");
    w.write_basic(&Value::U32(5)).expect("value");
    w.write_struct_end(false).expect("element end");
    w.write_container_end().expect("container end");
    w.write_struct_end(false).expect("stop");
    w.into_inner()
}

#[test]
fn test_required_fields_checked_in_container_elements() {
    for in_map in [false, true] {
        let mut holder = Holder::default();
        let err = read_into(&holder_missing_required(in_map), &mut holder).expect_err("element lacks must");
        assert!(matches!(err, CoreError::MissingField { id: 1, .. }), "map: {in_map}: {err}");
    }

    let holder = Holder {
        items: vec![Item { must: 1, opt: 0 }, Item { must: 2, opt: 3 }],
        by_key: BTreeMap::from([(9, Item { must: 4, opt: 5 })]),
    };
    let bytes = marshal_to_vec(&holder, ProtocolType::Compact).expect("marshal");
    let back: Holder = unmarshal(&bytes).expect("unmarshal");
    assert_eq!(back, holder);
}

#[test]
fn test_transcode_to_untagged_keeps_schema_slots() {
    let read_back = |bytes: &[u8]| {
        let mut w = SimpleWriter::new(Vec::new(), SimpleVersion::V1);
        transcode(bytes, ProtocolType::Compact, 1, Pair::schema(), &mut w).expect("transcode");
        let out = w.into_inner();
        let pair: Pair = deserialize(&mut SimpleReader::new(&out, SimpleVersion::V1)).expect("read back");
        (out, pair)
    };

    // Unknown field 2 is dropped.
    let (out, pair) = read_back(&compact_body(&[(1, Value::U32(10)), (2, Value::U32(20)), (3, Value::U32(30))]));
    assert_eq!(out, [10, 0, 0, 0, 30, 0, 0, 0]);
    assert_eq!(pair, Pair { a: 10, c: 30 });

    // A narrower wire type is widened to the slot's width.
    let (out, pair) = read_back(&compact_body(&[(1, Value::U8(7)), (3, Value::U32(1))]));
    assert_eq!(out, [7, 0, 0, 0, 1, 0, 0, 0]);
    assert_eq!(pair, Pair { a: 7, c: 1 });

    // Values that cannot be converted take the default.
    let (_, pair) = read_back(&compact_body(&[(1, Value::I64(-1)), (3, Value::from("x"))]));
    assert_eq!(pair, Pair::default());
}

#[test]
fn test_map_to_nested_and_base_paths() {
    let entry = Entry { who: Person { first: "bo".into(), age: 41 }, note: "n".into() };
    let bytes = marshal_to_vec(&entry, ProtocolType::Compact).expect("marshal");

    let mut mappings = Mappings::new();
    mappings.insert(
        1,
        Mapping::nested(Mappings::from([(1, Mapping::to(vec![1])), (2, Mapping::to(vec![2]))])),
    );
    mappings.insert(2, Mapping::to(vec![MAPPING_BASE, 7]));

    let mut row = Row::default();
    bondcore::select_protocol_and_apply(&bytes, Entry::schema(), &mut MapTo::new(&mut row, &mappings))
        .expect("map");
    assert_eq!(row.name, "bo");
    assert_eq!(row.age, 41);
    assert_eq!(row.base.note, "n");
}

#[test]
fn test_extract_field_stops_early() {
    let entry = Entry { who: Person { first: "cy".into(), age: 2 }, note: "keep".into() };
    let mut w = CompactWriter::new(Vec::new());
    serialize(&entry, &mut w).expect("serialize");
    let bytes = w.into_inner();

    let mut extract = ExtractField::new(2);
    let mut reader = CompactReader::new(&bytes);
    assert!(reader.parse(&mut extract, Entry::schema(), false).expect("parse"));
    assert_eq!(extract.into_value(), Some(Value::from("keep")));
    assert_eq!(reader.position(), bytes.len());
}

#[test]
fn test_serializer_omits_defaults_of_in_memory_objects() {
    let record = Defaults::default();
    let mut w = CompactWriter::new(Vec::new());
    serialize(&record, &mut w).expect("serialize");
    // Only the required field, then STOP.
    assert_eq!(w.into_inner(), [(4 << 5) | DataType::UInt32 as u8, 0x00, 0x00]);

    let record = Defaults { n: 6, maybe: Some(0), ..Defaults::default() };
    let mut w = CompactWriter::new(Vec::new());
    serialize(&record, &mut w).expect("serialize");
    assert_eq!(
        w.into_inner(),
        [
            (1 << 5) | DataType::UInt32 as u8,
            6,
            (4 << 5) | DataType::UInt32 as u8,
            0,
            (5 << 5) | DataType::UInt16 as u8,
            0,
            0x00,
        ]
    );
}

#[test]
fn test_serializer_never_omits_for_untagged_writer() {
    let mut w = SimpleWriter::new(Vec::new(), SimpleVersion::V1);
    serialize(&Defaults::default(), &mut w).expect("serialize");
    // n, s (u32 length), list (u32 count), r, maybe (zero literal)
    assert_eq!(w.into_inner().len(), 4 + 4 + 4 + 4 + 2);
}

#[test]
fn test_transcoding_keeps_explicit_defaults() {
    let bytes = compact_body(&[(1, Value::U32(5)), (4, Value::U32(1))]);
    let mut w = CompactWriter::new(Vec::new());
    transcode(&bytes, ProtocolType::Compact, 1, Defaults::schema(), &mut w).expect("transcode");
    assert_eq!(w.into_inner(), bytes);
}

#[test]
fn test_json_writer_field_names() {
    let account = Account { owner: "dee".into(), balance: -3, number: 1, level: Level::Low };
    let mut w = JsonWriter::new();
    serialize(&account, &mut w).expect("serialize");
    let json = w.into_value().expect("document");
    assert_eq!(json, serde_json::json!({"owner": "dee", "balance": -3, "number": 1}));
}

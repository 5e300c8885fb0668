//! Simple JSON: the document protocol, on top of `serde_json`.
//!
//! A struct is a JSON object whose keys are the field's `JsonName`
//! attribute, else its name, else its decimal id. Base fields are flattened
//! into the derived object. Lists and sets are arrays; maps are flat
//! `[key, value, key, value, ...]` arrays.

use crate::dom_parser::DomParser;
use crate::error::{CoreError, Result};
use crate::protocol::{ContainerHeader, DomReader, ParserKind, Reader, Writer};
use crate::schema::{Metadata, Schema};
use crate::transform::Transform;
use crate::types::{DataType, TypeClass};
use crate::value::Value;
use byteorder::{LittleEndian, WriteBytesExt};
use serde_json::{Map, Number, Value as JsonValue};

pub const JSON_MAGIC: u16 = 0x4A53;
pub const JSON_VERSION: u16 = 1;

const JSON_NAME: &str = "JsonName";

fn field_name(id: u16, metadata: Option<&Metadata>) -> String {
    metadata
        .and_then(|md| md.attribute(JSON_NAME).or(Some(md.name.as_ref())).filter(|n| !n.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn kind_matches(node: &JsonValue, ty: DataType) -> bool {
    match ty.class() {
        TypeClass::Basic => match ty {
            DataType::Bool => node.is_boolean(),
            DataType::Float | DataType::Double => node.is_number(),
            _ => node.is_i64() || node.is_u64(),
        },
        TypeClass::String => node.is_string(),
        TypeClass::Struct => node.is_object(),
        TypeClass::Container => node.is_array(),
        TypeClass::Marker => false,
    }
}

/// A parsed JSON payload; readers borrow from it.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    root: JsonValue,
}

impl JsonDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(JsonDocument { root: serde_json::from_slice(bytes)? })
    }

    pub fn from_value(root: JsonValue) -> Self {
        JsonDocument { root }
    }

    pub fn root(&self) -> &JsonValue {
        &self.root
    }

    pub fn reader(&self) -> JsonReader<'_> {
        JsonReader::new(&self.root)
    }
}

enum Frame<'a> {
    Node(&'a JsonValue),
    Object(&'a Map<String, JsonValue>),
    Items(std::slice::Iter<'a, JsonValue>),
}

pub struct JsonReader<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> JsonReader<'a> {
    pub fn new(root: &'a JsonValue) -> Self {
        JsonReader { stack: vec![Frame::Node(root)] }
    }

    /// The value at the current position: the entered node, or the next
    /// item of the array being read.
    fn next_node(&mut self) -> Result<&'a JsonValue> {
        match self.stack.last_mut() {
            Some(Frame::Node(node)) => Ok(*node),
            Some(Frame::Items(items)) => items.next().ok_or_else(|| CoreError::stream("JSON array ended early")),
            _ => Err(CoreError::stream("no JSON value at the current position")),
        }
    }

    fn expected(ty: DataType, node: &JsonValue) -> CoreError {
        CoreError::stream(format!("expected {ty:?}, found {node}"))
    }
}

impl Reader for JsonReader<'_> {
    const KIND: ParserKind = ParserKind::Dom;

    fn read_struct_begin(&mut self, base: bool) -> Result<()> {
        if base {
            return Ok(());
        }
        let node = self.next_node()?;
        let object = node.as_object().ok_or_else(|| Self::expected(DataType::Struct, node))?;
        self.stack.push(Frame::Object(object));
        Ok(())
    }

    fn read_struct_end(&mut self, base: bool) -> Result<()> {
        if !base {
            self.stack.pop();
        }
        Ok(())
    }

    fn read_container_begin(
        &mut self,
        kind: DataType,
        element: DataType,
        key: Option<DataType>,
    ) -> Result<ContainerHeader> {
        let node = self.next_node()?;
        let items = node.as_array().ok_or_else(|| Self::expected(kind, node))?;
        let len = if kind == DataType::Map {
            if items.len() % 2 != 0 {
                return Err(CoreError::stream("JSON map array with odd length"));
            }
            items.len() / 2
        } else {
            items.len()
        };
        self.stack.push(Frame::Items(items.iter()));
        Ok(ContainerHeader { kind, len, element, key })
    }

    fn read_container_end(&mut self) -> Result<()> {
        self.stack.pop();
        Ok(())
    }

    fn read_basic(&mut self, ty: DataType) -> Result<Value> {
        let node = self.next_node()?;
        let err = || Self::expected(ty, node);
        let unsigned = || node.as_u64().ok_or_else(err);
        let signed = || node.as_i64().ok_or_else(err);
        Ok(match ty {
            DataType::Bool => Value::Bool(node.as_bool().ok_or_else(err)?),
            DataType::UInt8 => Value::U8(u8::try_from(unsigned()?).map_err(|_| err())?),
            DataType::UInt16 => Value::U16(u16::try_from(unsigned()?).map_err(|_| err())?),
            DataType::UInt32 => Value::U32(u32::try_from(unsigned()?).map_err(|_| err())?),
            DataType::UInt64 => Value::U64(unsigned()?),
            DataType::Int8 => Value::I8(i8::try_from(signed()?).map_err(|_| err())?),
            DataType::Int16 => Value::I16(i16::try_from(signed()?).map_err(|_| err())?),
            DataType::Int32 => Value::I32(i32::try_from(signed()?).map_err(|_| err())?),
            DataType::Int64 => Value::I64(signed()?),
            DataType::Float => Value::Float(node.as_f64().ok_or_else(err)? as f32),
            DataType::Double => Value::Double(node.as_f64().ok_or_else(err)?),
            DataType::String => Value::String(node.as_str().ok_or_else(err)?.to_string()),
            DataType::WString => Value::WString(node.as_str().ok_or_else(err)?.encode_utf16().collect()),
            other => return Err(CoreError::InvalidDataType(other as u8)),
        })
    }

    fn skip(&mut self, _: DataType) -> Result<()> {
        self.next_node().map(drop)
    }

    fn parse<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S, base: bool) -> Result<bool> {
        DomParser::new(self, base).apply(transform, schema)
    }
}

impl<'a> DomReader for JsonReader<'a> {
    type Node = &'a JsonValue;

    fn find_field(&mut self, id: u16, metadata: &Metadata, ty: DataType) -> Option<Self::Node> {
        let Some(Frame::Object(object)) = self.stack.last() else {
            return None;
        };
        let object: &'a Map<String, JsonValue> = *object;
        let id_key = id.to_string();
        let found = [metadata.attribute(JSON_NAME), Some(metadata.name.as_ref()), Some(id_key.as_str())]
            .into_iter()
            .flatten()
            .filter(|key| !key.is_empty())
            .find_map(|key| object.get(key));
        found.filter(|node| kind_matches(node, ty))
    }

    fn enter_field(&mut self, node: Self::Node) {
        self.stack.push(Frame::Node(node));
    }

    fn exit_field(&mut self) {
        self.stack.pop();
    }
}

enum Scope {
    Object(Map<String, JsonValue>, Option<String>),
    Array(Vec<JsonValue>),
}

/// Builds a JSON tree; bytes are produced by [`JsonWriter::into_bytes`].
#[derive(Default)]
pub struct JsonWriter {
    stack: Vec<Scope>,
    result: Option<JsonValue>,
    header: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        JsonWriter::default()
    }

    pub fn into_value(self) -> Option<JsonValue> {
        self.result
    }

    /// The document, preceded by the marshaled header if one was written.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if self.header {
            out.write_u16::<LittleEndian>(JSON_MAGIC)?;
            out.write_u16::<LittleEndian>(JSON_VERSION)?;
        }
        let root = self.result.unwrap_or(JsonValue::Null);
        serde_json::to_writer(&mut out, &root)?;
        Ok(out)
    }

    fn emit(&mut self, value: JsonValue) -> Result<()> {
        match self.stack.last_mut() {
            Some(Scope::Object(object, key)) => {
                let key = key.take().ok_or_else(|| CoreError::stream("JSON value without a field name"))?;
                object.insert(key, value);
            }
            Some(Scope::Array(items)) => items.push(value),
            None => self.result = Some(value),
        }
        Ok(())
    }
}

impl Writer for JsonWriter {
    const MAGIC: u16 = JSON_MAGIC;
    const MAY_OMIT_FIELDS: bool = true;
    const TAGGED: bool = true;

    fn version(&self) -> u16 {
        JSON_VERSION
    }

    fn write_version(&mut self) -> Result<()> {
        self.header = true;
        Ok(())
    }

    fn write_struct_begin(&mut self, _: &Metadata, base: bool) -> Result<()> {
        if !base {
            self.stack.push(Scope::Object(Map::new(), None));
        }
        Ok(())
    }

    fn write_struct_end(&mut self, base: bool) -> Result<()> {
        if base {
            return Ok(());
        }
        match self.stack.pop() {
            Some(Scope::Object(object, _)) => self.emit(JsonValue::Object(object)),
            _ => Err(CoreError::stream("struct end without a matching begin")),
        }
    }

    fn write_field_begin(&mut self, _: DataType, id: u16, metadata: Option<&Metadata>) -> Result<()> {
        match self.stack.last_mut() {
            Some(Scope::Object(_, key)) => {
                *key = Some(field_name(id, metadata));
                Ok(())
            }
            _ => Err(CoreError::stream("field outside of a struct")),
        }
    }

    fn write_container_begin(&mut self, header: &ContainerHeader) -> Result<()> {
        let len = if header.key.is_some() { header.len * 2 } else { header.len };
        self.stack.push(Scope::Array(Vec::with_capacity(len.min(4096))));
        Ok(())
    }

    fn write_container_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Scope::Array(items)) => self.emit(JsonValue::Array(items)),
            _ => Err(CoreError::stream("container end without a matching begin")),
        }
    }

    fn write_basic(&mut self, value: &Value) -> Result<()> {
        let float = |f: f64| {
            Number::from_f64(f)
                .map(JsonValue::Number)
                .ok_or_else(|| CoreError::Unsupported(format!("{f} has no JSON representation")))
        };
        let json = match value {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::U8(v) => JsonValue::from(*v),
            Value::U16(v) => JsonValue::from(*v),
            Value::U32(v) => JsonValue::from(*v),
            Value::U64(v) => JsonValue::from(*v),
            Value::I8(v) => JsonValue::from(*v),
            Value::I16(v) => JsonValue::from(*v),
            Value::I32(v) => JsonValue::from(*v),
            Value::I64(v) => JsonValue::from(*v),
            Value::Float(v) => float(f64::from(*v))?,
            Value::Double(v) => float(*v)?,
            Value::String(s) => JsonValue::String(s.clone()),
            Value::WString(units) => JsonValue::String(String::from_utf16_lossy(units)),
            other => return Err(CoreError::Unsupported(format!("{:?} is not a basic value", other.data_type()))),
        };
        self.emit(json)
    }
}

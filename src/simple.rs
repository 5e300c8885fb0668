//! Simple Binary: the untagged protocol.
//!
//! Field values follow schema order with no tags or terminators, base layer
//! first. Scalars are fixed width little endian. Lengths and counts are u32
//! in version 1 and varints in version 2.

use crate::varint::{read_varint, write_varint};
use crate::error::{CoreError, Result};
use crate::protocol::{ContainerHeader, ParserKind, Reader, Writer, MAX_NESTING};
use crate::schema::{DefaultValue, Metadata, Schema};
use crate::static_parser::StaticParser;
use crate::transform::Transform;
use crate::types::{DataType, TypeClass};
use crate::value::Value;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

pub const SIMPLE_MAGIC: u16 = 0x5053;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimpleVersion {
    #[default]
    V1 = 1,
    V2 = 2,
}

impl SimpleVersion {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(SimpleVersion::V1),
            2 => Some(SimpleVersion::V2),
            _ => None,
        }
    }
}

pub struct SimpleReader<'a> {
    input: Cursor<&'a [u8]>,
    version: SimpleVersion,
    depth: usize,
}

impl<'a> SimpleReader<'a> {
    pub fn new(bytes: &'a [u8], version: SimpleVersion) -> Self {
        SimpleReader { input: Cursor::new(bytes), version, depth: 0 }
    }

    pub fn position(&self) -> usize {
        self.input.position() as usize
    }

    fn read_length(&mut self, unit: usize) -> Result<usize> {
        let len = match self.version {
            SimpleVersion::V1 => u64::from(self.input.read_u32::<LittleEndian>()?),
            SimpleVersion::V2 => read_varint(&mut self.input)?,
        };
        let remaining = self.input.get_ref().len().saturating_sub(self.position());
        match usize::try_from(len) {
            Ok(n) if n.saturating_mul(unit) <= remaining => Ok(n),
            _ => Err(CoreError::stream(format!("length {len} exceeds remaining input"))),
        }
    }
}

impl Reader for SimpleReader<'_> {
    const KIND: ParserKind = ParserKind::Static;

    fn read_container_begin(
        &mut self,
        kind: DataType,
        element: DataType,
        key: Option<DataType>,
    ) -> Result<ContainerHeader> {
        if element == DataType::Unavailable || key == Some(DataType::Unavailable) {
            return Err(CoreError::stream("untagged container of unknown element type"));
        }
        if self.depth == MAX_NESTING {
            return Err(CoreError::stream(format!("nesting deeper than {MAX_NESTING}")));
        }
        let len = self.read_length(1)?;
        self.depth += 1;
        Ok(ContainerHeader { kind, len, element, key })
    }

    fn read_container_end(&mut self) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn read_basic(&mut self, ty: DataType) -> Result<Value> {
        let input = &mut self.input;
        Ok(match ty {
            DataType::Bool => Value::Bool(input.read_u8()? != 0),
            DataType::UInt8 => Value::U8(input.read_u8()?),
            DataType::UInt16 => Value::U16(input.read_u16::<LittleEndian>()?),
            DataType::UInt32 => Value::U32(input.read_u32::<LittleEndian>()?),
            DataType::UInt64 => Value::U64(input.read_u64::<LittleEndian>()?),
            DataType::Int8 => Value::I8(input.read_i8()?),
            DataType::Int16 => Value::I16(input.read_i16::<LittleEndian>()?),
            DataType::Int32 => Value::I32(input.read_i32::<LittleEndian>()?),
            DataType::Int64 => Value::I64(input.read_i64::<LittleEndian>()?),
            DataType::Float => Value::Float(input.read_f32::<LittleEndian>()?),
            DataType::Double => Value::Double(input.read_f64::<LittleEndian>()?),
            DataType::String => {
                let len = self.read_length(1)?;
                let mut bytes = vec![0u8; len];
                self.input.read_exact(&mut bytes)?;
                Value::String(String::from_utf8(bytes).map_err(|e| CoreError::stream(e.to_string()))?)
            }
            DataType::WString => {
                let len = self.read_length(2)?;
                let mut units = vec![0u16; len];
                self.input.read_u16_into::<LittleEndian>(&mut units)?;
                Value::WString(units)
            }
            other => return Err(CoreError::InvalidDataType(other as u8)),
        })
    }

    fn skip(&mut self, ty: DataType) -> Result<()> {
        match ty.class() {
            TypeClass::Basic | TypeClass::String => self.read_basic(ty).map(drop),
            _ => Err(CoreError::Unsupported(format!("cannot skip an untagged {ty:?} without its schema"))),
        }
    }

    fn parse<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S, base: bool) -> Result<bool> {
        StaticParser::new(self, base).apply(transform, schema)
    }
}

pub struct SimpleWriter<W = Vec<u8>> {
    output: W,
    version: SimpleVersion,
}

impl<W: Write> SimpleWriter<W> {
    pub fn new(output: W, version: SimpleVersion) -> Self {
        SimpleWriter { output, version }
    }

    pub fn into_inner(self) -> W {
        self.output
    }

    fn write_length(&mut self, len: usize) -> Result<()> {
        match self.version {
            SimpleVersion::V1 => {
                let len = u32::try_from(len).map_err(|_| CoreError::Unsupported(format!("length {len} over u32")))?;
                self.output.write_u32::<LittleEndian>(len)?;
                Ok(())
            }
            SimpleVersion::V2 => write_varint(&mut self.output, len as u64),
        }
    }
}

impl<W: Write> Writer for SimpleWriter<W> {
    const MAGIC: u16 = SIMPLE_MAGIC;
    const MAY_OMIT_FIELDS: bool = false;
    const TAGGED: bool = false;

    fn version(&self) -> u16 {
        self.version as u16
    }

    fn write_version(&mut self) -> Result<()> {
        self.output.write_u16::<LittleEndian>(SIMPLE_MAGIC)?;
        self.output.write_u16::<LittleEndian>(self.version as u16)?;
        Ok(())
    }

    fn write_struct_end(&mut self, _: bool) -> Result<()> {
        Ok(())
    }

    fn write_field_begin(&mut self, _: DataType, _: u16, _: Option<&Metadata>) -> Result<()> {
        Ok(())
    }

    /// Every field occupies its slot: an omitted one is written as its
    /// default literal, or the zero value of its type.
    fn write_field_omitted(&mut self, ty: DataType, id: u16, metadata: &Metadata) -> Result<()> {
        let zero = if ty.is_string() { DefaultValue::str("") } else { DefaultValue::UInt(0) };
        match ty.class() {
            TypeClass::Basic | TypeClass::String => {
                let value = metadata
                    .default_value
                    .to_value(ty)
                    .or_else(|| zero.to_value(ty))
                    .ok_or_else(|| CoreError::Unsupported(format!("no literal for {ty:?}")))?;
                self.write_basic(&value)
            }
            TypeClass::Container => self.write_length(0),
            _ => Err(CoreError::Unsupported(format!(
                "simple binary cannot omit {ty:?} field {id} ({})",
                metadata.name
            ))),
        }
    }

    fn write_container_begin(&mut self, header: &ContainerHeader) -> Result<()> {
        self.write_length(header.len)
    }

    fn write_basic(&mut self, value: &Value) -> Result<()> {
        let out = &mut self.output;
        match value {
            Value::Bool(b) => out.write_u8(*b as u8)?,
            Value::U8(v) => out.write_u8(*v)?,
            Value::U16(v) => out.write_u16::<LittleEndian>(*v)?,
            Value::U32(v) => out.write_u32::<LittleEndian>(*v)?,
            Value::U64(v) => out.write_u64::<LittleEndian>(*v)?,
            Value::I8(v) => out.write_i8(*v)?,
            Value::I16(v) => out.write_i16::<LittleEndian>(*v)?,
            Value::I32(v) => out.write_i32::<LittleEndian>(*v)?,
            Value::I64(v) => out.write_i64::<LittleEndian>(*v)?,
            Value::Float(v) => out.write_f32::<LittleEndian>(*v)?,
            Value::Double(v) => out.write_f64::<LittleEndian>(*v)?,
            Value::String(s) => {
                self.write_length(s.len())?;
                self.output.write_all(s.as_bytes())?;
            }
            Value::WString(units) => {
                self.write_length(units.len())?;
                for u in units {
                    self.output.write_u16::<LittleEndian>(*u)?;
                }
            }
            other => return Err(CoreError::Unsupported(format!("{:?} is not a basic value", other.data_type()))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Modifier;

    #[test]
    fn omitted_field_writes_default_literal() {
        let mut w = SimpleWriter::new(Vec::new(), SimpleVersion::V1);
        let md = Metadata::field("n", Modifier::Optional, DefaultValue::UInt(7));
        w.write_field_omitted(DataType::UInt16, 1, &md).expect("default");
        let none = Metadata::field("s", Modifier::Optional, DefaultValue::Nothing);
        w.write_field_omitted(DataType::String, 2, &none).expect("empty");
        w.write_field_omitted(DataType::List, 3, &none).expect("empty list");
        assert!(w.write_field_omitted(DataType::Struct, 4, &none).is_err());
        assert_eq!(w.into_inner(), [7, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn v2_uses_varint_lengths() {
        let mut w = SimpleWriter::new(Vec::new(), SimpleVersion::V2);
        w.write_basic(&Value::String("hi".into())).expect("write");
        let bytes = w.into_inner();
        assert_eq!(bytes, [2, b'h', b'i']);
        let mut r = SimpleReader::new(&bytes, SimpleVersion::V2);
        assert_eq!(r.read_basic(DataType::String).expect("read"), Value::String("hi".into()));
    }
}

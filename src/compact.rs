//! Compact Binary v1: the tagged protocol.
//!
//! Field header: `(id << 5) | type` for id <= 5, `0xC0 | type` followed by a
//! u8 id up to 0xFF, `0xE0 | type` followed by a u16 LE id otherwise. A
//! struct level ends with a STOP (outermost) or STOP_BASE (base layer) byte.
//! Unsigned integers wider than 8 bits are LEB128 varints, signed ones
//! zigzag varints; floats are little endian.

use crate::dynamic_parser::DynamicParser;
use crate::error::{CoreError, Result};
use crate::protocol::{ContainerHeader, ParserKind, Reader, TaggedReader, Writer, MAX_NESTING};
use crate::schema::{Metadata, Schema};
use crate::transform::Transform;
use crate::types::{DataType, TypeClass};
use crate::value::Value;
use crate::varint::{narrow, read_varint, unzigzag, write_varint, zigzag};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

pub const COMPACT_MAGIC: u16 = 0x4243;
pub const COMPACT_VERSION: u16 = 1;

pub struct CompactReader<'a> {
    input: Cursor<&'a [u8]>,
    pending: Option<(DataType, u16)>,
    depth: usize,
}

impl<'a> CompactReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        CompactReader { input: Cursor::new(bytes), pending: None, depth: 0 }
    }

    pub fn position(&self) -> usize {
        self.input.position() as usize
    }

    fn remaining(&self) -> usize {
        self.input.get_ref().len().saturating_sub(self.position())
    }

    fn read_type(&mut self) -> Result<DataType> {
        DataType::try_from(self.input.read_u8()?)
    }

    /// A length prefix, checked against the bytes left so a corrupt prefix
    /// cannot drive a huge allocation.
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(CoreError::stream(format!("nesting deeper than {MAX_NESTING}")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn read_length(&mut self, unit: usize) -> Result<usize> {
        let len = read_varint(&mut self.input)?;
        match usize::try_from(len) {
            Ok(n) if n.saturating_mul(unit) <= self.remaining() => Ok(n),
            _ => Err(CoreError::stream(format!("length {len} exceeds remaining input"))),
        }
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.input.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl Reader for CompactReader<'_> {
    const KIND: ParserKind = ParserKind::Dynamic;

    fn read_struct_begin(&mut self, base: bool) -> Result<()> {
        if base {
            return Ok(());
        }
        self.enter()
    }

    fn read_struct_end(&mut self, base: bool) -> Result<()> {
        if !base {
            self.leave();
        }
        Ok(())
    }

    fn read_container_begin(&mut self, kind: DataType, _: DataType, _: Option<DataType>) -> Result<ContainerHeader> {
        self.enter()?;
        let key = if kind == DataType::Map { Some(self.read_type()?) } else { None };
        let element = self.read_type()?;
        let len = self.read_length(1)?;
        Ok(ContainerHeader { kind, len, element, key })
    }

    fn read_container_end(&mut self) -> Result<()> {
        self.leave();
        Ok(())
    }

    fn read_basic(&mut self, ty: DataType) -> Result<Value> {
        let input = &mut self.input;
        Ok(match ty {
            DataType::Bool => Value::Bool(input.read_u8()? != 0),
            DataType::UInt8 => Value::U8(input.read_u8()?),
            DataType::UInt16 => Value::U16(narrow(read_varint(input)?, ty)?),
            DataType::UInt32 => Value::U32(narrow(read_varint(input)?, ty)?),
            DataType::UInt64 => Value::U64(read_varint(input)?),
            DataType::Int8 => Value::I8(input.read_i8()?),
            DataType::Int16 => Value::I16(narrow(unzigzag(read_varint(input)?), ty)?),
            DataType::Int32 => Value::I32(narrow(unzigzag(read_varint(input)?), ty)?),
            DataType::Int64 => Value::I64(unzigzag(read_varint(input)?)),
            DataType::Float => Value::Float(input.read_f32::<LittleEndian>()?),
            DataType::Double => Value::Double(input.read_f64::<LittleEndian>()?),
            DataType::String => {
                let len = self.read_length(1)?;
                let bytes = self.read_bytes(len)?;
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
            TypeClass::Basic => self.read_basic(ty).map(drop),
            TypeClass::String => {
                let unit = if ty == DataType::WString { 2 } else { 1 };
                let len = self.read_length(unit)?;
                self.input.set_position((self.position() + len * unit) as u64);
                Ok(())
            }
            TypeClass::Struct => {
                self.enter()?;
                loop {
                    match self.read_field_begin()?.0 {
                        DataType::Stop => break,
                        DataType::StopBase => {}
                        field => self.skip(field)?,
                    }
                }
                self.leave();
                Ok(())
            }
            TypeClass::Container => {
                let header = self.read_container_begin(ty, DataType::Unavailable, None)?;
                for _ in 0..header.len {
                    if let Some(key) = header.key {
                        self.skip(key)?;
                    }
                    self.skip(header.element)?;
                }
                self.read_container_end()
            }
            TypeClass::Marker => Err(CoreError::InvalidDataType(ty as u8)),
        }
    }

    fn parse<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S, base: bool) -> Result<bool> {
        DynamicParser::new(self, base).apply(transform, schema)
    }
}

impl TaggedReader for CompactReader<'_> {
    fn read_field_begin(&mut self) -> Result<(DataType, u16)> {
        if let Some(header) = self.pending.take() {
            return Ok(header);
        }
        let raw = self.input.read_u8()?;
        let ty = DataType::try_from(raw & 0x1f)?;
        let id = match raw >> 5 {
            6 => u16::from(self.input.read_u8()?),
            7 => self.input.read_u16::<LittleEndian>()?,
            small => u16::from(small),
        };
        Ok((ty, id))
    }

    fn push_back_field(&mut self, ty: DataType, id: u16) {
        self.pending = Some((ty, id));
    }
}

pub struct CompactWriter<W = Vec<u8>> {
    output: W,
}

impl<W: Write> CompactWriter<W> {
    pub fn new(output: W) -> Self {
        CompactWriter { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write> Writer for CompactWriter<W> {
    const MAGIC: u16 = COMPACT_MAGIC;
    const MAY_OMIT_FIELDS: bool = true;
    const TAGGED: bool = true;

    fn version(&self) -> u16 {
        COMPACT_VERSION
    }

    fn write_version(&mut self) -> Result<()> {
        self.output.write_u16::<LittleEndian>(COMPACT_MAGIC)?;
        self.output.write_u16::<LittleEndian>(COMPACT_VERSION)?;
        Ok(())
    }

    fn write_struct_end(&mut self, base: bool) -> Result<()> {
        let marker = if base { DataType::StopBase } else { DataType::Stop };
        self.output.write_u8(marker as u8)?;
        Ok(())
    }

    fn write_field_begin(&mut self, ty: DataType, id: u16, _: Option<&Metadata>) -> Result<()> {
        let ty = ty as u8;
        if id <= 5 {
            self.output.write_u8(((id as u8) << 5) | ty)?;
        } else if id <= 0xff {
            self.output.write_u8(0xc0 | ty)?;
            self.output.write_u8(id as u8)?;
        } else {
            self.output.write_u8(0xe0 | ty)?;
            self.output.write_u16::<LittleEndian>(id)?;
        }
        Ok(())
    }

    fn write_container_begin(&mut self, header: &ContainerHeader) -> Result<()> {
        if let Some(key) = header.key {
            self.output.write_u8(key as u8)?;
        }
        self.output.write_u8(header.element as u8)?;
        write_varint(&mut self.output, header.len as u64)
    }

    fn write_basic(&mut self, value: &Value) -> Result<()> {
        let out = &mut self.output;
        match value {
            Value::Bool(b) => out.write_u8(*b as u8)?,
            Value::U8(v) => out.write_u8(*v)?,
            Value::U16(v) => write_varint(out, u64::from(*v))?,
            Value::U32(v) => write_varint(out, u64::from(*v))?,
            Value::U64(v) => write_varint(out, *v)?,
            Value::I8(v) => out.write_i8(*v)?,
            Value::I16(v) => write_varint(out, zigzag(i64::from(*v)))?,
            Value::I32(v) => write_varint(out, zigzag(i64::from(*v)))?,
            Value::I64(v) => write_varint(out, zigzag(*v))?,
            Value::Float(v) => out.write_f32::<LittleEndian>(*v)?,
            Value::Double(v) => out.write_f64::<LittleEndian>(*v)?,
            Value::String(s) => {
                write_varint(out, s.len() as u64)?;
                out.write_all(s.as_bytes())?;
            }
            Value::WString(units) => {
                write_varint(out, units.len() as u64)?;
                for u in units {
                    out.write_u16::<LittleEndian>(*u)?;
                }
            }
            other => return Err(CoreError::Unsupported(format!("{:?} is not a basic value", other.data_type()))),
        }
        Ok(())
    }
}

//! Lazy values handed to transforms.
//!
//! Basic values are read eagerly. Nested structs and containers stay on the
//! reader until the transform decides what to do with them; whatever it
//! leaves untouched is skipped by the parser afterwards.

use crate::error::{CoreError, Result};
use crate::protocol::{ContainerHeader, ParserKind, Reader};
use crate::reflection::Record;
use crate::schema::Schema;
use crate::to::To;
use crate::transform::{Null, ToValue, Transform};
use crate::types::{DataType, TypeClass};
use crate::value::{StructValue, Value};

/// Upper bound on pre-allocation driven by an untrusted length prefix.
const MAX_PREALLOC: usize = 4096;

/// A struct not yet read, positioned at its first field.
pub struct Bonded<'r, R, S> {
    reader: &'r mut R,
    schema: S,
    base: bool,
    consumed: bool,
}

impl<'r, R: Reader, S: Schema> Bonded<'r, R, S> {
    pub(crate) fn new(reader: &'r mut R, schema: S, base: bool) -> Self {
        Bonded { reader, schema, base, consumed: false }
    }

    pub fn schema(&self) -> S {
        self.schema
    }

    /// True when this is an inherited base layer.
    pub fn is_base(&self) -> bool {
        self.base
    }

    /// Parse the struct, driving `transform`. A struct can be read once.
    pub fn apply<T: Transform>(&mut self, transform: &mut T) -> Result<bool> {
        if self.consumed {
            return Err(CoreError::Unsupported(format!(
                "{} was already read",
                self.schema.metadata().qualified_name
            )));
        }
        self.consumed = true;
        self.reader.parse(transform, self.schema, self.base)
    }

    /// Decode into a dynamic value, unknown fields included.
    pub fn deserialize(&mut self) -> Result<StructValue> {
        let mut to = ToValue::new();
        self.apply(&mut to)?;
        Ok(to.into_struct())
    }

    pub fn deserialize_into(&mut self, target: &mut dyn Record) -> Result<()> {
        self.apply(&mut To::new(target)).map(|_| ())
    }

    pub fn skip(&mut self) -> Result<()> {
        if !self.consumed {
            self.apply(&mut Null)?;
        }
        Ok(())
    }
}

/// A list, set or map not yet read.
pub struct ContainerValue<'r, R, S: Schema> {
    reader: &'r mut R,
    kind: DataType,
    ty: Option<S::Type>,
    header: Option<ContainerHeader>,
    consumed: bool,
}

impl<'r, R: Reader, S: Schema> ContainerValue<'r, R, S> {
    pub(crate) fn new(reader: &'r mut R, kind: DataType, ty: Option<S::Type>) -> Self {
        ContainerValue { reader, kind, ty, header: None, consumed: false }
    }

    pub fn kind(&self) -> DataType {
        self.kind
    }

    /// Read the container header. Follow with `len` calls to [`element`]
    /// (each preceded by [`key`] for maps), then [`end`].
    ///
    /// [`element`]: ContainerValue::element
    /// [`key`]: ContainerValue::key
    /// [`end`]: ContainerValue::end
    pub fn begin(&mut self) -> Result<ContainerHeader> {
        self.consumed = true;
        let expected = |ty: Option<S::Type>| ty.map(S::data_type).unwrap_or(DataType::Unavailable);
        let element = expected(self.ty.and_then(S::element));
        let key = (self.kind == DataType::Map).then(|| expected(self.ty.and_then(S::key)));
        let header = self.reader.read_container_begin(self.kind, element, key)?;
        self.header = Some(header);
        Ok(header)
    }

    pub fn key(&mut self) -> Result<FieldValue<'_, R, S>> {
        let header = self.header.ok_or_else(|| CoreError::stream("container key read before begin"))?;
        let wire = header.key.ok_or_else(|| CoreError::stream("key read from a non-map container"))?;
        FieldValue::read(self.reader, wire, self.ty.and_then(S::key))
    }

    pub fn element(&mut self) -> Result<FieldValue<'_, R, S>> {
        let header = self.header.ok_or_else(|| CoreError::stream("container element read before begin"))?;
        FieldValue::read(self.reader, header.element, self.ty.and_then(S::element))
    }

    pub fn end(&mut self) -> Result<()> {
        self.reader.read_container_end()
    }

    pub fn deserialize(&mut self) -> Result<Value> {
        let header = self.begin()?;
        let capacity = header.len.min(MAX_PREALLOC);
        let value = if header.kind == DataType::Map {
            let mut pairs = Vec::with_capacity(capacity);
            for _ in 0..header.len {
                let key = self.key()?.deserialize()?;
                let value = self.element()?.deserialize()?;
                pairs.push((key, value));
            }
            Value::Map(pairs)
        } else {
            let mut items = Vec::with_capacity(capacity);
            for _ in 0..header.len {
                items.push(self.element()?.deserialize()?);
            }
            if header.kind == DataType::Set {
                Value::Set(items)
            } else {
                Value::List(items)
            }
        };
        self.end()?;
        Ok(value)
    }

    /// Discard the container. Untagged formats cannot skip blindly, so the
    /// elements are decoded and dropped.
    pub fn skip(&mut self) -> Result<()> {
        if self.consumed {
            return Ok(());
        }
        if R::KIND == ParserKind::Static {
            self.deserialize().map(drop)
        } else {
            self.consumed = true;
            self.reader.skip(self.kind)
        }
    }
}

/// Value of one field as delivered to a transform.
pub enum FieldValue<'r, R, S: Schema> {
    Basic(Value),
    /// Basic value of a known field whose wire type differs from the
    /// schema's basic type.
    Mismatched { value: Value, expected: DataType },
    Struct(Bonded<'r, R, S>),
    Container(ContainerValue<'r, R, S>),
}

impl<'r, R: Reader, S: Schema> FieldValue<'r, R, S> {
    /// Read a value of wire type `wire`. `ty` is the schema type when the
    /// wire type matches it, `None` for unknown values.
    pub(crate) fn read(reader: &'r mut R, wire: DataType, ty: Option<S::Type>) -> Result<Self> {
        Ok(match wire.class() {
            TypeClass::Basic | TypeClass::String => FieldValue::Basic(reader.read_basic(wire)?),
            TypeClass::Struct => {
                let schema = ty.and_then(S::nested).unwrap_or_else(S::unknown);
                FieldValue::Struct(Bonded::new(reader, schema, false))
            }
            TypeClass::Container => FieldValue::Container(ContainerValue::new(reader, wire, ty)),
            TypeClass::Marker => return Err(CoreError::InvalidDataType(wire as u8)),
        })
    }

    /// Wire type of the value.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Basic(v) | FieldValue::Mismatched { value: v, .. } => v.data_type(),
            FieldValue::Struct(_) => DataType::Struct,
            FieldValue::Container(c) => c.kind(),
        }
    }

    pub fn as_basic(&self) -> Option<&Value> {
        match self {
            FieldValue::Basic(v) | FieldValue::Mismatched { value: v, .. } => Some(v),
            _ => None,
        }
    }

    pub fn deserialize(&mut self) -> Result<Value> {
        match self {
            FieldValue::Basic(v) | FieldValue::Mismatched { value: v, .. } => Ok(v.clone()),
            FieldValue::Struct(b) => b.deserialize().map(Value::Struct),
            FieldValue::Container(c) => c.deserialize(),
        }
    }

    pub(crate) fn mismatched(value: Value, expected: DataType) -> Self {
        FieldValue::Mismatched { value, expected }
    }

    /// Skip whatever the transform did not read.
    pub(crate) fn finish(&mut self) -> Result<()> {
        match self {
            FieldValue::Basic(_) | FieldValue::Mismatched { .. } => Ok(()),
            FieldValue::Struct(b) => b.skip(),
            FieldValue::Container(c) => c.skip(),
        }
    }
}

//! Reads an in-memory [`StructValue`] as if it were a payload.
//!
//! This is how typed records and dynamic values are serialized: the static
//! parser walks the value, and the serializer on the other side may leave out
//! optional fields still equal to their default.

use crate::error::{CoreError, Result};
use crate::protocol::{ContainerHeader, ParserKind, Reader};
use crate::schema::Schema;
use crate::static_parser::StaticParser;
use crate::transform::Transform;
use crate::types::DataType;
use crate::value::{StructValue, Value};
use std::slice;

static EMPTY: StructValue = StructValue::new();

enum Frame<'v> {
    Root(&'v StructValue),
    Node(&'v Value),
    Struct(&'v StructValue),
    Items(slice::Iter<'v, Value>),
    Pairs(slice::Iter<'v, (Value, Value)>, Option<&'v Value>),
}

pub struct ValueReader<'v> {
    stack: Vec<Frame<'v>>,
}

impl<'v> ValueReader<'v> {
    pub fn new(root: &'v StructValue) -> Self {
        ValueReader { stack: vec![Frame::Root(root)] }
    }

    fn next_node(&mut self) -> Result<&'v Value> {
        let node = match self.stack.last_mut() {
            Some(Frame::Node(node)) => Some(*node),
            Some(Frame::Items(items)) => items.next(),
            Some(Frame::Pairs(pairs, pending)) => match pending.take() {
                Some(value) => Some(value),
                None => pairs.next().map(|(key, value)| {
                    *pending = Some(value);
                    key
                }),
            },
            _ => None,
        };
        node.ok_or_else(|| CoreError::stream("no value at the current position"))
    }

    fn next_struct(&mut self) -> Result<&'v StructValue> {
        if let Some(Frame::Root(root)) = self.stack.last() {
            return Ok(*root);
        }
        match self.next_node()? {
            Value::Struct(s) => Ok(s),
            other => Err(CoreError::mismatch(DataType::Struct, other.data_type())),
        }
    }

    fn current_struct(&self) -> Result<&'v StructValue> {
        match self.stack.last() {
            Some(Frame::Struct(s)) => Ok(*s),
            _ => Err(CoreError::stream("field read outside of a struct")),
        }
    }
}

impl Reader for ValueReader<'_> {
    const KIND: ParserKind = ParserKind::Static;
    const IN_MEMORY: bool = true;

    fn read_struct_begin(&mut self, base: bool) -> Result<()> {
        let s = if base {
            self.current_struct()?.base.as_deref().unwrap_or(&EMPTY)
        } else {
            self.next_struct()?
        };
        self.stack.push(Frame::Struct(s));
        Ok(())
    }

    fn read_struct_end(&mut self, _: bool) -> Result<()> {
        self.stack.pop();
        Ok(())
    }

    fn read_field_omitted(&mut self, id: u16) -> Result<bool> {
        match self.current_struct()?.get(id) {
            Some(value) => {
                self.stack.push(Frame::Node(value));
                Ok(false)
            }
            None => Ok(true),
        }
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.stack.pop();
        Ok(())
    }

    fn read_container_begin(
        &mut self,
        kind: DataType,
        element: DataType,
        key: Option<DataType>,
    ) -> Result<ContainerHeader> {
        let node = self.next_node()?;
        let known = |expected: DataType, first: Option<&Value>| {
            if expected != DataType::Unavailable {
                expected
            } else {
                first.map_or(DataType::Unavailable, Value::data_type)
            }
        };
        let header = match (kind, node) {
            (DataType::List, Value::List(items)) | (DataType::Set, Value::Set(items)) => {
                self.stack.push(Frame::Items(items.iter()));
                ContainerHeader { kind, len: items.len(), element: known(element, items.first()), key: None }
            }
            (DataType::Map, Value::Map(pairs)) => {
                self.stack.push(Frame::Pairs(pairs.iter(), None));
                let first = pairs.first();
                ContainerHeader {
                    kind,
                    len: pairs.len(),
                    element: known(element, first.map(|(_, v)| v)),
                    key: Some(known(key.unwrap_or(DataType::Unavailable), first.map(|(k, _)| k))),
                }
            }
            (_, other) => return Err(CoreError::mismatch(kind, other.data_type())),
        };
        Ok(header)
    }

    fn read_container_end(&mut self) -> Result<()> {
        self.stack.pop();
        Ok(())
    }

    fn read_basic(&mut self, ty: DataType) -> Result<Value> {
        self.next_node()?.clone().coerce(ty)
    }

    fn skip(&mut self, _: DataType) -> Result<()> {
        self.next_node().map(drop)
    }

    fn parse<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S, base: bool) -> Result<bool> {
        StaticParser::new(self, base).apply(transform, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_map_pairs_in_order() {
        let root = StructValue::new().with(
            1,
            Value::Map(vec![(Value::U8(1), "a".into()), (Value::U8(2), "b".into())]),
        );
        let mut reader = ValueReader::new(&root);
        reader.read_struct_begin(false).expect("root");
        assert!(!reader.read_field_omitted(1).expect("present"));
        let header = reader
            .read_container_begin(DataType::Map, DataType::String, Some(DataType::UInt16))
            .expect("map");
        assert_eq!(header.len, 2);
        assert_eq!(header.key, Some(DataType::UInt16));
        assert_eq!(reader.read_basic(DataType::UInt16).expect("key"), Value::U16(1));
        assert_eq!(reader.read_basic(DataType::String).expect("value"), Value::from("a"));
        assert_eq!(reader.read_basic(DataType::UInt16).expect("key"), Value::U16(2));
        assert_eq!(reader.read_basic(DataType::String).expect("value"), Value::from("b"));
        assert!(reader.read_basic(DataType::UInt16).is_err());
    }

    #[test]
    fn missing_field_is_omitted_and_missing_base_is_empty() {
        let root = StructValue::new().with(2, Value::Bool(true));
        let mut reader = ValueReader::new(&root);
        reader.read_struct_begin(false).expect("root");
        assert!(reader.read_field_omitted(1).expect("absent"));
        reader.read_struct_begin(true).expect("base");
        assert!(reader.read_field_omitted(2).expect("base has nothing"));
    }
}

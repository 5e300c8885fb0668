//! Dynamic values: the in-memory form of a payload decoded without a typed
//! destination, and the source the serializer reads typed records from.

use crate::error::{CoreError, Result};
use crate::types::{is_matching, DataType};
use std::collections::BTreeMap;

/// A single decoded value (field, container element or struct).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// UTF-16 code units.
    WString(Vec<u16>),
    Struct(StructValue),
    List(Vec<Value>),
    Set(Vec<Value>),
    /// Key/value pairs in wire order.
    Map(Vec<(Value, Value)>),
}

/// Fields of one struct level by id, plus its base layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    pub fields: BTreeMap<u16, Value>,
    pub base: Option<Box<StructValue>>,
}

impl StructValue {
    pub const fn new() -> Self {
        StructValue { fields: BTreeMap::new(), base: None }
    }

    pub fn with(mut self, id: u16, value: Value) -> Self {
        self.fields.insert(id, value);
        self
    }

    pub fn with_base(mut self, base: StructValue) -> Self {
        self.base = Some(Box::new(base));
        self
    }

    pub fn get(&self, id: u16) -> Option<&Value> {
        self.fields.get(&id)
    }
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::U8(_) => DataType::UInt8,
            Value::U16(_) => DataType::UInt16,
            Value::U32(_) => DataType::UInt32,
            Value::U64(_) => DataType::UInt64,
            Value::I8(_) => DataType::Int8,
            Value::I16(_) => DataType::Int16,
            Value::I32(_) => DataType::Int32,
            Value::I64(_) => DataType::Int64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::WString(_) => DataType::WString,
            Value::Struct(_) => DataType::Struct,
            Value::List(_) => DataType::List,
            Value::Set(_) => DataType::Set,
            Value::Map(_) => DataType::Map,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(x) => Some(*x as u64),
            Value::U16(x) => Some(*x as u64),
            Value::U32(x) => Some(*x as u64),
            Value::U64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(x) => Some(*x as i64),
            Value::I16(x) => Some(*x as i64),
            Value::I32(x) => Some(*x as i64),
            Value::I64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x as f64),
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Convert to wire type `ty` under the numeric matching rule.
    ///
    /// Fails with `MismatchedType` when the conversion would cross
    /// signedness, narrow, or change kind.
    pub fn coerce(self, ty: DataType) -> Result<Value> {
        let src = self.data_type();
        if src == ty {
            return Ok(self);
        }
        if !is_matching(src, ty) {
            return Err(CoreError::mismatch(ty, src));
        }
        let mismatch = || CoreError::mismatch(ty, src);
        Ok(match ty {
            DataType::UInt16 => Value::U16(self.as_u64().ok_or_else(mismatch)? as u16),
            DataType::UInt32 => Value::U32(self.as_u64().ok_or_else(mismatch)? as u32),
            DataType::UInt64 => Value::U64(self.as_u64().ok_or_else(mismatch)?),
            DataType::Int16 => Value::I16(self.as_i64().ok_or_else(mismatch)? as i16),
            DataType::Int32 => Value::I32(self.as_i64().ok_or_else(mismatch)? as i32),
            DataType::Int64 => Value::I64(self.as_i64().ok_or_else(mismatch)?),
            DataType::Double => Value::Double(self.as_f64().ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_widens_within_signedness() {
        assert_eq!(Value::U8(200).coerce(DataType::UInt32).expect("widen"), Value::U32(200));
        assert_eq!(Value::I8(-3).coerce(DataType::Int64).expect("widen"), Value::I64(-3));
        assert_eq!(Value::Float(1.5).coerce(DataType::Double).expect("widen"), Value::Double(1.5));
    }

    #[test]
    fn coerce_rejects_crossing() {
        assert!(Value::U16(1).coerce(DataType::UInt8).is_err());
        assert!(Value::I32(1).coerce(DataType::UInt64).is_err());
        assert!(Value::Bool(true).coerce(DataType::UInt8).is_err());
        assert!(Value::from("x").coerce(DataType::WString).is_err());
    }

    #[test]
    fn struct_builder() {
        let s = StructValue::new().with(1, Value::U32(5)).with_base(StructValue::new().with(0, Value::Bool(true)));
        assert_eq!(s.get(1), Some(&Value::U32(5)));
        assert_eq!(s.base.as_ref().and_then(|b| b.get(0)), Some(&Value::Bool(true)));
    }
}

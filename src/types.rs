//! Wire type tags and type classification.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Field id reserved as "invalid/none".
pub const INVALID_FIELD_ID: u16 = 0xFFFF;

/// On-the-wire representation of a value.
///
/// `Stop` and `StopBase` are structural sentinels of tagged protocols, never
/// field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Stop = 0,
    StopBase = 1,
    Bool = 2,
    UInt8 = 3,
    UInt16 = 4,
    UInt32 = 5,
    UInt64 = 6,
    Float = 7,
    Double = 8,
    String = 9,
    Struct = 10,
    List = 11,
    Set = 12,
    Map = 13,
    Int8 = 14,
    Int16 = 15,
    Int32 = 16,
    Int64 = 17,
    WString = 18,
    Unavailable = 127,
}

/// Coarse classification used by parsers to decide how a field value is
/// delivered: eagerly for basic and string types, lazily for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Basic,
    String,
    Struct,
    Container,
    /// Sentinels and `Unavailable`.
    Marker,
}

impl TryFrom<u8> for DataType {
    type Error = CoreError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => DataType::Stop,
            1 => DataType::StopBase,
            2 => DataType::Bool,
            3 => DataType::UInt8,
            4 => DataType::UInt16,
            5 => DataType::UInt32,
            6 => DataType::UInt64,
            7 => DataType::Float,
            8 => DataType::Double,
            9 => DataType::String,
            10 => DataType::Struct,
            11 => DataType::List,
            12 => DataType::Set,
            13 => DataType::Map,
            14 => DataType::Int8,
            15 => DataType::Int16,
            16 => DataType::Int32,
            17 => DataType::Int64,
            18 => DataType::WString,
            127 => DataType::Unavailable,
            other => return Err(CoreError::InvalidDataType(other)),
        })
    }
}

impl DataType {
    pub fn class(self) -> TypeClass {
        match self {
            DataType::Bool
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::Float
            | DataType::Double => TypeClass::Basic,
            DataType::String | DataType::WString => TypeClass::String,
            DataType::Struct => TypeClass::Struct,
            DataType::List | DataType::Set | DataType::Map => TypeClass::Container,
            DataType::Stop | DataType::StopBase | DataType::Unavailable => TypeClass::Marker,
        }
    }

    /// Scalars and strings: values a parser reads eagerly.
    pub fn is_basic(self) -> bool {
        matches!(self.class(), TypeClass::Basic | TypeClass::String)
    }

    pub fn is_string(self) -> bool {
        self.class() == TypeClass::String
    }

    pub fn is_container(self) -> bool {
        self.class() == TypeClass::Container
    }

    pub fn is_struct(self) -> bool {
        self == DataType::Struct
    }

    pub fn is_stop(self) -> bool {
        matches!(self, DataType::Stop | DataType::StopBase)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64)
    }

    /// Width in bytes of fixed-size scalars, 0 otherwise.
    pub fn size(self) -> usize {
        match self {
            DataType::Bool | DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Double => 8,
            _ => 0,
        }
    }
}

/// Whether a value of wire type `src` may be assigned to a destination of
/// type `dst`.
///
/// Identical types always match. Otherwise only same-signedness integer
/// widening and float to double are allowed. Bool, strings and non-basic
/// types only match themselves.
pub fn is_matching(src: DataType, dst: DataType) -> bool {
    if src == dst {
        return true;
    }
    if src.is_unsigned() && dst.is_unsigned() || src.is_signed() && dst.is_signed() {
        return src.size() <= dst.size();
    }
    src == DataType::Float && dst == DataType::Double
}

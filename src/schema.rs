//! Schema model shared by compile-time and runtime schemas.
//!
//! Parsers are written once against the [`Schema`] capability; the two
//! realizations are [`StaticSchema`](crate::reflection::StaticSchema) and
//! [`RuntimeSchema`](crate::runtime_schema::RuntimeSchema).

use crate::types::DataType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Modifier {
    #[default]
    Optional,
    Required,
    RequiredOptional,
}

/// Schema-declared default of a field.
///
/// Bools are stored as `UInt(0)` / `UInt(1)`. `Nothing` marks a field with no
/// default at all (an `Option` slot, a struct or a container).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DefaultValue {
    #[default]
    Nothing,
    UInt(u64),
    Int(i64),
    Double(f64),
    String(Cow<'static, str>),
    WString(Cow<'static, [u16]>),
}

impl DefaultValue {
    pub const fn str(s: &'static str) -> Self {
        DefaultValue::String(Cow::Borrowed(s))
    }

    pub const fn bool(b: bool) -> Self {
        DefaultValue::UInt(b as u64)
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, DefaultValue::Nothing)
    }

    /// The default as a value of wire type `ty`, or `None` when the type has
    /// no literal default (structs, containers, `Nothing`).
    pub fn to_value(&self, ty: DataType) -> Option<Value> {
        let v = match (self, ty) {
            (DefaultValue::Nothing, _) => return None,
            (DefaultValue::String(s), DataType::String) => Value::String(s.to_string()),
            (DefaultValue::String(s), DataType::WString) => Value::WString(s.encode_utf16().collect()),
            (DefaultValue::WString(w), DataType::WString) => Value::WString(w.to_vec()),
            (DefaultValue::WString(w), DataType::String) => Value::String(String::from_utf16_lossy(w)),
            (DefaultValue::String(_) | DefaultValue::WString(_), _) => return None,
            (d, ty) => {
                let (u, i, f) = match d {
                    DefaultValue::UInt(u) => (*u, *u as i64, *u as f64),
                    DefaultValue::Int(i) => (*i as u64, *i, *i as f64),
                    DefaultValue::Double(f) => (*f as u64, *f as i64, *f),
                    _ => return None,
                };
                match ty {
                    DataType::Bool => Value::Bool(u != 0),
                    DataType::UInt8 => Value::U8(u as u8),
                    DataType::UInt16 => Value::U16(u as u16),
                    DataType::UInt32 => Value::U32(u as u32),
                    DataType::UInt64 => Value::U64(u),
                    DataType::Int8 => Value::I8(i as i8),
                    DataType::Int16 => Value::I16(i as i16),
                    DataType::Int32 => Value::I32(i as i32),
                    DataType::Int64 => Value::I64(i),
                    DataType::Float => Value::Float(f as f32),
                    DataType::Double => Value::Double(f),
                    _ => return None,
                }
            }
        };
        Some(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: Cow<'static, str>,
    pub value: Cow<'static, str>,
}

impl Attribute {
    pub const fn new(name: &'static str, value: &'static str) -> Self {
        Attribute { name: Cow::Borrowed(name), value: Cow::Borrowed(value) }
    }
}

/// Name, attributes, modifier and default of a struct or field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: Cow<'static, str>,
    pub qualified_name: Cow<'static, str>,
    pub attributes: Cow<'static, [Attribute]>,
    pub modifier: Modifier,
    pub default_value: DefaultValue,
}

impl Metadata {
    pub const fn new(
        name: &'static str,
        qualified_name: &'static str,
        attributes: &'static [Attribute],
        modifier: Modifier,
        default_value: DefaultValue,
    ) -> Self {
        Metadata {
            name: Cow::Borrowed(name),
            qualified_name: Cow::Borrowed(qualified_name),
            attributes: Cow::Borrowed(attributes),
            modifier,
            default_value,
        }
    }

    pub const fn structure(name: &'static str, qualified_name: &'static str) -> Self {
        Metadata::new(name, qualified_name, &[], Modifier::Optional, DefaultValue::Nothing)
    }

    pub const fn field(name: &'static str, modifier: Modifier, default_value: DefaultValue) -> Self {
        Metadata::new(name, "", &[], modifier, default_value)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_ref())
    }

    pub fn is_required(&self) -> bool {
        self.modifier == Modifier::Required
    }

    pub fn is_optional(&self) -> bool {
        self.modifier == Modifier::Optional
    }
}

/// One field of a schema level, borrowed from the schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor<'s, T> {
    pub id: u16,
    pub metadata: &'s Metadata,
    pub ty: T,
}

/// Query contract every schema realization provides to the parsers.
///
/// Handles are cheap `Copy` views; the schema data itself is immutable and
/// can be shared across threads.
pub trait Schema: Copy + fmt::Debug {
    /// Type descriptor of a field or container element.
    type Type: Copy + fmt::Debug;

    fn metadata(&self) -> &Metadata;

    fn field_count(&self) -> usize;

    /// Field at `index`, in ascending id order.
    fn field(&self, index: usize) -> FieldDescriptor<'_, Self::Type>;

    fn base(&self) -> Option<Self>;

    /// Schema with no fields, used to walk structs the schema does not know.
    fn unknown() -> Self;

    fn data_type(ty: Self::Type) -> DataType;

    /// Schema of a struct-typed descriptor.
    fn nested(ty: Self::Type) -> Option<Self>;

    /// Element type of a list or set, value type of a map.
    fn element(ty: Self::Type) -> Option<Self::Type>;

    /// Key type of a map.
    fn key(ty: Self::Type) -> Option<Self::Type>;

    fn fields(&self) -> Fields<'_, Self> {
        Fields { schema: self, next: 0 }
    }

    fn find_field(&self, id: u16) -> Option<FieldDescriptor<'_, Self::Type>> {
        self.fields().find(|f| f.id == id)
    }
}

pub struct Fields<'s, S> {
    schema: &'s S,
    next: usize,
}

impl<'s, S: Schema> Iterator for Fields<'s, S> {
    type Item = FieldDescriptor<'s, S::Type>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.schema.field_count() {
            return None;
        }
        let field = self.schema.field(self.next);
        self.next += 1;
        Some(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_literal_per_type() {
        assert_eq!(DefaultValue::UInt(7).to_value(DataType::UInt16), Some(Value::U16(7)));
        assert_eq!(DefaultValue::bool(true).to_value(DataType::Bool), Some(Value::Bool(true)));
        assert_eq!(DefaultValue::Int(-2).to_value(DataType::Int64), Some(Value::I64(-2)));
        assert_eq!(DefaultValue::Double(0.5).to_value(DataType::Float), Some(Value::Float(0.5)));
        assert_eq!(
            DefaultValue::str("ab").to_value(DataType::WString),
            Some(Value::WString(vec![97, 98]))
        );
        assert_eq!(DefaultValue::Nothing.to_value(DataType::UInt32), None);
        assert_eq!(DefaultValue::UInt(0).to_value(DataType::List), None);
    }

    #[test]
    fn attribute_lookup() {
        static ATTRS: [Attribute; 1] = [Attribute::new("JsonName", "n")];
        let md = Metadata::new("name", "", &ATTRS, Modifier::Required, DefaultValue::Nothing);
        assert_eq!(md.attribute("JsonName"), Some("n"));
        assert_eq!(md.attribute("Other"), None);
        assert!(md.is_required());
    }
}

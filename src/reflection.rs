//! Compile-time schemas and typed records.
//!
//! A record type is declared with [`bond_record!`](crate::bond_record), which
//! emits the Rust struct together with a `static` [`StaticStruct`] describing
//! it. Nothing is built at run time: [`StaticSchema`] is a pointer to that
//! static and implements [`Schema`] for the parsers.
//!
//! Field values are reached through the object-safe [`BondValue`] trait, so
//! the `To` and `MapTo` transforms can assign into any record by field id
//! without knowing its concrete type.

use crate::error::{CoreError, Result};
use crate::schema::{DefaultValue, FieldDescriptor, Metadata, Schema};
use crate::types::DataType;
use crate::value::{StructValue, Value};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Static description of one struct level.
#[derive(Debug)]
pub struct StaticStruct {
    pub metadata: Metadata,
    pub base: Option<fn() -> &'static StaticStruct>,
    /// Ascending by id.
    pub fields: &'static [StaticField],
}

#[derive(Debug)]
pub struct StaticField {
    pub id: u16,
    pub metadata: Metadata,
    pub ty: &'static StaticType,
}

/// Static type of a field or container element.
#[derive(Clone, Copy)]
pub enum StaticType {
    Basic(DataType),
    Struct(fn() -> &'static StaticStruct),
    List(&'static StaticType),
    Set(&'static StaticType),
    Map(&'static StaticType, &'static StaticType),
}

impl fmt::Debug for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Basic(dt) => write!(f, "{dt:?}"),
            StaticType::Struct(s) => write!(f, "Struct({})", s().metadata.qualified_name),
            StaticType::List(e) => write!(f, "List<{e:?}>"),
            StaticType::Set(e) => write!(f, "Set<{e:?}>"),
            StaticType::Map(k, v) => write!(f, "Map<{k:?}, {v:?}>"),
        }
    }
}

impl StaticType {
    pub const fn data_type(&self) -> DataType {
        match self {
            StaticType::Basic(dt) => *dt,
            StaticType::Struct(_) => DataType::Struct,
            StaticType::List(_) => DataType::List,
            StaticType::Set(_) => DataType::Set,
            StaticType::Map(_, _) => DataType::Map,
        }
    }

    /// Whether `value` can be assigned to a slot of this type. Basic values
    /// follow the numeric matching rule; containers are checked element by
    /// element.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (StaticType::Basic(dt), v) => crate::types::is_matching(v.data_type(), *dt),
            (StaticType::Struct(_), Value::Struct(_)) => true,
            (StaticType::List(e), Value::List(items)) | (StaticType::Set(e), Value::Set(items)) => {
                items.iter().all(|item| e.accepts(item))
            }
            (StaticType::Map(k, v), Value::Map(pairs)) => {
                pairs.iter().all(|(key, value)| k.accepts(key) && v.accepts(value))
            }
            _ => false,
        }
    }
}

static UNKNOWN_STRUCT: StaticStruct = StaticStruct {
    metadata: Metadata::structure("Unknown", "Unknown"),
    base: None,
    fields: &[],
};

/// Handle to a compile-time schema.
#[derive(Clone, Copy)]
pub struct StaticSchema(&'static StaticStruct);

impl StaticSchema {
    pub const fn new(schema: &'static StaticStruct) -> Self {
        StaticSchema(schema)
    }

    pub fn definition(&self) -> &'static StaticStruct {
        self.0
    }

    pub fn field_by_id(&self, id: u16) -> Option<&'static StaticField> {
        self.0.fields.iter().find(|f| f.id == id)
    }
}

impl fmt::Debug for StaticSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticSchema").field(&self.0.metadata.qualified_name).finish()
    }
}

impl Schema for StaticSchema {
    type Type = &'static StaticType;

    fn metadata(&self) -> &Metadata {
        &self.0.metadata
    }

    fn field_count(&self) -> usize {
        self.0.fields.len()
    }

    fn field(&self, index: usize) -> FieldDescriptor<'_, Self::Type> {
        let f = &self.0.fields[index];
        FieldDescriptor { id: f.id, metadata: &f.metadata, ty: f.ty }
    }

    fn base(&self) -> Option<Self> {
        self.0.base.map(|base| StaticSchema(base()))
    }

    fn unknown() -> Self {
        StaticSchema(&UNKNOWN_STRUCT)
    }

    fn data_type(ty: Self::Type) -> DataType {
        ty.data_type()
    }

    fn nested(ty: Self::Type) -> Option<Self> {
        match ty {
            StaticType::Struct(s) => Some(StaticSchema(s())),
            _ => None,
        }
    }

    fn element(ty: Self::Type) -> Option<Self::Type> {
        match ty {
            StaticType::List(e) | StaticType::Set(e) | StaticType::Map(_, e) => Some(*e),
            _ => None,
        }
    }

    fn key(ty: Self::Type) -> Option<Self::Type> {
        match ty {
            StaticType::Map(k, _) => Some(*k),
            _ => None,
        }
    }
}

/// Object-safe access to one field slot of a record.
pub trait BondValue: fmt::Debug {
    fn data_type(&self) -> DataType;

    fn to_value(&self) -> Value;

    /// Overwrite the slot. Basic values are widened under the matching rule;
    /// anything else of the wrong kind is `MismatchedType`.
    fn assign(&mut self, value: Value) -> Result<()>;

    /// False for an inactive `Option` slot.
    fn is_present(&self) -> bool {
        true
    }

    /// Empty a list or map slot before its elements are assigned one by one.
    fn clear_elements(&mut self) {}

    /// Append a default element to a list slot.
    fn push_element(&mut self) -> Option<&mut dyn BondValue> {
        None
    }

    /// Insert a default value under `key` in a map slot, replacing any
    /// previous one.
    fn insert_element(&mut self, key: Value) -> Result<Option<&mut dyn BondValue>> {
        let _ = key;
        Ok(None)
    }

    /// The slot as a nested record, activating an `Option` slot.
    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }
}

/// Compile-time type information of a field type.
pub trait BondType: BondValue + Default + Sized {
    const TYPE: &'static StaticType;

    /// Default used when a field declares none.
    const IMPLICIT_DEFAULT: DefaultValue = DefaultValue::Nothing;

    /// Schema accessor when the type is a record.
    const STRUCT: Option<fn() -> &'static StaticStruct> = None;

    /// Instance initialized from a schema default.
    fn from_default(default: &DefaultValue) -> Self {
        let _ = default;
        Self::default()
    }
}

/// A generated struct type: fields addressable by id.
pub trait Record: fmt::Debug {
    fn schema() -> StaticSchema
    where
        Self: Sized;

    fn record_schema(&self) -> StaticSchema;

    fn field(&self, id: u16) -> Option<&dyn BondValue>;

    fn field_mut(&mut self, id: u16) -> Option<&mut dyn BondValue>;

    fn base(&self) -> Option<&dyn Record> {
        None
    }

    fn base_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    /// Snapshot as a dynamic value. Inactive `Option` slots are left out.
    fn to_struct_value(&self) -> StructValue {
        let schema = self.record_schema();
        let mut out = StructValue::new();
        for f in schema.definition().fields {
            if let Some(slot) = self.field(f.id) {
                if slot.is_present() {
                    out.fields.insert(f.id, slot.to_value());
                }
            }
        }
        out.base = self.base().map(|b| Box::new(b.to_struct_value()));
        out
    }

    /// Assign every field of `value` the schema declares with a compatible
    /// type. Other entries are dropped.
    fn assign_struct(&mut self, value: StructValue) -> Result<()> {
        let schema = self.record_schema();
        for (id, v) in value.fields {
            let Some(field) = schema.field_by_id(id) else { continue };
            if !field.ty.accepts(&v) {
                tracing::trace!(id, "dropping mismatched struct member");
                continue;
            }
            if let Some(slot) = self.field_mut(id) {
                slot.assign(v)?;
            }
        }
        if let (Some(base), Some(slot)) = (value.base, self.base_mut()) {
            slot.assign_struct(*base)?;
        }
        Ok(())
    }
}

macro_rules! scalar_value {
    ($($t:ty => $dt:ident, $variant:ident, $implicit:expr;)*) => {$(
        impl BondValue for $t {
            fn data_type(&self) -> DataType {
                DataType::$dt
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn assign(&mut self, value: Value) -> Result<()> {
                match value.coerce(DataType::$dt)? {
                    Value::$variant(v) => {
                        *self = v;
                        Ok(())
                    }
                    other => Err(CoreError::mismatch(DataType::$dt, other.data_type())),
                }
            }
        }

        impl BondType for $t {
            const TYPE: &'static StaticType = &StaticType::Basic(DataType::$dt);
            const IMPLICIT_DEFAULT: DefaultValue = $implicit;

            fn from_default(default: &DefaultValue) -> Self {
                match default.to_value(DataType::$dt) {
                    Some(Value::$variant(v)) => v,
                    _ => Self::default(),
                }
            }
        }
    )*};
}

scalar_value! {
    bool => Bool, Bool, DefaultValue::UInt(0);
    u8 => UInt8, U8, DefaultValue::UInt(0);
    u16 => UInt16, U16, DefaultValue::UInt(0);
    u32 => UInt32, U32, DefaultValue::UInt(0);
    u64 => UInt64, U64, DefaultValue::UInt(0);
    i8 => Int8, I8, DefaultValue::Int(0);
    i16 => Int16, I16, DefaultValue::Int(0);
    i32 => Int32, I32, DefaultValue::Int(0);
    i64 => Int64, I64, DefaultValue::Int(0);
    f32 => Float, Float, DefaultValue::Double(0.0);
    f64 => Double, Double, DefaultValue::Double(0.0);
    String => String, String, DefaultValue::str("");
}

/// Wide string stored as UTF-16 code units.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WString(pub Vec<u16>);

impl From<&str> for WString {
    fn from(s: &str) -> Self {
        WString(s.encode_utf16().collect())
    }
}

impl fmt::Display for WString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf16_lossy(&self.0))
    }
}

impl BondValue for WString {
    fn data_type(&self) -> DataType {
        DataType::WString
    }

    fn to_value(&self) -> Value {
        Value::WString(self.0.clone())
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        match value {
            Value::WString(w) => {
                self.0 = w;
                Ok(())
            }
            other => Err(CoreError::mismatch(DataType::WString, other.data_type())),
        }
    }
}

impl BondType for WString {
    const TYPE: &'static StaticType = &StaticType::Basic(DataType::WString);
    const IMPLICIT_DEFAULT: DefaultValue = DefaultValue::str("");

    fn from_default(default: &DefaultValue) -> Self {
        match default.to_value(DataType::WString) {
            Some(Value::WString(w)) => WString(w),
            _ => WString::default(),
        }
    }
}

impl<T: BondType> BondValue for Vec<T> {
    fn data_type(&self) -> DataType {
        DataType::List
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(BondValue::to_value).collect())
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        let Value::List(items) = value else {
            return Err(CoreError::mismatch(DataType::List, value.data_type()));
        };
        self.clear();
        for item in items {
            let mut element = T::default();
            element.assign(item)?;
            self.push(element);
        }
        Ok(())
    }

    fn clear_elements(&mut self) {
        self.clear();
    }

    fn push_element(&mut self) -> Option<&mut dyn BondValue> {
        self.push(T::default());
        self.last_mut().map(|e| e as &mut dyn BondValue)
    }
}

impl<T: BondType> BondType for Vec<T> {
    const TYPE: &'static StaticType = &StaticType::List(T::TYPE);
}

impl<T: BondType + Ord> BondValue for BTreeSet<T> {
    fn data_type(&self) -> DataType {
        DataType::Set
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(BondValue::to_value).collect())
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        let Value::Set(items) = value else {
            return Err(CoreError::mismatch(DataType::Set, value.data_type()));
        };
        self.clear();
        for item in items {
            let mut element = T::default();
            element.assign(item)?;
            self.insert(element);
        }
        Ok(())
    }
}

impl<T: BondType + Ord> BondType for BTreeSet<T> {
    const TYPE: &'static StaticType = &StaticType::Set(T::TYPE);
}

impl<K: BondType + Ord, V: BondType> BondValue for BTreeMap<K, V> {
    fn data_type(&self) -> DataType {
        DataType::Map
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        let Value::Map(pairs) = value else {
            return Err(CoreError::mismatch(DataType::Map, value.data_type()));
        };
        self.clear();
        for (k, v) in pairs {
            let mut key = K::default();
            key.assign(k)?;
            let mut item = V::default();
            item.assign(v)?;
            self.insert(key, item);
        }
        Ok(())
    }

    fn clear_elements(&mut self) {
        self.clear();
    }

    fn insert_element(&mut self, key: Value) -> Result<Option<&mut dyn BondValue>> {
        let mut k = K::default();
        k.assign(key)?;
        let slot: &mut dyn BondValue = match self.entry(k) {
            Entry::Occupied(mut e) => {
                e.insert(V::default());
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(V::default()),
        };
        Ok(Some(slot))
    }
}

impl<K: BondType + Ord, V: BondType> BondType for BTreeMap<K, V> {
    const TYPE: &'static StaticType = &StaticType::Map(K::TYPE, V::TYPE);
}

/// `Option<T>` is a nullable slot: absent from the wire when `None`,
/// activated on first assignment.
impl<T: BondType> BondValue for Option<T> {
    fn data_type(&self) -> DataType {
        T::TYPE.data_type()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => T::default().to_value(),
        }
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        self.get_or_insert_with(T::default).assign(value)
    }

    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        self.get_or_insert_with(T::default).as_record_mut()
    }

    fn clear_elements(&mut self) {
        self.get_or_insert_with(T::default).clear_elements();
    }

    fn push_element(&mut self) -> Option<&mut dyn BondValue> {
        self.get_or_insert_with(T::default).push_element()
    }

    fn insert_element(&mut self, key: Value) -> Result<Option<&mut dyn BondValue>> {
        self.get_or_insert_with(T::default).insert_element(key)
    }
}

impl<T: BondType> BondType for Option<T> {
    const TYPE: &'static StaticType = T::TYPE;
    const STRUCT: Option<fn() -> &'static StaticStruct> = T::STRUCT;

    fn from_default(default: &DefaultValue) -> Self {
        if default.is_nothing() {
            None
        } else {
            Some(T::from_default(default))
        }
    }
}

/// Compile-time check behind `bond_record!`: the parsers merge fields by
/// ascending id.
#[doc(hidden)]
pub const fn assert_ascending_ids(ids: &[u16]) {
    let mut i = 1;
    while i < ids.len() {
        assert!(ids[i - 1] < ids[i], "bond_record! field ids must be strictly ascending");
        i += 1;
    }
}

/// Declare a record type.
///
/// ```
/// bondcore::bond_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Point("example.Point") {
///         1 => Required x: i32,
///         2 => Optional y: i32 = bondcore::DefaultValue::Int(-1),
///         3 => Optional label: Option<String>,
///     }
/// }
///
/// let p = Point::default();
/// assert_eq!(p.y, -1);
/// assert!(p.label.is_none());
/// ```
///
/// A base record is named after the qualified name (`: Base`) and stored in a
/// field called `base`. Fields must be listed in strictly ascending id
/// order; anything else fails to compile.
#[macro_export]
macro_rules! bond_record {
    (@base_struct) => { None };
    (@base_struct $base:ty) => { <$base as $crate::reflection::BondType>::STRUCT };
    (@default $fty:ty) => { <$fty as $crate::reflection::BondType>::IMPLICIT_DEFAULT };
    (@default $fty:ty, $default:expr) => { $default };
    (@base_access) => {};
    (@base_access $base:ty) => {
        fn base(&self) -> Option<&dyn $crate::reflection::Record> {
            Some(&self.base)
        }

        fn base_mut(&mut self) -> Option<&mut dyn $crate::reflection::Record> {
            Some(&mut self.base)
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($qualified:literal) $(: $base:ty)? {
            $(
                $(#[$fmeta:meta])*
                $id:literal => $modifier:ident $field:ident : $fty:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(pub base: $base,)?
            $(
                $(#[$fmeta])*
                pub $field: $fty,
            )*
        }

        impl $name {
            #[doc(hidden)]
            pub fn bond_static_struct() -> &'static $crate::reflection::StaticStruct {
                const _: () = $crate::reflection::assert_ascending_ids(&[$($id),*]);
                static SCHEMA: $crate::reflection::StaticStruct = $crate::reflection::StaticStruct {
                    metadata: $crate::schema::Metadata::structure(stringify!($name), $qualified),
                    base: $crate::bond_record!(@base_struct $($base)?),
                    fields: &[$(
                        $crate::reflection::StaticField {
                            id: $id,
                            metadata: $crate::schema::Metadata::field(
                                stringify!($field),
                                $crate::schema::Modifier::$modifier,
                                $crate::bond_record!(@default $fty $(, $default)?),
                            ),
                            ty: <$fty as $crate::reflection::BondType>::TYPE,
                        },
                    )*],
                };
                &SCHEMA
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name {
                    $(base: <$base as Default>::default(),)?
                    $(
                        $field: <$fty as $crate::reflection::BondType>::from_default(
                            &$crate::bond_record!(@default $fty $(, $default)?),
                        ),
                    )*
                }
            }
        }

        impl $crate::reflection::Record for $name {
            fn schema() -> $crate::reflection::StaticSchema {
                $crate::reflection::StaticSchema::new(Self::bond_static_struct())
            }

            fn record_schema(&self) -> $crate::reflection::StaticSchema {
                $crate::reflection::StaticSchema::new(Self::bond_static_struct())
            }

            #[allow(unused_variables)]
            fn field(&self, id: u16) -> Option<&dyn $crate::reflection::BondValue> {
                match id {
                    $($id => Some(&self.$field),)*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn field_mut(&mut self, id: u16) -> Option<&mut dyn $crate::reflection::BondValue> {
                match id {
                    $($id => Some(&mut self.$field),)*
                    _ => None,
                }
            }

            $crate::bond_record!(@base_access $($base)?);
        }

        impl $crate::reflection::BondValue for $name {
            fn data_type(&self) -> $crate::types::DataType {
                $crate::types::DataType::Struct
            }

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::Struct($crate::reflection::Record::to_struct_value(self))
            }

            fn assign(&mut self, value: $crate::value::Value) -> $crate::error::Result<()> {
                match value {
                    $crate::value::Value::Struct(s) => $crate::reflection::Record::assign_struct(self, s),
                    other => Err($crate::error::CoreError::MismatchedType {
                        expected: $crate::types::DataType::Struct,
                        actual: other.data_type(),
                    }),
                }
            }

            fn as_record_mut(&mut self) -> Option<&mut dyn $crate::reflection::Record> {
                Some(self)
            }
        }

        impl $crate::reflection::BondType for $name {
            const TYPE: &'static $crate::reflection::StaticType =
                &$crate::reflection::StaticType::Struct($name::bond_static_struct);
            const STRUCT: Option<fn() -> &'static $crate::reflection::StaticStruct> =
                Some($name::bond_static_struct);
        }
    };
}

/// Declare an enum carried on the wire as `Int32`.
///
/// The first variant is the default. Assigning a value outside the declared
/// set, as written by a newer schema, leaves the slot unchanged.
#[macro_export]
macro_rules! bond_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $first:ident = $first_value:literal
            $(, $variant:ident = $value:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $first = $first_value,
            $($variant = $value,)*
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$first
            }
        }

        impl $name {
            pub fn from_i32(raw: i32) -> Option<Self> {
                match raw {
                    $first_value => Some($name::$first),
                    $($value => Some($name::$variant),)*
                    _ => None,
                }
            }
        }

        impl $crate::reflection::BondValue for $name {
            fn data_type(&self) -> $crate::types::DataType {
                $crate::types::DataType::Int32
            }

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::I32(*self as i32)
            }

            fn assign(&mut self, value: $crate::value::Value) -> $crate::error::Result<()> {
                let raw = match value.coerce($crate::types::DataType::Int32)? {
                    $crate::value::Value::I32(v) => v,
                    other => {
                        return Err($crate::error::CoreError::MismatchedType {
                            expected: $crate::types::DataType::Int32,
                            actual: other.data_type(),
                        })
                    }
                };
                match $name::from_i32(raw) {
                    Some(v) => *self = v,
                    None => $crate::__tracing::debug!(raw, ty = stringify!($name), "keeping current value for unknown enum value"),
                }
                Ok(())
            }
        }

        impl $crate::reflection::BondType for $name {
            const TYPE: &'static $crate::reflection::StaticType =
                &$crate::reflection::StaticType::Basic($crate::types::DataType::Int32);
            const IMPLICIT_DEFAULT: $crate::schema::DefaultValue = $crate::schema::DefaultValue::Int($first_value);

            fn from_default(default: &$crate::schema::DefaultValue) -> Self {
                match default.to_value($crate::types::DataType::Int32) {
                    Some($crate::value::Value::I32(v)) => $name::from_i32(v).unwrap_or_default(),
                    _ => $name::$first,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Modifier;

    crate::bond_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Base("test.Base") {
            0 => Optional id: u64,
        }
    }

    crate::bond_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Derived("test.Derived"): Base {
            1 => Required count: u32 = DefaultValue::UInt(7),
            2 => Optional names: Vec<String>,
            3 => Optional note: Option<String>,
        }
    }

    #[test]
    fn generated_schema() {
        let schema = Derived::schema();
        assert_eq!(schema.metadata().qualified_name, "test.Derived");
        assert_eq!(schema.field_count(), 3);
        let count = schema.field(0);
        assert_eq!(count.id, 1);
        assert_eq!(count.metadata.modifier, Modifier::Required);
        assert_eq!(StaticSchema::data_type(schema.field(1).ty), DataType::List);
        let base = schema.base().expect("base");
        assert_eq!(base.metadata().name, "Base");
        assert!(base.base().is_none());
    }

    #[test]
    fn defaults_applied() {
        let d = Derived::default();
        assert_eq!(d.count, 7);
        assert!(d.names.is_empty());
        assert!(d.note.is_none());
        assert_eq!(
            Derived::schema().field(2).metadata.default_value,
            DefaultValue::Nothing
        );
    }

    #[test]
    fn struct_value_roundtrip() {
        let mut d = Derived::default();
        d.base.id = 9;
        d.names = vec!["a".into()];
        let sv = d.to_struct_value();
        assert!(sv.get(3).is_none());
        let mut back = Derived::default();
        back.assign_struct(sv).expect("assign");
        assert_eq!(back, d);
    }

    #[test]
    fn ascending_ids_accepted() {
        assert_ascending_ids(&[]);
        assert_ascending_ids(&[0, 1, 7, 0xFFFE]);
    }

    #[test]
    #[should_panic(expected = "strictly ascending")]
    fn unordered_ids_rejected() {
        assert_ascending_ids(&[1, 3, 2]);
    }

    #[test]
    fn accepts_checks_elements() {
        let ty = <Vec<u32> as BondType>::TYPE;
        assert!(ty.accepts(&Value::List(vec![Value::U8(1), Value::U32(2)])));
        assert!(!ty.accepts(&Value::List(vec![Value::I8(1)])));
        assert!(!ty.accepts(&Value::Set(vec![])));
    }
}

//! # bondcore: schema-driven serialization core
//!
//! Walks a schema together with a payload (or an in-memory object) and drives
//! a pluggable [`Transform`] field by field: serializers, deserializers,
//! validators and field mappers all plug into the same parsers.
//!
//! ## Pieces
//!
//! - **Schemas**: compile-time ([`StaticSchema`], declared with
//!   [`bond_record!`]) or runtime ([`RuntimeSchema`] over a [`SchemaDef`]
//!   loaded from JSON). Both implement [`Schema`].
//! - **Parsers**: [`StaticParser`] for untagged formats, [`DynamicParser`] for
//!   tagged formats (merges schema and wire, reports unknown and omitted
//!   fields), [`DomParser`] for documents. A reader picks its parser.
//! - **Protocols**: Compact Binary v1 (tagged), Simple Binary v1/v2
//!   (untagged), Simple JSON (document), each behind a cargo feature, plus
//!   [`ValueReader`] for objects in memory.
//! - **Transforms**: [`Serializer`] / [`Marshaler`], [`To`] (typed records,
//!   required-field validation), [`MapTo`] (path mapping), [`ToValue`],
//!   [`ExtractField`] and [`Null`].
//!
//! ## Example
//!
//! ```
//! use bondcore::{bond_record, marshal_to_vec, unmarshal, ProtocolType};
//!
//! bond_record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Reading("sensors.Reading") {
//!         1 => Required sensor: String,
//!         2 => Optional value: f64,
//!         3 => Optional tags: Vec<String>,
//!     }
//! }
//!
//! let reading = Reading { sensor: "t1".into(), value: 21.5, tags: vec!["lab".into()] };
//! let bytes = marshal_to_vec(&reading, ProtocolType::Compact).unwrap();
//! let back: Reading = unmarshal(&bytes).unwrap();
//! assert_eq!(back, reading);
//! ```

pub mod bonded;
#[cfg(feature = "compact")]
pub mod compact;
pub mod dom_parser;
pub mod dynamic_parser;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
pub mod map_to;
mod parser;
pub mod protocol;
pub mod reflection;
pub mod runtime_schema;
pub mod schema;
pub mod select_protocol;
pub mod serializer;
#[cfg(feature = "simple")]
pub mod simple;
pub mod static_parser;
pub mod to;
pub mod transform;
pub mod types;
pub mod value;
pub mod value_reader;
mod varint;

pub use bonded::{Bonded, ContainerValue, FieldValue};
#[cfg(feature = "compact")]
pub use compact::{CompactReader, CompactWriter};
pub use dom_parser::DomParser;
pub use dynamic_parser::DynamicParser;
pub use error::{CoreError, Result};
#[cfg(feature = "json")]
pub use json::{JsonDocument, JsonReader, JsonWriter};
pub use map_to::{MapTo, Mapping, Mappings, Path, MAPPING_BASE};
pub use protocol::{ContainerHeader, DomReader, ParserKind, Reader, TaggedReader, Writer};
pub use reflection::{BondType, BondValue, Record, StaticField, StaticSchema, StaticStruct, StaticType, WString};
pub use runtime_schema::{FieldDef, RuntimeSchema, RuntimeType, SchemaDef, StructDef, TypeDef};
pub use schema::{Attribute, DefaultValue, FieldDescriptor, Metadata, Modifier, Schema};
pub use select_protocol::{
    apply_with_protocol, deserialize, marshal, marshal_to_vec, marshal_value, select_protocol_and_apply, serialize,
    transcode, unmarshal, unmarshal_value, ProtocolType,
};
pub use serializer::{Marshaler, Serializer};
#[cfg(feature = "simple")]
pub use simple::{SimpleReader, SimpleVersion, SimpleWriter};
pub use static_parser::StaticParser;
pub use to::To;
pub use transform::{ExtractField, Null, ToValue, Transform};
pub use types::{is_matching, DataType, TypeClass, INVALID_FIELD_ID};
pub use value::{StructValue, Value};
pub use value_reader::ValueReader;

#[doc(hidden)]
pub use tracing as __tracing;

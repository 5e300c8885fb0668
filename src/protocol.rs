//! Reader and writer capabilities consumed by the parsers and the serializer.
//!
//! A reader states which parser drives it through [`Reader::KIND`]; its
//! [`Reader::parse`] constructs that parser, so lazily read nested values can
//! be handed to a transform without knowing the protocol.

use crate::error::Result;
use crate::schema::{Metadata, Schema};
use crate::transform::Transform;
use crate::types::DataType;
use crate::value::Value;

/// Deepest struct and container nesting a binary reader accepts.
pub const MAX_NESTING: usize = 128;

/// Which parser a wire format needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// No field tags: fields in schema order.
    Static,
    /// Every field tagged with id and type, levels closed by STOP/STOP_BASE.
    Dynamic,
    /// Self-describing document: fields found by lookup.
    Dom,
}

/// Container shape as read from (or written to) the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// `List`, `Set` or `Map`.
    pub kind: DataType,
    pub len: usize,
    /// Element type, value type for maps.
    pub element: DataType,
    /// Key type for maps.
    pub key: Option<DataType>,
}

pub trait Reader: Sized {
    const KIND: ParserKind;

    /// Reads an object already in memory; only then does the serializer
    /// omit fields equal to their default.
    const IN_MEMORY: bool = false;

    fn read_struct_begin(&mut self, base: bool) -> Result<()> {
        let _ = base;
        Ok(())
    }

    fn read_struct_end(&mut self, base: bool) -> Result<()> {
        let _ = base;
        Ok(())
    }

    /// Untagged formats with an explicit omission marker report it here.
    fn read_field_omitted(&mut self, id: u16) -> Result<bool> {
        let _ = id;
        Ok(false)
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Begin a container of `kind`. `element` and `key` are what the schema
    /// expects (`Unavailable` when unknown); untagged readers return them,
    /// tagged readers return what the wire says.
    fn read_container_begin(
        &mut self,
        kind: DataType,
        element: DataType,
        key: Option<DataType>,
    ) -> Result<ContainerHeader>;

    fn read_container_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read one scalar or string of wire type `ty`.
    fn read_basic(&mut self, ty: DataType) -> Result<Value>;

    /// Discard one encoded value of wire type `ty` without decoding it.
    fn skip(&mut self, ty: DataType) -> Result<()>;

    /// Drive `transform` over the struct at the current position with this
    /// reader's parser.
    fn parse<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S, base: bool) -> Result<bool>;
}

/// Readers of formats that tag each field.
pub trait TaggedReader: Reader {
    /// Next field header. `Stop`/`StopBase` end a struct level.
    fn read_field_begin(&mut self) -> Result<(DataType, u16)>;

    /// Make the next `read_field_begin` return this header again.
    fn push_back_field(&mut self, ty: DataType, id: u16);
}

/// Readers of self-describing documents.
pub trait DomReader: Reader {
    type Node: Copy;

    /// Look up a field of the current struct node; `None` when absent or of
    /// an incompatible kind.
    fn find_field(&mut self, id: u16, metadata: &Metadata, ty: DataType) -> Option<Self::Node>;

    /// Position the reader on a found field's value.
    fn enter_field(&mut self, node: Self::Node);

    fn exit_field(&mut self);
}

pub trait Writer {
    const MAGIC: u16;

    /// Whether the format lets optional fields equal to their default be
    /// left out.
    const MAY_OMIT_FIELDS: bool;

    /// Whether each field is written with its id. Untagged formats rely on
    /// position, so only fields of the schema, in schema types, may be written.
    const TAGGED: bool;

    fn version(&self) -> u16;

    /// Marshaled payload header: magic then version, both u16 LE.
    fn write_version(&mut self) -> Result<()>;

    fn write_struct_begin(&mut self, metadata: &Metadata, base: bool) -> Result<()> {
        let _ = (metadata, base);
        Ok(())
    }

    fn write_struct_end(&mut self, base: bool) -> Result<()>;

    /// `metadata` is `None` for fields the schema does not know.
    fn write_field_begin(&mut self, ty: DataType, id: u16, metadata: Option<&Metadata>) -> Result<()>;

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called for an optional field left out of the payload.
    fn write_field_omitted(&mut self, ty: DataType, id: u16, metadata: &Metadata) -> Result<()> {
        let _ = (ty, id, metadata);
        Ok(())
    }

    fn write_container_begin(&mut self, header: &ContainerHeader) -> Result<()>;

    fn write_container_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_basic(&mut self, value: &Value) -> Result<()>;
}

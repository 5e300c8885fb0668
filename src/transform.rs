//! The transform contract and the simple transforms.

use crate::bonded::{Bonded, FieldValue};
use crate::error::Result;
use crate::protocol::Reader;
use crate::schema::{Metadata, Schema};
use crate::types::DataType;
use crate::value::{StructValue, Value};
use std::collections::BTreeMap;

/// Callbacks a parser issues while walking one struct.
///
/// `begin`/`end` bracket every struct level, base layers included. The
/// field-family methods return `true` to stop parsing at the current level;
/// the parser then skips the rest of the payload. Struct and container
/// values left unread by a callback are skipped by the parser.
pub trait Transform {
    fn begin(&mut self, metadata: &Metadata) -> Result<()> {
        let _ = metadata;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    /// End of a base section the schema has no level for.
    fn unknown_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        let _ = value;
        Ok(false)
    }

    fn field<R: Reader, S: Schema>(
        &mut self,
        id: u16,
        metadata: &Metadata,
        value: &mut FieldValue<'_, R, S>,
    ) -> Result<bool>;

    fn unknown_field<R: Reader, S: Schema>(&mut self, id: u16, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        let _ = (id, value);
        Ok(false)
    }

    fn omitted_field(&mut self, id: u16, metadata: &Metadata, ty: DataType) -> Result<bool> {
        let _ = (id, metadata, ty);
        Ok(false)
    }
}

/// Reads nothing; parsing with it skips a payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct Null;

impl Transform for Null {
    fn field<R: Reader, S: Schema>(&mut self, _: u16, _: &Metadata, _: &mut FieldValue<'_, R, S>) -> Result<bool> {
        Ok(false)
    }
}

/// Decodes a struct into a [`StructValue`], keeping unknown fields.
#[derive(Debug, Default)]
pub struct ToValue {
    fields: BTreeMap<u16, Value>,
    base: Option<Box<StructValue>>,
}

impl ToValue {
    pub fn new() -> Self {
        ToValue::default()
    }

    pub fn into_struct(self) -> StructValue {
        StructValue { fields: self.fields, base: self.base }
    }
}

impl Transform for ToValue {
    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        let mut base = ToValue::new();
        value.apply(&mut base)?;
        self.base = Some(Box::new(base.into_struct()));
        Ok(false)
    }

    fn field<R: Reader, S: Schema>(&mut self, id: u16, _: &Metadata, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        self.fields.insert(id, value.deserialize()?);
        Ok(false)
    }

    fn unknown_field<R: Reader, S: Schema>(&mut self, id: u16, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        self.fields.entry(id).or_insert(value.deserialize()?);
        Ok(false)
    }
}

/// Finds one field by id, base layers included, and stops parsing as soon as
/// it has it.
#[derive(Debug)]
pub struct ExtractField {
    id: u16,
    value: Option<Value>,
}

impl ExtractField {
    pub fn new(id: u16) -> Self {
        ExtractField { id, value: None }
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

impl Transform for ExtractField {
    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        value.apply(self)
    }

    fn field<R: Reader, S: Schema>(&mut self, id: u16, _: &Metadata, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        if id != self.id {
            return Ok(false);
        }
        self.value = Some(value.deserialize()?);
        Ok(true)
    }
}

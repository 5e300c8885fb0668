//! Deserialization into a record of a different shape, driven by a table of
//! field paths.

use crate::bonded::{Bonded, FieldValue};
use crate::error::Result;
use crate::protocol::Reader;
use crate::reflection::{BondValue, Record};
use crate::schema::{Metadata, Schema};
use crate::to::assign_field;
use crate::transform::Transform;
use crate::types::INVALID_FIELD_ID;
use std::collections::BTreeMap;

/// Path step that enters the base record instead of a field. As a mapping
/// key it selects the mappings of the source's base layer.
pub const MAPPING_BASE: u16 = INVALID_FIELD_ID;

/// Field ids from the target record down to the destination slot.
pub type Path = Vec<u16>;

pub type Mappings = BTreeMap<u16, Mapping>;

/// Where one source field goes: either a destination path, or, for a struct
/// field, mappings for its own fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    pub path: Path,
    pub fields: Mappings,
}

impl Mapping {
    pub fn to(path: impl Into<Path>) -> Self {
        Mapping { path: path.into(), fields: Mappings::new() }
    }

    pub fn nested(fields: Mappings) -> Self {
        Mapping { path: Path::new(), fields }
    }
}

/// Source fields without a mapping are dropped.
pub struct MapTo<'a> {
    target: &'a mut dyn Record,
    mappings: &'a Mappings,
}

impl<'a> MapTo<'a> {
    pub fn new(target: &'a mut dyn Record, mappings: &'a Mappings) -> Self {
        MapTo { target, mappings }
    }
}

impl Transform for MapTo<'_> {
    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        match self.mappings.get(&MAPPING_BASE) {
            Some(mapping) => value.apply(&mut MapTo::new(&mut *self.target, &mapping.fields)),
            None => Ok(false),
        }
    }

    fn field<R: Reader, S: Schema>(&mut self, id: u16, _: &Metadata, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        let Some(mapping) = self.mappings.get(&id) else {
            return Ok(false);
        };
        if let (false, FieldValue::Struct(bonded)) = (mapping.fields.is_empty(), &mut *value) {
            return bonded.apply(&mut MapTo::new(&mut *self.target, &mapping.fields));
        }
        if !mapping.path.is_empty() {
            assign_path(&mut *self.target, &mapping.path, value)?;
        }
        Ok(false)
    }
}

fn assign_path<R: Reader, S: Schema>(
    target: &mut dyn Record,
    path: &[u16],
    value: &mut FieldValue<'_, R, S>,
) -> Result<()> {
    match path {
        [] => Ok(()),
        [MAPPING_BASE, rest @ ..] => match target.base_mut() {
            Some(base) => assign_path(base, rest, value),
            None => Ok(()),
        },
        [id] => match target.record_schema().field_by_id(*id) {
            Some(field) => assign_field(target, field, value),
            None => Ok(()),
        },
        [id, rest @ ..] => match target.field_mut(*id).and_then(BondValue::as_record_mut) {
            Some(nested) => assign_path(nested, rest, value),
            None => Ok(()),
        },
    }
}

//! Deserialization into a typed record.

use crate::bonded::{Bonded, ContainerValue, FieldValue};
use crate::error::{CoreError, Result};
use crate::protocol::{ContainerHeader, Reader};
use crate::reflection::{BondValue, Record, StaticField, StaticSchema, StaticType};
use crate::schema::{Metadata, Schema};
use crate::types::DataType;

/// Assigns each delivered field to the record slot with the same id.
///
/// Values whose type does not match the slot are dropped. Required fields
/// are checked as they arrive: fields come in ascending id order, so the
/// first required id passed over is the missing one.
pub struct To<'a> {
    target: &'a mut dyn Record,
    schema: StaticSchema,
    /// Required ids not yet seen, highest first.
    required: Vec<u16>,
}

impl<'a> To<'a> {
    pub fn new(target: &'a mut dyn Record) -> Self {
        let schema = target.record_schema();
        To { target, schema, required: Vec::new() }
    }

    fn missing(&self, id: u16) -> CoreError {
        CoreError::MissingField {
            id,
            qualified_name: self.schema.metadata().qualified_name.to_string(),
        }
    }

    fn validate(&mut self, field: &StaticField) -> Result<()> {
        if !field.metadata.is_required() {
            return Ok(());
        }
        match self.required.last() {
            Some(&next) if next == field.id => {
                self.required.pop();
                Ok(())
            }
            Some(&next) if next < field.id => Err(self.missing(next)),
            _ => Ok(()),
        }
    }
}

impl crate::transform::Transform for To<'_> {
    fn begin(&mut self, _: &Metadata) -> Result<()> {
        self.required = self
            .schema
            .definition()
            .fields
            .iter()
            .rev()
            .filter(|f| f.metadata.is_required())
            .map(|f| f.id)
            .collect();
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        match self.required.last() {
            Some(&id) => Err(self.missing(id)),
            None => Ok(()),
        }
    }

    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        match self.target.base_mut() {
            Some(base) => value.apply(&mut To::new(base)),
            None => Ok(false),
        }
    }

    fn field<R: Reader, S: Schema>(&mut self, id: u16, _: &Metadata, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        let Some(field) = self.schema.field_by_id(id) else {
            return Ok(false);
        };
        self.validate(field)?;
        assign_field(&mut *self.target, field, value)?;
        Ok(false)
    }
}

/// Whether `value` can be stored in a slot of type `ty`.
pub(crate) fn is_assignable<R: Reader, S: Schema>(ty: &StaticType, value: &FieldValue<'_, R, S>) -> bool {
    match value {
        FieldValue::Basic(v) | FieldValue::Mismatched { value: v, .. } => ty.accepts(v),
        other => other.data_type() == ty.data_type(),
    }
}

/// Store `value` in `field` of `target`. Mismatched values are left for the
/// parser to skip.
pub(crate) fn assign_field<R: Reader, S: Schema>(
    target: &mut dyn Record,
    field: &'static StaticField,
    value: &mut FieldValue<'_, R, S>,
) -> Result<()> {
    if !is_assignable(field.ty, value) {
        tracing::trace!(id = field.id, wire = ?value.data_type(), slot = ?field.ty, "skipping mismatched field");
        return Ok(());
    }
    let Some(slot) = target.field_mut(field.id) else {
        return Ok(());
    };
    match value {
        FieldValue::Basic(v) | FieldValue::Mismatched { value: v, .. } => slot.assign(v.clone()),
        FieldValue::Struct(bonded) => match slot.as_record_mut() {
            Some(record) => bonded.apply(&mut To::new(record)).map(drop),
            None => Err(CoreError::mismatch(slot.data_type(), DataType::Struct)),
        },
        FieldValue::Container(container) if holds_records(field.ty) => assign_records(slot, field, container),
        FieldValue::Container(container) => {
            let v = container.deserialize()?;
            if field.ty.accepts(&v) {
                slot.assign(v)
            } else {
                tracing::trace!(id = field.id, "dropping container with mismatched elements");
                Ok(())
            }
        }
    }
}

/// Lists and maps of structs are assigned element by element, so that each
/// element's required fields are checked.
fn holds_records(ty: &StaticType) -> bool {
    matches!(ty, StaticType::List(StaticType::Struct(_)) | StaticType::Map(_, StaticType::Struct(_)))
}

fn assign_records<R: Reader, S: Schema>(
    slot: &mut dyn BondValue,
    field: &'static StaticField,
    container: &mut ContainerValue<'_, R, S>,
) -> Result<()> {
    let header = container.begin()?;
    let keys = match field.ty {
        StaticType::Map(key, _) => Some(*key),
        _ => None,
    };
    if header.element != DataType::Struct || keys.is_some() != header.key.is_some() {
        tracing::trace!(id = field.id, element = ?header.element, "dropping container with mismatched elements");
        return drain(container, header);
    }
    slot.clear_elements();
    for _ in 0..header.len {
        let target = match keys {
            Some(key_type) => {
                let key = container.key()?.deserialize()?;
                if key_type.accepts(&key) {
                    slot.insert_element(key)?
                } else {
                    None
                }
            }
            None => slot.push_element(),
        };
        let record = target.and_then(|t| t.as_record_mut());
        let mut element = container.element()?;
        if let (FieldValue::Struct(bonded), Some(record)) = (&mut element, record) {
            bonded.apply(&mut To::new(record))?;
        }
        element.finish()?;
    }
    container.end()
}

fn drain<R: Reader, S: Schema>(container: &mut ContainerValue<'_, R, S>, header: ContainerHeader) -> Result<()> {
    for _ in 0..header.len {
        if header.key.is_some() {
            container.key()?.finish()?;
        }
        container.element()?.finish()?;
    }
    container.end()
}

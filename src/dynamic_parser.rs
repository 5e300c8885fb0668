//! Parser for tagged formats.
//!
//! The schema's fields and the wire's field headers are two ascending
//! sequences merged in a single forward pass:
//!
//! * a schema field with no wire header before the next higher id (or the
//!   end of the level) is reported omitted;
//! * a wire header matching the next schema field by id and type is a known
//!   field; by id only, with both types basic, it is delivered as a known
//!   field carrying the wire type so the transform can apply the matching
//!   rule; by id only otherwise, it is an unknown field and the schema field
//!   is reported omitted;
//! * any other header is an unknown field.
//!
//! After the schema is exhausted, remaining headers of the level are
//! unknown. At the outermost level, base sections the schema has no layer
//! for are walked as unknown too, each closed by `unknown_end`.

use crate::bonded::FieldValue;
use crate::error::Result;
use crate::parser::read_hierarchy;
use crate::protocol::TaggedReader;
use crate::schema::Schema;
use crate::transform::Transform;
use crate::types::DataType;
use tracing::trace;

pub struct DynamicParser<'r, R> {
    reader: &'r mut R,
    base: bool,
}

impl<'r, R: TaggedReader> DynamicParser<'r, R> {
    pub fn new(reader: &'r mut R, base: bool) -> Self {
        DynamicParser { reader, base }
    }

    pub fn apply<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S) -> Result<bool> {
        let base = self.base;
        self.reader.read_struct_begin(base)?;
        let done = read_hierarchy(&mut *self.reader, schema, transform, move |reader, transform, done| {
            read_fields(reader, schema, transform, done, base)
        })?;
        self.reader.read_struct_end(base)?;
        Ok(done)
    }
}

fn read_fields<R: TaggedReader, S: Schema, T: Transform>(
    reader: &mut R,
    schema: S,
    transform: &mut T,
    mut done: bool,
    base: bool,
) -> Result<bool> {
    let (mut ty, mut id) = reader.read_field_begin()?;
    let count = schema.field_count();
    let mut next = 0;

    while !done {
        while next < count && (schema.field(next).id < id || ty.is_stop()) {
            let field = schema.field(next);
            next += 1;
            trace!(id = field.id, "omitted field");
            done = transform.omitted_field(field.id, field.metadata, S::data_type(field.ty))?;
            if done {
                break;
            }
        }
        if done || ty.is_stop() {
            break;
        }

        let candidate = (next < count).then(|| schema.field(next)).filter(|f| f.id == id);
        match candidate {
            Some(field) if S::data_type(field.ty) == ty => {
                next += 1;
                let mut value = FieldValue::<R, S>::read(&mut *reader, ty, Some(field.ty))?;
                done = transform.field(id, field.metadata, &mut value)?;
                value.finish()?;
            }
            Some(field) if S::data_type(field.ty).is_basic() && ty.is_basic() => {
                next += 1;
                let expected = S::data_type(field.ty);
                trace!(id, ?expected, actual = ?ty, "field type mismatch");
                let mut value = FieldValue::<R, S>::mismatched(reader.read_basic(ty)?, expected);
                done = transform.field(id, field.metadata, &mut value)?;
            }
            Some(field) => {
                // Same id, incompatible kinds: the wire value is unknown and
                // the schema field counts as omitted.
                next += 1;
                done = unknown_field::<R, S, T>(reader, transform, id, ty)?;
                if !done {
                    done = transform.omitted_field(field.id, field.metadata, S::data_type(field.ty))?;
                }
            }
            None => {
                done = unknown_field::<R, S, T>(reader, transform, id, ty)?;
            }
        }
        reader.read_field_end()?;
        (ty, id) = reader.read_field_begin()?;
    }

    // The transform has stopped: skip the rest of this level.
    while !ty.is_stop() {
        reader.skip(ty)?;
        reader.read_field_end()?;
        (ty, id) = reader.read_field_begin()?;
    }

    if !base {
        // The payload has base sections the schema has no layers for.
        while ty != DataType::Stop {
            if ty == DataType::StopBase {
                trace!("end of unknown base section");
                if !done {
                    transform.unknown_end()?;
                }
            } else if done {
                reader.skip(ty)?;
            } else {
                done = unknown_field::<R, S, T>(reader, transform, id, ty)?;
            }
            reader.read_field_end()?;
            (ty, id) = reader.read_field_begin()?;
        }
    } else if ty == DataType::Stop {
        // The payload's hierarchy is shallower than the schema's; the STOP
        // belongs to the enclosing level.
        reader.push_back_field(ty, id);
        return Ok(done);
    }

    reader.read_field_end()?;
    Ok(done)
}

fn unknown_field<R: TaggedReader, S: Schema, T: Transform>(
    reader: &mut R,
    transform: &mut T,
    id: u16,
    ty: DataType,
) -> Result<bool> {
    trace!(id, ?ty, "unknown field");
    let mut value = FieldValue::<R, S>::read(reader, ty, None)?;
    let done = transform.unknown_field(id, &mut value)?;
    value.finish()?;
    Ok(done)
}

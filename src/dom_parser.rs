//! Parser for self-describing documents: each schema field is looked up in
//! the current node. Absent fields are simply not reported, and nodes the
//! schema never asks for are ignored.

use crate::bonded::FieldValue;
use crate::error::Result;
use crate::parser::read_hierarchy;
use crate::protocol::DomReader;
use crate::schema::Schema;
use crate::transform::Transform;

pub struct DomParser<'r, R> {
    reader: &'r mut R,
    base: bool,
}

impl<'r, R: DomReader> DomParser<'r, R> {
    pub fn new(reader: &'r mut R, base: bool) -> Self {
        DomParser { reader, base }
    }

    pub fn apply<S: Schema, T: Transform>(&mut self, transform: &mut T, schema: S) -> Result<bool> {
        self.reader.read_struct_begin(self.base)?;
        let done = read_hierarchy(&mut *self.reader, schema, transform, move |reader, transform, done| {
            read_fields(reader, schema, transform, done)
        })?;
        self.reader.read_struct_end(self.base)?;
        Ok(done)
    }
}

fn read_fields<R: DomReader, S: Schema, T: Transform>(
    reader: &mut R,
    schema: S,
    transform: &mut T,
    mut done: bool,
) -> Result<bool> {
    for field in schema.fields() {
        if done {
            break;
        }
        let ty = S::data_type(field.ty);
        let Some(node) = reader.find_field(field.id, field.metadata, ty) else {
            continue;
        };
        reader.enter_field(node);
        let mut value = FieldValue::<R, S>::read(&mut *reader, ty, Some(field.ty))?;
        done = transform.field(field.id, field.metadata, &mut value)?;
        value.finish()?;
        reader.exit_field();
    }
    Ok(done)
}

//! Parser for untagged formats: exactly one value per schema field, in
//! schema order, base layer first.

use crate::bonded::FieldValue;
use crate::error::Result;
use crate::parser::read_hierarchy;
use crate::protocol::Reader;
use crate::schema::Schema;
use crate::transform::Transform;

pub struct StaticParser<'r, R> {
    reader: &'r mut R,
    base: bool,
}

impl<'r, R: Reader> StaticParser<'r, R> {
    pub fn new(reader: &'r mut R, base: bool) -> Self {
        StaticParser { reader, base }
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

fn read_fields<R: Reader, S: Schema, T: Transform>(
    reader: &mut R,
    schema: S,
    transform: &mut T,
    mut done: bool,
) -> Result<bool> {
    for field in schema.fields() {
        let ty = S::data_type(field.ty);
        if reader.read_field_omitted(field.id)? {
            if !done {
                done = transform.omitted_field(field.id, field.metadata, ty)?;
            }
            continue;
        }
        let mut value = FieldValue::<R, S>::read(&mut *reader, ty, Some(field.ty))?;
        if !done {
            done = transform.field(field.id, field.metadata, &mut value)?;
        }
        value.finish()?;
        reader.read_field_end()?;
    }
    if done {
        tracing::trace!(schema = %schema.metadata().qualified_name, "transform stopped early");
    }
    Ok(done)
}
